//! Sound effect clips with instance pooling
//!
//! A clip keeps up to `MAX_AUDIO_INSTANCES` playback instances so short effects
//! can overlap when retriggered quickly. The mute flag is process-wide and
//! persisted in the key/value store.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::consts::MAX_AUDIO_INSTANCES;
use crate::persistence::KeyValueStore;

/// Storage key for the mute flag
pub const MUTED_KEY: &str = "radiusAudioMuted";

/// One playable copy of a clip
pub trait ClipInstance {
    fn play(&mut self);
    /// True once playback has finished
    fn ended(&self) -> bool;
}

/// Platform audio: creates preloaded instances of a source
pub trait AudioBackend {
    fn create_instance(&self, source: &str) -> Box<dyn ClipInstance>;
}

/// Backend for headless runs: instances play nothing and are always idle
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBackend;

struct SilentInstance;

impl ClipInstance for SilentInstance {
    fn play(&mut self) {}

    fn ended(&self) -> bool {
        true
    }
}

impl AudioBackend for SilentBackend {
    fn create_instance(&self, _source: &str) -> Box<dyn ClipInstance> {
        Box::new(SilentInstance)
    }
}

/// Audio context shared by all clips
pub struct AudioSystem {
    backend: Box<dyn AudioBackend>,
    store: Rc<dyn KeyValueStore>,
    muted: Cell<bool>,
}

impl AudioSystem {
    pub fn new(backend: impl AudioBackend + 'static, store: Rc<dyn KeyValueStore>) -> Rc<Self> {
        let muted = store.get(MUTED_KEY).as_deref() == Some("true");
        Rc::new(Self {
            backend: Box::new(backend),
            store,
            muted: Cell::new(muted),
        })
    }

    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
        if let Err(e) = self.store.set(MUTED_KEY, if muted { "true" } else { "false" }) {
            log::warn!("Failed to persist mute flag: {}", e);
        }
        log::info!("Audio {}", if muted { "muted" } else { "unmuted" });
    }
}

struct Instance {
    playback: Box<dyn ClipInstance>,
    played: bool,
}

/// A short sound effect
pub struct AudioClip {
    audio: Rc<AudioSystem>,
    source: String,
    /// Expected to retrigger often: keep one spare instance preloaded
    frequent: bool,
    instances: RefCell<Vec<Instance>>,
}

impl AudioClip {
    pub fn new(audio: Rc<AudioSystem>, source: impl Into<String>, frequent: bool) -> Self {
        let clip = Self {
            audio,
            source: source.into(),
            frequent,
            instances: RefCell::new(Vec::new()),
        };

        // Cache the clip immediately
        if !clip.audio.is_muted() {
            clip.add_instance();
        }
        clip
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn instance_count(&self) -> usize {
        self.instances.borrow().len()
    }

    fn add_instance(&self) {
        let playback = self.audio.backend.create_instance(&self.source);
        self.instances.borrow_mut().push(Instance {
            playback,
            played: false,
        });
    }

    pub fn play(&self) {
        if self.audio.is_muted() {
            return;
        }

        // Find an idle instance
        let mut index = self
            .instances
            .borrow()
            .iter()
            .position(|i| !i.played || i.playback.ended());

        if index.is_none() && self.instance_count() < MAX_AUDIO_INSTANCES {
            self.add_instance();
            index = Some(self.instance_count() - 1);
        }

        // Frequent clips on their last free instance get another one preloaded
        if self.frequent
            && index == Some(self.instance_count() - 1)
            && self.instance_count() < MAX_AUDIO_INSTANCES
        {
            self.add_instance();
        }

        match index {
            Some(index) => {
                let mut instances = self.instances.borrow_mut();
                let instance = &mut instances[index];
                instance.played = true;
                instance.playback.play();
            }
            None => log::debug!("All instances of {} busy; dropping play", self.source),
        }
    }
}
