//! Image cache with asynchronous, batch-aware loading
//!
//! Images are requested by source identifier. The platform loader reports
//! completion through a [`LoadNotifier`]; until then the entry reports
//! `loaded() == false` and drawing simply skips it.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use crate::event::{Event, ListenerId};

/// A cached image and its load state
#[derive(Debug)]
pub struct ImageEntry {
    source: String,
    loaded: Cell<bool>,
    size: Cell<(u32, u32)>,
}

impl ImageEntry {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn loaded(&self) -> bool {
        self.loaded.get()
    }

    /// Natural size in pixels (zero until loaded)
    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }
}

pub type ImageHandle = Rc<ImageEntry>;

/// Platform hook that starts fetching/decoding an image
pub trait ImageLoader {
    fn begin_load(&self, source: &str, done: LoadNotifier);
}

/// Loader for headless runs: every image completes immediately with a fixed size
#[derive(Debug, Clone, Copy)]
pub struct ImmediateLoader {
    pub size: (u32, u32),
}

impl ImageLoader for ImmediateLoader {
    fn begin_load(&self, _source: &str, done: LoadNotifier) {
        done.loaded(self.size.0, self.size.1);
    }
}

/// Completion callback handed to an [`ImageLoader`]
#[derive(Debug, Clone)]
pub struct LoadNotifier {
    cache: Weak<ImageCache>,
    source: String,
}

impl LoadNotifier {
    pub fn loaded(&self, width: u32, height: u32) {
        if let Some(cache) = self.cache.upgrade() {
            cache.mark_loaded(&self.source, width, height);
        }
    }
}

pub struct ImageCache {
    this: Weak<ImageCache>,
    entries: RefCell<HashMap<String, ImageHandle>>,
    loader: Box<dyn ImageLoader>,
    image_loaded: Event<ImageHandle>,
}

impl ImageCache {
    pub fn new(loader: impl ImageLoader + 'static) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            entries: RefCell::new(HashMap::new()),
            loader: Box::new(loader),
            image_loaded: Event::new(),
        })
    }

    /// Look up an image, starting its load on first request
    pub fn get(&self, source: &str) -> ImageHandle {
        if let Some(entry) = self.entries.borrow().get(source) {
            return Rc::clone(entry);
        }

        let entry = Rc::new(ImageEntry {
            source: source.to_string(),
            loaded: Cell::new(false),
            size: Cell::new((0, 0)),
        });
        self.entries
            .borrow_mut()
            .insert(source.to_string(), Rc::clone(&entry));

        log::debug!("Loading image {}", source);
        self.loader.begin_load(
            source,
            LoadNotifier {
                cache: self.this.clone(),
                source: source.to_string(),
            },
        );
        entry
    }

    /// Request a set of images and track them as one batch.
    ///
    /// Repeated sources count once. Dropping the batch stops its tracking.
    pub fn load(&self, sources: &[&str]) -> Rc<LoadBatch> {
        let mut seen = HashSet::new();
        let handles: Vec<ImageHandle> = sources
            .iter()
            .filter(|s| seen.insert(**s))
            .map(|s| self.get(s))
            .collect();
        let pending: HashSet<String> = handles
            .iter()
            .filter(|h| !h.loaded())
            .map(|h| h.source.clone())
            .collect();

        let batch = Rc::new(LoadBatch {
            total: handles.len(),
            loaded: Cell::new(handles.len() - pending.len()),
            pending: RefCell::new(pending),
            progress: Event::new(),
            fulfilled: Event::new(),
            cache: self.this.clone(),
            listener: Cell::new(None),
            handles,
        });

        if !batch.is_fulfilled() {
            let weak = Rc::downgrade(&batch);
            let id = self.image_loaded.add_listener(move |entry: &ImageHandle| {
                if let Some(batch) = weak.upgrade() {
                    if batch.image_loaded(entry) {
                        batch.detach();
                    }
                }
            });
            batch.listener.set(Some(id));
        }

        batch
    }

    /// Record a completed load and notify waiting batches
    pub fn mark_loaded(&self, source: &str, width: u32, height: u32) {
        let entry = self.entries.borrow().get(source).cloned();
        match entry {
            Some(entry) if !entry.loaded() => {
                entry.size.set((width, height));
                entry.loaded.set(true);
                log::debug!("Image loaded: {} ({}x{})", source, width, height);
                self.image_loaded.fire(&entry);
            }
            Some(_) => {}
            None => log::warn!("Load completed for unknown image {}", source),
        }
    }
}

/// Progress of a [`LoadBatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

/// A promise-like group of image loads
pub struct LoadBatch {
    total: usize,
    loaded: Cell<usize>,
    pending: RefCell<HashSet<String>>,
    progress: Event<LoadProgress>,
    fulfilled: Event<()>,
    cache: Weak<ImageCache>,
    listener: Cell<Option<ListenerId>>,
    handles: Vec<ImageHandle>,
}

impl Drop for LoadBatch {
    fn drop(&mut self) {
        self.detach();
    }
}

impl LoadBatch {
    pub fn handles(&self) -> &[ImageHandle] {
        &self.handles
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            loaded: self.loaded.get(),
            total: self.total,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.loaded.get() >= self.total
    }

    /// Called after each image in the batch finishes loading
    pub fn on_progress(&self, f: impl Fn(&LoadProgress) + 'static) {
        self.progress.add_listener(f);
    }

    /// Called once every image has loaded (immediately if that already happened)
    pub fn on_fulfilled(&self, f: impl Fn(&()) + 'static) {
        if self.is_fulfilled() {
            f(&());
        } else {
            self.fulfilled.add_listener(f);
        }
    }

    /// Stop listening for image loads
    fn detach(&self) {
        if let (Some(cache), Some(id)) = (self.cache.upgrade(), self.listener.take()) {
            cache.image_loaded.remove_listener(id);
        }
    }

    /// Returns true once the batch is complete
    fn image_loaded(&self, entry: &ImageEntry) -> bool {
        if !self.pending.borrow_mut().remove(entry.source()) {
            return false;
        }

        self.loaded.set(self.loaded.get() + 1);
        self.progress.fire(&self.progress());
        if self.is_fulfilled() {
            self.fulfilled.fire(&());
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct DeferredLoader {
        requests: Rc<RefCell<Vec<LoadNotifier>>>,
    }

    impl ImageLoader for DeferredLoader {
        fn begin_load(&self, _source: &str, done: LoadNotifier) {
            self.requests.borrow_mut().push(done);
        }
    }

    #[test]
    fn test_get_is_cached() {
        let loader = DeferredLoader::default();
        let cache = ImageCache::new(loader.clone());
        let a = cache.get("player.png");
        let b = cache.get("player.png");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(loader.requests.borrow().len(), 1);
        assert!(!a.loaded());
    }

    #[test]
    fn test_batch_progress_and_fulfilled() {
        let loader = DeferredLoader::default();
        let cache = ImageCache::new(loader.clone());
        let batch = cache.load(&["a.png", "b.png"]);

        let progress = Rc::new(RefCell::new(Vec::new()));
        let done = Rc::new(Cell::new(0));
        {
            let progress = progress.clone();
            batch.on_progress(move |p| progress.borrow_mut().push(p.loaded));
        }
        {
            let done = done.clone();
            batch.on_fulfilled(move |_| done.set(done.get() + 1));
        }

        let requests = loader.requests.borrow().clone();
        requests[1].loaded(32, 32);
        assert_eq!(done.get(), 0);
        requests[0].loaded(16, 16);
        assert_eq!(done.get(), 1);
        assert_eq!(*progress.borrow(), vec![1, 2]);
        assert_eq!(cache.get("a.png").size(), (16, 16));

        // Duplicate completions are ignored
        requests[0].loaded(16, 16);
        assert_eq!(done.get(), 1);
    }

    #[test]
    fn test_repeated_sources_count_once() {
        let loader = DeferredLoader::default();
        let cache = ImageCache::new(loader.clone());
        let batch = cache.load(&["a.png", "a.png", "b.png"]);
        assert_eq!(batch.progress().total, 2);
        assert_eq!(batch.handles().len(), 2);

        let requests = loader.requests.borrow().clone();
        for request in &requests {
            request.loaded(8, 8);
        }
        assert!(batch.is_fulfilled());
        assert_eq!(cache.image_loaded.listener_count(), 0);
    }

    #[test]
    fn test_dropped_batch_stops_listening() {
        let loader = DeferredLoader::default();
        let cache = ImageCache::new(loader.clone());
        let batch = cache.load(&["a.png"]);
        assert_eq!(cache.image_loaded.listener_count(), 1);

        drop(batch);
        assert_eq!(cache.image_loaded.listener_count(), 0);
        loader.requests.borrow()[0].loaded(4, 4);
        assert!(cache.get("a.png").loaded());
    }

    #[test]
    fn test_immediate_loader_completes_synchronously() {
        let cache = ImageCache::new(ImmediateLoader { size: (64, 32) });
        let batch = cache.load(&["logo.png"]);
        assert!(batch.is_fulfilled());
        assert_eq!(batch.handles()[0].size(), (64, 32));
    }

    #[test]
    fn test_already_loaded_batch_fulfills_immediately() {
        let loader = DeferredLoader::default();
        let cache = ImageCache::new(loader.clone());
        cache.get("a.png");
        loader.requests.borrow()[0].loaded(1, 1);

        let batch = cache.load(&["a.png"]);
        assert!(batch.is_fulfilled());
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        batch.on_fulfilled(move |_| flag.set(true));
        assert!(done.get());
    }
}
