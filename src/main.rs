//! Avoision entry point
//!
//! A menu layer (start, difficulty) over a game layer where the player dodges
//! falling blocks. The browser build runs on a canvas; the native build plays a
//! scripted session headlessly and prints a summary.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

mod avoision {
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};

    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use radius::Actions;
    use radius::assets::{ImageCache, LoadBatch};
    use radius::audio::{AudioClip, AudioSystem};
    use radius::consts::{LOGICAL_HEIGHT, LOGICAL_WIDTH};
    use radius::input::Key;
    use radius::layer::{Layer, LayerRef};
    use radius::persistence::KeyValueStore;
    use radius::scene::{Entity, EntityList, EntityRef, GhostParams, Image, Rectangle, Text};
    use radius::settings::{Difficulty, Settings};
    use radius::surface::{Color, Font, TextMetrics};
    use radius::ui::{Button, Choice, Form, Label, form_layer};

    const HALF_WIDTH: f32 = LOGICAL_WIDTH / 2.0;
    const HALF_HEIGHT: f32 = LOGICAL_HEIGHT / 2.0;

    pub const PLAYER_SIZE: f32 = 20.0;
    /// Logical units per millisecond
    const PLAYER_SPEED: f32 = 0.3;
    const ENEMY_SIZE: f32 = 16.0;
    pub const MAX_HITS: u32 = 3;

    const LOGO: &str = "assets/logo.png";
    const CLICK: &str = "assets/click.mp3";
    const HIT: &str = "assets/hit.mp3";

    /// Images and sounds shared by the menu and every game
    pub struct Media {
        pub images: Rc<ImageCache>,
        pub audio: Rc<AudioSystem>,
        click: Rc<AudioClip>,
        hit: Rc<AudioClip>,
        preload: Rc<LoadBatch>,
    }

    impl Media {
        /// Starts loading every image up front
        pub fn new(images: Rc<ImageCache>, audio: Rc<AudioSystem>) -> Self {
            let preload = images.load(&[LOGO]);
            preload.on_progress(|p| log::debug!("Images {}/{}", p.loaded, p.total));
            preload.on_fulfilled(|_| log::info!("Images ready"));

            Self {
                click: Rc::new(AudioClip::new(audio.clone(), CLICK, false)),
                hit: Rc::new(AudioClip::new(audio.clone(), HIT, true)),
                images,
                audio,
                preload,
            }
        }

        pub fn ready(&self) -> bool {
            self.preload.is_fulfilled()
        }
    }

    /// Result of one game
    #[derive(Debug, Default)]
    pub struct Score {
        pub dodged: Cell<u32>,
        pub hits: Cell<u32>,
    }

    /// State shared by the menu across games
    pub struct Session {
        pub difficulty: Cell<Difficulty>,
        pub games: RefCell<Vec<Rc<Score>>>,
        pub media: Media,
        seed: u64,
    }

    impl Session {
        pub fn new(difficulty: Difficulty, seed: u64, media: Media) -> Rc<Self> {
            Rc::new(Self {
                difficulty: Cell::new(difficulty),
                games: RefCell::new(Vec::new()),
                media,
                seed,
            })
        }
    }

    #[derive(Debug, Default, Clone, Copy)]
    struct Held {
        left: bool,
        right: bool,
        up: bool,
        down: bool,
    }

    impl Held {
        fn direction(&self) -> Vec2 {
            let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
            Vec2::new(axis(self.left, self.right), axis(self.down, self.up)).normalize_or_zero()
        }
    }

    fn hold(held: &Rc<Cell<Held>>, apply: fn(&mut Held, bool)) -> impl FnMut(bool, &mut Actions) + 'static {
        let held = held.clone();
        move |pressed, _| {
            let mut h = held.get();
            apply(&mut h, pressed);
            held.set(h);
        }
    }

    fn overlaps(a: Vec2, a_size: f32, b: Vec2, b_size: f32) -> bool {
        let reach = (a_size + b_size) / 2.0;
        (a.x - b.x).abs() < reach && (a.y - b.y).abs() < reach
    }

    /// Logo, title, start button, difficulty and sound choices.
    ///
    /// Choosing a difficulty saves it to `store`; starting pushes a fresh game layer.
    pub fn menu_layer(metrics: &dyn TextMetrics, session: Rc<Session>, store: Rc<dyn KeyValueStore>) -> LayerRef {
        let start = {
            let session = session.clone();
            Button::new("Start", Font::sans(24.0), move |actions| {
                let mut games = session.games.borrow_mut();
                let seed = session.seed.wrapping_add(games.len() as u64);
                let (layer, score) = game_layer(session.difficulty.get(), seed, session.media.hit.clone());
                games.push(score);
                log::info!("Starting game {} on {}", games.len(), session.difficulty.get().as_str());
                actions.push_layer(layer);
            })
        };

        let sound = {
            let audio = session.media.audio.clone();
            let options = vec!["Sound on".to_string(), "Sound off".to_string()];
            Choice::new(options, audio.is_muted() as usize, Font::sans(24.0), move |changed| {
                let muted = changed.index == 1;
                if audio.is_muted() != muted {
                    audio.set_muted(muted);
                }
            })
            .with_click(session.media.click.clone())
        };

        let click = session.media.click.clone();
        let logo = session.media.images.get(LOGO);
        let options = Difficulty::ALL.iter().map(|d| d.as_str().to_string()).collect();
        let difficulty = Choice::new(
            options,
            session.difficulty.get().index(),
            Font::sans(24.0),
            move |changed| {
                let chosen = Difficulty::from_index(changed.index);
                if session.difficulty.replace(chosen) == chosen {
                    return;
                }
                let mut settings = Settings::load(store.as_ref());
                settings.difficulty = chosen;
                if let Err(e) = settings.save(store.as_ref()) {
                    log::warn!("Could not save difficulty: {}", e);
                }
            },
        )
        .with_click(click);

        let form = Form::centered(Vec2::new(-160.0, 120.0), 320.0)
            .with(Label::new("AVOISION", Font::sans(40.0)))
            .with(start)
            .with(difficulty)
            .with(sound);

        let layer = form_layer("menu", Rc::new(RefCell::new(form)), metrics).with_background(Color::rgb(16, 16, 40));
        layer.add_entity(
            Entity::new(0.0, HALF_HEIGHT - 50.0)
                .with_size(128.0, 48.0)
                .with_element(Image::new(logo)),
        );
        layer.into_ref()
    }

    /// A falling block; dead once it leaves the bottom edge or hits the player
    pub fn enemy(
        position: Vec2,
        speed: f32,
        player: EntityRef,
        roots: Weak<EntityList>,
        score: Rc<Score>,
        hit_sound: Rc<AudioClip>,
    ) -> Entity {
        Entity::new(position.x, position.y)
            .with_size(ENEMY_SIZE, ENEMY_SIZE)
            .with_color(Color::RED)
            .with_element(Rectangle::default())
            .with_update(move |entity, ms, actions| {
                entity.position.y -= speed * ms;
                if entity.position.y < -HALF_HEIGHT - ENEMY_SIZE {
                    entity.dead = true;
                    score.dodged.set(score.dodged.get() + 1);
                    return;
                }

                let hit = overlaps(entity.position, ENEMY_SIZE, player.borrow().position, PLAYER_SIZE);
                if hit {
                    entity.dead = true;
                    hit_sound.play();
                    if let Some(roots) = roots.upgrade() {
                        roots.append(Entity::ghost(entity, GhostParams::outward(400.0, 3.0), None).into());
                    }

                    let hits = score.hits.get() + 1;
                    score.hits.set(hits);
                    log::debug!("Hit {}/{}", hits, MAX_HITS);
                    if hits == MAX_HITS {
                        log::info!("Game over, dodged {}", score.dodged.get());
                        actions.pop_layer();
                    }
                }
            })
    }

    /// Arrow keys or a held touch steer the player; escape returns to the menu
    pub fn game_layer(difficulty: Difficulty, seed: u64, hit_sound: Rc<AudioClip>) -> (LayerRef, Rc<Score>) {
        let held = Rc::new(Cell::new(Held::default()));
        let target: Rc<Cell<Option<Vec2>>> = Rc::new(Cell::new(None));
        let score = Rc::new(Score::default());

        let touch_start = target.clone();
        let touch_move = target.clone();
        let touch_cancel = target.clone();
        let layer = Layer::new("game")
            .with_background(Color::BLACK)
            .on_key(Key::Left, hold(&held, |h, p| h.left = p))
            .on_key(Key::Right, hold(&held, |h, p| h.right = p))
            .on_key(Key::Up, hold(&held, |h, p| h.up = p))
            .on_key(Key::Down, hold(&held, |h, p| h.down = p))
            .on_key(Key::Escape, |pressed, actions| {
                if pressed {
                    actions.pop_layer();
                }
            })
            .on_touched(move |_, pressed, position, _| {
                touch_start.set(pressed.then_some(position));
            })
            .on_touch_moved(move |_, position, _| touch_move.set(Some(position)))
            .on_touch_canceled(move |_, _| touch_cancel.set(None));

        let player = layer.add_entity(
            Entity::new(0.0, -HALF_HEIGHT + 60.0)
                .with_size(PLAYER_SIZE, PLAYER_SIZE)
                .with_color(Color::GREEN)
                .with_element(Rectangle::default())
                .with_update(move |entity, ms, _| {
                    let step = PLAYER_SPEED * ms;
                    let delta = match target.get() {
                        Some(goal) => (goal - entity.position).clamp_length_max(step),
                        None => held.get().direction() * step,
                    };
                    let limit = Vec2::new(HALF_WIDTH, HALF_HEIGHT) - PLAYER_SIZE / 2.0;
                    entity.position = (entity.position + delta).clamp(-limit, limit);
                }),
        );

        // The list owns the spawner, so the spawner only holds it weakly
        let roots = Rc::downgrade(layer.entities());
        let interval = difficulty.spawn_interval_ms();
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut elapsed = 0.0;
        let spawned = score.clone();
        layer.add_entity(Entity::new(0.0, 0.0).with_update(move |_, ms, _| {
            let Some(list) = roots.upgrade() else {
                return;
            };
            elapsed += ms;
            while elapsed >= interval {
                elapsed -= interval;
                let x = rng.random_range(-HALF_WIDTH + ENEMY_SIZE..HALF_WIDTH - ENEMY_SIZE);
                let speed = rng.random_range(0.08..0.22);
                let position = Vec2::new(x, HALF_HEIGHT + ENEMY_SIZE);
                let enemy = enemy(
                    position,
                    speed,
                    player.clone(),
                    roots.clone(),
                    spawned.clone(),
                    hit_sound.clone(),
                );
                list.append(enemy.into());
            }
        }));

        let hud = score.clone();
        layer.add_entity(
            Entity::new(-HALF_WIDTH + 10.0, HALF_HEIGHT - 24.0)
                .with_element(Text::new("", Font::sans(16.0)))
                .with_update(move |entity, _, _| {
                    if let Some(text) = entity.elements.first_mut().and_then(|e| e.as_text_mut()) {
                        text.set_text(format!(
                            "Dodged {}   Hits {}/{}",
                            hud.dodged.get(),
                            hud.hits.get(),
                            MAX_HITS
                        ));
                    }
                }),
        );

        (layer.into_ref(), score)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use radius::actions::StackRequest;
        use radius::assets::ImmediateLoader;
        use radius::audio::{AudioBackend, ClipInstance, MUTED_KEY, SilentBackend};
        use radius::clock::ManualClock;
        use radius::persistence::MemoryStore;
        use radius::scene::update_list;
        use radius::surface::{DrawOp, RecordingSurface};
        use radius::{EngineConfig, Radius};

        /// Counts plays of every instance it creates
        #[derive(Clone, Default)]
        struct CountingBackend {
            plays: Rc<Cell<u32>>,
        }

        struct CountingInstance {
            plays: Rc<Cell<u32>>,
        }

        impl ClipInstance for CountingInstance {
            fn play(&mut self) {
                self.plays.set(self.plays.get() + 1);
            }

            fn ended(&self) -> bool {
                true
            }
        }

        impl AudioBackend for CountingBackend {
            fn create_instance(&self, _source: &str) -> Box<dyn ClipInstance> {
                Box::new(CountingInstance {
                    plays: self.plays.clone(),
                })
            }
        }

        fn media(store: &Rc<MemoryStore>, backend: impl AudioBackend + 'static) -> Media {
            let images = ImageCache::new(ImmediateLoader { size: (128, 48) });
            Media::new(images, AudioSystem::new(backend, store.clone()))
        }

        fn silent_clip() -> Rc<AudioClip> {
            let audio = AudioSystem::new(SilentBackend, Rc::new(MemoryStore::new()));
            Rc::new(AudioClip::new(audio, HIT, true))
        }

        fn engine_with(backend: impl AudioBackend + 'static) -> (Radius<RecordingSurface>, ManualClock, Rc<Session>, Rc<MemoryStore>) {
            let clock = ManualClock::new(0.0);
            let mut radius = Radius::new(RecordingSurface::new(640.0, 480.0), EngineConfig::default(), clock.clone());
            let store = Rc::new(MemoryStore::new());
            let session = Session::new(Difficulty::Normal, 7, media(&store, backend));
            let menu = menu_layer(radius.surface(), session.clone(), store.clone());
            radius.start(menu);
            (radius, clock, session, store)
        }

        fn engine() -> (Radius<RecordingSurface>, ManualClock, Rc<Session>, Rc<MemoryStore>) {
            engine_with(SilentBackend)
        }

        fn press(radius: &Radius<RecordingSurface>, key: Key) {
            radius.input().keys.key(key, true);
            radius.input().keys.key(key, false);
        }

        fn step(radius: &mut Radius<RecordingSurface>, clock: &ManualClock) {
            clock.advance(16.0);
            radius.frame();
        }

        #[test]
        fn test_start_and_escape() {
            let (mut radius, clock, session, _) = engine();
            press(&radius, Key::Enter);
            step(&mut radius, &clock);
            assert_eq!(radius.depth(), 2);
            assert_eq!(session.games.borrow().len(), 1);

            press(&radius, Key::Escape);
            step(&mut radius, &clock);
            assert_eq!(radius.depth(), 1);
        }

        #[test]
        fn test_popped_game_layer_is_freed() {
            let (mut radius, clock, _, _) = engine();
            press(&radius, Key::Enter);
            step(&mut radius, &clock);

            let entities = match radius.top() {
                Some(game) => Rc::downgrade(game.borrow().entities()),
                None => panic!("game layer not pushed"),
            };
            for _ in 0..80 {
                step(&mut radius, &clock);
            }
            // Player, spawner, score line and at least one enemy
            assert!(entities.upgrade().map_or(0, |e| e.len()) > 3);

            press(&radius, Key::Escape);
            step(&mut radius, &clock);
            assert_eq!(radius.depth(), 1);
            assert!(entities.upgrade().is_none());
        }

        #[test]
        fn test_difficulty_choice_is_saved_with_click() {
            let backend = CountingBackend::default();
            let (mut radius, clock, session, store) = engine_with(backend.clone());
            press(&radius, Key::Down);
            press(&radius, Key::Right);
            step(&mut radius, &clock);

            assert_eq!(session.difficulty.get(), Difficulty::Hard);
            assert_eq!(Settings::load(store.as_ref()).difficulty, Difficulty::Hard);
            assert_eq!(backend.plays.get(), 1);

            // Already at the last option: no change, no click
            press(&radius, Key::Right);
            step(&mut radius, &clock);
            assert_eq!(backend.plays.get(), 1);
        }

        #[test]
        fn test_sound_choice_toggles_mute() {
            let (mut radius, clock, session, store) = engine();
            press(&radius, Key::Down);
            press(&radius, Key::Down);
            press(&radius, Key::Right);
            step(&mut radius, &clock);

            assert!(session.media.audio.is_muted());
            assert_eq!(store.get(MUTED_KEY).as_deref(), Some("true"));
        }

        #[test]
        fn test_menu_draws_logo_once_loaded() {
            let (mut radius, clock, session, _) = engine();
            assert!(session.media.ready());
            step(&mut radius, &clock);
            assert!(radius.surface().ops.iter().any(|op| matches!(op, DrawOp::Image { .. })));
        }

        #[test]
        fn test_enemies_spawn_over_time() {
            let (layer, _) = game_layer(Difficulty::Hard, 1, silent_clip());
            let mut actions = Actions::new();
            let config = EngineConfig::default();
            let before = layer.borrow().entities().len();
            for frame in 0..60 {
                layer.borrow_mut().update(frame as f64 * 16.0, &config, &mut actions);
            }
            assert!(layer.borrow().entities().len() > before);
        }

        #[test]
        fn test_final_hit_ends_game() {
            let backend = CountingBackend::default();
            let audio = AudioSystem::new(backend.clone(), Rc::new(MemoryStore::new()));
            let hit = Rc::new(AudioClip::new(audio, HIT, true));

            let roots = Rc::new(EntityList::new());
            let player = EntityRef::new(Entity::new(0.0, 0.0));
            let score = Rc::new(Score::default());
            score.hits.set(MAX_HITS - 1);
            let block = enemy(Vec2::new(5.0, 5.0), 0.0, player, Rc::downgrade(&roots), score.clone(), hit);
            roots.append(block.into());

            let mut actions = Actions::new();
            update_list(&roots, 16.0, &mut actions);

            assert_eq!(score.hits.get(), MAX_HITS);
            assert_eq!(backend.plays.get(), 1);
            // The enemy is gone and its ghost took its place
            assert_eq!(roots.len(), 1);
            assert!(roots.to_vec()[0].borrow().script().is_some());
            assert!(matches!(actions.drain().next(), Some(StackRequest::Pop)));
        }

        #[test]
        fn test_held_keys_move_player() {
            let held = Held {
                left: true,
                up: true,
                ..Default::default()
            };
            let dir = held.direction();
            assert!(dir.x < 0.0 && dir.y > 0.0);
            assert!((dir.length() - 1.0).abs() < 1e-6);
            assert_eq!(Held::default().direction(), Vec2::ZERO);
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod web_main {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use web_sys::HtmlCanvasElement;

    use radius::assets::ImageCache;
    use radius::audio::AudioSystem;
    use radius::clock::SystemClock;
    use radius::persistence::{KeyValueStore, MemoryStore};
    use radius::platform::web::{
        CanvasSurface, HtmlAudioBackend, HtmlImageLoader, LocalStore, run_loop, wire_input,
    };
    use radius::{EngineConfig, Radius, RadiusError, RadiusResult, Settings};

    use crate::avoision::{Media, Session, menu_layer};

    pub fn run() -> RadiusResult<()> {
        log::info!("Avoision starting...");

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| RadiusError::platform("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or_else(|| RadiusError::platform("no canvas"))?
            .dyn_into()
            .map_err(|_| RadiusError::platform("#canvas is not a canvas"))?;

        let elements = Rc::new(RefCell::new(HashMap::new()));
        let surface = CanvasSurface::new(canvas.clone(), elements.clone())?;
        let store: Rc<dyn KeyValueStore> = match LocalStore::new() {
            Ok(store) => Rc::new(store),
            Err(e) => {
                log::warn!("Settings will not persist: {}", e);
                Rc::new(MemoryStore::new())
            }
        };
        let settings = Settings::load(store.as_ref());

        let mut radius = Radius::new(surface, EngineConfig::default(), SystemClock::new());
        wire_input(&canvas, radius.input().clone())?;
        radius.set_fullscreen(settings.fullscreen);

        let media = Media::new(
            ImageCache::new(HtmlImageLoader::new(elements)),
            AudioSystem::new(HtmlAudioBackend, store.clone()),
        );
        let session = Session::new(settings.difficulty, js_sys::Date::now() as u64, media);
        let menu = menu_layer(radius.surface(), session, store);
        radius.start(menu);

        run_loop(Rc::new(RefCell::new(radius)));
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("Failed to init logger: {e}").into());
    }
    if let Err(e) = web_main::run() {
        log::error!("Avoision failed to start: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::rc::Rc;

    use radius::assets::{ImageCache, ImmediateLoader};
    use radius::audio::{AudioSystem, SilentBackend};
    use radius::clock::ManualClock;
    use radius::input::Key;
    use radius::persistence::{KeyValueStore, MemoryStore};
    use radius::surface::RecordingSurface;
    use radius::{EngineConfig, Radius, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    env_logger::init();

    let frames: u64 = std::env::args().nth(1).and_then(|a| a.parse().ok()).unwrap_or(1800);
    log::info!("Avoision (headless) running {} frames", frames);

    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let settings = Settings::load(store.as_ref());
    let clock = ManualClock::new(0.0);
    let mut radius = Radius::new(RecordingSurface::new(1280.0, 720.0), EngineConfig::default(), clock.clone());
    radius.set_fullscreen(settings.fullscreen);

    let media = avoision::Media::new(
        ImageCache::new(ImmediateLoader { size: (128, 48) }),
        AudioSystem::new(SilentBackend, store.clone()),
    );
    let session = avoision::Session::new(settings.difficulty, 0x5eed, media);
    let menu = avoision::menu_layer(radius.surface(), session.clone(), store.clone());
    radius.start(menu);

    // Pick Hard, start, then weave left and right
    let input = radius.input().clone();
    let keys = &input.keys;
    for frame in 0..frames {
        match frame {
            10 => keys.key(Key::Down, true),
            12 => keys.key(Key::Right, true),
            14 => keys.key(Key::Up, true),
            16 => keys.key(Key::Enter, true),
            f if f % 120 == 20 => {
                keys.key(Key::Right, false);
                keys.key(Key::Left, true);
            }
            f if f % 120 == 80 => {
                keys.key(Key::Left, false);
                keys.key(Key::Right, true);
            }
            _ => {}
        }
        clock.advance(FRAME_MS);
        radius.surface_mut().clear_ops();
        radius.frame();
    }

    println!("Frames: {}", radius.frame_count());
    println!("Difficulty: {}", session.difficulty.get().as_str());
    println!("Images ready: {}", session.media.ready());
    for (i, score) in session.games.borrow().iter().enumerate() {
        println!(
            "Game {}: dodged {}, hits {}/{}",
            i + 1,
            score.dodged.get(),
            score.hits.get(),
            avoision::MAX_HITS
        );
    }
    if let Some(top) = radius.top() {
        println!("Showing: {}", top.borrow().name());
    }
}
