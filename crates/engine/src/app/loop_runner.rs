use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{resolve_asset_root, StartupError};

use super::animation::{PlayerSprite, PlayerState};
use super::assets::{AssetCache, AssetKey, AssetStore, StaticAsset};
use super::effects::{FxPool, SkillId};
use super::input::ActionStates;
use super::metrics::RateMeter;
use super::movement::{resolve_movement, MovementFlags};
use super::rendering::{target_panel_rect, FrameView, Renderer};
use super::sync::{AttackSink, ChangeRecord, ClanDirectory, ClanFeed};
use super::InputAction;

const PLAYER_SHEET_PATH: &str = "images/player-spritesheet.png";
const PROJECTILE_PATH: &str = "images/projectile.png";
const FLAME_BURST_PATH: &str = "images/flame-burst.png";
const EXPLOSION_PATH: &str = "images/explosion.png";

/// How long the target keeps its hit image after a projectile connects.
const HIT_FLASH_MS: f32 = 200.0;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub max_frame_delta: Duration,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Clanfall".to_string(),
            window_width: 1280,
            window_height: 720,
            max_frame_delta: Duration::from_millis(250),
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

/// Identity the viewer brought from the outer session: who they are and
/// which clan is theirs (refused as an attack target).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub user_id: String,
    pub home_clan_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Runs the render loop until the window closes or Escape is pressed.
///
/// One simulation tick runs per presented frame, in a fixed order: feed
/// batches, target healing, asset completions, edge-triggered commands,
/// movement, animation, projectiles, effects, then the draw. Everything the
/// renderer observes was settled earlier in the same tick.
pub fn run_app(
    config: LoopConfig,
    session: SessionInfo,
    mut feed: Box<dyn ClanFeed>,
    mut attack: Box<dyn AttackSink>,
) -> Result<(), AppError> {
    let asset_root = resolve_asset_root()?;
    info!(
        asset_root = %asset_root.display(),
        user_id = %session.user_id,
        home_clan_id = session.home_clan_id.as_deref().unwrap_or("none"),
        "startup"
    );

    let mut cache = AssetCache::new(asset_root);
    cache.request(AssetKey::Static(StaticAsset::PlayerSheet), PLAYER_SHEET_PATH);
    cache.request(AssetKey::Static(StaticAsset::Projectile), PROJECTILE_PATH);
    cache.request(AssetKey::Static(StaticAsset::FlameBurst), FLAME_BURST_PATH);
    cache.request(AssetKey::Static(StaticAsset::Explosion), EXPLOSION_PATH);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_for_loop = Arc::clone(&window);
    let mut renderer = Renderer::new(window).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    info!(
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut player = PlayerSprite::new(Instant::now(), renderer.viewport().height);
    let mut directory = ClanDirectory::new(session.home_clan_id.clone());
    let mut fx = FxPool::default();
    let mut meter = RateMeter::new(metrics_log_interval);
    let mut pending_batches: Vec<Vec<ChangeRecord>> = Vec::new();
    let mut hit_flash_ms = 0.0f32;
    let mut last_frame_instant = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        // The stage re-centers around the new height and the
                        // actor returns to its anchored left-edge position.
                        player.rehome(new_size.height);
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        player.rehome(size.height);
                    }
                    WindowEvent::CursorLeft { .. } => {
                        input_collector.release_movement();
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        input_collector.handle_mouse_input(button, state);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;
                        let frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                        let frame_ms = frame_dt.as_secs_f32() * 1000.0;

                        feed.poll_batches(&mut pending_batches);
                        for batch in pending_batches.drain(..) {
                            directory.apply_batch(&batch, &mut cache);
                        }
                        directory.heal_target();
                        cache.pump();

                        if input_collector.take_cycle_target_pressed() {
                            match directory.cycle_target() {
                                Some(target_id) => info!(target_id, "target_selected"),
                                None => debug!("no_selectable_target"),
                            }
                        }
                        if input_collector.take_return_home_pressed() {
                            directory.clear_target();
                            player.rehome(renderer.viewport().height);
                            info!("returned_home");
                        }
                        if input_collector.take_attack_pressed() {
                            // Optimistic: animation and projectile fire
                            // immediately; the remote command follows.
                            player.request_state(PlayerState::Attack);
                            fx.fire(player.rect(), SkillId::Basic);
                            match directory.current_target_id() {
                                Some(target_id) => {
                                    info!(target_id, "attack_sent");
                                    attack.send_attack(target_id);
                                }
                                None => debug!("attack_without_target"),
                            }
                        }

                        let viewport = renderer.viewport();
                        let flags = input_collector.movement_flags();
                        let target_left_edge = directory
                            .current_target()
                            .map(|_| target_panel_rect(viewport).x);
                        let moved = resolve_movement(
                            &mut player,
                            flags,
                            viewport.width,
                            viewport.height,
                            target_left_edge,
                        );
                        if player.state() != PlayerState::Attack {
                            player.request_state(if moved {
                                PlayerState::Moving
                            } else {
                                PlayerState::Idle
                            });
                        }
                        player.advance_animation(now);

                        let target_hitbox = directory
                            .current_target()
                            .map(|_| target_panel_rect(viewport));
                        let hits = fx.advance_projectiles(target_hitbox, viewport.width as f32);
                        if hits > 0 {
                            hit_flash_ms = HIT_FLASH_MS;
                        } else {
                            hit_flash_ms = (hit_flash_ms - frame_ms).max(0.0);
                        }
                        fx.advance_effects(frame_ms);

                        let view = FrameView {
                            player: &player,
                            directory: &directory,
                            fx: &fx,
                            assets: &cache,
                            target_hit_flash: hit_flash_ms > 0.0,
                        };
                        if let Err(error) = renderer.render(&view) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                            return;
                        }

                        meter.record_frame(raw_frame_dt);
                        meter.record_tick();
                        if let Some(rates) = meter.maybe_rates(now) {
                            info!(
                                fps = rates.fps,
                                tps = rates.tps,
                                frame_time_ms = rates.avg_frame_ms,
                                clan_count = directory.clan_count(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Collects window events between ticks. Held keys never re-fire their
/// command edges; movement keys expose level state instead.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    space_is_down: bool,
    left_mouse_is_down: bool,
    attack_pressed_edge: bool,
    home_key_is_down: bool,
    return_home_pressed_edge: bool,
    cycle_key_is_down: bool,
    cycle_target_pressed_edge: bool,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::MoveUp, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveDown, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space) => {
                self.handle_attack_key_state(key_event.state);
            }
            PhysicalKey::Code(KeyCode::KeyH) => {
                self.handle_home_key_state(key_event.state);
            }
            PhysicalKey::Code(KeyCode::Tab) => {
                self.handle_cycle_key_state(key_event.state);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }

    fn handle_attack_key_state(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.space_is_down {
                    self.attack_pressed_edge = true;
                }
                self.space_is_down = true;
            }
            ElementState::Released => self.space_is_down = false,
        }
    }

    fn handle_home_key_state(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.home_key_is_down {
                    self.return_home_pressed_edge = true;
                }
                self.home_key_is_down = true;
            }
            ElementState::Released => self.home_key_is_down = false,
        }
    }

    fn handle_cycle_key_state(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.cycle_key_is_down {
                    self.cycle_target_pressed_edge = true;
                }
                self.cycle_key_is_down = true;
            }
            ElementState::Released => self.cycle_key_is_down = false,
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.left_mouse_is_down {
                    self.attack_pressed_edge = true;
                }
                self.left_mouse_is_down = true;
            }
            ElementState::Released => self.left_mouse_is_down = false,
        }
    }

    /// Pointer leaving the canvas releases held movement, matching the
    /// release that would have fired had the cursor stayed inside.
    fn release_movement(&mut self) {
        for action in [
            InputAction::MoveUp,
            InputAction::MoveDown,
            InputAction::MoveLeft,
            InputAction::MoveRight,
        ] {
            self.action_states.set(action, false);
        }
    }

    fn movement_flags(&self) -> MovementFlags {
        self.action_states.movement_flags()
    }

    fn take_attack_pressed(&mut self) -> bool {
        let was_pressed = self.attack_pressed_edge;
        self.attack_pressed_edge = false;
        was_pressed
    }

    fn take_return_home_pressed(&mut self) -> bool {
        let was_pressed = self.return_home_pressed_edge;
        self.return_home_pressed_edge = false;
        was_pressed
    }

    fn take_cycle_target_pressed(&mut self) -> bool {
        let was_pressed = self.cycle_target_pressed_edge;
        self.cycle_target_pressed_edge = false;
        was_pressed
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn zero_durations_fall_back_to_defaults() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), Duration::from_secs(1)),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn attack_edge_fires_once_per_press() {
        let mut input = InputCollector::default();

        input.handle_attack_key_state(ElementState::Pressed);
        assert!(input.take_attack_pressed());
        assert!(!input.take_attack_pressed());

        input.handle_attack_key_state(ElementState::Pressed);
        assert!(!input.take_attack_pressed());

        input.handle_attack_key_state(ElementState::Released);
        input.handle_attack_key_state(ElementState::Pressed);
        assert!(input.take_attack_pressed());
    }

    #[test]
    fn left_click_shares_the_attack_edge() {
        let mut input = InputCollector::default();

        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.take_attack_pressed());

        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(!input.take_attack_pressed());

        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        assert!(!input.take_attack_pressed());
    }

    #[test]
    fn held_home_key_does_not_spam_edges() {
        let mut input = InputCollector::default();

        input.handle_home_key_state(ElementState::Pressed);
        assert!(input.take_return_home_pressed());

        input.handle_home_key_state(ElementState::Pressed);
        assert!(!input.take_return_home_pressed());

        input.handle_home_key_state(ElementState::Released);
        input.handle_home_key_state(ElementState::Pressed);
        assert!(input.take_return_home_pressed());
    }

    #[test]
    fn cycle_edge_fires_once_per_press() {
        let mut input = InputCollector::default();

        input.handle_cycle_key_state(ElementState::Pressed);
        assert!(input.take_cycle_target_pressed());
        input.handle_cycle_key_state(ElementState::Pressed);
        assert!(!input.take_cycle_target_pressed());
    }

    #[test]
    fn cursor_leave_releases_held_movement() {
        let mut input = InputCollector::default();
        input.action_states.set(InputAction::MoveUp, true);
        input.action_states.set(InputAction::MoveRight, true);

        input.release_movement();

        let flags = input.movement_flags();
        assert!(!flags.any());
    }
}
