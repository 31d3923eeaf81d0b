use std::time::{Duration, Instant};

use super::rendering::RectPx;

pub const PLAYER_WIDTH: f32 = 150.0;
pub const PLAYER_HEIGHT: f32 = 150.0;
pub const PLAYER_SPEED: f32 = 4.0;
pub const PLAYER_HOME_X: f32 = 50.0;
pub const SHEET_FRAME_WIDTH: u32 = 1024;
pub const FRAME_INTERVAL: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Moving,
    Attack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationDef {
    pub start_frame: u32,
    pub end_frame: u32,
    pub loops: bool,
}

/// The full transition table. One-shot states fall back to `Idle` when their
/// frame range is exhausted.
pub const fn animation_def(state: PlayerState) -> AnimationDef {
    match state {
        PlayerState::Idle => AnimationDef {
            start_frame: 0,
            end_frame: 2,
            loops: true,
        },
        PlayerState::Moving => AnimationDef {
            start_frame: 3,
            end_frame: 4,
            loops: true,
        },
        PlayerState::Attack => AnimationDef {
            start_frame: 5,
            end_frame: 7,
            loops: false,
        },
    }
}

/// The session-singleton actor: position, movement speed and the frame-timing
/// state machine over the shared spritesheet.
#[derive(Debug, Clone)]
pub struct PlayerSprite {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    state: PlayerState,
    current_frame: u32,
    last_frame_advance: Instant,
    frame_interval: Duration,
}

impl PlayerSprite {
    pub fn new(now: Instant, canvas_height: u32) -> Self {
        Self {
            x: PLAYER_HOME_X,
            y: canvas_height as f32 / 2.0,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            speed: PLAYER_SPEED,
            state: PlayerState::Idle,
            current_frame: animation_def(PlayerState::Idle).start_frame,
            last_frame_advance: now,
            frame_interval: FRAME_INTERVAL,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn rect(&self) -> RectPx {
        RectPx {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Horizontal pixel offset of the active frame within the spritesheet.
    pub fn sheet_source_x(&self) -> u32 {
        self.current_frame * SHEET_FRAME_WIDTH
    }

    /// Requesting the active state is a no-op so held input never resets the
    /// frame index. Any other state snaps to its start frame.
    pub fn request_state(&mut self, next: PlayerState) {
        if self.state == next {
            return;
        }
        self.state = next;
        self.current_frame = animation_def(next).start_frame;
    }

    /// Advances the frame index by wall-clock time. Looping states wrap;
    /// one-shot states hand control back to `Idle` once exhausted.
    pub fn advance_animation(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_frame_advance) < self.frame_interval {
            return;
        }
        self.last_frame_advance = now;
        self.current_frame += 1;

        let def = animation_def(self.state);
        if self.current_frame > def.end_frame {
            if def.loops {
                self.current_frame = def.start_frame;
            } else {
                self.request_state(PlayerState::Idle);
            }
        }
    }

    /// Resize handling re-centers the actor vertically and returns it to the
    /// home column; nothing else about the session changes.
    pub fn rehome(&mut self, canvas_height: u32) {
        self.x = PLAYER_HOME_X;
        self.y = canvas_height as f32 / 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> (PlayerSprite, Instant) {
        let now = Instant::now();
        (PlayerSprite::new(now, 720), now)
    }

    fn tick(player: &mut PlayerSprite, now: Instant, intervals: u32) -> Instant {
        let mut t = now;
        for _ in 0..intervals {
            t += FRAME_INTERVAL + Duration::from_millis(1);
            player.advance_animation(t);
        }
        t
    }

    #[test]
    fn requesting_active_state_keeps_frame_index() {
        let (mut player, now) = player();
        tick(&mut player, now, 1);
        let frame = player.current_frame();

        player.request_state(PlayerState::Idle);
        assert_eq!(player.current_frame(), frame);
    }

    #[test]
    fn requesting_other_state_resets_to_its_start_frame() {
        let (mut player, _) = player();
        player.request_state(PlayerState::Moving);
        assert_eq!(player.state(), PlayerState::Moving);
        assert_eq!(
            player.current_frame(),
            animation_def(PlayerState::Moving).start_frame
        );
    }

    #[test]
    fn looping_state_wraps_to_start_frame() {
        let (mut player, now) = player();
        // Idle spans frames 0..=2; the fourth advance wraps.
        tick(&mut player, now, 3);
        assert_eq!(player.current_frame(), 0);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn one_shot_attack_returns_to_idle_without_intervention() {
        let (mut player, now) = player();
        player.request_state(PlayerState::Attack);

        let def = animation_def(PlayerState::Attack);
        let frames_in_range = def.end_frame - def.start_frame + 1;
        tick(&mut player, now, frames_in_range);

        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(
            player.current_frame(),
            animation_def(PlayerState::Idle).start_frame
        );
    }

    #[test]
    fn advance_before_interval_elapses_is_a_no_op() {
        let (mut player, now) = player();
        let frame = player.current_frame();
        player.advance_animation(now + Duration::from_millis(10));
        assert_eq!(player.current_frame(), frame);
    }

    #[test]
    fn sheet_source_x_follows_frame_index() {
        let (mut player, _) = player();
        player.request_state(PlayerState::Attack);
        assert_eq!(player.sheet_source_x(), 5 * SHEET_FRAME_WIDTH);
    }

    #[test]
    fn rehome_recenters_vertically_only() {
        let (mut player, _) = player();
        player.x = 400.0;
        player.y = 10.0;
        player.rehome(600);
        assert_eq!(player.x, PLAYER_HOME_X);
        assert_eq!(player.y, 300.0);
    }
}
