use super::animation::PlayerSprite;

/// Top strip reserved for UI chrome; the actor never moves into it.
pub const TOP_MARGIN: f32 = 120.0;
/// Gap kept between the actor and a selected target's left edge.
pub const TARGET_SAFE_ZONE: f32 = 50.0;

/// Four independent directional flags. Setting or clearing a flag has no
/// immediate effect; it only changes what the next tick's clamp computes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementFlags {
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Applies one tick of movement, clamped against the canvas edges and the
/// selected target's left edge. `target_left_edge` is `Some` only when a
/// target is selected and has been positioned on screen.
///
/// Returns whether net displacement occurred, so the caller can pick between
/// idle and moving animation requests (attack is never overridden by this).
pub fn resolve_movement(
    player: &mut PlayerSprite,
    flags: MovementFlags,
    canvas_width: u32,
    canvas_height: u32,
    target_left_edge: Option<f32>,
) -> bool {
    let before = (player.x, player.y);

    if flags.up {
        player.y = (player.y - player.speed).max(TOP_MARGIN);
    }
    if flags.down {
        player.y = (player.y + player.speed).min(canvas_height as f32 - player.height);
    }
    if flags.left {
        player.x = (player.x - player.speed).max(0.0);
    }
    if flags.right {
        let mut right_boundary = canvas_width as f32 - player.width;
        if let Some(edge) = target_left_edge {
            right_boundary = right_boundary.min(edge - player.width - TARGET_SAFE_ZONE);
        }
        player.x = (player.x + player.speed).min(right_boundary);
    }

    (player.x, player.y) != before
}
