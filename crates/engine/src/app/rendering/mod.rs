mod draw;
mod renderer;

pub use renderer::{FrameView, Renderer};

/// Size of the square panel a clan castle is drawn into.
pub const ENTITY_PANEL_SIZE: f32 = 250.0;
/// Inset of the target panel from the canvas's right edge.
pub const TARGET_PANEL_RIGHT_INSET: f32 = 150.0;
/// Left edge of the viewer's own clan panel when no target is selected.
pub const HOME_PANEL_LEFT: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned rectangle in canvas pixels. Doubles as the hitbox for
/// projectile collision tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPx {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Where the selected target sits this tick: pinned toward the right edge,
/// vertically centered. Derived every tick from the canvas size, never stored.
pub fn target_panel_rect(viewport: Viewport) -> RectPx {
    RectPx {
        x: viewport.width as f32 - ENTITY_PANEL_SIZE - TARGET_PANEL_RIGHT_INSET,
        y: viewport.height as f32 / 2.0 - ENTITY_PANEL_SIZE / 2.0,
        width: ENTITY_PANEL_SIZE,
        height: ENTITY_PANEL_SIZE,
    }
}

/// Where the viewer's own clan is drawn when no target is selected. Same
/// panel geometry as the target, parameterized only by screen position.
pub fn home_panel_rect(viewport: Viewport) -> RectPx {
    RectPx {
        x: HOME_PANEL_LEFT,
        y: viewport.height as f32 / 2.0 - ENTITY_PANEL_SIZE / 2.0,
        width: ENTITY_PANEL_SIZE,
        height: ENTITY_PANEL_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_panel_is_pinned_right_and_centered() {
        let rect = target_panel_rect(Viewport {
            width: 1920,
            height: 1080,
        });
        assert_eq!(rect.x, 1920.0 - 250.0 - 150.0);
        assert_eq!(rect.y, 540.0 - 125.0);
        assert_eq!(rect.width, 250.0);
        assert_eq!(rect.height, 250.0);
    }

    #[test]
    fn home_panel_shares_size_with_target_panel() {
        let viewport = Viewport {
            width: 1280,
            height: 720,
        };
        let home = home_panel_rect(viewport);
        let target = target_panel_rect(viewport);
        assert_eq!(home.x, HOME_PANEL_LEFT);
        assert_eq!(home.y, target.y);
        assert_eq!(home.width, target.width);
        assert_eq!(home.height, target.height);
    }
}
