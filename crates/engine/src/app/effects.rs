use super::rendering::RectPx;

pub const PROJECTILE_WIDTH: f32 = 40.0;
pub const PROJECTILE_HEIGHT: f32 = 20.0;
pub const PROJECTILE_SPEED: f32 = 20.0;
pub const IMPACT_LIFETIME_MS: f32 = 300.0;

/// Which attack skill fired a projectile; affects only the rendered sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillId {
    Basic,
    FlameBurst,
}

#[derive(Debug, Clone, Copy)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub skill: SkillId,
}

impl Projectile {
    fn leading_edge(&self) -> f32 {
        self.x + self.width
    }

    fn vertical_midpoint(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// An impact burst decaying linearly; drawn centered on the impact point
/// with alpha = remaining / total.
#[derive(Debug, Clone, Copy)]
pub struct Effect {
    pub center_x: f32,
    pub center_y: f32,
    pub remaining_ms: f32,
    pub total_ms: f32,
}

impl Effect {
    pub fn alpha(&self) -> f32 {
        (self.remaining_ms / self.total_ms).max(0.0)
    }
}

/// Transient visual entities with independent lifetimes. Purely presentational:
/// nothing here carries game-logic authority.
#[derive(Debug, Default)]
pub struct FxPool {
    pub projectiles: Vec<Projectile>,
    pub effects: Vec<Effect>,
}

impl FxPool {
    /// Spawns a projectile at the actor's leading edge, vertically centered,
    /// moving toward the opposing side.
    pub fn fire(&mut self, origin: RectPx, skill: SkillId) {
        self.projectiles.push(Projectile {
            x: origin.x + origin.width,
            y: origin.y + origin.height / 2.0 - PROJECTILE_HEIGHT / 2.0,
            width: PROJECTILE_WIDTH,
            height: PROJECTILE_HEIGHT,
            speed: PROJECTILE_SPEED,
            skill,
        });
    }

    /// Advances every projectile one tick and resolves collisions against the
    /// current target's hitbox. A hit spawns an impact effect and removes the
    /// projectile on the same tick; leaving the canvas (or flying with no
    /// target selected) removes it silently. Returns the number of hits.
    pub fn advance_projectiles(&mut self, target_hitbox: Option<RectPx>, canvas_width: f32) -> u32 {
        let mut hits = 0;
        let effects = &mut self.effects;
        self.projectiles.retain_mut(|projectile| {
            projectile.x += projectile.speed;

            if let Some(hitbox) = target_hitbox {
                let mid = projectile.vertical_midpoint();
                let collided = projectile.leading_edge() > hitbox.x
                    && mid > hitbox.y
                    && mid < hitbox.y + hitbox.height;
                if collided {
                    hits += 1;
                    effects.push(Effect {
                        center_x: projectile.leading_edge(),
                        center_y: projectile.vertical_midpoint(),
                        remaining_ms: IMPACT_LIFETIME_MS,
                        total_ms: IMPACT_LIFETIME_MS,
                    });
                    return false;
                }
            }

            projectile.x <= canvas_width
        });
        hits
    }

    /// Decays effects by elapsed time and drops them exactly at zero life,
    /// before a negative alpha could ever be drawn.
    pub fn advance_effects(&mut self, frame_ms: f32) {
        self.effects.retain_mut(|effect| {
            effect.remaining_ms -= frame_ms;
            effect.remaining_ms > 0.0
        });
    }
}
