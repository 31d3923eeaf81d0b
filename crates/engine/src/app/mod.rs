mod animation;
mod assets;
mod effects;
mod input;
mod loop_runner;
mod metrics;
mod movement;
mod rendering;
mod sync;

pub use animation::{AnimationDef, PlayerSprite, PlayerState};
pub use assets::{AssetCache, AssetKey, AssetStore, ClanVariant, SpriteImage, StaticAsset};
pub use effects::{Effect, FxPool, Projectile, SkillId};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SessionInfo};
pub use movement::MovementFlags;
pub use rendering::{home_panel_rect, target_panel_rect, RectPx, Renderer, Viewport};
pub use sync::{
    clan_hit_image_path, clan_image_path, formation_image_path, AttackSink, ChangeKind,
    ChangeRecord, ClanDirectory, ClanFeed, ClanRecord,
};
