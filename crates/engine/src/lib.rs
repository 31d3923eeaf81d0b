use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;

pub use app::{
    clan_hit_image_path, clan_image_path, formation_image_path, home_panel_rect, run_app,
    target_panel_rect, AnimationDef, AppError, AssetCache, AssetKey, AssetStore, AttackSink,
    ChangeKind, ChangeRecord, ClanDirectory, ClanFeed, ClanRecord, ClanVariant, Effect, FxPool,
    InputAction, LoopConfig, MovementFlags, PlayerSprite, PlayerState, Projectile, RectPx,
    SessionInfo, SkillId, SpriteImage, StaticAsset, Viewport,
};

pub const ROOT_ENV_VAR: &str = "CLANFALL_ROOT";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "CLANFALL_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and an assets/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/clanfall\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Resolves the directory that image paths from the remote store are joined
/// against. The feed only ever names relative paths like
/// `images/castle-lv2.gif`; they all live under `<root>/assets/`.
pub fn resolve_asset_root() -> Result<PathBuf, StartupError> {
    let root = resolve_root()?;
    Ok(root.join("assets"))
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml_and_assets() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn repo_marker_accepts_dir_with_both() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        std::fs::create_dir(dir.path().join("assets")).expect("mkdir");
        assert!(is_repo_marker(dir.path()));
    }
}
