use clanfall_engine::{run_app, LoopConfig, SessionInfo};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod feed;

const FEED_ADDR_ENV_VAR: &str = "CLANFALL_FEED_ADDR";
const USER_ID_ENV_VAR: &str = "CLANFALL_USER_ID";
const HOME_CLAN_ENV_VAR: &str = "CLANFALL_HOME_CLAN";

const DEFAULT_FEED_ADDR: &str = "127.0.0.1:46100";
const DEFAULT_USER_ID: &str = "guest";

fn main() {
    init_tracing();
    info!("=== Clanfall Startup ===");

    let session = SessionInfo {
        user_id: resolve_user_id(),
        home_clan_id: resolve_home_clan_id(),
    };
    let feed_addr = resolve_feed_addr();
    info!(
        feed_addr = %feed_addr,
        user_id = %session.user_id,
        home_clan_id = session.home_clan_id.as_deref().unwrap_or("none"),
        "session_resolved"
    );

    let (batch_feed, attack_commander) =
        feed::spawn_remote_store(feed_addr, session.user_id.clone());

    let config = LoopConfig::default();
    if let Err(err) = run_app(
        config,
        session,
        Box::new(batch_feed),
        Box::new(attack_commander),
    ) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_feed_addr() -> String {
    non_empty_env(FEED_ADDR_ENV_VAR).unwrap_or_else(|| DEFAULT_FEED_ADDR.to_string())
}

fn resolve_user_id() -> String {
    match non_empty_env(USER_ID_ENV_VAR) {
        Some(user_id) => user_id,
        None => {
            warn!(
                env_var = USER_ID_ENV_VAR,
                fallback = DEFAULT_USER_ID,
                "user id not set; using fallback"
            );
            DEFAULT_USER_ID.to_string()
        }
    }
}

fn resolve_home_clan_id() -> Option<String> {
    non_empty_env(HOME_CLAN_ENV_VAR)
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
