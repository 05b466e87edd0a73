// Build-time name and version from Cargo.toml

/// Package version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// User-Agent sent to the status backend, e.g. `opsboard/0.3.0`.
pub fn user_agent() -> String {
    format!("{NAME}/{VERSION}")
}
