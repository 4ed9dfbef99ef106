//! Logging setup. A thin wrapper around `env_logger` so binaries and tests get the
//! same filter defaults instead of poking process-wide state ad hoc.

use std::str::FromStr;

/// Sets up `env_logger` with `max_log_level` applied to this crate (and any extra
/// `modules`), `warn` everywhere else. `RUST_LOG`/`RUST_LOG_STYLE`, if set, win.
pub fn init_logging(max_log_level: &str, mut modules: Vec<&str>) -> Result<(), String> {
    let mut builder = env_logger::Builder::new();
    builder.filter(None, log::LevelFilter::Warn);

    let max_log_level = log::LevelFilter::from_str(&max_log_level.to_ascii_uppercase())
        .map_err(|_| format!("The provided max-log-level {} is not supported.", max_log_level))?;
    modules.push(env!("CARGO_PKG_NAME"));
    for module in modules {
        builder.filter(Some(module), max_log_level);
    }

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if let Ok(write_style) = std::env::var("RUST_LOG_STYLE") {
        builder.parse_write_style(&write_style);
    }

    builder.init();
    Ok(())
}
