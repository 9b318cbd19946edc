use tracing_subscriber::EnvFilter;

/// initialize global tracing subscriber from config level or env
pub fn init(level: &str) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| map_level(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// verbose flag raises the configured level to debug
pub fn effective_level(configured: &str, verbose: bool) -> String {
    if verbose { "debug".to_string() } else { map_level(configured) }
}

fn map_level(level: &str) -> String {
    match level.trim().to_lowercase().as_str() {
        "error" => "error".into(),
        "warn" | "warning" => "warn".into(),
        "debug" => "debug".into(),
        "trace" => "trace".into(),
        _ => "info".into(),
    }
}
