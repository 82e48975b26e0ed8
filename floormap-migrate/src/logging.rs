use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "floormap_migrate=info";

/// Install the global fmt subscriber; `RUST_LOG` overrides the default filter.
///
/// Logs go to stderr so they do not interleave with the prompts on stdout.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // a subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
