use tracing_subscriber::EnvFilter;

// Only binaries should call this; the library crates just emit `tracing` events and leave the
// choice of subscriber to whoever is running them.
//
// Logs go to stderr so that stdout stays reserved for the event stream.
pub fn setup(env_filter: &str) {
    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_env_filter(filter)
        .compact()
        .init();
}

const DEFAULT_LOG_FILTER: &str = "info";
