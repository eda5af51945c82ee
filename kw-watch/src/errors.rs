pub use kw_core::errors::*;

err_impl! {pub WatchError,
    #[error("watcher is already running ({0} active watch loops)")]
    AlreadyRunning(usize),

    #[error("could not configure cluster client: {0}")]
    ClientConfiguration(String),

    #[error("could not open watch: {0}")]
    ConnectionFailed(String),

    #[error("resource discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("resource type is not served by this cluster: {0}")]
    UnsupportedResource(String),
}

impl WatchError {
    pub fn is_unsupported_resource(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<WatchError>(), Some(WatchError::UnsupportedResource(_)))
    }

    pub fn is_already_running(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<WatchError>(), Some(WatchError::AlreadyRunning(_)))
    }
}
