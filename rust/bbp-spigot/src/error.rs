use hexpi_core::ConfigError;

/// Failures of a digit-extraction run.
#[derive(Debug, thiserror::Error)]
pub enum SpigotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker thread {index}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread {index} panicked")]
    WorkerPanicked { index: usize },
}
