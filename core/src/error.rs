use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error in service file line {line}: {message}")]
    ServiceFile { line: usize, message: String },

    #[error("Unknown service {name}")]
    UnknownService { name: String },

    #[error("Failed to spawn thread '{name}': {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Client {client} panicked before reporting completion")]
    WorkerPanicked { client: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;
