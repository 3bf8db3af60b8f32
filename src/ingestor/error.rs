use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Feed transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Gave up on feed {address} after {attempts} reconnect attempts")]
    RetriesExhausted { address: String, attempts: u32 },

    #[error("Processing queue closed; no longer reading the feed")]
    QueueClosed,
}
