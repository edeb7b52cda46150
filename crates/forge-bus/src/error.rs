use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus transport closed")]
    Closed,
    #[error("subscriber lagged, {0} events dropped")]
    Lagged(u64),
    #[error("bus transport error: {0}")]
    Transport(String),
}
