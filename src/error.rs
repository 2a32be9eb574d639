use thiserror::Error;

/// Failure taxonomy of the engine. There is no retry policy at this layer:
/// every variant is fatal to the run that raised it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A vertex compute call failed. Aborts the whole superstep and hence the
    /// run; vertex mutations already applied in the failing superstep are not
    /// rolled back.
    #[error("compute fault at vertex {vertex} in superstep {superstep}: {message}")]
    ComputeFault {
        vertex: i64,
        superstep: i64,
        message: String,
    },

    /// Aggregating into an unregistered name, registering after superstep 0,
    /// or combining values of the wrong type.
    #[error("accumulator misuse: {0}")]
    AccumulatorMisuse(String),

    #[error("malformed input record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
