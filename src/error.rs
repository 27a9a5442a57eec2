use thiserror::Error;

/// Errors reported by the flow and matching graph builders.
///
/// Every variant is a contract violation by the caller, not a transient
/// condition: the algorithms themselves are total for valid inputs and
/// never fail once a graph has been constructed correctly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A node index fell outside `[0, size)` for its graph.
    #[error("vertex {index} out of range for graph of size {size}")]
    InvalidVertex { index: usize, size: usize },

    /// An edge was added with a negative capacity.
    #[error("negative capacity {0}")]
    InvalidCapacity(i64),

    /// The graph could not be constructed from the given parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The computation was already run on this graph, which consumes it.
    /// Build a fresh instance for an independent computation.
    #[error("graph already consumed by a previous computation")]
    AlreadyComputed,
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn check_vertex(index: usize, size: usize) -> Result<()> {
        if index >= size {
            return Err(Error::InvalidVertex { index, size });
        }
        Ok(())
    }

    pub(crate) fn check_capacity(capacity: i64) -> Result<()> {
        if capacity < 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
