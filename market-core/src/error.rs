//! Error types for contract reads and writes

use thiserror::Error;

/// Failure of a single read-only contract call
///
/// Reads are never retried where they fail; the aggregator decides what a
/// failure means for the snapshot being built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Call rejected by node: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ReadError {
    pub fn transport(msg: impl Into<String>) -> Self {
        ReadError::Transport(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        ReadError::Rejected(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ReadError::Malformed(msg.into())
    }
}

/// Result type alias for contract reads
pub type ReadResult<T> = Result<T, ReadError>;

/// Failure of a user-initiated transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("Failed to submit transaction: {0}")]
    Submit(String),

    #[error("Failed to obtain receipt: {0}")]
    Receipt(String),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_messages() {
        assert_eq!(
            ReadError::transport("connection refused").to_string(),
            "Transport error: connection refused"
        );
        assert_eq!(
            ReadError::rejected("execution reverted").to_string(),
            "Call rejected by node: execution reverted"
        );
    }

    #[test]
    fn test_write_error_reverted() {
        let err = WriteError::Reverted {
            tx_hash: "0xabc".to_string(),
        };
        assert_eq!(err.to_string(), "Transaction 0xabc reverted");
    }
}
