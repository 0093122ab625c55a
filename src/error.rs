use ethers::providers::ProviderError;

/// Errors produced while resolving names.
///
/// Only a subset ever reaches callers of [`crate::Web3Name`]: timeouts and
/// caller-misuse errors (bad names, bad addresses). Everything else is a
/// per-candidate failure that the resolver logs and treats as "not found".
#[derive(Debug, thiserror::Error)]
pub enum Web3NameError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid RPC url {url}: {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("TLD not found: {0}")]
    TldNotFound(String),

    #[error("Resolver not found")]
    ResolverNotFound,

    #[error("Operation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("RPC request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{ecosystem} lookup failed: {reason}")]
    Adapter { ecosystem: &'static str, reason: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Web3NameError {
    /// Deadline expiry, or a call aborted because its deadline fired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }

    /// Errors that must escape the candidate loops instead of being
    /// swallowed as "no match".
    pub fn is_fatal(&self) -> bool {
        self.is_timeout() || matches!(self, Self::InvalidName(_) | Self::InvalidAddress(_))
    }

    pub(crate) fn adapter(ecosystem: &'static str, reason: impl ToString) -> Self {
        Self::Adapter {
            ecosystem,
            reason: reason.to_string(),
        }
    }
}

impl From<ethers::abi::Error> for Web3NameError {
    fn from(err: ethers::abi::Error) -> Self {
        Self::Abi(err.to_string())
    }
}

impl From<ethers::abi::AbiError> for Web3NameError {
    fn from(err: ethers::abi::AbiError) -> Self {
        Self::Abi(err.to_string())
    }
}

impl From<ethers::abi::InvalidOutputType> for Web3NameError {
    fn from(err: ethers::abi::InvalidOutputType) -> Self {
        Self::Abi(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Web3NameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = Web3NameError::Timeout { after_ms: 250 };
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_timeout());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_lookup_failures_are_not_fatal() {
        assert!(!Web3NameError::ResolverNotFound.is_fatal());
        assert!(!Web3NameError::TldNotFound("zeta".into()).is_fatal());
        assert!(!Web3NameError::adapter("lens", "boom").is_fatal());
        assert!(Web3NameError::InvalidName("".into()).is_fatal());
    }
}
