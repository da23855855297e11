// =============================================================================
// TIDESWAP v1.2 - Error Types
// =============================================================================

/// Errors surfaced by swap construction, auditing and networking.
///
/// Several message strings are asserted on by downstream consumers and
/// must stay stable (see the tests in `swaps`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapError {
    /// Malformed, empty or non-matching contract script or transaction
    Validation(String),
    /// Insufficient input value for the requested swap amount
    Funding(String),
    /// No signing capability available for an input
    Signing(String),
    /// Refund attempted before the contract locktime
    Timing(String),
    /// Connection or DNS failure while reaching the network
    Network(String),
    /// Unparseable or unexpected wire message, or unextractable secret
    Protocol(String),
}

impl std::fmt::Display for SwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapError::Validation(msg)
            | SwapError::Funding(msg)
            | SwapError::Signing(msg)
            | SwapError::Timing(msg)
            | SwapError::Network(msg)
            | SwapError::Protocol(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SwapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_message() {
        let err = SwapError::Signing("Cannot sign transaction without a wallet.".to_string());
        assert_eq!(err.to_string(), "Cannot sign transaction without a wallet.");
    }
}
