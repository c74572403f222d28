use thiserror::Error;

/// Error taxonomy for the rebalance engine (kinds, not wire codes). The
/// attempt loop and `main` convert these into `anyhow::Result`/process exit
/// codes at the boundary; everything below the boundary matches on these
/// variants directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RebalanceError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("route query deadline exceeded")]
    RouteTimeout,

    #[error("no routes available")]
    NoRoutes,

    #[error("no candidate channel pairs")]
    NoCandidatePairs,

    #[error("route uses a recently failed node pair")]
    RouteUsesFailedPair,

    #[error("last hop fee exceeds configured limit")]
    LastHopFeeExceeded,

    #[error("computed fee budget is negative")]
    FeeBudgetNegative,

    #[error("route fee {route_fee_msat} exceeds budget {max_fee_msat}")]
    FeeExceeded { route_fee_msat: u64, max_fee_msat: u64 },

    #[error("hop failure {code} at hop {index}")]
    HopFailure { code: String, index: i32 },

    #[error("malformed failure index {index} for route with {hops} hops")]
    MalformedFailure { index: i32, hops: usize },

    /// Internal sentinel: the caller should rebuild the route at `amount_sat`
    /// and retry the payment.
    #[error("retry with amount {amount_sat} sat")]
    RetryWith { amount_sat: u64 },

    #[error("probe failed to find a feasible amount")]
    ProbeFailed,

    #[error("probe deadline exceeded")]
    ProbeTimeout,

    #[error("persistent cache schema mismatch, resetting to empty")]
    CacheSchemaMismatch,

    #[error("attempt deadline exceeded")]
    AttemptTimeout,

    #[error("session deadline exceeded")]
    SessionTimeout,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RebalanceError {
    /// Whether the attempt loop should simply try another pair/route rather
    /// than terminate the session.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RebalanceError::Transport(_)
                | RebalanceError::RouteUsesFailedPair
                | RebalanceError::LastHopFeeExceeded
                | RebalanceError::FeeBudgetNegative
                | RebalanceError::FeeExceeded { .. }
                | RebalanceError::HopFailure { .. }
                | RebalanceError::MalformedFailure { .. }
        )
    }
}
