use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveRequest {
    pub numeros: Vec<i64>,
}

/// Why a requested number was not granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Sold, or reserved by another user with a live expiry.
    Unavailable,
    /// Granting it would put the user over the per-user cap.
    CapExceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RejectedNumber {
    pub numero: i64,
    pub reason: RejectReason,
}

/// Partition of a reservation request. `success` is true only when every
/// requested number was granted; partial grants are a normal outcome the
/// caller must surface to the user, not an error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveOutcome {
    pub success: bool,
    pub granted: Vec<i64>,
    pub rejected: Vec<RejectedNumber>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReleaseResponse {
    pub released: u64,
}
