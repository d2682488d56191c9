use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a raffle number. `vendido` is terminal: no code path may move
/// a sold number back to any other status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NumberStatus {
    Disponivel,
    Reservado,
    Vendido,
}

/// One row of the fixed 1..=130 pool. Reservation columns are populated iff
/// status is `reservado`, sale columns iff `vendido`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RaffleNumber {
    pub numero: i64,
    pub status: NumberStatus,
    pub reserved_by: Option<String>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub reservation_expires_at: Option<DateTime<Utc>>,
    pub sold_to: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
}

/// Per-status counts shown on the organizer dashboard.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventorySummary {
    pub disponiveis: i64,
    pub reservados: i64,
    pub vendidos: i64,
}
