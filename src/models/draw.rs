use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DrawRecord {
    pub id: i64,
    pub numero: i64,
    pub winner_user_id: String,
    pub drawn_at: DateTime<Utc>,
}
