use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

/// Forward-only transaction lifecycle. `paid` is terminal and is never
/// overwritten; `cancelled` and `expired` are terminal too but a late payment
/// confirmation still wins over `expired` (money was collected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Paid,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Cartao,
}

/// One checkout attempt. `numeros_comprados` is stored by value (JSON array),
/// not as a foreign key; the sale finalizer keeps it in sync with the
/// inventory when the transaction reaches `paid`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub numeros_comprados: Json<Vec<i64>>,
    pub valor_total: i64,
    pub metodo_pagamento: PaymentMethod,
    pub status: TransactionStatus,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub data_pagamento: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: String,
    pub user_id: String,
    pub numeros_comprados: Vec<i64>,
    pub valor_total: i64,
    pub metodo_pagamento: PaymentMethod,
    pub status: TransactionStatus,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub data_pagamento: Option<DateTime<Utc>>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            numeros_comprados: t.numeros_comprados.0,
            valor_total: t.valor_total,
            metodo_pagamento: t.metodo_pagamento,
            status: t.status,
            payment_id: t.payment_id,
            created_at: t.created_at,
            data_pagamento: t.data_pagamento,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCheckoutRequest {
    pub numeros: Vec<i64>,
    pub metodo_pagamento: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub transaction_id: String,
    pub payment_id: String,
    pub valor_total: i64,
    pub metodo_pagamento: PaymentMethod,
    /// PIX copy-paste code, present for PIX checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_copia_cola: Option<String>,
    /// Base64 QR code image, present for PIX checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    /// Hosted payment page, present for card checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}
