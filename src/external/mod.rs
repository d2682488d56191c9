pub mod card;
pub mod pix;

pub use card::*;
pub use pix::*;

use crate::error::{AppError, AppResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// Provider-agnostic result of a create-charge call. Each gateway fills the
/// fields its flow uses.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    pub payment_id: String,
    pub pix_copia_cola: Option<String>,
    pub qr_code: Option<String>,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventStatus {
    Approved,
    Rejected,
    Cancelled,
    Pending,
}

/// Validated internal form of a provider webhook payload. Raw provider JSON
/// never reaches the sale finalizer; it is converted here at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub external_reference: String,
    pub payment_id: String,
    pub status: PaymentEventStatus,
    pub amount_cents: i64,
}

/// Constant-time HMAC-SHA256 check of a webhook body against the hex
/// signature the provider sends in its signature header.
pub fn verify_hmac_signature(secret: &str, payload: &str, signature: &str) -> AppResult<()> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InternalError("Invalid webhook secret".to_string()))?;
    mac.update(payload.as_bytes());

    let provided = hex::decode(signature.trim())
        .map_err(|_| AppError::AuthError("Malformed webhook signature".to_string()))?;

    mac.verify_slice(&provided)
        .map_err(|_| AppError::AuthError("Invalid webhook signature".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature() {
        let payload = r#"{"event":"charge.paid"}"#;
        let signature = sign("secret", payload);
        assert!(verify_hmac_signature("secret", payload, &signature).is_ok());
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let signature = sign("secret", r#"{"amount":100}"#);
        let result = verify_hmac_signature("secret", r#"{"amount":999}"#, &signature);
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }

    #[test]
    fn rejects_garbage_signatures() {
        let result = verify_hmac_signature("secret", "{}", "not-hex");
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }
}
