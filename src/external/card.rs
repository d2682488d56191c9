use crate::config::CardGatewayConfig;
use crate::error::{AppError, AppResult};
use crate::external::{GatewayCharge, PaymentEventStatus, PaymentNotification, verify_hmac_signature};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CardApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CardCheckoutData {
    pub id: String,
    #[serde(rename = "checkoutUrl")]
    pub checkout_url: String,
}

/// Credit card provider client. Returns a hosted checkout page the client is
/// redirected to; confirmation arrives asynchronously on the webhook.
#[derive(Clone)]
pub struct CardGateway {
    client: Client,
    config: CardGatewayConfig,
}

impl CardGateway {
    pub fn new(config: CardGatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn create_charge(
        &self,
        amount_cents: i64,
        external_reference: &str,
    ) -> AppResult<GatewayCharge> {
        let url = format!("{}/v1/checkouts", self.config.base_url);

        let body = serde_json::json!({
            "amount": amount_cents,
            "currency": "BRL",
            "externalReference": external_reference,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let result: CardApiResponse<CardCheckoutData> = response.json().await?;

        if !result.success {
            return Err(AppError::ExternalApiError(format!(
                "Card checkout creation failed: {}",
                result.message.unwrap_or_default()
            )));
        }

        let data = result.data.ok_or_else(|| {
            AppError::ExternalApiError("Empty card checkout response".to_string())
        })?;

        Ok(GatewayCharge {
            payment_id: data.id,
            pix_copia_cola: None,
            qr_code: None,
            checkout_url: Some(data.checkout_url),
        })
    }

    pub fn verify_signature(&self, payload: &str, signature: &str) -> AppResult<()> {
        verify_hmac_signature(&self.config.webhook_secret, payload, signature)
    }

    pub fn parse_webhook(&self, payload: &str) -> AppResult<PaymentNotification> {
        let value: serde_json::Value = serde_json::from_str(payload)?;

        let payment = value
            .get("payment")
            .ok_or_else(|| AppError::ValidationError("Card webhook missing payment".to_string()))?;

        let external_reference = payment
            .get("externalReference")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::ValidationError("Card webhook missing externalReference".to_string())
            })?
            .to_string();

        let payment_id = payment
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::ValidationError("Card webhook missing payment id".to_string())
            })?
            .to_string();

        let amount_cents = payment.get("amount").and_then(|v| v.as_i64()).unwrap_or(0);

        let status = match value.get("type").and_then(|v| v.as_str()) {
            Some("payment.approved") => PaymentEventStatus::Approved,
            Some("payment.rejected") => PaymentEventStatus::Rejected,
            Some("payment.cancelled") | Some("payment.refunded") => PaymentEventStatus::Cancelled,
            _ => PaymentEventStatus::Pending,
        };

        Ok(PaymentNotification {
            external_reference,
            payment_id,
            status,
            amount_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> CardGateway {
        CardGateway::new(CardGatewayConfig {
            base_url: "http://localhost:1".to_string(),
            api_key: "test".to_string(),
            webhook_secret: "secret".to_string(),
        })
    }

    #[test]
    fn parses_an_approved_payment_event() {
        let payload = r#"{
            "type": "payment.approved",
            "payment": {
                "id": "pay_9",
                "externalReference": "tx-2",
                "amount": 5000
            }
        }"#;

        let notification = gateway().parse_webhook(payload).unwrap();
        assert_eq!(notification.external_reference, "tx-2");
        assert_eq!(notification.status, PaymentEventStatus::Approved);
    }

    #[test]
    fn unknown_event_types_map_to_pending() {
        let payload = r#"{
            "type": "payment.created",
            "payment": { "id": "pay_9", "externalReference": "tx-2" }
        }"#;

        let notification = gateway().parse_webhook(payload).unwrap();
        assert_eq!(notification.status, PaymentEventStatus::Pending);
    }
}
