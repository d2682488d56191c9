use crate::config::PixGatewayConfig;
use crate::error::{AppError, AppResult};
use crate::external::{GatewayCharge, PaymentEventStatus, PaymentNotification, verify_hmac_signature};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct PixApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PixChargeData {
    pub id: String,
    #[serde(rename = "brCode")]
    pub br_code: String,
    #[serde(rename = "qrCodeBase64")]
    pub qr_code_base64: Option<String>,
}

/// PIX payment provider client. The charge carries our transaction id as
/// external reference so the webhook can be correlated back.
#[derive(Clone)]
pub struct PixGateway {
    client: Client,
    config: PixGatewayConfig,
}

impl PixGateway {
    pub fn new(config: PixGatewayConfig) -> Self {
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
        let url = format!("{}/v1/pix/charges", self.config.base_url);

        let body = serde_json::json!({
            "amount": amount_cents,
            "externalReference": external_reference,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let result: PixApiResponse<PixChargeData> = response.json().await?;

        if !result.success {
            return Err(AppError::ExternalApiError(format!(
                "PIX charge creation failed: {}",
                result.message.unwrap_or_default()
            )));
        }

        let data = result
            .data
            .ok_or_else(|| AppError::ExternalApiError("Empty PIX charge response".to_string()))?;

        Ok(GatewayCharge {
            payment_id: data.id,
            pix_copia_cola: Some(data.br_code),
            qr_code: data.qr_code_base64,
            checkout_url: None,
        })
    }

    pub fn verify_signature(&self, payload: &str, signature: &str) -> AppResult<()> {
        verify_hmac_signature(&self.config.webhook_secret, payload, signature)
    }

    /// Convert the provider's loose webhook JSON into the validated internal
    /// notification before it touches the core.
    pub fn parse_webhook(&self, payload: &str) -> AppResult<PaymentNotification> {
        let value: serde_json::Value = serde_json::from_str(payload)?;

        let data = value
            .get("data")
            .ok_or_else(|| AppError::ValidationError("PIX webhook missing data".to_string()))?;

        let external_reference = data
            .get("externalReference")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::ValidationError("PIX webhook missing externalReference".to_string())
            })?
            .to_string();

        let payment_id = data
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::ValidationError("PIX webhook missing charge id".to_string()))?
            .to_string();

        let amount_cents = data.get("amount").and_then(|v| v.as_i64()).unwrap_or(0);

        let status = match value.get("event").and_then(|v| v.as_str()) {
            Some("charge.paid") => PaymentEventStatus::Approved,
            Some("charge.refused") => PaymentEventStatus::Rejected,
            Some("charge.expired") | Some("charge.cancelled") => PaymentEventStatus::Cancelled,
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

    fn gateway() -> PixGateway {
        PixGateway::new(PixGatewayConfig {
            base_url: "http://localhost:1".to_string(),
            api_key: "test".to_string(),
            webhook_secret: "secret".to_string(),
        })
    }

    #[test]
    fn parses_a_paid_charge_event() {
        let payload = r#"{
            "event": "charge.paid",
            "data": {
                "id": "pix_123",
                "externalReference": "tx-1",
                "amount": 3000,
                "status": "paid"
            }
        }"#;

        let notification = gateway().parse_webhook(payload).unwrap();
        assert_eq!(notification.external_reference, "tx-1");
        assert_eq!(notification.payment_id, "pix_123");
        assert_eq!(notification.status, PaymentEventStatus::Approved);
        assert_eq!(notification.amount_cents, 3000);
    }

    #[test]
    fn parses_an_expired_charge_event() {
        let payload = r#"{
            "event": "charge.expired",
            "data": { "id": "pix_123", "externalReference": "tx-1", "amount": 3000 }
        }"#;

        let notification = gateway().parse_webhook(payload).unwrap();
        assert_eq!(notification.status, PaymentEventStatus::Cancelled);
    }

    #[test]
    fn rejects_payload_without_reference() {
        let payload = r#"{"event": "charge.paid", "data": {"id": "pix_123"}}"#;
        assert!(matches!(
            gateway().parse_webhook(payload),
            Err(AppError::ValidationError(_))
        ));
    }
}
