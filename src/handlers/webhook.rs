use crate::error::{AppError, AppResult};
use crate::external::{CardGateway, PaymentEventStatus, PaymentNotification, PixGateway};
use crate::models::PaymentMethod;
use crate::services::SaleService;
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, info, warn};

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// PIX provider webhook.
///
/// Delivery is at-least-once and possibly out of order; the sale finalizer's
/// already-paid guard makes reprocessing safe. After the signature checks
/// out, the provider always gets a 200 so it stops retrying.
pub async fn pix_webhook(
    req: HttpRequest,
    body: web::Bytes,
    gateway: web::Data<PixGateway>,
    sale_service: web::Data<SaleService>,
) -> Result<HttpResponse> {
    handle_webhook(&req, &body, PaymentMethod::Pix, &sale_service, |payload, signature| {
        gateway.verify_signature(payload, signature)?;
        gateway.parse_webhook(payload)
    })
    .await
}

/// Card provider webhook. Same contract as the PIX one.
pub async fn card_webhook(
    req: HttpRequest,
    body: web::Bytes,
    gateway: web::Data<CardGateway>,
    sale_service: web::Data<SaleService>,
) -> Result<HttpResponse> {
    handle_webhook(&req, &body, PaymentMethod::Cartao, &sale_service, |payload, signature| {
        gateway.verify_signature(payload, signature)?;
        gateway.parse_webhook(payload)
    })
    .await
}

async fn handle_webhook(
    req: &HttpRequest,
    body: &web::Bytes,
    method: PaymentMethod,
    sale_service: &SaleService,
    verify_and_parse: impl FnOnce(&str, &str) -> AppResult<PaymentNotification>,
) -> Result<HttpResponse> {
    let signature = match req.headers().get(SIGNATURE_HEADER) {
        Some(sig) => sig.to_str().unwrap_or(""),
        None => {
            warn!("Missing {SIGNATURE_HEADER} header on {method:?} webhook");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Missing signature header"
            })));
        }
    };

    let payload = match std::str::from_utf8(body) {
        Ok(payload) => payload,
        Err(_) => {
            error!("Invalid UTF-8 in {method:?} webhook payload");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid payload encoding"
            })));
        }
    };

    let notification = match verify_and_parse(payload, signature) {
        Ok(notification) => notification,
        Err(AppError::AuthError(msg)) => {
            error!("{method:?} webhook signature verification failed: {msg}");
            return Ok(HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Invalid signature"
            })));
        }
        Err(e) => {
            error!("Malformed {method:?} webhook payload: {e}");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Malformed payload"
            })));
        }
    };

    info!(
        "Received {method:?} webhook for transaction {} (payment {}, status {:?})",
        notification.external_reference, notification.payment_id, notification.status
    );

    match process_notification(sale_service, &notification, method).await {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true
        }))),
        Err(e) => {
            // Acknowledge anyway so the provider does not retry forever; the
            // anomaly is logged for manual reconciliation.
            error!(
                "Failed to process {method:?} webhook for transaction {}: {e}",
                notification.external_reference
            );
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "received": true,
                "error": format!("Processing failed: {e}")
            })))
        }
    }
}

async fn process_notification(
    sale_service: &SaleService,
    notification: &PaymentNotification,
    method: PaymentMethod,
) -> AppResult<()> {
    match notification.status {
        PaymentEventStatus::Approved => {
            sale_service
                .finalize_sale(
                    &notification.external_reference,
                    &notification.payment_id,
                    method,
                    Some(notification.amount_cents),
                )
                .await?;
        }
        PaymentEventStatus::Rejected | PaymentEventStatus::Cancelled => {
            sale_service.reject(&notification.external_reference).await?;
        }
        PaymentEventStatus::Pending => {
            info!(
                "Ignoring intermediate payment event for transaction {}",
                notification.external_reference
            );
        }
    }

    Ok(())
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhook")
            .route("/pix", web::post().to(pix_webhook))
            .route("/cartao", web::post().to(card_webhook)),
    );
}
