use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::{CheckoutResponse, CreateCheckoutRequest, TransactionResponse};
use crate::services::SaleService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_current_user(req: &HttpRequest) -> Option<CurrentUser> {
    req.extensions().get::<CurrentUser>().cloned()
}

#[utoipa::path(
    post,
    path = "/checkout",
    tag = "checkout",
    request_body = CreateCheckoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Checkout opened and provider charge created", body = CheckoutResponse),
        (status = 400, description = "Numbers are not reserved by the caller"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Payment provider unavailable")
    )
)]
pub async fn create_checkout(
    sale_service: web::Data<SaleService>,
    req: HttpRequest,
    request: web::Json<CreateCheckoutRequest>,
) -> Result<HttpResponse> {
    let Some(user) = get_current_user(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };

    match sale_service
        .create_checkout(&user.id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Point-in-time status for the client-side payment poll; the service never
/// pushes.
#[utoipa::path(
    get,
    path = "/checkout/{transaction_id}",
    tag = "checkout",
    params(
        ("transaction_id" = String, Path, description = "Transaction id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current transaction status", body = TransactionResponse),
        (status = 404, description = "Unknown transaction")
    )
)]
pub async fn get_checkout(
    sale_service: web::Data<SaleService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let Some(user) = get_current_user(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };

    match sale_service.get_for_user(&user.id, &path.into_inner()).await {
        Ok(transaction) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": transaction
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/checkout",
    tag = "checkout",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The caller's transactions, newest first", body = [TransactionResponse])
    )
)]
pub async fn list_checkouts(
    sale_service: web::Data<SaleService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(user) = get_current_user(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };

    match sale_service.list_for_user(&user.id).await {
        Ok(transactions) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": transactions
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn checkout_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/checkout")
            .route("", web::post().to(create_checkout))
            .route("", web::get().to(list_checkouts))
            .route("/{transaction_id}", web::get().to(get_checkout)),
    );
}
