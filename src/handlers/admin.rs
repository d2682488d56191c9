use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::{DrawRecord, PaymentMethod, TransactionResponse};
use crate::services::{DrawService, ReservationService, SaleService};
use crate::utils::ROLE_ORGANIZER;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

fn require_organizer(req: &HttpRequest) -> Result<CurrentUser, AppError> {
    match req.extensions().get::<CurrentUser>().cloned() {
        Some(user) if user.role == ROLE_ORGANIZER => Ok(user),
        Some(_) => Err(AppError::Forbidden),
        None => Err(AppError::AuthError("Missing access token".to_string())),
    }
}

#[utoipa::path(
    get,
    path = "/admin/transactions",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All transactions, newest first", body = [TransactionResponse]),
        (status = 403, description = "Caller is not the organizer")
    )
)]
pub async fn list_transactions(
    sale_service: web::Data<SaleService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_organizer(&req) {
        return Ok(e.error_response());
    }

    match sale_service.list_all().await {
        Ok(transactions) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": transactions
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Manual PIX confirmation: the organizer checked the bank statement and
/// confirms the transfer arrived.
#[utoipa::path(
    post,
    path = "/admin/transactions/{transaction_id}/confirm",
    tag = "admin",
    params(
        ("transaction_id" = String, Path, description = "Transaction id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transaction finalized"),
        (status = 403, description = "Caller is not the organizer"),
        (status = 404, description = "Unknown transaction")
    )
)]
pub async fn confirm_transaction(
    sale_service: web::Data<SaleService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = require_organizer(&req) {
        return Ok(e.error_response());
    }

    let payment_id = format!("manual-confirm-{}", Uuid::new_v4());
    match sale_service
        .finalize_sale(&path.into_inner(), &payment_id, PaymentMethod::Pix, None)
        .await
    {
        Ok(success) => Ok(HttpResponse::Ok().json(json!({
            "success": success,
            "data": { "payment_id": payment_id }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/transactions/{transaction_id}/reject",
    tag = "admin",
    params(
        ("transaction_id" = String, Path, description = "Transaction id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transaction cancelled, numbers released"),
        (status = 403, description = "Caller is not the organizer"),
        (status = 404, description = "Unknown transaction")
    )
)]
pub async fn reject_transaction(
    sale_service: web::Data<SaleService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = require_organizer(&req) {
        return Ok(e.error_response());
    }

    match sale_service.reject(&path.into_inner()).await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "success": true
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/sweep",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ran the expiry sweep on demand"),
        (status = 403, description = "Caller is not the organizer")
    )
)]
pub async fn run_sweep(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_organizer(&req) {
        return Ok(e.error_response());
    }

    match reservation_service.sweep_expired().await {
        Ok(swept) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "swept": swept }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/draw",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Winner drawn among sold numbers", body = DrawRecord),
        (status = 400, description = "Nothing sold yet"),
        (status = 403, description = "Caller is not the organizer")
    )
)]
pub async fn run_draw(draw_service: web::Data<DrawService>, req: HttpRequest) -> Result<HttpResponse> {
    if let Err(e) = require_organizer(&req) {
        return Ok(e.error_response());
    }

    match draw_service.draw_winner().await {
        Ok(draw) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": draw
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/draws",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Draw history, newest first", body = [DrawRecord]),
        (status = 403, description = "Caller is not the organizer")
    )
)]
pub async fn list_draws(
    draw_service: web::Data<DrawService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_organizer(&req) {
        return Ok(e.error_response());
    }

    match draw_service.list_draws().await {
        Ok(draws) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": draws
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/transactions", web::get().to(list_transactions))
            .route(
                "/transactions/{transaction_id}/confirm",
                web::post().to(confirm_transaction),
            )
            .route(
                "/transactions/{transaction_id}/reject",
                web::post().to(reject_transaction),
            )
            .route("/sweep", web::post().to(run_sweep))
            .route("/draw", web::post().to(run_draw))
            .route("/draws", web::get().to(list_draws)),
    );
}
