use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::{ReleaseResponse, ReserveOutcome, ReserveRequest};
use crate::services::ReservationService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_current_user(req: &HttpRequest) -> Option<CurrentUser> {
    req.extensions().get::<CurrentUser>().cloned()
}

#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = ReserveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Partition of the request into granted and rejected numbers", body = ReserveOutcome),
        (status = 400, description = "Invalid input, nothing mutated"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn reserve(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
    request: web::Json<ReserveRequest>,
) -> Result<HttpResponse> {
    let Some(user) = get_current_user(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };

    match reservation_service
        .reserve_interactive(&user.id, &request.numeros)
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/reservations",
    tag = "reservations",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Released every number held by the caller", body = ReleaseResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn release(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(user) = get_current_user(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };

    match reservation_service.release(&user.id).await {
        Ok(released) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ReleaseResponse { released }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn reservation_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reservations")
            .route("", web::post().to(reserve))
            .route("", web::delete().to(release)),
    );
}
