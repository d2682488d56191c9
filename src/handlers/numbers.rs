use crate::models::{InventorySummary, RaffleNumber};
use crate::services::InventoryService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/numbers",
    tag = "numbers",
    responses(
        (status = 200, description = "Full ordered snapshot of the 130-number pool", body = [RaffleNumber])
    )
)]
pub async fn list_numbers(inventory_service: web::Data<InventoryService>) -> Result<HttpResponse> {
    match inventory_service.list_all().await {
        Ok(numbers) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": numbers
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/numbers/summary",
    tag = "numbers",
    responses(
        (status = 200, description = "Per-status counts", body = InventorySummary)
    )
)]
pub async fn get_summary(inventory_service: web::Data<InventoryService>) -> Result<HttpResponse> {
    match inventory_service.summary().await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/numbers/{numero}",
    tag = "numbers",
    params(
        ("numero" = i64, Path, description = "Raffle number, 1..=130")
    ),
    responses(
        (status = 200, description = "Current status of the number", body = RaffleNumber),
        (status = 404, description = "Number does not exist")
    )
)]
pub async fn get_number(
    inventory_service: web::Data<InventoryService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match inventory_service.get_status(path.into_inner()).await {
        Ok(number) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": number
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn numbers_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/numbers")
            .route("", web::get().to(list_numbers))
            .route("/summary", web::get().to(get_summary))
            .route("/{numero}", web::get().to(get_number)),
    );
}
