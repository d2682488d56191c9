use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::external::PaymentEventStatus;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::numbers::list_numbers,
        handlers::numbers::get_summary,
        handlers::numbers::get_number,
        handlers::reservation::reserve,
        handlers::reservation::release,
        handlers::checkout::create_checkout,
        handlers::checkout::get_checkout,
        handlers::checkout::list_checkouts,
        handlers::admin::list_transactions,
        handlers::admin::confirm_transaction,
        handlers::admin::reject_transaction,
        handlers::admin::run_sweep,
        handlers::admin::run_draw,
        handlers::admin::list_draws,
    ),
    components(
        schemas(
            NumberStatus,
            RaffleNumber,
            InventorySummary,
            ReserveRequest,
            ReserveOutcome,
            RejectedNumber,
            RejectReason,
            ReleaseResponse,
            TransactionStatus,
            PaymentMethod,
            TransactionResponse,
            CreateCheckoutRequest,
            CheckoutResponse,
            DrawRecord,
            PaymentEventStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "numbers", description = "Raffle number availability"),
        (name = "reservations", description = "Temporary number holds"),
        (name = "checkout", description = "Payment checkouts"),
        (name = "admin", description = "Organizer operations")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
