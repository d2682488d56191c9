use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use rifa_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{CardGateway, PixGateway},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::{DrawService, InventoryService, ReservationService, SaleService},
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    let pix_gateway = PixGateway::new(config.pix.clone());
    let card_gateway = CardGateway::new(config.card.clone());

    let inventory_service = InventoryService::new(pool.clone());
    let reservation_service = ReservationService::new(pool.clone(), config.raffle.clone());
    let sale_service = SaleService::new(
        pool.clone(),
        config.raffle.clone(),
        pix_gateway.clone(),
        card_gateway.clone(),
    );
    let draw_service = DrawService::new(pool.clone());

    // Reservation sweep and checkout expirer.
    tasks::spawn_all(reservation_service.clone(), sale_service.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(inventory_service.clone()))
            .app_data(web::Data::new(reservation_service.clone()))
            .app_data(web::Data::new(sale_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .app_data(web::Data::new(pix_gateway.clone()))
            .app_data(web::Data::new(card_gateway.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::numbers_config)
                    .configure(handlers::reservation_config)
                    .configure(handlers::checkout_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
