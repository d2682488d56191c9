pub mod admin;
pub mod checkout;
pub mod numbers;
pub mod reservation;
pub mod webhook;

pub use admin::admin_config;
pub use checkout::checkout_config;
pub use numbers::numbers_config;
pub use reservation::reservation_config;
pub use webhook::webhook_config;
