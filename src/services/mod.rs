pub mod draw_service;
pub mod inventory_service;
pub mod reservation_service;
pub mod sale_service;

pub use draw_service::*;
pub use inventory_service::*;
pub use reservation_service::*;
pub use sale_service::*;
