pub mod common;
pub mod draw;
pub mod raffle_number;
pub mod reservation;
pub mod transaction;

pub use common::*;
pub use draw::*;
pub use raffle_number::*;
pub use reservation::*;
pub use transaction::*;
