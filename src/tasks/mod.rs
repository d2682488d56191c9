//! Background scheduled tasks for the application.
//!
//! Two recurring jobs keep the inventory honest: the reservation sweep
//! reclaims expired holds so abandoned carts never lock numbers forever, and
//! the checkout expirer times out stale interactive card transactions.
//! Call `spawn_all` once during startup to launch them.

use crate::services::{ReservationService, SaleService};

/// Spawn all background tasks.
///
/// Notes
/// - Both jobs are idempotent as implemented in their services: every row
///   transition is conditioned on the expected prior state, so overlapping
///   runs are harmless.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(reservation_service: ReservationService, sale_service: SaleService) {
    // Reclaim expired reservations every 60 seconds.
    {
        let svc = reservation_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.sweep_expired().await {
                    Ok(n) if n > 0 => log::info!("Reservation sweep reclaimed {n} numbers"),
                    Ok(_) => {}
                    Err(e) => log::error!("Reservation sweep failed: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }

    // Expire stale interactive card checkouts every 60 seconds.
    {
        let svc = sale_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.expire_stale_checkouts().await {
                    Ok(n) if n > 0 => log::info!("Expired {n} stale checkouts"),
                    Ok(_) => {}
                    Err(e) => log::error!("Checkout expirer failed: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }
}
