use crate::config::RaffleConfig;
use crate::error::{AppError, AppResult};
use crate::models::{RejectReason, RejectedNumber, ReserveOutcome};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Claims numbers for users. Every mutation is a conditional UPDATE keyed on
/// the expected prior status, so two callers racing for the same number can
/// never both win: whichever UPDATE matches first flips the row and the other
/// affects zero rows.
#[derive(Clone)]
pub struct ReservationService {
    pool: SqlitePool,
    config: RaffleConfig,
}

impl ReservationService {
    pub fn new(pool: SqlitePool, config: RaffleConfig) -> Self {
        Self { pool, config }
    }

    /// Atomically claim a set of numbers for `user_id` with the given expiry.
    ///
    /// Each number is granted or rejected individually; the call as a whole
    /// only fails on invalid input. Numbers already reserved by the same user
    /// are re-granted with a refreshed expiry. Expired reservations held by
    /// other users are claimable. The per-user cap is re-checked here against
    /// the database, never against client state.
    pub async fn reserve(
        &self,
        user_id: &str,
        numeros: &[i64],
        ttl_minutes: i64,
    ) -> AppResult<ReserveOutcome> {
        if numeros.is_empty() {
            return Err(AppError::ValidationError(
                "At least one number must be requested".to_string(),
            ));
        }
        if ttl_minutes <= 0 {
            return Err(AppError::ValidationError(
                "Reservation ttl must be positive".to_string(),
            ));
        }

        let mut wanted = numeros.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        for &numero in &wanted {
            if numero < 1 || numero > self.config.total_numbers {
                return Err(AppError::ValidationError(format!(
                    "Number {numero} is outside 1..={}",
                    self.config.total_numbers
                )));
            }
        }

        let now = Utc::now();
        let expires_at = now + Duration::minutes(ttl_minutes);

        let mut tx = self.pool.begin().await?;

        // Live reservations the user already holds count against the cap.
        let mut held: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM raffle_numbers
            WHERE status = 'reservado' AND reserved_by = ? AND reservation_expires_at > ?
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut granted = Vec::new();
        let mut rejected = Vec::new();

        for &numero in &wanted {
            // Idempotent re-request: the user's own live reservation is
            // refreshed, not rejected, and does not consume additional cap.
            // An expired own row is no longer a hold; it goes through the
            // claim path below like anyone else's expired reservation, so it
            // counts against the cap again.
            let own = sqlx::query(
                r#"
                UPDATE raffle_numbers
                SET reserved_at = ?, reservation_expires_at = ?
                WHERE numero = ? AND status = 'reservado' AND reserved_by = ?
                  AND reservation_expires_at > ?
                "#,
            )
            .bind(now)
            .bind(expires_at)
            .bind(numero)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if own.rows_affected() == 1 {
                granted.push(numero);
                continue;
            }

            if held >= self.config.max_per_user {
                rejected.push(RejectedNumber {
                    numero,
                    reason: RejectReason::CapExceeded,
                });
                continue;
            }

            // Available, or reserved by someone else but already expired.
            // Sold rows never match: the sale is terminal.
            let claimed = sqlx::query(
                r#"
                UPDATE raffle_numbers
                SET status = 'reservado', reserved_by = ?, reserved_at = ?,
                    reservation_expires_at = ?
                WHERE numero = ?
                  AND (status = 'disponivel'
                       OR (status = 'reservado' AND reservation_expires_at <= ?))
                "#,
            )
            .bind(user_id)
            .bind(now)
            .bind(expires_at)
            .bind(numero)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 1 {
                granted.push(numero);
                held += 1;
            } else {
                rejected.push(RejectedNumber {
                    numero,
                    reason: RejectReason::Unavailable,
                });
            }
        }

        tx.commit().await?;

        let success = rejected.is_empty();
        if !success {
            log::info!(
                "Reservation for user {user_id} partially rejected: {} granted, {} rejected",
                granted.len(),
                rejected.len()
            );
        }

        Ok(ReserveOutcome {
            success,
            granted,
            rejected,
        })
    }

    /// Reserve with the interactive browsing ttl from the raffle config.
    pub async fn reserve_interactive(
        &self,
        user_id: &str,
        numeros: &[i64],
    ) -> AppResult<ReserveOutcome> {
        self.reserve(user_id, numeros, self.config.reservation_ttl_minutes)
            .await
    }

    /// Release every number currently reserved by the user. No-op when the
    /// user holds nothing.
    pub async fn release(&self, user_id: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE raffle_numbers
            SET status = 'disponivel', reserved_by = NULL, reserved_at = NULL,
                reservation_expires_at = NULL
            WHERE status = 'reservado' AND reserved_by = ?
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Revert expired reservations to available. Each row transition is
    /// conditioned on "still reserved and still expired", so the sweep is
    /// idempotent and safe to run concurrently with itself or with a
    /// finalizing sale (a row already flipped to vendido no longer matches).
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE raffle_numbers
            SET status = 'disponivel', reserved_by = NULL, reserved_at = NULL,
                reservation_expires_at = NULL
            WHERE status = 'reservado' AND reservation_expires_at <= ?
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            log::info!("Swept {swept} expired reservations back to available");
        }

        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NumberStatus;
    use crate::services::InventoryService;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn service(pool: &SqlitePool) -> ReservationService {
        ReservationService::new(pool.clone(), RaffleConfig::default())
    }

    async fn force_expire(pool: &SqlitePool, numeros: &[i64]) {
        let past = Utc::now() - Duration::minutes(1);
        for numero in numeros {
            sqlx::query("UPDATE raffle_numbers SET reservation_expires_at = ? WHERE numero = ?")
                .bind(past)
                .bind(numero)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn reserve_grants_available_numbers() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let outcome = svc.reserve("alice", &[5, 12, 47], 10).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.granted, vec![5, 12, 47]);
        assert!(outcome.rejected.is_empty());

        let inventory = InventoryService::new(pool.clone());
        let number = inventory.get_status(12).await.unwrap();
        assert_eq!(number.status, NumberStatus::Reservado);
        assert_eq!(number.reserved_by.as_deref(), Some("alice"));
        assert!(number.reservation_expires_at.is_some());
    }

    #[tokio::test]
    async fn overlapping_request_is_partially_rejected() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[12], 10).await.unwrap();

        let outcome = svc.reserve("bob", &[12, 99], 10).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.granted, vec![99]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].numero, 12);
        assert_eq!(outcome.rejected[0].reason, RejectReason::Unavailable);
    }

    #[tokio::test]
    async fn zero_grants_is_a_normal_outcome() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[7], 10).await.unwrap();

        let outcome = svc.reserve("bob", &[7], 10).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.granted.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[tokio::test]
    async fn re_request_by_same_user_refreshes_reservation() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[3], 10).await.unwrap();
        let first = InventoryService::new(pool.clone())
            .get_status(3)
            .await
            .unwrap()
            .reservation_expires_at
            .unwrap();

        let outcome = svc.reserve("alice", &[3], 60).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.granted, vec![3]);

        let second = InventoryService::new(pool.clone())
            .get_status(3)
            .await
            .unwrap()
            .reservation_expires_at
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn expired_reservation_is_claimable_by_another_user() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[20], 10).await.unwrap();
        force_expire(&pool, &[20]).await;

        let outcome = svc.reserve("bob", &[20], 10).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.granted, vec![20]);

        let number = InventoryService::new(pool.clone())
            .get_status(20)
            .await
            .unwrap();
        assert_eq!(number.reserved_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn cap_is_enforced_across_calls() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let first = svc
            .reserve("alice", &[1, 2, 3, 4, 5, 6, 7, 8], 10)
            .await
            .unwrap();
        assert!(first.success);

        let second = svc.reserve("alice", &[9, 10, 11, 12], 10).await.unwrap();
        assert!(!second.success);
        assert_eq!(second.granted, vec![9, 10]);
        assert_eq!(second.rejected.len(), 2);
        assert!(
            second
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::CapExceeded)
        );
    }

    #[tokio::test]
    async fn cap_does_not_double_count_re_requests() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10], 10)
            .await
            .unwrap();

        // Re-requesting held numbers stays within the cap.
        let again = svc.reserve("alice", &[1, 2, 3], 10).await.unwrap();
        assert!(again.success);
    }

    #[tokio::test]
    async fn expired_own_reservations_count_against_the_cap_again() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let full = (1..=10).collect::<Vec<i64>>();
        svc.reserve("alice", &full, 10).await.unwrap();
        force_expire(&pool, &full).await;

        // Re-requesting the expired numbers together with ten fresh ones must
        // not leave the user holding more than the cap.
        let wanted = (1..=20).collect::<Vec<i64>>();
        let outcome = svc.reserve("alice", &wanted, 10).await.unwrap();
        assert_eq!(outcome.granted, full);
        assert_eq!(outcome.rejected.len(), 10);
        assert!(
            outcome
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::CapExceeded)
        );

        let live: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM raffle_numbers
            WHERE status = 'reservado' AND reserved_by = 'alice'
              AND reservation_expires_at > ?
            "#,
        )
        .bind(Utc::now())
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(live, 10);
    }

    #[tokio::test]
    async fn invalid_input_mutates_nothing() {
        let pool = test_pool().await;
        let svc = service(&pool);

        assert!(matches!(
            svc.reserve("alice", &[], 10).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.reserve("alice", &[131], 10).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.reserve("alice", &[0], 10).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.reserve("alice", &[5], 0).await,
            Err(AppError::ValidationError(_))
        ));

        let summary = InventoryService::new(pool.clone()).summary().await.unwrap();
        assert_eq!(summary.disponiveis, 130);
    }

    #[tokio::test]
    async fn release_returns_only_the_users_numbers() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[1, 2], 10).await.unwrap();
        svc.reserve("bob", &[3], 10).await.unwrap();

        let released = svc.release("alice").await.unwrap();
        assert_eq!(released, 2);

        // Idempotent: nothing left to release.
        assert_eq!(svc.release("alice").await.unwrap(), 0);

        let inventory = InventoryService::new(pool.clone());
        assert_eq!(
            inventory.get_status(1).await.unwrap().status,
            NumberStatus::Disponivel
        );
        assert_eq!(
            inventory.get_status(3).await.unwrap().status,
            NumberStatus::Reservado
        );
    }

    #[tokio::test]
    async fn sweep_reverts_only_expired_reservations() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.reserve("alice", &[5, 12, 47], 10).await.unwrap();
        svc.reserve("bob", &[60], 10).await.unwrap();
        force_expire(&pool, &[5, 12, 47]).await;

        let swept = svc.sweep_expired().await.unwrap();
        assert_eq!(swept, 3);

        // Running again finds nothing.
        assert_eq!(svc.sweep_expired().await.unwrap(), 0);

        let inventory = InventoryService::new(pool.clone());
        let five = inventory.get_status(5).await.unwrap();
        assert_eq!(five.status, NumberStatus::Disponivel);
        assert!(five.reserved_by.is_none());
        assert!(five.reservation_expires_at.is_none());

        let sixty = inventory.get_status(60).await.unwrap();
        assert_eq!(sixty.status, NumberStatus::Reservado);
        assert_eq!(sixty.reserved_by.as_deref(), Some("bob"));
    }
}
