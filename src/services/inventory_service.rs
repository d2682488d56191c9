use crate::error::{AppError, AppResult};
use crate::models::{InventorySummary, NumberStatus, RaffleNumber};
use sqlx::SqlitePool;

/// Read path over the fixed number pool. All writes go through the
/// reservation and sale services.
#[derive(Clone)]
pub struct InventoryService {
    pool: SqlitePool,
}

impl InventoryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Full ordered snapshot of the pool. The set is small and bounded (130
    /// rows), so no pagination.
    pub async fn list_all(&self) -> AppResult<Vec<RaffleNumber>> {
        let numbers = sqlx::query_as::<_, RaffleNumber>(
            r#"
            SELECT numero, status, reserved_by, reserved_at,
                   reservation_expires_at, sold_to, sold_at
            FROM raffle_numbers
            ORDER BY numero ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(numbers)
    }

    pub async fn get_status(&self, numero: i64) -> AppResult<RaffleNumber> {
        let number = sqlx::query_as::<_, RaffleNumber>(
            r#"
            SELECT numero, status, reserved_by, reserved_at,
                   reservation_expires_at, sold_to, sold_at
            FROM raffle_numbers
            WHERE numero = ?
            "#,
        )
        .bind(numero)
        .fetch_optional(&self.pool)
        .await?;

        number.ok_or_else(|| AppError::NotFound(format!("Number {numero} does not exist")))
    }

    pub async fn summary(&self) -> AppResult<InventorySummary> {
        let count = |status: NumberStatus| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM raffle_numbers WHERE status = ?",
                )
                .bind(status)
                .fetch_one(&pool)
                .await
            }
        };

        Ok(InventorySummary {
            disponiveis: count(NumberStatus::Disponivel).await?,
            reservados: count(NumberStatus::Reservado).await?,
            vendidos: count(NumberStatus::Vendido).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn seeds_full_pool_as_available() {
        let service = InventoryService::new(test_pool().await);

        let all = service.list_all().await.unwrap();
        assert_eq!(all.len(), 130);
        assert_eq!(all.first().unwrap().numero, 1);
        assert_eq!(all.last().unwrap().numero, 130);
        assert!(all.iter().all(|n| n.status == NumberStatus::Disponivel));

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.disponiveis, 130);
        assert_eq!(summary.reservados, 0);
        assert_eq!(summary.vendidos, 0);
    }

    #[tokio::test]
    async fn get_status_rejects_unknown_number() {
        let service = InventoryService::new(test_pool().await);

        let found = service.get_status(42).await.unwrap();
        assert_eq!(found.numero, 42);

        assert!(matches!(
            service.get_status(131).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_status(0).await,
            Err(AppError::NotFound(_))
        ));
    }
}
