use crate::error::{AppError, AppResult};
use crate::models::DrawRecord;
use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;

/// Organizer-run winner draw over the sold numbers.
#[derive(Clone)]
pub struct DrawService {
    pool: SqlitePool,
}

impl DrawService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Pick a uniformly random sold number and record it as a winner.
    pub async fn draw_winner(&self) -> AppResult<DrawRecord> {
        let sold: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT numero, sold_to FROM raffle_numbers
            WHERE status = 'vendido'
            ORDER BY numero ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if sold.is_empty() {
            return Err(AppError::ValidationError(
                "No sold numbers to draw from".to_string(),
            ));
        }

        let index = rand::thread_rng().gen_range(0..sold.len());
        let (numero, winner_user_id) = sold[index].clone();
        let drawn_at = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO draws (numero, winner_user_id, drawn_at)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(numero)
        .bind(&winner_user_id)
        .bind(drawn_at)
        .fetch_one(&self.pool)
        .await?;

        log::info!("Draw #{id}: number {numero} won by {winner_user_id}");

        Ok(DrawRecord {
            id,
            numero,
            winner_user_id,
            drawn_at,
        })
    }

    pub async fn list_draws(&self) -> AppResult<Vec<DrawRecord>> {
        let draws = sqlx::query_as::<_, DrawRecord>(
            "SELECT id, numero, winner_user_id, drawn_at FROM draws ORDER BY drawn_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(draws)
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

    async fn mark_sold(pool: &SqlitePool, numero: i64, user: &str) {
        sqlx::query(
            "UPDATE raffle_numbers SET status = 'vendido', sold_to = ?, sold_at = ? WHERE numero = ?",
        )
        .bind(user)
        .bind(Utc::now())
        .bind(numero)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn draw_fails_when_nothing_sold() {
        let svc = DrawService::new(test_pool().await);
        assert!(matches!(
            svc.draw_winner().await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn draw_picks_a_sold_number_and_records_it() {
        let pool = test_pool().await;
        let svc = DrawService::new(pool.clone());

        mark_sold(&pool, 8, "alice").await;
        mark_sold(&pool, 42, "bob").await;

        let draw = svc.draw_winner().await.unwrap();
        assert!([8, 42].contains(&draw.numero));
        let expected_winner = if draw.numero == 8 { "alice" } else { "bob" };
        assert_eq!(draw.winner_user_id, expected_winner);

        let history = svc.list_draws().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].numero, draw.numero);
    }
}
