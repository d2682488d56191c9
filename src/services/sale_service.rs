use crate::config::RaffleConfig;
use crate::error::{AppError, AppResult};
use crate::external::{CardGateway, PixGateway};
use crate::models::{
    CheckoutResponse, CreateCheckoutRequest, PaymentMethod, Transaction, TransactionResponse,
    TransactionStatus,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = r#"
    id, user_id, numeros_comprados, valor_total, metodo_pagamento,
    status, payment_id, created_at, data_pagamento, approved_at
"#;

/// Creates checkouts and converts paid transactions into permanently sold
/// numbers. Finalization is idempotent: the already-paid check is the guard
/// that makes at-least-once webhook delivery safe.
#[derive(Clone)]
pub struct SaleService {
    pool: SqlitePool,
    config: RaffleConfig,
    pix_gateway: PixGateway,
    card_gateway: CardGateway,
}

impl SaleService {
    pub fn new(
        pool: SqlitePool,
        config: RaffleConfig,
        pix_gateway: PixGateway,
        card_gateway: CardGateway,
    ) -> Self {
        Self {
            pool,
            config,
            pix_gateway,
            card_gateway,
        }
    }

    /// Open a checkout for numbers the user currently holds reserved, create
    /// the provider charge with the transaction id as external reference, and
    /// hand back the provider's payment data.
    pub async fn create_checkout(
        &self,
        user_id: &str,
        request: CreateCheckoutRequest,
    ) -> AppResult<CheckoutResponse> {
        let mut numeros = request.numeros.clone();
        numeros.sort_unstable();
        numeros.dedup();

        if numeros.is_empty() {
            return Err(AppError::ValidationError(
                "At least one number must be purchased".to_string(),
            ));
        }
        for &numero in &numeros {
            if numero < 1 || numero > self.config.total_numbers {
                return Err(AppError::ValidationError(format!(
                    "Number {numero} is outside 1..={}",
                    self.config.total_numbers
                )));
            }
        }

        let now = Utc::now();
        let transaction_id = Uuid::new_v4().to_string();
        let valor_total = numeros.len() as i64 * self.config.ticket_price_cents;

        let mut tx = self.pool.begin().await?;

        // Every purchased number must be reserved by this user right now.
        let placeholders = vec!["?"; numeros.len()].join(",");
        let sql = format!(
            r#"
            SELECT COUNT(*) FROM raffle_numbers
            WHERE numero IN ({placeholders})
              AND status = 'reservado' AND reserved_by = ? AND reservation_expires_at > ?
            "#
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for &numero in &numeros {
            query = query.bind(numero);
        }
        let reserved: i64 = query.bind(user_id).bind(now).fetch_one(&mut *tx).await?;

        if reserved != numeros.len() as i64 {
            return Err(AppError::ValidationError(
                "All numbers must be reserved by you before checkout".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, numeros_comprados, valor_total, metodo_pagamento,
                status, created_at
            ) VALUES (?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&transaction_id)
        .bind(user_id)
        .bind(serde_json::to_string(&numeros)?)
        .bind(valor_total)
        .bind(request.metodo_pagamento)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Manual PIX waits for the organizer, so the hold must outlive the
        // interactive reservation window.
        if request.metodo_pagamento == PaymentMethod::Pix {
            let manual_expiry = now + Duration::minutes(self.config.manual_pix_ttl_minutes);
            let sql = format!(
                r#"
                UPDATE raffle_numbers
                SET reservation_expires_at = ?
                WHERE numero IN ({placeholders})
                  AND status = 'reservado' AND reserved_by = ?
                "#
            );
            let mut query = sqlx::query(&sql).bind(manual_expiry);
            for &numero in &numeros {
                query = query.bind(numero);
            }
            query.bind(user_id).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        let charge = match request.metodo_pagamento {
            PaymentMethod::Pix => {
                self.pix_gateway
                    .create_charge(valor_total, &transaction_id)
                    .await
            }
            PaymentMethod::Cartao => {
                self.card_gateway
                    .create_charge(valor_total, &transaction_id)
                    .await
            }
        };

        let charge = match charge {
            Ok(charge) => charge,
            Err(e) => {
                // The charge never existed on the provider side; cancel the
                // transaction so the numbers are not stuck behind it.
                log::error!("Gateway charge creation failed for {transaction_id}: {e}");
                sqlx::query(
                    "UPDATE transactions SET status = 'cancelled' WHERE id = ? AND status = 'pending'",
                )
                .bind(&transaction_id)
                .execute(&self.pool)
                .await?;

                // A PIX checkout already moved the numbers onto the manual
                // hold; put them back on the interactive window so the sweep
                // can reclaim them if the user walks away.
                if request.metodo_pagamento == PaymentMethod::Pix {
                    let interactive_expiry =
                        Utc::now() + Duration::minutes(self.config.reservation_ttl_minutes);
                    let sql = format!(
                        r#"
                        UPDATE raffle_numbers
                        SET reservation_expires_at = ?
                        WHERE numero IN ({placeholders})
                          AND status = 'reservado' AND reserved_by = ?
                        "#
                    );
                    let mut query = sqlx::query(&sql).bind(interactive_expiry);
                    for &numero in &numeros {
                        query = query.bind(numero);
                    }
                    query.bind(user_id).execute(&self.pool).await?;
                }

                return Err(e);
            }
        };

        sqlx::query(
            "UPDATE transactions SET payment_id = ?, status = 'processing' WHERE id = ? AND status = 'pending'",
        )
        .bind(&charge.payment_id)
        .bind(&transaction_id)
        .execute(&self.pool)
        .await?;

        Ok(CheckoutResponse {
            transaction_id,
            payment_id: charge.payment_id,
            valor_total,
            metodo_pagamento: request.metodo_pagamento,
            pix_copia_cola: charge.pix_copia_cola,
            qr_code: charge.qr_code,
            checkout_url: charge.checkout_url,
        })
    }

    /// Convert a paid transaction's numbers into sold rows, exactly once.
    ///
    /// A second call for an already-paid transaction is a successful no-op.
    /// Numbers are forced to vendido even when the reservation was already
    /// reclaimed by the expiry sweep: payment confirmation always wins.
    pub async fn finalize_sale(
        &self,
        transaction_id: &str,
        payment_id: &str,
        payment_method: PaymentMethod,
        amount_cents: Option<i64>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(transaction_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {transaction_id} not found")))?;

        match transaction.status {
            TransactionStatus::Paid => {
                log::info!(
                    "Duplicate finalize for already-paid transaction {transaction_id}; no-op"
                );
                return Ok(true);
            }
            TransactionStatus::Cancelled => {
                log::warn!(
                    "Payment confirmation arrived for cancelled transaction {transaction_id}; \
                     manual reconciliation required"
                );
                return Ok(false);
            }
            _ => {}
        }

        if transaction.metodo_pagamento != payment_method {
            log::warn!(
                "Payment method mismatch on transaction {transaction_id}: stored {:?}, event {:?}",
                transaction.metodo_pagamento,
                payment_method
            );
        }

        // The provider is the source of truth for the confirmation, not the
        // amount; a discrepancy is flagged for manual reconciliation.
        if let Some(amount) = amount_cents
            && amount != transaction.valor_total
        {
            log::warn!(
                "Amount mismatch on transaction {transaction_id}: charged {}, event reported {amount}",
                transaction.valor_total
            );
        }

        let now = Utc::now();

        // Compare-and-set: a concurrent finalize that got here first already
        // flipped the status, and this call becomes a no-op.
        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'paid', payment_id = ?, data_pagamento = ?, approved_at = ?
            WHERE id = ? AND status NOT IN ('paid', 'cancelled')
            "#,
        )
        .bind(payment_id)
        .bind(now)
        .bind(now)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(true);
        }

        for &numero in transaction.numeros_comprados.iter() {
            let result = sqlx::query(
                r#"
                UPDATE raffle_numbers
                SET status = 'vendido', sold_to = ?, sold_at = ?,
                    reserved_by = NULL, reserved_at = NULL, reservation_expires_at = NULL
                WHERE numero = ? AND status <> 'vendido'
                "#,
            )
            .bind(&transaction.user_id)
            .bind(now)
            .bind(numero)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let owner: Option<String> =
                    sqlx::query_scalar("SELECT sold_to FROM raffle_numbers WHERE numero = ?")
                        .bind(numero)
                        .fetch_one(&mut *tx)
                        .await?;
                if owner.as_deref() != Some(transaction.user_id.as_str()) {
                    log::error!(
                        "Number {numero} of paid transaction {transaction_id} is already sold \
                         to someone else; manual reconciliation required"
                    );
                }
            }
        }

        tx.commit().await?;

        log::info!(
            "Finalized transaction {transaction_id}: {} numbers sold to {}",
            transaction.numeros_comprados.len(),
            transaction.user_id
        );

        Ok(true)
    }

    /// Cancel a non-paid transaction and release any of its numbers still
    /// reserved by the buyer. No-op on a paid transaction.
    pub async fn reject(&self, transaction_id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(transaction_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {transaction_id} not found")))?;

        if transaction.status == TransactionStatus::Paid {
            log::warn!("Refusing to reject already-paid transaction {transaction_id}");
            return Ok(());
        }

        sqlx::query("UPDATE transactions SET status = 'cancelled' WHERE id = ? AND status <> 'paid'")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        for &numero in transaction.numeros_comprados.iter() {
            sqlx::query(
                r#"
                UPDATE raffle_numbers
                SET status = 'disponivel', reserved_by = NULL, reserved_at = NULL,
                    reservation_expires_at = NULL
                WHERE numero = ? AND status = 'reservado' AND reserved_by = ?
                "#,
            )
            .bind(numero)
            .bind(&transaction.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::info!("Rejected transaction {transaction_id}");
        Ok(())
    }

    /// Move stale interactive card checkouts to expired. Manual PIX
    /// transactions wait for the organizer and are never expired here. The
    /// numbers themselves are reclaimed by the reservation sweep.
    pub async fn expire_stale_checkouts(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::minutes(self.config.checkout_ttl_minutes);

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'expired'
            WHERE status IN ('pending', 'processing')
              AND metodo_pagamento = 'cartao'
              AND created_at <= ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            log::info!("Expired {expired} stale card checkouts");
        }

        Ok(expired)
    }

    /// Point-in-time status for the client-side payment poll.
    pub async fn get_for_user(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> AppResult<TransactionResponse> {
        let sql =
            format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ? AND user_id = ?");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(transaction_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {transaction_id} not found")))?;

        Ok(transaction.into())
    }

    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<TransactionResponse>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ? ORDER BY created_at DESC"
        );
        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(transactions.into_iter().map(Into::into).collect())
    }

    pub async fn list_all(&self) -> AppResult<Vec<TransactionResponse>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY created_at DESC");
        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(transactions.into_iter().map(Into::into).collect())
    }
}
