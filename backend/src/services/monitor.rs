//! Threshold monitor: decides which products are low and at what priority
//!
//! Runs in two modes. Push: every catalog stock write invokes
//! `evaluate_product` inside its own transaction. Pull: a periodic full sweep
//! covers stock changes and threshold edits that never passed through
//! `adjust_stock` (external imports, administrative edits). Both paths are
//! idempotent, so racing evaluations cause no duplicate alerts.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::ReplenishmentConfig;
use crate::error::AppResult;
use crate::models::{AlertPriority, Product};
use crate::services::alerts;
use crate::services::catalog::ProductRow;

/// Replenishment tuning knobs derived from configuration
#[derive(Debug, Clone, Copy)]
pub struct ReplenishmentPolicy {
    pub watch_band_percent: u32,
    pub minimum_order_size: i32,
    pub default_lead_time_days: i64,
    pub name_match_threshold: f64,
}

impl From<&ReplenishmentConfig> for ReplenishmentPolicy {
    fn from(config: &ReplenishmentConfig) -> Self {
        Self {
            watch_band_percent: config.watch_band_percent,
            minimum_order_size: config.minimum_order_size,
            default_lead_time_days: config.default_lead_time_days,
            name_match_threshold: config.name_match_threshold,
        }
    }
}

/// Outcome of evaluating a single product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// An open alert exists (created or refreshed) at this priority
    Alerting(AlertPriority),
    /// The open alert was auto-resolved
    Resolved,
    /// Nothing to do
    NoOp,
}

/// Evaluate one product against its threshold and drive the alert ledger.
///
/// Within alerting range the open low-stock alert is upserted; above the
/// watch band any open alert is auto-resolved. Re-evaluating an unchanged
/// product performs no writes.
pub(crate) async fn evaluate_product(
    conn: &mut PgConnection,
    product: &Product,
    policy: &ReplenishmentPolicy,
) -> AppResult<Evaluation> {
    if !product.active {
        return Ok(Evaluation::NoOp);
    }

    let priority = AlertPriority::for_stock_level(
        product.current_stock,
        product.low_stock_threshold,
        policy.watch_band_percent,
    )?;

    match priority {
        Some(priority) => {
            alerts::upsert_low_stock_alert(conn, product, priority).await?;
            Ok(Evaluation::Alerting(priority))
        }
        None => match alerts::auto_resolve(conn, product.id).await? {
            Some(_) => Ok(Evaluation::Resolved),
            None => Ok(Evaluation::NoOp),
        },
    }
}

/// Periodic full-sweep monitor
#[derive(Clone)]
pub struct MonitorService {
    db: PgPool,
    policy: ReplenishmentPolicy,
}

/// Result of one full sweep
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub alerting: usize,
    pub resolved: usize,
    pub failed: usize,
}

impl MonitorService {
    /// Create a new MonitorService instance
    pub fn new(db: PgPool, policy: ReplenishmentPolicy) -> Self {
        Self { db, policy }
    }

    /// Run one full sweep over the active catalog.
    ///
    /// Each product is evaluated in its own short transaction under a row
    /// lock, so sweeps interleave safely with concurrent stock writes. A
    /// product that fails evaluation (e.g. a misconfigured threshold) is
    /// surfaced in the log and the summary without aborting the rest of the
    /// sweep.
    pub async fn sweep(&self) -> AppResult<SweepSummary> {
        let product_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM products WHERE active = true ORDER BY name")
                .fetch_all(&self.db)
                .await?;

        let mut summary = SweepSummary::default();

        for product_id in product_ids {
            let mut tx = self.db.begin().await?;

            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT id, name, category, current_stock, low_stock_threshold, unit_price,
                       supplier_id, active, created_at, updated_at
                FROM products
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

            // deactivated or removed between the scan and the lock
            let Some(row) = row else {
                continue;
            };

            let product = Product::from(row);
            summary.evaluated += 1;

            match evaluate_product(&mut tx, &product, &self.policy).await {
                Ok(outcome) => {
                    tx.commit().await?;
                    match outcome {
                        Evaluation::Alerting(_) => summary.alerting += 1,
                        Evaluation::Resolved => summary.resolved += 1,
                        Evaluation::NoOp => {}
                    }
                }
                Err(crate::error::AppError::DatabaseError(err)) => {
                    return Err(crate::error::AppError::DatabaseError(err));
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(
                        product_id = %product.id,
                        error = %err,
                        "threshold evaluation failed during sweep"
                    );
                }
            }
        }

        tracing::info!(
            evaluated = summary.evaluated,
            alerting = summary.alerting,
            resolved = summary.resolved,
            failed = summary.failed,
            "threshold sweep complete"
        );

        Ok(summary)
    }

    /// Spawn the periodic sweep loop
    pub fn spawn_sweeper(self, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            // the first tick fires immediately; skip it so startup and the
            // first sweep do not race migrations
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(err) = self.sweep().await {
                    tracing::error!(error = %err, "threshold sweep failed");
                }
            }
        })
    }
}
