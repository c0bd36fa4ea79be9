// Pulls Sales Order / Work Order transactions out of NetSuite and mirrors
// them into Postgres. Headers sync strictly one at a time: predictable load
// on the rate-limited API beats throughput here.

use std::future::Future;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::netsuite::{SalesOrderLineRecord, WorkOrderLineRecord};
use crate::repositories::{SalesOrderRepository, WorkOrderRepository};
use crate::services::netsuite::mapper;
use crate::services::netsuite::netsuite_client::{NetSuiteClient, NetSuiteError};

/// Identifiers per delete statement during bulk purge. Keeps each call under
/// the store's request size limits.
const PURGE_BATCH_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    NetSuite(#[from] NetSuiteError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub records_synced: i32,
    pub records_created: i32,
    pub records_updated: i32,
    pub records_failed: i32,
    pub errors: Vec<SyncItemError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncItemError {
    pub netsuite_id: i64,
    pub message: String,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct PurgeReport {
    pub batches: usize,
    pub ids_processed: usize,
    pub rows_deleted: u64,
}

/// A purge stops at the first failing batch; what completed before it is
/// still observable.
#[derive(Error, Debug)]
#[error("batch {batch} failed after {ids_processed} identifiers: {source}")]
pub struct PurgeError {
    pub batch: usize,
    pub ids_processed: usize,
    #[source]
    pub source: SyncError,
}

#[derive(Debug, Default)]
struct SyncCounts {
    synced: i32,
    created: i32,
    updated: i32,
    failed: i32,
    errors: Vec<SyncItemError>,
}

pub struct NetSuiteSyncService {
    pool: PgPool,
    client: NetSuiteClient,
    sales_orders: SalesOrderRepository,
    work_orders: WorkOrderRepository,
}

impl NetSuiteSyncService {
    pub fn new(pool: PgPool, client: NetSuiteClient) -> Self {
        Self {
            sales_orders: SalesOrderRepository::new(pool.clone()),
            work_orders: WorkOrderRepository::new(pool.clone()),
            pool,
            client,
        }
    }

    // ------------------------------------------------------------------------
    // Bulk sync runs
    // ------------------------------------------------------------------------

    pub async fn sync_sales_orders(&self, year: Option<i32>) -> Result<SyncReport> {
        let run_id = self.create_run("sales_orders").await?;
        let started = Utc::now();
        tracing::info!("Sync run {} started (sales_orders)", run_id);

        let outcome = self.pull_sales_orders(year).await;
        self.finish_run(run_id, started, outcome).await
    }

    pub async fn sync_work_orders(&self, year: Option<i32>) -> Result<SyncReport> {
        let run_id = self.create_run("work_orders").await?;
        let started = Utc::now();
        tracing::info!("Sync run {} started (work_orders)", run_id);

        let outcome = self.pull_work_orders(year).await;
        self.finish_run(run_id, started, outcome).await
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        started: chrono::DateTime<Utc>,
        outcome: Result<SyncCounts>,
    ) -> Result<SyncReport> {
        let duration = (Utc::now() - started).num_seconds() as i32;

        match outcome {
            Ok(counts) => {
                let status = if counts.failed > 0 { "partial" } else { "success" };
                self.complete_run(run_id, status, counts.synced, counts.failed, None, duration)
                    .await?;

                tracing::info!(
                    "Sync run {} {}: {} synced, {} failed in {}s",
                    run_id,
                    status,
                    counts.synced,
                    counts.failed,
                    duration
                );

                Ok(SyncReport {
                    run_id,
                    records_synced: counts.synced,
                    records_created: counts.created,
                    records_updated: counts.updated,
                    records_failed: counts.failed,
                    errors: counts.errors,
                })
            }
            Err(err) => {
                tracing::error!("Sync run {} failed: {}", run_id, err);
                self.complete_run(run_id, "failed", 0, 0, Some(&err.to_string()), duration)
                    .await?;
                Err(err)
            }
        }
    }

    async fn pull_sales_orders(&self, year: Option<i32>) -> Result<SyncCounts> {
        // A failure listing headers is fatal for the whole run; per-header
        // failures are collected and the run keeps going.
        let headers = self.client.suiteql_all(&sales_order_header_query(year)).await?;
        let mut counts = SyncCounts::default();

        for header_row in &headers {
            let record = match mapper::map_sales_order(header_row) {
                Ok(record) => record,
                Err(e) => {
                    counts.record_failure(raw_id(header_row), e.to_string());
                    continue;
                }
            };

            let lines = match self.fetch_sales_order_lines(record.netsuite_id).await {
                Ok(lines) => lines,
                Err(message) => {
                    counts.record_failure(record.netsuite_id, message);
                    continue;
                }
            };

            match self.sales_orders.replace(&record, &lines).await {
                Ok(outcome) => counts.record_success(outcome.created),
                Err(e) => counts.record_failure(record.netsuite_id, e.to_string()),
            }
        }

        Ok(counts)
    }

    async fn pull_work_orders(&self, year: Option<i32>) -> Result<SyncCounts> {
        let headers = self.client.suiteql_all(&work_order_header_query(year)).await?;
        let mut counts = SyncCounts::default();

        for header_row in &headers {
            let record = match mapper::map_work_order(header_row) {
                Ok(record) => record,
                Err(e) => {
                    counts.record_failure(raw_id(header_row), e.to_string());
                    continue;
                }
            };

            let lines = match self.fetch_work_order_lines(record.netsuite_id).await {
                Ok(lines) => lines,
                Err(message) => {
                    counts.record_failure(record.netsuite_id, message);
                    continue;
                }
            };

            match self.work_orders.replace(&record, &lines).await {
                Ok(outcome) => counts.record_success(outcome.created),
                Err(e) => counts.record_failure(record.netsuite_id, e.to_string()),
            }
        }

        Ok(counts)
    }

    async fn fetch_sales_order_lines(
        &self,
        netsuite_id: i64,
    ) -> std::result::Result<Vec<SalesOrderLineRecord>, String> {
        let rows = self
            .client
            .suiteql_all(&sales_order_line_query(netsuite_id))
            .await
            .map_err(|e| e.to_string())?;

        rows.iter()
            .map(|row| mapper::map_sales_order_line(row).map_err(|e| e.to_string()))
            .collect()
    }

    async fn fetch_work_order_lines(
        &self,
        netsuite_id: i64,
    ) -> std::result::Result<Vec<WorkOrderLineRecord>, String> {
        let rows = self
            .client
            .suiteql_all(&work_order_line_query(netsuite_id))
            .await
            .map_err(|e| e.to_string())?;

        rows.iter()
            .map(|row| mapper::map_work_order_line(row).map_err(|e| e.to_string()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Bulk purge
    // ------------------------------------------------------------------------

    /// Delete mirrored sales orders in fixed-size batches, failing fast on
    /// the first bad batch. Store-only: no NetSuite client involved.
    pub async fn purge_sales_orders(
        pool: &PgPool,
        netsuite_ids: &[i64],
    ) -> std::result::Result<PurgeReport, PurgeError> {
        let repo = SalesOrderRepository::new(pool.clone());
        run_in_batches(netsuite_ids, PURGE_BATCH_SIZE, |batch| {
            let repo = &repo;
            async move { Ok(repo.delete_by_netsuite_ids(&batch).await?) }
        })
        .await
    }

    pub async fn purge_work_orders(
        pool: &PgPool,
        netsuite_ids: &[i64],
    ) -> std::result::Result<PurgeReport, PurgeError> {
        let repo = WorkOrderRepository::new(pool.clone());
        run_in_batches(netsuite_ids, PURGE_BATCH_SIZE, |batch| {
            let repo = &repo;
            async move { Ok(repo.delete_by_netsuite_ids(&batch).await?) }
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Run log
    // ------------------------------------------------------------------------

    async fn create_run(&self, run_type: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO sync_runs (id, run_type, status) VALUES ($1, $2, 'running')")
            .bind(id)
            .bind(run_type)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn complete_run(
        &self,
        id: Uuid,
        status: &str,
        synced: i32,
        failed: i32,
        error_message: Option<&str>,
        duration_seconds: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sync_runs
            SET status = $2, records_synced = $3, records_failed = $4,
                error_message = $5, completed_at = NOW(), duration_seconds = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(synced)
        .bind(failed)
        .bind(error_message)
        .bind(duration_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl SyncCounts {
    fn record_success(&mut self, created: bool) {
        self.synced += 1;
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }

    fn record_failure(&mut self, netsuite_id: i64, message: String) {
        tracing::error!("Failed to sync transaction {}: {}", netsuite_id, message);
        self.failed += 1;
        self.errors.push(SyncItemError { netsuite_id, message });
    }
}

fn raw_id(row: &Map<String, Value>) -> i64 {
    row.get("id")
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// Run `op` over fixed-size chunks of `items`, stopping at the first batch
/// error. The error carries the 1-based failing batch number and how many
/// identifiers finished before it.
pub async fn run_in_batches<T, F, Fut>(
    items: &[T],
    batch_size: usize,
    mut op: F,
) -> std::result::Result<PurgeReport, PurgeError>
where
    T: Clone,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let mut report = PurgeReport::default();

    for (index, chunk) in items.chunks(batch_size).enumerate() {
        match op(chunk.to_vec()).await {
            Ok(rows) => {
                report.batches += 1;
                report.ids_processed += chunk.len();
                report.rows_deleted += rows;
            }
            Err(source) => {
                return Err(PurgeError {
                    batch: index + 1,
                    ids_processed: report.ids_processed,
                    source,
                });
            }
        }
    }

    Ok(report)
}

// ----------------------------------------------------------------------------
// SuiteQL
// ----------------------------------------------------------------------------

fn sales_order_header_query(year: Option<i32>) -> String {
    let mut q = String::from(
        "SELECT t.id, t.tranid, t.trandate, t.entity, \
         BUILTIN.DF(t.entity) AS customer_name, t.foreigntotal, \
         BUILTIN.DF(t.class) AS class \
         FROM transaction t WHERE t.type = 'SalesOrd'",
    );
    push_year_filter(&mut q, year);
    q.push_str(" ORDER BY t.id");
    q
}

fn work_order_header_query(year: Option<i32>) -> String {
    let mut q = String::from(
        "SELECT t.id, t.tranid, t.trandate, BUILTIN.DF(t.status) AS status, \
         BUILTIN.DF(t.createdfrom) AS created_from_so \
         FROM transaction t WHERE t.type = 'WorkOrd'",
    );
    push_year_filter(&mut q, year);
    q.push_str(" ORDER BY t.id");
    q
}

fn sales_order_line_query(netsuite_id: i64) -> String {
    format!(
        "SELECT tl.linesequencenumber AS line, tl.item AS item_id, \
         i.displayname AS displayname, BUILTIN.DF(tl.item) AS item_display, \
         tl.memo AS description, tl.quantity, tl.rate, tl.netamount AS amount, \
         BUILTIN.DF(tl.expenseaccount) AS account \
         FROM transactionline tl \
         LEFT JOIN item i ON i.id = tl.item \
         WHERE tl.transaction = {} AND tl.mainline = 'F' \
         ORDER BY tl.linesequencenumber",
        netsuite_id
    )
}

fn work_order_line_query(netsuite_id: i64) -> String {
    format!(
        "SELECT tl.linesequencenumber AS line, tl.item AS item_id, \
         i.displayname AS displayname, BUILTIN.DF(tl.item) AS item_display, \
         i.itemtype AS itemtype, tl.quantity, tl.costestimate AS linecost \
         FROM transactionline tl \
         LEFT JOIN item i ON i.id = tl.item \
         WHERE tl.transaction = {} AND tl.mainline = 'F' \
         ORDER BY tl.linesequencenumber",
        netsuite_id
    )
}

fn push_year_filter(q: &mut String, year: Option<i32>) {
    if let Some(year) = year {
        q.push_str(&format!(
            " AND t.trandate BETWEEN TO_DATE('{year}-01-01', 'YYYY-MM-DD') \
             AND TO_DATE('{year}-12-31', 'YYYY-MM-DD')"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn batches_split_at_fixed_size() {
        let ids: Vec<i64> = (0..250).collect();
        let sizes = RefCell::new(Vec::new());

        let report = run_in_batches(&ids, 100, |batch| {
            sizes.borrow_mut().push(batch.len());
            async move { Ok(batch.len() as u64) }
        })
        .await
        .unwrap();

        assert_eq!(*sizes.borrow(), vec![100, 100, 50]);
        assert_eq!(report.batches, 3);
        assert_eq!(report.ids_processed, 250);
        assert_eq!(report.rows_deleted, 250);
    }

    #[tokio::test]
    async fn purge_fails_fast_and_reports_progress() {
        let ids: Vec<i64> = (0..250).collect();
        let calls = RefCell::new(0usize);

        let err = run_in_batches(&ids, 100, |batch| {
            *calls.borrow_mut() += 1;
            let call = *calls.borrow();
            async move {
                if call == 2 {
                    Err(SyncError::Database(sqlx::Error::PoolClosed))
                } else {
                    Ok(batch.len() as u64)
                }
            }
        })
        .await
        .unwrap_err();

        // The first batch's 100 identifiers completed; the failure names
        // batch 2 and nothing after it ran.
        assert_eq!(err.batch, 2);
        assert_eq!(err.ids_processed, 100);
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn year_filter_is_bounded_to_the_calendar_year() {
        let q = sales_order_header_query(Some(2024));
        assert!(q.contains("2024-01-01"));
        assert!(q.contains("2024-12-31"));
        assert!(sales_order_header_query(None).ends_with("ORDER BY t.id"));
    }
}
