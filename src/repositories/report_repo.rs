// Read-side aggregation queries. Revenue and cost always derive from line
// rows; header totals appear only in the divergence report.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::reports::{DivergenceRow, OrderRevenue, WorkOrderCost};

pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Line-derived revenue per sales order in scope. Lines whose account is
    /// on the excluded list contribute nothing; lines with no account at all
    /// still count (only *known* non-revenue accounts are filtered).
    pub async fn order_revenue(
        &self,
        year: Option<i32>,
        month: Option<i32>,
        customer: Option<&str>,
        excluded_accounts: &[String],
    ) -> Result<Vec<OrderRevenue>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT so.id AS sales_order_id, so.tran_id, so.tran_date, so.customer_name, \
             so.total AS header_total, \
             COALESCE(SUM(l.amount) FILTER (WHERE l.account IS NULL OR NOT (l.account = ANY(",
        );
        builder.push_bind(excluded_accounts);
        builder.push(
            "))), 0) AS line_revenue \
             FROM netsuite_sales_orders so \
             LEFT JOIN netsuite_sales_order_lines l ON l.sales_order_id = so.id \
             WHERE 1 = 1",
        );

        if let Some(year) = year {
            builder.push(" AND EXTRACT(YEAR FROM so.tran_date) = ");
            builder.push_bind(year);
        }
        if let Some(month) = month {
            builder.push(" AND EXTRACT(MONTH FROM so.tran_date) = ");
            builder.push_bind(month);
        }
        if let Some(customer) = customer {
            builder.push(" AND so.customer_name ILIKE ");
            builder.push_bind(format!("%{}%", customer));
        }

        builder.push(
            " GROUP BY so.id, so.tran_id, so.tran_date, so.customer_name, so.total \
             ORDER BY so.tran_date, so.tran_id",
        );

        builder
            .build_query_as::<OrderRevenue>()
            .fetch_all(&self.pool)
            .await
    }

    /// Resolved cost per work order (line costs already carry the
    /// other-charge sign convention from the mapper).
    pub async fn work_order_costs(&self, year: Option<i32>) -> Result<Vec<WorkOrderCost>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT wo.id AS work_order_id, wo.wo_number, wo.created_from_so, \
             COALESCE(SUM(l.line_cost), 0) AS total_cost \
             FROM netsuite_work_orders wo \
             LEFT JOIN netsuite_work_order_lines l ON l.work_order_id = wo.id \
             WHERE 1 = 1",
        );

        if let Some(year) = year {
            builder.push(" AND EXTRACT(YEAR FROM wo.tran_date) = ");
            builder.push_bind(year);
        }

        builder.push(" GROUP BY wo.id, wo.wo_number, wo.created_from_so ORDER BY wo.wo_number");

        builder
            .build_query_as::<WorkOrderCost>()
            .fetch_all(&self.pool)
            .await
    }

    /// Orders whose header total no longer matches the line sum. Divergence
    /// here is a monitored data-quality signal, compared against *all* lines
    /// (header totals include tax, so no account filter).
    pub async fn header_line_divergence(&self, year: Option<i32>) -> Result<Vec<DivergenceRow>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT so.id AS sales_order_id, so.tran_id, so.customer_name, \
             so.total AS header_total, \
             COALESCE(SUM(l.amount), 0) AS line_total, \
             so.total - COALESCE(SUM(l.amount), 0) AS delta \
             FROM netsuite_sales_orders so \
             LEFT JOIN netsuite_sales_order_lines l ON l.sales_order_id = so.id \
             WHERE 1 = 1",
        );

        if let Some(year) = year {
            builder.push(" AND EXTRACT(YEAR FROM so.tran_date) = ");
            builder.push_bind(year);
        }

        builder.push(
            " GROUP BY so.id, so.tran_id, so.customer_name, so.total \
             HAVING so.total <> COALESCE(SUM(l.amount), 0) \
             ORDER BY ABS(so.total - COALESCE(SUM(l.amount), 0)) DESC",
        );

        builder
            .build_query_as::<DivergenceRow>()
            .fetch_all(&self.pool)
            .await
    }

    /// Lines that synced without any resolvable item name. The mapper keeps
    /// these NULL on purpose so they stay visible here.
    pub async fn unnamed_line_count(&self, year: Option<i32>) -> Result<i64, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM netsuite_sales_order_lines l \
             JOIN netsuite_sales_orders so ON so.id = l.sales_order_id \
             WHERE l.item_name IS NULL",
        );

        if let Some(year) = year {
            builder.push(" AND EXTRACT(YEAR FROM so.tran_date) = ");
            builder.push_bind(year);
        }

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
    }
}
