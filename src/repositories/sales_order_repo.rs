use sqlx::{query, PgPool, Postgres, QueryBuilder, Row};

use crate::models::netsuite::{SalesOrderLineRecord, SalesOrderRecord};

#[derive(Debug, Clone, Copy)]
pub struct ReplaceOutcome {
    pub header_id: i64,
    pub created: bool,
    pub lines_written: usize,
}

pub struct SalesOrderRepository {
    pool: PgPool,
}

impl SalesOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the header keyed on its NetSuite id and replace the line set
    /// wholesale, in one transaction. Stale lines cannot survive a resync.
    pub async fn replace(
        &self,
        header: &SalesOrderRecord,
        lines: &[SalesOrderLineRecord],
    ) -> Result<ReplaceOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = query(
            r#"
            INSERT INTO netsuite_sales_orders
                (netsuite_id, tran_id, tran_date, customer_id, customer_name, total, class)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (netsuite_id) DO UPDATE SET
                tran_id = EXCLUDED.tran_id,
                tran_date = EXCLUDED.tran_date,
                customer_id = EXCLUDED.customer_id,
                customer_name = EXCLUDED.customer_name,
                total = EXCLUDED.total,
                class = EXCLUDED.class,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(header.netsuite_id)
        .bind(&header.tran_id)
        .bind(header.tran_date)
        .bind(&header.customer_id)
        .bind(&header.customer_name)
        .bind(header.total)
        .bind(&header.class)
        .fetch_one(&mut *tx)
        .await?;

        let header_id: i64 = row.try_get("id")?;
        let created: bool = row.try_get("created")?;

        query("DELETE FROM netsuite_sales_order_lines WHERE sales_order_id = $1")
            .bind(header_id)
            .execute(&mut *tx)
            .await?;

        if !lines.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO netsuite_sales_order_lines \
                 (sales_order_id, line_seq, item_id, item_name, description, quantity, rate, amount, account) ",
            );
            builder.push_values(lines, |mut b, line| {
                b.push_bind(header_id)
                    .push_bind(line.line_seq)
                    .push_bind(&line.item_id)
                    .push_bind(&line.item_name)
                    .push_bind(&line.description)
                    .push_bind(line.quantity)
                    .push_bind(line.rate)
                    .push_bind(line.amount)
                    .push_bind(&line.account);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(ReplaceOutcome {
            header_id,
            created,
            lines_written: lines.len(),
        })
    }

    /// Delete one batch of headers by NetSuite id. Lines go with them via
    /// the FK cascade. Returns rows affected for the batch report.
    pub async fn delete_by_netsuite_ids(&self, ids: &[i64]) -> Result<u64, sqlx::Error> {
        let result = query("DELETE FROM netsuite_sales_orders WHERE netsuite_id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
