use sqlx::{query, PgPool, Postgres, QueryBuilder, Row};

use crate::models::netsuite::{WorkOrderLineRecord, WorkOrderRecord};
use crate::repositories::sales_order_repo::ReplaceOutcome;

pub struct WorkOrderRepository {
    pool: PgPool,
}

impl WorkOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Same contract as the sales-order side: header upsert keyed on the
    /// NetSuite id, then wholesale line replacement, transactionally.
    pub async fn replace(
        &self,
        header: &WorkOrderRecord,
        lines: &[WorkOrderLineRecord],
    ) -> Result<ReplaceOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = query(
            r#"
            INSERT INTO netsuite_work_orders
                (netsuite_id, wo_number, tran_date, status, created_from_so)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (netsuite_id) DO UPDATE SET
                wo_number = EXCLUDED.wo_number,
                tran_date = EXCLUDED.tran_date,
                status = EXCLUDED.status,
                created_from_so = EXCLUDED.created_from_so,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(header.netsuite_id)
        .bind(&header.wo_number)
        .bind(header.tran_date)
        .bind(&header.status)
        .bind(&header.created_from_so)
        .fetch_one(&mut *tx)
        .await?;

        let header_id: i64 = row.try_get("id")?;
        let created: bool = row.try_get("created")?;

        query("DELETE FROM netsuite_work_order_lines WHERE work_order_id = $1")
            .bind(header_id)
            .execute(&mut *tx)
            .await?;

        if !lines.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO netsuite_work_order_lines \
                 (work_order_id, line_seq, item_id, item_name, item_type, quantity, line_cost) ",
            );
            builder.push_values(lines, |mut b, line| {
                b.push_bind(header_id)
                    .push_bind(line.line_seq)
                    .push_bind(&line.item_id)
                    .push_bind(&line.item_name)
                    .push_bind(&line.item_type)
                    .push_bind(line.quantity)
                    .push_bind(line.line_cost);
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

    pub async fn delete_by_netsuite_ids(&self, ids: &[i64]) -> Result<u64, sqlx::Error> {
        let result = query("DELETE FROM netsuite_work_orders WHERE netsuite_id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
