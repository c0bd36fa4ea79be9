use rust_decimal::Decimal;
use sqlx::{query, query_as, FromRow, PgPool, Row};

use crate::models::closeout::{CloseoutProject, CloseoutProjectRecord, CloseoutWorkOrderRecord};

/// Minimal projection used when cross-referencing closeout work orders
/// against NetSuite work orders.
#[derive(Debug, Clone, FromRow)]
pub struct CloseoutWoRef {
    pub id: i64,
    pub closeout_project_id: i64,
    pub wo_number: String,
}

pub struct CloseoutRepository {
    pool: PgPool,
}

impl CloseoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a project matched on (project_name, year). Returns the row id
    /// and whether the row was created (vs updated in place).
    pub async fn upsert_project(
        &self,
        record: &CloseoutProjectRecord,
    ) -> Result<(i64, bool), sqlx::Error> {
        let row = query(
            r#"
            INSERT INTO closeout_projects
                (project_name, year, month, project_type,
                 budget_revenue, actual_revenue, budget_cost, actual_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (project_name, year) DO UPDATE SET
                month = EXCLUDED.month,
                project_type = EXCLUDED.project_type,
                budget_revenue = EXCLUDED.budget_revenue,
                actual_revenue = EXCLUDED.actual_revenue,
                budget_cost = EXCLUDED.budget_cost,
                actual_cost = EXCLUDED.actual_cost,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(&record.project_name)
        .bind(record.year)
        .bind(record.month)
        .bind(&record.project_type)
        .bind(record.budget_revenue)
        .bind(record.actual_revenue)
        .bind(record.budget_cost)
        .bind(record.actual_cost)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.try_get("id")?, row.try_get("created")?))
    }

    /// Upsert a work-order row under its project, matched on
    /// (closeout_project_id, wo_number). Returns whether it was created.
    pub async fn upsert_work_order(
        &self,
        project_id: i64,
        record: &CloseoutWorkOrderRecord,
    ) -> Result<bool, sqlx::Error> {
        let row = query(
            r#"
            INSERT INTO closeout_work_orders
                (closeout_project_id, wo_number, budget_cost, actual_cost, actual_revenue)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (closeout_project_id, wo_number) DO UPDATE SET
                budget_cost = EXCLUDED.budget_cost,
                actual_cost = EXCLUDED.actual_cost,
                actual_revenue = EXCLUDED.actual_revenue,
                updated_at = NOW()
            RETURNING (xmax = 0) AS created
            "#,
        )
        .bind(project_id)
        .bind(&record.wo_number)
        .bind(record.budget_cost)
        .bind(record.actual_cost)
        .bind(record.actual_revenue)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("created")?)
    }

    pub async fn list_projects(&self, year: Option<i32>) -> Result<Vec<CloseoutProject>, sqlx::Error> {
        match year {
            Some(year) => {
                query_as::<_, CloseoutProject>(
                    "SELECT * FROM closeout_projects WHERE year = $1 ORDER BY project_name",
                )
                .bind(year)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                query_as::<_, CloseoutProject>(
                    "SELECT * FROM closeout_projects ORDER BY year DESC, project_name",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    pub async fn work_orders_for_year(&self, year: i32) -> Result<Vec<CloseoutWoRef>, sqlx::Error> {
        query_as::<_, CloseoutWoRef>(
            r#"
            SELECT w.id, w.closeout_project_id, w.wo_number
            FROM closeout_work_orders w
            JOIN closeout_projects p ON p.id = w.closeout_project_id
            WHERE p.year = $1
            ORDER BY w.id
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn set_work_order_actual_cost(
        &self,
        work_order_id: i64,
        actual_cost: Decimal,
    ) -> Result<(), sqlx::Error> {
        query("UPDATE closeout_work_orders SET actual_cost = $1, updated_at = NOW() WHERE id = $2")
            .bind(actual_cost)
            .bind(work_order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Roll the work-order actuals up onto the project and flag it enriched.
    pub async fn mark_project_enriched(&self, project_id: i64) -> Result<(), sqlx::Error> {
        query(
            r#"
            UPDATE closeout_projects p SET
                actual_cost = (
                    SELECT COALESCE(SUM(actual_cost), 0)
                    FROM closeout_work_orders
                    WHERE closeout_project_id = p.id
                ),
                netsuite_enriched = TRUE,
                updated_at = NOW()
            WHERE p.id = $1
            "#,
        )
        .bind(project_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
