use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CloseoutProject {
    pub id: i64,
    pub project_name: String,
    pub year: i32,
    pub month: i32,
    pub project_type: Option<String>,
    pub budget_revenue: Decimal,
    pub actual_revenue: Decimal,
    pub budget_cost: Decimal,
    pub actual_cost: Decimal,
    pub netsuite_enriched: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CloseoutWorkOrder {
    pub id: i64,
    pub closeout_project_id: i64,
    pub wo_number: String,
    pub budget_cost: Decimal,
    pub actual_cost: Decimal,
    pub actual_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ----------------------------------------------------------------------------
// Records parsed out of the closeout workbook
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CloseoutProjectRecord {
    /// Workbook row the project header came from (for error reporting).
    pub source_row: usize,
    pub project_name: String,
    pub year: i32,
    pub month: i32,
    pub project_type: Option<String>,
    pub budget_revenue: Decimal,
    pub actual_revenue: Decimal,
    pub budget_cost: Decimal,
    pub actual_cost: Decimal,
    pub work_orders: Vec<CloseoutWorkOrderRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseoutWorkOrderRecord {
    pub source_row: usize,
    pub wo_number: String,
    pub budget_cost: Decimal,
    pub actual_cost: Decimal,
    pub actual_revenue: Decimal,
}

/// A row the importer could not use. The import keeps going; these are
/// reported back alongside the created/updated counts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub projects_created: usize,
    pub projects_updated: usize,
    pub work_orders_created: usize,
    pub work_orders_updated: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Default, Serialize)]
pub struct EnrichReport {
    pub work_orders_matched: usize,
    pub work_orders_unmatched: usize,
    pub projects_enriched: usize,
}

// ----------------------------------------------------------------------------
// Request DTOs
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct EnrichRequest {
    #[validate(range(min = 2000, max = 2100, message = "Year out of range"))]
    pub year: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CloseoutQuery {
    #[validate(range(min = 2000, max = 2100, message = "Year out of range"))]
    pub year: Option<i32>,
}
