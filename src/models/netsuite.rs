use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ----------------------------------------------------------------------------
// Persisted rows
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalesOrder {
    pub id: i64,
    pub netsuite_id: i64,
    pub tran_id: String,
    pub tran_date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub class: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalesOrderLine {
    pub id: i64,
    pub sales_order_id: i64,
    pub line_seq: i32,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub rate: Option<Decimal>,
    pub amount: Decimal,
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrder {
    pub id: i64,
    pub netsuite_id: i64,
    pub wo_number: String,
    pub tran_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub created_from_so: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrderLine {
    pub id: i64,
    pub work_order_id: i64,
    pub line_seq: i32,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub item_type: Option<String>,
    pub quantity: Decimal,
    pub line_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncRun {
    pub id: Uuid,
    pub run_type: String,
    pub status: String,
    pub records_synced: i32,
    pub records_failed: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
}

// ----------------------------------------------------------------------------
// Normalized records produced by the mapper, consumed by the sync engine
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SalesOrderRecord {
    pub netsuite_id: i64,
    pub tran_id: String,
    pub tran_date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesOrderLineRecord {
    pub line_seq: i32,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub rate: Option<Decimal>,
    pub amount: Decimal,
    pub account: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderRecord {
    pub netsuite_id: i64,
    pub wo_number: String,
    pub tran_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub created_from_so: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderLineRecord {
    pub line_seq: i32,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub item_type: Option<String>,
    pub quantity: Decimal,
    pub line_cost: Decimal,
}

// ----------------------------------------------------------------------------
// Request DTOs
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    #[validate(range(min = 2000, max = 2100, message = "Year out of range"))]
    pub year: Option<i32>,
}

/// Normalize a work-order number for cross-referencing: closeout sheets
/// record "6721" where NetSuite records "WO6721" (sometimes "wo 6721").
pub fn normalize_wo_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let stripped = if bytes.len() >= 2 && bytes[..2].eq_ignore_ascii_case(b"wo") {
        trimmed[2..].trim_start()
    } else {
        trimmed
    };
    stripped.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wo_prefix_is_normalized_away() {
        assert_eq!(normalize_wo_number("WO6721"), normalize_wo_number("6721"));
        assert_eq!(normalize_wo_number("wo 6721"), "6721");
        assert_eq!(normalize_wo_number("  WO6721  "), "6721");
    }

    #[test]
    fn non_prefixed_numbers_pass_through() {
        assert_eq!(normalize_wo_number("6721"), "6721");
        assert_eq!(normalize_wo_number("w123"), "W123");
    }
}
