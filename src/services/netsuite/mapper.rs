// Maps raw SuiteQL rows onto normalized sync records. Field access is
// tolerant: a missing, null, or oddly-typed column falls back rather than
// failing — only the identity columns (transaction id, line number) are
// required, because a record without them cannot be stored.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::netsuite::{
    SalesOrderLineRecord, SalesOrderRecord, WorkOrderLineRecord, WorkOrderRecord,
};

#[derive(Error, Debug)]
pub enum MapError {
    #[error("required field '{0}' is missing or unreadable")]
    MissingField(&'static str),
}

/// NetSuite item type whose cost rides in the quantity column, sign-encoded:
/// a negative quantity is a cost of the same magnitude.
const OTHER_CHARGE: &str = "OthCharge";

pub fn map_sales_order(row: &Map<String, Value>) -> Result<SalesOrderRecord, MapError> {
    Ok(SalesOrderRecord {
        netsuite_id: i64_field(row, "id").ok_or(MapError::MissingField("id"))?,
        tran_id: str_field(row, "tranid").ok_or(MapError::MissingField("tranid"))?,
        tran_date: date_field(row, "trandate"),
        customer_id: str_field(row, "entity"),
        customer_name: str_field(row, "customer_name"),
        total: decimal_field(row, "foreigntotal").unwrap_or(Decimal::ZERO),
        class: str_field(row, "class"),
    })
}

pub fn map_sales_order_line(row: &Map<String, Value>) -> Result<SalesOrderLineRecord, MapError> {
    Ok(SalesOrderLineRecord {
        line_seq: i64_field(row, "line").ok_or(MapError::MissingField("line"))? as i32,
        item_id: str_field(row, "item_id"),
        item_name: resolve_item_name(row),
        description: str_field(row, "description"),
        quantity: decimal_field(row, "quantity").unwrap_or(Decimal::ZERO),
        rate: decimal_field(row, "rate"),
        amount: decimal_field(row, "amount").unwrap_or(Decimal::ZERO),
        account: str_field(row, "account"),
    })
}

pub fn map_work_order(row: &Map<String, Value>) -> Result<WorkOrderRecord, MapError> {
    Ok(WorkOrderRecord {
        netsuite_id: i64_field(row, "id").ok_or(MapError::MissingField("id"))?,
        wo_number: str_field(row, "tranid").ok_or(MapError::MissingField("tranid"))?,
        tran_date: date_field(row, "trandate"),
        status: str_field(row, "status"),
        created_from_so: str_field(row, "created_from_so").map(|s| created_from_order_number(&s)),
    })
}

pub fn map_work_order_line(row: &Map<String, Value>) -> Result<WorkOrderLineRecord, MapError> {
    let item_type = str_field(row, "itemtype");
    let quantity = decimal_field(row, "quantity").unwrap_or(Decimal::ZERO);

    let line_cost = if item_type.as_deref() == Some(OTHER_CHARGE) {
        if quantity < Decimal::ZERO {
            -quantity
        } else {
            Decimal::ZERO
        }
    } else {
        decimal_field(row, "linecost").unwrap_or(Decimal::ZERO)
    };

    Ok(WorkOrderLineRecord {
        line_seq: i64_field(row, "line").ok_or(MapError::MissingField("line"))? as i32,
        item_id: str_field(row, "item_id"),
        item_name: resolve_item_name(row),
        item_type,
        quantity,
        line_cost,
    })
}

/// Item name resolution: the item master's display name wins, then the
/// BUILTIN.DF alias, then None. A None name is stored as NULL — downstream
/// data-quality reporting looks for those nulls, so no placeholder text.
fn resolve_item_name(row: &Map<String, Value>) -> Option<String> {
    str_field(row, "displayname").or_else(|| str_field(row, "item_display"))
}

/// BUILTIN.DF on createdfrom renders like "Work Order #WO123" or
/// "Sales Order #SO1042"; the cross-reference only wants the order number.
fn created_from_order_number(display: &str) -> String {
    match display.rsplit_once('#') {
        Some((_, number)) => number.trim().to_string(),
        None => display.trim().to_string(),
    }
}

// ----------------------------------------------------------------------------
// Tolerant column accessors
// ----------------------------------------------------------------------------

fn str_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn i64_field(row: &Map<String, Value>, key: &str) -> Option<i64> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decimal_field(row: &Map<String, Value>, key: &str) -> Option<Decimal> {
    match row.get(key) {
        Some(Value::Number(n)) => n.to_string().parse().ok(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date_field(row: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    let raw = str_field(row, key)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&raw, "%m/%d/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn other_charge_negative_quantity_becomes_cost() {
        let line = map_work_order_line(&row(json!({
            "line": "3",
            "item_id": "801",
            "itemtype": "OthCharge",
            "quantity": "-42.50",
        })))
        .unwrap();

        assert_eq!(line.quantity, dec!(-42.50));
        assert_eq!(line.line_cost, dec!(42.50));
    }

    #[test]
    fn other_charge_positive_quantity_carries_no_cost() {
        let line = map_work_order_line(&row(json!({
            "line": 4,
            "itemtype": "OthCharge",
            "quantity": "17.00",
            "linecost": "99.99",
        })))
        .unwrap();

        assert_eq!(line.line_cost, Decimal::ZERO);
    }

    #[test]
    fn standard_item_cost_comes_from_line_cost_column() {
        let line = map_work_order_line(&row(json!({
            "line": 1,
            "itemtype": "InvtPart",
            "quantity": "2",
            "linecost": "120.40",
        })))
        .unwrap();

        assert_eq!(line.line_cost, dec!(120.40));
    }

    #[test]
    fn item_name_falls_back_to_display_format_then_null() {
        let master = map_sales_order_line(&row(json!({
            "line": 1,
            "displayname": "Valve Assembly",
            "item_display": "VALVE-A",
        })))
        .unwrap();
        assert_eq!(master.item_name.as_deref(), Some("Valve Assembly"));

        let display = map_sales_order_line(&row(json!({
            "line": 2,
            "item_display": "VALVE-A",
        })))
        .unwrap();
        assert_eq!(display.item_name.as_deref(), Some("VALVE-A"));

        // A missing name stays None; data-quality reports count these.
        let unnamed = map_sales_order_line(&row(json!({ "line": 3 }))).unwrap();
        assert_eq!(unnamed.item_name, None);
    }

    #[test]
    fn missing_identity_field_is_an_error() {
        let err = map_sales_order(&row(json!({ "tranid": "SO1042" }))).unwrap_err();
        assert!(matches!(err, MapError::MissingField("id")));
    }

    #[test]
    fn sales_order_maps_with_fallbacks() {
        let record = map_sales_order(&row(json!({
            "id": "7001",
            "tranid": "SO1042",
            "trandate": "3/14/2024",
            "entity": 55,
            "customer_name": "Acme Waterworks",
            "foreigntotal": "1250.00",
        })))
        .unwrap();

        assert_eq!(record.netsuite_id, 7001);
        assert_eq!(record.tran_date, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(record.customer_id.as_deref(), Some("55"));
        assert_eq!(record.total, dec!(1250.00));
        assert_eq!(record.class, None);
    }

    #[test]
    fn created_from_display_is_reduced_to_order_number() {
        let record = map_work_order(&row(json!({
            "id": 9001,
            "tranid": "WO6721",
            "created_from_so": "Sales Order #SO1042",
        })))
        .unwrap();
        assert_eq!(record.created_from_so.as_deref(), Some("SO1042"));
    }
}
