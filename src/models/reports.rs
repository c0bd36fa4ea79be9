use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Per-order revenue as derived from line data. `header_total` is carried
/// only so divergence from the line sum can be monitored; aggregates never
/// trust it.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRevenue {
    pub sales_order_id: i64,
    pub tran_id: String,
    pub tran_date: Option<NaiveDate>,
    pub customer_name: Option<String>,
    pub header_total: Decimal,
    pub line_revenue: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct WorkOrderCost {
    pub work_order_id: i64,
    pub wo_number: String,
    pub created_from_so: Option<String>,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DivergenceRow {
    pub sales_order_id: i64,
    pub tran_id: String,
    pub customer_name: Option<String>,
    pub header_total: Decimal,
    pub line_total: Decimal,
    pub delta: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitabilitySummary {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub gross_profit: Decimal,
    pub gross_margin_pct: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderProfitability {
    pub tran_id: String,
    pub tran_date: Option<NaiveDate>,
    pub customer_name: Option<String>,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub gross_profit: Decimal,
    pub gross_margin_pct: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ProfitabilityReport {
    pub summary: ProfitabilitySummary,
    pub orders: Vec<OrderProfitability>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfitabilityQuery {
    #[validate(range(min = 2000, max = 2100, message = "Year out of range"))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 12, message = "Month out of range"))]
    pub month: Option<i32>,
    pub customer: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VarianceQuery {
    #[validate(range(min = 2000, max = 2100, message = "Year out of range"))]
    pub year: Option<i32>,
}
