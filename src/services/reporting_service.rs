// Read-side profitability and variance reporting. Revenue comes from sales
// order lines (known non-revenue accounts filtered out), cost from work
// order lines, linked to their sales order through an explicit order-number
// index built once per run — never by re-querying per row.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::reports::{
    DivergenceRow, OrderProfitability, ProfitabilityReport, ProfitabilitySummary, WorkOrderCost,
};
use crate::repositories::ReportRepository;

/// Account names whose line amounts are not revenue. Tax collected on an
/// order shows up as a line but belongs to the state, not the P&L.
pub const NON_REVENUE_ACCOUNTS: &[&str] = &[
    "Sales Tax Payable",
    "Use Tax Payable",
    "Freight Tax Payable",
];

/// Order-number → sales-order bucket lookup for the denormalized
/// WorkOrder.created_from_so reference. Still logically a string join, but
/// built once and named instead of scattered through the queries.
pub struct SalesOrderIndex {
    by_tran_id: HashMap<String, usize>,
}

impl SalesOrderIndex {
    pub fn build<'a>(tran_ids: impl Iterator<Item = &'a str>) -> Self {
        Self {
            by_tran_id: tran_ids
                .enumerate()
                .map(|(idx, id)| (normalize_order_number(id), idx))
                .collect(),
        }
    }

    pub fn lookup(&self, order_number: &str) -> Option<usize> {
        self.by_tran_id.get(&normalize_order_number(order_number)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_tran_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tran_id.is_empty()
    }
}

fn normalize_order_number(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Gross margin as a percentage, defined as 0 when revenue is 0 — a
/// zero-revenue scope reports 0%, never NaN or a panic.
pub fn gross_margin_pct(gross_profit: Decimal, revenue: Decimal) -> Decimal {
    if revenue.is_zero() {
        Decimal::ZERO
    } else {
        (gross_profit / revenue * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

pub struct ReportingService {
    repo: ReportRepository,
}

impl ReportingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: ReportRepository::new(pool),
        }
    }

    pub async fn profitability(
        &self,
        year: Option<i32>,
        month: Option<i32>,
        customer: Option<&str>,
    ) -> Result<ProfitabilityReport, sqlx::Error> {
        let excluded: Vec<String> = NON_REVENUE_ACCOUNTS.iter().map(|s| s.to_string()).collect();
        let revenue_rows = self.repo.order_revenue(year, month, customer, &excluded).await?;

        // Costs are pulled for the whole year scope (month/customer filters
        // apply to the order side); linking happens through the index.
        let costs = self.repo.work_order_costs(year).await?;
        let index = SalesOrderIndex::build(revenue_rows.iter().map(|r| r.tran_id.as_str()));

        let mut cost_per_order = vec![Decimal::ZERO; revenue_rows.len()];
        let mut unlinked = 0usize;
        for cost in &costs {
            match cost
                .created_from_so
                .as_deref()
                .and_then(|so| index.lookup(so))
            {
                Some(order_idx) => cost_per_order[order_idx] += cost.total_cost,
                None => unlinked += 1,
            }
        }
        if unlinked > 0 {
            tracing::debug!(
                "{} work orders had no in-scope sales order to link to",
                unlinked
            );
        }

        let orders: Vec<OrderProfitability> = revenue_rows
            .iter()
            .zip(cost_per_order)
            .map(|(row, cost)| {
                let gross_profit = row.line_revenue - cost;
                OrderProfitability {
                    tran_id: row.tran_id.clone(),
                    tran_date: row.tran_date,
                    customer_name: row.customer_name.clone(),
                    revenue: row.line_revenue,
                    cost,
                    gross_profit,
                    gross_margin_pct: gross_margin_pct(gross_profit, row.line_revenue),
                }
            })
            .collect();

        let revenue: Decimal = orders.iter().map(|o| o.revenue).sum();
        let cost: Decimal = orders.iter().map(|o| o.cost).sum();
        let gross_profit = revenue - cost;

        Ok(ProfitabilityReport {
            summary: ProfitabilitySummary {
                revenue,
                cost,
                gross_profit,
                gross_margin_pct: gross_margin_pct(gross_profit, revenue),
            },
            orders,
        })
    }

    /// Orders whose header total disagrees with the line sum, plus lines
    /// that synced without a resolvable item name.
    pub async fn variance(
        &self,
        year: Option<i32>,
    ) -> Result<(Vec<DivergenceRow>, i64), sqlx::Error> {
        let rows = self.repo.header_line_divergence(year).await?;
        let unnamed = self.repo.unnamed_line_count(year).await?;
        Ok((rows, unnamed))
    }
}

/// Sum resolved work-order line costs for a set of cost rows. The sign
/// convention (other-charge negatives) is already folded into total_cost by
/// the mapper, so this is a plain sum.
pub fn total_cost(costs: &[WorkOrderCost]) -> Decimal {
    costs.iter().map(|c| c.total_cost).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn margin_is_zero_when_revenue_is_zero() {
        assert_eq!(gross_margin_pct(dec!(-500), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(gross_margin_pct(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn margin_is_a_rounded_percentage() {
        assert_eq!(gross_margin_pct(dec!(25), dec!(100)), dec!(25.00));
        assert_eq!(gross_margin_pct(dec!(1), dec!(3)), dec!(33.33));
    }

    #[test]
    fn index_links_orders_case_insensitively() {
        let ids = ["SO1042", "so1043"];
        let index = SalesOrderIndex::build(ids.iter().copied());

        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("so1042"), Some(0));
        assert_eq!(index.lookup(" SO1043 "), Some(1));
        assert_eq!(index.lookup("SO9999"), None);
    }

    #[test]
    fn cost_rollup_sums_resolved_line_costs() {
        let costs = vec![
            WorkOrderCost {
                work_order_id: 1,
                wo_number: "WO6721".to_string(),
                created_from_so: Some("SO1042".to_string()),
                total_cost: dec!(120.40),
            },
            WorkOrderCost {
                work_order_id: 2,
                wo_number: "WO6722".to_string(),
                created_from_so: None,
                total_cost: dec!(42.50),
            },
        ];
        assert_eq!(total_cost(&costs), dec!(162.90));
    }
}
