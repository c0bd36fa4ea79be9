// Closeout workbook import. The sheet interleaves project header rows with
// their work-order rows: a row with the Project cell set starts a project,
// rows below it with a blank Project cell and a WO number belong to it.
// A bad row is recorded and skipped; one malformed cell never aborts the
// whole import.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::closeout::{
    CloseoutProjectRecord, CloseoutWorkOrderRecord, EnrichReport, ImportReport, RowError,
};
use crate::models::netsuite::normalize_wo_number;
use crate::repositories::{CloseoutRepository, ReportRepository};
use crate::services::spreadsheet_parser::{ParsedSheet, SpreadsheetParser};

pub struct CloseoutImportService {
    closeouts: CloseoutRepository,
    reports: ReportRepository,
}

impl CloseoutImportService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            closeouts: CloseoutRepository::new(pool.clone()),
            reports: ReportRepository::new(pool),
        }
    }

    pub async fn import(&self, data: &[u8], filename: &str) -> Result<ImportReport> {
        let sheet = SpreadsheetParser::parse(data, filename)?;
        let layout = ColumnLayout::resolve(&sheet.headers)?;
        let (projects, mut errors) = group_rows(&layout, &sheet);

        let mut report = ImportReport::default();

        for project in &projects {
            let (project_id, created) = match self.closeouts.upsert_project(project).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Failed to upsert project '{}': {}", project.project_name, e);
                    errors.push(RowError {
                        row: project.source_row,
                        message: format!("Project '{}' failed to save: {}", project.project_name, e),
                    });
                    continue;
                }
            };

            if created {
                report.projects_created += 1;
            } else {
                report.projects_updated += 1;
            }

            for wo in &project.work_orders {
                match self.closeouts.upsert_work_order(project_id, wo).await {
                    Ok(true) => report.work_orders_created += 1,
                    Ok(false) => report.work_orders_updated += 1,
                    Err(e) => {
                        tracing::error!("Failed to upsert work order '{}': {}", wo.wo_number, e);
                        errors.push(RowError {
                            row: wo.source_row,
                            message: format!("Work order '{}' failed to save: {}", wo.wo_number, e),
                        });
                    }
                }
            }
        }

        tracing::info!(
            "Closeout import: {} projects created, {} updated, {} WOs created, {} updated, {} row errors",
            report.projects_created,
            report.projects_updated,
            report.work_orders_created,
            report.work_orders_updated,
            errors.len()
        );

        report.errors = errors;
        Ok(report)
    }

    /// Cross-reference closeout work orders against synced NetSuite work
    /// orders (wo_number match, "WO" prefix normalized away) and copy the
    /// line-derived actual cost onto the matched rows.
    pub async fn enrich_from_netsuite(&self, year: i32) -> Result<EnrichReport> {
        let costs = self.reports.work_order_costs(Some(year)).await?;
        let cost_index: std::collections::HashMap<String, Decimal> = costs
            .iter()
            .map(|c| (normalize_wo_number(&c.wo_number), c.total_cost))
            .collect();

        let closeout_wos = self.closeouts.work_orders_for_year(year).await?;

        let mut report = EnrichReport::default();
        let mut touched_projects = std::collections::HashSet::new();

        for wo in &closeout_wos {
            match cost_index.get(&normalize_wo_number(&wo.wo_number)) {
                Some(actual_cost) => {
                    self.closeouts
                        .set_work_order_actual_cost(wo.id, *actual_cost)
                        .await?;
                    touched_projects.insert(wo.closeout_project_id);
                    report.work_orders_matched += 1;
                }
                None => report.work_orders_unmatched += 1,
            }
        }

        for project_id in &touched_projects {
            self.closeouts.mark_project_enriched(*project_id).await?;
        }
        report.projects_enriched = touched_projects.len();

        tracing::info!(
            "Closeout enrichment for {}: {} matched, {} unmatched, {} projects flagged",
            year,
            report.work_orders_matched,
            report.work_orders_unmatched,
            report.projects_enriched
        );

        Ok(report)
    }
}

// ----------------------------------------------------------------------------
// Grid → records
// ----------------------------------------------------------------------------

struct ColumnLayout {
    project: usize,
    year: usize,
    month: usize,
    project_type: Option<usize>,
    wo_number: usize,
    budget_revenue: Option<usize>,
    actual_revenue: Option<usize>,
    budget_cost: Option<usize>,
    actual_cost: Option<usize>,
}

impl ColumnLayout {
    fn resolve(headers: &[String]) -> Result<Self> {
        let find = |names: &[&str]| -> Option<usize> {
            headers.iter().position(|h| {
                let h = h.to_lowercase();
                names.iter().any(|n| h == *n)
            })
        };

        let required = |names: &[&str]| -> Result<usize> {
            find(names).ok_or_else(|| {
                AppError::InvalidInput(format!("Workbook is missing a '{}' column", names[0]))
            })
        };

        Ok(Self {
            project: required(&["project", "project name"])?,
            year: required(&["year"])?,
            month: required(&["month"])?,
            project_type: find(&["type", "project type"]),
            wo_number: required(&["wo #", "wo", "wo number", "work order"])?,
            budget_revenue: find(&["budget revenue", "budgeted revenue"]),
            actual_revenue: find(&["actual revenue"]),
            budget_cost: find(&["budget cost", "budgeted cost"]),
            actual_cost: find(&["actual cost"]),
        })
    }
}

/// Walk the grid once, attaching work-order rows to the project row above
/// them. Returns the groups plus every row that could not be used.
fn group_rows(layout: &ColumnLayout, sheet: &ParsedSheet) -> (Vec<CloseoutProjectRecord>, Vec<RowError>) {
    let mut projects: Vec<CloseoutProjectRecord> = Vec::new();
    let mut errors = Vec::new();
    // None until a project row parses; a failed project row poisons its
    // work-order rows rather than letting them attach to the wrong project.
    let mut current: Option<usize> = None;

    for (idx, row) in sheet.rows.iter().enumerate() {
        let row_number = idx + 2; // header occupies row 1
        let project_cell = cell(row, layout.project);
        let wo_cell = cell(row, layout.wo_number);

        if !project_cell.is_empty() {
            match parse_project_row(layout, row, row_number) {
                Ok(record) => {
                    projects.push(record);
                    current = Some(projects.len() - 1);
                }
                Err(message) => {
                    errors.push(RowError { row: row_number, message });
                    current = None;
                }
            }
        } else if !wo_cell.is_empty() {
            match current {
                Some(project_idx) => match parse_wo_row(layout, row, row_number) {
                    Ok(record) => projects[project_idx].work_orders.push(record),
                    Err(message) => errors.push(RowError { row: row_number, message }),
                },
                None => errors.push(RowError {
                    row: row_number,
                    message: "Work order row has no preceding project row".to_string(),
                }),
            }
        }
        // Rows with neither a project nor a WO number are spacers; skip.
    }

    (projects, errors)
}

fn parse_project_row(
    layout: &ColumnLayout,
    row: &[String],
    row_number: usize,
) -> std::result::Result<CloseoutProjectRecord, String> {
    let year: i32 = cell(row, layout.year)
        .parse()
        .map_err(|_| format!("Invalid year '{}'", cell(row, layout.year)))?;
    let month: i32 = cell(row, layout.month)
        .parse()
        .map_err(|_| format!("Invalid month '{}'", cell(row, layout.month)))?;
    if !(1..=12).contains(&month) {
        return Err(format!("Month {} out of range", month));
    }

    Ok(CloseoutProjectRecord {
        source_row: row_number,
        project_name: cell(row, layout.project),
        year,
        month,
        project_type: layout
            .project_type
            .map(|i| cell(row, i))
            .filter(|s| !s.is_empty()),
        budget_revenue: money(row, layout.budget_revenue, "budget revenue")?,
        actual_revenue: money(row, layout.actual_revenue, "actual revenue")?,
        budget_cost: money(row, layout.budget_cost, "budget cost")?,
        actual_cost: money(row, layout.actual_cost, "actual cost")?,
        work_orders: Vec::new(),
    })
}

fn parse_wo_row(
    layout: &ColumnLayout,
    row: &[String],
    row_number: usize,
) -> std::result::Result<CloseoutWorkOrderRecord, String> {
    Ok(CloseoutWorkOrderRecord {
        source_row: row_number,
        wo_number: cell(row, layout.wo_number),
        budget_cost: money(row, layout.budget_cost, "budget cost")?,
        actual_cost: money(row, layout.actual_cost, "actual cost")?,
        actual_revenue: money(row, layout.actual_revenue, "actual revenue")?,
    })
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index).map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Parse a money cell. Empty means zero; anything non-numeric is a row
/// error. Accepts "$1,234.56" style formatting.
fn money(
    row: &[String],
    index: Option<usize>,
    column: &str,
) -> std::result::Result<Decimal, String> {
    let Some(index) = index else {
        return Ok(Decimal::ZERO);
    };
    let raw = cell(row, index);
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {} value '{}'", column, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::services::spreadsheet_parser::{ParsedSheet, SheetFormat};

    fn sheet(rows: Vec<Vec<&str>>) -> (ColumnLayout, ParsedSheet) {
        let headers: Vec<String> = vec![
            "Project", "Year", "Month", "Type", "WO #",
            "Budget Revenue", "Actual Revenue", "Budget Cost", "Actual Cost",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let layout = ColumnLayout::resolve(&headers).unwrap();
        let sheet = ParsedSheet {
            format: SheetFormat::Csv,
            file_hash: String::new(),
            headers,
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
            empty_rows_skipped: 0,
            warnings: Vec::new(),
        };
        (layout, sheet)
    }

    #[test]
    fn projects_claim_the_wo_rows_beneath_them() {
        let (layout, sheet) = sheet(vec![
            vec!["Riverton WTP", "2024", "3", "Upgrade", "", "100000", "98000", "60000", "61500"],
            vec!["", "", "", "", "6721", "", "", "20000", "21000"],
            vec!["", "", "", "", "WO6722", "", "", "40000", "40500"],
            vec!["Lakeside Lift", "2024", "4", "Service", "", "50000", "50000", "30000", "29000"],
            vec!["", "", "", "", "6801", "", "", "30000", "29000"],
        ]);

        let (projects, errors) = group_rows(&layout, &sheet);

        assert!(errors.is_empty());
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].work_orders.len(), 2);
        assert_eq!(projects[0].work_orders[1].wo_number, "WO6722");
        assert_eq!(projects[1].work_orders.len(), 1);
        assert_eq!(projects[0].budget_revenue, dec!(100000));
    }

    #[test]
    fn bad_revenue_cell_skips_only_that_row() {
        let (layout, sheet) = sheet(vec![
            vec!["Riverton WTP", "2024", "3", "", "", "100000", "98000", "", ""],
            vec!["", "", "", "", "6721", "", "", "", "12000"],
            vec!["Lakeside Lift", "2024", "4", "", "", "not-a-number", "", "", ""],
            vec!["Hillcrest PS", "2024", "5", "", "", "75000", "70000", "", ""],
        ]);

        let (projects, errors) = group_rows(&layout, &sheet);

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].project_name, "Riverton WTP");
        assert_eq!(projects[1].project_name, "Hillcrest PS");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 4);
        assert!(errors[0].message.contains("not-a-number"));
    }

    #[test]
    fn wo_rows_under_a_failed_project_are_not_misattached() {
        let (layout, sheet) = sheet(vec![
            vec!["Riverton WTP", "bad-year", "3", "", "", "", "", "", ""],
            vec!["", "", "", "", "6721", "", "", "", "12000"],
        ]);

        let (projects, errors) = group_rows(&layout, &sheet);

        assert!(projects.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors[1].message.contains("no preceding project"));
    }

    #[test]
    fn currency_formatting_is_tolerated() {
        let (layout, sheet) = sheet(vec![vec![
            "Riverton WTP", "2024", "3", "", "", "$1,234.56", "", "", "",
        ]]);

        let (projects, errors) = group_rows(&layout, &sheet);
        assert!(errors.is_empty());
        assert_eq!(projects[0].budget_revenue, dec!(1234.56));
    }

    #[test]
    fn missing_required_column_is_an_input_error() {
        let headers: Vec<String> = vec!["Project", "Month", "WO #"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(ColumnLayout::resolve(&headers).is_err());
    }
}
