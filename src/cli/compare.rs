use comfy_table::{Cell, Table};

use crate::aggregate::{check_years, compare, filter_cases, metric_rows, resolve_years, CaseFilter, GroupBy};
use crate::cli::{label_cell, open};
use crate::error::{CasebookError, Result};
use crate::fmt::money;

pub fn run(workbook: Option<&str>, years: Vec<i32>, by: GroupBy, category: Option<String>) -> Result<()> {
    let (settings, wb) = open(workbook)?;
    let records = wb.records(&settings.sheet)?;
    let filter = CaseFilter {
        category,
        ..CaseFilter::default()
    };
    let records = filter_cases(&records, &filter);

    let requested = if years.is_empty() { settings.years.clone() } else { years };
    let years = resolve_years(&records, &requested);
    if years.is_empty() {
        return Err(CasebookError::NoData("no dated cases to compare".to_string()));
    }
    check_years(&years)?;

    let cmp = compare(&records, by, &years);
    let mut header = vec![cmp.group_by.label().to_string()];
    header.extend(cmp.years.iter().map(|y| y.to_string()));

    let mut table = Table::new();
    table.set_header(header);

    if by == GroupBy::Year {
        for row in metric_rows(&cmp) {
            let mut cells = vec![Cell::new(row.metric)];
            cells.extend(row.values.into_iter().map(Cell::new));
            table.add_row(cells);
        }
        println!("Year-over-Year\n{table}");
        return Ok(());
    }

    for row in &cmp.rows {
        let mut cells = vec![Cell::new(label_cell(&row.label))];
        cells.extend(row.per_year.iter().map(|t| Cell::new(money(t.billed))));
        table.add_row(cells);
    }
    let mut totals = vec![Cell::new("Total")];
    totals.extend(cmp.year_totals().iter().map(|t| Cell::new(money(t.billed))));
    table.add_row(totals);
    println!("Billed by {} and Year\n{table}", cmp.group_by.label());
    Ok(())
}
