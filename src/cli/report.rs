use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::aggregate::{filter_cases, top_n, CaseFilter, RankBy};
use crate::cli::{date_cell, label_cell, open, FilterArgs};
use crate::derive::derive;
use crate::error::Result;
use crate::fmt::money;
use crate::models::{CaseRecord, EscrowReleaseStatus};
use crate::reports;

fn load_filtered(workbook: Option<&str>, filter: FilterArgs) -> Result<(crate::settings::Settings, Vec<CaseRecord>)> {
    let (settings, wb) = open(workbook)?;
    let records = wb.records(&settings.sheet)?;
    let filter: CaseFilter = filter.into();
    Ok((settings, filter_cases(&records, &filter)))
}

fn balance_cell(balance: f64) -> String {
    if balance > 0.0 {
        money(balance).red().to_string()
    } else if balance < 0.0 {
        money(balance).yellow().to_string()
    } else {
        money(balance).green().to_string()
    }
}

pub fn list(workbook: Option<&str>, filter: FilterArgs) -> Result<()> {
    let (_, records) = load_filtered(workbook, filter)?;
    if records.is_empty() {
        println!("No cases found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Case", "Name", "Date", "Category", "Visa", "Billed", "Paid", "Balance", "Escrow", "Status",
    ]);
    for r in &records {
        let d = derive(r);
        table.add_row(vec![
            Cell::new(&r.case_id),
            Cell::new(&r.name),
            Cell::new(date_cell(r.date)),
            Cell::new(label_cell(&r.category)),
            Cell::new(&r.visa_type),
            Cell::new(money(d.billed_amount)),
            Cell::new(money(d.total_paid)),
            Cell::new(balance_cell(d.remaining_balance)),
            Cell::new(if d.is_escrow { "yes" } else { "" }),
            Cell::new(r.status().label()),
        ]);
    }
    println!("Cases ({})\n{table}", records.len());
    Ok(())
}

pub fn dashboard(workbook: Option<&str>, filter: FilterArgs) -> Result<()> {
    let (_, records) = load_filtered(workbook, filter)?;
    let dash = reports::get_dashboard(&records);

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Cases"), Cell::new(dash.cases)]);
    if dash.undated > 0 {
        table.add_row(vec![Cell::new("  without a date"), Cell::new(dash.undated)]);
    }
    table.add_row(vec![Cell::new("Billed"), Cell::new(money(dash.billed))]);
    table.add_row(vec![Cell::new("Paid"), Cell::new(money(dash.paid).green())]);
    table.add_row(vec![
        Cell::new("Outstanding"),
        Cell::new(money(dash.outstanding).red()),
    ]);
    table.add_row(vec![Cell::new("Escrow cases"), Cell::new(dash.escrow_cases)]);
    table.add_row(vec![Cell::new("Held in escrow"), Cell::new(money(dash.escrow_held))]);
    table.add_row(vec![
        Cell::new("Ready to release"),
        Cell::new(dash.ready_to_release),
    ]);
    println!("Dashboard\n{table}");

    let mut status = Table::new();
    status.set_header(vec!["Status", "Cases"]);
    for (s, count) in &dash.by_status {
        status.add_row(vec![Cell::new(s.label()), Cell::new(count)]);
    }
    println!("\nCase Status\n{status}");

    if !dash.by_category.is_empty() {
        let mut cats = Table::new();
        cats.set_header(vec!["Category", "Cases", "Billed"]);
        for row in &dash.by_category {
            cats.add_row(vec![
                Cell::new(label_cell(&row.label)),
                Cell::new(row.totals.count),
                Cell::new(money(row.totals.billed)),
            ]);
        }
        println!("\nBilled by Category (dated cases)\n{cats}");
    }
    Ok(())
}

pub fn accounting(workbook: Option<&str>, filter: FilterArgs, outstanding: bool) -> Result<()> {
    let (_, records) = load_filtered(workbook, filter)?;
    let report = reports::get_accounting(&records, outstanding);

    if report.rows.is_empty() {
        println!("No cases found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Case", "Name", "Date", "Category", "Billed", "Paid", "Balance"]);
    for r in &report.rows {
        table.add_row(vec![
            Cell::new(&r.case_id),
            Cell::new(&r.name),
            Cell::new(date_cell(r.date)),
            Cell::new(label_cell(&r.category)),
            Cell::new(money(r.billed)),
            Cell::new(money(r.paid)),
            Cell::new(balance_cell(r.balance)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(report.total_billed)),
        Cell::new(money(report.total_paid)),
        Cell::new(balance_cell(report.total_balance)),
    ]);
    println!("Accounting\n{table}");

    if !report.receipts.is_empty() {
        let mut receipts = Table::new();
        receipts.set_header(vec!["Payment year", "Installments", "Received"]);
        for r in &report.receipts {
            let year = r.year.map(|y| y.to_string()).unwrap_or_else(|| "undated".to_string());
            receipts.add_row(vec![Cell::new(year), Cell::new(r.count), Cell::new(money(r.amount))]);
        }
        println!("\nReceipts by Payment Year\n{receipts}");
    }
    Ok(())
}

pub fn escrow(workbook: Option<&str>, filter: FilterArgs) -> Result<()> {
    let (_, records) = load_filtered(workbook, filter)?;
    let report = reports::get_escrow(&records);

    if report.rows.is_empty() {
        println!("No escrow cases.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Case", "Name", "Held", "Sent", "Status", "Source"]);
    for r in &report.rows {
        let status = match r.status {
            EscrowReleaseStatus::ReadyToRelease => r.status.label().green(),
            EscrowReleaseStatus::Blocked => r.status.label().yellow(),
        };
        table.add_row(vec![
            Cell::new(&r.case_id),
            Cell::new(&r.name),
            Cell::new(money(r.held)),
            Cell::new(date_cell(r.sent_date)),
            Cell::new(status),
            Cell::new(if r.auto_detected { "auto (no fee)" } else { "flag" }),
        ]);
    }
    println!("Escrow\n{table}");
    println!(
        "Blocked: {} case(s), {}   Ready to release: {} case(s), {}",
        report.blocked_count,
        money(report.blocked_total),
        report.ready_count,
        money(report.ready_total)
    );
    Ok(())
}

pub fn top(workbook: Option<&str>, n: Option<usize>, by: RankBy, filter: FilterArgs) -> Result<()> {
    let (settings, records) = load_filtered(workbook, filter)?;
    let n = n.unwrap_or(settings.top_n);
    let ranked = top_n(&records, n, by);

    if ranked.is_empty() {
        println!("No cases found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Case", "Name", "Category", "Billed", "Paid", "Balance"]);
    for (i, r) in ranked.iter().enumerate() {
        let d = derive(r);
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&r.case_id),
            Cell::new(&r.name),
            Cell::new(label_cell(&r.category)),
            Cell::new(money(d.billed_amount)),
            Cell::new(money(d.total_paid)),
            Cell::new(balance_cell(d.remaining_balance)),
        ]);
    }
    println!("Top {} Cases by {}\n{table}", ranked.len(), by.label());
    Ok(())
}
