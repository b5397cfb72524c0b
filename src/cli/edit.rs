use colored::Colorize;

use crate::cli::open;
use crate::derive::derive;
use crate::error::{CasebookError, Result};
use crate::models::CasePatch;
use crate::normalize::normalize_date;
use crate::schema::{map_records, Field};
use crate::settings::Settings;
use crate::table;
use crate::workbook::Workbook;

fn apply_and_save(
    settings: &Settings,
    wb: &mut Workbook,
    patches: &[CasePatch],
    force: bool,
) -> Result<usize> {
    let rows = wb.apply(&settings.sheet, patches)?;
    let saved = wb.save(force, settings.backup_on_save)?;
    if let Some(backup) = saved.backup {
        println!("Backup saved to {}", backup.display());
    }
    Ok(rows.first().copied().unwrap_or_default())
}

pub fn mark_sent(workbook: Option<&str>, case_id: &str, date: Option<&str>, force: bool) -> Result<()> {
    let date = match date {
        Some(raw) => normalize_date(raw)
            .ok_or_else(|| CasebookError::InvalidValue(format!("not a date: {raw}")))?,
        None => chrono::Local::now().date_naive(),
    };

    let (settings, mut wb) = open(workbook)?;
    let row = apply_and_save(&settings, &mut wb, &table::mark_sent(case_id, date), force)?;

    let records = map_records(wb.clients(&settings.sheet)?);
    let status = records
        .iter()
        .find(|r| r.row == row)
        .map(|r| derive(r).escrow_release_status.label())
        .unwrap_or("Blocked");
    println!(
        "Marked {} as sent on {} (row {}). Escrow: {}",
        case_id.bold(),
        date.format("%Y-%m-%d"),
        row + 2,
        status
    );
    Ok(())
}

pub fn set(workbook: Option<&str>, case_id: &str, field: &str, value: &str, force: bool) -> Result<()> {
    let field: Field = field.parse()?;
    let patch = CasePatch {
        case_id: case_id.to_string(),
        field,
        value: value.to_string(),
    };

    let (settings, mut wb) = open(workbook)?;
    let row = apply_and_save(&settings, &mut wb, &[patch], force)?;
    println!("Updated {} {} = {:?} (row {})", case_id.bold(), field, value, row + 2);
    Ok(())
}
