use colored::Colorize;

use crate::cli::open;
use crate::error::Result;
use crate::schema::{ColumnMap, Field};
use crate::settings::settings_path;

pub fn run(workbook: Option<&str>) -> Result<()> {
    let (settings, wb) = open(workbook)?;

    println!("Settings:   {}", settings_path().display());
    println!("Workbook:   {}", wb.path.display());
    println!("Format:     {:?}", wb.format);
    println!("Checksum:   {}", &wb.checksum[..12.min(wb.checksum.len())]);
    println!();
    for sheet in &wb.sheets {
        println!("Sheet {:<20} {} rows", format!("'{}'", sheet.name), sheet.rows.len());
    }

    let clients = wb.clients(&settings.sheet)?;
    let columns = ColumnMap::resolve(&clients.headers);
    println!();
    println!("Columns in '{}':", clients.name);
    for field in Field::ALL {
        match columns.index(field) {
            Some(i) => println!("  {:<20} {}", field.key(), clients.headers[i]),
            None => println!("  {:<20} {}", field.key(), "missing (defaults used)".yellow()),
        }
    }
    Ok(())
}
