use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};
use crate::workbook::Workbook;

pub fn run(path: &str, sheet: Option<String>) -> Result<()> {
    let resolved = PathBuf::from(shellexpand_path(path));
    let mut settings = load_settings();
    if let Some(sheet) = sheet {
        settings.sheet = sheet;
    }

    // Validate before saving so a typo never becomes the configured workbook.
    let wb = Workbook::load(&resolved)?;
    let records = wb.records(&settings.sheet)?;

    settings.workbook = resolved.to_string_lossy().to_string();
    save_settings(&settings)?;

    println!("Using {} ({} cases in '{}')", resolved.display(), records.len(), settings.sheet);
    println!("Settings saved to {}", settings_path().display());
    Ok(())
}
