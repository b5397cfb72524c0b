use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{CasebookError, Result};
use crate::models::{CasePatch, CaseRecord};
use crate::normalize::normalize_key;
#[cfg(feature = "xlsx")]
use crate::normalize::normalize_date;
#[cfg(feature = "xlsx")]
use crate::schema::ColumnMap;
use crate::schema::map_records;
use crate::table::Sheet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Cells written to xlsx as numbers: only text that reads back unchanged, so
/// `007` or a 20-digit case id stays text.
#[cfg(feature = "xlsx")]
fn plain_number(cell: &str) -> Option<f64> {
    let value = cell.parse::<f64>().ok().filter(|v| v.is_finite())?;
    (value.to_string() == cell).then_some(value)
}

/// `;` when the header line has more unquoted semicolons than commas, as
/// French-locale spreadsheet exports write it.
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();

    let (mut semicolons, mut commas, mut quoted) = (0usize, 0usize, false);
    for c in header.chars() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => semicolons += 1,
            ',' if !quoted => commas += 1,
            _ => {}
        }
    }
    Ok(if semicolons > commas { b';' } else { b',' })
}

// ---------------------------------------------------------------------------
// Formats: enum dispatch on file extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkbookFormat {
    Csv { delimiter: u8 },
    #[cfg(feature = "xlsx")]
    Xlsx,
    /// Read-only spreadsheet formats (xls, xlsb, ods).
    #[cfg(feature = "xlsx")]
    Legacy,
}

impl WorkbookFormat {
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv {
                delimiter: sniff_delimiter(path)?,
            }),
            #[cfg(feature = "xlsx")]
            "xlsx" | "xlsm" => Ok(Self::Xlsx),
            #[cfg(feature = "xlsx")]
            "xls" | "xlsb" | "ods" => Ok(Self::Legacy),
            _ => Err(CasebookError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<Sheet>> {
        match self {
            Self::Csv { delimiter } => read_csv(path, *delimiter),
            #[cfg(feature = "xlsx")]
            Self::Xlsx | Self::Legacy => read_spreadsheet(path),
        }
    }

    fn write(&self, path: &Path, sheets: &[Sheet]) -> Result<()> {
        match self {
            Self::Csv { delimiter } => write_csv(path, sheets, *delimiter),
            #[cfg(feature = "xlsx")]
            Self::Xlsx => write_xlsx(path, sheets),
            #[cfg(feature = "xlsx")]
            Self::Legacy => Err(CasebookError::UnsupportedFormat(format!(
                "{} (save as .xlsx or .csv to edit)",
                path.display()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

/// In-memory snapshot of the workbook file, owned by one command invocation.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub path: PathBuf,
    pub format: WorkbookFormat,
    /// SHA-256 of the file as last loaded or saved.
    pub checksum: String,
    pub sheets: Vec<Sheet>,
}

pub struct SaveResult {
    pub backup: Option<PathBuf>,
}

impl Workbook {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CasebookError::NoData(format!(
                "workbook not found: {}",
                path.display()
            )));
        }
        let format = WorkbookFormat::detect(path)?;
        let checksum = compute_checksum(path)?;
        let sheets = format.read(path)?;
        info!(path = %path.display(), sheets = sheets.len(), "loaded workbook");
        Ok(Self {
            path: path.to_path_buf(),
            format,
            checksum,
            sheets,
        })
    }

    fn clients_index(&self, sheet_name: &str) -> Result<usize> {
        // A CSV file is the Clients table itself.
        if matches!(self.format, WorkbookFormat::Csv { .. }) && self.sheets.len() == 1 {
            return Ok(0);
        }
        let wanted = normalize_key(sheet_name);
        self.sheets
            .iter()
            .position(|s| normalize_key(&s.name) == wanted)
            .ok_or_else(|| {
                CasebookError::NoData(format!(
                    "no '{sheet_name}' sheet in {}",
                    self.path.display()
                ))
            })
    }

    /// The canonical case table. Missing or empty sheets are a no-data
    /// condition; callers stop rather than report over nothing.
    pub fn clients(&self, sheet_name: &str) -> Result<&Sheet> {
        let sheet = &self.sheets[self.clients_index(sheet_name)?];
        if sheet.is_empty() {
            return Err(CasebookError::NoData(format!(
                "'{}' sheet has no case rows",
                sheet.name
            )));
        }
        Ok(sheet)
    }

    pub fn records(&self, sheet_name: &str) -> Result<Vec<CaseRecord>> {
        Ok(map_records(self.clients(sheet_name)?))
    }

    /// Apply patches to the Clients sheet in order; returns the edited row.
    pub fn apply(&mut self, sheet_name: &str, patches: &[CasePatch]) -> Result<Vec<usize>> {
        let idx = self.clients_index(sheet_name)?;
        patches
            .iter()
            .map(|p| self.sheets[idx].apply_patch(p))
            .collect()
    }

    /// Write every sheet back to `path`.
    ///
    /// Refuses to overwrite a file that changed since it was loaded unless
    /// `force` is set. The new file is written beside the old one and renamed
    /// into place.
    pub fn save(&mut self, force: bool, backup: bool) -> Result<SaveResult> {
        if self.path.exists() {
            let on_disk = compute_checksum(&self.path)?;
            if on_disk != self.checksum {
                if !force {
                    return Err(CasebookError::StaleWorkbook(self.path.display().to_string()));
                }
                warn!(path = %self.path.display(), "overwriting workbook changed on disk");
            }
        }

        let backup_path = if backup && self.path.exists() {
            Some(self.backup()?)
        } else {
            None
        };

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workbook");
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));
        self.format.write(&tmp, &self.sheets)?;
        std::fs::rename(&tmp, &self.path)?;
        self.checksum = compute_checksum(&self.path)?;
        info!(path = %self.path.display(), "saved workbook");

        Ok(SaveResult {
            backup: backup_path,
        })
    }

    fn backup(&self) -> Result<PathBuf> {
        let dir = self
            .path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"));
        std::fs::create_dir_all(&dir)?;
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("workbook");
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bak");
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let dest = dir.join(format!("{stem}-{stamp}.{ext}"));
        std::fs::copy(&self.path, &dest)?;
        debug!(backup = %dest.display(), "backed up workbook");
        Ok(dest)
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(path: &Path, delimiter: u8) -> Result<Vec<Sheet>> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<String> = record
            .iter()
            .map(|c| c.trim_start_matches('\u{feff}').to_string())
            .collect();
        if headers.is_none() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            headers = Some(cells);
        } else {
            rows.push(cells);
        }
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Clients")
        .to_string();
    Ok(vec![Sheet {
        name,
        headers: headers.unwrap_or_default(),
        rows,
        ..Sheet::default()
    }])
}

fn write_csv(path: &Path, sheets: &[Sheet], delimiter: u8) -> Result<()> {
    let sheet = sheets
        .first()
        .ok_or_else(|| CasebookError::NoData("nothing to save".to_string()))?;
    let width = sheet
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(sheet.headers.len()))
        .max()
        .unwrap_or(0);

    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    let mut headers = sheet.headers.clone();
    headers.resize(width, String::new());
    wtr.write_record(&headers)?;
    for row in &sheet.rows {
        let mut row = row.clone();
        row.resize(width, String::new());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Spreadsheets (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;
    use crate::normalize::excel_serial_to_date;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).format("%Y-%m-%d").to_string(),
        Data::Error(e) => {
            debug!(error = ?e, "cell error read as empty");
            String::new()
        }
    }
}

#[cfg(feature = "xlsx")]
fn is_blank(cell: &calamine::Data) -> bool {
    cell_text(cell).trim().is_empty()
}

#[cfg(feature = "xlsx")]
fn read_spreadsheet(path: &Path) -> Result<Vec<Sheet>> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                warn!(sheet = %name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };

        // Ranges start at the first used cell, not at A1.
        let (top, left) = range.start().unwrap_or((0, 0));
        let blank = range
            .rows()
            .take_while(|row| row.iter().all(is_blank))
            .count();
        let mut rows = range.rows().skip(blank);
        let headers = rows
            .next()
            .map(|row| row.iter().map(cell_text).collect())
            .unwrap_or_default();

        let mut sheet = Sheet {
            name,
            headers,
            origin: (top + blank as u32, left as u16),
            ..Sheet::default()
        };
        for (r, row) in rows.enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if matches!(cell, Data::DateTime(_) | Data::DateTimeIso(_)) {
                    sheet.date_cells.insert((r, c));
                }
            }
            sheet.rows.push(row.iter().map(cell_text).collect());
        }
        sheets.push(sheet);
    }
    Ok(sheets)
}

/// Date cells are cells read as dates plus anything in a date column that
/// parses as one, so sent dates written by `mark-sent` land as real dates.
#[cfg(feature = "xlsx")]
fn xlsx_date(sheet: &Sheet, date_columns: &[usize], r: usize, c: usize) -> Option<rust_xlsxwriter::ExcelDateTime> {
    use chrono::Datelike;

    if !sheet.date_cells.contains(&(r, c)) && !date_columns.contains(&c) {
        return None;
    }
    let date = normalize_date(&sheet.rows[r][c])?;
    let year = u16::try_from(date.year()).ok()?;
    rust_xlsxwriter::ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

#[cfg(feature = "xlsx")]
fn write_xlsx(path: &Path, sheets: &[Sheet]) -> Result<()> {
    use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let mut workbook = XlsxWorkbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        let (top, left) = sheet.origin;
        let date_columns = ColumnMap::resolve(&sheet.headers).date_columns();

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(top, left + col as u16, header, &bold)?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            let xr = top + 1 + r as u32;
            for (c, cell) in row.iter().enumerate() {
                let xc = left + c as u16;
                if cell.is_empty() {
                    continue;
                }
                if let Some(date) = xlsx_date(sheet, &date_columns, r, c) {
                    worksheet.write_datetime_with_format(xr, xc, &date, &date_format)?;
                } else if let Some(n) = plain_number(cell) {
                    worksheet.write_number(xr, xc, n)?;
                } else {
                    worksheet.write_string(xr, xc, cell)?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}
