pub mod compare;
pub mod edit;
pub mod init;
pub mod report;
pub mod status;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::aggregate::{CaseFilter, GroupBy, RankBy};
use crate::error::Result;
use crate::settings::{load_settings, resolve_workbook, Settings};
use crate::workbook::Workbook;

#[derive(Parser)]
#[command(
    name = "casebook",
    version,
    about = "Case ledger, escrow tracking and year-over-year reports for an immigration-services office."
)]
pub struct Cli {
    /// Workbook to use instead of the configured one (.xlsx, .xls, .ods or .csv)
    #[arg(long, global = true)]
    pub workbook: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only cases in this category (accents and case ignored)
    #[arg(long)]
    pub category: Option<String>,
    /// Only cases in this subcategory
    #[arg(long)]
    pub subcategory: Option<String>,
    /// Only cases with this visa type
    #[arg(long)]
    pub visa: Option<String>,
    /// Only cases opened in this year
    #[arg(long)]
    pub year: Option<i32>,
}

impl From<FilterArgs> for CaseFilter {
    fn from(args: FilterArgs) -> Self {
        CaseFilter {
            category: args.category,
            subcategory: args.subcategory,
            visa_type: args.visa,
            year: args.year,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Point casebook at a workbook and save the settings.
    Init {
        /// Path to the workbook holding the Clients sheet
        path: String,
        /// Name of the sheet holding case records
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Show the configured workbook, its sheets and column mapping.
    Status,
    /// List cases with their derived amounts.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Key figures: billed, paid, outstanding, escrow, case statuses.
    Dashboard {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Per-case billed / paid / balance ledger and receipts by year.
    Accounting {
        #[command(flatten)]
        filter: FilterArgs,
        /// Only cases with a remaining balance
        #[arg(long)]
        outstanding: bool,
    },
    /// Escrow cases and their release status.
    Escrow {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Compare years side by side (up to 5).
    Compare {
        /// Years to compare, e.g. 2022,2023,2024 (default: settings, then all years)
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
        /// Row grouping
        #[arg(long, value_enum, default_value = "year")]
        by: GroupBy,
        /// Only cases in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Largest cases by billed amount, amount paid or balance.
    Top {
        /// Number of cases to show (default: settings top_n)
        #[arg(short, long)]
        n: Option<usize>,
        /// Ranking metric
        #[arg(long, value_enum, default_value = "billed")]
        by: RankBy,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Mark a case as sent and record the sent date.
    MarkSent {
        /// Case identifier (first matching row is edited)
        case_id: String,
        /// Sent date, YYYY-MM-DD or DD/MM/YYYY (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Overwrite the workbook even if it changed on disk
        #[arg(long)]
        force: bool,
    },
    /// Set one field of a case, e.g. `casebook set A-12 acompte_2 "350,00"`.
    Set {
        /// Case identifier (first matching row is edited)
        case_id: String,
        /// Field key or column header (e.g. sent_date, "Date d'envoi")
        field: String,
        /// New cell value, stored as typed
        value: String,
        /// Overwrite the workbook even if it changed on disk
        #[arg(long)]
        force: bool,
    },
}

/// Settings plus the loaded workbook for one command.
pub(crate) fn open(workbook: Option<&str>) -> Result<(Settings, Workbook)> {
    let settings = load_settings();
    let path = resolve_workbook(workbook, &settings)?;
    let wb = Workbook::load(&path)?;
    Ok((settings, wb))
}

pub(crate) fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "\u{2014}".to_string())
}

pub(crate) fn label_cell(label: &str) -> &str {
    if label.trim().is_empty() {
        "(blank)"
    } else {
        label
    }
}
