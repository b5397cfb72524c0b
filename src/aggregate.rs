use std::collections::{BTreeSet, HashMap};

use crate::derive::{billed_amount, derive};
use crate::error::{CasebookError, Result};
use crate::fmt::money;
use crate::models::CaseRecord;
use crate::normalize::normalize_key;

/// Widest side-by-side year comparison the reports lay out.
pub const MAX_COMPARE_YEARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupBy {
    Year,
    Category,
    Subcategory,
    Visa,
}

impl GroupBy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Year => "Year",
            Self::Category => "Category",
            Self::Subcategory => "Subcategory",
            Self::Visa => "Visa type",
        }
    }

    fn text<'a>(&self, record: &'a CaseRecord) -> &'a str {
        match self {
            Self::Year => "",
            Self::Category => &record.category,
            Self::Subcategory => &record.subcategory,
            Self::Visa => &record.visa_type,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupTotals {
    pub billed: f64,
    pub fees: f64,
    pub other_fees: f64,
    pub count: usize,
}

impl GroupTotals {
    fn add(&mut self, record: &CaseRecord) {
        self.billed += billed_amount(record);
        self.fees += record.fee_amount;
        self.other_fees += record.other_fees_amount;
        self.count += 1;
    }

    fn merge(&mut self, other: &GroupTotals) {
        self.billed += other.billed;
        self.fees += other.fees;
        self.other_fees += other.other_fees;
        self.count += other.count;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub label: String,
    pub totals: GroupTotals,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Report filters. Text criteria compare canonical keys, so `Résidence`
/// matches `residence ` in the sheet.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub visa_type: Option<String>,
    pub year: Option<i32>,
}

impl CaseFilter {
    pub fn matches(&self, record: &CaseRecord) -> bool {
        let text_ok = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .map_or(true, |w| normalize_key(w) == normalize_key(actual))
        };
        text_ok(&self.category, &record.category)
            && text_ok(&self.subcategory, &record.subcategory)
            && text_ok(&self.visa_type, &record.visa_type)
            && self.year.map_or(true, |y| record.year() == Some(y))
    }
}

pub fn filter_cases(records: &[CaseRecord], filter: &CaseFilter) -> Vec<CaseRecord> {
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Requested years, or every year present (ascending) when none were given.
pub fn resolve_years(records: &[CaseRecord], years: &[i32]) -> Vec<i32> {
    if !years.is_empty() {
        return years.to_vec();
    }
    records
        .iter()
        .filter_map(CaseRecord::year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn check_years(years: &[i32]) -> Result<()> {
    if years.len() > MAX_COMPARE_YEARS {
        return Err(CasebookError::TooManyYears {
            max: MAX_COMPARE_YEARS,
            got: years.len(),
        });
    }
    Ok(())
}

/// Records with a year in `years`, in input order. Undated records never
/// take part in year-based aggregation.
fn in_years<'a>(records: &'a [CaseRecord], years: &'a [i32]) -> impl Iterator<Item = &'a CaseRecord> {
    records
        .iter()
        .filter(move |r| r.year().is_some_and(|y| years.contains(&y)))
}

/// Group display labels in order of first appearance, keyed canonically.
fn group_order<'a>(
    records: impl Iterator<Item = &'a CaseRecord>,
    group_by: GroupBy,
) -> (Vec<String>, HashMap<String, usize>) {
    let mut labels = Vec::new();
    let mut index = HashMap::new();
    for record in records {
        let text = group_by.text(record);
        index.entry(normalize_key(text)).or_insert_with(|| {
            labels.push(text.trim().to_string());
            labels.len() - 1
        });
    }
    (labels, index)
}

/// Sum billed amount, fees, other fees and count per group.
///
/// `Year` grouping emits exactly one row per requested year in the caller's
/// order, zero-filled when a year has no cases. Other groupings emit one row
/// per distinct canonical label in order of first appearance.
pub fn aggregate(records: &[CaseRecord], group_by: GroupBy, years: &[i32]) -> Vec<AggregateRow> {
    let years = resolve_years(records, years);

    if group_by == GroupBy::Year {
        let mut totals = vec![GroupTotals::default(); years.len()];
        for record in in_years(records, &years) {
            for (slot, y) in totals.iter_mut().zip(&years) {
                if record.year() == Some(*y) {
                    slot.add(record);
                }
            }
        }
        return years
            .iter()
            .zip(totals)
            .map(|(y, totals)| AggregateRow {
                label: y.to_string(),
                totals,
            })
            .collect();
    }

    let (labels, index) = group_order(in_years(records, &years), group_by);
    let mut totals = vec![GroupTotals::default(); labels.len()];
    for record in in_years(records, &years) {
        totals[index[&normalize_key(group_by.text(record))]].add(record);
    }
    labels
        .into_iter()
        .zip(totals)
        .map(|(label, totals)| AggregateRow { label, totals })
        .collect()
}

// ---------------------------------------------------------------------------
// Year-over-year comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub label: String,
    /// One entry per year of [`Comparison::years`], zero-filled.
    pub per_year: Vec<GroupTotals>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub group_by: GroupBy,
    pub years: Vec<i32>,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn year_totals(&self) -> Vec<GroupTotals> {
        let mut totals = vec![GroupTotals::default(); self.years.len()];
        for row in &self.rows {
            for (slot, t) in totals.iter_mut().zip(&row.per_year) {
                slot.merge(t);
            }
        }
        totals
    }
}

/// Dense group x year matrix. With `Year` grouping there is a single
/// all-cases row.
pub fn compare(records: &[CaseRecord], group_by: GroupBy, years: &[i32]) -> Comparison {
    let years = resolve_years(records, years);

    let (labels, index) = if group_by == GroupBy::Year {
        (vec!["All cases".to_string()], HashMap::from([(String::new(), 0)]))
    } else {
        group_order(in_years(records, &years), group_by)
    };

    let mut rows: Vec<ComparisonRow> = labels
        .into_iter()
        .map(|label| ComparisonRow {
            label,
            per_year: vec![GroupTotals::default(); years.len()],
        })
        .collect();

    for record in in_years(records, &years) {
        let row = index[&normalize_key(group_by.text(record))];
        for (slot, y) in rows[row].per_year.iter_mut().zip(&years) {
            if record.year() == Some(*y) {
                slot.add(record);
            }
        }
    }

    Comparison {
        group_by,
        years,
        rows,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub metric: &'static str,
    pub values: Vec<String>,
}

/// One display row per metric with one pre-formatted column per year.
pub fn metric_rows(comparison: &Comparison) -> Vec<MetricRow> {
    let totals = comparison.year_totals();
    vec![
        metric_row("Billed", &totals, |t| money(t.billed)),
        metric_row("Professional fees", &totals, |t| money(t.fees)),
        metric_row("Other fees", &totals, |t| money(t.other_fees)),
        metric_row("Cases", &totals, |t| t.count.to_string()),
    ]
}

fn metric_row(
    metric: &'static str,
    totals: &[GroupTotals],
    format: impl Fn(&GroupTotals) -> String,
) -> MetricRow {
    MetricRow {
        metric,
        values: totals.iter().map(format).collect(),
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Metric a `top` ranking orders cases by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RankBy {
    #[default]
    Billed,
    Paid,
    Balance,
}

impl RankBy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Billed => "Billed Amount",
            Self::Paid => "Amount Paid",
            Self::Balance => "Balance",
        }
    }

    fn value(&self, record: &CaseRecord) -> f64 {
        let d = derive(record);
        match self {
            Self::Billed => d.billed_amount,
            Self::Paid => d.total_paid,
            Self::Balance => d.remaining_balance,
        }
    }
}

/// The `n` cases with the largest `by` metric; ties keep input order.
pub fn top_n(records: &[CaseRecord], n: usize, by: RankBy) -> Vec<&CaseRecord> {
    let mut ranked: Vec<(f64, &CaseRecord)> = records.iter().map(|r| (by.value(r), r)).collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(n).map(|(_, r)| r).collect()
}
