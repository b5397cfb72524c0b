use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::aggregate::{aggregate, AggregateRow, GroupBy};
use crate::derive::derive;
use crate::models::{CaseRecord, CaseStatus, EscrowReleaseStatus};

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct Dashboard {
    pub cases: usize,
    pub undated: usize,
    pub billed: f64,
    pub paid: f64,
    /// Sum of positive remaining balances.
    pub outstanding: f64,
    pub escrow_cases: usize,
    pub escrow_held: f64,
    pub ready_to_release: usize,
    pub by_status: Vec<(CaseStatus, usize)>,
    /// Dated cases only; undated rows cannot be placed in a year.
    pub by_category: Vec<AggregateRow>,
}

pub fn get_dashboard(records: &[CaseRecord]) -> Dashboard {
    let mut dash = Dashboard {
        cases: records.len(),
        undated: records.iter().filter(|r| r.date.is_none()).count(),
        billed: 0.0,
        paid: 0.0,
        outstanding: 0.0,
        escrow_cases: 0,
        escrow_held: 0.0,
        ready_to_release: 0,
        by_status: CaseStatus::ALL.iter().map(|s| (*s, 0)).collect(),
        by_category: aggregate(records, GroupBy::Category, &[]),
    };

    for record in records {
        let d = derive(record);
        dash.billed += d.billed_amount;
        dash.paid += d.total_paid;
        dash.outstanding += d.remaining_balance.max(0.0);
        if d.is_escrow {
            dash.escrow_cases += 1;
            dash.escrow_held += d.total_paid;
            if d.escrow_release_status == EscrowReleaseStatus::ReadyToRelease {
                dash.ready_to_release += 1;
            }
        }
        let status = record.status();
        if let Some(slot) = dash.by_status.iter_mut().find(|(s, _)| *s == status) {
            slot.1 += 1;
        }
    }
    dash
}

// ---------------------------------------------------------------------------
// Accounting
// ---------------------------------------------------------------------------

pub struct AccountingRow {
    pub case_id: String,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub category: String,
    pub billed: f64,
    pub paid: f64,
    pub balance: f64,
}

pub struct ReceiptYear {
    /// `None` collects installments without a payment date.
    pub year: Option<i32>,
    pub amount: f64,
    pub count: usize,
}

pub struct AccountingReport {
    pub rows: Vec<AccountingRow>,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_balance: f64,
    pub receipts: Vec<ReceiptYear>,
}

pub fn get_accounting(records: &[CaseRecord], outstanding_only: bool) -> AccountingReport {
    let mut rows = Vec::new();
    let mut by_year: BTreeMap<Option<i32>, (f64, usize)> = BTreeMap::new();

    for record in records {
        let d = derive(record);
        if outstanding_only && d.remaining_balance <= 0.0 {
            continue;
        }
        for inst in record.installments.iter().filter(|i| i.amount != 0.0) {
            let slot = by_year.entry(inst.date.map(|dt| dt.year())).or_default();
            slot.0 += inst.amount;
            slot.1 += 1;
        }
        rows.push(AccountingRow {
            case_id: record.case_id.clone(),
            name: record.name.clone(),
            date: record.date,
            category: record.category.clone(),
            billed: d.billed_amount,
            paid: d.total_paid,
            balance: d.remaining_balance,
        });
    }

    // BTreeMap puts None first; undated receipts read better last.
    let mut receipts: Vec<ReceiptYear> = by_year
        .into_iter()
        .map(|(year, (amount, count))| ReceiptYear { year, amount, count })
        .collect();
    let undated = receipts.iter().take_while(|r| r.year.is_none()).count();
    receipts.rotate_left(undated);

    AccountingReport {
        total_billed: rows.iter().map(|r| r.billed).sum(),
        total_paid: rows.iter().map(|r| r.paid).sum(),
        total_balance: rows.iter().map(|r| r.balance).sum(),
        rows,
        receipts,
    }
}

// ---------------------------------------------------------------------------
// Escrow
// ---------------------------------------------------------------------------

pub struct EscrowRow {
    pub case_id: String,
    pub name: String,
    pub held: f64,
    pub status: EscrowReleaseStatus,
    pub sent_date: Option<NaiveDate>,
    /// Detected by the zero-fee rule rather than the escrow column.
    pub auto_detected: bool,
}

pub struct EscrowReport {
    pub rows: Vec<EscrowRow>,
    pub blocked_count: usize,
    pub blocked_total: f64,
    pub ready_count: usize,
    pub ready_total: f64,
}

pub fn get_escrow(records: &[CaseRecord]) -> EscrowReport {
    let mut report = EscrowReport {
        rows: Vec::new(),
        blocked_count: 0,
        blocked_total: 0.0,
        ready_count: 0,
        ready_total: 0.0,
    };

    for record in records {
        let d = derive(record);
        if !d.is_escrow {
            continue;
        }
        match d.escrow_release_status {
            EscrowReleaseStatus::Blocked => {
                report.blocked_count += 1;
                report.blocked_total += d.total_paid;
            }
            EscrowReleaseStatus::ReadyToRelease => {
                report.ready_count += 1;
                report.ready_total += d.total_paid;
            }
        }
        report.rows.push(EscrowRow {
            case_id: record.case_id.clone(),
            name: record.name.clone(),
            held: d.total_paid,
            status: d.escrow_release_status,
            sent_date: record.sent_date,
            auto_detected: !record.escrow_flag,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Installment;

    fn case(id: &str, date: Option<(i32, u32, u32)>, fee: f64, inst: &[(f64, Option<(i32, u32, u32)>)]) -> CaseRecord {
        let ymd = |t: (i32, u32, u32)| NaiveDate::from_ymd_opt(t.0, t.1, t.2);
        let mut rec = CaseRecord {
            case_id: id.to_string(),
            name: format!("Client {id}"),
            date: date.and_then(ymd),
            category: "Visiteur".to_string(),
            fee_amount: fee,
            ..CaseRecord::default()
        };
        for (slot, (amount, when)) in rec.installments.iter_mut().zip(inst) {
            *slot = Installment {
                amount: *amount,
                date: when.and_then(ymd),
            };
        }
        rec
    }

    fn sample() -> Vec<CaseRecord> {
        let mut escrow_sent = case("E-1", Some((2024, 1, 5)), 0.0, &[(300.0, Some((2024, 1, 5)))]);
        escrow_sent.sent_flag = true;
        escrow_sent.sent_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        let mut flagged = case("E-2", None, 800.0, &[(800.0, None)]);
        flagged.escrow_flag = true;
        vec![
            case("A-1", Some((2023, 3, 1)), 1000.0, &[(400.0, Some((2023, 3, 2))), (100.0, Some((2024, 1, 2)))]),
            escrow_sent,
            flagged,
        ]
    }

    #[test]
    fn test_dashboard_totals() {
        let dash = get_dashboard(&sample());
        assert_eq!(dash.cases, 3);
        assert_eq!(dash.undated, 1);
        assert_eq!(dash.billed, 1800.0);
        assert_eq!(dash.paid, 1600.0);
        assert_eq!(dash.outstanding, 500.0);
        assert_eq!(dash.escrow_cases, 2);
        assert_eq!(dash.escrow_held, 1100.0);
        assert_eq!(dash.ready_to_release, 1);
        let open = dash.by_status.iter().find(|(s, _)| *s == CaseStatus::Open).unwrap();
        assert_eq!(open.1, 2);
        assert_eq!(dash.by_category.len(), 1);
        assert_eq!(dash.by_category[0].totals.count, 2);
    }

    #[test]
    fn test_accounting_rows_and_receipts() {
        let report = get_accounting(&sample(), false);
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0].balance, 500.0);
        assert_eq!(report.rows[1].balance, -300.0);
        assert_eq!(report.total_billed, 1800.0);
        assert_eq!(report.total_paid, 1600.0);
        assert_eq!(report.total_balance, 200.0);

        let years: Vec<Option<i32>> = report.receipts.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![Some(2023), Some(2024), None]);
        assert_eq!(report.receipts[1].amount, 400.0);
        assert_eq!(report.receipts[1].count, 2);
    }

    #[test]
    fn test_accounting_outstanding_only() {
        let report = get_accounting(&sample(), true);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].case_id, "A-1");
    }

    #[test]
    fn test_escrow_report() {
        let report = get_escrow(&sample());
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.ready_count, 1);
        assert_eq!(report.ready_total, 300.0);
        assert_eq!(report.blocked_count, 1);
        assert_eq!(report.blocked_total, 800.0);
        assert!(report.rows[0].auto_detected);
        assert!(!report.rows[1].auto_detected);
    }
}
