use chrono::{Datelike, NaiveDate};

/// One partial payment toward a case.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Installment {
    pub amount: f64,
    pub date: Option<NaiveDate>,
}

/// One row of the Clients sheet after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRecord {
    /// Zero-based position in the source sheet.
    pub row: usize,
    pub case_id: String,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub category: String,
    pub subcategory: String,
    pub visa_type: String,
    pub fee_amount: f64,
    pub other_fees_amount: f64,
    pub installments: [Installment; 4],
    pub escrow_flag: bool,
    pub sent_flag: bool,
    pub accepted_flag: bool,
    pub refused_flag: bool,
    pub cancelled_flag: bool,
    pub sent_date: Option<NaiveDate>,
}

impl CaseRecord {
    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    pub fn status(&self) -> CaseStatus {
        if self.cancelled_flag {
            CaseStatus::Cancelled
        } else if self.refused_flag {
            CaseStatus::Refused
        } else if self.accepted_flag {
            CaseStatus::Accepted
        } else if self.sent_flag {
            CaseStatus::Sent
        } else {
            CaseStatus::Open
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStatus {
    Open,
    Sent,
    Accepted,
    Refused,
    Cancelled,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 5] = [
        CaseStatus::Open,
        CaseStatus::Sent,
        CaseStatus::Accepted,
        CaseStatus::Refused,
        CaseStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Sent => "Sent",
            Self::Accepted => "Accepted",
            Self::Refused => "Refused",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscrowReleaseStatus {
    Blocked,
    ReadyToRelease,
}

impl EscrowReleaseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blocked => "Blocked",
            Self::ReadyToRelease => "Ready to release",
        }
    }
}

/// Computed per-record fields; never written back to the workbook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFields {
    pub billed_amount: f64,
    pub total_paid: f64,
    pub remaining_balance: f64,
    pub is_escrow: bool,
    pub escrow_release_status: EscrowReleaseStatus,
}

/// A single-field edit addressed by case id.
#[derive(Debug, Clone, PartialEq)]
pub struct CasePatch {
    pub case_id: String,
    pub field: crate::schema::Field,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_precedence() {
        let mut rec = CaseRecord::default();
        assert_eq!(rec.status(), CaseStatus::Open);
        rec.sent_flag = true;
        assert_eq!(rec.status(), CaseStatus::Sent);
        rec.accepted_flag = true;
        assert_eq!(rec.status(), CaseStatus::Accepted);
        rec.refused_flag = true;
        assert_eq!(rec.status(), CaseStatus::Refused);
        rec.cancelled_flag = true;
        assert_eq!(rec.status(), CaseStatus::Cancelled);
    }

    #[test]
    fn test_year_requires_date() {
        let mut rec = CaseRecord::default();
        assert_eq!(rec.year(), None);
        rec.date = NaiveDate::from_ymd_opt(2023, 6, 1);
        assert_eq!(rec.year(), Some(2023));
    }
}
