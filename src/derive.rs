use crate::models::{CaseRecord, DerivedFields, EscrowReleaseStatus};

/// Sums of finite cells can still overflow; those read as zero like any
/// other unusable amount.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn billed_amount(record: &CaseRecord) -> f64 {
    finite_or_zero(record.fee_amount + record.other_fees_amount)
}

pub fn total_paid(record: &CaseRecord) -> f64 {
    finite_or_zero(record.installments.iter().map(|i| i.amount).sum())
}

/// Zero-fee case funded by a first installment: a deposit held in escrow even
/// when nobody ticked the escrow column.
pub fn auto_escrow(record: &CaseRecord) -> bool {
    record.fee_amount == 0.0 && record.installments[0].amount > 0.0
}

pub fn is_escrow(record: &CaseRecord) -> bool {
    record.escrow_flag || auto_escrow(record)
}

/// Ready once the case is flagged sent and carries a sent date; the date's
/// value is not checked.
pub fn escrow_release_status(record: &CaseRecord) -> EscrowReleaseStatus {
    if record.sent_flag && record.sent_date.is_some() {
        EscrowReleaseStatus::ReadyToRelease
    } else {
        EscrowReleaseStatus::Blocked
    }
}

pub fn derive(record: &CaseRecord) -> DerivedFields {
    let billed = billed_amount(record);
    let paid = total_paid(record);
    DerivedFields {
        billed_amount: billed,
        total_paid: paid,
        remaining_balance: finite_or_zero(billed - paid),
        is_escrow: is_escrow(record),
        escrow_release_status: escrow_release_status(record),
    }
}
