//! Tolerant mapping from spreadsheet headers to canonical case fields.
//!
//! Staff-maintained workbooks drift: `Catégorie`, `categorie ` and `Category`
//! all name the same column. Each canonical [`Field`] carries a list of
//! accepted header aliases compared through [`header_key`]; columns that
//! cannot be found are synthesized as empty cells.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::CasebookError;
use crate::models::{CaseRecord, Installment};
use crate::normalize::{header_key, normalize_amount_opt, normalize_boolean_opt, normalize_date};
use crate::table::Sheet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CaseId,
    Name,
    Date,
    Category,
    Subcategory,
    VisaType,
    FeeAmount,
    OtherFeesAmount,
    Installment1,
    Installment2,
    Installment3,
    Installment4,
    InstallmentDate1,
    InstallmentDate2,
    InstallmentDate3,
    InstallmentDate4,
    EscrowFlag,
    SentFlag,
    AcceptedFlag,
    RefusedFlag,
    CancelledFlag,
    SentDate,
}

impl Field {
    pub const COUNT: usize = 22;

    pub const ALL: [Field; Field::COUNT] = [
        Field::CaseId,
        Field::Name,
        Field::Date,
        Field::Category,
        Field::Subcategory,
        Field::VisaType,
        Field::FeeAmount,
        Field::OtherFeesAmount,
        Field::Installment1,
        Field::Installment2,
        Field::Installment3,
        Field::Installment4,
        Field::InstallmentDate1,
        Field::InstallmentDate2,
        Field::InstallmentDate3,
        Field::InstallmentDate4,
        Field::EscrowFlag,
        Field::SentFlag,
        Field::AcceptedFlag,
        Field::RefusedFlag,
        Field::CancelledFlag,
        Field::SentDate,
    ];

    pub const INSTALLMENTS: [(Field, Field); 4] = [
        (Field::Installment1, Field::InstallmentDate1),
        (Field::Installment2, Field::InstallmentDate2),
        (Field::Installment3, Field::InstallmentDate3),
        (Field::Installment4, Field::InstallmentDate4),
    ];

    /// Stable identifier used on the command line (`casebook set 42 sent_date ...`).
    pub fn key(&self) -> &'static str {
        match self {
            Self::CaseId => "case_id",
            Self::Name => "name",
            Self::Date => "date",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::VisaType => "visa_type",
            Self::FeeAmount => "fee_amount",
            Self::OtherFeesAmount => "other_fees_amount",
            Self::Installment1 => "installment_1",
            Self::Installment2 => "installment_2",
            Self::Installment3 => "installment_3",
            Self::Installment4 => "installment_4",
            Self::InstallmentDate1 => "installment_date_1",
            Self::InstallmentDate2 => "installment_date_2",
            Self::InstallmentDate3 => "installment_date_3",
            Self::InstallmentDate4 => "installment_date_4",
            Self::EscrowFlag => "escrow_flag",
            Self::SentFlag => "sent_flag",
            Self::AcceptedFlag => "accepted_flag",
            Self::RefusedFlag => "refused_flag",
            Self::CancelledFlag => "cancelled_flag",
            Self::SentDate => "sent_date",
        }
    }

    /// Header written when the column has to be added to the sheet.
    pub fn header(&self) -> &'static str {
        match self {
            Self::CaseId => "Dossier",
            Self::Name => "Nom",
            Self::Date => "Date",
            Self::Category => "Catégorie",
            Self::Subcategory => "Sous-catégorie",
            Self::VisaType => "Type de visa",
            Self::FeeAmount => "Honoraires",
            Self::OtherFeesAmount => "Autres frais",
            Self::Installment1 => "Acompte 1",
            Self::Installment2 => "Acompte 2",
            Self::Installment3 => "Acompte 3",
            Self::Installment4 => "Acompte 4",
            Self::InstallmentDate1 => "Date acompte 1",
            Self::InstallmentDate2 => "Date acompte 2",
            Self::InstallmentDate3 => "Date acompte 3",
            Self::InstallmentDate4 => "Date acompte 4",
            Self::EscrowFlag => "Fiducie",
            Self::SentFlag => "Envoyé",
            Self::AcceptedFlag => "Accepté",
            Self::RefusedFlag => "Refusé",
            Self::CancelledFlag => "Annulé",
            Self::SentDate => "Date d'envoi",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::CaseId => &["dossier", "n dossier", "no dossier", "numero dossier", "numero de dossier", "id", "case id", "case"],
            Self::Name => &["nom", "client", "nom client", "nom du client", "name", "client name"],
            Self::Date => &["date", "date ouverture", "date d ouverture", "date dossier", "opened", "date opened"],
            Self::Category => &["categorie", "category"],
            Self::Subcategory => &["sous categorie", "souscategorie", "subcategory", "sub category"],
            Self::VisaType => &["type de visa", "type visa", "visa", "visa type"],
            Self::FeeAmount => &["honoraires", "frais professionnels", "montant", "fee", "fees", "fee amount"],
            Self::OtherFeesAmount => &["autres frais", "frais autres", "other fees", "other fees amount"],
            Self::Installment1 => &["acompte 1", "versement 1", "paiement 1", "installment 1"],
            Self::Installment2 => &["acompte 2", "versement 2", "paiement 2", "installment 2"],
            Self::Installment3 => &["acompte 3", "versement 3", "paiement 3", "installment 3"],
            Self::Installment4 => &["acompte 4", "versement 4", "paiement 4", "installment 4"],
            Self::InstallmentDate1 => &["date acompte 1", "date versement 1", "date paiement 1", "installment date 1"],
            Self::InstallmentDate2 => &["date acompte 2", "date versement 2", "date paiement 2", "installment date 2"],
            Self::InstallmentDate3 => &["date acompte 3", "date versement 3", "date paiement 3", "installment date 3"],
            Self::InstallmentDate4 => &["date acompte 4", "date versement 4", "date paiement 4", "installment date 4"],
            Self::EscrowFlag => &["fiducie", "en fiducie", "escrow", "escrow flag"],
            Self::SentFlag => &["envoye", "dossier envoye", "sent", "sent flag"],
            Self::AcceptedFlag => &["accepte", "accepted", "accepted flag"],
            Self::RefusedFlag => &["refuse", "refused", "refused flag"],
            Self::CancelledFlag => &["annule", "cancelled", "canceled", "cancelled flag"],
            Self::SentDate => &["date d envoi", "date envoi", "sent date", "date sent"],
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::InstallmentDate1
                | Self::InstallmentDate2
                | Self::InstallmentDate3
                | Self::InstallmentDate4
                | Self::SentDate
        )
    }

    fn matches_header(&self, key: &str) -> bool {
        key == self.key().replace('_', " ") || self.aliases().iter().any(|a| header_key(a) == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = CasebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = header_key(s);
        Field::ALL
            .into_iter()
            .find(|f| f.key() == s || f.matches_header(&key))
            .ok_or_else(|| CasebookError::UnknownField(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Source column index for each canonical field, resolved once per load.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    columns: [Option<usize>; Field::COUNT],
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Self {
        let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
        let mut claimed = vec![false; headers.len()];
        let mut columns = [None; Field::COUNT];

        for field in Field::ALL {
            let found = keys
                .iter()
                .enumerate()
                .find(|(i, key)| !claimed[*i] && !key.is_empty() && field.matches_header(key))
                .map(|(i, _)| i);
            if let Some(i) = found {
                claimed[i] = true;
                debug!(field = field.key(), header = %headers[i], "bound column");
            }
            columns[field as usize] = found;
        }
        Self { columns }
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns[field as usize]
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.index(*f).is_none())
            .collect()
    }

    /// Source columns bound to date fields.
    pub fn date_columns(&self) -> Vec<usize> {
        Field::ALL
            .into_iter()
            .filter(Field::is_date)
            .filter_map(|f| self.index(f))
            .collect()
    }

    pub(crate) fn set(&mut self, field: Field, index: usize) {
        self.columns[field as usize] = Some(index);
    }
}

// ---------------------------------------------------------------------------
// Record mapping
// ---------------------------------------------------------------------------

/// Normalize every non-blank row of `sheet` into a [`CaseRecord`].
///
/// Missing columns read as empty cells, so the affected fields take their
/// defaults (`0.0`, `false`, no date) instead of failing the load.
pub fn map_records(sheet: &Sheet) -> Vec<CaseRecord> {
    let columns = ColumnMap::resolve(&sheet.headers);
    let missing = columns.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.key()).collect();
        warn!(sheet = %sheet.name, missing = ?names, "synthesizing missing columns with defaults");
    }

    sheet
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
        .map(|(i, row)| {
            let cell = |field: Field| -> Option<&str> {
                columns
                    .index(field)
                    .and_then(|idx| row.get(idx))
                    .map(String::as_str)
            };
            let text = |field: Field| cell(field).unwrap_or("").trim().to_string();
            let date = |field: Field| cell(field).and_then(normalize_date);

            let mut installments = [Installment::default(); 4];
            for (slot, (amount, when)) in installments.iter_mut().zip(Field::INSTALLMENTS) {
                *slot = Installment {
                    amount: normalize_amount_opt(cell(amount)),
                    date: date(when),
                };
            }

            CaseRecord {
                row: i,
                case_id: text(Field::CaseId),
                name: text(Field::Name),
                date: date(Field::Date),
                category: text(Field::Category),
                subcategory: text(Field::Subcategory),
                visa_type: text(Field::VisaType),
                fee_amount: normalize_amount_opt(cell(Field::FeeAmount)),
                other_fees_amount: normalize_amount_opt(cell(Field::OtherFeesAmount)),
                installments,
                escrow_flag: normalize_boolean_opt(cell(Field::EscrowFlag)),
                sent_flag: normalize_boolean_opt(cell(Field::SentFlag)),
                accepted_flag: normalize_boolean_opt(cell(Field::AcceptedFlag)),
                refused_flag: normalize_boolean_opt(cell(Field::RefusedFlag)),
                cancelled_flag: normalize_boolean_opt(cell(Field::CancelledFlag)),
                sent_date: date(Field::SentDate),
            }
        })
        .collect()
}
