use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{CasebookError, Result};
use crate::models::CasePatch;
use crate::schema::{ColumnMap, Field};

/// One sheet of the workbook as a grid of text cells.
///
/// The Clients sheet is the canonical case table: reports read normalized
/// copies of it, edits go through [`Sheet::apply_patch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Zero-based (row, column) of the header cell in the source file.
    pub origin: (u32, u16),
    /// `(row, column)` indexes into `rows` of cells stored as dates.
    pub date_cells: BTreeSet<(usize, usize)>,
}

impl Sheet {
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|c| c.trim().is_empty()))
    }

    /// Apply a single-field edit to the first row whose case id matches.
    ///
    /// Case ids are not required to be unique; later duplicates are left
    /// untouched. A target column missing from the sheet is appended with its
    /// canonical header. Returns the index of the edited row.
    pub fn apply_patch(&mut self, patch: &CasePatch) -> Result<usize> {
        let mut columns = ColumnMap::resolve(&self.headers);
        let id_col = columns
            .index(Field::CaseId)
            .ok_or_else(|| CasebookError::UnknownCase(patch.case_id.clone()))?;

        let wanted = patch.case_id.trim();
        let row_idx = self
            .rows
            .iter()
            .position(|row| row.get(id_col).is_some_and(|c| c.trim() == wanted))
            .ok_or_else(|| CasebookError::UnknownCase(patch.case_id.clone()))?;

        let col = match columns.index(patch.field) {
            Some(col) => col,
            None => {
                let col = self.headers.len();
                info!(field = patch.field.key(), header = patch.field.header(), "adding column");
                self.headers.push(patch.field.header().to_string());
                columns.set(patch.field, col);
                col
            }
        };

        let row = &mut self.rows[row_idx];
        if row.len() <= col {
            row.resize(col + 1, String::new());
        }
        debug!(case = wanted, field = patch.field.key(), old = %row[col], new = %patch.value, "patching cell");
        row[col] = patch.value.clone();
        Ok(row_idx)
    }
}

/// Patches that mark a case as sent on `date`.
pub fn mark_sent(case_id: &str, date: NaiveDate) -> [CasePatch; 2] {
    [
        CasePatch {
            case_id: case_id.to_string(),
            field: Field::SentFlag,
            value: "oui".to_string(),
        },
        CasePatch {
            case_id: case_id.to_string(),
            field: Field::SentDate,
            value: date.format("%Y-%m-%d").to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::map_records;

    fn clients() -> Sheet {
        Sheet {
            name: "Clients".to_string(),
            headers: vec!["Dossier".into(), "Nom".into(), "Envoyé".into()],
            rows: vec![
                vec!["A-1".into(), "Dupont".into(), "non".into()],
                vec!["A-2".into(), "Tremblay".into(), "".into()],
                vec!["A-2".into(), "Gagnon".into(), "".into()],
            ],
            ..Sheet::default()
        }
    }

    #[test]
    fn test_apply_patch_existing_column() {
        let mut sheet = clients();
        let patch = CasePatch {
            case_id: "A-1".into(),
            field: Field::SentFlag,
            value: "oui".into(),
        };
        assert_eq!(sheet.apply_patch(&patch).unwrap(), 0);
        assert_eq!(sheet.rows[0][2], "oui");
    }

    #[test]
    fn test_apply_patch_first_match_on_duplicate_ids() {
        let mut sheet = clients();
        let patch = CasePatch {
            case_id: "A-2".into(),
            field: Field::Name,
            value: "Roy".into(),
        };
        assert_eq!(sheet.apply_patch(&patch).unwrap(), 1);
        assert_eq!(sheet.rows[1][1], "Roy");
        assert_eq!(sheet.rows[2][1], "Gagnon");
    }

    #[test]
    fn test_apply_patch_appends_missing_column() {
        let mut sheet = clients();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        for patch in mark_sent("A-2", date) {
            sheet.apply_patch(&patch).unwrap();
        }
        assert_eq!(sheet.headers.len(), 4);
        assert_eq!(sheet.headers[3], "Date d'envoi");
        assert_eq!(sheet.rows[1], vec!["A-2", "Tremblay", "oui", "2024-05-01"]);
        // Untouched rows stay short; readers treat absent cells as empty.
        assert_eq!(sheet.rows[0].len(), 3);

        let records = map_records(&sheet);
        assert!(records[1].sent_flag);
        assert_eq!(records[1].sent_date, Some(date));
        assert_eq!(records[0].sent_date, None);
    }

    #[test]
    fn test_apply_patch_unknown_case() {
        let mut sheet = clients();
        let patch = CasePatch {
            case_id: "Z-9".into(),
            field: Field::Name,
            value: "x".into(),
        };
        let err = sheet.apply_patch(&patch).unwrap_err();
        assert!(matches!(err, CasebookError::UnknownCase(_)));
    }

    #[test]
    fn test_apply_patch_without_id_column() {
        let mut sheet = Sheet {
            name: "Clients".into(),
            headers: vec!["Nom".into()],
            rows: vec![vec!["Dupont".into()]],
            ..Sheet::default()
        };
        let patch = CasePatch {
            case_id: "A-1".into(),
            field: Field::Name,
            value: "x".into(),
        };
        assert!(sheet.apply_patch(&patch).is_err());
    }

    #[test]
    fn test_is_empty_ignores_blank_rows() {
        let sheet = Sheet {
            name: "Clients".into(),
            headers: vec!["Dossier".into()],
            rows: vec![vec!["  ".into()], vec![]],
            ..Sheet::default()
        };
        assert!(sheet.is_empty());
        assert!(!clients().is_empty());
    }
}
