use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const TRUE_SYNONYMS: &[&str] = &["1", "true", "vrai", "oui", "yes", "y", "x", "ok"];

/// Excel serials accepted from plain-number date cells (1954-10-03 ..= 2119-01-10).
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 20000.0..=80000.0;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})(?:[ T].*)?$").unwrap());

static DAY_FIRST_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})(?:[ T].*)?$").unwrap());

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a free-text money cell into a finite amount.
///
/// Never fails: anything unparseable is `0.0`. Handles currency symbols,
/// `(123)` negatives, space/NBSP thousands separators, and both US
/// (`1,234.56`) and EU (`1 234,56`) decimal conventions.
pub fn normalize_amount(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return 0.0;
    }

    let (s, negative) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (s, false),
    };

    // char::is_whitespace covers U+00A0 and U+202F as well as ASCII space.
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let canonical = match (cleaned.contains('.'), cleaned.rfind(',')) {
        (true, Some(_)) => cleaned.replace(',', ""),
        (false, Some(last)) => {
            let (int_part, dec_part) = cleaned.split_at(last);
            format!("{}.{}", int_part.replace(',', ""), &dec_part[1..])
        }
        (_, None) => cleaned,
    };

    let value = match canonical.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    };
    if negative {
        -value
    } else {
        value
    }
}

pub fn normalize_amount_opt(raw: Option<&str>) -> f64 {
    raw.map(normalize_amount).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Booleans
// ---------------------------------------------------------------------------

/// `true` only for the fixed synonym set (`oui`, `x`, `1`, ...), case and
/// surrounding whitespace ignored.
pub fn normalize_boolean(raw: &str) -> bool {
    let s = raw.trim().to_lowercase();
    TRUE_SYNONYMS.contains(&s.as_str())
}

pub fn normalize_boolean_opt(raw: Option<&str>) -> bool {
    raw.map(normalize_boolean).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = ISO_DATE.captures(s) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }
    if let Some(caps) = DAY_FIRST_DATE.captures(s) {
        return ymd(&caps[3], &caps[2], &caps[1]);
    }
    match s.parse::<f64>() {
        Ok(serial) if SERIAL_RANGE.contains(&serial) => Some(excel_serial_to_date(serial)),
        _ => None,
    }
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

pub fn excel_serial_to_date(serial: f64) -> NaiveDate {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    base.checked_add_days(chrono::Days::new(serial.max(0.0) as u64))
        .unwrap_or(base)
}

// ---------------------------------------------------------------------------
// Text keys
// ---------------------------------------------------------------------------

/// Canonical comparison key: lowercase, accents stripped, whitespace collapsed.
///
/// `normalize_key(normalize_key(x)) == normalize_key(x)` for every input.
pub fn normalize_key(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header form of [`normalize_key`]: punctuation also folds to spaces, so
/// `Date d'envoi` and `date-d envoi` compare equal.
pub fn header_key(raw: &str) -> String {
    let spaced: String = normalize_key(raw)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_amount_documented_cases() {
        assert_eq!(normalize_amount("1 234,56"), 1234.56);
        assert_eq!(normalize_amount("1,234.56"), 1234.56);
        assert_eq!(normalize_amount("(500)"), -500.0);
        assert_eq!(normalize_amount(""), 0.0);
        assert_eq!(normalize_amount_opt(None), 0.0);
        assert_eq!(normalize_amount("nan"), 0.0);
        assert_eq!(normalize_amount("US$ 1 200,00"), 1200.0);
    }

    #[test]
    fn test_normalize_amount_whitespace_variants() {
        assert_eq!(normalize_amount("1\u{a0}234,56"), 1234.56);
        assert_eq!(normalize_amount("1\u{202f}234,56 $"), 1234.56);
        assert_eq!(normalize_amount("  750  "), 750.0);
    }

    #[test]
    fn test_normalize_amount_null_like() {
        assert_eq!(normalize_amount("NaN"), 0.0);
        assert_eq!(normalize_amount("None"), 0.0);
        assert_eq!(normalize_amount("   "), 0.0);
        assert_eq!(normalize_amount("n/a"), 0.0);
        assert_eq!(normalize_amount("garbage"), 0.0);
    }

    #[test]
    fn test_normalize_amount_signs() {
        assert_eq!(normalize_amount("-42.50"), -42.5);
        assert_eq!(normalize_amount("(1 234,56 $)"), -1234.56);
        assert_eq!(normalize_amount("($1,000.00)"), -1000.0);
    }

    #[test]
    fn test_normalize_amount_separators() {
        assert_eq!(normalize_amount("1234,5"), 1234.5);
        assert_eq!(normalize_amount("1.234.567"), 0.0);
        assert_eq!(normalize_amount("1,234,567"), 1234.567);
        assert_eq!(normalize_amount("2 000"), 2000.0);
    }

    #[test]
    fn test_normalize_amount_huge_is_finite() {
        let digits = "9".repeat(400);
        assert_eq!(normalize_amount(&digits), 0.0);
    }

    #[test]
    fn test_normalize_boolean_synonyms() {
        for s in ["1", "true", "VRAI", "Oui", " oui ", "yes", "Y", "x", "OK"] {
            assert!(normalize_boolean(s), "{s:?} should be true");
        }
        for s in ["", "0", "non", "false", "no", "xx", "oui!", "2"] {
            assert!(!normalize_boolean(s), "{s:?} should be false");
        }
        assert!(!normalize_boolean_opt(None));
    }

    #[test]
    fn test_normalize_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(normalize_date("2024-03-15"), Some(d));
        assert_eq!(normalize_date("2024-03-15 00:00:00"), Some(d));
        assert_eq!(normalize_date("2024/3/15"), Some(d));
        assert_eq!(normalize_date("15/03/2024"), Some(d));
        assert_eq!(normalize_date("15.03.2024"), Some(d));
        assert_eq!(normalize_date("45366"), Some(d));
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("bientôt"), None);
        assert_eq!(normalize_date("2024-02-30"), None);
        assert_eq!(normalize_date("31/13/2024"), None);
        assert_eq!(normalize_date("2023"), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45667.0),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
    }

    #[test]
    fn test_normalize_key_folds_case_accents_whitespace() {
        assert_eq!(normalize_key("Catégorie  Légale"), normalize_key("categorie legale"));
        assert_eq!(normalize_key("  Résidence\u{a0}Permanente "), "residence permanente");
        assert_eq!(normalize_key("ÉTUDIANT"), "etudiant");
    }

    #[test]
    fn test_header_key_folds_punctuation() {
        assert_eq!(header_key("Date d'envoi"), "date d envoi");
        assert_eq!(header_key("Sous-catégorie"), "sous categorie");
        assert_eq!(header_key("# Dossier"), "dossier");
    }

    proptest! {
        #[test]
        fn normalize_amount_is_total_and_finite(s in any::<String>()) {
            prop_assert!(normalize_amount(&s).is_finite());
        }

        #[test]
        fn normalize_amount_is_finite_on_money_like_text(s in "[ (]?[$€]?[0-9 ,.\u{a0}-]{0,24}[)]?") {
            prop_assert!(normalize_amount(&s).is_finite());
        }

        #[test]
        fn normalize_boolean_false_outside_synonyms(s in any::<String>()) {
            let k = s.trim().to_lowercase();
            prop_assume!(!TRUE_SYNONYMS.contains(&k.as_str()));
            prop_assert!(!normalize_boolean(&s));
        }

        #[test]
        fn normalize_key_is_idempotent(s in any::<String>()) {
            let once = normalize_key(&s);
            prop_assert_eq!(normalize_key(&once), once);
        }
    }
}
