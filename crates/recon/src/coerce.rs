use serde::Serialize;

use crate::table::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoerceStatus {
    Parsed,
    Missing,
    /// The cell held something that is not a number; counted as 0.
    Failed,
}

/// A tolerance-field value as used for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Amount {
    pub value: f64,
    pub status: CoerceStatus,
}

impl Amount {
    fn parsed(value: f64) -> Self {
        Self {
            value,
            status: CoerceStatus::Parsed,
        }
    }

    fn zero(status: CoerceStatus) -> Self {
        Self { value: 0.0, status }
    }
}

/// Numeric value of a cell. Missing and non-numeric cells count as 0.
pub fn coerce_amount(cell: &Cell) -> Amount {
    match cell {
        Cell::Number(n) if n.is_finite() => Amount::parsed(*n),
        Cell::Number(_) | Cell::Date(_) => Amount::zero(CoerceStatus::Failed),
        Cell::Empty => Amount::zero(CoerceStatus::Missing),
        Cell::Text(s) if s.trim().is_empty() => Amount::zero(CoerceStatus::Missing),
        Cell::Text(s) => match parse_financial_number(s) {
            Some(n) => Amount::parsed(n),
            None => Amount::zero(CoerceStatus::Failed),
        },
    }
}

/// Parse `1,234.50`, `₹ 1,234.50`, `$12`, `(123.45)` and the like.
pub fn parse_financial_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    // (123.45) → -123.45
    let (is_negative, inner) = match trimmed.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if is_negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(coerce_amount(&Cell::Number(12.5)), Amount::parsed(12.5));
        assert_eq!(coerce_amount(&Cell::Number(f64::NAN)).status, CoerceStatus::Failed);
    }

    #[test]
    fn missing_is_zero() {
        let a = coerce_amount(&Cell::Empty);
        assert_eq!(a.value, 0.0);
        assert_eq!(a.status, CoerceStatus::Missing);
        assert_eq!(coerce_amount(&Cell::Text("  ".into())).status, CoerceStatus::Missing);
    }

    #[test]
    fn unparseable_is_zero_and_failed() {
        for cell in [
            Cell::text("n/a"),
            Cell::text("12abc"),
            Cell::Date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
        ] {
            let a = coerce_amount(&cell);
            assert_eq!(a.value, 0.0, "{cell:?}");
            assert_eq!(a.status, CoerceStatus::Failed, "{cell:?}");
        }
    }

    #[test]
    fn financial_text() {
        assert_eq!(parse_financial_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_financial_number("₹ 1,00,000"), Some(100000.0));
        assert_eq!(parse_financial_number("$12"), Some(12.0));
        assert_eq!(parse_financial_number("(123.45)"), Some(-123.45));
        assert_eq!(parse_financial_number("-7"), Some(-7.0));
        assert_eq!(parse_financial_number("(-7)"), None);
        assert_eq!(parse_financial_number("1-2"), None);
        assert_eq!(parse_financial_number("inf"), None);
        assert_eq!(parse_financial_number("-"), None);
        assert_eq!(parse_financial_number("₹"), None);
    }
}
