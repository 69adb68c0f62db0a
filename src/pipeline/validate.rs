//! Internal-consistency checks on an extraction result.
//!
//! Advisory only: a failing report never blocks persistence, it downgrades
//! the receipt to needs_review for a human to look at.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::extraction::types::ExtractionResult;

/// Sum tolerance: 5% of the stated total.
const SUM_TOLERANCE_RATIO: f64 = 0.05;

/// Absolute tolerance floor in currency units, for small totals.
const SUM_TOLERANCE_FLOOR: f64 = 0.50;

/// Syntactic ISO date shape. Not calendar-checked — "2024-13-40" passes.
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Run every check independently (no short-circuiting) and collect issues.
pub fn validate_extraction(result: &ExtractionResult) -> ValidationReport {
    let mut issues = Vec::new();

    let item_sum: f64 = result.items.iter().map(|i| i.total_price).sum();
    let tolerance = (result.total_amount * SUM_TOLERANCE_RATIO).max(SUM_TOLERANCE_FLOOR);
    if (item_sum - result.total_amount).abs() > tolerance {
        issues.push(format!(
            "Line items sum to {item_sum:.2} but stated total is {:.2}",
            result.total_amount
        ));
    }

    if result.items.is_empty() {
        issues.push("Receipt has no line items".to_string());
    }

    if !ISO_DATE.is_match(&result.receipt_date) {
        issues.push(format!(
            "Receipt date '{}' is not in YYYY-MM-DD format",
            result.receipt_date
        ));
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
    }
}
