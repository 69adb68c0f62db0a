//! Parses the extraction service's JSON reply into an `ExtractionResult`.
//!
//! The reply is treated as untyped JSON first and validated field by field:
//! every missing or mistyped required field is collected into one aggregated
//! incomplete-extraction error instead of failing on the first bad key.

use serde_json::Value;

use super::types::{ExtractedItem, ExtractionResult};
use super::ExtractionError;

/// Confidence reported when the model omits the field entirely.
const FALLBACK_CONFIDENCE: f32 = 50.0;

/// Parse a completion into an `ExtractionResult`.
///
/// Required fields: `merchant_name`, `receipt_date`, `total_amount`
/// (non-negative). Optional fields fall back to their documented defaults.
/// Items that lack a name or total price are skipped, not fatal.
pub fn parse_extraction_response(response: &str) -> Result<ExtractionResult, ExtractionError> {
    let json_str = strip_code_fences(response);
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

    let mut invalid: Vec<String> = Vec::new();

    let merchant_name = match value.get("merchant_name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            invalid.push("merchant_name".into());
            String::new()
        }
    };

    let receipt_date = match value.get("receipt_date").and_then(Value::as_str) {
        Some(date) if !date.trim().is_empty() => date.trim().to_string(),
        _ => {
            invalid.push("receipt_date".into());
            String::new()
        }
    };

    let total_amount = match value.get("total_amount").and_then(Value::as_f64) {
        Some(total) if total >= 0.0 => total,
        Some(_) => {
            invalid.push("total_amount (negative)".into());
            0.0
        }
        None => {
            invalid.push("total_amount".into());
            0.0
        }
    };

    if !invalid.is_empty() {
        return Err(ExtractionError::IncompleteExtraction(invalid.join(", ")));
    }

    let currency = value
        .get("currency")
        .and_then(Value::as_str)
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "USD".into());

    let items = value
        .get("items")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_item).collect())
        .unwrap_or_default();

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c as f32)
        .unwrap_or(FALLBACK_CONFIDENCE)
        .clamp(0.0, 100.0);

    Ok(ExtractionResult {
        merchant_name,
        receipt_date,
        total_amount,
        currency,
        items,
        confidence,
    })
}

/// Parse one line item leniently — items missing a name or total are dropped.
fn parse_item(value: &Value) -> Option<ExtractedItem> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())?
        .to_string();
    let total_price = value.get("total_price").and_then(Value::as_f64)?;

    let quantity = value
        .get("quantity")
        .and_then(Value::as_f64)
        .filter(|q| *q >= 0.0)
        .unwrap_or(1.0);

    Some(ExtractedItem {
        name,
        quantity,
        unit_price: value.get("unit_price").and_then(Value::as_f64),
        total_price,
        category: value
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Tolerate a fenced reply even though the service is asked for bare JSON.
fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    trimmed
}
