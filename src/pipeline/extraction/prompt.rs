pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a receipt data extraction assistant. Your ONLY role is to read a
purchase receipt and return its financial data as JSON.

RULES — ABSOLUTE, NO EXCEPTIONS:
1. Extract ONLY information visible on the receipt.
2. Respond with a single JSON object and nothing else — no prose, no fences.
3. Preserve exact amounts and dates verbatim from the receipt.
4. If the merchant cannot be determined, use "Unknown Merchant".
5. If the date cannot be determined, use today's date in YYYY-MM-DD format.
6. If the currency cannot be determined, use "USD".
7. When any default above is used, lower the confidence accordingly.

OUTPUT SHAPE:
{
  "merchant_name": "Store name",
  "receipt_date": "YYYY-MM-DD",
  "total_amount": 0.00,
  "currency": "USD",
  "items": [
    {
      "name": "item name",
      "quantity": 1,
      "unit_price": 0.00,
      "total_price": 0.00,
      "category": "grocery | dining | fuel | household | other or null"
    }
  ],
  "confidence": 85
}

"confidence" is an integer from 0 to 100.
"#;

/// Build the text-path prompt for a receipt's extracted text.
pub fn build_text_prompt(receipt_text: &str) -> String {
    format!(
        r#"<receipt>
{receipt_text}
</receipt>

Extract the merchant, date, total, currency, and every line item from the
receipt text above into the JSON shape you were given. Use null for any
optional field that is not present.
"#
    )
}

/// Build the vision-path prompt, optionally carrying a low-confidence text
/// excerpt as extra context for the image.
pub fn build_vision_prompt(text_excerpt: Option<&str>) -> String {
    let context = match text_excerpt {
        Some(text) if !text.trim().is_empty() => format!(
            "\nA low-confidence text reading of the same document follows; \
             prefer what you see in the image when they disagree.\n<excerpt>\n{text}\n</excerpt>\n"
        ),
        _ => String::new(),
    };

    format!(
        r#"The attached image is a scanned purchase receipt.
{context}
Extract the merchant, date, total, currency, and every line item into the
JSON shape you were given. Use null for any optional field that is not
visible.
"#
    )
}
