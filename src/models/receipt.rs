use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::ProcessingStatus;

/// Durable receipt header record.
///
/// Linked to the on-disk document in the receipt store only by `filename`;
/// there is no foreign key from the database into the filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub filename: String,
    pub merchant_name: String,
    /// ISO `YYYY-MM-DD`. Stored as text — the validator's date check is
    /// syntactic, not calendar-valid, so an implausible-but-well-formed
    /// date survives extraction unchanged.
    pub receipt_date: String,
    pub total_amount: f64,
    pub currency: String,
    pub raw_text: String,
    pub processed_at: NaiveDateTime,
    pub processing_status: ProcessingStatus,
}

/// One purchased entry within a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub item_name: String,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub total_price: f64,
    pub category: Option<String>,
}

/// Receipt header ready for insertion (id and processed_at assigned by SQLite).
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub filename: String,
    pub merchant_name: String,
    pub receipt_date: String,
    pub total_amount: f64,
    pub currency: String,
    pub raw_text: String,
    pub processing_status: ProcessingStatus,
}

/// Line item ready for insertion alongside its parent header.
#[derive(Debug, Clone)]
pub struct NewReceiptItem {
    pub item_name: String,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub total_price: f64,
    pub category: Option<String>,
}
