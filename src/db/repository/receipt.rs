use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::ProcessingStatus;
use crate::models::receipt::{NewReceipt, NewReceiptItem, Receipt, ReceiptItem};

/// Insert a receipt header and its line items in one transaction.
///
/// Returns the new receipt id. The header insert and every item insert
/// commit together or not at all — a failure anywhere rolls the whole
/// write back, so a header without items (or vice versa) is never visible.
///
/// A filename-uniqueness violation surfaces as `DatabaseError::Conflict`,
/// which callers treat as "already processed" rather than a crash.
pub fn insert_receipt_with_items(
    conn: &Connection,
    receipt: &NewReceipt,
    items: &[NewReceiptItem],
) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let inserted = tx.execute(
        "INSERT INTO receipts (filename, merchant_name, receipt_date, total_amount,
         currency, raw_text, processing_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            receipt.filename,
            receipt.merchant_name,
            receipt.receipt_date,
            receipt.total_amount,
            receipt.currency,
            receipt.raw_text,
            receipt.processing_status.as_str(),
        ],
    );

    if let Err(e) = inserted {
        // Transaction rolls back on drop
        if is_unique_violation(&e) {
            return Err(DatabaseError::Conflict(receipt.filename.clone()));
        }
        return Err(e.into());
    }

    let receipt_id = tx.last_insert_rowid();

    for item in items {
        tx.execute(
            "INSERT INTO receipt_items (receipt_id, item_name, quantity, unit_price,
             total_price, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                receipt_id,
                item.item_name,
                item.quantity,
                item.unit_price,
                item.total_price,
                item.category,
            ],
        )?;
    }

    tx.commit()?;

    tracing::info!(
        receipt_id,
        filename = %receipt.filename,
        items = items.len(),
        status = receipt.processing_status.as_str(),
        "Receipt persisted"
    );

    Ok(receipt_id)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub fn get_receipt(conn: &Connection, id: i64) -> Result<Option<Receipt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, merchant_name, receipt_date, total_amount, currency,
         raw_text, processed_at, processing_status
         FROM receipts WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id], map_receipt_row);

    match result {
        Ok(row) => Ok(Some(receipt_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_receipt_by_filename(
    conn: &Connection,
    filename: &str,
) -> Result<Option<Receipt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, merchant_name, receipt_date, total_amount, currency,
         raw_text, processed_at, processing_status
         FROM receipts WHERE filename = ?1",
    )?;

    let result = stmt.query_row(params![filename], map_receipt_row);

    match result {
        Ok(row) => Ok(Some(receipt_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All receipts, newest first (the feed order the shell displays).
pub fn list_receipts(conn: &Connection) -> Result<Vec<Receipt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, merchant_name, receipt_date, total_amount, currency,
         raw_text, processed_at, processing_status
         FROM receipts ORDER BY processed_at DESC, id DESC",
    )?;

    let rows = stmt.query_map([], map_receipt_row)?;

    let mut receipts = Vec::new();
    for row in rows {
        receipts.push(receipt_from_row(row?)?);
    }
    Ok(receipts)
}

pub fn get_items_for_receipt(
    conn: &Connection,
    receipt_id: i64,
) -> Result<Vec<ReceiptItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, receipt_id, item_name, quantity, unit_price, total_price, category
         FROM receipt_items WHERE receipt_id = ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map(params![receipt_id], |row| {
        Ok(ReceiptItem {
            id: row.get(0)?,
            receipt_id: row.get(1)?,
            item_name: row.get(2)?,
            quantity: row.get::<_, Option<f64>>(3)?.unwrap_or(1.0),
            unit_price: row.get(4)?,
            total_price: row.get(5)?,
            category: row.get(6)?,
        })
    })?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn count_receipts(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM receipts", [], |row| row.get(0))?;
    Ok(count)
}

/// Delete a receipt; its line items go with it via ON DELETE CASCADE.
pub fn delete_receipt(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM receipts WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Receipt".into(),
            id: id.to_string(),
        });
    }
    tracing::info!(receipt_id = id, "Receipt deleted with its line items");
    Ok(())
}

// Internal row type for Receipt mapping
struct ReceiptRow {
    id: i64,
    filename: String,
    merchant_name: Option<String>,
    receipt_date: Option<String>,
    total_amount: Option<f64>,
    currency: Option<String>,
    raw_text: Option<String>,
    processed_at: String,
    processing_status: Option<String>,
}

fn map_receipt_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReceiptRow> {
    Ok(ReceiptRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        merchant_name: row.get(2)?,
        receipt_date: row.get(3)?,
        total_amount: row.get(4)?,
        currency: row.get(5)?,
        raw_text: row.get(6)?,
        processed_at: row.get(7)?,
        processing_status: row.get(8)?,
    })
}

fn receipt_from_row(row: ReceiptRow) -> Result<Receipt, DatabaseError> {
    let processing_status = row
        .processing_status
        .as_deref()
        .and_then(|s| ProcessingStatus::from_str(s).ok())
        .unwrap_or(ProcessingStatus::Pending);

    Ok(Receipt {
        id: row.id,
        filename: row.filename,
        merchant_name: row.merchant_name.unwrap_or_default(),
        receipt_date: row.receipt_date.unwrap_or_default(),
        total_amount: row.total_amount.unwrap_or(0.0),
        currency: row.currency.unwrap_or_else(|| "USD".into()),
        raw_text: row.raw_text.unwrap_or_default(),
        processed_at: NaiveDateTime::parse_from_str(&row.processed_at, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&row.processed_at, "%Y-%m-%dT%H:%M:%S"))
            .unwrap_or_default(),
        processing_status,
    })
}
