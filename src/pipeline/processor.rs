//! Receipt processing orchestrator.
//!
//! Single entry point that drives the full pipeline per document:
//! idempotency check → extract → validate → persist. Uses trait-based DI
//! for the extractor so the orchestrator remains fully testable with mocks.
//!
//! Each document is processed independently and strictly sequentially; one
//! document's failure never aborts the rest of a batch. A failed document
//! leaves nothing behind and is cleanly retryable on a later run.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Serialize;

use crate::db::repository;
use crate::models::enums::ProcessingStatus;
use crate::models::receipt::{NewReceipt, NewReceiptItem};
use crate::pipeline::extraction::types::ReceiptExtractor;
use crate::pipeline::validate::{validate_extraction, ValidationReport};
use crate::store::ReceiptStore;

/// Terminal outcome for one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub filename: String,
    pub success: bool,
    /// Set on success, and on duplicate processing (the existing record).
    pub receipt_id: Option<i64>,
    pub status: Option<ProcessingStatus>,
    pub message: String,
    /// Present only when the pipeline reached validation.
    pub validation: Option<ValidationReport>,
}

impl DocumentOutcome {
    fn failure(filename: &str, message: String) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            receipt_id: None,
            status: None,
            message,
            validation: None,
        }
    }

    fn already_processed(filename: &str, receipt_id: Option<i64>, status: Option<ProcessingStatus>) -> Self {
        let message = match receipt_id {
            Some(id) => format!("Already processed as receipt #{id}"),
            None => "Already processed".to_string(),
        };
        Self {
            filename: filename.to_string(),
            success: false,
            receipt_id,
            status,
            message,
            validation: None,
        }
    }
}

/// Orchestrates receipt processing with trait-based DI.
pub struct ReceiptProcessor {
    extractor: Box<dyn ReceiptExtractor + Send + Sync>,
}

impl ReceiptProcessor {
    pub fn new(extractor: Box<dyn ReceiptExtractor + Send + Sync>) -> Self {
        Self { extractor }
    }

    /// Run the pipeline for one document already in the store.
    ///
    /// Terminal outcomes only — nothing intermediate is persisted:
    /// 1. Idempotency check: an existing receipt for this filename short-circuits
    ///    with the prior record's id; no extraction, no writes.
    /// 2. Extract: any failure aborts this document; nothing is persisted.
    /// 3. Validate: advisory — issues downgrade status, never abort.
    /// 4. Persist: header + items in one transaction; a constraint race is a
    ///    non-fatal already-processed outcome.
    pub fn process_document(
        &self,
        store: &ReceiptStore,
        filename: &str,
        conn: &Connection,
    ) -> DocumentOutcome {
        // Step 1: Idempotency check
        match repository::get_receipt_by_filename(conn, filename) {
            Ok(Some(existing)) => {
                tracing::info!(
                    file = %filename,
                    receipt_id = existing.id,
                    "Skipping already-processed receipt"
                );
                return DocumentOutcome::already_processed(
                    filename,
                    Some(existing.id),
                    Some(existing.processing_status),
                );
            }
            Ok(None) => {}
            Err(e) => return DocumentOutcome::failure(filename, e.to_string()),
        }

        // Step 2: Locate + extract
        let document = match store.document(filename) {
            Ok(doc) => doc,
            Err(e) => return DocumentOutcome::failure(filename, e.to_string()),
        };

        let extraction = match self.extractor.extract(&document) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "Extraction failed");
                return DocumentOutcome::failure(filename, e.to_string());
            }
        };

        // Step 3: Validate (advisory)
        let report = validate_extraction(&extraction.result);
        let status = if report.valid {
            ProcessingStatus::Complete
        } else {
            tracing::info!(
                file = %filename,
                issues = report.issues.len(),
                "Validation issues — marking for review"
            );
            ProcessingStatus::NeedsReview
        };

        // Step 4: Persist atomically
        let result = &extraction.result;
        let receipt = NewReceipt {
            filename: filename.to_string(),
            merchant_name: result.merchant_name.clone(),
            receipt_date: result.receipt_date.clone(),
            total_amount: result.total_amount,
            currency: result.currency.clone(),
            raw_text: extraction.raw_text.clone(),
            processing_status: status,
        };
        let items: Vec<NewReceiptItem> = result
            .items
            .iter()
            .map(|item| NewReceiptItem {
                item_name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                category: item.category.clone(),
            })
            .collect();

        match repository::insert_receipt_with_items(conn, &receipt, &items) {
            Ok(receipt_id) => DocumentOutcome {
                filename: filename.to_string(),
                success: true,
                receipt_id: Some(receipt_id),
                status: Some(status),
                message: format!("Stored as receipt #{receipt_id} ({})", status.as_str()),
                validation: Some(report),
            },
            Err(e) if e.is_conflict() => {
                // Raced by another invocation between the idempotency check
                // and the insert — the uniqueness constraint is the arbiter.
                let existing = repository::get_receipt_by_filename(conn, filename)
                    .ok()
                    .flatten();
                DocumentOutcome::already_processed(
                    filename,
                    existing.as_ref().map(|r| r.id),
                    existing.map(|r| r.processing_status),
                )
            }
            Err(e) => DocumentOutcome::failure(filename, e.to_string()),
        }
    }

    /// Move each source file into the store and process it, sequentially.
    ///
    /// Outcomes concatenate in input order. An intake failure (missing
    /// source, duplicate name) becomes that document's outcome; the batch
    /// continues.
    pub fn process_paths(
        &self,
        store: &ReceiptStore,
        paths: &[PathBuf],
        conn: &Connection,
    ) -> Vec<DocumentOutcome> {
        paths
            .iter()
            .map(|path| match store.move_in(path) {
                Ok(document) => self.process_document(store, &document.filename, conn),
                Err(e) => DocumentOutcome::failure(&display_name(path), e.to_string()),
            })
            .collect()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::db::sqlite::open_memory_database;
    use crate::pipeline::extraction::strategy::ExtractionPath;
    use crate::pipeline::extraction::types::{
        ExtractedItem, ExtractionOutcome, ExtractionResult,
    };
    use crate::pipeline::extraction::ExtractionError;

    /// Mock extractor with a call counter, so tests can assert that the
    /// idempotency check performs zero additional extraction work.
    struct MockExtractor {
        outcome: Result<ExtractionOutcome, String>,
        calls: Arc<AtomicUsize>,
    }

    impl MockExtractor {
        fn new(outcome: Result<ExtractionOutcome, String>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    outcome,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl ReceiptExtractor for MockExtractor {
        fn extract(
            &self,
            _document: &crate::store::StoredDocument,
        ) -> Result<ExtractionOutcome, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(outcome) => Ok(outcome.clone()),
                Err(message) => Err(ExtractionError::PathFailed {
                    path: "vision",
                    reason: message.clone(),
                }),
            }
        }
    }

    fn extraction_outcome(total: f64, item_totals: &[f64]) -> ExtractionOutcome {
        ExtractionOutcome {
            result: ExtractionResult {
                merchant_name: "Cafe X".into(),
                receipt_date: "2024-06-01".into(),
                total_amount: total,
                currency: "USD".into(),
                items: item_totals
                    .iter()
                    .map(|&t| ExtractedItem {
                        name: "Item".into(),
                        quantity: 1.0,
                        unit_price: Some(t),
                        total_price: t,
                        category: Some("dining".into()),
                    })
                    .collect(),
                confidence: 90.0,
            },
            raw_text: "Cafe X receipt text".into(),
            path: ExtractionPath::Vision,
        }
    }

    fn setup_store() -> (tempfile::TempDir, ReceiptStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ReceiptStore::new(dir.path().join("receipts"));
        store.ensure().unwrap();
        (dir, store)
    }

    fn stage_file(store: &ReceiptStore, name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join(name);
        std::fs::write(&source, b"%PDF-1.4 receipt").unwrap();
        store.move_in(&source).unwrap();
    }

    #[test]
    fn valid_receipt_persists_as_complete() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();
        stage_file(&store, "cafe.pdf");

        let (extractor, _) = MockExtractor::new(Ok(extraction_outcome(10.0, &[10.0])));
        let processor = ReceiptProcessor::new(Box::new(extractor));

        let outcome = processor.process_document(&store, "cafe.pdf", &conn);
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.status, Some(ProcessingStatus::Complete));

        let receipt = repository::get_receipt_by_filename(&conn, "cafe.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(receipt.merchant_name, "Cafe X");
        assert_eq!(receipt.processing_status, ProcessingStatus::Complete);

        let items = repository::get_items_for_receipt(&conn, receipt.id).unwrap();
        assert_eq!(items.len(), 1);
        assert!((items[0].total_price - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sum_mismatch_persists_as_needs_review() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();
        stage_file(&store, "off.pdf");

        let (extractor, _) = MockExtractor::new(Ok(extraction_outcome(10.0, &[2.0])));
        let processor = ReceiptProcessor::new(Box::new(extractor));

        let outcome = processor.process_document(&store, "off.pdf", &conn);
        assert!(outcome.success);
        assert_eq!(outcome.status, Some(ProcessingStatus::NeedsReview));

        let validation = outcome.validation.unwrap();
        assert!(!validation.valid);
        let sum_issues: Vec<_> = validation
            .issues
            .iter()
            .filter(|i| i.contains("sum to"))
            .collect();
        assert_eq!(sum_issues.len(), 1);

        let receipt = repository::get_receipt_by_filename(&conn, "off.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(receipt.processing_status, ProcessingStatus::NeedsReview);
    }

    #[test]
    fn second_run_is_a_noop_with_existing_id() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();
        stage_file(&store, "twice.pdf");

        let (extractor, calls) = MockExtractor::new(Ok(extraction_outcome(10.0, &[10.0])));
        let processor = ReceiptProcessor::new(Box::new(extractor));

        let first = processor.process_document(&store, "twice.pdf", &conn);
        assert!(first.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = processor.process_document(&store, "twice.pdf", &conn);
        assert!(!second.success);
        assert_eq!(second.receipt_id, first.receipt_id);
        assert!(second.message.contains("Already processed"));
        // No additional extraction and no additional rows
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(repository::count_receipts(&conn).unwrap(), 1);
    }

    #[test]
    fn extraction_failure_persists_nothing() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();
        stage_file(&store, "broken.pdf");

        let (extractor, _) = MockExtractor::new(Err("service unavailable".into()));
        let processor = ReceiptProcessor::new(Box::new(extractor));

        let outcome = processor.process_document(&store, "broken.pdf", &conn);
        assert!(!outcome.success);
        assert!(outcome.message.contains("service unavailable"));
        assert!(repository::get_receipt_by_filename(&conn, "broken.pdf")
            .unwrap()
            .is_none());
    }

    #[test]
    fn failed_document_is_retryable() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();
        stage_file(&store, "retry.pdf");

        let (failing, _) = MockExtractor::new(Err("down".into()));
        let processor = ReceiptProcessor::new(Box::new(failing));
        assert!(!processor.process_document(&store, "retry.pdf", &conn).success);

        // Nothing was committed, so a later run processes cleanly
        let (working, _) = MockExtractor::new(Ok(extraction_outcome(5.0, &[5.0])));
        let processor = ReceiptProcessor::new(Box::new(working));
        let outcome = processor.process_document(&store, "retry.pdf", &conn);
        assert!(outcome.success);
    }

    #[test]
    fn missing_document_is_a_failure_outcome() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();

        let (extractor, calls) = MockExtractor::new(Ok(extraction_outcome(1.0, &[1.0])));
        let processor = ReceiptProcessor::new(Box::new(extractor));

        let outcome = processor.process_document(&store, "ghost.pdf", &conn);
        assert!(!outcome.success);
        assert!(outcome.message.contains("ghost.pdf"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn batch_outcomes_in_order_and_independent() {
        let (_dir, store) = setup_store();
        let conn = open_memory_database().unwrap();

        let source_dir = tempfile::tempdir().unwrap();
        let good = source_dir.path().join("good.pdf");
        std::fs::write(&good, b"%PDF-1.4").unwrap();
        let missing = source_dir.path().join("missing.pdf");
        let also_good = source_dir.path().join("also_good.pdf");
        std::fs::write(&also_good, b"%PDF-1.4").unwrap();

        let (extractor, _) = MockExtractor::new(Ok(extraction_outcome(10.0, &[10.0])));
        let processor = ReceiptProcessor::new(Box::new(extractor));

        let outcomes = processor.process_paths(&store, &[good, missing, also_good], &conn);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].filename, "good.pdf");
        assert!(outcomes[0].success);
        assert_eq!(outcomes[1].filename, "missing.pdf");
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[2].filename, "also_good.pdf");
        assert!(outcomes[2].success, "one failure must not abort the batch");
    }

    #[test]
    fn insert_race_is_nonfatal_already_processed() {
        let (_dir, store) = setup_store();
        let db_dir = tempfile::tempdir().unwrap();
        let db_path = db_dir.path().join("raced.db");
        let conn = crate::db::sqlite::open_database(&db_path).unwrap();
        stage_file(&store, "raced.pdf");

        // Simulates a separate pipeline invocation committing between this
        // run's idempotency check and its insert: the "extraction" step wins
        // the race through its own connection to the same database file.
        struct RacingExtractor {
            db_path: PathBuf,
            inner: ExtractionOutcome,
        }
        impl ReceiptExtractor for RacingExtractor {
            fn extract(
                &self,
                document: &crate::store::StoredDocument,
            ) -> Result<ExtractionOutcome, ExtractionError> {
                let other = crate::db::sqlite::open_database(&self.db_path).unwrap();
                let receipt = NewReceipt {
                    filename: document.filename.clone(),
                    merchant_name: "Other Invocation".into(),
                    receipt_date: "2024-01-01".into(),
                    total_amount: 1.0,
                    currency: "USD".into(),
                    raw_text: String::new(),
                    processing_status: ProcessingStatus::Complete,
                };
                repository::insert_receipt_with_items(&other, &receipt, &[]).unwrap();
                Ok(self.inner.clone())
            }
        }

        let processor = ReceiptProcessor::new(Box::new(RacingExtractor {
            db_path: db_path.clone(),
            inner: extraction_outcome(10.0, &[10.0]),
        }));
        let outcome = processor.process_document(&store, "raced.pdf", &conn);

        // The uniqueness constraint arbitrates: non-fatal, reports the winner
        assert!(!outcome.success);
        assert!(outcome.message.contains("Already processed"));
        assert_eq!(repository::count_receipts(&conn).unwrap(), 1);
        let winner = repository::get_receipt_by_filename(&conn, "raced.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(winner.merchant_name, "Other Invocation");
        assert_eq!(outcome.receipt_id, Some(winner.id));
    }
}
