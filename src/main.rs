//! Thin terminal shell: resolve pasted paths, run the pipeline, print outcomes.

use std::io::BufRead;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ledgera::config;
use ledgera::db;
use ledgera::pipeline::extraction::{ChatCompletionsClient, LlmReceiptExtractor, PdfiumRenderer};
use ledgera::pipeline::{DocumentOutcome, ReceiptProcessor};
use ledgera::store::{resolve_pasted_paths, ReceiptStore};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::Settings::from_env();

    let Some(api_key) = settings.api_key.clone() else {
        eprintln!("LEDGERA_API_KEY is not set — the extraction service needs a credential.");
        std::process::exit(1);
    };

    let store = ReceiptStore::new(config::receipts_dir());
    if let Err(e) = store.ensure() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let conn = match db::sqlite::open_database(&settings.database_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Cannot open database: {e}");
            std::process::exit(1);
        }
    };

    let renderer = match PdfiumRenderer::new() {
        Ok(renderer) => renderer,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let client = ChatCompletionsClient::default_remote(&api_key);
    let extractor = LlmReceiptExtractor::new(Arc::new(client), Arc::new(renderer))
        .with_vision_fallback(settings.vision_fallback);
    let processor = ReceiptProcessor::new(Box::new(extractor));

    eprintln!(
        "Paste receipt paths (one per line), Enter to process, Ctrl-D to quit.\n\
         Store: {}",
        store.location().display()
    );

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("stdin error: {e}");
                break;
            }
        };

        let paths = resolve_pasted_paths(&line);
        if paths.is_empty() {
            if !line.trim().is_empty() {
                eprintln!("No existing files in that input.");
            }
            continue;
        }

        for outcome in processor.process_paths(&store, &paths, &conn) {
            print_outcome(&outcome);
        }
    }
}

fn print_outcome(outcome: &DocumentOutcome) {
    let marker = if outcome.success { "ok" } else { "--" };
    println!("[{marker}] {}: {}", outcome.filename, outcome.message);
    if let Some(validation) = &outcome.validation {
        for issue in &validation.issues {
            println!("       issue: {issue}");
        }
    }
}
