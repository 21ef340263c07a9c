//! Diagnostic tool: answers one content URI the way the host app would see it.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use stickerpack::database;
use stickerpack::logging::init_logging;
use stickerpack::provider::{ContentServer, Route};
use stickerpack::{Outcome, StickerConfig};

#[derive(Parser)]
#[command(name = "stickerpack")]
#[command(about = "Query the sticker content server and print the result as JSON", long_about = None)]
struct Args {
    /// content://<authority>/<path> to resolve
    uri: String,

    /// Package name of the calling app
    caller: Option<String>,

    /// TOML config file
    #[arg(long, env = "STICKERPACK_CONFIG")]
    config: Option<PathBuf>,

    /// Print the MIME type instead of the content
    #[arg(long)]
    mime: bool,
}

fn main() {
    init_logging();
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => StickerConfig::load(path),
        None => Ok(StickerConfig::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    let db = match database::shared(&config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error opening database: {}", e);
            process::exit(1);
        }
    };
    let server = match ContentServer::new(config, db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error starting content server: {}", e);
            process::exit(1);
        }
    };

    let caller = args.caller.as_deref();
    let output = if args.mime {
        finish(server.get_type(&args.uri).map(serde_json::Value::String))
    } else {
        match server.routes().match_uri(&args.uri) {
            Ok(Route::StickerAsset { .. } | Route::TrayIcon { .. }) => {
                finish(server.open_asset(&args.uri, caller).map(|handle| {
                    serde_json::json!({
                        "path": handle.path,
                        "mime_type": handle.mime_type,
                        "length": handle.length,
                        "is_fallback": handle.is_fallback,
                    })
                }))
            }
            _ => finish(
                server
                    .query(&args.uri, caller)
                    .map(|cursor| serde_json::to_value(cursor).unwrap_or_default()),
            ),
        }
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error writing JSON: {}", e);
            process::exit(1);
        }
    }
}

/// Prints warnings and debug notes to stderr; exits on failure.
fn finish(outcome: Outcome<serde_json::Value>) -> serde_json::Value {
    match outcome {
        Outcome::Success(value) => value,
        Outcome::Warning(msg) => {
            eprintln!("Warning: {}", msg);
            serde_json::Value::Null
        }
        Outcome::Debug(msg) => {
            eprintln!("Debug: {}", msg);
            serde_json::Value::Null
        }
        Outcome::Failure(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}
