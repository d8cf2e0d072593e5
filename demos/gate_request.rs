//! Gate a few requests against the configured authority.
//!
//! # Running
//!
//! ```bash
//! export CONTENTGATE_API_KEY="your-api-key"
//! export CONTENTGATE_SITE_URL="https://blog.example.org"
//! export ACCESS_TOKEN="reader-token"
//! RUST_LOG=contentgate=debug cargo run --example gate_request
//! ```
//!
//! Without an API key every token is denied, which still shows the
//! denial notice and the logs.

use contentgate::{
    AccessGate, ContentMeta, FileStore, GateConfig, GateRequest, JsonlRecordStore, MemoryCatalog,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const ARTICLE: u64 = 42;
const ATTACHMENT: u64 = 43;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match GateConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = Arc::new(MemoryCatalog::new());
    catalog.insert(
        ContentMeta::new(ARTICLE, "post")
            .with_excerpt("An in-depth look at how publishers license their archives to crawlers."),
    );
    catalog.insert(ContentMeta::new(ATTACHMENT, "attachment"));

    let cache_dir = std::env::temp_dir().join("contentgate-demo");
    let gate = match FileStore::with_path(cache_dir.join("cache")).and_then(|cache| {
        let records = JsonlRecordStore::new(cache_dir.join("access.jsonl"))?;
        AccessGate::new(config, catalog, Arc::new(cache), Arc::new(records))
    }) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to build gate: {}", e);
            std::process::exit(1);
        }
    };

    let anonymous = GateRequest::new().with_remote_addr("203.0.113.77");
    let mut reader = GateRequest::new()
        .with_remote_addr("203.0.113.77")
        .with_header("User-Agent", "contentgate-demo/0.1");
    if let Ok(token) = std::env::var("ACCESS_TOKEN") {
        reader = reader.with_bearer(&token);
    }

    println!("Protection headers: {:?}", gate.protection_headers());
    println!();

    println!("Attachment (not protected):");
    println!("  {}", gate.protect_content(ATTACHMENT, &anonymous, "binary data"));

    println!("Article, no token:");
    println!("  {}", gate.protect_content(ARTICLE, &anonymous, "<p>Full article</p>"));
    println!("  excerpt: {}", gate.protect_excerpt(ARTICLE, &anonymous, "An in-depth look at how publishers license their archives to crawlers."));

    println!("Article, reader token:");
    let decision = gate.decide(ARTICLE, &reader);
    if decision.allow {
        println!("  access granted");
    } else {
        println!("  access denied ({})", decision.deny_reason.unwrap_or_default());
    }

    match gate.validator().cache_stats() {
        Ok(stats) => println!("Cache: {} entries ({} valid, {} invalid)", stats.total, stats.valid, stats.invalid),
        Err(e) => eprintln!("Cache stats unavailable: {}", e),
    }
}
