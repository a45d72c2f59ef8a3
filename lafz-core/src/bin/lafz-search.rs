use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lafz_core::{open_storage, Document};

#[derive(Debug, Parser)]
#[command(
    name = "lafz-search",
    about = "Index a corpus of Arabic verses and search it by Latin transliteration"
)]
struct Cli {
    /// Directory holding the index store
    store: PathBuf,

    /// Corpus file, one `identifier<TAB>arabic` per line
    corpus: PathBuf,

    /// Transliteration to search for
    query: String,

    /// Minimum confidence for reported matches (0..1)
    #[arg(long)]
    min_confidence: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut storage = open_storage(&cli.store)
        .with_context(|| format!("opening store at {}", cli.store.display()))?;

    let raw = fs::read_to_string(&cli.corpus)
        .with_context(|| format!("reading corpus {}", cli.corpus.display()))?;
    let mut documents = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (identifier, arabic) = line.split_once('\t').with_context(|| {
            format!(
                "{}:{}: expected identifier<TAB>arabic",
                cli.corpus.display(),
                lineno + 1
            )
        })?;
        documents.push(Document {
            identifier: identifier.to_string(),
            arabic: arabic.to_string(),
        });
    }
    storage.add_documents(&documents)?;

    if let Some(min) = cli.min_confidence {
        storage.set_min_confidence(min);
    }

    for result in storage.search(&cli.query)? {
        println!(
            "{}",
            serde_json::json!({
                "identifier": result.identifier,
                "confidence": result.confidence,
                "positions": result.positions,
            })
        );
    }

    Ok(())
}
