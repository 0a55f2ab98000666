// Cardsift CLI - run the screening pipeline over a pasted batch
// Reads from a file argument or stdin, prints a summary (or --json)

use anyhow::{Context, Result};
use cardsift::{BatchPipeline, ProcessOptions};
use std::env;
use std::fs;
use std::io::Read;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let path = args.iter().find(|a| !a.starts_with("--"));

    let input = match path {
        Some(p) => fs::read_to_string(p).with_context(|| format!("Failed to read {}", p))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let pipeline = BatchPipeline::new();
    let result = pipeline.process(&input, &ProcessOptions::default());

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("🧹 Batch screening");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Lines in:        {}", result.original_count);
    println!("  Kept:            {}", result.valid_count);
    println!("  Duplicates:      {}", result.duplicates_removed);
    println!("  Expired:         {}", result.expired_removed);
    println!("  Invalid format:  {}", result.invalid_format_removed);
    println!("  Luhn failed:     {}", result.luhn_failed_removed);

    match &result.verdict {
        Some(v) if v.is_generated => {
            println!(
                "\n⚠️  Batch looks machine-generated ({}% confidence: {})",
                v.confidence,
                v.reasons.join(", ")
            );
        }
        Some(v) => {
            println!("\n✓ No generation fingerprint ({}% confidence)", v.confidence);
        }
        None => {
            println!("\n✓ Batch too small for generation analysis");
        }
    }

    Ok(())
}
