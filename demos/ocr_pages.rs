//! OCRs a directory of pages already rendered to PNG (`page_000.png`, ...)
//! and writes per-page and combined text files.
//!
//! Usage: `cargo run --example ocr_pages -- <pages_dir> [output_dir]`

use std::{fs, path::PathBuf};

use anyhow::Context;
use simplismart_http::{write_outputs, PageBatch, RetryPolicy, ServiceConfig, SimplismartClient};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().context("usage: ocr_pages <pages_dir> [output_dir]")?);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "output".to_owned()));

    let mut paths: Vec<PathBuf> = fs::read_dir(&input)
        .with_context(|| format!("cannot read {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();

    let pages = paths
        .iter()
        .map(|path| fs::read(path).with_context(|| format!("cannot read {}", path.display())))
        .collect::<anyhow::Result<Vec<_>>>()?;
    println!("Running OCR on {} page(s)...", pages.len());

    let config = ServiceConfig::from_dotenv()?;
    let client = SimplismartClient::new()?;
    let texts = client.ocr_pages(&config, &PageBatch::new(pages), &RetryPolicy::default())?;

    write_outputs(&output, &texts)?;
    println!("OCR completed. Output saved to {}", output.display());

    Ok(())
}
