//! OCR of many pre-rendered document pages on a bounded worker pool.

use std::{fs, path::Path};

use rayon::prelude::*;

use crate::{
    sleep::Sleeper, transport::Transport, OcrRequest, Result, RetryPolicy, ServiceConfig,
    SimplismartClient, SimplismartError,
};

pub const DEFAULT_PAGE_PROMPT: &str = "Convert the document to markdown.";
pub const DEFAULT_WORKERS: usize = 4;
pub const PAGE_SEPARATOR: &str = "\n\n<--- Page Split --->\n\n";
pub const COMBINED_FILE_NAME: &str = "combined_ocr.txt";

/// Rendered pages (PNG bytes) to OCR with one shared instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageBatch {
    pub pages: Vec<Vec<u8>>,
    pub prompt: String,
    pub workers: usize,
}

impl PageBatch {
    pub fn new(pages: Vec<Vec<u8>>) -> Self {
        Self {
            pages,
            prompt: DEFAULT_PAGE_PROMPT.to_owned(),
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

impl<T: Transport, S: Sleeper> SimplismartClient<T, S> {
    /// OCRs every page and returns the texts in page order.
    ///
    /// At most `batch.workers` requests are in flight. Every page runs to
    /// completion; if any fail, the error is the one for the lowest failing
    /// page index.
    pub fn ocr_pages(
        &self,
        config: &ServiceConfig,
        batch: &PageBatch,
        policy: &RetryPolicy,
    ) -> Result<Vec<String>> {
        if batch.workers == 0 {
            return Err(SimplismartError::Config(
                "page batch needs at least one worker".to_owned(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(batch.workers)
            .thread_name(|index| format!("ocr-page-{index}"))
            .build()
            .map_err(|err| SimplismartError::Config(format!("cannot build worker pool: {err}")))?;

        let results: Vec<Result<String>> = pool.install(|| {
            batch
                .pages
                .par_iter()
                .enumerate()
                .map(|(index, png)| self.ocr_page(config, &batch.prompt, index, png, policy))
                .collect()
        });
        results.into_iter().collect()
    }

    fn ocr_page(
        &self,
        config: &ServiceConfig,
        prompt: &str,
        index: usize,
        png: &[u8],
        policy: &RetryPolicy,
    ) -> Result<String> {
        let request = OcrRequest::for_page(prompt, png);
        let text = self
            .ocr(config, &request, policy)
            .map_err(|err| SimplismartError::Page {
                index,
                source: Box::new(err),
            })?;

        #[cfg(feature = "tracing")]
        {
            if text.is_empty() {
                tracing::warn!("no text found for page {}", index);
            } else {
                tracing::debug!("page {} recognized ({} chars)", index, text.len());
            }
        }

        Ok(text)
    }
}

/// Joins page texts with the page separator.
pub fn combine_pages(pages: &[String]) -> String {
    pages.join(PAGE_SEPARATOR)
}

/// Writes `page_{i}.txt` for each non-empty page and `combined_ocr.txt`.
pub fn write_outputs(dir: impl AsRef<Path>, pages: &[String]) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for (index, text) in pages.iter().enumerate() {
        if !text.is_empty() {
            fs::write(dir.join(format!("page_{index}.txt")), text)?;
        }
    }
    fs::write(dir.join(COMBINED_FILE_NAME), combine_pages(pages))?;
    Ok(())
}
