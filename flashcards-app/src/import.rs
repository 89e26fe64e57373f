use crate::ocr::{ImagePayload, OcrError, TextExtractor};
use flashcards_core::{parse_cards_with, CardStore, CoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Store(#[from] CoreError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { parsed: usize, added: usize },
    NothingFound,
    /// Another import was still running; this trigger did nothing.
    AlreadyRunning,
}

/// Bulk import with a single-flight guard.
#[derive(Default)]
pub struct ImportWorkflow {
    in_progress: AtomicBool,
}

struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ImportWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    fn begin(&self) -> Option<InProgress<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InProgress(&self.in_progress))
    }

    pub fn import_text(
        &self,
        text: &str,
        category: &str,
        store: &CardStore,
    ) -> Result<ImportOutcome, ImportError> {
        let Some(_guard) = self.begin() else {
            debug!("import already running, ignoring trigger");
            return Ok(ImportOutcome::AlreadyRunning);
        };
        store_parsed(text, category, store)
    }

    pub async fn import_image(
        &self,
        extractor: &dyn TextExtractor,
        image: &ImagePayload,
        category: &str,
        store: &CardStore,
    ) -> Result<ImportOutcome, ImportError> {
        let Some(_guard) = self.begin() else {
            debug!("import already running, ignoring trigger");
            return Ok(ImportOutcome::AlreadyRunning);
        };
        let text = extractor.extract_text(image).await?;
        store_parsed(&text, category, store)
    }
}

fn store_parsed(text: &str, category: &str, store: &CardStore) -> Result<ImportOutcome, ImportError> {
    let cards = parse_cards_with(text, category, store.ids());
    if cards.is_empty() {
        return Ok(ImportOutcome::NothingFound);
    }
    let parsed = cards.len();
    let added = store.append(cards)?;
    info!(parsed, added, "imported cards");
    Ok(ImportOutcome::Imported { parsed, added })
}
