// Session orchestration
// Per-session state plus the upload and ask flows that drive it

pub mod shell;


use std::path::Path;
use tracing::{debug, info, warn};

use crate::answer::{AnswerComposer, Completer};
use crate::config::RetrievalConfig;
use crate::embeddings::chunking::{ContentChunk, chunk_text};
use crate::embeddings::Embedder;
use crate::extract::extract_pdf_file;
use crate::history::SessionHistory;
use crate::index::VectorIndex;
use crate::{AssistantError, Result};

pub const EMPTY_QUESTION_WARNING: &str = "Please enter a question";

/// The uploaded document: its chunks and the built index over their embeddings
#[derive(Debug)]
pub struct Document {
    chunks: Vec<ContentChunk>,
    index: VectorIndex,
}

impl Document {
    #[inline]
    pub fn chunks(&self) -> &[ContentChunk] {
        &self.chunks
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Join the text of the chunks with the given ids using single spaces
    fn context_for(&self, ids: &[usize]) -> String {
        ids.iter()
            .filter_map(|&id| self.chunks.get(id))
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// State owned by one interactive session
#[derive(Debug, Default)]
pub struct SessionContext {
    document: Option<Document>,
    history: SessionHistory,
}

impl SessionContext {
    #[inline]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    #[inline]
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }
}

/// Result of indexing a new document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub character_count: usize,
    pub chunk_count: usize,
}

/// Result of a successful ask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    pub answer: String,
    /// Retrieved context; empty when no document is loaded
    pub context: String,
    /// Chunk ids the context was built from, nearest first
    pub chunk_ids: Vec<usize>,
}

/// Runs the upload and ask flows against one [`SessionContext`]
pub struct Assistant<E, C> {
    embedder: E,
    composer: AnswerComposer<C>,
    retrieval: RetrievalConfig,
    index_seed: Option<u64>,
    session: SessionContext,
}

impl<E: Embedder, C: Completer> Assistant<E, C> {
    #[inline]
    pub fn new(embedder: E, completer: C, retrieval: RetrievalConfig) -> Self {
        Self {
            embedder,
            composer: AnswerComposer::new(completer),
            retrieval,
            index_seed: None,
            session: SessionContext::default(),
        }
    }

    /// Build indexes reproducibly from `seed`
    #[inline]
    pub fn with_index_seed(mut self, seed: u64) -> Self {
        self.index_seed = Some(seed);
        self
    }

    #[inline]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[inline]
    pub fn history(&self) -> &SessionHistory {
        &self.session.history
    }

    #[inline]
    pub fn has_index(&self) -> bool {
        self.session.document.is_some()
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    #[inline]
    pub fn completer(&self) -> &C {
        self.composer.completer()
    }

    /// Extract, chunk, embed and index the PDF at `path`.
    ///
    /// `on_embedded(done, total)` is called after each chunk is embedded. On any
    /// failure the previously loaded document stays in place.
    #[inline]
    pub fn upload_pdf<F>(&mut self, path: &Path, on_embedded: F) -> Result<UploadSummary>
    where
        F: FnMut(usize, usize),
    {
        info!("Uploading PDF: {}", path.display());
        let text = extract_pdf_file(path)?;
        self.index_text(&text, on_embedded)
    }

    /// Replace the current document with `text`
    #[inline]
    pub fn load_text(&mut self, text: &str) -> Result<UploadSummary> {
        self.index_text(text, |_, _| {})
    }

    /// Chunk and embed `text` and swap in the new index once it is fully built.
    /// Empty text clears the current document without any embedding calls.
    #[inline]
    pub fn index_text<F>(&mut self, text: &str, mut on_embedded: F) -> Result<UploadSummary>
    where
        F: FnMut(usize, usize),
    {
        let chunks = chunk_text(text, &self.retrieval.chunking());
        let summary = UploadSummary {
            character_count: text.chars().count(),
            chunk_count: chunks.len(),
        };

        if chunks.is_empty() {
            info!("Document has no text; clearing index");
            self.session.document = None;
            return Ok(summary);
        }

        let mut index = match self.index_seed {
            Some(seed) => VectorIndex::with_seed(self.embedder.dimension(), seed),
            None => VectorIndex::new(self.embedder.dimension()),
        };

        let total = chunks.len();
        for chunk in &chunks {
            let embedding = self.embedder.embed(&chunk.content).map_err(|e| {
                warn!("Embedding chunk {} failed: {}", chunk.chunk_index, e);
                AssistantError::from(e)
            })?;
            index.add(chunk.chunk_index, &embedding)?;
            on_embedded(chunk.chunk_index + 1, total);
        }

        index.build(self.retrieval.tree_count)?;

        info!(
            "Indexed document: {} characters in {} chunks",
            summary.character_count, summary.chunk_count
        );
        self.session.document = Some(Document { chunks, index });
        Ok(summary)
    }

    /// Answer `question`, grounded in the current document when one is loaded.
    ///
    /// An empty question is a validation error and nothing else happens. Any
    /// service failure aborts without touching the history.
    #[inline]
    pub fn ask(&mut self, question: &str) -> Result<AskOutcome> {
        if question.trim().is_empty() {
            return Err(AssistantError::Validation(EMPTY_QUESTION_WARNING.to_string()));
        }

        let (context, chunk_ids) = match &self.session.document {
            Some(document) => {
                let embedding = self.embedder.embed(question)?;
                let chunk_ids = document.index.query(&embedding, self.retrieval.top_k)?;
                debug!("Retrieved chunks {:?}", chunk_ids);
                (document.context_for(&chunk_ids), chunk_ids)
            }
            None => {
                debug!("No document loaded; answering without context");
                (String::new(), Vec::new())
            }
        };

        let answer = self.composer.answer(question, &context)?;
        self.session.history.append(question, answer.as_str());

        info!("Answered question ({} context chunks)", chunk_ids.len());
        Ok(AskOutcome {
            answer,
            context,
            chunk_ids,
        })
    }
}
