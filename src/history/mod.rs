
/// A question and the answer it received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
}

/// Append-only log of answered questions for the current session.
///
/// Entries are stored oldest first and rendered newest first. There is no size
/// bound; the log lives as long as the session.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(HistoryEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Entries newest first
    #[inline]
    pub fn all(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> + DoubleEndedIterator {
        self.entries.iter().rev()
    }

    #[inline]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
