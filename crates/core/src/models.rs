use crate::error::CorpusError;
use serde::{Deserialize, Serialize};

/// Nearest enclosing heading at each level for a span of page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingContext {
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub h3: Option<String>,
}

impl HeadingContext {
    /// Context after a heading of `level` (1..=3) is seen. Deeper levels reset.
    pub fn enter(&self, level: usize, title: &str) -> Self {
        let title = Some(title.to_string());
        match level {
            1 => Self {
                h1: title,
                h2: None,
                h3: None,
            },
            2 => Self {
                h1: self.h1.clone(),
                h2: title,
                h3: None,
            },
            _ => Self {
                h1: self.h1.clone(),
                h2: self.h2.clone(),
                h3: title,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.h1.is_none() && self.h2.is_none() && self.h3.is_none()
    }

    pub fn section_title(&self) -> Option<String> {
        self.h2.clone().or_else(|| self.h1.clone())
    }
}

/// The atomic retrievable unit, one line of the JSONL export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub source: String,
    pub category: Option<String>,
    pub page: u32,
    #[serde(flatten)]
    pub heading: HeadingContext,
    pub section_title: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchTier {
    Exact,
    PrefixOr,
}

/// A record produced by one query execution, with the store's BM25 rank
/// (lower is more relevant).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: ChunkRecord,
    pub rank: f64,
    pub variant: String,
    pub tier: MatchTier,
}

impl SearchHit {
    pub fn dedup_key(&self) -> String {
        if !self.record.id.is_empty() {
            return self.record.id.clone();
        }

        let head: String = self.record.text.chars().take(80).collect();
        format!("{}|{}|{}", self.record.source, self.record.page, head)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    pub source_filter: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            top_k,
            source_filter: None,
        }
    }

    pub fn with_source_filter(mut self, pattern: impl Into<String>) -> Self {
        self.source_filter = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub category: Option<String>,
    pub section_title: Option<String>,
    pub chunk_id: String,
    pub rank: f64,
}

impl From<SearchHit> for Citation {
    fn from(hit: SearchHit) -> Self {
        Self {
            text: hit.record.text,
            source: hit.record.source,
            page: hit.record.page,
            category: hit.record.category,
            section_title: hit.record.section_title,
            chunk_id: hit.record.id,
            rank: hit.rank,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub query: String,
    pub results: Vec<Citation>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub heading_regex: &'static str,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1_500,
            chunk_overlap_chars: 200,
            heading_regex: r"(?m)^[ \t]*(#{1,3})[ \t]+(\S.*?)[ \t]*$",
        }
    }
}

impl IngestionOptions {
    pub fn validate(&self) -> Result<(), CorpusError> {
        if self.chunk_max_chars == 0 {
            return Err(CorpusError::InvalidChunkConfig(
                "chunk_max_chars must be positive".to_string(),
            ));
        }

        if self.chunk_overlap_chars >= self.chunk_max_chars {
            return Err(CorpusError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max chunk size {}",
                self.chunk_overlap_chars, self.chunk_max_chars
            )));
        }

        Ok(())
    }
}
