use crate::models::{ChunkRecord, MatchTier, SearchHit};

/// One row returned by the full-text store with its BM25 rank.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    pub record: ChunkRecord,
    pub rank: f64,
}

impl StoreHit {
    pub fn into_hit(self, variant: &str, tier: MatchTier) -> SearchHit {
        SearchHit {
            record: self.record,
            rank: self.rank,
            variant: variant.to_string(),
            tier,
        }
    }
}

/// A single full-text expression to execute against the store.
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest<'a> {
    pub expression: &'a str,
    pub limit: usize,
    pub source_filter: Option<&'a str>,
}
