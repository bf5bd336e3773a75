use crate::models::ChunkRecord;
use crate::store::{MatchRequest, StoreHit};
use crate::SearchError;
use async_trait::async_trait;

#[async_trait]
pub trait KeywordIndex {
    /// Replaces the whole index with `records`; returns the number of rows written.
    async fn rebuild_index(&self, records: &[ChunkRecord]) -> Result<usize, SearchError>;

    async fn search_keyword(
        &self,
        request: &MatchRequest<'_>,
    ) -> Result<Vec<StoreHit>, SearchError>;
}
