use crate::models::{Citation, MatchTier, SearchHit, SearchQuery, SearchResult};
use crate::query::QueryProcessor;
use crate::store::MatchRequest;
use crate::traits::KeywordIndex;
use crate::SearchError;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Attempt strategies in priority order. A later tier runs only when every
/// earlier one produced no hits at all.
const TIERS: [MatchTier; 2] = [MatchTier::Exact, MatchTier::PrefixOr];

impl MatchTier {
    fn expression(self, processor: &QueryProcessor, variant: &str) -> Option<String> {
        match self {
            MatchTier::Exact => Some(variant.to_string()),
            MatchTier::PrefixOr => processor.prefix_or_expression(variant),
        }
    }
}

pub struct SearchCoordinator<K>
where
    K: KeywordIndex,
{
    keyword: K,
    processor: QueryProcessor,
}

impl<K> SearchCoordinator<K>
where
    K: KeywordIndex + Send + Sync,
{
    pub fn new(keyword: K) -> Self {
        Self::with_processor(keyword, QueryProcessor::default())
    }

    pub fn with_processor(keyword: K, processor: QueryProcessor) -> Self {
        Self { keyword, processor }
    }

    /// Ranked, deduplicated lookup. Store failures never escape: a missing
    /// index or a failed backend is reported through `SearchResult::error`.
    pub async fn search(&self, query: &SearchQuery) -> SearchResult {
        if query.text.trim().is_empty() {
            return SearchResult {
                query: query.text.clone(),
                results: Vec::new(),
                error: Some("query is empty".to_string()),
            };
        }

        let top_k = query.top_k.max(1);
        let variants = self.processor.variants(&query.text);
        debug!(query = %query.text, ?variants, "query variants");

        let mut hits = Vec::new();
        let mut backend_error = None;

        for tier in TIERS {
            let attempt = self
                .run_tier(tier, &variants, top_k, query.source_filter.as_deref(), &mut hits)
                .await;

            match attempt {
                Ok(()) => {}
                Err(SearchError::IndexMissing(details)) => {
                    warn!(%details, "search requested before the index was built");
                    return SearchResult {
                        query: query.text.clone(),
                        results: Vec::new(),
                        error: Some(format!("index not found: {details}")),
                    };
                }
                Err(error) => backend_error = Some(error.to_string()),
            }

            if !hits.is_empty() {
                break;
            }
        }

        let results = dedup_hits(hits, top_k)
            .into_iter()
            .inspect(|hit| {
                debug!(
                    chunk_id = %hit.record.id,
                    variant = %hit.variant,
                    tier = ?hit.tier,
                    rank = hit.rank,
                    "result kept"
                );
            })
            .map(Citation::from)
            .collect::<Vec<_>>();

        SearchResult {
            query: query.text.clone(),
            error: if results.is_empty() { backend_error } else { None },
            results,
        }
    }

    /// Runs every variant under `tier`, appending hits in variant order.
    /// Rejected expressions are skipped; other backend failures are skipped
    /// too but the last one is returned once the tier is exhausted.
    async fn run_tier(
        &self,
        tier: MatchTier,
        variants: &[String],
        limit: usize,
        source_filter: Option<&str>,
        hits: &mut Vec<SearchHit>,
    ) -> Result<(), SearchError> {
        let mut last_error = None;

        for variant in variants {
            let Some(expression) = tier.expression(&self.processor, variant) else {
                continue;
            };

            let request = MatchRequest {
                expression: &expression,
                limit,
                source_filter,
            };

            match self.keyword.search_keyword(&request).await {
                Ok(found) => {
                    debug!(?tier, %expression, hits = found.len(), "query executed");
                    hits.extend(found.into_iter().map(|hit| hit.into_hit(variant, tier)));
                }
                Err(SearchError::QuerySyntax(details)) => {
                    warn!(?tier, %expression, %details, "store rejected query expression");
                }
                Err(error @ SearchError::IndexMissing(_)) => return Err(error),
                Err(error) => {
                    warn!(?tier, %expression, %error, "keyword search failed");
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Keeps the first occurrence of each chunk, so hits from earlier variants
/// and tiers outrank later ones regardless of store rank.
fn dedup_hits(hits: Vec<SearchHit>, top_k: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.dedup_key()))
        .take(top_k)
        .collect()
}
