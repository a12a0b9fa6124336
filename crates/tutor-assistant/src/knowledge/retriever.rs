//! Keyword retriever over the knowledge base.
//!
//! Score = number of item keywords that occur as substrings of the normalized
//! query. Items scoring zero are dropped; ties keep catalog order.

use super::{KnowledgeBase, KnowledgeItem};

/// Upper bound on items handed to the composer.
pub const MAX_RESULTS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ScoredItem<'a> {
    pub item: &'a KnowledgeItem,
    pub relevance_score: f32,
}

impl KnowledgeBase {
    /// Top matches for an already-normalized query, at most [`MAX_RESULTS`].
    pub fn retrieve(&self, normalized_query: &str) -> Vec<ScoredItem<'_>> {
        self.retrieve_top(normalized_query, MAX_RESULTS)
    }

    pub fn retrieve_top(&self, normalized_query: &str, top_k: usize) -> Vec<ScoredItem<'_>> {
        if normalized_query.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &KnowledgeItem)> = self
            .items()
            .iter()
            .filter_map(|item| {
                let hits = item
                    .keywords
                    .iter()
                    .filter(|kw| normalized_query.contains(kw.as_str()))
                    .count();
                (hits > 0).then_some((hits, item))
            })
            .collect();

        // sort_by is stable, so equal scores stay in catalog order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(top_k);

        tracing::debug!(
            query = normalized_query,
            matched = scored.len(),
            top = scored.first().map(|(_, item)| item.id.as_str()),
            "Knowledge retrieval"
        );

        scored
            .into_iter()
            .map(|(hits, item)| ScoredItem {
                item,
                relevance_score: hits as f32,
            })
            .collect()
    }
}
