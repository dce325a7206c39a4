use crate::index::{cosine_similarity, SearchHit};
use crate::models::RetrievedChunk;

#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the answer composer.
    pub top_k: usize,
    /// Candidate pool fetched from the index is `top_k * pool_multiplier`.
    pub pool_multiplier: usize,
    /// 1.0 is pure relevance, 0.0 is pure diversity.
    pub mmr_lambda: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            pool_multiplier: 4,
            mmr_lambda: 0.5,
        }
    }
}

impl RetrievalConfig {
    pub fn pool_size(&self) -> usize {
        self.top_k.saturating_mul(self.pool_multiplier).max(1)
    }
}

/// Maximal-marginal-relevance selection over a candidate pool.
///
/// Picks `k` chunks one at a time, each maximizing
/// `lambda * sim(query, chunk) - (1 - lambda) * max sim(chunk, selected)`,
/// which keeps near-duplicate chunks from crowding out distinct context.
/// Ties resolve to the earlier (more relevant) candidate.
pub fn mmr_select(
    query_vector: &[f32],
    mut candidates: Vec<SearchHit>,
    k: usize,
    lambda: f32,
) -> Vec<RetrievedChunk> {
    let lambda = lambda.clamp(0.0, 1.0);
    let mut selected: Vec<SearchHit> = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k && !candidates.is_empty() {
        let mut best_position = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (position, candidate) in candidates.iter().enumerate() {
            let relevance = cosine_similarity(query_vector, &candidate.vector);
            let redundancy = selected
                .iter()
                .map(|picked| cosine_similarity(&candidate.vector, &picked.vector))
                .fold(0.0f32, f32::max);

            let marginal = lambda * relevance - (1.0 - lambda) * redundancy;
            if marginal > best_score {
                best_score = marginal;
                best_position = position;
            }
        }

        selected.push(candidates.remove(best_position));
    }

    selected
        .into_iter()
        .map(|hit| RetrievedChunk {
            chunk: hit.chunk,
            score: hit.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;

    fn hit(id: &str, score: f32, vector: Vec<f32>) -> SearchHit {
        SearchHit {
            chunk: DocumentChunk {
                chunk_id: id.to_string(),
                document_id: "doc".to_string(),
                filename: "doc.pdf".to_string(),
                chunk_index: 0,
                char_offset: 0,
                text: id.to_string(),
            },
            score,
            vector,
        }
    }

    #[test]
    fn empty_pool_selects_nothing() {
        assert!(mmr_select(&[1.0, 0.0], Vec::new(), 3, 0.5).is_empty());
    }

    #[test]
    fn never_selects_more_than_k() {
        let candidates = vec![
            hit("a", 0.9, vec![0.9, 0.1, 0.0]),
            hit("b", 0.8, vec![0.8, 0.2, 0.0]),
            hit("c", 0.7, vec![0.7, 0.3, 0.0]),
        ];
        assert_eq!(mmr_select(&[1.0, 0.0, 0.0], candidates, 2, 0.5).len(), 2);
    }

    #[test]
    fn returns_all_when_pool_is_smaller_than_k() {
        let candidates = vec![hit("a", 0.9, vec![0.9, 0.1])];
        assert_eq!(mmr_select(&[1.0, 0.0], candidates, 10, 0.5).len(), 1);
    }

    #[test]
    fn pure_relevance_preserves_similarity_order() {
        let candidates = vec![
            hit("best", 0.9, vec![0.95, 0.05]),
            hit("mid", 0.8, vec![0.7, 0.3]),
            hit("worst", 0.5, vec![0.3, 0.7]),
        ];
        let picked = mmr_select(&[1.0, 0.0], candidates, 3, 1.0);
        let ids: Vec<&str> = picked.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["best", "mid", "worst"]);
    }

    #[test]
    fn balanced_lambda_skips_near_duplicates() {
        let candidates = vec![
            hit("first", 0.95, vec![0.99, 0.01, 0.0]),
            hit("duplicate", 0.94, vec![0.98, 0.02, 0.0]),
            hit("distinct", 0.70, vec![0.0, 0.0, 1.0]),
        ];
        let picked = mmr_select(&[1.0, 0.0, 0.0], candidates, 2, 0.5);

        assert_eq!(picked[0].chunk.chunk_id, "first");
        assert_eq!(picked[1].chunk.chunk_id, "distinct");
    }

    #[test]
    fn ties_resolve_to_earlier_candidate() {
        let candidates = vec![
            hit("earlier", 0.9, vec![1.0, 0.0]),
            hit("later", 0.9, vec![1.0, 0.0]),
        ];
        let picked = mmr_select(&[1.0, 0.0], candidates, 1, 1.0);
        assert_eq!(picked[0].chunk.chunk_id, "earlier");
    }

    #[test]
    fn lambda_is_clamped() {
        let candidates = vec![hit("a", 0.9, vec![1.0, 0.0])];
        let picked = mmr_select(&[1.0, 0.0], candidates, 1, 7.5);
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn default_pool_is_four_times_k() {
        let config = RetrievalConfig::default();
        assert_eq!(config.pool_size(), 12);
    }
}
