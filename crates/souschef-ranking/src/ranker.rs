use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use souschef_catalog::RecipeCatalog;
use souschef_retrieval::SemanticRetriever;
use souschef_schema::Recipe;

use crate::overlap::ingredient_overlap;
use crate::restriction::RestrictionFilter;

fn default_semantic_weight() -> f32 {
    0.3
}

fn default_overlap_weight() -> f32 {
    0.7
}

fn default_oversample() -> usize {
    2
}

fn default_retriever_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    #[serde(default = "default_overlap_weight")]
    pub overlap_weight: f32,
    /// Candidate multiplier over top_k, so filtering has room to drop.
    #[serde(default = "default_oversample")]
    pub oversample: usize,
    #[serde(default = "default_retriever_timeout_ms")]
    pub retriever_timeout_ms: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            overlap_weight: default_overlap_weight(),
            oversample: default_oversample(),
            retriever_timeout_ms: default_retriever_timeout_ms(),
        }
    }
}

impl RankingConfig {
    fn retriever_timeout(&self) -> Duration {
        Duration::from_millis(self.retriever_timeout_ms)
    }
}

/// Where the candidate set came from. Lets callers log degraded paths
/// without catching errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Semantic,
    IngredientIndex,
    CatalogScan,
}

/// Per-query scoring of one candidate. Owned by the caller of `rank`,
/// never persisted.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub recipe: Arc<Recipe>,
    pub semantic_similarity: Option<f32>,
    pub ingredient_overlap: f32,
    pub combined_score: f32,
    pub matched_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RankOutcome {
    pub results: Vec<MatchResult>,
    pub source: CandidateSource,
}

pub struct HybridRanker {
    catalog: Arc<RecipeCatalog>,
    retriever: Arc<dyn SemanticRetriever>,
    filter: RestrictionFilter,
    config: RankingConfig,
}

impl HybridRanker {
    pub fn new(
        catalog: Arc<RecipeCatalog>,
        retriever: Arc<dyn SemanticRetriever>,
        filter: RestrictionFilter,
        config: RankingConfig,
    ) -> Self {
        Self {
            catalog,
            retriever,
            filter,
            config,
        }
    }

    /// Rank recipes for a query. Retriever failure or timeout narrows
    /// the candidate source to the ingredient index (or a full catalog
    /// scan), it never fails the call; an empty result is valid.
    pub async fn rank(
        &self,
        query_text: &str,
        query_ingredients: &HashSet<String>,
        restrictions: &HashSet<String>,
        top_k: usize,
    ) -> RankOutcome {
        let (candidates, source) = self.candidates(query_text, query_ingredients, top_k).await;

        let mut results: Vec<MatchResult> = candidates
            .into_iter()
            .filter(|(recipe, _)| !self.filter.is_violating(recipe, restrictions))
            .map(|(recipe, similarity)| self.score(recipe, similarity, query_ingredients))
            .collect();

        // Stable sort: equal scores keep candidate-production order.
        results.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
        results.truncate(top_k);

        RankOutcome { results, source }
    }

    async fn candidates(
        &self,
        query_text: &str,
        query_ingredients: &HashSet<String>,
        top_k: usize,
    ) -> (Vec<(Arc<Recipe>, Option<f32>)>, CandidateSource) {
        let want = top_k.saturating_mul(self.config.oversample);
        let attempt = tokio::time::timeout(
            self.config.retriever_timeout(),
            self.retriever.retrieve(query_text, want),
        )
        .await;

        match attempt {
            Ok(Ok(hits)) => {
                let mut out = Vec::with_capacity(hits.len());
                for hit in hits {
                    match self.catalog.get_by_id(hit.recipe_id) {
                        Ok(recipe) => {
                            out.push((recipe, Some(hit.similarity.clamp(0.0, 1.0))));
                        }
                        Err(_) => {
                            tracing::warn!(
                                recipe_id = hit.recipe_id,
                                "retriever returned id unknown to catalog, skipping"
                            );
                        }
                    }
                }
                (out, CandidateSource::Semantic)
            }
            Ok(Err(err)) => {
                tracing::warn!("semantic retriever failed, using fallback: {err}");
                self.fallback_candidates(query_ingredients)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.retriever_timeout_ms,
                    "semantic retriever timed out, using fallback"
                );
                self.fallback_candidates(query_ingredients)
            }
        }
    }

    fn fallback_candidates(
        &self,
        query_ingredients: &HashSet<String>,
    ) -> (Vec<(Arc<Recipe>, Option<f32>)>, CandidateSource) {
        if !query_ingredients.is_empty() {
            let ids = self
                .catalog
                .recipes_with_any(query_ingredients.iter().map(|s| s.as_str()));
            let candidates = ids
                .into_iter()
                .filter_map(|id| self.catalog.get_by_id(id).ok())
                .map(|recipe| (recipe, None))
                .collect();
            (candidates, CandidateSource::IngredientIndex)
        } else {
            let candidates = self
                .catalog
                .iter()
                .map(|recipe| (Arc::clone(recipe), None))
                .collect();
            (candidates, CandidateSource::CatalogScan)
        }
    }

    fn score(
        &self,
        recipe: Arc<Recipe>,
        similarity: Option<f32>,
        query_ingredients: &HashSet<String>,
    ) -> MatchResult {
        let overlap = ingredient_overlap(query_ingredients, &recipe);

        let combined = match similarity {
            // With no stated ingredients the overlap term is always 0,
            // so the similarity stands alone instead of being damped.
            Some(sim) if query_ingredients.is_empty() => sim,
            Some(sim) => {
                self.config.semantic_weight * sim + self.config.overlap_weight * overlap.score
            }
            None => overlap.score,
        };

        MatchResult {
            recipe,
            semantic_similarity: similarity,
            ingredient_overlap: overlap.score,
            combined_score: combined.clamp(0.0, 1.0),
            matched_ingredients: overlap.matched,
            missing_ingredients: overlap.missing,
        }
    }
}
