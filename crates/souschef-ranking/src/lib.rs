//! Hybrid recipe ranking: semantic candidates blended with exact
//! ingredient overlap, behind hard dietary-restriction filtering.

pub mod overlap;
pub mod ranker;
pub mod restriction;

pub use overlap::{ingredient_overlap, IngredientMatch};
pub use ranker::{CandidateSource, HybridRanker, MatchResult, RankOutcome, RankingConfig};
pub use restriction::{RestrictionFilter, RestrictionTable};
