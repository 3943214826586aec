//! Assembles the recommendation core: catalog, retrieval, ranking,
//! conversation state, and language collaborators, behind one
//! per-message entry point.

pub mod config;
pub mod engine;

pub use config::{load_config, AssistantConfig, EmbeddingConfig, NlpConfig};
pub use engine::{ChatEngine, ChatReply};
