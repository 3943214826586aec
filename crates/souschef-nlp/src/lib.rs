//! External language collaborators: intent extraction from free text and
//! reply generation, each with a local degradation path so an upstream
//! outage never surfaces as a request failure.

pub mod intent;
pub mod response;
pub mod service;

use serde::{Deserialize, Serialize};

pub use intent::{IntentExtractor, KeywordIntentExtractor, LlmIntentExtractor};
pub use response::{
    LlmResponseGenerator, RecipeHighlight, ResponseGenerator, StubResponseGenerator, APOLOGY,
};
pub use service::{IntentService, ResponseService};

/// Which path produced an outcome. `Fallback` means the upstream
/// provider failed and a local substitute answered instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Primary,
    Fallback,
}
