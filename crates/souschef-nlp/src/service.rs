//! Degradation wrappers. Each service pairs a primary provider with its
//! local substitute and tags every outcome with the path that produced
//! it, so callers observe degraded answers without catching errors.

use std::sync::Arc;

use souschef_schema::{ParsedIntent, TurnView};

use crate::intent::{IntentExtractor, KeywordIntentExtractor};
use crate::response::{RecipeHighlight, ResponseGenerator, APOLOGY};
use crate::SignalSource;

pub struct IntentService {
    primary: Arc<dyn IntentExtractor>,
    fallback: KeywordIntentExtractor,
}

impl IntentService {
    pub fn new(primary: Arc<dyn IntentExtractor>) -> Self {
        Self {
            primary,
            fallback: KeywordIntentExtractor,
        }
    }

    /// Never fails: a provider error swaps in the keyword matcher.
    pub async fn extract(&self, message: &str) -> (ParsedIntent, SignalSource) {
        match self.primary.parse(message).await {
            Ok(parsed) => (parsed, SignalSource::Primary),
            Err(err) => {
                tracing::warn!("intent provider failed, using keyword fallback: {err}");
                (self.fallback.extract(message), SignalSource::Fallback)
            }
        }
    }
}

pub struct ResponseService {
    generator: Arc<dyn ResponseGenerator>,
}

impl ResponseService {
    pub fn new(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self { generator }
    }

    /// Never fails: a generator error degrades to the fixed apology.
    pub async fn reply(
        &self,
        user_text: &str,
        context: &[TurnView],
        highlights: &[RecipeHighlight],
    ) -> (String, SignalSource) {
        match self.generator.generate(user_text, context, highlights).await {
            Ok(text) => (text, SignalSource::Primary),
            Err(err) => {
                tracing::warn!("response generator failed, using apology: {err}");
                (APOLOGY.to_string(), SignalSource::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use souschef_schema::IntentKind;

    struct FailingExtractor;

    #[async_trait]
    impl IntentExtractor for FailingExtractor {
        async fn parse(&self, _message: &str) -> Result<ParsedIntent> {
            Err(anyhow!("provider down"))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ResponseGenerator for FailingGenerator {
        async fn generate(
            &self,
            _user_text: &str,
            _context: &[TurnView],
            _highlights: &[RecipeHighlight],
        ) -> Result<String> {
            Err(anyhow!("provider down"))
        }
    }

    #[tokio::test]
    async fn intent_service_falls_back_to_keywords() {
        let service = IntentService::new(Arc::new(FailingExtractor));
        let (parsed, source) = service.extract("有番茄和鸡蛋").await;
        assert_eq!(source, SignalSource::Fallback);
        assert_eq!(parsed.intent, IntentKind::RecommendByIngredients);
        assert_eq!(parsed.ingredients, vec!["番茄", "鸡蛋"]);
    }

    #[tokio::test]
    async fn intent_service_primary_tagged() {
        let service = IntentService::new(Arc::new(KeywordIntentExtractor));
        let (_, source) = service.extract("有豆腐").await;
        assert_eq!(source, SignalSource::Primary);
    }

    #[tokio::test]
    async fn response_service_degrades_to_apology() {
        let service = ResponseService::new(Arc::new(FailingGenerator));
        let (reply, source) = service.reply("你好", &[], &[]).await;
        assert_eq!(source, SignalSource::Fallback);
        assert_eq!(reply, APOLOGY);
    }
}
