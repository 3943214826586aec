//! Per-message orchestration: extract intent, merge into conversation
//! state, rank candidates, generate a reply, record both turns. Every
//! upstream failure is absorbed by a fallback, so handling a message
//! never fails.

use std::collections::HashSet;
use std::sync::Arc;

use souschef_catalog::RecipeCatalog;
use souschef_conversation::ConversationStore;
use souschef_nlp::{IntentService, RecipeHighlight, ResponseService, SignalSource};
use souschef_ranking::{CandidateSource, HybridRanker, MatchResult};
use souschef_schema::{ChatRole, ConversationId, IntentKind};

/// Everything the caller needs to render one exchange.
#[derive(Debug)]
pub struct ChatReply {
    pub conversation_id: ConversationId,
    pub reply: String,
    pub intent: IntentKind,
    pub matches: Vec<MatchResult>,
    pub detected_ingredients: Vec<String>,
    pub detected_restrictions: Vec<String>,
    pub intent_source: SignalSource,
    pub reply_source: SignalSource,
    /// Present only when this message triggered a recommendation.
    pub candidate_source: Option<CandidateSource>,
}

pub struct ChatEngine {
    catalog: Arc<RecipeCatalog>,
    store: Arc<ConversationStore>,
    ranker: HybridRanker,
    intents: IntentService,
    responses: ResponseService,
    top_k: usize,
    context_turns: usize,
}

impl ChatEngine {
    pub fn new(
        catalog: Arc<RecipeCatalog>,
        store: Arc<ConversationStore>,
        ranker: HybridRanker,
        intents: IntentService,
        responses: ResponseService,
        top_k: usize,
        context_turns: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            ranker,
            intents,
            responses,
            top_k,
            context_turns,
        }
    }

    pub fn catalog(&self) -> &Arc<RecipeCatalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Handles one user message. A missing conversation id starts a
    /// fresh conversation.
    pub async fn handle_message(
        &self,
        conversation_id: Option<ConversationId>,
        text: &str,
    ) -> ChatReply {
        let id = match conversation_id {
            Some(id) => id,
            None => self.store.create().await,
        };

        // History as it stood before this message; the message itself
        // goes to the generator separately.
        let context = self.store.recent_context(&id, self.context_turns).await;

        let (parsed, intent_source) = self.intents.extract(text).await;
        tracing::debug!(
            conversation = %id,
            intent = ?parsed.intent,
            ingredients = ?parsed.ingredients,
            restrictions = ?parsed.restrictions,
            "message parsed"
        );

        self.store
            .add_turn(
                &id,
                ChatRole::User,
                text,
                &parsed.ingredients,
                &parsed.restrictions,
            )
            .await;

        let (matches, candidate_source) = if parsed.intent == IntentKind::RecommendByIngredients {
            let (ingredients, restrictions) = self.accumulated_sets(&id).await;
            let outcome = self
                .ranker
                .rank(text, &ingredients, &restrictions, self.top_k)
                .await;
            (outcome.results, Some(outcome.source))
        } else {
            (Vec::new(), None)
        };

        let highlights: Vec<RecipeHighlight> = matches.iter().map(highlight).collect();
        let (reply, reply_source) = self.responses.reply(text, &context, &highlights).await;

        self.store
            .add_turn(&id, ChatRole::Assistant, &reply, &[], &[])
            .await;

        ChatReply {
            conversation_id: id,
            reply,
            intent: parsed.intent,
            matches,
            detected_ingredients: parsed.ingredients,
            detected_restrictions: parsed.restrictions,
            intent_source,
            reply_source,
            candidate_source,
        }
    }

    async fn accumulated_sets(&self, id: &ConversationId) -> (HashSet<String>, HashSet<String>) {
        match self.store.get(id).await {
            Some(state) => (
                state.ingredients.into_iter().collect(),
                state.restrictions.into_iter().collect(),
            ),
            None => (HashSet::new(), HashSet::new()),
        }
    }
}

fn highlight(result: &MatchResult) -> RecipeHighlight {
    RecipeHighlight {
        name: result.recipe.name.clone(),
        tags: result.recipe.tags.clone(),
        difficulty: result.recipe.difficulty.clone(),
        time: result.recipe.time.clone(),
        match_percent: (result.combined_score * 100.0).round() as u8,
        matched_ingredients: result.matched_ingredients.clone(),
    }
}
