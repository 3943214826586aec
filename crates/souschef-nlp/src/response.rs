//! Reply generation. The LLM path composes a chat-completions request
//! from recent turns and recipe highlights; any failure degrades to a
//! fixed apology instead of propagating.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use souschef_schema::{ChatRole, TurnView};

/// The degradation reply. Callers return it verbatim when the
/// generator fails, so users see a stable message rather than an error.
pub const APOLOGY: &str = "抱歉，我暂时无法回答，请稍后再试。";

const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";

const SYSTEM_PROMPT: &str = "你是\"美食推荐与食谱智能助手\"，一个专业、友好的烹饪助手。\n\n\
你的特点：\n\
1. 根据用户提供的食材推荐合适的菜谱\n\
2. 详细解释烹饪步骤，适合烹饪新手\n\
3. 提供营养和热量信息\n\
4. 给出食材替代建议\n\
5. 支持多轮对话，记住之前的上下文\n\n\
回复风格：\n\
- 热情友好，像一位经验丰富的厨师\n\
- 回答清晰、结构分明\n\
- 如果推荐菜谱，请简洁介绍菜品特色";

/// Compact recipe facts injected into the prompt alongside the user
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeHighlight {
    pub name: String,
    pub tags: Vec<String>,
    pub difficulty: String,
    pub time: String,
    /// Combined match score as a whole percentage.
    pub match_percent: u8,
    pub matched_ingredients: Vec<String>,
}

impl RecipeHighlight {
    fn prompt_line(&self) -> String {
        format!(
            "- {}：{}，难度{}，约{}\n  匹配度：{}%，已有食材：{}\n",
            self.name,
            self.tags.join(", "),
            self.difficulty,
            self.time,
            self.match_percent,
            self.matched_ingredients.join(", "),
        )
    }
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        user_text: &str,
        context: &[TurnView],
        highlights: &[RecipeHighlight],
    ) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct LlmResponseGenerator {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl LlmResponseGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn role_label(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
    }
}

pub(crate) fn compose_user_content(user_text: &str, highlights: &[RecipeHighlight]) -> String {
    if highlights.is_empty() {
        return user_text.to_string();
    }
    let mut content = format!("{user_text}\n\n相关菜谱信息：\n");
    for highlight in highlights {
        content.push_str(&highlight.prompt_line());
    }
    content
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(
        &self,
        user_text: &str,
        context: &[TurnView],
        highlights: &[RecipeHighlight],
    ) -> Result<String> {
        let mut messages = vec![ApiMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        }];
        for turn in context {
            messages.push(ApiMessage {
                role: role_label(turn.role).to_string(),
                content: turn.content.clone(),
            });
        }
        messages.push(ApiMessage {
            role: "user".to_string(),
            content: compose_user_content(user_text, highlights),
        });

        let url = format!("{}/chat/completions", self.api_base);
        let payload = ApiRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.7,
            max_tokens: 1000,
        };

        let resp = self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(anyhow!("response api error ({status})"));
        }

        let body: ApiResponse = resp.json().await?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("response api error: empty choices"))?;
        if content.is_empty() {
            return Err(anyhow!("response api error: empty content"));
        }
        Ok(content)
    }
}

/// Echo generator for wiring tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StubResponseGenerator;

#[async_trait]
impl ResponseGenerator for StubResponseGenerator {
    async fn generate(
        &self,
        user_text: &str,
        _context: &[TurnView],
        highlights: &[RecipeHighlight],
    ) -> Result<String> {
        let names: Vec<&str> = highlights.iter().map(|h| h.name.as_str()).collect();
        if names.is_empty() {
            Ok(format!("[stub] {user_text}"))
        } else {
            Ok(format!("[stub] {user_text} 推荐：{}", names.join("、")))
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiAssistantMessage,
}

#[derive(Debug, Deserialize)]
struct ApiAssistantMessage {
    #[serde(default)]
    content: String,
}
