//! Intent extraction: an OpenAI-compatible chat-completions call that
//! asks the model for structured JSON, plus a keyword matcher over a
//! fixed vocabulary for when the provider is unreachable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use souschef_schema::{IntentKind, ParsedIntent};

const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";

const SYSTEM_PROMPT: &str = "你是一个专业的美食助手，负责解析用户的自然语言输入。\
请从用户消息中提取以下信息并以JSON格式返回：\n\
{\n\
  \"intent\": \"recommend_by_ingredients/cooking_guide/nutrition_query/substitution/general\",\n\
  \"ingredients\": [\"食材列表\"],\n\
  \"restrictions\": [\"饮食限制\"],\n\
  \"preferences\": [\"口味偏好\"],\n\
  \"target_dish\": \"目标菜品（如果有）\"\n\
}\n\n\
注意：\n\
- 食材要标准化，例如\"西红柿\"统一为\"番茄\"\n\
- 饮食限制使用：vegetarian/strict-vegan/no-seafood/no-spicy/low-carb/weight-loss\n\
- 如果用户提到过敏，也要标记在restrictions中\n\
- 只返回JSON，不要其他文字";

/// Free text in, structured intent out. Errors mean "provider
/// unavailable"; callers substitute the keyword fallback.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn parse(&self, message: &str) -> Result<ParsedIntent>;
}

#[derive(Debug, Clone)]
pub struct LlmIntentExtractor {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl LlmIntentExtractor {
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

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn parse(&self, message: &str) -> Result<ParsedIntent> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = ApiRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ApiMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
            ],
            temperature: 0.3,
            max_tokens: 500,
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
            return Err(anyhow!("intent api error ({status})"));
        }

        let body: ApiResponse = resp.json().await?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| anyhow!("intent api error: empty choices"))?;
        parse_intent_content(content)
    }
}

/// Parses the model's reply as intent JSON, tolerating a markdown code
/// fence around it.
pub(crate) fn parse_intent_content(content: &str) -> Result<ParsedIntent> {
    let stripped = strip_code_fence(content);
    let wire: WireIntent = serde_json::from_str(stripped)
        .map_err(|e| anyhow!("intent reply is not valid JSON: {e}"))?;
    Ok(ParsedIntent {
        intent: intent_from_label(wire.intent.as_deref().unwrap_or_default()),
        ingredients: wire.ingredients,
        restrictions: wire
            .restrictions
            .into_iter()
            .map(|label| canonical_restriction(&label))
            .collect(),
        preferences: wire.preferences,
        target_dish: wire.target_dish.filter(|d| !d.is_empty()),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn intent_from_label(label: &str) -> IntentKind {
    match label {
        "recommend_by_ingredients" => IntentKind::RecommendByIngredients,
        "cooking_guide" => IntentKind::CookingGuide,
        "nutrition_query" => IntentKind::NutritionQuery,
        "substitution" => IntentKind::Substitution,
        _ => IntentKind::General,
    }
}

/// Maps the Chinese restriction labels the model sometimes emits to the
/// canonical tokens the filter table keys on. Already-canonical and
/// unknown labels pass through unchanged (unknowns are no-ops in the
/// filter anyway).
pub fn canonical_restriction(label: &str) -> String {
    match label {
        "素食" | "素" => "vegetarian".to_string(),
        "纯素" | "全素" => "strict-vegan".to_string(),
        "无海鲜" | "海鲜过敏" => "no-seafood".to_string(),
        "无辣" | "不辣" => "no-spicy".to_string(),
        "低碳水" | "低碳" => "low-carb".to_string(),
        "减肥" => "weight-loss".to_string(),
        other => other.to_string(),
    }
}

const COMMON_INGREDIENTS: &[&str] = &[
    "番茄", "鸡蛋", "土豆", "猪肉", "鸡肉", "牛肉", "鱼", "虾", "豆腐", "茄子", "青椒", "洋葱",
    "大蒜", "姜", "葱", "胡萝卜", "白菜", "青菜", "黄瓜", "冬瓜", "南瓜", "面条", "米饭", "粉丝",
    "腐竹",
];

/// Local substring matcher over a fixed vocabulary. Never fails, so it
/// is the last line of the extraction path.
#[derive(Debug, Clone, Default)]
pub struct KeywordIntentExtractor;

impl KeywordIntentExtractor {
    pub fn extract(&self, message: &str) -> ParsedIntent {
        let ingredients: Vec<String> = COMMON_INGREDIENTS
            .iter()
            .filter(|name| message.contains(*name))
            .map(|name| name.to_string())
            .collect();

        let mut restrictions = Vec::new();
        if ["素食", "不吃肉", "吃素"].iter().any(|w| message.contains(w)) {
            restrictions.push("vegetarian".to_string());
        }
        if ["纯素", "全素"].iter().any(|w| message.contains(w)) {
            restrictions.push("strict-vegan".to_string());
        }
        if message.contains("过敏") && ["海鲜", "鱼", "虾"].iter().any(|w| message.contains(w)) {
            restrictions.push("no-seafood".to_string());
        }
        if message.contains("辣") && (message.contains("不吃") || message.contains("不要")) {
            restrictions.push("no-spicy".to_string());
        }
        if message.contains("低碳水") || message.contains("低碳") {
            restrictions.push("low-carb".to_string());
        }
        if message.contains("减肥") {
            restrictions.push("weight-loss".to_string());
        }

        let intent = if ["怎么做", "做法", "步骤", "教程"].iter().any(|w| message.contains(w)) {
            IntentKind::CookingGuide
        } else if ["营养", "热量", "卡路里"].iter().any(|w| message.contains(w)) {
            IntentKind::NutritionQuery
        } else if ["替代", "换成", "代替"].iter().any(|w| message.contains(w)) {
            IntentKind::Substitution
        } else if !ingredients.is_empty() {
            IntentKind::RecommendByIngredients
        } else {
            IntentKind::General
        };

        ParsedIntent {
            intent,
            ingredients,
            restrictions,
            preferences: Vec::new(),
            target_dish: None,
        }
    }
}

#[async_trait]
impl IntentExtractor for KeywordIntentExtractor {
    async fn parse(&self, message: &str) -> Result<ParsedIntent> {
        Ok(self.extract(message))
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

#[derive(Debug, Deserialize)]
struct WireIntent {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    restrictions: Vec<String>,
    #[serde(default)]
    preferences: Vec<String>,
    #[serde(default)]
    target_dish: Option<String>,
}
