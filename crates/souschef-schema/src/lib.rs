use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ingredient line of a recipe. `amount` is a display label
/// ("2个", "适量"), not a parsed quantity. `category` drives dietary
/// restriction filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nutrition {
    pub calories: u32,
    pub protein: f32,
    pub fat: f32,
    pub carbs: f32,
    pub fiber: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    /// Ingredient name -> suggested replacements, in preference order.
    #[serde(default)]
    pub substitutions: HashMap<String, Vec<String>>,
    pub nutrition: Nutrition,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl Recipe {
    /// Deduplicated ingredient names in listing order.
    pub fn ingredient_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.ingredients
            .iter()
            .map(|i| i.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// Lightweight listing view of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: u32,
    pub name: String,
    pub difficulty: String,
    pub time: String,
    pub tags: Vec<String>,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            difficulty: recipe.difficulty.clone(),
            time: recipe.time.clone(),
            tags: recipe.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Role+content snapshot of a turn, as handed to prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnView {
    pub role: ChatRole,
    pub content: String,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    RecommendByIngredients,
    CookingGuide,
    NutritionQuery,
    Substitution,
    General,
}

impl Default for IntentKind {
    fn default() -> Self {
        Self::General
    }
}

/// Structured extraction from one user message. Produced by the NLP
/// provider or the local keyword fallback; both fill the same shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedIntent {
    #[serde(default)]
    pub intent: IntentKind,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub restrictions: Vec<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub target_dish: Option<String>,
}
