//! Immutable recipe catalog: load-once lookup plus an inverted
//! ingredient index used by the ranking fallback path.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use souschef_schema::{Recipe, RecipeSummary};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("recipe not found: {0}")]
    RecipeNotFound(u32),
    #[error("duplicate recipe id: {0}")]
    DuplicateId(u32),
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk envelope of the recipe source file.
#[derive(Deserialize)]
struct CatalogFile {
    recipes: Vec<Recipe>,
}

/// Read-only after construction; no mutation is exposed.
#[derive(Debug)]
pub struct RecipeCatalog {
    recipes: Vec<Arc<Recipe>>,
    by_id: HashMap<u32, usize>,
    /// Ingredient name -> recipe ids in catalog order.
    ingredient_index: HashMap<String, Vec<u32>>,
}

impl RecipeCatalog {
    pub fn from_recipes(recipes: Vec<Recipe>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(recipes.len());
        let mut ingredient_index: HashMap<String, Vec<u32>> = HashMap::new();

        for (idx, recipe) in recipes.iter().enumerate() {
            if by_id.insert(recipe.id, idx).is_some() {
                return Err(CatalogError::DuplicateId(recipe.id));
            }
            for name in recipe.ingredient_names() {
                ingredient_index
                    .entry(name.to_string())
                    .or_default()
                    .push(recipe.id);
            }
        }

        tracing::info!(
            recipes = recipes.len(),
            ingredients = ingredient_index.len(),
            "recipe catalog built"
        );

        Ok(Self {
            recipes: recipes.into_iter().map(Arc::new).collect(),
            by_id,
            ingredient_index,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_recipes(file.recipes)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn get_by_id(&self, id: u32) -> Result<Arc<Recipe>, CatalogError> {
        self.by_id
            .get(&id)
            .map(|&idx| Arc::clone(&self.recipes[idx]))
            .ok_or(CatalogError::RecipeNotFound(id))
    }

    /// All recipes in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.iter()
    }

    pub fn summaries(&self) -> Vec<RecipeSummary> {
        self.recipes
            .iter()
            .map(|r| RecipeSummary::from(r.as_ref()))
            .collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<RecipeSummary> {
        self.recipes
            .iter()
            .filter(|r| r.tags.iter().any(|t| t == tag))
            .map(|r| RecipeSummary::from(r.as_ref()))
            .collect()
    }

    /// Substitutes recorded for one ingredient of one recipe.
    /// Empty when the recipe has no entry for that ingredient.
    pub fn substitutions(&self, id: u32, ingredient: &str) -> Result<Vec<String>, CatalogError> {
        let recipe = self.get_by_id(id)?;
        Ok(recipe
            .substitutions
            .get(ingredient)
            .cloned()
            .unwrap_or_default())
    }

    /// Recipe ids containing at least one of the given ingredients,
    /// in catalog order, each id at most once.
    pub fn recipes_with_any<'a>(
        &self,
        ingredients: impl IntoIterator<Item = &'a str>,
    ) -> Vec<u32> {
        let mut wanted = std::collections::HashSet::new();
        for name in ingredients {
            if let Some(ids) = self.ingredient_index.get(name) {
                wanted.extend(ids.iter().copied());
            }
        }
        self.recipes
            .iter()
            .map(|r| r.id)
            .filter(|id| wanted.contains(id))
            .collect()
    }

    /// Text handed to the embedding model for one recipe: names,
    /// category, tags and ingredient names, one document per recipe.
    pub fn document_text(recipe: &Recipe) -> String {
        let ingredients = recipe.ingredient_names().join("、");
        let tags = recipe.tags.join("、");
        format!(
            "{} {} 分类:{} 标签:{} 食材:{}",
            recipe.name, recipe.name_en, recipe.category, tags, ingredients
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souschef_schema::{Ingredient, Nutrition};
    use std::io::Write;

    fn recipe(id: u32, name: &str, ingredients: &[(&str, &str)], tags: &[&str]) -> Recipe {
        Recipe {
            id,
            name: name.to_string(),
            name_en: String::new(),
            category: "家常菜".to_string(),
            difficulty: "简单".to_string(),
            time: "15分钟".to_string(),
            servings: 2,
            ingredients: ingredients
                .iter()
                .map(|(n, c)| Ingredient {
                    name: n.to_string(),
                    amount: "适量".to_string(),
                    category: c.to_string(),
                })
                .collect(),
            substitutions: HashMap::new(),
            nutrition: Nutrition {
                calories: 100,
                protein: 5.0,
                fat: 5.0,
                carbs: 10.0,
                fiber: 1.0,
            },
            tags: tags.iter().map(|t| t.to_string()).collect(),
            steps: vec![],
            tips: vec![],
        }
    }

    fn catalog() -> RecipeCatalog {
        RecipeCatalog::from_recipes(vec![
            recipe(1, "番茄炒蛋", &[("番茄", "蔬菜"), ("鸡蛋", "dairy-or-egg")], &["快手"]),
            recipe(2, "麻婆豆腐", &[("豆腐", "豆制品"), ("猪肉", "meat")], &["下饭", "辣"]),
            recipe(3, "凉拌豆腐", &[("豆腐", "豆制品")], &["快手", "素食"]),
        ])
        .unwrap()
    }

    #[test]
    fn get_by_id_found() {
        let catalog = catalog();
        let recipe = catalog.get_by_id(2).unwrap();
        assert_eq!(recipe.name, "麻婆豆腐");
    }

    #[test]
    fn get_by_id_not_found() {
        let catalog = catalog();
        let err = catalog.get_by_id(99).unwrap_err();
        assert!(matches!(err, CatalogError::RecipeNotFound(99)));
    }

    #[test]
    fn duplicate_id_rejected() {
        let err = RecipeCatalog::from_recipes(vec![
            recipe(1, "a", &[], &[]),
            recipe(1, "b", &[], &[]),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(1)));
    }

    #[test]
    fn summaries_cover_all_recipes() {
        let summaries = catalog().summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].id, 1);
        assert_eq!(summaries[0].name, "番茄炒蛋");
    }

    #[test]
    fn by_tag_filters() {
        let quick = catalog().by_tag("快手");
        assert_eq!(quick.len(), 2);
        assert!(quick.iter().all(|s| s.tags.iter().any(|t| t == "快手")));
        assert!(catalog().by_tag("不存在").is_empty());
    }

    #[test]
    fn substitutions_lookup() {
        let mut base = recipe(1, "番茄炒蛋", &[("番茄", "蔬菜")], &[]);
        base.substitutions
            .insert("番茄".to_string(), vec!["圣女果".to_string()]);
        let catalog = RecipeCatalog::from_recipes(vec![base]).unwrap();

        assert_eq!(catalog.substitutions(1, "番茄").unwrap(), vec!["圣女果"]);
        assert!(catalog.substitutions(1, "鸡蛋").unwrap().is_empty());
        assert!(catalog.substitutions(42, "番茄").is_err());
    }

    #[test]
    fn recipes_with_any_union_in_catalog_order() {
        let catalog = catalog();
        let ids = catalog.recipes_with_any(["豆腐", "番茄"]);
        assert_eq!(ids, vec![1, 2, 3]);

        let ids = catalog.recipes_with_any(["豆腐"]);
        assert_eq!(ids, vec![2, 3]);

        assert!(catalog.recipes_with_any(["龙虾"]).is_empty());
    }

    #[test]
    fn from_json_envelope() {
        let json = r#"{
            "recipes": [{
                "id": 1,
                "name": "番茄炒蛋",
                "ingredients": [{"name": "番茄", "amount": "2个", "category": "蔬菜"}],
                "nutrition": {"calories": 180, "protein": 10.0, "fat": 12.0, "carbs": 8.0, "fiber": 1.5}
            }]
        }"#;
        let catalog = RecipeCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get_by_id(1).unwrap().name, "番茄炒蛋");
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"recipes": [{{"id": 5, "name": "清汤", "ingredients": [],
                "nutrition": {{"calories": 20, "protein": 1.0, "fat": 0.5, "carbs": 2.0, "fiber": 0.0}}}}]}}"#
        )
        .unwrap();
        let catalog = RecipeCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn document_text_mentions_ingredients_and_tags() {
        let catalog = catalog();
        let recipe = catalog.get_by_id(2).unwrap();
        let text = RecipeCatalog::document_text(&recipe);
        assert!(text.contains("麻婆豆腐"));
        assert!(text.contains("豆腐"));
        assert!(text.contains("辣"));
    }
}
