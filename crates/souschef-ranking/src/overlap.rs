use std::collections::HashSet;

use souschef_schema::Recipe;

/// Exact-set match between query ingredients and a recipe's ingredient
/// names. `matched` and `missing` keep the recipe's listing order.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientMatch {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub score: f32,
}

/// Overlap score = |Q ∩ R| / |R|. The denominator is the recipe's
/// ingredient count, not the query's: recipes needing fewer ingredients
/// score higher for the same matches, which deliberately favors dishes
/// the user can actually complete. An empty query scores 0 for every
/// recipe, as does a recipe with no ingredients.
pub fn ingredient_overlap(query: &HashSet<String>, recipe: &Recipe) -> IngredientMatch {
    let names = recipe.ingredient_names();
    if names.is_empty() {
        return IngredientMatch {
            matched: Vec::new(),
            missing: Vec::new(),
            score: 0.0,
        };
    }

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for name in &names {
        if query.contains(*name) {
            matched.push((*name).to_string());
        } else {
            missing.push((*name).to_string());
        }
    }

    let score = matched.len() as f32 / names.len() as f32;
    IngredientMatch {
        matched,
        missing,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souschef_schema::{Ingredient, Nutrition};

    fn recipe(ingredients: &[&str]) -> Recipe {
        Recipe {
            id: 1,
            name: "番茄炒蛋".to_string(),
            name_en: String::new(),
            category: String::new(),
            difficulty: String::new(),
            time: String::new(),
            servings: 2,
            ingredients: ingredients
                .iter()
                .map(|n| Ingredient {
                    name: n.to_string(),
                    amount: "适量".to_string(),
                    category: "蔬菜".to_string(),
                })
                .collect(),
            substitutions: Default::default(),
            nutrition: Nutrition {
                calories: 100,
                protein: 5.0,
                fat: 5.0,
                carbs: 10.0,
                fiber: 1.0,
            },
            tags: vec![],
            steps: vec![],
            tips: vec![],
        }
    }

    fn query(items: &[&str]) -> HashSet<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn full_match_scores_one() {
        let result = ingredient_overlap(&query(&["番茄", "鸡蛋"]), &recipe(&["番茄", "鸡蛋"]));
        assert_eq!(result.score, 1.0);
        assert_eq!(result.matched, vec!["番茄", "鸡蛋"]);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn partial_match_uses_recipe_denominator() {
        let result = ingredient_overlap(&query(&["番茄"]), &recipe(&["番茄", "鸡蛋", "葱"]));
        assert!((result.score - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(result.matched, vec!["番茄"]);
        assert_eq!(result.missing, vec!["鸡蛋", "葱"]);
    }

    #[test]
    fn simpler_recipe_scores_higher_for_same_matches() {
        let q = query(&["豆腐"]);
        let small = ingredient_overlap(&q, &recipe(&["豆腐", "葱"]));
        let large = ingredient_overlap(&q, &recipe(&["豆腐", "猪肉", "豆瓣酱", "葱"]));
        assert!(small.score > large.score);
    }

    #[test]
    fn extra_query_ingredients_do_not_lower_score() {
        let result = ingredient_overlap(
            &query(&["番茄", "鸡蛋", "土豆", "青椒"]),
            &recipe(&["番茄", "鸡蛋"]),
        );
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn empty_query_scores_zero() {
        let result = ingredient_overlap(&HashSet::new(), &recipe(&["番茄", "鸡蛋"]));
        assert_eq!(result.score, 0.0);
        assert!(result.matched.is_empty());
        assert_eq!(result.missing, vec!["番茄", "鸡蛋"]);
    }

    #[test]
    fn empty_recipe_scores_zero() {
        let result = ingredient_overlap(&query(&["番茄"]), &recipe(&[]));
        assert_eq!(result.score, 0.0);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn duplicate_recipe_ingredients_counted_once() {
        let result = ingredient_overlap(&query(&["番茄"]), &recipe(&["番茄", "番茄", "鸡蛋"]));
        assert!((result.score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn score_always_in_unit_interval() {
        let recipes = [recipe(&[]), recipe(&["a"]), recipe(&["a", "b", "c"])];
        let queries = [query(&[]), query(&["a"]), query(&["a", "b", "c", "d"])];
        for r in &recipes {
            for q in &queries {
                let score = ingredient_overlap(q, r).score;
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }
}
