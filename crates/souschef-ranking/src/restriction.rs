use std::collections::HashMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use souschef_schema::Recipe;

/// Restriction label -> disallowed ingredient categories. Injected into
/// the filter so the table can change without touching ranking logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestrictionTable(HashMap<String, Vec<String>>);

impl RestrictionTable {
    pub fn new(entries: HashMap<String, Vec<String>>) -> Self {
        Self(entries)
    }

    pub fn disallowed_for(&self, label: &str) -> Option<&[String]> {
        self.0.get(label).map(|v| v.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

impl Default for RestrictionTable {
    fn default() -> Self {
        let entry = |label: &str, categories: &[&str]| {
            (
                label.to_string(),
                categories.iter().map(|c| c.to_string()).collect(),
            )
        };
        Self(HashMap::from([
            entry("vegetarian", &["meat", "seafood"]),
            entry("strict-vegan", &["meat", "seafood", "dairy-or-egg"]),
            entry("no-seafood", &["seafood"]),
            entry("no-spicy", &["spicy"]),
            entry("low-carb", &["staple"]),
            entry("weight-loss", &["high-calorie"]),
        ]))
    }
}

/// Pure predicate over a recipe and a set of accumulated restrictions.
#[derive(Debug, Clone, Default)]
pub struct RestrictionFilter {
    table: RestrictionTable,
}

impl RestrictionFilter {
    pub fn new(table: RestrictionTable) -> Self {
        Self { table }
    }

    /// A recipe violates a restriction when any ingredient carries a
    /// disallowed category, or any tag equals a disallowed category
    /// token. Labels missing from the table have no effect (fail-open),
    /// so an unknown label never blocks every recommendation.
    pub fn is_violating(&self, recipe: &Recipe, restrictions: &HashSet<String>) -> bool {
        for label in restrictions {
            let Some(categories) = self.table.disallowed_for(label) else {
                continue;
            };
            for category in categories {
                if recipe.ingredients.iter().any(|i| &i.category == category) {
                    return true;
                }
                if recipe.tags.iter().any(|t| t == category) {
                    return true;
                }
            }
        }
        false
    }
}
