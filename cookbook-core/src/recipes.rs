use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The searchable part of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeSummary {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RecipeSummary {
    pub fn new(title: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Case-insensitive match against title and tags, `needle` must be lowercase
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Parse a YAML list of recipes, as used by the catalog seed file.
pub fn parse_recipe_list(yaml: &str) -> Result<Vec<RecipeSummary>, serde_norway::Error> {
    serde_norway::from_str(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_title_and_tags() {
        let recipe = RecipeSummary::new("Lemon Tart", &["Dessert", "baking"]);
        assert!(recipe.matches("lemon"));
        assert!(recipe.matches("dessert"));
        assert!(recipe.matches("bak"));
        assert!(!recipe.matches("soup"));
    }

    #[test]
    fn test_parse_recipe_list() {
        let yaml = r#"
- title: Tomato Soup
  tags: [soup, vegetarian]
- id: 6f1c1a5e-8f5e-4a52-9a35-3d1f1a1b2c3d
  title: Pancakes
"#;
        let recipes = parse_recipe_list(yaml).unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].tags, vec!["soup", "vegetarian"]);
        assert!(recipes[1].tags.is_empty());
        assert_eq!(
            recipes[1].id.to_string(),
            "6f1c1a5e-8f5e-4a52-9a35-3d1f1a1b2c3d"
        );
    }
}
