use serde::{Deserialize, Serialize};

pub const DETECT_PATH: &str = "/api/detect";
pub const RECIPES_PATH: &str = "/api/recipes";
pub const PANTRY_PATH: &str = "/api/pantry";
pub const HEALTH_PATH: &str = "/health";

/// Multipart field name the detection endpoint expects for every image.
pub const IMAGES_FIELD: &str = "images";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DetectionResponse {
    pub success: bool,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeRequest {
    pub available_ingredients: Vec<String>,
    pub available_utensils: Vec<String>,
    pub preference: String,
    pub budget: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub cooking_time: String,
    pub utensils_used: Vec<String>,
    pub steps: Vec<String>,
    pub carbon_score: f64,
}

/// Body of a successful `/api/recipes` call. Both fields are optional on the
/// wire so a partial reply can be told apart from a transport failure.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct RecipeSuggestions {
    #[serde(rename = "Title", alias = "title", default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipes: Option<Vec<Recipe>>,
}

/// Error payload returned alongside non-2xx statuses. `detail` is usually a
/// string but validation failures send a list, hence the raw value.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ErrorPayload {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorPayload {
    pub fn message(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.as_str())
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PantryData {
    pub ingredients: Vec<String>,
    pub budget: f64,
    pub utensils: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PantryReceipt {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<PantryData>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub gemini_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_accept_capitalised_title() {
        let body = r#"{
            "Title": "Here are 2 ideas",
            "recipes": [{
                "name": "Spicy Lentil Soup",
                "ingredients": ["lentils", "onion"],
                "cooking_time": "25 minutes",
                "utensils_used": ["pot"],
                "steps": ["Chop onion.", "Boil lentils."],
                "carbon_score": 0.1
            }]
        }"#;
        let parsed: RecipeSuggestions = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Here are 2 ideas"));
        let recipes = parsed.recipes.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].utensils_used, vec!["pot".to_string()]);
    }

    #[test]
    fn test_suggestions_missing_fields_parse_as_none() {
        let parsed: RecipeSuggestions = serde_json::from_str(r#"{"recipes": []}"#).unwrap();
        assert!(parsed.title.is_none());
        assert_eq!(parsed.recipes, Some(vec![]));
    }

    #[test]
    fn test_error_payload_message_only_for_string_detail() {
        let text: ErrorPayload = serde_json::from_str(r#"{"detail": "bad budget"}"#).unwrap();
        assert_eq!(text.message(), Some("bad budget"));

        let list: ErrorPayload =
            serde_json::from_str(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#).unwrap();
        assert_eq!(list.message(), None);

        let empty: ErrorPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.message(), None);
    }

    #[test]
    fn test_recipe_request_field_names() {
        let request = RecipeRequest {
            available_ingredients: vec!["egg".into()],
            available_utensils: vec!["pan".into()],
            preference: "quick".into(),
            budget: 5.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["available_ingredients"][0], "egg");
        assert_eq!(value["available_utensils"][0], "pan");
        assert_eq!(value["preference"], "quick");
        assert_eq!(value["budget"], 5.0);
    }
}
