//! Look analysis returned by the generation service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// One styling direction the user can apply to the captured photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleSuggestion {
    pub label: String,
    /// Instruction passed to the image transformation.
    pub prompt: String,
    #[serde(default)]
    pub category: String,
    /// Search terms for matching products.
    #[serde(default)]
    pub product_keywords: Vec<String>,
}

/// Analysis of the captured look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LookAnalysis {
    pub gender: Gender,
    pub detected_aesthetic: String,
    #[serde(default)]
    pub analysis_reasoning: String,
    #[serde(default)]
    pub suggestions: Vec<StyleSuggestion>,
}

impl LookAnalysis {
    /// Suggestion by label, case-insensitive.
    pub fn suggestion(&self, label: &str) -> Option<&StyleSuggestion> {
        self.suggestions
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_analysis_deserializes_camel_case() {
        let json = r#"{
            "gender": "female",
            "detectedAesthetic": "Quiet Luxury",
            "analysisReasoning": "Neutral tones, tailored fit",
            "suggestions": [
                {"label": "Cyberpunk", "prompt": "neon street wear", "category": "edgy",
                 "productKeywords": ["vinyl jacket", "led visor"]}
            ]
        }"#;
        let look: LookAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(look.gender, Gender::Female);
        assert_eq!(look.detected_aesthetic, "Quiet Luxury");
        let suggestion = look.suggestion("cyberpunk").unwrap();
        assert_eq!(suggestion.product_keywords.len(), 2);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"gender": "male", "detectedAesthetic": "Streetwear",
                       "suggestions": [{"label": "A", "prompt": "b"}]}"#;
        let look: LookAnalysis = serde_json::from_str(json).unwrap();
        assert!(look.analysis_reasoning.is_empty());
        assert!(look.suggestions[0].product_keywords.is_empty());
    }
}
