//! Report structure generation
//!
//! One model call turns a topic into an ordered list of section titles. A
//! parse miss never kills a report: the fixed default outline takes over.

use reportify_core::CompletionModel;
use reportify_synthesis::{prompts, ParseOutcome};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered section titles plus how they were obtained
#[derive(Debug, Clone)]
pub struct ReportOutline {
    pub sections: Vec<String>,
    pub outcome: ParseOutcome,
}

/// Fixed outline used when structure generation fails
pub fn fallback_structure() -> Vec<String> {
    vec![
        "概述".to_string(),
        "关键进展".to_string(),
        "数据与分析".to_string(),
        "趋势与展望".to_string(),
    ]
}

/// Generates the ordered section structure for a report
pub struct StructureAgent {
    model: Arc<dyn CompletionModel>,
}

impl StructureAgent {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Generate section titles for a topic. Never fails; model or parse
    /// errors collapse to the fixed default outline.
    pub async fn generate(&self, topic: &str) -> ReportOutline {
        let prompt = prompts::structure_prompt(topic);

        let response = match self.model.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Structure generation failed for '{}': {}, using default outline", topic, e);
                return ReportOutline {
                    sections: fallback_structure(),
                    outcome: ParseOutcome::Fallback,
                };
            }
        };

        match parse_structure(&response) {
            Some(sections) if !sections.is_empty() => {
                info!("Generated {} sections for '{}'", sections.len(), topic);
                ReportOutline {
                    sections,
                    outcome: ParseOutcome::Parsed,
                }
            }
            _ => {
                warn!("Could not parse structure response for '{}', using default outline", topic);
                ReportOutline {
                    sections: fallback_structure(),
                    outcome: ParseOutcome::Fallback,
                }
            }
        }
    }
}

/// Extract `{"structure": [{"subtitle": ...}]}` from a possibly chatty
/// response by slicing between the first `{` and the last `}`.
fn parse_structure(response: &str) -> Option<Vec<String>> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }

    let parsed: Value = serde_json::from_str(&response[start..=end]).ok()?;
    let sections = parsed
        .get("structure")?
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("subtitle").and_then(|s| s.as_str()))
        .map(|s| s.to_string())
        .collect();

    Some(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure_clean_json() {
        let response = r#"{"structure": [{"subtitle": "行业概述"}, {"subtitle": "政策环境"}]}"#;
        let sections = parse_structure(response).unwrap();
        assert_eq!(sections, vec!["行业概述".to_string(), "政策环境".to_string()]);
    }

    #[test]
    fn test_parse_structure_with_surrounding_prose() {
        let response = "好的，以下是章节结构：\n{\"structure\": [{\"subtitle\": \"概述\"}]}\n希望有帮助。";
        let sections = parse_structure(response).unwrap();
        assert_eq!(sections, vec!["概述".to_string()]);
    }

    #[test]
    fn test_parse_structure_garbage_returns_none() {
        assert!(parse_structure("not json at all").is_none());
        assert!(parse_structure("{broken json").is_none());
    }

    #[test]
    fn test_fallback_structure_has_four_sections() {
        assert_eq!(fallback_structure().len(), 4);
    }
}
