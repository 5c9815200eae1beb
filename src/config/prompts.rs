//! Prompt templates for Transmeet.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub routing: RoutingPrompts,
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt for classifying a question against the knowledge-base catalog.
///
/// Variables: `{{options}}`, `{{meetings_collection}}`, `{{general}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingPrompts {
    pub system: String,
}

impl Default for RoutingPrompts {
    fn default() -> Self {
        Self {
            system: r#"You route questions for a software company's knowledge base. Your task is to pick the single most relevant knowledge base for the user's question.

Available knowledge bases:
{{options}}
- `{{meetings_collection}}`: for questions about what was discussed in meetings, decisions taken, or topics covered. Example: "what was said in the meeting about project X?".
- `{{general}}`: for general questions about programming, technology, or anything not specific to the repositories or meetings listed.

Reply with ONLY the identifier of the most appropriate knowledge base (for example `{{meetings_collection}}` or `{{general}}`). Do not add any other text."#
                .to_string(),
        }
    }
}

/// Prompts for final answer generation.
///
/// Variables in `user`: `{{history}}`, `{{context}}`, `{{question}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a senior software developer and AI assistant. Your task is to answer the user's question directly and objectively.
Use the provided context (conversation history, code, meeting transcripts) ONLY as the basis for your final answer.
IMPORTANT RULES:
1. Get straight to the point.
2. Do NOT write summaries, introductions or preambles.
3. Do NOT repeat the context or the question in your answer.
4. Answer only what was asked."#
                .to_string(),

            user: r#"Use the context to answer the final question.
--- CONTEXT ---
# History
{{history}}

# Knowledge Base Context
{{context}}
--- END OF CONTEXT ---
FINAL QUESTION: {{question}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let routing_path = custom_path.join("routing.toml");
            if routing_path.exists() {
                let content = std::fs::read_to_string(&routing_path)?;
                prompts.routing = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
