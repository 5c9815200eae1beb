//! Configuration module for Transmeet.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, RoutingPrompts};
pub use settings::{
    CatalogSettings, EmbeddingSettings, GeneralSettings, PromptSettings, ProviderSettings,
    ProvidersSettings, RoutingSettings, Settings, VectorStoreSettings,
};
