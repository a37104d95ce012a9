//! Prompt system for the course advisor.
//!
//! - YAML prompt definitions, built in or overridden per workspace
//! - Handlebars rendering of system and user templates

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

pub use builder::{build_prompt, render_template};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};
