//! Prompt loader for YAML prompt definitions.
//!
//! A file at `.advisor/prompts/<id>.yml` takes precedence over the
//! built-in definition with the same id.

use crate::builtin::{builtin_ids, builtin_source};
use crate::types::PromptDefinition;
use advisor_core::{AppError, AppResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".advisor/prompts")
}

/// Load a prompt definition by ID.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.advisor/`
/// * `prompt_id` - Prompt identifier (e.g., "recommend.json")
///
/// # Example
/// ```no_run
/// use advisor_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "advisor.intake")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let (contents, origin) = if prompt_file.exists() {
        tracing::debug!("Loading prompt from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        (contents, prompt_file.display().to_string())
    } else if let Some(source) = builtin_source(prompt_id) {
        (source.to_string(), format!("built-in {}", prompt_id))
    } else {
        return Err(AppError::Prompt(format!("Prompt not found: {}", prompt_id)));
    };

    let definition = parse_prompt(&contents, &origin)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt {} declares id '{}', expected '{}'",
            origin, definition.id, prompt_id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all available prompt IDs, built-in and workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: BTreeSet<String> = builtin_ids().map(str::to_string).collect();

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.insert(stem.to_string());
                }
            }
        }
    }

    Ok(prompt_ids.into_iter().collect())
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    let mut parts = def.api_version.split('.');
    let well_formed = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(major), Some(minor), None)
            if !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
    );
    if !well_formed {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, body: &str) {
        let prompts_dir = dir.join(".advisor/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), body).unwrap();
    }

    fn valid_prompt(id: &str, template: &str) -> String {
        format!(
            r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
behavior:
  tone: professional
  style: concise
template: "{}"
output:
  format: text
"#,
            id, template
        )
    }

    #[test]
    fn test_every_builtin_parses() {
        let temp_dir = TempDir::new().unwrap();
        for id in builtin_ids() {
            let prompt = load_prompt(temp_dir.path(), id).unwrap();
            assert_eq!(prompt.id, id);
        }
    }

    #[test]
    fn test_builtin_weights_prompt_limits_output() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), "retrieval.weights").unwrap();
        assert_eq!(prompt.output.max_tokens, Some(50));
        assert_eq!(prompt.output.format, "json");
    }

    #[test]
    fn test_workspace_file_overrides_builtin() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "advisor.refine",
            &valid_prompt("advisor.refine", "Summarise: {{history}}"),
        );

        let prompt = load_prompt(temp_dir.path(), "advisor.refine").unwrap();
        assert_eq!(prompt.title, "Test Prompt");
        assert_eq!(prompt.template, "Summarise: {{history}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");

        let result = load_prompt(temp_dir.path(), "invalid");
        assert!(result.is_err());
    }

    #[test]
    fn test_mismatched_id_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "custom", &valid_prompt("other", "x"));
        assert!(load_prompt(temp_dir.path(), "custom").is_err());
    }

    #[test]
    fn test_bad_api_version_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let body = valid_prompt("versioned", "x").replace("\"1.0\"", "\"v1\"");
        write_prompt(temp_dir.path(), "versioned", &body);
        let err = load_prompt(temp_dir.path(), "versioned").unwrap_err();
        assert!(err.to_string().contains("apiVersion"));
    }

    #[test]
    fn test_list_prompts_is_sorted_union() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "aaa.custom", &valid_prompt("aaa.custom", "x"));
        write_prompt(
            temp_dir.path(),
            "advisor.intake",
            &valid_prompt("advisor.intake", "x"),
        );

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts.len(), BUILTIN_COUNT + 1);
        assert_eq!(prompts[0], "aaa.custom");
        let mut sorted = prompts.clone();
        sorted.sort();
        assert_eq!(prompts, sorted);
    }

    const BUILTIN_COUNT: usize = crate::builtin::BUILTIN_PROMPTS.len();
}
