//! Grounding template source.

use ragbot_core::{AppError, AppResult};
use std::path::Path;

/// The stock grounding template.
///
/// Context first, then the literal question, then the instruction to stay
/// within the context.
pub const DEFAULT_GROUNDING_TEMPLATE: &str = "\
You are a helpful assistant that answers questions based on the provided context.

Context:
{{context}}

Question: {{question}}

Use only the pieces of context above to answer the question. \
If you don't know the answer based on the context, just say that you don't know, \
don't try to make up an answer.

Answer: ";

/// Load a template override from disk.
///
/// The file must reference both `{{context}}` and `{{question}}`; a template
/// missing either would silently drop the grounding.
pub fn load_template(path: &Path) -> AppResult<String> {
    tracing::debug!("Loading grounding template from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!(
            "Template file not found: {:?}",
            path
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read template file {:?}: {}", path, e))
    })?;

    validate_template(&contents)?;
    Ok(contents)
}

fn validate_template(template: &str) -> AppResult<()> {
    if template.trim().is_empty() {
        return Err(AppError::Prompt("Template cannot be empty".to_string()));
    }

    for variable in ["context", "question"] {
        if !template.contains(&format!("{{{{{}}}}}", variable)) {
            return Err(AppError::Prompt(format!(
                "Template must reference {{{{{}}}}}",
                variable
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_template_is_valid() {
        assert!(validate_template(DEFAULT_GROUNDING_TEMPLATE).is_ok());
    }

    #[test]
    fn test_load_template_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("grounding.hbs");
        std::fs::write(&path, "Notes:\n{{context}}\nQ: {{question}}\nA:").unwrap();

        let template = load_template(&path).unwrap();
        assert!(template.starts_with("Notes:"));
    }

    #[test]
    fn test_template_without_question_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.hbs");
        std::fs::write(&path, "Only {{context}} here").unwrap();

        let err = load_template(&path).unwrap_err();
        assert!(err.to_string().contains("{{question}}"));
    }

    #[test]
    fn test_missing_template_file() {
        let result = load_template(Path::new("/no/such/template.hbs"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
