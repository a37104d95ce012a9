//! Token budgeting for prompt assembly.
//!
//! Token counts are estimated at four characters per token, which is close
//! enough for English prompts to keep requests inside the context window.

use advisor_core::{AppError, AppResult};

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Keep the leading part of `text` that fits in `budget` tokens.
pub fn truncate_to_tokens(text: &str, budget: usize) -> &str {
    let max_chars = budget.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Context window split between fixed prompt parts, variable input and output.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    pub context_window: usize,
    pub reserved_for_output: usize,
}

impl TokenBudget {
    pub fn new(context_window: usize, reserved_for_output: usize) -> Self {
        Self {
            context_window,
            reserved_for_output,
        }
    }

    /// Tokens left for variable input once `fixed` parts and the output
    /// reservation are accounted for.
    ///
    /// # Errors
    /// Returns `AppError::Llm` when nothing is left.
    pub fn remaining(&self, fixed: &[&str]) -> AppResult<usize> {
        let used: usize = fixed.iter().map(|part| estimate_tokens(part)).sum::<usize>()
            + self.reserved_for_output;

        if used >= self.context_window {
            return Err(AppError::Llm(format!(
                "Prompt exceeds context window: {} of {} tokens used before input",
                used, self.context_window
            )));
        }

        Ok(self.context_window - used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_to_tokens("héllo wörld", 1), "héll");
        assert_eq!(truncate_to_tokens("short", 10), "short");
        assert_eq!(truncate_to_tokens("anything", 0), "");
    }

    #[test]
    fn test_remaining_budget() {
        let budget = TokenBudget::new(100, 20);
        assert_eq!(budget.remaining(&["abcd".repeat(10).as_str()]).unwrap(), 70);
    }

    #[test]
    fn test_exhausted_budget_is_error() {
        let budget = TokenBudget::new(30, 20);
        let system = "x".repeat(40);
        let err = budget.remaining(&[&system]).unwrap_err();
        assert!(err.to_string().contains("context window"));
    }
}
