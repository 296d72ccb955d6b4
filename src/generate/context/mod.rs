#[cfg(test)]
mod tests;

use crate::config::LlamaConfig;
use crate::llm::LanguageModel;
use crate::{RagError, Result};
use tracing::debug;

/// Token budget for prompt assembly.
///
/// Of the model's whole context window, `reserved_output` tokens are held
/// back for the generated answer and `safety_margin` tokens absorb the
/// prompt template and the query; whatever is left may be spent on
/// retrieved context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub context_window: u32,
    pub reserved_output: u32,
    pub safety_margin: u32,
}

impl TokenBudget {
    #[inline]
    pub fn from_config(config: &LlamaConfig) -> Self {
        Self {
            context_window: config.context_window,
            reserved_output: config.reserved_output_tokens,
            safety_margin: config.safety_margin_tokens,
        }
    }

    /// Tokens available for retrieved context. A non-positive budget means
    /// the deployment is misconfigured, not that this request is too big.
    #[inline]
    pub fn max_prompt_tokens(&self) -> Result<usize> {
        let available = self
            .context_window
            .checked_sub(self.reserved_output)
            .and_then(|rest| rest.checked_sub(self.safety_margin))
            .filter(|rest| *rest > 0)
            .ok_or_else(|| {
                RagError::ContextOverflow(format!(
                    "Context window of {} tokens leaves no prompt budget after reserving {} output tokens and a {} token safety margin",
                    self.context_window, self.reserved_output, self.safety_margin
                ))
            })?;
        Ok(available as usize)
    }
}

/// Assemble retrieved texts into a context string guaranteed to fit the
/// prompt budget.
///
/// Texts arrive ranked best first and are joined with newlines in that
/// order, so when the joined string runs over budget, truncating trailing
/// tokens drops the least relevant material. Tokenization uses the
/// generation model's own tokenizer; the result re-tokenizes to at most
/// `max_prompt_tokens` tokens, deterministically.
#[inline]
pub async fn build_context(
    model: &dyn LanguageModel,
    texts: &[String],
    budget: &TokenBudget,
) -> Result<String> {
    let max_prompt_tokens = budget.max_prompt_tokens()?;

    if texts.is_empty() {
        return Ok(String::new());
    }

    let candidate = texts.join("\n");
    let tokens = model.tokenize(&candidate).await?;

    if tokens.len() <= max_prompt_tokens {
        debug!(
            "Context fits budget: {} of {} tokens",
            tokens.len(),
            max_prompt_tokens
        );
        return Ok(candidate);
    }

    debug!(
        "Trimming context from {} to {} tokens",
        tokens.len(),
        max_prompt_tokens
    );

    let truncated = tokens
        .get(..max_prompt_tokens)
        .unwrap_or(&tokens)
        .to_vec();
    model.detokenize(&truncated).await
}
