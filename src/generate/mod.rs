// Generation pipeline
// Ranked matches -> token-budgeted context -> prompt -> serialized model call


pub mod context;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::Result;
use crate::config::LlamaConfig;
use crate::generate::context::{TokenBudget, build_context};
use crate::llm::{LanguageModel, SamplingParams};
use crate::retrieve::Retriever;

pub const DEFAULT_TOP_K: usize = 3;

/// Answers questions over the ingested corpus.
///
/// Holds the single shared generative-model handle; completion calls are
/// serialized through `generation_lock` because the model's running context
/// is not reentrant.
pub struct Generator {
    retriever: Retriever,
    model: Arc<dyn LanguageModel>,
    budget: TokenBudget,
    params: SamplingParams,
    generation_lock: Mutex<()>,
}

impl Generator {
    #[inline]
    pub fn new(retriever: Retriever, model: Arc<dyn LanguageModel>, config: &LlamaConfig) -> Self {
        Self {
            retriever,
            model,
            budget: TokenBudget::from_config(config),
            params: SamplingParams::from_config(config),
            generation_lock: Mutex::new(()),
        }
    }

    /// Generate an answer for `query` from the `top_k` best matching
    /// documents.
    ///
    /// Only retrieved context is subject to token trimming; the query goes
    /// into the prompt verbatim. Model errors surface as
    /// [`crate::RagError::Generation`] with no partial answer.
    #[inline]
    pub async fn ask(&self, query: &str, top_k: usize) -> Result<String> {
        let matches = self.retriever.search(query, top_k).await?;
        debug!("Generating answer from {} matches", matches.len());

        let texts: Vec<String> = matches.into_iter().map(|m| m.content).collect();
        let context = build_context(self.model.as_ref(), &texts, &self.budget).await?;

        let prompt = render_prompt(&context, query);

        let answer = {
            let _guard = self.generation_lock.lock().await;
            self.model.complete(&prompt, &self.params).await?
        };

        info!("Generated {} char answer", answer.len());
        Ok(answer.trim().to_string())
    }
}

fn render_prompt(context: &str, query: &str) -> String {
    format!(
        "You are a helpful assistant. Use the following context to answer the user's question.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\
         Answer:"
    )
}
