//! Result formatting - final pipeline stage.
//!
//! Compresses the executor's value into a short natural-language answer via
//! one bounded model call.

use std::time::Duration;

use askube_shared::AskubeError;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::llm::{CompletionOptions, LanguageModel};
use crate::prompts::{build_formatter_prompt, strip_fences, FORMATTER_SYSTEM_PROMPT};

pub struct ResultFormatter {
    opts: CompletionOptions,
}

impl ResultFormatter {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            opts: CompletionOptions {
                max_tokens: config.max_answer_tokens,
                temperature: config.temperature,
                timeout: Duration::from_secs(config.formatter_timeout_secs),
            },
        }
    }

    /// Produce the short answer for the query from the retrieved value.
    pub async fn format(
        &self,
        llm: &dyn LanguageModel,
        query: &str,
        value: &Value,
    ) -> Result<String, AskubeError> {
        let raw = llm
            .complete(
                FORMATTER_SYSTEM_PROMPT,
                &build_formatter_prompt(query, value),
                &self.opts,
            )
            .await
            .map_err(|e| AskubeError::Formatting(e.to_string()))?;

        let answer = strip_fences(&raw);
        if answer.is_empty() {
            return Err(AskubeError::Formatting(
                "model returned an empty answer".to_string(),
            ));
        }

        Ok(answer)
    }
}
