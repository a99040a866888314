//! Command synthesis - first pipeline stage.
//!
//! Turns the user's question into a typed [`OperationDescriptor`] via one
//! bounded, low-temperature model call. The model never emits executable
//! text; anything that does not parse into the vocabulary is a synthesis
//! failure, surfaced to the caller as a value rather than a panic.

use std::time::Duration;

use askube_shared::{AskubeError, OperationDescriptor};
use tracing::debug;

use crate::config::LlmConfig;
use crate::llm::{CompletionOptions, LanguageModel};
use crate::prompts::{build_synthesizer_prompt, strip_fences, SYNTHESIZER_SYSTEM_PROMPT};

pub struct CommandSynthesizer {
    opts: CompletionOptions,
}

impl CommandSynthesizer {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            opts: CompletionOptions {
                max_tokens: config.max_synthesis_tokens,
                temperature: config.temperature,
                timeout: Duration::from_secs(config.synthesizer_timeout_secs),
            },
        }
    }

    /// Synthesize one retrieval operation for the query.
    pub async fn synthesize(
        &self,
        llm: &dyn LanguageModel,
        query: &str,
    ) -> Result<OperationDescriptor, AskubeError> {
        let raw = llm
            .complete(
                SYNTHESIZER_SYSTEM_PROMPT,
                &build_synthesizer_prompt(query),
                &self.opts,
            )
            .await
            .map_err(|e| AskubeError::Synthesis(e.to_string()))?;

        let cleaned = strip_fences(&raw);
        if cleaned.is_empty() {
            return Err(AskubeError::Synthesis(
                "model returned an empty descriptor".to_string(),
            ));
        }

        let json_text = extract_json(&cleaned);
        let descriptor: OperationDescriptor = serde_json::from_str(json_text).map_err(|e| {
            AskubeError::Synthesis(format!(
                "completion did not parse into an operation: {}",
                e
            ))
        })?;

        descriptor.validate().map_err(AskubeError::Synthesis)?;

        debug!("synthesized operation: {}", descriptor.op);
        Ok(descriptor)
    }
}

/// Cut the outermost JSON object out of a completion that wrapped it in
/// prose. Returns the input unchanged when no braces are found.
fn extract_json(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
