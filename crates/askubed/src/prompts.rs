//! System prompts for the synthesize and format stages.
//!
//! Both prompts pin the model to a narrow contract: the synthesizer may only
//! fill the closed operation vocabulary and must write into a single output
//! slot; the formatter may only compress the retrieved value into a short
//! answer. Neither prompt permits fence markup, and residual fences are
//! stripped anyway because small models add them regardless.

pub const SYNTHESIZER_SYSTEM_PROMPT: &str = r#"You select read-only Kubernetes retrieval operations.

Respond with a single JSON object and nothing else. No code fences, no prose,
no explanations.

The object has these fields:
- "action": one of "list", "count", "get"
- "kind": one of "pods", "nodes", "namespaces", "services", "deployments"
- "namespace": optional, the namespace to scope the operation to
- "name": required for "get", the resource name
- "output": the output slot to store the result in, always "result"

Rules:
1. The operation is read-only. You cannot create, modify, or delete anything.
2. Use only the cluster access described above. There is nothing else.
3. Store the answer in the single output slot named in "output".
4. Pick the smallest operation that answers the question: "count" for
   how-many questions, "get" for questions about one named resource,
   "list" otherwise."#;

pub const FORMATTER_SYSTEM_PROMPT: &str = r#"You turn raw Kubernetes query results into short answers.

Rules:
1. Answer the question directly using only the result data provided.
2. Strip identifiers, UIDs, and metadata the question did not ask for.
3. One short sentence, or a bare number or list when that is the whole answer.
4. No code fences, no JSON, no restating the question."#;

/// User prompt for the synthesize stage.
pub fn build_synthesizer_prompt(query: &str) -> String {
    format!("Question about the cluster: {}", query)
}

/// User prompt for the format stage.
pub fn build_formatter_prompt(query: &str, value: &serde_json::Value) -> String {
    format!("Question: {}\nResult: {}", query, value)
}

/// Remove code-fence markup a model wrapped around its output.
///
/// Handles a leading ```lang line, a trailing ``` line, and stray single
/// backticks around a one-line reply.
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if text.starts_with("```") {
        // drop the opening fence with its optional language tag
        text = match text.find('\n') {
            Some(idx) => &text[idx + 1..],
            None => text.trim_start_matches('`'),
        };
        if let Some(idx) = text.rfind("```") {
            text = &text[..idx];
        }
    }

    text.trim().trim_matches('`').trim().to_string()
}
