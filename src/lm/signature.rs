//! Task signatures: typed request records for each generation task.
//!
//! A signature is a named contract of input fields, one output field, and a
//! natural-language instruction. [`predict`] renders the prompt, runs it against
//! a [`LanguageModel`], and extracts the output field from the model's JSON
//! reply. Each task the assistant performs — query generation, answering,
//! softening, classification, summarization — is one record type implementing
//! [`Signature`].

use serde_json::Value;

use super::{GenerationError, LanguageModel};

/// Canonical refusal text the answer generator is instructed to emit when the
/// context carries no supporting evidence.
pub const REFUSAL_TEXT: &str = "I'm sorry, I cannot help you with this.";

/// One generation task: an instruction, named inputs, and a single output field.
pub trait Signature {
    /// Natural-language instruction describing the transformation.
    const INSTRUCTION: &'static str;
    /// Name of the JSON field the model must return.
    const OUTPUT_FIELD: &'static str;
    /// Ordered (name, value) input fields.
    fn inputs(&self) -> Vec<(&'static str, String)>;
}

/// Write a search query that will help answer the question, given evidence
/// gathered so far.
pub struct GenerateQuery {
    pub context: Vec<String>,
    pub question: String,
}

impl Signature for GenerateQuery {
    const INSTRUCTION: &'static str =
        "Write a simple search query that will help answer a complex question.";
    const OUTPUT_FIELD: &'static str = "query";

    fn inputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("context", render_context(&self.context)),
            ("question", self.question.clone()),
        ]
    }
}

/// Answer a question with a short factoid answer grounded in the context.
pub struct GenerateAnswer {
    pub context: Vec<String>,
    pub question: String,
}

impl Signature for GenerateAnswer {
    const INSTRUCTION: &'static str = "Answer questions with short factoid answers, often \
        between 1 and 5 words. If no answer can be found based on the context, return: \
        I'm sorry, I cannot help you with this.";
    const OUTPUT_FIELD: &'static str = "answer";

    fn inputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("context", render_context(&self.context)),
            ("question", self.question.clone()),
        ]
    }
}

/// Rewrite a short factoid answer as a complete, friendly sentence.
pub struct MakeAnswerFriendly {
    pub question: String,
    pub original_answer: String,
}

impl Signature for MakeAnswerFriendly {
    const INSTRUCTION: &'static str = "Given an input short answer, write it as a more \
        complete sentence answering the question. Keep it short and sweet.";
    const OUTPUT_FIELD: &'static str = "helpful_answer";

    fn inputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("question", self.question.clone()),
            ("original_answer", self.original_answer.clone()),
        ]
    }
}

/// Decide whether a text is a question, a diary entry, or something else.
pub struct DetermineInputType {
    pub text: String,
}

impl Signature for DetermineInputType {
    const INSTRUCTION: &'static str = "Given a text, determine if it is a question about \
        the project (return question), an entry to the project diary (return entry), or \
        something else (return something). Questions typically end with a question mark, \
        but not necessarily.";
    const OUTPUT_FIELD: &'static str = "input_type";

    fn inputs(&self) -> Vec<(&'static str, String)> {
        vec![("text", self.text.clone())]
    }
}

/// Summarize a diary entry, keeping dates, people, and named entities.
pub struct GenerateEntrySummary {
    pub entry: String,
}

impl Signature for GenerateEntrySummary {
    const INSTRUCTION: &'static str = "Generate a short overview of a diary entry, keeping \
        all the relevant information (dates, people, named entities) but dropping \
        unnecessary fluff. Return only the summary itself.";
    const OUTPUT_FIELD: &'static str = "summary";

    fn inputs(&self) -> Vec<(&'static str, String)> {
        vec![("entry", self.entry.clone())]
    }
}

/// Run a signature against a language model and extract its output field.
pub async fn predict<S: Signature>(
    lm: &dyn LanguageModel,
    task: &S,
) -> Result<String, GenerationError> {
    let prompt = render_prompt(task);
    let raw = lm.complete(&prompt).await?;
    parse_output(&raw, S::OUTPUT_FIELD)
}

/// Render the full prompt: instruction, input fields, and the JSON output contract.
pub fn render_prompt<S: Signature>(task: &S) -> String {
    let mut prompt = String::from(S::INSTRUCTION);
    prompt.push_str("\n\n");
    for (name, value) in task.inputs() {
        prompt.push_str(name);
        prompt.push_str(":\n");
        if value.is_empty() {
            prompt.push_str("N/A");
        } else {
            prompt.push_str(&value);
        }
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Respond with a JSON object containing a single string field \"{}\".",
        S::OUTPUT_FIELD
    ));
    prompt
}

/// Numbered list rendering for passage context. Empty context renders empty
/// (shown as N/A in the prompt).
fn render_context(passages: &[String]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the output field from a model reply.
///
/// Tries a direct JSON parse first, then a brace-delimited substring — models
/// occasionally wrap the object in prose despite JSON response mode.
fn parse_output(raw: &str, field: &str) -> Result<String, GenerationError> {
    let value: Value = serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(extract_json(raw)))
        .map_err(|e| GenerationError::Malformed(format!("not valid JSON ({e}): {raw}")))?;

    match value.get(field) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Ok(other.to_string()),
        None => Err(GenerationError::Malformed(format!(
            "missing output field \"{field}\": {raw}"
        ))),
    }
}

/// Narrow a reply to its outermost brace-delimited span.
fn extract_json(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prompt_includes_fields_and_contract() {
        let task = GenerateQuery {
            context: vec!["Date: 01-01-2024. Met Alice.".into()],
            question: "Who did I meet?".into(),
        };
        let prompt = render_prompt(&task);
        assert!(prompt.starts_with(GenerateQuery::INSTRUCTION));
        assert!(prompt.contains("context:\n[1] Date: 01-01-2024. Met Alice."));
        assert!(prompt.contains("question:\nWho did I meet?"));
        assert!(prompt.contains("\"query\""));
    }

    #[test]
    fn render_prompt_empty_context_is_na() {
        let task = GenerateAnswer {
            context: vec![],
            question: "Anything?".into(),
        };
        let prompt = render_prompt(&task);
        assert!(prompt.contains("context:\nN/A"));
    }

    #[test]
    fn parse_output_direct_json() {
        let out = parse_output(r#"{"query": "roadmap meeting"}"#, "query").unwrap();
        assert_eq!(out, "roadmap meeting");
    }

    #[test]
    fn parse_output_json_wrapped_in_prose() {
        let raw = "Sure, here you go: {\"answer\": \"Alice\"} Hope that helps!";
        assert_eq!(parse_output(raw, "answer").unwrap(), "Alice");
    }

    #[test]
    fn parse_output_missing_field_is_malformed() {
        let err = parse_output(r#"{"other": "x"}"#, "answer").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn parse_output_not_json_is_malformed() {
        let err = parse_output("just some text", "answer").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn context_rendering_is_numbered() {
        let rendered = render_context(&["a".into(), "b".into()]);
        assert_eq!(rendered, "[1] a\n[2] b");
    }
}
