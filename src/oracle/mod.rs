//! Oracle adapter: the only component permitted to perform network I/O.
//!
//! [`Oracle`] is the seam the traversal engine, automation loop, and session
//! controller call through; [`OracleClient`] is the HTTP implementation. The
//! question path (`request_next`) is infallible by contract: failures are
//! normalized into tagged fallback replies at this boundary.

mod client;
mod types;

pub use client::OracleClient;
pub use types::{
    Confidence, KnowledgeDoc, Message, MessageRole, OracleIntent, OracleReply, OracleRequest,
    ParentContext, PipeRequest, PipeResponse, SynthesisRequest, FALLBACK_QUESTION,
};

use async_trait::async_trait;

use crate::error::AppResult;

/// The external question-generation and synthesis collaborator.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask for the next question or an answer suggestion.
    ///
    /// Never fails: a transport error or malformed payload comes back as a
    /// reply with `fallback = true` and the reason in `error`.
    async fn request_next(&self, request: OracleRequest) -> OracleReply;

    /// Compile the answered history into a requirements document.
    async fn compile_requirements(&self, request: SynthesisRequest) -> AppResult<String>;

    /// Describe a UI mockup from the answered history.
    async fn generate_mockup(&self, request: SynthesisRequest) -> AppResult<String>;
}

/// Pull the JSON payload out of a completion.
///
/// Raw JSON passes through untouched. Otherwise the first fenced code
/// block is unwrapped, with a `json`-tagged fence taking priority over a
/// bare one.
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    for fence in ["```json", "```"] {
        let Some((_, rest)) = completion.split_once(fence) else {
            continue;
        };
        let body = rest.split("```").next().unwrap_or("").trim();
        return if body.is_empty() {
            Err(format!("Found {fence} block but content was empty or malformed"))
        } else {
            Ok(body)
        };
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_raw_object() {
        let result = extract_json_from_completion(r#"{"key": "value"}"#);
        assert_eq!(result.unwrap(), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_with_whitespace() {
        let result = extract_json_from_completion("  \n  {\"key\": \"value\"}  \n  ");
        assert_eq!(result.unwrap(), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_from_json_code_block() {
        let input = "Here is the response:\n```json\n{\"result\": true}\n```\nDone.";
        let result = extract_json_from_completion(input);
        assert_eq!(result.unwrap(), r#"{"result": true}"#);
    }

    #[test]
    fn test_extract_json_from_plain_code_block() {
        let input = "Response:\n```\n{\"data\": 123}\n```";
        let result = extract_json_from_completion(input);
        assert_eq!(result.unwrap(), r#"{"data": 123}"#);
    }

    #[test]
    fn test_extract_json_empty_json_block() {
        let input = "```json\n\n```";
        let result = extract_json_from_completion(input);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("empty or malformed"));
    }

    #[test]
    fn test_extract_json_no_json_found() {
        let input = "This is just plain text without any JSON.";
        let result = extract_json_from_completion(input);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("No JSON found"));
    }
}
