use serde::{Deserialize, Serialize};

use crate::engine::TraversalMode;
use crate::tree::AnsweredEntry;

/// Generic question surfaced when the oracle fails or returns nothing usable.
pub const FALLBACK_QUESTION: &str =
    "Is there anything else about this design you would like to describe?";

/// Message in an oracle conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to run the oracle pipe
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    /// Pipe name (required by the API)
    pub name: String,
    pub messages: Vec<Message>,
    /// Disable streaming for synchronous responses
    #[serde(default)]
    pub stream: bool,
}

impl PipeRequest {
    /// Create a new pipe request with name and messages
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
        }
    }
}

/// Response from the oracle pipe
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    pub completion: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

/// Which oracle behavior a request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleIntent {
    /// Produce the next interview question(s).
    NextQuestion,
    /// Suggest an answer to the current question.
    SuggestAnswer,
}

/// An opaque knowledge-base excerpt, produced by out-of-scope ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub extracted_fields: serde_json::Value,
}

/// Context about the node whose children/siblings are being requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentContext {
    pub parent_question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_answer: Option<String>,
    pub parent_topics: Vec<String>,
    pub sibling_questions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncovered_aspects: Option<Vec<String>>,
}

/// The full context packaged for one oracle call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub design_prompt: String,
    pub answered_history: Vec<AnsweredEntry>,
    pub traversal_mode: TraversalMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub knowledge_base: Vec<KnowledgeDoc>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_context: Option<ParentContext>,
    pub mode: OracleIntent,
}

impl OracleRequest {
    /// Build a next-question request.
    pub fn next_question(
        design_prompt: impl Into<String>,
        history: Vec<AnsweredEntry>,
        traversal_mode: TraversalMode,
        depth: usize,
    ) -> Self {
        Self {
            design_prompt: design_prompt.into(),
            answered_history: history,
            traversal_mode,
            knowledge_base: Vec::new(),
            depth,
            parent_context: None,
            mode: OracleIntent::NextQuestion,
        }
    }

    /// Build a suggest-answer request for the current question.
    pub fn suggest_answer(
        design_prompt: impl Into<String>,
        history: Vec<AnsweredEntry>,
        traversal_mode: TraversalMode,
        depth: usize,
        current_question: impl Into<String>,
    ) -> Self {
        Self {
            design_prompt: design_prompt.into(),
            answered_history: history,
            traversal_mode,
            knowledge_base: Vec::new(),
            depth,
            parent_context: Some(ParentContext {
                parent_question: current_question.into(),
                ..Default::default()
            }),
            mode: OracleIntent::SuggestAnswer,
        }
    }

    /// Attach parent context (builder style).
    pub fn with_parent_context(mut self, parent: ParentContext) -> Self {
        self.parent_context = Some(parent);
        self
    }

    /// Attach knowledge-base excerpts.
    pub fn with_knowledge(mut self, docs: Vec<KnowledgeDoc>) -> Self {
        self.knowledge_base = docs;
        self
    }
}

/// Context packaged for requirements/mockup synthesis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub design_prompt: String,
    pub answered_history: Vec<AnsweredEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub knowledge_base: Vec<KnowledgeDoc>,
}

/// Confidence tier attached to a suggested answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// A normalized oracle reply.
///
/// The adapter never lets a raw failure cross into the traversal engine:
/// transport errors and malformed payloads are converted into a reply with
/// `fallback = true` so callers can tell a genuine oracle answer from a
/// synthesized default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleReply {
    /// Candidate questions; the engine uses at most one.
    pub questions: Vec<String>,
    /// Whether the oracle advises stopping this branch.
    pub should_stop: bool,
    /// Human-readable reason for stopping.
    pub stop_reason: String,
    /// Suggested answer, in suggest-answer mode.
    pub suggested_answer: Option<String>,
    /// Indices into the knowledge-base list backing the suggestion.
    pub source_references: Vec<usize>,
    /// Confidence tier of the suggestion.
    pub confidence: Confidence,
    /// Topic labels the reply covers.
    pub topics_covered: Vec<String>,
    /// The broader topic the questions belong to.
    pub parent_topic: String,
    /// Narrower follow-up topics.
    pub subtopics: Vec<String>,
    /// True when this reply was synthesized at the boundary, not produced by
    /// the oracle.
    pub fallback: bool,
    /// Error reason attached to a fallback reply.
    pub error: Option<String>,
}

impl OracleReply {
    /// Synthesize the safe default used when the oracle fails.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            questions: vec![FALLBACK_QUESTION.to_string()],
            should_stop: true,
            stop_reason: "oracle fallback".to_string(),
            suggested_answer: None,
            source_references: Vec::new(),
            confidence: Confidence::Low,
            topics_covered: Vec::new(),
            parent_topic: String::new(),
            subtopics: Vec::new(),
            fallback: true,
            error: Some(reason.into()),
        }
    }

    /// First candidate question, if any.
    pub fn first_question(&self) -> Option<&str> {
        self.questions.first().map(|s| s.as_str())
    }
}

/// Wire shape of the oracle's JSON completion. Every field is defaulted so a
/// partially-formed reply still parses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyWire {
    #[serde(default)]
    questions: Vec<String>,
    #[serde(default)]
    should_stop_branch: bool,
    #[serde(default)]
    stop_reason: String,
    #[serde(default)]
    suggested_answer: Option<String>,
    #[serde(default)]
    source_references: Vec<usize>,
    #[serde(default)]
    confidence: Confidence,
    #[serde(default)]
    topics_covered: Vec<String>,
    #[serde(default)]
    parent_topic: String,
    #[serde(default)]
    subtopics: Vec<String>,
}

impl OracleReply {
    /// Parse a completion string into a genuine (non-fallback) reply.
    pub fn from_completion(completion: &str) -> Result<Self, String> {
        let json = super::extract_json_from_completion(completion)?;
        let wire: ReplyWire =
            serde_json::from_str(json).map_err(|e| format!("JSON parse error: {}", e))?;

        Ok(Self {
            questions: wire
                .questions
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect(),
            should_stop: wire.should_stop_branch,
            stop_reason: wire.stop_reason,
            suggested_answer: wire
                .suggested_answer
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            source_references: wire.source_references,
            confidence: wire.confidence,
            topics_covered: wire.topics_covered,
            parent_topic: wire.parent_topic,
            subtopics: wire.subtopics,
            fallback: false,
            error: None,
        })
    }
}
