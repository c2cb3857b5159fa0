//! Domain types stored in the database.
//!
//! These types represent the persisted state of users, documents, agents,
//! conversations and candidate profiles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use hireflow_core::{
    AgentId, ChunkId, ConversationId, DocumentId, IdentityId, MessageId, RoleId, UserId,
};
use serde::{Deserialize, Serialize};

/// A user record, created on first sign-up or sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID (derived from `identity_id`).
    pub user_id: UserId,
    /// Identity-provider user ID.
    pub identity_id: IdentityId,
    /// Email address.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last successful sign-in.
    pub last_login_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Documents
// =============================================================================

/// Category an uploaded document is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// Curriculum vitae.
    Resume,
    /// Cover letter.
    CoverLetter,
    /// Portfolio or work samples.
    Portfolio,
    /// Professional certification.
    Certification,
    /// Academic transcript.
    Transcript,
    /// Reference letter.
    Reference,
    /// Anything else.
    Other,
}

impl DocumentCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Resume,
        Self::CoverLetter,
        Self::Portfolio,
        Self::Certification,
        Self::Transcript,
        Self::Reference,
        Self::Other,
    ];

    /// The wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::CoverLetter => "cover_letter",
            Self::Portfolio => "portfolio",
            Self::Certification => "certification",
            Self::Transcript => "transcript",
            Self::Reference => "reference",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown document category: {s}"))
    }
}

/// How far the ingestion pipeline got for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Stored, text not yet processed.
    Pending,
    /// Chunks were embedded and indexed.
    Processed,
    /// No extractor exists for the MIME type.
    Skipped,
    /// Extraction, embedding or indexing failed.
    Failed,
}

/// An uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub document_id: DocumentId,
    /// Owner.
    pub user_id: UserId,
    /// Category chosen at upload.
    pub category: DocumentCategory,
    /// Filename as uploaded.
    pub original_name: String,
    /// MIME type as uploaded.
    pub mime_type: String,
    /// Size of the raw bytes.
    pub size_bytes: u64,
    /// Name of the blob storage backend.
    pub storage_provider: String,
    /// Path inside the blob storage backend.
    pub storage_path: String,
    /// URL the raw file is served from.
    pub public_url: String,
    /// Ingestion progress.
    pub processing_status: ProcessingStatus,
    /// Error text when processing failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
    /// Number of chunks indexed.
    #[serde(default)]
    pub chunk_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Metadata carried by every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Original filename of the parent document.
    pub source: String,
    /// Page number, when the extractor knows it.
    #[serde(default)]
    pub page: Option<u32>,
    /// MIME type of the parent document.
    pub mime_type: String,
}

/// A slice of document text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique identifier.
    pub chunk_id: ChunkId,
    /// Parent document.
    pub document_id: DocumentId,
    /// Owner.
    pub user_id: UserId,
    /// Text span.
    pub content: String,
    /// Embedding vector.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Source metadata.
    pub metadata: ChunkMetadata,
    /// Position inside the parent document, starting at 0.
    pub chunk_index: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Agents
// =============================================================================

/// Visibility of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AgentType {
    /// Usable by its owner only.
    Private = 1,
    /// Usable by every authenticated user.
    Public = 2,
}

impl AgentType {
    /// Convert the type to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Accepts chat turns.
    Active,
    /// Read-only.
    Archived,
}

/// Persona configuration of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfiguration {
    /// Instructions prepended to every conversation.
    pub system_prompt: String,
    /// Free-form tone, e.g. "professional" or "friendly".
    pub tone: String,
    /// Whether users may keep several conversations with this agent.
    pub enable_threads: bool,
    /// Bumped on every configuration change.
    pub version: u32,
}

impl Default for AgentConfiguration {
    fn default() -> Self {
        Self {
            system_prompt: "You help candidates present their experience clearly and prepare \
                            for job applications."
                .to_string(),
            tone: "professional".to_string(),
            enable_threads: true,
            version: 1,
        }
    }
}

/// A configured conversational agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier.
    pub agent_id: AgentId,
    /// Owner.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Visibility.
    pub agent_type: AgentType,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Persona configuration.
    pub configuration: AgentConfiguration,
    /// Whether this is the owner's bootstrap agent.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Conversations
// =============================================================================

/// Whether prior turns are replayed and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    /// History is replayed and new turns are stored.
    #[default]
    On,
    /// History is neither replayed nor consulted.
    Off,
    /// History is replayed but new turns are not stored.
    Ephemeral,
}

/// How history is condensed once it exceeds the token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizationStrategy {
    /// Oldest turns are dropped automatically.
    #[default]
    Auto,
    /// The user condenses history explicitly.
    Manual,
}

/// Per-conversation memory policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPolicy {
    /// Memory mode.
    pub memory: MemoryMode,
    /// History budget, in approximate tokens.
    pub max_tokens: u32,
    /// Summarization strategy.
    pub summarization: SummarizationStrategy,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            memory: MemoryMode::On,
            max_tokens: 4000,
            summarization: SummarizationStrategy::Auto,
        }
    }
}

/// A conversation between a user and an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier.
    pub conversation_id: ConversationId,
    /// Agent being talked to.
    pub agent_id: AgentId,
    /// Owner.
    pub user_id: UserId,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
    /// Memory policy.
    pub context_policy: ContextPolicy,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The human.
    User,
    /// The agent.
    Assistant,
}

/// Delivery status of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Fully delivered.
    #[default]
    Completed,
    /// Generation was interrupted by the user.
    Interrupted,
}

/// A single chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier.
    pub message_id: MessageId,
    /// Parent conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
    /// Delivery status.
    pub status: MessageStatus,
    /// Creation timestamp; defines message order.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Profiles
// =============================================================================

/// Contact details at the top of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBasics {
    /// Full name.
    pub name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// City, region or country.
    pub location: Option<String>,
    /// `LinkedIn` profile URL.
    pub linkedin: Option<String>,
    /// `GitHub` profile URL.
    pub github: Option<String>,
    /// Personal website.
    pub website: Option<String>,
}

/// A work-history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier inside the profile.
    pub role_id: RoleId,
    /// Job title.
    pub title: String,
    /// Employer.
    pub company: String,
    /// Work location.
    #[serde(default)]
    pub location: Option<String>,
    /// Start date, e.g. `2021-03`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date; absent while `current`.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Whether this is the current position.
    #[serde(default)]
    pub current: bool,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Bullet-point achievements.
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub language: String,
    #[serde(default)]
    pub fluency: Option<String>,
}

/// A candidate profile. One per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Owner.
    pub user_id: UserId,
    /// Contact details.
    pub basics: ProfileBasics,
    /// Professional summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Work history.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Skills.
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Education history.
    #[serde(default)]
    pub education: Vec<Education>,
    /// Projects.
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Certifications.
    #[serde(default)]
    pub certifications: Vec<Certification>,
    /// Spoken languages.
    #[serde(default)]
    pub languages: Vec<Language>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// An empty profile for `user_id`.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            basics: ProfileBasics::default(),
            summary: None,
            roles: Vec::new(),
            skills: Vec::new(),
            education: Vec::new(),
            projects: Vec::new(),
            certifications: Vec::new(),
            languages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_wire_names() {
        for category in DocumentCategory::ALL {
            assert_eq!(category.as_str().parse::<DocumentCategory>(), Ok(category));
        }
        assert!("invoice".parse::<DocumentCategory>().is_err());
    }

    #[test]
    fn category_serde_matches_as_str() {
        let json = serde_json::to_string(&DocumentCategory::CoverLetter).unwrap();
        assert_eq!(json, "\"cover_letter\"");
    }

    #[test]
    fn default_context_policy() {
        let policy = ContextPolicy::default();
        assert_eq!(policy.memory, MemoryMode::On);
        assert_eq!(policy.summarization, SummarizationStrategy::Auto);
        assert_eq!(policy.max_tokens, 4000);
    }

    #[test]
    fn empty_profile_has_no_sections() {
        let profile = Profile::empty(UserId::from_bytes([1u8; 32]));
        assert!(profile.roles.is_empty());
        assert!(profile.summary.is_none());
        assert_eq!(profile.basics, ProfileBasics::default());
    }
}
