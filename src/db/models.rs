/// Row models for the Oxbow database
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

/// Lifecycle of a generation attempt, shared by Mirrors, requests and Day 1 progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GenerationStatus {
    Processing,
    Completed,
    Failed,
}

/// Mirror discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum MirrorType {
    #[serde(rename = "standard")]
    #[sqlx(rename = "standard")]
    Standard,
    #[serde(rename = "day_1")]
    #[sqlx(rename = "day_1")]
    Day1,
}

impl MirrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorType::Standard => "standard",
            MirrorType::Day1 => "day_1",
        }
    }
}

/// Transcription state of a voice journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TranscriptionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Where the user says they are spiritually, chosen in step one of Day 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SpiritualPlace {
    Thriving,
    Growing,
    Steady,
    Searching,
    Struggling,
    Doubting,
    Wandering,
    Returning,
}

impl SpiritualPlace {
    pub const ALL: [SpiritualPlace; 8] = [
        SpiritualPlace::Thriving,
        SpiritualPlace::Growing,
        SpiritualPlace::Steady,
        SpiritualPlace::Searching,
        SpiritualPlace::Struggling,
        SpiritualPlace::Doubting,
        SpiritualPlace::Wandering,
        SpiritualPlace::Returning,
    ];

    /// Phrase used when describing the choice to the model
    pub fn label(&self) -> &'static str {
        match self {
            SpiritualPlace::Thriving => "Thriving and close to God",
            SpiritualPlace::Growing => "Growing in faith",
            SpiritualPlace::Steady => "Steady but wanting more",
            SpiritualPlace::Searching => "Searching for answers",
            SpiritualPlace::Struggling => "Struggling right now",
            SpiritualPlace::Doubting => "Wrestling with doubt",
            SpiritualPlace::Wandering => "Feeling far from God",
            SpiritualPlace::Returning => "Finding my way back",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpiritualPlace::Thriving => "thriving",
            SpiritualPlace::Growing => "growing",
            SpiritualPlace::Steady => "steady",
            SpiritualPlace::Searching => "searching",
            SpiritualPlace::Struggling => "struggling",
            SpiritualPlace::Doubting => "doubting",
            SpiritualPlace::Wandering => "wandering",
            SpiritualPlace::Returning => "returning",
        }
    }
}

/// App user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub group_name: Option<String>,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Journal entry written or transcribed upstream
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub prompt_text: Option<String>,
    pub transcription_status: Option<TranscriptionStatus>,
    /// Set once, after the consuming Mirror is saved
    pub mirror_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted Mirror
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Mirror {
    pub id: String,
    pub user_id: String,
    pub screen_1_themes: Json<Value>,
    pub screen_2_biblical: Json<Value>,
    pub screen_3_observations: Option<Json<Value>>,
    /// Retired screen, always null
    pub screen_4_suggestions: Option<Json<Value>>,
    pub journal_count: i64,
    pub status: GenerationStatus,
    pub mirror_type: MirrorType,
    pub generation_started_at: DateTime<Utc>,
    pub generation_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Screens of a Mirror about to be saved
#[derive(Debug, Clone)]
pub struct NewMirror {
    pub user_id: String,
    pub themes: Value,
    pub biblical: Value,
    pub observations: Option<Value>,
    pub journal_count: i64,
    pub mirror_type: MirrorType,
    pub generation_started_at: DateTime<Utc>,
}

/// Audit row for one generation attempt
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: String,
    pub user_id: String,
    pub status: GenerationStatus,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub mirror_id: Option<String>,
    pub error_message: Option<String>,
}

/// Per-user Day 1 onboarding state
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Day1Progress {
    pub user_id: String,
    pub spiritual_place: Option<SpiritualPlace>,
    pub journal_1_id: Option<String>,
    pub journal_2_id: Option<String>,
    pub mini_mirror_id: Option<String>,
    pub current_step: i64,
    pub generation_status: Option<GenerationStatus>,
    pub updated_at: DateTime<Utc>,
}
