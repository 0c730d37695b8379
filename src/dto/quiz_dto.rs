use crate::models::question::{AssembledItem, DifficultyTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubjectRequest {
    #[validate(length(min = 1))]
    pub subject_name: String,
    #[validate(range(min = 1))]
    pub count: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuizPayload {
    #[validate(length(min = 1, message = "At least one subject is required"), nested)]
    pub subjects: Vec<SubjectRequest>,
    #[serde(default)]
    pub difficulty: DifficultyTier,
    /// Already-authorized caller identity, used only for logging.
    pub requested_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubjectSummary {
    pub subject_name: String,
    pub requested: u32,
    pub delivered: u32,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuizResponse {
    pub items: Vec<AssembledItem>,
    pub subjects: Vec<SubjectSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBankQuestion {
    #[validate(length(min = 1))]
    pub subject_name: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(length(min = 4, max = 4))]
    pub options: Vec<String>,
    #[validate(range(max = 3))]
    pub correct_option_index: u8,
    pub explanation: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: DifficultyTier,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IngestBankQuestionsPayload {
    #[validate(length(min = 1, message = "At least one question is required"), nested)]
    pub questions: Vec<CreateBankQuestion>,
}
