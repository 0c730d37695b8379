use serde::{Deserialize, Serialize};

/// Difficulty steering for provider prompts. Has no structural effect on
/// the generated questions; it only changes the prompt wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    ExtremeHard,
}

impl Default for DifficultyTier {
    fn default() -> Self {
        DifficultyTier::Medium
    }
}

impl DifficultyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
            DifficultyTier::ExtremeHard => "extreme_hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(DifficultyTier::Easy),
            "medium" => Some(DifficultyTier::Medium),
            "hard" => Some(DifficultyTier::Hard),
            "extreme_hard" => Some(DifficultyTier::ExtremeHard),
            _ => None,
        }
    }

    pub fn elaboration(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => {
                "straightforward recall questions a beginner who studied the basics can answer"
            }
            DifficultyTier::Medium => {
                "standard exam-level questions requiring solid understanding of the subject"
            }
            DifficultyTier::Hard => {
                "challenging questions requiring multi-step reasoning and deep subject knowledge"
            }
            DifficultyTier::ExtremeHard => {
                "expert-level questions with subtle distractors that only top students answer correctly"
            }
        }
    }
}

/// Provenance of a question in the assembled payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Bank,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Always exactly four entries.
    pub options: Vec<String>,
    /// Always indexes a valid entry of `options`.
    pub correct_option_index: u8,
    pub explanation: String,
    pub topic: String,
    pub difficulty: DifficultyTier,
    pub origin: Origin,
    /// `None` for bank questions, the originating provider/model id otherwise.
    pub provider_id: Option<String>,
}

/// A question placed into the final payload: numbered within its subject
/// and stamped with the requested total so the caller can see shortfalls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledItem {
    pub subject_name: String,
    /// 1-based position within the subject.
    pub question_number: u32,
    /// The count the caller asked for, which may exceed what was delivered.
    pub subject_total: u32,
    #[serde(flatten)]
    pub question: Question,
}
