use crate::models::question::{DifficultyTier, Origin, Question};
use serde::Deserialize;
use serde_json::Value as JsonValue;

pub const OPTION_COUNT: usize = 4;
pub const DEFAULT_EXPLANATION: &str = "No explanation provided.";
pub const DEFAULT_TOPIC: &str = "General";

/// The payload shapes providers emit. Some models return a bare array, some
/// wrap the array in an object under an arbitrary key, and some return a
/// single question object. Resolved exactly once, here.
#[derive(Debug)]
pub enum ProviderPayload {
    List(Vec<JsonValue>),
    Wrapped(Vec<JsonValue>),
    Single(JsonValue),
}

impl ProviderPayload {
    pub fn classify(value: JsonValue) -> Self {
        match value {
            JsonValue::Array(items) => ProviderPayload::List(items),
            JsonValue::Object(map) => {
                // A wrapper holds the records under some key; a single
                // record also carries an array (its options), so only an
                // array of objects counts as the wrapped list.
                for (_, field) in map.iter() {
                    if let JsonValue::Array(items) = field {
                        if !items.is_empty() && items.iter().all(|item| item.is_object()) {
                            return ProviderPayload::Wrapped(items.clone());
                        }
                    }
                }
                ProviderPayload::Single(JsonValue::Object(map))
            }
            _ => ProviderPayload::List(vec![]),
        }
    }

    pub fn into_records(self) -> Vec<JsonValue> {
        match self {
            ProviderPayload::List(items) | ProviderPayload::Wrapped(items) => items,
            ProviderPayload::Single(item) => vec![item],
        }
    }
}

/// One provider record before canonicalization. Field aliases cover the
/// naming both providers have been observed to use.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(alias = "text", alias = "question_text")]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(
        default,
        alias = "correctAnswer",
        alias = "correct_option_index",
        alias = "answer_index"
    )]
    correct_answer: Option<i64>,
    explanation: Option<String>,
    #[serde(alias = "category")]
    topic: Option<String>,
}

/// Map one raw record onto the canonical question shape.
///
/// Records missing a usable correct-option index (or not carrying exactly
/// four options) are discarded rather than guessed; a discard only lowers
/// the delivered count, it never fails the request.
pub fn normalize(
    value: &JsonValue,
    difficulty: DifficultyTier,
    provider_id: &str,
) -> Option<Question> {
    let raw: RawQuestion = match serde_json::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::debug!(provider = provider_id, error = %err, "Discarding unparseable record");
            return None;
        }
    };

    if raw.options.len() != OPTION_COUNT {
        tracing::debug!(
            provider = provider_id,
            options = raw.options.len(),
            "Discarding record without exactly four options"
        );
        return None;
    }

    let correct = match raw.correct_answer {
        Some(idx) if (0..OPTION_COUNT as i64).contains(&idx) => idx as u8,
        _ => {
            tracing::debug!(
                provider = provider_id,
                "Discarding record without a valid correct-option index"
            );
            return None;
        }
    };

    Some(Question {
        text: raw.question,
        options: raw.options,
        correct_option_index: correct,
        explanation: raw
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
        topic: raw
            .topic
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
        difficulty,
        origin: Origin::Ai,
        provider_id: Some(provider_id.to_string()),
    })
}

/// Resolve a provider payload into canonical questions, dropping whatever
/// does not survive normalization.
pub fn normalize_payload(
    value: JsonValue,
    difficulty: DifficultyTier,
    provider_id: &str,
) -> Vec<Question> {
    ProviderPayload::classify(value)
        .into_records()
        .iter()
        .filter_map(|record| normalize(record, difficulty, provider_id))
        .collect()
}
