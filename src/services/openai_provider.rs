use crate::error::ProviderError;
use crate::models::question::{DifficultyTier, Question};
use crate::services::key_pool::ApiKeyPool;
use crate::services::normalizer;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

pub const OPENAI_PROVIDER_ID: &str = "openai";

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o";

/// Primary generation leg. Unlike the secondary leg it reports structured
/// errors upward so the orchestrator can decide between credential rotation
/// and provider fallback.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrimaryProvider: Send + Sync {
    fn id(&self) -> &'static str;

    async fn generate(
        &self,
        subject: &str,
        count: u32,
        difficulty: DifficultyTier,
    ) -> std::result::Result<Vec<Question>, ProviderError>;
}

pub struct OpenAiProvider {
    client: Client,
    keys: Arc<ApiKeyPool>,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(client: Client, keys: Arc<ApiKeyPool>, timeout: Duration) -> Self {
        Self {
            client,
            keys,
            timeout,
        }
    }

    fn build_payload(subject: &str, count: u32, difficulty: DifficultyTier) -> JsonValue {
        let system_prompt = r#"You are an experienced exam author.
Generate multiple-choice questions for a timed assessment.
The output must be a valid JSON object containing a 'questions' array.

Rules:
1. Generate exactly the requested number of questions.
2. Every question has exactly 4 options, written out in full text.
3. 'correct_answer' is the zero-based index of the correct option. VARY it; do NOT always use 0.
4. Include a short 'explanation' of why the correct option is right.
5. Include a 'topic' naming the area of the subject the question covers.
6. Avoid "All of the above" or "None of the above" options.
"#;

        let user_schema = serde_json::json!({
            "subject": subject,
            "required_count": count,
            "difficulty": difficulty.elaboration(),
            "schema_example": {
                "questions": [
                    {
                        "question": "Question text here...",
                        "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
                        "correct_answer": 2,
                        "explanation": "Why option at index 2 is correct...",
                        "topic": "Subtopic name"
                    }
                ]
            }
        });

        serde_json::json!({
            "model": OPENAI_MODEL,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_schema.to_string()}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.8
        })
    }
}

/// Quota rejections are recognized by status code first; the marker scan on
/// the body is kept as a secondary signal because some gateways report
/// exhaustion inside a 4xx body.
pub(crate) fn has_quota_marker(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("quota")
        || lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("too many requests")
}

#[async_trait]
impl PrimaryProvider for OpenAiProvider {
    fn id(&self) -> &'static str {
        OPENAI_PROVIDER_ID
    }

    /// Issues exactly one call with the credential at the pool's current
    /// cursor. Rotation on quota exhaustion belongs to the orchestrator.
    async fn generate(
        &self,
        subject: &str,
        count: u32,
        difficulty: DifficultyTier,
    ) -> std::result::Result<Vec<Question>, ProviderError> {
        let api_key = self.keys.current();
        let payload = Self::build_payload(subject, count, difficulty);

        let res = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Unavailable("OpenAI request timed out".to_string())
                } else {
                    ProviderError::Unavailable(format!("OpenAI request failed: {}", e))
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || has_quota_marker(&body) {
                return Err(ProviderError::QuotaExceeded(format!(
                    "OpenAI {}: {}",
                    status, body
                )));
            }
            return Err(ProviderError::Unavailable(format!(
                "OpenAI {}: {}",
                status, body
            )));
        }

        let body: JsonValue = res.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("OpenAI body was not JSON: {}", e))
        })?;

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "OpenAI response missing message content".to_string(),
                )
            })?;

        let parsed: JsonValue = serde_json::from_str(content).map_err(|e| {
            ProviderError::MalformedResponse(format!(
                "OpenAI content did not parse as the question schema: {}",
                e
            ))
        })?;

        Ok(normalizer::normalize_payload(
            parsed,
            difficulty,
            OPENAI_PROVIDER_ID,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_marker_matches_known_phrasings() {
        assert!(has_quota_marker("You exceeded your current quota"));
        assert!(has_quota_marker("Rate limit reached for gpt-4o"));
        assert!(has_quota_marker("{\"error\":{\"code\":\"rate_limit_exceeded\"}}"));
        assert!(has_quota_marker("Too Many Requests"));
        assert!(!has_quota_marker("model overloaded, try again later"));
        assert!(!has_quota_marker("invalid api key"));
    }

    #[test]
    fn payload_encodes_subject_count_and_difficulty() {
        let payload = OpenAiProvider::build_payload("Biology", 4, DifficultyTier::Hard);
        let user_content = payload["messages"][1]["content"].as_str().unwrap();
        assert!(user_content.contains("Biology"));
        assert!(user_content.contains("\"required_count\":4"));
        assert!(user_content.contains(DifficultyTier::Hard.elaboration()));
        assert_eq!(payload["response_format"]["type"], "json_object");
    }
}
