use crate::error::ProviderError;
use crate::models::question::{DifficultyTier, Question};
use crate::services::key_pool::ModelPool;
use crate::services::normalizer;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Last-resort generation leg. Fail-soft by contract: it never raises to
/// the caller, only logs and returns an empty list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecondaryProvider: Send + Sync {
    async fn generate(&self, subject: &str, count: u32, difficulty: DifficultyTier)
        -> Vec<Question>;
}

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    models: ModelPool,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: String, models: ModelPool, timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            models,
            timeout,
        }
    }

    fn build_prompt(subject: &str, count: u32, difficulty: DifficultyTier) -> String {
        format!(
            "Generate exactly {count} multiple-choice questions on the subject \"{subject}\".\n\
             Target difficulty: {difficulty}.\n\
             Respond with a strict JSON array only, no prose and no markdown fences.\n\
             Each element: {{\"question\": string, \"options\": [4 full-text strings], \
             \"correct_answer\": zero-based index of the correct option, \
             \"explanation\": string, \"topic\": string}}.\n\
             Vary the correct_answer index across questions.",
            count = count,
            subject = subject,
            difficulty = difficulty.elaboration(),
        )
    }

    async fn call_model(
        &self,
        model: &str,
        subject: &str,
        count: u32,
        difficulty: DifficultyTier,
    ) -> std::result::Result<Vec<Question>, ProviderError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, model, self.api_key
        );
        let payload = serde_json::json!({
            "contents": [{
                "parts": [{ "text": Self::build_prompt(subject, count, difficulty) }]
            }],
            "generationConfig": {
                "temperature": 0.9,
                "responseMimeType": "application/json"
            }
        });

        let res = self
            .client
            .post(&url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Unavailable(format!("Gemini {} timed out", model))
                } else {
                    ProviderError::Unavailable(format!("Gemini {} request failed: {}", model, e))
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Gemini {} returned {}: {}",
                model, status, body
            )));
        }

        let body: JsonValue = res.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Gemini {} body was not JSON: {}", model, e))
        })?;

        let text = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                ProviderError::MalformedResponse(format!(
                    "Gemini {} response missing candidate text",
                    model
                ))
            })?;

        let parsed: JsonValue = serde_json::from_str(text).map_err(|e| {
            ProviderError::MalformedResponse(format!(
                "Gemini {} content did not parse as questions: {}",
                model, e
            ))
        })?;

        Ok(normalizer::normalize_payload(parsed, difficulty, model))
    }
}

/// Draw one model, retry exactly once against the reliable model when the
/// draw fails, give up with an empty list after a second failure. Fail-soft:
/// no error ever escapes this function.
async fn draw_and_retry<F, Fut>(models: &ModelPool, subject: &str, mut call: F) -> Vec<Question>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = std::result::Result<Vec<Question>, ProviderError>>,
{
    let drawn = models.draw().to_string();

    match call(drawn.clone()).await {
        Ok(questions) => questions,
        Err(first_err) => {
            let Some(retry) = models.retry_model(&drawn) else {
                tracing::error!(
                    subject,
                    model = %drawn,
                    error = %first_err,
                    "Reliable model failed, returning no questions"
                );
                return vec![];
            };
            let retry = retry.to_string();
            tracing::warn!(
                subject,
                model = %drawn,
                retry_model = %retry,
                error = %first_err,
                "Model draw failed, retrying against reliable model"
            );
            match call(retry.clone()).await {
                Ok(questions) => questions,
                Err(second_err) => {
                    tracing::error!(
                        subject,
                        model = %retry,
                        error = %second_err,
                        "Fallback retry failed, returning no questions"
                    );
                    vec![]
                }
            }
        }
    }
}

#[async_trait]
impl SecondaryProvider for GeminiProvider {
    /// Draws one model at random for output diversity; the single-retry
    /// sequencing lives in `draw_and_retry`.
    async fn generate(
        &self,
        subject: &str,
        count: u32,
        difficulty: DifficultyTier,
    ) -> Vec<Question> {
        draw_and_retry(&self.models, subject, |model| async move {
            self.call_model(&model, subject, count, difficulty).await
        })
        .await
    }
}
