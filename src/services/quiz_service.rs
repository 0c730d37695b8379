use crate::dto::quiz_dto::{GenerateQuizResponse, SubjectRequest, SubjectSummary};
use crate::error::{Error, ProviderError, Result};
use crate::models::question::{AssembledItem, DifficultyTier, Question};
use crate::services::bank_service::{BankSource, BANK_OVERFETCH_FACTOR};
use crate::services::gemini_provider::SecondaryProvider;
use crate::services::key_pool::ApiKeyPool;
use crate::services::openai_provider::PrimaryProvider;
use crate::services::selection::select_random;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// Legs of the generation fallback machine. An explicit state keeps the
/// single-retry guarantee an invariant instead of an accident of
/// argument-passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenerationLeg {
    PrimaryAttempt,
    SecondaryAttempt,
}

/// Assembles the question set for a quiz: bank first, AI generation for any
/// shortfall, shuffled, labeled, and numbered per subject.
#[derive(Clone)]
pub struct QuizService {
    bank: Arc<dyn BankSource>,
    primary: Arc<dyn PrimaryProvider>,
    secondary: Arc<dyn SecondaryProvider>,
    keys: Arc<ApiKeyPool>,
    call_timeout: Duration,
    time_budget: Duration,
    max_ai_questions: usize,
}

impl QuizService {
    pub fn new(
        bank: Arc<dyn BankSource>,
        primary: Arc<dyn PrimaryProvider>,
        secondary: Arc<dyn SecondaryProvider>,
        keys: Arc<ApiKeyPool>,
        call_timeout: Duration,
        time_budget: Duration,
        max_ai_questions: usize,
    ) -> Self {
        Self {
            bank,
            primary,
            secondary,
            keys,
            call_timeout,
            time_budget,
            max_ai_questions,
        }
    }

    /// The engine's single operation. Subjects are processed independently
    /// and appear in the payload in input order; the only hard failure is an
    /// empty subject list. Everything else degrades to fewer items than
    /// requested.
    pub async fn generate_quiz(
        &self,
        subjects: &[SubjectRequest],
        difficulty: DifficultyTier,
        requested_by: Option<&str>,
    ) -> Result<GenerateQuizResponse> {
        if subjects.is_empty() {
            return Err(Error::BadRequest(
                "At least one subject is required".to_string(),
            ));
        }

        let request_id = uuid::Uuid::new_v4();
        tracing::info!(
            request_id = %request_id,
            caller = requested_by.unwrap_or("anonymous"),
            subjects = subjects.len(),
            difficulty = difficulty.as_str(),
            "Assembling quiz"
        );

        let deadline = Instant::now() + self.time_budget;
        let mut items = Vec::new();
        let mut summaries = Vec::new();

        for request in subjects {
            let assembled = if Instant::now() >= deadline {
                tracing::warn!(
                    subject = %request.subject_name,
                    "Time budget exhausted, skipping subject"
                );
                vec![]
            } else {
                self.assemble_subject(request, difficulty, deadline).await
            };

            summaries.push(SubjectSummary {
                subject_name: request.subject_name.clone(),
                requested: request.count,
                delivered: assembled.len() as u32,
            });
            items.extend(assembled);
        }

        Ok(GenerateQuizResponse {
            items,
            subjects: summaries,
            generated_at: chrono::Utc::now(),
        })
    }

    async fn assemble_subject(
        &self,
        request: &SubjectRequest,
        difficulty: DifficultyTier,
        deadline: Instant,
    ) -> Vec<AssembledItem> {
        let subject = request.subject_name.as_str();
        let count = request.count as usize;
        // Widened before multiplying so an extreme count cannot overflow.
        let fetch_limit = i64::from(request.count) * i64::from(BANK_OVERFETCH_FACTOR);

        // A failed or slow bank query is treated as zero rows; the AI leg
        // can still satisfy the subject.
        let bank_rows = match timeout(
            self.call_window(deadline),
            self.bank.fetch(subject, fetch_limit),
        )
        .await
        {
            Ok(Ok(rows)) => rows,
            Ok(Err(err)) => {
                tracing::warn!(subject, error = %err, "Bank query failed, proceeding without bank");
                vec![]
            }
            Err(_) => {
                tracing::warn!(subject, "Bank query timed out, proceeding without bank");
                vec![]
            }
        };

        let selected = select_random(bank_rows, count);
        let shortfall = count - selected.len();

        let ai_questions = if shortfall > 0 {
            let capped = shortfall.min(self.max_ai_questions);
            let generated = self
                .generate_with_fallback(subject, capped as u32, difficulty, deadline)
                .await;
            // Providers occasionally over-deliver; the selector enforces the cap.
            select_random(generated, capped)
        } else {
            vec![]
        };

        tracing::info!(
            subject,
            requested = count,
            from_bank = selected.len(),
            from_ai = ai_questions.len(),
            "Subject assembled"
        );

        assemble(subject, request.count, selected, ai_questions)
    }

    /// Two-state fallback machine, terminal on first success or on
    /// secondary-leg exhaustion. Never returns an error: the worst outcome
    /// is an empty list. This is the only place the shared credential
    /// cursor is rotated.
    async fn generate_with_fallback(
        &self,
        subject: &str,
        count: u32,
        difficulty: DifficultyTier,
        deadline: Instant,
    ) -> Vec<Question> {
        let mut leg = GenerationLeg::PrimaryAttempt;
        let mut rotated = false;

        loop {
            let window = self.call_window(deadline);
            if window.is_zero() {
                tracing::warn!(subject, "Time budget exhausted before generation");
                return vec![];
            }

            match leg {
                GenerationLeg::PrimaryAttempt => {
                    let outcome = match timeout(
                        window,
                        self.primary.generate(subject, count, difficulty),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Unavailable(
                            "primary call exceeded the time budget".to_string(),
                        )),
                    };

                    match outcome {
                        Ok(questions) => return questions,
                        Err(err) if err.is_quota() && self.keys.len() > 1 && !rotated => {
                            tracing::warn!(
                                subject,
                                provider = self.primary.id(),
                                error = %err,
                                "Quota exhausted, rotating credential for one retry"
                            );
                            self.keys.rotate();
                            rotated = true;
                        }
                        Err(err) => {
                            tracing::warn!(
                                subject,
                                provider = self.primary.id(),
                                error = %err,
                                "Primary leg exhausted, falling back to secondary"
                            );
                            leg = GenerationLeg::SecondaryAttempt;
                        }
                    }
                }
                GenerationLeg::SecondaryAttempt => {
                    return match timeout(
                        window,
                        self.secondary.generate(subject, count, difficulty),
                    )
                    .await
                    {
                        Ok(questions) => questions,
                        Err(_) => {
                            tracing::warn!(subject, "Secondary leg exceeded the time budget");
                            vec![]
                        }
                    };
                }
            }
        }
    }

    fn call_window(&self, deadline: Instant) -> Duration {
        deadline
            .saturating_duration_since(Instant::now())
            .min(self.call_timeout)
    }
}

/// Merge bank and AI questions for one subject: bank first, numbered from 1,
/// stamped with the requested total regardless of what was delivered.
fn assemble(
    subject_name: &str,
    requested: u32,
    bank: Vec<Question>,
    ai: Vec<Question>,
) -> Vec<AssembledItem> {
    bank.into_iter()
        .chain(ai)
        .enumerate()
        .map(|(idx, question)| AssembledItem {
            subject_name: subject_name.to_string(),
            question_number: idx as u32 + 1,
            subject_total: requested,
            question,
        })
        .collect()
}
