use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assessment_backend::dto::quiz_dto::SubjectRequest;
use assessment_backend::error::{Error, ProviderError, Result};
use assessment_backend::models::question::{DifficultyTier, Origin, Question};
use assessment_backend::services::bank_service::BankSource;
use assessment_backend::services::gemini_provider::SecondaryProvider;
use assessment_backend::services::key_pool::ApiKeyPool;
use assessment_backend::services::openai_provider::PrimaryProvider;
use assessment_backend::services::quiz_service::QuizService;
use async_trait::async_trait;

fn question(text: &str, origin: Origin, provider_id: Option<&str>) -> Question {
    Question {
        text: text.to_string(),
        options: vec![
            "Option A".into(),
            "Option B".into(),
            "Option C".into(),
            "Option D".into(),
        ],
        correct_option_index: 2,
        explanation: "Because C.".to_string(),
        topic: "General".to_string(),
        difficulty: DifficultyTier::Medium,
        origin,
        provider_id: provider_id.map(|p| p.to_string()),
    }
}

struct StubBank {
    rows: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl BankSource for StubBank {
    async fn fetch(&self, subject: &str, limit: i64) -> Result<Vec<Question>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let available = self.rows.min(limit as usize);
        Ok((0..available)
            .map(|i| question(&format!("{} bank #{}", subject, i), Origin::Bank, None))
            .collect())
    }
}

struct FailingBank;

#[async_trait]
impl BankSource for FailingBank {
    async fn fetch(&self, _subject: &str, _limit: i64) -> Result<Vec<Question>> {
        Err(Error::Internal("bank unreachable".to_string()))
    }
}

enum PrimaryBehavior {
    Succeed,
    Quota,
    Unavailable,
}

struct StubPrimary {
    behavior: PrimaryBehavior,
    calls: AtomicUsize,
}

impl StubPrimary {
    fn new(behavior: PrimaryBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PrimaryProvider for StubPrimary {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn generate(
        &self,
        subject: &str,
        count: u32,
        _difficulty: DifficultyTier,
    ) -> std::result::Result<Vec<Question>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            PrimaryBehavior::Succeed => Ok((0..count)
                .map(|i| question(&format!("{} ai #{}", subject, i), Origin::Ai, Some("openai")))
                .collect()),
            PrimaryBehavior::Quota => Err(ProviderError::QuotaExceeded(
                "you exceeded your current quota".to_string(),
            )),
            PrimaryBehavior::Unavailable => {
                Err(ProviderError::Unavailable("connection refused".to_string()))
            }
        }
    }
}

struct StubSecondary {
    deliver: bool,
    calls: AtomicUsize,
}

impl StubSecondary {
    fn new(deliver: bool) -> Self {
        Self {
            deliver,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SecondaryProvider for StubSecondary {
    async fn generate(
        &self,
        subject: &str,
        count: u32,
        _difficulty: DifficultyTier,
    ) -> Vec<Question> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.deliver {
            (0..count)
                .map(|i| {
                    question(
                        &format!("{} gemini #{}", subject, i),
                        Origin::Ai,
                        Some("gemini-1.5-flash"),
                    )
                })
                .collect()
        } else {
            vec![]
        }
    }
}

fn key_pool(entries: &[&str]) -> Arc<ApiKeyPool> {
    Arc::new(ApiKeyPool::new(entries.iter().map(|k| k.to_string()).collect()).unwrap())
}

fn engine(
    bank: Arc<dyn BankSource>,
    primary: Arc<dyn PrimaryProvider>,
    secondary: Arc<dyn SecondaryProvider>,
    keys: Arc<ApiKeyPool>,
) -> QuizService {
    QuizService::new(
        bank,
        primary,
        secondary,
        keys,
        Duration::from_secs(5),
        Duration::from_secs(30),
        50,
    )
}

fn subjects(pairs: &[(&str, u32)]) -> Vec<SubjectRequest> {
    pairs.iter()
        .map(|(name, count)| SubjectRequest {
            subject_name: name.to_string(),
            count: *count,
        })
        .collect()
}

#[tokio::test]
async fn partial_bank_with_both_providers_down_yields_partial_payload() {
    let bank = Arc::new(StubBank {
        rows: 3,
        calls: AtomicUsize::new(0),
    });
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Unavailable));
    let secondary = Arc::new(StubSecondary::new(false));
    let svc = engine(
        bank.clone(),
        primary.clone(),
        secondary.clone(),
        key_pool(&["k1"]),
    );

    let result = svc
        .generate_quiz(
            &subjects(&[("Mathematics", 5)]),
            DifficultyTier::Medium,
            Some("integration-test"),
        )
        .await
        .expect("engine must not fail when providers do");

    assert_eq!(result.subjects.len(), 1);
    assert_eq!(result.items.len(), 3);
    assert!(result
        .items
        .iter()
        .all(|i| i.question.origin == Origin::Bank && i.subject_name == "Mathematics"));
    let numbers: Vec<u32> = result.items.iter().map(|i| i.question_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(result.items.iter().all(|i| i.subject_total == 5));
    assert_eq!(result.subjects[0].delivered, 3);
    assert_eq!(result.subjects[0].requested, 5);
}

#[tokio::test]
async fn empty_bank_filled_by_primary_on_first_credential() {
    let bank = Arc::new(StubBank {
        rows: 0,
        calls: AtomicUsize::new(0),
    });
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Succeed));
    let secondary = Arc::new(StubSecondary::new(true));
    let keys = key_pool(&["k1", "k2"]);
    let svc = engine(bank, primary.clone(), secondary.clone(), Arc::clone(&keys));

    let result = svc
        .generate_quiz(&subjects(&[("Biology", 4)]), DifficultyTier::Medium, None)
        .await
        .unwrap();

    assert_eq!(result.items.len(), 4);
    assert!(result.items.iter().all(|i| {
        i.question.origin == Origin::Ai && i.question.provider_id.as_deref() == Some("openai")
    }));
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    assert_eq!(keys.current(), "k1");
}

#[tokio::test]
async fn quota_exhaustion_rotates_exactly_once_before_fallback() {
    let bank = Arc::new(StubBank {
        rows: 0,
        calls: AtomicUsize::new(0),
    });
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Quota));
    let secondary = Arc::new(StubSecondary::new(true));
    let keys = key_pool(&["k1", "k2"]);
    let svc = engine(bank, primary.clone(), secondary.clone(), Arc::clone(&keys));

    let result = svc
        .generate_quiz(&subjects(&[("History", 3)]), DifficultyTier::Medium, None)
        .await
        .unwrap();

    // Two primary attempts (original + one post-rotation retry), then the
    // secondary leg takes over.
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    assert_eq!(keys.current(), "k2");
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.items.len(), 3);
    assert!(result
        .items
        .iter()
        .all(|i| i.question.provider_id.as_deref() == Some("gemini-1.5-flash")));
}

#[tokio::test]
async fn single_credential_pool_never_rotates() {
    let bank = Arc::new(StubBank {
        rows: 0,
        calls: AtomicUsize::new(0),
    });
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Quota));
    let secondary = Arc::new(StubSecondary::new(false));
    let keys = key_pool(&["only-key"]);
    let svc = engine(bank, primary.clone(), secondary.clone(), Arc::clone(&keys));

    let result = svc
        .generate_quiz(&subjects(&[("Physics", 2)]), DifficultyTier::Hard, None)
        .await
        .unwrap();

    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(keys.current(), "only-key");
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    assert!(result.items.is_empty());
    assert_eq!(result.subjects[0].delivered, 0);
    assert_eq!(result.subjects[0].requested, 2);
}

#[tokio::test]
async fn bank_outage_degrades_to_generation() {
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Succeed));
    let secondary = Arc::new(StubSecondary::new(false));
    let svc = engine(
        Arc::new(FailingBank),
        primary.clone(),
        secondary,
        key_pool(&["k1"]),
    );

    let result = svc
        .generate_quiz(&subjects(&[("Chemistry", 3)]), DifficultyTier::Easy, None)
        .await
        .unwrap();

    assert_eq!(result.items.len(), 3);
    assert!(result.items.iter().all(|i| i.question.origin == Origin::Ai));
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mixed_subjects_mix_origins_and_preserve_order() {
    let bank = Arc::new(StubBank {
        rows: 2,
        calls: AtomicUsize::new(0),
    });
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Succeed));
    let secondary = Arc::new(StubSecondary::new(false));
    let svc = engine(bank, primary, secondary, key_pool(&["k1"]));

    let result = svc
        .generate_quiz(
            &subjects(&[("Alpha", 4), ("Beta", 2)]),
            DifficultyTier::Medium,
            None,
        )
        .await
        .unwrap();

    // Alpha: 2 bank + 2 AI; Beta: fully covered by the bank.
    assert_eq!(result.items.len(), 6);
    let alpha: Vec<_> = result
        .items
        .iter()
        .filter(|i| i.subject_name == "Alpha")
        .collect();
    assert_eq!(alpha.len(), 4);
    assert_eq!(alpha[0].question.origin, Origin::Bank);
    assert_eq!(alpha[1].question.origin, Origin::Bank);
    assert_eq!(alpha[2].question.origin, Origin::Ai);
    assert_eq!(alpha[3].question.origin, Origin::Ai);
    assert_eq!(
        alpha.iter().map(|i| i.question_number).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    // Payload keeps the input subject order.
    assert!(result.items[..4].iter().all(|i| i.subject_name == "Alpha"));
    assert!(result.items[4..].iter().all(|i| i.subject_name == "Beta"));
}

#[tokio::test]
async fn empty_subject_list_is_the_only_hard_failure() {
    let bank = Arc::new(StubBank {
        rows: 0,
        calls: AtomicUsize::new(0),
    });
    let primary = Arc::new(StubPrimary::new(PrimaryBehavior::Succeed));
    let secondary = Arc::new(StubSecondary::new(false));
    let svc = engine(bank, primary, secondary, key_pool(&["k1"]));

    let err = svc
        .generate_quiz(&[], DifficultyTier::Medium, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}
