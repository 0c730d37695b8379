use crate::dto::quiz_dto::CreateBankQuestion;
use crate::error::Result;
use crate::models::question::{DifficultyTier, Origin, Question};
use async_trait::async_trait;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;

/// Over-fetch factor for bank queries. The repository applies no
/// randomization of its own, so the selector needs a pool genuinely larger
/// than the target to pick from.
pub const BANK_OVERFETCH_FACTOR: u32 = 2;

/// Read side of the question bank as the engine sees it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BankSource: Send + Sync {
    /// Fetch up to `limit` non-deleted questions for a subject. Returning
    /// fewer rows than asked for (even zero) is not an error, only a
    /// shortfall signal.
    async fn fetch(&self, subject: &str, limit: i64) -> Result<Vec<Question>>;
}

#[derive(Clone)]
pub struct BankService {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct BankRow {
    text: String,
    options: SqlJson<Vec<String>>,
    correct_option_index: i16,
    explanation: Option<String>,
    topic: Option<String>,
    difficulty: String,
}

impl BankService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bulk ingestion path for curated or previously generated questions.
    /// Separate from the assembly pipeline, which never writes.
    pub async fn insert_many(&self, questions: &[CreateBankQuestion]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for q in questions {
            let result = sqlx::query(
                r#"
                INSERT INTO bank_questions
                    (subject_name, text, options, correct_option_index, explanation, topic, difficulty)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&q.subject_name)
            .bind(&q.text)
            .bind(SqlJson(&q.options))
            .bind(q.correct_option_index as i16)
            .bind(&q.explanation)
            .bind(&q.topic)
            .bind(q.difficulty.as_str())
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl BankSource for BankService {
    async fn fetch(&self, subject: &str, limit: i64) -> Result<Vec<Question>> {
        let rows: Vec<BankRow> = sqlx::query_as(
            r#"
            SELECT text, options, correct_option_index, explanation, topic, difficulty
            FROM bank_questions
            WHERE subject_name = $1 AND is_deleted = FALSE
            LIMIT $2
            "#,
        )
        .bind(subject)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let questions = rows
            .into_iter()
            .filter_map(|row| {
                // Stored rows should already satisfy the shape invariants;
                // anything that slipped past ingestion is skipped.
                if row.options.0.len() != 4
                    || !(0..4).contains(&row.correct_option_index)
                {
                    tracing::warn!(subject, "Skipping malformed bank row");
                    return None;
                }
                Some(Question {
                    text: row.text,
                    options: row.options.0,
                    correct_option_index: row.correct_option_index as u8,
                    explanation: row.explanation.unwrap_or_default(),
                    topic: row
                        .topic
                        .unwrap_or_else(|| crate::services::normalizer::DEFAULT_TOPIC.to_string()),
                    difficulty: DifficultyTier::parse(&row.difficulty)
                        .unwrap_or(DifficultyTier::Medium),
                    origin: Origin::Bank,
                    provider_id: None,
                })
            })
            .collect();

        Ok(questions)
    }
}
