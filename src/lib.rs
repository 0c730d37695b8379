pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    bank_service::BankService, gemini_provider::GeminiProvider, key_pool::ApiKeyPool,
    key_pool::ModelPool, openai_provider::OpenAiProvider, quiz_service::QuizService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub bank_service: BankService,
    pub quiz_service: QuizService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        let call_timeout = Duration::from_secs(config.provider_timeout_secs);
        let time_budget = Duration::from_secs(config.quiz_time_budget_secs);

        let keys = Arc::new(
            ApiKeyPool::new(config.openai_api_keys.clone())
                .expect("primary key pool validated at config load"),
        );
        let models = ModelPool::new(
            config.gemini_models.clone(),
            config.gemini_reliable_model.clone(),
        )
        .expect("model pool validated at config load");

        let bank_service = BankService::new(pool.clone());
        let primary = OpenAiProvider::new(http_client.clone(), Arc::clone(&keys), call_timeout);
        let secondary = GeminiProvider::new(
            http_client,
            config.gemini_api_key.clone(),
            models,
            call_timeout,
        );

        let quiz_service = QuizService::new(
            Arc::new(bank_service.clone()),
            Arc::new(primary),
            Arc::new(secondary),
            keys,
            call_timeout,
            time_budget,
            config.max_ai_questions,
        );

        Self {
            pool,
            bank_service,
            quiz_service,
        }
    }
}
