use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    /// Comma-separated rotating credential pool for the primary provider.
    pub openai_api_keys: Vec<String>,
    pub gemini_api_key: String,
    /// Models the secondary provider may draw from.
    pub gemini_models: Vec<String>,
    /// Member of `gemini_models` used for the single retry after a failed draw.
    pub gemini_reliable_model: String,
    pub provider_timeout_secs: u64,
    pub quiz_time_budget_secs: u64,
    pub max_ai_questions: usize,
    pub integration_rps: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let openai_api_keys = get_env_list("OPENAI_API_KEYS")?;
        let gemini_models = get_env_list("GEMINI_MODELS")?;
        let gemini_reliable_model = get_env("GEMINI_RELIABLE_MODEL")?;
        if !gemini_models.contains(&gemini_reliable_model) {
            return Err(Error::Config(format!(
                "GEMINI_RELIABLE_MODEL '{}' is not listed in GEMINI_MODELS",
                gemini_reliable_model
            )));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            openai_api_keys,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_models,
            gemini_reliable_model,
            provider_timeout_secs: get_env_parse("PROVIDER_TIMEOUT_SECS")?,
            quiz_time_budget_secs: get_env_parse("QUIZ_TIME_BUDGET_SECS")?,
            max_ai_questions: get_env_parse("MAX_AI_QUESTIONS")?,
            integration_rps: get_env_parse("INTEGRATION_RPS")?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_list(name: &str) -> Result<Vec<String>> {
    let raw = get_env(name)?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return Err(Error::Config(format!(
            "{} must contain at least one entry",
            name
        )));
    }
    Ok(items)
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
