pub mod bank_service;
pub mod gemini_provider;
pub mod key_pool;
pub mod normalizer;
pub mod openai_provider;
pub mod quiz_service;
pub mod selection;
