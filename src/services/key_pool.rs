use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use std::sync::Mutex;

/// Rotating credential pool for the primary provider.
///
/// Process-wide shared state: every concurrent quiz generation observes the
/// same cursor, so a rotation triggered by one request's quota rejection
/// carries over to the next. The cursor is always a valid index into `keys`.
#[derive(Debug)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    cursor: Mutex<usize>,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::Config(
                "Primary provider key pool must not be empty".to_string(),
            ));
        }
        Ok(Self {
            keys,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Credential at the current cursor.
    pub fn current(&self) -> String {
        let cursor = self.cursor.lock().expect("key pool mutex poisoned");
        self.keys[*cursor].clone()
    }

    /// Advance the cursor to the next credential and return it.
    /// A no-op for a single-entry pool.
    pub fn rotate(&self) -> String {
        let mut cursor = self.cursor.lock().expect("key pool mutex poisoned");
        *cursor = (*cursor + 1) % self.keys.len();
        self.keys[*cursor].clone()
    }
}

/// Fixed model pool for the secondary provider. One model is drawn uniformly
/// at random per call; the designated reliable model backs the single retry.
#[derive(Debug, Clone)]
pub struct ModelPool {
    models: Vec<String>,
    reliable: String,
}

impl ModelPool {
    pub fn new(models: Vec<String>, reliable: String) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::Config(
                "Secondary provider model pool must not be empty".to_string(),
            ));
        }
        if !models.contains(&reliable) {
            return Err(Error::Config(format!(
                "Reliable model '{}' is not a member of the model pool",
                reliable
            )));
        }
        Ok(Self { models, reliable })
    }

    /// Independent uniform draw, not a rotation.
    pub fn draw(&self) -> &str {
        let mut rng = rand::thread_rng();
        self.models
            .choose(&mut rng)
            .map(|m| m.as_str())
            .unwrap_or(&self.reliable)
    }

    pub fn reliable(&self) -> &str {
        &self.reliable
    }

    /// Model for the single retry after `failed` errored, or `None` when the
    /// failed draw was already the reliable model.
    pub fn retry_model(&self, failed: &str) -> Option<&str> {
        if failed == self.reliable {
            None
        } else {
            Some(&self.reliable)
        }
    }
}
