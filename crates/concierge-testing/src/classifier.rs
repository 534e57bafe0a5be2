//! Deterministic classifier for tests.

use async_trait::async_trait;
use concierge_coordinator::{Classifier, CoordinatorError, CoordinatorResult};
use concierge_core::Intent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Returns pre-scripted intents for exact request texts.
///
/// Unknown texts classify to nothing unless a default is set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClassifier {
    scripts: HashMap<String, Vec<Intent>>,
    default: Option<Vec<Intent>>,
    fail_with: Option<String>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(mut self, text: impl Into<String>, intents: Vec<Intent>) -> Self {
        self.scripts.insert(text.into(), intents);
        self
    }

    /// Intents for any text without its own script
    #[must_use]
    pub fn with_default(mut self, intents: Vec<Intent>) -> Self {
        self.default = Some(intents);
        self
    }

    /// Make every call fail as a classifier backend error
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Texts classified so far
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> CoordinatorResult<Vec<Intent>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(text.to_string());
        }
        if let Some(message) = &self.fail_with {
            return Err(CoordinatorError::classifier(message.clone()));
        }
        Ok(self
            .scripts
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or_default())
    }
}
