/// One-shot operator notices shown on the next admin page render

use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct FlashMessages {
    queue: Mutex<Vec<FlashMessage>>,
}

impl FlashMessages {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FlashMessage>> {
        // A panic while holding the lock leaves a plain Vec behind; keep using it
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: FlashLevel, text: impl Into<String>) {
        self.lock().push(FlashMessage {
            level,
            text: text.into(),
        });
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(FlashLevel::Success, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.push(FlashLevel::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(FlashLevel::Error, text);
    }

    /// Take every pending message, oldest first
    pub fn drain(&self) -> Vec<FlashMessage> {
        std::mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue() {
        let flashes = FlashMessages::new();
        flashes.success("created");
        flashes.warning("missing");

        let drained = flashes.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, FlashLevel::Success);
        assert_eq!(drained[1].text, "missing");
        assert!(flashes.drain().is_empty());
    }
}
