// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transient error message shown after a rejected or rolled-back change.

use std::time::{Duration, Instant};

/// A message and when it was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Text to display
    pub text: String,
    /// When the message was raised
    pub raised_at: Instant,
}

/// Holds at most one error message, which expires after `ttl`
#[derive(Debug, Clone)]
pub struct ErrorDisplay {
    current: Option<StatusMessage>,
    ttl: Duration,
}

impl ErrorDisplay {
    /// Create an empty display with the given lifetime for messages
    pub fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    /// Show a message, replacing any previous one
    pub fn raise(&mut self, text: impl Into<String>, now: Instant) {
        self.current = Some(StatusMessage {
            text: text.into(),
            raised_at: now,
        });
    }

    /// The message still visible at `now`
    pub fn current(&self, now: Instant) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|msg| now.saturating_duration_since(msg.raised_at) < self.ttl)
            .map(|msg| msg.text.as_str())
    }

    /// Drop the message if it has expired
    pub fn clear_expired(&mut self, now: Instant) {
        if self.current(now).is_none() {
            self.current = None;
        }
    }

    /// Dismiss the message explicitly
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
