use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// How long an alert stays visible before it clears itself.
pub const ALERT_TTL_SECS: i64 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: AlertLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: AlertLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: AlertLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: AlertLevel::Error, message: message.into() }
    }
}

#[derive(Clone, Debug)]
struct ActiveAlert {
    alert: Alert,
    expires_at: DateTime<Utc>,
}

/// Single-slot transient feedback channel for the session's action flows.
///
/// Holds at most one alert. A new alert replaces the current one and restarts
/// the interval. Expiry is evaluated against the clock when the slot is read,
/// so an untouched alert is gone after its interval without any timer task.
/// Never persisted.
#[derive(Debug, Default)]
pub struct AlertCenter {
    slot: Mutex<Option<ActiveAlert>>,
}

impl AlertCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, alert: Alert) {
        self.post_at(alert, Utc::now());
    }

    pub fn post_at(&self, alert: Alert, now: DateTime<Utc>) {
        let active = ActiveAlert { alert, expires_at: now + Duration::seconds(ALERT_TTL_SECS) };
        *self.lock_slot() = Some(active);
    }

    pub fn current(&self) -> Option<Alert> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> Option<Alert> {
        let mut slot = self.lock_slot();
        match slot.as_ref() {
            Some(active) if now < active.expires_at => Some(active.alert.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn clear(&self) {
        *self.lock_slot() = None;
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<ActiveAlert>> {
        match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
