//! Transient status banner with typed severity and expiry

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;

pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_millis(5000);

/// Outcome of the most recent user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message")]
pub enum TxStatus {
    Idle,
    Pending(String),
    Success(String),
    Failure(String),
}

/// Severity tag used for rendering instead of inspecting message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl TxStatus {
    pub fn severity(&self) -> Option<Severity> {
        match self {
            TxStatus::Idle => None,
            TxStatus::Pending(_) => Some(Severity::Info),
            TxStatus::Success(_) => Some(Severity::Success),
            TxStatus::Failure(_) => Some(Severity::Error),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TxStatus::Idle => None,
            TxStatus::Pending(msg) | TxStatus::Success(msg) | TxStatus::Failure(msg) => Some(msg),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TxStatus::Idle)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Idle => f.write_str("idle"),
            TxStatus::Pending(msg) => write!(f, "[pending] {msg}"),
            TxStatus::Success(msg) => write!(f, "[ok] {msg}"),
            TxStatus::Failure(msg) => write!(f, "[error] {msg}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub status: TxStatus,
    pub since: Instant,
    /// `None` keeps the message until it is replaced
    pub expires_at: Option<Instant>,
}

/// Shared status slot. Every write restarts the clear timer relative to its
/// own set time; the newest write always wins.
#[derive(Debug, Clone)]
pub struct StatusBanner {
    slot: Arc<Mutex<Option<StatusMessage>>>,
    events: broadcast::Sender<TxStatus>,
    timeout: Duration,
}

impl Default for StatusBanner {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TIMEOUT)
    }
}

impl StatusBanner {
    pub fn new(timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            slot: Arc::new(Mutex::new(None)),
            events,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set a status that clears itself after the banner timeout
    pub fn set(&self, status: TxStatus) {
        self.set_at(status, Instant::now());
    }

    pub fn set_at(&self, status: TxStatus, now: Instant) {
        let expires_at = Some(now + self.timeout);
        self.write(status, now, expires_at);
    }

    /// Set a status that stays until replaced (long-running loads)
    pub fn set_sticky(&self, status: TxStatus) {
        self.write(status, Instant::now(), None);
    }

    /// Return to idle, but only while `status` is still the one showing
    pub fn withdraw(&self, status: &TxStatus) -> bool {
        let withdrawn = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(msg) if msg.status == *status => {
                    *slot = None;
                    true
                }
                _ => false,
            }
        };
        if withdrawn {
            let _ = self.events.send(TxStatus::Idle);
        }
        withdrawn
    }

    pub fn current(&self) -> TxStatus {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> TxStatus {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(msg) if !is_expired(msg, now) => msg.status.clone(),
            _ => TxStatus::Idle,
        }
    }

    pub fn snapshot(&self) -> Option<StatusMessage> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop an expired message and announce the return to idle
    pub fn on_tick(&self) {
        self.on_tick_at(Instant::now());
    }

    pub fn on_tick_at(&self, now: Instant) {
        let cleared = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(msg) if is_expired(msg, now) => {
                    *slot = None;
                    true
                }
                _ => false,
            }
        };
        if cleared {
            let _ = self.events.send(TxStatus::Idle);
        }
    }

    /// Receive every status transition written after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TxStatus> {
        self.events.subscribe()
    }

    fn write(&self, status: TxStatus, now: Instant, expires_at: Option<Instant>) {
        {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = if status.is_idle() {
                None
            } else {
                Some(StatusMessage {
                    status: status.clone(),
                    since: now,
                    expires_at,
                })
            };
        }
        let _ = self.events.send(status);
    }
}

fn is_expired(msg: &StatusMessage, now: Instant) -> bool {
    msg.expires_at.is_some_and(|at| now >= at)
}
