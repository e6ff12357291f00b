pub mod format;
pub mod session;

use crate::errors::{RateError, ViewError};
use crate::models::{ChangeInfo, FetchResult, RateSnapshot, now_ms};
use format::format_price;
use serde::Serialize;
use std::collections::VecDeque;

pub use session::{Session, SessionFactory, SessionHandle};

const MAX_NOTIFICATIONS: usize = 5;

/// Lifecycle of the current-rate fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FetchState {
    Idle,
    Loading,
    Success(RateSnapshot),
    Error(String),
}

/// What the rate panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "snapshot", rename_all = "snake_case")]
pub enum RateDisplay {
    /// Nothing fetched yet
    Prompt,
    /// First fetch in flight, nothing to show yet
    Loading,
    Rate(RateSnapshot),
    /// Every fetch so far has failed
    FetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: String,
    /// Unix millis when the notification was raised
    pub raised_at: i64,
}

/// Everything a renderer needs, detached from the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub pair: String,
    pub fetch: FetchState,
    pub display: RateDisplay,
    pub current: Option<RateSnapshot>,
    pub saved: Option<RateSnapshot>,
    pub change: Option<ChangeInfo>,
    pub highlight: bool,
    pub saving: bool,
    pub can_refresh: bool,
    pub can_save: bool,
    pub fetching_ip: bool,
    pub backend_ip: Option<String>,
    pub notifications: Vec<Notification>,
}

/// The page's state machine. Pure: callers perform the I/O between the
/// `begin_*` and `finish_*` halves of each transition.
#[derive(Debug, Clone)]
pub struct RateView {
    pair: String,
    fetch: FetchState,
    // last successful rate; survives failed refreshes
    current: Option<RateSnapshot>,
    saved: Option<RateSnapshot>,
    highlight: bool,
    saving: bool,
    fetching_ip: bool,
    backend_ip: Option<String>,
    notifications: VecDeque<Notification>,
}

impl RateView {
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            fetch: FetchState::Idle,
            current: None,
            saved: None,
            highlight: false,
            saving: false,
            fetching_ip: false,
            backend_ip: None,
            notifications: VecDeque::new(),
        }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn fetch_state(&self) -> &FetchState {
        &self.fetch
    }

    pub fn current(&self) -> Option<RateSnapshot> {
        self.current
    }

    pub fn saved(&self) -> Option<RateSnapshot> {
        self.saved
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlight
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// When the oldest notification still shown was raised.
    pub fn oldest_notification_at(&self) -> Option<i64> {
        self.notifications.front().map(|n| n.raised_at)
    }

    /// Dismisses every notification raised at or before `cutoff_ms`.
    pub fn expire_notifications(&mut self, cutoff_ms: i64) {
        while self
            .notifications
            .front()
            .is_some_and(|n| n.raised_at <= cutoff_ms)
        {
            self.notifications.pop_front();
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.fetch != FetchState::Loading
    }

    pub fn can_save(&self) -> bool {
        self.current.is_some() && self.can_refresh() && !self.saving
    }

    pub fn change(&self) -> Option<ChangeInfo> {
        Some(ChangeInfo::between(self.current.as_ref()?, self.saved.as_ref()?))
    }

    pub fn display(&self) -> RateDisplay {
        match (&self.fetch, self.current) {
            (_, Some(snapshot)) => RateDisplay::Rate(snapshot),
            (FetchState::Loading, None) => RateDisplay::Loading,
            (FetchState::Error(_), None) => RateDisplay::FetchFailed,
            _ => RateDisplay::Prompt,
        }
    }

    pub fn begin_refresh(&mut self) -> Result<(), ViewError> {
        if !self.can_refresh() {
            return Err(ViewError::Busy);
        }
        self.fetch = FetchState::Loading;
        Ok(())
    }

    pub fn finish_refresh(&mut self, result: FetchResult) {
        match result {
            Ok(snapshot) => {
                self.current = Some(snapshot);
                self.fetch = FetchState::Success(snapshot);
                self.highlight = true;
            }
            Err(e) => {
                let message = e.to_string();
                self.notify(Level::Error, "Error fetching rate", &message);
                self.fetch = FetchState::Error(message);
            }
        }
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = false;
    }

    /// Hands out the snapshot to persist. Refused while a refresh or another
    /// save is running, or before any rate was fetched.
    pub fn begin_save(&mut self) -> Result<RateSnapshot, ViewError> {
        let snapshot = self.current.ok_or(ViewError::NoCurrentRate)?;
        if !self.can_save() {
            return Err(ViewError::Busy);
        }
        self.saving = true;
        Ok(snapshot)
    }

    pub fn finish_save(&mut self, snapshot: RateSnapshot, result: Result<(), RateError>) {
        self.saving = false;
        match result {
            Ok(()) => {
                self.saved = Some(snapshot);
                let description = format!(
                    "{} rate of {} saved.",
                    self.pair,
                    format_price(snapshot.rate())
                );
                self.notify(Level::Info, "Rate Saved", &description);
            }
            Err(e) => self.notify(Level::Error, "Error saving rate", &e.to_string()),
        }
    }

    /// Applies the one-off load of the saved snapshot done on mount.
    pub fn apply_saved(&mut self, result: Result<Option<RateSnapshot>, RateError>) {
        match result {
            Ok(Some(snapshot)) => self.saved = Some(snapshot),
            Ok(None) => {}
            Err(e) => self.notify(Level::Error, "Error loading saved rate", &e.to_string()),
        }
    }

    pub fn begin_ip_lookup(&mut self) -> Result<(), ViewError> {
        if self.fetching_ip {
            return Err(ViewError::Busy);
        }
        self.fetching_ip = true;
        Ok(())
    }

    pub fn finish_ip_lookup(&mut self, result: Result<String, RateError>) {
        self.fetching_ip = false;
        match result {
            Ok(ip) => self.backend_ip = Some(ip),
            Err(e) => {
                self.backend_ip = None;
                self.notify(Level::Error, "Error fetching IP", &e.to_string());
            }
        }
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            pair: self.pair.clone(),
            fetch: self.fetch.clone(),
            display: self.display(),
            current: self.current,
            saved: self.saved,
            change: self.change(),
            highlight: self.highlight,
            saving: self.saving,
            can_refresh: self.can_refresh(),
            can_save: self.can_save(),
            fetching_ip: self.fetching_ip,
            backend_ip: self.backend_ip.clone(),
            notifications: self.notifications.iter().cloned().collect(),
        }
    }

    fn notify(&mut self, level: Level, title: &str, description: &str) {
        if self.notifications.len() == MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
        self.notifications.push_back(Notification {
            level,
            title: title.to_string(),
            description: description.to_string(),
            raised_at: now_ms(),
        });
    }
}
