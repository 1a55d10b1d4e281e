/// Per-day request cache and in-flight request table
use std::collections::HashMap;

use chrono::NaiveDateTime;
use futures::future::{LocalBoxFuture, Shared};

use crate::dates;
use crate::error::FetchError;

/// A fetch for one day's image URL, shared by everyone waiting on that day
pub type SharedFetch = Shared<LocalBoxFuture<'static, Result<String, FetchError>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub url: String,
    pub fetched_at: NaiveDateTime,
}

/// Image URLs already fetched, keyed by day string.
///
/// An entry is only trusted on the calendar day it was fetched.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: HashMap<String, CacheEntry>,
}

impl RequestCache {
    pub fn insert(&mut self, day: &str, url: &str, now: NaiveDateTime) {
        self.entries.insert(
            day.to_string(),
            CacheEntry {
                url: url.to_string(),
                fetched_at: now,
            },
        );
    }

    pub fn entry(&self, day: &str) -> Option<&CacheEntry> {
        self.entries.get(day)
    }

    /// The cached URL for `day`, if it was fetched on the same day as `now`
    pub fn get(&self, day: &str, now: NaiveDateTime) -> Option<String> {
        self.entries
            .get(day)
            .filter(|entry| entry.fetched_at.date() == now.date())
            .map(|entry| entry.url.clone())
    }

    pub fn contains(&self, day: &str, now: NaiveDateTime) -> bool {
        self.get(day, now).is_some()
    }

    /// Keep only the entries for `today` and the day before
    pub fn prune(&mut self, today: &str) {
        let yesterday = dates::previous_day(today);
        self.entries
            .retain(|day, _| day == today || yesterday.as_deref() == Some(day.as_str()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Completed,
    Failed,
}

/// At most one in-flight fetch per day
#[derive(Default)]
pub struct ActiveRequests {
    in_flight: HashMap<String, SharedFetch>,
    states: HashMap<String, RequestState>,
}

impl ActiveRequests {
    pub fn begin(&mut self, day: &str, request: SharedFetch) {
        self.in_flight.insert(day.to_string(), request);
        self.states.insert(day.to_string(), RequestState::Pending);
    }

    pub fn get(&self, day: &str) -> Option<SharedFetch> {
        self.in_flight.get(day).cloned()
    }

    pub fn finish(&mut self, day: &str, state: RequestState) {
        self.in_flight.remove(day);
        self.states.insert(day.to_string(), state);
    }

    pub fn is_active(&self, day: &str) -> bool {
        self.in_flight.contains_key(day)
    }

    pub fn state(&self, day: &str) -> Option<RequestState> {
        self.states.get(day).copied()
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
        self.states.clear();
    }
}
