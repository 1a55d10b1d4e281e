/// Preloading images and swapping the visible background
use log::{debug, info, warn};
use url::Url;

use super::WallpaperService;
use crate::error::WallpaperError;
use crate::retry::{RetryPolicy, TimedOut, retry_with_backoff, with_timeout};

/// How a transition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The requested image loaded and is shown
    Applied,
    /// The requested image failed; the fallback loaded and is shown
    AppliedFallback,
    /// Nothing loaded, or a newer transition took over; the background
    /// is left as it is
    Kept,
    /// Nothing loaded and nothing was shown yet, so the requested URL was
    /// set anyway
    Forced,
    /// The URL was empty or malformed; nothing was attempted
    Rejected,
}

impl Transition {
    pub fn is_success(self) -> bool {
        matches!(self, Transition::Applied | Transition::AppliedFallback)
    }

    /// Whether the background now shows something this transition chose
    pub fn is_displayed(self) -> bool {
        matches!(
            self,
            Transition::Applied | Transition::AppliedFallback | Transition::Forced
        )
    }
}

/// A URL a background image can be loaded from
pub fn is_valid_image_url(url: &str) -> bool {
    if url.trim().is_empty() {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => parsed.has_host(),
            "data" | "blob" => true,
            _ => false,
        },
        Err(_) => false,
    }
}

/// Counts a transition as running for as long as it lives, including
/// when the transition future is dropped part way
struct Loading<'a>(&'a WallpaperService);

impl<'a> Loading<'a> {
    fn begin(service: &'a WallpaperService) -> Loading<'a> {
        service.inner.state.borrow_mut().loading += 1;
        Loading(service)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        let mut state = self.0.inner.state.borrow_mut();
        state.loading = state.loading.saturating_sub(1);
    }
}

impl WallpaperService {
    /// Load `url` off-screen, retrying with backoff, each attempt bounded
    /// by `timeout_ms`
    pub async fn preload(&self, url: &str, timeout_ms: u32, attempts: u32) -> Result<(), WallpaperError> {
        let runtime = self.inner.platform.runtime.as_ref();
        let images = self.inner.platform.images.as_ref();
        let policy = RetryPolicy::new(attempts, Some(timeout_ms));

        retry_with_backoff(runtime, &policy, |attempt| async move {
            debug!("preloading {url} (attempt {attempt}/{attempts})");
            with_timeout(runtime, timeout_ms, images.load(url))
                .await
                .map_err(|TimedOut(ms)| format!("timeout after {ms}ms"))?
        })
        .await
        .map_err(|e| {
            WallpaperError::Undisplayable(format!(
                "failed to preload {url} after {attempts} attempts: {e}"
            ))
        })
    }

    /// Show `url` once it is known to load, trying `fallback` if it does not.
    ///
    /// Never blanks an existing background: if neither image loads the
    /// current one stays. Only when nothing is shown yet is `url` set
    /// without a successful preload.
    pub async fn transition(&self, url: &str, fallback: Option<&str>) -> Transition {
        if !is_valid_image_url(url) {
            warn!("refusing to transition to invalid wallpaper url {url:?}");
            return Transition::Rejected;
        }

        let ticket = {
            let mut state = self.inner.state.borrow_mut();
            state.latest_transition += 1;
            state.latest_transition
        };
        let _loading = Loading::begin(self);
        self.swap(ticket, url, fallback).await
    }

    /// Display `url` unless a transition started after `ticket` owns the
    /// background now
    fn show(&self, ticket: u64, url: &str) -> bool {
        if self.inner.state.borrow().latest_transition != ticket {
            debug!("a newer wallpaper transition is running, not showing {url}");
            return false;
        }
        self.display(url);
        true
    }

    async fn swap(&self, ticket: u64, url: &str, fallback: Option<&str>) -> Transition {
        let options = &self.inner.options;

        match self
            .preload(url, options.preload_timeout_ms, options.preload_attempts)
            .await
        {
            Ok(()) if self.show(ticket, url) => return Transition::Applied,
            Ok(()) => return Transition::Kept,
            Err(e) => warn!("{e}"),
        }

        let fallback = fallback.filter(|candidate| *candidate != url && is_valid_image_url(candidate));
        if let Some(fallback) = fallback {
            match self
                .preload(fallback, options.fallback_timeout_ms, options.fallback_attempts)
                .await
            {
                Ok(()) if self.show(ticket, fallback) => {
                    info!("wallpaper {url} unavailable, showing fallback {fallback}");
                    return Transition::AppliedFallback;
                }
                Ok(()) => return Transition::Kept,
                Err(e) => warn!("fallback {e}"),
            }
        }

        if self.current_wallpaper().is_empty() && self.show(ticket, url) {
            warn!("no background shown yet, set {url} without preload");
            Transition::Forced
        } else {
            Transition::Kept
        }
    }
}
