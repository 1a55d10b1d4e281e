/// The image-of-the-day fetcher: cache, request deduplication and the
/// fallback ladder
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use url::Url;

use super::{RequestState, SharedFetch, WallpaperService};
use crate::dates;
use crate::error::FetchError;
use crate::retry::fetch_json_with_retry;
use crate::settings::WallpaperMode;

/// Body of the daily image API
#[derive(Debug, Deserialize)]
struct DailyImage {
    imgurl: String,
}

/// The image URL from an API response must be an absolute http(s) URL
fn validate_image_url(candidate: String) -> Result<String, FetchError> {
    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(candidate),
        _ => Err(FetchError::InvalidImageUrl(candidate)),
    }
}

impl WallpaperService {
    /// Make sure the background shows today's image, using as few network
    /// calls as possible. Never fails; problems are logged.
    pub async fn ensure_todays_wallpaper(&self) {
        if !self.is_daily() {
            debug!("not in daily mode, leaving the wallpaper alone");
            return;
        }

        let now = self.now();
        let today = dates::day_of(now);
        if !dates::is_valid_day(&today) {
            debug!("could not form a valid day from {now}, skipping wallpaper refresh");
            return;
        }

        let (cached, pending) = {
            let mut state = self.inner.state.borrow_mut();
            state.cache.prune(&today);
            (state.cache.get(&today, now), state.active.get(&today))
        };

        if let Some(url) = cached {
            debug!("using cached wallpaper for {today}");
            self.show_if_needed(&url).await;
            return;
        }

        if let Some(pending) = pending {
            debug!("joining in-flight wallpaper request for {today}");
            let result = pending.await;
            if let Ok(url) = &result {
                let saved = self.settings();
                if saved.current_date != today || saved.current_url != *url {
                    self.record_daily(&today, url.clone()).await;
                }
            }
            if !self.is_daily() {
                debug!("left daily mode while waiting for {today}");
                return;
            }
            match result {
                Ok(url) => self.show_if_needed(&url).await,
                Err(e) => {
                    warn!("joined wallpaper request for {today} failed: {e}");
                    self.fall_back(&today).await;
                }
            }
            return;
        }

        let persisted = self.settings();
        if persisted.has_daily_for(&today) {
            if self.transition(&persisted.current_url, None).await.is_success() {
                self.cache_request(&today, &persisted.current_url);
                return;
            }
            info!("saved wallpaper for {today} no longer loads, fetching a new one");
        }

        let fetched = self.fetch_day(&today).await;
        if !self.is_daily() {
            if let Ok(url) = fetched {
                self.record_daily(&today, url).await;
            }
            debug!("left daily mode while fetching {today}, background untouched");
            return;
        }

        match fetched {
            Ok(url) => {
                let last_good = self.settings().current_url;
                let fallback = Some(last_good.as_str()).filter(|u| !u.is_empty());
                let outcome = self.transition(&url, fallback).await;
                if !outcome.is_success() {
                    warn!("fetched wallpaper for {today} could not be shown ({outcome:?})");
                }

                // The fetch itself succeeded, so today's URL is recorded
                // even if the swap had to fall back.
                self.record_daily(&today, url).await;
            }
            Err(e) => {
                warn!("failed to fetch wallpaper for {today}: {e}");
                self.fall_back(&today).await;
            }
        }
    }

    /// Image URL for `day`: cached, joined onto an in-flight request, or
    /// fetched. Concurrent callers for one day share a single request.
    pub async fn fetch_day(&self, day: &str) -> Result<String, FetchError> {
        let now = self.now();
        let request = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(url) = state.cache.get(day, now) {
                return Ok(url);
            }
            match state.active.get(day) {
                Some(request) => request,
                None => {
                    let request = self.request_for(day);
                    state.active.begin(day, request.clone());
                    request
                }
            }
        };

        request.await
    }

    /// A shared request that records its own outcome when it settles
    fn request_for(&self, day: &str) -> SharedFetch {
        let service = self.clone();
        let day = day.to_string();

        async move {
            let result = service.request_image_url(&day).await;
            let now = service.now();

            let mut state = service.inner.state.borrow_mut();
            match &result {
                Ok(url) => {
                    state.cache.insert(&day, url, now);
                    state.active.finish(&day, RequestState::Completed);
                }
                Err(_) => state.active.finish(&day, RequestState::Failed),
            }
            result
        }
        .boxed_local()
        .shared()
    }

    async fn request_image_url(&self, day: &str) -> Result<String, FetchError> {
        let options = &self.inner.options;
        let endpoint = if day == dates::day_of(self.now()) {
            options.daily_json_url()
        } else {
            options.dated_json_url(day)
        };

        let platform = &self.inner.platform;
        let image: DailyImage = fetch_json_with_retry(
            platform.http.as_ref(),
            platform.runtime.as_ref(),
            &endpoint,
            &options.fetch_policy,
        )
        .await?;

        validate_image_url(image.imgurl)
    }

    fn is_daily(&self) -> bool {
        self.mode() == WallpaperMode::Daily
    }

    /// Save `url` as the image fetched for `today`
    async fn record_daily(&self, today: &str, url: String) {
        self.update_settings(|settings| {
            settings.current_url = url;
            settings.current_date = today.to_string();
        });
        self.persist().await;
        info!("wallpaper updated for {today}");
    }

    async fn show_if_needed(&self, url: &str) {
        if self.current_wallpaper() != url {
            self.transition(url, None).await;
        }
    }

    /// Today's image is unavailable: last known-good image, then
    /// yesterday's, then whatever is already shown.
    async fn fall_back(&self, today: &str) {
        let last_good = self.settings().current_url;
        if !last_good.is_empty() {
            if self.current_wallpaper() == last_good {
                info!("keeping last known-good wallpaper");
                return;
            }
            if self.transition(&last_good, None).await.is_success() {
                info!("showing last known-good wallpaper");
                return;
            }
        }

        // Yesterday's image stands in without touching the saved date, so
        // the next check still goes after today's.
        if let Some(yesterday) = dates::previous_day(today) {
            let fetched = self.fetch_day(&yesterday).await;
            if !self.is_daily() {
                debug!("left daily mode while fetching {yesterday}");
                return;
            }
            match fetched {
                Ok(url) => {
                    if self.transition(&url, None).await.is_success() {
                        info!("showing wallpaper for {yesterday} until {today} is available");
                        return;
                    }
                }
                Err(e) => warn!("failed to fetch wallpaper for {yesterday}: {e}"),
            }
        }

        if self.current_wallpaper().is_empty() {
            error!("no wallpaper available for {today}, background left empty");
        } else {
            warn!("all wallpaper sources failed for {today}, keeping current background");
        }
    }
}
