/// Wallpaper acquisition, caching and transitions
///
/// `WallpaperService` is a cheap cloneable handle over the state shared by
/// the daily fetcher, the auto-refresh timer and the upload / historical
/// modes. Everything runs on the page's single event loop.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::NaiveDateTime;
use log::{debug, info};

use crate::platform::{IntervalHandle, Platform};
use crate::retry::RetryPolicy;
use crate::settings::{WallpaperMode, WallpaperSettings};
use crate::storage::RecordStore;

mod cache;
mod daily;
mod history;
mod local;
mod scheduler;
mod transition;

pub use cache::{ActiveRequests, CacheEntry, RequestCache, RequestState, SharedFetch};
pub use history::{HistoricalWallpaper, history_page};
pub use local::{MAX_UPLOAD_BYTES, validate_upload};
pub use transition::{Transition, is_valid_image_url};

/// Endpoints, timeouts and limits of the wallpaper pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct WallpaperOptions {
    pub api_base: String,
    pub fetch_policy: RetryPolicy,
    pub preload_timeout_ms: u32,
    pub preload_attempts: u32,
    pub fallback_timeout_ms: u32,
    pub fallback_attempts: u32,
    pub refresh_interval_ms: u32,
    pub max_upload_bytes: u64,
    pub history_page_size: usize,
    pub preview_size: String,
    pub full_size: String,
}

impl Default for WallpaperOptions {
    fn default() -> Self {
        WallpaperOptions {
            api_base: "https://bing.ee123.net".to_string(),
            fetch_policy: RetryPolicy::network(),
            preload_timeout_ms: 15_000,
            preload_attempts: 2,
            fallback_timeout_ms: 10_000,
            fallback_attempts: 2,
            refresh_interval_ms: 60_000,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            history_page_size: 10,
            preview_size: "320x240".to_string(),
            full_size: "4k".to_string(),
        }
    }
}

impl WallpaperOptions {
    /// JSON endpoint for today's image
    pub fn daily_json_url(&self) -> String {
        format!("{}/img/4k?type=json", self.api_base)
    }

    /// JSON endpoint for another day's image
    pub fn dated_json_url(&self, day: &str) -> String {
        format!("{}/img/?date={day}&type=json", self.api_base)
    }

    /// Raw image for a day at a size such as `320x240` or `4k`
    pub fn image_url(&self, day: &str, size: &str) -> String {
        format!("{}/img/?date={day}&size={size}", self.api_base)
    }
}

#[derive(Default)]
struct WallpaperState {
    settings: WallpaperSettings,
    /// What the background shows right now; empty until something is shown
    current: String,
    /// Transitions in flight
    loading: u32,
    /// Bumped by every transition; only the newest may change the background
    latest_transition: u64,
    cache: RequestCache,
    active: ActiveRequests,
    history: Vec<HistoricalWallpaper>,
    history_page: usize,
}

struct Inner {
    platform: Platform,
    options: WallpaperOptions,
    records: RecordStore<WallpaperSettings>,
    state: RefCell<WallpaperState>,
    refresh: RefCell<Option<IntervalHandle>>,
    observer: RefCell<Option<Rc<dyn Fn(&str)>>>,
}

#[derive(Clone)]
pub struct WallpaperService {
    inner: Rc<Inner>,
}

impl WallpaperService {
    pub fn new(platform: Platform, options: WallpaperOptions) -> WallpaperService {
        let records = RecordStore::new(Rc::clone(&platform.store), Rc::clone(&platform.runtime));
        WallpaperService {
            inner: Rc::new(Inner {
                platform,
                options,
                records,
                state: RefCell::new(WallpaperState::default()),
                refresh: RefCell::new(None),
                observer: RefCell::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<WallpaperService> {
        weak.upgrade().map(|inner| WallpaperService { inner })
    }

    /// Called with the new background URL every time it changes
    pub fn on_display(&self, observer: impl Fn(&str) + 'static) {
        *self.inner.observer.borrow_mut() = Some(Rc::new(observer));
    }

    pub fn options(&self) -> &WallpaperOptions {
        &self.inner.options
    }

    pub fn current_wallpaper(&self) -> String {
        self.inner.state.borrow().current.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading > 0
    }

    pub fn settings(&self) -> WallpaperSettings {
        self.inner.state.borrow().settings.clone()
    }

    pub fn mode(&self) -> WallpaperMode {
        self.inner.state.borrow().settings.mode
    }

    pub fn has_active_request(&self, day: &str) -> bool {
        self.inner.state.borrow().active.is_active(day)
    }

    pub fn request_state(&self, day: &str) -> Option<RequestState> {
        self.inner.state.borrow().active.state(day)
    }

    pub fn has_cached(&self, day: &str) -> bool {
        self.inner.state.borrow().cache.contains(day, self.now())
    }

    /// Record `url` as the fetched image for `day`
    pub fn cache_request(&self, day: &str, url: &str) {
        let now = self.now();
        self.inner.state.borrow_mut().cache.insert(day, url, now);
    }

    /// Whether a network request for `day` would be issued right now
    pub fn should_request(&self, day: &str) -> bool {
        let now = self.now();
        let state = self.inner.state.borrow();
        !state.cache.contains(day, now) && !state.active.is_active(day)
    }

    fn now(&self) -> NaiveDateTime {
        self.inner.platform.runtime.now()
    }

    fn display(&self, url: &str) {
        self.inner.state.borrow_mut().current = url.to_string();
        let observer = self.inner.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(url);
        }
    }

    fn update_settings(&self, change: impl FnOnce(&mut WallpaperSettings)) {
        change(&mut self.inner.state.borrow_mut().settings);
    }

    /// Save the settings as they are now
    async fn persist(&self) -> bool {
        let snapshot = self.settings();
        self.inner.records.save(&snapshot).await
    }

    /// Load persisted settings and bring up the persisted mode
    pub async fn start(&self) {
        let settings = self.inner.records.load().await;
        self.inner.state.borrow_mut().settings = settings.clone();
        info!("wallpaper starting in {:?} mode", settings.mode);

        match settings.mode {
            WallpaperMode::Daily => {
                self.start_auto_refresh();
                self.ensure_todays_wallpaper().await;
            }
            WallpaperMode::Fixed => match self.fixed_url() {
                Some(url) => {
                    self.transition(&url, None).await;
                }
                None => debug!("fixed mode without a valid date, nothing to show"),
            },
            WallpaperMode::Local => {
                if !settings.local_data_uri.is_empty() {
                    self.transition(&settings.local_data_uri, None).await;
                }
            }
        }
    }

    /// Switch the wallpaper source, persisting the choice
    pub async fn set_mode(&self, mode: WallpaperMode) {
        let old = self.mode();
        if old == mode {
            return;
        }
        self.update_settings(|settings| settings.mode = mode);
        self.persist().await;
        self.on_mode_change(old, mode).await;
    }

    /// Side effects of leaving `old` and entering `new`
    pub async fn on_mode_change(&self, old: WallpaperMode, new: WallpaperMode) {
        if old == new {
            return;
        }
        info!("wallpaper mode {old:?} -> {new:?}");

        if old == WallpaperMode::Daily {
            self.stop_auto_refresh();
        }

        match new {
            WallpaperMode::Daily => {
                self.start_auto_refresh();
                self.ensure_todays_wallpaper().await;
            }
            WallpaperMode::Fixed => {
                if self.history().is_empty() {
                    self.load_history(0);
                }
            }
            WallpaperMode::Local => {}
        }
    }

    /// Follow wallpaper settings written by other tabs
    pub fn watch_external_changes(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.records.watch(move |settings: WallpaperSettings| {
            let Some(service) = WallpaperService::from_weak(&weak) else {
                return;
            };
            let old = service.mode();
            let new = settings.mode;
            service.inner.state.borrow_mut().settings = settings;

            if old != new {
                let runtime = Rc::clone(&service.inner.platform.runtime);
                runtime.spawn(Box::pin(async move {
                    service.on_mode_change(old, new).await;
                }));
            }
        });
    }

    /// Stop the timer and drop all transient request state
    pub fn teardown(&self) {
        self.stop_auto_refresh();
        self.inner.observer.borrow_mut().take();
        let mut state = self.inner.state.borrow_mut();
        state.cache.clear();
        state.active.clear();
        debug!("wallpaper service torn down");
    }
}
