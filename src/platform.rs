/// Seams between the dashboard logic and the browser.
///
/// Everything the dashboard needs from the outside world goes through one of
/// these traits: the browser implementations live in `web.rs`, the tests
/// use in-memory fakes. All of them are single-threaded (`?Send`).
use std::any::Any;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::error::{StoreError, WallpaperError};

/// Key-value store holding JSON-shaped records under fixed keys
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Register a callback for changes made to `key` elsewhere
    fn on_change(&self, key: &str, callback: Box<dyn Fn(Value)>);
}

/// A finished HTTP exchange, before any status or body validation
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> HttpResponse {
        HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait(?Send)]
pub trait HttpClient {
    /// GET `url`. Errors are transport failures only; a non-2xx status is
    /// still an `Ok` response.
    async fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// Off-screen image loading, used to verify a URL renders before showing it
#[async_trait(?Send)]
pub trait ImageLoader {
    async fn load(&self, url: &str) -> Result<(), String>;
}

/// Keeps a repeating timer alive; dropping it cancels the timer
pub struct IntervalHandle(Box<dyn Any>);

impl IntervalHandle {
    pub fn new(inner: impl Any) -> IntervalHandle {
        IntervalHandle(Box::new(inner))
    }
}

/// Clock, timers and task spawning of the event loop
#[async_trait(?Send)]
pub trait Runtime {
    /// Local wall-clock time
    fn now(&self) -> NaiveDateTime;

    async fn sleep(&self, ms: u32);

    fn every(&self, ms: u32, tick: Box<dyn Fn()>) -> IntervalHandle;

    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// A user-picked file that should become the wallpaper
#[async_trait(?Send)]
pub trait ImageFile {
    fn mime_type(&self) -> String;

    fn size(&self) -> u64;

    /// The file contents as a `data:` URI
    async fn read_data_uri(&self) -> Result<String, WallpaperError>;
}

/// The set of platform services handed to the dashboard modules
#[derive(Clone)]
pub struct Platform {
    pub store: Rc<dyn KeyValueStore>,
    pub http: Rc<dyn HttpClient>,
    pub images: Rc<dyn ImageLoader>,
    pub runtime: Rc<dyn Runtime>,
}
