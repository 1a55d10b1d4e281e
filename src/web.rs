/// Browser implementations of the platform seams
use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use gloo::storage::{LocalStorage, Storage, errors::StorageError};
use gloo::timers::callback::Interval;
use gloo::timers::future::TimeoutFuture;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{HtmlImageElement, Request, RequestInit, RequestMode, Response};

use crate::error::{StoreError, WallpaperError};
use crate::platform::{
    HttpClient, HttpResponse, ImageFile, ImageLoader, IntervalHandle, KeyValueStore, Platform,
    Runtime,
};
use crate::search::fallback_search_url;
use crate::storage::FallbackStore;

// Import JS bridge functions
#[wasm_bindgen(module = "/newtab.js")]
extern "C" {
    fn hasSyncStorage() -> bool;

    #[wasm_bindgen(catch)]
    async fn storageGet(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSet(key: &str, value: JsValue) -> Result<(), JsValue>;

    fn onStorageChange(key: &str, callback: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn browserSearch(text: &str) -> Result<(), JsValue>;
}

fn js_error(e: JsValue) -> String {
    e.as_string()
        .or_else(|| e.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
        .unwrap_or_else(|| format!("{e:?}"))
}

fn to_js(value: &Value) -> Result<JsValue, StoreError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_js(value: JsValue) -> Result<Option<Value>, StoreError> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    serde_wasm_bindgen::from_value(value)
        .map(Some)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// `chrome.storage.sync`
pub struct ChromeSyncStore;

#[async_trait(?Send)]
impl KeyValueStore for ChromeSyncStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let value = storageGet(key)
            .await
            .map_err(|e| StoreError::Backend(js_error(e)))?;
        from_js(value)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        storageSet(key, to_js(&value)?)
            .await
            .map_err(|e| StoreError::Backend(js_error(e)))
    }

    fn on_change(&self, key: &str, callback: Box<dyn Fn(Value)>) {
        let owned_key = key.to_string();
        let listener = Closure::<dyn Fn(JsValue)>::new(move |value: JsValue| match from_js(value) {
            Ok(Some(value)) => callback(value),
            Ok(None) => debug!("{owned_key} removed in another tab"),
            Err(e) => warn!("ignoring change to {owned_key}: {e}"),
        });
        onStorageChange(key, listener.as_ref().unchecked_ref());
        // Listens for the lifetime of the page
        listener.forget();
    }
}

/// `window.localStorage`, used when sync storage is missing or failing
pub struct LocalStore;

#[async_trait(?Send)]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match LocalStorage::get::<Value>(key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        LocalStorage::set(key, value).map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn on_change(&self, key: &str, _callback: Box<dyn Fn(Value)>) {
        debug!("local storage does not report changes to {key}");
    }
}

/// `window.fetch`
pub struct FetchHttp;

#[async_trait(?Send)]
impl HttpClient for FetchHttp {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let window = web_sys::window().ok_or("no window")?;

        let init = RequestInit::new();
        init.set_method("GET");
        init.set_mode(RequestMode::Cors);
        let request = Request::new_with_str_and_init(url, &init).map_err(js_error)?;

        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let body = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;

        Ok(HttpResponse {
            status: response.status(),
            status_text: response.status_text(),
            body: body.as_string().unwrap_or_default(),
        })
    }
}

type LoadResult = Result<(), String>;

/// An image element being loaded. Dropping it detaches the handlers, so a
/// timed-out load cannot call into freed closures.
struct PendingImage {
    image: HtmlImageElement,
    onload: Closure<dyn FnMut()>,
    onerror: Closure<dyn FnMut()>,
}

impl Drop for PendingImage {
    fn drop(&mut self) {
        self.image.set_onload(None);
        self.image.set_onerror(None);
    }
}

/// Loads images through an off-screen `<img>`
pub struct DomImageLoader;

#[async_trait(?Send)]
impl ImageLoader for DomImageLoader {
    async fn load(&self, url: &str) -> Result<(), String> {
        let image = HtmlImageElement::new().map_err(js_error)?;
        let (tx, rx) = oneshot::channel::<LoadResult>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let settle = |result: LoadResult| {
            let tx = Rc::clone(&tx);
            let mut result = Some(result);
            Closure::<dyn FnMut()>::new(move || {
                if let (Some(tx), Some(result)) = (tx.borrow_mut().take(), result.take()) {
                    let _ = tx.send(result);
                }
            })
        };

        let pending = PendingImage {
            onload: settle(Ok(())),
            onerror: settle(Err(format!("failed to load {url}"))),
            image,
        };
        pending
            .image
            .set_onload(Some(pending.onload.as_ref().unchecked_ref()));
        pending
            .image
            .set_onerror(Some(pending.onerror.as_ref().unchecked_ref()));
        pending.image.set_src(url);

        let result = rx.await.map_err(|_| format!("image load of {url} was abandoned"))?;
        drop(pending);
        result
    }
}

/// Timers and tasks on the page's event loop
pub struct BrowserRuntime;

#[async_trait(?Send)]
impl Runtime for BrowserRuntime {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, ms: u32) {
        TimeoutFuture::new(ms).await;
    }

    fn every(&self, ms: u32, tick: Box<dyn Fn()>) -> IntervalHandle {
        IntervalHandle::new(Interval::new(ms, move || tick()))
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        spawn_local(task);
    }
}

/// A file picked in an `<input type="file">`
pub struct BrowserFile(gloo::file::File);

impl From<web_sys::File> for BrowserFile {
    fn from(file: web_sys::File) -> Self {
        BrowserFile(gloo::file::File::from(file))
    }
}

#[async_trait(?Send)]
impl ImageFile for BrowserFile {
    fn mime_type(&self) -> String {
        self.0.raw_mime_type()
    }

    fn size(&self) -> u64 {
        self.0.size()
    }

    async fn read_data_uri(&self) -> Result<String, WallpaperError> {
        gloo::file::futures::read_as_data_url(&self.0)
            .await
            .map_err(|e| WallpaperError::FileRead(e.to_string()))
    }
}

/// Platform services for the new tab page. Sync storage falls back to
/// local storage when the extension API is missing or failing.
pub fn platform() -> Platform {
    let local: Rc<dyn KeyValueStore> = Rc::new(LocalStore);
    let store: Rc<dyn KeyValueStore> = if hasSyncStorage() {
        Rc::new(FallbackStore::new(Rc::new(ChromeSyncStore), local))
    } else {
        warn!("chrome.storage.sync unavailable, settings stay in this browser");
        local
    };

    Platform {
        store,
        http: Rc::new(FetchHttp),
        images: Rc::new(DomImageLoader),
        runtime: Rc::new(BrowserRuntime),
    }
}

/// Open `url` in the current tab
pub fn navigate(url: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.location().set_href(url) {
        warn!("navigation to {url} failed: {}", js_error(e));
    }
}

/// Search with the browser's default engine, or Google when the
/// extension search API is unavailable
pub async fn browser_search(text: &str) {
    if let Err(e) = browserSearch(text).await {
        warn!("browser search failed, falling back to Google: {}", js_error(e));
        if let Some(url) = fallback_search_url(text) {
            navigate(&url);
        }
    }
}

/// Milliseconds on the page clock
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}
