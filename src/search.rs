/// Search bar: engines, URL detection and where a query should go
use url::Url;

/// A selectable search engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchEngine {
    pub id: &'static str,
    pub name: &'static str,
    /// Query endpoint and its parameter; `None` for the browser's own engine
    pub endpoint: Option<(&'static str, &'static str)>,
    pub icon: &'static str,
    pub fallback_icon: &'static str,
}

pub const BROWSER_DEFAULT: &str = "chrome-default";

pub const SEARCH_ENGINES: [SearchEngine; 6] = [
    SearchEngine {
        id: BROWSER_DEFAULT,
        name: "Default search engine",
        endpoint: None,
        icon: "",
        fallback_icon: "🔍",
    },
    SearchEngine {
        id: "google",
        name: "Google",
        endpoint: Some(("https://www.google.com/search", "q")),
        icon: "https://www.google.com/favicon.ico",
        fallback_icon: "🔍",
    },
    SearchEngine {
        id: "bing",
        name: "Bing",
        endpoint: Some(("https://www.bing.com/search", "q")),
        icon: "https://www.bing.com/favicon.ico",
        fallback_icon: "🅱️",
    },
    SearchEngine {
        id: "baidu",
        name: "Baidu",
        endpoint: Some(("https://www.baidu.com/s", "wd")),
        icon: "https://www.baidu.com/favicon.ico",
        fallback_icon: "🟦",
    },
    SearchEngine {
        id: "duckduckgo",
        name: "DuckDuckGo",
        endpoint: Some(("https://duckduckgo.com/", "q")),
        icon: "https://duckduckgo.com/favicon.ico",
        fallback_icon: "🦆",
    },
    SearchEngine {
        id: "yahoo",
        name: "Yahoo",
        endpoint: Some(("https://search.yahoo.com/search", "p")),
        icon: "https://search.yahoo.com/favicon.ico",
        fallback_icon: "🟣",
    },
];

/// Engine by id; unknown ids get the browser default
pub fn engine(id: &str) -> &'static SearchEngine {
    SEARCH_ENGINES
        .iter()
        .find(|engine| engine.id == id)
        .unwrap_or(&SEARCH_ENGINES[0])
}

/// What submitting the search bar should do
#[derive(Debug, Clone, PartialEq)]
pub enum SearchTarget {
    /// Open this address
    Navigate(String),
    /// Hand the text to the browser's default engine
    BrowserSearch(String),
}

fn with_scheme(text: &str) -> String {
    if text.starts_with("http") {
        text.to_string()
    } else {
        format!("https://{text}")
    }
}

/// Input that should be opened rather than searched for
pub fn is_url(text: &str) -> bool {
    let text = text.trim();
    text.contains('.') && Url::parse(&with_scheme(text)).is_ok()
}

/// Google query URL, used when the browser search API is unavailable
pub fn fallback_search_url(query: &str) -> Option<String> {
    query_url(&SEARCH_ENGINES[1], query)
}

fn query_url(engine: &SearchEngine, query: &str) -> Option<String> {
    let (base, param) = engine.endpoint?;
    Url::parse_with_params(base, &[(param, query)])
        .ok()
        .map(String::from)
}

/// Resolve the search bar input for the selected engine
pub fn resolve(query: &str, engine_id: &str) -> Option<SearchTarget> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    if is_url(query) {
        return Some(SearchTarget::Navigate(with_scheme(query)));
    }

    let engine = engine(engine_id);
    match query_url(engine, query) {
        Some(url) => Some(SearchTarget::Navigate(url)),
        None => Some(SearchTarget::BrowserSearch(query.to_string())),
    }
}
