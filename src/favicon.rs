/// Tag icons: hostnames, favicon service URLs and glyph fallbacks
use url::Url;

use crate::tag_groups::{DEFAULT_TAG_ICON, IconType, Tag};

/// Favicon URLs to try for a tag, best first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaviconSources {
    pub primary: String,
    pub fallbacks: Vec<String>,
}

impl FaviconSources {
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str())
            .filter(|primary| !primary.is_empty())
            .chain(self.fallbacks.iter().map(String::as_str))
    }
}

/// Lower-cased hostname of a tag URL, without port.
///
/// Bare hosts such as `github.com/rust` are accepted.
pub fn hostname(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let parsed = if url.contains("://") {
        Url::parse(url)
    } else {
        Url::parse(&format!("https://{url}"))
    };
    parsed
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .filter(|host| !host.is_empty())
}

/// Check if a string looks like an IP address
fn is_ip_address(s: &str) -> bool {
    s.starts_with('[')
        || (s.chars().next().is_some_and(|c| c.is_ascii_digit())
            && s.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

/// Whether favicon services on the public internet can know this host
fn is_public_host(host: &str) -> bool {
    host != "localhost" && !is_ip_address(host) && host.contains('.')
}

/// Short site name for tooltips, with `.co.uk` / `.com.au` style suffixes
/// kept whole: `news.bbc.co.uk` -> `bbc.co.uk`
pub fn site_domain(url: &str) -> Option<String> {
    hostname(url).map(|host| {
        if !is_public_host(&host) {
            return host;
        }

        let parts: Vec<&str> = host.split('.').collect();
        let tld = parts[parts.len() - 1];
        let keep = if parts.len() >= 3 && tld.len() == 2 && matches!(parts[parts.len() - 2], "co" | "com") {
            3
        } else {
            2
        };
        parts[parts.len().saturating_sub(keep)..].join(".")
    })
}

/// Favicon service candidates for `url`. Local and IP hosts only get the
/// site's own `/favicon.ico`.
pub fn favicon_sources(url: &str) -> FaviconSources {
    let Some(host) = hostname(url) else {
        return FaviconSources::default();
    };

    if !is_public_host(&host) {
        return FaviconSources {
            primary: format!("http://{host}/favicon.ico"),
            fallbacks: Vec::new(),
        };
    }

    FaviconSources {
        primary: format!("https://api.iowen.cn/favicon/{host}.png"),
        fallbacks: vec![
            format!("https://favicon.link/icon?url={host}"),
            format!("https://icon.horse/icon/{host}"),
            format!("https://www.google.com/s2/favicons?domain={host}&sz=32"),
            format!("https://favicon.yandex.net/favicon/v2/{host}?size=32"),
            format!("https://{host}/favicon.ico"),
        ],
    }
}

/// Text shown in a tag tile. Empty for icon kinds that render an image.
pub fn tag_glyph(tag: &Tag) -> String {
    match tag.icon_type {
        IconType::Emoji if tag.icon_value.is_empty() => DEFAULT_TAG_ICON.to_string(),
        IconType::Emoji => tag.icon_value.clone(),
        IconType::Text if tag.icon_value.is_empty() => tag
            .name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default(),
        IconType::Text => tag.icon_value.clone(),
        IconType::Image | IconType::Svg | IconType::Favicon => String::new(),
    }
}
