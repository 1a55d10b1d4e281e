/// Persisted dashboard and wallpaper settings
use serde::{Deserialize, Serialize};

use crate::storage::VersionedRecord;

pub const SETTINGS_KEY: &str = "FRESH_TAB_SETTING";
pub const WALLPAPER_KEY: &str = "FRESH_TAB_WALLPAPER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

/// Dashboard settings (the settings panel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub version: String,
    pub show_bookmarks: bool,
    pub display_width: u32,
    pub columns_per_row: u32,
    pub bookmark_size: BookmarkSize,
    pub show_search: bool,
    pub search_engine: String,
    pub theme: Theme,
    pub is_dark_mode: bool,
    pub show_time: bool,
    pub time_format: TimeFormat,
    pub show_date: bool,
    pub show_seconds: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: Settings::VERSION.to_string(),
            show_bookmarks: true,
            display_width: 1200,
            columns_per_row: 6,
            bookmark_size: BookmarkSize::Medium,
            show_search: true,
            search_engine: "chrome-default".to_string(),
            theme: Theme::Auto,
            is_dark_mode: false,
            show_time: true,
            time_format: TimeFormat::TwentyFourHour,
            show_date: true,
            show_seconds: false,
        }
    }
}

impl VersionedRecord for Settings {
    const KEY: &'static str = SETTINGS_KEY;
    const VERSION: &'static str = "1";
}

/// Where the wallpaper comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WallpaperMode {
    /// Remote image of the day, refreshed at day boundaries
    #[default]
    #[serde(rename = "bing")]
    Daily,
    /// A chosen past day's image
    #[serde(rename = "fixed")]
    Fixed,
    /// A user-uploaded image
    #[serde(rename = "local")]
    Local,
}

/// Persisted wallpaper state.
///
/// In daily mode `current_date` is the day `current_url` was fetched for;
/// a different day means the cached URL is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperSettings {
    pub version: String,
    pub mode: WallpaperMode,
    pub current_url: String,
    pub current_date: String,
    pub local_data_uri: String,
    pub fixed_date: String,
}

impl WallpaperSettings {
    pub fn has_daily_for(&self, day: &str) -> bool {
        !self.current_url.is_empty() && self.current_date == day
    }
}

impl Default for WallpaperSettings {
    fn default() -> Self {
        WallpaperSettings {
            version: WallpaperSettings::VERSION.to_string(),
            mode: WallpaperMode::Daily,
            current_url: String::new(),
            current_date: String::new(),
            local_data_uri: String::new(),
            fixed_date: String::new(),
        }
    }
}

impl VersionedRecord for WallpaperSettings {
    const KEY: &'static str = WALLPAPER_KEY;
    const VERSION: &'static str = "1";
}
