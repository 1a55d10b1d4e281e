/// Browsing past days' images and pinning one as a fixed wallpaper
use chrono::NaiveDate;
use log::{debug, info, warn};

use super::{WallpaperOptions, WallpaperService};
use crate::dates;
use crate::error::WallpaperError;
use crate::settings::WallpaperMode;

/// One past day's image in the history picker
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalWallpaper {
    pub date: String,
    pub preview_url: String,
    pub full_url: String,
    /// `YYYY-MM-DD`
    pub display_date: String,
}

impl HistoricalWallpaper {
    pub fn for_day(options: &WallpaperOptions, day: NaiveDate) -> HistoricalWallpaper {
        let date = dates::format_day(day);
        HistoricalWallpaper {
            preview_url: options.image_url(&date, &options.preview_size),
            full_url: options.image_url(&date, &options.full_size),
            display_date: day.format("%Y-%m-%d").to_string(),
            date,
        }
    }
}

/// Page `page` of the history, newest first, starting the day before `today`.
/// Days that would fall before the supported range are left out.
pub fn history_page(options: &WallpaperOptions, today: NaiveDate, page: usize) -> Vec<HistoricalWallpaper> {
    let size = options.history_page_size;
    let first = page * size + 1;

    (first..first + size)
        .filter_map(|offset| dates::days_before(today, offset as u64))
        .filter(|day| dates::is_valid_day(&dates::format_day(*day)))
        .map(|day| HistoricalWallpaper::for_day(options, day))
        .collect()
}

impl WallpaperService {
    pub fn history(&self) -> Vec<HistoricalWallpaper> {
        self.inner.state.borrow().history.clone()
    }

    /// Replace the history list with page `page` (`0` restarts the list)
    pub fn load_history(&self, page: usize) {
        let today = self.now().date();
        let entries = history_page(&self.inner.options, today, page);
        debug!("loaded history page {page} ({} entries)", entries.len());

        let mut state = self.inner.state.borrow_mut();
        if page == 0 {
            state.history = entries;
        } else {
            state.history.extend(entries);
        }
        state.history_page = page;
    }

    /// Append the next page of history
    pub fn load_more_history(&self) {
        let next = self.inner.state.borrow().history_page + 1;
        self.load_history(next);
    }

    /// Full-size URL for the pinned day, if one is set and valid
    pub fn fixed_url(&self) -> Option<String> {
        let fixed_date = self.inner.state.borrow().settings.fixed_date.clone();
        let options = &self.inner.options;
        dates::is_valid_day(&fixed_date).then(|| options.image_url(&fixed_date, &options.full_size))
    }

    /// Pin `entry` as the wallpaper. The choice is saved only once the
    /// image is on screen.
    pub async fn select_fixed(&self, entry: &HistoricalWallpaper) -> Result<(), WallpaperError> {
        if !dates::is_valid_day(&entry.date) {
            return Err(WallpaperError::InvalidDate(entry.date.clone()));
        }

        let outcome = self.transition(&entry.full_url, Some(&entry.preview_url)).await;
        if !outcome.is_displayed() {
            warn!("historical wallpaper for {} could not be shown", entry.date);
            return Err(WallpaperError::Undisplayable(entry.full_url.clone()));
        }

        let old = self.mode();
        self.update_settings(|settings| {
            settings.mode = WallpaperMode::Fixed;
            settings.fixed_date = entry.date.clone();
        });
        self.persist().await;
        info!("wallpaper pinned to {}", entry.date);
        self.on_mode_change(old, WallpaperMode::Fixed).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WALLPAPER_KEY;
    use crate::testing::Harness;
    use crate::wallpaper::tests::service;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_page_starts_yesterday() {
        let options = WallpaperOptions::default();
        let page = history_page(&options, day(2024, 3, 2), 0);

        assert_eq!(page.len(), 10);
        assert_eq!(page[0].date, "20240301");
        assert_eq!(page[1].date, "20240229");
        assert_eq!(page[1].display_date, "2024-02-29");
        assert_eq!(
            page[0].preview_url,
            "https://bing.ee123.net/img/?date=20240301&size=320x240"
        );
        assert_eq!(page[0].full_url, "https://bing.ee123.net/img/?date=20240301&size=4k");
        assert_eq!(page[9].date, "20240221");
    }

    #[test]
    fn test_second_page_continues() {
        let options = WallpaperOptions::default();
        let page = history_page(&options, day(2024, 1, 15), 1);

        assert_eq!(page[0].date, "20240104");
        assert_eq!(page[9].date, "20231226");
    }

    #[test]
    fn test_page_stops_at_supported_range() {
        let options = WallpaperOptions::default();
        let page = history_page(&options, day(1900, 1, 5), 0);

        assert_eq!(page.len(), 4);
        assert_eq!(page.last().unwrap().date, "19000101");
    }

    #[test]
    fn test_load_more_appends() {
        let h = Harness::new();
        let wallpaper = service(&h);

        wallpaper.load_history(0);
        wallpaper.load_more_history();

        let history = wallpaper.history();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].date, "20240114");
        assert_eq!(history[19].date, "20231226");

        wallpaper.load_history(0);
        assert_eq!(wallpaper.history().len(), 10);
    }

    #[test]
    fn test_select_fixed_persists_after_display() {
        let h = Harness::new();
        let wallpaper = service(&h);
        let entry = HistoricalWallpaper::for_day(wallpaper.options(), day(2023, 12, 25));

        h.block_on(wallpaper.select_fixed(&entry)).unwrap();

        assert_eq!(wallpaper.current_wallpaper(), entry.full_url);
        assert_eq!(wallpaper.mode(), WallpaperMode::Fixed);
        assert_eq!(wallpaper.fixed_url(), Some(entry.full_url.clone()));
        let stored = h.store.value(WALLPAPER_KEY).unwrap();
        assert_eq!(stored["mode"], "fixed");
        assert_eq!(stored["fixedDate"], "20231225");
        assert!(!wallpaper.is_auto_refreshing());
    }

    #[test]
    fn test_select_fixed_falls_back_to_preview() {
        let h = Harness::new();
        let wallpaper = service(&h);
        let entry = HistoricalWallpaper::for_day(wallpaper.options(), day(2023, 12, 25));
        h.images.break_url(&entry.full_url);

        h.block_on(wallpaper.select_fixed(&entry)).unwrap();

        assert_eq!(wallpaper.current_wallpaper(), entry.preview_url);
        assert_eq!(wallpaper.mode(), WallpaperMode::Fixed);
    }

    #[test]
    fn test_select_fixed_not_saved_when_not_shown() {
        let h = Harness::new();
        let wallpaper = service(&h);
        h.block_on(wallpaper.transition("https://x/shown.jpg", None));
        let entry = HistoricalWallpaper::for_day(wallpaper.options(), day(2023, 12, 25));
        h.images.break_url(&entry.full_url);
        h.images.break_url(&entry.preview_url);

        let result = h.block_on(wallpaper.select_fixed(&entry));

        assert!(matches!(result, Err(WallpaperError::Undisplayable(_))));
        assert_eq!(wallpaper.current_wallpaper(), "https://x/shown.jpg");
        assert_eq!(wallpaper.mode(), WallpaperMode::Daily);
        assert!(h.store.value(WALLPAPER_KEY).is_none());
    }

    #[test]
    fn test_select_fixed_rejects_bad_date() {
        let h = Harness::new();
        let wallpaper = service(&h);
        let mut entry = HistoricalWallpaper::for_day(wallpaper.options(), day(2023, 12, 25));
        entry.date = "2023-12-25".to_string();

        let result = h.block_on(wallpaper.select_fixed(&entry));

        assert_eq!(result, Err(WallpaperError::InvalidDate("2023-12-25".to_string())));
        assert!(h.images.loads().is_empty());
    }

    #[test]
    fn test_fixed_url_requires_valid_date() {
        let h = Harness::new();
        let wallpaper = service(&h);
        assert_eq!(wallpaper.fixed_url(), None);
    }
}
