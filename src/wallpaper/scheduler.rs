/// Periodic check for a new calendar day while in daily mode
use std::rc::Rc;

use log::{debug, info};

use super::WallpaperService;
use crate::dates;
use crate::settings::WallpaperMode;

impl WallpaperService {
    /// Daily mode and no saved image, or the saved image is not today's
    pub fn needs_refresh(&self) -> bool {
        let today = dates::day_of(self.now());
        let state = self.inner.state.borrow();
        let settings = &state.settings;
        settings.mode == WallpaperMode::Daily
            && (settings.current_url.is_empty() || !dates::same_day(&settings.current_date, &today))
    }

    /// Check once per refresh interval whether the day rolled over.
    /// Replaces any running timer; does nothing outside daily mode.
    pub fn start_auto_refresh(&self) {
        if self.mode() != WallpaperMode::Daily {
            debug!("auto refresh only runs in daily mode");
            return;
        }
        self.stop_auto_refresh();

        let weak = Rc::downgrade(&self.inner);
        let runtime = Rc::clone(&self.inner.platform.runtime);
        let period = self.inner.options.refresh_interval_ms;

        let handle = runtime.every(
            period,
            Box::new(move || {
                let Some(service) = WallpaperService::from_weak(&weak) else {
                    return;
                };
                if !service.needs_refresh() {
                    return;
                }
                info!("day changed, refreshing wallpaper");
                let runtime = Rc::clone(&service.inner.platform.runtime);
                runtime.spawn(Box::pin(async move {
                    service.ensure_todays_wallpaper().await;
                }));
            }),
        );
        *self.inner.refresh.borrow_mut() = Some(handle);
        debug!("auto refresh every {period}ms");
    }

    pub fn stop_auto_refresh(&self) {
        if self.inner.refresh.borrow_mut().take().is_some() {
            debug!("auto refresh stopped");
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.inner.refresh.borrow().is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::WallpaperMode;
    use crate::testing::{Harness, at};
    use crate::wallpaper::tests::{TODAY_API, service};

    #[test]
    fn test_tick_after_midnight_fetches_new_image() {
        let h = Harness::starting_at(at(2024, 1, 15, 23, 59));
        h.http.respond_image_url(TODAY_API, "https://x/20240115.jpg");
        h.http.respond_image_url(TODAY_API, "https://x/20240116.jpg");
        let wallpaper = service(&h);
        h.block_on(wallpaper.start());
        assert!(!wallpaper.needs_refresh());

        h.runtime.set_now(at(2024, 1, 16, 0, 0));
        assert!(wallpaper.needs_refresh());
        h.runtime.fire_intervals();
        h.settle();

        assert_eq!(h.http.call_count(), 2);
        assert_eq!(wallpaper.current_wallpaper(), "https://x/20240116.jpg");
        assert_eq!(wallpaper.settings().current_date, "20240116");
    }

    #[test]
    fn test_tick_on_same_day_does_nothing() {
        let h = Harness::new();
        h.http.respond_image_url(TODAY_API, "https://x/20240115.jpg");
        let wallpaper = service(&h);
        h.block_on(wallpaper.start());

        h.runtime.set_now(at(2024, 1, 15, 18, 0));
        h.runtime.fire_intervals();
        h.settle();

        assert_eq!(h.http.call_count(), 1);
    }

    #[test]
    fn test_not_started_outside_daily_mode() {
        let h = Harness::new();
        let wallpaper = service(&h);
        h.block_on(wallpaper.set_mode(WallpaperMode::Local));

        wallpaper.start_auto_refresh();

        assert!(!wallpaper.is_auto_refreshing());
        assert_eq!(h.runtime.active_intervals(), 0);
        assert!(!wallpaper.needs_refresh());
    }

    #[test]
    fn test_restart_replaces_timer() {
        let h = Harness::new();
        let wallpaper = service(&h);

        wallpaper.start_auto_refresh();
        wallpaper.start_auto_refresh();

        assert_eq!(h.runtime.active_intervals(), 1);
        wallpaper.stop_auto_refresh();
        assert_eq!(h.runtime.active_intervals(), 0);
    }

    #[test]
    fn test_dropping_service_cancels_timer() {
        let h = Harness::new();
        let wallpaper = service(&h);
        wallpaper.start_auto_refresh();
        assert_eq!(h.runtime.active_intervals(), 1);

        drop(wallpaper);

        assert_eq!(h.runtime.active_intervals(), 0);
        h.runtime.fire_intervals();
        assert_eq!(h.http.call_count(), 0);
    }
}
