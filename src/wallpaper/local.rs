/// User-uploaded wallpapers
use log::{info, warn};

use super::WallpaperService;
use crate::error::WallpaperError;
use crate::platform::ImageFile;
use crate::settings::WallpaperMode;

/// Largest accepted upload, 10MB
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Check an upload's type and size before reading it
pub fn validate_upload(mime_type: &str, size: u64, limit: u64) -> Result<(), WallpaperError> {
    if !mime_type.starts_with("image/") {
        return Err(WallpaperError::NotAnImage(mime_type.to_string()));
    }
    if size > limit {
        return Err(WallpaperError::TooLarge { size, limit });
    }
    Ok(())
}

impl WallpaperService {
    /// Show `file` as the wallpaper and switch to local mode. Settings are
    /// left untouched unless the image ends up on screen.
    pub async fn upload_local(&self, file: &dyn ImageFile) -> Result<(), WallpaperError> {
        validate_upload(&file.mime_type(), file.size(), self.inner.options.max_upload_bytes)?;

        let data_uri = file.read_data_uri().await?;
        let outcome = self.transition(&data_uri, None).await;
        if !outcome.is_displayed() {
            warn!("uploaded wallpaper could not be shown ({outcome:?})");
            return Err(WallpaperError::Undisplayable("uploaded image".to_string()));
        }

        let old = self.mode();
        self.update_settings(|settings| {
            settings.mode = WallpaperMode::Local;
            settings.local_data_uri = data_uri;
        });
        self.persist().await;
        info!("local wallpaper set ({} bytes)", file.size());
        self.on_mode_change(old, WallpaperMode::Local).await;
        Ok(())
    }
}
