//! Image path derivation.
//!
//! Images land under `<base>/<YYYY>/<MM>/<file>` in the content repository. The file name is
//! derived from the session id and its creation time, so re-running the same upload targets
//! the same path while a later session in the same thread gets a fresh one.

use chrono::{DateTime, Datelike, Utc};

/// Where images live in the repository and how the site addresses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayout {
    /// Repository directory holding images, without trailing slash
    pub base_path: String,
    /// Prefix prepended to `YYYY/MM/<file>` when stored in `Entry.image_path`
    pub site_prefix: String,
}

/// Both forms of an image location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePath {
    /// Path inside the content repository
    pub repo_path: String,
    /// Site-relative path stored in the index
    pub site_path: String,
}

impl ImageLayout {
    pub fn new(base_path: impl Into<String>, site_prefix: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into().trim_end_matches('/').to_string(),
            site_prefix: site_prefix.into(),
        }
    }

    pub fn image_path_for(
        &self,
        created_at: DateTime<Utc>,
        session_id: &str,
        display_name: &str,
        media_type: &str,
    ) -> ImagePath {
        let (stem, ext) = split_name(display_name);
        let ext = ext.unwrap_or_else(|| extension_for(media_type));

        let session = sanitize(session_id);
        let prefix = if session.is_empty() {
            created_at.timestamp().to_string()
        } else {
            format!("{session}-{}", created_at.timestamp())
        };
        let stem = sanitize(stem);
        let file = if stem.is_empty() {
            format!("{prefix}.{ext}")
        } else {
            format!("{prefix}-{stem}.{ext}")
        };
        let relative = format!(
            "{:04}/{:02}/{}",
            created_at.year(),
            created_at.month(),
            file
        );

        let repo_path = if self.base_path.is_empty() {
            relative.clone()
        } else {
            format!("{}/{}", self.base_path, relative)
        };
        ImagePath {
            repo_path,
            site_path: format!("{}{}", self.site_prefix, relative),
        }
    }

    /// Maps a site path from the index back to the repository path.
    ///
    /// Returns `None` when the site path does not carry this layout's prefix.
    pub fn repo_path_for_site_path(&self, site_path: &str) -> Option<String> {
        let relative = site_path.strip_prefix(self.site_prefix.as_str())?;
        if relative.is_empty() {
            return None;
        }
        Some(if self.base_path.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.base_path, relative)
        })
    }
}

fn split_name(display_name: &str) -> (&str, Option<String>) {
    let name = display_name.rsplit(['/', '\\']).next().unwrap_or(display_name);
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

fn extension_for(media_type: &str) -> String {
    let media_type = media_type.trim().to_ascii_lowercase();
    match media_type.as_str() {
        "image/jpeg" | "image/jpg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/gif" => "gif".to_string(),
        "image/webp" => "webp".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map_or_else(|| "bin".to_string(), |ext| (*ext).to_string()),
    }
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_partitions_by_year_and_month() {
        let layout = ImageLayout::new("static/images/", "/images/");
        let path = layout.image_path_for(at(), "1700000000.123456", "My Photo.PNG", "image/png");
        assert_eq!(
            path.repo_path,
            "static/images/2024/03/1700000000-123456-1709985600-my-photo.png"
        );
        assert_eq!(
            path.site_path,
            "/images/2024/03/1700000000-123456-1709985600-my-photo.png"
        );
    }

    #[test]
    fn test_extension_from_media_type() {
        let layout = ImageLayout::new("images", "");
        let path = layout.image_path_for(at(), "t1", "clipboard", "image/webp");
        assert_eq!(path.repo_path, "images/2024/03/t1-1709985600-clipboard.webp");
        assert_eq!(path.site_path, "2024/03/t1-1709985600-clipboard.webp");
    }

    #[test]
    fn test_same_inputs_give_same_path() {
        let layout = ImageLayout::new("images", "");
        let a = layout.image_path_for(at(), "t1", "x.jpg", "image/jpeg");
        let b = layout.image_path_for(at(), "t1", "x.jpg", "image/jpeg");
        assert_eq!(a, b);
    }

    #[test]
    fn test_later_session_in_same_thread_gets_new_path() {
        let layout = ImageLayout::new("images", "");
        let first = layout.image_path_for(at(), "t1", "image.png", "image/png");
        let later = layout.image_path_for(at() + chrono::Duration::days(8), "t1", "image.png", "image/png");
        assert_eq!(later.repo_path, "images/2024/03/t1-1710676800-image.png");
        assert_ne!(first.site_path, later.site_path);
    }

    #[test]
    fn test_blank_session_and_name_still_yield_a_file() {
        let layout = ImageLayout::new("images", "");
        let path = layout.image_path_for(at(), "::", "", "image/png");
        assert_eq!(path.repo_path, "images/2024/03/1709985600.png");
    }

    #[test]
    fn test_site_path_maps_back_to_repo_path() {
        let layout = ImageLayout::new("static/images", "/images/");
        assert_eq!(
            layout.repo_path_for_site_path("/images/2024/01/x.webp").as_deref(),
            Some("static/images/2024/01/x.webp")
        );
        assert_eq!(layout.repo_path_for_site_path("/other/x.webp"), None);
    }
}
