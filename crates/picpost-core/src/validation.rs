//! Parsing and normalization of wizard input.
//!
//! All functions here are pure. Failures are reported as [`ValidationError`] and never
//! escalate past the flow controller.

use crate::error::ValidationError;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat markup around a URL: `<https://example.com>` or `<https://example.com|example.com>`.
static LINK_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([^|>]+)(?:\|[^>]*)?>$").expect("link wrapper regex is valid"));

/// The literal users type to leave an optional field empty.
pub const OMIT_LITERAL: &str = "no";

/// A validated calendar date.
///
/// Only the month (1..=12) and day (1..=31) ranges are checked, so `2024/02/31` is
/// representable on purpose and this type is not backed by [`NaiveDate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year().clamp(0, 9999) as u16,
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }

    /// The form stored in the entry index (`YYYY-MM-DD`).
    pub fn to_entry_format(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// Parses a date typed by the user.
///
/// Non-digits are stripped first. Eight digits read as `YYYYMMDD`; four digits read as
/// `MMDD` in the year of `today`. Anything else is invalid.
pub fn validate_date(input: &str, today: NaiveDate) -> Result<CalendarDate, ValidationError> {
    let invalid = || ValidationError::InvalidDate {
        input: input.to_string(),
    };
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    let (year, rest) = match digits.len() {
        8 => (digits[..4].parse::<u16>().map_err(|_| invalid())?, &digits[4..]),
        4 => (today.year().clamp(0, 9999) as u16, digits.as_str()),
        _ => return Err(invalid()),
    };
    let month: u8 = rest[..2].parse().map_err(|_| invalid())?;
    let day: u8 = rest[2..4].parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }

    Ok(CalendarDate { year, month, day })
}

/// Parses an optional link.
///
/// Returns `Ok(None)` for empty input or the omit literal. A chat hyperlink wrapper is removed
/// before parsing; the remaining text must be an absolute http(s) URL and is returned as typed.
pub fn validate_link(input: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(OMIT_LITERAL) {
        return Ok(None);
    }

    let candidate = LINK_WRAPPER
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
        .trim();

    match Url::parse(candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(Some(candidate.to_string()))
        }
        _ => Err(ValidationError::InvalidLink {
            input: input.to_string(),
        }),
    }
}

/// Normalizes a title. The omit literal (any case) becomes an empty title.
pub fn normalize_title(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case(OMIT_LITERAL) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Only `image/*` attachments may start a session.
pub fn validate_image_media_type(media_type: &str) -> Result<(), ValidationError> {
    if media_type.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedMedia {
            media_type: media_type.to_string(),
        })
    }
}
