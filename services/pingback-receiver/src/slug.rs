// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Canonical content URL parsing and target resolution.
//!
//! Content lives at `.../post/{yyyy}/{MM}/{dd}/{slug}`.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::error::Result;
use crate::models::ResolvedTarget;
use crate::store::ContentResolver;

static POST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://.*/post/(\d{4})/(\d{1,2})/(\d{1,2})/([^/]+)$")
        .expect("post URL pattern is valid")
});

/// A target URL that cannot name a content item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("Not a canonical post URL: {0}")]
    Format(String),

    #[error("Invalid publish date {year}-{month}-{day} in {url}")]
    InvalidDate {
        url: String,
        year: i32,
        month: u32,
        day: u32,
    },
}

/// Publish date and slug decoded from a canonical post URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugInfo {
    pub pub_date: NaiveDate,
    pub slug: String,
}

impl SlugInfo {
    /// Parse a canonical post URL.
    pub fn parse(url: &str) -> std::result::Result<Self, SlugError> {
        let format_error = || SlugError::Format(url.to_string());
        let caps = POST_URL.captures(url).ok_or_else(format_error)?;

        let year: i32 = caps[1].parse().map_err(|_| format_error())?;
        let month: u32 = caps[2].parse().map_err(|_| format_error())?;
        let day: u32 = caps[3].parse().map_err(|_| format_error())?;

        let pub_date =
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| SlugError::InvalidDate {
                url: url.to_string(),
                year,
                month,
                day,
            })?;

        Ok(Self {
            pub_date,
            slug: caps[4].to_string(),
        })
    }

    /// The canonical path, `post/{yyyy}/{MM}/{dd}/{slug}`.
    pub fn to_path(&self) -> String {
        format!(
            "post/{:04}/{:02}/{:02}/{}",
            self.pub_date.year(),
            self.pub_date.month(),
            self.pub_date.day(),
            self.slug
        )
    }
}

/// Outcome of resolving a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedTarget),
    NotFound,
    Unparseable(SlugError),
}

/// Resolve a target URL to a published, non-deleted content item.
///
/// Only store faults are errors; an unparseable URL or a missing item are
/// ordinary outcomes.
pub async fn resolve_target<C>(content: &C, target_url: &str) -> Result<Resolution>
where
    C: ContentResolver + ?Sized,
{
    let info = match SlugInfo::parse(target_url) {
        Ok(info) => info,
        Err(e) => {
            debug!(target = %target_url, error = %e, "Target is not a post URL");
            return Ok(Resolution::Unparseable(e));
        }
    };

    match content
        .resolve_by_date_and_slug(info.pub_date, &info.slug)
        .await?
    {
        Some(target) => {
            debug!(target = %target_url, post_id = %target.id, "Target resolved");
            Ok(Resolution::Found(target))
        }
        None => {
            debug!(target = %target_url, slug = %info.slug, "No published post matches target");
            Ok(Resolution::NotFound)
        }
    }
}
