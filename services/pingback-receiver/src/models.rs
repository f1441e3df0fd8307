// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Data models for pingback history and the content items it refers to

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An accepted pingback, recorded exactly once at acceptance time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingbackHistory {
    /// Unique record identifier
    pub id: Uuid,
    /// Host of the source URL, without a leading `www.`
    pub domain: String,
    /// Full source URL
    pub source_url: String,
    /// Title of the source document as examined
    pub source_title: String,
    /// Identity of the local content item being linked to
    pub target_post_id: Uuid,
    /// Title of the local content item (denormalized)
    pub target_post_title: String,
    /// Network address the pingback was submitted from
    pub requester_address: String,
    /// Acceptance timestamp
    pub accepted_at: DateTime<Utc>,
}

impl PingbackHistory {
    /// Build a new record for an accepted pingback.
    ///
    /// `accepted_at` is kept to microseconds, the precision it is stored at.
    pub fn new(request: &PingRequest, target: &ResolvedTarget, requester_address: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: extract_domain(&request.source_url),
            source_url: request.source_url.clone(),
            source_title: request.source_document.title.clone(),
            target_post_id: target.id,
            target_post_title: target.title.clone(),
            requester_address: requester_address.to_string(),
            accepted_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// What examining the source document revealed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocumentInfo {
    /// Inner text of the first `<title>` element, trimmed
    pub title: String,
    /// The title text itself contains something tag-shaped
    pub contains_html: bool,
    /// The fetched body contains the target URL (case-insensitive)
    pub source_has_link: bool,
}

impl SourceDocumentInfo {
    /// Outcome used when the source could not be fetched at all.
    pub fn unreachable() -> Self {
        Self::default()
    }
}

/// A validated pingback claim together with what was found at its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingRequest {
    pub source_url: String,
    pub target_url: String,
    pub source_document: SourceDocumentInfo,
}

/// A content item that a target URL resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub id: Uuid,
    pub title: String,
}

/// A locally owned content item, as far as pingback resolution cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub pub_date: NaiveDate,
    pub is_published: bool,
    pub is_deleted: bool,
}

impl Post {
    /// A published, live post.
    pub fn published(slug: impl Into<String>, title: impl Into<String>, pub_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slug.into(),
            title: title.into(),
            pub_date,
            is_published: true,
            is_deleted: false,
        }
    }
}

/// Extract the domain of a source URL: the text between `://` and the next
/// `/`, with a leading `www.` removed.
///
/// A URL without a `/` after the host yields the whole remainder; a URL
/// without a scheme separator is taken as starting at the host.
pub fn extract_domain(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split('/').next().unwrap_or(rest);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
