// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Source document examination.
//!
//! Fetches the page that claims to link to us and inspects it with plain
//! pattern matching (no HTML parser): the first `<title>`, whether that
//! title is itself tag-shaped, and whether the target URL appears anywhere
//! in the body.

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, warn};

use crate::config::PingbackConfig;
use crate::models::SourceDocumentInfo;

static TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern is valid")
});

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"</?\w+((\s+\w+(\s*=\s*(?:".*?"|'.*?'|[^'">\s]+))?)+\s*|\s*)/?>"#,
    )
    .expect("tag pattern is valid")
});

/// Fetches and inspects source documents.
#[derive(Clone)]
pub struct SourceExaminer {
    client: Client,
    max_body_bytes: usize,
}

impl SourceExaminer {
    /// Create an examiner with the configured timeout, user agent and size cap.
    pub fn new(config: &PingbackConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_source_bytes,
        })
    }

    /// Fetch `source_url` and examine it for a link to `target_url`.
    ///
    /// Never fails: an unreachable source yields an empty title and no link.
    pub async fn examine(&self, source_url: &str, target_url: &str) -> SourceDocumentInfo {
        match self.fetch(source_url).await {
            Ok(body) => {
                let info = examine_document(&body, target_url);
                debug!(
                    source = %source_url,
                    title = %info.title,
                    contains_html = info.contains_html,
                    source_has_link = info.source_has_link,
                    "Source examined"
                );
                info
            }
            Err(e) => {
                warn!(source = %source_url, error = %e, "Could not fetch pingback source");
                SourceDocumentInfo::unreachable()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(declared_encoding)
            .unwrap_or(UTF_8);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_body_bytes {
                debug!(source = %url, limit = self.max_body_bytes, "Source body truncated");
                break;
            }
        }

        let (text, used, _) = encoding.decode(&body);
        if used != UTF_8 {
            debug!(source = %url, encoding = used.name(), "Source body decoded");
        }
        Ok(text.into_owned())
    }
}

/// Encoding named by the `charset` parameter of a `Content-Type` value.
fn declared_encoding(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()))
}

/// Inspect an already-fetched source body.
pub fn examine_document(body: &str, target_url: &str) -> SourceDocumentInfo {
    let title = extract_title(body);
    SourceDocumentInfo {
        contains_html: contains_html(&title),
        source_has_link: contains_link(body, target_url),
        title,
    }
}

/// Inner text of the first `<title>` element, trimmed; empty if none.
pub fn extract_title(body: &str) -> String {
    TITLE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Whether `text` contains anything tag-shaped.
pub fn contains_html(text: &str) -> bool {
    HTML_TAG.is_match(text)
}

/// Case-insensitive substring search for the target URL.
pub fn contains_link(body: &str, target_url: &str) -> bool {
    body.to_lowercase().contains(&target_url.to_lowercase())
}
