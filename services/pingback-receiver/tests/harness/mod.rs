// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for driving the pingback pipeline end to end.
//!
//! Provides an in-memory store seeded with one published post, a mock
//! source site, and XML-RPC payload builders.

#![allow(dead_code)]

pub mod generators;

use chrono::NaiveDate;
use pingback_receiver::{
    config::PingbackConfig, db::Database, examiner::SourceExaminer, models::Post,
    pipeline::PingbackService,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Canonical URL of the seeded post.
pub const TARGET: &str = "https://blog.example.com/post/2021/06/15/hello-world";

/// A service over a fresh in-memory database with one published post.
pub struct Fixture {
    pub db: Arc<Database>,
    pub service: PingbackService,
    pub post: Post,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let post = Post::published(
            "hello-world",
            "Hello World",
            NaiveDate::from_ymd_opt(2021, 6, 15).unwrap(),
        );
        db.create_post(&post).await.unwrap();

        let examiner = SourceExaminer::new(&PingbackConfig {
            fetch_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();
        let service = PingbackService::new(db.clone(), db.clone(), examiner);

        Self { db, service, post }
    }
}

/// Serve `html` at `page` on the mock site; returns the page's full URL.
pub async fn serve_page(server: &MockServer, page: &str, html: String) -> String {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(html),
        )
        .mount(server)
        .await;
    format!("{}{}", server.uri(), page)
}

/// A source page with the given title that (optionally) links to `target`.
pub fn source_html(title: &str, target: Option<&str>) -> String {
    let link = target
        .map(|t| format!("<p>Great read: <a href=\"{t}\">{t}</a></p>"))
        .unwrap_or_else(|| "<p>Nothing to see here.</p>".to_string());
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body>{link}</body></html>"
    )
}

/// An XML-RPC `pingback.ping` call.
pub fn ping_payload(source: &str, target: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<methodCall>
  <methodName>pingback.ping</methodName>
  <params>
    <param><value><string>{source}</string></value></param>
    <param><value><string>{target}</string></value></param>
  </params>
</methodCall>"#
    )
}
