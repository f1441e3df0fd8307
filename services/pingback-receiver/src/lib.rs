// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pingback Receiver
//!
//! Receiving side of the XML-RPC pingback protocol for indieweb2-bastion:
//!
//! - XML-RPC `pingback.ping` payload validation
//! - Target resolution from canonical `/post/{yyyy}/{MM}/{dd}/{slug}` URLs
//! - Source fetching with a bounded timeout and link/title inspection
//! - Markup-in-title spam heuristic
//! - Duplicate suppression on (target, source, requester)
//! - Durable pingback history in SurrealDB

pub mod config;
pub mod db;
pub mod error;
pub mod examiner;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod payload;
pub mod pipeline;
pub mod slug;
pub mod store;

pub use config::Config;
pub use db::Database;
pub use error::{AppError, Result};
pub use examiner::SourceExaminer;
pub use models::{PingbackHistory, Post};
pub use pipeline::{PingbackResponse, PingbackService};
