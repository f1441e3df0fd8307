// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Storage capabilities the pingback pipeline depends on.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{PingbackHistory, ResolvedTarget};

/// Looks up locally owned content by its canonical address.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Find the published, non-deleted item with this slug and publish date.
    async fn resolve_by_date_and_slug(
        &self,
        pub_date: NaiveDate,
        slug: &str,
    ) -> Result<Option<ResolvedTarget>>;
}

/// Durable pingback history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Whether a record with this (target, source, requester) triple exists.
    async fn exists(
        &self,
        target_post_id: Uuid,
        source_url: &str,
        requester_address: &str,
    ) -> Result<bool>;

    /// Persist a new record.
    ///
    /// Fails with [`AppError::DuplicatePingback`](crate::error::AppError::DuplicatePingback)
    /// if the triple is already recorded, including when a concurrent save
    /// won the race.
    async fn save(&self, record: &PingbackHistory) -> Result<()>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<PingbackHistory>>;

    /// Remove a record; removing an unknown id is not an error.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Remove every record.
    async fn clear(&self) -> Result<()>;
}
