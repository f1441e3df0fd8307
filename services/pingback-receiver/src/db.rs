// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SurrealDB storage for posts and pingback history

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::{
    engine::local::{Db, Mem},
    Surreal,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::DatabaseConfig,
    error::{AppError, Result},
    models::{PingbackHistory, Post, ResolvedTarget},
    store::{ContentResolver, HistoryStore},
};

const PUB_DATE_FORMAT: &str = "%Y-%m-%d";

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    db: Surreal<Db>,
}

/// `pingback_history` row; ids are kept as plain strings so rows never
/// depend on SurrealDB record-id encoding.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryRow {
    history_id: String,
    domain: String,
    source_url: String,
    source_title: String,
    target_post_id: String,
    target_post_title: String,
    requester_address: String,
    accepted_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PostRow {
    post_id: String,
    slug: String,
    title: String,
    pub_date: String,
    is_published: bool,
    is_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    post_id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct HistoryIdRow {
    #[allow(dead_code)]
    history_id: String,
}

impl Database {
    /// Connect to SurrealDB and make sure the schema exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::open(&config.path).await?;

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        Self::init_schema(&db).await?;

        Ok(Self { db })
    }

    /// Fresh in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::default()).await
    }

    async fn open(path: &str) -> Result<Surreal<Db>> {
        if path == "memory" {
            Ok(Surreal::new::<Mem>(()).await?)
        } else {
            Self::open_persistent(path).await
        }
    }

    #[cfg(feature = "rocksdb")]
    async fn open_persistent(path: &str) -> Result<Surreal<Db>> {
        Ok(Surreal::new::<surrealdb::engine::local::RocksDb>(path).await?)
    }

    #[cfg(not(feature = "rocksdb"))]
    async fn open_persistent(path: &str) -> Result<Surreal<Db>> {
        Err(AppError::Internal(format!(
            "database path {path} needs the rocksdb feature; use \"memory\""
        )))
    }

    /// Initialize database schema
    async fn init_schema(db: &Surreal<Db>) -> Result<()> {
        db.query(
            r#"
            DEFINE TABLE posts SCHEMAFULL;
            DEFINE FIELD post_id ON posts TYPE string;
            DEFINE FIELD slug ON posts TYPE string;
            DEFINE FIELD title ON posts TYPE string;
            DEFINE FIELD pub_date ON posts TYPE string;
            DEFINE FIELD is_published ON posts TYPE bool;
            DEFINE FIELD is_deleted ON posts TYPE bool;

            DEFINE INDEX slug_date_idx ON posts COLUMNS slug, pub_date;
        "#,
        )
        .await?
        .check()?;

        // The unique triple index makes check-then-save safe under concurrency
        db.query(
            r#"
            DEFINE TABLE pingback_history SCHEMAFULL;
            DEFINE FIELD history_id ON pingback_history TYPE string;
            DEFINE FIELD domain ON pingback_history TYPE string;
            DEFINE FIELD source_url ON pingback_history TYPE string;
            DEFINE FIELD source_title ON pingback_history TYPE string;
            DEFINE FIELD target_post_id ON pingback_history TYPE string;
            DEFINE FIELD target_post_title ON pingback_history TYPE string;
            DEFINE FIELD requester_address ON pingback_history TYPE string;
            DEFINE FIELD accepted_at ON pingback_history TYPE string;

            DEFINE INDEX triple_idx ON pingback_history
                COLUMNS target_post_id, source_url, requester_address UNIQUE;
        "#,
        )
        .await?
        .check()?;

        Ok(())
    }

    /// Store a post so it can be resolved as a pingback target
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        let row = PostRow {
            post_id: post.id.to_string(),
            slug: post.slug.clone(),
            title: post.title.clone(),
            pub_date: post.pub_date.format(PUB_DATE_FORMAT).to_string(),
            is_published: post.is_published,
            is_deleted: post.is_deleted,
        };

        self.db
            .query("CREATE type::thing('posts', $id) CONTENT $row")
            .bind(("id", row.post_id.clone()))
            .bind(("row", row))
            .await?
            .check()?;

        Ok(())
    }
}

#[async_trait]
impl ContentResolver for Database {
    async fn resolve_by_date_and_slug(
        &self,
        pub_date: NaiveDate,
        slug: &str,
    ) -> Result<Option<ResolvedTarget>> {
        let mut result = self
            .db
            .query(
                "SELECT post_id, title FROM posts \
                 WHERE slug = $slug AND pub_date = $pub_date \
                 AND is_published = true AND is_deleted = false \
                 LIMIT 1",
            )
            .bind(("slug", slug.to_string()))
            .bind(("pub_date", pub_date.format(PUB_DATE_FORMAT).to_string()))
            .await?;

        let rows: Vec<TargetRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| {
                Ok(ResolvedTarget {
                    id: parse_uuid(&row.post_id)?,
                    title: row.title,
                })
            })
            .transpose()
    }
}

#[async_trait]
impl HistoryStore for Database {
    async fn exists(
        &self,
        target_post_id: Uuid,
        source_url: &str,
        requester_address: &str,
    ) -> Result<bool> {
        let mut result = self
            .db
            .query(
                "SELECT history_id FROM pingback_history \
                 WHERE target_post_id = $target AND source_url = $source \
                 AND requester_address = $requester \
                 LIMIT 1",
            )
            .bind(("target", target_post_id.to_string()))
            .bind(("source", source_url.to_string()))
            .bind(("requester", requester_address.to_string()))
            .await?;

        let rows: Vec<HistoryIdRow> = result.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn save(&self, record: &PingbackHistory) -> Result<()> {
        let row = HistoryRow::from(record);

        let outcome = self
            .db
            .query("CREATE type::thing('pingback_history', $id) CONTENT $row")
            .bind(("id", row.history_id.clone()))
            .bind(("row", row))
            .await
            .and_then(|response| response.check());

        match outcome {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(duplicate(record)),
            Err(err) => {
                // A concurrent writer may have committed the same triple and
                // failed us with a transaction conflict instead.
                if self
                    .exists(record.target_post_id, &record.source_url, &record.requester_address)
                    .await?
                {
                    Err(duplicate(record))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn list(&self) -> Result<Vec<PingbackHistory>> {
        let mut result = self
            .db
            .query(
                "SELECT history_id, domain, source_url, source_title, target_post_id, \
                 target_post_title, requester_address, accepted_at \
                 FROM pingback_history ORDER BY accepted_at DESC",
            )
            .await?;

        let rows: Vec<HistoryRow> = result.take(0)?;
        rows.into_iter().map(PingbackHistory::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.db
            .query("DELETE type::thing('pingback_history', $id)")
            .bind(("id", id.to_string()))
            .await?
            .check()?;

        debug!(id = %id, "Pingback history record deleted");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.db.query("DELETE pingback_history").await?.check()?;
        Ok(())
    }
}

fn is_unique_violation(err: &surrealdb::Error) -> bool {
    matches!(
        err,
        surrealdb::Error::Db(surrealdb::error::Db::IndexExists { .. })
    )
}

fn duplicate(record: &PingbackHistory) -> AppError {
    AppError::DuplicatePingback {
        target_id: record.target_post_id.to_string(),
        source_url: record.source_url.clone(),
    }
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::CorruptRecord(format!("bad id {value}: {e}")))
}

impl From<&PingbackHistory> for HistoryRow {
    fn from(record: &PingbackHistory) -> Self {
        Self {
            history_id: record.id.to_string(),
            domain: record.domain.clone(),
            source_url: record.source_url.clone(),
            source_title: record.source_title.clone(),
            target_post_id: record.target_post_id.to_string(),
            target_post_title: record.target_post_title.clone(),
            requester_address: record.requester_address.clone(),
            // Fixed-width so ORDER BY on the string matches time order
            accepted_at: record
                .accepted_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

impl TryFrom<HistoryRow> for PingbackHistory {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> Result<Self> {
        let accepted_at = DateTime::parse_from_rfc3339(&row.accepted_at)
            .map_err(|e| AppError::CorruptRecord(format!("bad timestamp {}: {e}", row.accepted_at)))?
            .with_timezone(&Utc);

        Ok(Self {
            id: parse_uuid(&row.history_id)?,
            domain: row.domain,
            source_url: row.source_url,
            source_title: row.source_title,
            target_post_id: parse_uuid(&row.target_post_id)?,
            target_post_title: row.target_post_title,
            requester_address: row.requester_address,
            accepted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PingRequest, SourceDocumentInfo};
    use chrono::Duration;

    fn record_for(target: &ResolvedTarget, source_url: &str, requester: &str) -> PingbackHistory {
        let request = PingRequest {
            source_url: source_url.to_string(),
            target_url: "https://blog.example.com/post/2021/06/15/hello-world".to_string(),
            source_document: SourceDocumentInfo {
                title: "Remote".to_string(),
                contains_html: false,
                source_has_link: true,
            },
        };
        PingbackHistory::new(&request, target, requester)
    }

    fn target() -> ResolvedTarget {
        ResolvedTarget {
            id: Uuid::new_v4(),
            title: "Hello World".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_only_published_live_posts() {
        let db = Database::in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();

        let live = Post::published("hello-world", "Hello World", date);
        let draft = Post {
            is_published: false,
            ..Post::published("draft", "Draft", date)
        };
        let deleted = Post {
            is_deleted: true,
            ..Post::published("gone", "Gone", date)
        };
        for post in [&live, &draft, &deleted] {
            db.create_post(post).await.unwrap();
        }

        let found = db.resolve_by_date_and_slug(date, "hello-world").await.unwrap();
        assert_eq!(
            found,
            Some(ResolvedTarget {
                id: live.id,
                title: "Hello World".to_string()
            })
        );

        assert_eq!(db.resolve_by_date_and_slug(date, "draft").await.unwrap(), None);
        assert_eq!(db.resolve_by_date_and_slug(date, "gone").await.unwrap(), None);

        let other_day = NaiveDate::from_ymd_opt(2021, 6, 16).unwrap();
        assert_eq!(
            db.resolve_by_date_and_slug(other_day, "hello-world").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_save_list_round_trip() {
        let db = Database::in_memory().await.unwrap();
        let target = target();
        let record = record_for(&target, "https://www.remote.example/a", "198.51.100.4");

        db.save(&record).await.unwrap();

        let records = db.list().await.unwrap();
        assert_eq!(records.len(), 1);
        let stored = &records[0];
        assert_eq!(stored.id, record.id);
        assert_eq!(stored.domain, "remote.example");
        assert_eq!(stored.target_post_id, target.id);
        assert_eq!(stored.requester_address, "198.51.100.4");
        assert_eq!(stored, &record);
    }

    #[tokio::test]
    async fn test_schema_definition_is_repeatable() {
        let db = Database::in_memory().await.unwrap();
        let record = record_for(&target(), "https://remote.example/a", "192.0.2.1");
        db.save(&record).await.unwrap();

        Database::init_schema(&db.db).await.unwrap();

        assert_eq!(db.list().await.unwrap(), vec![record.clone()]);
        let err = db.save(&record).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicatePingback { .. }));
    }

    #[tokio::test]
    async fn test_exists_matches_exact_triple() {
        let db = Database::in_memory().await.unwrap();
        let target = target();
        let record = record_for(&target, "https://remote.example/a", "198.51.100.4");
        db.save(&record).await.unwrap();

        assert!(db
            .exists(target.id, "https://remote.example/a", "198.51.100.4")
            .await
            .unwrap());
        assert!(!db
            .exists(target.id, "https://remote.example/a", "198.51.100.5")
            .await
            .unwrap());
        assert!(!db
            .exists(target.id, "https://remote.example/b", "198.51.100.4")
            .await
            .unwrap());
        assert!(!db
            .exists(Uuid::new_v4(), "https://remote.example/a", "198.51.100.4")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_triple_rejected() {
        let db = Database::in_memory().await.unwrap();
        let target = target();
        let first = record_for(&target, "https://remote.example/a", "198.51.100.4");
        let second = record_for(&target, "https://remote.example/a", "198.51.100.4");

        tokio_test::assert_ok!(db.save(&first).await);
        let err = tokio_test::assert_err!(db.save(&second).await);

        assert!(matches!(err, AppError::DuplicatePingback { .. }));
        assert_eq!(db.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_one_record() {
        let db = Database::in_memory().await.unwrap();
        let target = target();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let record = record_for(&target, "https://remote.example/race", "192.0.2.1");
                tokio::spawn(async move { db.save(&record).await })
            })
            .collect();

        let mut saved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => saved += 1,
                Err(AppError::DuplicatePingback { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(saved, 1);
        assert_eq!(db.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let target = target();

        let mut older = record_for(&target, "https://remote.example/old", "192.0.2.1");
        older.accepted_at = Utc::now() - Duration::hours(2);
        let newer = record_for(&target, "https://remote.example/new", "192.0.2.1");

        db.save(&older).await.unwrap();
        db.save(&newer).await.unwrap();

        let ids: Vec<Uuid> = db.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let record = record_for(&target(), "https://remote.example/a", "192.0.2.1");
        db.save(&record).await.unwrap();

        db.delete(record.id).await.unwrap();
        assert!(db.list().await.unwrap().is_empty());

        db.delete(record.id).await.unwrap();
        db.delete(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let db = Database::in_memory().await.unwrap();
        let target = target();
        for n in 0..3 {
            let record = record_for(&target, &format!("https://remote.example/{n}"), "192.0.2.1");
            db.save(&record).await.unwrap();
        }

        db.clear().await.unwrap();
        assert!(db.list().await.unwrap().is_empty());
    }
}
