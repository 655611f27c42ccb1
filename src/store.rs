//! Persistence layer.
//!
//! The spec index lives in a single SQLite database managed through an
//! async `sqlx` pool. One snapshot per spec: re-indexing wipes the spec's
//! previous sections and cross-refs before inserting the new revision.
//! Full-text search runs over an external-content FTS5 table kept in sync
//! by triggers.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::types::{AnchorHit, CrossRef, SearchHit, Section, SectionKind};

/// Cached repo HEAD: `(sha, commit date, when we last asked GitHub)`.
pub type CachedHead = Option<(String, DateTime<Utc>, DateTime<Utc>)>;

/// Handle to the spec index database.
#[derive(Clone)]
pub struct SpecStore {
    pool: SqlitePool,
}

/// Resolve the database path: `SPECLENS_DB` env override (used by tests),
/// configured path, or `~/.speclens/index.db`.
pub fn db_path(configured: Option<&str>) -> PathBuf {
    if let Ok(test_db) = std::env::var("SPECLENS_DB") {
        return PathBuf::from(test_db);
    }
    if let Some(path) = configured {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".speclens")
        .join("index.db")
}

impl SpecStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        let store = Self { pool };
        store.apply_schema().await?;
        debug!(path = %path.display(), "Spec index opened");
        Ok(store)
    }

    /// In-memory store for tests. Pinned to a single connection: each
    /// pooled connection would otherwise see its own empty database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to build in-memory connect options")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    /// Apply the schema. Idempotent on both fresh and existing databases.
    async fn apply_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS specs (
                id        INTEGER PRIMARY KEY,
                name      TEXT NOT NULL UNIQUE,
                base_url  TEXT NOT NULL,
                publisher TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS snapshots (
                id          INTEGER PRIMARY KEY,
                spec_id     INTEGER NOT NULL REFERENCES specs(id),
                sha         TEXT NOT NULL,
                commit_date TEXT NOT NULL,
                indexed_at  TEXT NOT NULL,
                UNIQUE(spec_id, sha)
            )",
            "CREATE TABLE IF NOT EXISTS sections (
                id            INTEGER PRIMARY KEY,
                snapshot_id   INTEGER NOT NULL REFERENCES snapshots(id),
                anchor        TEXT NOT NULL,
                title         TEXT,
                body_md       TEXT,
                kind          TEXT NOT NULL,
                parent_anchor TEXT,
                prev_anchor   TEXT,
                next_anchor   TEXT,
                level         INTEGER,
                UNIQUE(snapshot_id, anchor)
            )",
            "CREATE INDEX IF NOT EXISTS idx_sections_parent
                ON sections(snapshot_id, parent_anchor)",
            "CREATE TABLE IF NOT EXISTS xrefs (
                id          INTEGER PRIMARY KEY,
                snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
                from_anchor TEXT NOT NULL,
                to_spec     TEXT NOT NULL,
                to_anchor   TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_xrefs_outgoing
                ON xrefs(snapshot_id, from_anchor)",
            "CREATE INDEX IF NOT EXISTS idx_xrefs_incoming
                ON xrefs(snapshot_id, to_spec, to_anchor)",
            "CREATE TABLE IF NOT EXISTS head_cache (
                repo        TEXT PRIMARY KEY,
                sha         TEXT NOT NULL,
                commit_date TEXT NOT NULL,
                checked_at  TEXT NOT NULL
            )",
            "CREATE VIRTUAL TABLE IF NOT EXISTS sections_fts USING fts5(
                anchor,
                title,
                body_md,
                content=sections,
                content_rowid=id
            )",
            "CREATE TRIGGER IF NOT EXISTS sections_fts_insert
                AFTER INSERT ON sections BEGIN
                INSERT INTO sections_fts(rowid, anchor, title, body_md)
                VALUES (new.id, new.anchor, new.title, new.body_md);
            END",
            "CREATE TRIGGER IF NOT EXISTS sections_fts_delete
                AFTER DELETE ON sections BEGIN
                INSERT INTO sections_fts(sections_fts, rowid, anchor, title, body_md)
                VALUES ('delete', old.id, old.anchor, old.title, old.body_md);
            END",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .context("Failed to apply schema")?;
        }
        Ok(())
    }

    // -- Spec / snapshot writes ------------------------------------------

    /// Insert a spec if missing and return its id.
    pub async fn upsert_spec(&self, name: &str, base_url: &str, publisher: &str) -> Result<i64> {
        sqlx::query("INSERT OR IGNORE INTO specs (name, base_url, publisher) VALUES (?1, ?2, ?3)")
            .bind(name)
            .bind(base_url)
            .bind(publisher)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id FROM specs WHERE name = ?1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Insert a snapshot row and return its id.
    pub async fn insert_snapshot(&self, spec_id: i64, sha: &str, commit_date: &str) -> Result<i64> {
        let indexed_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO snapshots (spec_id, sha, commit_date, indexed_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(spec_id)
        .bind(sha)
        .bind(commit_date)
        .bind(indexed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Drop all indexed data for a spec. Re-indexing calls this first so
    /// each spec keeps exactly one snapshot.
    pub async fn wipe_spec(&self, spec_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM xrefs WHERE snapshot_id IN
             (SELECT id FROM snapshots WHERE spec_id = ?1)",
        )
        .bind(spec_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM sections WHERE snapshot_id IN
             (SELECT id FROM snapshots WHERE spec_id = ?1)",
        )
        .bind(spec_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM snapshots WHERE spec_id = ?1")
            .bind(spec_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Bulk-insert sections for a snapshot in one transaction.
    pub async fn insert_sections(&self, snapshot_id: i64, sections: &[Section]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for section in sections {
            sqlx::query(
                "INSERT INTO sections
                 (snapshot_id, anchor, title, body_md, kind,
                  parent_anchor, prev_anchor, next_anchor, level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(snapshot_id)
            .bind(&section.anchor)
            .bind(&section.title)
            .bind(&section.body_md)
            .bind(section.kind.as_str())
            .bind(&section.parent_anchor)
            .bind(&section.prev_anchor)
            .bind(&section.next_anchor)
            .bind(section.level.map(i64::from))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Bulk-insert cross-refs for a snapshot in one transaction.
    pub async fn insert_cross_refs(&self, snapshot_id: i64, refs: &[CrossRef]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for xref in refs {
            sqlx::query(
                "INSERT INTO xrefs (snapshot_id, from_anchor, to_spec, to_anchor)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(snapshot_id)
            .bind(&xref.from_anchor)
            .bind(&xref.to_spec)
            .bind(&xref.to_anchor)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // -- Snapshot reads ---------------------------------------------------

    /// The snapshot for a spec, as `(snapshot_id, sha)`.
    pub async fn snapshot_for_spec(&self, spec_name: &str) -> Result<Option<(i64, String)>> {
        let row = sqlx::query(
            "SELECT sn.id, sn.sha FROM snapshots sn
             JOIN specs sp ON sn.spec_id = sp.id
             WHERE sp.name = ?1",
        )
        .bind(spec_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some((row.try_get(0)?, row.try_get(1)?))),
            None => Ok(None),
        }
    }

    /// Snapshot id for a spec at a specific SHA.
    pub async fn snapshot_by_sha(&self, spec_name: &str, sha: &str) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT sn.id FROM snapshots sn
             JOIN specs sp ON sn.spec_id = sp.id
             WHERE sp.name = ?1 AND sn.sha = ?2",
        )
        .bind(spec_name)
        .bind(sha)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get(0)?)),
            None => Ok(None),
        }
    }

    // -- Section reads ----------------------------------------------------

    /// Fetch one section by anchor.
    pub async fn section(&self, snapshot_id: i64, anchor: &str) -> Result<Option<Section>> {
        let row = sqlx::query(
            "SELECT anchor, title, body_md, kind,
                    parent_anchor, prev_anchor, next_anchor, level
             FROM sections
             WHERE snapshot_id = ?1 AND anchor = ?2",
        )
        .bind(snapshot_id)
        .bind(anchor)
        .fetch_optional(&self.pool)
        .await?;

        row.map(section_from_row).transpose()
    }

    /// Anchors and titles of a section's children, in document order.
    pub async fn children(
        &self,
        snapshot_id: i64,
        parent_anchor: &str,
    ) -> Result<Vec<(String, Option<String>)>> {
        let rows = sqlx::query(
            "SELECT anchor, title FROM sections
             WHERE snapshot_id = ?1 AND parent_anchor = ?2
             ORDER BY id",
        )
        .bind(snapshot_id)
        .bind(parent_anchor)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get(0)?, row.try_get(1)?)))
            .collect()
    }

    /// All heading sections of a snapshot, in document order.
    pub async fn headings(&self, snapshot_id: i64) -> Result<Vec<Section>> {
        let rows = sqlx::query(
            "SELECT anchor, title, body_md, kind,
                    parent_anchor, prev_anchor, next_anchor, level
             FROM sections
             WHERE snapshot_id = ?1 AND kind = 'heading'
             ORDER BY id",
        )
        .bind(snapshot_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(section_from_row).collect()
    }

    // -- Cross-ref reads --------------------------------------------------

    /// Outgoing references from a section: `(to_spec, to_anchor)`.
    pub async fn outgoing_refs(
        &self,
        snapshot_id: i64,
        from_anchor: &str,
    ) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT to_spec, to_anchor FROM xrefs
             WHERE snapshot_id = ?1 AND from_anchor = ?2",
        )
        .bind(snapshot_id)
        .bind(from_anchor)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get(0)?, row.try_get(1)?)))
            .collect()
    }

    /// Incoming references to a section from any indexed spec:
    /// `(from_spec, from_anchor)`.
    pub async fn incoming_refs(
        &self,
        to_spec: &str,
        to_anchor: &str,
    ) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT sp.name, x.from_anchor FROM xrefs x
             JOIN snapshots sn ON x.snapshot_id = sn.id
             JOIN specs sp ON sn.spec_id = sp.id
             WHERE x.to_spec = ?1 AND x.to_anchor = ?2",
        )
        .bind(to_spec)
        .bind(to_anchor)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get(0)?, row.try_get(1)?)))
            .collect()
    }

    // -- Search -----------------------------------------------------------

    /// Find anchors matching a SQL LIKE pattern, optionally within one spec.
    pub async fn match_anchors(
        &self,
        like_pattern: &str,
        spec_filter: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AnchorHit>> {
        let rows = sqlx::query(
            "SELECT sp.name, s.anchor, s.title, s.kind FROM sections s
             JOIN snapshots sn ON s.snapshot_id = sn.id
             JOIN specs sp ON sn.spec_id = sp.id
             WHERE s.anchor LIKE ?1 AND (?2 IS NULL OR sp.name = ?2)
             ORDER BY sp.name, s.anchor
             LIMIT ?3",
        )
        .bind(like_pattern)
        .bind(spec_filter)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(AnchorHit {
                    spec: row.try_get(0)?,
                    anchor: row.try_get(1)?,
                    title: row.try_get(2)?,
                    kind: row.try_get(3)?,
                })
            })
            .collect()
    }

    /// Full-text search over anchors, titles, and bodies.
    pub async fn search(
        &self,
        query: &str,
        spec_filter: Option<&str>,
        limit: i64,
    ) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query(
            "SELECT sp.name, s.anchor, s.title, s.kind,
                    snippet(sections_fts, 2, '<mark>', '</mark>', '...', 64)
             FROM sections_fts
             JOIN sections s ON sections_fts.rowid = s.id
             JOIN snapshots sn ON s.snapshot_id = sn.id
             JOIN specs sp ON sn.spec_id = sp.id
             WHERE sections_fts MATCH ?1 AND (?2 IS NULL OR sp.name = ?2)
             LIMIT ?3",
        )
        .bind(query)
        .bind(spec_filter)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(SearchHit {
                    spec: row.try_get(0)?,
                    anchor: row.try_get(1)?,
                    title: row.try_get(2)?,
                    kind: row.try_get(3)?,
                    snippet: row.try_get::<Option<String>, _>(4)?.unwrap_or_default(),
                })
            })
            .collect()
    }

    // -- Head cache -------------------------------------------------------

    /// Cached latest SHA for a repo, if any. The caller decides freshness.
    pub async fn cached_head(&self, repo: &str) -> Result<CachedHead> {
        let row = sqlx::query(
            "SELECT sha, commit_date, checked_at FROM head_cache WHERE repo = ?1",
        )
        .bind(repo)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sha: String = row.try_get(0)?;
        let commit_date = parse_rfc3339(&row.try_get::<String, _>(1)?)?;
        let checked_at = parse_rfc3339(&row.try_get::<String, _>(2)?)?;
        Ok(Some((sha, commit_date, checked_at)))
    }

    /// Create or replace the head-cache entry for a repo.
    pub async fn record_head(
        &self,
        repo: &str,
        sha: &str,
        commit_date: &DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO head_cache (repo, sha, commit_date, checked_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(repo)
        .bind(sha)
        .bind(commit_date.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Bad timestamp in database: {s}"))?
        .with_timezone(&Utc))
}

fn section_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Section> {
    let kind_str: String = row.try_get(3)?;
    Ok(Section {
        anchor: row.try_get(0)?,
        title: row.try_get(1)?,
        body_md: row.try_get(2)?,
        kind: SectionKind::from_str(&kind_str)?,
        parent_anchor: row.try_get(4)?,
        prev_anchor: row.try_get(5)?,
        next_anchor: row.try_get(6)?,
        level: row.try_get::<Option<i64>, _>(7)?.map(|l| l as u8),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(anchor: &str, title: &str, level: u8) -> Section {
        Section {
            anchor: anchor.to_string(),
            title: Some(title.to_string()),
            body_md: Some(format!("Body of {title}")),
            kind: SectionKind::Heading,
            parent_anchor: None,
            prev_anchor: None,
            next_anchor: None,
            level: Some(level),
        }
    }

    async fn seeded_store() -> (SpecStore, i64) {
        let store = SpecStore::open_in_memory().await.unwrap();
        let spec_id = store
            .upsert_spec("HTML", "https://html.spec.whatwg.org", "whatwg")
            .await
            .unwrap();
        let snapshot_id = store
            .insert_snapshot(spec_id, "abc123", "2026-01-01T00:00:00Z")
            .await
            .unwrap();

        let mut intro = heading("intro", "Introduction", 2);
        intro.next_anchor = Some("details".to_string());
        let mut details = heading("details", "Details", 3);
        details.parent_anchor = Some("intro".to_string());

        store
            .insert_sections(snapshot_id, &[intro, details])
            .await
            .unwrap();
        (store, snapshot_id)
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let mut path = std::env::temp_dir();
        path.push(format!("speclens-test-{}", uuid::Uuid::new_v4()));
        path.push("index.db");

        let store = SpecStore::open(&path).await.unwrap();
        store
            .upsert_spec("HTML", "https://html.spec.whatwg.org", "whatwg")
            .await
            .unwrap();
        assert!(path.exists());

        drop(store);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_upsert_spec_is_idempotent() {
        let store = SpecStore::open_in_memory().await.unwrap();
        let id1 = store
            .upsert_spec("HTML", "https://html.spec.whatwg.org", "whatwg")
            .await
            .unwrap();
        let id2 = store
            .upsert_spec("HTML", "https://html.spec.whatwg.org", "whatwg")
            .await
            .unwrap();
        assert_eq!(id1, id2);

        let other = store
            .upsert_spec("DOM", "https://dom.spec.whatwg.org", "whatwg")
            .await
            .unwrap();
        assert_ne!(id1, other);
    }

    #[tokio::test]
    async fn test_snapshot_lookup() {
        let (store, snapshot_id) = seeded_store().await;

        let found = store.snapshot_for_spec("HTML").await.unwrap();
        assert_eq!(found, Some((snapshot_id, "abc123".to_string())));

        assert_eq!(store.snapshot_for_spec("NOPE").await.unwrap(), None);
        assert_eq!(
            store.snapshot_by_sha("HTML", "abc123").await.unwrap(),
            Some(snapshot_id)
        );
        assert_eq!(store.snapshot_by_sha("HTML", "zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_section_round_trip() {
        let (store, snapshot_id) = seeded_store().await;

        let section = store.section(snapshot_id, "intro").await.unwrap().unwrap();
        assert_eq!(section.anchor, "intro");
        assert_eq!(section.title.as_deref(), Some("Introduction"));
        assert_eq!(section.kind, SectionKind::Heading);
        assert_eq!(section.level, Some(2));
        assert_eq!(section.next_anchor.as_deref(), Some("details"));

        assert!(store.section(snapshot_id, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_children() {
        let (store, snapshot_id) = seeded_store().await;
        let children = store.children(snapshot_id, "intro").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0, "details");
    }

    #[tokio::test]
    async fn test_headings_in_document_order() {
        let (store, snapshot_id) = seeded_store().await;
        let headings = store.headings(snapshot_id).await.unwrap();
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].anchor, "intro");
        assert_eq!(headings[1].anchor, "details");
    }

    #[tokio::test]
    async fn test_cross_refs_both_directions() {
        let (store, snapshot_id) = seeded_store().await;
        store
            .insert_cross_refs(
                snapshot_id,
                &[
                    CrossRef {
                        from_anchor: "intro".into(),
                        to_spec: "DOM".into(),
                        to_anchor: "concept-tree".into(),
                    },
                    CrossRef {
                        from_anchor: "intro".into(),
                        to_spec: "HTML".into(),
                        to_anchor: "details".into(),
                    },
                ],
            )
            .await
            .unwrap();

        let outgoing = store.outgoing_refs(snapshot_id, "intro").await.unwrap();
        assert_eq!(outgoing.len(), 2);

        let incoming = store.incoming_refs("HTML", "details").await.unwrap();
        assert_eq!(incoming, vec![("HTML".to_string(), "intro".to_string())]);

        let incoming = store.incoming_refs("DOM", "concept-tree").await.unwrap();
        assert_eq!(incoming, vec![("HTML".to_string(), "intro".to_string())]);
    }

    #[tokio::test]
    async fn test_match_anchors() {
        let (store, _) = seeded_store().await;
        let hits = store.match_anchors("intro%", None, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].anchor, "intro");
        assert_eq!(hits[0].spec, "HTML");

        let hits = store
            .match_anchors("%", Some("OTHER"), 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_full_text_search() {
        let (store, _) = seeded_store().await;
        let hits = store.search("Introduction", None, 10).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].anchor, "intro");

        let hits = store.search("Introduction", Some("HTML"), 10).await.unwrap();
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn test_wipe_spec_removes_everything() {
        let store = SpecStore::open_in_memory().await.unwrap();
        let spec_id = store
            .upsert_spec("HTML", "https://html.spec.whatwg.org", "whatwg")
            .await
            .unwrap();
        let snapshot_id = store
            .insert_snapshot(spec_id, "abc123", "2026-01-01T00:00:00Z")
            .await
            .unwrap();
        store
            .insert_sections(snapshot_id, &[heading("intro", "Introduction", 2)])
            .await
            .unwrap();

        store.wipe_spec(spec_id).await.unwrap();

        assert!(store.snapshot_for_spec("HTML").await.unwrap().is_none());
        assert!(store.section(snapshot_id, "intro").await.unwrap().is_none());
        // FTS shadow rows are gone too
        assert!(store.search("Introduction", None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_head_cache_round_trip() {
        let store = SpecStore::open_in_memory().await.unwrap();
        assert!(store.cached_head("whatwg/html").await.unwrap().is_none());

        let commit_date = Utc::now();
        store
            .record_head("whatwg/html", "abc123", &commit_date)
            .await
            .unwrap();

        let (sha, date, checked_at) = store.cached_head("whatwg/html").await.unwrap().unwrap();
        assert_eq!(sha, "abc123");
        assert_eq!(date.timestamp(), commit_date.timestamp());
        assert!(checked_at >= commit_date - chrono::Duration::seconds(5));

        // Replacing updates in place
        store
            .record_head("whatwg/html", "def456", &commit_date)
            .await
            .unwrap();
        let (sha, _, _) = store.cached_head("whatwg/html").await.unwrap().unwrap();
        assert_eq!(sha, "def456");
    }
}
