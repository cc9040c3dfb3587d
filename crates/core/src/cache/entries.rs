//! Cached response entries.
//!
//! Provides functions for storing and matching response snapshots inside a
//! bucket. Writes use UPSERT semantics keyed on `(bucket, key)`.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// An immutable snapshot of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    pub status: u16,
    pub status_text: String,
    /// Header name/value pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A keyed entry ready to be written into a bucket.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: StoredResponse,
}

/// Lightweight listing row for an entry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub stored_at: String,
}

fn insert_entry(conn: &rusqlite::Connection, bucket: &str, entry: &CacheEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.response.headers)?;
    conn.execute(
        "INSERT INTO entries (
            bucket, key, method, url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(bucket, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            bucket,
            &entry.key,
            &entry.method,
            &entry.url,
            entry.response.status,
            &entry.response.status_text,
            headers_json,
            &entry.response.body,
            &entry.response.stored_at,
        ],
    )?;
    Ok(())
}

/// Create the bucket row if it is missing, inside the caller's transaction.
fn ensure_bucket(conn: &rusqlite::Connection, bucket: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
        params![bucket, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or overwrite one entry, creating the bucket if needed.
    pub async fn put_entry(&self, bucket: &str, entry: &CacheEntry) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_bucket(&tx, &bucket)?;
                insert_entry(&tx, &bucket, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write several entries in a single transaction.
    ///
    /// Either every entry is written or none is. A bucket created by this call
    /// is rolled back with the entries.
    pub async fn put_entries(&self, bucket: &str, entries: Vec<CacheEntry>) -> Result<usize, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                ensure_bucket(&tx, &bucket)?;
                for entry in &entries {
                    insert_entry(&tx, &bucket, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry by key.
    ///
    /// Returns None if the bucket or the key doesn't exist.
    pub async fn match_entry(&self, bucket: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, headers_json, body, stored_at
                     FROM entries WHERE bucket = ?1 AND key = ?2",
                    params![bucket, key],
                    |row| {
                        Ok((
                            row.get::<_, u16>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                );

                match result {
                    Ok((status, status_text, headers_json, body, stored_at)) => Ok(Some(StoredResponse {
                        status,
                        status_text,
                        headers: serde_json::from_str(&headers_json)?,
                        body,
                        stored_at,
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a bucket holds an entry for `key`.
    pub async fn has_entry(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM entries WHERE bucket = ?1 AND key = ?2)",
                    params![bucket, key],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List entries of a bucket ordered by URL.
    pub async fn entries(&self, bucket: &str) -> Result<Vec<EntrySummary>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, LENGTH(body), stored_at
                     FROM entries WHERE bucket = ?1 ORDER BY url ASC, method ASC",
                )?;
                let rows = stmt
                    .query_map(params![bucket], |row| {
                        Ok(EntrySummary {
                            key: row.get(0)?,
                            method: row.get(1)?,
                            url: row.get(2)?,
                            status: row.get(3)?,
                            size: row.get::<_, i64>(4)? as u64,
                            stored_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a bucket.
    pub async fn entry_count(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hash::compute_cache_key;

    fn make_entry(url: &str, body: &str) -> CacheEntry {
        CacheEntry {
            key: compute_cache_key("GET", url),
            method: "GET".to_string(),
            url: url.to_string(),
            response: StoredResponse {
                status: 200,
                status_text: "OK".to_string(),
                headers: vec![("Content-Type".to_string(), "application/javascript".to_string())],
                body: body.as_bytes().to_vec(),
                stored_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("v1").await.unwrap();
        let entry = make_entry("https://example.com/app.js", "X");

        db.put_entry("v1", &entry).await.unwrap();

        let stored = db.match_entry("v1", &entry.key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"X");
        assert_eq!(stored.header("content-type"), Some("application/javascript"));
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("v1").await.unwrap();
        assert!(db.match_entry("v1", "nonexistent").await.unwrap().is_none());
        assert!(db.match_entry("v9", "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("v1").await.unwrap();

        db.put_entry("v1", &make_entry("https://example.com/app.js", "first"))
            .await
            .unwrap();
        db.put_entry("v1", &make_entry("https://example.com/app.js", "second"))
            .await
            .unwrap();

        assert_eq!(db.entry_count("v1").await.unwrap(), 1);
        let key = compute_cache_key("GET", "https://example.com/app.js");
        let stored = db.match_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"second");
    }

    #[tokio::test]
    async fn test_put_creates_missing_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://example.com/app.js", "X");

        db.put_entry("v1", &entry).await.unwrap();

        assert!(db.has_bucket("v1").await.unwrap());
        assert!(db.has_entry("v1", &entry.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_entries_is_atomic() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut broken = make_entry("https://example.com/index.html", "index");
        broken.response.status = 0;
        let entries = vec![make_entry("https://example.com/", "shell"), broken];

        assert!(db.put_entries("v1", entries).await.is_err());
        assert!(!db.has_bucket("v1").await.unwrap());
        assert_eq!(db.entry_count("v1").await.unwrap(), 0);

        let entries = vec![
            make_entry("https://example.com/", "shell"),
            make_entry("https://example.com/index.html", "index"),
        ];
        assert_eq!(db.put_entries("v1", entries).await.unwrap(), 2);
        assert_eq!(db.entry_count("v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_has_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://example.com/app.js", "X");
        assert!(!db.has_entry("v1", &entry.key).await.unwrap());

        db.put_entry("v1", &entry).await.unwrap();
        assert!(db.has_entry("v1", &entry.key).await.unwrap());
        assert!(!db.has_entry("v2", &entry.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_bucket_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("v1").await.unwrap();
        db.put_entry("v1", &make_entry("https://example.com/app.js", "X"))
            .await
            .unwrap();

        db.delete_bucket("v1").await.unwrap();
        db.open_bucket("v1").await.unwrap();
        assert_eq!(db.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_entries_listing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("v1").await.unwrap();
        db.put_entry("v1", &make_entry("https://example.com/b.css", "bb"))
            .await
            .unwrap();
        db.put_entry("v1", &make_entry("https://example.com/a.js", "a"))
            .await
            .unwrap();

        let listed = db.entries("v1").await.unwrap();
        let urls: Vec<_> = listed.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a.js", "https://example.com/b.css"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("v1").await.unwrap();
        db.open_bucket("v2").await.unwrap();
        let entry = make_entry("https://example.com/app.js", "X");
        db.put_entry("v1", &entry).await.unwrap();

        assert!(db.match_entry("v2", &entry.key).await.unwrap().is_none());
    }
}
