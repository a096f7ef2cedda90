//! SQLite cache storage implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::{CacheStorage, CachedResponse};
use crate::http::{Request, Response};

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Cache that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Write `entries` into `bucket` inside a single transaction.
  fn write_entries<'a>(
    &self,
    bucket: &str,
    entries: impl IntoIterator<Item = (&'a Request, &'a Response)>,
  ) -> Result<()> {
    let mut conn = self.lock()?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
      params![bucket],
    )
    .map_err(|e| eyre!("Failed to open cache bucket {}: {}", bucket, e))?;

    for (request, response) in entries {
      let headers = serde_json::to_string(&response.headers)
        .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO cache_entries (bucket, request_key, method, url, status, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          bucket,
          request.cache_key(),
          request.method.as_str(),
          request.cache_url().as_str(),
          response.status,
          headers,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store response for {}: {}", request.url, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One row per bucket; rowid gives creation order
CREATE TABLE IF NOT EXISTS cache_buckets (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses keyed by request hash
CREATE TABLE IF NOT EXISTS cache_entries (
    bucket TEXT NOT NULL,
    request_key TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, request_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_bucket ON cache_entries(bucket);
"#;

impl CacheStorage for SqliteStorage {
  fn open(&self, bucket: &str) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
        params![bucket],
      )
      .map_err(|e| eyre!("Failed to open cache bucket {}: {}", bucket, e))?;

    Ok(())
  }

  fn has(&self, bucket: &str) -> Result<bool> {
    let conn = self.lock()?;

    let found: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM cache_buckets WHERE name = ?",
        params![bucket],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache bucket {}: {}", bucket, e))?;

    Ok(found.is_some())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_buckets ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache buckets: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache bucket name: {}", e))?;

    Ok(names)
  }

  fn delete(&self, bucket: &str) -> Result<bool> {
    let mut conn = self.lock()?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM cache_entries WHERE bucket = ?", params![bucket])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", bucket, e))?;

    let removed = tx
      .execute("DELETE FROM cache_buckets WHERE name = ?", params![bucket])
      .map_err(|e| eyre!("Failed to delete cache bucket {}: {}", bucket, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<()> {
    self.write_entries(bucket, [(request, response)])
  }

  fn put_all(&self, bucket: &str, entries: &[(Request, Response)]) -> Result<()> {
    self.write_entries(bucket, entries.iter().map(|(request, response)| (request, response)))
  }

  fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;

    let row: Option<(u16, String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, headers, body, cached_at FROM cache_entries
         WHERE bucket = ? AND request_key = ?",
        params![bucket, request.cache_key()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache for {}: {}", request.url, e))?;

    match row {
      Some((status, headers, body, cached_at_str)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;

        Ok(Some(CachedResponse {
          response: Response {
            status,
            headers,
            body,
          },
          bucket: bucket.to_string(),
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn entry_count(&self, bucket: &str) -> Result<usize> {
    let conn = self.lock()?;

    let count: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM cache_entries WHERE bucket = ?",
        params![bucket],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to count entries of {}: {}", bucket, e))?;

    Ok(count as usize)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::Method;
  use url::Url;

  fn request(path: &str) -> Request {
    Request::get(Url::parse("http://localhost:8000").unwrap().join(path).unwrap())
  }

  #[test]
  fn test_put_and_match() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let response = Response::new(200, "body").with_header("Content-Type", "text/css");

    storage.put("v1", &request("/static/a.css"), &response).unwrap();

    let hit = storage
      .match_in("v1", &request("/static/a.css"))
      .unwrap()
      .unwrap();
    assert_eq!(hit.response, response);
    assert_eq!(hit.bucket, "v1");
    assert!(storage
      .match_in("v1", &request("/static/b.css"))
      .unwrap()
      .is_none());
  }

  #[test]
  fn test_put_overwrites() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put("v1", &request("/"), &Response::new(200, "old"))
      .unwrap();
    storage
      .put("v1", &request("/"), &Response::new(200, "new"))
      .unwrap();

    let hit = storage.match_in("v1", &request("/")).unwrap().unwrap();
    assert_eq!(hit.response.text(), "new");
    assert_eq!(storage.entry_count("v1").unwrap(), 1);
  }

  #[test]
  fn test_keys_in_creation_order_and_delete() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.open("v1").unwrap();
    storage.open("v2").unwrap();
    storage.open("v1").unwrap();
    storage
      .put("v1", &request("/"), &Response::new(200, "page"))
      .unwrap();

    assert_eq!(storage.keys().unwrap(), vec!["v1", "v2"]);
    assert!(storage.delete("v1").unwrap());
    assert!(!storage.delete("v1").unwrap());
    assert!(!storage.has("v1").unwrap());
    assert_eq!(storage.entry_count("v1").unwrap(), 0);
    assert_eq!(storage.keys().unwrap(), vec!["v2"]);
  }

  #[test]
  fn test_match_any_prefers_oldest_bucket() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put("v1", &request("/"), &Response::new(200, "first"))
      .unwrap();
    storage
      .put("v2", &request("/"), &Response::new(200, "second"))
      .unwrap();

    let hit = storage.match_any(&request("/")).unwrap().unwrap();
    assert_eq!(hit.bucket, "v1");
  }

  #[test]
  fn test_put_all_is_atomic() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .lock()
      .unwrap()
      .execute_batch(
        "CREATE TRIGGER reject_broken BEFORE INSERT ON cache_entries
         WHEN NEW.url LIKE '%broken%'
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
      )
      .unwrap();

    let entries = vec![
      (request("/"), Response::new(200, "shell")),
      (request("/static/broken.css"), Response::new(200, "css")),
    ];
    assert!(storage.put_all("v1", &entries).is_err());
    assert!(!storage.has("v1").unwrap());
    assert_eq!(storage.entry_count("v1").unwrap(), 0);

    storage.put_all("v1", &entries[..1]).unwrap();
    assert_eq!(storage.entry_count("v1").unwrap(), 1);
  }

  #[test]
  fn test_method_is_part_of_key() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .put("v1", &request("/"), &Response::new(200, "page"))
      .unwrap();

    let head = Request::new(Method::HEAD, request("/").url);
    assert!(storage.match_in("v1", &head).unwrap().is_none());
  }
}
