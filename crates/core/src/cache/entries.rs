//! Named-cache operations on the SQLite store.
//!
//! Provides the [`CacheStorage`] implementation for [`CacheDb`]: opening and
//! deleting caches, and reading and upserting their entries.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use super::storage::CacheStorage;
use crate::Error;
use crate::request::ResponseSnapshot;

/// Entries are only ever written for GET requests.
const ENTRY_METHOD: &str = "GET";

fn ensure_cache(conn: &rusqlite::Connection, cache: &str, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![cache, now],
    )?;
    Ok(())
}

fn upsert_entry(
    conn: &rusqlite::Connection, cache: &str, key: &str, response: &ResponseSnapshot, now: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO entries (
            cache_name, key_hash, request_key, url, status, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            request_key = excluded.request_key,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            cache,
            compute_entry_key(ENTRY_METHOD, key),
            key,
            &response.url,
            response.status,
            headers_json,
            &response.body,
            now,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, cache: &str) -> Result<(), Error> {
        let cache = cache.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_cache(conn, &cache, &now) })
            .await
            .map_err(Error::from)
    }

    async fn match_request(&self, cache: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let cache = cache.to_string();
        let key_hash = compute_entry_key(ENTRY_METHOD, key);
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body
                    FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((url, status, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(ResponseSnapshot { url, status, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, cache: &str, key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        let cache = cache.to_string();
        let key = key.to_string();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_cache(&tx, &cache, &now)?;
                upsert_entry(&tx, &cache, &key, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, cache: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error> {
        let cache = cache.to_string();
        let entries = entries.to_vec();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_cache(&tx, &cache, &now)?;
                for (key, response) in &entries {
                    upsert_entry(&tx, &cache, key, response, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, cache: &str) -> Result<bool, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![cache])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Number of entries stored in `cache`.
    pub async fn entry_count(&self, cache: &str) -> Result<u64, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_name = ?1", params![cache], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
