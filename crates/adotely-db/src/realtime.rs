//! `RealtimeStore` over the `realtime_nodes` table.
//!
//! The tree is stored as leaves: setting an object writes one row per leaf,
//! and reads reassemble the subtree below the requested path.

use std::sync::atomic::Ordering;

use anyhow::Result;
use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::warn;

use adotely_types::paths;
use adotely_types::{RealtimeStore, StoreError, StoreResult, Subscription, ValueCallback};

use crate::models::NodeRow;
use crate::{Database, backend};

impl Database {
    /// Child keys sort in creation order: epoch millis, then a sequence number.
    fn next_push_key(&self) -> String {
        let seq = self.push_seq.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        format!("{:013}-{:06}", chrono::Utc::now().timestamp_millis(), seq)
    }

    /// Push fresh values to watchers of `path`, its ancestors and its descendants.
    fn notify_nodes(&self, path: &str) {
        let watchers = self.node_watchers.matching(|target| related(target, path));

        for (target, callback) in watchers {
            match self.get_once(&target) {
                Ok(value) => callback(value),
                Err(e) => warn!("Realtime read of {} failed: {}", target, e),
            }
        }
    }
}

impl RealtimeStore for Database {
    fn push(&self, path: &str, value: Value) -> StoreResult<String> {
        paths::segments(path)?;
        let key = self.next_push_key();
        self.set(&format!("{}/{}", path, key), value)?;
        Ok(key)
    }

    fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        let segments = paths::segments(path)?;

        let mut leaves = Vec::new();
        flatten(path, value, &mut leaves);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            remove_subtree(&tx, path)?;

            // A leaf on any ancestor would shadow the new subtree.
            for depth in 1..segments.len() {
                tx.execute(
                    "DELETE FROM realtime_nodes WHERE path = ?1",
                    [segments[..depth].join("/")],
                )?;
            }

            for (leaf_path, leaf) in &leaves {
                tx.execute(
                    "INSERT INTO realtime_nodes (path, parent, value) VALUES (?1, ?2, ?3)",
                    rusqlite::params![leaf_path, paths::parent(leaf_path), leaf.to_string()],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .map_err(backend)?;

        self.notify_nodes(path);
        Ok(())
    }

    fn remove(&self, path: &str) -> StoreResult<()> {
        paths::segments(path)?;

        let removed = self
            .with_conn(|conn| remove_subtree(conn, path))
            .map_err(backend)?;

        if removed > 0 {
            self.notify_nodes(path);
        }
        Ok(())
    }

    fn get_once(&self, path: &str) -> StoreResult<Option<Value>> {
        paths::segments(path)?;

        let rows = self
            .with_conn(|conn| query_subtree(conn, path))
            .map_err(backend)?;

        assemble(path, rows)
    }

    fn subscribe(&self, path: &str, callback: ValueCallback) -> StoreResult<Subscription> {
        paths::segments(path)?;

        let subscription = self.node_watchers.register(path, callback.clone());
        callback(self.get_once(path)?);
        Ok(subscription)
    }
}

/// Two paths are related when one is the other or an ancestor of it.
fn related(a: &str, b: &str) -> bool {
    a == b || is_ancestor(a, b) || is_ancestor(b, a)
}

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

fn flatten(path: &str, value: Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Null => {}
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten(&format!("{}/{}", path, key), child, out);
            }
        }
        // An empty object has no leaves, same as null.
        Value::Object(_) => {}
        leaf => out.push((path.to_string(), leaf)),
    }
}

fn remove_subtree(conn: &Connection, path: &str) -> Result<usize> {
    let prefix = format!("{}/", path);
    let removed = conn.execute(
        "DELETE FROM realtime_nodes WHERE path = ?1 OR substr(path, 1, ?2) = ?3",
        rusqlite::params![path, prefix.len() as i64, prefix],
    )?;
    Ok(removed)
}

fn query_subtree(conn: &Connection, path: &str) -> Result<Vec<NodeRow>> {
    let prefix = format!("{}/", path);
    let mut stmt = conn.prepare(
        "SELECT path, value FROM realtime_nodes
         WHERE path = ?1 OR substr(path, 1, ?2) = ?3
         ORDER BY path",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![path, prefix.len() as i64, prefix], |row| {
            Ok(NodeRow {
                path: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn assemble(path: &str, rows: Vec<NodeRow>) -> StoreResult<Option<Value>> {
    if rows.is_empty() {
        return Ok(None);
    }

    let mut root = Map::new();
    for row in rows {
        let value: Value = serde_json::from_str(&row.value)?;
        if row.path == path {
            return Ok(Some(value));
        }

        let relative = &row.path[path.len() + 1..];
        let mut parts = relative.split('/').peekable();
        let mut node = &mut root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                node.insert(part.to_string(), value);
                break;
            }
            let child = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match child {
                Value::Object(map) => map,
                _ => {
                    return Err(StoreError::InvalidDocument(format!(
                        "leaf and subtree overlap at {}",
                        row.path
                    )));
                }
            };
        }
    }

    Ok(Some(Value::Object(root)))
}
