//! `DocumentStore` over the `documents` table.

use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use adotely_types::paths;
use adotely_types::{
    Document, DocumentStore, Fields, Predicate, Snapshot, SnapshotCallback, StoreError,
    StoreResult, Subscription,
};

use crate::models::DocumentRow;
use crate::queries::OptionalExt;
use crate::{Database, backend};

impl Database {
    /// Current state of a document or collection target.
    fn snapshot(&self, target: &str) -> StoreResult<Snapshot> {
        if paths::is_document_path(target) {
            Ok(Snapshot::Document(self.get(target)?))
        } else {
            Ok(Snapshot::Collection(self.query(target, &[])?))
        }
    }

    /// Push fresh snapshots to watchers of `path` and of its collection.
    fn notify_documents(&self, path: &str, collection: &str) {
        let watchers = self
            .doc_watchers
            .matching(|target| target == path || target == collection);

        for (target, callback) in watchers {
            match self.snapshot(&target) {
                Ok(snapshot) => callback(snapshot),
                Err(e) => warn!("Snapshot of {} failed: {}", target, e),
            }
        }
    }
}

impl DocumentStore for Database {
    fn get(&self, path: &str) -> StoreResult<Option<Document>> {
        paths::split_document(path)?;
        let row = self
            .with_conn(|conn| query_document(conn, path))
            .map_err(backend)?;
        row.map(into_document).transpose()
    }

    fn set(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        let (collection, id) = paths::split_document(path)?;

        self.with_conn(|conn| {
            let fields = if merge {
                match query_document(conn, path)? {
                    Some(row) => {
                        let mut existing: Fields = serde_json::from_str(&row.fields)?;
                        existing.extend(fields);
                        existing
                    }
                    None => fields,
                }
            } else {
                fields
            };
            upsert_document(conn, path, &collection, &id, &fields)
        })
        .map_err(backend)?;

        debug!("Document written: {}", path);
        self.notify_documents(path, &collection);
        Ok(())
    }

    fn update(&self, path: &str, fields: Fields) -> StoreResult<()> {
        let (collection, id) = paths::split_document(path)?;

        let found = self
            .with_conn(|conn| {
                let Some(row) = query_document(conn, path)? else {
                    return Ok(false);
                };
                let mut existing: Fields = serde_json::from_str(&row.fields)?;
                existing.extend(fields);
                upsert_document(conn, path, &collection, &id, &existing)?;
                Ok(true)
            })
            .map_err(backend)?;

        if !found {
            return Err(StoreError::NotFound(path.to_string()));
        }

        self.notify_documents(path, &collection);
        Ok(())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        let (collection, _) = paths::split_document(path)?;

        let removed = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM documents WHERE path = ?1", [path])?))
            .map_err(backend)?;

        if removed > 0 {
            debug!("Document deleted: {}", path);
            self.notify_documents(path, &collection);
        }
        Ok(())
    }

    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        if !paths::is_collection_path(collection) {
            return Err(StoreError::InvalidPath(format!(
                "not a collection path: {}",
                collection
            )));
        }

        let id = Uuid::new_v4().simple().to_string();
        self.set(&format!("{}/{}", collection, id), fields, false)?;
        Ok(id)
    }

    fn query(&self, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>> {
        if !paths::is_collection_path(collection) {
            return Err(StoreError::InvalidPath(format!(
                "not a collection path: {}",
                collection
            )));
        }

        let rows = self
            .with_conn(|conn| query_collection(conn, collection))
            .map_err(backend)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc = into_document(row)?;
            if predicates.iter().all(|p| p.matches(&doc.fields)) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    fn subscribe(&self, path: &str, callback: SnapshotCallback) -> StoreResult<Subscription> {
        paths::segments(path)?;

        let subscription = self.doc_watchers.register(path, callback.clone());
        callback(self.snapshot(path)?);
        Ok(subscription)
    }
}

fn into_document(row: DocumentRow) -> StoreResult<Document> {
    let fields: Fields = serde_json::from_str(&row.fields)?;
    Ok(Document {
        id: row.doc_id,
        path: row.path,
        fields,
    })
}

fn upsert_document(
    conn: &Connection,
    path: &str,
    collection: &str,
    id: &str,
    fields: &Fields,
) -> Result<()> {
    // An overwrite keeps the original `seq`, so collections stay in insertion order.
    conn.execute(
        "INSERT INTO documents (path, collection, doc_id, fields, seq)
         VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents))
         ON CONFLICT(path) DO UPDATE SET fields = excluded.fields, updated_at = datetime('now')",
        rusqlite::params![path, collection, id, serde_json::to_string(fields)?],
    )?;
    Ok(())
}

fn query_document(conn: &Connection, path: &str) -> Result<Option<DocumentRow>> {
    let mut stmt = conn.prepare("SELECT path, doc_id, fields FROM documents WHERE path = ?1")?;

    let row = stmt
        .query_row([path], |row| {
            Ok(DocumentRow {
                path: row.get(0)?,
                doc_id: row.get(1)?,
                fields: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_collection(conn: &Connection, collection: &str) -> Result<Vec<DocumentRow>> {
    let mut stmt = conn.prepare(
        "SELECT path, doc_id, fields FROM documents WHERE collection = ?1 ORDER BY seq",
    )?;

    let rows = stmt
        .query_map([collection], |row| {
            Ok(DocumentRow {
                path: row.get(0)?,
                doc_id: row.get(1)?,
                fields: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
