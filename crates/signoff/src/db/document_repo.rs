//! Document repository: CRUD operations for the `documents` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw document row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub id: String,
    pub request_id: String,
    pub name: String,
    pub sign_status: i64,
    pub uploaded_at: String,
    pub signed_date: Option<String>,
    pub rejection_reason: Option<String>,
    /// JSON object of template field values.
    pub data: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            request_id: row.get("request_id")?,
            name: row.get("name")?,
            sign_status: row.get("sign_status")?,
            uploaded_at: row.get("uploaded_at")?,
            signed_date: row.get("signed_date")?,
            rejection_reason: row.get("rejection_reason")?,
            data: row.get("data")?,
        })
    }
}

/// Inserts all rows in a single transaction. Either every row lands or none.
pub fn insert_many(db: &Database, documents: &[DocumentRow]) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (id, request_id, name, sign_status, uploaded_at,
                 signed_date, rejection_reason, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for doc in documents {
                stmt.execute(params![
                    doc.id,
                    doc.request_id,
                    doc.name,
                    doc.sign_status,
                    doc.uploaded_at,
                    doc.signed_date,
                    doc.rejection_reason,
                    doc.data,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("Inserted {} document(s)", documents.len());
        Ok(())
    })
}

/// Overwrites the mutable fields of a document. Returns the number of rows touched.
pub fn update(db: &Database, doc: &DocumentRow) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET name=?3, sign_status=?4, signed_date=?5,
             rejection_reason=?6, data=?7
             WHERE id=?1 AND request_id=?2",
            params![
                doc.id,
                doc.request_id,
                doc.name,
                doc.sign_status,
                doc.signed_date,
                doc.rejection_reason,
                doc.data,
            ],
        )?;
        Ok(changed)
    })
}

/// Lists the documents of a request in signing order.
pub fn list_for_request(
    db: &Database,
    request_id: &str,
) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE request_id = ?1 ORDER BY uploaded_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![request_id], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Checks whether any of the given ids already exists.
pub fn find_existing_id(db: &Database, ids: &[&str]) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT id FROM documents WHERE id = ?1")?;
        for id in ids {
            let mut rows = stmt.query_map(params![id], |r| r.get::<_, String>(0))?;
            match rows.next() {
                Some(Ok(found)) => return Ok(Some(found)),
                Some(Err(e)) => return Err(DatabaseError::Sqlite(e)),
                None => {}
            }
        }
        Ok(None)
    })
}

/// Deletes one document of a request.
pub fn delete(db: &Database, request_id: &str, document_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM documents WHERE id = ?1 AND request_id = ?2",
            params![document_id, request_id],
        )?;
        Ok(changed)
    })
}
