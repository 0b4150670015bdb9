//! Request repository: CRUD operations for the `requests` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw request row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_by: String,
    pub created_at: String,
    pub status: i64,
    pub rejection_reason: Option<String>,
    pub assigned_officer: Option<String>,
    pub pre_batch_status: Option<i64>,
    /// JSON array of template variables.
    pub template_variables: String,
}

impl RequestRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            status: row.get("status")?,
            rejection_reason: row.get("rejection_reason")?,
            assigned_officer: row.get("assigned_officer")?,
            pre_batch_status: row.get("pre_batch_status")?,
            template_variables: row.get("template_variables")?,
        })
    }
}

/// Inserts a new request row.
pub fn insert(db: &Database, request: &RequestRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO requests (id, title, description, created_by, created_at, status,
             rejection_reason, assigned_officer, pre_batch_status, template_variables)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                request.id,
                request.title,
                request.description,
                request.created_by,
                request.created_at,
                request.status,
                request.rejection_reason,
                request.assigned_officer,
                request.pre_batch_status,
                request.template_variables,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites the mutable fields of a request. Returns the number of rows
/// touched (0 when the id is unknown).
pub fn update(db: &Database, request: &RequestRow) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE requests SET title=?2, description=?3, status=?4, rejection_reason=?5,
             assigned_officer=?6, pre_batch_status=?7, template_variables=?8
             WHERE id=?1",
            params![
                request.id,
                request.title,
                request.description,
                request.status,
                request.rejection_reason,
                request.assigned_officer,
                request.pre_batch_status,
                request.template_variables,
            ],
        )?;
        Ok(changed)
    })
}

/// Finds a request by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RequestRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM requests WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], RequestRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Deletes a request. Documents go with it through the foreign key cascade.
pub fn delete(db: &Database, id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM requests WHERE id = ?1", params![id])?;
        if changed > 0 {
            log::debug!("Deleted request {}", id);
        }
        Ok(changed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_request(id: &str) -> RequestRow {
        RequestRow {
            id: id.to_string(),
            title: "Permits".to_string(),
            description: "Quarterly permits".to_string(),
            created_by: "owner-1".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            status: 0,
            rejection_reason: None,
            assigned_officer: None,
            pre_batch_status: None,
            template_variables: "[]".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let row = sample_request("r1");
        insert(&db, &row).unwrap();

        let found = find_by_id(&db, "r1").unwrap().unwrap();
        assert_eq!(found, row);
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_update() {
        let db = test_db();
        let mut row = sample_request("r1");
        insert(&db, &row).unwrap();

        row.status = 2;
        row.rejection_reason = Some("incomplete".to_string());
        assert_eq!(update(&db, &row).unwrap(), 1);

        let found = find_by_id(&db, "r1").unwrap().unwrap();
        assert_eq!(found.status, 2);
        assert_eq!(found.rejection_reason.as_deref(), Some("incomplete"));
    }

    #[test]
    fn test_update_unknown_touches_nothing() {
        let db = test_db();
        assert_eq!(update(&db, &sample_request("ghost")).unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        insert(&db, &sample_request("r1")).unwrap();
        insert(&db, &sample_request("r2")).unwrap();

        assert_eq!(delete(&db, "r1").unwrap(), 1);
        assert_eq!(delete(&db, "r1").unwrap(), 0);
        assert!(find_by_id(&db, "r1").unwrap().is_none());
        assert!(find_by_id(&db, "r2").unwrap().is_some());
    }
}
