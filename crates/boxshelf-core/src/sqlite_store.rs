use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;

use crate::document::{BoxDocument, Folder, User};
use crate::item::{BoxId, FolderId, UserId};
use crate::mutation::{BoxMutation, FolderMutation, UserMutation};
use crate::query::{BoxQuery, FolderQuery};
use crate::sql_query::{compile_box_query, compile_folder_query};
use crate::store::{DocumentStore, StoreError};

/// SQLite-backed implementation of the DocumentStore trait.
///
/// Each document is one JSON row. The columns next to it (`creator_id`,
/// `is_deleted_by_user`, timestamps) mirror document fields so queries can
/// filter without parsing JSON; they are rewritten on every write.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Storage(format!("open: {}", e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS boxes (
                id TEXT PRIMARY KEY,
                creator_id TEXT NOT NULL,
                is_deleted_by_user INTEGER,
                document TEXT NOT NULL,
                created INTEGER NOT NULL,
                modified INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                creator_id TEXT NOT NULL,
                document TEXT NOT NULL,
                created INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_boxes_creator ON boxes(creator_id);
            CREATE INDEX IF NOT EXISTS idx_boxes_deleted ON boxes(is_deleted_by_user);
            CREATE INDEX IF NOT EXISTS idx_boxes_created ON boxes(created);
            CREATE INDEX IF NOT EXISTS idx_folders_creator ON folders(creator_id);
            ",
        )
        .map_err(|e| StoreError::Storage(format!("init_schema: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn load_document<T: DeserializeOwned>(
        conn: &Connection,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT document FROM {} WHERE id = ?1", table);
        let json: Option<String> = conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::Storage(format!("load {}: {}", table, e)))?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    fn write_box(conn: &Connection, doc: &BoxDocument) -> Result<usize, StoreError> {
        let json = serde_json::to_string(doc)?;
        conn.execute(
            "UPDATE boxes SET creator_id = ?1, is_deleted_by_user = ?2, document = ?3, modified = ?4
             WHERE id = ?5",
            params![
                doc.creator_id,
                doc.is_deleted_by_user.map(|d| d as i32),
                json,
                doc.updated_at.timestamp_millis(),
                doc.id.to_string(),
            ],
        )
        .map_err(|e| StoreError::Storage(format!("write box: {}", e)))
    }

    fn run_box_query<'c>(
        conn: &'c Connection,
        select: &str,
        q: &BoxQuery,
    ) -> Result<rusqlite::Statement<'c>, StoreError> {
        let compiled = compile_box_query(q);
        let sql = format!(
            "{} FROM boxes {} {}",
            select, compiled.where_clause, compiled.order_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Storage(format!("prepare query: {} (sql: {})", e, sql)))?;
        for (i, p) in compiled.params.iter().enumerate() {
            stmt.raw_bind_parameter(i + 1, p)
                .map_err(|e| StoreError::Storage(format!("bind: {}", e)))?;
        }
        Ok(stmt)
    }
}

fn map_insert_error(e: rusqlite::Error, what: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::AlreadyExists(what.to_string());
        }
    }
    StoreError::Storage(format!("insert: {}", e))
}

impl DocumentStore for SqliteDocumentStore {
    fn insert_box(&self, doc: BoxDocument) -> Result<BoxId, StoreError> {
        let conn = self.lock()?;
        let json = serde_json::to_string(&doc)?;
        conn.execute(
            "INSERT INTO boxes (id, creator_id, is_deleted_by_user, document, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                doc.id.to_string(),
                doc.creator_id,
                doc.is_deleted_by_user.map(|d| d as i32),
                json,
                doc.created_at.timestamp_millis(),
                doc.updated_at.timestamp_millis(),
            ],
        )
        .map_err(|e| map_insert_error(e, &format!("box {}", doc.id)))?;
        Ok(doc.id)
    }

    fn get_box(&self, id: BoxId) -> Result<Option<BoxDocument>, StoreError> {
        let conn = self.lock()?;
        Self::load_document(&conn, "boxes", &id.to_string())
    }

    fn find_boxes(&self, q: &BoxQuery) -> Result<Vec<BoxDocument>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = Self::run_box_query(&conn, "SELECT document", q)?;
        let mut rows = stmt.raw_query();
        let mut docs = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| StoreError::Storage(format!("row: {}", e)))?
        {
            let json: String = row
                .get(0)
                .map_err(|e| StoreError::Storage(format!("row document: {}", e)))?;
            docs.push(serde_json::from_str(&json)?);
        }
        Ok(docs)
    }

    fn count_boxes(&self, q: &BoxQuery) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let unsorted = BoxQuery {
            sort: Vec::new(),
            ..q.clone()
        };
        let mut stmt = Self::run_box_query(&conn, "SELECT COUNT(*)", &unsorted)?;
        let mut rows = stmt.raw_query();
        let count: i64 = match rows
            .next()
            .map_err(|e| StoreError::Storage(format!("count: {}", e)))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| StoreError::Storage(format!("count: {}", e)))?,
            None => 0,
        };
        Ok(count as usize)
    }

    fn update_box(
        &self,
        id: BoxId,
        mutations: Vec<BoxMutation>,
    ) -> Result<Option<BoxDocument>, StoreError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {}", e)))?;

        let Some(mut doc) = Self::load_document::<BoxDocument>(&tx, "boxes", &id.to_string())?
        else {
            tracing::debug!(box_id = %id, "update matched no box");
            return Ok(None);
        };
        for mutation in &mutations {
            mutation.apply(&mut doc);
        }
        doc.updated_at = Utc::now();
        Self::write_box(&tx, &doc)?;

        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {}", e)))?;
        Ok(Some(doc))
    }

    fn replace_box(&self, id: BoxId, mut doc: BoxDocument) -> Result<Option<BoxDocument>, StoreError> {
        let conn = self.lock()?;
        doc.id = id;
        doc.updated_at = Utc::now();
        let rows = Self::write_box(&conn, &doc)?;
        Ok((rows > 0).then_some(doc))
    }

    fn insert_folder(&self, folder: Folder) -> Result<FolderId, StoreError> {
        let conn = self.lock()?;
        let json = serde_json::to_string(&folder)?;
        conn.execute(
            "INSERT INTO folders (id, creator_id, document, created) VALUES (?1, ?2, ?3, ?4)",
            params![
                folder.id.to_string(),
                folder.creator_id,
                json,
                folder.created_at.timestamp_millis(),
            ],
        )
        .map_err(|e| map_insert_error(e, &format!("folder {}", folder.id)))?;
        Ok(folder.id)
    }

    fn get_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError> {
        let conn = self.lock()?;
        Self::load_document(&conn, "folders", &id.to_string())
    }

    fn find_folders(&self, q: &FolderQuery) -> Result<Vec<Folder>, StoreError> {
        let conn = self.lock()?;
        let compiled = compile_folder_query(q);
        let sql = format!(
            "SELECT document FROM folders {} {}",
            compiled.where_clause, compiled.order_clause
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> = compiled
            .params
            .iter()
            .map(|p| p as &dyn rusqlite::types::ToSql)
            .collect();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Storage(format!("prepare folders: {}", e)))?;
        let rows = stmt
            .query_map(params_ref.as_slice(), |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Storage(format!("query folders: {}", e)))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| StoreError::Storage(format!("collect folders: {}", e)))?;
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    fn update_folder(
        &self,
        id: FolderId,
        mutations: Vec<FolderMutation>,
    ) -> Result<Option<Folder>, StoreError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {}", e)))?;
        let Some(mut folder) = Self::load_document::<Folder>(&tx, "folders", &id.to_string())?
        else {
            return Ok(None);
        };
        for mutation in &mutations {
            mutation.apply(&mut folder);
        }
        tx.execute(
            "UPDATE folders SET document = ?1 WHERE id = ?2",
            params![serde_json::to_string(&folder)?, id.to_string()],
        )
        .map_err(|e| StoreError::Storage(format!("write folder: {}", e)))?;
        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {}", e)))?;
        Ok(Some(folder))
    }

    fn delete_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError> {
        let conn = self.lock()?;
        let folder = Self::load_document::<Folder>(&conn, "folders", &id.to_string())?;
        if folder.is_some() {
            conn.execute("DELETE FROM folders WHERE id = ?1", params![id.to_string()])
                .map_err(|e| StoreError::Storage(format!("delete folder: {}", e)))?;
        }
        Ok(folder)
    }

    fn insert_user(&self, user: User) -> Result<UserId, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, document) VALUES (?1, ?2)",
            params![user.id, serde_json::to_string(&user)?],
        )
        .map_err(|e| map_insert_error(e, &format!("user {}", user.id)))?;
        Ok(user.id)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        Self::load_document(&conn, "users", id)
    }

    fn update_user(
        &self,
        id: &str,
        mutations: Vec<UserMutation>,
    ) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {}", e)))?;
        let Some(mut user) = Self::load_document::<User>(&tx, "users", id)? else {
            return Ok(None);
        };
        for mutation in &mutations {
            mutation.apply(&mut user);
        }
        tx.execute(
            "UPDATE users SET document = ?1 WHERE id = ?2",
            params![serde_json::to_string(&user)?, id],
        )
        .map_err(|e| StoreError::Storage(format!("write user: {}", e)))?;
        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {}", e)))?;
        Ok(Some(user))
    }
}
