use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const TABLENAME: &str = "config";
const KEY_FIELD: &str = "section";
const VALUE_FIELD: &str = "value";

#[derive(Error, Debug)]
pub enum CfgDbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct AccessRO;
pub struct AccessRW;

/// SQLite-backed store of per-section config blobs, serialized as JSON.
pub struct CfgDb<AccessTag>(Connection, AccessTag);

pub type CfgDbRW = CfgDb<AccessRW>;
pub type CfgDbRO = CfgDb<AccessRO>;

// Methods common to read-only and read-write connections
impl<AccessTag> CfgDb<AccessTag> {
    fn select<K: AsRef<str>>(&self, section: K) -> Result<Option<Vec<u8>>, CfgDbError> {
        self.0
            .query_row(
                &format!("SELECT {VALUE_FIELD} FROM '{TABLENAME}' WHERE {KEY_FIELD} = ?1"),
                [section.as_ref()],
                |r| r.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get<T: DeserializeOwned>(&self, section: impl AsRef<str>) -> Result<Option<T>, CfgDbError> {
        self.select(section)?
            .map(|v| serde_json::from_slice::<T>(&v))
            .transpose()
            .map_err(Into::into)
    }
}

// Methods specific to read-only connection
impl CfgDbRO {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CfgDbError> {
        log::debug!("Connecting to config store in read-only mode");
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(CfgDb(connection, AccessRO))
    }
}

// Methods specific to read-write connection
impl CfgDbRW {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CfgDbError> {
        log::debug!("Connecting to config store in read-write mode");
        // Create directory for DB if it doesn't already exist
        std::fs::create_dir_all(path.as_ref().parent().unwrap_or(Path::new("")))?;
        let connection = Connection::open(path)?;
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS '{TABLENAME}' (
                {KEY_FIELD} TEXT PRIMARY KEY NOT NULL,
                {VALUE_FIELD} BLOB NOT NULL
                )"
            ),
            [],
        )?;

        Ok(CfgDb(connection, AccessRW))
    }

    fn upsert<K: AsRef<str>, V: AsRef<[u8]>>(&self, section: K, value: V) -> Result<(), CfgDbError> {
        let mut stmt = self.0.prepare(&format!(
            "INSERT INTO '{TABLENAME}' ({KEY_FIELD}, {VALUE_FIELD}) values (?1, ?2)
            ON CONFLICT({KEY_FIELD}) DO UPDATE SET {VALUE_FIELD}=?2",
        ))?;
        stmt.execute(params![section.as_ref(), value.as_ref()])?;
        Ok(())
    }

    pub fn set<K: AsRef<str>, V: Serialize>(&self, section: K, value: V) -> Result<(), CfgDbError> {
        self.upsert(section, serde_json::to_vec(&value)?)?;
        Ok(())
    }
}
