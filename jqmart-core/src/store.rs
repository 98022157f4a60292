//! Parquet warehouse.
//!
//! Layout: `{root}/{schema}/{table}.parquet` with a `{table}.meta.json`
//! sidecar carrying row count, a blake3 fingerprint, and the write time.
//! Every write is a full replacement of the table, done atomically: write to
//! a `.tmp` file, then rename into place.

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Warehouse schemas. `raw` tables are provider-shaped; `marts` tables are
/// the star schema the pipeline materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaName {
    Raw,
    Marts,
}

impl SchemaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::Raw => "raw",
            SchemaName::Marts => "marts",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("warehouse I/O error: {0}")]
    Io(String),

    #[error("parquet error for table '{table}': {message}")]
    Parquet { table: String, message: String },

    #[error("no such table '{schema}.{table}' — run `extract` or `build` first")]
    NoSuchTable {
        schema: &'static str,
        table: String,
    },
}

/// Metadata sidecar for a materialized table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub schema: String,
    pub table: String,
    pub row_count: usize,
    pub fingerprint: String,
    pub written_at: NaiveDateTime,
}

/// The warehouse directory.
pub struct Warehouse {
    root: PathBuf,
}

impl Warehouse {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, schema: SchemaName, table: &str) -> PathBuf {
        self.root
            .join(schema.as_str())
            .join(format!("{table}.parquet"))
    }

    fn meta_path(&self, schema: SchemaName, table: &str) -> PathBuf {
        self.root
            .join(schema.as_str())
            .join(format!("{table}.meta.json"))
    }

    /// Replace a table with the given frame. Returns the new sidecar.
    pub fn write_table(
        &self,
        schema: SchemaName,
        table: &str,
        df: &DataFrame,
    ) -> Result<TableMeta, StoreError> {
        let dir = self.root.join(schema.as_str());
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Io(format!("create {}: {e}", dir.display())))?;

        let path = self.table_path(schema, table);
        let tmp_path = path.with_extension("parquet.tmp");

        let file = fs::File::create(&tmp_path)
            .map_err(|e| StoreError::Io(format!("create {}: {e}", tmp_path.display())))?;
        ParquetWriter::new(file)
            .finish(&mut df.clone())
            .map_err(|e| StoreError::Parquet {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        let meta = TableMeta {
            schema: schema.as_str().to_string(),
            table: table.to_string(),
            row_count: df.height(),
            fingerprint: table_fingerprint(df),
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Io(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(schema, table), meta_json)
            .map_err(|e| StoreError::Io(format!("meta write: {e}")))?;

        Ok(meta)
    }

    /// Load a table. Missing tables are a typed error, not a panic.
    pub fn read_table(&self, schema: SchemaName, table: &str) -> Result<DataFrame, StoreError> {
        let path = self.table_path(schema, table);
        if !path.exists() {
            return Err(StoreError::NoSuchTable {
                schema: schema.as_str(),
                table: table.to_string(),
            });
        }

        let file = fs::File::open(&path)
            .map_err(|e| StoreError::Io(format!("open {}: {e}", path.display())))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Parquet {
                table: table.to_string(),
                message: e.to_string(),
            })
    }

    /// Read a table's metadata sidecar, if it exists.
    pub fn table_meta(&self, schema: SchemaName, table: &str) -> Option<TableMeta> {
        let content = fs::read_to_string(self.meta_path(schema, table)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Sidecars for every table currently in the warehouse, both schemas,
    /// sorted by schema then table name.
    pub fn status(&self) -> Vec<TableMeta> {
        let mut metas = Vec::new();

        for schema in [SchemaName::Raw, SchemaName::Marts] {
            let dir = self.root.join(schema.as_str());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                    continue;
                }
                if let Some(table) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Some(meta) = self.table_meta(schema, table) {
                        metas.push(meta);
                    }
                }
            }
        }

        metas.sort_by(|a, b| (&a.schema, &a.table).cmp(&(&b.schema, &b.table)));
        metas
    }
}

/// Deterministic blake3 fingerprint of a table's contents.
///
/// Hashes the column names, dtypes, and every value in row-major order, so
/// two runs producing identical data produce identical fingerprints.
pub fn table_fingerprint(df: &DataFrame) -> String {
    let mut hasher = blake3::Hasher::new();

    for column in df.get_columns() {
        hasher.update(column.name().as_bytes());
        hasher.update(format!("{:?}", column.dtype()).as_bytes());
    }

    for i in 0..df.height() {
        for column in df.get_columns() {
            if let Ok(value) = column.as_materialized_series().get(i) {
                hasher.update(format!("{value:?}").as_bytes());
            }
            hasher.update(&[0x1f]);
        }
    }

    hasher.finalize().to_hex().to_string()
}
