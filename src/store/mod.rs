//! SQLite persistence for samples.
//!
//! The store is append-only. A CPU sample and its per-core rows are written in
//! one transaction, so a core row never exists without its parent.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::record::{CoreSampleRecord, CpuSampleRecord, MemorySampleRecord};
use crate::system::snapshot::{CpuTime, MemorySnapshot};

pub mod schema;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("failed to create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Row id of a persisted CPU sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CpuSampleId(pub i64);

/// Destination for mapped samples. Each call is its own unit of work.
pub trait SampleSink {
    fn save_cpu(&mut self, record: &CpuSampleRecord) -> Result<CpuSampleId, StoreError>;
    fn save_memory(&mut self, record: &MemorySampleRecord) -> Result<i64, StoreError>;
}

struct InsertSql {
    cpu: String,
    core: String,
    memory: String,
}

impl InsertSql {
    fn new() -> Self {
        Self {
            cpu: schema::cpu_stats_table().insert_sql(),
            core: schema::cpu_core_stats_table().insert_sql(),
            memory: schema::mem_stats_table().insert_sql(),
        }
    }
}

pub struct Store {
    conn: Connection,
    sql: InsertSql,
}

impl Store {
    /// Opens (creating if missing) the database file and ensures the schema.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self::with_connection(conn)?;
        info!("sample store ready");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn,
            sql: InsertSql::new(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Creates any missing tables and indexes. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        schema::ensure_schema(&self.conn, &schema::tables())
    }

    pub fn insert_cpu(&mut self, record: &CpuSampleRecord) -> Result<CpuSampleId, StoreError> {
        let tx = self.conn.transaction()?;

        let parent = {
            let mut stmt = tx.prepare_cached(&self.sql.cpu)?;
            stmt.execute(params_from_iter(cpu_values(record)))?;
            tx.last_insert_rowid()
        };

        {
            let mut stmt = tx.prepare_cached(&self.sql.core)?;
            for core in &record.cores {
                stmt.execute(params_from_iter(core_values(core, parent)))?;
            }
        }

        tx.commit()?;
        debug!(id = parent, cores = record.cores.len(), "inserted cpu sample");
        Ok(CpuSampleId(parent))
    }

    pub fn insert_memory(&self, record: &MemorySampleRecord) -> Result<i64, StoreError> {
        let mut stmt = self.conn.prepare_cached(&self.sql.memory)?;
        stmt.execute(params_from_iter(memory_values(record)))?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "inserted memory sample");
        Ok(id)
    }
}

impl SampleSink for Store {
    fn save_cpu(&mut self, record: &CpuSampleRecord) -> Result<CpuSampleId, StoreError> {
        self.insert_cpu(record)
    }

    fn save_memory(&mut self, record: &MemorySampleRecord) -> Result<i64, StoreError> {
        self.insert_memory(record)
    }
}

// SQLite integers are signed; counters are stored bit-for-bit so the whole
// u64 range round-trips.
fn int(v: u64) -> Value {
    Value::Integer(v as i64)
}

fn opt(v: Option<u64>) -> Value {
    v.map_or(Value::Null, int)
}

fn push_cpu_time(out: &mut Vec<Value>, t: &CpuTime) {
    out.extend(
        [
            t.user,
            t.nice,
            t.system,
            t.idle,
            t.iowait,
            t.irq,
            t.softirq,
            t.steal,
            t.guest,
            t.guest_nice,
        ]
        .map(int),
    );
}

fn cpu_values(r: &CpuSampleRecord) -> Vec<Value> {
    let mut out = Vec::with_capacity(18);
    out.push(Value::Integer(r.created_at));
    out.push(int(r.boot_time));
    push_cpu_time(&mut out, &r.stat);
    out.extend(
        [
            r.irq_total,
            r.context_switches,
            r.process_created,
            r.processes_running,
            r.processes_blocked,
            r.softirq_total,
        ]
        .map(int),
    );
    out
}

fn core_values(c: &CoreSampleRecord, parent: i64) -> Vec<Value> {
    let mut out = Vec::with_capacity(13);
    out.push(Value::Integer(c.created_at));
    out.push(Value::Integer(i64::from(c.core_no)));
    push_cpu_time(&mut out, &c.stat);
    out.push(Value::Integer(parent));
    out
}

fn memory_values(r: &MemorySampleRecord) -> Vec<Value> {
    let MemorySnapshot {
        mem_total,
        mem_free,
        mem_available,
        buffers,
        cached,
        swap_cached,
        active,
        inactive,
        swap_total,
        swap_free,
        dirty,
        writeback,
        anon_pages,
        mapped,
        shmem,
        slab,
        s_reclaimable,
        s_unreclaim,
        page_tables,
        committed_as,
    } = r.memory.clone();

    let mut out = Vec::with_capacity(21);
    out.push(Value::Integer(r.created_at));
    out.extend(
        [
            mem_total,
            mem_free,
            mem_available,
            buffers,
            cached,
            swap_cached,
            active,
            inactive,
            swap_total,
            swap_free,
            dirty,
            writeback,
            anon_pages,
            mapped,
            shmem,
            slab,
            s_reclaimable,
            s_unreclaim,
            page_tables,
            committed_as,
        ]
        .map(opt),
    );
    out
}
