//! Table definitions, kept apart from the record types they store.
//!
//! Every table gets an `id INTEGER PRIMARY KEY AUTOINCREMENT` column ahead of
//! the columns listed here. Creation is idempotent.

use rusqlite::Connection;
use tracing::debug;

use super::StoreError;

pub const CPU_STATS: &str = "cpu_stats";
pub const CPU_CORE_STATS: &str = "cpu_core_stats";
pub const MEM_STATS: &str = "mem_stats";

/// Columns of an embedded [`CpuTime`](crate::system::snapshot::CpuTime), in field order.
pub const CPU_TIME_COLUMNS: [&str; 10] = [
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];

pub const MEMORY_COLUMNS: [&str; 20] = [
    "mem_total",
    "mem_free",
    "mem_available",
    "buffers",
    "cached",
    "swap_cached",
    "active",
    "inactive",
    "swap_total",
    "swap_free",
    "dirty",
    "writeback",
    "anon_pages",
    "mapped",
    "shmem",
    "slab",
    "s_reclaimable",
    "s_unreclaim",
    "page_tables",
    "committed_as",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub nullable: bool,
}

impl Column {
    fn required(name: &'static str) -> Self {
        Self {
            name,
            nullable: false,
        }
    }

    fn optional(name: &'static str) -> Self {
        Self {
            name,
            nullable: true,
        }
    }
}

/// A child column referencing the parent's `id`. Children are deleted with their parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub parent: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub foreign_key: Option<ForeignKey>,
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut defs = vec!["\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for col in &self.columns {
            let constraint = if col.nullable { "" } else { " NOT NULL" };
            defs.push(format!("\"{}\" INTEGER{constraint}", col.name));
        }
        if let Some(fk) = &self.foreign_key {
            defs.push(format!(
                "FOREIGN KEY (\"{}\") REFERENCES \"{}\" (\"id\") ON DELETE CASCADE",
                fk.column, fk.parent
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
            self.name,
            defs.join(",\n    ")
        )
    }

    pub fn index_sql(&self) -> Option<String> {
        self.foreign_key.as_ref().map(|fk| {
            format!(
                "CREATE INDEX IF NOT EXISTS \"idx_{table}_{col}\" ON \"{table}\" (\"{col}\")",
                table = self.name,
                col = fk.column
            )
        })
    }

    /// Insert statement binding every listed column, in order, as `?1..?N`.
    pub fn insert_sql(&self) -> String {
        let names: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

pub fn cpu_stats_table() -> Table {
    let mut columns = vec![Column::required("created_at"), Column::required("boot_time")];
    columns.extend(CPU_TIME_COLUMNS.iter().copied().map(Column::required));
    columns.extend(
        [
            "irq_total",
            "context_switches",
            "process_created",
            "processes_running",
            "processes_blocked",
            "softirq_total",
        ]
        .into_iter()
        .map(Column::required),
    );
    Table {
        name: CPU_STATS,
        columns,
        foreign_key: None,
    }
}

pub fn cpu_core_stats_table() -> Table {
    let mut columns = vec![Column::required("created_at"), Column::required("core_no")];
    columns.extend(CPU_TIME_COLUMNS.iter().copied().map(Column::required));
    columns.push(Column::required("cpu_stat_id"));
    Table {
        name: CPU_CORE_STATS,
        columns,
        foreign_key: Some(ForeignKey {
            column: "cpu_stat_id",
            parent: CPU_STATS,
        }),
    }
}

pub fn mem_stats_table() -> Table {
    let mut columns = vec![Column::required("created_at")];
    columns.extend(MEMORY_COLUMNS.iter().copied().map(Column::optional));
    Table {
        name: MEM_STATS,
        columns,
        foreign_key: None,
    }
}

/// All tables, parents before children.
pub fn tables() -> Vec<Table> {
    vec![cpu_stats_table(), cpu_core_stats_table(), mem_stats_table()]
}

pub fn ensure_schema(conn: &Connection, tables: &[Table]) -> Result<(), StoreError> {
    for table in tables {
        if let Some(fk) = &table.foreign_key
            && !tables.iter().any(|t| t.name == fk.parent)
        {
            return Err(StoreError::Schema(format!(
                "{} references unknown table {}",
                table.name, fk.parent
            )));
        }
        conn.execute_batch(&table.create_sql())?;
        if let Some(index) = table.index_sql() {
            conn.execute_batch(&index)?;
        }
        debug!(table = table.name, "ensured table");
    }
    Ok(())
}
