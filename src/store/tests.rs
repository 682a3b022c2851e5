use super::*;
use crate::record::{map_cpu, map_memory};
use crate::system::snapshot::CpuSnapshot;

fn time(user: u64, system: u64, idle: u64) -> CpuTime {
    CpuTime {
        user,
        system,
        idle,
        ..CpuTime::default()
    }
}

fn scenario_snapshot() -> CpuSnapshot {
    CpuSnapshot {
        boot_time: 1_000_000,
        total: time(10, 5, 85),
        cores: vec![time(6, 2, 92), time(4, 3, 93)],
        irq_total: 42,
        context_switches: 17,
        process_created: 3,
        processes_running: 1,
        processes_blocked: 0,
        softirq_total: 8,
    }
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .conn
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })
        .unwrap()
}

fn columns(store: &Store, table: &str) -> Vec<String> {
    let mut stmt = store
        .conn
        .prepare(&format!("PRAGMA table_info(\"{table}\")"))
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn open_in_memory_creates_tables() {
    let store = Store::open_in_memory().unwrap();
    assert_eq!(count(&store, schema::CPU_STATS), 0);
    assert_eq!(count(&store, schema::CPU_CORE_STATS), 0);
    assert_eq!(count(&store, schema::MEM_STATS), 0);
}

#[test]
fn cpu_sample_persists_parent_and_cores() {
    let mut store = Store::open_in_memory().unwrap();
    let id = store.save_cpu(&map_cpu(&scenario_snapshot(), 1)).unwrap();

    assert_eq!(count(&store, schema::CPU_STATS), 1);
    let (boot, user, system, idle, irq, ctxt, created, running, blocked, softirq): (
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = store
        .conn
        .query_row(
            "SELECT boot_time, user, system, idle, irq_total, context_switches, \
             process_created, processes_running, processes_blocked, softirq_total \
             FROM cpu_stats WHERE id = ?1",
            [id.0],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                    r.get(7)?,
                    r.get(8)?,
                    r.get(9)?,
                ))
            },
        )
        .unwrap();
    assert_eq!(
        (boot, user, system, idle, irq, ctxt, created, running, blocked, softirq),
        (1_000_000, 10, 5, 85, 42, 17, 3, 1, 0, 8)
    );

    let mut stmt = store
        .conn
        .prepare("SELECT core_no, user, system, idle, cpu_stat_id FROM cpu_core_stats ORDER BY core_no")
        .unwrap();
    let cores: Vec<(i64, i64, i64, i64, i64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(cores, vec![(0, 6, 2, 92, id.0), (1, 4, 3, 93, id.0)]);
}

#[test]
fn ids_increase_across_samples() {
    let mut store = Store::open_in_memory().unwrap();
    let a = store.save_cpu(&map_cpu(&scenario_snapshot(), 1)).unwrap();
    let b = store.save_cpu(&map_cpu(&scenario_snapshot(), 2)).unwrap();
    assert!(b > a);
    assert_eq!(count(&store, schema::CPU_CORE_STATS), 4);
}

#[test]
fn memory_sample_is_stored_verbatim() {
    let mut store = Store::open_in_memory().unwrap();
    let raw = MemorySnapshot {
        mem_total: Some(16_000_000),
        mem_free: Some(4_000_000),
        mem_available: Some(8_000_000),
        cached: Some(2_000_000),
        ..MemorySnapshot::default()
    };
    let id = store.save_memory(&map_memory(&raw, 3)).unwrap();

    let row: (i64, i64, i64, i64, Option<i64>) = store
        .conn
        .query_row(
            "SELECT mem_total, mem_free, mem_available, cached, swap_total FROM mem_stats WHERE id = ?1",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .unwrap();
    assert_eq!(row, (16_000_000, 4_000_000, 8_000_000, 2_000_000, None));
    assert_eq!(count(&store, schema::MEM_STATS), 1);
}

#[test]
fn zeroed_memory_sample_stores_zeros_not_nulls() {
    let mut store = Store::open_in_memory().unwrap();
    let id = store.save_memory(&MemorySampleRecord::zeroed(4)).unwrap();

    for column in schema::MEMORY_COLUMNS {
        let value: Option<i64> = store
            .conn
            .query_row(
                &format!("SELECT \"{column}\" FROM mem_stats WHERE id = ?1"),
                [id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(value, Some(0), "{column}");
    }
}

#[test]
fn ensure_schema_twice_keeps_shape_and_rows() {
    let mut store = Store::open_in_memory().unwrap();
    store.save_cpu(&map_cpu(&scenario_snapshot(), 1)).unwrap();
    let before: Vec<Vec<String>> = [schema::CPU_STATS, schema::CPU_CORE_STATS, schema::MEM_STATS]
        .iter()
        .map(|t| columns(&store, t))
        .collect();

    store.ensure_schema().unwrap();
    store.ensure_schema().unwrap();

    let after: Vec<Vec<String>> = [schema::CPU_STATS, schema::CPU_CORE_STATS, schema::MEM_STATS]
        .iter()
        .map(|t| columns(&store, t))
        .collect();
    assert_eq!(before, after);
    assert_eq!(count(&store, schema::CPU_STATS), 1);
    assert_eq!(count(&store, schema::CPU_CORE_STATS), 2);
}

#[test]
fn orphan_core_rows_are_rejected() {
    let store = Store::open_in_memory().unwrap();
    let mut values = core_values(
        &CoreSampleRecord {
            created_at: 1,
            core_no: 0,
            stat: CpuTime::default(),
        },
        999,
    );
    let sql = store.sql.core.clone();
    let result = store.conn.execute(&sql, params_from_iter(values.drain(..)));
    assert!(result.is_err(), "foreign key should reject a missing parent");
    assert_eq!(count(&store, schema::CPU_CORE_STATS), 0);
}

#[test]
fn failed_core_insert_rolls_back_parent() {
    let mut store = Store::open_in_memory().unwrap();
    // Make every core insert fail after the parent row is written.
    store
        .conn
        .execute_batch(
            "CREATE TRIGGER reject_cores BEFORE INSERT ON cpu_core_stats \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    assert!(store.save_cpu(&map_cpu(&scenario_snapshot(), 1)).is_err());
    assert_eq!(count(&store, schema::CPU_STATS), 0);
    assert_eq!(count(&store, schema::CPU_CORE_STATS), 0);
}

#[test]
fn full_u64_range_round_trips() {
    let mut store = Store::open_in_memory().unwrap();
    let mut snap = scenario_snapshot();
    snap.context_switches = u64::MAX;
    let id = store.save_cpu(&map_cpu(&snap, 1)).unwrap();
    let stored: i64 = store
        .conn
        .query_row("SELECT context_switches FROM cpu_stats WHERE id = ?1", [id.0], |r| r.get(0))
        .unwrap();
    assert_eq!(stored as u64, u64::MAX);
}

#[test]
fn value_lists_match_table_columns() {
    let rec = map_cpu(&scenario_snapshot(), 1);
    assert_eq!(cpu_values(&rec).len(), schema::cpu_stats_table().columns.len());
    assert_eq!(
        core_values(&rec.cores[0], 1).len(),
        schema::cpu_core_stats_table().columns.len()
    );
    let mem = map_memory(&MemorySnapshot::default(), 1);
    assert_eq!(memory_values(&mem).len(), schema::mem_stats_table().columns.len());
}

#[test]
fn open_creates_database_file() {
    let dir = std::env::temp_dir().join(format!("statkeeper_store_{}", std::process::id()));
    let path = dir.join("nested").join("samples.db");
    let _ = std::fs::remove_dir_all(&dir);

    {
        let mut store = Store::open(&path).unwrap();
        store.save_cpu(&map_cpu(&scenario_snapshot(), 1)).unwrap();
    }
    let store = Store::open(&path).unwrap();
    assert_eq!(count(&store, schema::CPU_STATS), 1);

    drop(store);
    let _ = std::fs::remove_dir_all(&dir);
}
