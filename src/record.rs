//! Persistence record shapes and the pure mapping from raw kernel snapshots.
//!
//! A [`CpuSampleRecord`] owns its [`CoreSampleRecord`]s; the store writes them
//! together and assigns the identities, so records here carry none.

use crate::system::snapshot::{CpuSnapshot, CpuTime, MemorySnapshot};

/// Milliseconds since the unix epoch.
pub type UnixMillis = i64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuSampleRecord {
    pub created_at: UnixMillis,
    pub boot_time: u64,
    pub stat: CpuTime,
    pub cores: Vec<CoreSampleRecord>,
    pub irq_total: u64,
    pub context_switches: u64,
    pub process_created: u64,
    pub processes_running: u64,
    pub processes_blocked: u64,
    pub softirq_total: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreSampleRecord {
    pub created_at: UnixMillis,
    pub core_no: u32,
    pub stat: CpuTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemorySampleRecord {
    pub created_at: UnixMillis,
    pub memory: MemorySnapshot,
}

impl CpuSampleRecord {
    /// All-zero record with no cores, persisted in place of a failed read
    /// when `persist_on_read_error` is set.
    pub fn zeroed(created_at: UnixMillis) -> Self {
        map_cpu(&CpuSnapshot::default(), created_at)
    }
}

impl MemorySampleRecord {
    pub fn zeroed(created_at: UnixMillis) -> Self {
        map_memory(&MemorySnapshot::zeroed(), created_at)
    }
}

/// Flattens a raw CPU snapshot into a parent record and one child per core,
/// numbered from zero in the order the kernel listed them.
pub fn map_cpu(raw: &CpuSnapshot, created_at: UnixMillis) -> CpuSampleRecord {
    let cores = raw
        .cores
        .iter()
        .enumerate()
        .map(|(i, stat)| CoreSampleRecord {
            created_at,
            core_no: i as u32,
            stat: *stat,
        })
        .collect();

    CpuSampleRecord {
        created_at,
        boot_time: raw.boot_time,
        stat: raw.total,
        cores,
        irq_total: raw.irq_total,
        context_switches: raw.context_switches,
        process_created: raw.process_created,
        processes_running: raw.processes_running,
        processes_blocked: raw.processes_blocked,
        softirq_total: raw.softirq_total,
    }
}

pub fn map_memory(raw: &MemorySnapshot, created_at: UnixMillis) -> MemorySampleRecord {
    MemorySampleRecord {
        created_at,
        memory: raw.clone(),
    }
}
