use std::time::{SystemTime, UNIX_EPOCH};

use crate::record::{CpuSampleRecord, MemorySampleRecord, UnixMillis, map_cpu, map_memory};

use super::source::{CounterSource, SourceError};

/// Reads the CPU counters once and maps them. Source errors are returned as-is.
pub fn sample_cpu<S: CounterSource>(source: &S) -> Result<CpuSampleRecord, SourceError> {
    let _span = tracing::debug_span!("sampler.cpu").entered();
    let raw = source.read_cpu_stats()?;
    Ok(map_cpu(&raw, now_millis()))
}

pub fn sample_memory<S: CounterSource>(source: &S) -> Result<MemorySampleRecord, SourceError> {
    let _span = tracing::debug_span!("sampler.memory").entered();
    let raw = source.read_memory_stats()?;
    Ok(map_memory(&raw, now_millis()))
}

pub fn now_millis() -> UnixMillis {
    // A clock before the epoch records as 0 rather than failing the tick.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as UnixMillis)
        .unwrap_or(0)
}
