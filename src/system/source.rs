use std::path::PathBuf;

use thiserror::Error;

use super::snapshot::{CpuSnapshot, MemorySnapshot};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed line in {}: {line:?}", .path.display())]
    Parse { path: PathBuf, line: String },

    #[error("{} has no `{field}` entry", .path.display())]
    Missing { path: PathBuf, field: &'static str },
}

/// Read-only provider of the host's current CPU and memory counters.
pub trait CounterSource {
    fn read_cpu_stats(&self) -> Result<CpuSnapshot, SourceError>;
    fn read_memory_stats(&self) -> Result<MemorySnapshot, SourceError>;
}

impl<T: CounterSource + ?Sized> CounterSource for &T {
    fn read_cpu_stats(&self) -> Result<CpuSnapshot, SourceError> {
        (**self).read_cpu_stats()
    }

    fn read_memory_stats(&self) -> Result<MemorySnapshot, SourceError> {
        (**self).read_memory_stats()
    }
}
