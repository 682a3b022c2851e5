use std::path::{Path, PathBuf};

use tracing::debug;

use super::snapshot::{CpuSnapshot, CpuTime, MemorySnapshot};
use super::source::{CounterSource, SourceError};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Counter source backed by a mounted proc filesystem.
#[derive(Clone, Debug)]
pub struct ProcSource {
    root: PathBuf,
}

impl ProcSource {
    /// Opens the proc filesystem at `root`, failing if `stat` is unreadable there.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let source = Self { root: root.into() };
        let stat = source.stat_path();
        std::fs::metadata(&stat).map_err(|e| SourceError::Io {
            path: stat.clone(),
            source: e,
        })?;
        debug!(root = %source.root.display(), "opened proc filesystem");
        Ok(source)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stat_path(&self) -> PathBuf {
        self.root.join("stat")
    }

    fn meminfo_path(&self) -> PathBuf {
        self.root.join("meminfo")
    }
}

impl CounterSource for ProcSource {
    fn read_cpu_stats(&self) -> Result<CpuSnapshot, SourceError> {
        let path = self.stat_path();
        let contents = read(&path)?;
        parse_stat(&contents, &path)
    }

    fn read_memory_stats(&self) -> Result<MemorySnapshot, SourceError> {
        let path = self.meminfo_path();
        let contents = read(&path)?;
        parse_meminfo(&contents, &path)
    }
}

fn read(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parses the contents of `/proc/stat`.
pub fn parse_stat(contents: &str, path: &Path) -> Result<CpuSnapshot, SourceError> {
    let malformed = |line: &str| SourceError::Parse {
        path: path.to_path_buf(),
        line: line.to_string(),
    };

    let mut snapshot = CpuSnapshot::default();
    let mut saw_total = false;
    let mut saw_btime = false;

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };

        if key == "cpu" {
            snapshot.total = parse_cpu_time(fields).ok_or_else(|| malformed(line))?;
            saw_total = true;
            continue;
        }
        if key.starts_with("cpu") && key[3..].parse::<u32>().is_ok() {
            let time = parse_cpu_time(fields).ok_or_else(|| malformed(line))?;
            snapshot.cores.push(time);
            continue;
        }

        let counter = match key {
            // intr and softirq lead with the total, followed by per-source counts.
            "intr" => &mut snapshot.irq_total,
            "softirq" => &mut snapshot.softirq_total,
            "ctxt" => &mut snapshot.context_switches,
            "btime" => {
                saw_btime = true;
                &mut snapshot.boot_time
            }
            "processes" => &mut snapshot.process_created,
            "procs_running" => &mut snapshot.processes_running,
            "procs_blocked" => &mut snapshot.processes_blocked,
            _ => continue,
        };
        *counter = first_value(fields).ok_or_else(|| malformed(line))?;
    }

    if !saw_total {
        return Err(SourceError::Missing {
            path: path.to_path_buf(),
            field: "cpu",
        });
    }
    if !saw_btime {
        return Err(SourceError::Missing {
            path: path.to_path_buf(),
            field: "btime",
        });
    }
    Ok(snapshot)
}

fn first_value<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<u64> {
    fields.next()?.parse().ok()
}

fn parse_cpu_time<'a>(fields: impl Iterator<Item = &'a str>) -> Option<CpuTime> {
    // Kernels before 2.6.33 report fewer columns; absent ones read as zero.
    let mut values = [0u64; 10];
    let mut count = 0;
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = field.parse().ok()?;
        count += 1;
    }
    if count < 4 {
        return None;
    }
    let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = values;
    Some(CpuTime {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
        steal,
        guest,
        guest_nice,
    })
}

/// Parses the contents of `/proc/meminfo`. Lines that are not of interest are ignored.
pub fn parse_meminfo(contents: &str, path: &Path) -> Result<MemorySnapshot, SourceError> {
    let mut mem = MemorySnapshot::default();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, rest)) = line.split_once(':') else {
            return Err(SourceError::Parse {
                path: path.to_path_buf(),
                line: line.to_string(),
            });
        };

        let slot = match key.trim() {
            "MemTotal" => &mut mem.mem_total,
            "MemFree" => &mut mem.mem_free,
            "MemAvailable" => &mut mem.mem_available,
            "Buffers" => &mut mem.buffers,
            "Cached" => &mut mem.cached,
            "SwapCached" => &mut mem.swap_cached,
            "Active" => &mut mem.active,
            "Inactive" => &mut mem.inactive,
            "SwapTotal" => &mut mem.swap_total,
            "SwapFree" => &mut mem.swap_free,
            "Dirty" => &mut mem.dirty,
            "Writeback" => &mut mem.writeback,
            "AnonPages" => &mut mem.anon_pages,
            "Mapped" => &mut mem.mapped,
            "Shmem" => &mut mem.shmem,
            "Slab" => &mut mem.slab,
            "SReclaimable" => &mut mem.s_reclaimable,
            "SUnreclaim" => &mut mem.s_unreclaim,
            "PageTables" => &mut mem.page_tables,
            "Committed_AS" => &mut mem.committed_as,
            _ => continue,
        };

        // "  16000000 kB"
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SourceError::Parse {
                path: path.to_path_buf(),
                line: line.to_string(),
            })?;
        *slot = Some(value);
    }

    if mem.mem_total.is_none() {
        return Err(SourceError::Missing {
            path: path.to_path_buf(),
            field: "MemTotal",
        });
    }
    Ok(mem)
}
