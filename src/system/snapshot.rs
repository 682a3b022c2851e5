/// CPU time accounting for one `cpu` line of `/proc/stat`, in clock ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTime {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    /// Boot time in seconds since the epoch.
    pub boot_time: u64,
    /// Summed over all cores.
    pub total: CpuTime,
    /// One entry per logical core, in kernel order.
    pub cores: Vec<CpuTime>,
    /// Interrupts serviced since boot, numbered and unnumbered.
    pub irq_total: u64,
    pub context_switches: u64,
    /// Forks since boot.
    pub process_created: u64,
    pub processes_running: u64,
    /// Processes waiting on I/O.
    pub processes_blocked: u64,
    pub softirq_total: u64,
}

/// Counters from `/proc/meminfo`, in kB exactly as the kernel reports them.
/// `None` means the running kernel does not expose that line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub mem_total: Option<u64>,
    pub mem_free: Option<u64>,
    pub mem_available: Option<u64>,
    pub buffers: Option<u64>,
    pub cached: Option<u64>,
    pub swap_cached: Option<u64>,
    pub active: Option<u64>,
    pub inactive: Option<u64>,
    pub swap_total: Option<u64>,
    pub swap_free: Option<u64>,
    pub dirty: Option<u64>,
    pub writeback: Option<u64>,
    pub anon_pages: Option<u64>,
    pub mapped: Option<u64>,
    pub shmem: Option<u64>,
    pub slab: Option<u64>,
    pub s_reclaimable: Option<u64>,
    pub s_unreclaim: Option<u64>,
    pub page_tables: Option<u64>,
    pub committed_as: Option<u64>,
}

impl MemorySnapshot {
    /// Every counter present and zero, as opposed to `default()` where every counter is absent.
    pub fn zeroed() -> Self {
        let zero = Some(0);
        MemorySnapshot {
            mem_total: zero,
            mem_free: zero,
            mem_available: zero,
            buffers: zero,
            cached: zero,
            swap_cached: zero,
            active: zero,
            inactive: zero,
            swap_total: zero,
            swap_free: zero,
            dirty: zero,
            writeback: zero,
            anon_pages: zero,
            mapped: zero,
            shmem: zero,
            slab: zero,
            s_reclaimable: zero,
            s_unreclaim: zero,
            page_tables: zero,
            committed_as: zero,
        }
    }
}
