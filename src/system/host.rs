use sysinfo::{CpuRefreshKind, System};

/// Static facts about the sampled host, logged once at startup.
#[derive(Clone, Debug, Default)]
pub struct HostInfo {
    pub host_name: Option<String>,
    pub kernel_version: Option<String>,
    pub os_version: Option<String>,
    pub logical_cpus: usize,
}

pub fn host_info() -> HostInfo {
    let mut sys = System::new();
    sys.refresh_cpu_list(CpuRefreshKind::nothing());

    HostInfo {
        host_name: System::host_name(),
        kernel_version: System::kernel_version(),
        os_version: System::long_os_version(),
        logical_cpus: sys.cpus().len(),
    }
}
