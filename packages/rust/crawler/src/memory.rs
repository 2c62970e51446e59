//! Process memory sampling for the crawl coordinator.

use sysinfo::{Pid, ProcessesToUpdate, System};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Source of the current process's resident memory.
pub trait MemoryProbe: Send {
    /// Resident set size in bytes, or `None` if it cannot be read.
    fn resident_bytes(&mut self) -> Option<u64>;
}

/// [`MemoryProbe`] backed by `sysinfo`.
pub struct SysinfoProbe {
    system: System,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn resident_bytes(&mut self) -> Option<u64> {
        let pid = self.pid?;
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system.process(pid).map(|p| p.memory())
    }
}

/// Outcome of one memory sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStatus {
    Normal,
    /// Above the warning threshold (value in MB).
    Warning(u64),
    /// Above the hard limit (value in MB).
    Exceeded(u64),
    Unknown,
}

/// Compares probe samples against the configured thresholds.
pub struct MemoryGuard {
    probe: Box<dyn MemoryProbe>,
    warning_mb: u64,
    limit_mb: u64,
}

impl MemoryGuard {
    pub fn new(probe: Box<dyn MemoryProbe>, warning_mb: u64, limit_mb: u64) -> Self {
        Self {
            probe,
            warning_mb,
            limit_mb,
        }
    }

    pub fn limit_mb(&self) -> u64 {
        self.limit_mb
    }

    pub fn check(&mut self) -> MemoryStatus {
        let Some(bytes) = self.probe.resident_bytes() else {
            return MemoryStatus::Unknown;
        };
        let mb = bytes / BYTES_PER_MB;
        if mb > self.limit_mb {
            MemoryStatus::Exceeded(mb)
        } else if mb > self.warning_mb {
            MemoryStatus::Warning(mb)
        } else {
            MemoryStatus::Normal
        }
    }
}
