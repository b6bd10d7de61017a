use crate::features::disk::PartitionInfo;
use crate::features::network::InterfaceCounters;
use crate::features::system_metrics::MemoryReading;
use crate::shared::collector::HostSource;
use crate::shared::error::CollectionError;
use log::debug;
use std::time::Duration;
use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};

/// `HostSource` backed by `sysinfo`, with `statvfs` for per-mount usage on unix.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoSource;

impl SysinfoSource {
    pub fn new() -> Self {
        Self
    }
}

impl HostSource for SysinfoSource {
    fn cpu_usage(&self, window: Duration) -> Result<Vec<f32>, CollectionError> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(window.max(MINIMUM_CPU_UPDATE_INTERVAL));
        sys.refresh_cpu_usage();

        if sys.cpus().is_empty() {
            return Err(CollectionError::SystemApi(
                "No CPU information available".to_string(),
            ));
        }
        Ok(sys.cpus().iter().map(|cpu| cpu.cpu_usage()).collect())
    }

    fn memory(&self) -> Result<MemoryReading, CollectionError> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            return Err(CollectionError::SystemApi(
                "Memory counters reported zero total".to_string(),
            ));
        }
        Ok(MemoryReading {
            total_bytes,
            used_bytes: sys.used_memory(),
        })
    }

    fn network_interfaces(&self) -> Result<Vec<InterfaceCounters>, CollectionError> {
        let networks = Networks::new_with_refreshed_list();
        let interfaces: Vec<InterfaceCounters> = networks
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name: name.to_string(),
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
            })
            .collect();

        debug!("Found {} network interfaces", interfaces.len());
        Ok(interfaces)
    }

    fn partitions(&self) -> Result<Vec<PartitionInfo>, CollectionError> {
        let disks = Disks::new_with_refreshed_list();
        let partitions: Vec<PartitionInfo> = disks
            .list()
            .iter()
            .map(|disk| PartitionInfo {
                mountpoint: disk.mount_point().to_string_lossy().into_owned(),
                fstype: disk.file_system().to_string_lossy().into_owned(),
                total_space: disk.total_space(),
                available_space: disk.available_space(),
            })
            .collect();

        debug!("Found {} mounted partitions", partitions.len());
        Ok(partitions)
    }

    #[cfg(unix)]
    fn partition_usage(&self, partition: &PartitionInfo) -> Result<u64, CollectionError> {
        statvfs_used(&partition.mountpoint)
    }

    #[cfg(not(unix))]
    fn partition_usage(&self, partition: &PartitionInfo) -> Result<u64, CollectionError> {
        partition.used_from_snapshot().ok_or_else(|| {
            CollectionError::SystemApi(format!(
                "inconsistent space counters for {}",
                partition.mountpoint
            ))
        })
    }
}

#[cfg(unix)]
fn statvfs_used(mountpoint: &str) -> Result<u64, CollectionError> {
    use std::ffi::CString;

    let path = CString::new(mountpoint)
        .map_err(|e| CollectionError::Parse(format!("mount point {mountpoint:?}: {e}")))?;

    // SAFETY: `path` is a valid NUL-terminated string and `stat` is a plain C
    // struct that statvfs fully initialises on success.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(CollectionError::Io(std::io::Error::last_os_error()));
    }

    let blocks = stat.f_blocks as u64;
    let free = stat.f_bfree as u64;
    let fragment_size = stat.f_frsize as u64;
    Ok(blocks.saturating_sub(free).saturating_mul(fragment_size))
}
