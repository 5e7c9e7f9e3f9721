//! Host services the bless engine relies on.
//!
//! The engine never touches the filesystem, the APFS container or NVRAM
//! directly. Each concern is a trait here; `darwin` provides the real
//! implementation and the test suite provides an in-memory one.

#[cfg(target_os = "macos")]
pub mod darwin;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Longest path a reverse lookup may return (MAXPATHLEN, including NUL).
pub const MAX_PATH_LEN: usize = 1024;

/// Mount flag: volume is mounted read-only.
pub const MNT_RDONLY: u32 = 0x0000_0001;

/// Facts reported by `statfs` for a mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountStat {
    /// Mounted-from device, e.g. `/dev/disk1s2`
    pub device: String,
    /// Mount point the path lives on
    pub mount_point: PathBuf,
    pub flags: u32,
    /// On-disk owner of the volume
    pub owner: u32,
    /// Filesystem sub-type (HFS variant)
    pub subtype: u32,
}

impl MountStat {
    pub fn is_read_only(&self) -> bool {
        self.flags & MNT_RDONLY != 0
    }

    /// BSD name of the device without the `/dev/` prefix.
    pub fn bsd_name(&self) -> &str {
        self.device.strip_prefix("/dev/").unwrap_or(&self.device)
    }
}

/// Whole-disk name of a `diskNsM` device: the APFS container or partition map.
pub fn container_disk(device: &str) -> Option<String> {
    let name = device.strip_prefix("/dev/").unwrap_or(device);
    let unit = name.strip_prefix("disk")?;
    let end = unit.find(|c: char| !c.is_ascii_digit()).unwrap_or(unit.len());
    if end == 0 {
        return None;
    }
    Some(format!("disk{}", &unit[..end]))
}

/// How the platform firmware selects its boot target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareStyle {
    /// Device/token based (Open Firmware)
    OpenFirmware,
    /// Path based (EFI)
    Efi,
}

/// APFS volume role, as reported by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRole {
    None,
    Preboot,
    Recovery,
    Data,
    Other(u16),
}

impl VolumeRole {
    pub const RAW_NONE: u16 = 0x0000;
    pub const RAW_RECOVERY: u16 = 0x0004;
    pub const RAW_PREBOOT: u16 = 0x0010;
    pub const RAW_DATA: u16 = 0x0040;

    pub fn from_raw(role: u16) -> Self {
        match role {
            Self::RAW_NONE => VolumeRole::None,
            Self::RAW_PREBOOT => VolumeRole::Preboot,
            Self::RAW_RECOVERY => VolumeRole::Recovery,
            Self::RAW_DATA => VolumeRole::Data,
            other => VolumeRole::Other(other),
        }
    }

    /// Preboot and recovery volumes carry their own bless data.
    pub fn is_boot_companion(self) -> bool {
        matches!(self, VolumeRole::Preboot | VolumeRole::Recovery)
    }
}

/// Whether a file write must be backed by a contiguous preallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preallocation {
    Must,
    Try,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelScale {
    X1,
    X2,
}

/// A mounted companion volume in the same container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionVolume {
    pub device: String,
    pub mount_point: PathBuf,
}

/// Filesystem type and state probing.
pub trait VolumeProbe {
    /// Mount point of the volume that `path` lives on.
    fn mount_point_of(&self, path: &Path) -> Result<PathBuf>;
    fn is_legacy_fs(&self, mount: &Path) -> Result<bool>;
    fn is_modern_fs(&self, mount: &Path) -> Result<bool>;
    /// True while a data volume is mid-migration and must not be written.
    fn is_pre_migration_unsafe(&self, mount: &Path) -> Result<bool>;
    fn stat_mount(&self, mount: &Path) -> Result<MountStat>;
    fn volume_role(&self, bsd_name: &str) -> Result<VolumeRole>;
    /// Whether the volume is an auxiliary companion (not a bootable system).
    fn is_companion_volume(&self, mount: &Path, bsd_name: &str) -> Result<bool>;
    fn firmware_style(&self) -> FirmwareStyle;
    fn effective_uid(&self) -> u32;
}

/// Native file identifiers: 32-bit directory IDs on HFS, 64-bit inodes on APFS.
pub trait IdentifierServices {
    fn dir_id(&self, path: &Path) -> Result<u32>;
    fn reverse_lookup_dir_id(&self, mount: &Path, id: u32) -> Result<String>;
    fn inode(&self, path: &Path) -> Result<u64>;
    fn reverse_lookup_inode(&self, mount: &Path, inum: u64) -> Result<String>;
}

/// In-place boot metadata records.
pub trait MetadataStore {
    /// The volume's eight Finder info words.
    fn read_finder_info(&self, mount: &Path) -> Result<[u32; 8]>;
    fn write_finder_info(&self, mount: &Path, words: &[u32; 8]) -> Result<()>;
    /// APFS bless data; `None` when the volume has never been blessed.
    fn read_bless_data(&self, mount: &Path) -> Result<Option<[u64; 2]>>;
    fn write_bless_data(&self, mount: &Path, words: &[u64; 2]) -> Result<()>;
}

pub trait FileStore {
    fn load_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn is_readable(&self, path: &Path) -> bool;
    /// `lstat` says the path is a regular file.
    fn is_regular_file(&self, path: &Path) -> bool;
    fn create_file(&self, path: &Path, data: &[u8], prealloc: Preallocation) -> Result<()>;
    /// Write a label bitmap, tagging it for the firmware picker when asked.
    fn write_label(&self, path: &Path, data: &[u8], firmware_label: bool) -> Result<()>;
    /// Copy integrity manifests that accompany `source` next to `dest`.
    fn copy_manifests(&self, dest: &Path, source: &Path) -> Result<()>;
}

pub trait LabelRenderer {
    fn render_label(&self, text: &str, scale: LabelScale) -> Result<Vec<u8>>;

    fn can_render_labels(&self) -> bool {
        true
    }
}

/// Firmware boot pointer (NVRAM) writers.
pub trait FirmwarePointer {
    fn set_pointer_by_path(
        &self,
        path: &Path,
        next_only: bool,
        options: Option<&str>,
        short_form: bool,
    ) -> Result<()>;
    fn set_pointer_by_device_legacy_hint(
        &self,
        path: &Path,
        next_only: bool,
        drive_hint: Option<&str>,
        options: Option<&str>,
    ) -> Result<()>;
    fn set_pointer_by_device(
        &self,
        device: &str,
        alt_device: Option<&str>,
        label: Option<&[u8]>,
    ) -> Result<()>;

    /// Whether `set_pointer_by_device_legacy_hint` can succeed on this host.
    fn supports_legacy_pointer(&self) -> bool {
        true
    }
}

/// APFS container services.
pub trait ContainerServices {
    fn embed_container_driver(&self, container_bsd_name: &str, driver: &[u8]) -> Result<()>;
    /// The mounted preboot volume sharing a container with `bsd_name`, if any.
    fn preboot_volume(&self, bsd_name: &str) -> Result<Option<CompanionVolume>>;
    fn volume_uuid(&self, mount: &Path) -> Result<String>;
    fn personalize(&self, mount: &Path, allow_ui: bool) -> Result<()>;

    fn supports_personalization(&self) -> bool {
        true
    }
}

/// Everything a bless run needs from the host.
pub trait Platform:
    VolumeProbe
    + IdentifierServices
    + MetadataStore
    + FileStore
    + LabelRenderer
    + FirmwarePointer
    + ContainerServices
{
}

impl<T> Platform for T where
    T: VolumeProbe
        + IdentifierServices
        + MetadataStore
        + FileStore
        + LabelRenderer
        + FirmwarePointer
        + ContainerServices
{
}
