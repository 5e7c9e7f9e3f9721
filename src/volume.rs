//! Volume classification.
//!
//! Everything downstream branches on the facts gathered here, so they are
//! collected once into an immutable `BlessContext` and any probe failure
//! aborts the run.

use crate::cli::Args;
use crate::error::BlessError;
use crate::platform::{FirmwareStyle, VolumeProbe, VolumeRole};
use log::debug;
use std::path::{Path, PathBuf};

/// On-disk format of the target volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    /// Journaled HFS+: 8 x 32-bit Finder info words
    Legacy,
    /// APFS: 2 x 64-bit bless words
    Modern,
    /// Anything else; only the firmware pointer can be set
    Foreign,
}

/// Where the boot loader comes from when `--bootefi` is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootEfiSource {
    /// Probe the volume's CoreServices folder
    Default,
    Explicit(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    Text(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverSource {
    Default,
    Explicit(PathBuf),
    Disabled,
}

/// What the caller asked for, normalised from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlessRequest {
    pub mount: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub boot_efi: Option<BootEfiSource>,
    pub label: Option<LabelSource>,
    pub driver: DriverSource,
    pub set_boot: bool,
    pub next_only: bool,
    pub legacy: bool,
    pub legacy_drive_hint: Option<String>,
    pub options: Option<String>,
    pub short_form: bool,
    pub personalize: bool,
    pub allow_ui: bool,
}

impl BlessRequest {
    pub fn from_args(args: &Args) -> Self {
        let boot_efi = args.bootefi.as_ref().map(|source| match source {
            Some(path) => BootEfiSource::Explicit(path.clone()),
            None => BootEfiSource::Default,
        });

        // Blessing a folder while installing a boot loader records the
        // installed copy when no file was named.
        let file = match (&args.file, &args.folder, &boot_efi) {
            (Some(file), _, _) => Some(file.clone()),
            (None, Some(folder), Some(_)) => Some(folder.join("boot.efi")),
            _ => None,
        };

        let label = match (&args.label, &args.label_file) {
            (_, Some(path)) => Some(LabelSource::File(path.clone())),
            (Some(text), None) => Some(LabelSource::Text(text.clone())),
            (None, None) => None,
        };

        let driver = match (&args.apfs_driver, args.no_apfs_driver) {
            (Some(path), _) => DriverSource::Explicit(path.clone()),
            (None, true) => DriverSource::Disabled,
            (None, false) => DriverSource::Default,
        };

        BlessRequest {
            mount: args.mount.clone(),
            folder: args.folder.clone(),
            file,
            boot_efi,
            label,
            driver,
            set_boot: args.set_boot,
            next_only: args.next_only,
            legacy: args.legacy,
            legacy_drive_hint: args.legacy_drive_hint.clone(),
            options: args.options.clone(),
            short_form: args.short_form,
            personalize: args.personalize,
            allow_ui: args.allow_ui,
        }
    }

    /// A folder was named, so the volume's boot metadata gets rewritten.
    pub fn should_bless(&self) -> bool {
        self.folder.is_some()
    }
}

/// Facts about the target volume, fixed for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    pub mount_point: PathBuf,
    pub device: String,
    pub kind: FsKind,
    pub role: VolumeRole,
    pub read_only: bool,
    pub owner: u32,
    pub subtype: u32,
    pub pre_migration_unsafe: bool,
    pub companion: bool,
}

impl VolumeDescriptor {
    pub fn bsd_name(&self) -> &str {
        self.device.strip_prefix("/dev/").unwrap_or(&self.device)
    }

    /// Mid-migration volumes take no writes at all.
    pub fn writes_inhibited(&self) -> bool {
        self.pre_migration_unsafe
    }

    /// Files may be created on anything but a read-only APFS volume.
    pub fn accepts_files(&self) -> bool {
        self.kind != FsKind::Modern || !self.read_only
    }

    /// HFS sub-types other than plain (0) and journaled (1) HFS+ must never
    /// be advertised as bootable to Open Firmware.
    pub fn is_excluded_subtype(&self) -> bool {
        self.subtype & !1 != 0
    }
}

/// Immutable state shared by every step of a run.
#[derive(Debug, Clone)]
pub struct BlessContext {
    pub request: BlessRequest,
    pub volume: VolumeDescriptor,
    pub firmware: FirmwareStyle,
    pub euid: u32,
}

/// Work out which volume the run operates on.
pub fn extract_mount_point(
    probe: &impl VolumeProbe,
    request: &BlessRequest,
) -> Result<PathBuf, BlessError> {
    let path = match (&request.mount, &request.folder) {
        (Some(mount), _) => mount,
        (None, Some(folder)) => folder,
        (None, None) => return Err(BlessError::Usage("No volume specified".to_string())),
    };

    let mount = probe.mount_point_of(path).map_err(|e| {
        BlessError::classification(
            format!("Can't determine mount point of '{}'", path.display()),
            e,
        )
    })?;
    debug!("Mount point of '{}' is {}", path.display(), mount.display());
    Ok(mount)
}

/// Probe the target volume and assemble the run context.
pub fn classify(probe: &impl VolumeProbe, request: BlessRequest) -> Result<BlessContext, BlessError> {
    let mount = extract_mount_point(probe, &request)?;
    let volume = describe_volume(probe, &mount)?;

    debug!(
        "{} is {:?} (role {:?}, ARV {}, read-only {}, owner {}, subtype {})",
        mount.display(),
        volume.kind,
        volume.role,
        volume.companion,
        volume.read_only,
        volume.owner,
        volume.subtype
    );
    if volume.pre_migration_unsafe {
        debug!("{} is mid-migration; no writes will be made to it", mount.display());
    }

    Ok(BlessContext {
        request,
        volume,
        firmware: probe.firmware_style(),
        euid: probe.effective_uid(),
    })
}

fn describe_volume(probe: &impl VolumeProbe, mount: &Path) -> Result<VolumeDescriptor, BlessError> {
    let fs_error = |e: anyhow::Error| {
        BlessError::classification(format!("Could not determine filesystem of {}", mount.display()), e)
    };
    let is_legacy = probe.is_legacy_fs(mount).map_err(fs_error)?;
    let is_modern = probe.is_modern_fs(mount).map_err(fs_error)?;

    let pre_migration_unsafe = probe.is_pre_migration_unsafe(mount).map_err(|e| {
        BlessError::classification(format!("Could not determine SSV status of {}", mount.display()), e)
    })?;

    let stat = probe
        .stat_mount(mount)
        .map_err(|e| BlessError::classification(format!("Can't statfs {}", mount.display()), e))?;

    let kind = if is_legacy {
        FsKind::Legacy
    } else if is_modern {
        FsKind::Modern
    } else {
        FsKind::Foreign
    };

    let (role, companion) = if kind == FsKind::Modern {
        let role = probe.volume_role(stat.bsd_name()).map_err(|e| {
            BlessError::role(format!("Couldn't get role for volume {}", mount.display()), e)
        })?;
        let companion = probe.is_companion_volume(mount, stat.bsd_name()).map_err(|e| {
            BlessError::role(format!("Couldn't check if volume {} is ARV", mount.display()), e)
        })?;
        (role, companion)
    } else {
        (VolumeRole::None, false)
    };

    Ok(VolumeDescriptor {
        mount_point: mount.to_path_buf(),
        device: stat.device.clone(),
        kind,
        role,
        read_only: stat.is_read_only(),
        owner: stat.owner,
        subtype: stat.subtype,
        pre_migration_unsafe,
        companion,
    })
}
