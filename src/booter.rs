//! Boot loader installation.
//!
//! Copies the boot loader into the blessed folder only when the bytes
//! differ, then propagates its integrity manifests.

use crate::error::BlessError;
use crate::platform::{FileStore, Preallocation};
use crate::volume::{BootEfiSource, FsKind};
use log::debug;
use std::path::{Path, PathBuf};

/// Boot loader shipped with the OS, relative to the volume root.
pub const BOOT_EFI_PATH: &str = "System/Library/CoreServices/boot.efi";
/// Device-specific boot loader, preferred when present.
pub const BOOTDEV_EFI_PATH: &str = "System/Library/CoreServices/bootdev.efi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Written,
    /// Destination already held identical bytes
    Unchanged,
    /// Source could not be loaded; nothing was done
    NoSource,
}

/// Resolve where the boot loader is copied from.
pub fn source_path(files: &impl FileStore, mount: &Path, source: &BootEfiSource) -> PathBuf {
    match source {
        BootEfiSource::Explicit(path) => path.clone(),
        BootEfiSource::Default => {
            let bootdev = mount.join(BOOTDEV_EFI_PATH);
            if files.is_readable(&bootdev) {
                bootdev
            } else {
                mount.join(BOOT_EFI_PATH)
            }
        }
    }
}

/// HFS+ needs the boot loader contiguous; APFS takes it as a hint.
pub fn preallocation_for(kind: FsKind) -> Preallocation {
    match kind {
        FsKind::Modern => Preallocation::Try,
        FsKind::Legacy | FsKind::Foreign => Preallocation::Must,
    }
}

/// Install `source` at `dest` unless it is already there.
pub fn materialize(
    files: &impl FileStore,
    source: &Path,
    dest: &Path,
    prealloc: Preallocation,
) -> Result<Materialized, BlessError> {
    let data = match files.load_file(source) {
        Ok(data) => data,
        Err(e) => {
            debug!("Could not load boot.efi data from {}: {e:#}", source.display());
            return Ok(Materialized::NoSource);
        }
    };

    let unchanged = files.is_regular_file(dest)
        && files
            .load_file(dest)
            .map(|existing| existing == data)
            .unwrap_or(false);

    let outcome = if unchanged {
        debug!("boot.efi unchanged at {}. Skipping update...", dest.display());
        Materialized::Unchanged
    } else {
        files.create_file(dest, &data, prealloc).map_err(|e| {
            BlessError::io(format!("Could not create boot.efi at {}", dest.display()), 2, e)
        })?;
        debug!("boot.efi created successfully at {}", dest.display());
        Materialized::Written
    };

    files
        .copy_manifests(dest, source)
        .map_err(|e| BlessError::Manifest {
            path: dest.display().to_string(),
            cause: e,
        })?;

    Ok(outcome)
}
