//! Preboot volume blessing.
//!
//! On APFS the firmware boots from the container's preboot volume, which
//! keeps a per-system folder named after the system volume's UUID. Blessing
//! a system volume therefore stages its boot loader and labels there and
//! records that folder in the preboot volume's own bless data.

use crate::booter::{materialize, Materialized};
use crate::error::BlessError;
use crate::label::{write_labels, LabelAssets};
use crate::platform::{Platform, Preallocation};
use crate::record::{update_record, RecordUpdate, UpdatedRecord};
use crate::volume::{BlessContext, FsKind};
use anyhow::Context;
use log::{debug, info};
use std::path::{Path, PathBuf};

const CORE_SERVICES: &str = "System/Library/CoreServices";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrebootBless {
    pub folder: PathBuf,
    pub staged: Option<Materialized>,
    pub record: UpdatedRecord,
}

/// Bless the preboot companion of `ctx.volume`, staging `boot_loader` when given.
///
/// Returns `None` when the volume has no preboot companion to update.
pub fn bless_preboot<H: Platform>(
    host: &H,
    ctx: &BlessContext,
    boot_loader: Option<&Path>,
    labels: Option<&LabelAssets>,
) -> Result<Option<PrebootBless>, BlessError> {
    let volume = &ctx.volume;
    let mount = &volume.mount_point;
    let fail = |e: anyhow::Error| BlessError::Preboot {
        mount: mount.display().to_string(),
        cause: e,
    };
    let nested = |e: BlessError| fail(anyhow::Error::new(e));

    if volume.role.is_boot_companion() {
        debug!("{} is itself a {:?} volume", mount.display(), volume.role);
        return Ok(None);
    }

    let Some(preboot) = host.preboot_volume(volume.bsd_name()).map_err(fail)? else {
        info!("No preboot volume found for {}", volume.bsd_name());
        return Ok(None);
    };

    let uuid = host
        .volume_uuid(mount)
        .with_context(|| format!("Couldn't get UUID of {}", mount.display()))
        .map_err(fail)?;
    let folder = preboot.mount_point.join(&uuid).join(CORE_SERVICES);
    let dest = folder.join("boot.efi");
    debug!("Preboot folder for {} is {}", mount.display(), folder.display());

    let staged = match boot_loader {
        Some(source) if !volume.writes_inhibited() => {
            Some(materialize(host, source, &dest, Preallocation::Try).map_err(nested)?)
        }
        _ => None,
    };

    if let Some(labels) = labels.filter(|_| !volume.writes_inhibited()) {
        write_labels(host, &folder, labels, false).map_err(nested)?;
    }

    let stat = host
        .stat_mount(&preboot.mount_point)
        .with_context(|| format!("Can't statfs {}", preboot.mount_point.display()))
        .map_err(fail)?;

    let record = update_record(
        host,
        ctx.euid,
        &RecordUpdate {
            mount: &preboot.mount_point,
            kind: FsKind::Modern,
            owner: stat.owner,
            folder: Some(&folder),
            file: Some(&dest),
            suppress_marker: false,
            inhibited: volume.writes_inhibited(),
        },
    )
    .map_err(nested)?;

    Ok(Some(PrebootBless {
        folder,
        staged,
        record,
    }))
}
