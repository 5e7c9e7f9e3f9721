//! One bless run, from classification to the firmware pointer.

use crate::booter::{materialize, preallocation_for, source_path};
use crate::error::BlessError;
use crate::firmware::update_boot_pointer;
use crate::label::{load_labels, write_labels};
use crate::platform::{container_disk, FirmwareStyle, Platform};
use crate::preboot::bless_preboot;
use crate::record::{update_record, RecordUpdate};
use crate::volume::{classify, BlessContext, BlessRequest, DriverSource, FsKind, LabelSource};
use anyhow::anyhow;
use log::{debug, info};

/// APFS driver shipped with the OS, relative to the volume root.
pub const APFS_DRIVER_PATH: &str = "usr/standalone/i386/apfs.efi";

pub fn run<P: Platform>(host: &P, request: BlessRequest) -> Result<(), BlessError> {
    preflight(host, &request)?;
    let ctx = classify(host, request)?;
    let request = &ctx.request;
    let volume = &ctx.volume;
    let inhibited = volume.writes_inhibited();

    let boot_loader = request
        .boot_efi
        .as_ref()
        .map(|source| source_path(host, &volume.mount_point, source));

    if let Some(source) = &boot_loader {
        match &request.file {
            Some(dest) if volume.accepts_files() && !inhibited => {
                materialize(host, source, dest, preallocation_for(volume.kind))?;
            }
            Some(_) => debug!("Not installing boot.efi on {}", volume.mount_point.display()),
            None => debug!("Could not create boot.efi, no destination file given"),
        }
    }

    if volume.kind == FsKind::Modern && !inhibited && request.set_boot {
        embed_driver(host, &ctx)?;
    }

    let labels = match &request.label {
        Some(source) if !inhibited => Some(load_labels(host, source)?),
        _ => None,
    };
    if let (Some(labels), Some(folder)) = (&labels, &request.folder) {
        if volume.accepts_files() {
            write_labels(host, folder, labels, volume.kind == FsKind::Legacy)?;
        }
    }

    // Set when a preboot or recovery volume records an explicit file; the
    // firmware is then pointed at that file rather than the volume.
    let mut companion_file = false;

    if request.should_bless() || (volume.kind == FsKind::Modern && !inhibited) {
        let mut update = RecordUpdate {
            mount: &volume.mount_point,
            kind: volume.kind,
            owner: volume.owner,
            folder: request.folder.as_deref(),
            file: request.file.as_deref(),
            suppress_marker: false,
            inhibited,
        };
        match volume.kind {
            FsKind::Legacy => {
                update.suppress_marker = request.set_boot
                    && ctx.firmware == FirmwareStyle::OpenFirmware
                    && volume.is_excluded_subtype();
                if update.suppress_marker {
                    debug!(
                        "{} is not HFS+ or Journaled HFS+. Not setting finderinfo[0]...",
                        volume.mount_point.display()
                    );
                }
                update_record(host, ctx.euid, &update)?;
            }
            FsKind::Modern => {
                if request.should_bless() && volume.role.is_boot_companion() {
                    companion_file = request.file.is_some();
                    update_record(host, ctx.euid, &update)?;
                }
                if let Some(preboot) =
                    bless_preboot(host, &ctx, boot_loader.as_deref(), labels.as_ref())?
                {
                    info!("Blessed preboot folder {}", preboot.folder.display());
                }
            }
            FsKind::Foreign => {
                debug!("{} has no boot metadata to update", volume.mount_point.display());
            }
        }
    }

    if request.personalize {
        host.personalize(&volume.mount_point, request.allow_ui)
            .map_err(|e| BlessError::Personalization {
                mount: volume.mount_point.display().to_string(),
                cause: e,
            })?;
    }

    if request.set_boot {
        update_boot_pointer(host, &ctx, companion_file, labels.as_ref())?;
    }

    Ok(())
}

/// Reject requests the host can never complete, before anything is written.
fn preflight<P: Platform>(host: &P, request: &BlessRequest) -> Result<(), BlessError> {
    let unsupported =
        |flag: &str| Err(BlessError::Usage(format!("{flag} is not supported on this host")));
    if request.set_boot && request.legacy && !host.supports_legacy_pointer() {
        return unsupported("--legacy");
    }
    if request.personalize && !host.supports_personalization() {
        return unsupported("--personalize");
    }
    if matches!(request.label, Some(LabelSource::Text(_))) && !host.can_render_labels() {
        return unsupported("--label (use --labelfile)");
    }
    Ok(())
}

fn embed_driver<P: Platform>(host: &P, ctx: &BlessContext) -> Result<(), BlessError> {
    let path = match &ctx.request.driver {
        DriverSource::Disabled => return Ok(()),
        DriverSource::Explicit(path) => path.clone(),
        DriverSource::Default => ctx.volume.mount_point.join(APFS_DRIVER_PATH),
    };

    let device = &ctx.volume.device;
    let container = container_disk(device).ok_or_else(|| BlessError::Driver {
        step: format!("Can't determine container of {device}"),
        cause: anyhow!("not a diskNsM device"),
    })?;

    let driver = host.load_file(&path).map_err(|e| BlessError::Driver {
        step: format!("Could not load apfs.efi data from {}", path.display()),
        cause: e,
    })?;
    host.embed_container_driver(&container, &driver)
        .map_err(|e| BlessError::Driver {
            step: format!("Could not embed APFS driver in {container}"),
            cause: e,
        })?;
    debug!("Embedded {} byte APFS driver in {container}", driver.len());
    Ok(())
}
