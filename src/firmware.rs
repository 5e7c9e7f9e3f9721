//! Firmware boot pointer.
//!
//! EFI machines get a path (or legacy device) pointer in NVRAM; Open
//! Firmware machines get the device node. This runs last, and a failure here
//! leaves the already written boot metadata in place.

use crate::error::BlessError;
use crate::label::LabelAssets;
use crate::platform::{FirmwarePointer, FirmwareStyle, VolumeProbe};
use crate::volume::{BlessContext, FsKind};
use log::debug;
use std::path::PathBuf;

/// What the EFI path pointer should name.
///
/// Blessing points the firmware at the volume. Only when nothing was blessed
/// on HFS+ but a file was named (or a companion volume recorded a file) is
/// the pointer aimed at the file itself.
pub fn pointer_path(ctx: &BlessContext, companion_file: bool) -> PathBuf {
    let request = &ctx.request;
    let file_only = !request.should_bless() && ctx.volume.kind != FsKind::Modern;
    match &request.file {
        Some(file) if companion_file || file_only => file.clone(),
        _ => ctx.volume.mount_point.clone(),
    }
}

pub fn update_boot_pointer<H>(
    host: &H,
    ctx: &BlessContext,
    companion_file: bool,
    labels: Option<&LabelAssets>,
) -> Result<(), BlessError>
where
    H: FirmwarePointer + VolumeProbe,
{
    let request = &ctx.request;
    let mount = &ctx.volume.mount_point;

    match ctx.firmware {
        FirmwareStyle::Efi if request.legacy => {
            debug!("Setting legacy EFI boot device for {}", mount.display());
            host.set_pointer_by_device_legacy_hint(
                mount,
                request.next_only,
                request.legacy_drive_hint.as_deref(),
                request.options.as_deref(),
            )
            .map_err(|e| BlessError::BootPointer {
                target: mount.display().to_string(),
                cause: e,
            })
        }
        FirmwareStyle::Efi => {
            let path = pointer_path(ctx, companion_file);
            debug!(
                "Setting EFI boot {} to {}",
                if request.next_only { "next" } else { "device" },
                path.display()
            );
            host.set_pointer_by_path(
                &path,
                request.next_only,
                request.options.as_deref(),
                request.short_form,
            )
            .map_err(|e| BlessError::BootPointer {
                target: path.display().to_string(),
                cause: e,
            })
        }
        FirmwareStyle::OpenFirmware => {
            let stat = host
                .stat_mount(mount)
                .map_err(|e| BlessError::io(format!("Can't statfs {}", mount.display()), 2, e))?;
            debug!("Setting Open Firmware boot device to {}", stat.device);
            host.set_pointer_by_device(&stat.device, None, labels.map(|l| l.x1.as_slice()))
                .map_err(|e| BlessError::BootPointer {
                    target: stat.device.clone(),
                    cause: e,
                })
        }
    }
}
