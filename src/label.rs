//! Boot picker labels.
//!
//! A label is a bitmap rendered from text (at 1x and 2x) or loaded from a
//! prebuilt file. The classic firmware format is a version byte of 1, a
//! big-endian width and height, then width*height pixels.

use crate::error::BlessError;
use crate::platform::{FileStore, LabelRenderer, LabelScale};
use crate::volume::LabelSource;
use log::debug;
use std::path::Path;

pub const LABEL_FILE: &str = ".disk_label";
pub const LABEL_FILE_2X: &str = ".disk_label_2x";

const LABEL_VERSION: u8 = 1;
const LABEL_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAssets {
    pub x1: Vec<u8>,
    pub x2: Option<Vec<u8>>,
    /// The 1x bitmap carries a valid classic firmware header
    pub firmware_compatible: bool,
}

/// Check the classic firmware label signature.
pub fn is_firmware_label(data: &[u8]) -> bool {
    if data.len() < LABEL_HEADER_LEN || data[0] != LABEL_VERSION {
        return false;
    }
    let width = u16::from_be_bytes([data[1], data[2]]) as usize;
    let height = u16::from_be_bytes([data[3], data[4]]) as usize;
    data.len() == width * height + LABEL_HEADER_LEN
}

pub fn load_labels<H>(host: &H, source: &LabelSource) -> Result<LabelAssets, BlessError>
where
    H: FileStore + LabelRenderer,
{
    let (x1, x2) = match source {
        LabelSource::File(path) => {
            let data = host.load_file(path).map_err(|e| {
                BlessError::label(format!("Can't load label '{}'", path.display()), 2, e)
            })?;
            (data, None)
        }
        LabelSource::Text(text) => {
            let render = |scale| {
                host.render_label(text, scale)
                    .map_err(|e| BlessError::label(format!("Can't render label '{text}'"), 3, e))
            };
            (render(LabelScale::X1)?, Some(render(LabelScale::X2)?))
        }
    };

    let firmware_compatible = is_firmware_label(&x1);
    debug!(
        "Scale 1 label data is valid: {}",
        if firmware_compatible { "YES" } else { "NO" }
    );
    Ok(LabelAssets {
        x1,
        x2,
        firmware_compatible,
    })
}

/// Write the label files into `folder`. Only HFS+ volumes get the 1x file
/// tagged for the firmware picker.
pub fn write_labels(
    files: &impl FileStore,
    folder: &Path,
    assets: &LabelAssets,
    legacy_volume: bool,
) -> Result<(), BlessError> {
    let write = |name: &str, data: &[u8], tagged: bool| {
        let path = folder.join(name);
        files
            .write_label(&path, data, tagged)
            .map_err(|e| BlessError::label(format!("Can't write label {}", path.display()), 1, e))
    };

    write(LABEL_FILE, &assets.x1, assets.firmware_compatible && legacy_volume)?;
    if let Some(x2) = &assets.x2 {
        write(LABEL_FILE_2X, x2, false)?;
    }
    Ok(())
}
