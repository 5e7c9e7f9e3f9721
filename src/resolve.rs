//! Path to native identifier resolution.
//!
//! Resolution never aborts a run. A folder that cannot be resolved is
//! treated as "no folder", and a boot file that is missing, not a regular
//! file, or whose recorded id no longer maps back to one, resolves to 0 so a
//! stale pointer heals to "unset".

use crate::platform::{FileStore, IdentifierServices, MAX_PATH_LEN};
use crate::volume::FsKind;
use anyhow::{bail, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Native id of `path`: directory ID on HFS+, inode number on APFS.
fn native_id(ids: &impl IdentifierServices, kind: FsKind, path: &Path) -> Result<u64> {
    match kind {
        FsKind::Legacy => ids.dir_id(path).map(u64::from),
        FsKind::Modern => ids.inode(path),
        FsKind::Foreign => bail!("{} has no native file identifiers", path.display()),
    }
}

fn reverse_lookup(
    ids: &impl IdentifierServices,
    kind: FsKind,
    mount: &Path,
    id: u64,
) -> Result<PathBuf> {
    let path = match kind {
        FsKind::Legacy => ids.reverse_lookup_dir_id(mount, u32::try_from(id)?)?,
        FsKind::Modern => ids.reverse_lookup_inode(mount, id)?,
        FsKind::Foreign => bail!("{} has no native file identifiers", mount.display()),
    };
    if path.is_empty() || path.len() >= MAX_PATH_LEN {
        bail!("lookup of id {id} returned an unusable path ({} bytes)", path.len());
    }
    Ok(PathBuf::from(path))
}

/// Native id of the system folder, or 0 when absent or unresolvable.
pub fn resolve_folder(ids: &impl IdentifierServices, kind: FsKind, folder: Option<&Path>) -> u64 {
    let Some(folder) = folder else {
        return 0;
    };
    match native_id(ids, kind, folder) {
        Ok(id) => {
            debug!("Got directory ID of {} for {}", id, folder.display());
            id
        }
        Err(e) => {
            warn!("Error while getting directory ID of {}: {e:#}", folder.display());
            0
        }
    }
}

/// Native id of the boot loader file.
///
/// With an explicit path the id is taken from it. Without one, `previous`
/// (the id already recorded on the volume) is kept only if it still maps
/// back to a regular file. Returns the id and, when known, the path it
/// denotes.
pub fn resolve_boot_file(
    ids: &impl IdentifierServices,
    files: &impl FileStore,
    kind: FsKind,
    mount: &Path,
    explicit: Option<&Path>,
    previous: u64,
) -> (u64, Option<PathBuf>) {
    if let Some(path) = explicit {
        let id = match native_id(ids, kind, path) {
            Ok(id) => id,
            Err(e) => {
                warn!("Error while getting file ID of {}. Ignoring... ({e:#})", path.display());
                return (0, None);
            }
        };
        if !files.is_regular_file(path) {
            warn!(
                "{} cannot be accessed, or is not a regular file. Ignoring...",
                path.display()
            );
            return (0, None);
        }
        debug!("Got file ID of {} for {}", id, path.display());
        return (id, Some(path.to_path_buf()));
    }

    if previous == 0 {
        return (0, None);
    }

    let path = match reverse_lookup(ids, kind, mount, previous) {
        Ok(path) => path,
        Err(e) => {
            debug!("Invalid EFI blessed file ID {previous}. Zeroing... ({e:#})");
            return (0, None);
        }
    };
    if !files.is_regular_file(&path) {
        warn!(
            "{} cannot be accessed, or is not a regular file. Ignoring...",
            path.display()
        );
        return (0, None);
    }
    debug!("Preserving EFI blessed file ID {} for {}", previous, path.display());
    (previous, Some(path))
}
