//! Boot metadata records.
//!
//! HFS+ keeps boot information in the volume's eight 32-bit Finder info
//! words (word 0: bootable marker, word 1: boot file, word 5: system
//! folder). APFS keeps two 64-bit bless words (file, folder). Both shapes go
//! through the same read-modify-write pipeline; words the pipeline does not
//! own are written back exactly as read.

use crate::error::BlessError;
use crate::platform::{FileStore, IdentifierServices, MetadataStore};
use crate::resolve::{resolve_boot_file, resolve_folder};
use crate::volume::FsKind;
use anyhow::anyhow;
use log::debug;
use std::path::{Path, PathBuf};

const FINDER_MARKER: usize = 0;
const FINDER_FILE: usize = 1;
const FINDER_FOLDER: usize = 5;

const BLESS_FILE: usize = 0;
const BLESS_FOLDER: usize = 1;

/// Resolved boot target; 0 means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootTarget {
    pub folder: u64,
    pub file: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootRecord {
    Legacy([u32; 8]),
    Modern([u64; 2]),
}

impl BootRecord {
    /// Read the record of a volume of the given kind.
    pub fn read(
        store: &impl MetadataStore,
        kind: FsKind,
        mount: &Path,
    ) -> Result<Self, BlessError> {
        match kind {
            FsKind::Legacy => store.read_finder_info(mount).map(BootRecord::Legacy).map_err(|e| {
                BlessError::io(
                    format!("Error getting old Finder info words for {}", mount.display()),
                    1,
                    e,
                )
            }),
            // A volume that was never blessed has no bless data yet.
            FsKind::Modern => store
                .read_bless_data(mount)
                .map(|words| BootRecord::Modern(words.unwrap_or_default()))
                .map_err(|e| {
                    BlessError::io(format!("Error getting bless data for {}", mount.display()), 1, e)
                }),
            FsKind::Foreign => Err(BlessError::io(
                format!("Error getting boot metadata for {}", mount.display()),
                1,
                anyhow!("filesystem has no boot metadata record"),
            )),
        }
    }

    pub fn write(&self, store: &impl MetadataStore, mount: &Path) -> Result<(), BlessError> {
        match self {
            BootRecord::Legacy(words) => store.write_finder_info(mount, words).map_err(|e| {
                BlessError::io(
                    format!("Can't set Finder info fields for volume mounted at {}", mount.display()),
                    2,
                    e,
                )
            }),
            BootRecord::Modern(words) => store.write_bless_data(mount, words).map_err(|e| {
                BlessError::io(
                    format!("Can't set bless data for volume mounted at {}", mount.display()),
                    2,
                    e,
                )
            }),
        }
    }

    pub fn boot_file(&self) -> u64 {
        match self {
            BootRecord::Legacy(words) => u64::from(words[FINDER_FILE]),
            BootRecord::Modern(words) => words[BLESS_FILE],
        }
    }

    pub fn folder(&self) -> u64 {
        match self {
            BootRecord::Legacy(words) => u64::from(words[FINDER_FOLDER]),
            BootRecord::Modern(words) => words[BLESS_FOLDER],
        }
    }

    /// Store `target`. On HFS+ the bootable marker follows the folder unless
    /// `suppress_marker` forces it to zero; a zero folder leaves it alone.
    pub fn apply(&mut self, target: BootTarget, suppress_marker: bool) {
        match self {
            BootRecord::Legacy(words) => {
                // Directory IDs are 32-bit by construction on HFS+.
                let folder = u32::try_from(target.folder).unwrap_or(0);
                words[FINDER_FILE] = u32::try_from(target.file).unwrap_or(0);
                words[FINDER_FOLDER] = folder;
                if suppress_marker {
                    words[FINDER_MARKER] = 0;
                } else if folder != 0 {
                    words[FINDER_MARKER] = folder;
                }
                debug!("finderinfo[0] = {}", words[FINDER_MARKER]);
                debug!("finderinfo[1] = {}", words[FINDER_FILE]);
                debug!("finderinfo[5] = {}", words[FINDER_FOLDER]);
            }
            BootRecord::Modern(words) => {
                words[BLESS_FILE] = target.file;
                words[BLESS_FOLDER] = target.folder;
                debug!("blessed file = {}", words[BLESS_FILE]);
                debug!("blessed folder = {}", words[BLESS_FOLDER]);
            }
        }
    }
}

/// One bless of one volume's record.
#[derive(Debug, Clone)]
pub struct RecordUpdate<'a> {
    pub mount: &'a Path,
    pub kind: FsKind,
    /// On-disk owner of the volume, for the privilege check
    pub owner: u32,
    pub folder: Option<&'a Path>,
    pub file: Option<&'a Path>,
    /// Force the HFS+ bootable marker to zero
    pub suppress_marker: bool,
    /// Resolve but do not write (pre-migration volumes)
    pub inhibited: bool,
}

/// Outcome of `update_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedRecord {
    pub record: BootRecord,
    pub written: bool,
    /// Path of the boot file the record now points at, when one resolved
    pub boot_file: Option<PathBuf>,
}

/// Superuser or the volume's on-disk owner.
pub fn may_modify(euid: u32, owner: u32) -> bool {
    euid == 0 || euid == owner
}

/// Read the record, resolve the new target, check privilege and write it back.
pub fn update_record<H>(host: &H, euid: u32, update: &RecordUpdate) -> Result<UpdatedRecord, BlessError>
where
    H: MetadataStore + IdentifierServices + FileStore,
{
    let mut record = BootRecord::read(host, update.kind, update.mount)?;

    let folder = resolve_folder(host, update.kind, update.folder);
    let (file, boot_file) = resolve_boot_file(
        host,
        host,
        update.kind,
        update.mount,
        update.file,
        record.boot_file(),
    );

    record.apply(BootTarget { folder, file }, update.suppress_marker);

    if update.inhibited {
        debug!(
            "Not writing boot metadata to {}: volume is mid-migration",
            update.mount.display()
        );
        return Ok(UpdatedRecord {
            record,
            written: false,
            boot_file,
        });
    }

    if !may_modify(euid, update.owner) {
        return Err(BlessError::Authorization(update.mount.display().to_string()));
    }

    record.write(host, update.mount)?;
    Ok(UpdatedRecord {
        record,
        written: true,
        boot_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockHost, MockWrite};
    use crate::platform::VolumeRole;

    const MOUNT: &str = "/Volumes/HD";

    fn legacy_update<'a>(folder: Option<&'a Path>, file: Option<&'a Path>) -> RecordUpdate<'a> {
        RecordUpdate {
            mount: Path::new(MOUNT),
            kind: FsKind::Legacy,
            owner: 501,
            folder,
            file,
            suppress_marker: false,
            inhibited: false,
        }
    }

    #[test]
    fn test_legacy_folder_only() {
        let host = MockHost::legacy(MOUNT);
        let folder_id = host.add_dir("/Volumes/HD/System") as u32;
        let folder = Path::new("/Volumes/HD/System");

        let out = update_record(&host, 501, &legacy_update(Some(folder), None)).unwrap();
        assert!(out.written);
        assert_eq!(
            host.finder_info(),
            Some([folder_id, 0, 0, 0, 0, folder_id, 0, 0])
        );
    }

    #[test]
    fn test_legacy_preserves_untouched_words() {
        let host = MockHost::legacy(MOUNT);
        let folder_id = host.add_dir("/Volumes/HD/System") as u32;
        let file_id = host.add_file("/Volumes/HD/System/boot.efi", b"EFI") as u32;
        host.set_finder_info([9, 0, 0xAAAA, 0xBBBB, 0xCCCC, 0, 0xDDDD_EEEE, 0xFFFF_0000]);

        update_record(
            &host,
            0,
            &legacy_update(
                Some(Path::new("/Volumes/HD/System")),
                Some(Path::new("/Volumes/HD/System/boot.efi")),
            ),
        )
        .unwrap();

        assert_eq!(
            host.finder_info(),
            Some([folder_id, file_id, 0xAAAA, 0xBBBB, 0xCCCC, folder_id, 0xDDDD_EEEE, 0xFFFF_0000])
        );
    }

    #[test]
    fn test_marker_suppressed_for_excluded_subtype() {
        let host = MockHost::legacy(MOUNT);
        host.add_dir("/Volumes/HD/System");
        host.set_finder_info([55, 0, 0, 0, 0, 0, 0, 0]);
        let mut update = legacy_update(Some(Path::new("/Volumes/HD/System")), None);
        update.suppress_marker = true;

        update_record(&host, 501, &update).unwrap();
        let words = host.finder_info().unwrap();
        assert_eq!(words[0], 0);
        assert_ne!(words[5], 0);
    }

    #[test]
    fn test_marker_untouched_without_folder() {
        let host = MockHost::legacy(MOUNT);
        host.set_finder_info([55, 0, 0, 0, 0, 66, 0, 0]);
        update_record(&host, 501, &legacy_update(None, None)).unwrap();
        assert_eq!(host.finder_info(), Some([55, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_stale_boot_file_zeroed() {
        let host = MockHost::legacy(MOUNT);
        host.set_finder_info([0, 31337, 0, 0, 0, 0, 0, 0]);
        update_record(&host, 501, &legacy_update(None, None)).unwrap();
        assert_eq!(host.finder_info().unwrap()[1], 0);
    }

    #[test]
    fn test_unchanged_inputs_are_stable() {
        let host = MockHost::legacy(MOUNT);
        host.add_dir("/Volumes/HD/System");
        host.add_file("/Volumes/HD/System/boot.efi", b"EFI");
        let update = legacy_update(
            Some(Path::new("/Volumes/HD/System")),
            Some(Path::new("/Volumes/HD/System/boot.efi")),
        );

        let first = update_record(&host, 501, &update).unwrap();
        let second = update_record(&host, 501, &update).unwrap();
        assert_eq!(first.record, second.record);

        // Dropping the explicit file keeps the recorded one.
        let third = update_record(&host, 501, &legacy_update(Some(Path::new("/Volumes/HD/System")), None))
            .unwrap();
        assert_eq!(third.record, first.record);
    }

    #[test]
    fn test_unauthorized_caller_writes_nothing() {
        let host = MockHost::legacy(MOUNT);
        host.add_dir("/Volumes/HD/System");
        let err = update_record(&host, 502, &legacy_update(Some(Path::new("/Volumes/HD/System")), None))
            .unwrap_err();
        assert!(matches!(err, BlessError::Authorization(_)));
        assert!(host.writes().is_empty());
    }

    #[test]
    fn test_may_modify() {
        assert!(may_modify(0, 501));
        assert!(may_modify(501, 501));
        assert!(!may_modify(502, 501));
        assert!(!may_modify(501, 0));
    }

    #[test]
    fn test_write_failure_status() {
        let host = MockHost::legacy(MOUNT);
        host.state.borrow_mut().fail_record_write = true;
        let err = update_record(&host, 0, &legacy_update(None, None)).unwrap_err();
        assert_eq!(err.status(), 2);
    }

    #[test]
    fn test_inhibited_resolves_without_writing() {
        let host = MockHost::legacy(MOUNT);
        let folder_id = host.add_dir("/Volumes/HD/System");
        let mut update = legacy_update(Some(Path::new("/Volumes/HD/System")), None);
        update.inhibited = true;

        let out = update_record(&host, 502, &update).unwrap();
        assert!(!out.written);
        assert_eq!(out.record.folder(), folder_id);
        assert!(host.writes().is_empty());
    }

    #[test]
    fn test_modern_missing_file_blesses_folder() {
        let host = MockHost::modern(MOUNT, VolumeRole::Preboot);
        let folder_id = host.add_dir("/Volumes/HD/CoreServices");
        let update = RecordUpdate {
            mount: Path::new(MOUNT),
            kind: FsKind::Modern,
            owner: 501,
            folder: Some(Path::new("/Volumes/HD/CoreServices")),
            file: Some(Path::new("/Volumes/HD/CoreServices/boot.efi")),
            suppress_marker: false,
            inhibited: false,
        };

        let out = update_record(&host, 501, &update).unwrap();
        assert_eq!(out.record, BootRecord::Modern([0, folder_id]));
        assert_eq!(host.bless_data_of(MOUNT), Some([0, folder_id]));
        assert_eq!(host.writes(), vec![MockWrite::BlessData(PathBuf::from(MOUNT))]);
    }
}
