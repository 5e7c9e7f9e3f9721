//! In-memory host for tests.

use crate::platform::{
    CompanionVolume, ContainerServices, FileStore, FirmwarePointer, FirmwareStyle,
    IdentifierServices, LabelRenderer, LabelScale, MetadataStore, MountStat, Preallocation,
    VolumeProbe, VolumeRole, MNT_RDONLY,
};
use anyhow::{anyhow, bail, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockWrite {
    File(PathBuf, Preallocation),
    Label(PathBuf, bool),
    FinderInfo(PathBuf),
    BlessData(PathBuf),
    Manifests(PathBuf),
    PathPointer {
        path: PathBuf,
        next_only: bool,
        options: Option<String>,
        short_form: bool,
    },
    LegacyPointer {
        path: PathBuf,
        next_only: bool,
        drive_hint: Option<String>,
    },
    DevicePointer {
        device: String,
        label: bool,
    },
    Driver(String, usize),
    Personalize(PathBuf, bool),
}

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub data: Vec<u8>,
    pub regular: bool,
    pub id: u64,
}

#[derive(Debug)]
pub struct MockState {
    pub mount: PathBuf,
    pub device: String,
    pub legacy: bool,
    pub modern: bool,
    pub pre_migration: bool,
    pub read_only: bool,
    pub owner: u32,
    pub subtype: u32,
    pub role: VolumeRole,
    pub companion: bool,
    pub firmware: FirmwareStyle,
    pub euid: u32,
    pub preboot: Option<CompanionVolume>,
    pub preboot_owner: u32,
    pub fail_fs_probe: bool,
    pub fail_role: bool,
    pub fail_record_write: bool,
    pub fail_file_write: bool,
    pub fail_manifests: bool,
    pub fail_pointer: bool,
    /// Host without legacy pointers, personalization or label rendering
    pub limited: bool,
    pub entries: BTreeMap<PathBuf, MockEntry>,
    pub next_id: u64,
    pub finder_info: BTreeMap<PathBuf, [u32; 8]>,
    pub bless_data: BTreeMap<PathBuf, [u64; 2]>,
    pub writes: Vec<MockWrite>,
    /// Paths passed to any identifier lookup, in order.
    pub lookups: Vec<PathBuf>,
}

pub struct MockHost {
    pub state: RefCell<MockState>,
}

impl MockHost {
    fn new(mount: &str, device: &str, legacy: bool, role: VolumeRole) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            PathBuf::from(mount),
            MockEntry {
                data: Vec::new(),
                regular: false,
                id: 2,
            },
        );
        MockHost {
            state: RefCell::new(MockState {
                mount: PathBuf::from(mount),
                device: device.to_string(),
                legacy,
                modern: !legacy,
                pre_migration: false,
                read_only: false,
                owner: 501,
                subtype: 1,
                role,
                companion: false,
                firmware: FirmwareStyle::Efi,
                euid: 501,
                preboot: None,
                preboot_owner: 0,
                fail_fs_probe: false,
                fail_role: false,
                fail_record_write: false,
                fail_file_write: false,
                fail_manifests: false,
                fail_pointer: false,
                limited: false,
                entries,
                next_id: 100,
                finder_info: BTreeMap::new(),
                bless_data: BTreeMap::new(),
                writes: Vec::new(),
                lookups: Vec::new(),
            }),
        }
    }

    /// Writable journaled HFS+ volume owned by the caller.
    pub fn legacy(mount: &str) -> Self {
        Self::new(mount, "/dev/disk1s2", true, VolumeRole::None)
    }

    pub fn modern(mount: &str, role: VolumeRole) -> Self {
        Self::new(mount, "/dev/disk3s5", false, role)
    }

    pub fn add_dir(&self, path: &str) -> u64 {
        self.insert(path, Vec::new(), false)
    }

    pub fn add_file(&self, path: &str, data: &[u8]) -> u64 {
        self.insert(path, data.to_vec(), true)
    }

    /// Something that exists but is not a regular file (a symlink, say).
    pub fn add_special(&self, path: &str) -> u64 {
        self.insert(path, Vec::new(), false)
    }

    pub fn attach_preboot(&self, mount: &str) {
        let mut state = self.state.borrow_mut();
        state.preboot = Some(CompanionVolume {
            device: "/dev/disk3s2".to_string(),
            mount_point: PathBuf::from(mount),
        });
        state.entries.insert(
            PathBuf::from(mount),
            MockEntry {
                data: Vec::new(),
                regular: false,
                id: 2,
            },
        );
    }

    fn insert(&self, path: &str, data: Vec<u8>, regular: bool) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state
            .entries
            .insert(PathBuf::from(path), MockEntry { data, regular, id });
        id
    }

    pub fn set_finder_info(&self, words: [u32; 8]) {
        let mut state = self.state.borrow_mut();
        let mount = state.mount.clone();
        state.finder_info.insert(mount, words);
    }

    pub fn finder_info(&self) -> Option<[u32; 8]> {
        let state = self.state.borrow();
        state.finder_info.get(&state.mount).copied()
    }

    pub fn bless_data_of(&self, mount: &str) -> Option<[u64; 2]> {
        self.state.borrow().bless_data.get(Path::new(mount)).copied()
    }

    pub fn writes(&self) -> Vec<MockWrite> {
        self.state.borrow().writes.clone()
    }

    pub fn file_writes(&self) -> usize {
        self.writes()
            .iter()
            .filter(|w| matches!(w, MockWrite::File(..)))
            .count()
    }

    pub fn data_of(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .entries
            .get(Path::new(path))
            .map(|e| e.data.clone())
    }

    fn record(&self, write: MockWrite) {
        self.state.borrow_mut().writes.push(write);
    }

    fn id_of(&self, path: &Path) -> Result<u64> {
        let mut state = self.state.borrow_mut();
        state.lookups.push(path.to_path_buf());
        state
            .entries
            .get(path)
            .map(|e| e.id)
            .ok_or_else(|| anyhow!("No such file or directory: {}", path.display()))
    }

    fn path_of(&self, mount: &Path, id: u64) -> Result<String> {
        self.state
            .borrow()
            .entries
            .iter()
            .find(|(path, entry)| entry.id == id && path.starts_with(mount))
            .map(|(path, _)| path.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("no object with id {id} on {}", mount.display()))
    }
}

impl VolumeProbe for MockHost {
    fn mount_point_of(&self, path: &Path) -> Result<PathBuf> {
        let state = self.state.borrow();
        if path.starts_with(&state.mount) {
            return Ok(state.mount.clone());
        }
        match &state.preboot {
            Some(preboot) if path.starts_with(&preboot.mount_point) => {
                Ok(preboot.mount_point.clone())
            }
            _ => bail!("{} is not on a mounted volume", path.display()),
        }
    }

    fn is_legacy_fs(&self, _mount: &Path) -> Result<bool> {
        let state = self.state.borrow();
        if state.fail_fs_probe {
            bail!("statfs failed");
        }
        Ok(state.legacy)
    }

    fn is_modern_fs(&self, _mount: &Path) -> Result<bool> {
        Ok(self.state.borrow().modern)
    }

    fn is_pre_migration_unsafe(&self, _mount: &Path) -> Result<bool> {
        Ok(self.state.borrow().pre_migration)
    }

    fn stat_mount(&self, mount: &Path) -> Result<MountStat> {
        let state = self.state.borrow();
        if let Some(preboot) = state.preboot.as_ref().filter(|p| p.mount_point == mount) {
            return Ok(MountStat {
                device: preboot.device.clone(),
                mount_point: preboot.mount_point.clone(),
                flags: 0,
                owner: state.preboot_owner,
                subtype: 0,
            });
        }
        Ok(MountStat {
            device: state.device.clone(),
            mount_point: state.mount.clone(),
            flags: if state.read_only { MNT_RDONLY } else { 0 },
            owner: state.owner,
            subtype: state.subtype,
        })
    }

    fn volume_role(&self, _bsd_name: &str) -> Result<VolumeRole> {
        let state = self.state.borrow();
        if state.fail_role {
            bail!("APFSVolumeRole failed");
        }
        Ok(state.role)
    }

    fn is_companion_volume(&self, _mount: &Path, _bsd_name: &str) -> Result<bool> {
        Ok(self.state.borrow().companion)
    }

    fn firmware_style(&self) -> FirmwareStyle {
        self.state.borrow().firmware
    }

    fn effective_uid(&self) -> u32 {
        self.state.borrow().euid
    }
}

impl IdentifierServices for MockHost {
    fn dir_id(&self, path: &Path) -> Result<u32> {
        Ok(u32::try_from(self.id_of(path)?)?)
    }

    fn reverse_lookup_dir_id(&self, mount: &Path, id: u32) -> Result<String> {
        self.path_of(mount, u64::from(id))
    }

    fn inode(&self, path: &Path) -> Result<u64> {
        self.id_of(path)
    }

    fn reverse_lookup_inode(&self, mount: &Path, inum: u64) -> Result<String> {
        self.path_of(mount, inum)
    }
}

impl MetadataStore for MockHost {
    fn read_finder_info(&self, mount: &Path) -> Result<[u32; 8]> {
        Ok(self
            .state
            .borrow()
            .finder_info
            .get(mount)
            .copied()
            .unwrap_or_default())
    }

    fn write_finder_info(&self, mount: &Path, words: &[u32; 8]) -> Result<()> {
        if self.state.borrow().fail_record_write {
            bail!("Operation not permitted");
        }
        self.state
            .borrow_mut()
            .finder_info
            .insert(mount.to_path_buf(), *words);
        self.record(MockWrite::FinderInfo(mount.to_path_buf()));
        Ok(())
    }

    fn read_bless_data(&self, mount: &Path) -> Result<Option<[u64; 2]>> {
        Ok(self.state.borrow().bless_data.get(mount).copied())
    }

    fn write_bless_data(&self, mount: &Path, words: &[u64; 2]) -> Result<()> {
        if self.state.borrow().fail_record_write {
            bail!("Operation not permitted");
        }
        self.state
            .borrow_mut()
            .bless_data
            .insert(mount.to_path_buf(), *words);
        self.record(MockWrite::BlessData(mount.to_path_buf()));
        Ok(())
    }
}

impl FileStore for MockHost {
    fn load_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.state
            .borrow()
            .entries
            .get(path)
            .filter(|e| e.regular)
            .map(|e| e.data.clone())
            .ok_or_else(|| anyhow!("No such file or directory: {}", path.display()))
    }

    fn is_readable(&self, path: &Path) -> bool {
        self.state.borrow().entries.contains_key(path)
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        self.state
            .borrow()
            .entries
            .get(path)
            .is_some_and(|e| e.regular)
    }

    fn create_file(&self, path: &Path, data: &[u8], prealloc: Preallocation) -> Result<()> {
        if self.state.borrow().fail_file_write {
            bail!("No space left on device");
        }
        {
            let mut state = self.state.borrow_mut();
            let existing = state.entries.get(path).map(|e| e.id);
            let id = match existing {
                Some(id) => id,
                None => {
                    state.next_id += 1;
                    state.next_id - 1
                }
            };
            state.entries.insert(
                path.to_path_buf(),
                MockEntry {
                    data: data.to_vec(),
                    regular: true,
                    id,
                },
            );
        }
        self.record(MockWrite::File(path.to_path_buf(), prealloc));
        Ok(())
    }

    fn write_label(&self, path: &Path, data: &[u8], firmware_label: bool) -> Result<()> {
        self.add_file(&path.to_string_lossy(), data);
        self.record(MockWrite::Label(path.to_path_buf(), firmware_label));
        Ok(())
    }

    fn copy_manifests(&self, dest: &Path, _source: &Path) -> Result<()> {
        if self.state.borrow().fail_manifests {
            bail!("manifest copy failed");
        }
        self.record(MockWrite::Manifests(dest.to_path_buf()));
        Ok(())
    }
}

impl LabelRenderer for MockHost {
    fn render_label(&self, text: &str, scale: LabelScale) -> Result<Vec<u8>> {
        let factor: u16 = match scale {
            LabelScale::X1 => 1,
            LabelScale::X2 => 2,
        };
        let width = text.len() as u16 * 6 * factor;
        let height = 12 * factor;
        let mut data = vec![1u8];
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.resize(5 + usize::from(width) * usize::from(height), 0);
        Ok(data)
    }

    fn can_render_labels(&self) -> bool {
        !self.state.borrow().limited
    }
}

impl FirmwarePointer for MockHost {
    fn set_pointer_by_path(
        &self,
        path: &Path,
        next_only: bool,
        options: Option<&str>,
        short_form: bool,
    ) -> Result<()> {
        if self.state.borrow().fail_pointer {
            bail!("nvram write failed");
        }
        self.record(MockWrite::PathPointer {
            path: path.to_path_buf(),
            next_only,
            options: options.map(str::to_string),
            short_form,
        });
        Ok(())
    }

    fn set_pointer_by_device_legacy_hint(
        &self,
        path: &Path,
        next_only: bool,
        drive_hint: Option<&str>,
        _options: Option<&str>,
    ) -> Result<()> {
        if self.state.borrow().fail_pointer {
            bail!("nvram write failed");
        }
        self.record(MockWrite::LegacyPointer {
            path: path.to_path_buf(),
            next_only,
            drive_hint: drive_hint.map(str::to_string),
        });
        Ok(())
    }

    fn set_pointer_by_device(
        &self,
        device: &str,
        _alt_device: Option<&str>,
        label: Option<&[u8]>,
    ) -> Result<()> {
        if self.state.borrow().fail_pointer {
            bail!("nvram write failed");
        }
        self.record(MockWrite::DevicePointer {
            device: device.to_string(),
            label: label.is_some(),
        });
        Ok(())
    }

    fn supports_legacy_pointer(&self) -> bool {
        !self.state.borrow().limited
    }
}

impl ContainerServices for MockHost {
    fn embed_container_driver(&self, container_bsd_name: &str, driver: &[u8]) -> Result<()> {
        self.record(MockWrite::Driver(container_bsd_name.to_string(), driver.len()));
        Ok(())
    }

    fn preboot_volume(&self, _bsd_name: &str) -> Result<Option<CompanionVolume>> {
        Ok(self.state.borrow().preboot.clone())
    }

    fn volume_uuid(&self, _mount: &Path) -> Result<String> {
        Ok("5A8E6B4C-0D2F-4B8E-9C11-3E7A2D5F6C90".to_string())
    }

    fn personalize(&self, mount: &Path, allow_ui: bool) -> Result<()> {
        self.record(MockWrite::Personalize(mount.to_path_buf(), allow_ui));
        Ok(())
    }

    fn supports_personalization(&self) -> bool {
        !self.state.borrow().limited
    }
}
