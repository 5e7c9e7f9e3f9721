//! macOS host: syscalls, the private APFS framework, `nvram` and `diskutil`.

use super::{
    container_disk, CompanionVolume, ContainerServices, FileStore, FirmwarePointer, FirmwareStyle,
    IdentifierServices, LabelRenderer, LabelScale, MetadataStore, MountStat, Preallocation,
    VolumeProbe, VolumeRole, MAX_PATH_LEN,
};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use std::ffi::{c_char, c_ulong, c_void, CString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::process::Command;

// ============= SYSCALL FFI =============

#[repr(C)]
#[derive(Clone, Copy)]
struct FsId {
    val: [i32; 2],
}

/// `struct statfs` with 64-bit inodes.
#[repr(C)]
struct StatFs {
    f_bsize: u32,
    f_iosize: i32,
    f_blocks: u64,
    f_bfree: u64,
    f_bavail: u64,
    f_files: u64,
    f_ffree: u64,
    f_fsid: FsId,
    f_owner: u32,
    f_type: u32,
    f_flags: u32,
    f_fssubtype: u32,
    f_fstypename: [c_char; 16],
    f_mntonname: [c_char; MAX_PATH_LEN],
    f_mntfromname: [c_char; MAX_PATH_LEN],
    f_flags_ext: u32,
    f_reserved: [u32; 7],
}

#[repr(C)]
struct AttrList {
    bitmapcount: u16,
    reserved: u16,
    commonattr: u32,
    volattr: u32,
    dirattr: u32,
    fileattr: u32,
    forkattr: u32,
}

/// `fstore_t` for F_PREALLOCATE.
#[repr(C)]
struct FStore {
    fst_flags: u32,
    fst_posmode: i32,
    fst_offset: i64,
    fst_length: i64,
    fst_bytesalloc: i64,
}

const ATTR_BIT_MAP_COUNT: u16 = 5;
const ATTR_CMN_FNDRINFO: u32 = 0x0000_4000;
const FSOPT_NOFOLLOW: u32 = 0x0000_0001;
const FINDER_INFO_LEN: usize = 32;

const MNT_NOWAIT: i32 = 2;

// sys/ioccom.h request encoding
const IOC_OUT: c_ulong = 0x4000_0000;
const IOC_IN: c_ulong = 0x8000_0000;
const IOCPARM_MASK: c_ulong = 0x1fff;

const fn ioc(direction: c_ulong, group: u8, num: u8, len: usize) -> c_ulong {
    direction | ((len as c_ulong & IOCPARM_MASK) << 16) | ((group as c_ulong) << 8) | num as c_ulong
}

/// Two 64-bit words: blessed file inode, blessed folder inode.
const BLESS_DATA_LEN: usize = 16;
const APFSIOC_GET_BOOTINFO: c_ulong = ioc(IOC_OUT, b'J', 18, BLESS_DATA_LEN);
const APFSIOC_SET_BOOTINFO: c_ulong = ioc(IOC_IN, b'J', 19, BLESS_DATA_LEN);

const F_PREALLOCATE: i32 = 42;
const F_ALLOCATECONTIG: u32 = 0x0000_0002;
const F_ALLOCATEALL: u32 = 0x0000_0004;
const F_PEOFPOSMODE: i32 = 3;

extern "C" {
    #[cfg_attr(target_arch = "x86_64", link_name = "statfs$INODE64")]
    fn statfs(path: *const c_char, buf: *mut StatFs) -> i32;
    #[cfg_attr(target_arch = "x86_64", link_name = "getfsstat$INODE64")]
    fn getfsstat(buf: *mut StatFs, bufsize: i32, mode: i32) -> i32;
    fn getattrlist(
        path: *const c_char,
        attrs: *mut AttrList,
        buf: *mut c_void,
        size: usize,
        options: u32,
    ) -> i32;
    fn setattrlist(
        path: *const c_char,
        attrs: *mut AttrList,
        buf: *mut c_void,
        size: usize,
        options: u32,
    ) -> i32;
    fn fsctl(path: *const c_char, request: c_ulong, data: *mut c_void, options: u32) -> i32;
    fn fsgetpath(buf: *mut c_char, size: usize, fsid: *mut FsId, obj_id: u64) -> isize;
    fn geteuid() -> u32;
    fn fcntl(fd: RawFd, cmd: i32, ...) -> i32;
}

// ============= APFS FRAMEWORK FFI =============
// Linked by build.rs from /System/Library/PrivateFrameworks.

extern "C" {
    fn APFSVolumeRole(volume: *const c_char, role: *mut u16, matches: *mut *mut c_void) -> i32;
    fn APFSContainerEFIEmbed(container: *const c_char, data: *const c_char, len: u32) -> i32;
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .with_context(|| format!("{} contains a NUL byte", path.display()))
}

fn c_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn stat_fs(path: &Path) -> Result<StatFs> {
    let cpath = c_path(path)?;
    unsafe {
        let mut sb: StatFs = std::mem::zeroed();
        if statfs(cpath.as_ptr(), &mut sb) != 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("statfs {}", path.display()));
        }
        Ok(sb)
    }
}

fn mounted_filesystems() -> Result<Vec<StatFs>> {
    let count = unsafe { getfsstat(std::ptr::null_mut(), 0, MNT_NOWAIT) };
    if count < 0 {
        return Err(io::Error::last_os_error()).context("getfsstat");
    }
    let mut mounts: Vec<StatFs> = (0..count).map(|_| unsafe { std::mem::zeroed() }).collect();
    let size = i32::try_from(mounts.len() * std::mem::size_of::<StatFs>())?;
    let filled = unsafe { getfsstat(mounts.as_mut_ptr(), size, MNT_NOWAIT) };
    if filled < 0 {
        return Err(io::Error::last_os_error()).context("getfsstat");
    }
    mounts.truncate(usize::try_from(filled)?);
    Ok(mounts)
}

/// Mounted-from device with any snapshot prefix (`name@/dev/diskN`) dropped.
fn device_of(sb: &StatFs) -> String {
    let from = c_string(&sb.f_mntfromname);
    match from.split_once('@') {
        Some((_, device)) => device.to_string(),
        None => from,
    }
}

fn finder_attrs() -> AttrList {
    AttrList {
        bitmapcount: ATTR_BIT_MAP_COUNT,
        reserved: 0,
        commonattr: ATTR_CMN_FNDRINFO,
        volattr: 0,
        dirattr: 0,
        fileattr: 0,
        forkattr: 0,
    }
}

fn get_finder_info(path: &Path) -> Result<[u8; FINDER_INFO_LEN]> {
    let cpath = c_path(path)?;
    let mut attrs = finder_attrs();
    // u32 length followed by the attribute
    let mut buf = [0u8; 4 + FINDER_INFO_LEN];
    let ret = unsafe {
        getattrlist(
            cpath.as_ptr(),
            &mut attrs,
            buf.as_mut_ptr() as *mut c_void,
            buf.len(),
            FSOPT_NOFOLLOW,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error())
            .with_context(|| format!("getattrlist {}", path.display()));
    }
    let mut info = [0u8; FINDER_INFO_LEN];
    info.copy_from_slice(&buf[4..]);
    Ok(info)
}

fn set_finder_info(path: &Path, info: &[u8; FINDER_INFO_LEN]) -> Result<()> {
    let cpath = c_path(path)?;
    let mut attrs = finder_attrs();
    let mut buf = *info;
    let ret = unsafe {
        setattrlist(
            cpath.as_ptr(),
            &mut attrs,
            buf.as_mut_ptr() as *mut c_void,
            buf.len(),
            FSOPT_NOFOLLOW,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error())
            .with_context(|| format!("setattrlist {}", path.display()));
    }
    Ok(())
}

fn preallocate(file: &File, len: u64, contiguous: bool) -> io::Result<()> {
    let mut store = FStore {
        fst_flags: F_ALLOCATEALL | if contiguous { F_ALLOCATECONTIG } else { 0 },
        fst_posmode: F_PEOFPOSMODE,
        fst_offset: 0,
        fst_length: i64::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?,
        fst_bytesalloc: 0,
    };
    let ret = unsafe { fcntl(file.as_raw_fd(), F_PREALLOCATE, &mut store as *mut FStore) };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn apfs_role(bsd_name: &str) -> Result<VolumeRole> {
    let name = CString::new(bsd_name)?;
    let mut role: u16 = 0;
    let ret = unsafe { APFSVolumeRole(name.as_ptr(), &mut role, std::ptr::null_mut()) };
    if ret != 0 {
        bail!("APFSVolumeRole({bsd_name}) returned {ret}");
    }
    Ok(VolumeRole::from_raw(role))
}

// ============= COMMAND HELPERS =============

/// Value of a `Key:   value` line in `diskutil info` output.
fn info_field(output: &str, key: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim().to_string())
    })
}

fn diskutil_info(target: &str) -> Result<String> {
    let output = Command::new("/usr/sbin/diskutil")
        .args(["info", target])
        .output()
        .context("Failed to run diskutil")?;
    if !output.status.success() {
        bail!(
            "diskutil info {target} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// XML device path understood by the EFI boot variables.
fn boot_device_xml(media_uuid: &str, bsd_name: Option<&str>, file: Option<&str>) -> String {
    let mut xml = String::from("<array><dict><key>IOMatch</key><dict>");
    xml.push_str("<key>IOProviderClass</key><string>IOMedia</string>");
    xml.push_str("<key>IOPropertyMatch</key><dict><key>UUID</key><string>");
    xml.push_str(&xml_escape(media_uuid));
    xml.push_str("</string></dict></dict>");
    if let Some(bsd) = bsd_name {
        xml.push_str("<key>BLLastBSDName</key><string>");
        xml.push_str(&xml_escape(bsd));
        xml.push_str("</string>");
    }
    xml.push_str("</dict>");
    if let Some(file) = file {
        xml.push_str("<dict><key>IOEFIDevicePathType</key><string>MediaFilePath</string>");
        xml.push_str("<key>Path</key><string>");
        xml.push_str(&xml_escape(file));
        xml.push_str("</string></dict>");
    }
    xml.push_str("</array>");
    xml
}

/// EFI file path (backslash separated) of `path` relative to `mount`.
fn efi_file_path(mount: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(mount).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!("\\{}", parts.join("\\")))
}

fn set_nvram(name: &str, value: &str) -> Result<()> {
    debug!("nvram {name}={value}");
    let status = Command::new("/usr/sbin/nvram")
        .arg(format!("{name}={value}"))
        .status()
        .context("Failed to run nvram")?;
    if !status.success() {
        bail!("nvram {name} exited with {status}");
    }
    Ok(())
}

/// Whether `name` is an integrity manifest accompanying `stem`.
fn is_manifest_of(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .is_some_and(|rest| rest.starts_with('.') && rest.ends_with(".im4m"))
}

// ============= HOST =============

/// The running macOS system.
#[derive(Debug, Default)]
pub struct DarwinHost;

impl DarwinHost {
    pub fn new() -> Self {
        DarwinHost
    }
}

impl VolumeProbe for DarwinHost {
    fn mount_point_of(&self, path: &Path) -> Result<PathBuf> {
        let sb = stat_fs(path)?;
        Ok(PathBuf::from(c_string(&sb.f_mntonname)))
    }

    fn is_legacy_fs(&self, mount: &Path) -> Result<bool> {
        Ok(c_string(&stat_fs(mount)?.f_fstypename) == "hfs")
    }

    fn is_modern_fs(&self, mount: &Path) -> Result<bool> {
        Ok(c_string(&stat_fs(mount)?.f_fstypename) == "apfs")
    }

    /// A data volume still mounted at `/` belongs to a system that has not
    /// moved to the sealed system volume layout yet.
    fn is_pre_migration_unsafe(&self, mount: &Path) -> Result<bool> {
        let sb = stat_fs(mount)?;
        if c_string(&sb.f_fstypename) != "apfs" {
            return Ok(false);
        }
        let device = device_of(&sb);
        let role = apfs_role(device.strip_prefix("/dev/").unwrap_or(&device))?;
        Ok(role == VolumeRole::Data && c_string(&sb.f_mntonname) == "/")
    }

    fn stat_mount(&self, mount: &Path) -> Result<MountStat> {
        let sb = stat_fs(mount)?;
        Ok(MountStat {
            device: device_of(&sb),
            mount_point: PathBuf::from(c_string(&sb.f_mntonname)),
            flags: sb.f_flags,
            owner: sb.f_owner,
            subtype: sb.f_fssubtype,
        })
    }

    fn volume_role(&self, bsd_name: &str) -> Result<VolumeRole> {
        apfs_role(bsd_name)
    }

    /// Mounted snapshots of a sealed system volume are never blessed directly.
    fn is_companion_volume(&self, mount: &Path, _bsd_name: &str) -> Result<bool> {
        let sb = stat_fs(mount)?;
        Ok(c_string(&sb.f_mntfromname).contains('@'))
    }

    fn firmware_style(&self) -> FirmwareStyle {
        FirmwareStyle::Efi
    }

    fn effective_uid(&self) -> u32 {
        unsafe { geteuid() }
    }
}

impl DarwinHost {
    fn reverse_lookup(&self, mount: &Path, obj_id: u64) -> Result<String> {
        let mut fsid = stat_fs(mount)?.f_fsid;
        let mut buf = vec![0 as c_char; MAX_PATH_LEN];
        let len = unsafe { fsgetpath(buf.as_mut_ptr(), buf.len(), &mut fsid, obj_id) };
        if len < 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("fsgetpath {obj_id} on {}", mount.display()));
        }
        Ok(c_string(&buf))
    }
}

impl IdentifierServices for DarwinHost {
    fn dir_id(&self, path: &Path) -> Result<u32> {
        let ino = fs::symlink_metadata(path)
            .with_context(|| format!("lstat {}", path.display()))?
            .ino();
        u32::try_from(ino).map_err(|_| anyhow!("{} has a 64-bit file ID {ino}", path.display()))
    }

    fn reverse_lookup_dir_id(&self, mount: &Path, id: u32) -> Result<String> {
        self.reverse_lookup(mount, u64::from(id))
    }

    fn inode(&self, path: &Path) -> Result<u64> {
        Ok(fs::symlink_metadata(path)
            .with_context(|| format!("lstat {}", path.display()))?
            .ino())
    }

    fn reverse_lookup_inode(&self, mount: &Path, inum: u64) -> Result<String> {
        self.reverse_lookup(mount, inum)
    }
}

impl MetadataStore for DarwinHost {
    fn read_finder_info(&self, mount: &Path) -> Result<[u32; 8]> {
        let info = get_finder_info(mount)?;
        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(info.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(words)
    }

    fn write_finder_info(&self, mount: &Path, words: &[u32; 8]) -> Result<()> {
        let mut info = [0u8; FINDER_INFO_LEN];
        for (chunk, word) in info.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        set_finder_info(mount, &info)
    }

    fn read_bless_data(&self, mount: &Path) -> Result<Option<[u64; 2]>> {
        let cpath = c_path(mount)?;
        let mut words = [0u64; 2];
        let ret = unsafe {
            fsctl(
                cpath.as_ptr(),
                APFSIOC_GET_BOOTINFO,
                words.as_mut_ptr() as *mut c_void,
                0,
            )
        };
        if ret != 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                debug!("{} has no bless data yet", mount.display());
                return Ok(None);
            }
            return Err(err).with_context(|| format!("APFSIOC_GET_BOOTINFO {}", mount.display()));
        }
        Ok(Some(words))
    }

    fn write_bless_data(&self, mount: &Path, words: &[u64; 2]) -> Result<()> {
        let cpath = c_path(mount)?;
        let mut words = *words;
        let ret = unsafe {
            fsctl(
                cpath.as_ptr(),
                APFSIOC_SET_BOOTINFO,
                words.as_mut_ptr() as *mut c_void,
                0,
            )
        };
        if ret != 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("APFSIOC_SET_BOOTINFO {}", mount.display()));
        }
        Ok(())
    }
}

impl FileStore for DarwinHost {
    fn load_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn is_readable(&self, path: &Path) -> bool {
        File::open(path).is_ok()
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.is_file())
    }

    fn create_file(&self, path: &Path, data: &[u8], prealloc: Preallocation) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let len = data.len() as u64;
        match (prealloc, preallocate(&file, len, true)) {
            (_, Ok(())) => {}
            (Preallocation::Must, Err(e)) => {
                return Err(e).with_context(|| {
                    format!("Couldn't preallocate {len} contiguous bytes for {}", path.display())
                });
            }
            (Preallocation::Try, Err(e)) => {
                debug!("Contiguous preallocation failed for {}: {e}", path.display());
                if let Err(e) = preallocate(&file, len, false) {
                    debug!("Preallocation failed for {}: {e}", path.display());
                }
            }
        }

        file.write_all(data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", path.display()))?;
        Ok(())
    }

    fn write_label(&self, path: &Path, data: &[u8], firmware_label: bool) -> Result<()> {
        self.create_file(path, data, Preallocation::Try)?;
        if firmware_label {
            let mut info = [0u8; FINDER_INFO_LEN];
            info[0..4].copy_from_slice(b"tbxj");
            info[4..8].copy_from_slice(b"chrp");
            set_finder_info(path, &info)?;
        }
        Ok(())
    }

    fn copy_manifests(&self, dest: &Path, source: &Path) -> Result<()> {
        if dest == source {
            return Ok(());
        }
        let (Some(src_dir), Some(src_name), Some(dest_name)) =
            (source.parent(), source.file_name(), dest.file_name())
        else {
            return Ok(());
        };
        let src_name = src_name.to_string_lossy();
        let dest_name = dest_name.to_string_lossy();

        let entries = match fs::read_dir(src_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", src_dir.display()))
            }
        };
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to list {}", src_dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_manifest_of(&name, &src_name) {
                continue;
            }
            let target = dest.with_file_name(format!("{dest_name}{}", &name[src_name.len()..]));
            debug!("Copying manifest {} to {}", entry.path().display(), target.display());
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy manifest to {}", target.display()))?;
        }
        Ok(())
    }
}

impl LabelRenderer for DarwinHost {
    fn render_label(&self, text: &str, _scale: LabelScale) -> Result<Vec<u8>> {
        bail!("Rendering label text '{text}' is not supported; pass a prebuilt --labelfile")
    }

    fn can_render_labels(&self) -> bool {
        false
    }
}

impl FirmwarePointer for DarwinHost {
    fn set_pointer_by_path(
        &self,
        path: &Path,
        next_only: bool,
        options: Option<&str>,
        short_form: bool,
    ) -> Result<()> {
        if let Some(options) = options {
            warn!("Ignoring boot options '{options}'");
        }
        let stat = self.stat_mount(path)?;
        let bsd_name = stat.bsd_name();
        let info = diskutil_info(bsd_name)?;
        let media_uuid = info_field(&info, "Disk / Partition UUID")
            .ok_or_else(|| anyhow!("No partition UUID for {bsd_name}"))?;

        let file = efi_file_path(&stat.mount_point, path);
        let xml = boot_device_xml(
            &media_uuid,
            (!short_form).then_some(bsd_name),
            file.as_deref(),
        );
        let variable = if next_only { "efi-boot-next" } else { "efi-boot-device" };
        set_nvram(variable, &xml)
    }

    fn set_pointer_by_device_legacy_hint(
        &self,
        path: &Path,
        _next_only: bool,
        _drive_hint: Option<&str>,
        _options: Option<&str>,
    ) -> Result<()> {
        bail!("Legacy boot of {} is not supported on this Mac", path.display())
    }

    fn set_pointer_by_device(
        &self,
        device: &str,
        _alt_device: Option<&str>,
        _label: Option<&[u8]>,
    ) -> Result<()> {
        bail!("Open Firmware boot device {device} is not supported on this Mac")
    }

    fn supports_legacy_pointer(&self) -> bool {
        false
    }
}

impl ContainerServices for DarwinHost {
    fn embed_container_driver(&self, container_bsd_name: &str, driver: &[u8]) -> Result<()> {
        let name = CString::new(container_bsd_name)?;
        let len = u32::try_from(driver.len())?;
        let ret = unsafe {
            APFSContainerEFIEmbed(name.as_ptr(), driver.as_ptr() as *const c_char, len)
        };
        if ret != 0 {
            bail!("APFSContainerEFIEmbed({container_bsd_name}) returned {ret}");
        }
        Ok(())
    }

    fn preboot_volume(&self, bsd_name: &str) -> Result<Option<CompanionVolume>> {
        let Some(container) = container_disk(bsd_name) else {
            return Ok(None);
        };
        for sb in mounted_filesystems()? {
            if c_string(&sb.f_fstypename) != "apfs" {
                continue;
            }
            let device = device_of(&sb);
            let sibling = device.strip_prefix("/dev/").unwrap_or(&device);
            if sibling == bsd_name || container_disk(sibling).as_deref() != Some(container.as_str()) {
                continue;
            }
            if apfs_role(sibling)? == VolumeRole::Preboot {
                return Ok(Some(CompanionVolume {
                    device: device.clone(),
                    mount_point: PathBuf::from(c_string(&sb.f_mntonname)),
                }));
            }
        }
        Ok(None)
    }

    fn volume_uuid(&self, mount: &Path) -> Result<String> {
        let info = diskutil_info(&mount.to_string_lossy())?;
        info_field(&info, "Volume UUID")
            .ok_or_else(|| anyhow!("No volume UUID for {}", mount.display()))
    }

    fn personalize(&self, mount: &Path, _allow_ui: bool) -> Result<()> {
        bail!("Personalization of {} is not supported on this host", mount.display())
    }

    fn supports_personalization(&self) -> bool {
        false
    }
}
