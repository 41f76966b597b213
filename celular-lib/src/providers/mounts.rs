use super::{Projection, Provider, ProviderKind, Record, SystemPaths};
use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use core::mem::MaybeUninit;
use ohno::IntoAppError;
use serde_json::Value;
use std::collections::HashSet;
use std::ffi::CString;
use std::fs;

const LOG_TARGET: &str = "    mounts";

static DEFAULT_FIELDS: &[&str] = &["device", "mountpoint"];
static ALL_FIELDS: &[&str] = &["device", "mountpoint", "fstype", "opts", "maxfile", "maxpath"];

/// Mounted filesystems, as listed by the kernel mount table.
#[derive(Debug, Clone)]
pub struct MountsProvider {
    paths: SystemPaths,
    mounts_file: Utf8PathBuf,
    filesystems_file: Utf8PathBuf,
    include_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountEntry {
    device: String,
    mountpoint: String,
    fstype: String,
    opts: String,
}

impl MountsProvider {
    /// Create a provider. With `include_virtual` set, pseudo filesystems (proc, tmpfs, ...) are listed too.
    #[must_use]
    pub fn new(paths: &SystemPaths, include_virtual: bool) -> Self {
        Self {
            paths: paths.clone(),
            mounts_file: paths.mounts_file(),
            filesystems_file: paths.filesystems_file(),
            include_virtual,
        }
    }

    fn entries(&self) -> Result<Vec<MountEntry>> {
        let text = fs::read_to_string(&self.mounts_file).into_app_err_with(|| format!("reading mount table '{}'", self.mounts_file))?;
        let entries = text.lines().filter_map(parse_mount_line);

        if self.include_virtual {
            return Ok(entries.collect());
        }

        let physical = self.physical_filesystems()?;
        Ok(entries
            .filter(|entry| !entry.device.is_empty() && physical.contains(entry.fstype.as_str()))
            .collect())
    }

    /// Filesystem types the kernel does not mark as `nodev`, plus `zfs`, which is always listed as
    /// `nodev` although its datasets live on real disks.
    fn physical_filesystems(&self) -> Result<HashSet<String>> {
        let text = fs::read_to_string(&self.filesystems_file)
            .into_app_err_with(|| format!("reading filesystem list '{}'", self.filesystems_file))?;

        Ok(text
            .lines()
            .filter_map(|line| {
                let (flags, name) = line.split_once('\t').unwrap_or(("", line));
                let name = name.trim();
                (!name.is_empty() && (flags.trim() != "nodev" || name == "zfs")).then(|| name.to_string())
            })
            .collect())
    }
}

impl Provider for MountsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mounts
    }

    fn default_fields(&self) -> &'static [&'static str] {
        DEFAULT_FIELDS
    }

    fn all_fields(&self) -> &'static [&'static str] {
        ALL_FIELDS
    }

    fn collect(&self, projection: &Projection) -> Result<Vec<Value>> {
        let entries = self.entries()?;
        log::trace!(target: LOG_TARGET, "Read {} mount entries from '{}'", entries.len(), self.mounts_file);

        let want_limits = projection.contains("maxfile") || projection.contains("maxpath");

        Ok(entries
            .into_iter()
            .map(|entry| {
                let mut record = Record::new();
                if want_limits {
                    let (maxfile, maxpath) = path_limits(&self.paths.host_path(&entry.mountpoint));
                    let _ = record.insert("maxfile".into(), maxfile.map_or(Value::Null, Value::from));
                    let _ = record.insert("maxpath".into(), maxpath.map_or(Value::Null, Value::from));
                }

                let _ = record.insert("device".into(), Value::from(entry.device));
                let _ = record.insert("mountpoint".into(), Value::from(entry.mountpoint));
                let _ = record.insert("fstype".into(), Value::from(entry.fstype));
                let _ = record.insert("opts".into(), Value::from(entry.opts));
                Value::Object(projection.apply(record))
            })
            .collect())
    }
}

/// Longest file name and longest path accepted below `path`, as reported by its filesystem.
/// Either is `None` when the filesystem cannot be queried.
fn path_limits(path: &Utf8Path) -> (Option<u64>, Option<u64>) {
    let Ok(c_path) = CString::new(path.as_str()) else {
        return (None, None);
    };

    let mut stats = MaybeUninit::<libc::statvfs>::uninit();

    // SAFETY: `c_path` is NUL-terminated and `stats` is valid for a write of one `statvfs`.
    let maxfile = if unsafe { libc::statvfs(c_path.as_ptr(), stats.as_mut_ptr()) } == 0 {
        // SAFETY: statvfs returned 0, so it filled in `stats`.
        let stats = unsafe { stats.assume_init() };
        #[allow(clippy::useless_conversion, reason = "c_ulong is 32 bits wide on some targets")]
        let namemax = u64::from(stats.f_namemax);
        Some(namemax)
    } else {
        None
    };

    // SAFETY: `c_path` is NUL-terminated.
    let maxpath = unsafe { libc::pathconf(c_path.as_ptr(), libc::_PC_PATH_MAX) };

    (maxfile, u64::try_from(maxpath).ok().filter(|max| *max > 0))
}

fn parse_mount_line(line: &str) -> Option<MountEntry> {
    let mut parts = line.split_ascii_whitespace();
    let device = parts.next()?;
    let mountpoint = parts.next()?;
    let fstype = parts.next()?;
    let opts = parts.next()?;

    Some(MountEntry {
        device: decode_octal_escapes(device),
        mountpoint: decode_octal_escapes(mountpoint),
        fstype: fstype.to_string(),
        opts: opts.to_string(),
    })
}

/// The kernel writes space, tab, newline and backslash in mount paths as `\ooo`.
fn decode_octal_escapes(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(digits) = bytes.get(i + 1..i + 4)
            && digits.iter().all(|d| (b'0'..=b'7').contains(d))
        {
            let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }

        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
