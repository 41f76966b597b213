use camino::{Utf8Path, Utf8PathBuf};

const DEFAULT_PROC_DIR: &str = "/proc";
const DEFAULT_PASSWD_FILE: &str = "/etc/passwd";

/// Filesystem locations the providers read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    root: Option<Utf8PathBuf>,
    proc_dir: Utf8PathBuf,
    passwd_file: Utf8PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            root: None,
            proc_dir: Utf8PathBuf::from(DEFAULT_PROC_DIR),
            passwd_file: Utf8PathBuf::from(DEFAULT_PASSWD_FILE),
        }
    }
}

impl SystemPaths {
    /// Lay out the standard locations beneath `root` (e.g. a fixture directory).
    #[must_use]
    pub fn rooted(root: &Utf8Path) -> Self {
        Self {
            root: Some(root.to_path_buf()),
            proc_dir: root.join("proc"),
            passwd_file: root.join("etc").join("passwd"),
        }
    }

    /// Whether these are the running host's own locations rather than a directory tree.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.root.is_none()
    }

    /// Resolve an absolute host path (e.g. a mountpoint) against the root.
    #[must_use]
    pub fn host_path(&self, absolute: &str) -> Utf8PathBuf {
        match &self.root {
            Some(root) => root.join(absolute.trim_start_matches('/')),
            None => Utf8PathBuf::from(absolute),
        }
    }

    #[must_use]
    pub fn proc_dir(&self) -> &Utf8Path {
        &self.proc_dir
    }

    #[must_use]
    pub fn passwd_file(&self) -> &Utf8Path {
        &self.passwd_file
    }

    #[must_use]
    pub fn mounts_file(&self) -> Utf8PathBuf {
        self.proc_dir.join("self").join("mounts")
    }

    #[must_use]
    pub fn filesystems_file(&self) -> Utf8PathBuf {
        self.proc_dir.join("filesystems")
    }

    #[must_use]
    pub fn stat_file(&self) -> Utf8PathBuf {
        self.proc_dir.join("stat")
    }

    #[must_use]
    pub fn meminfo_file(&self) -> Utf8PathBuf {
        self.proc_dir.join("meminfo")
    }

    #[must_use]
    pub fn process_dir(&self, pid: u32) -> Utf8PathBuf {
        self.proc_dir.join(pid.to_string())
    }
}
