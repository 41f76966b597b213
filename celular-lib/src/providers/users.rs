use super::{Projection, Provider, ProviderKind, Record, SystemPaths};
use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use core::ffi::{CStr, c_char};
use ohno::IntoAppError;
use serde_json::Value;
use std::fs;
use std::sync::{Mutex, PoisonError};

const LOG_TARGET: &str = "     users";

static FIELDS: &[&str] = &["pw_name", "pw_uid", "pw_gid", "pw_gecos", "pw_dir", "pw_shell"];

/// One line of the user database, without its credential column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub dir: String,
    pub shell: String,
}

impl PasswdEntry {
    /// Parse a `name:passwd:uid:gid:gecos:dir:shell` line. The second column is skipped unread.
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(':');
        let name = parts.next()?;
        let _ = parts.next()?;
        let uid = parts.next()?.parse().ok()?;
        let gid = parts.next()?.parse().ok()?;
        let gecos = parts.next()?;
        let dir = parts.next()?;
        let shell = parts.next().unwrap_or_default();

        if name.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            uid,
            gid,
            gecos: gecos.to_string(),
            dir: dir.to_string(),
            shell: shell.to_string(),
        })
    }

    /// Copy a name service record. The credential field is never touched.
    ///
    /// # Safety
    ///
    /// Every string pointer in `pw` must be null or point to a NUL-terminated string.
    unsafe fn from_passwd(pw: &libc::passwd) -> Option<Self> {
        // SAFETY: forwarded from the caller.
        let name = unsafe { lossy_string(pw.pw_name) };
        if name.is_empty() {
            return None;
        }

        // SAFETY: forwarded from the caller.
        unsafe {
            Some(Self {
                name,
                uid: pw.pw_uid,
                gid: pw.pw_gid,
                gecos: lossy_string(pw.pw_gecos),
                dir: lossy_string(pw.pw_dir),
                shell: lossy_string(pw.pw_shell),
            })
        }
    }

    fn into_record(self) -> Record {
        let mut record = Record::new();
        let _ = record.insert("pw_name".into(), Value::from(self.name));
        let _ = record.insert("pw_uid".into(), Value::from(self.uid));
        let _ = record.insert("pw_gid".into(), Value::from(self.gid));
        let _ = record.insert("pw_gecos".into(), Value::from(self.gecos));
        let _ = record.insert("pw_dir".into(), Value::from(self.dir));
        let _ = record.insert("pw_shell".into(), Value::from(self.shell));
        record
    }
}

#[derive(Debug, Clone)]
enum UserDatabase {
    /// The name service switch, which also sees LDAP, SSSD and other directory accounts.
    NameService { fallback: Utf8PathBuf },

    /// A passwd-format file, read directly.
    File(Utf8PathBuf),
}

/// Entries of the system user database.
#[derive(Debug, Clone)]
pub struct UsersProvider {
    database: UserDatabase,
}

impl UsersProvider {
    /// Read users from a passwd-format file only.
    #[must_use]
    pub fn new(passwd_file: &Utf8Path) -> Self {
        Self {
            database: UserDatabase::File(passwd_file.to_path_buf()),
        }
    }

    /// Query the name service switch, falling back to `passwd_file` when it yields no accounts.
    #[must_use]
    pub fn name_service(passwd_file: &Utf8Path) -> Self {
        Self {
            database: UserDatabase::NameService {
                fallback: passwd_file.to_path_buf(),
            },
        }
    }

    /// The name service on the live host, and the tree's own passwd file otherwise.
    #[must_use]
    pub fn for_paths(paths: &SystemPaths) -> Self {
        if paths.is_live() {
            Self::name_service(paths.passwd_file())
        } else {
            Self::new(paths.passwd_file())
        }
    }

    /// Read every well-formed entry, in database order.
    ///
    /// # Errors
    ///
    /// Returns an error if the user database cannot be read.
    pub fn entries(&self) -> Result<Vec<PasswdEntry>> {
        match &self.database {
            UserDatabase::File(path) => read_passwd_file(path),
            UserDatabase::NameService { fallback } => {
                let entries = name_service_entries();
                if !entries.is_empty() {
                    log::trace!(target: LOG_TARGET, "Name service returned {} accounts", entries.len());
                    return Ok(entries);
                }

                log::warn!(target: LOG_TARGET, "Name service returned no accounts, reading '{fallback}' instead");
                read_passwd_file(fallback)
            }
        }
    }
}

fn read_passwd_file(path: &Utf8Path) -> Result<Vec<PasswdEntry>> {
    let text = fs::read_to_string(path).into_app_err_with(|| format!("reading user database '{path}'"))?;

    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match PasswdEntry::parse(line) {
            Some(entry) => entries.push(entry),
            None => log::warn!(target: LOG_TARGET, "Skipping malformed line {} of '{path}'", number + 1),
        }
    }

    Ok(entries)
}

/// Walk the name service passwd database with `setpwent`/`getpwent`/`endpwent`.
fn name_service_entries() -> Vec<PasswdEntry> {
    // The enumeration cursor is process-wide.
    static CURSOR: Mutex<()> = Mutex::new(());
    let _guard = CURSOR.lock().unwrap_or_else(PoisonError::into_inner);

    let mut entries = Vec::new();

    // SAFETY: the lock keeps this crate's threads off the shared cursor, and each record is
    // copied out before the next `getpwent` call invalidates it. libc guarantees that the
    // string fields of a returned record are NUL-terminated.
    unsafe {
        libc::setpwent();
        loop {
            let pw = libc::getpwent();
            if pw.is_null() {
                break;
            }

            if let Some(entry) = PasswdEntry::from_passwd(&*pw) {
                entries.push(entry);
            }
        }
        libc::endpwent();
    }

    entries
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn lossy_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }

    // SAFETY: non-null, and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

impl Provider for UsersProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Users
    }

    fn default_fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn all_fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn collect(&self, projection: &Projection) -> Result<Vec<Value>> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|entry| Value::Object(projection.apply(entry.into_record())))
            .collect())
    }
}
