use super::proc_parsers::{self, StatInfo, StatusInfo};
use super::{Projection, Provider, ProviderKind, Record, SystemPaths, UsersProvider};
use crate::Result;
use camino::Utf8Path;
use core::cell::OnceCell;
use ohno::IntoAppError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_TARGET: &str = " processes";

static DEFAULT_FIELDS: &[&str] = &["pid", "name", "exe", "username", "cwd", "create_time", "open_files"];

static ALL_FIELDS: &[&str] = &[
    "cmdline",
    "connections",
    "cpu_affinity",
    "cpu_num",
    "cpu_percent",
    "cpu_times",
    "create_time",
    "cwd",
    "environ",
    "exe",
    "gids",
    "io_counters",
    "ionice",
    "memory_full_info",
    "memory_info",
    "memory_maps",
    "memory_percent",
    "name",
    "nice",
    "num_ctx_switches",
    "num_fds",
    "num_handles",
    "num_threads",
    "open_files",
    "pid",
    "ppid",
    "status",
    "terminal",
    "threads",
    "uids",
    "username",
];

/// Running processes, one record per numeric directory under the proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcessesProvider {
    paths: SystemPaths,
    users: UsersProvider,
}

impl ProcessesProvider {
    #[must_use]
    pub const fn new(paths: SystemPaths, users: UsersProvider) -> Self {
        Self { paths, users }
    }

    fn pids(&self) -> Result<Vec<u32>> {
        let proc_dir = self.paths.proc_dir();
        let entries = fs::read_dir(proc_dir).into_app_err_with(|| format!("listing process directory '{proc_dir}'"))?;

        let mut pids: Vec<u32> = entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn host_info(&self, projection: &Projection) -> HostInfo {
        let boot_time = fs::read_to_string(self.paths.stat_file())
            .ok()
            .and_then(|text| proc_parsers::parse_boot_time(&text));

        let mem_total = fs::read_to_string(self.paths.meminfo_file())
            .ok()
            .and_then(|text| proc_parsers::parse_mem_total(&text));

        let usernames = if projection.contains("username") {
            match self.users.entries() {
                Ok(entries) => entries.into_iter().map(|e| (e.uid, e.name)).collect(),
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Usernames unavailable, falling back to numeric ids: {e:#}");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        HostInfo {
            clk_tck: clk_tck(),
            page_size: page_size(),
            boot_time,
            mem_total,
            now: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default(),
            usernames,
            live: self.paths.is_live(),
        }
    }
}

impl Provider for ProcessesProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Processes
    }

    fn default_fields(&self) -> &'static [&'static str] {
        DEFAULT_FIELDS
    }

    fn all_fields(&self) -> &'static [&'static str] {
        ALL_FIELDS
    }

    fn collect(&self, projection: &Projection) -> Result<Vec<Value>> {
        let host = self.host_info(projection);
        let pids = self.pids()?;
        let mut records = Vec::with_capacity(pids.len());

        for pid in pids {
            let dir = self.paths.process_dir(pid);
            let Some(stat) = fs::read_to_string(dir.join("stat")).ok().and_then(|text| proc_parsers::parse_stat(&text)) else {
                log::trace!(target: LOG_TARGET, "Process {pid} vanished during the scan");
                continue;
            };

            let process = ProcessView {
                pid,
                dir: &dir,
                stat,
                status: OnceCell::new(),
                host: &host,
            };

            let record: Record = projection
                .fields()
                .iter()
                .map(|field| ((*field).to_string(), process.field(field)))
                .collect();

            records.push(Value::Object(record));
        }

        Ok(records)
    }
}

/// Host-wide values needed to derive per-process fields.
#[derive(Debug)]
struct HostInfo {
    clk_tck: u64,
    page_size: u64,
    boot_time: Option<u64>,
    mem_total: Option<u64>,
    now: f64,
    usernames: HashMap<u32, String>,
    live: bool,
}

impl HostInfo {
    #[expect(clippy::cast_precision_loss, reason = "tick counts stay far below 2^52")]
    fn ticks_to_secs(&self, ticks: u64) -> f64 {
        ticks as f64 / self.clk_tck as f64
    }

    fn signed_ticks_to_secs(&self, ticks: i64) -> f64 {
        self.ticks_to_secs(u64::try_from(ticks).unwrap_or_default())
    }
}

/// One process being read. Files beyond `stat` are read on demand, and a failure to read
/// one only nulls the fields derived from it.
struct ProcessView<'a> {
    pid: u32,
    dir: &'a Utf8Path,
    stat: StatInfo,
    status: OnceCell<Option<StatusInfo>>,
    host: &'a HostInfo,
}

impl ProcessView<'_> {
    fn status(&self) -> Option<&StatusInfo> {
        self.status
            .get_or_init(|| fs::read_to_string(self.dir.join("status")).ok().map(|text| proc_parsers::parse_status(&text)))
            .as_ref()
    }

    fn read_text(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.dir.join(name)).ok()
    }

    fn read_link(&self, name: &str) -> Option<String> {
        let target = fs::read_link(self.dir.join(name)).ok()?;
        Some(target.to_string_lossy().into_owned())
    }

    fn create_time(&self) -> Option<f64> {
        #[expect(clippy::cast_precision_loss, reason = "epoch seconds fit comfortably in an f64 mantissa")]
        let boot = self.host.boot_time? as f64;
        Some(boot + self.host.ticks_to_secs(self.stat.starttime))
    }

    fn field(&self, name: &str) -> Value {
        let value = match name {
            "pid" => Some(json!(self.pid)),
            "name" => Some(json!(self.stat.comm)),
            "ppid" => Some(json!(self.stat.ppid)),
            "status" => Some(json!(proc_parsers::state_name(self.stat.state))),
            "nice" => Some(json!(self.stat.nice)),
            "num_threads" => Some(json!(self.stat.num_threads)),
            "cpu_num" => self.stat.processor.map(|cpu| json!(cpu)),
            "terminal" => proc_parsers::terminal_path(self.stat.tty_nr).map(Value::from),
            "create_time" => self.create_time().map(Value::from),
            "cpu_times" => Some(self.cpu_times()),
            "cpu_percent" => self.cpu_percent().map(Value::from),
            "cmdline" => fs::read(self.dir.join("cmdline")).ok().map(|raw| json!(proc_parsers::split_nul(&raw))),
            "environ" => fs::read(self.dir.join("environ")).ok().map(|raw| json!(proc_parsers::parse_environ(&raw))),
            "exe" => self.read_link("exe").map(Value::from),
            "cwd" => self.read_link("cwd").map(Value::from),
            "uids" => self.status().and_then(|s| s.uids).map(|[real, effective, saved]| {
                json!({"real": real, "effective": effective, "saved": saved})
            }),
            "gids" => self.status().and_then(|s| s.gids).map(|[real, effective, saved]| {
                json!({"real": real, "effective": effective, "saved": saved})
            }),
            "username" => self.username().map(Value::from),
            "num_ctx_switches" => self.num_ctx_switches(),
            "cpu_affinity" => self.status().and_then(|s| s.cpus_allowed.as_ref()).map(|cpus| json!(cpus)),
            "io_counters" => self.io_counters(),
            "memory_info" => self.memory_info(),
            "memory_full_info" => self.memory_full_info(),
            "ionice" => self.ionice(),
            "memory_percent" => self.memory_percent().map(Value::from),
            "memory_maps" => self.memory_maps(),
            "num_fds" => fs::read_dir(self.dir.join("fd")).ok().map(|entries| json!(entries.count())),
            "open_files" => self.open_files(),
            "threads" => self.threads(),

            // num_handles only exists on Windows; socket tables are not joined to processes
            _ => None,
        };

        value.unwrap_or(Value::Null)
    }

    fn username(&self) -> Option<String> {
        let [real, _, _] = self.status()?.uids?;
        Some(self.host.usernames.get(&real).cloned().unwrap_or_else(|| real.to_string()))
    }

    fn cpu_times(&self) -> Value {
        let mut times = json!({
            "user": self.host.ticks_to_secs(self.stat.utime),
            "system": self.host.ticks_to_secs(self.stat.stime),
            "children_user": self.host.signed_ticks_to_secs(self.stat.cutime),
            "children_system": self.host.signed_ticks_to_secs(self.stat.cstime),
        });

        if let Some(ticks) = self.stat.blkio_ticks {
            times["iowait"] = json!(self.host.ticks_to_secs(ticks));
        }

        times
    }

    /// Average CPU utilisation over the lifetime of the process.
    fn cpu_percent(&self) -> Option<f64> {
        let elapsed = self.host.now - self.create_time()?;
        if elapsed <= 0.0 {
            return Some(0.0);
        }

        let busy = self.host.ticks_to_secs(self.stat.utime + self.stat.stime);
        Some((busy / elapsed * 100.0 * 10.0).round() / 10.0)
    }

    fn num_ctx_switches(&self) -> Option<Value> {
        let status = self.status()?;
        Some(json!({
            "voluntary": status.voluntary_ctxt_switches?,
            "involuntary": status.nonvoluntary_ctxt_switches?,
        }))
    }

    fn io_counters(&self) -> Option<Value> {
        let io = proc_parsers::parse_io(&self.read_text("io")?)?;
        Some(json!({
            "read_count": io.syscr,
            "write_count": io.syscw,
            "read_bytes": io.read_bytes,
            "write_bytes": io.write_bytes,
            "read_chars": io.rchar,
            "write_chars": io.wchar,
        }))
    }

    fn memory_info(&self) -> Option<Value> {
        let [size, resident, shared, text, lib, data, dirty] = proc_parsers::parse_statm(&self.read_text("statm")?)?;
        let page = self.host.page_size;
        Some(json!({
            "rss": resident * page,
            "vms": size * page,
            "shared": shared * page,
            "text": text * page,
            "lib": lib * page,
            "data": data * page,
            "dirty": dirty * page,
        }))
    }

    fn memory_full_info(&self) -> Option<Value> {
        let mut info = self.memory_info()?;
        let rollup = proc_parsers::parse_smaps_rollup(&self.read_text("smaps_rollup")?)?;
        info["uss"] = json!(rollup.uss);
        info["pss"] = json!(rollup.pss);
        info["swap"] = json!(rollup.swap);
        Some(info)
    }

    /// I/O scheduling class and level. Only the running host can be asked.
    fn ionice(&self) -> Option<Value> {
        if !self.host.live {
            return None;
        }

        let (ioclass, value) = io_priority(self.pid)?;
        Some(json!({"ioclass": ioclass, "value": value}))
    }

    #[expect(clippy::cast_precision_loss, reason = "memory sizes stay far below 2^52 bytes")]
    fn memory_percent(&self) -> Option<f64> {
        let total = self.host.mem_total.filter(|t| *t > 0)?;
        let rss = u64::try_from(self.stat.rss_pages).ok()? * self.host.page_size;
        Some(rss as f64 / total as f64 * 100.0)
    }

    fn memory_maps(&self) -> Option<Value> {
        let maps = proc_parsers::parse_maps(&self.read_text("maps")?);
        Some(Value::Array(
            maps.into_iter()
                .map(|m| json!({"addr": m.addr, "perms": m.perms, "offset": m.offset, "path": m.path}))
                .collect(),
        ))
    }

    /// Descriptors that refer to regular files on disk.
    fn open_files(&self) -> Option<Value> {
        let entries = fs::read_dir(self.dir.join("fd")).ok()?;
        let mut files: Vec<(u64, String)> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let fd: u64 = entry.file_name().to_str()?.parse().ok()?;
                let target = fs::read_link(entry.path()).ok()?;
                if !target.is_absolute() || !fs::metadata(&target).ok()?.is_file() {
                    return None;
                }
                Some((fd, target.to_string_lossy().into_owned()))
            })
            .collect();
        files.sort_unstable();

        Some(Value::Array(files.into_iter().map(|(fd, path)| json!({"path": path, "fd": fd})).collect()))
    }

    fn threads(&self) -> Option<Value> {
        let entries = fs::read_dir(self.dir.join("task")).ok()?;
        let mut threads: Vec<(u64, StatInfo)> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let tid: u64 = entry.file_name().to_str()?.parse().ok()?;
                let text = fs::read_to_string(entry.path().join("stat")).ok()?;
                Some((tid, proc_parsers::parse_stat(&text)?))
            })
            .collect();
        threads.sort_unstable_by_key(|(tid, _)| *tid);

        Some(Value::Array(
            threads
                .into_iter()
                .map(|(tid, stat)| {
                    json!({
                        "id": tid,
                        "user_time": self.host.ticks_to_secs(stat.utime),
                        "system_time": self.host.ticks_to_secs(stat.stime),
                    })
                })
                .collect(),
        ))
    }
}

/// The `ioprio_get` class and data of a process.
#[cfg(target_os = "linux")]
fn io_priority(pid: u32) -> Option<(i64, i64)> {
    const IOPRIO_WHO_PROCESS: libc::c_int = 1;
    const IOPRIO_CLASS_SHIFT: u32 = 13;
    const IOPRIO_PRIO_MASK: i64 = (1 << IOPRIO_CLASS_SHIFT) - 1;

    let pid = libc::pid_t::try_from(pid).ok()?;

    // SAFETY: ioprio_get takes two integers and only reads scheduler state.
    let raw = unsafe { libc::syscall(libc::SYS_ioprio_get, IOPRIO_WHO_PROCESS, pid) };
    #[allow(clippy::useless_conversion, reason = "c_long is 32 bits wide on some targets")]
    let raw = i64::from(raw);
    if raw < 0 {
        return None;
    }

    Some((raw >> IOPRIO_CLASS_SHIFT, raw & IOPRIO_PRIO_MASK))
}

#[cfg(not(target_os = "linux"))]
const fn io_priority(_pid: u32) -> Option<(i64, i64)> {
    None
}

/// System clock ticks per second, 100 when the platform does not say.
fn clk_tck() -> u64 {
    static CLK_TCK: OnceLock<u64> = OnceLock::new();
    *CLK_TCK.get_or_init(|| {
        // SAFETY: sysconf has no preconditions and only reads process-wide configuration.
        let value = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        u64::try_from(value).ok().filter(|v| *v > 0).unwrap_or(100)
    })
}

/// Memory page size in bytes, 4096 when the platform does not say.
fn page_size() -> u64 {
    static PAGE_SIZE: OnceLock<u64> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no preconditions and only reads process-wide configuration.
        let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        u64::try_from(value).ok().filter(|v| *v > 0).unwrap_or(4096)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FieldSelection;
    use camino::Utf8PathBuf;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: Utf8PathBuf,
        paths: SystemPaths,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
            let paths = SystemPaths::rooted(&root);
            fs::create_dir_all(paths.proc_dir()).unwrap();
            fs::create_dir_all(root.join("etc")).unwrap();
            fs::write(paths.passwd_file(), "root:x:0:0::/root:/bin/sh\nalice:x:1000:1000::/home/alice:/bin/sh\n").unwrap();
            fs::write(paths.stat_file(), "cpu 1 2 3\nbtime 1700000000\n").unwrap();
            fs::write(paths.meminfo_file(), "MemTotal: 1000 kB\n").unwrap();
            Self { _dir: dir, root, paths }
        }

        fn add_process(&self, pid: u32, comm: &str, uid: u32) -> Utf8PathBuf {
            let dir = self.paths.process_dir(pid);
            fs::create_dir_all(dir.join("fd")).unwrap();
            fs::write(
                dir.join("stat"),
                format!("{pid} ({comm}) S 1 {pid} {pid} 0 -1 0 0 0 0 0 10 5 0 0 20 0 1 0 200 1000 3 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0"),
            )
            .unwrap();
            fs::write(dir.join("status"), format!("Name:\t{comm}\nUid:\t{uid}\t{uid}\t{uid}\t{uid}\nGid:\t0\t0\t0\t0\n")).unwrap();
            fs::write(dir.join("cmdline"), format!("/usr/bin/{comm}\0--flag\0")).unwrap();
            dir
        }

        fn provider(&self) -> ProcessesProvider {
            ProcessesProvider::new(self.paths.clone(), UsersProvider::new(self.paths.passwd_file()))
        }
    }

    #[test]
    fn test_records_hold_exactly_the_default_fields() {
        let fixture = Fixture::new();
        let _ = fixture.add_process(7, "sshd", 0);

        let records = fixture.provider().enumerate(&FieldSelection::Default).unwrap();
        assert_eq!(records.len(), 1);

        let record = records[0].as_object().unwrap();
        let mut keys: Vec<_> = record.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["create_time", "cwd", "exe", "name", "open_files", "pid", "username"]);
        assert_eq!(record["pid"], 7);
        assert_eq!(record["name"], "sshd");
        assert_eq!(record["username"], "root");

        // no exe/cwd links in the fixture
        assert!(record["exe"].is_null());
        assert!(record["cwd"].is_null());
        assert_eq!(record["open_files"], json!([]));
    }

    #[test]
    fn test_non_numeric_entries_and_vanished_processes_are_skipped() {
        let fixture = Fixture::new();
        let _ = fixture.add_process(30, "b", 0);
        let _ = fixture.add_process(4, "a", 0);
        fs::create_dir_all(fixture.paths.proc_dir().join("self")).unwrap();
        fs::create_dir_all(fixture.paths.process_dir(99)).unwrap();

        let selection = FieldSelection::Only(vec!["pid".into()]);
        let records = fixture.provider().enumerate(&selection).unwrap();
        assert_eq!(Value::Array(records), json!([{"pid": 4}, {"pid": 30}]));
    }

    #[test]
    fn test_unknown_uid_falls_back_to_number() {
        let fixture = Fixture::new();
        let _ = fixture.add_process(5, "job", 4242);

        let selection = FieldSelection::Only(vec!["username".into(), "uids".into()]);
        let records = fixture.provider().enumerate(&selection).unwrap();
        assert_eq!(records[0]["username"], "4242");
        assert_eq!(records[0]["uids"], json!({"real": 4242, "effective": 4242, "saved": 4242}));
    }

    #[test]
    fn test_all_fields_never_fail_and_fill_nulls() {
        let fixture = Fixture::new();
        let _ = fixture.add_process(9, "worker", 1000);

        let records = fixture.provider().enumerate(&FieldSelection::All).unwrap();
        let record = records[0].as_object().unwrap();
        assert_eq!(record.len(), ALL_FIELDS.len());
        assert_eq!(record["cmdline"], json!(["/usr/bin/worker", "--flag"]));
        assert_eq!(record["status"], "sleeping");
        assert_eq!(record["username"], "alice");
        assert!(record["connections"].is_null());
        assert!(record["num_handles"].is_null());

        // a directory tree cannot be asked for scheduler state
        assert!(record["ionice"].is_null());
        assert!(record["environ"].is_null());
        assert_eq!(record["num_fds"], 0);
    }

    #[test]
    fn test_create_time_uses_boot_time() {
        let fixture = Fixture::new();
        let _ = fixture.add_process(3, "init", 0);

        let selection = FieldSelection::Only(vec!["create_time".into()]);
        let records = fixture.provider().enumerate(&selection).unwrap();
        let expected = 1_700_000_000.0 + 200.0 / f64::from(u32::try_from(clk_tck()).unwrap());
        assert!((records[0]["create_time"].as_f64().unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_open_files_lists_regular_files_only() {
        let fixture = Fixture::new();
        let dir = fixture.add_process(11, "editor", 0);
        let file = fixture.root.join("notes.txt");
        fs::write(&file, "x").unwrap();
        symlink(&file, dir.join("fd").join("4")).unwrap();
        symlink(fixture.root.join("etc"), dir.join("fd").join("5")).unwrap();
        symlink("pipe:[1234]", dir.join("fd").join("6")).unwrap();

        let selection = FieldSelection::Only(vec!["open_files".into(), "num_fds".into()]);
        let records = fixture.provider().enumerate(&selection).unwrap();
        assert_eq!(records[0]["open_files"], json!([{"path": file.as_str(), "fd": 4}]));
        assert_eq!(records[0]["num_fds"], 3);
    }

    #[test]
    fn test_memory_full_info_adds_rollup_totals() {
        let fixture = Fixture::new();
        let dir = fixture.add_process(12, "db", 0);
        fs::write(dir.join("statm"), "100 50 10 5 0 40 0\n").unwrap();
        fs::write(dir.join("smaps_rollup"), "Rss: 200 kB\nPss: 120 kB\nPrivate_Clean: 8 kB\nPrivate_Dirty: 92 kB\nSwap: 4 kB\n").unwrap();

        let selection = FieldSelection::Only(vec!["memory_full_info".into()]);
        let records = fixture.provider().enumerate(&selection).unwrap();
        let info = &records[0]["memory_full_info"];
        assert_eq!(info["rss"], 50 * page_size());
        assert_eq!(info["vms"], 100 * page_size());
        assert_eq!(info["uss"], 100 * 1024);
        assert_eq!(info["pss"], 120 * 1024);
        assert_eq!(info["swap"], 4 * 1024);
    }

    #[test]
    fn test_memory_full_info_needs_the_rollup() {
        let fixture = Fixture::new();
        let dir = fixture.add_process(13, "db", 0);
        fs::write(dir.join("statm"), "100 50 10 5 0 40 0\n").unwrap();

        let selection = FieldSelection::Only(vec!["memory_info".into(), "memory_full_info".into()]);
        let records = fixture.provider().enumerate(&selection).unwrap();
        assert_eq!(records[0]["memory_info"]["rss"], 50 * page_size());
        assert!(records[0]["memory_full_info"].is_null());
    }

    #[test]
    #[cfg(target_os = "linux")]
    #[cfg_attr(miri, ignore)]
    fn test_io_priority_of_this_process() {
        let (ioclass, value) = io_priority(std::process::id()).unwrap();
        assert!((0..=3).contains(&ioclass));
        assert!((0..8).contains(&value));
    }

    #[test]
    fn test_missing_proc_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let paths = SystemPaths::rooted(Utf8Path::from_path(dir.path()).unwrap());
        let provider = ProcessesProvider::new(paths.clone(), UsersProvider::new(paths.passwd_file()));
        let _ = provider.enumerate(&FieldSelection::Default).unwrap_err();
    }
}
