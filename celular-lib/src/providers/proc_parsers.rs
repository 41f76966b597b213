//! Parsers for the text files exposed under `/proc`.
//!
//! Every parser takes file content and returns `None` when the content is not in the
//! expected shape, leaving I/O and error policy to the caller.

use std::collections::BTreeMap;

/// Selected fields of `/proc/<pid>/stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatInfo {
    pub comm: String,
    pub state: char,
    pub ppid: i64,
    pub tty_nr: i64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub starttime: u64,
    pub rss_pages: i64,
    pub processor: Option<i64>,
    pub blkio_ticks: Option<u64>,
}

/// Parse `/proc/<pid>/stat`. The command name may itself contain spaces and parentheses,
/// so it spans from the first `(` to the last `)`.
pub fn parse_stat(content: &str) -> Option<StatInfo> {
    let comm_start = content.find('(')?;
    let comm_end = content.rfind(')')?;
    let comm = content.get(comm_start + 1..comm_end)?;
    let fields: Vec<&str> = content.get(comm_end + 1..)?.split_whitespace().collect();

    // indices below are relative to the first field after the command name
    if fields.len() < 22 {
        return None;
    }

    Some(StatInfo {
        comm: comm.to_string(),
        state: fields[0].chars().next()?,
        ppid: fields[1].parse().ok()?,
        tty_nr: fields[4].parse().ok()?,
        utime: fields[11].parse().ok()?,
        stime: fields[12].parse().ok()?,
        cutime: fields[13].parse().ok()?,
        cstime: fields[14].parse().ok()?,
        nice: fields[16].parse().ok()?,
        num_threads: fields[17].parse().ok()?,
        starttime: fields[19].parse().ok()?,
        rss_pages: fields[21].parse().ok()?,
        processor: fields.get(36).and_then(|f| f.parse().ok()),
        blkio_ticks: fields.get(39).and_then(|f| f.parse().ok()),
    })
}

/// Human-readable name of a process state letter.
pub const fn state_name(state: char) -> &'static str {
    match state {
        'R' => "running",
        'S' => "sleeping",
        'D' => "disk-sleep",
        'T' => "stopped",
        't' => "tracing-stop",
        'Z' => "zombie",
        'X' | 'x' => "dead",
        'K' => "wake-kill",
        'W' => "waking",
        'P' => "parked",
        'I' => "idle",
        _ => "unknown",
    }
}

/// Map a `tty_nr` device number to its device path for the common terminal majors.
pub fn terminal_path(tty_nr: i64) -> Option<String> {
    if tty_nr <= 0 {
        return None;
    }

    let major = (tty_nr >> 8) & 0xfff;
    let minor = (tty_nr & 0xff) | ((tty_nr >> 12) & 0xfff00);

    match major {
        4 if minor < 64 => Some(format!("/dev/tty{minor}")),
        4 => Some(format!("/dev/ttyS{}", minor - 64)),
        136..=143 => Some(format!("/dev/pts/{}", (major - 136) * 256 + minor)),
        _ => None,
    }
}

/// Selected fields of `/proc/<pid>/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub uids: Option<[u32; 3]>,
    pub gids: Option<[u32; 3]>,
    pub voluntary_ctxt_switches: Option<u64>,
    pub nonvoluntary_ctxt_switches: Option<u64>,
    pub cpus_allowed: Option<Vec<u32>>,
}

pub fn parse_status(content: &str) -> StatusInfo {
    let mut info = StatusInfo::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let value = value.trim();
        match key {
            "Uid" => info.uids = parse_id_triple(value),
            "Gid" => info.gids = parse_id_triple(value),
            "voluntary_ctxt_switches" => info.voluntary_ctxt_switches = value.parse().ok(),
            "nonvoluntary_ctxt_switches" => info.nonvoluntary_ctxt_switches = value.parse().ok(),
            "Cpus_allowed_list" => info.cpus_allowed = parse_cpu_list(value),
            _ => {}
        }
    }

    info
}

/// Real, effective and saved ids from a `Uid:`/`Gid:` line (the filesystem id is dropped).
fn parse_id_triple(value: &str) -> Option<[u32; 3]> {
    let mut ids = value.split_whitespace().map(str::parse::<u32>);
    Some([ids.next()?.ok()?, ids.next()?.ok()?, ids.next()?.ok()?])
}

/// Parse a CPU list such as `0-3,8,10-11`.
pub fn parse_cpu_list(value: &str) -> Option<Vec<u32>> {
    let mut cpus = Vec::new();

    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.parse().ok()?;
            let end: u32 = end.parse().ok()?;
            if end < start {
                return None;
            }
            cpus.extend(start..=end);
        } else {
            cpus.push(part.parse().ok()?);
        }
    }

    Some(cpus)
}

/// Split a NUL-separated file such as `cmdline`.
pub fn split_nul(content: &[u8]) -> Vec<String> {
    content
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

/// Parse `/proc/<pid>/environ` into a name/value map.
pub fn parse_environ(content: &[u8]) -> BTreeMap<String, String> {
    split_nul(content)
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// I/O counters from `/proc/<pid>/io`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoInfo {
    pub rchar: u64,
    pub wchar: u64,
    pub syscr: u64,
    pub syscw: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

pub fn parse_io(content: &str) -> Option<IoInfo> {
    let mut info = IoInfo::default();
    let mut seen = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let Ok(value) = value.trim().parse::<u64>() else {
            continue;
        };

        seen = true;
        match key.trim() {
            "rchar" => info.rchar = value,
            "wchar" => info.wchar = value,
            "syscr" => info.syscr = value,
            "syscw" => info.syscw = value,
            "read_bytes" => info.read_bytes = value,
            "write_bytes" => info.write_bytes = value,
            _ => {}
        }
    }

    seen.then_some(info)
}

/// Memory totals from `/proc/<pid>/smaps_rollup`, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmapsRollup {
    pub pss: u64,
    pub uss: u64,
    pub swap: u64,
}

/// Sum the `kB` lines the rollup reports. `uss` is the process's private memory.
pub fn parse_smaps_rollup(content: &str) -> Option<SmapsRollup> {
    let mut rollup = SmapsRollup::default();
    let mut seen_pss = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let Some(Ok(kb)) = value.split_whitespace().next().map(str::parse::<u64>) else {
            continue;
        };

        let bytes = kb * 1024;
        match key.trim() {
            "Pss" => {
                rollup.pss = bytes;
                seen_pss = true;
            }
            "Private_Clean" | "Private_Dirty" => rollup.uss += bytes,
            "Swap" => rollup.swap = bytes,
            _ => {}
        }
    }

    seen_pss.then_some(rollup)
}

/// Page counts from `/proc/<pid>/statm`: size, resident, shared, text, lib, data, dirty.
pub fn parse_statm(content: &str) -> Option<[u64; 7]> {
    let mut values = content.split_whitespace().map(str::parse::<u64>);
    let mut out = [0; 7];
    for slot in &mut out {
        *slot = values.next()?.ok()?;
    }
    Some(out)
}

/// One line of `/proc/<pid>/maps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub addr: String,
    pub perms: String,
    pub offset: u64,
    pub path: String,
}

pub fn parse_maps(content: &str) -> Vec<MapEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(6, char::is_whitespace);
            let addr = parts.next()?;
            let perms = parts.next()?;
            let offset = u64::from_str_radix(parts.next()?, 16).ok()?;
            let _dev = parts.next()?;
            let _inode = parts.next()?;
            let path = parts.next().unwrap_or_default().trim();

            Some(MapEntry {
                addr: addr.to_string(),
                perms: perms.to_string(),
                offset,
                path: path.to_string(),
            })
        })
        .collect()
}

/// Boot time in seconds since the epoch, from the `btime` line of `/proc/stat`.
pub fn parse_boot_time(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime"))
        .and_then(|rest| rest.trim().parse().ok())
}

/// Total memory in bytes, from the `MemTotal` line of `/proc/meminfo`.
pub fn parse_mem_total(content: &str) -> Option<u64> {
    let rest = content.lines().find_map(|line| line.strip_prefix("MemTotal:"))?;
    let kib: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
    kib.checked_mul(1024)
}
