//! Filesystem scan for known PostgreSQL-adjacent binaries, with version-aware
//! conflict resolution.

use pgagent_core::{RegistrySnapshot, ToolEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

const SEARCH_PATHS: &[&str] = &[
    "/usr/lib/postgresql/*/bin",
    "/usr/pgsql-*/bin",
    "/opt/pgagent/bin",
    "/usr/bin",
    "/usr/local/bin",
];

struct ToolMeta {
    version_cmd: &'static str,
    description: &'static str,
}

fn dba_tools_metadata() -> HashMap<&'static str, ToolMeta> {
    [
        ("pgbackrest", ToolMeta { version_cmd: "--version", description: "Backup & Restore tool" }),
        ("patronictl", ToolMeta { version_cmd: "version", description: "High-Availability manager" }),
        ("psql", ToolMeta { version_cmd: "--version", description: "PostgreSQL CLI" }),
        ("pg_verifybackup", ToolMeta { version_cmd: "--version", description: "Backup validation tool" }),
        ("repmgr", ToolMeta { version_cmd: "--version", description: "Replication manager" }),
        ("pg_basebackup", ToolMeta { version_cmd: "--version", description: "PostgreSQL base backup tool" }),
    ]
    .into_iter()
    .collect()
}

/// Extracts the version number embedded in the directory one level above
/// `bin`, e.g. `/usr/lib/postgresql/16/bin` -> `Some(16)`, `/usr/bin` -> `None`.
fn version_of_bin_dir(dir: &Path) -> Option<u32> {
    let parent_name = dir.parent()?.file_name()?.to_string_lossy().to_string();
    parent_name.chars().filter(|c| c.is_ascii_digit()).collect::<String>().parse().ok()
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.exists()
    }
}

fn expand_search_dirs() -> Vec<(PathBuf, Option<u32>)> {
    let mut dirs = Vec::new();
    for pattern in SEARCH_PATHS {
        let mut matched: Vec<(PathBuf, Option<u32>)> = glob::glob(pattern)
            .into_iter()
            .flatten()
            .filter_map(|r| r.ok())
            .filter(|p| p.is_dir())
            .map(|p| {
                let v = version_of_bin_dir(&p);
                (p, v)
            })
            .collect();
        matched.sort_by(|a, b| b.1.unwrap_or(0).cmp(&a.1.unwrap_or(0)));
        dirs.extend(matched);
    }
    dirs
}

/// Runs `path arg` with a wall-clock timeout, returning the first line of
/// stdout on success. Used only for short version/metadata probes.
fn run_with_timeout(path: &Path, arg: &str, timeout: Duration) -> Option<String> {
    let mut child = Command::new(path)
        .arg(arg)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let mut stdout = child.stdout.take()?;
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf);
        let _ = tx.send(buf);
    });

    match rx.recv_timeout(timeout) {
        Ok(output) => {
            let _ = child.wait();
            output.lines().next().map(|l| l.trim().to_string())
        }
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            None
        }
    }
}

/// Applies path-priority conflict resolution: specialized install paths win
/// over generic system bins. If more than one specialized path remains for a
/// name and every one of them carries a distinct parseable version (e.g. a
/// `psql` 13 install alongside a `psql` 16 install — an ordinary side-by-side
/// deployment), the highest version wins the bare name and every version gets
/// a `name-V` alias (§4.4 versioned aliases). Only a genuinely ambiguous case
/// — duplicate or unparseable versions among the specialized paths — is
/// reported as a conflict and excluded from the resolved map.
fn resolve_and_detect_conflicts(
    found: HashMap<String, Vec<(PathBuf, Option<u32>)>>,
) -> (
    BTreeMap<String, (PathBuf, Option<u32>)>,
    BTreeMap<String, Vec<String>>,
    BTreeMap<String, Vec<(u32, PathBuf)>>,
) {
    let mut resolved = BTreeMap::new();
    let mut conflicts = BTreeMap::new();
    let mut aliases: BTreeMap<String, Vec<(u32, PathBuf)>> = BTreeMap::new();

    for (name, paths) in found {
        if paths.len() == 1 {
            resolved.insert(name, paths.into_iter().next().unwrap());
            continue;
        }

        let expert: Vec<_> = paths
            .iter()
            .filter(|(p, _)| {
                let s = p.to_string_lossy();
                !(s.starts_with("/usr/bin/") || s.starts_with("/bin/"))
            })
            .cloned()
            .collect();

        let eval_paths = if expert.is_empty() { paths } else { expert };

        if eval_paths.len() == 1 {
            resolved.insert(name, eval_paths.into_iter().next().unwrap());
            continue;
        }

        let mut versions: Vec<u32> = eval_paths.iter().filter_map(|(_, v)| *v).collect();
        versions.sort_unstable();
        let all_parsed_and_distinct =
            versions.len() == eval_paths.len() && versions.windows(2).all(|w| w[0] != w[1]);

        if all_parsed_and_distinct {
            let mut versioned: Vec<(u32, PathBuf)> =
                eval_paths.into_iter().map(|(p, v)| (v.unwrap(), p)).collect();
            versioned.sort_by_key(|(v, _)| *v);
            let (top_version, top_path) = versioned.last().cloned().unwrap();
            resolved.insert(name.clone(), (top_path, Some(top_version)));
            aliases.insert(name, versioned);
        } else {
            let mut paths_str: Vec<String> =
                eval_paths.iter().map(|(p, _)| p.to_string_lossy().to_string()).collect();
            paths_str.sort();
            conflicts.insert(name, paths_str);
        }
    }

    (resolved, conflicts, aliases)
}

/// Best-effort capability probe: if `psql` resolved, list installed
/// extensions via a read-only query against the default local connection.
/// Any failure simply omits the key rather than failing discovery.
fn probe_capabilities(psql_path: Option<&Path>) -> serde_json::Value {
    let mut caps = serde_json::Map::new();
    caps.insert("os_info".to_string(), serde_json::json!(std::env::consts::OS));

    if let Some(path) = psql_path {
        let output = Command::new(path)
            .args(["-X", "-t", "-A", "-c", "SELECT extname FROM pg_extension;"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output();

        if let Ok(out) = output {
            if out.status.success() {
                let extensions: Vec<String> = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect();
                caps.insert("extensions".to_string(), serde_json::json!(extensions));
            }
        }
    }

    serde_json::Value::Object(caps)
}

/// Full discovery scan: search, resolve conflicts, probe metadata and
/// capabilities, and assemble a snapshot. `allowed` restricts which binary
/// names are even considered a hit.
pub fn discover_binaries(allowed: &HashSet<String>) -> RegistrySnapshot {
    let mut found: HashMap<String, Vec<(PathBuf, Option<u32>)>> = HashMap::new();

    for (dir, version) in expand_search_dirs() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_executable(&path) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !allowed.is_empty() && !allowed.contains(&name) {
                continue;
            }

            let bucket = found.entry(name).or_default();
            if !bucket.iter().any(|(p, _)| p == &path) {
                bucket.push((path, version));
            }
        }
    }

    let (resolved, conflicts, aliases) = resolve_and_detect_conflicts(found);

    let mut binaries: BTreeMap<String, String> = BTreeMap::new();
    let mut tools = Vec::new();
    let metadata = dba_tools_metadata();
    let mut psql_path: Option<PathBuf> = None;

    for (name, (path, version)) in &resolved {
        binaries.insert(name.clone(), path.to_string_lossy().to_string());

        if let Some(v) = version {
            binaries.insert(format!("{name}-{v}"), path.to_string_lossy().to_string());
        }

        if let Some(versioned) = aliases.get(name) {
            for (v, p) in versioned {
                binaries.insert(format!("{name}-{v}"), p.to_string_lossy().to_string());
            }
        }

        if name == "psql" {
            psql_path = Some(path.clone());
        }

        let (version_string, description) = match metadata.get(name.as_str()) {
            Some(meta) => {
                let version_string = run_with_timeout(path, meta.version_cmd, Duration::from_secs(2))
                    .unwrap_or_else(|| "unknown".to_string());
                (version_string, meta.description.to_string())
            }
            None => ("unknown".to_string(), String::new()),
        };

        tools.push(ToolEntry {
            name: name.clone(),
            absolute_path: path.to_string_lossy().to_string(),
            version_string,
            description,
        });
    }

    RegistrySnapshot {
        scanned_at: chrono::Utc::now().to_rfc3339(),
        binaries,
        tools,
        has_conflicts: !conflicts.is_empty(),
        conflicts,
        capabilities: probe_capabilities(psql_path.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_of_bin_dir_extracts_digits() {
        assert_eq!(version_of_bin_dir(Path::new("/usr/lib/postgresql/16/bin")), Some(16));
        assert_eq!(version_of_bin_dir(Path::new("/usr/pgsql-13/bin")), Some(13));
        assert_eq!(version_of_bin_dir(Path::new("/usr/bin")), None);
    }

    #[test]
    fn single_path_resolves_without_conflict() {
        let mut found = HashMap::new();
        found.insert("psql".to_string(), vec![(PathBuf::from("/usr/lib/postgresql/16/bin/psql"), Some(16))]);
        let (resolved, conflicts, _aliases) = resolve_and_detect_conflicts(found);
        assert!(conflicts.is_empty());
        assert_eq!(resolved.get("psql").unwrap().1, Some(16));
    }

    #[test]
    fn generic_path_discarded_in_favor_of_specialized() {
        let mut found = HashMap::new();
        found.insert(
            "psql".to_string(),
            vec![
                (PathBuf::from("/usr/bin/psql"), None),
                (PathBuf::from("/usr/lib/postgresql/16/bin/psql"), Some(16)),
            ],
        );
        let (resolved, conflicts, _aliases) = resolve_and_detect_conflicts(found);
        assert!(conflicts.is_empty());
        assert_eq!(resolved.get("psql").unwrap().0, PathBuf::from("/usr/lib/postgresql/16/bin/psql"));
    }

    #[test]
    fn two_specialized_paths_with_distinct_versions_tiebreak_to_the_highest() {
        let mut found = HashMap::new();
        found.insert(
            "psql".to_string(),
            vec![
                (PathBuf::from("/usr/lib/postgresql/13/bin/psql"), Some(13)),
                (PathBuf::from("/usr/lib/postgresql/16/bin/psql"), Some(16)),
            ],
        );
        let (resolved, conflicts, aliases) = resolve_and_detect_conflicts(found);
        assert!(conflicts.is_empty());
        assert_eq!(resolved.get("psql").unwrap(), &(PathBuf::from("/usr/lib/postgresql/16/bin/psql"), Some(16)));
        let versioned = aliases.get("psql").unwrap();
        assert!(versioned.contains(&(13, PathBuf::from("/usr/lib/postgresql/13/bin/psql"))));
        assert!(versioned.contains(&(16, PathBuf::from("/usr/lib/postgresql/16/bin/psql"))));
    }

    #[test]
    fn two_specialized_paths_with_unparseable_versions_still_conflict() {
        let mut found = HashMap::new();
        found.insert(
            "custompg".to_string(),
            vec![
                (PathBuf::from("/opt/custompg/a/bin/custompg"), None),
                (PathBuf::from("/opt/custompg/b/bin/custompg"), None),
            ],
        );
        let (resolved, conflicts, _aliases) = resolve_and_detect_conflicts(found);
        assert!(resolved.get("custompg").is_none());
        assert_eq!(conflicts.get("custompg").unwrap().len(), 2);
    }
}
