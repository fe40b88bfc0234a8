//! Builds the `bwrap` invocation that isolates a resolved command.

use std::path::Path;

const PG_SOCKET_DIR: &str = "/var/run/postgresql";

/// Assembles `bwrap <flags> <resolved_path> <args...>`. The resolved binary's
/// containing directory is bound read-only alongside the standard system
/// directories so dynamic linking and shared libraries keep working.
pub fn build_bwrap_command(resolved_path: &str, args: &[String]) -> Vec<String> {
    let mut cmd: Vec<String> = vec![
        "bwrap".to_string(),
        "--unshare-all".to_string(),
        "--die-with-parent".to_string(),
        "--new-session".to_string(),
        "--proc".to_string(),
        "/proc".to_string(),
        "--dev".to_string(),
        "/dev".to_string(),
        "--ro-bind".to_string(),
        "/usr".to_string(),
        "/usr".to_string(),
        "--ro-bind".to_string(),
        "/bin".to_string(),
        "/bin".to_string(),
        "--ro-bind".to_string(),
        "/lib".to_string(),
        "/lib".to_string(),
    ];

    if Path::new("/lib64").is_dir() {
        cmd.push("--ro-bind".to_string());
        cmd.push("/lib64".to_string());
        cmd.push("/lib64".to_string());
    }

    cmd.push("--ro-bind".to_string());
    cmd.push("/etc".to_string());
    cmd.push("/etc".to_string());

    if let Some(dir) = Path::new(resolved_path).parent() {
        let dir = dir.to_string_lossy().to_string();
        if !matches!(dir.as_str(), "/usr/bin" | "/bin" | "/usr/local/bin") {
            cmd.push("--ro-bind".to_string());
            cmd.push(dir.clone());
            cmd.push(dir);
        }
    }

    cmd.push("--tmpfs".to_string());
    cmd.push("/tmp".to_string());

    if Path::new(PG_SOCKET_DIR).is_dir() {
        cmd.push("--ro-bind".to_string());
        cmd.push(PG_SOCKET_DIR.to_string());
        cmd.push(PG_SOCKET_DIR.to_string());
    }

    cmd.push(resolved_path.to_string());
    cmd.extend(args.iter().cloned());

    cmd
}

/// True if the `bwrap` binary is reachable on `PATH`. When it isn't, the
/// executor falls back to direct execution with a warning rather than
/// failing every command on a non-Linux or bwrap-less host.
pub fn bwrap_available() -> bool {
    crate::resolve::resolve_tool_path("bwrap", &Default::default()).is_some()
}
