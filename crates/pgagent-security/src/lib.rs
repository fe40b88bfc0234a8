//! pgagent-security — allowlist admission and shell-safety filtering.
//!
//! Every command proposed by the planner or submitted directly through the
//! gateway passes through both checks before it ever reaches the sandboxed
//! executor.

pub mod allowlist;
pub mod safety;

pub use allowlist::{extract_tool_name, Allowlist};

use pgagent_core::Error;

/// Runs both admission checks in order, allowlist first. Returns the first
/// failure encountered.
pub fn admit(allowlist: &Allowlist, command: &str) -> Result<(), Error> {
    allowlist.check(command)?;
    if !safety::is_safe(command) {
        return Err(Error::Unsafe(safety::get_unsafe_reason(command)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn allowlist_with(tools: &[&str]) -> (Allowlist, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("pgagent-security-lib-test-{}.json", std::process::id()));
        let body = serde_json::json!({ "allowed_tools": tools });
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", body).unwrap();
        (Allowlist::new(&path), path)
    }

    #[test]
    fn admit_rejects_disallowed_tool() {
        let (allowlist, path) = allowlist_with(&["psql"]);
        let result = admit(&allowlist, "rm -rf /");
        assert!(matches!(result, Err(Error::NotAllowed(_))));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn admit_rejects_unsafe_allowed_tool() {
        let (allowlist, path) = allowlist_with(&["psql"]);
        let result = admit(&allowlist, "psql -c 'SELECT 1;' ; whoami");
        assert!(matches!(result, Err(Error::Unsafe(_))));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn admit_passes_clean_allowed_command() {
        let (allowlist, path) = allowlist_with(&["psql"]);
        assert!(admit(&allowlist, "psql -c 'SELECT 1;'").is_ok());
        let _ = std::fs::remove_file(path);
    }
}
