//! Parses `<tool> --help` output into a structured blueprint the planner can
//! reason about, as a richer substitute for a bare version string.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(-\w,?\s+--[\w-]+|--[\w-]+)\s+(.*)").unwrap());

static COMMAND_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+([\w-]+)\s{2,}(.*)").unwrap());

#[derive(Clone, Debug, Serialize)]
pub struct OptionEntry {
    pub flag: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommandEntry {
    pub command: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolboxBlueprint {
    pub tool: String,
    pub subcommand: Option<String>,
    pub usage: String,
    pub options: Vec<OptionEntry>,
    pub available_commands: Vec<CommandEntry>,
}

/// Builds the `<tool> [sub] --help` invocation string; the caller runs it
/// through the sandbox executor and passes the captured stdout here.
pub fn help_invocation(tool: &str, subcommand: Option<&str>) -> String {
    match subcommand {
        Some(sub) => format!("{tool} {sub} --help"),
        None => format!("{tool} --help"),
    }
}

/// Parses raw `--help` stdout into a structured blueprint. Uses two
/// line-shaped patterns plus a state bit for "inside a `Commands:` section".
pub fn parse_help_text(text: &str, tool: &str, subcommand: Option<&str>) -> ToolboxBlueprint {
    let mut blueprint = ToolboxBlueprint {
        tool: tool.to_string(),
        subcommand: subcommand.map(|s| s.to_string()),
        usage: String::new(),
        options: Vec::new(),
        available_commands: Vec::new(),
    };

    let mut in_command_section = false;

    for line in text.lines() {
        if blueprint.usage.is_empty() && line.contains("Usage:") {
            blueprint.usage = line.trim().to_string();
        }

        if line.contains("Commands:") || line.contains("Available Commands:") {
            in_command_section = true;
            continue;
        }

        if let Some(caps) = OPTION_LINE.captures(line) {
            blueprint.options.push(OptionEntry {
                flag: caps[1].trim().to_string(),
                description: caps[2].trim().to_string(),
            });
            continue;
        }

        if in_command_section {
            if let Some(caps) = COMMAND_LINE.captures(line) {
                blueprint.available_commands.push(CommandEntry {
                    command: caps[1].trim().to_string(),
                    description: caps[2].trim().to_string(),
                });
            }
        }
    }

    blueprint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_invocation_with_and_without_subcommand() {
        assert_eq!(help_invocation("patronictl", None), "patronictl --help");
        assert_eq!(help_invocation("patronictl", Some("list")), "patronictl list --help");
    }

    #[test]
    fn parses_usage_options_and_commands() {
        let text = "\
Usage: patronictl [OPTIONS] COMMAND [ARGS]...

Options:
  -c, --config-file TEXT  Patroni configuration file
  --help                  Show this message and exit.

Commands:
  list    List members of a cluster
  pause   Disable auto failover
";
        let bp = parse_help_text(text, "patronictl", None);
        assert_eq!(bp.usage, "Usage: patronictl [OPTIONS] COMMAND [ARGS]...");
        assert!(bp.options.iter().any(|o| o.flag.contains("--config-file")));
        assert_eq!(bp.available_commands.len(), 2);
        assert_eq!(bp.available_commands[0].command, "list");
        assert_eq!(bp.available_commands[0].description, "List members of a cluster");
    }

    #[test]
    fn no_commands_section_leaves_available_commands_empty() {
        let text = "Usage: psql [OPTION]...\n\nGeneral options:\n  -c, --command=COMMAND   run only single command\n";
        let bp = parse_help_text(text, "psql", None);
        assert!(bp.available_commands.is_empty());
        assert_eq!(bp.options.len(), 1);
    }
}
