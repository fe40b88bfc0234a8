//! pgagent-registry — binary discovery, snapshot persistence, and the
//! toolbox help-text introspector.

pub mod discovery;
pub mod snapshot;
pub mod toolbox;

pub use discovery::discover_binaries;
pub use snapshot::{get_binary_path, get_registry, refresh_registry};
pub use toolbox::{help_invocation, parse_help_text, ToolboxBlueprint};
