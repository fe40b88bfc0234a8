//! Assembles the single text payload sent to the LLM for plan generation.

use std::collections::BTreeMap;

const HELP_EXCERPT_CHARS: usize = 800;

/// `tools_help` maps a registry tool name to its raw `--help` text.
pub fn build_planner_prompt(
    question: &str,
    mode: &str,
    pg_version: &str,
    registry_names: &[String],
    tools_help: &BTreeMap<String, String>,
    rag_context: &str,
) -> String {
    let mut docs_context = String::new();
    for name in registry_names {
        let help = tools_help.get(name).map(|s| s.as_str()).unwrap_or("No help available");
        let excerpt: String = help.chars().take(HELP_EXCERPT_CHARS).collect();
        docs_context.push_str(&format!("--- LOCAL TOOL: {name} ---\n{excerpt}\n\n"));
    }

    format!(
        "You are a PostgreSQL DBA assistant. You NEVER execute commands yourself.\n\
         You ONLY return a JSON plan that will be validated and executed by a secure agent.\n\n\
         PG_VERSION: {pg_version} | MODE: {mode}\n\n\
         QUESTION: \"{question}\"\n\n\
         OFFICIAL DOCUMENTATION (external retrieval context):\n{rag_context}\n\n\
         LOCAL BINARIES (registry):\n{docs_context}\n\
         You MUST respond with a single JSON object with this schema:\n\
         {{\n\
         \x20 \"goal\": \"short description\",\n\
         \x20 \"mode\": \"readonly | maintenance | change\",\n\
         \x20 \"max_steps\": integer <= 5,\n\
         \x20 \"steps\": [\n\
         \x20   {{\n\
         \x20     \"id\": \"short_id\",\n\
         \x20     \"tool\": \"tool_name\",\n\
         \x20     \"args\": [\"arg1\", \"arg2\"],\n\
         \x20     \"intent\": \"what this step does\",\n\
         \x20     \"on_error\": \"abort or continue\"\n\
         \x20   }}\n\
         \x20 ]\n\
         }}\n\n\
         STRICT RULES:\n\
         1. Use only tools listed under LOCAL BINARIES. If the OFFICIAL DOCUMENTATION describes a tool you don't \
         have locally, return \"goal\": \"MISSING_TOOL: <name> because <reason>\" and empty steps [].\n\
         2. Never propose destructive commands outside of what mode={mode} permits.\n\
         3. If no action is needed, return max_steps=0 and steps=[]."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_question_and_mode() {
        let prompt = build_planner_prompt(
            "is the cluster healthy?",
            "readonly",
            "16.1",
            &["psql".to_string()],
            &BTreeMap::new(),
            "no extra context",
        );
        assert!(prompt.contains("is the cluster healthy?"));
        assert!(prompt.contains("MODE: readonly"));
        assert!(prompt.contains("LOCAL TOOL: psql"));
    }
}
