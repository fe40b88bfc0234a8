//! Robust extraction of a JSON object from an LLM completion that may be
//! wrapped in prose or markdown fences.

const MAX_JSON_CHARS: usize = 20_000;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("empty LLM response")]
    Empty,
    #[error("no JSON object found in LLM response")]
    NotFound,
    #[error("extracted JSON too large ({0} chars)")]
    TooLarge(usize),
}

/// Locates the first `{` and the last `}` in `raw` and returns the slice
/// between them, inclusive. The caller is responsible for markdown-fence
/// stripping beforehand (see `pgagent_llm::strip_markdown_fence`).
pub fn extract_json(raw: &str) -> Result<String, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    let start = raw.find('{').ok_or(ExtractError::NotFound)?;
    let end = raw.rfind('}').ok_or(ExtractError::NotFound)?;
    if end <= start {
        return Err(ExtractError::NotFound);
    }

    let json_str = &raw[start..=end];
    if json_str.len() > MAX_JSON_CHARS {
        return Err(ExtractError::TooLarge(json_str.len()));
    }

    Ok(json_str.to_string())
}
