//! Bearer-token authentication shared by every protected endpoint.

/// Constant-time byte comparison so token checks don't leak timing
/// information about how much of the token matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Accepts either a bare token or a `Bearer <token>` header value, matching
/// the shared secret supplied at startup.
pub fn verify_token(expected: &str, header_value: Option<&str>) -> bool {
    let Some(provided) = header_value else { return false };
    let candidate = provided.strip_prefix("Bearer ").unwrap_or(provided);
    constant_time_eq(expected.as_bytes(), candidate.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bearer_prefixed_token() {
        assert!(verify_token("secret", Some("Bearer secret")));
    }

    #[test]
    fn accepts_bare_token() {
        assert!(verify_token("secret", Some("secret")));
    }

    #[test]
    fn rejects_wrong_token() {
        assert!(!verify_token("secret", Some("Bearer wrong")));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(!verify_token("secret", None));
    }
}
