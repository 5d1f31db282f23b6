//! URL normalization helpers shared by the work queue and progress store.

/// Canonical form of a work-item URL for set membership: surrounding
/// whitespace and trailing slashes stripped. Cosmetic variants of the same
/// profile URL must not cause duplicate processing.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Derive the short name (profile handle) from a profile URL: last path
/// segment with any query suffix removed.
pub fn short_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.split('?').next().unwrap_or(last).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_whitespace_and_trailing_slash() {
        assert_eq!(
            normalize_url("  https://www.instagram.com/someone/ "),
            "https://www.instagram.com/someone"
        );
        assert_eq!(
            normalize_url("https://www.instagram.com/someone"),
            "https://www.instagram.com/someone"
        );
    }

    #[test]
    fn short_name_from_plain_url() {
        assert_eq!(short_name("https://www.instagram.com/someone"), "someone");
    }

    #[test]
    fn short_name_ignores_trailing_slash() {
        assert_eq!(short_name("https://www.instagram.com/someone/"), "someone");
    }

    #[test]
    fn short_name_drops_query_suffix() {
        assert_eq!(
            short_name("https://www.instagram.com/someone?igsh=abc123"),
            "someone"
        );
    }

    #[test]
    fn short_name_of_bare_handle() {
        assert_eq!(short_name("someone"), "someone");
    }
}
