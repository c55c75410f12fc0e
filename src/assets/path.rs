// Path sanitizing module
// Normalizes requested paths before they reach the cache table or the store

use super::AssetError;

/// Normalize a raw request path into a store lookup key.
///
/// Anything containing a parent-directory token is rejected so a request can
/// never escape the asset namespace. At most one leading separator is
/// stripped; the result is used verbatim as the key.
pub fn sanitize(raw: &str) -> Result<&str, AssetError> {
    if raw.contains("..") {
        return Err(AssetError::InvalidPath(raw.to_string()));
    }
    Ok(raw.strip_prefix('/').unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_exactly_one_leading_separator() {
        assert_eq!(sanitize("/index.html"), Ok("index.html"));
        assert_eq!(sanitize("//index.html"), Ok("/index.html"));
    }

    #[test]
    fn passes_plain_names_through() {
        assert_eq!(sanitize("css/styles.css"), Ok("css/styles.css"));
        assert_eq!(sanitize("index.html"), Ok("index.html"));
        assert_eq!(sanitize(""), Ok(""));
    }

    #[test]
    fn rejects_traversal_tokens() {
        assert!(matches!(
            sanitize("../secret"),
            Err(AssetError::InvalidPath(_))
        ));
        assert!(matches!(
            sanitize("/css/../../etc/passwd"),
            Err(AssetError::InvalidPath(_))
        ));
        // Two consecutive dots anywhere are refused, even mid-name
        assert!(matches!(sanitize("a..b"), Err(AssetError::InvalidPath(_))));
    }
}
