//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on the file name suffix.

/// Get the MIME Content-Type for an asset name.
///
/// Matching is on the lowercase suffix only; unknown and uppercase suffixes
/// fall back to `application/octet-stream`.
pub fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, suffix)| suffix) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
