// Backing store module
// Read-only named-blob store, sealed into the binary at build time

use hyper::body::Bytes;

/// Read-only mapping from logical path to raw content.
///
/// The cache relies only on this contract; how the bytes got there
/// (compile-time embedding, a test fixture) is the implementation's
/// business. Implementations are never mutated at runtime and need no
/// synchronization.
pub trait AssetStore: Send + Sync {
    /// Read the raw bytes for a logical name, if present.
    fn read(&self, name: &str) -> Option<Bytes>;
}

/// The frontend bundle compiled into the binary.
///
/// Logical names are relative to `assets/` at the repository root.
pub struct EmbeddedStore;

static BUNDLE: &[(&str, &[u8])] = &[
    ("index.html", include_bytes!("../../assets/index.html")),
    ("css/styles.css", include_bytes!("../../assets/css/styles.css")),
    ("js/app.js", include_bytes!("../../assets/js/app.js")),
    ("favicon.svg", include_bytes!("../../assets/favicon.svg")),
];

impl AssetStore for EmbeddedStore {
    fn read(&self, name: &str) -> Option<Bytes> {
        BUNDLE
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, content)| Bytes::from_static(content))
    }
}
