/// Bundled, read-only content
///
/// - [`questions`]: the practice sheet (topics and their questions)
/// - [`roadmaps`]: the learning-path curriculum
///
/// Both are compiled into the binary from `data/*.json` and parsed once at
/// startup; a parse failure aborts startup rather than serving an empty
/// catalog.

pub mod questions;
pub mod roadmaps;

/// Error type for catalog loading
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Bundled JSON does not match the expected shape
    #[error("Failed to parse {name} catalog: {source}")]
    Parse {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Catalog parsed but violates an invariant
    #[error("Invalid {name} catalog: {reason}")]
    Invalid { name: &'static str, reason: String },
}
