use serde::{Deserialize, Serialize};

/// Where a slice's reducer is mounted in the state tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mount {
    /// Under its own key of the top-level object, next to other slices.
    #[default]
    Slice,
    /// At the root; the reducer sees the whole tree.
    Root,
}

/// Per-slice settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mount: Mount,
    /// Registering two creators that map to the same type string fails
    /// instead of logging a warning and keeping the later one.
    pub reject_duplicate_types: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mount: Mount::Slice,
            reject_duplicate_types: true,
        }
    }
}
