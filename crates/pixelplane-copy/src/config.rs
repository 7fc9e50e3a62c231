//! Copy engine configuration.

use pixelplane_core::{BufferError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for [`CopyEngine`](crate::CopyEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Copy the planes of a multi-plane buffer concurrently.
    pub parallel_planes: bool,
    /// Below this many plane bytes the copy stays on the calling thread.
    pub parallel_min_bytes: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            parallel_planes: false,
            parallel_min_bytes: 1024 * 1024,
        }
    }
}

impl CopyConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BufferError::InvalidArgument(format!("copy config: {e}")))
    }

    /// Whether a copy of `planes` planes spanning `total_bytes` should fan out.
    pub fn use_parallel(&self, planes: usize, total_bytes: usize) -> bool {
        self.parallel_planes && planes > 1 && total_bytes >= self.parallel_min_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CopyConfig::default();
        assert!(!config.parallel_planes);
        assert_eq!(config.parallel_min_bytes, 1 << 20);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CopyConfig::from_json(r#"{"parallel_planes": true}"#).unwrap();
        assert!(config.parallel_planes);
        assert_eq!(config.parallel_min_bytes, 1 << 20);

        assert!(matches!(
            CopyConfig::from_json("{not json"),
            Err(BufferError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_use_parallel() {
        let config = CopyConfig {
            parallel_planes: true,
            parallel_min_bytes: 100,
        };
        assert!(config.use_parallel(2, 100));
        assert!(!config.use_parallel(1, 1000));
        assert!(!config.use_parallel(2, 99));
        assert!(!CopyConfig::default().use_parallel(3, usize::MAX));
    }
}
