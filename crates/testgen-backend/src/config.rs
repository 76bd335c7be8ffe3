use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings shared by every writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestBackendConfiguration {
    /// Prefix of generated test names; the test index is appended.
    pub test_base_name: String,
    /// Stop after this many tests. 0 = unlimited.
    pub max_tests: u64,
    /// Where the caller stores rendered artifacts. Writers never open it.
    pub output_dir: Option<PathBuf>,
    /// Seed the exploration run used, recorded in artifacts for replay.
    pub seed: Option<u64>,
}

impl Default for TestBackendConfiguration {
    fn default() -> Self {
        Self {
            test_base_name: "test".to_string(),
            max_tests: 0,
            output_dir: None,
            seed: None,
        }
    }
}

/// Everything test generation needs from the user, passed explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestgenConfig {
    /// Identifier of the requested writer, e.g. `STF`. `None` when unset.
    pub test_backend: Option<String>,
    pub backend: TestBackendConfiguration,
}

impl TestgenConfig {
    pub fn with_backend(test_backend: &str) -> Self {
        Self {
            test_backend: Some(test_backend.to_string()),
            backend: TestBackendConfiguration::default(),
        }
    }
}
