#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Once;

use critical_core::ExtractionConfig;
use tempfile::TempDir;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// `/bin/sh` standing in for the renderer, running `script` as its helper.
///
/// The script sees the html file url as `$1` and the css path as `$2`.
pub struct StubRenderer {
    pub root: TempDir,
    pub artifacts: PathBuf,
    pub config: ExtractionConfig,
}

impl StubRenderer {
    pub fn new(script: &str) -> Self {
        let root = TempDir::new().unwrap();
        let artifacts = root.path().join("artifacts");
        fs::create_dir(&artifacts).unwrap();
        let helper = root.path().join("helper.sh");
        fs::write(&helper, script).unwrap();

        let config = ExtractionConfig {
            renderer: PathBuf::from("/bin/sh"),
            helper_script: helper,
            artifact_dir: Some(artifacts.clone()),
            ..ExtractionConfig::default()
        };
        Self {
            root,
            artifacts,
            config,
        }
    }

    pub fn leftover_artifacts(&self) -> Vec<PathBuf> {
        fs::read_dir(&self.artifacts)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

pub const ECHO_ARGS: &str = "printf '%s\\n' \"$1\" \"$2\"\n";
pub const CAT_INPUTS: &str = "cat \"${1#file://}\" \"$2\"\n";
