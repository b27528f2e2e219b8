use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use critical_core::ExtractionConfig;
use url::Url;

/// Argument vector for one renderer run:
/// `<renderer> <helper-script> <file-url-of-html> <path-of-css>`.
///
/// Executed directly, never through a shell, so paths reach the renderer
/// byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl RendererCommand {
    /// The renderer tells its inputs apart by form: the page is a `file:` URL,
    /// the stylesheet a bare path.
    pub fn new(config: &ExtractionConfig, html_url: &Url, css_path: &Path) -> Self {
        Self {
            program: config.renderer.clone(),
            args: vec![
                config.helper_script.clone().into_os_string(),
                OsString::from(html_url.as_str()),
                css_path.as_os_str().to_owned(),
            ],
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_tokio(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for RendererCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg:?}")?;
        }
        Ok(())
    }
}
