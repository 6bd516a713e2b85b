use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use crate::convert::defaults::{ConversionJob, OutputTarget, build_defaults};
use crate::convert::{ConvertError, Converter, frontmatter, register_plugin};

/// Runs the `pandoc` executable with a temporary defaults file.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
}

impl PandocConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    async fn run(&self, job: &ConversionJob) -> Result<String, ConvertError> {
        let source = tokio::fs::read_to_string(&job.input)
            .await
            .map_err(|source| ConvertError::ReadInput {
                path: job.input.clone(),
                source,
            })?;
        let options = frontmatter::pandoc_options(&source)?;
        let defaults = build_defaults(options, job);

        // Removed when dropped, after pandoc has exited.
        let mut defaults_file = tempfile::Builder::new()
            .prefix("pandoc-slides-")
            .suffix(".json")
            .tempfile()
            .map_err(ConvertError::DefaultsFile)?;
        serde_json::to_writer(&mut defaults_file, &defaults)?;
        defaults_file.flush().map_err(ConvertError::DefaultsFile)?;

        log::info!(
            "Converting {} with {}",
            job.input.display(),
            self.program.display()
        );
        let output = tokio::process::Command::new(&self.program)
            .arg("--standalone")
            .arg("-d")
            .arg(defaults_file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        match (&job.output, job.plugin_identifier()) {
            (OutputTarget::Capture, _) if stdout.trim().is_empty() => Err(ConvertError::EmptyOutput),
            (OutputTarget::Capture, Some(plugin)) => Ok(register_plugin(&stdout, plugin)),
            _ => Ok(stdout),
        }
    }
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl Converter for PandocConverter {
    async fn convert(&self, job: &ConversionJob) -> Result<String, ConvertError> {
        self.run(job).await
    }
}
