use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::aligner::{Aligner, AlignerError, AlignmentStream, MapMode, MapRequest};
use crate::core::config::AlignerSettings;

/// bowtie2 driven as a child process
#[derive(Debug, Clone)]
pub struct Bowtie2 {
    settings: AlignerSettings,
    threads: usize,
}

impl Bowtie2 {
    pub fn new(settings: AlignerSettings, threads: usize) -> Self {
        Self {
            settings,
            threads: threads.max(1),
        }
    }

    fn tool_name(path: &Path) -> String {
        path.file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
    }

    /// Arguments for one mapping run, without the executable
    pub fn map_args(&self, request: &MapRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-p".into(), self.threads.to_string().into()];

        // Scoring flags shared by every pass
        args.extend(["--local".into(), "-N".into(), self.settings.seed_mismatches.to_string().into()]);

        match request.mode {
            MapMode::Discovery => {
                args.extend(self.alignment_flags());
            }
            MapMode::Isolates { max_alignments } => {
                args.extend(self.alignment_flags());
                args.extend(["-k".into(), max_alignments.to_string().into()]);
            }
            MapMode::Host => {}
        }

        args.push("-x".into());
        args.push(request.index.clone().into_os_string());
        args.push("-U".into());
        args.push(join_paths(&request.reads));

        args
    }

    fn alignment_flags(&self) -> [OsString; 5] {
        [
            "--no-unal".into(),
            "--score-min".into(),
            self.settings.score_min.clone().into(),
            "-L".into(),
            self.settings.seed_length.to_string().into(),
        ]
    }
}

/// Comma-join read paths as bowtie2 expects for `-U`
fn join_paths(paths: &[std::path::PathBuf]) -> OsString {
    let mut joined = OsString::new();
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            joined.push(",");
        }
        joined.push(path.as_os_str());
    }
    joined
}

impl Aligner for Bowtie2 {
    async fn build_index(&self, fasta: &Path, prefix: &Path) -> Result<(), AlignerError> {
        let executable = &self.settings.build_executable;
        let tool = Self::tool_name(executable);

        info!(fasta = %fasta.display(), prefix = %prefix.display(), "Building index with {tool}");

        let output = Command::new(executable)
            .arg("--threads")
            .arg(self.threads.to_string())
            .arg(fasta)
            .arg(prefix)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| AlignerError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            error!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "{tool} failed"
            );
            Err(AlignerError::Process {
                tool,
                status: output.status.code(),
            })
        }
    }

    fn map(&self, request: &MapRequest) -> Result<AlignmentStream, AlignerError> {
        let executable = &self.settings.executable;
        let tool = Self::tool_name(executable);
        let args = self.map_args(request);

        debug!(?args, "Spawning {tool}");

        let child = Command::new(executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AlignerError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        AlignmentStream::from_child(tool, child)
    }
}
