//! Stem separation backends
//!
//! A backend splits a mixed song into a vocals stem and an accompaniment
//! stem on disk. Backends are configured once and reused for every file.
//!
//! ## Available Backends
//!
//! - **SpleeterSeparator**: runs the `spleeter` command line tool with a
//!   two-stem model

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;
use tracing::{debug, info};

/// File name of the accompaniment stem written by two-stem models
pub const ACCOMPANIMENT_STEM: &str = "accompaniment.wav";
/// File name of the vocals stem written by two-stem models
pub const VOCALS_STEM: &str = "vocals.wav";

/// Errors that can occur during separation
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Separator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Paths of the stems produced for one song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationResult {
    pub vocals_path: PathBuf,
    pub instrumental_path: PathBuf,
}

impl SeparationResult {
    /// Where a two-stem backend puts the stems of `input` under `output_dir`:
    /// `output_dir/<song_base_name>/{vocals,accompaniment}.wav`
    pub fn expected(input: &Path, output_dir: &Path) -> Self {
        let song_dir = output_dir.join(song_base_name(input));
        Self {
            vocals_path: song_dir.join(VOCALS_STEM),
            instrumental_path: song_dir.join(ACCOMPANIMENT_STEM),
        }
    }
}

/// File name without directory or extension
pub fn song_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Trait for vocal separation backends
pub trait StemSeparator {
    /// Split `input` into stems and return where they were written.
    ///
    /// Returned paths are computed, not checked; a missing stem shows up when
    /// it is loaded.
    fn separate(&self, input: &Path) -> Result<SeparationResult, SeparationError>;

    /// Get backend name for logging
    fn name(&self) -> &'static str;
}

/// Backend driving the Spleeter CLI
#[derive(Debug, Clone)]
pub struct SpleeterSeparator {
    program: PathBuf,
    model: String,
    output_dir: PathBuf,
}

impl SpleeterSeparator {
    pub fn new(
        program: impl Into<PathBuf>,
        model: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Command line for one separation run
    fn command(&self, input: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("separate")
            .arg("-p")
            .arg(&self.model)
            .arg("-o")
            .arg(&self.output_dir)
            .arg(input);
        cmd
    }
}

impl StemSeparator for SpleeterSeparator {
    fn separate(&self, input: &Path) -> Result<SeparationResult, SeparationError> {
        info!(
            "Separating {} with {} ({})",
            input.display(),
            self.name(),
            self.model
        );

        let mut child = self
            .command(input)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SeparationError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        // Model download and inference progress arrive on stderr
        let stderr = child.stderr.take();
        let stderr_handle = thread::spawn(move || {
            let mut lines = Vec::new();
            if let Some(stderr) = stderr {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!("[spleeter] {}", line);
                    lines.push(line);
                }
            }
            lines
        });

        let status = child.wait()?;
        let stderr_lines = stderr_handle.join().unwrap_or_default();

        if !status.success() {
            return Err(SeparationError::Failed {
                status: status.to_string(),
                stderr: stderr_lines.join("\n"),
            });
        }

        let result = SeparationResult::expected(input, &self.output_dir);
        info!(
            "Vocals removed. Instrumental saved at: {}",
            result.instrumental_path.display()
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "spleeter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_layout() {
        let result =
            SeparationResult::expected(Path::new("music/My Song.mp3"), Path::new("output"));
        assert_eq!(
            result.instrumental_path,
            PathBuf::from("output/My Song/accompaniment.wav")
        );
        assert_eq!(result.vocals_path, PathBuf::from("output/My Song/vocals.wav"));
    }

    #[test]
    fn test_song_base_name() {
        assert_eq!(song_base_name(Path::new("/a/b/track.v2.flac")), "track.v2");
        assert_eq!(song_base_name(Path::new("plain")), "plain");
    }

    #[test]
    fn test_command_line() {
        let separator = SpleeterSeparator::new("spleeter", "spleeter:2stems", "output");
        let cmd = separator.command(Path::new("song.mp3"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "spleeter");
        assert_eq!(
            args,
            ["separate", "-p", "spleeter:2stems", "-o", "output", "song.mp3"]
        );
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let separator = SpleeterSeparator::new(
            dir.path().join("no-such-separator"),
            "spleeter:2stems",
            dir.path(),
        );
        let result = separator.separate(Path::new("song.mp3"));
        assert!(matches!(result, Err(SeparationError::Launch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_stderr() {
        // `sh separate ...` tries to run a script called "separate" and fails
        let dir = tempfile::tempdir().unwrap();
        let separator = SpleeterSeparator::new("sh", "spleeter:2stems", dir.path());

        match separator.separate(Path::new("song.mp3")) {
            Err(SeparationError::Failed { stderr, .. }) => {
                assert!(stderr.contains("separate"), "stderr: {stderr}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_returns_accompaniment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stems");
        let separator = SpleeterSeparator::new("true", "spleeter:2stems", &out);

        let result = separator.separate(Path::new("songs/song.mp3")).unwrap();
        assert_eq!(
            result.instrumental_path,
            out.join("song").join(ACCOMPANIMENT_STEM)
        );
        assert_eq!(result.vocals_path, out.join("song").join(VOCALS_STEM));
    }
}
