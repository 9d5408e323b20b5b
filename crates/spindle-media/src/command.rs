//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file paths, each emitted as `-i <path>`
    inputs: Vec<PathBuf>,
    /// Arguments placed before the inputs
    input_args: Vec<String>,
    /// Arguments placed after the inputs
    output_args: Vec<String>,
    /// Output file path
    output: PathBuf,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![input.as_ref().to_path_buf()],
            input_args: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            overwrite: true,
        }
    }

    /// Create a command with no inputs yet; add them with [`Self::input`].
    pub fn with_output(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            overwrite: true,
        }
    }

    /// Add an input file.
    pub fn input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(input.as_ref().to_path_buf());
        self
    }

    /// Add an argument before the inputs.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after the inputs).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set a simple video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set a filter complex graph.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Select an output stream by filter label.
    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    /// Set output quality scale.
    pub fn quality(self, q: u8) -> Self {
        self.output_arg("-q:v").output_arg(q.to_string())
    }

    /// Emit a single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Set the input frame rate (for image-sequence inputs).
    pub fn framerate(self, fps: f64) -> Self {
        self.input_arg("-framerate").input_arg(format!("{fps:.4}"))
    }

    /// Output path of this command.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        // Only errors on stderr; stderr is surfaced when the run fails.
        args.push("-v".to_string());
        args.push("error".to_string());

        args.extend(self.input_args.clone());

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with bounded execution time.
///
/// The timeout is not optional: a hung tool invocation must fail the job
/// rather than stall the worker indefinitely.
pub struct FfmpegRunner {
    timeout: Duration,
}

impl FfmpegRunner {
    /// Create a runner with the given execution timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // wait_with_output consumed the child; kill_on_drop already
                // reaped it when the future was dropped by the timeout.
                let secs = self.timeout.as_secs();
                warn!("FFmpeg timed out after {} seconds, process killed", secs);
                return Err(MediaError::Timeout(secs));
            }
        };

        if output.status.success() {
            if !cmd.output_path().exists() {
                return Err(MediaError::FileNotFound(cmd.output_path().to_path_buf()));
            }
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                output.status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_single_input() {
        let cmd = FfmpegCommand::new("in.png", "out.jpg")
            .video_filter("scale=1080:-2")
            .quality(3)
            .single_frame();

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-i".to_string()));
        assert!(args.contains(&"in.png".to_string()));
        assert!(args.contains(&"-vf".to_string()));
        assert!(args.contains(&"scale=1080:-2".to_string()));
        assert!(args.contains(&"-q:v".to_string()));
        assert_eq!(args.last().unwrap(), "out.jpg");
    }

    #[test]
    fn test_command_builder_multi_input_ordering() {
        let cmd = FfmpegCommand::with_output("grid.jpg")
            .input("a.jpg")
            .input("b.jpg")
            .filter_complex("xstack=inputs=2:layout=0_0|w0_0")
            .map("[out]");

        let args = cmd.build_args();
        let input_positions: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(input_positions.len(), 2);

        let filter_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(input_positions.iter().all(|&p| p < filter_pos));
    }

    #[test]
    fn test_framerate_precedes_inputs() {
        let cmd = FfmpegCommand::new("frame_%03d.jpg", "out.gif").framerate(2.5);
        let args = cmd.build_args();
        let rate_pos = args.iter().position(|a| a == "-framerate").unwrap();
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(rate_pos < input_pos);
    }
}
