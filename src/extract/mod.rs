mod ffmpeg;

use crate::error::*;
use slog::Logger;
use std::fmt;
use std::path::{Path, PathBuf};

/// Target dimensions for screenshot resizing, rendered as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Declarative description of one extraction run. Presence of `timestamps`
/// or `offsets_ms` selects screenshot mode; otherwise frames are sampled by
/// rate (`fps`) or by total count (`num_frames`).
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    pub input: String,
    pub output: String,
    pub timestamps: Option<Vec<f64>>,
    pub offsets_ms: Option<Vec<u64>>,
    pub fps: Option<f64>,
    pub num_frames: Option<u64>,
    pub size: Option<Size>,
    /// Engine binary override, scoped to this request. The probe binary is
    /// resolved as a sibling `ffprobe`.
    pub ffmpeg_path: Option<PathBuf>,
    /// Extra engine arguments inserted before `-i`.
    pub input_options: Vec<String>,
    /// Extra engine arguments inserted before the mode-specific ones.
    pub output_options: Vec<String>,
}

/// Components of the destination path. Screenshot mode splits it into a
/// folder and a filename pattern; the extension drives raw-output handling.
#[derive(Debug, PartialEq)]
struct OutputPath {
    dir: PathBuf,
    file_name: String,
    extension: Option<String>,
}

impl OutputPath {
    fn parse(output: &str) -> OutputPath {
        let path = Path::new(output);

        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        OutputPath {
            dir,
            file_name,
            extension,
        }
    }

    fn is_raw(&self) -> bool {
        self.extension.as_ref().map(String::as_str) == Some("raw")
    }
}

#[derive(Debug, PartialEq)]
enum Mode {
    Screenshots { timestamps: Vec<f64> },
    Sampling,
}

fn validate(request: &ExtractionRequest) -> Result<()> {
    if request.input.is_empty() {
        return Err(Error::new(ErrorKind::MissingInput, "missing required input"));
    }
    if request.output.is_empty() {
        return Err(Error::new(ErrorKind::MissingOutput, "missing required output"));
    }

    Ok(())
}

/// Explicit second offsets win over millisecond offsets; either selects
/// screenshot mode. A selected screenshot mode with nothing to capture is
/// rejected before any engine interaction.
fn select_mode(request: &ExtractionRequest) -> Result<Mode> {
    let timestamps = match (&request.timestamps, &request.offsets_ms) {
        (Some(seconds), _) => seconds.clone(),
        (None, Some(offsets)) => offsets.iter().map(|ms| *ms as f64 / 1000.0).collect(),
        (None, None) => return Ok(Mode::Sampling),
    };

    if timestamps.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidMode,
            "screenshot mode selected with no usable timestamps",
        ));
    }

    Ok(Mode::Screenshots { timestamps })
}

/// Runs one extraction. Resolves with the request's `output` value once the
/// engine reports success; engine failures are returned unmodified. All
/// validation happens before a child process is spawned.
pub async fn extract(log: &Logger, request: ExtractionRequest) -> Result<String> {
    validate(&request)?;

    let output_path = OutputPath::parse(&request.output);

    match select_mode(&request)? {
        Mode::Screenshots { timestamps } => {
            ffmpeg::capture_screenshots(log, &request, &output_path, &timestamps).await?
        }
        Mode::Sampling => ffmpeg::sample_frames(log, &request, &output_path).await?,
    }

    Ok(request.output)
}
