use crate::error::*;
use crate::extract::{ExtractionRequest, OutputPath};
use serde_derive::Deserialize;
use slog::Logger;
use std::cmp;
use std::path::{Path, PathBuf};
use tokio::process::Command;

fn engine_binary(request: &ExtractionRequest) -> PathBuf {
    request
        .ffmpeg_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

fn probe_binary(request: &ExtractionRequest) -> PathBuf {
    match &request.ffmpeg_path {
        Some(path) => path.with_file_name("ffprobe"),
        None => PathBuf::from("ffprobe"),
    }
}

/// Integer output rate for `-r`: truncated toward zero, never below 1.
fn output_rate(fps: f64) -> i64 {
    cmp::max(1, fps as i64)
}

/// Frame stride for the select filter. Clamped to 1 so that asking for more
/// frames than the input holds keeps every frame instead of producing a
/// `mod(n,0)` filter.
fn nth_frame(total_frames: u64, requested: u64) -> u64 {
    cmp::max(1, total_frames / cmp::max(1, requested))
}

/// Filename for the shot at `index` (0-based). A `%i` token in the pattern
/// is replaced with the 1-based index; a multi-shot run without one gets the
/// index inserted before the extension so shots do not overwrite each other.
fn screenshot_filename(pattern: &str, total: usize, index: usize) -> String {
    if pattern.contains("%i") {
        return pattern.replace("%i", &(index + 1).to_string());
    }

    if total <= 1 {
        return pattern.to_string();
    }

    let path = Path::new(pattern);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}_{}.{}",
            stem.to_string_lossy(),
            index + 1,
            ext.to_string_lossy()
        ),
        _ => format!("{}_{}", pattern, index + 1),
    }
}

fn screenshot_args(
    request: &ExtractionRequest,
    output_path: &OutputPath,
    timestamp: f64,
    file_name: &str,
) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    args.extend(request.input_options.iter().cloned());
    args.push("-ss".to_string());
    args.push(timestamp.to_string());
    args.push("-i".to_string());
    args.push(request.input.clone());
    args.extend(request.output_options.iter().cloned());

    if let Some(size) = request.size {
        args.push("-s".to_string());
        args.push(size.to_string());
    }

    args.push("-vframes".to_string());
    args.push("1".to_string());
    args.push(output_path.dir.join(file_name).to_string_lossy().into_owned());

    args
}

fn sampling_args(
    request: &ExtractionRequest,
    output_path: &OutputPath,
    total_frames: Option<u64>,
) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    args.extend(request.input_options.iter().cloned());
    args.push("-i".to_string());
    args.push(request.input.clone());
    args.extend(request.output_options.iter().cloned());

    if let Some(fps) = request.fps {
        args.push("-r".to_string());
        args.push(output_rate(fps).to_string());
    } else if let (Some(requested), Some(total)) = (request.num_frames, total_frames) {
        args.push("-vsync".to_string());
        args.push("vfr".to_string());
        args.push("-vf".to_string());
        args.push(format!("select=not(mod(n\\,{}))", nth_frame(total, requested)));
    }

    if output_path.is_raw() {
        args.push("-pix_fmt".to_string());
        args.push("rgba".to_string());
    }

    args.push(request.output.clone());

    args
}

fn render_command(binary: &Path, args: &[String]) -> String {
    let mut rendered = binary.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

async fn run_engine(log: &Logger, binary: &Path, args: &[String]) -> Result<()> {
    slog::info!(log, "Starting engine"; "cmd" => %render_command(binary, args));

    let output = Command::new(binary)
        .args(args)
        .output()
        .await
        .context("failed to run ffmpeg")?;

    if !output.status.success() {
        slog::error!(
            log, "Engine reported failure";
            "stderr" => %String::from_utf8_lossy(&output.stderr),
            "stdout" => %String::from_utf8_lossy(&output.stdout)
        );
        return Err(Error::engine(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(())
}

pub(super) async fn capture_screenshots(
    log: &Logger,
    request: &ExtractionRequest,
    output_path: &OutputPath,
    timestamps: &[f64],
) -> Result<()> {
    std::fs::create_dir_all(&output_path.dir)
        .context("failed to create screenshot directory")?;

    let binary = engine_binary(request);

    for (index, timestamp) in timestamps.iter().enumerate() {
        let file_name = screenshot_filename(&output_path.file_name, timestamps.len(), index);
        let args = screenshot_args(request, output_path, *timestamp, &file_name);
        run_engine(log, &binary, &args).await?;
    }

    Ok(())
}

pub(super) async fn sample_frames(
    log: &Logger,
    request: &ExtractionRequest,
    output_path: &OutputPath,
) -> Result<()> {
    let total_frames = match request.num_frames {
        Some(_) if request.fps.is_none() => Some(probe_total_frames(log, request).await?),
        _ => None,
    };

    let args = sampling_args(request, output_path, total_frames);
    run_engine(log, &engine_binary(request), &args).await
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

// ffprobe reports nb_frames as a JSON string
#[derive(Debug, Deserialize)]
struct ProbeStream {
    nb_frames: Option<String>,
}

async fn probe_total_frames(log: &Logger, request: &ExtractionRequest) -> Result<u64> {
    let binary = probe_binary(request);
    let args = [
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_streams".to_string(),
        request.input.clone(),
    ];

    slog::info!(log, "Probing input stream"; "cmd" => %render_command(&binary, &args));

    let output = Command::new(&binary)
        .args(&args)
        .output()
        .await
        .context("failed to run ffprobe")?;

    if !output.status.success() {
        slog::error!(
            log, "Probe reported failure";
            "stderr" => %String::from_utf8_lossy(&output.stderr)
        );
        return Err(Error::engine(format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let parsed: ProbeOutput =
        serde_json::from_slice(&output.stdout).context("failed to parse ffprobe output")?;

    parsed
        .streams
        .first()
        .and_then(|stream| stream.nb_frames.as_ref())
        .and_then(|count| count.parse::<u64>().ok())
        .ok_or_else(|| Error::engine("input reports no frame count"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Size;

    fn request(input: &str, output: &str) -> ExtractionRequest {
        ExtractionRequest {
            input: input.to_string(),
            output: output.to_string(),
            ..ExtractionRequest::default()
        }
    }

    fn position(args: &[String], value: &str) -> usize {
        args.iter()
            .position(|arg| arg == value)
            .unwrap_or_else(|| panic!("{:?} not found in {:?}", value, args))
    }

    #[test]
    fn rate_is_truncated_and_floored_at_one() {
        assert_eq!(output_rate(0.5), 1);
        assert_eq!(output_rate(29.97), 29);
        assert_eq!(output_rate(-3.0), 1);
    }

    #[test]
    fn fps_maps_to_rate_argument() {
        let mut req = request("in.mp4", "out.mp4");
        req.fps = Some(0.5);

        let args = sampling_args(&req, &OutputPath::parse(&req.output), None);
        let rate = position(&args, "-r");
        assert_eq!(args[rate + 1], "1");
    }

    #[test]
    fn num_frames_maps_to_select_filter() {
        let mut req = request("in.mp4", "out.mp4");
        req.num_frames = Some(10);

        let args = sampling_args(&req, &OutputPath::parse(&req.output), Some(100));
        let vsync = position(&args, "-vsync");
        assert_eq!(args[vsync + 1], "vfr");
        let filter = position(&args, "-vf");
        assert_eq!(args[filter + 1], "select=not(mod(n\\,10))");
    }

    #[test]
    fn nth_frame_is_clamped_to_one() {
        assert_eq!(nth_frame(100, 10), 10);
        assert_eq!(nth_frame(100, 500), 1);
        assert_eq!(nth_frame(100, 0), 1);
    }

    #[test]
    fn raw_output_forces_rgba_pixel_format() {
        let mut req = request("in.mp4", "frames.raw");
        req.fps = Some(10.0);

        let args = sampling_args(&req, &OutputPath::parse(&req.output), None);
        let pix_fmt = position(&args, "-pix_fmt");
        assert_eq!(args[pix_fmt + 1], "rgba");
    }

    #[test]
    fn passthrough_options_precede_mode_arguments() {
        let mut req = request("in.mp4", "out.mp4");
        req.fps = Some(5.0);
        req.input_options = vec!["-hwaccel".to_string(), "auto".to_string()];
        req.output_options = vec!["-an".to_string()];

        let args = sampling_args(&req, &OutputPath::parse(&req.output), None);
        assert!(position(&args, "-hwaccel") < position(&args, "-i"));
        assert!(position(&args, "-an") < position(&args, "-r"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn screenshot_args_seek_and_capture_one_frame() {
        let mut req = request("in.mp4", "shots/frame.png");
        req.size = Some(Size {
            width: 320,
            height: 240,
        });

        let output_path = OutputPath::parse(&req.output);
        let args = screenshot_args(&req, &output_path, 2.5, "frame.png");

        let seek = position(&args, "-ss");
        assert_eq!(args[seek + 1], "2.5");
        let size = position(&args, "-s");
        assert_eq!(args[size + 1], "320x240");
        let frames = position(&args, "-vframes");
        assert_eq!(args[frames + 1], "1");
        assert_eq!(
            args.last().map(String::as_str),
            Some("shots/frame.png")
        );
    }

    #[test]
    fn filename_pattern_substitutes_index_token() {
        assert_eq!(screenshot_filename("shot-%i.png", 3, 0), "shot-1.png");
        assert_eq!(screenshot_filename("shot-%i.png", 3, 2), "shot-3.png");
    }

    #[test]
    fn multi_shot_filenames_get_an_index_suffix() {
        assert_eq!(screenshot_filename("shot.png", 2, 0), "shot_1.png");
        assert_eq!(screenshot_filename("shot.png", 2, 1), "shot_2.png");
        assert_eq!(screenshot_filename("shot.png", 1, 0), "shot.png");
    }

    #[test]
    fn probe_binary_resolves_next_to_engine_override() {
        let mut req = request("in.mp4", "out.mp4");
        req.ffmpeg_path = Some(PathBuf::from("/opt/media/bin/ffmpeg"));

        assert_eq!(
            probe_binary(&req),
            PathBuf::from("/opt/media/bin/ffprobe")
        );
        assert_eq!(probe_binary(&request("a", "b")), PathBuf::from("ffprobe"));
    }
}
