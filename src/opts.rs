use crate::extract::{ExtractionRequest, Size};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "framegrab",
    about = "Extracts frames or screenshots from a video using an external ffmpeg binary"
)]
pub struct Opts {
    #[structopt(long = "input", short = "i", help = "Source video file")]
    pub input: String,

    #[structopt(
        long = "output",
        short = "o",
        help = "Destination path. In screenshot mode the file name is a \
                pattern; %i is replaced with the shot index"
    )]
    pub output: String,

    #[structopt(
        long = "timestamp",
        help = "Capture a screenshot at this offset, in seconds. May be repeated"
    )]
    pub timestamps: Vec<f64>,

    #[structopt(
        long = "offset",
        help = "Capture a screenshot at this offset, in milliseconds. May be repeated"
    )]
    pub offsets_ms: Vec<u64>,

    #[structopt(long = "fps", help = "Sample frames at this rate")]
    pub fps: Option<f64>,

    #[structopt(
        long = "num-frames",
        help = "Sample this many frames, evenly distributed across the video"
    )]
    pub num_frames: Option<u64>,

    #[structopt(
        long = "size",
        parse(try_from_str = "parse_size"),
        help = "Resize screenshots to WIDTHxHEIGHT, e.g. 320x240"
    )]
    pub size: Option<Size>,

    #[structopt(
        long = "ffmpeg-path",
        parse(from_os_str),
        help = "Path to the ffmpeg binary; ffprobe is expected next to it"
    )]
    pub ffmpeg_path: Option<PathBuf>,

    #[structopt(
        long = "input-option",
        help = "Extra ffmpeg argument inserted before -i. May be repeated"
    )]
    pub input_options: Vec<String>,

    #[structopt(
        long = "output-option",
        help = "Extra ffmpeg argument inserted before the mode arguments. May be repeated"
    )]
    pub output_options: Vec<String>,
}

impl From<Opts> for ExtractionRequest {
    fn from(opts: Opts) -> ExtractionRequest {
        fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
            if values.is_empty() {
                None
            } else {
                Some(values)
            }
        }

        ExtractionRequest {
            input: opts.input,
            output: opts.output,
            timestamps: non_empty(opts.timestamps),
            offsets_ms: non_empty(opts.offsets_ms),
            fps: opts.fps,
            num_frames: opts.num_frames,
            size: opts.size,
            ffmpeg_path: opts.ffmpeg_path,
            input_options: opts.input_options,
            output_options: opts.output_options,
        }
    }
}

fn parse_size(s: &str) -> std::result::Result<Size, String> {
    let mut parts = s.splitn(2, 'x');

    let parse = |part: Option<&str>| {
        part.and_then(|value| value.parse::<u32>().ok())
            .ok_or_else(|| format!("invalid size {:?}, expected WIDTHxHEIGHT", s))
    };

    let width = parse(parts.next())?;
    let height = parse(parts.next())?;

    Ok(Size { width, height })
}
