use framegrab::error::*;
use framegrab::opts::Opts;
use framegrab::ExtractionRequest;
use slog::{Drain, Logger};
use std::error::Error as _;
use structopt::StructOpt;

fn main() {
    let exit_code = run();

    std::process::exit(exit_code)
}

// This separate method is needed for slog_async to flush properly
fn run() -> i32 {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    let log = slog::Logger::root(drain, slog::o!());

    if let Err(err) = try_run(&log) {
        slog::error!(log, "Encountered error"; "description" => %err);

        let mut cause = err.source();
        while let Some(underlying) = cause {
            slog::error!(log, "Underlying error"; "description" => %underlying);
            cause = underlying.source();
        }

        return 1;
    }

    return 0;
}

fn try_run(log: &Logger) -> Result<()> {
    let request = ExtractionRequest::from(Opts::from_args());

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let output = runtime.block_on(framegrab::extract(log, request))?;

    slog::info!(log, "Extraction complete"; "output" => %output);

    Ok(())
}
