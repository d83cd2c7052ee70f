//! 程序运行函数.

use crate::args::Cli;
use crate::result::describe_into;
use log::{error, info, warn};
use petct_berry::Pipeline;
use std::process::ExitCode;

/// 实际运行.
pub fn run(cli: &Cli) -> ExitCode {
    if let Err(e) = simple_logger::init_with_level(cli.log_level()) {
        eprintln!("Logger initialization error: {e}");
    }

    let pipeline = match cli.to_config().and_then(Pipeline::new) {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let c = pipeline.config();
    info!(
        "Cutting `{}` into {}^3 cubes with stride {} on {} cores...",
        c.source_x.display(),
        c.block_size,
        c.stride,
        utils::cpus()
    );

    let report = match pipeline.run() {
        Ok(r) => r,
        Err(e) => {
            error!("Preprocessing aborted: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut buf = Vec::with_capacity(512);
    match describe_into(&report, &mut buf) {
        Ok(()) => print!("{}", String::from_utf8_lossy(&buf)),
        Err(e) => warn!("Cannot render report: {e}"),
    }
    if report.failure_count() > 0 {
        warn!("{} subject(s) skipped", report.failure_count());
    }
    ExitCode::SUCCESS
}
