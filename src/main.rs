mod args;
mod refmap;

use clap::Parser;
use env_logger::Env;
use log::{debug, warn};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
    debug!("args: {:?}", args);

    if let Err(e) = refmap::run_referendum(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
