use std::env;
use std::path::PathBuf;

mod app;
mod audio;
mod config;
mod library;
mod logging;
mod mpris;
mod navigator;
mod resolver;
mod runtime;
mod transport;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: a catalog file to use instead of the configured one.
    let catalog = env::args_os().nth(1).map(PathBuf::from);
    runtime::run(catalog)
}
