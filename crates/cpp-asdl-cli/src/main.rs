use std::process::exit;

use clap::Parser;
use log::LevelFilter;

use crate::args::CppAsdlCliArgs;

pub mod args;
pub mod commands;

#[derive(Debug, Clone)]
pub struct Context;

fn main() {
    let args = CppAsdlCliArgs::parse();
    let mut logger = env_logger::Builder::new();
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.parse_default_env().init();

    let mut context = Context;
    match context.execute(args) {
        Ok(()) => exit(0),
        Err(err) => {
            eprintln!("{err:#}");
            exit(1);
        }
    }
}
