mod commands;
mod config;
mod file_writer;
mod frames;
mod http;
mod mii_api;
mod options;
mod pipeline;
mod roblox_api;

#[cfg(test)]
mod test_util;

use std::{env, panic, process};

use anyhow::Result;
use backtrace::Backtrace;
use clap::Parser;
use tokio::signal;

use crate::commands::Command;
use crate::options::Options;

async fn run(options: Options) -> Result<()> {
    match options.command {
        Command::Mii(sub_options) => commands::mii(options.global, sub_options).await,
        Command::Roblox(sub_options) => commands::roblox(options.global, sub_options).await,
    }
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        // The payload is usually a &'static str or String.
        let message = match panic_info.payload().downcast_ref::<&str>() {
            Some(&message) => message.to_string(),
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(message) => message.clone(),
                None => "<no message>".to_string(),
            },
        };

        eprintln!("avatar-fetch crashed!");
        eprintln!("This is a bug in avatar-fetch, not in the service it was talking to.");
        eprintln!();
        eprintln!("If you can reproduce this crash, try adding the -v, -vv, or -vvv flags.");
        eprintln!("This might give you more information to figure out what went wrong!");
        eprintln!();
        eprintln!("Details: {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!("in file {} on line {}", location.file(), location.line());
        }

        // The backtrace crate doesn't look at RUST_BACKTRACE on its own.
        let should_backtrace = env::var("RUST_BACKTRACE")
            .map(|var| var == "1")
            .unwrap_or(false);

        if should_backtrace {
            eprintln!("{:?}", Backtrace::new());
        } else {
            eprintln!(
                "note: run with `RUST_BACKTRACE=1` environment variable to display a backtrace."
            );
        }

        process::exit(1);
    }));
}

fn init_logging(verbosity: u8) {
    let log_filter = match verbosity {
        0 => "info",
        1 => "info,avatar_fetch=debug",
        2 => "info,avatar_fetch=trace",
        _ => "trace",
    };

    let log_env = env_logger::Env::default().default_filter_or(log_filter);

    env_logger::Builder::from_env(log_env)
        .format_module_path(false)
        .format_timestamp(None)
        // Indent following lines equal to the log level label, like `[ERROR] `
        .format_indent(Some(8))
        .init();
}

#[tokio::main]
async fn main() {
    install_panic_hook();

    let options = Options::parse();
    init_logging(options.global.verbosity);

    tokio::select! {
        result = run(options) => {
            if let Err(err) = result {
                log::error!("{err:?}");
                process::exit(1);
            }
        },
        _ = signal::ctrl_c() => {
            log::info!("caught ctrl-c, exiting now");
            process::exit(130);
        }
    }
}
