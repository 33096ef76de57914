use std::path::PathBuf;

use crate::commands::Command;
use clap::Parser;

#[derive(Debug, Parser)]
#[clap(about = env!("CARGO_PKG_DESCRIPTION"), version)]
pub struct Options {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Parser)]
pub struct Global {
    /// Path to a config file. If not specified, avatar-fetch will look for
    /// 'avatar-fetch.toml' in the current directory.
    #[clap(long, global(true), env("AVATAR_FETCH_CONFIG"))]
    pub config: Option<PathBuf>,

    /// The directory to save images to. Overrides the output directory from
    /// the config file.
    #[clap(long, short, global(true))]
    pub output: Option<PathBuf>,

    /// Keep files from earlier runs whose contents changed, saving the new
    /// version next to them with a numbered suffix instead of replacing them.
    #[clap(long, global(true))]
    pub keep_history: bool,

    /// Sets verbosity level. Can be specified multiple times to increase the verbosity
    /// of this program.
    #[clap(long = "verbose", short, global(true), action(clap::ArgAction::Count))]
    pub verbosity: u8,
}
