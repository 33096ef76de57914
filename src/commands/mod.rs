mod mii;
mod roblox;

use std::{env, path::Path};

use anyhow::Result;
use clap::Subcommand;
use resolve_path::PathResolveExt;

pub use mii::*;
pub use roblox::*;

use crate::{
    config::Config,
    file_writer::{AssetWriter, WriteMode},
    options::Global,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Downloads renders of a Nintendo Mii, given a Mii Studio code, a
    /// Nintendo Network ID or a Nintendo Account Mii ID.
    Mii(MiiOptions),

    /// Downloads avatar images of a Roblox user, and optionally images of
    /// every item they are wearing.
    Roblox(RobloxOptions),
}

fn load_config(global: &Global) -> Result<Config> {
    let working_dir = env::current_dir()?;
    Ok(Config::load(global.config.as_deref(), &working_dir)?)
}

/// Builds a writer rooted at `--output` if given, otherwise at the
/// directory from the config. `~` is expanded either way.
fn asset_writer(global: &Global, configured_dir: &Path) -> Result<AssetWriter> {
    let output_dir = global.output.as_deref().unwrap_or(configured_dir);
    let output_dir = output_dir.try_resolve()?.into_owned();

    let mode = if global.keep_history {
        WriteMode::KeepHistory
    } else {
        WriteMode::Overwrite
    };

    Ok(AssetWriter::new(output_dir, mode))
}
