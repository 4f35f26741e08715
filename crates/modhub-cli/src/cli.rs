use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "modhub",
    about = "modhub module registry: publish pipeline and store maintenance",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Worker config file (TOML). Defaults to $MODHUB_CONFIG.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rebuild every manifest from the store
    Rebuild,
    /// Publish a module archive and process it
    Publish(PublishArgs),
    /// Delete a module or one of its versions
    Delete(DeleteArgs),
    /// Show the published versions of a module
    Versions(VersionsArgs),
    /// Audit private versions in the store
    Private(PrivateArgs),
    /// Write the upload manifest for a module directory
    Manifest(ManifestArgs),
}

#[derive(Args)]
pub struct PublishArgs {
    pub module: String,
    pub version: String,
    /// Zip archive of the module directory
    pub archive: PathBuf,
    /// Upload manifest describing the archive contents
    pub manifest: PathBuf,
    /// Replace the version if it is already published
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub module: String,
    /// Omit to delete every version
    pub version: Option<String>,
}

#[derive(Args)]
pub struct VersionsArgs {
    pub module: String,
}

#[derive(Args)]
pub struct PrivateArgs {
    /// List private versions older than a public latest version instead
    #[arg(long)]
    pub stale: bool,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Module directory to describe
    pub dir: PathBuf,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
