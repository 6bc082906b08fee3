use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pst_types::AccountName;

#[derive(Parser)]
#[command(
    name = "pstore",
    about = "PermaStore: named objects of binary chunks, claimed, published and frozen",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the log, registry and settings
    #[arg(long, global = true, default_value = ".pstore")]
    pub data_dir: PathBuf,

    /// Account that signs the call
    #[arg(long = "as", global = true, value_name = "ACCOUNT")]
    pub signer: Option<AccountName>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Claim a new object name
    Create(NameArgs),
    /// Drop every chunk and unpublish
    Reset(NameArgs),
    /// Remove an object and free its name
    Delete(NameArgs),
    /// Mark an object published, or clear the mark
    Publish(PublishArgs),
    /// Make a published object permanent
    Freeze(NameArgs),
    /// Write one chunk
    Write(WriteArgs),
    /// Remove the highest chunk
    Pop(NameArgs),
    /// Show an object and its chunks
    Show(NameArgs),
    /// List every object
    List,
    /// Print or save one chunk
    Chunk(ChunkArgs),
    /// Manage the local name reservation registry
    Bid(BidArgs),
    /// Rewrite the log without superseded entries
    Compact,
    /// Check every object for integrity violations
    Check,
}

#[derive(Args)]
pub struct NameArgs {
    pub name: AccountName,
}

#[derive(Args)]
pub struct PublishArgs {
    pub name: AccountName,
    /// Clear the published mark instead of setting it
    #[arg(long)]
    pub unset: bool,
}

#[derive(Args)]
pub struct WriteArgs {
    pub name: AccountName,
    pub index: u64,
    /// Chunk payload as hex
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read the chunk payload from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ChunkArgs {
    pub name: AccountName,
    pub index: u64,
    /// Write the payload to a file instead of printing it
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct BidArgs {
    #[command(subcommand)]
    pub action: BidAction,
}

#[derive(Subcommand)]
pub enum BidAction {
    /// Record the current high bid for a suffix
    Set {
        suffix: AccountName,
        bidder: AccountName,
        /// Bid amount, zero or more
        #[arg(value_parser = clap::value_parser!(i64).range(0..), allow_negative_numbers = true)]
        amount: i64,
        /// Mark the auction finished
        #[arg(long)]
        closed: bool,
    },
    /// List recorded bids
    List,
}
