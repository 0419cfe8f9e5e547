use clap::{Parser, Subcommand};
use parcel_core::config::DEFAULT_MAX_PART_BYTES;
use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "config/config.json";

#[derive(Parser)]
#[command(author, version, about = "parceld: watch folders, deliver new files to Telegram", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the configured folders and deliver until Ctrl-C
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Run a single scan cycle and print its report
    Once {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Validate the config file and print the effective settings
    CheckConfig {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Print the content digest used for dedup
    Hash { file: PathBuf },

    /// Cut a file into numbered parts locally and print reassembly instructions
    Split {
        artifact: PathBuf,

        /// maximum bytes per part
        #[arg(long, default_value_t = DEFAULT_MAX_PART_BYTES)]
        part_size: u64,

        /// directory the parts are written to
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// mention the password in the instructions
        #[arg(long)]
        encrypted: bool,
    },

    /// List delivery history records
    History {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}
