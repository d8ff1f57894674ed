use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "floodwatch")]
#[command(author, version, about = "Ask about floods, pumps, earthquakes and weather", long_about = None)]
pub struct Cli {
    /// Settings file loaded on top of the built-in defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question
    Chat {
        message: String,

        /// Print the tool calls made while answering
        #[arg(short, long)]
        trace: bool,
    },

    /// Start an interactive session (history kept until exit)
    Interactive {
        /// Print the tool calls made while answering
        #[arg(short, long)]
        trace: bool,
    },

    /// List the tools the model can call
    Tools,
}
