use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use nexretail_core::View;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Retail ERP dashboard with a voice-ready AI assistant")]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Locale for speech and assistant answers (e.g. id-ID, en-US)
    #[clap(long)]
    pub locale: Option<String>,

    /// Generative model used by the assistant
    #[clap(long)]
    pub model: Option<String>,

    /// Import products from a CSV file at startup
    #[clap(long)]
    pub products: Option<PathBuf>,

    /// Import ledger entries from a CSV file at startup
    #[clap(long)]
    pub transactions: Option<PathBuf>,

    /// Start without the demo inventory and ledger
    #[clap(long)]
    pub empty: bool,

    /// Enable voice input (transcripts are typed at the prompt)
    #[clap(long)]
    pub voice: bool,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive dashboard (default)
    Shell,

    /// Print the context digest the assistant receives
    Summary {
        /// View reported as active
        #[clap(long, value_enum, default_value = "dashboard")]
        view: ViewArg,

        /// Print as JSON instead of text
        #[clap(long)]
        json: bool,
    },

    /// Ask the assistant a single question
    Ask {
        /// The question
        question: String,

        /// View reported as active
        #[clap(long, value_enum, default_value = "dashboard")]
        view: ViewArg,
    },

    /// Predict next month's demand for every product
    Forecast,

    /// Review the ledger for suspicious entries
    Audit,

    /// Write the inventory and ledger to CSV files
    Export {
        /// Directory to write into
        #[clap(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Write the current configuration to the config file
    InitConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ViewArg {
    Dashboard,
    Inventory,
    Financials,
    Sales,
}

impl From<ViewArg> for View {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Dashboard => View::Dashboard,
            ViewArg::Inventory => View::Inventory,
            ViewArg::Financials => View::Financials,
            ViewArg::Sales => View::Sales,
        }
    }
}
