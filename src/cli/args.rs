//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::domain::{Filters, ALL};

/// Org-chart hierarchy engine: tree layout, visibility filters and viewport fitting
#[derive(Parser, Debug)]
#[command(name = "orgchart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Chart data file (default: from config, else ./orgchart.json)
    #[arg(short = 'f', long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List boards with their head counts
    Boards,

    /// Show a board's reporting hierarchy as tree
    Tree {
        #[command(flatten)]
        board: BoardArg,
        /// Collapse this person's reports (repeatable)
        #[arg(long, value_name = "ID")]
        collapse: Vec<String>,
    },

    /// Run automatic layout on the visible people
    Layout {
        #[command(flatten)]
        board: BoardArg,
        #[command(flatten)]
        filters: FilterArgs,
        /// Write the new positions back to the data file
        #[arg(short, long)]
        write: bool,
    },

    /// List the people that pass the filters
    Visible {
        #[command(flatten)]
        board: BoardArg,
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show a person's managers and all their reports
    Chain {
        #[command(flatten)]
        board: BoardArg,
        /// Person id
        id: String,
    },

    /// Compute zoom and pan that fit the visible people into a viewport
    Fit {
        #[command(flatten)]
        board: BoardArg,
        #[command(flatten)]
        filters: FilterArgs,
        /// Viewport width in pixels
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        /// Viewport height in pixels
        #[arg(long, default_value_t = 720.0)]
        height: f64,
    },

    /// Place a person manually and save
    Move {
        #[command(flatten)]
        board: BoardArg,
        /// Person id
        id: String,
        /// Model x coordinate
        #[arg(allow_negative_numbers = true)]
        x: f64,
        /// Model y coordinate
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Print the filtered, positioned board as JSON
    Export {
        #[command(flatten)]
        board: BoardArg,
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Board selection shared by all chart commands.
#[derive(Args, Debug, Clone)]
pub struct BoardArg {
    /// Board name (default: first board)
    #[arg(short, long)]
    pub board: Option<String>,
}

/// Visibility filter options.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only people in this region
    #[arg(long)]
    pub region: Option<String>,
    /// Only people in this country (needs --region)
    #[arg(long)]
    pub country: Option<String>,
    /// Case-insensitive match on name or title
    #[arg(short, long)]
    pub search: Option<String>,
    /// Only people without an identified successor
    #[arg(long)]
    pub gaps: bool,
    /// Hide everyone below this person (repeatable)
    #[arg(long, value_name = "ID")]
    pub collapse: Vec<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> Filters {
        Filters {
            region: self.region.clone().unwrap_or_else(|| ALL.to_string()),
            country: self.country.clone().unwrap_or_else(|| ALL.to_string()),
            search_text: self.search.clone().unwrap_or_default(),
            succession_gap_only: self.gaps,
            collapsed_ids: self.collapse.iter().cloned().collect(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
