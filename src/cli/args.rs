//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hierarchical weighted gradebook: exact grade aggregation over an assignment tree
#[derive(Parser, Debug)]
#[command(name = "gradetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Gradebook file (default: `gradebook` from config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the assignment tree, or weight details for a qualified-name prefix
    Show {
        /// Qualified-name prefix, or `all`
        #[arg(default_value = "all")]
        prefix: String,
    },

    /// List students whose alias contains a filter
    Students {
        /// Alias substring, or `all`
        #[arg(default_value = "all")]
        filter: String,
    },

    /// Print a student's grades
    Grades {
        /// Student alias (email local part)
        alias: String,
        /// Only assignments under this qualified-name prefix
        #[arg(short, long, default_value = "all")]
        assignments: String,
        /// Print the grades as an outline
        #[arg(short, long, conflicts_with = "assignments")]
        tree: bool,
    },

    /// Minimum, partial and maximum projection of one grade
    Project {
        alias: String,
        qualified_name: String,
    },

    /// Set a leaf grade (`85%`, `17/20`, `8`, `B+`, `-2`, `None`)
    Set {
        alias: String,
        qualified_name: String,
        #[arg(allow_hyphen_values = true)]
        grade: String,
    },

    /// Add an assignment to the schema and every student
    Add {
        /// Qualified name of the new assignment, e.g. `Course__Homeworks__HW5`
        qualified_name: String,
        /// Weight: `30%`, `3/10` or points
        weight: String,
        /// Count toward the grade without raising the total weight
        #[arg(long)]
        extra_credit: bool,
    },

    /// Swap an assignment with its previous sibling
    MoveUp { qualified_name: String },

    /// Swap an assignment with its next sibling
    MoveDown { qualified_name: String },

    /// Remove an assignment subtree from the schema and every student
    Remove { qualified_name: String },

    /// Validate a gradebook file
    Check,

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

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Show config file locations
    Path,
}
