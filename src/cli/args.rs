//! Command line argument parsing for the textquery CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::{Delimiter, OptionsOverride};

/// textquery - match plain text against boolean, fuzzy and field queries
#[derive(Parser, Debug, Clone)]
#[command(name = "textquery")]
#[command(about = "Match plain text against boolean, fuzzy and field-qualified queries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "textquery Contributors")]
#[command(long_about = None)]
pub struct TextQueryArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Query options file (JSON); flags override its values
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Query option flags
    #[command(flatten)]
    pub options: OptionArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TextQueryArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Flags that override the query options.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Literal word delimiter (repeatable)
    #[arg(short = 'd', long = "delimiter", value_name = "TEXT", global = true)]
    pub delimiters: Vec<String>,

    /// Regular expression word delimiter (repeatable)
    #[arg(long = "delimiter-pattern", value_name = "REGEX", global = true)]
    pub delimiter_patterns: Vec<String>,

    /// Match case exactly
    #[arg(long, global = true)]
    pub case_sensitive: bool,

    /// Separator between a field name and its value
    #[arg(long, value_name = "TEXT", global = true)]
    pub attribute_delimiter: Option<String>,

    /// Disable field-qualified terms
    #[arg(long, conflicts_with = "attribute_delimiter", global = true)]
    pub no_attributes: bool,

    /// Treat every term as a regular expression
    #[arg(long, global = true)]
    pub regexp: bool,
}

impl OptionArgs {
    /// Build the override these flags describe.
    pub fn to_override(&self) -> Result<OptionsOverride> {
        let mut overrides = OptionsOverride::new();

        if !self.delimiters.is_empty() || !self.delimiter_patterns.is_empty() {
            let mut delimiters: Vec<Delimiter> =
                self.delimiters.iter().map(Delimiter::literal).collect();
            for pattern in &self.delimiter_patterns {
                delimiters.push(Delimiter::pattern(pattern)?);
            }
            overrides = overrides.delimiters(delimiters);
        }
        if self.case_sensitive {
            overrides = overrides.ignore_case(false);
        }
        if self.no_attributes {
            overrides = overrides.attribute_delimiter(None::<String>);
        } else if let Some(delimiter) = &self.attribute_delimiter {
            overrides = overrides.attribute_delimiter(Some(delimiter));
        }
        if self.regexp {
            overrides = overrides.regexp(true);
        }

        Ok(overrides)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Match a query against texts given on the command line
    Match(MatchArgs),

    /// Print the lines of a file (or stdin) that match a query
    Filter(FilterArgs),

    /// List the literal terms of a query
    Terms(TermsArgs),

    /// Show how a query is parsed and compiled
    Explain(ExplainArgs),
}

/// Arguments for matching texts
#[derive(Parser, Debug, Clone)]
pub struct MatchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Texts to match
    #[arg(value_name = "TEXT", required = true)]
    pub texts: Vec<String>,
}

/// Arguments for filtering lines
#[derive(Parser, Debug, Clone)]
pub struct FilterArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Input file (default: stdin)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Select lines that do not match
    #[arg(long)]
    pub invert: bool,

    /// Print only the number of selected lines
    #[arg(long)]
    pub count: bool,

    /// Evaluate lines in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Include matched fragments for each line
    #[arg(long, conflicts_with = "count")]
    pub fragments: bool,
}

/// Arguments for listing terms
#[derive(Parser, Debug, Clone)]
pub struct TermsArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,
}

/// Arguments for explaining a query
#[derive(Parser, Debug, Clone)]
pub struct ExplainArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
