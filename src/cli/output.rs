//! Output formatting for CLI commands.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, TextQueryArgs};
use crate::error::Result;
use crate::query::{Fragment, QueryNode};

/// A command result that can also be written for humans.
pub trait CommandOutput: Serialize {
    /// Write the human-readable form.
    fn write_human(&self, out: &mut dyn Write, args: &TextQueryArgs) -> Result<()>;
}

/// Result of matching one text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMatch {
    pub text: String,
    pub matched: bool,
}

/// Result structure for the match command.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResults {
    pub query: String,
    pub results: Vec<TextMatch>,
}

/// One selected line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredLine {
    pub line_number: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fragments: Vec<Fragment>,
}

/// Result structure for the filter command.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterResults {
    pub query: String,
    pub total_lines: usize,
    pub selected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<FilteredLine>>,
    pub duration_ms: u64,
}

/// Result structure for the terms command.
#[derive(Debug, Serialize, Deserialize)]
pub struct TermsResult {
    pub query: String,
    pub terms: Vec<String>,
}

/// Compiled form of one leaf term.
#[derive(Debug, Serialize, Deserialize)]
pub struct LeafPattern {
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result structure for the explain command.
#[derive(Debug, Serialize, Deserialize)]
pub struct Explanation {
    pub query: String,
    pub delimiter: String,
    pub ignore_case: bool,
    pub ast: QueryNode,
    pub leaves: Vec<LeafPattern>,
}

/// Output a result in the specified format.
pub fn output_result<T: CommandOutput>(result: &T, args: &TextQueryArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            result.write_human(&mut out, args)?;
            out.flush()?;
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &TextQueryArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

impl CommandOutput for MatchResults {
    fn write_human(&self, out: &mut dyn Write, args: &TextQueryArgs) -> Result<()> {
        if args.verbosity() > 1 {
            writeln!(out, "Query: {}", self.query)?;
        }
        for result in &self.results {
            let marker = if result.matched { "match" } else { "no match" };
            writeln!(out, "{marker}\t{}", result.text)?;
        }
        Ok(())
    }
}

impl CommandOutput for FilterResults {
    fn write_human(&self, out: &mut dyn Write, args: &TextQueryArgs) -> Result<()> {
        let Some(lines) = &self.lines else {
            writeln!(out, "{}", self.selected)?;
            return Ok(());
        };

        for line in lines {
            if args.verbosity() > 1 {
                writeln!(out, "{}:{}", line.line_number, line.text)?;
            } else {
                writeln!(out, "{}", line.text)?;
            }
            for fragment in &line.fragments {
                writeln!(
                    out,
                    "    {}..{} {} ({})",
                    fragment.start, fragment.end, fragment.text, fragment.term
                )?;
            }
        }

        if args.verbosity() > 1 {
            writeln!(
                out,
                "Selected {} of {} lines in {}ms",
                self.selected, self.total_lines, self.duration_ms
            )?;
        }
        Ok(())
    }
}

impl CommandOutput for TermsResult {
    fn write_human(&self, out: &mut dyn Write, _args: &TextQueryArgs) -> Result<()> {
        for term in &self.terms {
            writeln!(out, "{term}")?;
        }
        Ok(())
    }
}

impl CommandOutput for Explanation {
    fn write_human(&self, out: &mut dyn Write, _args: &TextQueryArgs) -> Result<()> {
        writeln!(out, "Query:       {}", self.query)?;
        writeln!(out, "Delimiter:   {}", self.delimiter)?;
        writeln!(out, "Ignore case: {}", self.ignore_case)?;
        writeln!(out)?;

        writeln!(out, "Tree:")?;
        write_tree(out, &self.ast, 1)?;
        writeln!(out)?;

        writeln!(out, "Terms:")?;
        for leaf in &self.leaves {
            match (&leaf.pattern, &leaf.error) {
                (Some(pattern), _) => writeln!(out, "  {:<20} {pattern}", leaf.term)?,
                (None, Some(error)) => writeln!(out, "  {:<20} error: {error}", leaf.term)?,
                (None, None) => writeln!(out, "  {}", leaf.term)?,
            }
        }
        Ok(())
    }
}

/// Write an indented outline of a query tree.
fn write_tree(out: &mut dyn Write, node: &QueryNode, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    match node {
        QueryNode::Word(word) if word.pattern_literal => {
            writeln!(out, "{indent}Pattern {}", word.text)
        }
        QueryNode::Word(word) => writeln!(out, "{indent}Word {}", word.text),
        QueryNode::Phrase(phrase) => writeln!(out, "{indent}Phrase \"{}\"", phrase.text),
        QueryNode::Field(field) => {
            writeln!(out, "{indent}Field {}", field.field)?;
            write_tree(out, &field.inner, depth + 1)
        }
        QueryNode::Not { child } => {
            writeln!(out, "{indent}Not")?;
            write_tree(out, child, depth + 1)
        }
        QueryNode::Group { child } => {
            writeln!(out, "{indent}Group")?;
            write_tree(out, child, depth + 1)
        }
        QueryNode::And { children } | QueryNode::Or { children } => {
            let name = if matches!(node, QueryNode::And { .. }) { "And" } else { "Or" };
            writeln!(out, "{indent}{name}")?;
            for child in children {
                write_tree(out, child, depth + 1)?;
            }
            Ok(())
        }
    }
}
