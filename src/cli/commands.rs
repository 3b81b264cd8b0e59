//! Command implementations for the textquery CLI.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info};
use rayon::prelude::*;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::query::{QueryOptions, TextQuery, VisitKind};

/// Execute a CLI command.
///
/// Returns whether the command selected anything, which decides the exit
/// status of `match` and `filter`.
pub fn execute_command(args: TextQueryArgs) -> Result<bool> {
    match &args.command {
        Command::Match(match_args) => match_texts(match_args, &args),
        Command::Filter(filter_args) => filter_lines(filter_args, &args),
        Command::Terms(terms_args) => list_terms(terms_args, &args).map(|_| true),
        Command::Explain(explain_args) => explain_query(explain_args, &args).map(|_| true),
    }
}

/// Load the options file, if any, and apply the flag overrides.
pub fn load_options(args: &TextQueryArgs) -> Result<QueryOptions> {
    let options = match &args.config {
        Some(path) => load_options_file(path)?,
        None => QueryOptions::default(),
    };
    Ok(options.merge(&args.options.to_override()?))
}

fn load_options_file(path: &Path) -> Result<QueryOptions> {
    debug!("Loading options from: {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let options = serde_json::from_str(&content)?;
    Ok(options)
}

/// Parse a query with the options the arguments describe.
fn build_query(query: &str, args: &TextQueryArgs) -> Result<TextQuery> {
    let options = load_options(args)?;
    debug!("Query options: {options:?}");

    let mut text_query = TextQuery::new(options)?;
    text_query.parse(query)?;
    info!("Parsed query: {}", display_root(&text_query));
    Ok(text_query)
}

fn display_root(query: &TextQuery) -> String {
    query.root().map(ToString::to_string).unwrap_or_default()
}

/// Match a query against each text argument.
fn match_texts(args: &MatchArgs, cli_args: &TextQueryArgs) -> Result<bool> {
    let query = build_query(&args.query, cli_args)?;

    let results = args
        .texts
        .iter()
        .map(|text| {
            Ok(TextMatch {
                text: text.clone(),
                matched: query.eval(text)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let any_matched = results.iter().any(|result| result.matched);

    output_result(
        &MatchResults {
            query: display_root(&query),
            results,
        },
        cli_args,
    )?;

    Ok(any_matched)
}

/// Print the lines of a file, or stdin, selected by a query.
fn filter_lines(args: &FilterArgs, cli_args: &TextQueryArgs) -> Result<bool> {
    let query = build_query(&args.query, cli_args)?;
    let input = read_input(args.file.as_deref())?;
    let lines: Vec<&str> = input.lines().collect();

    let start_time = Instant::now();
    let selected = if args.parallel {
        info!("Filtering {} lines in parallel", lines.len());
        lines
            .par_iter()
            .enumerate()
            .map(|(i, line)| select_line(&query, i, line, args))
            .collect::<Result<Vec<_>>>()?
    } else {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| select_line(&query, i, line, args))
            .collect::<Result<Vec<_>>>()?
    };
    let selected: Vec<FilteredLine> = selected.into_iter().flatten().collect();
    let duration = start_time.elapsed();

    debug!("Pattern cache: {:?}", query.cache().stats());

    let count = selected.len();
    output_result(
        &FilterResults {
            query: display_root(&query),
            total_lines: lines.len(),
            selected: count,
            lines: if args.count { None } else { Some(selected) },
            duration_ms: duration.as_millis() as u64,
        },
        cli_args,
    )?;

    Ok(count > 0)
}

fn select_line(
    query: &TextQuery,
    index: usize,
    line: &str,
    args: &FilterArgs,
) -> Result<Option<FilteredLine>> {
    let matched = query.eval(line)?;
    if matched == args.invert {
        return Ok(None);
    }

    let fragments = if args.fragments && matched {
        query.fragments(line)?
    } else {
        Vec::new()
    };

    Ok(Some(FilteredLine {
        line_number: index + 1,
        text: line.to_string(),
        fragments,
    }))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            info!("Reading input from: {}", path.display());
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {}", path.display()))?;
            Ok(content)
        }
        None => {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
    }
}

/// List the literal terms of a query.
fn list_terms(args: &TermsArgs, cli_args: &TextQueryArgs) -> Result<()> {
    let query = build_query(&args.query, cli_args)?;

    let mut terms = Vec::new();
    query.accept(&mut |_: VisitKind, payload: &str| terms.push(payload.to_string()))?;

    output_result(
        &TermsResult {
            query: display_root(&query),
            terms,
        },
        cli_args,
    )
}

/// Show the parsed tree and the compiled pattern of every leaf.
fn explain_query(args: &ExplainArgs, cli_args: &TextQueryArgs) -> Result<()> {
    let query = build_query(&args.query, cli_args)?;

    let leaves = query
        .compile_terms()?
        .into_iter()
        .map(|(leaf, compiled)| match compiled {
            Ok(compiled) => LeafPattern {
                term: leaf.to_string(),
                pattern: Some(compiled.pattern().to_string()),
                error: None,
            },
            Err(e) => LeafPattern {
                term: leaf.to_string(),
                pattern: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let Some(ast) = query.root().cloned() else {
        return Ok(());
    };

    output_result(
        &Explanation {
            query: ast.to_string(),
            delimiter: query.delimiter_fragment().to_string(),
            ignore_case: query.options().ignore_case,
            ast,
            leaves,
        },
        cli_args,
    )
}
