//! Extract or exclude nodes of the JSON documents on stdin.
//!
//! Named sub-paths select the part of each document to keep; `-x` inverts the
//! selection. `-a` gathers the output documents into one array, `-s` unrolls
//! the named array nodes into one document per element.
//!
//! ```text
//! uds-receiver /tmp/gases.uds | node val.NO2 val.NO
//! ```

use std::io::BufRead;
use std::process::ExitCode;

use clap::Parser;
use serde_json::{Map, Value};

use telebridge::pathdict;
use telebridge::report::Reporter;

#[derive(Debug, Parser)]
#[command(
    name = "node",
    version,
    about = "Extract or exclude nodes of the JSON documents on stdin"
)]
struct Args {
    /// Include all sub-paths except the named ones
    #[arg(short = 'x', long = "exclude", conflicts_with = "sequence")]
    exclude: bool,

    /// Output the sequence of input documents as one array
    #[arg(short = 'a', long = "array", conflicts_with = "sequence")]
    array: bool,

    /// Output the contents of the named array nodes as a sequence
    #[arg(short = 's', long = "sequence")]
    sequence: bool,

    /// Report narrative to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Sub-paths to select; none selects the whole document
    #[arg(value_name = "SUB_PATH")]
    sub_paths: Vec<String>,
}

/// The selected portion of a document: every leaf a named sub-path covers,
/// or everything else with `exclude`. Leaves keep their document order.
fn select(datum: &Value, sub_paths: &[String], exclude: bool) -> Value {
    if datum.as_object().is_none() || (sub_paths.is_empty() && !exclude) {
        return datum.clone();
    }

    let mut target = Map::new();

    for path in pathdict::paths(datum) {
        let named = sub_paths
            .iter()
            .any(|sub| pathdict::sub_path_includes(sub, &path));

        if named != exclude {
            if let Some(node) = pathdict::node(datum, &path) {
                pathdict::insert(&mut target, &path, node.clone());
            }
        }
    }

    Value::Object(target)
}

/// The nodes a sequence-mode document unrolls to: each named array node
/// contributes its elements, anything else contributes itself.
fn sequence_nodes<'a>(datum: &'a Value, sub_paths: &[String]) -> Vec<&'a Value> {
    let named: Vec<&Value> = if sub_paths.is_empty() {
        vec![datum]
    } else {
        sub_paths
            .iter()
            .filter_map(|path| pathdict::node(datum, path))
            .collect()
    };

    named
        .into_iter()
        .flat_map(|node| match node {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

fn main() -> ExitCode {
    let args = Args::parse();
    let reporter = Reporter::new("node", args.verbose, false);

    let mut collected: Vec<Value> = Vec::new();
    let mut document_count = 0u64;

    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("node: {e}");
                return ExitCode::FAILURE;
            }
        };

        let Ok(datum) = serde_json::from_str::<Value>(&line) else {
            reporter.diag(&format!("bad datum: {}", line.trim()));
            continue;
        };

        document_count += 1;

        if args.sequence {
            for item in sequence_nodes(&datum, &args.sub_paths) {
                println!("{item}");
            }
            continue;
        }

        let selected = select(&datum, &args.sub_paths, args.exclude);

        if args.array {
            collected.push(selected);
        } else {
            println!("{selected}");
        }
    }

    if args.array {
        println!("{}", Value::Array(collected));
    }

    reporter.diag(&format!("documents: {document_count}"));

    ExitCode::SUCCESS
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn datum() -> Value {
        json!({"rec": "2021-01-01T00:00:00Z", "val": {"NO2": {"cnc": 12.3}, "tmp": 21.5}})
    }

    #[test]
    fn named_sub_paths_select_their_branches() {
        let selected = select(&datum(), &["val.NO2".to_string()], false);
        assert_eq!(
            selected.to_string(),
            r#"{"val":{"NO2":{"cnc":12.3}}}"#
        );
    }

    #[test]
    fn exclude_inverts_the_selection() {
        let selected = select(&datum(), &["val.NO2".to_string()], true);
        assert_eq!(
            selected.to_string(),
            r#"{"rec":"2021-01-01T00:00:00Z","val":{"tmp":21.5}}"#
        );
    }

    #[test]
    fn no_sub_paths_selects_the_whole_document() {
        assert_eq!(select(&datum(), &[], false), datum());
    }

    #[test]
    fn sequence_unrolls_the_named_array_node() {
        let datum = json!({"samples": [{"n": 1}, {"n": 2}], "tag": "x1"});

        let items = sequence_nodes(&datum, &["samples".to_string()]);
        assert_eq!(items, [&json!({"n": 1}), &json!({"n": 2})]);

        // A non-array node passes through as itself.
        let tags = sequence_nodes(&datum, &["tag".to_string()]);
        assert_eq!(tags, [&json!("x1")]);
    }
}
