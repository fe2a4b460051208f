//! Group gas-concentration errors by temperature and relative humidity.
//!
//! The utility builds a grid of humidity and temperature bands, then appends
//! each reported / reference pair into the matching cell. When the input is
//! exhausted it reports the grid with humidity rows (`-w`), with temperature
//! rows (`-c`), or as the mean standard deviation over all cells (`-d`).
//!
//! ```text
//! csv-reader joined.csv | sample-rh-t-grid -r 20 95 5 -t 0 30 5 -w -v \
//!     climate.val.hmd climate.val.tmp praxis.val.NO2.cnc ref.NO2
//! ```

use std::io::BufRead;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use serde_json::Value;

use telebridge::grid::ErrorGrid;
use telebridge::pathdict;
use telebridge::report::Reporter;

#[derive(Debug, Parser)]
#[command(
    name = "sample-rh-t-grid",
    version,
    about = "Group gas concentration errors by temperature and relative humidity",
    group = ArgGroup::new("mode").required(true).args(["rh_rows", "rh_cols", "stdev"])
)]
struct Args {
    /// Humidity bounds and step
    #[arg(
        short = 'r',
        long = "rh",
        num_args = 3,
        required = true,
        value_names = ["MIN", "MAX", "STEP"]
    )]
    rh: Vec<f64>,

    /// Temperature bounds and step
    #[arg(
        short = 't',
        long = "temp",
        num_args = 3,
        required = true,
        value_names = ["MIN", "MAX", "STEP"]
    )]
    temp: Vec<f64>,

    /// Report the grid with humidity rows and temperature columns
    #[arg(short = 'w', long = "rh-rows")]
    rh_rows: bool,

    /// Report the grid with temperature rows and humidity columns
    #[arg(short = 'c', long = "rh-cols")]
    rh_cols: bool,

    /// Report only the mean standard deviation over all cells
    #[arg(short = 'd', long = "stdev")]
    stdev: bool,

    /// Report narrative to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Path to the relative humidity value
    #[arg(value_name = "RH_PATH")]
    rh_path: String,

    /// Path to the temperature value
    #[arg(value_name = "T_PATH")]
    t_path: String,

    /// Path to the reported value
    #[arg(value_name = "REPORT_PATH")]
    report_path: String,

    /// Path to the reference value
    #[arg(value_name = "REF_PATH")]
    ref_path: String,
}

#[derive(Debug)]
enum ScanFailure {
    Malformed(String),
    Io(std::io::Error),
}

/// Input-pass result. The counts are valid on every outcome, so the closing
/// summary can always be reported.
#[derive(Debug)]
struct ScanOutcome {
    documents: u64,
    included: u64,
    failure: Option<ScanFailure>,
}

fn scan<R: BufRead>(
    grid: &mut ErrorGrid,
    args: &Args,
    reporter: &Reporter,
    reader: R,
) -> ScanOutcome {
    let mut outcome = ScanOutcome {
        documents: 0,
        included: 0,
        failure: None,
    };

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                outcome.failure = Some(ScanFailure::Io(e));
                return outcome;
            }
        };

        let Ok(datum) = serde_json::from_str::<Value>(&line) else {
            continue;
        };

        outcome.documents += 1;

        // A document with any named value missing or non-numeric ends the run.
        let values = [
            pathdict::leaf_f64(&datum, &args.rh_path),
            pathdict::leaf_f64(&datum, &args.t_path),
            pathdict::leaf_f64(&datum, &args.report_path),
            pathdict::leaf_f64(&datum, &args.ref_path),
        ];

        let [Some(rh), Some(t), Some(report), Some(reference)] = values else {
            outcome.failure = Some(ScanFailure::Malformed(line.trim().to_string()));
            return outcome;
        };

        if !grid.append(rh, t, report, reference) {
            reporter.diag(&format!("rejected: {}", line.trim()));
            continue;
        }

        outcome.included += 1;
    }

    outcome
}

fn main() -> ExitCode {
    let args = Args::parse();
    let reporter = Reporter::new("sample-rh-t-grid", args.verbose, false);

    let mut grid = match ErrorGrid::construct(
        args.rh[0], args.rh[1], args.rh[2], args.temp[0], args.temp[1], args.temp[2],
    ) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("sample-rh-t-grid: {e}");
            return ExitCode::from(2);
        }
    };

    let outcome = scan(&mut grid, &args, &reporter, std::io::stdin().lock());

    // The summary is reported on every exit path.
    let summary = format!(
        "documents: {} included: {}",
        outcome.documents, outcome.included
    );

    match outcome.failure {
        Some(ScanFailure::Malformed(line)) => {
            eprintln!("sample-rh-t-grid: malformed datum: {line}");
            reporter.diag(&summary);
            return ExitCode::FAILURE;
        }
        Some(ScanFailure::Io(e)) => {
            eprintln!("sample-rh-t-grid: {e}");
            reporter.diag(&summary);
            return ExitCode::FAILURE;
        }
        None => {}
    }

    if args.stdev {
        match grid.stdev() {
            Some(stdev) => println!("{stdev}"),
            None => eprintln!("sample-rh-t-grid: no cell has enough samples."),
        }
    } else {
        let rows = if args.rh_rows {
            grid.rows()
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()
        } else {
            grid.t_rows()
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()
        };

        match rows {
            Ok(rows) => {
                for row in rows {
                    println!("{row}");
                }
            }
            Err(e) => {
                eprintln!("sample-rh-t-grid: {e}");
                reporter.diag(&summary);
                return ExitCode::FAILURE;
            }
        }
    }

    reporter.diag(&summary);

    ExitCode::SUCCESS
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn args() -> Args {
        Args {
            rh: vec![20.0, 95.0, 5.0],
            temp: vec![0.0, 30.0, 5.0],
            rh_rows: true,
            rh_cols: false,
            stdev: false,
            verbose: false,
            rh_path: "hmd".to_string(),
            t_path: "tmp".to_string(),
            report_path: "report".to_string(),
            ref_path: "ref".to_string(),
        }
    }

    fn grid() -> ErrorGrid {
        ErrorGrid::construct(20.0, 95.0, 5.0, 0.0, 30.0, 5.0).unwrap()
    }

    #[test]
    fn scan_counts_every_document() {
        let input = "\
{\"hmd\": 52.0, \"tmp\": 12.0, \"report\": 10.0, \"ref\": 9.0}
not json
{\"hmd\": 53.0, \"tmp\": 13.0, \"report\": 12.0, \"ref\": 9.0}
";
        let args = args();
        let reporter = Reporter::new("test", false, false);

        let outcome = scan(&mut grid(), &args, &reporter, Cursor::new(input));

        assert_eq!(outcome.documents, 2);
        assert_eq!(outcome.included, 2);
        assert!(outcome.failure.is_none());
    }

    #[test]
    fn malformed_datum_ends_the_run_with_the_counts_intact() {
        let input = "\
{\"hmd\": 52.0, \"tmp\": 12.0, \"report\": 10.0, \"ref\": 9.0}
{\"hmd\": 53.0, \"tmp\": 13.0, \"report\": \"n/a\", \"ref\": 9.0}
{\"hmd\": 54.0, \"tmp\": 14.0, \"report\": 11.0, \"ref\": 9.0}
";
        let args = args();
        let reporter = Reporter::new("test", false, false);

        let outcome = scan(&mut grid(), &args, &reporter, Cursor::new(input));

        // The counts survive the early exit for the closing summary.
        assert_eq!(outcome.documents, 2);
        assert_eq!(outcome.included, 1);
        assert!(matches!(outcome.failure, Some(ScanFailure::Malformed(_))));
    }

    #[test]
    fn out_of_bounds_documents_are_rejected_not_fatal() {
        let input = "{\"hmd\": 10.0, \"tmp\": 12.0, \"report\": 10.0, \"ref\": 9.0}\n";
        let args = args();
        let reporter = Reporter::new("test", false, false);

        let outcome = scan(&mut grid(), &args, &reporter, Cursor::new(input));

        assert_eq!(outcome.documents, 1);
        assert_eq!(outcome.included, 0);
        assert!(outcome.failure.is_none());
    }
}
