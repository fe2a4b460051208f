//! Low-pass filter a numeric leaf of the JSON documents on stdin.
//!
//! ```text
//! uds-receiver /tmp/gases.uds | sample-low-pass -d 10 -c 0.01 val.NO2.cnc
//! ```
//!
//! Each output document copies the input's `rec` field and carries the source
//! and filtered values under `PATH.src` and `PATH.lpf`.

use std::io::BufRead;
use std::process::ExitCode;

use clap::Parser;
use serde_json::{json, Map, Value};

use telebridge::filter::LowPassFilter;
use telebridge::pathdict;
use telebridge::report::Reporter;

#[derive(Debug, Parser)]
#[command(
    name = "sample-low-pass",
    version,
    about = "Low-pass filter a numeric leaf of JSON documents on stdin"
)]
struct Args {
    /// Sampling interval in seconds
    #[arg(short = 'd', long = "delta", value_name = "DELTA")]
    delta: f64,

    /// Cut-off frequency in hertz
    #[arg(short = 'c', long = "cut-off", value_name = "CUT_OFF")]
    cut_off: f64,

    /// Decimal places for the filtered value
    #[arg(short = 'p', long = "precision", value_name = "PRECISION", default_value_t = 3)]
    precision: i32,

    /// Report narrative to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Dot-separated path to the numeric leaf
    #[arg(value_name = "PATH")]
    path: String,
}

fn round_to(value: f64, precision: i32) -> f64 {
    let scale = 10f64.powi(precision);
    (value * scale).round() / scale
}

fn main() -> ExitCode {
    let args = Args::parse();
    let reporter = Reporter::new("sample-low-pass", args.verbose, false);

    let mut lpf = match LowPassFilter::construct(args.delta, args.cut_off) {
        Ok(lpf) => lpf,
        Err(e) => {
            eprintln!("sample-low-pass: {e}");
            return ExitCode::from(2);
        }
    };

    reporter.diag(&format!(
        "delta: {} cut-off: {} path: {}",
        args.delta, args.cut_off, args.path
    ));

    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("sample-low-pass: {e}");
                return ExitCode::FAILURE;
            }
        };

        let Ok(datum) = serde_json::from_str::<Value>(&line) else {
            break;
        };

        // A document without the named leaf ends the run.
        let Some(value) = pathdict::leaf_f64(&datum, &args.path) else {
            reporter.diag(&format!("no value at {}: {}", args.path, line.trim()));
            break;
        };

        let filtered = lpf.compute(value);

        let mut target = Map::new();
        if let Some(rec) = pathdict::node(&datum, "rec") {
            target.insert("rec".to_string(), rec.clone());
        }

        pathdict::insert(&mut target, &format!("{}.src", args.path), json!(value));
        pathdict::insert(
            &mut target,
            &format!("{}.lpf", args.path),
            json!(round_to(filtered, args.precision)),
        );

        println!("{}", Value::Object(target));
    }

    ExitCode::SUCCESS
}
