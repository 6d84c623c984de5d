use std::io::{self, BufRead};
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};

use randcrack::{CrackError, Cracker, RngType, SolverStatus, Value};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TypeArg {
    #[value(name = "V8")]
    V8,
    #[value(name = "V8_LEGACY")]
    V8Legacy,
    #[value(name = "V8_INT")]
    V8Int,
    #[value(name = "MT19937")]
    Mt19937,
}

impl From<TypeArg> for RngType {
    fn from(arg: TypeArg) -> RngType {
        match arg {
            TypeArg::V8 => RngType::V8,
            TypeArg::V8Legacy => RngType::V8Legacy,
            TypeArg::V8Int => RngType::V8Int,
            TypeArg::Mt19937 => RngType::Mt19937,
        }
    }
}

/// Crack PRNGs and predict future outputs.
///
/// Observed values are read from standard input, one per line (blank lines
/// ignored): floats for V8/V8_LEGACY, integers for V8_INT/MT19937. Once the
/// state is solved, predictions are printed one per line.
#[derive(Debug, Parser)]
#[command(name = "randcrack")]
struct Args {
    /// Type of cracker.
    #[arg(short = 't', long = "type", value_enum)]
    rng_type: TypeArg,

    /// Number of predictions to output.
    #[arg(short, long, default_value_t = 10)]
    predict: u32,

    /// Multiplier for the V8_INT cracker.
    #[arg(short, long)]
    multiplier: Option<u64>,
}

fn parse_value(rng_type: RngType, line: &str) -> Result<Value, CrackError> {
    let invalid = || CrackError::InvalidArgument(format!("unparseable value: {line}"));
    match rng_type {
        RngType::V8 | RngType::V8Legacy => {
            Ok(Value::Double(line.parse().map_err(|_| invalid())?))
        }
        RngType::V8Int | RngType::Mt19937 => Ok(Value::Int(line.parse().map_err(|_| invalid())?)),
    }
}

fn print_help_for_error() {
    let _ = Args::command().print_help();
}

fn run(args: &Args) -> Result<i32> {
    let rng_type = RngType::from(args.rng_type);
    let mut cracker = match Cracker::create(rng_type, args.multiplier) {
        Ok(cracker) => cracker,
        Err(err) => {
            eprintln!("Error: {err}");
            print_help_for_error();
            return Ok(1);
        }
    };

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read standard input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = match parse_value(rng_type, line) {
            Ok(value) => value,
            Err(_) => {
                eprintln!("Invalid input: {line}");
                print_help_for_error();
                return Ok(1);
            }
        };
        match cracker.add_value(value) {
            Ok(()) => {}
            Err(err @ CrackError::NotSolvable) => {
                eprintln!("Error: {err}");
                return Ok(2);
            }
            Err(err) => {
                eprintln!("Error: {err}");
                return Ok(1);
            }
        }
        if matches!(
            cracker.status(),
            SolverStatus::Solved | SolverStatus::SolvedBeforeCacheRefill
        ) {
            break;
        }
    }

    for _ in 0..args.predict {
        match cracker.predict_next() {
            Ok(value) => println!("{value}"),
            Err(err @ CrackError::NotEnoughData) => {
                eprintln!("Error: {err}");
                return Ok(3);
            }
            Err(err) => {
                eprintln!("Error: {err}");
                return Ok(2);
            }
        }
    }
    Ok(0)
}

fn main() {
    let args = Args::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        process::exit(1);
    });
    match run(&args) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_values_by_generator() {
        assert_eq!(
            parse_value(RngType::V8, "0.123").unwrap(),
            Value::Double(0.123)
        );
        assert_eq!(
            parse_value(RngType::Mt19937, "4294967295").unwrap(),
            Value::Int(4294967295)
        );
        assert!(parse_value(RngType::Mt19937, "0.5").is_err());
        assert!(parse_value(RngType::V8, "xyz").is_err());
    }
}
