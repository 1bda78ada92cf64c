//! Developer utility that writes a seeded synthetic gastrectomy cohort.

use std::path::PathBuf;

use riskfold::dataset::save_patients;
use riskfold::dataset::synthetic::{
    CohortOptions, DEFAULT_COHORT_SEED, DEFAULT_COHORT_SIZE, cohort_stats, generate_cohort,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if wants_help(&args) {
        println!("{}", help_text());
        return Ok(());
    }
    let (out, options) = parse_args(args)?;
    let records = generate_cohort(options).map_err(|err| err.to_string())?;
    save_patients(&out, &records).map_err(|err| err.to_string())?;

    let stats = cohort_stats(&records);
    println!("Wrote {} patients to {}", stats.total, out.display());
    println!("mean age:          {:.1}", stats.mean_age);
    println!("complication rate: {:.1}%", stats.complication_rate * 100.0);
    println!("laparoscopic:      {:.1}%", stats.laparoscopic_rate * 100.0);
    println!("deceased:          {:.1}%", stats.deceased_rate * 100.0);
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<(PathBuf, CohortOptions), String> {
    let mut out = PathBuf::from("synthetic_patients.json");
    let mut options = CohortOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = PathBuf::from(value);
            }
            "--count" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--count requires a value".to_string())?;
                options.count = value
                    .parse::<usize>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| format!("Invalid --count value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok((out, options))
}

/// Help goes to stdout and exits cleanly, unlike argument errors.
fn wants_help(args: &[String]) -> bool {
    args.iter().any(|arg| arg == "-h" || arg == "--help")
}

fn help_text() -> String {
    format!(
        "riskfold-synth\n\n\
Generate a synthetic patient cohort for cross-validation runs.\n\n\
Usage:\n  riskfold-synth [--out <path>] [--count <n>] [--seed <n>]\n\n\
Defaults: --out synthetic_patients.json --count {DEFAULT_COHORT_SIZE} --seed {DEFAULT_COHORT_SEED}"
    )
}
