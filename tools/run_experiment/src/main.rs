use std::{fs::File, io::Write, path::PathBuf, time::Instant};

use clap::Parser;
use copyset_replication::{
    config::{SchemeConfig, Strategy},
    estimate::DataLossEstimate,
    estimator::DataLossEstimator,
};
use env_logger::Builder;
use itertools::Itertools;
use log::error;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct Config {
    node_counts: Vec<usize>,
    #[serde(default)]
    scatter_widths: Vec<usize>,
    scheme: SchemeConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RunResult {
    num_nodes: usize,
    scheme: String,
    scatter_width: Option<usize>,
    estimate: DataLossEstimate,
}

/// Estimates probability of data loss for random and copyset replication over a range of cluster sizes.
#[derive(Parser, Debug)]
struct Args {
    /// Path to config.
    #[arg(short, long)]
    config: PathBuf,

    /// Path to file with results.
    #[arg(short, long)]
    output: PathBuf,

    /// Do not run experiments, just read results from --output.
    #[arg(long)]
    precalculated: bool,

    /// Number of threads, overrides the config.
    #[arg(long)]
    threads: Option<usize>,
}

fn run(config: Config, threads: Option<usize>) -> Vec<RunResult> {
    let mut scheme_config = config.scheme;
    if let Some(threads) = threads {
        scheme_config.threads = threads;
    }

    let strategies = std::iter::once(Strategy::Random)
        .chain(
            config
                .scatter_widths
                .iter()
                .map(|&scatter_width| Strategy::Copyset { scatter_width }),
        )
        .collect::<Vec<_>>();
    let runs = config
        .node_counts
        .into_iter()
        .cartesian_product(strategies)
        .collect::<Vec<_>>();

    let total_runs = runs.len();
    let start_time = Instant::now();
    let mut results = Vec::new();
    for (finished_runs, (num_nodes, strategy)) in runs.into_iter().enumerate() {
        let estimator = match DataLossEstimator::new(scheme_config.clone(), strategy) {
            Ok(estimator) => estimator,
            Err(e) => {
                error!("Skipping {:?}: {}", strategy, e);
                continue;
            }
        };
        match estimator.estimate(num_nodes) {
            Ok(estimate) => results.push(RunResult {
                num_nodes,
                scheme: estimator.scheme().name(),
                scatter_width: strategy.scatter_width(),
                estimate,
            }),
            Err(e) => error!("{} nodes in {}: {}", num_nodes, estimator.scheme().name(), e),
        }

        print!("\r{}", " ".repeat(70));
        print!(
            "\rFinished {}/{} [{}%] runs in {:.2?}",
            finished_runs + 1,
            total_runs,
            ((finished_runs + 1) as f64 * 100. / total_runs as f64).round() as i32,
            start_time.elapsed(),
        );
        std::io::stdout().flush().unwrap();
    }

    print!("\r{}", " ".repeat(70));
    println!("\rFinished {} runs in {:.2?}", total_runs, start_time.elapsed());
    results
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();

    let results: Vec<RunResult> = if args.precalculated {
        serde_json::from_str(&std::fs::read_to_string(args.output).expect("Can't read file with result"))
            .expect("Can't parse file with result")
    } else {
        let config: Config =
            serde_yaml::from_str(&std::fs::read_to_string(args.config).expect("Can't read config file"))
                .expect("Can't parse config file");

        let results = run(config, args.threads);
        File::create(args.output)
            .expect("Can't create output file")
            .write_all(serde_json::to_string_pretty(&results).unwrap().as_bytes())
            .expect("Can't write to output file");
        results
    };

    let width = results
        .iter()
        .map(|x| x.scheme.len())
        .max()
        .unwrap_or(0)
        .max("scheme".len());
    println!(
        "| {: >8} | {: <width$} | probability of data loss | std error | exhausted trials |",
        "nodes",
        "scheme",
        width = width
    );
    println!(
        "|----------|-{:-<width$}-|--------------------------|-----------|------------------|",
        "",
        width = width
    );
    for row in results.iter().sorted_by_key(|row| (row.num_nodes, row.scatter_width)) {
        println!(
            "| {: >8} | {: <width$} | {: >24.6e} | {: >9.2e} | {: >16} |",
            row.num_nodes,
            row.scheme,
            row.estimate.probability,
            row.estimate.standard_error,
            row.estimate.exhausted_trials,
            width = width
        );
    }
}
