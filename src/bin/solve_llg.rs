//! LLG combinatorial auction solver binary.
//!
//! Trains a local bidder against a mirrored local and a truthful global
//! under every core-selecting payment rule in parallel, then scores each
//! learned strategy against the analytic local equilibrium.
//!
//! Usage:
//!   cargo run --release --bin solve_llg -- [OPTIONS]
//!
//! Options:
//!   --gamma <G>          Local correlation strength in [0, 1] (default: 0.5)
//!   --model <NAME>       Correlation model: independent, bernoulli_weights,
//!                        or constant_weights (default: bernoulli_weights)
//!   --batch <N>          Auction instances per evaluation batch (default: 32768)
//!   --epochs <N>         Training epochs per rule (default: 150)
//!   --population <N>     Perturbed candidates per epoch (default: 64)
//!   --seed <N>           Random seed, shared across rules (default: 42)
//!   --output <FILE>      Output file (default: llg_runs.json)

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use auction_solver::experiment::analytic::llg_local_bid;
use auction_solver::experiment::{
    llg, CorrelationModel, EpochRecord, LearnedReport, LearnerConfig, RunCollection, RunOutput,
    SelfPlayLearner,
};
use auction_solver::mechanisms::PaymentRule;
use auction_solver::sim::{LinearBidStrategy, Strategy};
use auction_solver::Result;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut gamma: f64 = 0.5;
    let mut model_name = "bernoulli_weights".to_string();
    let mut batch: usize = 32_768;
    let mut epochs: u64 = 150;
    let mut population: usize = 64;
    let mut seed: u64 = 42;
    let mut output_file = "llg_runs.json".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--gamma" | "-g" => {
                i += 1;
                if i < args.len() {
                    gamma = args[i].parse().unwrap_or(0.5);
                }
            }
            "--model" | "-m" => {
                i += 1;
                if i < args.len() {
                    model_name = args[i].clone();
                }
            }
            "--batch" | "-b" => {
                i += 1;
                if i < args.len() {
                    batch = args[i].parse().unwrap_or(32_768);
                }
            }
            "--epochs" | "-e" => {
                i += 1;
                if i < args.len() {
                    epochs = args[i].parse().unwrap_or(150);
                }
            }
            "--population" => {
                i += 1;
                if i < args.len() {
                    population = args[i].parse().unwrap_or(64);
                }
            }
            "--seed" | "-s" => {
                i += 1;
                if i < args.len() {
                    seed = args[i].parse().unwrap_or(42);
                }
            }
            "--output" | "-o" => {
                i += 1;
                if i < args.len() {
                    output_file = args[i].clone();
                }
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                return;
            }
        }
        i += 1;
    }

    let model = match CorrelationModel::parse(&model_name) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    println!("=== LLG Combinatorial Auction Solver ===");
    println!("Two locals and a global, one learner per payment rule\n");

    println!("Gamma: {:.2}", gamma);
    println!("Correlation model: {}", model.name());
    println!("Batch size: {}", batch);
    println!("Epochs: {} ({} candidates each)", epochs, population);
    println!("Seed: {}", seed);
    println!("Output: {}", output_file);
    println!();

    // First-price has no analytic local equilibrium to compare against.
    let rules = [
        PaymentRule::Vcg,
        PaymentRule::NearestZero,
        PaymentRule::NearestBid,
        PaymentRule::NearestVcg,
    ];
    println!("Solving {} payment rules in parallel...", rules.len());

    let total_start = Instant::now();
    let completed = Arc::new(AtomicUsize::new(0));
    let total_rules = rules.len();

    let results: Result<Vec<RunOutput>> = rules
        .par_iter()
        .map(|&rule| -> Result<RunOutput> {
            let run_start = Instant::now();

            let experiment = llg(rule, gamma, model, batch, seed)?;
            let preset = experiment.preset.clone();

            // The winner overwrites the mirrored local at pool index 0;
            // the truthful global at index 1 keeps its role.
            let config = LearnerConfig::new()
                .with_population_size(population)
                .with_winner_slots(vec![0])
                .with_seed(seed);
            let mut learner = SelfPlayLearner::new(
                experiment.environment,
                LinearBidStrategy::truthful(),
                config,
            )?;

            let stride = (epochs / 50).max(1);
            let mut history: Vec<EpochRecord> = Vec::new();
            learner.train_with_callback(epochs, stride, |stats| {
                history.push(EpochRecord::from_stats(stats));
            })?;

            let stats = learner.stats().clone();
            let learned = learner.strategy();

            // Score both locals against an equilibrium partner in a fresh
            // environment.
            let analytic: Arc<dyn Strategy> = Arc::new(llg_local_bid(rule, gamma)?);
            let mut eval = llg(rule, gamma, model, batch, seed.wrapping_add(1))?;
            eval.environment.replace_strategy(0, Arc::clone(&analytic))?;
            let learned_reward = eval
                .environment
                .get_strategy_reward(Arc::new(learned), true)?;
            let analytic_reward = eval
                .environment
                .get_strategy_reward(Arc::clone(&analytic), true)?;

            let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
            println!(
                "[{}/{}] {:<12} - b(v) = {:.4} + {:.4} v, reward: {:+.5} (eq {:+.5}), time: {:.2}s",
                count,
                total_rules,
                rule.name(),
                learned.intercept,
                learned.slope,
                learned_reward,
                analytic_reward,
                run_start.elapsed().as_secs_f64()
            );

            // Truthful is the unique equilibrium under vcg; the other
            // rules have nonlinear closed forms.
            let (analytic_intercept, analytic_slope) = match rule {
                PaymentRule::Vcg => (Some(0.0), Some(1.0)),
                _ => (None, None),
            };

            Ok(RunOutput::new(
                preset,
                &stats,
                history,
                LearnedReport {
                    intercept: learned.intercept,
                    slope: learned.slope,
                    sampled_utility: learned_reward,
                    analytic_intercept,
                    analytic_slope,
                    analytic_sampled_utility: Some(analytic_reward),
                    analytic_utility: None,
                },
            ))
        })
        .collect();

    let runs = match results {
        Ok(runs) => runs,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    let total_elapsed = total_start.elapsed();

    println!("\n=== Summary ===");
    println!("Total time: {:.2}s", total_elapsed.as_secs_f64());
    println!();
    println!(
        "{:<14} {:>10} {:>10} {:>12} {:>12}",
        "rule", "intercept", "slope", "learned", "equilibrium"
    );
    for run in &runs {
        println!(
            "{:<14} {:>10.4} {:>10.4} {:>12.5} {:>12.5}",
            run.preset.payment_rule,
            run.learned.intercept,
            run.learned.slope,
            run.learned.sampled_utility,
            run.learned.analytic_sampled_utility.unwrap_or(f64::NAN),
        );
    }
    println!();

    println!("Exporting results to {}...", output_file);
    let collection = RunCollection::new(runs);
    match collection.save_json(&output_file) {
        Ok(_) => println!("Results saved successfully!"),
        Err(e) => eprintln!("Error saving results: {}", e),
    }

    println!();
    println!("Done!");
}

fn print_help() {
    println!("LLG Combinatorial Auction Solver");
    println!();
    println!("Usage: solve_llg [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -g, --gamma <G>          Local correlation strength in [0, 1] (default: 0.5)");
    println!("  -m, --model <NAME>       independent, bernoulli_weights, or constant_weights");
    println!("  -b, --batch <N>          Auction instances per batch (default: 32768)");
    println!("  -e, --epochs <N>         Training epochs per rule (default: 150)");
    println!("  --population <N>         Perturbed candidates per epoch (default: 64)");
    println!("  -s, --seed <N>           Random seed, shared across rules (default: 42)");
    println!("  -o, --output <FILE>      Output file (default: llg_runs.json)");
    println!("  -h, --help               Show this help");
    println!();
    println!("Examples:");
    println!("  # Independent locals");
    println!("  solve_llg --gamma 0 --model independent");
    println!();
    println!("  # Strongly correlated locals under the Bernoulli model");
    println!("  solve_llg --gamma 0.9");
    println!();
    println!("  # Fixed convex mix of common and individual values");
    println!("  solve_llg --gamma 0.4 --model constant_weights");
}
