//! Symmetric single-item auction solver binary.
//!
//! Trains a linear bid strategy by perturbation search in self-play, then
//! scores the learned strategy against the analytic equilibrium in a fresh
//! evaluation environment.
//!
//! Usage:
//!   cargo run --release --bin solve_single_item -- [OPTIONS]
//!
//! Options:
//!   --rule <NAME>        Payment rule: first_price or second_price (default: first_price)
//!   --prior <NAME>       Valuation prior: uniform or gaussian (default: uniform)
//!   --players <N>        Number of bidders (default: 2)
//!   --batch <N>          Auction instances per evaluation batch (default: 65536)
//!   --epochs <N>         Training epochs (default: 200)
//!   --population <N>     Perturbed candidates per epoch (default: 64)
//!   --risk <R>           Risk attitude exponent, uniform prior only (default: 1.0)
//!   --seed <N>           Random seed (default: 42)
//!   --output <FILE>      Output file (default: single_item_run.json)

use std::env;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use auction_solver::experiment::analytic::{
    fpsb_gaussian_strategy, fpsb_uniform_bid, fpsb_uniform_utility, vickrey_uniform_utility,
};
use auction_solver::experiment::{
    single_item_gaussian_symmetric, single_item_uniform_symmetric, EpochRecord, Experiment,
    LearnedReport, LearnerConfig, RunOutput, SelfPlayLearner, SingleItemRule,
};
use auction_solver::sim::{LinearBidStrategy, Strategy};
use auction_solver::Result;

// Canonical priors of the studied settings.
const U_LO: f64 = 0.0;
const U_HI: f64 = 1.0;
const GAUSSIAN_MEAN: f64 = 15.0;
const GAUSSIAN_STDDEV: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriorKind {
    Uniform,
    Gaussian,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut rule_name = "first_price".to_string();
    let mut prior_name = "uniform".to_string();
    let mut players: usize = 2;
    let mut batch: usize = 65_536;
    let mut epochs: u64 = 200;
    let mut population: usize = 64;
    let mut risk: f64 = 1.0;
    let mut seed: u64 = 42;
    let mut output_file = "single_item_run.json".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rule" | "-r" => {
                i += 1;
                if i < args.len() {
                    rule_name = args[i].clone();
                }
            }
            "--prior" | "-p" => {
                i += 1;
                if i < args.len() {
                    prior_name = args[i].clone();
                }
            }
            "--players" | "-n" => {
                i += 1;
                if i < args.len() {
                    players = args[i].parse().unwrap_or(2);
                }
            }
            "--batch" | "-b" => {
                i += 1;
                if i < args.len() {
                    batch = args[i].parse().unwrap_or(65_536);
                }
            }
            "--epochs" | "-e" => {
                i += 1;
                if i < args.len() {
                    epochs = args[i].parse().unwrap_or(200);
                }
            }
            "--population" => {
                i += 1;
                if i < args.len() {
                    population = args[i].parse().unwrap_or(64);
                }
            }
            "--risk" => {
                i += 1;
                if i < args.len() {
                    risk = args[i].parse().unwrap_or(1.0);
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

    println!("=================================================");
    println!("  Single-Item Auction Solver");
    println!("=================================================");
    println!();

    let rule = match SingleItemRule::parse(&rule_name) {
        Ok(rule) => rule,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    let prior = match prior_name.as_str() {
        "uniform" => PriorKind::Uniform,
        "gaussian" => PriorKind::Gaussian,
        other => {
            eprintln!("Unknown prior: {}", other);
            print_help();
            return;
        }
    };
    if !risk.is_finite() || risk <= 0.0 {
        eprintln!("Risk must be positive, got {}", risk);
        return;
    }

    let experiment = match build_experiment(rule, prior, players, batch, risk, seed) {
        Ok(experiment) => experiment,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    let preset = experiment.preset.clone();

    println!("Setting: {}", preset.name);
    println!("Players: {}", players);
    println!("Batch size: {}", batch);
    println!("Epochs: {}", epochs);
    println!("Population: {}", population);
    if (risk - 1.0).abs() > 1e-12 {
        println!("Risk: {}", risk);
    }
    println!("Seed: {}", seed);
    println!("Output: {}", output_file);
    println!();

    let config = LearnerConfig::new()
        .with_population_size(population)
        .with_seed(seed);
    let mut learner =
        match SelfPlayLearner::new(experiment.environment, LinearBidStrategy::truthful(), config) {
            Ok(learner) => learner,
            Err(e) => {
                eprintln!("Error: {}", e);
                return;
            }
        };

    println!("Starting training...");

    let pb = ProgressBar::new(epochs);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>5}/{len} epochs | {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Keep the persisted history to around 200 points regardless of run
    // length.
    let stride = (epochs / 200).max(1);
    let mut history: Vec<EpochRecord> = Vec::new();

    let trained = learner.train_with_callback(epochs, 1, |stats| {
        pb.inc(1);
        pb.set_message(format!("reward {:+.5}", stats.best_reward));
        if stats.epochs % stride == 0 {
            history.push(EpochRecord::from_stats(stats));
        }
    });
    if let Err(e) = trained {
        pb.abandon();
        eprintln!("Training failed: {}", e);
        return;
    }
    pb.finish();

    let stats = learner.stats().clone();
    let learned = learner.strategy();

    println!();
    println!("Training complete!");
    println!("Total time: {:.2}s", stats.elapsed_seconds);
    println!("Speed: {:.1} epochs/second", stats.epochs_per_second);
    println!(
        "Learned strategy: b(v) = {:.4} + {:.4} v",
        learned.intercept, learned.slope
    );
    println!();

    // Analytic reference for this rule and prior. Intercept, slope, and
    // closed-form utility are reported only where a closed form exists.
    let (analytic, analytic_intercept, analytic_slope, analytic_utility): (
        Arc<dyn Strategy>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
    ) = match (rule, prior) {
        (SingleItemRule::FirstPrice, PriorKind::Uniform) => {
            let bne = fpsb_uniform_bid(players, U_LO, risk).unwrap();
            let utility = fpsb_uniform_utility(players, U_LO, U_HI, risk).unwrap();
            (
                Arc::new(bne),
                Some(bne.intercept),
                Some(bne.slope),
                Some(utility),
            )
        }
        (SingleItemRule::SecondPrice, PriorKind::Uniform) => {
            let utility = if (risk - 1.0).abs() < 1e-12 {
                Some(vickrey_uniform_utility(players, U_LO, U_HI).unwrap())
            } else {
                None
            };
            (
                Arc::new(LinearBidStrategy::truthful()),
                Some(0.0),
                Some(1.0),
                utility,
            )
        }
        (SingleItemRule::FirstPrice, PriorKind::Gaussian) => {
            let bne = fpsb_gaussian_strategy(players, GAUSSIAN_MEAN, GAUSSIAN_STDDEV).unwrap();
            (Arc::new(bne), None, None, None)
        }
        (SingleItemRule::SecondPrice, PriorKind::Gaussian) => (
            Arc::new(LinearBidStrategy::truthful()),
            Some(0.0),
            Some(1.0),
            None,
        ),
    };

    // Score both strategies against equilibrium opponents in a fresh
    // environment so neither sees its own training draws.
    let mut eval = match build_experiment(rule, prior, players, batch, risk, seed.wrapping_add(1)) {
        Ok(experiment) => experiment,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    for _ in 0..players - 1 {
        eval.environment
            .push_strategy(Arc::clone(&analytic))
            .unwrap();
    }
    let learned_reward = eval
        .environment
        .get_strategy_reward(Arc::new(learned), true)
        .unwrap();
    let analytic_reward = eval
        .environment
        .get_strategy_reward(Arc::clone(&analytic), true)
        .unwrap();

    println!("=== Equilibrium Comparison ===");
    if let (Some(intercept), Some(slope)) = (analytic_intercept, analytic_slope) {
        println!("Equilibrium strategy: b(v) = {:.4} + {:.4} v", intercept, slope);
    }
    println!("Reward against equilibrium opponents:");
    println!("  learned:     {:+.5}", learned_reward);
    println!("  equilibrium: {:+.5}", analytic_reward);
    if let Some(utility) = analytic_utility {
        println!("  closed form: {:+.5}", utility);
    }
    println!();

    let output = RunOutput::new(
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
            analytic_utility,
        },
    );

    println!("Exporting results to {}...", output_file);
    match output.save_json(&output_file) {
        Ok(_) => println!("Results saved successfully!"),
        Err(e) => eprintln!("Error saving results: {}", e),
    }

    println!();
    println!("Done!");
}

fn build_experiment(
    rule: SingleItemRule,
    prior: PriorKind,
    players: usize,
    batch: usize,
    risk: f64,
    seed: u64,
) -> Result<Experiment> {
    match prior {
        PriorKind::Uniform => {
            single_item_uniform_symmetric(rule, players, U_LO, U_HI, risk, batch, seed)
        }
        PriorKind::Gaussian => single_item_gaussian_symmetric(
            rule,
            players,
            GAUSSIAN_MEAN,
            GAUSSIAN_STDDEV,
            batch,
            seed,
        ),
    }
}

fn print_help() {
    println!("Single-Item Auction Solver");
    println!();
    println!("Usage: solve_single_item [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -r, --rule <NAME>        Payment rule: first_price or second_price");
    println!("  -p, --prior <NAME>       Valuation prior: uniform on [0, 1) or gaussian(15, 10)");
    println!("  -n, --players <N>        Number of bidders (default: 2)");
    println!("  -b, --batch <N>          Auction instances per batch (default: 65536)");
    println!("  -e, --epochs <N>         Training epochs (default: 200)");
    println!("  --population <N>         Perturbed candidates per epoch (default: 64)");
    println!("  --risk <R>               Risk attitude exponent, uniform prior only");
    println!("  -s, --seed <N>           Random seed (default: 42)");
    println!("  -o, --output <FILE>      Output file (default: single_item_run.json)");
    println!("  -h, --help               Show this help");
    println!();
    println!("Examples:");
    println!("  # First-price, 3 risk-neutral bidders with uniform values");
    println!("  solve_single_item --rule first_price --players 3");
    println!();
    println!("  # Risk-averse first-price (utility exponent 0.5)");
    println!("  solve_single_item --rule first_price --risk 0.5");
    println!();
    println!("  # Second-price with gaussian values, longer run");
    println!("  solve_single_item --rule second_price --prior gaussian --epochs 500");
}
