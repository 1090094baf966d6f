//! Serializable run outputs.
//!
//! A training run is captured as metadata, the preset it ran, the epoch
//! history, and the learned strategy next to its analytic reference where
//! one exists. Everything serializes to pretty JSON for downstream
//! plotting and comparison.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::experiment::learner::LearnerStats;
use crate::experiment::presets::ExperimentPreset;

/// One epoch's summary in a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epoch number.
    pub epoch: u64,
    /// Winner reward of the epoch.
    pub reward: f64,
    /// Incumbent intercept after the epoch.
    pub intercept: f64,
    /// Incumbent slope after the epoch.
    pub slope: f64,
    /// Perturbation scale after the epoch.
    pub sigma: f64,
}

impl EpochRecord {
    /// Snapshot the learner's current state.
    pub fn from_stats(stats: &LearnerStats) -> Self {
        Self {
            epoch: stats.epochs,
            reward: stats.best_reward,
            intercept: stats.intercept,
            slope: stats.slope,
            sigma: stats.sigma,
        }
    }
}

/// Run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Experiment name.
    pub experiment: String,
    /// Number of epochs trained.
    pub epochs: u64,
    /// Wall-clock training time.
    pub elapsed_seconds: f64,
    /// Timestamp
    pub timestamp: String,
}

/// The learned strategy beside its analytic reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedReport {
    /// Learned intercept.
    pub intercept: f64,
    /// Learned slope.
    pub slope: f64,
    /// Reward of the learned strategy sampled in its environment.
    pub sampled_utility: f64,
    /// Equilibrium intercept, when a closed form exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytic_intercept: Option<f64>,
    /// Equilibrium slope, when a closed form exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytic_slope: Option<f64>,
    /// Reward of the equilibrium strategy sampled in the same environment
    /// as `sampled_utility`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytic_sampled_utility: Option<f64>,
    /// Closed-form equilibrium utility, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytic_utility: Option<f64>,
}

/// Complete output of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Run metadata.
    pub metadata: RunMetadata,
    /// The preset that was run.
    pub preset: ExperimentPreset,
    /// Per-callback epoch history.
    pub history: Vec<EpochRecord>,
    /// Final learned strategy and references.
    pub learned: LearnedReport,
}

impl RunOutput {
    /// Assemble a run output from its parts.
    pub fn new(
        preset: ExperimentPreset,
        stats: &LearnerStats,
        history: Vec<EpochRecord>,
        learned: LearnedReport,
    ) -> Self {
        Self {
            metadata: RunMetadata {
                experiment: preset.name.clone(),
                epochs: stats.epochs,
                elapsed_seconds: stats.elapsed_seconds,
                timestamp: unix_timestamp(),
            },
            preset,
            history,
            learned,
        }
    }

    /// Save as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())
    }
}

/// Several runs captured in one file, e.g. one per payment rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCollection {
    /// Timestamp
    pub generated_at: String,
    /// The captured runs.
    pub runs: Vec<RunOutput>,
}

impl RunCollection {
    /// Bundle runs with a generation timestamp.
    pub fn new(runs: Vec<RunOutput>) -> Self {
        Self {
            generated_at: unix_timestamp(),
            runs,
        }
    }

    /// Save as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())
    }
}

/// Simple timestamp without external dependencies.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::presets::PriorSpec;

    fn sample_output() -> RunOutput {
        let preset = ExperimentPreset {
            name: "single_item/first_price/uniform/2p".to_string(),
            payment_rule: "first_price".to_string(),
            n_players: 2,
            batch_size: 1024,
            prior: PriorSpec::Uniform {
                low: 0.0,
                high: 1.0,
            },
            risk: 1.0,
            correlation: None,
            seed: Some(42),
        };
        let mut stats = LearnerStats::new();
        stats.epochs = 10;
        stats.best_reward = 0.16;
        stats.intercept = 0.01;
        stats.slope = 0.49;
        stats.sigma = 0.05;
        stats.elapsed_seconds = 1.5;

        RunOutput::new(
            preset,
            &stats,
            vec![EpochRecord::from_stats(&stats)],
            LearnedReport {
                intercept: 0.01,
                slope: 0.49,
                sampled_utility: 0.16,
                analytic_intercept: Some(0.0),
                analytic_slope: Some(0.5),
                analytic_sampled_utility: Some(0.165),
                analytic_utility: Some(1.0 / 6.0),
            },
        )
    }

    #[test]
    fn test_epoch_record_snapshots_stats() {
        let mut stats = LearnerStats::new();
        stats.epochs = 3;
        stats.best_reward = 0.1;
        stats.slope = 0.7;
        stats.sigma = 0.2;

        let record = EpochRecord::from_stats(&stats);
        assert_eq!(record.epoch, 3);
        assert_eq!(record.reward, 0.1);
        assert_eq!(record.slope, 0.7);
        assert_eq!(record.sigma, 0.2);
    }

    #[test]
    fn test_run_output_metadata_mirrors_preset_and_stats() {
        let output = sample_output();
        assert_eq!(output.metadata.experiment, output.preset.name);
        assert_eq!(output.metadata.epochs, 10);
        assert!((output.metadata.elapsed_seconds - 1.5).abs() < 1e-12);
        assert!(!output.metadata.timestamp.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let output = sample_output();
        let path = std::env::temp_dir().join("auction_solver_run_output_test.json");

        output.save_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: RunOutput = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.preset, output.preset);
        assert_eq!(back.history.len(), 1);
        assert_eq!(back.learned.analytic_slope, Some(0.5));
    }

    #[test]
    fn test_collection_wraps_runs() {
        let collection = RunCollection::new(vec![sample_output(), sample_output()]);
        assert_eq!(collection.runs.len(), 2);

        let json = serde_json::to_string_pretty(&collection).unwrap();
        assert!(json.contains("generated_at"));
        assert!(json.contains("first_price"));
    }
}
