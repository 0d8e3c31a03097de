use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CricketError, Result};

/// Training-time label for a bowler-credited dismissal.
pub const WICKET_LABEL: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BallOutcome {
    Runs(u8),
    Wicket,
}

impl BallOutcome {
    pub fn from_label(label: i64) -> Result<Self> {
        match label {
            0..=6 => Ok(BallOutcome::Runs(label as u8)),
            WICKET_LABEL => Ok(BallOutcome::Wicket),
            other => Err(CricketError::InvalidOutcomeLabel(other)),
        }
    }

    pub fn label(self) -> i64 {
        match self {
            BallOutcome::Runs(r) => r as i64,
            BallOutcome::Wicket => WICKET_LABEL,
        }
    }

    pub fn runs(self) -> u32 {
        match self {
            BallOutcome::Runs(r) => r as u32,
            BallOutcome::Wicket => 0,
        }
    }

    pub fn is_wicket(self) -> bool {
        self == BallOutcome::Wicket
    }
}

impl fmt::Display for BallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallOutcome::Runs(r) => write!(f, "{r}"),
            BallOutcome::Wicket => f.write_str("W"),
        }
    }
}

/// Offline-trained classifier over the encoded feature vector.
pub trait OutcomeModel: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<i64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxArtifact {
    /// Outcome label of each class, in weight-row order.
    pub labels: Vec<i64>,
    #[serde(default)]
    pub feature_means: Vec<f64>,
    #[serde(default)]
    pub feature_stds: Vec<f64>,
    /// One row of coefficients per class.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub trained_at: Option<String>,
}

/// Multinomial logistic regression over standardised features.
#[derive(Debug, Clone)]
pub struct SoftmaxModel {
    artifact: SoftmaxArtifact,
    inputs: usize,
}

impl SoftmaxModel {
    pub fn from_artifact(artifact: SoftmaxArtifact) -> Result<Self> {
        let classes = artifact.labels.len();
        if classes == 0 {
            return Err(CricketError::InvalidModel("no output classes".into()));
        }
        if artifact.weights.len() != classes || artifact.bias.len() != classes {
            return Err(CricketError::InvalidModel(format!(
                "{classes} labels but {} weight rows and {} biases",
                artifact.weights.len(),
                artifact.bias.len()
            )));
        }
        let inputs = artifact.weights[0].len();
        if artifact.weights.iter().any(|row| row.len() != inputs) {
            return Err(CricketError::InvalidModel(
                "weight rows differ in length".into(),
            ));
        }
        for &label in &artifact.labels {
            BallOutcome::from_label(label)?;
        }
        Ok(Self { artifact, inputs })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let artifact: SoftmaxArtifact = serde_json::from_str(&raw)?;
        let model = Self::from_artifact(artifact)?;
        info!(
            path = %path.display(),
            classes = model.artifact.labels.len(),
            inputs = model.inputs,
            "loaded outcome model"
        );
        Ok(model)
    }

    pub fn labels(&self) -> &[i64] {
        &self.artifact.labels
    }

    /// Class probabilities in `labels()` order.
    pub fn probabilities(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.inputs {
            return Err(CricketError::InvalidModel(format!(
                "expected {} features, got {}",
                self.inputs,
                features.len()
            )));
        }
        let x: Vec<f64> = features
            .iter()
            .enumerate()
            .map(|(i, &raw)| standardized(raw, i, &self.artifact))
            .collect();
        let logits: Vec<f64> = self
            .artifact
            .weights
            .iter()
            .zip(&self.artifact.bias)
            .map(|(row, b)| row.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect();
        Ok(softmax(&logits))
    }
}

impl OutcomeModel for SoftmaxModel {
    fn predict(&self, features: &[f64]) -> Result<i64> {
        let probs = self.probabilities(features)?;
        let best = probs
            .iter()
            .enumerate()
            .fold((0usize, f64::MIN), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
        Ok(self.artifact.labels[best.0])
    }
}

/// Draws the label from the class probabilities instead of taking the argmax.
#[derive(Debug)]
pub struct SampledSoftmax {
    model: SoftmaxModel,
    rng: Mutex<StdRng>,
}

impl SampledSoftmax {
    pub fn new(model: SoftmaxModel, seed: u64) -> Self {
        Self {
            model,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl OutcomeModel for SampledSoftmax {
    fn predict(&self, features: &[f64]) -> Result<i64> {
        let probs = self.model.probabilities(features)?;
        let dist = WeightedIndex::new(&probs)
            .map_err(|e| CricketError::InvalidModel(format!("class weights: {e}")))?;
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.model.labels()[dist.sample(&mut *rng)])
    }
}

fn standardized(raw: f64, idx: usize, artifact: &SoftmaxArtifact) -> f64 {
    let mean = artifact.feature_means.get(idx).copied().unwrap_or(0.0);
    let std = artifact
        .feature_stds
        .get(idx)
        .copied()
        .unwrap_or(1.0)
        .max(1e-6);
    (raw - mean) / std
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let mx = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - mx).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub fn default_model_path() -> PathBuf {
    PathBuf::from("dataset/outcome_model.json")
}
