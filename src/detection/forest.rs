//! Isolation forest over a single numeric feature.
//!
//! Each tree recursively splits a random sub-sample at a uniformly drawn
//! value between the node's min and max. Points that end up alone after few
//! splits have short paths and score close to 1.0; typical points score
//! around or below 0.5.

use anyhow::{bail, Result};
use rand::{seq::index, Rng};

use crate::detection::config::DetectionConfig;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Fit a fresh forest on `samples` and derive the decision threshold
    /// from the training scores at the configured contamination.
    pub fn fit<R: Rng + ?Sized>(
        samples: &[f64],
        config: &DetectionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if samples.is_empty() {
            bail!("cannot fit isolation forest on an empty sample");
        }
        if config.n_trees == 0 {
            bail!("isolation forest needs at least one tree");
        }

        let sample_size = config.max_samples.clamp(1, samples.len());
        let height_limit = (sample_size as f64).log2().ceil().max(0.0) as usize;

        let trees = (0..config.n_trees)
            .map(|_| {
                let subsample: Vec<f64> = index::sample(rng, samples.len(), sample_size)
                    .into_iter()
                    .map(|i| samples[i])
                    .collect();
                build_node(subsample, 0, height_limit, rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            threshold: f64::INFINITY,
        };

        let mut training_scores: Vec<f64> = samples.iter().map(|&x| forest.score(x)).collect();
        training_scores.sort_by(|a, b| a.total_cmp(b));
        forest.threshold = quantile(&training_scores, 1.0 - config.contamination);

        Ok(forest)
    }

    /// Anomaly score in (0, 1]; higher means easier to isolate.
    pub fn score(&self, value: f64) -> f64 {
        let normaliser = average_path_length(self.sample_size);
        if normaliser <= 0.0 {
            return 0.5;
        }
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| path_length(tree, value, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_depth / normaliser)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Binary decision: strictly above the contamination quantile.
    pub fn is_anomaly(&self, value: f64) -> bool {
        self.score(value) > self.threshold
    }
}

fn build_node<R: Rng + ?Sized>(
    points: Vec<f64>,
    depth: usize,
    height_limit: usize,
    rng: &mut R,
) -> Node {
    if depth >= height_limit || points.len() <= 1 {
        return Node::Leaf { size: points.len() };
    }

    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    if min >= max {
        return Node::Leaf { size: points.len() };
    }

    let value = split_between(min, max, rng);
    let (left, right): (Vec<f64>, Vec<f64>) = points.into_iter().partition(|&x| x < value);

    Node::Split {
        value,
        left: Box::new(build_node(left, depth + 1, height_limit, rng)),
        right: Box::new(build_node(right, depth + 1, height_limit, rng)),
    }
}

/// Uniform draw in `[min, max]` that stays finite when `max - min` overflows.
fn split_between<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    let unit: f64 = rng.gen();
    let width = max - min;
    if width.is_finite() {
        return (min + unit * width).min(max);
    }
    let half = min / 2.0 + unit * (max / 2.0 - min / 2.0);
    (half * 2.0).clamp(min, max)
}

fn path_length(node: &Node, value: f64, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            value: split,
            left,
            right,
        } => {
            if value < *split {
                path_length(left, value, depth + 1)
            } else {
                path_length(right, value, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::INFINITY;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
