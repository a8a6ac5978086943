//! Dataset splitting
//!
//! Partitions a validated table into disjoint train/validation/test subsets
//! using a seeded pseudo-random permutation of row indices, so a fixed seed
//! and input always reproduce the same partition. Boundary sizes are computed
//! by integer truncation of the configured ratios; any remainder rows land in
//! the test partition.

use crate::config::PipelineConfig;
use crate::table::DataTable;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

/// Seeded train/val/test splitter
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    train_ratio: f64,
    val_ratio: f64,
    seed: u64,
}

impl Splitter {
    pub fn new(train_ratio: f64, val_ratio: f64, seed: u64) -> Self {
        Self {
            train_ratio,
            val_ratio,
            seed,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.train_ratio, config.val_ratio, config.seed)
    }

    /// Split the table into (train, val, test).
    ///
    /// The outputs are row-disjoint, their union equals the input as a
    /// multiset, and each gets a fresh contiguous row order. Deterministic
    /// for a fixed seed and input size.
    pub fn split(&self, table: &DataTable) -> (DataTable, DataTable, DataTable) {
        let n = table.n_rows();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let n_train = (n as f64 * self.train_ratio) as usize;
        let n_val = (n as f64 * self.val_ratio) as usize;

        let train = table.take_rows(&indices[..n_train]);
        let val = table.take_rows(&indices[n_train..n_train + n_val]);
        let test = table.take_rows(&indices[n_train + n_val..]);

        info!(
            "split: train={}, val={}, test={}",
            train.n_rows(),
            val.n_rows(),
            test.n_rows()
        );
        (train, val, test)
    }
}
