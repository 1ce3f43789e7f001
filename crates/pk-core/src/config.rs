//! Replication-level simulation configuration.

use crate::{CoreError, CoreResult, RngId, RngStreams, Time};

/// Default bound on nested observer notifications.
pub const DEFAULT_MAX_NOTIFICATION_DEPTH: usize = 64;

/// Top-level configuration for one replication.
///
/// Typically built by the application (or deserialized with the `serde`
/// feature) and handed to the simulation builder alongside the scenario
/// universe.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Identifies this replication in logs and output.
    pub replication_id: u32,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Random streams components may draw from.  Any other `RngId` is
    /// refused with `UnknownRandomNumberGeneratorId`.
    pub random_generators: Vec<RngId>,

    /// Simulation time at which `init` runs and the first plan may be due.
    pub start_time: Time,

    /// Nested observer notifications deeper than this abort the run.
    pub max_notification_depth: usize,
}

impl SimConfig {
    /// A configuration with one random stream (`RngId(0)`) and defaults.
    pub fn new(seed: u64) -> Self {
        Self {
            replication_id:         0,
            seed,
            random_generators:      vec![RngId(0)],
            start_time:             Time::ZERO,
            max_notification_depth: DEFAULT_MAX_NOTIFICATION_DEPTH,
        }
    }

    /// Declare an additional random stream.
    pub fn with_rng(mut self, id: RngId) -> Self {
        if !self.random_generators.contains(&id) {
            self.random_generators.push(id);
        }
        self
    }

    /// Reject configurations the driver cannot run.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.start_time.is_finite() {
            return Err(CoreError::Config(format!(
                "start time {} is not finite",
                self.start_time
            )));
        }
        if self.max_notification_depth == 0 {
            return Err(CoreError::Config(
                "max_notification_depth must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Seed the declared random streams for this replication.
    pub fn make_streams(&self) -> RngStreams {
        RngStreams::new(self.seed, &self.random_generators)
    }
}
