//! `Sampler` — options for drawing one person from a partition.

use std::fmt;

use pk_core::{PersonId, RngId};

use crate::LabelSet;

/// How to draw from a partition.
///
/// ```rust
/// use pk_core::{PersonId, RngId};
/// use pk_partition::{LabelSet, Sampler};
///
/// // Bucket weight 3 for region "north", 1 elsewhere; never pick person 7.
/// let sampler = Sampler::new(RngId(0))
///     .weighted(|labels: &LabelSet| {
///         if labels.region() == Some(&"north".into()) { 3.0 } else { 1.0 }
///     })
///     .excluding(PersonId(7));
/// # let _ = sampler;
/// ```
pub struct Sampler {
    pub(crate) rng:      RngId,
    pub(crate) query:    Option<LabelSet>,
    pub(crate) weights:  Option<Box<dyn Fn(&LabelSet) -> f64>>,
    pub(crate) excluded: Option<PersonId>,
}

impl Sampler {
    /// Uniform over the whole partition, drawing from stream `rng`.
    pub fn new(rng: RngId) -> Self {
        Self {
            rng,
            query:    None,
            weights:  None,
            excluded: None,
        }
    }

    /// Only consider buckets matching `query`.
    pub fn within(mut self, query: LabelSet) -> Self {
        self.query = Some(query);
        self
    }

    /// Draw a bucket proportional to `f(bucket labels)`, then a member
    /// uniformly.
    pub fn weighted(mut self, f: impl Fn(&LabelSet) -> f64 + 'static) -> Self {
        self.weights = Some(Box::new(f));
        self
    }

    pub fn excluding(mut self, person: PersonId) -> Self {
        self.excluded = Some(person);
        self
    }

    pub fn rng(&self) -> RngId {
        self.rng
    }

    pub fn query(&self) -> Option<&LabelSet> {
        self.query.as_ref()
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("rng", &self.rng)
            .field("query", &self.query)
            .field("weighted", &self.weights.is_some())
            .field("excluded", &self.excluded)
            .finish()
    }
}
