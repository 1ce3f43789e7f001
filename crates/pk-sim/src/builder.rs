//! Fluent builder for constructing a [`Sim`].

use pk_core::SimConfig;
use pk_store::AttributeStore;

use crate::env::Slot;
use crate::{Component, ComponentKind, Environment, NoopOutput, OutputHandler, Sim, SimError, SimResult};

/// Fluent builder for [`Sim<P>`].
///
/// # Required inputs
///
/// - [`SimConfig`]: seed, random streams, start time, notification depth
/// - [`AttributeStore`]: the initial population, from [`pk_store::StoreBuilder`]
///
/// # Optional inputs (have defaults)
///
/// | Method             | Default           |
/// |--------------------|-------------------|
/// | `.component(k, c)` | no components     |
/// | `.output(h)`       | [`NoopOutput`]    |
///
/// Components are observers in the order they are registered here.
///
/// # Example
///
/// ```rust,ignore
/// let store = StoreBuilder::new(universe).people(seeds).build()?;
/// let mut sim = SimBuilder::new(SimConfig::new(42), store)
///     .component(ComponentKind::Global, Infection::default())
///     .component(ComponentKind::Region(RegionId(0)), Clinic::new(RegionId(0)))
///     .output(CsvOutput::create("out.csv")?)
///     .build()?;
/// let summary = sim.run()?;
/// ```
pub struct SimBuilder<P> {
    config:     SimConfig,
    store:      AttributeStore,
    components: Vec<(ComponentKind, Box<dyn Component<P>>)>,
    output:     Option<Box<dyn OutputHandler>>,
}

impl<P> SimBuilder<P> {
    pub fn new(config: SimConfig, store: AttributeStore) -> Self {
        Self {
            config,
            store,
            components: Vec::new(),
            output:     None,
        }
    }

    /// Register a component.  Its `ComponentId` is its registration index.
    pub fn component(mut self, kind: ComponentKind, component: impl Component<P> + 'static) -> Self {
        self.components.push((kind, Box::new(component)));
        self
    }

    /// Send released output to `handler` instead of discarding it.
    pub fn output(mut self, handler: impl OutputHandler + 'static) -> Self {
        self.output = Some(Box::new(handler));
        self
    }

    /// Validate inputs and return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim<P>> {
        self.config.validate()?;

        if self.components.len() > usize::from(u16::MAX) {
            return Err(SimError::Config(format!(
                "{} components registered, at most {} supported",
                self.components.len(),
                u16::MAX
            )));
        }

        let universe = self.store.universe();
        for (kind, _) in &self.components {
            let known = match *kind {
                ComponentKind::Global => true,
                ComponentKind::Region(r) => r.index() < universe.region_count(),
                ComponentKind::Compartment(c) => c.index() < universe.compartment_count(),
            };
            if !known {
                return Err(SimError::Config(format!("{kind} names an unknown location")));
            }
        }

        let slots = self
            .components
            .into_iter()
            .map(|(kind, component)| Slot::new(kind, component))
            .collect();
        let output = self.output.unwrap_or_else(|| Box::new(NoopOutput));

        Ok(Sim::new(Environment::new(self.config, self.store, slots, output)))
    }
}
