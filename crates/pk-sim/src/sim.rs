//! The `Sim` struct and its plan loop.

use tracing::{debug, info, warn};

use pk_core::{ComponentId, Time};

use crate::{Environment, SimResult};

/// What a finished run reports.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Plans executed over the whole run.
    pub plans_dispatched: u64,
    /// Simulation time when the run ended.
    pub end_time:         Time,
    /// `true` if a component called [`Environment::halt`].
    pub halted:           bool,
}

/// The simulation driver.
///
/// `run` goes through four phases:
///
/// 1. **Open**: the output handler is opened.
/// 2. **Init**: every component's `init`, in registration order, at the
///    start time.
/// 3. **Plans**: the earliest pending plan is removed, the clock advances
///    to its time and its owner's `execute_plan` runs.  Plans due at the
///    same time run in submission order.  Repeats until no plan remains or
///    a component halts the run.
/// 4. **Close**: every component's `close`, then the output handler's.
///
/// The output handler is closed even when a phase fails; the first error
/// is returned.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<P> {
    env: Environment<P>,
}

impl<P> Sim<P> {
    pub(crate) fn new(env: Environment<P>) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Environment<P> {
        &self.env
    }

    /// Direct access for setup before `run` (adding partitions, seeding
    /// people).  Calls made here have no focal component.
    pub fn env_mut(&mut self) -> &mut Environment<P> {
        &mut self.env
    }

    /// Run to completion.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        let config = self.env.config();
        info!(
            replication = config.replication_id,
            seed = config.seed,
            components = self.env.component_count(),
            people = self.env.store().population_count(),
            "simulation starting"
        );

        let result = self.run_phases();
        let closed = self.env.output_mut().close();

        let outcome = match (result, closed) {
            (Err(e), _) => {
                warn!(error = %e, time = %self.env.time(), "simulation aborted");
                Err(e)
            }
            (Ok(_), Err(e)) => Err(e.into()),
            (Ok(()), Ok(())) => Ok(RunSummary {
                plans_dispatched: self.env.plans_dispatched(),
                end_time:         self.env.time(),
                halted:           self.env.is_halted(),
            }),
        };

        if let Ok(summary) = &outcome {
            info!(
                plans = summary.plans_dispatched,
                end_time = %summary.end_time,
                halted = summary.halted,
                "simulation finished"
            );
        }
        outcome
    }

    fn run_phases(&mut self) -> SimResult<()> {
        self.env.output_mut().open()?;

        let count = self.env.component_count();
        for index in 0..count {
            let id = ComponentId(index as u16);
            self.env.with_component(id, |component, env| component.init(env))?;
        }

        while let Some(due) = self.env.pop_plan() {
            debug!(time = %due.time, component = %due.component, key = ?due.key, "executing plan");
            let payload = due.payload;
            self.env
                .with_component(due.component, move |component, env| {
                    component.execute_plan(env, payload)
                })?;
        }

        for index in 0..count {
            let id = ComponentId(index as u16);
            self.env.with_component(id, |component, env| component.close(env))?;
        }
        Ok(())
    }
}
