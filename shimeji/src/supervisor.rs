//! Population supervisor.
//!
//! Owns every live mascot from registration to disposal. Membership moves
//! `Unregistered -> Live -> Disposed` and never back: only a spawn whose
//! behavior was built and initialized registers a mascot, and every disposal
//! path removes it for good.
//!
//! Every operation either completes or leaves the population exactly as it
//! was. Operations that can empty the population report it through
//! [`Disposal::terminate`], which is set only on the call that made the
//! population empty while the exit policy was active.

use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::behavior::{Behavior, BehaviorEngine, Step};
use crate::core::exit_policy::ExitPolicy;
use crate::core::types::{ImageSetId, MascotId};
use crate::error::{BehaviorError, SpawnError};
use crate::mascot::{Mascot, MascotState, OFFSCREEN_ANCHOR};
use crate::registry::ConfigurationRegistry;

/// Outcome of a call that may have removed mascots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disposal {
    pub removed: usize,
    /// The population just became empty with exit-on-last-removed active.
    pub terminate: bool,
}

/// Outcome of [`Supervisor::broadcast_behavior`].
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub applied: usize,
    pub failures: Vec<(MascotId, BehaviorError)>,
    pub disposal: Disposal,
}

/// Outcome of [`Supervisor::tick`].
#[derive(Debug, Default)]
pub struct TickReport {
    pub advanced: usize,
    pub disposal: Disposal,
}

pub struct Supervisor<E: BehaviorEngine> {
    engine: E,
    rng: StdRng,
    population: Vec<Mascot>,
    exit_policy: ExitPolicy,
    next_id: u64,
    running: bool,
}

impl<E: BehaviorEngine> Supervisor<E> {
    pub fn new(engine: E, rng: StdRng) -> Self {
        Self {
            engine,
            rng,
            population: Vec::new(),
            exit_policy: ExitPolicy::default(),
            next_id: 1,
            running: false,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn exit_policy(&self) -> &ExitPolicy {
        &self.exit_policy
    }

    pub fn exit_policy_mut(&mut self) -> &mut ExitPolicy {
        &mut self.exit_policy
    }

    pub fn len(&self) -> usize {
        self.population.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    pub fn mascots(&self) -> impl Iterator<Item = &Mascot> {
        self.population.iter()
    }

    pub fn get(&self, id: MascotId) -> Option<&Mascot> {
        self.population.iter().find(|mascot| mascot.id() == id)
    }

    /// Spawn from an image set drawn uniformly, with replacement, from `image_sets`.
    pub fn spawn_random(
        &mut self,
        registry: &ConfigurationRegistry,
        image_sets: &[ImageSetId],
    ) -> Result<MascotId, SpawnError> {
        if image_sets.is_empty() {
            return Err(SpawnError::NoImageSets);
        }
        let pick = self.rng.gen_range(0..image_sets.len());
        self.spawn_named(registry, &image_sets[pick])
    }

    /// Build a mascot from `image_set` and register it.
    ///
    /// The mascot starts off-screen facing a random direction. If the root
    /// behavior cannot be built or initialized, the half-built mascot is torn
    /// down before returning and the population is unchanged.
    pub fn spawn_named(
        &mut self,
        registry: &ConfigurationRegistry,
        image_set: &ImageSetId,
    ) -> Result<MascotId, SpawnError> {
        let configuration = registry
            .configuration(image_set)
            .cloned()
            .ok_or_else(|| SpawnError::NotLoaded(image_set.clone()))?;

        let id = MascotId(self.next_id);
        self.next_id += 1;
        let mut state = MascotState {
            id,
            image_set: image_set.clone(),
            anchor: OFFSCREEN_ANCHOR,
            look_right: self.rng.gen_bool(0.5),
        };

        let built = configuration.build_behavior(None, &self.engine, &state, &mut self.rng);
        match attach(built, &mut state) {
            Ok(behavior) => {
                info!(mascot = %id, image_set = %image_set, behavior = behavior.name(), "mascot created");
                self.population.push(Mascot {
                    state,
                    behavior,
                    configuration,
                });
                Ok(id)
            }
            Err(source) => {
                error!(
                    mascot = %id,
                    image_set = %image_set,
                    error = %source,
                    label = source.as_label(),
                    "failed to initialize first behavior"
                );
                self.engine.dispose(&state);
                Err(SpawnError::Behavior {
                    image_set: image_set.clone(),
                    source,
                })
            }
        }
    }

    /// Switch every live mascot to behavior `name`, one mascot at a time.
    ///
    /// A mascot whose new behavior cannot be built keeps its current one; a
    /// mascot that cannot stay alive is disposed. Neither stops the others.
    pub fn broadcast_behavior(&mut self, name: &str) -> BroadcastReport {
        let before = self.population.len();
        let mut report = BroadcastReport::default();
        let mut survivors = Vec::with_capacity(before);

        for mut mascot in std::mem::take(&mut self.population) {
            let built = mascot.configuration.behavior_named(name, &self.engine);
            match attach(built, &mut mascot.state) {
                Ok(behavior) => {
                    mascot.behavior = behavior;
                    report.applied += 1;
                    survivors.push(mascot);
                }
                Err(err) if err.is_fatal() => {
                    warn!(mascot = %mascot.id(), behavior = name, error = %err, "mascot cannot stay alive");
                    report.failures.push((mascot.id(), err));
                    self.teardown(mascot);
                }
                Err(err) => {
                    warn!(mascot = %mascot.id(), behavior = name, error = %err, label = err.as_label(), "behavior not applied");
                    report.failures.push((mascot.id(), err));
                    survivors.push(mascot);
                }
            }
        }

        self.population = survivors;
        report.disposal = self.settle(before);
        debug!(behavior = name, applied = report.applied, failed = report.failures.len(), "broadcast finished");
        report
    }

    /// Dispose every mascot except the oldest one. No-op with one or none.
    pub fn reduce_to_one(&mut self) -> Disposal {
        let before = self.population.len();
        if before <= 1 {
            return Disposal::default();
        }
        let extra: Vec<Mascot> = self.population.drain(1..).collect();
        for mascot in extra {
            self.teardown(mascot);
        }
        info!(removed = before - 1, "reduced to one mascot");
        self.settle(before)
    }

    /// Dispose one mascot (user close). `None` if `id` is not live.
    pub fn dispose(&mut self, id: MascotId) -> Option<Disposal> {
        let before = self.population.len();
        let idx = self.population.iter().position(|mascot| mascot.id() == id)?;
        let mascot = self.population.remove(idx);
        self.teardown(mascot);
        Some(self.settle(before))
    }

    /// Dispose every mascot.
    pub fn dispose_all(&mut self) -> Disposal {
        let before = self.population.len();
        let all: Vec<Mascot> = self.population.drain(..).collect();
        for mascot in all {
            self.teardown(mascot);
        }
        if before > 0 {
            info!(removed = before, "disposed all mascots");
        }
        self.settle(before)
    }

    pub fn start(&mut self) {
        if !self.running {
            debug!("supervisor started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!("supervisor stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance every mascot's behavior once. Does nothing while stopped.
    ///
    /// A finished behavior is followed by one picked from the configuration
    /// with the finished behavior as parent. A mascot is disposed when it
    /// cannot stay alive or when no follow-up can be built.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if !self.running {
            return report;
        }

        let before = self.population.len();
        let mut survivors = Vec::with_capacity(before);
        for mut mascot in std::mem::take(&mut self.population) {
            match mascot.behavior.next(&mut mascot.state) {
                Ok(Step::Continue) => {
                    report.advanced += 1;
                    survivors.push(mascot);
                }
                Ok(Step::Finished) => {
                    let previous = mascot.behavior.name().to_string();
                    let configuration = Arc::clone(&mascot.configuration);
                    let built = configuration.build_behavior(
                        Some(&previous),
                        &self.engine,
                        &mascot.state,
                        &mut self.rng,
                    );
                    match attach(built, &mut mascot.state) {
                        Ok(behavior) => {
                            debug!(mascot = %mascot.id(), from = %previous, to = behavior.name(), "next behavior");
                            mascot.behavior = behavior;
                            report.advanced += 1;
                            survivors.push(mascot);
                        }
                        Err(err) => {
                            error!(mascot = %mascot.id(), from = %previous, error = %err, "failed to build next behavior");
                            self.teardown(mascot);
                        }
                    }
                }
                Err(err) if err.is_fatal() => {
                    warn!(mascot = %mascot.id(), error = %err, "mascot cannot stay alive");
                    self.teardown(mascot);
                }
                Err(err) => {
                    warn!(mascot = %mascot.id(), error = %err, label = err.as_label(), "behavior step failed");
                    survivors.push(mascot);
                }
            }
        }

        self.population = survivors;
        report.disposal = self.settle(before);
        report
    }

    fn teardown(&self, mascot: Mascot) {
        debug!(mascot = %mascot.id(), image_set = %mascot.image_set(), "mascot disposed");
        self.engine.dispose(&mascot.state);
    }

    /// Summarize removals since the population had `before` members.
    fn settle(&self, before: usize) -> Disposal {
        let removed = before.saturating_sub(self.population.len());
        let terminate =
            removed > 0 && self.population.is_empty() && self.exit_policy.is_exit_on_last_removed();
        if terminate {
            info!("last mascot removed; exit requested");
        }
        Disposal { removed, terminate }
    }
}

impl<E: BehaviorEngine> std::fmt::Debug for Supervisor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("population", &self.population.len())
            .field("exit_policy", &self.exit_policy)
            .field("running", &self.running)
            .finish()
    }
}

fn attach(
    built: Result<Box<dyn Behavior>, BehaviorError>,
    state: &mut MascotState,
) -> Result<Box<dyn Behavior>, BehaviorError> {
    let mut behavior = built?;
    behavior.init(state)?;
    Ok(behavior)
}
