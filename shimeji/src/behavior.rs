//! Behavior engine abstraction.
//!
//! The [`BehaviorEngine`] trait decouples the supervisor from the engine that
//! interprets conditions and actions. The core only needs to build a behavior
//! from a definition, initialize it against a mascot, advance it, and read its
//! name. Tests use scripted engines that fail on demand.

use std::fmt;

use tracing::trace;

use crate::core::configuration::Configuration;
use crate::core::definitions::BehaviorDef;
use crate::error::BehaviorError;
use crate::mascot::MascotState;

/// Ticks a behavior runs when its action does not state a `Duration`.
pub const DEFAULT_DURATION_TICKS: u32 = 250;

/// Result of advancing a behavior by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The behavior is done; the supervisor picks a follow-up.
    Finished,
}

/// A live behavior attached to one mascot.
pub trait Behavior: fmt::Debug {
    fn name(&self) -> &str;

    /// Attach to `mascot`. [`BehaviorError::CantBeAlive`] means the mascot must be disposed.
    fn init(&mut self, mascot: &mut MascotState) -> Result<(), BehaviorError>;

    fn next(&mut self, mascot: &mut MascotState) -> Result<Step, BehaviorError>;
}

/// Interprets behavior definitions.
pub trait BehaviorEngine {
    /// Whether every condition expression holds for `mascot` right now.
    fn is_effective(&self, _conditions: &[String], _mascot: &MascotState) -> bool {
        true
    }

    fn instantiate(
        &self,
        behavior: &BehaviorDef,
        configuration: &Configuration,
    ) -> Result<Box<dyn Behavior>, BehaviorError>;

    /// Release engine-side resources of a mascot that is being torn down.
    fn dispose(&self, _mascot: &MascotState) {}
}

/// Engine that runs each behavior for its action's `Duration` and then
/// finishes. Conditions are treated as satisfied.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimedEngine;

impl BehaviorEngine for TimedEngine {
    fn instantiate(
        &self,
        behavior: &BehaviorDef,
        configuration: &Configuration,
    ) -> Result<Box<dyn Behavior>, BehaviorError> {
        let action = configuration.action(&behavior.action).ok_or_else(|| {
            BehaviorError::instantiation(
                &behavior.name,
                format!("no action named '{}'", behavior.action),
            )
        })?;
        let duration = action.duration.unwrap_or(DEFAULT_DURATION_TICKS).max(1);
        Ok(Box::new(TimedBehavior {
            name: behavior.name.clone(),
            duration,
            remaining: duration,
        }))
    }
}

#[derive(Debug)]
struct TimedBehavior {
    name: String,
    duration: u32,
    remaining: u32,
}

impl Behavior for TimedBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, mascot: &mut MascotState) -> Result<(), BehaviorError> {
        trace!(mascot = %mascot.id, behavior = %self.name, "behavior attached");
        self.remaining = self.duration;
        Ok(())
    }

    fn next(&mut self, _mascot: &mut MascotState) -> Result<Step, BehaviorError> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            Ok(Step::Finished)
        } else {
            Ok(Step::Continue)
        }
    }
}
