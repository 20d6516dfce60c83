//! Merged, validated definitions for one image set.
//!
//! Actions and behaviors share one namespace keyed by `(kind, name)`. Loading
//! a second document into the same configuration merges into that namespace;
//! any key collision is rejected instead of overwritten.

use std::collections::HashMap;

use rand::Rng;

use crate::behavior::{Behavior, BehaviorEngine};
use crate::core::definitions::{
    ACTION, ACTION_LIST, ActionDef, BEHAVIOR_LIST, BehaviorDef, Definition, MASCOT,
    collect_behaviors,
};
use crate::core::types::EntryKind;
use crate::entry::Entry;
use crate::error::{BehaviorError, DefinitionError, ValidationError};
use crate::mascot::MascotState;

/// Behavior used when no candidate has a positive frequency.
pub const FALLBACK_BEHAVIOR: &str = "Fall";

#[derive(Debug, Clone, Default)]
pub struct Configuration {
    entries: Vec<Definition>,
    index: HashMap<(EntryKind, String), usize>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every action and behavior under `root` into the namespace.
    ///
    /// Fails on the first entry whose `(kind, name)` is already present.
    pub fn load(&mut self, root: &Entry) -> Result<(), DefinitionError> {
        if root.name != MASCOT {
            return Err(DefinitionError::UnexpectedRoot(root.name.clone()));
        }

        for list in root.select_children(ACTION_LIST) {
            for node in list.select_children(ACTION) {
                self.insert(Definition::Action(ActionDef::from_entry(node)?))?;
            }
        }

        for list in root.select_children(BEHAVIOR_LIST) {
            let mut behaviors = Vec::new();
            collect_behaviors(list, &[], &mut behaviors)?;
            for behavior in behaviors {
                self.insert(Definition::Behavior(behavior))?;
            }
        }

        Ok(())
    }

    fn insert(&mut self, definition: Definition) -> Result<(), DefinitionError> {
        let key = (definition.kind(), definition.name().to_string());
        if self.index.contains_key(&key) {
            return Err(DefinitionError::Duplicate {
                kind: key.0,
                name: key.1,
            });
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(definition);
        Ok(())
    }

    /// Check that every reference resolves; reports the first dangling one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for entry in &self.entries {
            for (target_kind, target) in entry.references() {
                if !self.contains(target_kind, target) {
                    return Err(ValidationError {
                        from_kind: entry.kind(),
                        from: entry.name().to_string(),
                        target_kind,
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, kind: EntryKind, name: &str) -> bool {
        self.index.contains_key(&(kind, name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        match self.get(EntryKind::Action, name)? {
            Definition::Action(action) => Some(action),
            Definition::Behavior(_) => None,
        }
    }

    pub fn behavior(&self, name: &str) -> Option<&BehaviorDef> {
        match self.get(EntryKind::Behavior, name)? {
            Definition::Behavior(behavior) => Some(behavior),
            Definition::Action(_) => None,
        }
    }

    fn get(&self, kind: EntryKind, name: &str) -> Option<&Definition> {
        let idx = self.index.get(&(kind, name.to_string()))?;
        self.entries.get(*idx)
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionDef> {
        self.entries.iter().filter_map(|entry| match entry {
            Definition::Action(action) => Some(action),
            Definition::Behavior(_) => None,
        })
    }

    /// Behaviors in document order.
    pub fn behaviors(&self) -> impl Iterator<Item = &BehaviorDef> {
        self.entries.iter().filter_map(|entry| match entry {
            Definition::Behavior(behavior) => Some(behavior),
            Definition::Action(_) => None,
        })
    }

    /// Behaviors a user may pick by name; `Hidden="true"` ones are left out.
    pub fn visible_behaviors(&self) -> impl Iterator<Item = &BehaviorDef> {
        self.behaviors().filter(|behavior| !behavior.hidden)
    }

    /// Pick and instantiate the next behavior for `mascot`.
    ///
    /// `parent` is the behavior that just finished, if any; its next list
    /// extends (or with `Add="false"` replaces) the global candidates.
    pub fn build_behavior<E, R>(
        &self,
        parent: Option<&str>,
        engine: &E,
        mascot: &MascotState,
        rng: &mut R,
    ) -> Result<Box<dyn Behavior>, BehaviorError>
    where
        E: BehaviorEngine + ?Sized,
        R: Rng + ?Sized,
    {
        match self.select_behavior(parent, engine, mascot, rng)? {
            Some(selected) => engine.instantiate(selected, self),
            None => self.behavior_named(FALLBACK_BEHAVIOR, engine),
        }
    }

    /// Instantiate one behavior by name.
    pub fn behavior_named<E>(&self, name: &str, engine: &E) -> Result<Box<dyn Behavior>, BehaviorError>
    where
        E: BehaviorEngine + ?Sized,
    {
        let def = self
            .behavior(name)
            .ok_or_else(|| BehaviorError::instantiation(name, "no behavior with this name"))?;
        engine.instantiate(def, self)
    }

    /// Weighted draw over effective candidates. `None` when the total weight is zero.
    pub fn select_behavior<E, R>(
        &self,
        parent: Option<&str>,
        engine: &E,
        mascot: &MascotState,
        rng: &mut R,
    ) -> Result<Option<&BehaviorDef>, BehaviorError>
    where
        E: BehaviorEngine + ?Sized,
        R: Rng + ?Sized,
    {
        let mut candidates: Vec<(&BehaviorDef, u32)> = self
            .behaviors()
            .filter(|def| engine.is_effective(&def.conditions, mascot))
            .map(|def| (def, def.frequency))
            .collect();

        if let Some(parent) = parent {
            let previous = self.behavior(parent).ok_or_else(|| {
                BehaviorError::instantiation(parent, "previous behavior is not defined")
            })?;
            if let Some(next) = &previous.next {
                if !next.additive {
                    candidates.clear();
                }
                for reference in &next.references {
                    let Some(def) = self.behavior(&reference.name) else {
                        continue;
                    };
                    if engine.is_effective(&reference.conditions, mascot) {
                        candidates.push((def, reference.frequency.unwrap_or(def.frequency)));
                    }
                }
            }
        }

        let total: u64 = candidates.iter().map(|(_, freq)| u64::from(*freq)).sum();
        if total == 0 {
            return Ok(None);
        }

        let mut roll = rng.gen_range(0..total);
        for (def, freq) in candidates {
            let freq = u64::from(freq);
            if roll < freq {
                return Ok(Some(def));
            }
            roll -= freq;
        }
        Ok(None)
    }
}
