//! Typed views of action and behavior entries.
//!
//! Only the attributes the core needs (names, references, frequencies) are
//! interpreted. The raw [`Entry`] is kept on every definition for the
//! behavior engine.

use crate::core::types::EntryKind;
use crate::entry::Entry;
use crate::error::DefinitionError;

pub const MASCOT: &str = "Mascot";
pub const ACTION_LIST: &str = "ActionList";
pub const ACTION: &str = "Action";
pub const ACTION_REFERENCE: &str = "ActionReference";
pub const BEHAVIOR_LIST: &str = "BehaviorList";
pub const BEHAVIOR: &str = "Behavior";
pub const CONDITION: &str = "Condition";
pub const NEXT_BEHAVIOR_LIST: &str = "NextBehaviorList";
pub const BEHAVIOR_REFERENCE: &str = "BehaviorReference";

/// A named action from the actions document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    pub name: String,
    pub action_type: Option<String>,
    /// Length in ticks, when the definition states one.
    pub duration: Option<u32>,
    /// Names of actions referenced anywhere inside this action.
    pub references: Vec<String>,
    pub entry: Entry,
}

impl ActionDef {
    pub fn from_entry(entry: &Entry) -> Result<Self, DefinitionError> {
        let name = required_name(entry)?;
        let duration = optional_u32(entry, &name, "Duration")?;
        let references = entry
            .descendants()
            .into_iter()
            .filter(|node| node.name == ACTION_REFERENCE)
            .map(required_name)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            action_type: entry.attribute("Type").map(str::to_string),
            name,
            duration,
            references,
            entry: entry.clone(),
        })
    }
}

/// A named behavior from the behaviors document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorDef {
    pub name: String,
    pub frequency: u32,
    pub hidden: bool,
    /// Action this behavior runs; defaults to the behavior's own name.
    pub action: String,
    /// Condition expressions inherited from enclosing groups, then its own.
    pub conditions: Vec<String>,
    pub next: Option<NextBehaviors>,
    pub entry: Entry,
}

/// Follow-up candidates declared by a behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextBehaviors {
    /// `true` adds these to the global candidates, `false` replaces them.
    pub additive: bool,
    pub references: Vec<BehaviorRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorRef {
    pub name: String,
    /// Overrides the referenced behavior's own frequency when present.
    pub frequency: Option<u32>,
    pub conditions: Vec<String>,
}

impl BehaviorDef {
    pub fn from_entry(entry: &Entry, inherited: &[String]) -> Result<Self, DefinitionError> {
        let name = required_name(entry)?;
        let frequency = optional_u32(entry, &name, "Frequency")?.unwrap_or(0);
        let hidden = optional_bool(entry, &name, "Hidden")?.unwrap_or(false);
        let action = entry
            .attribute("Action")
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());

        let mut conditions = inherited.to_vec();
        if let Some(own) = entry.attribute(CONDITION) {
            conditions.push(own.to_string());
        }

        let next = match entry.select_children(NEXT_BEHAVIOR_LIST).next() {
            Some(list) => Some(NextBehaviors {
                additive: optional_bool(list, &name, "Add")?.unwrap_or(true),
                references: collect_behavior_refs(list, &[])?,
            }),
            None => None,
        };

        Ok(Self {
            name,
            frequency,
            hidden,
            action,
            conditions,
            next,
            entry: entry.clone(),
        })
    }
}

fn collect_behavior_refs(
    list: &Entry,
    inherited: &[String],
) -> Result<Vec<BehaviorRef>, DefinitionError> {
    let mut refs = Vec::new();
    for child in &list.children {
        match child.name.as_str() {
            BEHAVIOR_REFERENCE => {
                let name = required_name(child)?;
                let frequency = optional_u32(child, &name, "Frequency")?;
                refs.push(BehaviorRef {
                    name,
                    frequency,
                    conditions: inherited.to_vec(),
                });
            }
            CONDITION => {
                let nested = with_condition(inherited, child);
                refs.extend(collect_behavior_refs(child, &nested)?);
            }
            _ => {}
        }
    }
    Ok(refs)
}

/// Walk a `BehaviorList` (or `Condition` group), accumulating conditions.
pub fn collect_behaviors(
    list: &Entry,
    inherited: &[String],
    out: &mut Vec<BehaviorDef>,
) -> Result<(), DefinitionError> {
    for child in &list.children {
        match child.name.as_str() {
            BEHAVIOR => out.push(BehaviorDef::from_entry(child, inherited)?),
            CONDITION => {
                let nested = with_condition(inherited, child);
                collect_behaviors(child, &nested, out)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn with_condition(inherited: &[String], group: &Entry) -> Vec<String> {
    let mut nested = inherited.to_vec();
    if let Some(condition) = group.attribute(CONDITION) {
        nested.push(condition.to_string());
    }
    nested
}

/// One entry of the merged namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Action(ActionDef),
    Behavior(BehaviorDef),
}

impl Definition {
    pub fn kind(&self) -> EntryKind {
        match self {
            Definition::Action(_) => EntryKind::Action,
            Definition::Behavior(_) => EntryKind::Behavior,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Definition::Action(action) => &action.name,
            Definition::Behavior(behavior) => &behavior.name,
        }
    }

    /// Every (kind, name) this entry refers to, in declaration order.
    pub fn references(&self) -> Vec<(EntryKind, &str)> {
        match self {
            Definition::Action(action) => action
                .references
                .iter()
                .map(|name| (EntryKind::Action, name.as_str()))
                .collect(),
            Definition::Behavior(behavior) => {
                let mut refs = vec![(EntryKind::Action, behavior.action.as_str())];
                if let Some(next) = &behavior.next {
                    refs.extend(
                        next.references
                            .iter()
                            .map(|r| (EntryKind::Behavior, r.name.as_str())),
                    );
                }
                refs
            }
        }
    }
}

fn required_name(entry: &Entry) -> Result<String, DefinitionError> {
    entry
        .attribute("Name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DefinitionError::MissingAttribute {
            element: entry.name.clone(),
            attribute: "Name",
        })
}

fn optional_u32(
    entry: &Entry,
    name: &str,
    attribute: &'static str,
) -> Result<Option<u32>, DefinitionError> {
    let Some(raw) = entry.attribute(attribute) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| invalid(entry, name, attribute, raw))
}

fn optional_bool(
    entry: &Entry,
    name: &str,
    attribute: &'static str,
) -> Result<Option<bool>, DefinitionError> {
    let Some(raw) = entry.attribute(attribute) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        _ => Err(invalid(entry, name, attribute, raw)),
    }
}

fn invalid(entry: &Entry, name: &str, attribute: &'static str, value: &str) -> DefinitionError {
    DefinitionError::InvalidAttribute {
        element: entry.name.clone(),
        name: name.to_string(),
        attribute,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavior_action_defaults_to_own_name() {
        let entry = Entry::new(BEHAVIOR)
            .with_attribute("Name", "Walk")
            .with_attribute("Frequency", "10");
        let behavior = BehaviorDef::from_entry(&entry, &[]).expect("behavior");
        assert_eq!(behavior.action, "Walk");
        assert_eq!(behavior.frequency, 10);
        assert!(behavior.next.is_none());
    }

    #[test]
    fn conditions_accumulate_through_nested_groups() {
        let list = Entry::new(BEHAVIOR_LIST).with_child(
            Entry::new(CONDITION)
                .with_attribute(CONDITION, "outer")
                .with_child(
                    Entry::new(CONDITION)
                        .with_attribute(CONDITION, "inner")
                        .with_child(
                            Entry::new(BEHAVIOR)
                                .with_attribute("Name", "Sit")
                                .with_attribute(CONDITION, "own"),
                        ),
                ),
        );
        let mut out = Vec::new();
        collect_behaviors(&list, &[], &mut out).expect("collect");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].conditions, vec!["outer", "inner", "own"]);
    }

    #[test]
    fn next_list_collects_references_and_add_flag() {
        let entry = Entry::new(BEHAVIOR).with_attribute("Name", "Fall").with_child(
            Entry::new(NEXT_BEHAVIOR_LIST)
                .with_attribute("Add", "false")
                .with_child(
                    Entry::new(BEHAVIOR_REFERENCE)
                        .with_attribute("Name", "Stand")
                        .with_attribute("Frequency", "5"),
                )
                .with_child(
                    Entry::new(CONDITION)
                        .with_attribute(CONDITION, "onFloor")
                        .with_child(Entry::new(BEHAVIOR_REFERENCE).with_attribute("Name", "Walk")),
                ),
        );
        let behavior = BehaviorDef::from_entry(&entry, &[]).expect("behavior");
        let next = behavior.next.expect("next list");
        assert!(!next.additive);
        assert_eq!(next.references.len(), 2);
        assert_eq!(next.references[0].frequency, Some(5));
        assert_eq!(next.references[1].conditions, vec!["onFloor"]);
    }

    #[test]
    fn action_references_include_nested_inline_actions() {
        let entry = Entry::new(ACTION)
            .with_attribute("Name", "Walk")
            .with_attribute("Type", "Sequence")
            .with_child(Entry::new(ACTION_REFERENCE).with_attribute("Name", "Stand"))
            .with_child(
                Entry::new(ACTION)
                    .with_attribute("Name", "Inline")
                    .with_child(Entry::new(ACTION_REFERENCE).with_attribute("Name", "Sit")),
            );
        let action = ActionDef::from_entry(&entry).expect("action");
        assert_eq!(action.references, vec!["Stand", "Sit"]);
        assert_eq!(action.action_type.as_deref(), Some("Sequence"));
    }

    #[test]
    fn invalid_frequency_is_rejected() {
        let entry = Entry::new(BEHAVIOR)
            .with_attribute("Name", "Walk")
            .with_attribute("Frequency", "often");
        let err = BehaviorDef::from_entry(&entry, &[]).expect_err("invalid");
        assert!(matches!(
            err,
            DefinitionError::InvalidAttribute {
                attribute: "Frequency",
                ..
            }
        ));
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = ActionDef::from_entry(&Entry::new(ACTION)).expect_err("missing name");
        assert_eq!(
            err,
            DefinitionError::MissingAttribute {
                element: ACTION.to_string(),
                attribute: "Name"
            }
        );
    }
}
