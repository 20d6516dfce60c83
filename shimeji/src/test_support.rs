//! Test-only fixtures: on-disk layouts, scripted engines and shells.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::behavior::{Behavior, BehaviorEngine, Step};
use crate::core::configuration::Configuration;
use crate::core::definitions::BehaviorDef;
use crate::core::types::{ImageSetId, MascotId};
use crate::error::{BehaviorError, TrayError};
use crate::io::document::parse_entry;
use crate::io::paths::{DocumentKind, Layout};
use crate::mascot::MascotState;
use crate::shell::Shell;

/// Shared default actions document.
pub const ACTIONS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Mascot xmlns="http://www.group-finity.com/Mascot">
  <ActionList>
    <Action Name="Stand" Type="Stay" Duration="50"/>
    <Action Name="Walk" Type="Move" Duration="80"/>
    <Action Name="Fall" Type="Embedded"/>
    <Action Name="ChaseMouse" Type="Move"/>
    <Action Name="SitAndLook" Type="Sequence">
      <ActionReference Name="Stand"/>
    </Action>
  </ActionList>
</Mascot>
"#;

/// Shared default behaviors document. `Stand` is the only root candidate and
/// is always followed by `Walk`.
pub const BEHAVIORS_XML: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<Mascot xmlns="http://www.group-finity.com/Mascot">
  <BehaviorList>
    <Behavior Name="Stand" Frequency="100">
      <NextBehaviorList Add="false">
        <BehaviorReference Name="Walk" Frequency="1"/>
      </NextBehaviorList>
    </Behavior>
    <Behavior Name="Walk" Frequency="0"/>
    <Behavior Name="Fall" Frequency="0" Hidden="true"/>
    <Condition Condition="#{mascot.environment.cursor != null}">
      <Behavior Name="ChaseMouse" Frequency="0"/>
    </Condition>
    <Behavior Name="SitDown" Action="SitAndLook" Frequency="0"/>
  </BehaviorList>
</Mascot>
"##;

/// Parse, merge and validate two documents, panicking on any failure.
pub fn configuration_from_xml(actions: &str, behaviors: &str) -> Configuration {
    let mut configuration = Configuration::new();
    configuration
        .load(&parse_entry(actions).expect("parse actions"))
        .expect("load actions");
    configuration
        .load(&parse_entry(behaviors).expect("parse behaviors"))
        .expect("load behaviors");
    configuration.validate().expect("validate");
    configuration
}

/// Temporary installation root with `conf/` and `img/`.
pub struct TestLayout {
    temp: TempDir,
}

impl TestLayout {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        fs::create_dir_all(temp.path().join("conf")).context("create conf")?;
        fs::create_dir_all(temp.path().join("img")).context("create img")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.temp.path())
    }

    /// Write the shared default documents under `conf/`.
    pub fn write_default_documents(&self) -> Result<()> {
        write(&self.path().join("conf/actions.xml"), ACTIONS_XML)?;
        write(&self.path().join("conf/behaviors.xml"), BEHAVIORS_XML)
    }

    /// Write a per-set override under `conf/<set>/`.
    pub fn write_set_document(&self, set: &str, document: DocumentKind, xml: &str) -> Result<()> {
        write(
            &self.path().join("conf").join(set).join(document.file_name()),
            xml,
        )
    }

    /// Create `img/<set>/` so the set is offered for selection.
    pub fn add_image_set(&self, set: &str) -> Result<()> {
        fs::create_dir_all(self.path().join("img").join(set)).context("create image set dir")
    }

    pub fn write_settings(&self, contents: &str) -> Result<()> {
        write(&self.path().join("conf/settings.properties"), contents)
    }

    pub fn write_icon(&self) -> Result<()> {
        write(&self.path().join("img/icon.png"), "png")
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("missing parent for {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

/// Failure injected by a [`ScriptedEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Instantiate,
    Fatal,
    Unclassified,
}

#[derive(Debug, Clone)]
struct FailureRule {
    behavior: String,
    image_set: Option<ImageSetId>,
    failure: Failure,
}

impl FailureRule {
    fn matches(&self, behavior: &str, image_set: &ImageSetId) -> bool {
        self.behavior == behavior && self.image_set.as_ref().is_none_or(|set| set == image_set)
    }
}

fn to_error(failure: Failure, behavior: &str) -> BehaviorError {
    match failure {
        Failure::Instantiate => BehaviorError::instantiation(behavior, "scripted failure"),
        Failure::Fatal => BehaviorError::CantBeAlive(format!("scripted: {behavior}")),
        Failure::Unclassified => BehaviorError::Other(anyhow!("scripted: {behavior}")),
    }
}

/// Engine whose failures and timing are scripted per behavior.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    false_conditions: HashSet<String>,
    init_failures: Vec<FailureRule>,
    tick_failures: Vec<FailureRule>,
    finish_after: Option<u32>,
    disposed: Rc<RefCell<Vec<MascotId>>>,
}

impl ScriptedEngine {
    /// Condition expression that always evaluates to false.
    pub fn with_false_condition(mut self, condition: &str) -> Self {
        self.false_conditions.insert(condition.to_string());
        self
    }

    /// Fail building or initializing `behavior` for every image set.
    pub fn failing(mut self, behavior: &str, failure: Failure) -> Self {
        self.init_failures.push(FailureRule {
            behavior: behavior.to_string(),
            image_set: None,
            failure,
        });
        self
    }

    /// Fail initializing `behavior` only for mascots of `image_set`.
    pub fn failing_for(mut self, behavior: &str, image_set: &str, failure: Failure) -> Self {
        self.init_failures.push(FailureRule {
            behavior: behavior.to_string(),
            image_set: Some(ImageSetId::new(image_set)),
            failure,
        });
        self
    }

    /// Fail every tick of `behavior`.
    pub fn failing_tick(mut self, behavior: &str, failure: Failure) -> Self {
        self.tick_failures.push(FailureRule {
            behavior: behavior.to_string(),
            image_set: None,
            failure,
        });
        self
    }

    /// Behaviors finish after `ticks` steps instead of running forever.
    pub fn finishing_after(mut self, ticks: u32) -> Self {
        self.finish_after = Some(ticks);
        self
    }

    /// Mascots torn down through the engine's dispose hook, in order.
    pub fn disposed(&self) -> Vec<MascotId> {
        self.disposed.borrow().clone()
    }
}

impl BehaviorEngine for ScriptedEngine {
    fn is_effective(&self, conditions: &[String], _mascot: &MascotState) -> bool {
        !conditions
            .iter()
            .any(|condition| self.false_conditions.contains(condition))
    }

    fn instantiate(
        &self,
        behavior: &BehaviorDef,
        _configuration: &Configuration,
    ) -> Result<Box<dyn Behavior>, BehaviorError> {
        let global_failure = self.init_failures.iter().find(|rule| {
            rule.behavior == behavior.name
                && rule.image_set.is_none()
                && rule.failure == Failure::Instantiate
        });
        if let Some(rule) = global_failure {
            return Err(to_error(rule.failure, &behavior.name));
        }
        Ok(Box::new(ScriptedBehavior {
            name: behavior.name.clone(),
            init_failures: self.init_failures.clone(),
            tick_failures: self.tick_failures.clone(),
            finish_after: self.finish_after,
            ticks: 0,
        }))
    }

    fn dispose(&self, mascot: &MascotState) {
        self.disposed.borrow_mut().push(mascot.id);
    }
}

#[derive(Debug)]
struct ScriptedBehavior {
    name: String,
    init_failures: Vec<FailureRule>,
    tick_failures: Vec<FailureRule>,
    finish_after: Option<u32>,
    ticks: u32,
}

impl Behavior for ScriptedBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, mascot: &mut MascotState) -> Result<(), BehaviorError> {
        match self
            .init_failures
            .iter()
            .find(|rule| rule.matches(&self.name, &mascot.image_set))
        {
            Some(rule) => Err(to_error(rule.failure, &self.name)),
            None => Ok(()),
        }
    }

    fn next(&mut self, mascot: &mut MascotState) -> Result<Step, BehaviorError> {
        if let Some(rule) = self
            .tick_failures
            .iter()
            .find(|rule| rule.matches(&self.name, &mascot.image_set))
        {
            return Err(to_error(rule.failure, &self.name));
        }
        self.ticks += 1;
        match self.finish_after {
            Some(limit) if self.ticks >= limit => Ok(Step::Finished),
            _ => Ok(Step::Continue),
        }
    }
}

/// How a [`ScriptedShell`] answers `install_tray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrayScript {
    #[default]
    Installed,
    Unsupported,
    MissingIcon,
}

/// Shell that answers selection prompts from a queue and records errors.
#[derive(Debug, Default)]
pub struct ScriptedShell {
    choices: VecDeque<Option<Vec<ImageSetId>>>,
    tray: TrayScript,
    /// Lists offered to each selection prompt.
    pub offered: Vec<Vec<ImageSetId>>,
    /// Messages passed to `show_error`.
    pub errors: Vec<String>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next selection prompt; `None` cancels.
    pub fn with_choice(mut self, choice: Option<&[&str]>) -> Self {
        self.choices.push_back(
            choice.map(|names| names.iter().copied().map(ImageSetId::new).collect()),
        );
        self
    }

    pub fn with_tray(mut self, tray: TrayScript) -> Self {
        self.tray = tray;
        self
    }
}

impl Shell for ScriptedShell {
    fn choose_image_sets(&mut self, available: &[ImageSetId]) -> Option<Vec<ImageSetId>> {
        self.offered.push(available.to_vec());
        self.choices.pop_front().flatten()
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn install_tray(&mut self, layout: &Layout) -> Result<(), TrayError> {
        match self.tray {
            TrayScript::Installed => Ok(()),
            TrayScript::Unsupported => Err(TrayError::Unsupported),
            TrayScript::MissingIcon => Err(TrayError::Icon {
                path: layout.icon_path.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}
