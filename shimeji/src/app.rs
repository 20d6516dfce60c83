//! Application context: bootstrap, command dispatch and reconfiguration.
//!
//! [`App`] owns everything that lives for the whole session: settings, the
//! active image set list, the configuration registry, the supervisor and the
//! shell. Every handler returns a [`Flow`]; once it is [`Flow::Exit`] the
//! caller stops driving the app and reads [`App::exit_reason`].

use anyhow::Error;
use rand::rngs::StdRng;
use tracing::{error, info, warn};

use crate::behavior::BehaviorEngine;
use crate::command::Command;
use crate::core::types::{ImageSetId, MascotId, Platform};
use crate::error::{SpawnError, TrayError};
use crate::io::config::RuntimeConfig;
use crate::io::paths::Layout;
use crate::io::settings::{Settings, load_settings, write_settings};
use crate::registry::ConfigurationRegistry;
use crate::shell::Shell;
use crate::supervisor::{Disposal, Supervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `Exit` command or end of input.
    Requested,
    /// The last mascot was removed while exit-on-last-removed was active.
    PopulationEmpty,
    /// Configuration could not be loaded or the tray icon could not be read.
    Fatal,
    /// The user cancelled the initial selection.
    Cancelled,
}

impl ExitReason {
    pub fn is_fatal(self) -> bool {
        matches!(self, ExitReason::Fatal)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            ExitReason::Requested => "requested",
            ExitReason::PopulationEmpty => "population_empty",
            ExitReason::Fatal => "fatal",
            ExitReason::Cancelled => "cancelled",
        }
    }
}

pub struct App<E: BehaviorEngine, S: Shell> {
    layout: Layout,
    runtime: RuntimeConfig,
    platform: Platform,
    settings: Settings,
    image_sets: Vec<ImageSetId>,
    registry: ConfigurationRegistry,
    supervisor: Supervisor<E>,
    shell: S,
    exit_reason: Option<ExitReason>,
}

impl<E: BehaviorEngine, S: Shell> App<E, S> {
    pub fn new(layout: Layout, runtime: RuntimeConfig, engine: E, shell: S, rng: StdRng) -> Self {
        Self {
            registry: ConfigurationRegistry::new(layout.clone()),
            layout,
            runtime,
            platform: Platform::detect(),
            settings: Settings::default(),
            image_sets: Vec::new(),
            supervisor: Supervisor::new(engine, rng),
            shell,
            exit_reason: None,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The active image set list, in selection order.
    pub fn image_sets(&self) -> &[ImageSetId] {
        &self.image_sets
    }

    pub fn registry(&self) -> &ConfigurationRegistry {
        &self.registry
    }

    pub fn supervisor(&self) -> &Supervisor<E> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut Supervisor<E> {
        &mut self.supervisor
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Bring the session up: selection, configuration, tray, one mascot per
    /// active image set, then start the supervisor.
    pub fn startup(&mut self) -> Flow {
        self.platform = Platform::detect();
        info!(platform = ?self.platform, root = %self.layout.root.display(), "starting");

        self.settings = load_settings(&self.layout.settings_path);
        let mut image_sets = self.settings.active_image_sets();
        if image_sets.is_empty() {
            match self.prompt_selection() {
                Some(chosen) => {
                    self.persist_selection(&chosen);
                    image_sets = chosen;
                }
                None => {
                    info!("image set selection cancelled");
                    return self.exit(ExitReason::Cancelled);
                }
            }
        }

        match ConfigurationRegistry::load_all(self.layout.clone(), &image_sets) {
            Ok(registry) => self.registry = registry,
            Err(err) => return self.fatal(err),
        }

        match self.shell.install_tray(&self.layout) {
            Ok(()) => {}
            Err(TrayError::Unsupported) => {
                warn!("tray unsupported; exiting when the last mascot is removed");
                self.supervisor
                    .exit_policy_mut()
                    .set_exit_on_last_removed(true);
            }
            Err(err) => return self.fatal(err),
        }

        self.image_sets = image_sets;
        self.spawn_active();
        self.supervisor.start();
        Flow::Continue
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::CreateRandomMascot => {
                let result = self
                    .supervisor
                    .spawn_random(&self.registry, &self.image_sets);
                self.report_spawn(result);
                Flow::Continue
            }
            Command::CreateNamedMascot(image_set) => {
                let result = self.supervisor.spawn_named(&self.registry, &image_set);
                self.report_spawn(result);
                Flow::Continue
            }
            Command::BroadcastBehavior(name) => self.broadcast(&name),
            Command::Gather => {
                let name = self.runtime.gather_behavior.clone();
                self.broadcast(&name)
            }
            Command::ReduceToOne => {
                let disposal = self.supervisor.reduce_to_one();
                self.settle(disposal)
            }
            Command::DisposeAll => {
                let disposal = self.supervisor.dispose_all();
                self.settle(disposal)
            }
            Command::DisposeMascot(id) => match self.supervisor.dispose(id) {
                Some(disposal) => self.settle(disposal),
                None => {
                    self.shell.show_error(&format!("no live mascot {id}"));
                    Flow::Continue
                }
            },
            Command::Reconfigure => self.reconfigure(None),
            Command::SetActiveImageSets(list) => self.reconfigure(Some(list)),
            Command::Exit => self.exit(ExitReason::Requested),
        }
    }

    /// Advance every mascot once.
    pub fn tick(&mut self) -> Flow {
        let report = self.supervisor.tick();
        self.settle(report.disposal)
    }

    /// Dispose everything, stop the supervisor and record `reason`.
    pub fn exit(&mut self, reason: ExitReason) -> Flow {
        self.supervisor.dispose_all();
        self.supervisor.stop();
        if self.exit_reason.is_none() {
            self.exit_reason = Some(reason);
        }
        info!(reason = reason.as_label(), "exiting");
        Flow::Exit
    }

    /// Replace the population with one mascot per image set of the new list.
    ///
    /// `requested` of `None` asks the shell. A cancelled prompt or an empty
    /// list keeps the previous list. The exit policy is suspended while the
    /// population is empty.
    fn reconfigure(&mut self, requested: Option<Vec<ImageSetId>>) -> Flow {
        let prior = self.supervisor.exit_policy_mut().suspend();
        self.supervisor.dispose_all();

        let chosen = match requested {
            Some(list) => Some(list).filter(|list| !list.is_empty()),
            None => self.prompt_selection(),
        };
        let image_sets = chosen.unwrap_or_else(|| {
            info!("selection unchanged; keeping previous image sets");
            self.image_sets.clone()
        });

        match ConfigurationRegistry::load_all(self.layout.clone(), &image_sets) {
            Ok(registry) => self.registry = registry,
            Err(err) => {
                self.supervisor.exit_policy_mut().restore(prior);
                return self.fatal(err);
            }
        }

        if image_sets != self.image_sets {
            self.persist_selection(&image_sets);
        }
        self.image_sets = image_sets;
        self.spawn_active();
        self.supervisor.exit_policy_mut().restore(prior);
        info!(image_sets = self.image_sets.len(), mascots = self.supervisor.len(), "reconfigured");
        Flow::Continue
    }

    fn prompt_selection(&mut self) -> Option<Vec<ImageSetId>> {
        let available = self.layout.available_image_sets().unwrap_or_else(|err| {
            warn!(error = %format!("{err:#}"), "listing image sets failed");
            Vec::new()
        });
        self.shell
            .choose_image_sets(&available)
            .filter(|chosen| !chosen.is_empty())
    }

    fn persist_selection(&mut self, image_sets: &[ImageSetId]) {
        self.settings.set_active_image_sets(image_sets);
        if let Err(err) = write_settings(&self.layout.settings_path, &self.settings) {
            warn!(error = %format!("{err:#}"), "could not save image set selection");
        }
    }

    /// One mascot per active image set, in order. Failures are contained.
    fn spawn_active(&mut self) {
        for image_set in &self.image_sets {
            if let Err(err) = self.supervisor.spawn_named(&self.registry, image_set) {
                error!(image_set = %image_set, error = %err, label = err.as_label(), "could not create mascot");
                self.shell.show_error(&format!("{:#}", Error::from(err)));
            }
        }
    }

    /// Names of the non-hidden behaviors defined by any active image set, sorted.
    pub fn behavior_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .image_sets
            .iter()
            .filter_map(|image_set| self.registry.configuration(image_set))
            .flat_map(|configuration| {
                configuration
                    .visible_behaviors()
                    .map(|behavior| behavior.name.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn broadcast(&mut self, name: &str) -> Flow {
        let report = self.supervisor.broadcast_behavior(name);
        if report.applied == 0 && !report.failures.is_empty() {
            self.shell
                .show_error(&format!("behavior '{name}' could not be applied"));
        }
        self.settle(report.disposal)
    }

    fn report_spawn(&mut self, result: Result<MascotId, SpawnError>) {
        if let Err(err) = result {
            warn!(error = %err, label = err.as_label(), "mascot not created");
            self.shell.show_error(&format!("{:#}", Error::from(err)));
        }
    }

    fn settle(&mut self, disposal: Disposal) -> Flow {
        if disposal.terminate {
            self.exit(ExitReason::PopulationEmpty)
        } else {
            Flow::Continue
        }
    }

    fn fatal(&mut self, err: impl Into<Error>) -> Flow {
        let err = err.into();
        let message = format!("{err:#}");
        error!(error = %message, "fatal error");
        self.shell.show_error(&message);
        self.exit(ExitReason::Fatal)
    }
}

impl<E: BehaviorEngine, S: Shell> std::fmt::Debug for App<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.layout.root)
            .field("image_sets", &self.image_sets)
            .field("supervisor", &self.supervisor)
            .field("exit_reason", &self.exit_reason)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::paths::DocumentKind;
    use crate::test_support::{Failure, ScriptedEngine, ScriptedShell, TestLayout, TrayScript};
    use rand::SeedableRng;

    fn app(layout: &TestLayout, shell: ScriptedShell) -> App<ScriptedEngine, ScriptedShell> {
        App::new(
            layout.layout(),
            RuntimeConfig::default(),
            ScriptedEngine::default(),
            shell,
            StdRng::seed_from_u64(5),
        )
    }

    fn fixture(sets: &[&str]) -> TestLayout {
        let layout = TestLayout::new().expect("layout");
        layout.write_default_documents().expect("defaults");
        for set in sets {
            layout.add_image_set(set).expect("image set");
        }
        layout
    }

    fn population(app: &App<ScriptedEngine, ScriptedShell>) -> Vec<String> {
        app.supervisor()
            .mascots()
            .map(|mascot| mascot.image_set().to_string())
            .collect()
    }

    fn ids(names: &[&str]) -> Vec<ImageSetId> {
        names.iter().copied().map(ImageSetId::new).collect()
    }

    #[test]
    fn startup_spawns_one_mascot_per_saved_image_set() {
        let layout = fixture(&["foo", "bar", "baz"]);
        layout
            .write_settings("ActiveShimeji=foo/bar/baz\n")
            .expect("settings");
        let mut app = app(&layout, ScriptedShell::new());

        assert_eq!(app.startup(), Flow::Continue);
        assert_eq!(app.image_sets(), ids(&["foo", "bar", "baz"]).as_slice());
        assert_eq!(population(&app), vec!["foo", "bar", "baz"]);
        assert!(app.supervisor().is_running());
        assert!(app.shell().offered.is_empty());
    }

    #[test]
    fn startup_without_selection_prompts_and_saves_choice() {
        let layout = fixture(&["beta", "alpha", "unused"]);
        layout.write_settings("ActiveShimeji=\n").expect("settings");
        let shell = ScriptedShell::new().with_choice(Some(&["beta"]));
        let mut app = app(&layout, shell);

        assert_eq!(app.startup(), Flow::Continue);
        assert_eq!(app.shell().offered, vec![ids(&["alpha", "beta"])]);
        assert_eq!(population(&app), vec!["beta"]);

        let saved = load_settings(&layout.layout().settings_path);
        assert_eq!(saved.active_image_sets(), ids(&["beta"]));
    }

    #[test]
    fn cancelled_initial_selection_exits() {
        let layout = fixture(&["alpha"]);
        let mut app = app(&layout, ScriptedShell::new().with_choice(None));

        assert_eq!(app.startup(), Flow::Exit);
        assert_eq!(app.exit_reason(), Some(ExitReason::Cancelled));
        assert!(app.supervisor().is_empty());
        assert!(!app.supervisor().is_running());
    }

    #[test]
    fn configuration_failure_at_startup_is_fatal() {
        let layout = TestLayout::new().expect("layout");
        layout.write_settings("ActiveShimeji=alpha\n").expect("settings");
        let mut app = app(&layout, ScriptedShell::new());

        assert_eq!(app.startup(), Flow::Exit);
        assert_eq!(app.exit_reason(), Some(ExitReason::Fatal));
        assert_eq!(app.shell().errors.len(), 1);
        assert!(app.shell().errors[0].contains("actions document"));
        assert!(app.supervisor().is_empty());
    }

    #[test]
    fn unreadable_tray_icon_is_fatal() {
        let layout = fixture(&["alpha"]);
        layout.write_settings("ActiveShimeji=alpha\n").expect("settings");
        let shell = ScriptedShell::new().with_tray(TrayScript::MissingIcon);
        let mut app = app(&layout, shell);

        assert_eq!(app.startup(), Flow::Exit);
        assert_eq!(app.exit_reason(), Some(ExitReason::Fatal));
        assert!(app.supervisor().is_empty());
    }

    #[test]
    fn unsupported_tray_forces_exit_on_last_removed() {
        let layout = fixture(&["alpha"]);
        layout.write_settings("ActiveShimeji=alpha\n").expect("settings");
        let shell = ScriptedShell::new().with_tray(TrayScript::Unsupported);
        let mut app = app(&layout, shell);
        app.supervisor_mut()
            .exit_policy_mut()
            .set_exit_on_last_removed(false);

        assert_eq!(app.startup(), Flow::Continue);
        assert!(app.supervisor().exit_policy().is_exit_on_last_removed());
        assert_eq!(app.handle(Command::DisposeAll), Flow::Exit);
        assert_eq!(app.exit_reason(), Some(ExitReason::PopulationEmpty));
    }

    #[test]
    fn reconfigure_replaces_population_and_restores_policy() {
        let layout = fixture(&["set1", "set2", "set3"]);
        layout.write_settings("ActiveShimeji=set1\n").expect("settings");
        let shell = ScriptedShell::new().with_choice(Some(&["set2", "set3"]));
        let mut app = app(&layout, shell);
        assert_eq!(app.startup(), Flow::Continue);
        assert_eq!(population(&app), vec!["set1"]);

        assert_eq!(app.handle(Command::Reconfigure), Flow::Continue);
        assert_eq!(population(&app), vec!["set2", "set3"]);
        assert!(app.supervisor().exit_policy().is_exit_on_last_removed());
        assert!(app.exit_reason().is_none());

        let saved = load_settings(&layout.layout().settings_path);
        assert_eq!(saved.active_image_sets(), ids(&["set2", "set3"]));
    }

    #[test]
    fn reconfigure_restores_a_disabled_exit_policy() {
        let layout = fixture(&["set1", "set2"]);
        layout.write_settings("ActiveShimeji=set1\n").expect("settings");
        let shell = ScriptedShell::new().with_choice(Some(&["set2"]));
        let mut app = app(&layout, shell);
        assert_eq!(app.startup(), Flow::Continue);
        app.supervisor_mut()
            .exit_policy_mut()
            .set_exit_on_last_removed(false);

        assert_eq!(app.handle(Command::Reconfigure), Flow::Continue);
        assert_eq!(population(&app), vec!["set2"]);
        assert!(!app.supervisor().exit_policy().is_exit_on_last_removed());

        assert_eq!(app.handle(Command::DisposeAll), Flow::Continue);
        assert!(app.exit_reason().is_none());
    }

    #[test]
    fn failed_spawns_are_reported_to_the_shell() {
        let layout = fixture(&["alpha"]);
        layout.write_settings("ActiveShimeji=alpha\n").expect("settings");
        let mut app = App::new(
            layout.layout(),
            RuntimeConfig::default(),
            ScriptedEngine::default().failing("Stand", Failure::Instantiate),
            ScriptedShell::new(),
            StdRng::seed_from_u64(5),
        );

        assert_eq!(app.startup(), Flow::Continue);
        assert!(app.supervisor().is_empty());
        assert_eq!(app.shell().errors.len(), 1);
        assert!(app.shell().errors[0].contains("Stand"));

        let flow = app.handle(Command::CreateNamedMascot(ImageSetId::new("alpha")));
        assert_eq!(flow, Flow::Continue);
        assert!(app.supervisor().is_empty());
        assert_eq!(app.shell().errors.len(), 2);

        app.handle(Command::CreateRandomMascot);
        assert_eq!(app.shell().errors.len(), 3);
    }

    #[test]
    fn behavior_names_skip_hidden_behaviors() {
        let layout = fixture(&["alpha", "beta"]);
        layout
            .write_settings("ActiveShimeji=alpha/beta\n")
            .expect("settings");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();

        assert_eq!(
            app.behavior_names(),
            vec!["ChaseMouse", "SitDown", "Stand", "Walk"]
        );
    }

    #[test]
    fn cancelled_reconfigure_keeps_previous_list() {
        let layout = fixture(&["set1", "set2"]);
        layout.write_settings("ActiveShimeji=set1\n").expect("settings");
        let shell = ScriptedShell::new().with_choice(None);
        let mut app = app(&layout, shell);
        assert_eq!(app.startup(), Flow::Continue);
        let original = app.supervisor().mascots().next().expect("mascot").id();

        assert_eq!(app.handle(Command::Reconfigure), Flow::Continue);
        assert_eq!(population(&app), vec!["set1"]);
        assert_ne!(app.supervisor().mascots().next().expect("mascot").id(), original);
        assert!(app.exit_reason().is_none());
    }

    #[test]
    fn set_active_image_sets_with_empty_list_keeps_previous() {
        let layout = fixture(&["set1"]);
        layout.write_settings("ActiveShimeji=set1\n").expect("settings");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();

        assert_eq!(
            app.handle(Command::SetActiveImageSets(Vec::new())),
            Flow::Continue
        );
        assert_eq!(population(&app), vec!["set1"]);
        assert!(app.shell().offered.is_empty());
    }

    #[test]
    fn reconfigure_with_broken_set_is_fatal() {
        let layout = fixture(&["set1", "broken"]);
        layout.write_settings("ActiveShimeji=set1\n").expect("settings");
        layout
            .write_set_document(
                "broken",
                DocumentKind::Behaviors,
                r#"<Mascot><BehaviorList><Behavior Name="Fly" Frequency="1"/></BehaviorList></Mascot>"#,
            )
            .expect("broken");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();

        assert_eq!(
            app.handle(Command::SetActiveImageSets(ids(&["broken"]))),
            Flow::Exit
        );
        assert_eq!(app.exit_reason(), Some(ExitReason::Fatal));
        assert!(app.supervisor().is_empty());
    }

    #[test]
    fn gather_broadcasts_configured_behavior() {
        let layout = fixture(&["alpha", "beta"]);
        layout
            .write_settings("ActiveShimeji=alpha/beta\n")
            .expect("settings");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();

        assert_eq!(app.handle(Command::Gather), Flow::Continue);
        assert!(
            app.supervisor()
                .mascots()
                .all(|mascot| mascot.behavior_name() == "ChaseMouse")
        );
    }

    #[test]
    fn named_spawn_of_unknown_set_reports_error() {
        let layout = fixture(&["alpha"]);
        layout.write_settings("ActiveShimeji=alpha\n").expect("settings");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();

        let flow = app.handle(Command::CreateNamedMascot(ImageSetId::new("ghost")));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(app.supervisor().len(), 1);
        assert_eq!(app.shell().errors.len(), 1);

        app.handle(Command::CreateRandomMascot);
        assert_eq!(app.supervisor().len(), 2);
    }

    #[test]
    fn exit_command_disposes_everything() {
        let layout = fixture(&["alpha"]);
        layout
            .write_settings("ActiveShimeji=alpha/alpha\n")
            .expect("settings");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();
        assert_eq!(app.supervisor().len(), 2);

        assert_eq!(app.handle(Command::Exit), Flow::Exit);
        assert_eq!(app.exit_reason(), Some(ExitReason::Requested));
        assert!(app.supervisor().is_empty());
        assert!(!app.supervisor().is_running());
    }

    #[test]
    fn closing_last_mascot_exits() {
        let layout = fixture(&["alpha"]);
        layout.write_settings("ActiveShimeji=alpha\n").expect("settings");
        let mut app = app(&layout, ScriptedShell::new());
        app.startup();
        let id = app.supervisor().mascots().next().expect("mascot").id();

        assert_eq!(
            app.handle(Command::DisposeMascot(MascotId(999))),
            Flow::Continue
        );
        assert_eq!(app.handle(Command::DisposeMascot(id)), Flow::Exit);
        assert_eq!(app.exit_reason(), Some(ExitReason::PopulationEmpty));
    }
}
