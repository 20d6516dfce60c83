//! Session-level tests driving `App` through startup, commands, ticks and
//! reconfiguration with scripted collaborators.

use rand::SeedableRng;
use rand::rngs::StdRng;

use shimeji::app::{App, ExitReason, Flow};
use shimeji::command::{Command, ConsoleLine, parse_line};
use shimeji::core::types::ImageSetId;
use shimeji::io::config::RuntimeConfig;
use shimeji::io::settings::load_settings;
use shimeji::test_support::{Failure, ScriptedEngine, ScriptedShell, TestLayout};

fn command(line: &str) -> Command {
    match parse_line(line).expect("parse").expect("non-empty") {
        ConsoleLine::Command(command) => command,
        other => panic!("expected command, got {other:?}"),
    }
}

fn image_sets(app: &App<ScriptedEngine, ScriptedShell>) -> Vec<String> {
    app.supervisor()
        .mascots()
        .map(|mascot| mascot.image_set().to_string())
        .collect()
}

/// Full session: startup with a prompt, growth, broadcast, reduction,
/// reconfiguration and finally the last mascot closing the app.
///
/// Sequence:
/// 1. No saved selection → prompt → `set1` chosen and saved.
/// 2. `random` twice, `spawn set1` → 4 mascots.
/// 3. `gather` → every mascot chases the mouse.
/// 4. `one` → oldest mascot survives.
/// 5. `select set2/set3` → population replaced, policy restored, saved.
/// 6. Ticks advance behaviors (`Stand` → `Walk`).
/// 7. `clear` → population empty → exit.
#[test]
fn full_session_from_prompt_to_last_mascot() {
    let layout = TestLayout::new().expect("layout");
    layout.write_default_documents().expect("defaults");
    for set in ["set1", "set2", "set3"] {
        layout.add_image_set(set).expect("image set");
    }

    let shell = ScriptedShell::new().with_choice(Some(&["set1"]));
    let engine = ScriptedEngine::default().finishing_after(2);
    let mut app = App::new(
        layout.layout(),
        RuntimeConfig::default(),
        engine,
        shell,
        StdRng::seed_from_u64(42),
    );

    assert_eq!(app.startup(), Flow::Continue);
    assert_eq!(image_sets(&app), vec!["set1"]);
    assert_eq!(
        load_settings(&layout.layout().settings_path).active_image_sets(),
        vec![ImageSetId::new("set1")]
    );

    for line in ["random", "random", "spawn set1"] {
        assert_eq!(app.handle(command(line)), Flow::Continue);
    }
    assert_eq!(app.supervisor().len(), 4);

    assert_eq!(app.handle(command("gather")), Flow::Continue);
    assert!(
        app.supervisor()
            .mascots()
            .all(|mascot| mascot.behavior_name() == "ChaseMouse")
    );

    let oldest = app.supervisor().mascots().next().expect("mascot").id();
    assert_eq!(app.handle(command("one")), Flow::Continue);
    assert_eq!(app.supervisor().len(), 1);
    assert!(app.supervisor().get(oldest).is_some());

    assert_eq!(app.handle(command("select set2/set3")), Flow::Continue);
    assert_eq!(image_sets(&app), vec!["set2", "set3"]);
    assert!(app.supervisor().exit_policy().is_exit_on_last_removed());
    assert_eq!(
        load_settings(&layout.layout().settings_path).active_image_sets(),
        vec![ImageSetId::new("set2"), ImageSetId::new("set3")]
    );

    assert_eq!(app.tick(), Flow::Continue);
    assert_eq!(app.tick(), Flow::Continue);
    assert!(
        app.supervisor()
            .mascots()
            .all(|mascot| mascot.behavior_name() == "Walk")
    );

    assert_eq!(app.handle(command("clear")), Flow::Exit);
    assert_eq!(app.exit_reason(), Some(ExitReason::PopulationEmpty));
}

/// A mascot that cannot stay alive during a tick is removed; the rest keep
/// running and the app only exits once the last one is gone.
#[test]
fn failing_mascots_are_contained_until_last_one() {
    let layout = TestLayout::new().expect("layout");
    layout.write_default_documents().expect("defaults");
    layout
        .write_settings("ActiveShimeji=good/bad\n")
        .expect("settings");

    let engine = ScriptedEngine::default().failing_for("ChaseMouse", "bad", Failure::Fatal);
    let mut app = App::new(
        layout.layout(),
        RuntimeConfig::default(),
        engine,
        ScriptedShell::new(),
        StdRng::seed_from_u64(1),
    );

    assert_eq!(app.startup(), Flow::Continue);
    assert_eq!(image_sets(&app), vec!["good", "bad"]);

    assert_eq!(app.handle(Command::Gather), Flow::Continue);
    assert_eq!(image_sets(&app), vec!["good"]);
    assert_eq!(app.supervisor().engine().disposed().len(), 1);

    assert_eq!(app.handle(Command::ReduceToOne), Flow::Continue);
    assert_eq!(app.handle(Command::Exit), Flow::Exit);
    assert_eq!(app.exit_reason(), Some(ExitReason::Requested));
}
