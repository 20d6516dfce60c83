//! User commands and the console line grammar.
//!
//! Every menu entry of a front-end maps to one [`Command`]; `App::handle` is
//! the single dispatcher.

use anyhow::{Result, anyhow, bail};

use crate::core::types::{ImageSetId, MascotId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateRandomMascot,
    CreateNamedMascot(ImageSetId),
    BroadcastBehavior(String),
    /// Broadcast the configured gather behavior.
    Gather,
    ReduceToOne,
    DisposeAll,
    DisposeMascot(MascotId),
    /// Re-run image set selection through the shell.
    Reconfigure,
    SetActiveImageSets(Vec<ImageSetId>),
    Exit,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Command(Command),
    Status,
    /// List the behaviors that `behavior <name>` accepts.
    Behaviors,
    Help,
}

pub const HELP: &str = "\
commands:
  random              create a mascot from a random active image set
  spawn <image-set>   create a mascot from one image set
  gather              send every mascot the gather behavior
  behavior <name>     send every mascot one behavior
  behaviors           list behavior names of the active image sets
  one                 dispose all mascots but one
  clear               dispose all mascots
  close <mascot-id>   dispose one mascot
  select [a/b/...]    choose active image sets (no argument opens the prompt)
  status              list live mascots
  exit                dispose everything and quit";

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleLine>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let parsed = match word {
        "random" => ConsoleLine::Command(Command::CreateRandomMascot),
        "spawn" => ConsoleLine::Command(Command::CreateNamedMascot(ImageSetId::new(
            required(word, rest)?,
        ))),
        "gather" => ConsoleLine::Command(Command::Gather),
        "behavior" => {
            ConsoleLine::Command(Command::BroadcastBehavior(required(word, rest)?.to_string()))
        }
        "one" => ConsoleLine::Command(Command::ReduceToOne),
        "clear" => ConsoleLine::Command(Command::DisposeAll),
        "close" => ConsoleLine::Command(Command::DisposeMascot(parse_mascot_id(required(
            word, rest,
        )?)?)),
        "select" if rest.is_empty() => ConsoleLine::Command(Command::Reconfigure),
        "select" => ConsoleLine::Command(Command::SetActiveImageSets(split_image_sets(rest))),
        "status" => ConsoleLine::Status,
        "behaviors" => ConsoleLine::Behaviors,
        "help" | "?" => ConsoleLine::Help,
        "exit" | "quit" => ConsoleLine::Command(Command::Exit),
        other => bail!("unknown command '{other}' (try 'help')"),
    };
    Ok(Some(parsed))
}

fn required<'a>(word: &str, rest: &'a str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("'{word}' needs an argument");
    }
    Ok(rest)
}

/// Accepts `7` or `#7`.
fn parse_mascot_id(raw: &str) -> Result<MascotId> {
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    digits
        .parse::<u64>()
        .map(MascotId)
        .map_err(|_| anyhow!("invalid mascot id '{raw}'"))
}

/// Split a `/`-delimited list, trimming entries and dropping blanks.
pub fn split_image_sets(raw: &str) -> Vec<ImageSetId> {
    raw.split('/')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ImageSetId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match parse_line(line).expect("parse").expect("non-empty") {
            ConsoleLine::Command(command) => command,
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn parses_every_command_word() {
        assert_eq!(command("random"), Command::CreateRandomMascot);
        assert_eq!(
            command("spawn alpha"),
            Command::CreateNamedMascot(ImageSetId::new("alpha"))
        );
        assert_eq!(command("gather"), Command::Gather);
        assert_eq!(
            command("behavior  SitDown "),
            Command::BroadcastBehavior("SitDown".to_string())
        );
        assert_eq!(command("one"), Command::ReduceToOne);
        assert_eq!(command("clear"), Command::DisposeAll);
        assert_eq!(command("close #3"), Command::DisposeMascot(MascotId(3)));
        assert_eq!(command("close 12"), Command::DisposeMascot(MascotId(12)));
        assert_eq!(command("select"), Command::Reconfigure);
        assert_eq!(command("exit"), Command::Exit);
    }

    #[test]
    fn select_with_list_splits_on_slash() {
        assert_eq!(
            command("select foo/ bar //baz"),
            Command::SetActiveImageSets(vec![
                ImageSetId::new("foo"),
                ImageSetId::new("bar"),
                ImageSetId::new("baz"),
            ])
        );
    }

    #[test]
    fn status_help_and_blank_lines() {
        assert_eq!(parse_line("status").expect("parse"), Some(ConsoleLine::Status));
        assert_eq!(parse_line("help").expect("parse"), Some(ConsoleLine::Help));
        assert_eq!(
            parse_line("behaviors").expect("parse"),
            Some(ConsoleLine::Behaviors)
        );
        assert_eq!(parse_line("   ").expect("parse"), None);
    }

    #[test]
    fn rejects_unknown_words_and_missing_arguments() {
        let err = parse_line("dance").expect_err("unknown");
        assert!(err.to_string().contains("unknown command 'dance'"));

        let err = parse_line("spawn").expect_err("missing");
        assert!(err.to_string().contains("needs an argument"));

        let err = parse_line("close abc").expect_err("bad id");
        assert!(err.to_string().contains("invalid mascot id"));
    }
}
