//! User settings stored in `conf/settings.properties`.
//!
//! Java-properties text. A key ends at the first unescaped `=`, `:` or
//! whitespace; `#` and `!` start comment lines. An odd run of trailing
//! backslashes continues the entry on the next line, and `\t` or `\uXXXX`
//! escapes are decoded. Unknown keys are preserved on rewrite.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::types::ImageSetId;

/// Key holding the `/`-delimited list of active image sets.
pub const ACTIVE_IMAGE_SETS_KEY: &str = "ActiveShimeji";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    pub fn parse(contents: &str) -> Self {
        let mut settings = Settings::default();
        for line in logical_lines(contents) {
            let (key, value) = split_entry(&line);
            settings.set(&unescape(key), &unescape(value));
        }
        settings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace `key`, keeping its original position.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    /// Ordered image sets from `ActiveShimeji`. Blank segments are dropped,
    /// so an absent or empty value yields an empty list.
    pub fn active_image_sets(&self) -> Vec<ImageSetId> {
        self.get(ACTIVE_IMAGE_SETS_KEY)
            .unwrap_or_default()
            .split('/')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ImageSetId::new)
            .collect()
    }

    pub fn set_active_image_sets(&mut self, sets: &[ImageSetId]) {
        let joined = sets
            .iter()
            .map(ImageSetId::as_str)
            .collect::<Vec<_>>()
            .join("/");
        self.set(ACTIVE_IMAGE_SETS_KEY, &joined);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(&escape(key, true));
            out.push('=');
            out.push_str(&escape(value, false));
            out.push('\n');
        }
        out
    }
}

/// Entries with continuation lines joined; blank and comment lines dropped.
fn logical_lines(contents: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;
    for raw in contents.lines() {
        let trimmed = raw.trim_start();
        let mut line = match pending.take() {
            Some(mut joined) => {
                joined.push_str(trimmed);
                joined
            }
            None if trimmed.is_empty() || trimmed.starts_with(['#', '!']) => continue,
            None => trimmed.to_string(),
        };
        if ends_with_continuation(&line) {
            line.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }
    lines.extend(pending);
    lines
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split at the first unescaped separator. Whitespace around `=`/`:` is skipped.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..idx], line[idx + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[idx..].trim_start();
                let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
                return (&line[..idx], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (idx, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}

/// Load settings; a missing or unreadable file yields empty settings.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(contents) => {
            debug!(path = %path.display(), "loaded settings");
            Settings::parse(&contents)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable settings");
            Settings::default()
        }
    }
}

/// Atomically write settings to disk (temp file + rename).
pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("settings path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("properties.tmp");
    fs::write(&tmp_path, settings.render())
        .with_context(|| format!("write temp settings {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace settings {}", path.display()))?;
    Ok(())
}
