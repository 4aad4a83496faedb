// src/calendar/loader.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calendar::{CalendarEntry, CalendarRegistry};

pub const ENV_CALENDAR_PATH: &str = "CALENDAR_PATH";
pub const DEFAULT_CALENDAR_JSON: &str = "data/calendar.json";
pub const DEFAULT_CALENDAR_TOML: &str = "config/calendar.toml";

/// Load the registry from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<CalendarRegistry> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading calendar from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let entries = parse_calendar(&content, ext.as_str())
        .with_context(|| format!("parsing calendar {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = entries.len(), "calendar loaded");
    Ok(CalendarRegistry::from_entries(entries))
}

/// Load the registry using env var + fallbacks:
/// 1) $CALENDAR_PATH
/// 2) data/calendar.json
/// 3) config/calendar.toml
///
/// With none of them present the registry is empty (every request yields zero items).
pub fn load_default() -> Result<CalendarRegistry> {
    if let Ok(p) = std::env::var(ENV_CALENDAR_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CALENDAR_PATH} points to non-existent path"));
        }
    }
    let json_p = PathBuf::from(DEFAULT_CALENDAR_JSON);
    if json_p.exists() {
        return load_from(&json_p);
    }
    let toml_p = PathBuf::from(DEFAULT_CALENDAR_TOML);
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    tracing::warn!("no calendar file found; serving an empty registry");
    Ok(CalendarRegistry::default())
}

fn parse_calendar(s: &str, hint_ext: &str) -> Result<Vec<CalendarEntry>> {
    let try_toml = hint_ext == "toml" || s.contains("[[events]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    let json_err = match parse_json(s) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(json_err.context("unsupported calendar format"))
}

fn parse_toml(s: &str) -> Result<Vec<CalendarEntry>> {
    #[derive(serde::Deserialize)]
    struct TomlCalendar {
        #[serde(default)]
        events: Vec<CalendarEntry>,
    }
    let v: TomlCalendar = toml::from_str(s)?;
    Ok(v.events)
}

/// Either a bare array of entries or `{ "events": [...] }`.
fn parse_json(s: &str) -> Result<Vec<CalendarEntry>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum JsonCalendar {
        List(Vec<CalendarEntry>),
        Wrapped { events: Vec<CalendarEntry> },
    }
    let v: JsonCalendar = serde_json::from_str(s)?;
    Ok(match v {
        JsonCalendar::List(v) | JsonCalendar::Wrapped { events: v } => v,
    })
}
