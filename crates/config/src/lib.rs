//! Configuration loading for the signals collector
//!
//! Provides utilities for locating the shared config directory
//! (~/.config/signals-collector/), loading JSON config files from it,
//! and reading `KEY=VALUE` environment files.
//!
//! Call [`init`] at application startup to bootstrap the config directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the directory created under the platform config dir
const APP_DIR: &str = "signals-collector";

/// Initialize the collector config directory.
///
/// Creates ~/.config/signals-collector/ if it doesn't exist.
/// Call this once at application startup.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the collector config directory (~/.config/signals-collector/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to a file within the collector config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Load and parse a JSON config file from the config directory, if present
///
/// Returns `Ok(None)` when the file does not exist. A file that exists but
/// cannot be read or parsed is an error.
pub fn load_optional_json<T: DeserializeOwned>(filename: &str) -> Result<Option<T>> {
    match config_path(filename) {
        Some(path) if path.exists() => load_json_file(&path).map(Some),
        _ => Ok(None),
    }
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Ensure the collector config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Load a `.env` style file into a key/value map
///
/// Returns an empty map if the file does not exist.
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file: {}", path.display()))?;
    Ok(parse_env(&content))
}

/// Parse `KEY=VALUE` lines
///
/// Blank lines and `#` comments are skipped and an optional `export ` prefix
/// is accepted. Single-quoted values are literal. Double-quoted values may
/// span several lines and understand `\n`, `\t`, `\r`, `\"` and `\\`
/// escapes. Unquoted values may carry a trailing ` # comment`.
pub fn parse_env(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim_start();

        let value = if let Some(rest) = value.strip_prefix('"') {
            let mut raw = rest.to_string();
            while closing_quote(&raw).is_none() {
                let Some(next) = lines.next() else {
                    break;
                };
                raw.push('\n');
                raw.push_str(next);
            }
            unescape(&raw)
        } else if let Some(rest) = value.strip_prefix('\'') {
            rest.split_once('\'').map_or(rest, |(inner, _)| inner).to_string()
        } else {
            strip_comment(value).to_string()
        };

        vars.insert(key.to_string(), value);
    }

    vars
}

/// Byte index of the first unescaped `"`
fn closing_quote(raw: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in raw.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Resolve escapes up to the closing quote
fn unescape(raw: &str) -> String {
    let body = closing_quote(raw).map_or(raw, |end| &raw[..end]);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(c @ ('"' | '\\' | '$')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn strip_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value.trim_end(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("signals-collector"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path("collector.json");
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.ends_with("signals-collector/collector.json"));
    }

    #[test]
    fn test_parse_env_basic() {
        let vars = parse_env(
            "# device settings\n\
             DEVICE_IP=10.0.0.7\n\
             \n\
             export GOOGLE_SHEET_NAME=\"Lights Data\"\n\
             STATE_FILE='/var/lib/state.txt'\n",
        );

        assert_eq!(vars.len(), 3);
        assert_eq!(vars["DEVICE_IP"], "10.0.0.7");
        assert_eq!(vars["GOOGLE_SHEET_NAME"], "Lights Data");
        assert_eq!(vars["STATE_FILE"], "/var/lib/state.txt");
    }

    #[test]
    fn test_parse_env_inline_comment_and_garbage() {
        let vars = parse_env("COLLECTION_INTERVAL_MINUTES=10 # every ten\nnot a pair\n=orphan\n");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["COLLECTION_INTERVAL_MINUTES"], "10");
    }

    #[test]
    fn test_parse_env_keeps_hash_inside_quotes() {
        let vars = parse_env("DEVICE_URL=\"http://host/data#frag\"\n");
        assert_eq!(vars["DEVICE_URL"], "http://host/data#frag");
    }

    #[test]
    fn test_parse_env_double_quote_escapes() {
        let vars = parse_env("GREETING=\"say \\\"hi\\\"\\tthen\\nbye\" # trailing\nPATHLIKE=\"C:\\\\data\"\n");
        assert_eq!(vars["GREETING"], "say \"hi\"\tthen\nbye");
        assert_eq!(vars["PATHLIKE"], "C:\\data");
    }

    #[test]
    fn test_parse_env_multiline_double_quoted() {
        let vars = parse_env(
            "NOTE=\"first line\n\
             second line\"\n\
             NEXT=1\n",
        );
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["NOTE"], "first line\nsecond line");
        assert_eq!(vars["NEXT"], "1");
    }

    #[test]
    fn test_parse_env_single_quotes_are_literal() {
        let vars = parse_env("RAW='a\\nb' # comment\n");
        assert_eq!(vars["RAW"], "a\\nb");
    }

    #[test]
    fn test_load_env_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let vars = load_env_file(&dir.path().join(".env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_load_json_file() {
        #[derive(serde::Deserialize)]
        struct Sample {
            sheet_name: String,
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.json");
        std::fs::write(&path, r#"{ "sheet_name": "Test Sheet" }"#).unwrap();

        let sample: Sample = load_json_file(&path).unwrap();
        assert_eq!(sample.sheet_name, "Test Sheet");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_json_file::<Sample>(&path).is_err());
    }
}
