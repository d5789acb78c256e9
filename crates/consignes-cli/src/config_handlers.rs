//! Handlers for `consignes config ...`.
//!
//! Each handler returns the text to print so that the dispatcher owns stdout.

use std::path::PathBuf;

use crate::cli::ConfigAction;
use crate::config::ConsignesConfig;
use crate::error::{Error, Result};

/// Runs a config subcommand and prints its output.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    let output = match action {
        ConfigAction::Path => cmd_config_path(config_path)?,
        ConfigAction::Get { key } => cmd_config_get(config_path, &key)?,
        ConfigAction::Set { key, value } => cmd_config_set(config_path, &key, &value)?,
        ConfigAction::Init { file, force } => {
            cmd_config_init(file.as_deref().or(config_path), force)?
        }
    };
    println!("{output}");
    Ok(())
}

/// Resolved config file path, with a hint when it does not exist yet.
pub fn cmd_config_path(config_path: Option<&str>) -> Result<String> {
    let path = ConsignesConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))?;
    if path.exists() {
        Ok(path.display().to_string())
    } else {
        Ok(format!(
            "{} (missing, run `consignes config init` to create it)",
            path.display()
        ))
    }
}

/// Value at a dotted key of the effective configuration.
pub fn cmd_config_get(config_path: Option<&str>, key: &str) -> Result<String> {
    let config = ConsignesConfig::load(config_path)?;
    let value = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))
}

/// Sets a dotted key in the config file.
///
/// The edited document must still be a valid configuration, so a typo in a
/// value type is rejected before anything is written.
pub fn cmd_config_set(config_path: Option<&str>, key: &str, value: &str) -> Result<String> {
    let path = ConsignesConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory"))?;
    if !path.exists() {
        return Err(Error::config(format!(
            "Config file does not exist at {}. Run `consignes config init` first.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
    let mut doc: toml::Value = toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;

    set_nested_value(&mut doc, key, parse_value(value))?;

    let text = toml::to_string_pretty(&doc).map_err(|e| Error::config(e.to_string()))?;
    ConsignesConfig::from_toml_str(&text)
        .map_err(|e| Error::config(format!("Refusing to set {key}: {e}")))?;
    std::fs::write(&path, text).map_err(|e| Error::io_with_path(e, &path))?;

    Ok(format!("Set {key} = {value} in {}", path.display()))
}

/// Writes a default config file.
pub fn cmd_config_init(file: Option<&str>, force: bool) -> Result<String> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => ConsignesConfig::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }

    let text = ConsignesConfig::default().to_toml_string()?;
    std::fs::write(&path, text).map_err(|e| Error::io_with_path(e, &path))?;

    Ok(format!("Config file created at {}", path.display()))
}

/// Follows a dotted key through nested tables.
pub fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Sets a dotted key, creating intermediate tables.
pub fn set_nested_value(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let mut parts: Vec<&str> = key.split('.').collect();
    let last = parts
        .pop()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::config("Empty key path"))?;

    let mut current = root;
    for part in parts {
        let table = current
            .as_table_mut()
            .ok_or_else(|| Error::config(format!("Cannot navigate into '{part}'")))?;
        current = table
            .entry(part)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    current
        .as_table_mut()
        .ok_or_else(|| Error::config(format!("Cannot set '{key}' on a non-table value")))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Interprets a command-line value: bool, then integer, then float, then string.
pub fn parse_value(s: &str) -> toml::Value {
    match s {
        "true" => return toml::Value::Boolean(true),
        "false" => return toml::Value::Boolean(false),
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(s.to_string())
}

/// Renders a value for stdout; strings are printed bare.
pub fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}
