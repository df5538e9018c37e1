//! `%{name}%` placeholder expansion against an environment's variables.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::environment::Environment;
use crate::error::{Error, Result};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\{([A-Za-z0-9_]+)\}%").expect("valid regex"));

/// Replace every `%{name}%` in `text` with the matching variable of `env`.
///
/// Expansion is all-or-nothing: the first placeholder without a variable
/// fails the whole string with [`Error::UnknownVariable`]. Text without
/// placeholders is returned unchanged.
pub fn expand(text: &str, env: &Environment) -> Result<String> {
    if let Some(missing) = PLACEHOLDER_RE
        .captures_iter(text)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .find(|name| !env.variables.contains_key(*name))
    {
        return Err(Error::UnknownVariable(missing.to_string()));
    }
    Ok(PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| {
            env.variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_default()
        })
        .into_owned())
}

/// Expand every value of `map`, keeping its keys.
pub fn expand_map(
    map: &BTreeMap<String, String>,
    env: &Environment,
) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), expand(v, env)?)))
        .collect()
}
