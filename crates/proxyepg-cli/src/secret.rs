//! Secret references in `config.toml`.
//!
//! Proxy addresses, CA bundles and provider cookies should not sit in the
//! config file in clear. A value can instead point at where the secret lives:
//!
//! - `env::NAME`: the environment variable `NAME`
//! - `pass::entry`: first line of `pass show entry`
//! - anything else: used literally

use std::fmt;
use std::process::Command;

/// Where a configured value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Env(&'a str),
    Pass(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(name) = value.strip_prefix("env::") {
            Self::Env(name.trim())
        } else if let Some(entry) = value.strip_prefix("pass::") {
            Self::Pass(entry.trim())
        } else {
            Self::Plain(value)
        }
    }

    /// Reads the secret.
    pub fn resolve(&self) -> Result<String, String> {
        match self {
            Self::Plain(value) => Ok((*value).to_string()),
            Self::Env(name) => std::env::var(name)
                .map_err(|_| format!("environment variable `{name}` is not set")),
            Self::Pass(entry) => pass_show(entry),
        }
    }
}

impl fmt::Display for SecretRef<'_> {
    /// Never prints a plain value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(name) => write!(f, "env::{name}"),
            Self::Pass(entry) => write!(f, "pass::{entry}"),
            Self::Plain(_) => f.write_str("<inline>"),
        }
    }
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

/// Resolves an optional value; blank results count as unset.
pub fn resolve_opt(value: Option<&str>) -> Result<Option<String>, String> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let resolved = resolve(raw)?;
            Ok(Some(resolved).filter(|v| !v.trim().is_empty()))
        }
    }
}

fn pass_show(entry: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|e| format!("cannot run `pass show {entry}`: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {entry}` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {entry}` printed nothing"))
}
