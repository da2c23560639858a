//! Environment lookup helpers.

use std::str::FromStr;

use crate::error::AppError;

/// Read-only view of configuration variables.
///
/// Production reads the process environment; tests pass a map.
pub struct EnvSource<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> EnvSource<'a> {
    pub fn new(lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    pub fn process() -> Self {
        Self::new(|name| std::env::var(name).ok())
    }

    /// Value of `name`, treating empty or blank as unset.
    pub fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn var_or(&self, name: &str, default: &str) -> String {
        self.var(name).unwrap_or_else(|| default.to_string())
    }

    /// Required variable, or a `Config` error naming it.
    pub fn must_var(&self, name: &str) -> Result<String, AppError> {
        self.var(name).ok_or_else(|| {
            AppError::config(format!("Required environment variable '{name}' is not set"))
        })
    }

    /// Parse `name` if set, else `default`.
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.var(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::config(format!("Invalid value '{raw}' for {name}: {e}"))),
        }
    }

    /// Comma-separated list; blank entries are dropped.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.var(name)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
