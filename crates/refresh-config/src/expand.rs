//! `${VAR}` references in configuration strings.

use std::env::{self, VarError};

use shellexpand::LookupError;

use crate::ConfigError;

/// Replace each `${VAR}` or `${VAR:-default}` in `value`.
///
/// Only braced references are expanded; a bare `$VAR` stays literal, and so
/// does an unterminated `${`.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some((before, reference, after)) = next_reference(rest) {
        let expanded = shellexpand::env_with_context(reference, lookup)
            .map_err(|err| env_error(field, &err))?;
        out.push_str(before);
        out.push_str(&expanded);
        rest = after;
    }

    out.push_str(rest);
    Ok(out)
}

/// Split `s` around its first complete `${...}`.
fn next_reference(s: &str) -> Option<(&str, &str, &str)> {
    let start = s.find("${")?;
    let end = start + s[start..].find('}')? + 1;
    Some((&s[..start], &s[start..end], &s[end..]))
}

fn lookup(name: &str) -> Result<Option<String>, VarError> {
    env::var(name).map(Some)
}

fn env_error(field: &str, err: &LookupError<VarError>) -> ConfigError {
    let reason = match &err.cause {
        VarError::NotPresent => "not set",
        VarError::NotUnicode(_) => "is not valid unicode",
    };
    ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} {reason}", err.var_name),
    }
}
