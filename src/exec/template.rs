// src/exec/template.rs

//! `{name}` placeholder expansion for configured commands.

use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Shell parameter expansions like `${HOME}` are not placeholders.
fn is_shell_expansion(template: &str, caps: &Captures<'_>) -> bool {
    caps.get(0)
        .is_some_and(|m| template[..m.start()].ends_with('$'))
}

/// Placeholder names used in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .filter(|c| !is_shell_expansion(template, c))
        .map(|c| c[1].to_string())
        .collect()
}

/// Check that `template` only uses placeholders from `allowed`.
pub fn check(template: &str, allowed: &[&str]) -> Result<()> {
    for name in placeholders(template) {
        if !allowed.contains(&name.as_str()) {
            return Err(anyhow!(
                "unknown placeholder {{{name}}} in `{template}` (allowed: {})",
                allowed.join(", ")
            ));
        }
    }
    Ok(())
}

/// Substitute placeholders from `vars`, each value shell-quoted as a single
/// word.
///
/// Unknown placeholders are an error; templates are checked at config load
/// time, so this only fails for programmatically built commands or values
/// that cannot be quoted (NUL bytes).
pub fn expand(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut missing = None;
    let mut unquotable = None;
    let out = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        if is_shell_expansion(template, caps) {
            return caps[0].to_string();
        }
        match vars.iter().find(|(k, _)| *k == &caps[1]) {
            Some((name, v)) => match shlex::try_quote(v) {
                Ok(quoted) => quoted.into_owned(),
                Err(err) => {
                    unquotable.get_or_insert_with(|| format!("{{{name}}}: {err}"));
                    caps[0].to_string()
                }
            },
            None => {
                missing.get_or_insert_with(|| caps[1].to_string());
                caps[0].to_string()
            }
        }
    });

    if let Some(name) = missing {
        return Err(anyhow!("no value for placeholder {{{name}}} in `{template}`"));
    }
    if let Some(reason) = unquotable {
        return Err(anyhow!("cannot quote value for {reason}"));
    }
    Ok(out.into_owned())
}
