//! Scripted sessions: `--set PATH=VALUE` assignments applied to a schema.
//!
//! A `PATH` is a dotted list of merge keys ending in a row identifier.
//! Assignments sharing a prefix are applied in one visit of the child
//! session, because a child's edits replace the parent's nested value on
//! dismissal.

use anyhow::{Context, Result, anyhow, bail};
use prefsheet::{
    PropertyGroup, RowPosition, SessionConfig, SessionController, SettingsDelegate, StaticDelegate,
    Value, ValueMap,
};

/// One `PATH=VALUE` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub path: Vec<String>,
    pub value: Value,
}

impl Assignment {
    /// `VALUE` is read as JSON, falling back to a plain string.
    pub fn parse(s: &str) -> Result<Self> {
        let (path, raw) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected PATH=VALUE, got `{s}`"))?;
        let path: Vec<String> = path.split('.').map(|p| p.trim().to_string()).collect();
        if path.iter().any(String::is_empty) {
            bail!("empty path segment in `{s}`");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Ok(Self { path, value })
    }
}

/// Assignments grouped by path prefix, in first-seen order.
#[derive(Debug, Default, PartialEq)]
struct Visit {
    commits: Vec<(String, Value)>,
    children: Vec<(String, Visit)>,
}

impl Visit {
    fn build(assignments: &[Assignment]) -> Self {
        let mut root = Self::default();
        for a in assignments {
            root.insert(&a.path, a.value.clone());
        }
        root
    }

    fn insert(&mut self, path: &[String], value: Value) {
        match path {
            [] => {}
            [key] => self.commits.push((key.clone(), value)),
            [head, rest @ ..] => {
                let idx = match self.children.iter().position(|(k, _)| k == head) {
                    Some(i) => i,
                    None => {
                        self.children.push((head.clone(), Self::default()));
                        self.children.len() - 1
                    }
                };
                self.children[idx].1.insert(rest, value);
            }
        }
    }
}

/// Nesting row of the current session whose merge key is `key`.
fn nesting_row<D: SettingsDelegate>(ctl: &SessionController<D>, key: &str) -> Result<RowPosition> {
    ctl.current()?
        .schema()
        .rows()
        .find(|(_, row)| row.row_type().is_nesting() && row.merge_key() == key)
        .map(|(pos, _)| pos)
        .ok_or_else(|| anyhow!("no nested section `{key}`"))
}

fn apply_visit<D: SettingsDelegate>(
    ctl: &mut SessionController<D>,
    visit: &Visit,
    trail: &str,
) -> Result<()> {
    for (key, value) in &visit.commits {
        let outcome = ctl
            .commit(key, value.clone())
            .with_context(|| format!("cannot set `{trail}{key}`"))?;
        if outcome.changed {
            info!("set {trail}{key} = {}", outcome.value);
        } else {
            info!("{trail}{key} already {}", outcome.value);
        }
    }
    for (key, child) in &visit.children {
        let parent = ctl
            .current_id()
            .ok_or_else(|| anyhow!("session already finished"))?;
        let pos = nesting_row(ctl, key).with_context(|| format!("at `{trail}{key}`"))?;
        let id = ctl.push(parent, pos)?;
        apply_visit(ctl, child, &format!("{trail}{key}."))?;
        ctl.pop(id)?;
    }
    Ok(())
}

/// Run a session over `groups`, apply `assignments` and return the root's
/// output values.
pub fn run(
    groups: Vec<PropertyGroup>,
    values: ValueMap,
    defaults: ValueMap,
    config: SessionConfig,
    assignments: &[Assignment],
) -> Result<ValueMap> {
    let delegate = StaticDelegate::new(values).with_defaults(defaults);
    let mut ctl = SessionController::with_config(groups, delegate, config)?;
    apply_visit(&mut ctl, &Visit::build(assignments), "")?;
    Ok(ctl.finish()?)
}
