//! Resource probes.
//!
//! A probe counts instances of one resource type within one scope unit.
//! Provider specifics live in the probe's command templates and count
//! rules; the execution loop never branches on provider.

use cc_common::{ProbeFailure, ScopeUnit};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use crate::exec::{CommandRunner, CommandSpec, ExecError};

/// Placeholder replaced by the scope-unit id in command templates.
pub const SCOPE_PLACEHOLDER: &str = "{scope}";

/// Placeholder replaced by the outer listing's item name in
/// [`NestedCliProbe`] inner commands.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Longest raw output kept on decode failures.
const OUTPUT_CONTEXT_BYTES: usize = 2048;

/// A named, resource-type-specific counting capability.
pub trait Probe {
    fn resource_type(&self) -> &str;

    /// Workload multiplier converting raw counts into workload units.
    fn multiplier(&self) -> f64;

    /// Count resources within one scope unit.
    fn execute(&self, scope: &ScopeUnit) -> Result<u64, ProbeFailure>;
}

/// Where the countable list lives in a command's JSON output.
///
/// Providers that return nothing countable return `null`, an empty
/// document, or omit the field entirely; all of those count as zero.
#[derive(Debug, Clone)]
pub enum CountRule {
    /// Output is the array itself.
    ArrayLen,

    /// Array under a named top-level field, e.g. `.clusters`.
    FieldLen(String),

    /// Array at a nested path, e.g. `.Instances.Instance`.
    PathLen(Vec<String>),
}

impl CountRule {
    fn count(&self, root: &Value) -> Option<u64> {
        let value = match self {
            CountRule::ArrayLen => root,
            CountRule::FieldLen(field) => match root {
                Value::Object(map) => match map.get(field) {
                    Some(v) => v,
                    None => return Some(0),
                },
                _ => return None,
            },
            CountRule::PathLen(path) => {
                if !root.is_object() {
                    return None;
                }
                let mut current = root;
                for key in path {
                    current = match current.get(key) {
                        Some(v) => v,
                        None => return Some(0),
                    };
                }
                current
            }
        };

        match value {
            Value::Null => Some(0),
            Value::Array(items) => Some(items.len() as u64),
            _ => None,
        }
    }
}

/// One command step of a [`CliProbe`].
#[derive(Debug, Clone)]
pub struct ProbeStep {
    pub command: CommandSpec,
    pub rule: CountRule,
}

/// A probe that counts via provider CLI invocations.
///
/// Multi-step probes sum their step counts (Cloud Run counts services
/// and jobs as one resource type).
pub struct CliProbe {
    resource_type: String,
    multiplier: f64,
    steps: Vec<ProbeStep>,
    runner: Arc<CommandRunner>,
}

impl CliProbe {
    pub fn new(resource_type: impl Into<String>, runner: Arc<CommandRunner>) -> Self {
        Self {
            resource_type: resource_type.into(),
            multiplier: 1.0,
            steps: Vec::new(),
            runner,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn step(mut self, command: CommandSpec, rule: CountRule) -> Self {
        self.steps.push(ProbeStep { command, rule });
        self
    }
}

impl Probe for CliProbe {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn execute(&self, scope: &ScopeUnit) -> Result<u64, ProbeFailure> {
        let mut total = 0;
        for step in &self.steps {
            let command = substitute(&step.command, SCOPE_PLACEHOLDER, &scope.id);
            trace!(command = %command, "probe step");
            let output = run_step(&self.runner, &command)?;
            total += decode_count(&command, &step.rule, &output)?;
        }
        Ok(total)
    }
}

/// Two-level drill-down probe.
///
/// The outer command lists named items (`name_field` of each object in a
/// top-level array); the inner command runs once per name with `{name}`
/// substituted, and the inner counts are summed. Azure container
/// repositories work this way: registries first, then repositories per
/// registry.
pub struct NestedCliProbe {
    resource_type: String,
    multiplier: f64,
    outer: CommandSpec,
    name_field: String,
    inner: CommandSpec,
    inner_rule: CountRule,
    runner: Arc<CommandRunner>,
}

impl NestedCliProbe {
    pub fn new(
        resource_type: impl Into<String>,
        outer: CommandSpec,
        name_field: impl Into<String>,
        inner: CommandSpec,
        inner_rule: CountRule,
        runner: Arc<CommandRunner>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            multiplier: 1.0,
            outer,
            name_field: name_field.into(),
            inner,
            inner_rule,
            runner,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

impl Probe for NestedCliProbe {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn execute(&self, scope: &ScopeUnit) -> Result<u64, ProbeFailure> {
        let outer = substitute(&self.outer, SCOPE_PLACEHOLDER, &scope.id);
        let output = run_step(&self.runner, &outer)?;
        let names = decode_names(&outer, &self.name_field, &output)?;

        let mut total = 0;
        for name in &names {
            let inner = substitute(
                &substitute(&self.inner, SCOPE_PLACEHOLDER, &scope.id),
                NAME_PLACEHOLDER,
                name,
            );
            let output = run_step(&self.runner, &inner)?;
            total += decode_count(&inner, &self.inner_rule, &output)?;
        }
        Ok(total)
    }
}

/// Ordered probe configuration for one provider plan.
///
/// Registration order defines report row order; the registry is
/// assembled once per plan and never mutated afterwards.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: Vec<Box<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, probe: impl Probe + 'static) {
        self.probes.push(Box::new(probe));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Probe> {
        self.probes.iter().map(|probe| probe.as_ref())
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

fn substitute(spec: &CommandSpec, placeholder: &str, value: &str) -> CommandSpec {
    CommandSpec {
        program: spec.program.clone(),
        args: spec
            .args
            .iter()
            .map(|arg| arg.replace(placeholder, value))
            .collect(),
    }
}

fn run_step(runner: &CommandRunner, command: &CommandSpec) -> Result<String, ProbeFailure> {
    match runner.run(command) {
        Ok(output) => Ok(output.stdout),
        Err(err) => Err(ProbeFailure::Exec {
            command: command.rendered(),
            detail: err.to_string(),
            output: err.context_output().unwrap_or_default().to_string(),
        }),
    }
}

fn decode_count(
    command: &CommandSpec,
    rule: &CountRule,
    stdout: &str,
) -> Result<u64, ProbeFailure> {
    // Some CLIs print nothing at all for an empty result set.
    if stdout.trim().is_empty() {
        return Ok(0);
    }

    let root: Value = serde_json::from_str(stdout).map_err(|e| ProbeFailure::Decode {
        command: command.rendered(),
        detail: e.to_string(),
        output: truncate_output(stdout),
    })?;

    rule.count(&root).ok_or_else(|| ProbeFailure::Decode {
        command: command.rendered(),
        detail: "output shape did not match count rule".to_string(),
        output: truncate_output(stdout),
    })
}

fn decode_names(
    command: &CommandSpec,
    name_field: &str,
    stdout: &str,
) -> Result<Vec<String>, ProbeFailure> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let root: Value = serde_json::from_str(stdout).map_err(|e| ProbeFailure::Decode {
        command: command.rendered(),
        detail: e.to_string(),
        output: truncate_output(stdout),
    })?;

    let items = match &root {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => {
            return Err(ProbeFailure::Decode {
                command: command.rendered(),
                detail: "expected a JSON array of named items".to_string(),
                output: truncate_output(stdout),
            })
        }
    };

    items
        .iter()
        .map(|item| {
            item.get(name_field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ProbeFailure::Decode {
                    command: command.rendered(),
                    detail: format!("item missing '{}' field", name_field),
                    output: truncate_output(stdout),
                })
        })
        .collect()
}

fn truncate_output(output: &str) -> String {
    if output.len() <= OUTPUT_CONTEXT_BYTES {
        return output.to_string();
    }
    let mut end = OUTPUT_CONTEXT_BYTES;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &output[..end])
}
