//! Migration header parameters.
//!
//! Each known parameter has one [`ParameterValue`] variant. Raw header strings
//! are turned into values by [`parse`]; defaults come from the immutable
//! [`DEFAULTS`] table.

use crate::error::{CoreError, CoreResult};
use crate::migration_name::MigrationName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Re-execution policy of a migration across apply cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunModifier {
    /// Execute once; a later body change is an error
    #[default]
    Once,
    /// Execute on every cycle
    Always,
    /// Execute when new and whenever the body changes
    OnChange,
}

impl RunModifier {
    /// Persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            RunModifier::Once => "once",
            RunModifier::Always => "always",
            RunModifier::OnChange => "onchange",
        }
    }
}

impl fmt::Display for RunModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunModifier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(RunModifier::Once),
            "always" => Ok(RunModifier::Always),
            "onchange" => Ok(RunModifier::OnChange),
            other => Err(CoreError::InvalidParameterValue {
                name: MigrationParameter::Run.name().to_string(),
                value: other.to_string(),
                expected: "one of once, always, onchange".to_string(),
            }),
        }
    }
}

/// Parameters understood in a migration header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationParameter {
    Run,
    Ignore,
    Transactional,
    FailFast,
    RunAfter,
    RunBefore,
    Environment,
}

/// A parsed parameter value, one variant per parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Run(RunModifier),
    Ignore(bool),
    Transactional(bool),
    FailFast(bool),
    RunAfter(Vec<MigrationName>),
    RunBefore(Vec<MigrationName>),
    Environment(Option<String>),
}

/// Default value of every parameter
pub const DEFAULTS: [ParameterValue; 7] = [
    ParameterValue::Run(RunModifier::Once),
    ParameterValue::Ignore(false),
    ParameterValue::Transactional(true),
    ParameterValue::FailFast(true),
    ParameterValue::RunAfter(Vec::new()),
    ParameterValue::RunBefore(Vec::new()),
    ParameterValue::Environment(None),
];

impl MigrationParameter {
    /// All known parameters
    pub const ALL: [MigrationParameter; 7] = [
        MigrationParameter::Run,
        MigrationParameter::Ignore,
        MigrationParameter::Transactional,
        MigrationParameter::FailFast,
        MigrationParameter::RunAfter,
        MigrationParameter::RunBefore,
        MigrationParameter::Environment,
    ];

    /// Name as written in a migration header
    pub fn name(&self) -> &'static str {
        match self {
            MigrationParameter::Run => "run",
            MigrationParameter::Ignore => "ignore",
            MigrationParameter::Transactional => "transactional",
            MigrationParameter::FailFast => "failFast",
            MigrationParameter::RunAfter => "runAfter",
            MigrationParameter::RunBefore => "runBefore",
            MigrationParameter::Environment => "env",
        }
    }

    /// Look up a parameter by its header name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Value used when the header does not mention this parameter
    pub fn default_value(&self) -> ParameterValue {
        // DEFAULTS is laid out in declaration order
        DEFAULTS[*self as usize].clone()
    }

    /// Parse a raw header value for this parameter
    pub fn parse_value(&self, raw: &str) -> CoreResult<ParameterValue> {
        let raw = raw.trim();
        Ok(match self {
            MigrationParameter::Run => ParameterValue::Run(raw.parse()?),
            MigrationParameter::Ignore => ParameterValue::Ignore(parse_flag(*self, raw)?),
            MigrationParameter::Transactional => {
                ParameterValue::Transactional(parse_flag(*self, raw)?)
            }
            MigrationParameter::FailFast => ParameterValue::FailFast(parse_flag(*self, raw)?),
            MigrationParameter::RunAfter => ParameterValue::RunAfter(parse_names(*self, raw)?),
            MigrationParameter::RunBefore => ParameterValue::RunBefore(parse_names(*self, raw)?),
            MigrationParameter::Environment => {
                if raw.is_empty() {
                    return Err(invalid(*self, raw, "a non-empty environment name"));
                }
                ParameterValue::Environment(Some(raw.to_string()))
            }
        })
    }
}

impl ParameterValue {
    /// The parameter this value belongs to
    pub fn parameter(&self) -> MigrationParameter {
        match self {
            ParameterValue::Run(_) => MigrationParameter::Run,
            ParameterValue::Ignore(_) => MigrationParameter::Ignore,
            ParameterValue::Transactional(_) => MigrationParameter::Transactional,
            ParameterValue::FailFast(_) => MigrationParameter::FailFast,
            ParameterValue::RunAfter(_) => MigrationParameter::RunAfter,
            ParameterValue::RunBefore(_) => MigrationParameter::RunBefore,
            ParameterValue::Environment(_) => MigrationParameter::Environment,
        }
    }
}

/// Parse `raw` as the value of the header parameter called `name`
pub fn parse(name: &str, raw: &str) -> CoreResult<ParameterValue> {
    let parameter = MigrationParameter::from_name(name).ok_or_else(|| {
        CoreError::UnknownParameter {
            name: name.to_string(),
        }
    })?;
    parameter.parse_value(raw)
}

fn invalid(parameter: MigrationParameter, raw: &str, expected: &str) -> CoreError {
    CoreError::InvalidParameterValue {
        name: parameter.name().to_string(),
        value: raw.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_flag(parameter: MigrationParameter, raw: &str) -> CoreResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(parameter, raw, "true or false")),
    }
}

fn parse_names(parameter: MigrationParameter, raw: &str) -> CoreResult<Vec<MigrationName>> {
    let names: Option<Vec<MigrationName>> = raw
        .split(',')
        .map(|part| MigrationName::try_new(part.trim()))
        .collect();
    match names {
        Some(names) if !names.is_empty() => Ok(names),
        _ => Err(invalid(
            parameter,
            raw,
            "a comma-separated list of migration names",
        )),
    }
}

/// Resolved behavioral parameters of one migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationParams {
    pub run: RunModifier,
    pub ignore: bool,
    pub transactional: bool,
    pub fail_fast: bool,
    pub run_after: Vec<MigrationName>,
    pub run_before: Vec<MigrationName>,
    pub environment: Option<String>,
}

impl MigrationParams {
    /// Overwrite the parameter carried by `value`
    pub fn set(&mut self, value: ParameterValue) {
        match value {
            ParameterValue::Run(run) => self.run = run,
            ParameterValue::Ignore(flag) => self.ignore = flag,
            ParameterValue::Transactional(flag) => self.transactional = flag,
            ParameterValue::FailFast(flag) => self.fail_fast = flag,
            ParameterValue::RunAfter(names) => self.run_after = names,
            ParameterValue::RunBefore(names) => self.run_before = names,
            ParameterValue::Environment(env) => self.environment = env,
        }
    }

    /// Builder-style [`parse`] + [`set`](Self::set)
    pub fn with(mut self, name: &str, raw: &str) -> CoreResult<Self> {
        self.set(parse(name, raw)?);
        Ok(self)
    }
}

impl Default for MigrationParams {
    fn default() -> Self {
        let mut params = Self {
            run: RunModifier::Once,
            ignore: false,
            transactional: false,
            fail_fast: false,
            run_after: Vec::new(),
            run_before: Vec::new(),
            environment: None,
        };
        for value in DEFAULTS.iter().cloned() {
            params.set(value);
        }
        params
    }
}

#[cfg(test)]
#[path = "params_test.rs"]
mod tests;
