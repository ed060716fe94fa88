//! Warnings for constructs that compile but probably do not do what the
//! author meant. None of these change the emitted bytes.

use std::fmt;

use fuf_contract::ids;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::program::Sensor;
use crate::symbols::SymbolKind;

/// Names the event parser accepts without quotes.
static RE_BARE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LintKind {
    /// Event pair whose source is a state or gait; nothing is encoded for it.
    NonSensorSource,
    /// Event pair whose source names nothing at all; nothing is encoded.
    UnknownEventSource,
    /// Event target is not a declared state; encoded as state id 0.
    UnresolvedTarget,
    /// Sensor name that only quoted event tokens can reference.
    QuotedSensorName,
    /// Sensor id inside the state/gait/event ranges.
    SensorIdOverlap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: LintKind,
    /// Source line, `None` for manifest findings.
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    /// Event pair dropped because `source` is not a sensor.
    pub fn skipped_pair(line: usize, source: &str, target: &str, found: Option<SymbolKind>) -> Self {
        match found {
            Some(kind) => Self {
                kind: LintKind::NonSensorSource,
                line: Some(line),
                message: format!(
                    "`{source}` is a {kind}, not a sensor; `{source} -> {target}` emits no bytecode"
                ),
            },
            None => Self {
                kind: LintKind::UnknownEventSource,
                line: Some(line),
                message: format!(
                    "`{source}` is not a sensor in the manifest; `{source} -> {target}` emits no bytecode"
                ),
            },
        }
    }

    pub fn unresolved_target(line: usize, target: &str, found: Option<SymbolKind>) -> Self {
        let what = match found {
            Some(kind) => format!("is a {kind}, not a state"),
            None => "is not a declared state".to_string(),
        };
        Self {
            kind: LintKind::UnresolvedTarget,
            line: Some(line),
            message: format!("event target `{target}` {what}; encoded as state id 0"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "warning (line {}): {}", line, self.message),
            None => write!(f, "warning (manifest): {}", self.message),
        }
    }
}

/// Findings for one sensor table entry.
pub fn lint_sensor(sensor: &Sensor) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    if !RE_BARE_NAME.is_match(&sensor.name) {
        found.push(Diagnostic {
            kind: LintKind::QuotedSensorName,
            line: None,
            message: format!(
                "sensor `{}` must be quoted to be used as an event source",
                sensor.name
            ),
        });
    }

    if sensor.id >= ids::STATE_FIRST {
        found.push(Diagnostic {
            kind: LintKind::SensorIdOverlap,
            line: None,
            message: format!(
                "sensor `{}` has id {:#04x}, inside the reserved state/gait/event ranges",
                sensor.name, sensor.id
            ),
        });
    }

    found
}
