//! Sensor table: ids `1..=N` in manifest order, built once before any
//! declaration is compiled.

use tracing::debug;

use crate::error::CompileError;
use crate::lint::{lint_sensor, Diagnostic};
use crate::program::Sensor;
use crate::symbols::{IdAllocator, SymbolKind, SymbolTable};

pub struct SensorTableBuilder {
    ids: IdAllocator,
    table: SymbolTable<Sensor>,
    diagnostics: Vec<Diagnostic>,
}

impl SensorTableBuilder {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(SymbolKind::Sensor),
            table: SymbolTable::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, name: &str) -> Result<u8, CompileError> {
        if name.is_empty() {
            return Err(CompileError::Configuration(format!(
                "sensor #{} has an empty name",
                self.table.len() + 1
            )));
        }
        if name.contains('\0') {
            return Err(CompileError::Configuration(format!(
                "sensor `{}` contains a NUL byte",
                name.escape_debug()
            )));
        }
        let id = self.ids.allocate().ok_or_else(|| {
            CompileError::Configuration(format!(
                "too many sensors: at most {} fit in ids {}",
                self.ids.capacity(),
                self.ids.describe()
            ))
        })?;

        let sensor = Sensor {
            name: name.to_string(),
            id,
        };
        let findings = lint_sensor(&sensor);
        self.table.insert(sensor).map_err(|existing| {
            CompileError::Configuration(format!(
                "duplicate sensor `{}` (already assigned id {})",
                name, existing.id
            ))
        })?;
        debug!(id, name, "sensor");
        self.diagnostics.extend(findings);
        Ok(id)
    }

    pub fn finish(self) -> (SymbolTable<Sensor>, Vec<Diagnostic>) {
        (self.table, self.diagnostics)
    }
}

impl Default for SensorTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the whole table from an ordered list of names.
pub fn build_sensor_table<S: AsRef<str>>(
    names: &[S],
) -> Result<(SymbolTable<Sensor>, Vec<Diagnostic>), CompileError> {
    let mut builder = SensorTableBuilder::new();
    for name in names {
        builder.add(name.as_ref())?;
    }
    Ok(builder.finish())
}
