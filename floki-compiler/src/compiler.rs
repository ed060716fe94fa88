// floki-compiler/src/compiler.rs
// Declaration compiler: one session per compilation, single pass over the source

use fuf_contract::{ids, ChecksumLayout};
use tracing::{debug, info, warn};

use crate::assembler::{Assembler, RecordCounts};
use crate::ast::{Declaration, EventDecl, GaitDecl, StateDecl};
use crate::error::CompileError;
use crate::lint::Diagnostic;
use crate::options::CompileOptions;
use crate::parser::parse_line;
use crate::program::{EventEdge, Gait, Program, Sensor, State};
use crate::sensors::build_sensor_table;
use crate::symbols::{IdAllocator, SymbolKind, SymbolTable};

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub bytecode: Vec<u8>,
    pub checksum: u32,
    pub layout: ChecksumLayout,
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledProgram {
    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            states: self.program.states.len() as u16,
            gaits: self.program.gaits.len() as u16,
            events: self.program.events.len() as u16,
            sensors: self.program.sensors.len() as u16,
        }
    }

    /// BLAKE3 digest of the image, hex encoded.
    pub fn digest(&self) -> String {
        blake3::hash(&self.bytecode).to_hex().to_string()
    }
}

/// Tables, counters and output buffer of one compilation.
///
/// Sensors are fixed when the session is created. Each source line is then
/// fed through [`CompilerSession::compile_line`] in order, and
/// [`CompilerSession::finish`] seals the image.
pub struct CompilerSession {
    options: CompileOptions,
    assembler: Assembler,
    sensors: SymbolTable<Sensor>,
    states: SymbolTable<State>,
    gaits: SymbolTable<Gait>,
    events: Vec<EventEdge>,
    state_ids: IdAllocator,
    gait_ids: IdAllocator,
    event_ids: IdAllocator,
    diagnostics: Vec<Diagnostic>,
}

impl CompilerSession {
    pub fn new<S: AsRef<str>>(sensor_names: &[S], options: CompileOptions) -> Result<Self, CompileError> {
        let (sensors, sensor_lints) = build_sensor_table(sensor_names)?;
        let mut assembler = Assembler::new(options.memory_size, options.checksum);
        for sensor in sensors.iter() {
            assembler.append(&sensor.record())?;
        }

        let mut session = Self {
            options,
            assembler,
            sensors,
            states: SymbolTable::new(),
            gaits: SymbolTable::new(),
            events: Vec::new(),
            state_ids: IdAllocator::new(SymbolKind::State),
            gait_ids: IdAllocator::new(SymbolKind::Gait),
            event_ids: IdAllocator::new(SymbolKind::Event),
            diagnostics: Vec::new(),
        };
        for finding in sensor_lints {
            session.lint(finding);
        }
        Ok(session)
    }

    /// Compiles every line of `source`, numbering lines from 1.
    pub fn compile_source(&mut self, source: &str) -> Result<(), CompileError> {
        for (index, text) in source.lines().enumerate() {
            self.compile_line(index + 1, text)?;
        }
        Ok(())
    }

    pub fn compile_line(&mut self, line: usize, text: &str) -> Result<(), CompileError> {
        match parse_line(text).map_err(|e| e.at(line, text.trim()))? {
            Some(declaration) => self.declare(line, text.trim(), declaration),
            None => Ok(()),
        }
    }

    pub fn declare(
        &mut self,
        line: usize,
        text: &str,
        declaration: Declaration,
    ) -> Result<(), CompileError> {
        match declaration {
            Declaration::State(decl) => self.declare_state(line, text, decl),
            Declaration::Gait(decl) => self.declare_gait(line, text, decl),
            Declaration::Event(decl) => self.declare_event(line, text, decl),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn declare_state(&mut self, line: usize, text: &str, decl: StateDecl) -> Result<(), CompileError> {
        if let Some(previous) = self.states.get(&decl.name) {
            return Err(redeclared(SymbolKind::State, &decl.name, previous.line, line, text));
        }
        let used = self.identifier_count();
        let id = next_id(&mut self.state_ids, used, line, text)?;
        let state = State {
            name: decl.name,
            id,
            params: decl.params,
            line,
        };
        self.assembler.append(&state.record())?;
        debug!(line, id, name = %state.name, params = %state.params, "state");
        self.states.insert(state).map_err(table_rejected)
    }

    fn declare_gait(&mut self, line: usize, text: &str, decl: GaitDecl) -> Result<(), CompileError> {
        if let Some(previous) = self.gaits.get(&decl.name) {
            return Err(redeclared(SymbolKind::Gait, &decl.name, previous.line, line, text));
        }
        let used = self.identifier_count();
        let id = next_id(&mut self.gait_ids, used, line, text)?;
        let gait = Gait {
            name: decl.name,
            id,
            line,
        };
        self.assembler.append(&gait.record())?;
        debug!(line, id, name = %gait.name, "gait");
        self.gaits.insert(gait).map_err(table_rejected)
    }

    /// Emits one edge per `(sensor, target)` pair of the chain. Pairs whose
    /// source is not a sensor are dropped with a lint.
    fn declare_event(&mut self, line: usize, text: &str, decl: EventDecl) -> Result<(), CompileError> {
        for (source, target) in decl.pairs() {
            let Some(source_sensor_id) = self.sensors.id_of(&source.name) else {
                let found = self.classify(&source.name);
                self.lint(Diagnostic::skipped_pair(line, &source.name, &target.name, found));
                continue;
            };

            let target_state_id = match self.states.id_of(&target.name) {
                Some(id) => id,
                None => {
                    let found = self.classify(&target.name);
                    self.lint(Diagnostic::unresolved_target(line, &target.name, found));
                    ids::UNRESOLVED_STATE
                }
            };

            if let Some(guard) = &source.guard {
                debug!(line, sensor = %source.name, %guard, "guard not encoded");
            }

            let used = self.identifier_count();
            let id = next_id(&mut self.event_ids, used, line, text)?;
            let edge = EventEdge {
                id,
                source_sensor_id,
                target_state_id,
                line,
            };
            self.assembler.append(&edge.record())?;
            debug!(line, id, source = %source.name, target = %target.name, target_state_id, "event");
            self.events.push(edge);
        }
        Ok(())
    }

    /// Seals the image. Nothing is returned if any step fails.
    pub fn finish(self) -> Result<CompiledProgram, CompileError> {
        if self.options.deny_warnings && !self.diagnostics.is_empty() {
            return Err(CompileError::WarningsDenied {
                count: self.diagnostics.len(),
            });
        }

        // Each table is bounded by the identifier space, so these fit in u16.
        let expected = RecordCounts {
            states: self.states.len() as u16,
            gaits: self.gaits.len() as u16,
            events: self.events.len() as u16,
            sensors: self.sensors.len() as u16,
        };
        let (bytecode, checksum) = self.assembler.finish(expected)?;

        info!(
            sensors = expected.sensors,
            states = expected.states,
            gaits = expected.gaits,
            events = expected.events,
            size = bytecode.len(),
            checksum,
            warnings = self.diagnostics.len(),
            "compiled"
        );

        Ok(CompiledProgram {
            bytecode,
            checksum,
            layout: self.options.checksum,
            program: Program {
                sensors: self.sensors,
                states: self.states,
                gaits: self.gaits,
                events: self.events,
                memory_size: self.options.memory_size,
                flags: 0,
            },
            diagnostics: self.diagnostics,
        })
    }

    fn identifier_count(&self) -> usize {
        self.sensors.len() + self.states.len() + self.gaits.len() + self.events.len()
    }

    fn classify(&self, name: &str) -> Option<SymbolKind> {
        if self.states.contains(name) {
            Some(SymbolKind::State)
        } else if self.gaits.contains(name) {
            Some(SymbolKind::Gait)
        } else if self.sensors.contains(name) {
            Some(SymbolKind::Sensor)
        } else {
            None
        }
    }

    fn lint(&mut self, diagnostic: Diagnostic) {
        warn!(kind = ?diagnostic.kind, line = ?diagnostic.line, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }
}

/// Compiles `source` against the ordered sensor list in one call.
pub fn compile<S: AsRef<str>>(
    sensors: &[S],
    source: &str,
    options: &CompileOptions,
) -> Result<CompiledProgram, CompileError> {
    let mut session = CompilerSession::new(sensors, options.clone())?;
    session.compile_source(source)?;
    session.finish()
}

fn next_id(
    allocator: &mut IdAllocator,
    used: usize,
    line: usize,
    text: &str,
) -> Result<u8, CompileError> {
    if used >= ids::MAX_IDENTIFIERS {
        return Err(CompileError::Capacity {
            line,
            content: text.to_string(),
            message: format!(
                "identifier space exhausted, all {} identifiers are assigned",
                ids::MAX_IDENTIFIERS
            ),
        });
    }
    allocator.allocate().ok_or_else(|| CompileError::Capacity {
        line,
        content: text.to_string(),
        message: format!(
            "too many {} declarations, ids {} hold at most {}",
            allocator.kind(),
            allocator.describe(),
            allocator.capacity()
        ),
    })
}

fn redeclared(kind: SymbolKind, name: &str, first: usize, line: usize, text: &str) -> CompileError {
    CompileError::Syntax {
        line,
        content: text.to_string(),
        message: format!("{} `{}` already declared on line {}", kind, name, first),
    }
}

fn table_rejected<T: crate::symbols::Symbol>(existing: &T) -> CompileError {
    CompileError::Assembly(format!("symbol table already holds `{}`", existing.name()))
}
