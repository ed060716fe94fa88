//! Compiled program model: the symbol tables and event edges one
//! compilation produced, mirrored one-to-one by the records in the image.

use fuf_contract::Record;
use serde::Serialize;

use crate::symbols::{Symbol, SymbolTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sensor {
    pub name: String,
    pub id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub name: String,
    pub id: u8,
    pub params: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gait {
    pub name: String,
    pub id: u8,
    pub line: usize,
}

/// "When `source_sensor_id` fires, transition to `target_state_id`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventEdge {
    pub id: u8,
    pub source_sensor_id: u8,
    /// `0` when the target was not a declared state.
    pub target_state_id: u8,
    pub line: usize,
}

impl Symbol for Sensor {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> u8 {
        self.id
    }
}

impl Symbol for State {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> u8 {
        self.id
    }
}

impl Symbol for Gait {
    fn name(&self) -> &str {
        &self.name
    }
    fn id(&self) -> u8 {
        self.id
    }
}

impl Sensor {
    pub fn record(&self) -> Record {
        Record::Sensor {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl State {
    pub fn record(&self) -> Record {
        Record::State {
            id: self.id,
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }
}

impl Gait {
    pub fn record(&self) -> Record {
        Record::Gait {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl EventEdge {
    pub fn record(&self) -> Record {
        Record::Event {
            id: self.id,
            sensor_id: self.source_sensor_id,
            state_id: self.target_state_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub sensors: SymbolTable<Sensor>,
    pub states: SymbolTable<State>,
    pub gaits: SymbolTable<Gait>,
    pub events: Vec<EventEdge>,
    pub memory_size: u32,
    pub flags: u16,
}

impl Program {
    /// Sensors, states and gaits; event edges are not symbols.
    pub fn symbol_count(&self) -> usize {
        self.sensors.len() + self.states.len() + self.gaits.len()
    }
}
