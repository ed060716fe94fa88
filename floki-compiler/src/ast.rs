//! Syntax tree for Floki behavior sources.
//!
//! A source is a flat list of declarations, one per line. Nothing nests.

use std::fmt;

/// A parsed declaration together with the 1-based line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub line: usize,
    pub node: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    State(StateDecl),
    Gait(GaitDecl),
    Event(EventDecl),
}

/// `state <name>` or `state <name>(<params>)`
#[derive(Debug, Clone, PartialEq)]
pub struct StateDecl {
    pub name: String,
    /// Raw text between the parentheses, never interpreted.
    pub params: String,
}

/// `gait <name>`
#[derive(Debug, Clone, PartialEq)]
pub struct GaitDecl {
    pub name: String,
}

/// `event <token> -> <token> [-> <token> ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
    pub chain: Vec<EventToken>,
}

impl EventDecl {
    /// Consecutive `(source, target)` pairs of the chain.
    pub fn pairs(&self) -> impl Iterator<Item = (&EventToken, &EventToken)> {
        self.chain.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventToken {
    pub name: String,
    pub guard: Option<Guard>,
}

impl EventToken {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: None,
        }
    }
}

/// Trigger condition such as `> 20`. Parsed but not encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    pub op: Comparison,
    pub operand: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.operand)
    }
}

impl fmt::Display for EventToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.guard {
            Some(guard) => write!(f, "{} {}", self.name, guard),
            None => f.write_str(&self.name),
        }
    }
}
