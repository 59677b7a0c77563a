//! Abstract Syntax Tree types for netlists.

use std::collections::HashMap;
use std::fmt;

/// Name under which ground is stored after normalization.
pub const GROUND_NAME: &str = "0";

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct NetlistAst {
    /// Optional title from a `.title` directive
    pub title: Option<String>,
    /// All component instances, in source order
    pub components: Vec<ComponentDef>,
    /// Non-ground node names in order of first appearance
    pub nodes: Vec<String>,
}

impl NetlistAst {
    /// Create a new empty netlist AST.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node name if it has not been seen yet. Ground is skipped.
    pub fn declare_node(&mut self, name: &str) {
        if !is_ground(name) && !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
    }
}

/// Whether a node name refers to ground (`0` or `gnd`, any case).
pub fn is_ground(name: &str) -> bool {
    name == GROUND_NAME || name.eq_ignore_ascii_case("gnd")
}

/// A component line from the netlist.
#[derive(Debug, Clone)]
pub struct ComponentDef {
    /// Component type, taken from the first letter of the name
    pub component_type: ComponentType,
    /// Unique component name
    pub name: String,
    /// Connected node names; ground is normalized to `"0"`
    pub nodes: Vec<String>,
    /// Component value (resistance, capacitance, DC level, ...)
    pub value: Option<f64>,
    /// Keyword parameters such as `ac` and `acphase`
    pub params: HashMap<String, f64>,
    /// Source line number for error reporting
    pub line: usize,
}

impl ComponentDef {
    /// Required value, or an `InvalidComponent` error naming what is missing.
    pub fn require_value(&self, what: &str) -> crate::error::Result<f64> {
        self.value.ok_or_else(|| {
            crate::error::KirchhoffError::invalid_component(
                &self.name,
                self.line,
                format!("{} requires a value", what),
            )
        })
    }
}

/// Component types understood by the netlist parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Resistor
    Resistor,
    /// Capacitor
    Capacitor,
    /// Inductor
    Inductor,
    /// Independent voltage source
    VoltageSource,
    /// Independent current source
    CurrentSource,
    /// Voltage-controlled current source
    Vccs,
}

impl ComponentType {
    /// All component types, in prefix order.
    pub const ALL: [ComponentType; 6] = [
        Self::Resistor,
        Self::Capacitor,
        Self::Inductor,
        Self::VoltageSource,
        Self::CurrentSource,
        Self::Vccs,
    ];

    /// Parse a component type from the first letter of its name.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'R' => Some(Self::Resistor),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'V' => Some(Self::VoltageSource),
            'I' => Some(Self::CurrentSource),
            'G' => Some(Self::Vccs),
            _ => None,
        }
    }

    /// Name prefix letter.
    pub fn prefix(&self) -> char {
        match self {
            Self::Resistor => 'R',
            Self::Capacitor => 'C',
            Self::Inductor => 'L',
            Self::VoltageSource => 'V',
            Self::CurrentSource => 'I',
            Self::Vccs => 'G',
        }
    }

    /// Get the expected number of nodes for this component type.
    pub fn expected_node_count(&self) -> usize {
        match self {
            Self::Vccs => 4, // out+, out-, ctrl+, ctrl-
            _ => 2,
        }
    }

    /// Whether the type accepts `DC`/`AC` source keywords.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::VoltageSource | Self::CurrentSource)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resistor => "resistor",
            Self::Capacitor => "capacitor",
            Self::Inductor => "inductor",
            Self::VoltageSource => "voltage source",
            Self::CurrentSource => "current source",
            Self::Vccs => "vccs",
        };
        write!(f, "{}", name)
    }
}
