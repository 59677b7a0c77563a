//! Netlist parser.
//!
//! A small SPICE-like, line-oriented format describing linear networks.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist     = { line }
//! line        = comment | directive | component | empty
//! comment     = ('*' | '#' | ';') { any_char }
//! directive   = ".end" | ".node" node+ | ".title" { word }
//! component   = name node+ [value] { source_spec | param }
//!
//! name        = prefix identifier
//! prefix      = 'R' | 'C' | 'L' | 'V' | 'I' | 'G'
//! node        = identifier | integer
//! value       = number [suffix] [unit]
//! source_spec = "DC" value | "AC" value [phase_degrees]
//! param       = identifier '=' value
//! suffix      = 'f' | 'p' | 'n' | 'u' | 'm' | 'k' | "meg" | 'M' | 'g' | 't'
//! ```
//!
//! Node `0` and `gnd` (any case) are ground. Every other node name is given
//! an unknown number in order of first appearance; `.node` may be used to fix
//! that order up front.
//!
//! # Component Types
//!
//! | Type | Description | Syntax |
//! |------|-------------|--------|
//! | R | Resistor | `R<name> <n+> <n-> <value>` |
//! | C | Capacitor | `C<name> <n+> <n-> <value>` |
//! | L | Inductor | `L<name> <n+> <n-> <value>` |
//! | V | Voltage Source | `V<name> <n+> <n-> [DC] <value> [AC <mag> [phase]]` |
//! | I | Current Source | `I<name> <n+> <n-> [DC] <value> [AC <mag> [phase]]` |
//! | G | VCCS | `G<name> <out+> <out-> <ctrl+> <ctrl-> <gm>` |
//!
//! # Example
//!
//! ```text
//! * RC low-pass
//! V1  in   0    DC 0 AC 1
//! R1  in   out  1k
//! C1  out  0    159.155n
//! .end
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse netlist text into an AST.
pub fn parse(input: &str) -> Result<NetlistAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a netlist file.
pub fn parse_file(path: &std::path::Path) -> Result<NetlistAst> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::KirchhoffError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}
