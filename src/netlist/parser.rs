//! Parser for netlists.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{KirchhoffError, Result};

/// Parser for netlists.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<NetlistAst> {
        let mut ast = NetlistAst::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => {
                    if !self.parse_directive(&mut ast)? {
                        break;
                    }
                }
                TokenKind::Identifier => {
                    let component = self.parse_component()?;
                    for node in &component.nodes {
                        ast.declare_node(node);
                    }
                    ast.components.push(component);
                }
                _ => {
                    return Err(KirchhoffError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            if self.current.kind == TokenKind::Newline {
                self.advance()?;
            }
        }

        tracing::debug!(
            components = ast.components.len(),
            nodes = ast.nodes.len(),
            "netlist parsed"
        );
        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    /// Parse a node name: an identifier or a bare number.
    fn expect_node(&mut self, line: usize) -> Result<String> {
        match self.current.kind {
            TokenKind::Identifier | TokenKind::Number => {
                let text = self.current.text.clone();
                self.advance()?;
                Ok(if is_ground(&text) {
                    GROUND_NAME.to_string()
                } else {
                    text
                })
            }
            _ => Err(KirchhoffError::parse(line, "expected node name")),
        }
    }

    fn expect_value(&mut self, line: usize) -> Result<f64> {
        if self.current.kind != TokenKind::Number {
            return Err(KirchhoffError::parse(
                line,
                format!("expected a number, got {:?}", self.current.text),
            ));
        }
        let text = self.current.text.clone();
        self.advance()?;
        parse_value(&text)
            .ok_or_else(|| KirchhoffError::parse(line, format!("invalid number: {}", text)))
    }

    /// Returns `false` when parsing should stop (`.end`).
    fn parse_directive(&mut self, ast: &mut NetlistAst) -> Result<bool> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".end" => return Ok(false),
            ".node" => {
                while !self.at_line_end() {
                    let node = self.expect_node(line)?;
                    ast.declare_node(&node);
                }
            }
            ".title" => {
                let mut words = Vec::new();
                while !self.at_line_end() {
                    words.push(self.current.text.clone());
                    self.advance()?;
                }
                ast.title = Some(words.join(" "));
            }
            _ => {
                return Err(KirchhoffError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(true)
    }

    fn parse_component(&mut self) -> Result<ComponentDef> {
        let name = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        let first_char = name.chars().next().unwrap_or('?');
        let component_type = ComponentType::from_prefix(first_char).ok_or_else(|| {
            KirchhoffError::UnknownComponentType {
                component_type: name.clone(),
                line,
            }
        })?;

        let expected_nodes = component_type.expected_node_count();
        let mut nodes = Vec::with_capacity(expected_nodes);
        while nodes.len() < expected_nodes {
            if self.at_line_end() {
                return Err(KirchhoffError::invalid_component(
                    &name,
                    line,
                    format!("expected {} nodes, got {}", expected_nodes, nodes.len()),
                ));
            }
            nodes.push(self.expect_node(line)?);
        }

        let mut value = None;
        let mut params = HashMap::new();

        while !self.at_line_end() {
            match self.current.kind {
                TokenKind::Identifier if component_type.is_source() => {
                    let keyword = self.current.text.to_lowercase();
                    self.advance()?;
                    match keyword.as_str() {
                        "dc" => value = Some(self.expect_value(line)?),
                        "ac" => {
                            params.insert("ac".to_string(), self.expect_value(line)?);
                            if self.current.kind == TokenKind::Number {
                                params.insert("acphase".to_string(), self.expect_value(line)?);
                            }
                        }
                        _ => {
                            return Err(KirchhoffError::invalid_component(
                                &name,
                                line,
                                format!("unknown source keyword '{}'", keyword),
                            ));
                        }
                    }
                }
                TokenKind::Identifier => {
                    let key = self.current.text.to_lowercase();
                    self.advance()?;
                    if self.current.kind != TokenKind::Equals {
                        return Err(KirchhoffError::invalid_component(
                            &name,
                            line,
                            format!("unexpected '{}'", key),
                        ));
                    }
                    self.advance()?;
                    params.insert(key, self.expect_value(line)?);
                }
                TokenKind::Number if value.is_none() => {
                    value = Some(self.expect_value(line)?);
                }
                _ => {
                    return Err(KirchhoffError::invalid_component(
                        &name,
                        line,
                        format!("unexpected '{}'", self.current.text),
                    ));
                }
            }
        }

        Ok(ComponentDef {
            component_type,
            name,
            nodes,
            value,
            params,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_resistor() {
        let ast = parse("R1 in out 10k").unwrap();
        assert_eq!(ast.components.len(), 1);
        let r = &ast.components[0];
        assert_eq!(r.component_type, ComponentType::Resistor);
        assert_eq!(r.name, "R1");
        assert_eq!(r.nodes, vec!["in", "out"]);
        assert_eq!(r.value, Some(10_000.0));
    }

    #[test]
    fn test_nodes_in_order_of_first_appearance() {
        let ast = parse("R1 b a 1k\nR2 a GND 1k\nC1 c b 1n\n").unwrap();
        assert_eq!(ast.nodes, vec!["b", "a", "c"]);
        assert_eq!(ast.components[1].nodes[1], "0");
    }

    #[test]
    fn test_node_directive_fixes_numbering() {
        let ast = parse(".node out in\nR1 in out 1k").unwrap();
        assert_eq!(ast.nodes, vec!["out", "in"]);
    }

    #[test]
    fn test_numeric_node_names() {
        let ast = parse("V1 1 0 DC 5\nR1 1 2 1k\nR2 2 0 2k").unwrap();
        assert_eq!(ast.nodes, vec!["1", "2"]);
        assert_eq!(ast.components[0].value, Some(5.0));
    }

    #[test]
    fn test_parse_source_with_ac() {
        let ast = parse("V1 in 0 DC 1.5 AC 1 90\nI1 0 out AC 2m").unwrap();
        let v = &ast.components[0];
        assert_eq!(v.value, Some(1.5));
        assert_relative_eq!(v.params["ac"], 1.0);
        assert_relative_eq!(v.params["acphase"], 90.0);
        let i = &ast.components[1];
        assert_eq!(i.value, None);
        assert_relative_eq!(i.params["ac"], 2e-3);
    }

    #[test]
    fn test_parse_vccs() {
        let ast = parse("G1 out 0 in 0 5m").unwrap();
        let g = &ast.components[0];
        assert_eq!(g.component_type, ComponentType::Vccs);
        assert_eq!(g.nodes, vec!["out", "0", "in", "0"]);
        assert_relative_eq!(g.value.unwrap(), 5e-3);
    }

    #[test]
    fn test_end_stops_parsing() {
        let ast = parse("R1 a 0 1k\n.end\nR2 a 0 1k").unwrap();
        assert_eq!(ast.components.len(), 1);
    }

    #[test]
    fn test_title_and_comments() {
        let input = ".title RC divider\n* comment line\nR1 in out 1k ; inline\n# another\n";
        let ast = parse(input).unwrap();
        assert_eq!(ast.title.as_deref(), Some("RC divider"));
        assert_eq!(ast.components.len(), 1);
    }

    #[test]
    fn test_missing_nodes_is_error() {
        let err = parse("R1 a").unwrap_err();
        assert!(matches!(err, KirchhoffError::InvalidComponent { line: 1, .. }));
    }

    #[test]
    fn test_unknown_prefix_is_error() {
        let err = parse("R1 a 0 1k\nX1 a b sub").unwrap_err();
        assert!(matches!(
            err,
            KirchhoffError::UnknownComponentType { line: 2, .. }
        ));
    }
}
