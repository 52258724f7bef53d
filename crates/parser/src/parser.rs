//! Recursive-descent parser producing a [`Block`] for a given dialect.
//!
//! The grammar is the IR's textual form: a source is one block. The dialect
//! decides which type annotations exist and what untyped literals default to.

use crate::lexer::{self, Token, TokenKind};
use alloy_primitives::U256;
use qir_data::{
    Assignment, Block, Case, Diagnostic, Dialect, Expression, ForLoop, FunctionCall,
    FunctionDefinition, If, Literal, LiteralValue, Statement, Switch, Type, TypedName,
    VariableDeclaration,
};

/// Parse `source` as one block of `dialect` code.
pub fn parse(source: &str, dialect: &dyn Dialect) -> Result<Block, Vec<Diagnostic>> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser { source, dialect, tokens, position: 0 };
    let block = parser.parse_block().map_err(|diagnostic| vec![diagnostic])?;
    parser.expect(TokenKind::Eof, "after top-level block").map_err(|d| vec![d])?;
    Ok(block)
}

struct Parser<'src, 'd> {
    source: &'src str,
    dialect: &'d dyn Dialect,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_, '_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.position].kind
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn text(&self, token: &Token) -> &str {
        &self.source[token.span.clone()]
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic::spanned(message, token.span.clone())
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, Diagnostic> {
        if self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            let token = self.peek().clone();
            Err(self.error(
                &token,
                format!("expected {} {context}, found {}", kind.describe(), token.kind.describe()),
            ))
        }
    }

    fn identifier(&mut self, context: &str) -> Result<String, Diagnostic> {
        let token = self.expect(TokenKind::Identifier, context)?;
        Ok(self.text(&token).to_owned())
    }

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        self.expect(TokenKind::LBrace, "to open a block")?;
        let mut statements = Vec::new();
        while self.peek_kind() != TokenKind::RBrace {
            if self.peek_kind() == TokenKind::Eof {
                let token = self.peek().clone();
                return Err(self.error(&token, "unclosed block"));
            }
            statements.push(self.parse_statement()?);
        }
        self.bump();
        Ok(Block::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        match self.peek_kind() {
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Function => self.parse_function_definition(),
            TokenKind::Let => self.parse_variable_declaration(),
            TokenKind::If => {
                self.bump();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                Ok(Statement::If(If { condition, body }))
            }
            TokenKind::Switch => self.parse_switch(),
            TokenKind::For => {
                self.bump();
                let pre = self.parse_block()?;
                let condition = self.parse_expression()?;
                let post = self.parse_block()?;
                let body = self.parse_block()?;
                Ok(Statement::ForLoop(ForLoop { pre, condition, post, body }))
            }
            TokenKind::Break => {
                self.bump();
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.bump();
                Ok(Statement::Continue)
            }
            TokenKind::Leave => {
                self.bump();
                Ok(Statement::Leave)
            }
            TokenKind::Identifier => self.parse_assignment_or_call(),
            _ => {
                let token = self.peek().clone();
                Err(self.error(
                    &token,
                    format!("expected a statement, found {}", token.kind.describe()),
                ))
            }
        }
    }

    fn parse_function_definition(&mut self) -> Result<Statement, Diagnostic> {
        self.bump();
        let name = self.identifier("as function name")?;
        self.expect(TokenKind::LParen, "after function name")?;
        let parameters = self.parse_typed_name_list(TokenKind::RParen)?;
        self.expect(TokenKind::RParen, "after parameter list")?;
        let returns = if self.peek_kind() == TokenKind::Arrow {
            self.bump();
            self.parse_typed_name_list(TokenKind::LBrace)?
        } else {
            Vec::new()
        };
        let body = self.parse_block()?;
        Ok(Statement::FunctionDefinition(FunctionDefinition { name, parameters, returns, body }))
    }

    /// A comma-separated list of optionally typed names. A trailing comma
    /// before `terminator` is tolerated; the polyfill asset contains one.
    fn parse_typed_name_list(&mut self, terminator: TokenKind) -> Result<Vec<TypedName>, Diagnostic> {
        let mut names = Vec::new();
        if self.peek_kind() == terminator {
            return Ok(names);
        }
        loop {
            names.push(self.parse_typed_name()?);
            if self.peek_kind() != TokenKind::Comma {
                break;
            }
            self.bump();
            if self.peek_kind() == terminator {
                break;
            }
        }
        Ok(names)
    }

    fn parse_typed_name(&mut self) -> Result<TypedName, Diagnostic> {
        let name = self.identifier("as name")?;
        let ty = self.parse_type_suffix()?.unwrap_or_else(|| self.dialect.default_type());
        Ok(TypedName { name, ty })
    }

    fn parse_type_suffix(&mut self) -> Result<Option<Type>, Diagnostic> {
        if self.peek_kind() != TokenKind::Colon {
            return Ok(None);
        }
        self.bump();
        let token = self.expect(TokenKind::Identifier, "as type name")?;
        let text = self.text(&token).to_owned();
        match self.dialect.named_type(&text) {
            Some(ty) => Ok(Some(ty)),
            None => Err(self.error(
                &token,
                format!("unknown type `{text}` in the {} dialect", self.dialect.name()),
            )),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<Statement, Diagnostic> {
        self.bump();
        let mut variables = vec![self.parse_typed_name()?];
        while self.peek_kind() == TokenKind::Comma {
            self.bump();
            variables.push(self.parse_typed_name()?);
        }
        let value = if self.peek_kind() == TokenKind::Walrus {
            self.bump();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::VariableDeclaration(VariableDeclaration { variables, value }))
    }

    fn parse_switch(&mut self) -> Result<Statement, Diagnostic> {
        let switch_token = self.bump();
        let expression = self.parse_expression()?;
        let mut cases = Vec::new();
        while self.peek_kind() == TokenKind::Case {
            self.bump();
            let value = self.parse_literal()?;
            let body = self.parse_block()?;
            cases.push(Case { value, body });
        }
        let default = if self.peek_kind() == TokenKind::Default {
            self.bump();
            Some(self.parse_block()?)
        } else {
            None
        };
        if cases.is_empty() && default.is_none() {
            return Err(self.error(&switch_token, "switch needs at least one case or a default"));
        }
        Ok(Statement::Switch(Switch { expression, cases, default }))
    }

    fn parse_assignment_or_call(&mut self) -> Result<Statement, Diagnostic> {
        let first = self.identifier("as statement")?;
        match self.peek_kind() {
            TokenKind::LParen => {
                let call = self.parse_call(first)?;
                Ok(Statement::Expression(Expression::Call(call)))
            }
            TokenKind::Comma | TokenKind::Walrus => {
                let mut targets = vec![first];
                while self.peek_kind() == TokenKind::Comma {
                    self.bump();
                    targets.push(self.identifier("as assignment target")?);
                }
                self.expect(TokenKind::Walrus, "in assignment")?;
                let value = self.parse_expression()?;
                Ok(Statement::Assignment(Assignment { targets, value }))
            }
            _ => {
                let token = self.peek().clone();
                Err(self.error(&token, "expected `:=` or `(` after identifier"))
            }
        }
    }

    fn parse_call(&mut self, name: String) -> Result<FunctionCall, Diagnostic> {
        self.expect(TokenKind::LParen, "to open the argument list")?;
        let mut arguments = Vec::new();
        if self.peek_kind() != TokenKind::RParen {
            loop {
                arguments.push(self.parse_expression()?);
                if self.peek_kind() != TokenKind::Comma {
                    break;
                }
                self.bump();
            }
        }
        self.expect(TokenKind::RParen, "to close the argument list")?;
        Ok(FunctionCall { name, arguments })
    }

    fn parse_expression(&mut self) -> Result<Expression, Diagnostic> {
        match self.peek_kind() {
            TokenKind::Identifier => {
                let name = self.identifier("in expression")?;
                if self.peek_kind() == TokenKind::LParen {
                    Ok(Expression::Call(self.parse_call(name)?))
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            TokenKind::Number | TokenKind::HexNumber | TokenKind::True | TokenKind::False => {
                Ok(Expression::Literal(self.parse_literal()?))
            }
            _ => {
                let token = self.peek().clone();
                Err(self.error(
                    &token,
                    format!("expected an expression, found {}", token.kind.describe()),
                ))
            }
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, Diagnostic> {
        let token = self.bump();
        let value = match token.kind {
            TokenKind::True => LiteralValue::Bool(true),
            TokenKind::False => LiteralValue::Bool(false),
            TokenKind::Number => {
                let text = self.text(&token);
                match U256::from_str_radix(text, 10) {
                    Ok(number) => LiteralValue::Number(number),
                    Err(_) => {
                        return Err(self.error(
                            &token,
                            format!("literal {text} does not fit into 256 bits"),
                        ));
                    }
                }
            }
            TokenKind::HexNumber => {
                let text = self.text(&token);
                match U256::from_str_radix(&text[2..], 16) {
                    Ok(number) => LiteralValue::Number(number),
                    Err(_) => {
                        return Err(self.error(
                            &token,
                            format!("literal {text} does not fit into 256 bits"),
                        ));
                    }
                }
            }
            _ => {
                return Err(
                    self.error(&token, format!("expected a literal, found {}", token.kind.describe()))
                );
            }
        };
        let ty = match self.parse_type_suffix()? {
            Some(ty) => ty,
            None => match value {
                // `true`/`false` carry the dialect's condition type.
                LiteralValue::Bool(_) => self.dialect.boolean_type(),
                LiteralValue::Number(_) => self.dialect.default_type(),
            },
        };
        if let LiteralValue::Number(number) = &value {
            if number.bit_len() as u32 > ty.bits() {
                return Err(self.error(&token, format!("literal does not fit into {} bits", ty.bits())));
            }
        }
        Ok(Literal { value, ty })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::{EvmDialect, WasmDialect};
    use test_utils::assert_text_eq;

    fn roundtrip(source: &str, dialect: &dyn Dialect) -> String {
        parse(source, dialect)
            .unwrap_or_else(|errors| panic!("parse failed: {}", errors[0]))
            .to_string()
    }

    #[test]
    fn parses_evm_program() {
        let rendered = roundtrip(
            r#"
{
    let x := add(1, 2)
    if lt(x, 3) {
        x := 0
    }
    for { let i := 0 } lt(i, 3) { i := add(i, 1) } {
        sstore(i, x)
    }
}
"#,
            &EvmDialect,
        );
        let expected = r#"
{
    let x := add(1, 2)
    if lt(x, 3) {
        x := 0
    }
    for {
        let i := 0
    } lt(i, 3) {
        i := add(i, 1)
    } {
        sstore(i, x)
    }
}
"#;
        assert_text_eq(&rendered, expected, "parsed program");
    }

    #[test]
    fn parses_wasm_program_with_types() {
        let rendered = roundtrip(
            r#"
{
    function or_bool(a, b) -> r:i32 {
        r := i32.eqz(i64.eqz(i64.or(a, b)))
    }
    function narrow(x) -> v:i32 {
        if i64.ne(0, i64.shr_u(x, 32)) { unreachable() }
        v := i32.wrap_i64(x)
    }
    let y:i32 := narrow(0xffffffffffffffff)
}
"#,
            &WasmDialect,
        );
        assert!(rendered.contains("function or_bool(a, b) -> r:i32"));
        assert!(rendered.contains("let y:i32 := narrow(0xffffffffffffffff)"));
    }

    #[test]
    fn parses_switch_with_typed_cases() {
        let rendered = roundtrip(
            r#"
{
    switch i32.wrap_i64(x)
    case 0:i32 { y := 1 }
    case 1:i32 { y := 2 }
    default { y := 3 }
}
"#,
            &WasmDialect,
        );
        assert!(rendered.contains("case 0:i32"));
        assert!(rendered.contains("default"));
    }

    #[test]
    fn tolerates_trailing_comma_in_parameter_list() {
        let block = parse("{ function f(a, b,) { } }", &EvmDialect).unwrap();
        let Statement::FunctionDefinition(function) = &block.statements[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(function.parameters.len(), 2);
    }

    #[test]
    fn multi_value_declarations_and_assignments() {
        let block = parse("{ let a, b := f() a, b := g() }", &EvmDialect).unwrap();
        assert_eq!(block.statements.len(), 2);
    }

    #[test]
    fn rejects_oversized_literals() {
        let errors = parse(
            "{ let x := 0x10000000000000000000000000000000000000000000000000000000000000000 }",
            &EvmDialect,
        )
        .unwrap_err();
        assert!(errors[0].message.contains("does not fit into 256 bits"), "{}", errors[0]);

        let errors = parse("{ let x := 0x100000000:i32 }", &WasmDialect).unwrap_err();
        assert!(errors[0].message.contains("does not fit into 32 bits"), "{}", errors[0]);
    }

    #[test]
    fn rejects_types_in_evm_dialect() {
        let errors = parse("{ let x:i32 := 0 }", &EvmDialect).unwrap_err();
        assert!(errors[0].message.contains("unknown type"), "{}", errors[0]);
    }

    #[test]
    fn rejects_empty_switch_and_unclosed_block() {
        let errors = parse("{ switch x }", &EvmDialect).unwrap_err();
        assert!(errors[0].message.contains("at least one case"), "{}", errors[0]);

        let errors = parse("{ let x := 1 ", &EvmDialect).unwrap_err();
        assert!(errors[0].message.contains("unclosed block"), "{}", errors[0]);
    }
}
