//! Canonical text form of the IR.
//!
//! Every node renders deterministically; the translator's internal-error dump,
//! the CLI output and the tests all compare against this form. Types equal to
//! a dialect default (`i64` in the Wasm dialect, the EVM word) are written
//! without a suffix, so only `:i32` annotations appear.

use crate::ast::*;
use std::fmt;

const INDENT: &str = "    ";

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_type_suffix(f: &mut fmt::Formatter<'_>, ty: Type) -> fmt::Result {
    match ty {
        Type::I32 => f.write_str(":i32"),
        Type::I64 | Type::Word => Ok(()),
    }
}

fn write_typed_names(f: &mut fmt::Formatter<'_>, names: &[TypedName]) -> fmt::Result {
    for (position, typed) in names.iter().enumerate() {
        if position > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&typed.name)?;
        write_type_suffix(f, typed.ty)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    if block.statements.is_empty() {
        return f.write_str("{ }");
    }
    f.write_str("{\n")?;
    for statement in &block.statements {
        write_indent(f, depth + 1)?;
        write_statement(f, statement, depth + 1)?;
        f.write_str("\n")?;
    }
    write_indent(f, depth)?;
    f.write_str("}")
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    match statement {
        Statement::Block(block) => write_block(f, block, depth),
        Statement::FunctionDefinition(function) => {
            write!(f, "function {}(", function.name)?;
            write_typed_names(f, &function.parameters)?;
            f.write_str(")")?;
            if !function.returns.is_empty() {
                f.write_str(" -> ")?;
                write_typed_names(f, &function.returns)?;
            }
            f.write_str(" ")?;
            write_block(f, &function.body, depth)
        }
        Statement::VariableDeclaration(declaration) => {
            f.write_str("let ")?;
            write_typed_names(f, &declaration.variables)?;
            if let Some(value) = &declaration.value {
                write!(f, " := {value}")?;
            }
            Ok(())
        }
        Statement::Assignment(assignment) => {
            write!(f, "{} := {}", assignment.targets.join(", "), assignment.value)
        }
        Statement::If(conditional) => {
            write!(f, "if {} ", conditional.condition)?;
            write_block(f, &conditional.body, depth)
        }
        Statement::Switch(switch) => {
            write!(f, "switch {}", switch.expression)?;
            for case in &switch.cases {
                f.write_str("\n")?;
                write_indent(f, depth)?;
                write!(f, "case {} ", case.value)?;
                write_block(f, &case.body, depth)?;
            }
            if let Some(default) = &switch.default {
                f.write_str("\n")?;
                write_indent(f, depth)?;
                f.write_str("default ")?;
                write_block(f, default, depth)?;
            }
            Ok(())
        }
        Statement::ForLoop(loop_) => {
            f.write_str("for ")?;
            write_block(f, &loop_.pre, depth)?;
            write!(f, " {} ", loop_.condition)?;
            write_block(f, &loop_.post, depth)?;
            f.write_str(" ")?;
            write_block(f, &loop_.body, depth)
        }
        Statement::Break => f.write_str("break"),
        Statement::Continue => f.write_str("continue"),
        Statement::Leave => f.write_str("leave"),
        Statement::Expression(expression) => write!(f, "{expression}"),
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            LiteralValue::Number(value) => {
                // Small values read better in decimal; wide ones in hex.
                if value.bit_len() <= 16 {
                    write!(f, "{value}")?;
                } else {
                    write!(f, "0x{value:x}")?;
                }
            }
            LiteralValue::Bool(value) => write!(f, "{value}")?,
        }
        write_type_suffix(f, self.ty)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{literal}"),
            Expression::Identifier(name) => f.write_str(name),
            Expression::Call(call) => write!(f, "{call}"),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (position, argument) in self.arguments.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{argument}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_text_eq;

    #[test]
    fn renders_declarations_and_calls() {
        let block = Block::new(vec![
            Statement::VariableDeclaration(VariableDeclaration {
                variables: vec![TypedName::new("x", Type::Word)],
                value: Some(Expression::call(
                    "add",
                    vec![
                        Expression::Literal(Literal::number(1u64, Type::Word)),
                        Expression::Literal(Literal::number(0x1234567890u64, Type::Word)),
                    ],
                )),
            }),
            Statement::Assignment(Assignment {
                targets: vec!["x".into()],
                value: Expression::id("x"),
            }),
        ]);

        assert_text_eq(
            &block.to_string(),
            "{\n    let x := add(1, 0x1234567890)\n    x := x\n}",
            "rendered block",
        );
    }

    #[test]
    fn renders_control_flow() {
        let block = Block::new(vec![
            Statement::ForLoop(ForLoop {
                pre: Block::new(vec![Statement::VariableDeclaration(VariableDeclaration {
                    variables: vec![TypedName::new("i", Type::Word)],
                    value: Some(Expression::Literal(Literal::number(0u64, Type::Word))),
                })]),
                condition: Expression::Literal(Literal::truth(true, Type::Word)),
                post: Block::default(),
                body: Block::new(vec![Statement::Break]),
            }),
            Statement::Switch(Switch {
                expression: Expression::id("x"),
                cases: vec![Case {
                    value: Literal::number(1u64, Type::I32),
                    body: Block::new(vec![Statement::Leave]),
                }],
                default: Some(Block::default()),
            }),
        ]);

        let expected = r#"
{
    for {
        let i := 0
    } true { } {
        break
    }
    switch x
    case 1:i32 {
        leave
    }
    default { }
}
"#;
        assert_text_eq(&block.to_string(), expected, "rendered control flow");
    }

    #[test]
    fn renders_functions_with_typed_returns() {
        let function = Statement::FunctionDefinition(FunctionDefinition {
            name: "narrow".into(),
            parameters: vec![TypedName::new("x", Type::I64)],
            returns: vec![TypedName::new("v", Type::I32)],
            body: Block::new(vec![Statement::Assignment(Assignment {
                targets: vec!["v".into()],
                value: Expression::call("i32.wrap_i64", vec![Expression::id("x")]),
            })]),
        });

        let expected = r#"
function narrow(x) -> v:i32 {
    v := i32.wrap_i64(x)
}
"#;
        assert_text_eq(&function.to_string(), expected, "rendered function");
    }
}
