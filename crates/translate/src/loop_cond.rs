//! Moves for-loop conditions into loop bodies.
//!
//! `for {init} cond {post} {body}` becomes
//! `for {init} true {post} { if iszero(cond) { break } body }`, so the
//! condition is evaluated under the body's scoping rules. Later word-size
//! expansion of the condition then produces declarations that are visible to
//! the comparison it feeds.

use qir_data::{Block, Dialect, Expression, If, Literal, Statement};

pub fn rewrite_loop_conditions(block: &mut Block, dialect: &dyn Dialect) {
    for statement in &mut block.statements {
        rewrite_statement(statement, dialect);
    }
}

fn rewrite_statement(statement: &mut Statement, dialect: &dyn Dialect) {
    match statement {
        Statement::Block(block) => rewrite_loop_conditions(block, dialect),
        Statement::FunctionDefinition(function) => rewrite_loop_conditions(&mut function.body, dialect),
        Statement::If(conditional) => rewrite_loop_conditions(&mut conditional.body, dialect),
        Statement::Switch(switch) => {
            for case in &mut switch.cases {
                rewrite_loop_conditions(&mut case.body, dialect);
            }
            if let Some(default) = &mut switch.default {
                rewrite_loop_conditions(default, dialect);
            }
        }
        Statement::ForLoop(loop_) => {
            rewrite_loop_conditions(&mut loop_.pre, dialect);
            rewrite_loop_conditions(&mut loop_.post, dialect);
            rewrite_loop_conditions(&mut loop_.body, dialect);

            if matches!(&loop_.condition, Expression::Literal(literal) if literal.is_true()) {
                return;
            }
            let zero_test =
                dialect.zero_test().expect("source dialect must provide a zero-test builtin");
            let condition = std::mem::replace(
                &mut loop_.condition,
                Expression::Literal(Literal::truth(true, dialect.boolean_type())),
            );
            let guard = Statement::If(If {
                condition: Expression::call(zero_test, vec![condition]),
                body: Block::new(vec![Statement::Break]),
            });
            loop_.body.statements.insert(0, guard);
        }
        Statement::VariableDeclaration(_)
        | Statement::Assignment(_)
        | Statement::Break
        | Statement::Continue
        | Statement::Leave
        | Statement::Expression(_) => {}
    }
}
