//! Function hoisting.
//!
//! Lifts every nested function definition to the end of the top-level block,
//! in first-visit order. Legal only after disambiguation, when every name is
//! globally unique and moving a definition cannot change what any call
//! resolves to.

use qir_data::{Block, Statement};

pub fn hoist_functions(block: &mut Block) {
    let mut hoisted = Vec::new();
    for statement in &mut block.statements {
        extract_from_statement(statement, &mut hoisted);
    }
    block.statements.append(&mut hoisted);
}

fn extract_from_block(block: &mut Block, hoisted: &mut Vec<Statement>) {
    let statements = std::mem::take(&mut block.statements);
    for mut statement in statements {
        extract_from_statement(&mut statement, hoisted);
        if statement.is_function_definition() {
            hoisted.push(statement);
        } else {
            block.statements.push(statement);
        }
    }
}

fn extract_from_statement(statement: &mut Statement, hoisted: &mut Vec<Statement>) {
    match statement {
        Statement::Block(block) => extract_from_block(block, hoisted),
        Statement::FunctionDefinition(function) => extract_from_block(&mut function.body, hoisted),
        Statement::If(conditional) => extract_from_block(&mut conditional.body, hoisted),
        Statement::Switch(switch) => {
            for case in &mut switch.cases {
                extract_from_block(&mut case.body, hoisted);
            }
            if let Some(default) = &mut switch.default {
                extract_from_block(default, hoisted);
            }
        }
        Statement::ForLoop(loop_) => {
            extract_from_block(&mut loop_.pre, hoisted);
            extract_from_block(&mut loop_.post, hoisted);
            extract_from_block(&mut loop_.body, hoisted);
        }
        Statement::VariableDeclaration(_)
        | Statement::Assignment(_)
        | Statement::Break
        | Statement::Continue
        | Statement::Leave
        | Statement::Expression(_) => {}
    }
}
