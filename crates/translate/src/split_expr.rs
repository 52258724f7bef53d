//! Three-address lowering.
//!
//! Every argument of every call becomes an identifier or a literal; nested
//! calls are outlined into fresh variable declarations, left to right, so the
//! declaration order matches argument order. `if` and `switch` scrutinees that
//! are calls are outlined entirely; for-loop conditions are left alone because
//! the condition-into-body pass already ran.

use crate::dispenser::NameDispenser;
use qir_data::{
    Block, Dialect, Expression, Statement, TypedName, VariableDeclaration,
};

pub fn split_expressions(block: &mut Block, dialect: &dyn Dialect, dispenser: &mut NameDispenser) {
    let mut splitter = Splitter { dispenser, dialect };
    splitter.split_block(block);
}

struct Splitter<'a> {
    dispenser: &'a mut NameDispenser,
    dialect: &'a dyn Dialect,
}

impl Splitter<'_> {
    fn split_block(&mut self, block: &mut Block) {
        let statements = std::mem::take(&mut block.statements);
        for mut statement in statements {
            let mut prefix = Vec::new();
            self.split_statement(&mut statement, &mut prefix);
            block.statements.extend(prefix);
            block.statements.push(statement);
        }
    }

    fn split_statement(&mut self, statement: &mut Statement, prefix: &mut Vec<Statement>) {
        match statement {
            Statement::Block(block) => self.split_block(block),
            Statement::FunctionDefinition(function) => self.split_block(&mut function.body),
            Statement::VariableDeclaration(declaration) => {
                if let Some(value) = &mut declaration.value {
                    self.split_arguments(value, prefix);
                }
            }
            Statement::Assignment(assignment) => self.split_arguments(&mut assignment.value, prefix),
            Statement::If(conditional) => {
                self.outline(&mut conditional.condition, prefix);
                self.split_block(&mut conditional.body);
            }
            Statement::Switch(switch) => {
                self.outline(&mut switch.expression, prefix);
                for case in &mut switch.cases {
                    self.split_block(&mut case.body);
                }
                if let Some(default) = &mut switch.default {
                    self.split_block(default);
                }
            }
            Statement::ForLoop(loop_) => {
                self.split_block(&mut loop_.pre);
                self.split_block(&mut loop_.post);
                self.split_block(&mut loop_.body);
            }
            Statement::Break | Statement::Continue | Statement::Leave => {}
            Statement::Expression(expression) => self.split_arguments(expression, prefix),
        }
    }

    /// Make every argument of `expression` trivial, keeping a top-level call
    /// in place.
    fn split_arguments(&mut self, expression: &mut Expression, prefix: &mut Vec<Statement>) {
        if let Expression::Call(call) = expression {
            for argument in &mut call.arguments {
                self.outline(argument, prefix);
            }
        }
    }

    /// Make `expression` itself trivial: a call is moved into a fresh
    /// single-variable declaration and replaced by that variable.
    fn outline(&mut self, expression: &mut Expression, prefix: &mut Vec<Statement>) {
        self.split_arguments(expression, prefix);
        if expression.is_trivial() {
            return;
        }
        let name = self.dispenser.fresh("expr");
        let call = std::mem::replace(expression, Expression::id(name.clone()));
        prefix.push(Statement::VariableDeclaration(VariableDeclaration {
            variables: vec![TypedName::new(name, self.dialect.default_type())],
            value: Some(call),
        }));
    }
}
