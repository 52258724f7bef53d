//! Fresh-name allocation.

use qir_data::{Block, Case, Expression, ForLoop, Name, Statement, Switch};
use std::collections::BTreeSet;

/// Hands out identifiers that collide neither with any name already present
/// in the unit nor with the reserved set (the polyfill's function names plus
/// the synthesized entry name).
pub struct NameDispenser {
    used: BTreeSet<Name>,
}

impl NameDispenser {
    pub fn new(block: &Block, reserved: impl IntoIterator<Item = Name>) -> Self {
        let mut used: BTreeSet<Name> = reserved.into_iter().collect();
        collect_block(block, &mut used);
        Self { used }
    }

    /// `hint` if it is free, otherwise `hint_<n>` with the smallest `n >= 1`
    /// that makes the result free. The returned name is recorded as used.
    pub fn fresh(&mut self, hint: &str) -> Name {
        let name = if !self.used.contains(hint) {
            hint.to_owned()
        } else {
            let mut counter = 1usize;
            loop {
                let candidate = format!("{hint}_{counter}");
                if !self.used.contains(&candidate) {
                    break candidate;
                }
                counter += 1;
            }
        };
        self.used.insert(name.clone());
        name
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}

fn collect_block(block: &Block, used: &mut BTreeSet<Name>) {
    for statement in &block.statements {
        collect_statement(statement, used);
    }
}

fn collect_statement(statement: &Statement, used: &mut BTreeSet<Name>) {
    match statement {
        Statement::Block(block) => collect_block(block, used),
        Statement::FunctionDefinition(function) => {
            used.insert(function.name.clone());
            for typed in function.parameters.iter().chain(&function.returns) {
                used.insert(typed.name.clone());
            }
            collect_block(&function.body, used);
        }
        Statement::VariableDeclaration(declaration) => {
            for typed in &declaration.variables {
                used.insert(typed.name.clone());
            }
            if let Some(value) = &declaration.value {
                collect_expression(value, used);
            }
        }
        Statement::Assignment(assignment) => {
            for target in &assignment.targets {
                used.insert(target.clone());
            }
            collect_expression(&assignment.value, used);
        }
        Statement::If(conditional) => {
            collect_expression(&conditional.condition, used);
            collect_block(&conditional.body, used);
        }
        Statement::Switch(Switch { expression, cases, default }) => {
            collect_expression(expression, used);
            for Case { body, .. } in cases {
                collect_block(body, used);
            }
            if let Some(default) = default {
                collect_block(default, used);
            }
        }
        Statement::ForLoop(ForLoop { pre, condition, post, body }) => {
            collect_block(pre, used);
            collect_expression(condition, used);
            collect_block(post, used);
            collect_block(body, used);
        }
        Statement::Break | Statement::Continue | Statement::Leave => {}
        Statement::Expression(expression) => collect_expression(expression, used),
    }
}

fn collect_expression(expression: &Expression, used: &mut BTreeSet<Name>) {
    match expression {
        Expression::Literal(_) => {}
        Expression::Identifier(name) => {
            used.insert(name.clone());
        }
        Expression::Call(call) => {
            used.insert(call.name.clone());
            for argument in &call.arguments {
                collect_expression(argument, used);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::EvmDialect;

    fn dispenser_for(source: &str) -> NameDispenser {
        let block = qir_parser::parse(source, &EvmDialect).expect("parse");
        NameDispenser::new(&block, ["reserved".to_owned()])
    }

    #[test]
    fn avoids_used_and_reserved_names() {
        let mut dispenser = dispenser_for("{ let x := 1 let x_1 := 2 }");
        assert_eq!(dispenser.fresh("x"), "x_2");
        assert_eq!(dispenser.fresh("x"), "x_3");
        assert_eq!(dispenser.fresh("reserved"), "reserved_1");
        assert_eq!(dispenser.fresh("y"), "y");
        assert_eq!(dispenser.fresh("y"), "y_1");
    }

    #[test]
    fn collects_names_from_every_position() {
        let dispenser = dispenser_for(
            "{ function f(a) -> r { r := g(a) } for { let i := 1 } i { i := h(i) } { pop(q) } }",
        );
        for name in ["f", "a", "r", "g", "i", "h", "q", "pop"] {
            assert!(dispenser.is_used(name), "{name} should be collected");
        }
    }
}
