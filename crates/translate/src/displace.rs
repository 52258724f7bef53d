//! Renames user declarations that collide with polyfill function names.
//!
//! Requires a disambiguated tree: names are globally unique, so one flat
//! rename map covers the whole unit. The pipeline runs this pass right after
//! disambiguation (so the helper calls introduced by the word-size transform
//! cannot be captured by user declarations) and once more after the
//! transform, before the polyfill is spliced in.

use crate::dispenser::NameDispenser;
use qir_data::{Block, Expression, Name, Statement};
use std::collections::{BTreeSet, HashMap};

pub fn displace_names(block: &mut Block, taken: &BTreeSet<Name>, dispenser: &mut NameDispenser) {
    let mut renames = HashMap::new();
    collect_collisions(block, taken, dispenser, &mut renames);
    if renames.is_empty() {
        return;
    }
    apply_renames(block, &renames);
}

fn declare(
    name: &Name,
    taken: &BTreeSet<Name>,
    dispenser: &mut NameDispenser,
    renames: &mut HashMap<Name, Name>,
) {
    if taken.contains(name) && !renames.contains_key(name) {
        let fresh = dispenser.fresh(name);
        renames.insert(name.clone(), fresh);
    }
}

fn collect_collisions(
    block: &Block,
    taken: &BTreeSet<Name>,
    dispenser: &mut NameDispenser,
    renames: &mut HashMap<Name, Name>,
) {
    for statement in &block.statements {
        match statement {
            Statement::Block(inner) => collect_collisions(inner, taken, dispenser, renames),
            Statement::FunctionDefinition(function) => {
                declare(&function.name, taken, dispenser, renames);
                for typed in function.parameters.iter().chain(&function.returns) {
                    declare(&typed.name, taken, dispenser, renames);
                }
                collect_collisions(&function.body, taken, dispenser, renames);
            }
            Statement::VariableDeclaration(declaration) => {
                for typed in &declaration.variables {
                    declare(&typed.name, taken, dispenser, renames);
                }
            }
            Statement::If(conditional) => {
                collect_collisions(&conditional.body, taken, dispenser, renames)
            }
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    collect_collisions(&case.body, taken, dispenser, renames);
                }
                if let Some(default) = &switch.default {
                    collect_collisions(default, taken, dispenser, renames);
                }
            }
            Statement::ForLoop(loop_) => {
                collect_collisions(&loop_.pre, taken, dispenser, renames);
                collect_collisions(&loop_.post, taken, dispenser, renames);
                collect_collisions(&loop_.body, taken, dispenser, renames);
            }
            Statement::Assignment(_)
            | Statement::Break
            | Statement::Continue
            | Statement::Leave
            | Statement::Expression(_) => {}
        }
    }
}

fn apply_renames(block: &mut Block, renames: &HashMap<Name, Name>) {
    let rename = |name: &mut Name| {
        if let Some(fresh) = renames.get(name) {
            *name = fresh.clone();
        }
    };
    for statement in &mut block.statements {
        match statement {
            Statement::Block(inner) => apply_renames(inner, renames),
            Statement::FunctionDefinition(function) => {
                rename(&mut function.name);
                for typed in function.parameters.iter_mut().chain(&mut function.returns) {
                    rename(&mut typed.name);
                }
                apply_renames(&mut function.body, renames);
            }
            Statement::VariableDeclaration(declaration) => {
                for typed in &mut declaration.variables {
                    rename(&mut typed.name);
                }
                if let Some(value) = &mut declaration.value {
                    rename_expression(value, renames);
                }
            }
            Statement::Assignment(assignment) => {
                for target in &mut assignment.targets {
                    rename(target);
                }
                rename_expression(&mut assignment.value, renames);
            }
            Statement::If(conditional) => {
                rename_expression(&mut conditional.condition, renames);
                apply_renames(&mut conditional.body, renames);
            }
            Statement::Switch(switch) => {
                rename_expression(&mut switch.expression, renames);
                for case in &mut switch.cases {
                    apply_renames(&mut case.body, renames);
                }
                if let Some(default) = &mut switch.default {
                    apply_renames(default, renames);
                }
            }
            Statement::ForLoop(loop_) => {
                apply_renames(&mut loop_.pre, renames);
                rename_expression(&mut loop_.condition, renames);
                apply_renames(&mut loop_.post, renames);
                apply_renames(&mut loop_.body, renames);
            }
            Statement::Break | Statement::Continue | Statement::Leave => {}
            Statement::Expression(expression) => rename_expression(expression, renames),
        }
    }
}

fn rename_expression(expression: &mut Expression, renames: &HashMap<Name, Name>) {
    match expression {
        Expression::Literal(_) => {}
        Expression::Identifier(name) => {
            if let Some(fresh) = renames.get(name) {
                *name = fresh.clone();
            }
        }
        Expression::Call(call) => {
            // Callees rename only when the name is a displaced user
            // declaration; polyfill callees introduced by the word-size
            // transform are not declared here and keep their names.
            if let Some(fresh) = renames.get(&call.name) {
                call.name = fresh.clone();
            }
            for argument in &mut call.arguments {
                rename_expression(argument, renames);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::WasmDialect;
    use test_utils::assert_text_eq;

    fn run(source: &str, taken: &[&str]) -> Block {
        let mut block = qir_parser::parse(source, &WasmDialect).expect("parse");
        let taken: BTreeSet<Name> = taken.iter().map(|name| (*name).to_owned()).collect();
        let mut dispenser = NameDispenser::new(&block, taken.iter().cloned());
        displace_names(&mut block, &taken, &mut dispenser);
        block
    }

    #[test]
    fn renames_colliding_functions_and_their_calls() {
        let block = run(
            "{ function bswap64(x) -> y { y := x } let a := bswap64(1) }",
            &["bswap64", "add"],
        );
        let expected = r#"
{
    function bswap64_1(x) -> y {
        y := x
    }
    let a := bswap64_1(1)
}
"#;
        assert_text_eq(&block.to_string(), expected, "displaced unit");
    }

    #[test]
    fn keeps_undeclared_callees() {
        let block = run("{ let a, b := add(1, 2, 3, 4, 5, 6, 7, 8) }", &["add"]);
        let rendered = block.to_string();
        assert!(rendered.contains(":= add("), "polyfill callee must stay: {rendered}");
    }

    #[test]
    fn renames_colliding_variables() {
        let block = run("{ let cmp := 1 if i32.wrap_i64(cmp) { cmp := 2 } }", &["cmp"]);
        let expected = r#"
{
    let cmp_1 := 1
    if i32.wrap_i64(cmp_1) {
        cmp_1 := 2
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "displaced unit");
    }
}
