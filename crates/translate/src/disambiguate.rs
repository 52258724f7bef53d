//! Alpha-renaming of shadowed declarations.
//!
//! After this pass every declaration in the unit is globally unique, which is
//! what allows later passes to hoist functions and to displace names with a
//! flat rename map. Builtins of the source dialect count as outermost
//! bindings, so a user function or variable with a builtin's name is always
//! renamed; calls to the builtin elsewhere keep their meaning across hoisting.
//!
//! Running the pass a second time changes nothing.

use crate::dispenser::NameDispenser;
use qir_data::{Block, Dialect, Expression, Name, Statement};
use std::collections::{HashMap, HashSet};

pub fn disambiguate(block: &mut Block, dialect: &dyn Dialect, dispenser: &mut NameDispenser) {
    let mut pass = Disambiguator {
        dialect,
        dispenser,
        scopes: Vec::new(),
        declared: HashSet::new(),
    };
    pass.scopes.push(HashMap::new());
    pass.walk_statements(&mut block.statements);
    pass.scopes.pop();
}

struct Disambiguator<'a> {
    dialect: &'a dyn Dialect,
    dispenser: &'a mut NameDispenser,
    /// Innermost-last rename maps; every declaration gets an entry, identity
    /// or not.
    scopes: Vec<HashMap<Name, Name>>,
    /// Names kept verbatim by some earlier declaration in this run.
    declared: HashSet<Name>,
}

impl Disambiguator<'_> {
    /// Bind a declaration, renaming it when it would shadow an earlier
    /// declaration or a source-dialect builtin.
    fn bind(&mut self, name: &mut Name) {
        let shadows = self.declared.contains(name.as_str())
            || self.dialect.builtin(name).is_some();
        let bound = if shadows {
            self.dispenser.fresh(name)
        } else {
            self.declared.insert(name.clone());
            name.clone()
        };
        self.scopes
            .last_mut()
            .expect("scope stack is never empty while walking")
            .insert(name.clone(), bound.clone());
        *name = bound;
    }

    fn rewrite_use(&self, name: &mut Name) {
        for scope in self.scopes.iter().rev() {
            if let Some(bound) = scope.get(name.as_str()) {
                if bound != name {
                    *name = bound.clone();
                }
                return;
            }
        }
        // Unbound names are builtin callees; they stay.
    }

    fn walk_block(&mut self, block: &mut Block) {
        self.scopes.push(HashMap::new());
        self.walk_statements(&mut block.statements);
        self.scopes.pop();
    }

    fn walk_statements(&mut self, statements: &mut [Statement]) {
        // Function names bind for the whole block, uses included, before any
        // statement runs.
        for statement in statements.iter_mut() {
            if let Statement::FunctionDefinition(function) = statement {
                self.bind(&mut function.name);
            }
        }
        for statement in statements.iter_mut() {
            self.walk_statement(statement);
        }
    }

    fn walk_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Block(block) => self.walk_block(block),
            Statement::FunctionDefinition(function) => {
                // The name was bound by the enclosing block's pre-pass.
                self.scopes.push(HashMap::new());
                for typed in function.parameters.iter_mut().chain(&mut function.returns) {
                    self.bind(&mut typed.name);
                }
                self.walk_block(&mut function.body);
                self.scopes.pop();
            }
            Statement::VariableDeclaration(declaration) => {
                if let Some(value) = &mut declaration.value {
                    self.walk_expression(value);
                }
                for typed in &mut declaration.variables {
                    self.bind(&mut typed.name);
                }
            }
            Statement::Assignment(assignment) => {
                self.walk_expression(&mut assignment.value);
                for target in &mut assignment.targets {
                    self.rewrite_use(target);
                }
            }
            Statement::If(conditional) => {
                self.walk_expression(&mut conditional.condition);
                self.walk_block(&mut conditional.body);
            }
            Statement::Switch(switch) => {
                self.walk_expression(&mut switch.expression);
                for case in &mut switch.cases {
                    self.walk_block(&mut case.body);
                }
                if let Some(default) = &mut switch.default {
                    self.walk_block(default);
                }
            }
            Statement::ForLoop(loop_) => {
                // The initializer's bindings are visible in the condition, the
                // post block and the body.
                self.scopes.push(HashMap::new());
                self.walk_statements(&mut loop_.pre.statements);
                self.walk_expression(&mut loop_.condition);
                self.walk_block(&mut loop_.body);
                self.walk_block(&mut loop_.post);
                self.scopes.pop();
            }
            Statement::Break | Statement::Continue | Statement::Leave => {}
            Statement::Expression(expression) => self.walk_expression(expression),
        }
    }

    fn walk_expression(&mut self, expression: &mut Expression) {
        match expression {
            Expression::Literal(_) => {}
            Expression::Identifier(name) => self.rewrite_use(name),
            Expression::Call(call) => {
                self.rewrite_use(&mut call.name);
                for argument in &mut call.arguments {
                    self.walk_expression(argument);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::EvmDialect;
    use test_utils::assert_text_eq;

    fn run(source: &str) -> Block {
        let mut block = qir_parser::parse(source, &EvmDialect).expect("parse");
        let mut dispenser = NameDispenser::new(&block, []);
        disambiguate(&mut block, &EvmDialect, &mut dispenser);
        block
    }

    #[test]
    fn renames_shadowed_variables() {
        let block = run("{ let x := 1 { let x := 2 pop(x) } pop(x) }");
        let expected = r#"
{
    let x := 1
    {
        let x_1 := 2
        pop(x_1)
    }
    pop(x)
}
"#;
        assert_text_eq(&block.to_string(), expected, "disambiguated unit");
    }

    #[test]
    fn renames_sibling_duplicates() {
        let block = run("{ { let x := 1 pop(x) } { let x := 2 pop(x) } }");
        let expected = r#"
{
    {
        let x := 1
        pop(x)
    }
    {
        let x_1 := 2
        pop(x_1)
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "disambiguated unit");
    }

    #[test]
    fn renames_builtin_named_functions_and_updates_calls() {
        let block = run("{ function add(a) -> r { r := a } let x := add(1) let y := mul(x, 2) }");
        let expected = r#"
{
    function add_1(a) -> r {
        r := a
    }
    let x := add_1(1)
    let y := mul(x, 2)
}
"#;
        assert_text_eq(&block.to_string(), expected, "disambiguated unit");
    }

    #[test]
    fn loop_initializer_scope_covers_condition_and_post() {
        let block = run("{ let i := 9 for { let i := 0 } lt(i, 3) { i := add(i, 1) } { pop(i) } }");
        let expected = r#"
{
    let i := 9
    for {
        let i_1 := 0
    } lt(i_1, 3) {
        i_1 := add(i_1, 1)
    } {
        pop(i_1)
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "disambiguated unit");
    }

    #[test]
    fn idempotent() {
        let source = "{ let x := 1 { let x := 2 pop(x) } function f() { let x := 3 pop(x) } f() }";
        let once = run(source);
        let mut twice = once.clone();
        let mut dispenser = NameDispenser::new(&twice, []);
        disambiguate(&mut twice, &EvmDialect, &mut dispenser);
        assert_eq!(once, twice);
    }
}
