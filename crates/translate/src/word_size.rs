//! The word-size transform.
//!
//! Rewrites an EVM-dialect tree, where every variable holds one 256-bit word,
//! into a Wasm-dialect tree where each such variable is four i64 limbs,
//! most-significant first. Arithmetic is never inlined: every EVM builtin call
//! becomes a call to the same-named polyfill function, so the transform stays
//! total and mechanical while the semantics live in the polyfill.
//!
//! Requires its input to be disambiguated, hoisted and expression-split.

use crate::dispenser::NameDispenser;
use alloy_primitives::U256;
use qir_data::{
    Assignment, Block, Case, Dialect, Expression, ForLoop, FunctionCall, FunctionDefinition, If,
    Literal, Name, Statement, Switch, Type, TypedName, VariableDeclaration,
};
use std::collections::{BTreeSet, HashMap};

const LIMBS: usize = 4;

pub fn expand_words(
    block: Block,
    dialect: &dyn Dialect,
    dispenser: &mut NameDispenser,
    trap_builtins: &BTreeSet<Name>,
) -> Block {
    let mut expander = WordExpander { dialect, dispenser, trap_builtins, scopes: Vec::new() };
    expander.expand_block(block)
}

struct WordExpander<'a> {
    dialect: &'a dyn Dialect,
    dispenser: &'a mut NameDispenser,
    trap_builtins: &'a BTreeSet<Name>,
    /// Innermost-last mapping from each word variable to its limb names.
    scopes: Vec<HashMap<Name, [Name; LIMBS]>>,
}

impl WordExpander<'_> {
    fn expand_block(&mut self, block: Block) -> Block {
        self.scopes.push(HashMap::new());
        let statements =
            block.statements.into_iter().flat_map(|statement| self.expand_statement(statement));
        let block = Block::new(statements.collect());
        self.scopes.pop();
        block
    }

    /// Allocate the four limb names of `name`, declaration order most
    /// significant first, and record the mapping in the current scope.
    fn declare_limbs(&mut self, name: &str) -> [Name; LIMBS] {
        let limbs = std::array::from_fn(|index| self.dispenser.fresh(&format!("{name}_{}", index + 1)));
        self.scopes
            .last_mut()
            .expect("scope stack is never empty while expanding")
            .insert(name.to_owned(), limbs.clone());
        limbs
    }

    fn limbs_for(&self, name: &str) -> &[Name; LIMBS] {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .unwrap_or_else(|| unreachable!("`{name}` has no limb mapping; input was not analyzed"))
    }

    /// The four limb expressions of a trivial (identifier or literal) value.
    fn expand_value(&mut self, expression: Expression) -> [Expression; LIMBS] {
        match expression {
            Expression::Identifier(name) => {
                self.limbs_for(&name).clone().map(Expression::Identifier)
            }
            Expression::Literal(literal) => split_number(literal.as_number()),
            Expression::Call(call) => {
                unreachable!("`{}` argument was not split to three-address form", call.name)
            }
        }
    }

    /// True when the call must be lowered to a plain trap.
    fn traps(&self, call: &FunctionCall) -> bool {
        if self.dialect.builtin(&call.name).is_none() {
            return false;
        }
        if self.trap_builtins.contains(&call.name) {
            return true;
        }
        // A memory guard wider than the 64-bit address space cannot be
        // narrowed to the polyfill's single-limb signature.
        call.name == "memoryguard"
            && match call.arguments.first() {
                Some(Expression::Literal(literal)) => literal.as_number().bit_len() > 64,
                _ => true,
            }
    }

    fn expand_call(&mut self, call: FunctionCall) -> FunctionCall {
        let FunctionCall { name, arguments } = call;
        if name == "memoryguard" && self.dialect.builtin(&name).is_some() {
            // The guard value is a compile-time literal; it travels as one i64.
            let Some(Expression::Literal(literal)) = arguments.first() else {
                unreachable!("non-literal memoryguard survived the trap check")
            };
            let value = literal.as_number().as_limbs()[0];
            return FunctionCall { name, arguments: vec![number(value, Type::I64)] };
        }
        let arguments = arguments.into_iter().flat_map(|arg| self.expand_value(arg)).collect();
        FunctionCall { name, arguments }
    }

    fn expand_statement(&mut self, statement: Statement) -> Vec<Statement> {
        match statement {
            Statement::Block(block) => vec![Statement::Block(self.expand_block(block))],
            Statement::FunctionDefinition(function) => self.expand_function(function),
            Statement::VariableDeclaration(declaration) => self.expand_declaration(declaration),
            Statement::Assignment(assignment) => self.expand_assignment(assignment),
            Statement::If(If { condition, body }) => {
                let condition = self.condition_call(condition);
                let body = self.expand_block(body);
                vec![Statement::If(If { condition, body })]
            }
            Statement::Switch(switch) => self.expand_switch(switch),
            Statement::ForLoop(loop_) => self.expand_for(loop_),
            Statement::Break => vec![Statement::Break],
            Statement::Continue => vec![Statement::Continue],
            Statement::Leave => vec![Statement::Leave],
            Statement::Expression(Expression::Call(call)) => {
                if self.traps(&call) {
                    vec![trap()]
                } else {
                    vec![Statement::Expression(Expression::Call(self.expand_call(call)))]
                }
            }
            Statement::Expression(other) => {
                unreachable!("value-less expression statement survived analysis: {other}")
            }
        }
    }

    fn expand_function(&mut self, function: FunctionDefinition) -> Vec<Statement> {
        let FunctionDefinition { name, parameters, returns, body } = function;
        let saved = std::mem::take(&mut self.scopes);
        self.scopes.push(HashMap::new());
        let parameters = self.expand_typed_names(parameters);
        let returns = self.expand_typed_names(returns);
        let body = self.expand_block(body);
        self.scopes = saved;
        vec![Statement::FunctionDefinition(FunctionDefinition { name, parameters, returns, body })]
    }

    fn expand_typed_names(&mut self, names: Vec<TypedName>) -> Vec<TypedName> {
        names
            .into_iter()
            .flat_map(|typed| self.declare_limbs(&typed.name))
            .map(|limb| TypedName::new(limb, Type::I64))
            .collect()
    }

    fn expand_declaration(&mut self, declaration: VariableDeclaration) -> Vec<Statement> {
        let VariableDeclaration { variables, value } = declaration;
        match value {
            Some(Expression::Call(call)) if self.traps(&call) => {
                let variables = self.expand_typed_names(variables);
                vec![
                    Statement::VariableDeclaration(VariableDeclaration { variables, value: None }),
                    trap(),
                ]
            }
            Some(Expression::Call(call)) => {
                let call = self.expand_call(call);
                let variables = self.expand_typed_names(variables);
                vec![Statement::VariableDeclaration(VariableDeclaration {
                    variables,
                    value: Some(Expression::Call(call)),
                })]
            }
            Some(simple) => {
                let values = self.expand_value(simple);
                let limbs = self.declare_limbs(&variables[0].name);
                limbs
                    .into_iter()
                    .zip(values)
                    .map(|(limb, value)| {
                        Statement::VariableDeclaration(VariableDeclaration {
                            variables: vec![TypedName::new(limb, Type::I64)],
                            value: Some(value),
                        })
                    })
                    .collect()
            }
            None => {
                let variables = self.expand_typed_names(variables);
                vec![Statement::VariableDeclaration(VariableDeclaration { variables, value: None })]
            }
        }
    }

    fn expand_assignment(&mut self, assignment: Assignment) -> Vec<Statement> {
        let Assignment { targets, value } = assignment;
        match value {
            Expression::Call(call) if self.traps(&call) => vec![trap()],
            Expression::Call(call) => {
                let call = self.expand_call(call);
                let targets =
                    targets.iter().flat_map(|target| self.limbs_for(target).clone()).collect();
                vec![Statement::Assignment(Assignment {
                    targets,
                    value: Expression::Call(call),
                })]
            }
            simple => {
                let values = self.expand_value(simple);
                let limbs = self.limbs_for(&targets[0]).clone();
                limbs
                    .into_iter()
                    .zip(values)
                    .map(|(limb, value)| {
                        Statement::Assignment(Assignment { targets: vec![limb], value })
                    })
                    .collect()
            }
        }
    }

    /// `if v` tests whether any limb of `v` is set.
    fn condition_call(&mut self, condition: Expression) -> Expression {
        Expression::call("or_bool", self.expand_value(condition).into())
    }

    fn expand_for(&mut self, loop_: ForLoop) -> Vec<Statement> {
        let ForLoop { pre, condition, post, body } = loop_;
        debug_assert!(
            matches!(&condition, Expression::Literal(literal) if literal.is_true()),
            "loop condition was not moved into the body"
        );
        // The initializer's limb mappings are visible in the post block and
        // the body.
        self.scopes.push(HashMap::new());
        let pre = Block::new(
            pre.statements.into_iter().flat_map(|statement| self.expand_statement(statement)).collect(),
        );
        let condition = Expression::Literal(Literal::truth(true, Type::I32));
        let body = self.expand_block(body);
        let post = self.expand_block(post);
        self.scopes.pop();
        vec![Statement::ForLoop(ForLoop { pre, condition, post, body })]
    }

    fn expand_switch(&mut self, switch: Switch) -> Vec<Statement> {
        let Switch { expression, cases, default } = switch;
        let scrutinee = self.expand_value(expression);
        let default = default.map(|body| self.expand_block(body));

        if cases.is_empty() {
            // Only a default arm: it always runs.
            return default.map(Statement::Block).into_iter().collect();
        }

        let cases: Vec<(U256, Block)> = cases
            .into_iter()
            .map(|case| (case.value.as_number(), self.expand_block(case.body)))
            .collect();

        let flag = default.as_ref().map(|_| self.dispenser.fresh("run_default"));
        let mut statements = Vec::new();
        if let Some(flag) = &flag {
            statements.push(Statement::VariableDeclaration(VariableDeclaration {
                variables: vec![TypedName::new(flag.clone(), Type::I32)],
                value: None,
            }));
        }
        statements.push(build_limb_switch(&scrutinee, cases, flag.as_deref(), 0));
        if let (Some(flag), Some(default)) = (flag, default) {
            statements
                .push(Statement::If(If { condition: Expression::Identifier(flag), body: default }));
        }
        statements
    }
}

/// Nested switch over the scrutinee's limbs, most significant first. Arms that
/// fail to match set the run-default flag, when one exists; at the last limb
/// each group holds exactly one case, whose body runs.
fn build_limb_switch(
    scrutinee: &[Expression; LIMBS],
    cases: Vec<(U256, Block)>,
    flag: Option<&str>,
    depth: usize,
) -> Statement {
    let mut groups: Vec<(u64, Vec<(U256, Block)>)> = Vec::new();
    for (value, body) in cases {
        let limb = value.as_limbs()[LIMBS - 1 - depth];
        match groups.iter_mut().find(|(seen, _)| *seen == limb) {
            Some((_, group)) => group.push((value, body)),
            None => groups.push((limb, vec![(value, body)])),
        }
    }

    let cases = groups
        .into_iter()
        .map(|(limb, mut group)| {
            let body = if depth == LIMBS - 1 {
                debug_assert_eq!(group.len(), 1, "distinct case values share all four limbs");
                group.pop().expect("group holds at least one case").1
            } else {
                Block::new(vec![build_limb_switch(scrutinee, group, flag, depth + 1)])
            };
            Case { value: Literal::number(limb, Type::I64), body }
        })
        .collect();

    let default = flag.map(|flag| {
        Block::new(vec![Statement::Assignment(Assignment {
            targets: vec![flag.to_owned()],
            value: number(1u64, Type::I32),
        })])
    });

    Statement::Switch(Switch { expression: scrutinee[depth].clone(), cases, default })
}

fn number(value: u64, ty: Type) -> Expression {
    Expression::Literal(Literal::number(value, ty))
}

/// The four i64 limb literals of a 256-bit value, most significant first.
fn split_number(value: U256) -> [Expression; LIMBS] {
    let limbs = value.as_limbs();
    std::array::from_fn(|index| number(limbs[LIMBS - 1 - index], Type::I64))
}

fn trap() -> Statement {
    Statement::Expression(Expression::call("unreachable", Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::EvmDialect;
    use test_utils::assert_text_eq;

    fn run(source: &str) -> Block {
        run_with_traps(source, &BTreeSet::new())
    }

    fn run_with_traps(source: &str, traps: &BTreeSet<Name>) -> Block {
        let block = qir_parser::parse(source, &EvmDialect).expect("parse");
        qir_analysis::analyze(&block, &EvmDialect).expect("analyze");
        let mut dispenser = NameDispenser::new(&block, []);
        expand_words(block, &EvmDialect, &mut dispenser, traps)
    }

    #[test]
    fn literal_declaration_becomes_four_limbs() {
        let block = run("{ let x := 1 }");
        let expected = r#"
{
    let x_1 := 0
    let x_2 := 0
    let x_3 := 0
    let x_4 := 1
}
"#;
        assert_text_eq(&block.to_string(), expected, "expanded unit");
    }

    #[test]
    fn wide_literals_split_by_limb() {
        let block = run("{ let x := 0x112233445566778899aabbccddeeff00112233445566778899aabbccddeeff00 }");
        let expected = r#"
{
    let x_1 := 0x1122334455667788
    let x_2 := 0x99aabbccddeeff00
    let x_3 := 0x1122334455667788
    let x_4 := 0x99aabbccddeeff00
}
"#;
        assert_text_eq(&block.to_string(), expected, "expanded unit");
    }

    #[test]
    fn builtin_calls_take_eight_limb_arguments() {
        let block = run("{ let x := add(1, 2) }");
        assert_text_eq(
            &block.to_string(),
            "{\n    let x_1, x_2, x_3, x_4 := add(0, 0, 0, 1, 0, 0, 0, 2)\n}",
            "expanded unit",
        );
    }

    #[test]
    fn functions_expand_parameters_and_returns() {
        let block = run("{ function f(a) -> r { r := a } }");
        let expected = r#"
{
    function f(a_1, a_2, a_3, a_4) -> r_1, r_2, r_3, r_4 {
        r_1 := a_1
        r_2 := a_2
        r_3 := a_3
        r_4 := a_4
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "expanded unit");
    }

    #[test]
    fn if_condition_tests_all_limbs() {
        let block = run("{ let x := 1 if x { pop(x) } }");
        let rendered = block.to_string();
        assert!(rendered.contains("if or_bool(x_1, x_2, x_3, x_4) {"), "{rendered}");
        assert!(rendered.contains("pop(x_1, x_2, x_3, x_4)"), "{rendered}");
    }

    #[test]
    fn loops_expand_initializer_and_post() {
        let block = run(
            "{ for { let i := 0 } true { i := add(i, 1) } { if i { break } } }",
        );
        let rendered = block.to_string();
        assert!(rendered.contains("let i_1 := 0"), "{rendered}");
        assert!(rendered.contains("} true:i32 {"), "{rendered}");
        assert!(
            rendered.contains("i_1, i_2, i_3, i_4 := add(i_1, i_2, i_3, i_4, 0, 0, 0, 1)"),
            "{rendered}"
        );
    }

    #[test]
    fn switch_matches_limb_by_limb() {
        let block = run("{ let x := 5 switch x case 5 { pop(x) } default { pop(x) } }");
        let expected = r#"
{
    let x_1 := 0
    let x_2 := 0
    let x_3 := 0
    let x_4 := 5
    let run_default:i32
    switch x_1
    case 0 {
        switch x_2
        case 0 {
            switch x_3
            case 0 {
                switch x_4
                case 5 {
                    pop(x_1, x_2, x_3, x_4)
                }
                default {
                    run_default := 1:i32
                }
            }
            default {
                run_default := 1:i32
            }
        }
        default {
            run_default := 1:i32
        }
    }
    default {
        run_default := 1:i32
    }
    if run_default {
        pop(x_1, x_2, x_3, x_4)
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "expanded unit");
    }

    #[test]
    fn switch_without_default_needs_no_flag() {
        let block = run("{ let x := 5 switch x case 5 { pop(x) } }");
        let rendered = block.to_string();
        assert!(!rendered.contains("run_default"), "{rendered}");
    }

    #[test]
    fn memoryguard_keeps_a_single_narrow_argument() {
        let block = run("{ let g := memoryguard(0x10000) }");
        assert_text_eq(
            &block.to_string(),
            "{\n    let g_1, g_2, g_3, g_4 := memoryguard(0x10000)\n}",
            "expanded unit",
        );
    }

    #[test]
    fn configured_traps_replace_the_call() {
        let traps: BTreeSet<Name> = ["gas".to_owned()].into();
        let block = run_with_traps("{ let g := gas() pop(g) }", &traps);
        let expected = r#"
{
    let g_1, g_2, g_3, g_4
    unreachable()
    pop(g_1, g_2, g_3, g_4)
}
"#;
        assert_text_eq(&block.to_string(), expected, "expanded unit");
    }
}
