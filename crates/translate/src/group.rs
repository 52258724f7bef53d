//! Top-level normalization: grouping and entry synthesis.
//!
//! After grouping, the top-level block is a run of non-function statements
//! followed by a run of function definitions, both in their original relative
//! order. Entry synthesis then wraps the non-function prefix into a fresh
//! zero-argument, zero-return function, leaving a block that contains only
//! function definitions.

use crate::dispenser::NameDispenser;
use qir_data::{Block, FunctionDefinition, Name, Statement};

pub fn group_functions(block: &mut Block) {
    let (functions, others): (Vec<_>, Vec<_>) =
        std::mem::take(&mut block.statements).into_iter().partition(Statement::is_function_definition);
    block.statements = others;
    block.statements.extend(functions);
}

/// Wrap the non-function prefix in an entry function. The name comes from the
/// dispenser with hint `main`, so it is `main` unless user code already took
/// the name.
pub fn synthesize_entry(block: &mut Block, dispenser: &mut NameDispenser) -> Name {
    let split = block
        .statements
        .iter()
        .position(Statement::is_function_definition)
        .unwrap_or(block.statements.len());
    let prefix: Vec<Statement> = block.statements.drain(..split).collect();
    let name = dispenser.fresh("main");
    let entry = FunctionDefinition {
        name: name.clone(),
        parameters: Vec::new(),
        returns: Vec::new(),
        body: Block::new(prefix),
    };
    block.statements.insert(0, Statement::FunctionDefinition(entry));
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::EvmDialect;
    use test_utils::assert_text_eq;

    fn parse(source: &str) -> Block {
        qir_parser::parse(source, &EvmDialect).expect("parse")
    }

    #[test]
    fn groups_preserving_relative_order() {
        let mut block =
            parse("{ let a := 1 function f() { } let b := 2 function g() { } pop(a) }");
        group_functions(&mut block);
        let expected = r#"
{
    let a := 1
    let b := 2
    pop(a)
    function f() { }
    function g() { }
}
"#;
        assert_text_eq(&block.to_string(), expected, "grouped unit");
    }

    #[test]
    fn entry_wraps_the_prefix() {
        let mut block = parse("{ let a := 1 function f() { } pop(a) }");
        group_functions(&mut block);
        let mut dispenser = NameDispenser::new(&block, []);
        let entry = synthesize_entry(&mut block, &mut dispenser);
        assert_eq!(entry, "main");
        let expected = r#"
{
    function main() {
        let a := 1
        pop(a)
    }
    function f() { }
}
"#;
        assert_text_eq(&block.to_string(), expected, "entry unit");
    }

    #[test]
    fn entry_name_dodges_user_main() {
        let mut block = parse("{ function main() { } let a := 1 pop(a) }");
        group_functions(&mut block);
        let mut dispenser = NameDispenser::new(&block, []);
        let entry = synthesize_entry(&mut block, &mut dispenser);
        assert_eq!(entry, "main_1");
    }

    #[test]
    fn empty_prefix_still_gets_an_entry() {
        let mut block = parse("{ function f() { } }");
        group_functions(&mut block);
        let mut dispenser = NameDispenser::new(&block, []);
        synthesize_entry(&mut block, &mut dispenser);
        let expected = r#"
{
    function main() { }
    function f() { }
}
"#;
        assert_text_eq(&block.to_string(), expected, "entry unit");
    }
}
