//! The embedded polyfill: a Wasm-dialect library implementing 256-bit EVM
//! semantics on top of 64-bit primitives and the `eth.*` host imports.
//!
//! The text is parsed once per translator and deep-copied on every splice, so
//! per-unit name displacement never leaks between units.

use qir_data::{diagnostic, Block, Name, Statement, WasmDialect};
use std::collections::BTreeSet;

const POLYFILL_SOURCE: &str = include_str!("polyfill.txt");

pub(crate) struct Polyfill {
    pub ast: Block,
    /// Names of the top-level function definitions, reserved against user
    /// code by the dispenser and the displacer.
    pub functions: BTreeSet<Name>,
}

impl Polyfill {
    /// Parse the embedded source. The asset is fixed at compile time, so a
    /// failure here is a translator bug, reported with every diagnostic.
    pub fn parse() -> Result<Self, String> {
        let ast = qir_parser::parse(POLYFILL_SOURCE, &WasmDialect)
            .map_err(|errors| diagnostic::render_all(&errors))?;
        let functions = ast
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::FunctionDefinition(function) => Some(function.name.clone()),
                _ => None,
            })
            .collect();
        Ok(Self { ast, functions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::WasmDialect;

    #[test]
    fn parses_and_declares_only_functions() {
        let polyfill = Polyfill::parse().unwrap_or_else(|errors| panic!("{errors}"));
        assert!(polyfill.ast.statements.iter().all(Statement::is_function_definition));
        assert_eq!(polyfill.functions.len(), polyfill.ast.statements.len());
        assert_eq!(polyfill.functions.len(), 145);
    }

    #[test]
    fn covers_the_translated_builtin_surface() {
        let polyfill = Polyfill::parse().expect("polyfill parses");
        for name in [
            "add", "sub", "mul", "div", "sdiv", "mod", "smod", "addmod", "mulmod", "exp",
            "signextend", "byte", "and", "or", "xor", "not", "shl", "shr", "sar", "lt", "gt",
            "slt", "sgt", "eq", "iszero", "keccak256", "mload", "mstore", "mstore8", "sload",
            "sstore", "calldataload", "calldatacopy", "codecopy", "datacopy", "return", "revert",
            "stop", "invalid", "selfdestruct", "create", "call", "callcode", "delegatecall",
            "staticcall", "log0", "log4", "memoryguard", "pop", "or_bool",
            // trapping placeholders
            "selfbalance", "chainid", "extcodehash", "msize", "create2",
        ] {
            assert!(polyfill.functions.contains(name), "polyfill must define `{name}`");
        }
    }

    #[test]
    fn analyzes_cleanly_under_the_wasm_dialect() {
        let polyfill = Polyfill::parse().expect("polyfill parses");
        let info = qir_analysis::analyze(&polyfill.ast, &WasmDialect)
            .unwrap_or_else(|errors| panic!("{}", qir_data::diagnostic::render_all(&errors)));
        let add = &info.functions["add"];
        assert_eq!(add.parameters.len(), 8);
        assert_eq!(add.returns.len(), 4);
    }
}
