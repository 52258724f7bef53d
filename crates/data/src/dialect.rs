//! Dialect descriptors.
//!
//! A dialect answers, for each builtin name, its parameter and return types,
//! plus the handful of facts passes need: the default value type, the type an
//! `if`/`for` condition must have, and the zero-test builtin used when loop
//! conditions are moved into loop bodies.

use crate::ast::Type;
use std::{collections::BTreeMap, sync::LazyLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builtin {
    pub parameters: Vec<Type>,
    pub returns: Vec<Type>,
}

impl Builtin {
    fn words(params: usize, returns: usize) -> Self {
        Self { parameters: vec![Type::Word; params], returns: vec![Type::Word; returns] }
    }
}

pub trait Dialect {
    fn name(&self) -> &'static str;

    fn builtin(&self, name: &str) -> Option<&Builtin>;

    /// Type of a variable or literal written without an annotation.
    fn default_type(&self) -> Type;

    /// Type an `if` or `for` condition must produce.
    fn boolean_type(&self) -> Type;

    /// Resolve a textual type annotation (`x:i32`). `None` means the dialect
    /// has no such type (the EVM dialect has no annotations at all).
    fn named_type(&self, name: &str) -> Option<Type>;

    /// Builtin testing a value for zero, if the dialect has one.
    fn zero_test(&self) -> Option<&'static str>;
}

/// The 256-bit EVM opcode dialect. Every builtin consumes and produces words.
pub struct EvmDialect;

/// The WebAssembly-shaped dialect: typed `i32.*`/`i64.*` opcode builtins plus
/// the `eth.*` host-import namespace.
pub struct WasmDialect;

static EVM_BUILTINS: LazyLock<BTreeMap<&'static str, Builtin>> = LazyLock::new(|| {
    let sigs: &[(&str, usize, usize)] = &[
        // Arithmetic
        ("add", 2, 1),
        ("sub", 2, 1),
        ("mul", 2, 1),
        ("div", 2, 1),
        ("sdiv", 2, 1),
        ("mod", 2, 1),
        ("smod", 2, 1),
        ("addmod", 3, 1),
        ("mulmod", 3, 1),
        ("exp", 2, 1),
        ("signextend", 2, 1),
        // Comparison and bitwise
        ("lt", 2, 1),
        ("gt", 2, 1),
        ("slt", 2, 1),
        ("sgt", 2, 1),
        ("eq", 2, 1),
        ("iszero", 1, 1),
        ("and", 2, 1),
        ("or", 2, 1),
        ("xor", 2, 1),
        ("not", 1, 1),
        ("byte", 2, 1),
        ("shl", 2, 1),
        ("shr", 2, 1),
        ("sar", 2, 1),
        // Hashing
        ("keccak256", 2, 1),
        // Environment
        ("address", 0, 1),
        ("balance", 1, 1),
        ("selfbalance", 0, 1),
        ("origin", 0, 1),
        ("caller", 0, 1),
        ("callvalue", 0, 1),
        ("calldataload", 1, 1),
        ("calldatasize", 0, 1),
        ("calldatacopy", 3, 0),
        ("codesize", 0, 1),
        ("codecopy", 3, 0),
        ("datacopy", 3, 0),
        ("gasprice", 0, 1),
        ("extcodesize", 1, 1),
        ("extcodecopy", 4, 0),
        ("extcodehash", 1, 1),
        ("returndatasize", 0, 1),
        ("returndatacopy", 3, 0),
        ("blockhash", 1, 1),
        ("coinbase", 0, 1),
        ("timestamp", 0, 1),
        ("number", 0, 1),
        ("difficulty", 0, 1),
        ("gaslimit", 0, 1),
        ("chainid", 0, 1),
        ("gas", 0, 1),
        // Memory and storage
        ("mload", 1, 1),
        ("mstore", 2, 0),
        ("mstore8", 2, 0),
        ("sload", 1, 1),
        ("sstore", 2, 0),
        ("msize", 0, 1),
        ("memoryguard", 1, 1),
        // Logging
        ("log0", 2, 0),
        ("log1", 3, 0),
        ("log2", 4, 0),
        ("log3", 5, 0),
        ("log4", 6, 0),
        // Calls and contract creation
        ("create", 3, 1),
        ("create2", 4, 1),
        ("call", 7, 1),
        ("callcode", 7, 1),
        ("delegatecall", 6, 1),
        ("staticcall", 6, 1),
        // Control
        ("return", 2, 0),
        ("revert", 2, 0),
        ("stop", 0, 0),
        ("invalid", 0, 0),
        ("selfdestruct", 1, 0),
        ("pop", 1, 0),
    ];
    sigs.iter().map(|&(name, params, returns)| (name, Builtin::words(params, returns))).collect()
});

static WASM_BUILTINS: LazyLock<BTreeMap<String, Builtin>> = LazyLock::new(|| {
    use Type::{I32, I64};

    let mut table = BTreeMap::new();
    let mut add = |name: &str, parameters: Vec<Type>, returns: Vec<Type>| {
        table.insert(name.to_owned(), Builtin { parameters, returns });
    };

    const I64_ARITH: &[&str] = &[
        "add", "sub", "mul", "div_u", "div_s", "rem_u", "rem_s", "and", "or", "xor", "shl",
        "shr_u", "shr_s",
    ];
    const COMPARISONS: &[&str] =
        &["eq", "ne", "lt_u", "lt_s", "gt_u", "gt_s", "le_u", "le_s", "ge_u", "ge_s"];

    for op in I64_ARITH {
        add(&format!("i64.{op}"), vec![I64, I64], vec![I64]);
    }
    // Comparisons produce i32 regardless of operand width.
    for op in COMPARISONS {
        add(&format!("i64.{op}"), vec![I64, I64], vec![I32]);
    }
    for op in I64_ARITH.iter().chain(COMPARISONS) {
        add(&format!("i32.{op}"), vec![I32, I32], vec![I32]);
    }

    add("i64.eqz", vec![I64], vec![I32]);
    add("i64.clz", vec![I64], vec![I64]);
    add("i64.ctz", vec![I64], vec![I64]);
    add("i64.popcnt", vec![I64], vec![I64]);
    add("i64.extend_i32_u", vec![I32], vec![I64]);
    add("i64.extend_i32_s", vec![I32], vec![I64]);
    add("i64.load", vec![I32], vec![I64]);
    add("i64.store", vec![I32, I64], vec![]);
    add("i64.store8", vec![I32, I64], vec![]);
    add("i32.eqz", vec![I32], vec![I32]);
    add("i32.clz", vec![I32], vec![I32]);
    add("i32.wrap_i64", vec![I64], vec![I32]);
    add("i32.load", vec![I32], vec![I32]);
    add("i32.store", vec![I32, I32], vec![]);
    add("i32.store8", vec![I32, I32], vec![]);
    add("unreachable", vec![], vec![]);
    add("nop", vec![], vec![]);

    // Host imports. Addresses travel as 20-byte regions, 256-bit values as
    // 32-byte regions, balances and call values as 16-byte regions; lengths
    // are i32.
    add("eth.getAddress", vec![I32], vec![]);
    add("eth.getExternalBalance", vec![I32, I32], vec![]);
    add("eth.getTxOrigin", vec![I32], vec![]);
    add("eth.getCaller", vec![I32], vec![]);
    add("eth.getCallValue", vec![I32], vec![]);
    add("eth.getCallDataSize", vec![], vec![I32]);
    add("eth.callDataCopy", vec![I32, I32, I32], vec![]);
    add("eth.getCodeSize", vec![], vec![I32]);
    add("eth.codeCopy", vec![I32, I32, I32], vec![]);
    add("eth.getTxGasPrice", vec![I32], vec![]);
    add("eth.getExternalCodeSize", vec![I32], vec![I32]);
    add("eth.externalCodeCopy", vec![I32, I32, I32, I32], vec![]);
    add("eth.getReturnDataSize", vec![], vec![I32]);
    add("eth.returnDataCopy", vec![I32, I32, I32], vec![]);
    add("eth.getBlockHash", vec![I64, I32], vec![I32]);
    add("eth.getBlockCoinbase", vec![I32], vec![]);
    add("eth.getBlockTimestamp", vec![], vec![I64]);
    add("eth.getBlockNumber", vec![], vec![I64]);
    add("eth.getBlockDifficulty", vec![I32], vec![]);
    add("eth.getBlockGasLimit", vec![], vec![I64]);
    add("eth.storageLoad", vec![I32, I32], vec![]);
    add("eth.storageStore", vec![I32, I32], vec![]);
    add("eth.getGasLeft", vec![], vec![I64]);
    add("eth.log", vec![I32, I32, I32, I32, I32, I32, I32], vec![]);
    add("eth.create", vec![I32, I32, I32, I32], vec![I32]);
    add("eth.call", vec![I64, I32, I32, I32, I32], vec![I32]);
    add("eth.callCode", vec![I64, I32, I32, I32, I32], vec![I32]);
    add("eth.callDelegate", vec![I64, I32, I32, I32], vec![I32]);
    add("eth.callStatic", vec![I64, I32, I32, I32], vec![I32]);
    add("eth.finish", vec![I32, I32], vec![]);
    add("eth.revert", vec![I32, I32], vec![]);
    add("eth.selfDestruct", vec![I32], vec![]);

    table
});

impl Dialect for EvmDialect {
    fn name(&self) -> &'static str {
        "evm"
    }

    fn builtin(&self, name: &str) -> Option<&Builtin> {
        EVM_BUILTINS.get(name)
    }

    fn default_type(&self) -> Type {
        Type::Word
    }

    fn boolean_type(&self) -> Type {
        Type::Word
    }

    fn named_type(&self, _name: &str) -> Option<Type> {
        None
    }

    fn zero_test(&self) -> Option<&'static str> {
        Some("iszero")
    }
}

impl Dialect for WasmDialect {
    fn name(&self) -> &'static str {
        "wasm"
    }

    fn builtin(&self, name: &str) -> Option<&Builtin> {
        WASM_BUILTINS.get(name)
    }

    fn default_type(&self) -> Type {
        Type::I64
    }

    fn boolean_type(&self) -> Type {
        Type::I32
    }

    fn named_type(&self, name: &str) -> Option<Type> {
        match name {
            "i64" => Some(Type::I64),
            "i32" => Some(Type::I32),
            _ => None,
        }
    }

    fn zero_test(&self) -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_builtins_are_word_typed() {
        let add = EvmDialect.builtin("add").unwrap();
        assert_eq!(add.parameters, vec![Type::Word, Type::Word]);
        assert_eq!(add.returns, vec![Type::Word]);

        let call = EvmDialect.builtin("call").unwrap();
        assert_eq!(call.parameters.len(), 7);
        assert_eq!(call.returns.len(), 1);

        assert!(EvmDialect.builtin("i64.add").is_none());
    }

    #[test]
    fn wasm_comparison_returns_i32() {
        let lt = WasmDialect.builtin("i64.lt_u").unwrap();
        assert_eq!(lt.parameters, vec![Type::I64, Type::I64]);
        assert_eq!(lt.returns, vec![Type::I32]);

        let store = WasmDialect.builtin("i64.store").unwrap();
        assert_eq!(store.parameters, vec![Type::I32, Type::I64]);
        assert!(store.returns.is_empty());

        assert!(WasmDialect.builtin("add").is_none());
    }

    #[test]
    fn host_imports_match_emission_conventions() {
        let log = WasmDialect.builtin("eth.log").unwrap();
        assert_eq!(log.parameters.len(), 7);

        let call = WasmDialect.builtin("eth.call").unwrap();
        assert_eq!(call.parameters[0], Type::I64);
        assert_eq!(call.returns, vec![Type::I32]);
    }

    #[test]
    fn type_annotations_per_dialect() {
        assert_eq!(EvmDialect.named_type("i32"), None);
        assert_eq!(WasmDialect.named_type("i32"), Some(Type::I32));
        assert_eq!(WasmDialect.named_type("i64"), Some(Type::I64));
        assert_eq!(WasmDialect.named_type("word"), None);
    }
}
