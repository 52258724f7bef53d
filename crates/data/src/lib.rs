//! Core data model for quad-ir: the tree IR manipulated by every pass, the
//! dialect descriptors that answer builtin queries, and the compilation-unit
//! (object) model.

pub mod ast;
pub mod dialect;
pub mod diagnostic;
mod display;
pub mod object;

pub use crate::{
    ast::{
        Assignment, Block, Case, Expression, ForLoop, FunctionCall, FunctionDefinition, If,
        Literal, LiteralValue, Name, Statement, Switch, Type, TypedName, VariableDeclaration,
    },
    dialect::{Builtin, Dialect, EvmDialect, WasmDialect},
    diagnostic::Diagnostic,
    object::{AnalysisInfo, Data, FunctionSig, Object, ObjectNode},
};
pub use alloy_primitives::U256;
