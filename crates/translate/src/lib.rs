//! EVM-dialect to Wasm-dialect translation.
//!
//! [`Translator::run`] takes an object whose code speaks the 256-bit EVM
//! dialect and produces a semantically equivalent object in the Wasm dialect:
//!
//! 1. validate the input and alpha-rename shadowed declarations,
//! 2. hoist and group function definitions, synthesize the entry function,
//! 3. move loop conditions into loop bodies and split expressions to
//!    three-address form,
//! 4. expand every 256-bit word into four i64 limbs, mapping EVM builtins to
//!    polyfill calls,
//! 5. displace user names colliding with the polyfill, splice the polyfill
//!    in, and re-analyze the result under the Wasm dialect.
//!
//! The pipeline is a pure function of its input; the only state a translator
//! keeps is the lazily parsed polyfill, so concurrent callers should use one
//! translator each.

mod disambiguate;
mod dispenser;
mod displace;
mod group;
mod hoist;
mod loop_cond;
mod polyfill;
mod split_expr;
mod word_size;


use dispenser::NameDispenser;
use polyfill::Polyfill;
use qir_data::{diagnostic, Diagnostic, EvmDialect, Name, Object, ObjectNode, WasmDialect};
use std::{cell::OnceCell, collections::BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// EVM builtins the target host cannot support. Calls to them translate
    /// to a plain `unreachable()` trap instead of a polyfill call. The ones
    /// the polyfill itself cannot express (`selfbalance`, `chainid`,
    /// `extcodehash`, `msize`, `create2`) already trap inside the polyfill
    /// and need no entry here.
    pub trap_builtins: BTreeSet<Name>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input object is not a well-formed EVM-dialect unit.
    #[error("input is not a well-formed EVM-dialect unit:\n{}", diagnostic::render_all(.0))]
    InvalidInput(Vec<Diagnostic>),

    /// The embedded polyfill failed to parse. Only a translator bug can cause
    /// this; the asset is fixed at compile time.
    #[error("the embedded polyfill failed to parse; this is a bug in the translator:\n{0}")]
    PolyfillParse(String),

    /// The translated unit failed Wasm-dialect analysis. Only a translator
    /// bug can cause this, so the message carries the full translated code
    /// and every diagnostic.
    #[error(
        "translated code failed Wasm-dialect analysis; this is a bug in the translator.\n\
         translated code:\n\
         ----------------------------------\n\
         {dump}\n\
         ----------------------------------\n\
         {}",
        diagnostic::render_all(.diagnostics)
    )]
    Internal { dump: String, diagnostics: Vec<Diagnostic> },
}

pub struct Translator {
    config: Config,
    polyfill: OnceCell<Polyfill>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self { config, polyfill: OnceCell::new() }
    }

    fn polyfill(&self) -> Result<&Polyfill, Error> {
        if self.polyfill.get().is_none() {
            let parsed = Polyfill::parse().map_err(Error::PolyfillParse)?;
            let _ = self.polyfill.set(parsed);
        }
        Ok(self.polyfill.get().expect("polyfill was just initialized"))
    }

    /// Translate one object and, recursively, its sub-objects. Data children
    /// are copied bit for bit and the sub-node index is preserved verbatim.
    pub fn run(&self, object: &Object) -> Result<Object, Error> {
        let polyfill = self.polyfill()?;

        qir_analysis::analyze(&object.code, &EvmDialect).map_err(Error::InvalidInput)?;

        // Polyfill names plus the undotted Wasm builtins the transform itself
        // emits calls to; user declarations must not capture either.
        let mut reserved = polyfill.functions.clone();
        reserved.extend(["unreachable".to_owned(), "nop".to_owned()]);

        let mut ast = object.code.clone();
        let mut dispenser = NameDispenser::new(&ast, reserved.iter().cloned());

        disambiguate::disambiguate(&mut ast, &EvmDialect, &mut dispenser);
        // Displace early so that the `or_bool` and `unreachable` calls
        // introduced below cannot resolve to user declarations.
        displace::displace_names(&mut ast, &reserved, &mut dispenser);
        hoist::hoist_functions(&mut ast);
        group::group_functions(&mut ast);
        let entry = group::synthesize_entry(&mut ast, &mut dispenser);
        tracing::debug!(target: "qir::translate", object = %object.name, %entry, "normalized");

        loop_cond::rewrite_loop_conditions(&mut ast, &EvmDialect);
        split_expr::split_expressions(&mut ast, &EvmDialect, &mut dispenser);
        let mut ast =
            word_size::expand_words(ast, &EvmDialect, &mut dispenser, &self.config.trap_builtins);
        tracing::debug!(target: "qir::translate", object = %object.name, "expanded words");

        // Names introduced since the early displacement all come from the
        // dispenser, which has the reserved set on file, so this second run
        // only catches invariant drift.
        displace::displace_names(&mut ast, &reserved, &mut dispenser);
        ast.statements.extend(polyfill.ast.statements.iter().cloned());

        let analysis = qir_analysis::analyze(&ast, &WasmDialect)
            .map_err(|diagnostics| Error::Internal { dump: ast.to_string(), diagnostics })?;
        tracing::debug!(
            target: "qir::translate",
            object = %object.name,
            functions = analysis.functions.len(),
            "reanalyzed"
        );

        let mut children = Vec::with_capacity(object.children.len());
        for child in &object.children {
            children.push(match child {
                ObjectNode::Object(inner) => ObjectNode::Object(self.run(inner)?),
                ObjectNode::Data(data) => ObjectNode::Data(data.clone()),
            });
        }

        Ok(Object {
            name: object.name.clone(),
            code: ast,
            analysis,
            children,
            index: object.index.clone(),
        })
    }
}
