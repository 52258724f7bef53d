//! Semantic analysis.
//!
//! Walks a block with an explicit scope stack and checks it against a dialect:
//! every identifier resolves, declarations are unique per scope, calls agree
//! with the callee's signature, statements respect the language's value
//! discipline, and control-flow statements appear where they are allowed.
//!
//! Shadowing across scopes is legal here (the translator's disambiguator
//! removes it); redeclaration within one scope is not. User declarations may
//! shadow builtins, and resolution prefers the innermost user declaration.

use qir_data::{
    AnalysisInfo, Assignment, Block, Case, Diagnostic, Dialect, Expression, ForLoop, FunctionCall,
    FunctionDefinition, FunctionSig, If, Name, Statement, Switch, Type, TypedName,
    VariableDeclaration,
};
use std::collections::HashMap;

/// Analyze `block` against `dialect`, producing the unit's side table.
pub fn analyze(block: &Block, dialect: &dyn Dialect) -> Result<AnalysisInfo, Vec<Diagnostic>> {
    let mut analyzer = Analyzer {
        dialect,
        scopes: Vec::new(),
        diagnostics: Vec::new(),
        info: AnalysisInfo::default(),
        loop_depth: 0,
        function_depth: 0,
    };
    analyzer.check_block(block);
    if analyzer.diagnostics.is_empty() { Ok(analyzer.info) } else { Err(analyzer.diagnostics) }
}

#[derive(Default)]
struct Scope {
    variables: HashMap<Name, Type>,
    functions: HashMap<Name, FunctionSig>,
    /// Variable lookups stop here; function lookups do not.
    function_boundary: bool,
}

struct Analyzer<'d> {
    dialect: &'d dyn Dialect,
    scopes: Vec<Scope>,
    diagnostics: Vec<Diagnostic>,
    info: AnalysisInfo,
    loop_depth: usize,
    function_depth: usize,
}

impl Analyzer<'_> {
    fn report(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(message));
    }

    fn current_scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty while walking")
    }

    fn resolve_variable(&self, name: &str) -> Option<Type> {
        for scope in self.scopes.iter().rev() {
            if let Some(&ty) = scope.variables.get(name) {
                return Some(ty);
            }
            if scope.function_boundary {
                break;
            }
        }
        None
    }

    fn resolve_function(&self, name: &str) -> Option<&FunctionSig> {
        self.scopes.iter().rev().find_map(|scope| scope.functions.get(name))
    }

    fn declare_variable(&mut self, typed: &TypedName) {
        if typed.name.contains('.') {
            self.report(format!("`{}`: names with dots are reserved for builtins", typed.name));
            return;
        }
        let scope = self.scopes.last().expect("scope stack is never empty while walking");
        if scope.variables.contains_key(&typed.name) || scope.functions.contains_key(&typed.name) {
            self.report(format!("`{}` is already declared in this scope", typed.name));
            return;
        }
        self.current_scope().variables.insert(typed.name.clone(), typed.ty);
    }

    fn check_block(&mut self, block: &Block) {
        self.scopes.push(Scope::default());
        self.check_statements_in_current_scope(&block.statements);
        self.scopes.pop();
    }

    fn check_statements_in_current_scope(&mut self, statements: &[Statement]) {
        // Function definitions are visible in the whole enclosing block, so
        // collect them before walking any statement.
        for statement in statements {
            if let Statement::FunctionDefinition(function) = statement {
                if function.name.contains('.') {
                    self.report(format!(
                        "`{}`: names with dots are reserved for builtins",
                        function.name
                    ));
                    continue;
                }
                let sig = FunctionSig {
                    parameters: function.parameters.iter().map(|p| p.ty).collect(),
                    returns: function.returns.iter().map(|r| r.ty).collect(),
                };
                let duplicate =
                    self.current_scope().functions.insert(function.name.clone(), sig.clone());
                if duplicate.is_some() {
                    self.report(format!(
                        "function `{}` is declared twice in this scope",
                        function.name
                    ));
                }
                self.info.functions.insert(function.name.clone(), sig);
            }
        }
        for statement in statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.check_block(block),
            Statement::FunctionDefinition(function) => self.check_function(function),
            Statement::VariableDeclaration(declaration) => self.check_declaration(declaration),
            Statement::Assignment(assignment) => self.check_assignment(assignment),
            Statement::If(conditional) => self.check_if(conditional),
            Statement::Switch(switch) => self.check_switch(switch),
            Statement::ForLoop(loop_) => self.check_for(loop_),
            Statement::Break | Statement::Continue => {
                if self.loop_depth == 0 {
                    self.report("`break`/`continue` outside of a for-loop body");
                }
            }
            Statement::Leave => {
                if self.function_depth == 0 {
                    self.report("`leave` outside of a function body");
                }
            }
            Statement::Expression(expression) => {
                if let Some(types) = self.expression_types(expression) {
                    if !types.is_empty() {
                        self.report(format!(
                            "expression statement discards {} value(s)",
                            types.len()
                        ));
                    }
                }
            }
        }
    }

    fn check_function(&mut self, function: &FunctionDefinition) {
        self.scopes.push(Scope { function_boundary: true, ..Scope::default() });
        for typed in function.parameters.iter().chain(&function.returns) {
            self.declare_variable(typed);
        }
        let saved_loop_depth = std::mem::take(&mut self.loop_depth);
        self.function_depth += 1;
        self.check_block(&function.body);
        self.function_depth -= 1;
        self.loop_depth = saved_loop_depth;
        self.scopes.pop();
    }

    fn check_declaration(&mut self, declaration: &VariableDeclaration) {
        if let Some(value) = &declaration.value {
            if let Some(types) = self.expression_types(value) {
                if types.len() != declaration.variables.len() {
                    self.report(format!(
                        "declaration of {} variable(s) from expression returning {} value(s)",
                        declaration.variables.len(),
                        types.len()
                    ));
                } else {
                    for (variable, ty) in declaration.variables.iter().zip(types) {
                        if variable.ty != ty {
                            self.report(format!(
                                "`{}` is declared as {:?} but initialized with {ty:?}",
                                variable.name, variable.ty
                            ));
                        }
                    }
                }
            }
        }
        for variable in &declaration.variables {
            self.declare_variable(variable);
        }
    }

    fn check_assignment(&mut self, assignment: &Assignment) {
        let mut target_types = Vec::with_capacity(assignment.targets.len());
        for (position, target) in assignment.targets.iter().enumerate() {
            if assignment.targets[..position].contains(target) {
                self.report(format!("`{target}` is assigned twice in one statement"));
            }
            match self.resolve_variable(target) {
                Some(ty) => target_types.push(ty),
                None => {
                    self.report(format!("assignment to undeclared variable `{target}`"));
                    target_types.push(self.dialect.default_type());
                }
            }
        }
        if let Some(types) = self.expression_types(&assignment.value) {
            if types.len() != assignment.targets.len() {
                self.report(format!(
                    "assignment of {} target(s) from expression returning {} value(s)",
                    assignment.targets.len(),
                    types.len()
                ));
            } else {
                for ((target, want), got) in assignment.targets.iter().zip(&target_types).zip(types)
                {
                    if *want != got {
                        self.report(format!("`{target}` has type {want:?} but is assigned a {got:?}"));
                    }
                }
            }
        }
    }

    fn check_if(&mut self, conditional: &If) {
        self.check_condition(&conditional.condition, "if");
        self.check_block(&conditional.body);
    }

    fn check_condition(&mut self, condition: &Expression, construct: &str) {
        let want = self.dialect.boolean_type();
        if let Some(types) = self.expression_types(condition) {
            if types.len() != 1 || types[0] != want {
                self.report(format!(
                    "`{construct}` condition must be a single {want:?} value, found {types:?}"
                ));
            }
        }
    }

    fn check_switch(&mut self, switch: &Switch) {
        let scrutinee = match self.expression_types(&switch.expression) {
            Some(types) if types.len() == 1 => Some(types[0]),
            Some(types) => {
                self.report(format!(
                    "switch expression must be a single value, found {} values",
                    types.len()
                ));
                None
            }
            None => None,
        };
        let mut seen = Vec::new();
        for Case { value, body } in &switch.cases {
            if let Some(want) = scrutinee {
                if value.ty != want {
                    self.report(format!(
                        "case literal of type {:?} does not match switch expression type {want:?}",
                        value.ty
                    ));
                }
            }
            let number = value.as_number();
            if seen.contains(&number) {
                self.report(format!("duplicate case value {number}"));
            }
            seen.push(number);
            self.check_block(body);
        }
        if let Some(default) = &switch.default {
            self.check_block(default);
        }
    }

    fn check_for(&mut self, loop_: &ForLoop) {
        // The initializer's scope extends over condition, post and body.
        self.scopes.push(Scope::default());
        self.check_statements_in_current_scope(&loop_.pre.statements);
        self.check_condition(&loop_.condition, "for");
        self.loop_depth += 1;
        self.check_block(&loop_.body);
        self.loop_depth -= 1;
        // `break`/`continue` are not allowed in the post block.
        self.check_block(&loop_.post);
        self.scopes.pop();
    }

    /// Types of the values an expression produces, or `None` if the expression
    /// could not be typed (a diagnostic has been emitted already).
    fn expression_types(&mut self, expression: &Expression) -> Option<Vec<Type>> {
        match expression {
            Expression::Literal(literal) => Some(vec![literal.ty]),
            Expression::Identifier(name) => match self.resolve_variable(name) {
                Some(ty) => Some(vec![ty]),
                None => {
                    if self.resolve_function(name).is_some() {
                        self.report(format!("function `{name}` used as a variable"));
                    } else {
                        self.report(format!("undeclared identifier `{name}`"));
                    }
                    None
                }
            },
            Expression::Call(call) => self.check_call(call),
        }
    }

    fn check_call(&mut self, call: &FunctionCall) -> Option<Vec<Type>> {
        let mut argument_types = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            match self.expression_types(argument) {
                Some(types) if types.len() == 1 => argument_types.push(Some(types[0])),
                Some(types) => {
                    self.report(format!(
                        "call argument must be a single value, found {} values",
                        types.len()
                    ));
                    argument_types.push(None);
                }
                None => argument_types.push(None),
            }
        }

        // Innermost user definition wins over a same-named builtin.
        let (parameters, returns) = if let Some(sig) = self.resolve_function(&call.name) {
            (sig.parameters.clone(), sig.returns.clone())
        } else if let Some(builtin) = self.dialect.builtin(&call.name) {
            (builtin.parameters.clone(), builtin.returns.clone())
        } else {
            self.report(format!("call to undeclared function `{}`", call.name));
            return None;
        };

        if argument_types.len() != parameters.len() {
            self.report(format!(
                "`{}` expects {} argument(s), found {}",
                call.name,
                parameters.len(),
                argument_types.len()
            ));
        } else {
            for (position, (got, want)) in argument_types.iter().zip(&parameters).enumerate() {
                if let Some(got) = got {
                    if got != want {
                        self.report(format!(
                            "argument {} of `{}` must be {want:?}, found {got:?}",
                            position + 1,
                            call.name
                        ));
                    }
                }
            }
        }
        Some(returns)
    }
}
