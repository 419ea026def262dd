//! lumen — a tiny imperative expression language with an incremental REPL.
//!
//! The pipeline runs in five stages, each completing before the next:
//! source → lex → parse → bind → lower → evaluate. [`parser::SyntaxTree::parse`]
//! covers the first two; [`Compilation`] drives the rest and chains scope
//! state across REPL submissions.
//!
//! Every stage accumulates diagnostics instead of failing: a submission
//! with any diagnostics never reaches evaluation, but always yields a
//! best-effort tree so all of its problems surface in one pass.

pub mod binder;
pub mod diagnostics;
// Invariant violations in the evaluator abort loudly on purpose.
#[allow(clippy::panic)]
pub mod evaluator;
pub mod lexer;
pub mod lowering;
pub mod parser;
pub mod syntax;
pub mod text;
pub mod value;

use std::cell::OnceCell;
use std::rc::Rc;

use binder::{bind_global_scope, BoundGlobalScope};
use diagnostics::Diagnostic;
use evaluator::{Evaluator, Variables};
use parser::SyntaxTree;
use value::Value;

/// Outcome of evaluating one submission.
#[derive(Debug)]
pub enum EvaluationResult {
    /// The last computed value, if any statement produced one.
    Success(Option<Value>),
    /// The submission had diagnostics and was not executed.
    Failure(Vec<Diagnostic>),
}

/// One REPL submission bound against the session's accumulated scope.
///
/// Binding is performed lazily on the first [`evaluate`](Compilation::evaluate)
/// call and memoized; [`continue_with`](Compilation::continue_with) chains a
/// follow-up submission so variables declared earlier stay visible.
pub struct Compilation {
    previous: Option<Rc<BoundGlobalScope>>,
    syntax_tree: SyntaxTree,
    global_scope: OnceCell<Rc<BoundGlobalScope>>,
}

impl Compilation {
    pub fn new(syntax_tree: SyntaxTree) -> Self {
        Self {
            previous: None,
            syntax_tree,
            global_scope: OnceCell::new(),
        }
    }

    /// A compilation of the next submission, with this one's declared
    /// variables in scope.
    pub fn continue_with(&self, syntax_tree: SyntaxTree) -> Compilation {
        Compilation {
            previous: Some(Rc::clone(self.global_scope())),
            syntax_tree,
            global_scope: OnceCell::new(),
        }
    }

    pub fn syntax_tree(&self) -> &SyntaxTree {
        &self.syntax_tree
    }

    fn global_scope(&self) -> &Rc<BoundGlobalScope> {
        self.global_scope.get_or_init(|| {
            Rc::new(bind_global_scope(
                self.previous.clone(),
                self.syntax_tree.root(),
            ))
        })
    }

    /// Evaluate the submission against the session's variable store.
    ///
    /// The diagnostics gate: any lexer, parser, or binder diagnostic means
    /// the bound tree is never executed.
    pub fn evaluate(&self, variables: &mut Variables) -> EvaluationResult {
        let global_scope = self.global_scope();

        let mut diagnostics = self.syntax_tree.diagnostics().to_vec();
        diagnostics.extend(global_scope.diagnostics.iter().cloned());
        if !diagnostics.is_empty() {
            return EvaluationResult::Failure(diagnostics);
        }

        let program = lowering::lower(global_scope.statement.clone());
        let value = Evaluator::new(&program, variables).evaluate();
        EvaluationResult::Success(value)
    }
}
