//! Execution of a lowered program: a program-counter loop over the flat
//! statement list produced by lowering.
//!
//! User-facing errors never reach this stage — the diagnostics gate in
//! `Compilation::evaluate` only executes diagnostics-free programs. Any
//! violation detected here (a structured statement that lowering should
//! have eliminated, an operator missing from the dispatch, an undefined
//! label) is a pipeline bug and aborts loudly.

use std::collections::HashMap;

use crate::binder::{
    BoundBinaryOperatorKind, BoundBlockStatement, BoundExpression, BoundStatement,
    BoundUnaryOperatorKind, LabelSymbol, VariableSymbol,
};
use crate::value::Value;

/// The runtime variable store for one REPL session.
///
/// Keyed by the unique per-declaration symbol id, never by name: a shadowing
/// declaration or a REPL re-binding gets its own storage cell and leaves the
/// old one untouched.
#[derive(Debug, Default)]
pub struct Variables {
    values: HashMap<u32, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &VariableSymbol) -> Option<&Value> {
        self.values.get(&variable.id())
    }

    pub fn set(&mut self, variable: &VariableSymbol, value: Value) {
        self.values.insert(variable.id(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Execute a lowered block against a variable store, producing the last
/// computed value.
pub struct Evaluator<'a> {
    root: &'a BoundBlockStatement,
    variables: &'a mut Variables,
    last_value: Option<Value>,
}

impl<'a> Evaluator<'a> {
    pub fn new(root: &'a BoundBlockStatement, variables: &'a mut Variables) -> Self {
        Self {
            root,
            variables,
            last_value: None,
        }
    }

    pub fn evaluate(mut self) -> Option<Value> {
        let root = self.root;

        // Forward-reference map: a goto may target a label that has not
        // been passed yet.
        let label_to_index: HashMap<LabelSymbol, usize> = root
            .statements
            .iter()
            .enumerate()
            .filter_map(|(index, statement)| match statement {
                BoundStatement::Label(label) => Some((*label, index)),
                _ => None,
            })
            .collect();

        let mut index = 0;
        while let Some(statement) = root.statements.get(index) {
            match statement {
                BoundStatement::Expression(s) => {
                    self.last_value = Some(self.evaluate_expression(&s.expression));
                }
                BoundStatement::VariableDeclaration(s) => {
                    let value = self.evaluate_expression(&s.initializer);
                    self.variables.set(&s.variable, value.clone());
                    self.last_value = Some(value);
                }
                BoundStatement::Label(_) => {}
                BoundStatement::Goto(label) => {
                    index = resolve_label(&label_to_index, *label);
                }
                BoundStatement::ConditionalGoto(s) => {
                    let condition = self.evaluate_expression(&s.condition);
                    if condition == Value::Bool(s.jump_if) {
                        index = resolve_label(&label_to_index, s.label);
                    }
                }
                BoundStatement::Block(_)
                | BoundStatement::If(_)
                | BoundStatement::While(_)
                | BoundStatement::For(_) => {
                    panic!("structured statement reached the evaluator: {statement:?}")
                }
            }

            index += 1;
        }

        self.last_value
    }

    fn evaluate_expression(&mut self, expression: &BoundExpression) -> Value {
        match expression {
            BoundExpression::Literal(e) => e.value.clone(),
            BoundExpression::Variable(e) => match self.variables.get(&e.variable) {
                Some(value) => value.clone(),
                None => panic!("variable '{}' read before initialization", e.variable.name),
            },
            BoundExpression::Assignment(e) => {
                let value = self.evaluate_expression(&e.expression);
                self.variables.set(&e.variable, value.clone());
                value
            }
            BoundExpression::Unary(e) => {
                let operand = self.evaluate_expression(&e.operand);
                evaluate_unary(e.operator.kind, operand)
            }
            BoundExpression::Binary(e) => {
                let left = self.evaluate_expression(&e.left);
                let right = self.evaluate_expression(&e.right);
                evaluate_binary(e.operator.kind, left, right)
            }
        }
    }
}

fn resolve_label(label_to_index: &HashMap<LabelSymbol, usize>, label: LabelSymbol) -> usize {
    match label_to_index.get(&label) {
        Some(index) => *index,
        None => panic!("jump to undefined {label}"),
    }
}

/// Dispatch over the resolved operator's kind and operand payloads.
/// A resolvable operator this table does not cover is a drift bug between
/// the binder's signature table and this dispatch, and fails immediately.
fn evaluate_unary(kind: BoundUnaryOperatorKind, operand: Value) -> Value {
    use BoundUnaryOperatorKind::{BitwiseComplement, Identity, LogicalNegation, Negation};

    match (kind, operand) {
        (Identity, Value::Int(value)) => Value::Int(value),
        (Negation, Value::Int(value)) => Value::Int(value.wrapping_neg()),
        (LogicalNegation, Value::Bool(value)) => Value::Bool(!value),
        (BitwiseComplement, Value::Int(value)) => Value::Int(!value),
        (kind, operand) => {
            panic!("evaluation of unary operator {kind:?} for {operand:?} is not implemented")
        }
    }
}

fn evaluate_binary(kind: BoundBinaryOperatorKind, left: Value, right: Value) -> Value {
    use BoundBinaryOperatorKind::{
        Addition, BitwiseAnd, BitwiseOr, BitwiseXor, Division, Equals, Greater, GreaterOrEqual,
        Less, LessOrEqual, LogicalAnd, LogicalOr, Multiplication, NotEquals, Subtraction,
    };
    use Value::{Bool, Int, String};

    match (kind, left, right) {
        (Addition, Int(l), Int(r)) => Int(l.wrapping_add(r)),
        (Addition, String(l), String(r)) => String(l + &r),
        (Subtraction, Int(l), Int(r)) => Int(l.wrapping_sub(r)),
        (Multiplication, Int(l), Int(r)) => Int(l.wrapping_mul(r)),
        // wrapping_div still aborts on a zero divisor, which is the
        // intended runtime failure for `x / 0`.
        (Division, Int(l), Int(r)) => Int(l.wrapping_div(r)),

        (LogicalAnd | BitwiseAnd, Bool(l), Bool(r)) => Bool(l && r),
        (LogicalOr | BitwiseOr, Bool(l), Bool(r)) => Bool(l || r),
        (BitwiseXor, Bool(l), Bool(r)) => Bool(l ^ r),
        (BitwiseAnd, Int(l), Int(r)) => Int(l & r),
        (BitwiseOr, Int(l), Int(r)) => Int(l | r),
        (BitwiseXor, Int(l), Int(r)) => Int(l ^ r),

        (Equals, l, r) => Bool(l == r),
        (NotEquals, l, r) => Bool(l != r),

        (Less, Int(l), Int(r)) => Bool(l < r),
        (LessOrEqual, Int(l), Int(r)) => Bool(l <= r),
        (Greater, Int(l), Int(r)) => Bool(l > r),
        (GreaterOrEqual, Int(l), Int(r)) => Bool(l >= r),

        (kind, left, right) => panic!(
            "evaluation of binary operator {kind:?} for {left:?} and {right:?} is not implemented"
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::binder::bind_global_scope;
    use crate::lowering::lower;
    use crate::parser::SyntaxTree;

    fn evaluate(input: &str) -> Value {
        let mut variables = Variables::new();
        evaluate_with(input, &mut variables)
    }

    fn evaluate_with(input: &str, variables: &mut Variables) -> Value {
        let tree = SyntaxTree::parse(input);
        assert!(tree.diagnostics().is_empty(), "diagnostics for {input:?}");
        let scope = bind_global_scope(None, tree.root());
        assert!(scope.diagnostics.is_empty(), "diagnostics for {input:?}");
        let program = lower(scope.statement);
        Evaluator::new(&program, variables).evaluate().unwrap()
    }

    #[test]
    fn arithmetic() {
        for (input, expected) in [
            ("14 + 12", 26),
            ("12 - 3", 9),
            ("4 * 2", 8),
            ("9 / 3", 3),
            ("(10)", 10),
            ("1 + 2 * 3", 7),
            ("(1 + 2) * 3", 9),
            ("-5 + 3", -2),
            ("+4", 4),
            ("~1", -2),
        ] {
            assert_eq!(evaluate(input), Value::Int(expected), "input {input:?}");
        }
    }

    #[test]
    fn integer_arithmetic_wraps() {
        assert_eq!(evaluate("2147483647 + 1"), Value::Int(i32::MIN));
    }

    #[test]
    fn comparisons_and_logic() {
        for (input, expected) in [
            ("1 < 2", true),
            ("2 <= 2", true),
            ("3 > 4", false),
            ("4 >= 4", true),
            ("1 == 1", true),
            ("1 != 1", false),
            ("true && false", false),
            ("true || false", true),
            ("!true", false),
            ("true & true", true),
            ("false | true", true),
            ("true ^ true", false),
            ("1 == true", false),
            ("\"a\" == \"a\"", true),
            ("\"a\" != \"b\"", true),
        ] {
            assert_eq!(evaluate(input), Value::Bool(expected), "input {input:?}");
        }
    }

    #[test]
    fn bitwise_on_ints() {
        for (input, expected) in [("1 & 3", 1), ("1 | 2", 3), ("1 ^ 3", 2)] {
            assert_eq!(evaluate(input), Value::Int(expected), "input {input:?}");
        }
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(evaluate("\"foo\" + \"bar\""), Value::from("foobar"));
    }

    #[test]
    fn declaration_yields_its_value() {
        assert_eq!(evaluate("var a = 42"), Value::Int(42));
    }

    #[test]
    fn assignment_yields_the_assigned_value() {
        assert_eq!(evaluate("{ var a = 0 a = 10 }"), Value::Int(10));
    }

    #[test]
    fn while_loop_sums() {
        let input = "{ var i = 10 var result = 0 while i > 0 { result = result + i i = i - 1 } result }";
        assert_eq!(evaluate(input), Value::Int(55));
    }

    #[test]
    fn for_loop_sums() {
        let input = "{ var result = 0 for i = 0 to 10 result = result + i result }";
        assert_eq!(evaluate(input), Value::Int(55));
    }

    #[test]
    fn for_loop_runs_inclusive_bounds() {
        let input = "{ var count = 0 for i = 3 to 5 count = count + 1 count }";
        assert_eq!(evaluate(input), Value::Int(3));
    }

    #[test]
    fn for_loop_with_empty_range_skips_body() {
        let input = "{ var count = 0 for i = 5 to 3 count = count + 1 count }";
        assert_eq!(evaluate(input), Value::Int(0));
    }

    #[test]
    fn if_else_takes_the_right_branch() {
        let input = "{ var a = 0 if a == 0 a = 1 else a = 2 a }";
        assert_eq!(evaluate(input), Value::Int(1));

        let input = "{ var a = 3 if a == 0 a = 1 else a = 2 a }";
        assert_eq!(evaluate(input), Value::Int(2));
    }

    #[test]
    fn if_without_else_falls_through() {
        let input = "{ var a = 7 if false a = 1 a }";
        assert_eq!(evaluate(input), Value::Int(7));
    }

    #[test]
    fn inner_shadow_does_not_leak() {
        let input = "{ var a = 0 { var a = 10 } a }";
        assert_eq!(evaluate(input), Value::Int(0));
    }

    #[test]
    fn shadowed_cells_are_distinct() {
        let mut variables = Variables::new();
        let value = evaluate_with("{ var a = 0 { var a = 10 } a }", &mut variables);
        assert_eq!(value, Value::Int(0));
        // both declaration sites got their own cell
        assert_eq!(variables.len(), 2);
    }

    #[test]
    fn nested_loops() {
        let input = "{ var total = 0 for i = 1 to 3 for j = 1 to 3 total = total + i * j total }";
        assert_eq!(evaluate(input), Value::Int(36));
    }

    #[test]
    fn empty_block_yields_no_value() {
        let tree = SyntaxTree::parse("{ }");
        let scope = bind_global_scope(None, tree.root());
        let program = lower(scope.statement);
        let mut variables = Variables::new();
        assert_eq!(Evaluator::new(&program, &mut variables).evaluate(), None);
    }

    #[test]
    #[should_panic(expected = "structured statement reached the evaluator")]
    fn unlowered_statement_is_an_invariant_violation() {
        let tree = SyntaxTree::parse("if true 1");
        let scope = bind_global_scope(None, tree.root());
        // Skipping the lowering pass on purpose.
        let program = BoundBlockStatement {
            statements: vec![scope.statement],
        };
        let mut variables = Variables::new();
        Evaluator::new(&program, &mut variables).evaluate();
    }
}
