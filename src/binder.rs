//! Semantic binding: scope and type resolution over the syntax tree.
//!
//! Binding maps each syntax node to a bound node, resolving names against a
//! scope chain and operators against the fixed builtin signature tables.
//! Every check is non-fatal: the binder substitutes a default and keeps
//! going so a whole submission surfaces all of its problems in one pass.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;

use crate::diagnostics::Diagnostic;
use crate::syntax::{
    AssignmentExpression, BinaryExpression, CompilationUnit, ExpressionNode, ForStatement,
    IfStatement, LiteralExpression, NameExpression, StatementNode, SyntaxKind, Token,
    UnaryExpression, VariableDeclarationStatement, WhileStatement,
};
use crate::text::{CodePointString, TextSpan};
use crate::value::Value;

// ── Symbols ───────────────────────────────────────────────────────

/// A type in the language. The three builtin instances are the only ones
/// that exist; comparison is by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSymbol {
    name: &'static str,
    builtin: bool,
}

impl TypeSymbol {
    pub const INT: TypeSymbol = TypeSymbol {
        name: "int",
        builtin: true,
    };
    pub const BOOLEAN: TypeSymbol = TypeSymbol {
        name: "boolean",
        builtin: true,
    };
    pub const STRING: TypeSymbol = TypeSymbol {
        name: "string",
        builtin: true,
    };

    pub fn name(self) -> &'static str {
        self.name
    }

    pub fn is_builtin(self) -> bool {
        self.builtin
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static NEXT_VARIABLE_ID: AtomicU32 = AtomicU32::new(0);

/// A declared variable. Every declaration mints a fresh `id`, so two
/// same-named declarations (an inner shadow, or a REPL re-binding) are
/// distinct symbols with distinct storage cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSymbol {
    id: u32,
    pub name: CodePointString,
    pub is_read_only: bool,
    pub ty: TypeSymbol,
}

impl VariableSymbol {
    pub fn new(name: CodePointString, is_read_only: bool, ty: TypeSymbol) -> Self {
        Self {
            id: NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed),
            name,
            is_read_only,
            ty,
        }
    }

    /// Unique per-declaration id; the runtime store keys on this.
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// A jump target minted during lowering; never produced by parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelSymbol(u32);

impl LabelSymbol {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for LabelSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label{}", self.0)
    }
}

// ── Builtin operators ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundUnaryOperatorKind {
    Identity,
    Negation,
    LogicalNegation,
    BitwiseComplement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundBinaryOperatorKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// Operand-type predicate for an operator signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeMatcher {
    Exact(TypeSymbol),
    Any,
}

impl TypeMatcher {
    fn matches(self, ty: TypeSymbol) -> bool {
        match self {
            TypeMatcher::Exact(expected) => expected == ty,
            TypeMatcher::Any => true,
        }
    }
}

/// A builtin unary operator signature. The binder resolves operators to
/// references into the static table, so every bound operator is a
/// singleton.
#[derive(Debug, PartialEq, Eq)]
pub struct BoundUnaryOperator {
    pub kind: BoundUnaryOperatorKind,
    pub token_kind: SyntaxKind,
    operand: TypeMatcher,
    pub result_type: TypeSymbol,
}

impl BoundUnaryOperator {
    const fn same(kind: BoundUnaryOperatorKind, token_kind: SyntaxKind, ty: TypeSymbol) -> Self {
        Self {
            kind,
            token_kind,
            operand: TypeMatcher::Exact(ty),
            result_type: ty,
        }
    }
}

pub static UNARY_IDENTITY_INT: BoundUnaryOperator = BoundUnaryOperator::same(
    BoundUnaryOperatorKind::Identity,
    SyntaxKind::Plus,
    TypeSymbol::INT,
);
pub static UNARY_NEGATION_INT: BoundUnaryOperator = BoundUnaryOperator::same(
    BoundUnaryOperatorKind::Negation,
    SyntaxKind::Minus,
    TypeSymbol::INT,
);
pub static UNARY_LOGICAL_NEGATION_BOOLEAN: BoundUnaryOperator = BoundUnaryOperator::same(
    BoundUnaryOperatorKind::LogicalNegation,
    SyntaxKind::Bang,
    TypeSymbol::BOOLEAN,
);
pub static UNARY_BITWISE_COMPLEMENT_INT: BoundUnaryOperator = BoundUnaryOperator::same(
    BoundUnaryOperatorKind::BitwiseComplement,
    SyntaxKind::Tilde,
    TypeSymbol::INT,
);

static BUILTIN_UNARY_OPERATORS: &[&BoundUnaryOperator] = &[
    &UNARY_IDENTITY_INT,
    &UNARY_NEGATION_INT,
    &UNARY_LOGICAL_NEGATION_BOOLEAN,
    &UNARY_BITWISE_COMPLEMENT_INT,
];

fn find_builtin_unary_operator(
    token_kind: SyntaxKind,
    operand_type: TypeSymbol,
) -> Option<&'static BoundUnaryOperator> {
    BUILTIN_UNARY_OPERATORS
        .iter()
        .find(|op| op.token_kind == token_kind && op.operand.matches(operand_type))
        .copied()
}

/// A builtin binary operator signature; see [`BoundUnaryOperator`].
#[derive(Debug, PartialEq, Eq)]
pub struct BoundBinaryOperator {
    pub kind: BoundBinaryOperatorKind,
    pub token_kind: SyntaxKind,
    left: TypeMatcher,
    right: TypeMatcher,
    pub result_type: TypeSymbol,
}

impl BoundBinaryOperator {
    const fn same(kind: BoundBinaryOperatorKind, token_kind: SyntaxKind, ty: TypeSymbol) -> Self {
        Self {
            kind,
            token_kind,
            left: TypeMatcher::Exact(ty),
            right: TypeMatcher::Exact(ty),
            result_type: ty,
        }
    }

    const fn comparison(
        kind: BoundBinaryOperatorKind,
        token_kind: SyntaxKind,
        operand: TypeSymbol,
    ) -> Self {
        Self {
            kind,
            token_kind,
            left: TypeMatcher::Exact(operand),
            right: TypeMatcher::Exact(operand),
            result_type: TypeSymbol::BOOLEAN,
        }
    }

    const fn any(kind: BoundBinaryOperatorKind, token_kind: SyntaxKind) -> Self {
        Self {
            kind,
            token_kind,
            left: TypeMatcher::Any,
            right: TypeMatcher::Any,
            result_type: TypeSymbol::BOOLEAN,
        }
    }
}

pub static BINARY_ADDITION_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::Addition,
    SyntaxKind::Plus,
    TypeSymbol::INT,
);
pub static BINARY_SUBTRACTION_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::Subtraction,
    SyntaxKind::Minus,
    TypeSymbol::INT,
);
pub static BINARY_MULTIPLICATION_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::Multiplication,
    SyntaxKind::Star,
    TypeSymbol::INT,
);
pub static BINARY_DIVISION_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::Division,
    SyntaxKind::Slash,
    TypeSymbol::INT,
);
pub static BINARY_ADDITION_STRING_STRING: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::Addition,
    SyntaxKind::Plus,
    TypeSymbol::STRING,
);
pub static BINARY_LOGICAL_AND_BOOLEAN_BOOLEAN: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::LogicalAnd,
    SyntaxKind::AmpersandAmpersand,
    TypeSymbol::BOOLEAN,
);
pub static BINARY_LOGICAL_OR_BOOLEAN_BOOLEAN: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::LogicalOr,
    SyntaxKind::PipePipe,
    TypeSymbol::BOOLEAN,
);
pub static BINARY_BITWISE_AND_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::BitwiseAnd,
    SyntaxKind::Ampersand,
    TypeSymbol::INT,
);
pub static BINARY_BITWISE_OR_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::BitwiseOr,
    SyntaxKind::Pipe,
    TypeSymbol::INT,
);
pub static BINARY_BITWISE_XOR_INT_INT: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::BitwiseXor,
    SyntaxKind::Caret,
    TypeSymbol::INT,
);
pub static BINARY_BITWISE_AND_BOOLEAN_BOOLEAN: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::BitwiseAnd,
    SyntaxKind::Ampersand,
    TypeSymbol::BOOLEAN,
);
pub static BINARY_BITWISE_OR_BOOLEAN_BOOLEAN: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::BitwiseOr,
    SyntaxKind::Pipe,
    TypeSymbol::BOOLEAN,
);
pub static BINARY_BITWISE_XOR_BOOLEAN_BOOLEAN: BoundBinaryOperator = BoundBinaryOperator::same(
    BoundBinaryOperatorKind::BitwiseXor,
    SyntaxKind::Caret,
    TypeSymbol::BOOLEAN,
);
pub static BINARY_EQUALS_ANY: BoundBinaryOperator =
    BoundBinaryOperator::any(BoundBinaryOperatorKind::Equals, SyntaxKind::EqualsEquals);
pub static BINARY_NOT_EQUALS_ANY: BoundBinaryOperator =
    BoundBinaryOperator::any(BoundBinaryOperatorKind::NotEquals, SyntaxKind::BangEquals);
pub static BINARY_LESS_INT_INT: BoundBinaryOperator = BoundBinaryOperator::comparison(
    BoundBinaryOperatorKind::Less,
    SyntaxKind::Less,
    TypeSymbol::INT,
);
pub static BINARY_LESS_OR_EQUAL_INT_INT: BoundBinaryOperator = BoundBinaryOperator::comparison(
    BoundBinaryOperatorKind::LessOrEqual,
    SyntaxKind::LessOrEqual,
    TypeSymbol::INT,
);
pub static BINARY_GREATER_INT_INT: BoundBinaryOperator = BoundBinaryOperator::comparison(
    BoundBinaryOperatorKind::Greater,
    SyntaxKind::Greater,
    TypeSymbol::INT,
);
pub static BINARY_GREATER_OR_EQUAL_INT_INT: BoundBinaryOperator = BoundBinaryOperator::comparison(
    BoundBinaryOperatorKind::GreaterOrEqual,
    SyntaxKind::GreaterOrEqual,
    TypeSymbol::INT,
);

static BUILTIN_BINARY_OPERATORS: &[&BoundBinaryOperator] = &[
    &BINARY_ADDITION_INT_INT,
    &BINARY_SUBTRACTION_INT_INT,
    &BINARY_MULTIPLICATION_INT_INT,
    &BINARY_DIVISION_INT_INT,
    &BINARY_ADDITION_STRING_STRING,
    &BINARY_LOGICAL_AND_BOOLEAN_BOOLEAN,
    &BINARY_LOGICAL_OR_BOOLEAN_BOOLEAN,
    &BINARY_BITWISE_AND_INT_INT,
    &BINARY_BITWISE_OR_INT_INT,
    &BINARY_BITWISE_XOR_INT_INT,
    &BINARY_BITWISE_AND_BOOLEAN_BOOLEAN,
    &BINARY_BITWISE_OR_BOOLEAN_BOOLEAN,
    &BINARY_BITWISE_XOR_BOOLEAN_BOOLEAN,
    &BINARY_EQUALS_ANY,
    &BINARY_NOT_EQUALS_ANY,
    &BINARY_LESS_INT_INT,
    &BINARY_LESS_OR_EQUAL_INT_INT,
    &BINARY_GREATER_INT_INT,
    &BINARY_GREATER_OR_EQUAL_INT_INT,
];

fn find_builtin_binary_operator(
    token_kind: SyntaxKind,
    left_type: TypeSymbol,
    right_type: TypeSymbol,
) -> Option<&'static BoundBinaryOperator> {
    BUILTIN_BINARY_OPERATORS
        .iter()
        .find(|op| {
            op.token_kind == token_kind
                && op.left.matches(left_type)
                && op.right.matches(right_type)
        })
        .copied()
}

// ── Bound tree ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum BoundExpression {
    Literal(BoundLiteralExpression),
    Unary(BoundUnaryExpression),
    Binary(BoundBinaryExpression),
    Variable(BoundVariableExpression),
    Assignment(BoundAssignmentExpression),
}

#[derive(Debug, Clone)]
pub struct BoundLiteralExpression {
    pub value: Value,
    pub ty: TypeSymbol,
}

#[derive(Debug, Clone)]
pub struct BoundUnaryExpression {
    pub operator: &'static BoundUnaryOperator,
    pub operand: Box<BoundExpression>,
}

#[derive(Debug, Clone)]
pub struct BoundBinaryExpression {
    pub left: Box<BoundExpression>,
    pub operator: &'static BoundBinaryOperator,
    pub right: Box<BoundExpression>,
}

#[derive(Debug, Clone)]
pub struct BoundVariableExpression {
    pub variable: VariableSymbol,
}

#[derive(Debug, Clone)]
pub struct BoundAssignmentExpression {
    pub variable: VariableSymbol,
    pub expression: Box<BoundExpression>,
}

impl BoundExpression {
    fn literal_int(value: i32) -> BoundExpression {
        BoundExpression::Literal(BoundLiteralExpression {
            value: Value::Int(value),
            ty: TypeSymbol::INT,
        })
    }

    pub fn ty(&self) -> TypeSymbol {
        match self {
            BoundExpression::Literal(e) => e.ty,
            BoundExpression::Unary(e) => e.operator.result_type,
            BoundExpression::Binary(e) => e.operator.result_type,
            BoundExpression::Variable(e) => e.variable.ty,
            BoundExpression::Assignment(e) => e.variable.ty,
        }
    }
}

/// Statements before and after lowering. If/While/For only occur in
/// pre-lowering trees; Label/Goto/ConditionalGoto only in post-lowering
/// ones. That split is a pipeline invariant, not a type distinction.
#[derive(Debug, Clone)]
pub enum BoundStatement {
    Block(BoundBlockStatement),
    Expression(BoundExpressionStatement),
    VariableDeclaration(BoundVariableDeclarationStatement),
    If(BoundIfStatement),
    While(BoundWhileStatement),
    For(BoundForStatement),
    Label(LabelSymbol),
    Goto(LabelSymbol),
    ConditionalGoto(BoundConditionalGotoStatement),
}

#[derive(Debug, Clone)]
pub struct BoundBlockStatement {
    pub statements: Vec<BoundStatement>,
}

#[derive(Debug, Clone)]
pub struct BoundExpressionStatement {
    pub expression: BoundExpression,
}

#[derive(Debug, Clone)]
pub struct BoundVariableDeclarationStatement {
    pub variable: VariableSymbol,
    pub initializer: BoundExpression,
}

#[derive(Debug, Clone)]
pub struct BoundIfStatement {
    pub condition: BoundExpression,
    pub then_statement: Box<BoundStatement>,
    pub else_statement: Option<Box<BoundStatement>>,
}

#[derive(Debug, Clone)]
pub struct BoundWhileStatement {
    pub condition: BoundExpression,
    pub body: Box<BoundStatement>,
}

#[derive(Debug, Clone)]
pub struct BoundForStatement {
    pub variable: VariableSymbol,
    pub lower_bound: BoundExpression,
    pub upper_bound: BoundExpression,
    pub body: Box<BoundStatement>,
}

#[derive(Debug, Clone)]
pub struct BoundConditionalGotoStatement {
    pub label: LabelSymbol,
    pub condition: BoundExpression,
    /// Jump when the condition evaluates to this polarity; fall through
    /// otherwise.
    pub jump_if: bool,
}

// ── Scopes ────────────────────────────────────────────────────────

/// A stack of symbol tables: one level per surrounding block plus one per
/// replayed REPL submission. Declaration checks only the innermost level,
/// so shadowing in a nested block is allowed; lookup walks outward.
struct BoundScope {
    levels: Vec<IndexMap<CodePointString, VariableSymbol>>,
}

impl BoundScope {
    fn new() -> Self {
        Self {
            levels: vec![IndexMap::new()],
        }
    }

    fn push(&mut self) {
        self.levels.push(IndexMap::new());
    }

    fn pop(&mut self) {
        self.levels.pop();
    }

    fn declare(&mut self, variable: VariableSymbol) -> bool {
        let Some(level) = self.levels.last_mut() else {
            return false;
        };
        if level.contains_key(&variable.name) {
            return false;
        }
        level.insert(variable.name.clone(), variable);
        true
    }

    fn lookup(&self, name: &CodePointString) -> Option<&VariableSymbol> {
        self.levels.iter().rev().find_map(|level| level.get(name))
    }

    /// Variables declared at the innermost level, in declaration order.
    fn declared_variables(&self) -> Vec<VariableSymbol> {
        self.levels
            .last()
            .map(|level| level.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// The bound result of one REPL submission, chained to its predecessors.
pub struct BoundGlobalScope {
    pub previous: Option<Rc<BoundGlobalScope>>,
    pub diagnostics: Vec<Diagnostic>,
    pub variables: Vec<VariableSymbol>,
    pub statement: BoundStatement,
}

// ── Binder ────────────────────────────────────────────────────────

/// Bind one submission against the accumulated session scope.
///
/// The previous-scope chain is chased to the root and each submission's
/// declared variables are replayed forward into a fresh scope level, so
/// earlier declarations are visible while earlier statements are not
/// re-bound.
pub fn bind_global_scope(
    previous: Option<Rc<BoundGlobalScope>>,
    unit: &CompilationUnit,
) -> BoundGlobalScope {
    let mut scope = BoundScope::new();
    replay_previous(&mut scope, previous.as_deref());
    scope.push();

    let mut binder = Binder {
        scope,
        diagnostics: Vec::new(),
    };
    let statement = binder.bind_statement(&unit.statement);

    BoundGlobalScope {
        previous,
        diagnostics: binder.diagnostics,
        variables: binder.scope.declared_variables(),
        statement,
    }
}

fn replay_previous(scope: &mut BoundScope, previous: Option<&BoundGlobalScope>) {
    let mut chain = Vec::new();
    let mut current = previous;
    while let Some(global) = current {
        chain.push(global);
        current = global.previous.as_deref();
    }

    // Root first, so later submissions shadow earlier ones.
    for global in chain.into_iter().rev() {
        scope.push();
        for variable in &global.variables {
            scope.declare(variable.clone());
        }
    }
}

struct Binder {
    scope: BoundScope,
    diagnostics: Vec<Diagnostic>,
}

impl Binder {
    fn bind_statement(&mut self, statement: &StatementNode) -> BoundStatement {
        match statement {
            StatementNode::Block(s) => {
                self.scope.push();
                let statements = s.statements.iter().map(|s| self.bind_statement(s)).collect();
                self.scope.pop();
                BoundStatement::Block(BoundBlockStatement { statements })
            }
            StatementNode::Expression(s) => {
                BoundStatement::Expression(BoundExpressionStatement {
                    expression: self.bind_expression(&s.expression),
                })
            }
            StatementNode::VariableDeclaration(s) => self.bind_variable_declaration(s),
            StatementNode::If(s) => self.bind_if_statement(s),
            StatementNode::While(s) => self.bind_while_statement(s),
            StatementNode::For(s) => self.bind_for_statement(s),
        }
    }

    fn bind_variable_declaration(&mut self, statement: &VariableDeclarationStatement) -> BoundStatement {
        let name = statement.identifier.text.clone();
        let is_read_only = statement.keyword.kind == SyntaxKind::ValKeyword;
        let initializer = self.bind_expression(&statement.initializer);
        let variable = VariableSymbol::new(name, is_read_only, initializer.ty());

        if !self.scope.declare(variable.clone()) {
            self.variable_already_declared(statement.identifier.span, &variable.name);
        }

        BoundStatement::VariableDeclaration(BoundVariableDeclarationStatement {
            variable,
            initializer,
        })
    }

    fn bind_if_statement(&mut self, statement: &IfStatement) -> BoundStatement {
        let condition = self.bind_expression_of_type(&statement.condition, TypeSymbol::BOOLEAN);
        let then_statement = Box::new(self.bind_statement(&statement.then_statement));
        let else_statement = statement
            .else_clause
            .as_ref()
            .map(|clause| Box::new(self.bind_statement(&clause.statement)));
        BoundStatement::If(BoundIfStatement {
            condition,
            then_statement,
            else_statement,
        })
    }

    fn bind_while_statement(&mut self, statement: &WhileStatement) -> BoundStatement {
        let condition = self.bind_expression_of_type(&statement.condition, TypeSymbol::BOOLEAN);
        let body = Box::new(self.bind_statement(&statement.body));
        BoundStatement::While(BoundWhileStatement { condition, body })
    }

    fn bind_for_statement(&mut self, statement: &ForStatement) -> BoundStatement {
        let lower_bound = self.bind_expression_of_type(&statement.lower_bound, TypeSymbol::INT);
        let upper_bound = self.bind_expression_of_type(&statement.upper_bound, TypeSymbol::INT);

        // The loop variable lives in its own scope level wrapping the body.
        self.scope.push();
        let variable =
            VariableSymbol::new(statement.variable.text.clone(), true, TypeSymbol::INT);
        if !self.scope.declare(variable.clone()) {
            self.variable_already_declared(statement.variable.span, &variable.name);
        }
        let body = Box::new(self.bind_statement(&statement.body));
        self.scope.pop();

        BoundStatement::For(BoundForStatement {
            variable,
            lower_bound,
            upper_bound,
            body,
        })
    }

    fn bind_expression_of_type(
        &mut self,
        expression: &ExpressionNode,
        target_type: TypeSymbol,
    ) -> BoundExpression {
        let result = self.bind_expression(expression);
        if result.ty() != target_type {
            self.cannot_convert(expression.span(), result.ty(), target_type);
        }
        result
    }

    fn bind_expression(&mut self, expression: &ExpressionNode) -> BoundExpression {
        match expression {
            ExpressionNode::Parenthesized(e) => self.bind_expression(&e.expression),
            ExpressionNode::Literal(e) => Self::bind_literal_expression(e),
            ExpressionNode::Unary(e) => self.bind_unary_expression(e),
            ExpressionNode::Binary(e) => self.bind_binary_expression(e),
            ExpressionNode::Name(e) => self.bind_name_expression(e),
            ExpressionNode::Assignment(e) => self.bind_assignment_expression(e),
        }
    }

    fn bind_literal_expression(expression: &LiteralExpression) -> BoundExpression {
        let token = &expression.literal;
        let ty = match token.kind {
            SyntaxKind::String => TypeSymbol::STRING,
            SyntaxKind::Number => TypeSymbol::INT,
            SyntaxKind::TrueKeyword | SyntaxKind::FalseKeyword => TypeSymbol::BOOLEAN,
            kind => unreachable!("no literal type for token kind {kind:?}"),
        };
        let value = token.value.clone().unwrap_or(Value::Int(0));
        BoundExpression::Literal(BoundLiteralExpression { value, ty })
    }

    fn bind_unary_expression(&mut self, expression: &UnaryExpression) -> BoundExpression {
        let operand = self.bind_expression(&expression.operand);
        match find_builtin_unary_operator(expression.operator.kind, operand.ty()) {
            Some(operator) => BoundExpression::Unary(BoundUnaryExpression {
                operator,
                operand: Box::new(operand),
            }),
            None => {
                // Error-tolerant: degenerate to the operand unchanged.
                self.unknown_unary_operator(&expression.operator, operand.ty());
                operand
            }
        }
    }

    fn bind_binary_expression(&mut self, expression: &BinaryExpression) -> BoundExpression {
        let left = self.bind_expression(&expression.left);
        let right = self.bind_expression(&expression.right);
        match find_builtin_binary_operator(expression.operator.kind, left.ty(), right.ty()) {
            Some(operator) => BoundExpression::Binary(BoundBinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            }),
            None => {
                self.unknown_binary_operator(&expression.operator, left.ty(), right.ty());
                left
            }
        }
    }

    fn bind_name_expression(&mut self, expression: &NameExpression) -> BoundExpression {
        let name = &expression.identifier.text;
        if name.is_empty() {
            // The token was synthesized by parser recovery; the parser has
            // already reported it.
            return BoundExpression::literal_int(0);
        }

        match self.scope.lookup(name) {
            Some(variable) => BoundExpression::Variable(BoundVariableExpression {
                variable: variable.clone(),
            }),
            None => {
                self.undefined_name(expression.identifier.span, name);
                BoundExpression::literal_int(0)
            }
        }
    }

    fn bind_assignment_expression(&mut self, expression: &AssignmentExpression) -> BoundExpression {
        let name = &expression.identifier.text;
        let bound = self.bind_expression(&expression.value);

        let Some(variable) = self.scope.lookup(name).cloned() else {
            self.undefined_name(expression.identifier.span, name);
            return BoundExpression::literal_int(0);
        };

        if variable.is_read_only {
            self.cannot_assign(expression.equals.span, name);
        }

        if variable.ty != bound.ty() {
            self.incompatible_assignment(expression.value.span(), variable.ty, bound.ty());
        }

        BoundExpression::Assignment(BoundAssignmentExpression {
            variable,
            expression: Box::new(bound),
        })
    }

    // ── Diagnostics ───────────────────────────────────────────────

    fn unknown_unary_operator(&mut self, operator: &Token, ty: TypeSymbol) {
        self.diagnostics.push(Diagnostic::binder(
            format!(
                "unary operator '{}' is not defined for type '{ty}'",
                operator.text
            ),
            operator.span,
        ));
    }

    fn unknown_binary_operator(&mut self, operator: &Token, left: TypeSymbol, right: TypeSymbol) {
        self.diagnostics.push(Diagnostic::binder(
            format!(
                "binary operator '{}' is not defined for types '{left}' and '{right}'",
                operator.text
            ),
            operator.span,
        ));
    }

    fn undefined_name(&mut self, span: TextSpan, name: &CodePointString) {
        self.diagnostics.push(Diagnostic::binder(
            format!("variable '{name}' is not defined"),
            span,
        ));
    }

    fn variable_already_declared(&mut self, span: TextSpan, name: &CodePointString) {
        self.diagnostics.push(Diagnostic::binder(
            format!("variable '{name}' has already been declared"),
            span,
        ));
    }

    fn cannot_assign(&mut self, span: TextSpan, name: &CodePointString) {
        self.diagnostics.push(Diagnostic::binder(
            format!("variable '{name}' is read-only and cannot be reassigned"),
            span,
        ));
    }

    fn incompatible_assignment(
        &mut self,
        span: TextSpan,
        variable_type: TypeSymbol,
        expression_type: TypeSymbol,
    ) {
        self.diagnostics.push(Diagnostic::binder(
            format!(
                "cannot assign expression of type '{expression_type}' to variable of type '{variable_type}'"
            ),
            span,
        ));
    }

    fn cannot_convert(&mut self, span: TextSpan, actual: TypeSymbol, expected: TypeSymbol) {
        self.diagnostics.push(Diagnostic::binder(
            format!("expected expression of type '{expected}' but got '{actual}'"),
            span,
        ));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::parser::SyntaxTree;

    fn bind(input: &str) -> BoundGlobalScope {
        let tree = SyntaxTree::parse(input);
        assert!(
            tree.diagnostics().is_empty(),
            "syntax diagnostics for {input:?}: {:?}",
            tree.diagnostics()
        );
        bind_global_scope(None, tree.root())
    }

    fn bind_messages(input: &str) -> Vec<String> {
        bind(input)
            .diagnostics
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn clean_program_has_no_diagnostics() {
        let scope = bind("{ var x = 1 x = x + 1 }");
        assert!(scope.diagnostics.is_empty());
    }

    #[test]
    fn undefined_name_reports_and_substitutes() {
        let messages = bind_messages("x * 10");
        assert_eq!(messages, vec!["variable 'x' is not defined"]);
    }

    #[test]
    fn redeclaration_in_same_scope_reports_once() {
        let messages = bind_messages("{ var x = 10 var y = 100 { var x = 10 } var x = 5 }");
        assert_eq!(messages, vec!["variable 'x' has already been declared"]);
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        let scope = bind("{ var x = 10 { var x = 5 } }");
        assert!(scope.diagnostics.is_empty());
    }

    #[test]
    fn readonly_reassignment_reports_at_equals_token() {
        let scope = bind("{ val x = 5 x = 10 }");
        assert_eq!(scope.diagnostics.len(), 1);
        let diagnostic = &scope.diagnostics[0];
        assert_eq!(
            diagnostic.message,
            "variable 'x' is read-only and cannot be reassigned"
        );
        // the `=` of `x = 10`
        assert_eq!(diagnostic.span, TextSpan::new(14, 1));
    }

    #[test]
    fn assignment_type_mismatch_reports() {
        let messages = bind_messages("{ var x = 5 x = true }");
        assert_eq!(
            messages,
            vec!["cannot assign expression of type 'boolean' to variable of type 'int'"]
        );
    }

    #[test]
    fn all_assignment_checks_fire_independently() {
        let messages = bind_messages("{ val x = 5 x = true }");
        assert_eq!(
            messages,
            vec![
                "variable 'x' is read-only and cannot be reassigned",
                "cannot assign expression of type 'boolean' to variable of type 'int'",
            ]
        );
    }

    #[test]
    fn unknown_unary_operator_reports() {
        let messages = bind_messages("+true");
        assert_eq!(
            messages,
            vec!["unary operator '+' is not defined for type 'boolean'"]
        );
    }

    #[test]
    fn unknown_binary_operator_reports() {
        let messages = bind_messages("1 && 2");
        assert_eq!(
            messages,
            vec!["binary operator '&&' is not defined for types 'int' and 'int'"]
        );
    }

    #[test]
    fn if_condition_must_be_boolean() {
        let messages = bind_messages("if 1 + 1 { }");
        assert_eq!(
            messages,
            vec!["expected expression of type 'boolean' but got 'int'"]
        );
    }

    #[test]
    fn while_condition_must_be_boolean() {
        let messages = bind_messages("while 10 { }");
        assert_eq!(
            messages,
            vec!["expected expression of type 'boolean' but got 'int'"]
        );
    }

    #[test]
    fn for_bounds_must_be_int() {
        let messages = bind_messages("for i = false to true i");
        assert_eq!(
            messages,
            vec![
                "expected expression of type 'int' but got 'boolean'",
                "expected expression of type 'int' but got 'boolean'",
            ]
        );
    }

    #[test]
    fn for_variable_is_read_only_in_body() {
        let messages = bind_messages("for i = 0 to 3 i = 5");
        assert_eq!(
            messages,
            vec!["variable 'i' is read-only and cannot be reassigned"]
        );
    }

    #[test]
    fn for_variable_does_not_leak() {
        let messages = bind_messages("{ for i = 0 to 3 i i }");
        assert_eq!(messages, vec!["variable 'i' is not defined"]);
    }

    #[test]
    fn mismatched_condition_stays_in_tree() {
        let scope = bind("if 1 { }");
        assert_eq!(scope.diagnostics.len(), 1);
        let BoundStatement::If(if_statement) = &scope.statement else {
            panic!("expected bound if statement");
        };
        assert_eq!(if_statement.condition.ty(), TypeSymbol::INT);
    }

    #[test]
    fn operators_resolve_to_table_singletons() {
        let scope = bind("1 + 2");
        let BoundStatement::Expression(s) = &scope.statement else {
            panic!("expected expression statement");
        };
        let BoundExpression::Binary(binary) = &s.expression else {
            panic!("expected binary expression");
        };
        assert!(std::ptr::eq(binary.operator, &BINARY_ADDITION_INT_INT));
    }

    #[test]
    fn string_concatenation_resolves() {
        let scope = bind("\"a\" + \"b\"");
        assert!(scope.diagnostics.is_empty());
        let BoundStatement::Expression(s) = &scope.statement else {
            panic!("expected expression statement");
        };
        assert_eq!(s.expression.ty(), TypeSymbol::STRING);
    }

    #[test]
    fn equality_is_defined_for_any_operand_types() {
        for input in ["1 == 2", "true != false", "\"a\" == \"b\"", "1 == true"] {
            let scope = bind(input);
            assert!(scope.diagnostics.is_empty(), "diagnostics for {input:?}");
        }
    }

    #[test]
    fn previous_submission_variables_are_visible() {
        let first = Rc::new(bind("var a = 10"));
        let tree = SyntaxTree::parse("a + 1");
        let second = bind_global_scope(Some(Rc::clone(&first)), tree.root());
        assert!(second.diagnostics.is_empty());
    }

    #[test]
    fn rebinding_across_submissions_creates_a_fresh_symbol() {
        let first = Rc::new(bind("var a = 10"));
        let tree = SyntaxTree::parse("var a = 20");
        let second = bind_global_scope(Some(Rc::clone(&first)), tree.root());
        // Re-declaring in a new submission is legal shadowing, and the new
        // symbol is distinct from the old one.
        assert!(second.diagnostics.is_empty());
        assert_ne!(first.variables[0].id(), second.variables[0].id());
    }

    #[test]
    fn chained_scopes_replay_transitively() {
        let first = Rc::new(bind("var a = 1"));
        let second_tree = SyntaxTree::parse("var b = a + 1");
        let second = Rc::new(bind_global_scope(Some(Rc::clone(&first)), second_tree.root()));
        let third_tree = SyntaxTree::parse("a + b");
        let third = bind_global_scope(Some(second), third_tree.root());
        assert!(third.diagnostics.is_empty());
    }
}
