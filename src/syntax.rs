//! Token kinds, syntax facts, and the syntax tree produced by the parser.

use crate::text::{CodePointString, TextSpan};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // Special
    BadInput,
    EndOfFile,
    Whitespace,

    // Literals & names
    Number,
    String,
    Identifier,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Tilde,
    Ampersand,
    AmpersandAmpersand,
    Pipe,
    PipePipe,
    Caret,
    Equals,
    EqualsEquals,
    BangEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,

    // Punctuation
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,

    // Keywords
    TrueKeyword,
    FalseKeyword,
    VarKeyword,
    ValKeyword,
    IfKeyword,
    ElseKeyword,
    WhileKeyword,
    ForKeyword,
    ToKeyword,
}

// ── Syntax facts ──────────────────────────────────────────────────

impl SyntaxKind {
    /// Every kind, for exhaustive table-driven tests.
    pub const ALL: &'static [SyntaxKind] = &[
        SyntaxKind::BadInput,
        SyntaxKind::EndOfFile,
        SyntaxKind::Whitespace,
        SyntaxKind::Number,
        SyntaxKind::String,
        SyntaxKind::Identifier,
        SyntaxKind::Plus,
        SyntaxKind::Minus,
        SyntaxKind::Star,
        SyntaxKind::Slash,
        SyntaxKind::Bang,
        SyntaxKind::Tilde,
        SyntaxKind::Ampersand,
        SyntaxKind::AmpersandAmpersand,
        SyntaxKind::Pipe,
        SyntaxKind::PipePipe,
        SyntaxKind::Caret,
        SyntaxKind::Equals,
        SyntaxKind::EqualsEquals,
        SyntaxKind::BangEquals,
        SyntaxKind::Less,
        SyntaxKind::LessOrEqual,
        SyntaxKind::Greater,
        SyntaxKind::GreaterOrEqual,
        SyntaxKind::OpenParen,
        SyntaxKind::CloseParen,
        SyntaxKind::OpenBrace,
        SyntaxKind::CloseBrace,
        SyntaxKind::TrueKeyword,
        SyntaxKind::FalseKeyword,
        SyntaxKind::VarKeyword,
        SyntaxKind::ValKeyword,
        SyntaxKind::IfKeyword,
        SyntaxKind::ElseKeyword,
        SyntaxKind::WhileKeyword,
        SyntaxKind::ForKeyword,
        SyntaxKind::ToKeyword,
    ];

    /// The fixed spelling of this kind, if it has one. Dynamic kinds
    /// (numbers, strings, identifiers, whitespace) return `None`.
    pub fn fixed_text(self) -> Option<&'static str> {
        match self {
            SyntaxKind::Plus => Some("+"),
            SyntaxKind::Minus => Some("-"),
            SyntaxKind::Star => Some("*"),
            SyntaxKind::Slash => Some("/"),
            SyntaxKind::Bang => Some("!"),
            SyntaxKind::Tilde => Some("~"),
            SyntaxKind::Ampersand => Some("&"),
            SyntaxKind::AmpersandAmpersand => Some("&&"),
            SyntaxKind::Pipe => Some("|"),
            SyntaxKind::PipePipe => Some("||"),
            SyntaxKind::Caret => Some("^"),
            SyntaxKind::Equals => Some("="),
            SyntaxKind::EqualsEquals => Some("=="),
            SyntaxKind::BangEquals => Some("!="),
            SyntaxKind::Less => Some("<"),
            SyntaxKind::LessOrEqual => Some("<="),
            SyntaxKind::Greater => Some(">"),
            SyntaxKind::GreaterOrEqual => Some(">="),
            SyntaxKind::OpenParen => Some("("),
            SyntaxKind::CloseParen => Some(")"),
            SyntaxKind::OpenBrace => Some("{"),
            SyntaxKind::CloseBrace => Some("}"),
            SyntaxKind::TrueKeyword => Some("true"),
            SyntaxKind::FalseKeyword => Some("false"),
            SyntaxKind::VarKeyword => Some("var"),
            SyntaxKind::ValKeyword => Some("val"),
            SyntaxKind::IfKeyword => Some("if"),
            SyntaxKind::ElseKeyword => Some("else"),
            SyntaxKind::WhileKeyword => Some("while"),
            SyntaxKind::ForKeyword => Some("for"),
            SyntaxKind::ToKeyword => Some("to"),
            _ => None,
        }
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
                | SyntaxKind::VarKeyword
                | SyntaxKind::ValKeyword
                | SyntaxKind::IfKeyword
                | SyntaxKind::ElseKeyword
                | SyntaxKind::WhileKeyword
                | SyntaxKind::ForKeyword
                | SyntaxKind::ToKeyword
        )
    }

    /// Unary operator precedence; higher binds tighter.
    pub fn unary_operator_precedence(self) -> Option<u8> {
        match self {
            SyntaxKind::Plus | SyntaxKind::Minus | SyntaxKind::Bang | SyntaxKind::Tilde => Some(13),
            _ => None,
        }
    }

    /// Binary operator precedence; higher binds tighter.
    pub fn binary_operator_precedence(self) -> Option<u8> {
        match self {
            SyntaxKind::Star | SyntaxKind::Slash => Some(12),
            SyntaxKind::Plus | SyntaxKind::Minus => Some(11),
            SyntaxKind::Less
            | SyntaxKind::LessOrEqual
            | SyntaxKind::Greater
            | SyntaxKind::GreaterOrEqual => Some(9),
            SyntaxKind::EqualsEquals | SyntaxKind::BangEquals => Some(8),
            SyntaxKind::Ampersand => Some(7),
            SyntaxKind::Caret => Some(6),
            SyntaxKind::Pipe => Some(5),
            SyntaxKind::AmpersandAmpersand => Some(4),
            SyntaxKind::PipePipe => Some(3),
            _ => None,
        }
    }
}

/// Keyword table lookup for a scanned identifier. Returns the keyword kind
/// and its literal payload (only `true`/`false` carry one).
pub fn keyword_kind(word: &str) -> Option<(SyntaxKind, Option<Value>)> {
    let kind = match word {
        "true" => return Some((SyntaxKind::TrueKeyword, Some(Value::Bool(true)))),
        "false" => return Some((SyntaxKind::FalseKeyword, Some(Value::Bool(false)))),
        "var" => SyntaxKind::VarKeyword,
        "val" => SyntaxKind::ValKeyword,
        "if" => SyntaxKind::IfKeyword,
        "else" => SyntaxKind::ElseKeyword,
        "while" => SyntaxKind::WhileKeyword,
        "for" => SyntaxKind::ForKeyword,
        "to" => SyntaxKind::ToKeyword,
        _ => return None,
    };
    Some((kind, None))
}

// ── Tokens ────────────────────────────────────────────────────────

/// A single lexed token. Leaf of the syntax tree; owns no children.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: TextSpan,
    pub text: CodePointString,
    pub value: Option<Value>,
}

impl Token {
    pub fn new(kind: SyntaxKind, span: TextSpan, text: CodePointString, value: Option<Value>) -> Self {
        Self {
            kind,
            span,
            text,
            value,
        }
    }
}

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ExpressionNode {
    Literal(LiteralExpression),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Parenthesized(ParenthesizedExpression),
    Name(NameExpression),
    Assignment(AssignmentExpression),
}

#[derive(Debug, Clone)]
pub struct LiteralExpression {
    pub literal: Token,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: Token,
    pub operand: Box<ExpressionNode>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub left: Box<ExpressionNode>,
    pub operator: Token,
    pub right: Box<ExpressionNode>,
}

#[derive(Debug, Clone)]
pub struct ParenthesizedExpression {
    pub open_paren: Token,
    pub expression: Box<ExpressionNode>,
    pub close_paren: Token,
}

#[derive(Debug, Clone)]
pub struct NameExpression {
    pub identifier: Token,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub identifier: Token,
    pub equals: Token,
    pub value: Box<ExpressionNode>,
}

impl ExpressionNode {
    /// Union of the first and last child spans.
    pub fn span(&self) -> TextSpan {
        match self {
            ExpressionNode::Literal(e) => e.literal.span,
            ExpressionNode::Unary(e) => {
                TextSpan::from_bounds(e.operator.span.start, e.operand.span().end())
            }
            ExpressionNode::Binary(e) => {
                TextSpan::from_bounds(e.left.span().start, e.right.span().end())
            }
            ExpressionNode::Parenthesized(e) => {
                TextSpan::from_bounds(e.open_paren.span.start, e.close_paren.span.end())
            }
            ExpressionNode::Name(e) => e.identifier.span,
            ExpressionNode::Assignment(e) => {
                TextSpan::from_bounds(e.identifier.span.start, e.value.span().end())
            }
        }
    }
}

// ── Statements ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum StatementNode {
    Block(BlockStatement),
    Expression(ExpressionStatement),
    VariableDeclaration(VariableDeclarationStatement),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub open_brace: Token,
    pub statements: Vec<StatementNode>,
    pub close_brace: Token,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expression: ExpressionNode,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarationStatement {
    pub keyword: Token,
    pub identifier: Token,
    pub equals: Token,
    pub initializer: ExpressionNode,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub keyword: Token,
    pub condition: ExpressionNode,
    pub then_statement: Box<StatementNode>,
    pub else_clause: Option<ElseClause>,
}

#[derive(Debug, Clone)]
pub struct ElseClause {
    pub keyword: Token,
    pub statement: Box<StatementNode>,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub keyword: Token,
    pub condition: ExpressionNode,
    pub body: Box<StatementNode>,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub keyword: Token,
    pub variable: Token,
    pub equals: Token,
    pub lower_bound: ExpressionNode,
    pub to_keyword: Token,
    pub upper_bound: ExpressionNode,
    pub body: Box<StatementNode>,
}

impl StatementNode {
    pub fn span(&self) -> TextSpan {
        match self {
            StatementNode::Block(s) => {
                TextSpan::from_bounds(s.open_brace.span.start, s.close_brace.span.end())
            }
            StatementNode::Expression(s) => s.expression.span(),
            StatementNode::VariableDeclaration(s) => {
                TextSpan::from_bounds(s.keyword.span.start, s.initializer.span().end())
            }
            StatementNode::If(s) => {
                let end = s
                    .else_clause
                    .as_ref()
                    .map_or_else(|| s.then_statement.span().end(), |e| e.statement.span().end());
                TextSpan::from_bounds(s.keyword.span.start, end)
            }
            StatementNode::While(s) => {
                TextSpan::from_bounds(s.keyword.span.start, s.body.span().end())
            }
            StatementNode::For(s) => {
                TextSpan::from_bounds(s.keyword.span.start, s.body.span().end())
            }
        }
    }
}

/// The root of a parsed submission.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub statement: StatementNode,
    pub end_of_file: Token,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_has_fixed_text() {
        for kind in SyntaxKind::ALL.iter().copied().filter(|k| k.is_keyword()) {
            assert!(kind.fixed_text().is_some(), "{kind:?} has no spelling");
        }
    }

    #[test]
    fn keyword_lookup_matches_fixed_text() {
        for kind in SyntaxKind::ALL.iter().copied().filter(|k| k.is_keyword()) {
            let text = kind.fixed_text().unwrap_or_default();
            let (looked_up, _) = keyword_kind(text).unwrap_or((SyntaxKind::BadInput, None));
            assert_eq!(looked_up, kind);
        }
    }

    #[test]
    fn unary_binds_tighter_than_any_binary() {
        let unary = SyntaxKind::Minus.unary_operator_precedence().unwrap_or(0);
        for kind in SyntaxKind::ALL {
            if let Some(binary) = kind.binary_operator_precedence() {
                assert!(unary > binary, "{kind:?} outbinds unary minus");
            }
        }
    }
}
