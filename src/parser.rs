use crate::diagnostics::Diagnostic;
use crate::lexer;
use crate::syntax::{
    AssignmentExpression, BinaryExpression, BlockStatement, CompilationUnit, ElseClause,
    ExpressionNode, ExpressionStatement, ForStatement, IfStatement, LiteralExpression,
    NameExpression, ParenthesizedExpression, StatementNode, SyntaxKind, Token, UnaryExpression,
    VariableDeclarationStatement, WhileStatement,
};
use crate::text::{CodePointString, SourceText};

/// A parsed submission: source text, accumulated lexer+parser diagnostics,
/// and the root compilation unit.
pub struct SyntaxTree {
    text: SourceText,
    diagnostics: Vec<Diagnostic>,
    root: CompilationUnit,
    raw_tokens: Vec<Token>,
}

impl SyntaxTree {
    /// Single-call lex + parse.
    pub fn parse(text: &str) -> SyntaxTree {
        let text = SourceText::new(text);
        let (raw_tokens, lexer_diagnostics) = lexer::lex(&text);
        let tokens: Vec<Token> = raw_tokens
            .iter()
            .filter(|t| t.kind != SyntaxKind::Whitespace)
            .cloned()
            .collect();

        let mut parser = Parser {
            tokens,
            index: 0,
            diagnostics: lexer_diagnostics,
        };
        let root = parser.parse_compilation_unit();

        SyntaxTree {
            text,
            diagnostics: parser.diagnostics,
            root,
            raw_tokens,
        }
    }

    pub fn text(&self) -> &SourceText {
        &self.text
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn root(&self) -> &CompilationUnit {
        &self.root
    }

    /// The unfiltered token stream, whitespace included, for tooling that
    /// needs the original formatting.
    pub fn raw_tokens(&self) -> &[Token] {
        &self.raw_tokens
    }
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    // ── Helpers ───────────────────────────────────────────────────

    fn peek(&self, offset: usize) -> &Token {
        let index = self.index + offset;
        match self.tokens.get(index).or_else(|| self.tokens.last()) {
            Some(token) => token,
            // The lexer always terminates the stream with an eof token.
            None => unreachable!("token stream is never empty"),
        }
    }

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn next_token(&mut self) -> Token {
        let current = self.current().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        current
    }

    /// Consume a token of the expected kind, or report a diagnostic and
    /// synthesize one without consuming input. Synthesizing instead of
    /// skipping guarantees the parser always terminates on malformed input.
    fn match_token(&mut self, expected: SyntaxKind) -> Token {
        if self.current().kind == expected {
            return self.next_token();
        }

        let current = self.current().clone();
        self.diagnostics.push(Diagnostic::parser(
            format!("unexpected token <{:?}>, expected <{expected:?}>", current.kind),
            current.span,
        ));
        Token::new(expected, current.span, CodePointString::default(), None)
    }

    // ── Statements ────────────────────────────────────────────────

    fn parse_compilation_unit(&mut self) -> CompilationUnit {
        let statement = self.parse_statement();
        let end_of_file = self.match_token(SyntaxKind::EndOfFile);
        CompilationUnit {
            statement,
            end_of_file,
        }
    }

    fn parse_statement(&mut self) -> StatementNode {
        match self.current().kind {
            SyntaxKind::OpenBrace => self.parse_block_statement(),
            SyntaxKind::VarKeyword | SyntaxKind::ValKeyword => {
                self.parse_variable_declaration_statement()
            }
            SyntaxKind::IfKeyword => self.parse_if_statement(),
            SyntaxKind::WhileKeyword => self.parse_while_statement(),
            SyntaxKind::ForKeyword => self.parse_for_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block_statement(&mut self) -> StatementNode {
        let open_brace = self.match_token(SyntaxKind::OpenBrace);

        let mut statements = Vec::new();
        while self.current().kind != SyntaxKind::CloseBrace
            && self.current().kind != SyntaxKind::EndOfFile
        {
            let start_index = self.index;
            statements.push(self.parse_statement());

            // A statement made of nothing but synthesized tokens consumed no
            // input; skip one token so the loop can make progress.
            if self.index == start_index {
                self.next_token();
            }
        }

        let close_brace = self.match_token(SyntaxKind::CloseBrace);
        StatementNode::Block(BlockStatement {
            open_brace,
            statements,
            close_brace,
        })
    }

    fn parse_variable_declaration_statement(&mut self) -> StatementNode {
        let expected = if self.current().kind == SyntaxKind::VarKeyword {
            SyntaxKind::VarKeyword
        } else {
            SyntaxKind::ValKeyword
        };
        let keyword = self.match_token(expected);
        let identifier = self.match_token(SyntaxKind::Identifier);
        let equals = self.match_token(SyntaxKind::Equals);
        let initializer = self.parse_expression();
        StatementNode::VariableDeclaration(VariableDeclarationStatement {
            keyword,
            identifier,
            equals,
            initializer,
        })
    }

    fn parse_if_statement(&mut self) -> StatementNode {
        let keyword = self.match_token(SyntaxKind::IfKeyword);
        let condition = self.parse_expression();
        let then_statement = Box::new(self.parse_statement());
        let else_clause = (self.current().kind == SyntaxKind::ElseKeyword)
            .then(|| self.parse_else_clause());
        StatementNode::If(IfStatement {
            keyword,
            condition,
            then_statement,
            else_clause,
        })
    }

    fn parse_else_clause(&mut self) -> ElseClause {
        let keyword = self.match_token(SyntaxKind::ElseKeyword);
        let statement = Box::new(self.parse_statement());
        ElseClause { keyword, statement }
    }

    fn parse_while_statement(&mut self) -> StatementNode {
        let keyword = self.match_token(SyntaxKind::WhileKeyword);
        let condition = self.parse_expression();
        let body = Box::new(self.parse_statement());
        StatementNode::While(WhileStatement {
            keyword,
            condition,
            body,
        })
    }

    fn parse_for_statement(&mut self) -> StatementNode {
        let keyword = self.match_token(SyntaxKind::ForKeyword);
        let variable = self.match_token(SyntaxKind::Identifier);
        let equals = self.match_token(SyntaxKind::Equals);
        let lower_bound = self.parse_expression();
        let to_keyword = self.match_token(SyntaxKind::ToKeyword);
        let upper_bound = self.parse_expression();
        let body = Box::new(self.parse_statement());
        StatementNode::For(ForStatement {
            keyword,
            variable,
            equals,
            lower_bound,
            to_keyword,
            upper_bound,
            body,
        })
    }

    fn parse_expression_statement(&mut self) -> StatementNode {
        let expression = self.parse_expression();
        StatementNode::Expression(ExpressionStatement { expression })
    }

    // ── Expressions ───────────────────────────────────────────────

    fn parse_expression(&mut self) -> ExpressionNode {
        self.parse_assignment_expression()
    }

    /// Assignment binds loosest and is right-associative; it is only
    /// recognized when an identifier is directly followed by `=`.
    fn parse_assignment_expression(&mut self) -> ExpressionNode {
        if self.current().kind == SyntaxKind::Identifier
            && self.peek(1).kind == SyntaxKind::Equals
        {
            let identifier = self.next_token();
            let equals = self.next_token();
            let value = Box::new(self.parse_assignment_expression());
            return ExpressionNode::Assignment(AssignmentExpression {
                identifier,
                equals,
                value,
            });
        }

        self.parse_operator_expression(0)
    }

    /// Precedence climbing over the unary/binary operator tables.
    fn parse_operator_expression(&mut self, parent_precedence: u8) -> ExpressionNode {
        let mut left = match self.current().kind.unary_operator_precedence() {
            Some(precedence) if precedence >= parent_precedence => {
                let operator = self.next_token();
                let operand = Box::new(self.parse_operator_expression(precedence));
                ExpressionNode::Unary(UnaryExpression { operator, operand })
            }
            _ => self.parse_primary_expression(),
        };

        loop {
            let Some(precedence) = self.current().kind.binary_operator_precedence() else {
                break;
            };
            if precedence <= parent_precedence {
                break;
            }

            let operator = self.next_token();
            let right = Box::new(self.parse_operator_expression(precedence));
            left = ExpressionNode::Binary(BinaryExpression {
                left: Box::new(left),
                operator,
                right,
            });
        }

        left
    }

    fn parse_primary_expression(&mut self) -> ExpressionNode {
        match self.current().kind {
            SyntaxKind::TrueKeyword | SyntaxKind::FalseKeyword => {
                let literal = self.next_token();
                ExpressionNode::Literal(LiteralExpression { literal })
            }
            SyntaxKind::String => {
                let literal = self.match_token(SyntaxKind::String);
                ExpressionNode::Literal(LiteralExpression { literal })
            }
            SyntaxKind::Identifier => {
                let identifier = self.match_token(SyntaxKind::Identifier);
                ExpressionNode::Name(NameExpression { identifier })
            }
            SyntaxKind::OpenParen => {
                let open_paren = self.match_token(SyntaxKind::OpenParen);
                let expression = Box::new(self.parse_expression());
                let close_paren = self.match_token(SyntaxKind::CloseParen);
                ExpressionNode::Parenthesized(ParenthesizedExpression {
                    open_paren,
                    expression,
                    close_paren,
                })
            }
            // Number, and the default for anything unexpected: demanding a
            // number token reports the mismatch and synthesizes a literal.
            _ => {
                let literal = self.match_token(SyntaxKind::Number);
                ExpressionNode::Literal(LiteralExpression { literal })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn parse_expression(input: &str) -> (ExpressionNode, Vec<Diagnostic>) {
        let tree = SyntaxTree::parse(input);
        match tree.root.statement {
            StatementNode::Expression(s) => (s.expression, tree.diagnostics),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn literal_value(expression: &ExpressionNode) -> Value {
        match expression {
            ExpressionNode::Literal(l) => l.literal.value.clone().unwrap(),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (expression, diagnostics) = parse_expression("2 + 3 * 4");
        assert!(diagnostics.is_empty());

        let ExpressionNode::Binary(add) = expression else {
            panic!("expected binary expression");
        };
        assert_eq!(add.operator.kind, SyntaxKind::Plus);
        assert_eq!(literal_value(&add.left), Value::Int(2));

        let ExpressionNode::Binary(mul) = *add.right else {
            panic!("expected nested multiplication");
        };
        assert_eq!(mul.operator.kind, SyntaxKind::Star);
        assert_eq!(literal_value(&mul.left), Value::Int(3));
        assert_eq!(literal_value(&mul.right), Value::Int(4));
    }

    #[test]
    fn equal_precedence_is_left_associative() {
        let (expression, _) = parse_expression("1 - 2 + 3");
        let ExpressionNode::Binary(add) = expression else {
            panic!("expected binary expression");
        };
        assert_eq!(add.operator.kind, SyntaxKind::Plus);
        let ExpressionNode::Binary(sub) = *add.left else {
            panic!("expected nested subtraction");
        };
        assert_eq!(sub.operator.kind, SyntaxKind::Minus);
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let (expression, _) = parse_expression("-1 + 2");
        let ExpressionNode::Binary(add) = expression else {
            panic!("expected binary expression");
        };
        assert!(matches!(*add.left, ExpressionNode::Unary(_)));
    }

    #[test]
    fn logical_operators_bind_loosest() {
        let (expression, _) = parse_expression("a == b && c == d");
        let ExpressionNode::Binary(and) = expression else {
            panic!("expected binary expression");
        };
        assert_eq!(and.operator.kind, SyntaxKind::AmpersandAmpersand);
        assert!(matches!(*and.left, ExpressionNode::Binary(_)));
        assert!(matches!(*and.right, ExpressionNode::Binary(_)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let (expression, diagnostics) = parse_expression("a = b = 1");
        assert!(diagnostics.is_empty());
        let ExpressionNode::Assignment(outer) = expression else {
            panic!("expected assignment");
        };
        assert_eq!(outer.identifier.text.to_string(), "a");
        assert!(matches!(*outer.value, ExpressionNode::Assignment(_)));
    }

    #[test]
    fn assignment_needs_direct_equals_lookahead() {
        // `a == b` is a comparison, not an assignment
        let (expression, _) = parse_expression("a == b");
        assert!(matches!(expression, ExpressionNode::Binary(_)));
    }

    #[test]
    fn parses_if_else() {
        let tree = SyntaxTree::parse("if a == 0 a = 1 else a = 2");
        assert!(tree.diagnostics().is_empty());
        let StatementNode::If(if_statement) = &tree.root().statement else {
            panic!("expected if statement");
        };
        assert!(if_statement.else_clause.is_some());
    }

    #[test]
    fn parses_while() {
        let tree = SyntaxTree::parse("while i > 0 { i = i - 1 }");
        assert!(tree.diagnostics().is_empty());
        assert!(matches!(tree.root().statement, StatementNode::While(_)));
    }

    #[test]
    fn parses_for_with_bounds() {
        let tree = SyntaxTree::parse("for i = 0 to 10 result = result + i");
        assert!(tree.diagnostics().is_empty());
        let StatementNode::For(for_statement) = &tree.root().statement else {
            panic!("expected for statement");
        };
        assert_eq!(for_statement.variable.text.to_string(), "i");
        assert!(matches!(*for_statement.body, StatementNode::Expression(_)));
    }

    #[test]
    fn parses_nested_blocks() {
        let tree = SyntaxTree::parse("{ var a = 0 { var a = 10 } a }");
        assert!(tree.diagnostics().is_empty());
        let StatementNode::Block(block) = &tree.root().statement else {
            panic!("expected block");
        };
        assert_eq!(block.statements.len(), 3);
    }

    #[test]
    fn missing_operand_synthesizes_token() {
        let (expression, diagnostics) = parse_expression("1 +");
        assert_eq!(diagnostics.len(), 1);
        let ExpressionNode::Binary(add) = expression else {
            panic!("expected binary expression");
        };
        let ExpressionNode::Literal(right) = *add.right else {
            panic!("expected synthesized literal");
        };
        assert!(right.literal.text.is_empty());
        assert!(right.literal.value.is_none());
    }

    #[test]
    fn unclosed_block_stops_at_eof() {
        let tree = SyntaxTree::parse("{ var x = 1");
        assert!(!tree.diagnostics().is_empty());
        assert!(matches!(tree.root().statement, StatementNode::Block(_)));
    }

    #[test]
    fn parser_terminates_on_malformed_input() {
        // Each of these used to be able to wedge a naive recovery loop.
        for input in ["{ )", "(((", "{ var", ") ) )", "{ 1 + } }", "for = to"] {
            let tree = SyntaxTree::parse(input);
            assert!(
                !tree.diagnostics().is_empty(),
                "expected diagnostics for {input:?}"
            );
        }
    }

    #[test]
    fn whitespace_is_filtered_but_retained_in_raw_stream() {
        let tree = SyntaxTree::parse("1 + 2");
        assert!(tree
            .raw_tokens()
            .iter()
            .any(|t| t.kind == SyntaxKind::Whitespace));

        // Raw stream covers the input exactly, in order.
        let mut position = 0;
        for token in tree.raw_tokens() {
            assert_eq!(token.span.start, position);
            position = token.span.end();
        }
        assert_eq!(position, tree.text().len());
    }

    #[test]
    fn lexer_diagnostics_surface_on_the_tree() {
        let tree = SyntaxTree::parse("1 + $");
        assert!(!tree.diagnostics().is_empty());
    }
}
