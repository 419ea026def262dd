use crate::diagnostics::Diagnostic;
use crate::syntax::{keyword_kind, SyntaxKind, Token};
use crate::text::{CodePointString, SourceText, TextSpan};
use crate::value::Value;

/// Lex source text into tokens plus accumulated diagnostics.
///
/// The token sequence is always terminated by a zero-length end-of-file
/// token, and lexing never aborts: malformed input produces a diagnostic
/// and a best-effort token, advancing at least one code point.
pub fn lex(text: &SourceText) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(text).lex()
}

struct Lexer<'a> {
    text: &'a SourceText,
    index: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a SourceText) -> Self {
        Self {
            text,
            index: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn lex(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some(c) = self.peek() {
            match c {
                '"' => self.lex_string(),
                ' ' | '\t' | '\r' | '\n' => self.lex_whitespace(),
                c if c.is_ascii_digit() => self.lex_number(),
                c if c.is_whitespace() => self.lex_whitespace(),
                c if is_identifier_start(c) => self.lex_identifier(),
                _ => self.lex_operator(),
            }
        }

        self.tokens.push(Token::new(
            SyntaxKind::EndOfFile,
            TextSpan::new(self.index, 0),
            CodePointString::default(),
            None,
        ));

        (self.tokens, self.diagnostics)
    }

    fn peek(&self) -> Option<char> {
        self.text.get(self.index)
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.text.get(self.index + offset)
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    fn push(&mut self, kind: SyntaxKind, start: usize, value: Option<Value>) {
        let span = TextSpan::from_bounds(start, self.index);
        self.tokens
            .push(Token::new(kind, span, self.text.substring(span), value));
    }

    // ── Token classes ─────────────────────────────────────────────

    fn lex_string(&mut self) {
        let start = self.index;
        self.index += 1; // opening quote

        let mut value = String::new();
        let mut escaped = false;
        loop {
            let next = self.next();
            match next {
                None | Some('\n' | '\r') => {
                    let end = if next.is_none() { self.index } else { self.index - 1 };
                    self.diagnostics.push(Diagnostic::lexer(
                        "unterminated string literal",
                        TextSpan::from_bounds(start, end),
                    ));
                    break;
                }
                Some(c) if escaped => {
                    match escape_char(c) {
                        Some(e) => value.push(e),
                        None => self.diagnostics.push(Diagnostic::lexer(
                            format!("invalid escape sequence '\\{c}'"),
                            TextSpan::new(self.index - 2, 2),
                        )),
                    }
                    escaped = false;
                }
                Some('\\') => escaped = true,
                Some('"') => break,
                Some(c) => value.push(c),
            }
        }

        self.push(SyntaxKind::String, start, Some(Value::String(value)));
    }

    fn lex_whitespace(&mut self) {
        let start = self.index;
        while self.peek().is_some_and(char::is_whitespace) {
            self.index += 1;
        }
        self.push(SyntaxKind::Whitespace, start, None);
    }

    fn lex_number(&mut self) {
        let start = self.index;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.index += 1;
        }

        let text = self.text.substring(TextSpan::from_bounds(start, self.index));
        let value = match text.to_string().parse::<i32>() {
            Ok(value) => value,
            Err(_) => {
                self.diagnostics.push(Diagnostic::lexer(
                    format!("'{text}' is not a valid int"),
                    TextSpan::from_bounds(start, self.index),
                ));
                0
            }
        };
        self.push(SyntaxKind::Number, start, Some(Value::Int(value)));
    }

    fn lex_identifier(&mut self) {
        let start = self.index;
        while self.peek().is_some_and(is_identifier_part) {
            self.index += 1;
        }

        let text = self.text.substring(TextSpan::from_bounds(start, self.index));
        let (kind, value) = keyword_kind(&text.to_string())
            .unwrap_or((SyntaxKind::Identifier, None));
        self.push(kind, start, value);
    }

    fn lex_operator(&mut self) {
        let start = self.index;
        let c = self.next();

        let kind = match c {
            Some('+') => SyntaxKind::Plus,
            Some('-') => SyntaxKind::Minus,
            Some('*') => SyntaxKind::Star,
            Some('/') => SyntaxKind::Slash,
            Some('(') => SyntaxKind::OpenParen,
            Some(')') => SyntaxKind::CloseParen,
            Some('{') => SyntaxKind::OpenBrace,
            Some('}') => SyntaxKind::CloseBrace,
            Some('^') => SyntaxKind::Caret,
            Some('~') => SyntaxKind::Tilde,
            Some('<') => self.one_or_two('=', SyntaxKind::Less, SyntaxKind::LessOrEqual),
            Some('>') => self.one_or_two('=', SyntaxKind::Greater, SyntaxKind::GreaterOrEqual),
            Some('&') => self.one_or_two('&', SyntaxKind::Ampersand, SyntaxKind::AmpersandAmpersand),
            Some('|') => self.one_or_two('|', SyntaxKind::Pipe, SyntaxKind::PipePipe),
            Some('=') => self.one_or_two('=', SyntaxKind::Equals, SyntaxKind::EqualsEquals),
            Some('!') => self.one_or_two('=', SyntaxKind::Bang, SyntaxKind::BangEquals),
            other => {
                let got = other.map_or_else(|| "eof".to_owned(), |c| c.to_string());
                self.diagnostics.push(Diagnostic::lexer(
                    format!("unexpected character: expected operator but got {got}"),
                    TextSpan::new(start, 1),
                ));
                SyntaxKind::BadInput
            }
        };

        self.push(kind, start, None);
    }

    /// Two-character operator recognition via one-code-point lookahead.
    fn one_or_two(&mut self, second: char, one: SyntaxKind, two: SyntaxKind) -> SyntaxKind {
        if self.peek() == Some(second) {
            self.index += 1;
            two
        } else {
            one
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    is_identifier_part(c) || c.is_ascii_digit()
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn escape_char(c: char) -> Option<char> {
    match c {
        '"' => Some('"'),
        '\\' => Some('\\'),
        't' => Some('\t'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        _ => None,
    }
}
