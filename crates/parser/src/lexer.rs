//! Hand-written lexer.
//!
//! Identifiers may contain dots (`i64.add`, `eth.getCaller`); `//` and
//! `/* */` comments are skipped; `:=` is one token, a lone `:` another.

use qir_data::Diagnostic;
use std::ops::Range;

pub type Span = Range<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    Arrow,
    Walrus,
    Identifier,
    Number,
    HexNumber,
    Function,
    Let,
    If,
    Switch,
    Case,
    Default,
    For,
    Break,
    Continue,
    Leave,
    True,
    False,
    Eof,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            LBrace => "`{`",
            RBrace => "`}`",
            LParen => "`(`",
            RParen => "`)`",
            Comma => "`,`",
            Colon => "`:`",
            Arrow => "`->`",
            Walrus => "`:=`",
            Identifier => "identifier",
            Number | HexNumber => "number",
            Function => "`function`",
            Let => "`let`",
            If => "`if`",
            Switch => "`switch`",
            Case => "`case`",
            Default => "`default`",
            For => "`for`",
            Break => "`break`",
            Continue => "`continue`",
            Leave => "`leave`",
            True => "`true`",
            False => "`false`",
            Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

fn keyword(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match text {
        "function" => Function,
        "let" => Let,
        "if" => If,
        "switch" => Switch,
        "case" => Case,
        "default" => Default,
        "for" => For,
        "break" => Break,
        "continue" => Continue,
        "leave" => Leave,
        "true" => True,
        "false" => False,
        _ => return None,
    })
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

/// Tokenize the whole source. The returned list always ends with `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(c) = source[pos..].chars().next() else { break };
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if source[pos..].starts_with("//") {
            pos = source[pos..].find('\n').map_or(source.len(), |offset| pos + offset + 1);
            continue;
        }
        if source[pos..].starts_with("/*") {
            match source[pos + 2..].find("*/") {
                Some(offset) => pos = pos + 2 + offset + 2,
                None => {
                    diagnostics.push(Diagnostic::spanned(
                        "unterminated block comment",
                        pos..source.len(),
                    ));
                    pos = source.len();
                }
            }
            continue;
        }

        let start = pos;
        let kind = match c {
            '{' => {
                pos += 1;
                TokenKind::LBrace
            }
            '}' => {
                pos += 1;
                TokenKind::RBrace
            }
            '(' => {
                pos += 1;
                TokenKind::LParen
            }
            ')' => {
                pos += 1;
                TokenKind::RParen
            }
            ',' => {
                pos += 1;
                TokenKind::Comma
            }
            '-' if source[pos..].starts_with("->") => {
                pos += 2;
                TokenKind::Arrow
            }
            ':' if source[pos..].starts_with(":=") => {
                pos += 2;
                TokenKind::Walrus
            }
            ':' => {
                pos += 1;
                TokenKind::Colon
            }
            '0' if source[pos..].starts_with("0x") || source[pos..].starts_with("0X") => {
                pos += 2;
                while pos < bytes.len() && (bytes[pos] as char).is_ascii_hexdigit() {
                    pos += 1;
                }
                TokenKind::HexNumber
            }
            c if c.is_ascii_digit() => {
                while pos < bytes.len() && (bytes[pos] as char).is_ascii_digit() {
                    pos += 1;
                }
                TokenKind::Number
            }
            c if is_identifier_start(c) => {
                while pos < bytes.len() && is_identifier_continue(bytes[pos] as char) {
                    pos += 1;
                }
                keyword(&source[start..pos]).unwrap_or(TokenKind::Identifier)
            }
            other => {
                diagnostics.push(Diagnostic::spanned(
                    format!("unexpected character {other:?}"),
                    pos..pos + other.len_utf8(),
                ));
                pos += other.len_utf8();
                continue;
            }
        };
        tokens.push(Token { kind, span: start..pos });
    }

    tokens.push(Token { kind: TokenKind::Eof, span: source.len()..source.len() });
    if diagnostics.is_empty() { Ok(tokens) } else { Err(diagnostics) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn dotted_identifiers_are_one_token() {
        use TokenKind::*;
        assert_eq!(
            kinds("i64.add(x, 1:i32)"),
            vec![Identifier, LParen, Identifier, Comma, Number, Colon, Identifier, RParen, Eof]
        );
    }

    #[test]
    fn walrus_and_colon_are_distinct() {
        use TokenKind::*;
        assert_eq!(kinds("x := y"), vec![Identifier, Walrus, Identifier, Eof]);
        assert_eq!(kinds("x:i32"), vec![Identifier, Colon, Identifier, Eof]);
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("// line\nlet /* inline */ x"), vec![Let, Identifier, Eof]);
    }

    #[test]
    fn return_is_an_identifier() {
        // The polyfill defines functions named `return` and `byte`; neither is
        // a keyword of the language.
        assert_eq!(kinds("return"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn unterminated_comment_reports() {
        let errs = tokenize("/* oops").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("unterminated"));
    }
}
