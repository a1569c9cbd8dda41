use crate::frontend::token::{Keyword, Sym, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// Lexer for cinder source text.
///
/// Deliberately lenient: characters that start no token are skipped without
/// an error, and an unterminated string runs to end of input. The token
/// stream is produced once and consumed left to right.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    /// Does the input at the cursor start with `text`?
    fn looking_at(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, ch)| self.peek(i) == Some(ch))
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    pub fn tokenize(&mut self) -> Vec<Spanned> {
        let mut out = Vec::new();

        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
                continue;
            }

            // line comments
            if ch == '/' && self.peek(1) == Some('/') {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            let span = self.span();

            if ch == '"' || ch == '\'' {
                let token = self.read_string(ch);
                out.push(Spanned { token, span });
                continue;
            }

            if ch.is_ascii_digit() {
                let token = self.read_number();
                out.push(Spanned { token, span });
                continue;
            }

            if is_ident_start(ch) {
                let token = self.read_word();
                out.push(Spanned { token, span });
                continue;
            }

            // Longest match first: the 4-char host-escape marker, then the
            // 3- and 2-char composites, then single-char symbols.
            if self.looking_at("!!!!") {
                self.skip(4);
                out.push(Spanned {
                    token: Token::HostEscape,
                    span,
                });
                continue;
            }
            if let Some((text, sym)) = self.match_composite() {
                self.skip(text.len());
                out.push(Spanned {
                    token: Token::Sym(sym),
                    span,
                });
                continue;
            }
            if let Some(sym) = single_sym(ch) {
                self.advance();
                out.push(Spanned {
                    token: Token::Sym(sym),
                    span,
                });
                continue;
            }

            // Unrecognized character: skip silently.
            self.advance();
        }

        out
    }

    fn match_composite(&self) -> Option<(&'static str, Sym)> {
        const COMPOSITES: [(&str, Sym); 9] = [
            (">>>", Sym::UShr),
            ("==", Sym::EqEq),
            ("!=", Sym::NotEq),
            ("<=", Sym::LtEq),
            (">=", Sym::GtEq),
            ("<<", Sym::Shl),
            (">>", Sym::Shr),
            ("&&", Sym::AndAnd),
            ("||", Sym::OrOr),
        ];
        COMPOSITES
            .iter()
            .copied()
            .find(|(text, _)| self.looking_at(text))
    }

    fn read_string(&mut self, quote: char) -> Token {
        self.advance();
        let mut string = String::new();
        loop {
            match self.current() {
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('r') => string.push('\r'),
                        Some('0') => string.push('\0'),
                        Some(c) => string.push(c),
                        None => break,
                    }
                    self.advance();
                }
                Some(c) => {
                    string.push(c);
                    self.advance();
                }
                // unterminated string: take what we have
                None => break,
            }
        }
        Token::Str(string)
    }

    fn read_number(&mut self) -> Token {
        // hex: 0x... / 0X...
        if self.current() == Some('0') && matches!(self.peek(1), Some('x') | Some('X')) {
            self.skip(2);
            let mut value: u32 = 0;
            while let Some(c) = self.current() {
                if let Some(d) = c.to_digit(16) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    self.advance();
                } else {
                    break;
                }
            }
            return Token::Number(value as i32);
        }

        let mut value: u32 = 0;
        while let Some(c) = self.current() {
            if let Some(d) = c.to_digit(10) {
                value = value.wrapping_mul(10).wrapping_add(d);
                self.advance();
            } else {
                break;
            }
        }
        Token::Number(value as i32)
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if is_ident_char(c) {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match Keyword::from_ident(&word) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Ident(word),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn single_sym(ch: char) -> Option<Sym> {
    match ch {
        '+' => Some(Sym::Plus),
        '-' => Some(Sym::Minus),
        '*' => Some(Sym::Star),
        '/' => Some(Sym::Slash),
        '%' => Some(Sym::Percent),
        '^' => Some(Sym::Caret),
        '<' => Some(Sym::Lt),
        '>' => Some(Sym::Gt),
        '=' => Some(Sym::Assign),
        '&' => Some(Sym::Amp),
        '!' => Some(Sym::Bang),
        '(' => Some(Sym::LParen),
        ')' => Some(Sym::RParen),
        '[' => Some(Sym::LBracket),
        ']' => Some(Sym::RBracket),
        '{' => Some(Sym::LBrace),
        '}' => Some(Sym::RBrace),
        ';' => Some(Sym::Semi),
        ':' => Some(Sym::Colon),
        ',' => Some(Sym::Comma),
        '.' => Some(Sym::Dot),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_composites_are_greedy() {
        assert_eq!(lex(">>>"), vec![Token::Sym(Sym::UShr)]);
        assert_eq!(lex(">>"), vec![Token::Sym(Sym::Shr)]);
        assert_eq!(
            lex("a >= b"),
            vec![
                Token::Ident("a".to_string()),
                Token::Sym(Sym::GtEq),
                Token::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_host_escape_marker() {
        assert_eq!(
            lex("!!!!tick"),
            vec![Token::HostEscape, Token::Ident("tick".to_string())]
        );
        // fewer than four bangs is just Bang tokens (the first pair would
        // otherwise shadow the marker if matching were not longest-first)
        assert_eq!(
            lex("!!x"),
            vec![
                Token::Sym(Sym::Bang),
                Token::Sym(Sym::Bang),
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_unrecognized_chars_skipped_silently() {
        assert_eq!(
            lex("1 @ # 2"),
            vec![Token::Number(1), Token::Number(2)]
        );
    }

    #[test]
    fn test_line_comments() {
        assert_eq!(
            lex("1 // ignored >>> tokens\n2"),
            vec![Token::Number(1), Token::Number(2)]
        );
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            lex("let letx"),
            vec![
                Token::Keyword(Keyword::Let),
                Token::Ident("letx".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            lex(r#""a\nb""#),
            vec![Token::Str("a\nb".to_string())]
        );
        assert_eq!(lex(r#"'it\'s'"#), vec![Token::Str("it's".to_string())]);
    }

    #[test]
    fn test_hex_numbers() {
        assert_eq!(lex("0x20"), vec![Token::Number(0x20)]);
        assert_eq!(lex("0xFFFFFFFF"), vec![Token::Number(-1)]);
    }

    #[test]
    fn test_spans_track_lines() {
        let spanned = Lexer::new("1\n  2").tokenize();
        assert_eq!(spanned[0].span.line, 1);
        assert_eq!(spanned[1].span.line, 2);
        assert_eq!(spanned[1].span.col, 3);
    }
}
