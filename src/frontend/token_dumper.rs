use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the surface text instead
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        for s in tokens {
            self.print_one(s);
        }
    }

    fn print_one(&self, s: &Spanned) {
        let line = s.span.line;
        let col = s.span.col;

        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            println!(
                "[{:02}:{:02}] {}{:<8} {:?}{}",
                line, col, colr, kind, s.token, reset
            );
        } else {
            println!(
                "[{:02}:{:02}] {}{:<8} {}{}",
                line, col, colr, kind, s.token, reset
            );
        }
    }

    fn kind(&self, t: &Token) -> &'static str {
        match t {
            Token::Number(_) => "NUM",
            Token::Str(_) => "STRING",
            Token::Ident(_) => "IDENT",
            Token::Keyword(_) => "KEYWORD",
            Token::HostEscape => "HOSTESC",
            Token::Sym(_) => "SYM",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        match t {
            Token::Str(_) => Self::GRN,
            Token::Number(_) => Self::CYN,
            Token::Ident(_) => Self::YEL,
            Token::HostEscape => Self::MAG,
            Token::Sym(_) => Self::MAG,
            Token::Keyword(_) => Self::RESET,
        }
    }
}
