use crate::error::LexError;
use miette::SourceSpan;

/// Broad classification of a token. Signature files are matched on token
/// text, so this mostly tells separators apart from everything else.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    /// Represents the end of the input.
    Eof,
    /// One of `{ } , ; < >`, plus `( )` when parentheses are separators.
    Separator,
    /// A double-quoted string literal, quotes included.
    StringLiteral,
    /// Any other run: identifiers, keywords, type names (generics included),
    /// annotations, numeric literals.
    Word,
}

/// A token with its text and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ttype: TokenType,
    pub text: String,
    pub pos_start: usize,
    pub pos_end: usize,
    pub line: usize,
}

impl Token {
    pub fn new(ttype: TokenType, text: String, pos_start: usize, pos_end: usize, line: usize) -> Token {
        Token {
            ttype,
            text,
            pos_start,
            pos_end,
            line,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.ttype == TokenType::Eof
    }

    pub fn span(&self) -> SourceSpan {
        (self.pos_start, self.pos_end - self.pos_start).into()
    }
}

/// How the next token is scanned.
///
/// Most of the grammar uses [`ScanMode::DEFAULT`]. Field values keep
/// parentheses inside words so `(1.0f/0.0f)` stays whole, and default-value
/// capture reads verbatim so that whitespace survives into the captured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanMode {
    pub parens_are_separators: bool,
    pub skip_leading_whitespace: bool,
}

impl ScanMode {
    pub const DEFAULT: ScanMode = ScanMode {
        parens_are_separators: true,
        skip_leading_whitespace: true,
    };

    pub const PARENS_IN_WORDS: ScanMode = ScanMode {
        parens_are_separators: false,
        skip_leading_whitespace: true,
    };

    pub const VERBATIM: ScanMode = ScanMode {
        parens_are_separators: true,
        skip_leading_whitespace: false,
    };

    pub const VERBATIM_PARENS_IN_WORDS: ScanMode = ScanMode {
        parens_are_separators: false,
        skip_leading_whitespace: false,
    };
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::DEFAULT
    }
}

pub fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

pub fn is_separator(c: u8, parens_are_separators: bool) -> bool {
    match c {
        b'{' | b'}' | b',' | b';' | b'<' | b'>' => true,
        b'(' | b')' => parens_are_separators,
        _ => false,
    }
}

/// Whether a token may start a name: anything but a string literal or a
/// separator.
pub fn is_ident(text: &str) -> bool {
    match text.as_bytes().first() {
        Some(&c) => c != b'"' && !is_separator(c, true),
        None => false,
    }
}

/// On-demand tokenizer for signature text. Block comments must already have
/// been blanked out by the caller; `//` comments are skipped here.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
        }
    }

    /// Tokenizes the whole input in the default mode, ending with `Eof`.
    pub fn lex(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(ScanMode::DEFAULT)?;
            if token.is_eof() {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self, mode: ScanMode) -> Result<Token, LexError> {
        if mode.skip_leading_whitespace {
            self.skip_trivia();
        }

        let start = self.position;
        let start_line = self.line;
        let Some(c) = self.advance() else {
            return Ok(Token::new(TokenType::Eof, String::new(), start, start, start_line));
        };

        let ttype = match c {
            b'"' => {
                self.read_string(start_line)?;
                TokenType::StringLiteral
            }
            c if is_separator(c, mode.parens_are_separators) => TokenType::Separator,
            _ => {
                self.read_word(mode, start_line)?;
                TokenType::Word
            }
        };

        let text = self.input[start..self.position].to_string();
        Ok(Token::new(ttype, text, start, self.position, start_line))
    }

    /// Current absolute byte offset.
    pub fn offset(&self) -> usize {
        self.position
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Raw text between `offset` and the current position.
    pub fn slice_from(&self, offset: usize) -> &'a str {
        self.slice(offset, self.position)
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start.min(end)..end]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.position += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while self.skip_whitespace() || self.skip_line_comment() {}
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(is_space) {
            self.advance();
            skipped = true;
        }
        skipped
    }

    fn skip_line_comment(&mut self) -> bool {
        if !self.input.as_bytes()[self.position..].starts_with(b"//") {
            return false;
        }
        while self.peek().is_some_and(|c| c != b'\n' && c != b'\r') {
            self.advance();
        }
        true
    }

    /// Reads the rest of a string literal whose opening quote was consumed.
    /// One escape level: the character after `\` never closes the literal.
    fn read_string(&mut self, start_line: usize) -> Result<(), LexError> {
        let mut escaped = false;
        loop {
            let Some(c) = self.peek() else {
                return Err(LexError::UnterminatedString {
                    pos: self.position,
                    line: self.line,
                    start_line,
                });
            };
            if c == b'\n' || c == b'\r' {
                return Err(LexError::NewlineInString {
                    pos: self.position,
                    line: self.line,
                    start_line,
                });
            }
            self.advance();
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'"' {
                return Ok(());
            }
        }
    }

    /// Reads the rest of a word whose first character was consumed.
    ///
    /// Inside `<...>` the run continues across spaces and separators, so
    /// `Map<String, Integer>` comes out as one token. A `>` with no open `<`
    /// ends the run like any other separator.
    fn read_word(&mut self, mode: ScanMode, start_line: usize) -> Result<(), LexError> {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'<' => depth += 1,
                b'>' if depth > 0 => depth -= 1,
                b'"' => {
                    self.advance();
                    self.read_string(start_line)?;
                    continue;
                }
                c if depth == 0 && (is_space(c) || is_separator(c, mode.parens_are_separators)) => {
                    break
                }
                _ => {}
            }
            self.advance();
        }

        if depth > 0 {
            return Err(LexError::UnbalancedGenerics {
                pos: self.position,
                line: self.line,
                start_line,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tokens(input: &str, expected: Vec<&str>) {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.lex().unwrap();
        let texts: Vec<&str> = tokens
            .iter()
            .filter(|t| !t.is_eof())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_eof() {
        let mut lexer = Lexer::new("   // nothing here\n");
        let token = lexer.next_token(ScanMode::DEFAULT).unwrap();
        assert!(token.is_eof());
        assert_eq!(token.line, 2);
    }

    #[test]
    fn test_separators() {
        assert_tokens("{},;()", vec!["{", "}", ",", ";", "(", ")"]);
    }

    #[test]
    fn test_member_declaration() {
        assert_tokens(
            "method public int bar(int a, java.lang.String b);",
            vec![
                "method", "public", "int", "bar", "(", "int", "a", ",", "java.lang.String", "b",
                ")", ";",
            ],
        );
    }

    #[test]
    fn test_generic_run_spans_spaces_and_commas() {
        assert_tokens(
            "field public java.util.Map<java.lang.String, java.util.List<T>> map;",
            vec![
                "field",
                "public",
                "java.util.Map<java.lang.String, java.util.List<T>>",
                "map",
                ";",
            ],
        );
    }

    #[test]
    fn test_type_parameter_brackets_stand_alone() {
        assert_tokens(
            "<T extends java.lang.Comparable<T>> T",
            vec!["<", "T", "extends", "java.lang.Comparable<T>", ">", "T"],
        );
    }

    #[test]
    fn test_string_literal_is_one_token() {
        let mut lexer = Lexer::new(r#"= "a \"quoted\", {string}";"#);
        let tokens = lexer.lex().unwrap();
        assert_eq!(tokens[1].ttype, TokenType::StringLiteral);
        assert_eq!(tokens[1].text, r#""a \"quoted\", {string}""#);
        assert_eq!(tokens[2].text, ";");
    }

    #[test]
    fn test_parens_in_words() {
        let mut lexer = Lexer::new("(1.0f/0.0f);");
        let token = lexer.next_token(ScanMode::PARENS_IN_WORDS).unwrap();
        assert_eq!(token.text, "(1.0f/0.0f)");
        assert_eq!(token.ttype, TokenType::Word);
    }

    #[test]
    fn test_verbatim_keeps_whitespace() {
        let mut lexer = Lexer::new("42 , x");
        assert_eq!(lexer.next_token(ScanMode::VERBATIM).unwrap().text, "42");
        assert_eq!(lexer.next_token(ScanMode::VERBATIM).unwrap().text, " ");
        assert_eq!(lexer.next_token(ScanMode::VERBATIM).unwrap().text, ",");
        assert_eq!(lexer.next_token(ScanMode::VERBATIM).unwrap().text, " x");
    }

    #[test]
    fn test_line_comments_skipped() {
        assert_tokens(
            "// Signature format: 2.0\npackage p { // trailing\n}",
            vec!["package", "p", "{", "}"],
        );
    }

    #[test]
    fn test_lines_are_tracked() {
        let mut lexer = Lexer::new("package p {\n  class Foo {\n  }\n}");
        let tokens = lexer.lex().unwrap();
        let foo = tokens.iter().find(|t| t.text == "Foo").unwrap();
        assert_eq!(foo.line, 2);
        assert_eq!(tokens.last().unwrap().line, 4);
    }

    #[test]
    fn test_slice_from_offset() {
        let mut lexer = Lexer::new("@Foo(a = 1, b = \"x\") int");
        lexer.next_token(ScanMode::DEFAULT).unwrap();
        let open = lexer.next_token(ScanMode::DEFAULT).unwrap();
        while lexer.next_token(ScanMode::DEFAULT).unwrap().text != ")" {}
        assert_eq!(lexer.slice_from(open.pos_start), "(a = 1, b = \"x\")");
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"abc");
        assert!(matches!(
            lexer.next_token(ScanMode::DEFAULT),
            Err(LexError::UnterminatedString { start_line: 1, .. })
        ));
    }

    #[test]
    fn test_newline_in_string() {
        let mut lexer = Lexer::new("\n\"abc\ndef\"");
        assert!(matches!(
            lexer.next_token(ScanMode::DEFAULT),
            Err(LexError::NewlineInString { start_line: 2, .. })
        ));
    }

    #[test]
    fn test_unbalanced_generics() {
        let mut lexer = Lexer::new("java.util.List<String");
        assert!(matches!(
            lexer.next_token(ScanMode::DEFAULT),
            Err(LexError::UnbalancedGenerics { start_line: 1, .. })
        ));
    }
}
