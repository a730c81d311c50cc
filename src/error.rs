use crate::format::FileFormat;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::num::{ParseFloatError, ParseIntError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ApiError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),

    #[error("Failed to read signature file {path}")]
    #[diagnostic(
        code(api::io),
        help("Signature files must be readable UTF-8 text.")
    )]
    Io {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// A failure to parse a signature file.
///
/// Every variant points at the offending token and carries the file name and
/// 1-based line, so a batch run can report `file:line: message` without
/// rendering the full diagnostic.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("{file}:{line}: Unexpected end of file")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The file ended before the declaration was complete.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("File ended unexpectedly here")]
        span: SourceSpan,
        file: String,
        line: usize,
    },

    #[error("{file}:{line}: Expected {expected}, found `{found}`")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected} here")]
        span: SourceSpan,
        file: String,
        line: usize,
        expected: String,
        found: String,
    },

    #[error("{file}:{line}: Unterminated string literal starting at line {start_line}")]
    #[diagnostic(
        code(parser::unterminated_string),
        help("String literals must close on the line they start on.")
    )]
    UnterminatedString {
        #[source_code]
        src: NamedSource<String>,
        #[label("String starts here")]
        span: SourceSpan,
        file: String,
        line: usize,
        start_line: usize,
    },

    #[error("{file}:{line}: Unbalanced generic type starting at line {start_line}")]
    #[diagnostic(
        code(parser::unbalanced_generics),
        help("Every `<` in a type must be closed by a matching `>`.")
    )]
    UnbalancedGenerics {
        #[source_code]
        src: NamedSource<String>,
        #[label("Type starts here")]
        span: SourceSpan,
        file: String,
        line: usize,
        start_line: usize,
    },

    #[error("{file}:{line}: Duplicate class found: {name}")]
    #[diagnostic(
        code(parser::duplicate_class),
        help("A class may be declared only once across all merged signature files.")
    )]
    DuplicateClass {
        #[source_code]
        src: NamedSource<String>,
        #[label("Already declared")]
        span: SourceSpan,
        file: String,
        line: usize,
        name: String,
    },

    #[error("{file}:{line}: Contradicting declaration of package {name}. Previously seen with modifiers \"{existing}\", but now with \"{found}\"")]
    #[diagnostic(
        code(parser::contradicting_package),
        help("A package repeated across files must carry identical annotations.")
    )]
    ContradictingPackage {
        #[source_code]
        src: NamedSource<String>,
        #[label("Declared differently here")]
        span: SourceSpan,
        file: String,
        line: usize,
        name: String,
        existing: String,
        found: String,
    },

    #[error("{file}:{line}: Cannot merge different formats of signature files. First file format={first}, current file format={current}")]
    #[diagnostic(
        code(parser::format_mismatch),
        help("All merged signature files must start with the same format header.")
    )]
    FormatMismatch {
        #[source_code]
        src: NamedSource<String>,
        #[label("Format inferred from this line")]
        span: SourceSpan,
        file: String,
        line: usize,
        first: FileFormat,
        current: FileFormat,
    },

    #[error("{file}:{line}: Invalid {type_name} value `{value}`: {reason}")]
    #[diagnostic(code(parser::invalid_literal))]
    InvalidLiteral {
        #[source_code]
        src: NamedSource<String>,
        #[label("{reason}")]
        span: SourceSpan,
        file: String,
        line: usize,
        type_name: String,
        value: String,
        reason: LiteralError,
    },

    #[error("{file}:{line}: {reason}")]
    #[diagnostic(
        code(parser::nullability_syntax),
        help("Use a `// Signature format: 3.0` header or enable Kotlin-style nulls explicitly.")
    )]
    NullabilitySyntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("Nullability suffix used here")]
        span: SourceSpan,
        file: String,
        line: usize,
        reason: NullabilityError,
    },
}

impl ParserError {
    /// Name of the signature file the error was found in.
    pub fn file_name(&self) -> &str {
        match self {
            Self::UnexpectedEof { file, .. }
            | Self::UnexpectedToken { file, .. }
            | Self::UnterminatedString { file, .. }
            | Self::UnbalancedGenerics { file, .. }
            | Self::DuplicateClass { file, .. }
            | Self::ContradictingPackage { file, .. }
            | Self::FormatMismatch { file, .. }
            | Self::InvalidLiteral { file, .. }
            | Self::NullabilitySyntax { file, .. } => file,
        }
    }

    /// 1-based line of the offending token.
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedEof { line, .. }
            | Self::UnexpectedToken { line, .. }
            | Self::UnterminatedString { line, .. }
            | Self::UnbalancedGenerics { line, .. }
            | Self::DuplicateClass { line, .. }
            | Self::ContradictingPackage { line, .. }
            | Self::FormatMismatch { line, .. }
            | Self::InvalidLiteral { line, .. }
            | Self::NullabilitySyntax { line, .. } => *line,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Tokenizer failures. These carry raw positions only; the parser attaches
/// the file name and source text when lifting them into a [`ParserError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected end of file for \" starting at line {start_line}")]
    UnterminatedString {
        pos: usize,
        line: usize,
        start_line: usize,
    },

    #[error("Unexpected newline for \" starting at line {start_line}")]
    NewlineInString {
        pos: usize,
        line: usize,
        start_line: usize,
    },

    #[error("Unexpected end of file for generic type starting at line {start_line}")]
    UnbalancedGenerics {
        pos: usize,
        line: usize,
        start_line: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("not a valid integer ({0})")]
    Integer(#[from] ParseIntError),

    #[error("not a valid floating-point number ({0})")]
    Float(#[from] ParseFloatError),

    #[error("expected `true` or `false`")]
    Boolean,

    #[error("expected a double-quoted string literal")]
    UnquotedString,

    #[error("invalid escape sequence `\\{0}`")]
    Escape(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NullabilityError {
    #[error("Format does not support Kotlin-style null type syntax: {0}")]
    SuffixNotEnabled(String),
}
