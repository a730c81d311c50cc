use crate::error::{ApiError, ParserError};
use crate::format::FileFormat;
use crate::model::Codebase;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::utils::strip_block_comments;
use log::debug;
use miette::NamedSource;
use std::path::Path;
use std::sync::Arc;

/// One signature file handed to [`parse_api`]: its display name and full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSource {
    pub name: String,
    pub text: String,
}

impl SignatureSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads a signature file from disk, naming it after its path.
    ///
    /// # Errors
    /// Returns [`ApiError::Io`] if the file cannot be read as UTF-8 text.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ApiError::Io {
            path: name.clone(),
            source: Arc::new(source),
        })?;
        Ok(Self::new(name, text))
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// `Some(true)` turns the `?`/`!` nullability suffixes on regardless of
    /// the file header. Otherwise the first file's format decides.
    pub kotlin_style_nulls: Option<bool>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_kotlin_style_nulls(mut self, enabled: bool) -> Self {
        self.kotlin_style_nulls = Some(enabled);
        self
    }
}

/// Parses one or more signature files into a single finalized [`Codebase`].
///
/// Files are read in order. The first file fixes the format; every later
/// non-blank file must have the same one. Packages repeated across files are
/// merged, while a class declared twice is an error. Any failure aborts the
/// whole call.
///
/// # Errors
/// Returns the first [`ParserError`] encountered, wrapped in [`ApiError`].
pub fn parse_api(sources: &[SignatureSource], options: &ParseOptions) -> Result<Codebase, ApiError> {
    let location = sources.first().map(|s| s.name.as_str()).unwrap_or_default();
    let mut codebase = Codebase::new(location);
    codebase.description = format!(
        "Codebase loaded from {}",
        sources.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    for (index, source) in sources.iter().enumerate() {
        if index > 0 && source.is_blank() {
            debug!("skipping blank signature file {}", source.name);
            continue;
        }

        let format = FileFormat::parse_header(&source.text);
        if index == 0 {
            codebase.format = format;
            codebase.kotlin_style_nulls =
                options.kotlin_style_nulls == Some(true) || format.uses_kotlin_style_nulls();
        } else if format != codebase.format {
            return Err(format_mismatch(source, codebase.format, format).into());
        }

        debug!(
            "parsing {} (format {}, kotlin-style nulls {})",
            source.name, format, codebase.kotlin_style_nulls
        );
        let text = strip_block_comments(&source.text);
        Parser::new(&text, &source.name, &mut codebase).parse_file()?;
    }

    Resolver::new().finalize(&mut codebase);
    Ok(codebase)
}

/// Parses a single signature file with default options.
///
/// # Errors
/// Returns the first [`ParserError`] encountered, wrapped in [`ApiError`].
pub fn parse_signature(text: &str, file_name: &str) -> Result<Codebase, ApiError> {
    parse_api(&[SignatureSource::new(file_name, text)], &ParseOptions::default())
}

fn format_mismatch(source: &SignatureSource, first: FileFormat, current: FileFormat) -> ParserError {
    let header_len = source.text.lines().next().map_or(0, str::len);
    ParserError::FormatMismatch {
        src: NamedSource::new(&source.name, source.text.clone()),
        span: (0, header_len).into(),
        file: source.name.clone(),
        line: 1,
        first,
        current,
    }
}

impl Codebase {
    /// Renders the model as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Renders the model as YAML.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: &str = "// Signature format: 2.0\npackage p {\n  public class Foo {\n    method public int bar();\n  }\n}\n";

    #[test]
    fn test_single_file() {
        let codebase = parse_signature(FOO, "api.txt").unwrap();
        assert_eq!(codebase.location, "api.txt");
        assert_eq!(codebase.description, "Codebase loaded from api.txt");
        assert_eq!(codebase.format, FileFormat::V2);
        assert!(!codebase.kotlin_style_nulls);
        assert!(codebase.find_class("p.Foo").is_some());
    }

    #[test]
    fn test_empty_source_list() {
        let codebase = parse_api(&[], &ParseOptions::new()).unwrap();
        assert!(codebase.is_empty());
        assert_eq!(codebase.format, FileFormat::Unknown);
    }

    #[test]
    fn test_v3_header_enables_nullability() {
        let text = "// Signature format: 3.0\npackage p {\n  public class Foo {\n    method public String? get();\n  }\n}\n";
        let codebase = parse_signature(text, "api.txt").unwrap();
        assert!(codebase.kotlin_style_nulls);
    }

    #[test]
    fn test_option_forces_nullability() {
        let text = "package p {\n  public class Foo {\n    method public String? get();\n  }\n}\n";
        assert!(parse_signature(text, "api.txt").is_err());
        let options = ParseOptions::new().with_kotlin_style_nulls(true);
        let codebase = parse_api(&[SignatureSource::new("api.txt", text)], &options).unwrap();
        assert_eq!(codebase.format, FileFormat::V1);
        assert!(codebase.kotlin_style_nulls);
    }

    #[test]
    fn test_block_comments_are_ignored() {
        let text = "package p {\n  /* public class Hidden {\n  } */\n  public class Foo {\n    method public void /* odd */ run();\n  }\n}\n";
        let codebase = parse_signature(text, "api.txt").unwrap();
        assert!(codebase.find_class("p.Hidden").is_none());
        let run = codebase.find_class("p.Foo").unwrap().find_method("run").unwrap();
        assert_eq!(run.location.line, 5);
    }
}
