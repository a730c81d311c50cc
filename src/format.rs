use serde::Serialize;
use std::fmt::{self, Display};

/// Version of the signature file format, inferred from the first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum FileFormat {
    #[default]
    Unknown,
    /// Headerless files that start straight with a `package` block.
    V1,
    V2,
    /// Adds the `?`/`!` nullability suffixes on types.
    V3,
}

impl FileFormat {
    pub const HEADER_PREFIX: &'static str = "// Signature format: ";

    /// Infers the format from the first line of a signature file.
    pub fn parse_header(contents: &str) -> FileFormat {
        let first_line = contents.lines().next().unwrap_or_default().trim();

        if let Some(version) = first_line.strip_prefix(Self::HEADER_PREFIX.trim_end()) {
            return match version.trim() {
                "1.0" => FileFormat::V1,
                "2.0" => FileFormat::V2,
                "3.0" => FileFormat::V3,
                _ => FileFormat::Unknown,
            };
        }
        if first_line == "package" || first_line.starts_with("package ") {
            return FileFormat::V1;
        }
        FileFormat::Unknown
    }

    pub fn version(&self) -> Option<&'static str> {
        match self {
            FileFormat::Unknown => None,
            FileFormat::V1 => Some("1.0"),
            FileFormat::V2 => Some("2.0"),
            FileFormat::V3 => Some("3.0"),
        }
    }

    /// The header line written at the top of files in this format, if any.
    pub fn header(&self) -> Option<String> {
        match self {
            FileFormat::V2 | FileFormat::V3 => {
                self.version().map(|v| format!("{}{v}", Self::HEADER_PREFIX))
            }
            FileFormat::Unknown | FileFormat::V1 => None,
        }
    }

    pub fn uses_kotlin_style_nulls(&self) -> bool {
        *self >= FileFormat::V3
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version() {
            Some(version) => write!(f, "v{version}"),
            None => write!(f, "unknown"),
        }
    }
}
