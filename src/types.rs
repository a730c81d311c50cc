use crate::error::NullabilityError;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt::{self, Display};
use std::sync::Arc;

pub const NULLABLE_ANNOTATION: &str = "@androidx.annotation.Nullable";
pub const NON_NULL_ANNOTATION: &str = "@androidx.annotation.NonNull";

const VARARGS_SUFFIX: &str = "...";

pub fn is_primitive(type_name: &str) -> bool {
    matches!(
        type_name,
        "boolean" | "byte" | "char" | "double" | "float" | "int" | "long" | "short" | "void"
    )
}

/// Applies the nullability-suffix convention to a raw type token.
///
/// A trailing `...` is set aside first and put back on the result. With the
/// convention active, `Foo?` becomes `Foo` plus a nullable marker, `Foo!`
/// becomes `Foo` with no marker, and a bare non-primitive `Foo` gains a
/// non-null marker.
pub fn resolve_type_suffix(
    raw: &str,
    mut annotations: Vec<String>,
    kotlin_style_nulls: bool,
) -> Result<(String, Vec<String>), NullabilityError> {
    let (base, varargs) = match raw.strip_suffix(VARARGS_SUFFIX) {
        Some(base) => (base, true),
        None => (raw, false),
    };

    let base = if kotlin_style_nulls {
        if let Some(nullable) = base.strip_suffix('?') {
            push_marker(&mut annotations, NULLABLE_ANNOTATION);
            nullable
        } else if let Some(platform) = base.strip_suffix('!') {
            platform
        } else {
            if !is_primitive(base) {
                push_marker(&mut annotations, NON_NULL_ANNOTATION);
            }
            base
        }
    } else if base.ends_with('?') || base.ends_with('!') {
        return Err(NullabilityError::SuffixNotEnabled(raw.to_string()));
    } else {
        base
    };

    let mut type_string = base.to_string();
    if varargs {
        type_string.push_str(VARARGS_SUFFIX);
    }
    Ok((type_string, annotations))
}

fn push_marker(annotations: &mut Vec<String>, marker: &str) {
    if !annotations.iter().any(|a| a == marker) {
        annotations.push(marker.to_string());
    }
}

/// Removes generic arguments: `java.util.Map<K, V>[]` becomes `java.util.Map[]`.
pub fn erasure(type_string: &str) -> String {
    let mut erased = String::with_capacity(type_string.len());
    let mut depth = 0usize;
    for c in type_string.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => erased.push(c),
            _ => {}
        }
    }
    erased
}

/// Splits `text` on `separator` where it is not nested inside `<...>`.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// An interned type reference as written in the signature file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeItem(Arc<str>);

impl TypeItem {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_primitive(&self) -> bool {
        is_primitive(&self.0)
    }

    pub fn is_varargs(&self) -> bool {
        self.0.ends_with(VARARGS_SUFFIX)
    }

    pub fn erasure(&self) -> String {
        erasure(&self.0)
    }
}

impl Display for TypeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TypeItem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Shares one allocation per distinct type spelling across a codebase.
#[derive(Debug, Clone, Default)]
pub struct TypeInterner {
    types: HashSet<Arc<str>>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obtain(&mut self, type_string: &str) -> TypeItem {
        if let Some(existing) = self.types.get(type_string) {
            return TypeItem(Arc::clone(existing));
        }
        let interned: Arc<str> = Arc::from(type_string);
        self.types.insert(Arc::clone(&interned));
        TypeItem(interned)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// One entry of a type parameter list, e.g. `T extends java.lang.Number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeParameter {
    pub name: String,
    pub bounds: Vec<String>,
}

/// Bracketed type parameter text such as `<K, V extends java.lang.Comparable<V>>`.
/// An empty list is [`TypeParameterList::NONE`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TypeParameterList {
    raw: Option<String>,
}

impl TypeParameterList {
    pub const NONE: TypeParameterList = TypeParameterList { raw: None };

    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.trim().is_empty() {
            Self::NONE
        } else {
            Self { raw: Some(raw) }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    pub fn raw(&self) -> &str {
        self.raw.as_deref().unwrap_or_default()
    }

    pub fn parameters(&self) -> Vec<TypeParameter> {
        let Some(raw) = &self.raw else {
            return Vec::new();
        };
        let inner = raw.trim();
        let inner = inner.strip_prefix('<').unwrap_or(inner);
        let inner = inner.strip_suffix('>').unwrap_or(inner);

        split_top_level(inner, ',')
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|parameter| match parameter.split_once(" extends ") {
                Some((name, bounds)) => TypeParameter {
                    name: name.trim().to_string(),
                    bounds: split_top_level(bounds, '&')
                        .into_iter()
                        .map(|b| b.trim().to_string())
                        .collect(),
                },
                None => TypeParameter {
                    name: parameter.to_string(),
                    bounds: Vec::new(),
                },
            })
            .collect()
    }
}

impl Display for TypeParameterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(raw: &str, nulls: bool) -> Result<(String, Vec<String>), NullabilityError> {
        resolve_type_suffix(raw, Vec::new(), nulls)
    }

    #[test]
    fn test_nullable_suffix() {
        let (ty, annotations) = resolve("Foo?", true).unwrap();
        assert_eq!(ty, "Foo");
        assert_eq!(annotations, vec![NULLABLE_ANNOTATION]);
    }

    #[test]
    fn test_platform_suffix() {
        let (ty, annotations) = resolve("Foo!", true).unwrap();
        assert_eq!(ty, "Foo");
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_bare_type_is_non_null() {
        let (ty, annotations) = resolve("Foo", true).unwrap();
        assert_eq!(ty, "Foo");
        assert_eq!(annotations, vec![NON_NULL_ANNOTATION]);
    }

    #[test]
    fn test_primitives_get_no_marker() {
        for primitive in ["void", "int", "boolean"] {
            let (ty, annotations) = resolve(primitive, true).unwrap();
            assert_eq!(ty, primitive);
            assert!(annotations.is_empty());
        }
        let (_, annotations) = resolve("int[]", true).unwrap();
        assert_eq!(annotations, vec![NON_NULL_ANNOTATION]);
    }

    #[test]
    fn test_varargs_suffix_is_restored() {
        let (ty, annotations) = resolve("java.lang.String?...", true).unwrap();
        assert_eq!(ty, "java.lang.String...");
        assert_eq!(annotations, vec![NULLABLE_ANNOTATION]);
    }

    #[test]
    fn test_existing_annotations_are_extended() {
        let existing = vec!["@Deprecated".to_string()];
        let (_, annotations) = resolve_type_suffix("Foo?", existing, true).unwrap();
        assert_eq!(annotations, vec!["@Deprecated", NULLABLE_ANNOTATION]);
    }

    #[test]
    fn test_suffix_without_convention_fails() {
        assert_eq!(
            resolve("Foo?", false),
            Err(NullabilityError::SuffixNotEnabled("Foo?".to_string()))
        );
        assert!(resolve("Foo!", false).is_err());
        let (ty, annotations) = resolve("Foo", false).unwrap();
        assert_eq!(ty, "Foo");
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_erasure() {
        assert_eq!(erasure("java.util.Map<K, java.util.List<V>>[]"), "java.util.Map[]");
        assert_eq!(erasure("int"), "int");
    }

    #[test]
    fn test_interner_shares_allocations() {
        let mut interner = TypeInterner::new();
        let a = interner.obtain("java.lang.String");
        let b = interner.obtain("java.lang.String");
        assert!(Arc::ptr_eq(&a.0, &b.0));
        interner.obtain("int");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_type_parameters() {
        let list = TypeParameterList::new("<K, V extends java.lang.Comparable<V> & java.io.Serializable>");
        let parameters = list.parameters();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].name, "K");
        assert!(parameters[0].bounds.is_empty());
        assert_eq!(parameters[1].name, "V");
        assert_eq!(
            parameters[1].bounds,
            vec!["java.lang.Comparable<V>", "java.io.Serializable"]
        );
    }

    #[test]
    fn test_empty_type_parameters() {
        assert_eq!(TypeParameterList::new(""), TypeParameterList::NONE);
        assert!(TypeParameterList::NONE.parameters().is_empty());
        assert_eq!(TypeParameterList::NONE.raw(), "");
    }
}
