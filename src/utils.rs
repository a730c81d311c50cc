use crate::types::TypeParameterList;

/// Blanks out `/* ... */` comments, keeping every newline and the byte length
/// of the text so that offsets and line numbers still match the original.
/// `//` comments and string literals are left alone, so a `/*` inside either
/// does not open a block comment.
pub fn strip_block_comments(text: &str) -> String {
    if !text.contains("/*") {
        return text.to_string();
    }

    let mut bytes = text.as_bytes().to_vec();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && !matches!(bytes[i], b'"' | b'\n') {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = text[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |offset| i + 2 + offset + 2);
                for b in &mut bytes[i..end] {
                    if *b != b'\n' && *b != b'\r' {
                        *b = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn qualified_name(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

/// Splits a declared class name such as `Outer.Inner<T extends Foo>` into the
/// name and its type parameter list.
pub fn split_type_parameters(declared: &str) -> (&str, TypeParameterList) {
    match declared.find('<') {
        Some(index) => (&declared[..index], TypeParameterList::new(&declared[index..])),
        None => (declared, TypeParameterList::NONE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_block_comments_keeps_offsets() {
        let text = "package p {\n/* one\n two */ class Foo {\n}\n}";
        let stripped = strip_block_comments(text);
        assert_eq!(stripped.len(), text.len());
        assert_eq!(stripped.lines().count(), text.lines().count());
        assert!(!stripped.contains("one"));
        assert_eq!(stripped.find("class"), text.find("class"));
    }

    #[test]
    fn test_strip_block_comments_leaves_line_comments_and_strings() {
        let text = "// see /* here\nfield public String S = \"/* not a comment */\";";
        assert_eq!(strip_block_comments(text), text);
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        assert_eq!(strip_block_comments("a /* b\nc"), "a     \n ");
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("test.pkg", "Outer.Inner"), "test.pkg.Outer.Inner");
        assert_eq!(qualified_name("", "Foo"), "Foo");
    }

    #[test]
    fn test_split_type_parameters() {
        let (name, params) = split_type_parameters("Foo<T extends java.lang.Number>");
        assert_eq!(name, "Foo");
        assert_eq!(params.raw(), "<T extends java.lang.Number>");
        let (name, params) = split_type_parameters("Outer.Inner");
        assert_eq!(name, "Outer.Inner");
        assert!(params.is_empty());
    }
}
