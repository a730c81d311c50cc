use crate::error::{LexError, ParserError};
use crate::lexer::{is_ident, Lexer, ScanMode, Token, TokenType};
use crate::model::*;
use crate::types::{resolve_type_suffix, TypeParameterList};
use crate::utils::{qualified_name, split_type_parameters};
use crate::value::parse_value;
use log::trace;
use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

const MEMBER_KINDS: &str = "ctor, method, field, enum_constant or property";

/// A recursive descent parser for signature files. Tokens are pulled from the
/// lexer one at a time because some constructs (default values, field
/// literals) need a different scan mode than the rest of the grammar.
///
/// Declarations are written straight into the codebase; class references are
/// left as pending edges for the resolver.
pub struct Parser<'a, 'c> {
    source: Arc<NamedSource<String>>,
    file: String,
    lexer: Lexer<'a>,
    current: Token,
    codebase: &'c mut Codebase,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(source_text: &'a str, file_name: &str, codebase: &'c mut Codebase) -> Self {
        let source = Arc::new(NamedSource::new(file_name, source_text.to_string()));
        Self {
            source,
            file: file_name.to_string(),
            lexer: Lexer::new(source_text),
            current: Token::new(TokenType::Eof, String::new(), 0, 0, 1),
            codebase,
        }
    }

    // === Grammar ===

    /// File ::= { Package }
    pub fn parse_file(&mut self) -> Result<(), ParserError> {
        self.bump()?;
        while !self.current.is_eof() {
            self.parse_package()?;
        }
        Ok(())
    }

    /// Package ::= { Annotation } "package" { Annotation } Name "{" { Class } "}"
    fn parse_package(&mut self) -> Result<(), ParserError> {
        let mut annotations = self.parse_annotations()?;
        self.expect("package")?;
        annotations.extend(self.parse_annotations()?);
        let name_token = self.expect_ident("a package name")?;
        let name = name_token.text.clone();

        let mut modifiers = Modifiers::new(Visibility::Public);
        modifiers.add_annotations(annotations);

        match self.codebase.find_package(&name) {
            Some(existing) if existing.modifiers != modifiers => {
                return Err(ParserError::ContradictingPackage {
                    src: self.src(),
                    span: name_token.span(),
                    file: self.file.clone(),
                    line: name_token.line,
                    name,
                    existing: existing.modifiers.to_string(),
                    found: modifiers.to_string(),
                });
            }
            Some(_) => trace!("reopening package {name}"),
            None => {
                trace!("package {name}");
                let location = self.location(&name_token);
                self.codebase.add_package(Package {
                    name: name.clone(),
                    modifiers,
                    classes: Vec::new(),
                    location,
                });
            }
        }

        self.expect("{")?;
        while !self.check("}") {
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            self.parse_class(&name)?;
        }
        self.bump()
    }

    /// Annotation ::= "@" QualifiedName [ "(" Arguments ")" ]
    ///
    /// Arguments are kept verbatim, so `@Foo(a = 1)` comes back as written.
    fn parse_annotations(&mut self) -> Result<Vec<String>, ParserError> {
        let mut annotations = Vec::new();
        while self.at_annotation() {
            let mut annotation = self.current.text.clone();
            self.bump()?;
            if self.check("(") {
                let start = self.current.pos_start;
                let mut balance = 0usize;
                loop {
                    if self.current.is_eof() {
                        return Err(self.eof_error());
                    }
                    match self.current.text.as_str() {
                        "(" => balance += 1,
                        ")" => {
                            balance -= 1;
                            if balance == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    self.bump()?;
                }
                annotation.push_str(self.lexer.slice(start, self.current.pos_end));
                self.bump()?;
            }
            annotations.push(annotation);
        }
        Ok(annotations)
    }

    /// Modifiers ::= { Annotation | Visibility | Flag }
    ///
    /// Annotations may come before, between or after the keywords; all of
    /// them are kept in order of appearance.
    fn parse_modifiers(&mut self) -> Result<Modifiers, ParserError> {
        let mut modifiers = Modifiers::new(Visibility::PackagePrivate);
        while self.current.ttype == TokenType::Word {
            if self.at_annotation() {
                let annotations = self.parse_annotations()?;
                modifiers.add_annotations(annotations);
                continue;
            }
            let Some(keyword) = ModifierKeyword::lookup(&self.current.text) else {
                break;
            };
            modifiers.apply(keyword);
            self.bump()?;
        }
        Ok(modifiers)
    }

    /// Class ::= { Annotation } Modifiers Kind Name [ "extends" Name ]
    ///           [ ( "implements" | "extends" ) Name { [ "," ] Name } ]
    ///           "{" { Member } "}"
    fn parse_class(&mut self, package: &str) -> Result<(), ParserError> {
        let mut modifiers = self.parse_modifiers()?;

        let Some(kind) = ClassKind::from_keyword(&self.current.text) else {
            return self.err_unexpected("class, interface, @interface or enum");
        };
        let mut super_class = None;
        match kind {
            ClassKind::Class => {}
            ClassKind::Interface | ClassKind::AnnotationType => modifiers.set(Flag::Abstract, true),
            ClassKind::Enum => {
                modifiers.set(Flag::Final, true);
                modifiers.set(Flag::Static, true);
                super_class = Some(JAVA_LANG_ENUM.to_string());
            }
        }
        self.bump()?;

        let name_token = self.expect_ident("a class name")?;
        let (full_name, type_parameters) = split_type_parameters(&name_token.text);
        let qualified = qualified_name(package, full_name);
        if self.codebase.contains_class(&qualified) {
            return Err(ParserError::DuplicateClass {
                src: self.src(),
                span: name_token.span(),
                file: self.file.clone(),
                line: name_token.line,
                name: qualified,
            });
        }

        if self.check("extends") {
            self.bump()?;
            super_class = Some(self.expect_ident("a superclass name")?.text);
        }

        // Interfaces may list further super-interfaces after `extends X`
        // without repeating the keyword.
        let mut interfaces = Vec::new();
        let bare_list = kind == ClassKind::Interface && super_class.is_some() && !self.check("{");
        if bare_list || self.check("implements") || self.check("extends") {
            if self.check("implements") || self.check("extends") {
                self.bump()?;
            }
            while !self.check("{") {
                if self.current.is_eof() {
                    return Err(self.eof_error());
                }
                if !self.check(",") {
                    if !is_ident(&self.current.text) {
                        return self.err_unexpected("an interface name");
                    }
                    interfaces.push(self.current.text.clone());
                }
                self.bump()?;
            }
        }
        if kind == ClassKind::AnnotationType && !interfaces.iter().any(|i| i == JAVA_LANG_ANNOTATION) {
            interfaces.push(JAVA_LANG_ANNOTATION.to_string());
        }
        self.expect("{")?;

        trace!("class {qualified}");
        let simple_name = full_name.rsplit('.').next().unwrap_or(full_name).to_string();
        let class = ClassItem {
            id: ClassId(0),
            qualified_name: qualified,
            full_name: full_name.to_string(),
            simple_name,
            package: package.to_string(),
            kind,
            modifiers,
            type_parameters,
            super_class: super_class.clone().map(ClassRef::new),
            interfaces: interfaces.iter().map(|name| ClassRef::new(name.as_str())).collect(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            enum_constants: Vec::new(),
            properties: Vec::new(),
            is_enum: false,
            is_annotation_type: false,
            location: self.location(&name_token),
        };
        let id = self.codebase.add_class(class);
        if let Some(name) = super_class {
            self.codebase.add_pending_edge(id, EdgeSlot::Superclass, name);
        }
        for (index, name) in interfaces.into_iter().enumerate() {
            self.codebase.add_pending_edge(id, EdgeSlot::Interface(index), name);
        }

        while !self.check("}") {
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            self.parse_member(id)?;
        }
        self.bump()
    }

    /// Member ::= "ctor" Constructor | "method" Method | "field" Field
    ///          | "enum_constant" Field | "property" Property
    fn parse_member(&mut self, class: ClassId) -> Result<(), ParserError> {
        let tag = self.current.clone();
        self.bump()?;
        match tag.text.as_str() {
            "ctor" => self.parse_constructor(class),
            "method" => self.parse_method(class),
            "field" => self.parse_field(class, false),
            "enum_constant" => self.parse_field(class, true),
            "property" => self.parse_property(class),
            _ if tag.is_eof() => Err(self.eof_error()),
            _ => Err(self.unexpected_at(&tag, MEMBER_KINDS)),
        }
    }

    /// Constructor ::= { Annotation } Modifiers Name "(" Parameters [ Throws ] ";"
    fn parse_constructor(&mut self, class: ClassId) -> Result<(), ParserError> {
        let mut modifiers = self.parse_modifiers()?;

        // Nested class constructors are written `Outer.Inner`.
        let name_token = self.expect_ident("a constructor name")?;
        let name = name_token.text.rsplit('.').next().unwrap_or_default().to_string();

        self.expect("(")?;
        let parameters = self.parse_parameters()?;
        let throws = self.parse_throws()?;
        self.expect(";")?;

        let owner = self.codebase.class(class);
        let type_string = format!("{}{}", owner.qualified_name, owner.type_parameters);
        let return_type = self.codebase.obtain_type(&type_string);
        let method = MethodItem {
            name,
            containing_class: class,
            modifiers,
            return_type,
            type_parameters: TypeParameterList::NONE,
            is_varargs: parameters.iter().any(|p| p.is_varargs),
            parameters,
            throws: throws.iter().map(|name| ClassRef::new(name.as_str())).collect(),
            annotation_default: None,
            is_constructor: true,
            location: self.location(&name_token),
        };
        self.add_callable(class, method, throws);
        Ok(())
    }

    /// Method ::= { Annotation } Modifiers [ TypeParameters ] Type Name
    ///            "(" Parameters [ Throws ] [ "default" RawText ] ";"
    fn parse_method(&mut self, class: ClassId) -> Result<(), ParserError> {
        let mut modifiers = self.parse_modifiers()?;

        let type_parameters = if self.check("<") {
            self.parse_type_parameter_list()?
        } else {
            TypeParameterList::NONE
        };

        let type_token = self.current.clone();
        let raw_type = self.parse_type("a return type")?;
        let type_string = self.resolve_type(&raw_type, &mut modifiers, &type_token)?;

        let name_token = self.expect_ident("a method name")?;
        if self.codebase.class(class).is_interface()
            && !modifiers.has(Flag::Default)
            && !modifiers.is_static()
        {
            modifiers.set(Flag::Abstract, true);
        }

        self.expect("(")?;
        let parameters = self.parse_parameters()?;
        let throws = self.parse_throws()?;
        let annotation_default = if self.check("default") {
            Some(self.parse_annotation_default()?)
        } else {
            None
        };
        self.expect(";")?;

        let return_type = self.codebase.obtain_type(&type_string);
        let method = MethodItem {
            name: name_token.text.clone(),
            containing_class: class,
            modifiers,
            return_type,
            type_parameters,
            is_varargs: parameters.iter().any(|p| p.is_varargs),
            parameters,
            throws: throws.iter().map(|name| ClassRef::new(name.as_str())).collect(),
            annotation_default,
            is_constructor: false,
            location: self.location(&name_token),
        };
        self.add_callable(class, method, throws);
        Ok(())
    }

    /// TypeParameters ::= "<" ... ">", captured verbatim with nesting.
    fn parse_type_parameter_list(&mut self) -> Result<TypeParameterList, ParserError> {
        let start = self.current.pos_start;
        let mut balance = 1usize;
        while balance > 0 {
            self.bump()?;
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            match self.current.text.as_str() {
                "<" => balance += 1,
                ">" => balance -= 1,
                _ => {}
            }
        }
        let raw = self.lexer.slice(start, self.current.pos_end);
        self.bump()?;
        Ok(TypeParameterList::new(raw))
    }

    /// Type ::= TypeToken { TypeUseAnnotation | ArrayDimensions }
    ///
    /// Type-use annotations split a type over several tokens, as in
    /// `java.lang.@NonNull String` or `String @NonNull []`; they are joined
    /// back with single spaces.
    fn parse_type(&mut self, what: &str) -> Result<String, ParserError> {
        let mut type_string = self.expect_ident(what)?.text;
        if has_leading_annotation(&type_string) && self.current.ttype == TokenType::Word {
            type_string.push(' ');
            type_string.push_str(&self.current.text);
            self.bump()?;
        }
        while self.current.ttype == TokenType::Word && is_type_continuation(&self.current.text) {
            type_string.push(' ');
            type_string.push_str(&self.current.text);
            self.bump()?;
        }
        Ok(type_string)
    }

    /// Parameters ::= [ Parameter { "," Parameter } ] ")"
    /// Parameter ::= { Annotation } Modifiers Type [ Name ] [ "=" DefaultValue ]
    fn parse_parameters(&mut self) -> Result<Vec<ParameterItem>, ParserError> {
        let mut parameters = Vec::new();
        while !self.check(")") {
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            let index = parameters.len();
            let mut modifiers = self.parse_modifiers()?;

            let type_token = self.current.clone();
            let raw_type = self.parse_type("a parameter type")?;
            let type_string = self.resolve_type(&raw_type, &mut modifiers, &type_token)?;

            let is_varargs = type_string.ends_with("...");
            if is_varargs {
                modifiers.set(Flag::Vararg, true);
            }

            let public_name = if is_ident(&self.current.text) && !self.check("=") {
                let name = self.current.text.clone();
                self.bump()?;
                Some(name)
            } else {
                None
            };

            let default_value = if self.check("=") {
                Some(self.parse_default_value()?)
            } else {
                None
            };

            let parameter_type = self.codebase.obtain_type(&type_string);
            parameters.push(ParameterItem {
                index,
                name: public_name.clone().unwrap_or_else(|| format!("arg{}", index + 1)),
                public_name,
                parameter_type,
                modifiers,
                default_value,
                is_varargs,
            });

            match self.current.text.as_str() {
                "," => self.bump()?,
                ")" => {}
                _ => return self.err_unexpected("',' or ')'"),
            }
        }
        self.bump()?;
        Ok(parameters)
    }

    /// DefaultValue ::= "{" ... "}" | Expression
    ///
    /// The value is captured as source text. A braced block is taken through
    /// its matching `}`; anything else runs up to the next `,` or `)` that is
    /// not inside parentheses, with trailing whitespace trimmed. Parentheses
    /// inside string literals do not count.
    fn parse_default_value(&mut self) -> Result<String, ParserError> {
        self.bump()?;
        if self.current.is_eof() || self.check(",") || self.check(")") {
            return self.err_unexpected("a default value");
        }
        let start = self.current.pos_start;

        if self.check("{") {
            let mut balance = 0usize;
            loop {
                if self.current.is_eof() {
                    return Err(self.eof_error());
                }
                match self.current.text.as_str() {
                    "{" => balance += 1,
                    "}" => {
                        balance -= 1;
                        if balance == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                self.bump_with(ScanMode::VERBATIM_PARENS_IN_WORDS)?;
            }
            let value = self.lexer.slice(start, self.current.pos_end).to_string();
            self.bump()?;
            return Ok(value);
        }

        // `,` and `)` are always separate tokens here, so the boundary is
        // left as the current token for the parameter list.
        let mut balance = 0usize;
        loop {
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            if self.current.ttype == TokenType::Separator {
                match self.current.text.as_str() {
                    "(" => balance += 1,
                    ")" | "," if balance == 0 => break,
                    ")" => balance -= 1,
                    _ => {}
                }
            }
            self.bump_with(ScanMode::VERBATIM)?;
        }
        Ok(self.lexer.slice(start, self.current.pos_start).trim_end().to_string())
    }

    /// Throws ::= "throws" Name { "," Name }
    fn parse_throws(&mut self) -> Result<Vec<String>, ParserError> {
        let mut throws = Vec::new();
        if !self.check("throws") {
            return Ok(throws);
        }
        self.bump()?;
        loop {
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            if !is_ident(&self.current.text) {
                return self.err_unexpected("an exception class name");
            }
            throws.push(self.current.text.clone());
            self.bump()?;
            if !self.check(",") {
                break;
            }
            self.bump()?;
        }
        Ok(throws)
    }

    /// The text after `default` on an annotation method, up to the `;`.
    fn parse_annotation_default(&mut self) -> Result<String, ParserError> {
        let start = self.current.pos_end;
        self.bump()?;
        while !self.check(";") {
            if self.current.is_eof() {
                return Err(self.eof_error());
            }
            self.bump()?;
        }
        Ok(self.lexer.slice(start, self.current.pos_start).trim().to_string())
    }

    /// Field ::= { Annotation } Modifiers Type Name [ "=" Literal ] ";"
    fn parse_field(&mut self, class: ClassId, is_enum_constant: bool) -> Result<(), ParserError> {
        let mut modifiers = self.parse_modifiers()?;

        let type_token = self.current.clone();
        let raw_type = self.parse_type("a field type")?;
        let type_string = self.resolve_type(&raw_type, &mut modifiers, &type_token)?;

        let name_token = self.expect_ident("a field name")?;
        let value = if self.check("=") {
            self.bump_with(ScanMode::PARENS_IN_WORDS)?;
            let start = self.current.clone();
            let literal = self.read_literal()?;
            let value = parse_value(&type_string, &literal).map_err(|reason| {
                ParserError::InvalidLiteral {
                    src: self.src(),
                    span: SourceSpan::from((start.pos_start, self.current.pos_end - start.pos_start)),
                    file: self.file.clone(),
                    line: start.line,
                    type_name: type_string.clone(),
                    value: literal.clone(),
                    reason,
                }
            })?;
            self.bump()?;
            value
        } else {
            None
        };
        self.expect(";")?;

        let field = FieldItem {
            name: name_token.text.clone(),
            containing_class: class,
            modifiers,
            field_type: self.codebase.obtain_type(&type_string),
            value,
            is_enum_constant,
            location: self.location(&name_token),
        };
        let owner = self.codebase.class_mut(class);
        if is_enum_constant {
            owner.enum_constants.push(field);
        } else {
            owner.fields.push(field);
        }
        Ok(())
    }

    /// Reads a field literal. A value opening with `(` runs to the first
    /// token holding the matching `)`, so `(1.0f / 0.0f)` is read whole.
    fn read_literal(&mut self) -> Result<String, ParserError> {
        if self.current.is_eof() || self.check(";") {
            return self.err_unexpected("a value");
        }
        if self.current.text.starts_with('(') && !self.current.text.contains(')') {
            let start = self.current.pos_start;
            while !self.current.text.contains(')') {
                self.bump_with(ScanMode::PARENS_IN_WORDS)?;
                if self.current.is_eof() || self.check(";") {
                    return self.err_unexpected("')'");
                }
            }
            return Ok(self.lexer.slice(start, self.current.pos_end).to_string());
        }
        Ok(self.current.text.clone())
    }

    /// Property ::= { Annotation } Modifiers Type Name ";"
    fn parse_property(&mut self, class: ClassId) -> Result<(), ParserError> {
        let mut modifiers = self.parse_modifiers()?;

        let type_token = self.current.clone();
        let raw_type = self.parse_type("a property type")?;
        let type_string = self.resolve_type(&raw_type, &mut modifiers, &type_token)?;

        let name_token = self.expect_ident("a property name")?;
        self.expect(";")?;

        let property = PropertyItem {
            name: name_token.text.clone(),
            containing_class: class,
            modifiers,
            property_type: self.codebase.obtain_type(&type_string),
            location: self.location(&name_token),
        };
        self.codebase.class_mut(class).properties.push(property);
        Ok(())
    }

    // === Model helpers ===

    fn add_callable(&mut self, class: ClassId, method: MethodItem, throws: Vec<String>) {
        let owner = self.codebase.class(class);
        let member = if method.is_constructor {
            owner.constructors.len()
        } else {
            owner.methods.len()
        };
        for (index, name) in throws.into_iter().enumerate() {
            let slot = if method.is_constructor {
                EdgeSlot::ConstructorThrows { member, index }
            } else {
                EdgeSlot::MethodThrows { member, index }
            };
            self.codebase.add_pending_edge(class, slot, name);
        }

        let owner = self.codebase.class_mut(class);
        if method.is_constructor {
            owner.constructors.push(method);
        } else {
            owner.methods.push(method);
        }
    }

    /// Applies the nullability suffix of `raw`, adding any marker to
    /// `modifiers`.
    fn resolve_type(&self, raw: &str, modifiers: &mut Modifiers, at: &Token) -> Result<String, ParserError> {
        let annotations = std::mem::take(&mut modifiers.annotations);
        let (type_string, annotations) = resolve_type_suffix(raw, annotations, self.codebase.kotlin_style_nulls)
            .map_err(|reason| ParserError::NullabilitySyntax {
                src: self.src(),
                span: at.span(),
                file: self.file.clone(),
                line: at.line,
                reason,
            })?;
        modifiers.annotations = annotations;
        Ok(type_string)
    }

    fn location(&self, token: &Token) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: token.line,
        }
    }

    // === Tokenizer Helper Methods ===

    fn bump(&mut self) -> Result<(), ParserError> {
        self.bump_with(ScanMode::DEFAULT)
    }

    fn bump_with(&mut self, mode: ScanMode) -> Result<(), ParserError> {
        match self.lexer.next_token(mode) {
            Ok(token) => {
                self.current = token;
                Ok(())
            }
            Err(err) => Err(self.lex_error(err)),
        }
    }

    fn at_annotation(&self) -> bool {
        self.current.ttype == TokenType::Word
            && self.current.text.starts_with('@')
            && self.current.text != "@interface"
    }

    fn check(&self, text: &str) -> bool {
        !self.current.is_eof() && self.current.text == text
    }

    fn expect(&mut self, text: &str) -> Result<(), ParserError> {
        if self.check(text) {
            self.bump()
        } else {
            self.err_unexpected(&format!("'{text}'"))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Token, ParserError> {
        if !is_ident(&self.current.text) {
            return self.err_unexpected(what);
        }
        let token = self.current.clone();
        self.bump()?;
        Ok(token)
    }

    fn src(&self) -> NamedSource<String> {
        (*self.source).clone()
    }

    fn err_unexpected<T>(&self, expected: &str) -> Result<T, ParserError> {
        if self.current.is_eof() {
            return Err(self.eof_error());
        }
        Err(self.unexpected_at(&self.current, expected))
    }

    fn unexpected_at(&self, token: &Token, expected: &str) -> ParserError {
        ParserError::UnexpectedToken {
            src: self.src(),
            span: token.span(),
            file: self.file.clone(),
            line: token.line,
            expected: expected.to_string(),
            found: token.text.clone(),
        }
    }

    fn eof_error(&self) -> ParserError {
        ParserError::UnexpectedEof {
            src: self.src(),
            span: (self.current.pos_start, 0).into(),
            file: self.file.clone(),
            line: self.current.line,
        }
    }

    fn lex_error(&self, err: LexError) -> ParserError {
        let src = self.src();
        let file = self.file.clone();
        match err {
            LexError::UnterminatedString { pos, line, start_line }
            | LexError::NewlineInString { pos, line, start_line } => ParserError::UnterminatedString {
                src,
                span: (pos, 0).into(),
                file,
                line,
                start_line,
            },
            LexError::UnbalancedGenerics { pos, line, start_line } => ParserError::UnbalancedGenerics {
                src,
                span: (pos, 0).into(),
                file,
                line,
                start_line,
            },
        }
    }
}

/// `@NonNull`, or a qualified prefix ending in one such as `java.lang.@NonNull`.
fn has_leading_annotation(text: &str) -> bool {
    text.find('@')
        .is_some_and(|at| text.find('<').map_or(true, |lt| at < lt))
}

fn is_type_continuation(text: &str) -> bool {
    text.starts_with('[') || text.starts_with('@')
}
