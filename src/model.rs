use crate::format::FileFormat;
use crate::types::{TypeInterner, TypeItem, TypeParameterList};
use crate::value::ConstantValue;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Display};

pub const JAVA_LANG_ENUM: &str = "java.lang.Enum";
pub const JAVA_LANG_ANNOTATION: &str = "java.lang.annotation.Annotation";

/// Index of a class inside its [`Codebase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    #[default]
    PackagePrivate,
    Private,
}

impl Visibility {
    /// The keyword spelling, empty for package-private.
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Internal => "internal",
            Visibility::PackagePrivate => "",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Static,
    Final,
    Abstract,
    Deprecated,
    Transient,
    Volatile,
    Sealed,
    Default,
    Synchronized,
    Native,
    StrictFp,
    Infix,
    Operator,
    Inline,
    Suspend,
    Vararg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKeyword {
    Visibility(Visibility),
    Flag(Flag),
}

const MODIFIER_KEYWORDS: &[(&str, ModifierKeyword)] = &[
    ("public", ModifierKeyword::Visibility(Visibility::Public)),
    ("protected", ModifierKeyword::Visibility(Visibility::Protected)),
    ("private", ModifierKeyword::Visibility(Visibility::Private)),
    ("internal", ModifierKeyword::Visibility(Visibility::Internal)),
    ("static", ModifierKeyword::Flag(Flag::Static)),
    ("final", ModifierKeyword::Flag(Flag::Final)),
    ("deprecated", ModifierKeyword::Flag(Flag::Deprecated)),
    ("abstract", ModifierKeyword::Flag(Flag::Abstract)),
    ("transient", ModifierKeyword::Flag(Flag::Transient)),
    ("volatile", ModifierKeyword::Flag(Flag::Volatile)),
    ("sealed", ModifierKeyword::Flag(Flag::Sealed)),
    ("default", ModifierKeyword::Flag(Flag::Default)),
    ("synchronized", ModifierKeyword::Flag(Flag::Synchronized)),
    ("native", ModifierKeyword::Flag(Flag::Native)),
    ("strictfp", ModifierKeyword::Flag(Flag::StrictFp)),
    ("infix", ModifierKeyword::Flag(Flag::Infix)),
    ("operator", ModifierKeyword::Flag(Flag::Operator)),
    ("inline", ModifierKeyword::Flag(Flag::Inline)),
    ("suspend", ModifierKeyword::Flag(Flag::Suspend)),
    ("vararg", ModifierKeyword::Flag(Flag::Vararg)),
];

impl ModifierKeyword {
    pub fn lookup(word: &str) -> Option<ModifierKeyword> {
        MODIFIER_KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, modifier)| *modifier)
    }
}

impl Flag {
    pub fn keyword(self) -> &'static str {
        MODIFIER_KEYWORDS
            .iter()
            .find(|(_, modifier)| *modifier == ModifierKeyword::Flag(self))
            .map(|(keyword, _)| *keyword)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub flags: BTreeSet<Flag>,
    pub annotations: Vec<String>,
}

impl Modifiers {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, keyword: ModifierKeyword) {
        match keyword {
            ModifierKeyword::Visibility(visibility) => self.visibility = visibility,
            ModifierKeyword::Flag(flag) => self.set(flag, true),
        }
    }

    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn set(&mut self, flag: Flag, on: bool) {
        if on {
            self.flags.insert(flag);
        } else {
            self.flags.remove(&flag);
        }
    }

    pub fn add_annotations(&mut self, annotations: impl IntoIterator<Item = String>) {
        self.annotations.extend(annotations);
    }

    pub fn is_static(&self) -> bool {
        self.has(Flag::Static)
    }

    pub fn is_final(&self) -> bool {
        self.has(Flag::Final)
    }

    pub fn is_abstract(&self) -> bool {
        self.has(Flag::Abstract)
    }

    pub fn is_deprecated(&self) -> bool {
        self.has(Flag::Deprecated)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a == name)
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = self
            .annotations
            .iter()
            .map(String::as_str)
            .chain(Some(self.visibility.keyword()))
            .chain(self.flags.iter().map(|flag| flag.keyword()))
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();
        write!(f, "{}", words.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    AnnotationType,
}

impl ClassKind {
    pub fn from_keyword(word: &str) -> Option<ClassKind> {
        match word {
            "class" => Some(ClassKind::Class),
            "interface" => Some(ClassKind::Interface),
            "enum" => Some(ClassKind::Enum),
            "@interface" => Some(ClassKind::AnnotationType),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Enum => "enum",
            ClassKind::AnnotationType => "@interface",
        }
    }
}

/// A reference to another class by name, filled in with the target once the
/// codebase is finalized. Names that stay unresolved belong to types outside
/// the parsed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRef {
    pub name: String,
    pub resolved: Option<ClassId>,
}

impl ClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: None,
        }
    }
}

/// Where a pending class reference must be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSlot {
    Superclass,
    Interface(usize),
    ConstructorThrows { member: usize, index: usize },
    MethodThrows { member: usize, index: usize },
}

/// A class reference recorded at parse time and resolved in finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdge {
    pub owner: ClassId,
    pub slot: EdgeSlot,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub name: String,
    pub modifiers: Modifiers,
    pub classes: Vec<ClassId>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassItem {
    pub id: ClassId,
    pub qualified_name: String,
    /// Name without the package, enclosing classes included (`Outer.Inner`).
    pub full_name: String,
    pub simple_name: String,
    pub package: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub type_parameters: TypeParameterList,
    pub super_class: Option<ClassRef>,
    pub interfaces: Vec<ClassRef>,
    pub constructors: Vec<MethodItem>,
    pub methods: Vec<MethodItem>,
    pub fields: Vec<FieldItem>,
    pub enum_constants: Vec<FieldItem>,
    pub properties: Vec<PropertyItem>,
    pub is_enum: bool,
    pub is_annotation_type: bool,
    pub location: SourceLocation,
}

impl ClassItem {
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, ClassKind::Interface | ClassKind::AnnotationType)
    }

    /// Whether this class is declared inside another class.
    pub fn is_nested(&self) -> bool {
        self.full_name.contains('.')
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.super_class.as_ref().map(|s| s.name.as_str())
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(|i| i.name.as_str())
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodItem> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldItem> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_enum_constant(&self, name: &str) -> Option<&FieldItem> {
        self.enum_constants.iter().find(|f| f.name == name)
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyItem> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn member_count(&self) -> usize {
        self.constructors.len()
            + self.methods.len()
            + self.fields.len()
            + self.enum_constants.len()
            + self.properties.len()
    }
}

/// A constructor or method.
#[derive(Debug, Clone, Serialize)]
pub struct MethodItem {
    pub name: String,
    pub containing_class: ClassId,
    pub modifiers: Modifiers,
    /// For constructors, the type of the containing class.
    pub return_type: TypeItem,
    pub type_parameters: TypeParameterList,
    pub parameters: Vec<ParameterItem>,
    pub throws: Vec<ClassRef>,
    /// Raw text of a `default` clause on an annotation-type method.
    pub annotation_default: Option<String>,
    pub is_constructor: bool,
    pub is_varargs: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterItem {
    pub index: usize,
    /// Declared name, or `argN` (1-based) when the file omits it.
    pub name: String,
    pub public_name: Option<String>,
    pub parameter_type: TypeItem,
    pub modifiers: Modifiers,
    pub default_value: Option<String>,
    pub is_varargs: bool,
}

impl ParameterItem {
    pub fn has_declared_name(&self) -> bool {
        self.public_name.is_some()
    }
}

/// A field or an enum constant.
#[derive(Debug, Clone, Serialize)]
pub struct FieldItem {
    pub name: String,
    pub containing_class: ClassId,
    pub modifiers: Modifiers,
    pub field_type: TypeItem,
    pub value: Option<ConstantValue>,
    pub is_enum_constant: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyItem {
    pub name: String,
    pub containing_class: ClassId,
    pub modifiers: Modifiers,
    pub property_type: TypeItem,
    pub location: SourceLocation,
}

/// The model built from one or more signature files.
#[derive(Debug, Clone, Serialize)]
pub struct Codebase {
    /// Name of the first input.
    pub location: String,
    pub description: String,
    pub format: FileFormat,
    pub kotlin_style_nulls: bool,
    packages: BTreeMap<String, Package>,
    classes: Vec<ClassItem>,
    #[serde(skip)]
    class_index: HashMap<String, ClassId>,
    #[serde(skip)]
    pending_edges: Vec<PendingEdge>,
    #[serde(skip)]
    types: TypeInterner,
}

impl Codebase {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            description: String::new(),
            format: FileFormat::Unknown,
            kotlin_style_nulls: false,
            packages: BTreeMap::new(),
            classes: Vec::new(),
            class_index: HashMap::new(),
            pending_edges: Vec::new(),
            types: TypeInterner::new(),
        }
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn find_package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// All classes in declaration order.
    pub fn classes(&self) -> &[ClassItem] {
        &self.classes
    }

    pub fn class(&self, id: ClassId) -> &ClassItem {
        &self.classes[id.0]
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&ClassItem> {
        self.class_index
            .get(qualified_name)
            .map(|id| &self.classes[id.0])
    }

    pub fn contains_class(&self, qualified_name: &str) -> bool {
        self.class_index.contains_key(qualified_name)
    }

    pub fn classes_in<'a>(&'a self, package: &'a Package) -> impl Iterator<Item = &'a ClassItem> {
        package.classes.iter().map(|id| &self.classes[id.0])
    }

    pub fn superclass_of(&self, id: ClassId) -> Option<&ClassItem> {
        self.class(id)
            .super_class
            .as_ref()
            .and_then(|s| s.resolved)
            .map(|sup| self.class(sup))
    }

    /// Whether `id` implements `interface`, directly or through its
    /// superclasses and super-interfaces.
    pub fn implements_interface(&self, id: ClassId, interface: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let class = self.class(current);
            for reference in class.interfaces.iter().chain(&class.super_class) {
                if reference.name == interface {
                    return true;
                }
                stack.extend(reference.resolved);
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub(crate) fn add_package(&mut self, package: Package) {
        self.packages.insert(package.name.clone(), package);
    }

    /// Registers a class under its package. The caller has already checked
    /// that the qualified name is free.
    pub(crate) fn add_class(&mut self, mut class: ClassItem) -> ClassId {
        let id = ClassId(self.classes.len());
        class.id = id;
        self.class_index.insert(class.qualified_name.clone(), id);
        if let Some(package) = self.packages.get_mut(&class.package) {
            package.classes.push(id);
        }
        self.classes.push(class);
        id
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut ClassItem {
        &mut self.classes[id.0]
    }

    pub(crate) fn classes_mut(&mut self) -> &mut [ClassItem] {
        &mut self.classes
    }

    pub(crate) fn lookup(&self, qualified_name: &str) -> Option<ClassId> {
        self.class_index.get(qualified_name).copied()
    }

    pub(crate) fn obtain_type(&mut self, type_string: &str) -> TypeItem {
        self.types.obtain(type_string)
    }

    pub(crate) fn add_pending_edge(&mut self, owner: ClassId, slot: EdgeSlot, name: impl Into<String>) {
        self.pending_edges.push(PendingEdge {
            owner,
            slot,
            name: name.into(),
        });
    }

    pub(crate) fn take_pending_edges(&mut self) -> Vec<PendingEdge> {
        std::mem::take(&mut self.pending_edges)
    }
}
