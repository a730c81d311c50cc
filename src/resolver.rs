use crate::model::{
    ClassId, ClassRef, Codebase, EdgeSlot, Flag, PendingEdge, JAVA_LANG_ANNOTATION, JAVA_LANG_ENUM,
};
use crate::types::erasure;
use log::debug;

/// Finalization pass run once every input file has been parsed.
///
/// Class references recorded as pending edges are resolved against the
/// completed class index, so declaration order across files does not matter.
/// Names that do not resolve refer to classes outside the parsed files and
/// are left external.
#[derive(Debug, Default)]
pub struct Resolver {
    resolved: usize,
    external: usize,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finalize(&mut self, codebase: &mut Codebase) {
        for edge in codebase.take_pending_edges() {
            self.resolve_edge(codebase, edge);
        }
        let enums = mark_enums(codebase);
        let annotation_types = mark_annotation_types(codebase);

        debug!(
            "finalized {} classes: {} references resolved, {} external, {} enums, {} annotation types",
            codebase.classes().len(),
            self.resolved,
            self.external,
            enums,
            annotation_types
        );
    }

    /// References linked to a parsed class.
    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    /// References naming classes outside the parsed files.
    pub fn external_count(&self) -> usize {
        self.external
    }

    fn resolve_edge(&mut self, codebase: &mut Codebase, edge: PendingEdge) {
        let Some(target) = codebase.lookup(&erasure(&edge.name)) else {
            self.external += 1;
            return;
        };
        if let Some(reference) = slot_mut(codebase, edge.owner, edge.slot) {
            reference.resolved = Some(target);
            self.resolved += 1;
        }
    }
}

fn slot_mut(codebase: &mut Codebase, owner: ClassId, slot: EdgeSlot) -> Option<&mut ClassRef> {
    let class = codebase.class_mut(owner);
    match slot {
        EdgeSlot::Superclass => class.super_class.as_mut(),
        EdgeSlot::Interface(index) => class.interfaces.get_mut(index),
        EdgeSlot::ConstructorThrows { member, index } => class
            .constructors
            .get_mut(member)
            .and_then(|ctor| ctor.throws.get_mut(index)),
        EdgeSlot::MethodThrows { member, index } => class
            .methods
            .get_mut(member)
            .and_then(|method| method.throws.get_mut(index)),
    }
}

/// Flags every class extending `java.lang.Enum`. Top-level enums lose the
/// implicit `static` the `enum` keyword gave them; nested ones keep it.
fn mark_enums(codebase: &mut Codebase) -> usize {
    let mut count = 0;
    for class in codebase.classes_mut() {
        let extends_enum = class
            .super_class_name()
            .is_some_and(|name| erasure(name) == JAVA_LANG_ENUM);
        if !extends_enum {
            continue;
        }
        class.is_enum = true;
        if !class.is_nested() {
            class.modifiers.set(Flag::Static, false);
        }
        count += 1;
    }
    count
}

fn mark_annotation_types(codebase: &mut Codebase) -> usize {
    let annotation_types: Vec<ClassId> = codebase
        .classes()
        .iter()
        .map(|class| class.id)
        .filter(|&id| codebase.implements_interface(id, JAVA_LANG_ANNOTATION))
        .collect();
    for &id in &annotation_types {
        codebase.class_mut(id).is_annotation_type = true;
    }
    annotation_types.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn finalized(source: &str) -> (Codebase, Resolver) {
        let mut codebase = Codebase::new("test.txt");
        Parser::new(source, "test.txt", &mut codebase)
            .parse_file()
            .unwrap();
        let mut resolver = Resolver::new();
        resolver.finalize(&mut codebase);
        (codebase, resolver)
    }

    #[test]
    fn test_forward_superclass_reference() {
        let (codebase, resolver) = finalized(
            "package p {\n  public class B extends p.A {\n  }\n  public class A extends java.lang.Object {\n  }\n}\n",
        );
        let b = codebase.find_class("p.B").unwrap();
        let a = codebase.find_class("p.A").unwrap();
        assert_eq!(b.super_class.as_ref().unwrap().resolved, Some(a.id));
        assert_eq!(a.super_class.as_ref().unwrap().resolved, None);
        assert_eq!(resolver.resolved_count(), 1);
        assert_eq!(resolver.external_count(), 1);
    }

    #[test]
    fn test_generic_references_resolve_by_erasure() {
        let (codebase, _) = finalized(
            "package p {\n  public interface Box<T> {\n  }\n  public class IntBox implements p.Box<java.lang.Integer> {\n  }\n}\n",
        );
        let box_id = codebase.find_class("p.Box").unwrap().id;
        let int_box = codebase.find_class("p.IntBox").unwrap();
        assert_eq!(int_box.interfaces[0].resolved, Some(box_id));
    }

    #[test]
    fn test_throws_resolution() {
        let (codebase, _) = finalized(
            "package p {\n  public class Failure extends java.lang.Exception {\n  }\n  public class Io {\n    ctor public Io() throws p.Failure;\n    method public void read() throws java.io.IOException, p.Failure;\n  }\n}\n",
        );
        let failure = codebase.find_class("p.Failure").unwrap().id;
        let io = codebase.find_class("p.Io").unwrap();
        assert_eq!(io.constructors[0].throws[0].resolved, Some(failure));
        let read = io.find_method("read").unwrap();
        assert_eq!(read.throws[0].resolved, None);
        assert_eq!(read.throws[1].resolved, Some(failure));
    }

    #[test]
    fn test_enum_static_flag() {
        let (codebase, _) = finalized(
            "package p {\n  public enum Color {\n  }\n  public class Outer {\n  }\n  public static enum Outer.Mode {\n  }\n}\n",
        );
        let color = codebase.find_class("p.Color").unwrap();
        assert!(color.is_enum);
        assert!(!color.modifiers.is_static());
        assert!(color.modifiers.is_final());
        let mode = codebase.find_class("p.Outer.Mode").unwrap();
        assert!(mode.is_enum);
        assert!(mode.modifiers.is_static());
        assert!(!codebase.find_class("p.Outer").unwrap().is_enum);
    }

    #[test]
    fn test_annotation_types_are_transitive() {
        let (codebase, _) = finalized(
            "package p {\n  public @interface Marker {\n  }\n  public interface Special extends java.lang.annotation.Annotation {\n  }\n  public abstract class Impl implements p.Special {\n  }\n  public class Plain {\n  }\n}\n",
        );
        assert!(codebase.find_class("p.Marker").unwrap().is_annotation_type);
        assert!(codebase.find_class("p.Special").unwrap().is_annotation_type);
        assert!(codebase.find_class("p.Impl").unwrap().is_annotation_type);
        assert!(!codebase.find_class("p.Plain").unwrap().is_annotation_type);
    }
}
