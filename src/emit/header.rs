//! Class headers: comments, annotations, modifiers, keyword, name, type
//! parameters, record components and supertypes.

use kdecomp_core::metadata::KmClassKind;
use kdecomp_core::signature::parse_field_type;
use kdecomp_core::types::TypeNaming;
use kdecomp_core::{AccessFlags, ClassRecord, Modifier, ModifierSet, OwnerType, VarType};

use super::{annotation_line, type_parameters, with_metadata, ClassEmitter, EmitState};
use crate::topology::{ClassKind, ClassNode, ClassTree, NodeId};

const ANNOTATION: &str = "java/lang/annotation/Annotation";
const ENUM: &str = "java/lang/Enum";
const RECORD: &str = "java/lang/Record";

impl ClassEmitter<'_> {
    pub(super) fn write_header(&self, tree: &ClassTree, id: NodeId, indent: usize, st: &mut EmitState) {
        let node = &tree[id];
        let record = &node.record;

        if node.kind == ClassKind::Anonymous {
            st.append(" {");
            st.end_line();
            return;
        }

        if record.deprecated {
            st.write_line(indent, "/** @deprecated */");
        }
        if let Some(original) = &node.renamed_from {
            st.comment(indent, &format!("renamed from: {}", original));
        }
        if node.access.is_synthetic() || record.is_synthetic() {
            st.comment(indent, "synthetic class");
        }
        for annotation in &record.annotations {
            st.write_line(indent, &annotation_line(annotation));
        }

        let modifiers = class_modifiers(node);
        let mut line = modifiers.render_prefix(OwnerType::Class);
        line.push_str(self.class_keyword(record));
        line.push(' ');
        line.push_str(node.display_name());

        let signature = if self.options.decompile_generic_signatures {
            self.source.class_signature(record)
        } else {
            None
        };
        if let Some(sig) = &signature {
            line.push_str(&type_parameters(&sig.type_params, &st.imports));
        }
        if record.is_record() {
            line.push_str(&self.record_components(record, &st.imports));
        }

        let (superclass, interfaces) = match &signature {
            Some(sig) => (Some(sig.superclass.clone()), sig.interfaces.clone()),
            None => (
                record.super_class.as_deref().map(VarType::class),
                record.interfaces.iter().map(VarType::class).collect(),
            ),
        };
        let mut supertypes = Vec::new();
        if let Some(superclass) = superclass {
            let hidden = superclass.is_object()
                || superclass.class_name() == Some(ENUM)
                || superclass.class_name() == Some(RECORD);
            if !hidden {
                supertypes.push(format!("{}()", superclass.display_with(&st.imports)));
            }
        }
        for interface in interfaces {
            if record.is_annotation() && interface.class_name() == Some(ANNOTATION) {
                continue;
            }
            supertypes.push(interface.display_with(&st.imports));
        }
        if !supertypes.is_empty() {
            line.push_str(" : ");
            line.push_str(&supertypes.join(", "));
        }

        line.push_str(" {");
        st.write_line(indent, &line);
    }

    fn class_keyword(&self, record: &ClassRecord) -> &'static str {
        match record.kotlin.as_ref().and_then(|k| k.class_kind()) {
            Some(KmClassKind::Object) => return "object",
            Some(KmClassKind::CompanionObject) => return "companion object",
            _ => {}
        }
        if record.is_enum() && self.options.decompile_enum {
            "enum class"
        } else if record.is_annotation() {
            "annotation class"
        } else if record.is_interface() {
            "interface"
        } else {
            "class"
        }
    }

    /// `(name: Type, ...)` for records.
    fn record_components(&self, record: &ClassRecord, names: &dyn TypeNaming) -> String {
        let components = record.record_components.as_deref().unwrap_or_default();
        let rendered: Vec<String> = components
            .iter()
            .map(|c| {
                let generic = c
                    .signature
                    .as_deref()
                    .filter(|_| self.options.decompile_generic_signatures)
                    .and_then(|s| parse_field_type(s).ok());
                let ty = generic
                    .or_else(|| parse_field_type(&c.descriptor).ok())
                    .unwrap_or_else(VarType::object);
                format!("{}: {}", c.name, ty.display_with(names))
            })
            .collect();
        format!("({})", rendered.join(", "))
    }
}

/// Header modifiers of a class node.
fn class_modifiers(node: &ClassNode) -> ModifierSet {
    let record = &node.record;
    let mut mods = ModifierSet::from_access(node.access, OwnerType::Class);
    if let Some(km) = record.kotlin.as_ref().filter(|k| !k.is_file_facade()) {
        mods = with_metadata(mods, km.flags, OwnerType::Class);
    }

    let is_object = matches!(
        record.kotlin.as_ref().and_then(|k| k.class_kind()),
        Some(KmClassKind::Object | KmClassKind::CompanionObject)
    );
    if record.is_interface() || record.is_enum() || is_object {
        mods = mods
            .without(Modifier::Abstract)
            .without(Modifier::Open)
            .without(Modifier::Final);
    } else if mods.contains(Modifier::Sealed) {
        mods = mods.without(Modifier::Abstract).without(Modifier::Final);
    } else if mods.contains(Modifier::Final) {
        mods = mods.without(Modifier::Final);
    } else if !mods.contains(Modifier::Private) && !mods.contains(Modifier::Abstract) {
        mods = mods.with(Modifier::Open);
    }

    let nested = matches!(node.kind, ClassKind::Member);
    let is_inner = nested
        && !node.access.contains(AccessFlags::STATIC)
        && !record.is_interface()
        && !record.is_enum();
    if record.is_record() {
        mods = mods.with(Modifier::Data);
    }
    mods.with_if(Modifier::Inner, is_inner || mods.contains(Modifier::Inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdecomp_core::metadata::{KotlinMetadata, MetadataFlags, MetadataKind};
    use std::sync::Arc;

    fn node(access: AccessFlags, kind: ClassKind) -> ClassNode {
        ClassNode::new(Arc::new(ClassRecord::new("a/Outer$Inner", access)), kind)
    }

    fn render(node: &ClassNode) -> String {
        class_modifiers(node).render(OwnerType::Class)
    }

    #[test]
    fn final_classes_lose_final_and_others_open() {
        assert_eq!(render(&node(AccessFlags::PUBLIC | AccessFlags::FINAL, ClassKind::Root)), "");
        assert_eq!(render(&node(AccessFlags::PUBLIC, ClassKind::Root)), "open");
        assert_eq!(
            render(&node(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, ClassKind::Root)),
            "abstract"
        );
        assert_eq!(
            render(&node(AccessFlags::PRIVATE | AccessFlags::FINAL, ClassKind::Root)),
            "private"
        );
    }

    #[test]
    fn interfaces_and_enums_have_no_modality() {
        let iface = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        assert_eq!(render(&node(iface, ClassKind::Root)), "");
        let enumeration = AccessFlags::PUBLIC | AccessFlags::ENUM | AccessFlags::FINAL;
        assert_eq!(render(&node(enumeration, ClassKind::Root)), "");
    }

    #[test]
    fn non_static_members_are_inner() {
        let inner = node(AccessFlags::FINAL, ClassKind::Member);
        assert_eq!(render(&inner), "inner");
        let nested = node(AccessFlags::FINAL | AccessFlags::STATIC, ClassKind::Member);
        assert_eq!(render(&nested), "");
        let local = node(AccessFlags::FINAL, ClassKind::Local);
        assert_eq!(render(&local), "");
    }

    #[test]
    fn kotlin_internal_and_sealed() {
        let mut record = ClassRecord::new("a/Shape", AccessFlags::PUBLIC | AccessFlags::ABSTRACT);
        let mut km = KotlinMetadata::new(MetadataKind::Class);
        // internal visibility, sealed modality
        km.flags = MetadataFlags(3 << 4);
        record.kotlin = Some(km);
        let n = ClassNode::new(Arc::new(record), ClassKind::Root);
        assert_eq!(render(&n), "internal sealed");
    }
}
