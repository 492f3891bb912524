//! Methods: header lines, parameter lists, bodies and the rules that hide
//! compiler-generated members after their body turns out empty.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use kdecomp_core::record::method_key;
use kdecomp_core::signature::{parse_method_signature, MethodDescriptor, MethodSignature};
use kdecomp_core::types::{Primitive, TypeKind};
use kdecomp_core::{
    AccessFlags, BytecodeMappingTracer, ClassRecord, MethodRecord, Modifier, ModifierSet,
    OwnerType, VarType,
};

use super::{
    annotation_line, panic_message, type_parameters, with_metadata, ClassEmitter, EmitState, PLACEHOLDER,
};
use crate::context::EmitContext;
use crate::reconstruct::MethodContext;
use crate::topology::{ClassKind, ClassNode, ClassTree, NodeId};

/// Result of writing one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MethodOutcome {
    /// False when the method turned out to be hidden and must be rewound.
    pub written: bool,
    pub errors: bool,
}

impl MethodOutcome {
    const HIDDEN: MethodOutcome = MethodOutcome {
        written: false,
        errors: false,
    };
}

/// Methods `java.lang.Record` subclasses get generated.
const RECORD_METHODS: &[(&str, &str)] = &[
    ("equals", "(Ljava/lang/Object;)Z"),
    ("hashCode", "()I"),
    ("toString", "()Ljava/lang/String;"),
];

impl ClassEmitter<'_> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn write_methods(
        &self,
        tree: &mut ClassTree,
        id: NodeId,
        indent: usize,
        st: &mut EmitState,
        ctx: &mut EmitContext,
        hidden: &HashSet<String>,
        has_content: &mut bool,
    ) {
        let record = tree[id].record.clone();

        // Lambda bodies are rendered where the lambda is created.
        let mut hidden = hidden.clone();
        for child in tree.children(id) {
            if let Some(info) = tree[*child].lambda.as_ref().filter(|l| !l.is_method_reference) {
                hidden.insert(method_key(&info.site.content_method, &info.site.content_descriptor));
            }
        }

        let mut errors = false;
        for method in &record.methods {
            let skip = (method.is_synthetic() && self.options.remove_synthetic)
                || (method.access.contains(AccessFlags::BRIDGE) && self.options.remove_bridge)
                || hidden.contains(&method.key());
            if skip {
                continue;
            }

            let mark = st.mark();
            if *has_content {
                st.end_line();
            }
            let outcome = self.write_method(&tree[id], method, indent, st, ctx);
            errors |= outcome.errors;
            if outcome.written {
                *has_content = true;
            } else {
                st.rewind(mark);
            }
        }

        if errors {
            tree[id].decompiled_with_errors = true;
        }
    }

    fn write_method(
        &self,
        node: &ClassNode,
        method: &MethodRecord,
        indent: usize,
        st: &mut EmitState,
        ctx: &mut EmitContext,
    ) -> MethodOutcome {
        let record = &node.record;
        let key = method.key();
        let scope = ctx.enter_method(&key);

        let is_init = method.is_constructor();
        let is_clinit = method.is_static_init();
        let in_interface = record.is_interface();

        let mut flags = method.access;
        if flags.contains(AccessFlags::NATIVE) {
            flags.remove(AccessFlags::STRICT);
        }
        if is_clinit {
            flags &= AccessFlags::STATIC;
        }

        let descriptor = method.parsed_descriptor().unwrap_or_else(|e| {
            debug!(class = %record.name, method = %key, error = %e, "unreadable method descriptor");
            MethodDescriptor {
                params: Vec::new(),
                ret: VarType::primitive(Primitive::Void),
            }
        });
        let generic = self.method_signature(record, method);

        let synthetic = self.synthetic_parameters(node, method, &descriptor, is_init);
        let visible: Vec<usize> = (0..descriptor.params.len()).filter(|i| !synthetic[*i]).collect();
        let param_types: Vec<VarType> = match &generic {
            Some(sig) if sig.params.len() == visible.len() => sig.params.clone(),
            _ => visible.iter().map(|i| descriptor.params[*i].clone()).collect(),
        };
        let ret = generic.as_ref().map_or_else(|| descriptor.ret.clone(), |s| s.ret.clone());
        let throws: Vec<VarType> = match &generic {
            Some(sig) if !sig.throws.is_empty() => sig.throws.clone(),
            _ => method.exceptions.iter().map(VarType::class).collect(),
        };

        // Comments and annotations.
        if method.deprecated {
            st.write_line(indent, "/** @deprecated */");
        }
        if method.is_synthetic() {
            st.comment(indent, "synthetic method");
        }
        if method.access.contains(AccessFlags::BRIDGE) {
            st.comment(indent, "bridge method");
        }
        for annotation in &method.annotations {
            st.write_line(indent, &annotation_line(annotation));
        }
        if !throws.is_empty() {
            let classes: Vec<String> = throws
                .iter()
                .map(|t| format!("{}::class", t.display_with(&st.imports)))
                .collect();
            st.write_line(indent, &format!("@Throws({})", classes.join(", ")));
        }

        // Declaration head.
        let owner = if is_init {
            OwnerType::Constructor
        } else {
            OwnerType::Function
        };
        let function = record
            .kotlin
            .as_ref()
            .and_then(|k| k.function_for_method(&method.name, &method.descriptor));
        let mut mods = ModifierSet::from_access(flags, owner);
        if let Some(f) = function {
            mods = with_metadata(mods, f.flags, owner);
        }
        mods = mods.without(Modifier::Final);
        if in_interface {
            mods = mods.without(Modifier::Abstract);
        }

        let mut head = String::new();
        if !is_init && !is_clinit && self.is_override(record, method, &param_types) {
            head.push_str("override ");
        }
        head.push_str(&mods.render_prefix(owner));

        let mut first_param = 0;
        if is_clinit {
            head.push_str("static");
        } else if is_init && node.kind == ClassKind::Anonymous {
            head.push_str("init");
        } else if is_init {
            head.push_str("constructor");
        } else {
            head.push_str("fun ");
            if let Some(sig) = generic.as_ref().filter(|s| !s.type_params.is_empty()) {
                head.push_str(&type_parameters(&sig.type_params, &st.imports));
                head.push(' ');
            }
            if function.is_some_and(|f| f.receiver.is_some()) {
                if let Some(receiver) = param_types.first() {
                    head.push_str(&receiver.display_with(&st.imports));
                    head.push('.');
                    first_param = 1;
                }
            }
            head.push_str(&method.name);
        }

        if !is_clinit && !(is_init && node.kind == ClassKind::Anonymous) {
            let is_varargs = flags.contains(AccessFlags::VARARGS);
            let last = param_types.len().saturating_sub(1);
            let params: Vec<String> = visible
                .iter()
                .zip(&param_types)
                .enumerate()
                .skip(first_param)
                .map(|(position, (raw, ty))| {
                    let name = self.parameter_name(record, method, *raw, position);
                    match ty.element().filter(|_| is_varargs && position == last) {
                        Some(element) => format!("vararg {}: {}", name, element.display_with(&st.imports)),
                        None => format!("{}: {}", name, ty.display_with(&st.imports)),
                    }
                })
                .collect();
            head.push('(');
            head.push_str(&params.join(", "));
            head.push(')');
            if !is_init && !ret.is_void() {
                head.push_str(": ");
                head.push_str(&ret.display_with(&st.imports));
            }
        }

        // Declarations without a body.
        if flags.intersects(AccessFlags::ABSTRACT | AccessFlags::NATIVE) {
            if let Some(default) = &method.annotation_default {
                head.push_str(" default ");
                head.push_str(default);
            }
            st.write_line(indent, &head);
            return MethodOutcome {
                written: true,
                errors: false,
            };
        }

        head.push_str(" {");
        st.write_line(indent, &head);

        let start = st.line;
        let mut tracer = BytecodeMappingTracer::starting_at(start);
        tracer.set_line_number_table(method.line_numbers.clone());
        let method_ctx = MethodContext {
            class: record,
            method,
            indent: indent + 1,
            indent_unit: &self.options.indent_string,
            line_separator: &self.options.line_separator,
            current_class: scope.current_class().unwrap_or(&record.name),
        };

        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reconstructor.render_body(&method_ctx, &mut tracer)
        }));
        let (body, errors) = match rendered {
            Ok(Ok(body)) if body.decompiled_with_errors => {
                warn!(class = %record.name, method = %method.name, descriptor = %method.descriptor, "method body rendered with errors");
                (String::new(), true)
            }
            Ok(Ok(body)) => (body.text, false),
            Ok(Err(e)) => {
                warn!(class = %record.name, method = %method.name, descriptor = %method.descriptor, error = %e, "method could not be decompiled");
                (String::new(), true)
            }
            Err(payload) => {
                warn!(class = %record.name, method = %method.name, descriptor = %method.descriptor, panic = panic_message(payload.as_ref()), "method body renderer panicked");
                (String::new(), true)
            }
        };

        // Partial output of a failed body is never written.
        if errors {
            tracer = BytecodeMappingTracer::starting_at(start);
            st.write_line(indent + 1, PLACEHOLDER);
        } else if !body.trim().is_empty() {
            st.append_text(&body);
            if !body.ends_with(self.options.line_separator.as_str()) {
                st.end_line();
            }
        } else if self.is_hidden_when_empty(node, method, visible.len()) {
            return MethodOutcome::HIDDEN;
        }

        if record.is_record() && is_generated_record_member(record, method, &body) {
            return MethodOutcome::HIDDEN;
        }

        tracer.set_current_source_line(st.line);
        if let Some(offset) = self.reconstructor.dummy_exit_offset(&method_ctx) {
            tracer.add_mapping(offset);
        }
        st.write_line(indent, "}");
        st.mapper.add_tracer(&record.name, &key, &tracer);

        MethodOutcome { written: true, errors }
    }

    fn method_signature(&self, record: &ClassRecord, method: &MethodRecord) -> Option<MethodSignature> {
        if !self.options.decompile_generic_signatures {
            return None;
        }
        let signature = method.signature.as_deref()?;
        match parse_method_signature(signature) {
            Ok(sig) => Some(sig),
            Err(e) => {
                debug!(class = %record.name, method = %method.name, error = %e, "ignoring malformed method signature");
                None
            }
        }
    }

    /// Flags for compiler-added parameters that the declaration omits.
    fn synthetic_parameters(
        &self,
        node: &ClassNode,
        method: &MethodRecord,
        descriptor: &MethodDescriptor,
        is_init: bool,
    ) -> Vec<bool> {
        let count = descriptor.params.len();
        let mut mask = vec![false; count];
        if !is_init {
            return mask;
        }
        let record = &node.record;
        if let Some(mut given) = self.reconstructor.synthetic_parameters(record, method) {
            given.resize(count, false);
            return given;
        }

        // Enum constructors take the constant's name and ordinal first.
        if record.is_enum() && self.options.decompile_enum {
            let name_and_ordinal = matches!(
                descriptor.params.as_slice(),
                [name, ordinal, ..]
                    if name.class_name() == Some("java/lang/String")
                        && ordinal.kind == TypeKind::Primitive(Primitive::Int)
                        && ordinal.array_dim == 0
            );
            if name_and_ordinal {
                mask[0] = true;
                mask[1] = true;
            }
            return mask;
        }

        let nested = matches!(node.kind, ClassKind::Member | ClassKind::Anonymous | ClassKind::Local);
        if nested && !node.access.contains(AccessFlags::STATIC) {
            let outer = descriptor.params.first().and_then(VarType::class_name);
            let is_outer = outer.is_some_and(|c| {
                node.enclosing_classes.contains(c)
                    || record.enclosing_method.as_ref().is_some_and(|m| m.class == c)
            });
            if is_outer {
                mask[0] = true;
            }
        }
        mask
    }

    /// Empty-bodied members the compiler generates.
    fn is_hidden_when_empty(&self, node: &ClassNode, method: &MethodRecord, visible_params: usize) -> bool {
        if method.is_static_init() {
            return true;
        }
        if !method.is_constructor() {
            return false;
        }
        if node.kind == ClassKind::Anonymous {
            return true;
        }
        let record = &node.record;
        self.options.hide_default_constructor
            && method.exceptions.is_empty()
            && visible_params == 0
            && !record.is_enum()
            && node.access.accessibility() == method.access.accessibility()
            && record.constructors().count() == 1
    }

    /// True if an ancestor declares a method this one overrides.
    fn is_override(&self, record: &ClassRecord, method: &MethodRecord, params: &[VarType]) -> bool {
        if method.access.intersects(AccessFlags::PRIVATE | AccessFlags::STATIC) {
            return false;
        }
        let Ok(hierarchy) = self.generics.hierarchy(&record.name) else {
            return false;
        };
        for ancestor in hierarchy.ancestor_names() {
            let Some(declaring) = self.source.lookup(ancestor) else {
                continue;
            };
            let candidates = declaring.methods.iter().filter(|m| {
                m.name == method.name
                    && !m.is_constructor()
                    && !m.access.intersects(AccessFlags::PRIVATE | AccessFlags::STATIC)
            });
            for candidate in candidates {
                if candidate.descriptor == method.descriptor {
                    return true;
                }
                let Some(signature) = candidate
                    .signature
                    .as_deref()
                    .and_then(|s| parse_method_signature(s).ok())
                else {
                    continue;
                };
                let Some(substitution) = hierarchy.substitution(ancestor) else {
                    continue;
                };
                if signature.params.len() == params.len()
                    && signature
                        .params
                        .iter()
                        .zip(params)
                        .all(|(theirs, ours)| theirs.substitute(substitution).descriptor() == ours.descriptor())
                {
                    return true;
                }
            }
        }
        false
    }
}

/// Record members whose body is exactly what javac generates.
fn is_generated_record_member(record: &ClassRecord, method: &MethodRecord, body: &str) -> bool {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    let (Some(line), None) = (lines.next(), lines.next()) else {
        return false;
    };

    if RECORD_METHODS
        .iter()
        .any(|(name, descriptor)| method.name == *name && method.descriptor == *descriptor)
    {
        return line.starts_with(&format!("return this.{}<invokedynamic>(this", method.name));
    }
    record.record_component(&method.name).is_some_and(|c| {
        method.descriptor == format!("(){}", c.descriptor) && line == format!("return this.{};", method.name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdecomp_core::record::RecordComponent;

    fn point() -> ClassRecord {
        let mut record = ClassRecord::new("a/Point", AccessFlags::PUBLIC | AccessFlags::FINAL);
        record.super_class = Some("java/lang/Record".to_string());
        record.record_components = Some(vec![RecordComponent {
            name: "x".to_string(),
            descriptor: "I".to_string(),
            signature: None,
        }]);
        record
    }

    #[test]
    fn generated_record_members() {
        let record = point();
        let to_string = MethodRecord::new("toString", "()Ljava/lang/String;", AccessFlags::PUBLIC);
        assert!(is_generated_record_member(
            &record,
            &to_string,
            "   return this.toString<invokedynamic>(this);\n"
        ));
        assert!(!is_generated_record_member(&record, &to_string, "   return \"Point\";\n"));

        let accessor = MethodRecord::new("x", "()I", AccessFlags::PUBLIC);
        assert!(is_generated_record_member(&record, &accessor, "   return this.x;\n"));
        assert!(!is_generated_record_member(
            &record,
            &accessor,
            "   log();\n   return this.x;\n"
        ));

        let other = MethodRecord::new("y", "()I", AccessFlags::PUBLIC);
        assert!(!is_generated_record_member(&record, &other, "   return this.y;\n"));
    }
}
