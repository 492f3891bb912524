//! Fields and enum constants.

use std::collections::HashSet;

use tracing::debug;

use kdecomp_core::metadata::property;
use kdecomp_core::record::method_key;
use kdecomp_core::types::TypeKind;
use kdecomp_core::{AccessFlags, ClassRecord, FieldRecord, Modifier, ModifierSet, OwnerType, VarType};

use super::{annotation_line, with_metadata, ClassEmitter, EmitState};
use crate::topology::ClassNode;

impl ClassEmitter<'_> {
    /// Write the field section. Returns true if anything was written.
    pub(super) fn write_fields(
        &self,
        node: &ClassNode,
        indent: usize,
        st: &mut EmitState,
        hidden: &HashSet<String>,
    ) -> bool {
        let record = &node.record;
        let enum_syntax = record.is_enum() && self.options.decompile_enum;
        let mut in_constants = false;
        let mut has_content = false;

        for field in &record.fields {
            if self.is_hidden_field(record, field, hidden) {
                continue;
            }
            let is_constant = enum_syntax && field.access.contains(AccessFlags::ENUM);
            if is_constant {
                if in_constants {
                    st.append(",");
                    st.end_line();
                }
                in_constants = true;
                self.write_enum_constant(record, field, indent, st);
            } else {
                if in_constants {
                    st.append(";");
                    st.end_line();
                    st.end_line();
                    in_constants = false;
                }
                self.write_field(record, field, indent, st);
            }
            has_content = true;
        }

        if in_constants {
            st.append(";");
            st.end_line();
        }
        has_content
    }

    fn is_hidden_field(&self, record: &ClassRecord, field: &FieldRecord, hidden: &HashSet<String>) -> bool {
        if field.is_synthetic() && self.options.remove_synthetic {
            return true;
        }
        if hidden.contains(&method_key(&field.name, &field.descriptor)) {
            return true;
        }
        // Record components are declared in the header.
        record.is_record()
            && field.access.contains(AccessFlags::PRIVATE | AccessFlags::FINAL)
            && !field.access.contains(AccessFlags::STATIC)
            && record.record_component(&field.name).is_some()
    }

    /// `NAME` or `NAME(args)`, without a line separator.
    fn write_enum_constant(&self, record: &ClassRecord, field: &FieldRecord, indent: usize, st: &mut EmitState) {
        if field.deprecated {
            st.write_line(indent, "/** @deprecated */");
        }
        for annotation in &field.annotations {
            st.write_line(indent, &annotation_line(annotation));
        }
        st.append_indent(indent);
        st.append(&field.name);
        if let Some(args) = self.reconstructor.field_initializer(record, field) {
            if !args.is_empty() {
                st.append(&format!("({})", args));
            }
        }
    }

    fn write_field(&self, record: &ClassRecord, field: &FieldRecord, indent: usize, st: &mut EmitState) {
        if field.deprecated {
            st.write_line(indent, "/** @deprecated */");
        }
        if field.is_synthetic() {
            st.comment(indent, "synthetic field");
        }
        for annotation in &field.annotations {
            st.write_line(indent, &annotation_line(annotation));
        }

        let km = record
            .kotlin
            .as_ref()
            .and_then(|k| k.property_for_field(&field.name));
        let mut mods = ModifierSet::from_access(field.access, OwnerType::Property);
        let is_var = match km {
            Some(p) => {
                mods = with_metadata(mods, p.flags, OwnerType::Property);
                p.flags.test(property::IS_VAR)
            }
            None => !field.access.contains(AccessFlags::FINAL),
        };
        mods = mods.without(Modifier::Final);

        let ty = self.field_type(record, field);
        let initializer = self
            .reconstructor
            .field_initializer(record, field)
            .or_else(|| {
                field
                    .constant_value
                    .as_ref()
                    .filter(|_| field.access.contains(AccessFlags::STATIC | AccessFlags::FINAL))
                    .map(|c| c.literal(Some(&ty)))
            })
            .unwrap_or_else(|| default_value(&ty));

        let line = format!(
            "{}{} {}: {} = {}",
            mods.render_prefix(OwnerType::Property),
            if is_var { "var" } else { "val" },
            field.name,
            ty.display_with(&st.imports),
            initializer
        );
        st.write_line(indent, &line);
    }

    fn field_type(&self, record: &ClassRecord, field: &FieldRecord) -> VarType {
        let parsed = if self.options.decompile_generic_signatures {
            field.generic_type()
        } else {
            field.field_type()
        };
        parsed.unwrap_or_else(|e| {
            debug!(class = %record.name, field = %field.name, error = %e, "unreadable field type");
            VarType::object()
        })
    }
}

/// The value a field holds before any initializer runs.
fn default_value(ty: &VarType) -> String {
    match ty.kind {
        TypeKind::Primitive(p) if ty.array_dim == 0 => p.default_literal().to_string(),
        _ => "null".to_string(),
    }
}
