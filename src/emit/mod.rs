//! Source emission.
//!
//! [`ClassEmitter`] walks one class tree and renders declarations. Each
//! class goes through the phases of [`EmitPhase`] in order; member classes
//! recurse one indent level deeper during [`EmitPhase::NestedMembers`].
//! Anonymous, local and lambda classes are not emitted here. They belong
//! to the method bodies that create them, which render them through
//! [`ClassEmitter::class_to_source`] and [`ClassEmitter::lambda_to_source`].
//!
//! Output goes into an [`EmitState`], which tracks the current source line
//! alongside the text so per-method bytecode mappings line up with what
//! was written.

mod fields;
mod header;
pub mod imports;
mod methods;
mod module_info;

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use kdecomp_core::metadata::{self, MetadataFlags};
use kdecomp_core::signature::{parse_method_descriptor, TypeParameter};
use kdecomp_core::types::TypeNaming;
use kdecomp_core::{
    BytecodeMappingTracer, DecompilerOptions, Modifier, ModifierSet, OwnerType, RecordSource,
    SourceMapper, TextBuffer,
};

use crate::context::EmitContext;
use crate::generics::GenericResolver;
use crate::reconstruct::{BodyReconstructor, MethodContext};
use crate::topology::{ClassKind, ClassTree, NodeId};

pub use imports::ImportCollector;

/// Text every failed body is replaced with.
pub const PLACEHOLDER: &str = "// could not be decompiled";

/// Message carried by a caught panic, if it is a string.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Emission phases of one class, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitPhase {
    HeaderStart,
    Fields,
    Methods,
    NestedMembers,
    Close,
    Done,
}

impl EmitPhase {
    pub fn next(self) -> EmitPhase {
        match self {
            EmitPhase::HeaderStart => EmitPhase::Fields,
            EmitPhase::Fields => EmitPhase::Methods,
            EmitPhase::Methods => EmitPhase::NestedMembers,
            EmitPhase::NestedMembers => EmitPhase::Close,
            EmitPhase::Close | EmitPhase::Done => EmitPhase::Done,
        }
    }
}

// ============================================================================
// Output State
// ============================================================================

/// Text, line counter, mappings and imports for one output file.
#[derive(Debug)]
pub struct EmitState {
    buf: TextBuffer,
    /// Line separators written so far.
    line: u32,
    mapper: SourceMapper,
    imports: ImportCollector,
}

/// A position to rewind to.
#[derive(Debug, Clone, Copy)]
struct Mark {
    len: usize,
    line: u32,
}

impl EmitState {
    pub fn new(root_class: &str, options: &DecompilerOptions) -> Self {
        EmitState {
            buf: TextBuffer::new(&options.indent_string, &options.line_separator),
            line: 0,
            mapper: SourceMapper::new(),
            imports: ImportCollector::new(root_class),
        }
    }

    pub fn current_line(&self) -> u32 {
        self.line
    }

    pub fn imports(&self) -> &ImportCollector {
        &self.imports
    }

    /// Annotations and the `package` line of a `package-info` class.
    pub fn write_package_info(&mut self, record: &kdecomp_core::ClassRecord) {
        for annotation in &record.annotations {
            self.write_line(0, &annotation_line(annotation));
        }
        let package = record.package().replace('/', ".");
        if !package.is_empty() {
            self.write_line(0, &format!("package {}", package));
        }
    }

    pub fn into_parts(self) -> (TextBuffer, SourceMapper, ImportCollector) {
        (self.buf, self.mapper, self.imports)
    }

    fn append(&mut self, s: &str) {
        self.buf.append(s);
    }

    fn append_indent(&mut self, level: usize) {
        self.buf.append_indent(level);
    }

    fn end_line(&mut self) {
        self.buf.append_line_separator();
        self.line += 1;
    }

    fn write_line(&mut self, level: usize, s: &str) {
        self.buf.append_line(level, s);
        self.line += 1;
    }

    /// `// $FF: <text>`
    fn comment(&mut self, level: usize, text: &str) {
        self.write_line(level, &format!("// $FF: {}", text));
    }

    /// Append text that may span several lines.
    fn append_text(&mut self, s: &str) {
        let start = self.buf.len();
        self.buf.append(s);
        self.line += self.buf.count_lines_from(start);
    }

    fn mark(&self) -> Mark {
        Mark {
            len: self.buf.len(),
            line: self.line,
        }
    }

    fn rewind(&mut self, mark: Mark) {
        self.buf.truncate(mark.len);
        self.line = mark.line;
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Renders class trees.
pub struct ClassEmitter<'a> {
    source: &'a dyn RecordSource,
    options: &'a DecompilerOptions,
    reconstructor: &'a dyn BodyReconstructor,
    generics: &'a GenericResolver,
}

impl<'a> ClassEmitter<'a> {
    pub fn new(
        source: &'a dyn RecordSource,
        options: &'a DecompilerOptions,
        reconstructor: &'a dyn BodyReconstructor,
        generics: &'a GenericResolver,
    ) -> Self {
        ClassEmitter {
            source,
            options,
            reconstructor,
            generics,
        }
    }

    /// Emit the class at `id` and its member classes.
    pub fn emit_class(
        &self,
        tree: &mut ClassTree,
        id: NodeId,
        indent: usize,
        st: &mut EmitState,
        ctx: &mut EmitContext,
    ) {
        let name = tree[id].qualified_name.clone();
        let mut scope = ctx.enter_class(&name);

        let record = tree[id].record.clone();
        if record.is_module() && self.write_module(&record, st) {
            return;
        }

        let facade = record.kotlin.as_ref().is_some_and(|k| k.is_file_facade());
        let member_indent = if facade { indent } else { indent + 1 };
        let hidden = self.reconstructor.hidden_members(&record);
        let mut has_content = false;

        let mut phase = EmitPhase::HeaderStart;
        while phase != EmitPhase::Done {
            match phase {
                EmitPhase::HeaderStart => {
                    if !facade {
                        self.write_header(tree, id, indent, st);
                    }
                }
                EmitPhase::Fields => {
                    has_content |= self.write_fields(&tree[id], member_indent, st, &hidden);
                }
                EmitPhase::Methods => {
                    self.write_methods(tree, id, member_indent, st, &mut scope, &hidden, &mut has_content);
                }
                EmitPhase::NestedMembers => {
                    self.write_nested(tree, id, member_indent, st, &mut scope, &hidden, &mut has_content);
                }
                EmitPhase::Close => {
                    if !facade {
                        st.append_indent(indent);
                        st.append("}");
                        if tree[id].kind != ClassKind::Anonymous {
                            st.end_line();
                        }
                    }
                }
                EmitPhase::Done => {}
            }
            phase = phase.next();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_nested(
        &self,
        tree: &mut ClassTree,
        id: NodeId,
        indent: usize,
        st: &mut EmitState,
        ctx: &mut EmitContext,
        hidden: &HashSet<String>,
        has_content: &mut bool,
    ) {
        let children = tree.children(id).to_vec();
        for child in children {
            let node = &tree[child];
            if node.kind != ClassKind::Member {
                continue;
            }
            let synthetic = node.access.is_synthetic() || node.record.is_synthetic();
            if (synthetic && self.options.remove_synthetic) || hidden.contains(&node.qualified_name) {
                continue;
            }
            if *has_content {
                st.end_line();
            }
            self.emit_class(tree, child, indent, st, ctx);
            *has_content = true;
        }
    }

    /// Render an anonymous or local class for a body that creates it.
    /// Anonymous classes start with ` {` and end without a line separator.
    pub fn class_to_source(&self, tree: &mut ClassTree, id: NodeId, indent: usize) -> String {
        let mut st = EmitState::new(tree.root_name(), self.options);
        let mut ctx = EmitContext::new();
        self.emit_class(tree, id, indent, &mut st, &mut ctx);
        st.buf.into_string()
    }

    /// Render a lambda node as an expression: `Type::method` for method
    /// references, `(a, b) -> { ... }` for lambda bodies.
    pub fn lambda_to_source(&self, tree: &ClassTree, id: NodeId, indent: usize, names: &dyn TypeNaming) -> String {
        let node = &tree[id];
        let Some(info) = &node.lambda else {
            return String::new();
        };
        let site = &info.site;
        let reference = || {
            let target = if site.content_method == kdecomp_core::record::INIT {
                "new"
            } else {
                site.content_method.as_str()
            };
            format!("{}::{}", names.class_name(&site.content_class), target)
        };
        if info.is_method_reference {
            return reference();
        }

        let home = &node.record;
        let Some(method) = home.method(&site.content_method, &site.content_descriptor) else {
            return reference();
        };
        let (Ok(content), Ok(sam)) = (
            parse_method_descriptor(&site.content_descriptor),
            parse_method_descriptor(&site.method_descriptor),
        ) else {
            return reference();
        };

        // Leading parameters of the body method are captured variables.
        let captured = content.params.len().saturating_sub(sam.params.len());
        let params: Vec<String> = (captured..content.params.len())
            .enumerate()
            .map(|(pos, raw)| self.parameter_name(home, method, raw, pos))
            .collect();

        let separator = self.options.line_separator.as_str();
        let mut out = format!("({}) -> {{{}", params.join(", "), separator);
        let ctx = MethodContext {
            class: home,
            method,
            indent: indent + 1,
            indent_unit: &self.options.indent_string,
            line_separator: separator,
            current_class: &node.qualified_name,
        };
        let mut tracer = BytecodeMappingTracer::new();
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reconstructor.render_body(&ctx, &mut tracer)
        }));
        let failure = match rendered {
            Ok(Ok(body)) if !body.decompiled_with_errors => {
                out.push_str(&body.text);
                None
            }
            Ok(Ok(_)) => Some("rendered with errors".to_string()),
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
        };
        if let Some(cause) = failure {
            warn!(class = %home.name, method = %method.name, cause = %cause, "lambda body could not be decompiled");
            out.push_str(&self.options.indent_string.repeat(indent + 1));
            out.push_str(PLACEHOLDER);
            out.push_str(separator);
        }
        out.push_str(&self.options.indent_string.repeat(indent));
        out.push('}');
        out
    }

    /// Parameter name from MethodParameters, then the reconstructor, then `paramN`.
    fn parameter_name(
        &self,
        class: &kdecomp_core::ClassRecord,
        method: &kdecomp_core::MethodRecord,
        raw: usize,
        position: usize,
    ) -> String {
        if self.options.use_method_parameters {
            let declared = method
                .parameter_names
                .as_ref()
                .and_then(|names| names.get(raw))
                .filter(|name| !name.is_empty());
            if let Some(name) = declared {
                return name.clone();
            }
        }
        self.reconstructor
            .parameter_name(class, method, raw)
            .unwrap_or_else(|| format!("param{}", position + 1))
    }
}

// ============================================================================
// Shared Rendering Helpers
// ============================================================================

/// Apply Kotlin metadata to a JVM-derived modifier set. Visibility comes
/// from metadata when present, since the JVM cannot express `internal`
/// and property fields are private regardless of the property.
fn with_metadata(mods: ModifierSet, flags: MetadataFlags, owner: OwnerType) -> ModifierSet {
    let visibility = match flags.field(metadata::VISIBILITY) {
        metadata::VISIBILITY_INTERNAL => Modifier::Internal,
        metadata::VISIBILITY_PRIVATE | metadata::VISIBILITY_PRIVATE_TO_THIS => Modifier::Private,
        metadata::VISIBILITY_PROTECTED => Modifier::Protected,
        _ => Modifier::Public,
    };
    [
        Modifier::Public,
        Modifier::Protected,
        Modifier::Private,
        Modifier::Internal,
    ]
    .into_iter()
    .fold(mods, ModifierSet::without)
    .with(visibility)
    .union(ModifierSet::from_metadata(flags, owner))
}

/// `<T : A & B, U>`, or empty.
fn type_parameters(params: &[TypeParameter], names: &dyn TypeNaming) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params
        .iter()
        .map(|p| {
            let bounds = p.visible_bounds();
            if bounds.is_empty() {
                p.name.clone()
            } else {
                let bounds: Vec<String> = bounds.iter().map(|b| b.display_with(names)).collect();
                format!("{} : {}", p.name, bounds.join(" & "))
            }
        })
        .collect();
    format!("<{}>", rendered.join(", "))
}

/// Annotations are stored rendered; add the `@` if it is missing.
fn annotation_line(annotation: &str) -> String {
    if annotation.starts_with('@') {
        annotation.to_string()
    } else {
        format!("@{}", annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdecomp_core::signature::parse_class_signature;
    use kdecomp_core::types::SimpleNames;

    #[test]
    fn phases_run_in_order() {
        let mut phase = EmitPhase::HeaderStart;
        let mut seen = vec![phase];
        while phase != EmitPhase::Done {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            [
                EmitPhase::HeaderStart,
                EmitPhase::Fields,
                EmitPhase::Methods,
                EmitPhase::NestedMembers,
                EmitPhase::Close,
                EmitPhase::Done,
            ]
        );
    }

    #[test]
    fn state_tracks_lines_and_rewinds() {
        let mut st = EmitState::new("a/A", &DecompilerOptions::default());
        st.write_line(0, "class A {");
        let mark = st.mark();
        st.append_text("   x\n   y\n");
        assert_eq!(st.current_line(), 3);
        st.rewind(mark);
        assert_eq!(st.current_line(), 1);
        assert_eq!(st.buf.as_str(), "class A {\n");
    }

    #[test]
    fn metadata_visibility_replaces_jvm_visibility() {
        let jvm = ModifierSet::EMPTY.with(Modifier::Private).with(Modifier::Final);
        let public = MetadataFlags(metadata::VISIBILITY_PUBLIC << 1);
        let mods = with_metadata(jvm, public, OwnerType::Property);
        assert!(mods.contains(Modifier::Public));
        assert!(!mods.contains(Modifier::Private));
        assert!(mods.contains(Modifier::Final));

        let internal = MetadataFlags(0);
        let mods = with_metadata(ModifierSet::EMPTY.with(Modifier::Public), internal, OwnerType::Function);
        assert_eq!(mods.render(OwnerType::Function), "internal");
    }

    #[test]
    fn renders_type_parameters() {
        let sig = parse_class_signature(
            "<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;:Ljava/io/Serializable;>Ljava/lang/Object;",
        )
        .unwrap();
        assert_eq!(
            type_parameters(&sig.type_params, &SimpleNames),
            "<T, U : Comparable<U> & Serializable>"
        );
        assert_eq!(type_parameters(&[], &SimpleNames), "");
    }

    #[test]
    fn annotation_prefix() {
        assert_eq!(annotation_line("Deprecated"), "@Deprecated");
        assert_eq!(annotation_line("@Foo(1)"), "@Foo(1)");
    }

    #[test]
    fn panic_payload_text() {
        let caught = panic::catch_unwind(|| panic!("bad stack at {}", 7)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "bad stack at 7");
        let caught = panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "static text");
        let caught = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "non-string panic payload");
    }
}
