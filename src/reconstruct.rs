//! The body reconstructor seam.
//!
//! Turning bytecode into statements and expressions is not this crate's
//! job. The emitter renders declarations and asks a [`BodyReconstructor`]
//! for everything that needs dataflow analysis: method bodies, field
//! initializers, parameter names the bytecode does not carry, and which
//! members a deduplication pass decided to hide.
//!
//! Implementations must be `Send + Sync`; one reconstructor serves every
//! worker thread. Only [`BodyReconstructor::render_body`] is required.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kdecomp_core::record::method_key;
use kdecomp_core::{
    BytecodeMappingTracer, ClassRecord, DecompileError, DecompileResult, FieldRecord,
    MethodRecord,
};

use crate::lambda::LambdaSite;

// ============================================================================
// Errors
// ============================================================================

/// Why a body could not be produced.
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("unsupported construct in {method}: {message}")]
    Unsupported { method: String, message: String },

    #[error("reconstruction of {method} failed: {message}")]
    Failed { method: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReconstructError {
    pub fn failed(method: impl Into<String>, message: impl Into<String>) -> Self {
        ReconstructError::Failed {
            method: method.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Context and Output
// ============================================================================

/// Everything a reconstructor gets for one method.
#[derive(Debug, Clone, Copy)]
pub struct MethodContext<'a> {
    pub class: &'a ClassRecord,
    pub method: &'a MethodRecord,
    /// Indent level of the body's statements.
    pub indent: usize,
    pub indent_unit: &'a str,
    pub line_separator: &'a str,
    /// Class currently being emitted, which differs from `class` for lambdas.
    pub current_class: &'a str,
}

impl MethodContext<'_> {
    pub fn key(&self) -> String {
        self.method.key()
    }
}

/// A rendered body: statements at the context's indent, one per line,
/// each terminated by the line separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBody {
    pub text: String,
    pub decompiled_with_errors: bool,
}

impl RenderedBody {
    pub fn new(text: impl Into<String>) -> Self {
        RenderedBody {
            text: text.into(),
            decompiled_with_errors: false,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Statement and expression reconstruction, supplied by the caller.
pub trait BodyReconstructor: Send + Sync {
    /// Render a method body. The tracer starts at the body's first line;
    /// advance it as lines are produced and map bytecode offsets to them.
    fn render_body(
        &self,
        ctx: &MethodContext<'_>,
        tracer: &mut BytecodeMappingTracer,
    ) -> Result<RenderedBody, ReconstructError>;

    /// Bytecode offset of the synthetic exit, mapped to the closing brace.
    fn dummy_exit_offset(&self, _ctx: &MethodContext<'_>) -> Option<u32> {
        None
    }

    /// Initializer expression for a field. For enum constants this is the
    /// constructor argument list without parentheses.
    fn field_initializer(&self, _class: &ClassRecord, _field: &FieldRecord) -> Option<String> {
        None
    }

    /// `name descriptor` keys of fields and methods, and qualified names of
    /// nested classes, that must not be emitted.
    fn hidden_members(&self, _class: &ClassRecord) -> HashSet<String> {
        HashSet::new()
    }

    /// Name of the parameter in JVM position `index`.
    fn parameter_name(&self, _class: &ClassRecord, _method: &MethodRecord, _index: usize) -> Option<String> {
        None
    }

    /// Per-parameter flags marking compiler-added parameters. Overrides the
    /// built-in outer-instance detection for constructors.
    fn synthetic_parameters(&self, _class: &ClassRecord, _method: &MethodRecord) -> Option<Vec<bool>> {
        None
    }

    /// Lambda and method-reference call sites in `class`.
    fn lambda_sites(&self, _class: &ClassRecord) -> Vec<LambdaSite> {
        Vec::new()
    }

    /// Called once per class before its root is emitted, in scheduler order.
    fn prepare_class(&self, _class: &ClassRecord) {}
}

// ============================================================================
// Prerendered Bodies
// ============================================================================

/// A reconstructor backed by text rendered ahead of time.
///
/// Bodies are keyed `"class name descriptor"` and hold unindented lines
/// separated by `\n`. Missing bodies render empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrerenderedBodies {
    pub bodies: HashMap<String, String>,
    /// Keyed `"class name descriptor"` like bodies.
    pub initializers: HashMap<String, String>,
    /// Keyed by class, values as for [`BodyReconstructor::hidden_members`].
    pub hidden: HashMap<String, Vec<String>>,
    pub lambdas: HashMap<String, Vec<LambdaSite>>,
}

impl PrerenderedBodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> DecompileResult<Self> {
        serde_json::from_str(json).map_err(DecompileError::from)
    }

    pub fn from_json_file(path: &Path) -> DecompileResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_body(mut self, class: &str, name: &str, descriptor: &str, text: &str) -> Self {
        self.bodies
            .insert(member_key(class, name, descriptor), text.to_string());
        self
    }
}

/// `"class name descriptor"`.
pub fn member_key(class: &str, name: &str, descriptor: &str) -> String {
    format!("{} {}", class, method_key(name, descriptor))
}

impl BodyReconstructor for PrerenderedBodies {
    fn render_body(
        &self,
        ctx: &MethodContext<'_>,
        tracer: &mut BytecodeMappingTracer,
    ) -> Result<RenderedBody, ReconstructError> {
        let key = member_key(&ctx.class.name, &ctx.method.name, &ctx.method.descriptor);
        let Some(source) = self.bodies.get(&key) else {
            return Ok(RenderedBody::default());
        };

        let indent = ctx.indent_unit.repeat(ctx.indent);
        let mut offsets = ctx.method.line_numbers.iter().map(|l| l.start_pc);
        let mut text = String::new();
        for line in source.lines() {
            if let Some(offset) = offsets.next() {
                tracer.add_mapping(offset);
            }
            text.push_str(&indent);
            text.push_str(line);
            text.push_str(ctx.line_separator);
            tracer.increment_current_source_line();
        }
        Ok(RenderedBody::new(text))
    }

    fn field_initializer(&self, class: &ClassRecord, field: &FieldRecord) -> Option<String> {
        self.initializers
            .get(&member_key(&class.name, &field.name, &field.descriptor))
            .cloned()
    }

    fn hidden_members(&self, class: &ClassRecord) -> HashSet<String> {
        self.hidden
            .get(&class.name)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lambda_sites(&self, class: &ClassRecord) -> Vec<LambdaSite> {
        self.lambdas.get(&class.name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdecomp_core::record::LineNumber;
    use kdecomp_core::AccessFlags;

    fn context<'a>(class: &'a ClassRecord, method: &'a MethodRecord) -> MethodContext<'a> {
        MethodContext {
            class,
            method,
            indent: 2,
            indent_unit: "  ",
            line_separator: "\n",
            current_class: &class.name,
        }
    }

    #[test]
    fn prerendered_body_is_indented_and_traced() {
        let class = ClassRecord::new("a/A", AccessFlags::PUBLIC);
        let mut method = MethodRecord::new("run", "()V", AccessFlags::PUBLIC);
        method.line_numbers = vec![
            LineNumber { start_pc: 0, line: 10 },
            LineNumber { start_pc: 4, line: 11 },
        ];
        let bodies = PrerenderedBodies::new().with_body("a/A", "run", "()V", "foo();\nreturn;");

        let mut tracer = BytecodeMappingTracer::starting_at(5);
        let body = bodies.render_body(&context(&class, &method), &mut tracer).unwrap();
        assert_eq!(body.text, "    foo();\n    return;\n");
        assert_eq!(tracer.current_source_line(), 7);
        assert_eq!(tracer.mapping().get(&0), Some(&5));
        assert_eq!(tracer.mapping().get(&4), Some(&6));
    }

    #[test]
    fn missing_body_is_empty() {
        let class = ClassRecord::new("a/A", AccessFlags::PUBLIC);
        let method = MethodRecord::new("run", "()V", AccessFlags::PUBLIC);
        let mut tracer = BytecodeMappingTracer::new();
        let body = PrerenderedBodies::new()
            .render_body(&context(&class, &method), &mut tracer)
            .unwrap();
        assert!(body.is_blank());
    }

    #[test]
    fn reads_json() {
        let json = r#"{
            "bodies": {"a/A run ()V": "return;"},
            "initializers": {"a/A count I": "42"},
            "hidden": {"a/A": ["helper ()V"]},
            "lambdas": {"a/A": [{
                "interface_type": "java/lang/Runnable",
                "method_name": "run",
                "method_descriptor": "()V",
                "content_class": "a/A",
                "content_method": "lambda$0",
                "content_descriptor": "()V",
                "invocation": 6
            }]}
        }"#;
        let bodies = PrerenderedBodies::from_json_str(json).unwrap();
        let class = ClassRecord::new("a/A", AccessFlags::PUBLIC);
        let field = FieldRecord::new("count", "I", AccessFlags::PRIVATE);
        assert_eq!(bodies.field_initializer(&class, &field).as_deref(), Some("42"));
        assert!(bodies.hidden_members(&class).contains("helper ()V"));
        assert_eq!(bodies.lambda_sites(&class).len(), 1);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(PrerenderedBodies::from_json_str("[1, 2").is_err());
    }
}
