//! Decompiler options.
//!
//! Options resolve in three layers, lowest precedence first:
//!
//! 1. built-in defaults ([`DecompilerOptions::default`])
//! 2. a JSON options file ([`DecompilerOptions::from_json_file`])
//! 3. explicit command-line flags (applied by the binary afterwards)
//!
//! Missing keys in the file keep their defaults. Options are read-only once
//! emission starts and are shared by reference across worker threads.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DecompileError, DecompileResult};
use crate::text::DEFAULT_INDENT;

/// All switches the structural layer consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecompilerOptions {
    /// Attach nested classes to their enclosing classes.
    pub decompile_inner: bool,
    /// Re-check anonymous candidates against the enclosing method's bytecode.
    pub verify_anonymous_classes: bool,
    /// Hide synthetic classes, fields and methods.
    pub remove_synthetic: bool,
    /// Hide bridge methods.
    pub remove_bridge: bool,
    /// Elide a lone empty default constructor.
    pub hide_default_constructor: bool,
    /// Render enums with enum syntax.
    pub decompile_enum: bool,
    /// Use generic signatures instead of erased descriptors.
    pub decompile_generic_signatures: bool,
    /// Warn when inner-class records disagree.
    pub warn_inconsistent_inner_classes: bool,
    /// Append the offset → line table to each emitted file.
    pub bytecode_source_mapping: bool,
    /// Prefer `MethodParameters` names over reconstructed ones.
    pub use_method_parameters: bool,
    pub indent_string: String,
    pub line_separator: String,
    /// Qualified-name prefixes that may be emitted. Empty allows all.
    pub allowed_prefixes: Vec<String>,
}

impl Default for DecompilerOptions {
    fn default() -> Self {
        DecompilerOptions {
            decompile_inner: true,
            verify_anonymous_classes: true,
            remove_synthetic: false,
            remove_bridge: true,
            hide_default_constructor: true,
            decompile_enum: true,
            decompile_generic_signatures: true,
            warn_inconsistent_inner_classes: true,
            bytecode_source_mapping: false,
            use_method_parameters: true,
            indent_string: DEFAULT_INDENT.to_string(),
            line_separator: "\n".to_string(),
            allowed_prefixes: Vec::new(),
        }
    }
}

impl DecompilerOptions {
    pub fn from_json_str(json: &str) -> DecompileResult<Self> {
        serde_json::from_str(json).map_err(|e| DecompileError::InvalidArguments {
            message: format!("invalid options: {}", e),
        })
    }

    pub fn from_json_file(path: &Path) -> DecompileResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// True if `name` passes the allow-list.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed_prefixes.is_empty() || self.allowed_prefixes.iter().any(|p| name.starts_with(p))
    }
}
