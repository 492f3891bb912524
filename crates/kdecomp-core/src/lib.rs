//! Core data model for kdecomp.
//!
//! This crate holds everything the reconstruction layer consumes but does not
//! own: parsed class records and the index that serves them, the two flag
//! universes (JVM access flags and Kotlin metadata flags), the unified
//! modifier vocabulary, the JVM type model with its descriptor and signature
//! parsers, and the text/line-tracing primitives used during emission.
//!
//! Nothing in here knows about class nodes or nesting. That lives in the
//! `kdecomp` crate, which builds on these types.

pub mod access;
pub mod error;
pub mod metadata;
pub mod modifier;
pub mod options;
pub mod record;
pub mod signature;
pub mod source;
pub mod text;
pub mod tracer;
pub mod types;

pub use access::AccessFlags;
pub use error::{DecompileError, DecompileResult};
pub use modifier::{Modifier, ModifierSet, OwnerType};
pub use options::DecompilerOptions;
pub use record::{ClassRecord, FieldRecord, InnerClassEntry, MethodRecord};
pub use source::{ClassSet, RecordSource, Renamer};
pub use text::TextBuffer;
pub use tracer::{BytecodeMappingTracer, SourceMapper};
pub use types::VarType;
