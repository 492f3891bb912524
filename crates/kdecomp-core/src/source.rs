//! Collaborator traits and the in-memory class-set index.
//!
//! The reconstruction layer talks to the outside world through two traits:
//!
//! - [`RecordSource`] serves parsed class records by qualified name.
//! - [`Renamer`] decides which names need replacing and supplies new ones.
//!
//! [`ClassSet`] is the standard `RecordSource`: an immutable map of records
//! shared behind `Arc`, safe for concurrent lookups from every worker thread
//! without locking. Lazily parsed class signatures live in a separate
//! concurrent pool that [`RecordSource::release_resources`] drains after a
//! root class has been emitted.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::DecompileResult;
use crate::record::{ClassRecord, Instruction, MethodRecord};
use crate::signature::ClassSignature;

// ============================================================================
// Record Source
// ============================================================================

/// Read-only access to parsed class records.
pub trait RecordSource: Send + Sync {
    /// Look up a class by qualified internal name.
    fn lookup(&self, name: &str) -> Option<Arc<ClassRecord>>;

    /// Classes this run is responsible for emitting, in load order.
    fn own_classes(&self) -> Vec<Arc<ClassRecord>>;

    /// Bytecode of a method. Implementations backed by files may fail.
    fn instructions(
        &self,
        _class: &ClassRecord,
        method: &MethodRecord,
    ) -> io::Result<Option<Vec<Instruction>>> {
        Ok(method.code.clone())
    }

    /// Parsed generic signature of a class, `None` if absent or malformed.
    fn class_signature(&self, class: &ClassRecord) -> Option<Arc<ClassSignature>> {
        parse_signature_logged(class)
    }

    /// Drop lazily built data held for `name`. Structural data stays.
    fn release_resources(&self, _name: &str) {}
}

fn parse_signature_logged(class: &ClassRecord) -> Option<Arc<ClassSignature>> {
    match class.class_signature()? {
        Ok(sig) => Some(Arc::new(sig)),
        Err(e) => {
            debug!(class = %class.name, error = %e, "ignoring malformed class signature");
            None
        }
    }
}

// ============================================================================
// Class Set
// ============================================================================

/// In-memory class-set index keyed by qualified name.
#[derive(Default)]
pub struct ClassSet {
    records: HashMap<String, Arc<ClassRecord>>,
    order: Vec<String>,
    signatures: DashMap<String, Option<Arc<ClassSignature>>>,
}

impl ClassSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ClassRecord>) -> Self {
        let mut set = ClassSet::new();
        for record in records {
            set.insert(record);
        }
        set
    }

    /// Add a record. A later record with the same name replaces the earlier one.
    pub fn insert(&mut self, record: ClassRecord) {
        let name = record.name.clone();
        if self.records.insert(name.clone(), Arc::new(record)).is_none() {
            self.order.push(name);
        }
    }

    /// Load a JSON array of class records.
    pub fn from_json_str(json: &str) -> DecompileResult<Self> {
        let records: Vec<ClassRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    pub fn from_json_file(path: &Path) -> DecompileResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of lazily parsed signatures currently pooled.
    pub fn pooled_signatures(&self) -> usize {
        self.signatures.len()
    }
}

impl RecordSource for ClassSet {
    fn lookup(&self, name: &str) -> Option<Arc<ClassRecord>> {
        self.records.get(name).cloned()
    }

    fn own_classes(&self) -> Vec<Arc<ClassRecord>> {
        self.order
            .iter()
            .filter_map(|name| self.records.get(name))
            .filter(|r| r.own)
            .cloned()
            .collect()
    }

    fn class_signature(&self, class: &ClassRecord) -> Option<Arc<ClassSignature>> {
        if let Some(cached) = self.signatures.get(&class.name) {
            return cached.clone();
        }
        let parsed = parse_signature_logged(class);
        self.signatures.insert(class.name.clone(), parsed.clone());
        parsed
    }

    fn release_resources(&self, name: &str) {
        self.signatures.remove(name);
    }
}

// ============================================================================
// Renaming
// ============================================================================

/// What kind of element a rename query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameKind {
    Class,
    Field,
    Method,
}

/// Pluggable renaming policy.
pub trait Renamer: Send + Sync {
    fn should_rename(&self, kind: RenameKind, name: &str) -> bool;

    /// A replacement simple name for a class.
    fn next_name(&self, qualified: &str, simple: &str) -> String;
}

/// Never renames anything.
pub struct NoRenamer;

impl Renamer for NoRenamer {
    fn should_rename(&self, _kind: RenameKind, _name: &str) -> bool {
        false
    }

    fn next_name(&self, _qualified: &str, simple: &str) -> String {
        simple.to_string()
    }
}

const RESERVED: &[&str] = &[
    "abstract", "as", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "fun", "goto", "if", "implements", "import", "in", "instanceof",
    "int", "interface", "is", "long", "native", "new", "null", "object", "package", "private",
    "protected", "public", "return", "short", "static", "strictfp", "super", "switch",
    "synchronized", "this", "throw", "throws", "transient", "true", "try", "typealias",
    "typeof", "val", "var", "void", "volatile", "when", "while",
];

/// Renames classes whose simple name is a reserved word or not a valid
/// identifier (common in obfuscated jars) to `class_N`.
#[derive(Default)]
pub struct ReservedWordRenamer {
    counter: AtomicUsize,
}

impl ReservedWordRenamer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renamer for ReservedWordRenamer {
    fn should_rename(&self, _kind: RenameKind, name: &str) -> bool {
        let valid_start = name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$');
        !valid_start || RESERVED.contains(&name)
    }

    fn next_name(&self, _qualified: &str, _simple: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("class_{}", n)
    }
}
