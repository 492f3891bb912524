//! Lambda node synthesis.
//!
//! Lambdas and method references compile to an `invokedynamic` call site
//! plus, for lambdas, a synthetic method in the same class holding the body.
//! An external collaborator finds the call sites; this module turns each
//! into a [`ClassKind::Lambda`] node under its home class, so the emitter
//! can treat it like any other nested class.
//!
//! Lambda nodes are transient. They are added when a root is about to be
//! emitted and removed again by [`ClassTree::detach_transient`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use kdecomp_core::AccessFlags;

use crate::topology::{ClassKind, ClassNode, ClassTree, NodeId};

// ============================================================================
// Method Handle Kinds
// ============================================================================

/// `MethodHandle` reference kinds (JVMS §4.4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = UnknownReferenceKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => ReferenceKind::GetField,
            2 => ReferenceKind::GetStatic,
            3 => ReferenceKind::PutField,
            4 => ReferenceKind::PutStatic,
            5 => ReferenceKind::InvokeVirtual,
            6 => ReferenceKind::InvokeStatic,
            7 => ReferenceKind::InvokeSpecial,
            8 => ReferenceKind::NewInvokeSpecial,
            9 => ReferenceKind::InvokeInterface,
            other => return Err(UnknownReferenceKind(other)),
        })
    }
}

impl From<ReferenceKind> for u8 {
    fn from(kind: ReferenceKind) -> u8 {
        kind as u8
    }
}

/// A reference kind outside 1..=9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownReferenceKind(pub u8);

impl fmt::Display for UnknownReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown method handle reference kind {}", self.0)
    }
}

// ============================================================================
// Call Sites and Lambda Info
// ============================================================================

/// A lambda or method-reference call site, as found by the body reconstructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaSite {
    /// Functional interface the call site produces.
    pub interface_type: String,
    /// Name of the interface's single abstract method.
    pub method_name: String,
    /// Erased descriptor of the single abstract method.
    pub method_descriptor: String,
    /// Class declaring the target method.
    pub content_class: String,
    pub content_method: String,
    pub content_descriptor: String,
    pub invocation: ReferenceKind,
    /// `name descriptor` of the home-class method containing the call site.
    #[serde(default)]
    pub enclosing_method: Option<String>,
}

/// What a Lambda node captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaInfo {
    pub site: LambdaSite,
    /// True for `Type::method` references, false for compiled lambda bodies.
    pub is_method_reference: bool,
    pub is_content_method_static: bool,
}

impl LambdaInfo {
    /// Classify a call site relative to its home class.
    ///
    /// A target in another class is always a method reference. A target in
    /// the home class is a lambda body when the compiler generated it
    /// (synthetic) and a method reference when the user wrote it.
    pub fn classify(site: LambdaSite, home: &kdecomp_core::ClassRecord) -> Self {
        let is_method_reference = if site.content_class != home.name {
            true
        } else {
            match home.method(&site.content_method, &site.content_descriptor) {
                Some(method) => !method.is_synthetic(),
                None => {
                    debug!(
                        class = %home.name,
                        method = %site.content_method,
                        "lambda target not found in home class, treating as method reference"
                    );
                    true
                }
            }
        };
        let is_content_method_static = site.invocation == ReferenceKind::InvokeStatic;
        LambdaInfo {
            site,
            is_method_reference,
            is_content_method_static,
        }
    }
}

// ============================================================================
// Synthesis
// ============================================================================

/// Attach a Lambda node for `site` under `home`. `index` distinguishes
/// multiple sites in the same class.
pub fn synthesize(tree: &mut ClassTree, home: NodeId, site: LambdaSite, index: usize) -> NodeId {
    let record = tree[home].record.clone();
    let enclosing_method = site.enclosing_method.clone();
    let info = LambdaInfo::classify(site, &record);
    let qualified_name = format!("{}##Lambda_{}", record.name, index);

    let mut node = ClassNode::new(record, ClassKind::Lambda);
    node.qualified_name = qualified_name;
    node.simple_name = None;
    node.access = if info.is_content_method_static {
        AccessFlags::STATIC
    } else {
        AccessFlags::empty()
    };
    node.enclosing_method = enclosing_method;
    node.lambda = Some(info);

    tree.add_transient_child(home, node)
}
