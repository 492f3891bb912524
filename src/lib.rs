//! kdecomp: structural and metadata reconstruction for JVM class files.
//!
//! Turns a flat set of parsed class records into trees of nested, local,
//! anonymous and lambda classes, reconciles JVM access flags with Kotlin
//! metadata, resolves generic substitutions across the inheritance graph,
//! and emits Kotlin-style declarations with a bytecode-offset to source-line
//! trace. Method bodies come from a pluggable [`BodyReconstructor`].

// Data model - re-exported from kdecomp-core
pub use kdecomp_core::{access, error, metadata, modifier, options, record, signature, source, text, tracer, types};

// Topology
pub mod lambda;
pub mod topology;
pub mod verify;

// Type resolution
pub mod generics;

// Emission
pub mod context;
pub mod emit;
pub mod reconstruct;
pub mod schedule;

// Driver
pub mod processor;

pub use emit::{ClassEmitter, EmitState, ImportCollector};
pub use generics::{GenericHierarchy, GenericResolver, HierarchyError};
pub use kdecomp_core::{ClassRecord, ClassSet, DecompileError, DecompileResult, DecompilerOptions};
pub use processor::{ClassOutput, Decompiler};
pub use reconstruct::{BodyReconstructor, PrerenderedBodies, ReconstructError};
pub use topology::{ClassKind, ClassNode, ClassTree, NodeId, Topology, TopologyBuilder};
