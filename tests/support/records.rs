//! Class-record builders for integration tests.
//!
//! Records default to `java/lang/Object` as superclass and carry no
//! InnerClasses attribute until one of the `nest_*` helpers adds it to both
//! sides, the way javac writes it.

#![allow(dead_code)]

use std::sync::Arc;

use kdecomp::access::AccessFlags;
use kdecomp::record::{EnclosingMethod, InnerClassEntry, Instruction, MethodRecord, Opcode, INIT};
use kdecomp::source::NoRenamer;
use kdecomp::{BodyReconstructor, ClassRecord, ClassSet, Decompiler, DecompilerOptions};

pub fn class(name: &str, access: AccessFlags) -> ClassRecord {
    ClassRecord::new(name, access)
}

/// A public final class with one public no-arg constructor.
pub fn plain(name: &str) -> ClassRecord {
    let mut record = class(name, AccessFlags::PUBLIC | AccessFlags::FINAL);
    record.methods.push(constructor(AccessFlags::PUBLIC));
    record
}

pub fn constructor(access: AccessFlags) -> MethodRecord {
    MethodRecord::new(INIT, "()V", access)
}

pub fn method(name: &str, descriptor: &str, access: AccessFlags) -> MethodRecord {
    MethodRecord::new(name, descriptor, access)
}

pub fn member_entry(inner: &str, outer: &str, simple: &str, access: AccessFlags) -> InnerClassEntry {
    InnerClassEntry {
        inner_name: inner.to_string(),
        outer_name: Some(outer.to_string()),
        simple_name: Some(simple.to_string()),
        access,
    }
}

pub fn anonymous_entry(inner: &str) -> InnerClassEntry {
    InnerClassEntry {
        inner_name: inner.to_string(),
        outer_name: None,
        simple_name: None,
        access: AccessFlags::FINAL,
    }
}

pub fn push_entry(record: &mut ClassRecord, entry: InnerClassEntry) {
    record.inner_classes.get_or_insert_with(Vec::new).push(entry);
}

/// Record `inner` as a member of `outer` in both class files.
pub fn nest_member(outer: &mut ClassRecord, inner: &mut ClassRecord, simple: &str, access: AccessFlags) {
    let entry = member_entry(&inner.name, &outer.name, simple, access);
    push_entry(outer, entry.clone());
    push_entry(inner, entry);
}

/// Record `inner` as an anonymous class created in `outer.method_name`.
/// The enclosing method gets a single `new inner` instruction.
pub fn nest_anonymous(outer: &mut ClassRecord, inner: &mut ClassRecord, method_name: &str) {
    let entry = anonymous_entry(&inner.name);
    push_entry(outer, entry.clone());
    push_entry(inner, entry);
    inner.enclosing_method = Some(EnclosingMethod {
        class: outer.name.clone(),
        method_name: Some(method_name.to_string()),
        descriptor: Some("()V".to_string()),
    });

    let new = Instruction::new(Opcode::New, inner.name.clone());
    match outer.methods.iter().position(|m| m.name == method_name) {
        Some(i) => outer.methods[i].code.get_or_insert_with(Vec::new).push(new),
        None => outer
            .methods
            .push(method(method_name, "()V", AccessFlags::PUBLIC).with_code(vec![new])),
    }
}

pub fn class_set(records: Vec<ClassRecord>) -> Arc<ClassSet> {
    Arc::new(ClassSet::from_records(records))
}

pub fn decompiler(records: Vec<ClassRecord>, reconstructor: impl BodyReconstructor + 'static) -> Decompiler {
    decompiler_with(records, DecompilerOptions::default(), reconstructor)
}

pub fn decompiler_with(
    records: Vec<ClassRecord>,
    options: DecompilerOptions,
    reconstructor: impl BodyReconstructor + 'static,
) -> Decompiler {
    Decompiler::new(class_set(records), options, Box::new(NoRenamer), Box::new(reconstructor))
}

/// Emit the root containing `name` and return its text.
pub fn emit(decompiler: &Decompiler, name: &str) -> String {
    let mut topology = decompiler.load_classes();
    match decompiler.write_named(&mut topology, name) {
        Ok(output) => output.text,
        Err(e) => panic!("emitting {} failed: {}", name, e),
    }
}
