//! Integration tests for class topology resolution.
//!
//! These build topologies from hand-made class sets and check the shape of
//! the resulting forest: every class placed exactly once, claim resolution
//! independent of load order, and anonymous-class verification.

mod support;

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use kdecomp::access::AccessFlags;
use kdecomp::record::{Instruction, MethodRecord, Opcode};
use kdecomp::source::{NoRenamer, RecordSource};
use kdecomp::topology::OutlineNode;
use kdecomp::{verify, ClassKind, ClassRecord, ClassSet, DecompilerOptions, Topology, TopologyBuilder};

use support::records::{class, member_entry, nest_anonymous, nest_member, plain, push_entry};

fn build(records: Vec<ClassRecord>) -> Topology {
    let set = ClassSet::from_records(records);
    TopologyBuilder::new(&set, &NoRenamer, &DecompilerOptions::default()).build()
}

fn outlines(topology: &Topology) -> Vec<OutlineNode> {
    topology.trees().map(|t| t.outline()).collect()
}

/// Outer { A { B }, anonymous 1 } and an unrelated Other.
fn nested_set() -> Vec<ClassRecord> {
    let mut outer = plain("a/Outer");
    let mut a = plain("a/Outer$A");
    let mut b = plain("a/Outer$A$B");
    let mut anon = class("a/Outer$1", AccessFlags::FINAL);
    anon.interfaces = vec!["java/lang/Runnable".to_string()];

    nest_member(&mut outer, &mut a, "A", AccessFlags::PUBLIC | AccessFlags::STATIC);
    nest_member(&mut a, &mut b, "B", AccessFlags::PUBLIC);
    nest_anonymous(&mut outer, &mut anon, "start");
    vec![outer, a, b, anon, plain("a/Other")]
}

// ============================================================================
// Forest Shape
// ============================================================================

#[test]
fn every_class_lands_in_exactly_one_tree() {
    let records = nested_set();
    let expected: BTreeSet<String> = records.iter().map(|r| r.name.clone()).collect();
    let topology = build(records);

    let mut seen = Vec::new();
    for tree in topology.trees() {
        for (id, node) in tree.iter() {
            seen.push(node.qualified_name.clone());
            match node.parent {
                None => assert_eq!(id, tree.root()),
                Some(parent) => assert!(tree.children(parent).contains(&id)),
            }
        }
    }
    let unique: BTreeSet<String> = seen.iter().cloned().collect();
    assert_eq!(seen.len(), unique.len(), "a class appears twice: {:?}", seen);
    assert_eq!(unique, expected);

    let roots: Vec<&str> = topology.roots().collect();
    assert_eq!(roots, ["a/Other", "a/Outer"]);
}

#[test]
fn nesting_follows_inner_class_claims() {
    let topology = build(nested_set());
    let tree = topology.tree("a/Outer").unwrap();

    let a = tree.find("a/Outer$A").unwrap();
    let b = tree.find("a/Outer$A$B").unwrap();
    let anon = tree.find("a/Outer$1").unwrap();
    assert_eq!(tree[a].parent, Some(tree.root()));
    assert_eq!(tree[b].parent, Some(a));
    assert_eq!(tree[anon].parent, Some(tree.root()));
    assert_eq!(tree.depth(b), 2);

    assert_eq!(tree[a].kind, ClassKind::Member);
    assert_eq!(tree[b].kind, ClassKind::Member);
    assert_eq!(tree[anon].kind, ClassKind::Anonymous);
    assert_eq!(tree[anon].enclosing_method.as_deref(), Some("start ()V"));
    assert_eq!(topology.owner_of("a/Outer$A$B"), Some("a/Outer"));
}

#[test]
fn self_nesting_entry_does_not_create_a_cycle() {
    let mut outer = plain("a/Outer");
    let mut inner = plain("a/Outer$In");
    nest_member(&mut outer, &mut inner, "In", AccessFlags::PUBLIC);
    // A corrupt entry claiming Outer is nested in its own member.
    push_entry(
        &mut inner,
        member_entry("a/Outer", "a/Outer$In", "Outer", AccessFlags::PUBLIC),
    );

    let topology = build(vec![outer, inner]);
    let total: usize = topology.trees().map(|t| t.len()).sum();
    assert_eq!(total, 2);
}

// ============================================================================
// Claim Priority
// ============================================================================

fn conflicting_claims() -> Vec<ClassRecord> {
    let mut outer = plain("a/Outer");
    let mut inner = plain("a/Outer$In");
    let mut user = plain("a/User");
    push_entry(
        &mut outer,
        member_entry("a/Outer$In", "a/Outer", "In", AccessFlags::PUBLIC | AccessFlags::STATIC),
    );
    push_entry(
        &mut inner,
        member_entry("a/Outer$In", "a/Outer", "In", AccessFlags::PRIVATE | AccessFlags::STATIC),
    );
    push_entry(
        &mut user,
        member_entry("a/Outer$In", "a/Outer", "In", AccessFlags::PROTECTED | AccessFlags::STATIC),
    );
    vec![outer, inner, user]
}

#[test]
fn claim_resolution_ignores_load_order() {
    let records = conflicting_claims();
    let forward = build(records.clone());

    let mut reversed = records.clone();
    reversed.reverse();
    let mut rotated = records;
    rotated.rotate_left(1);

    let expected = outlines(&forward);
    assert_eq!(outlines(&build(reversed)), expected);
    assert_eq!(outlines(&build(rotated)), expected);

    let tree = forward.tree("a/Outer").unwrap();
    let id = tree.find("a/Outer$In").unwrap();
    assert_eq!(tree[id].access, AccessFlags::PRIVATE | AccessFlags::STATIC);
}

// ============================================================================
// Anonymous Verification
// ============================================================================

#[test]
fn verifier_answers_are_stable() {
    let records = nested_set();
    let set = ClassSet::from_records(records.clone());
    let outer = &records[0];
    let anon = &records[3];

    let first = verify::is_anonymous(anon, outer, &set);
    let second = verify::is_anonymous(anon, outer, &set);
    assert!(first);
    assert_eq!(first, second);

    let options = DecompilerOptions::default();
    let once = TopologyBuilder::new(&set, &NoRenamer, &options).build();
    let twice = TopologyBuilder::new(&set, &NoRenamer, &options).build();
    assert_eq!(outlines(&once), outlines(&twice));
}

#[test]
fn anonymous_class_created_twice_becomes_local() {
    let mut records = nested_set();
    let start = records[0]
        .methods
        .iter_mut()
        .find(|m| m.name == "start")
        .unwrap();
    start
        .code
        .get_or_insert_with(Vec::new)
        .push(Instruction::new(Opcode::New, "a/Outer$1"));

    let topology = build(records);
    let tree = topology.tree("a/Outer").unwrap();
    let id = tree.find("a/Outer$1").unwrap();
    assert_eq!(tree[id].kind, ClassKind::Local);
    assert_eq!(tree[id].access, AccessFlags::FINAL);
    assert_eq!(tree[id].display_name(), "1");
}

#[test]
fn unverified_anonymous_class_is_trusted() {
    let mut records = nested_set();
    records[0].methods.retain(|m| m.name != "start");
    let set = ClassSet::from_records(records);
    let options = DecompilerOptions {
        verify_anonymous_classes: false,
        ..DecompilerOptions::default()
    };

    let topology = TopologyBuilder::new(&set, &NoRenamer, &options).build();
    let tree = topology.tree("a/Outer").unwrap();
    let id = tree.find("a/Outer$1").unwrap();
    assert_eq!(tree[id].kind, ClassKind::Anonymous);
}

/// A class set whose bytecode cannot be read back.
struct UnreadableCode(ClassSet);

impl RecordSource for UnreadableCode {
    fn lookup(&self, name: &str) -> Option<Arc<ClassRecord>> {
        self.0.lookup(name)
    }

    fn own_classes(&self) -> Vec<Arc<ClassRecord>> {
        self.0.own_classes()
    }

    fn instructions(&self, class: &ClassRecord, _method: &MethodRecord) -> io::Result<Option<Vec<Instruction>>> {
        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("truncated class file {}", class.name),
        ))
    }
}

#[test]
fn unreadable_enclosing_bytecode_means_not_anonymous() {
    let records = nested_set();
    let source = UnreadableCode(ClassSet::from_records(records.clone()));
    assert!(!verify::is_anonymous(&records[3], &records[0], &source));

    let topology = TopologyBuilder::new(&source, &NoRenamer, &DecompilerOptions::default()).build();
    let tree = topology.tree("a/Outer").unwrap();
    let id = tree.find("a/Outer$1").unwrap();
    assert_eq!(tree[id].kind, ClassKind::Local);
    assert_eq!(tree[id].access, AccessFlags::FINAL);
}
