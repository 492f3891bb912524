//! Class topology.
//!
//! Every class file is a top-level unit to the JVM, but the source it came
//! from nests member, local and anonymous classes inside one another. The
//! InnerClasses attribute of each class records claims about that nesting,
//! and different class files may disagree. This module collects the claims,
//! settles conflicts by priority, and assembles a forest of [`ClassTree`]s,
//! one per class that is emitted as its own file.
//!
//! Each tree is an arena indexed by [`NodeId`]. Parent and child links are
//! ids, so a tree can be moved to a worker thread and mutated there without
//! touching any other tree.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kdecomp_core::source::RenameKind;
use kdecomp_core::{AccessFlags, ClassRecord, DecompilerOptions, RecordSource, Renamer, VarType};

use crate::lambda::LambdaInfo;
use crate::verify;

// ============================================================================
// Nodes
// ============================================================================

/// How a class sits in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Emitted as its own compilation unit.
    Root,
    /// Named member of another class.
    Member,
    /// Anonymous class expression.
    Anonymous,
    /// Named class declared inside a method body.
    Local,
    /// Synthesized for a lambda or method reference.
    Lambda,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassKind::Root => "root",
            ClassKind::Member => "member",
            ClassKind::Anonymous => "anonymous",
            ClassKind::Local => "local",
            ClassKind::Lambda => "lambda",
        };
        f.write_str(s)
    }
}

/// Index of a node within its [`ClassTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One class in the topology.
#[derive(Debug, Clone)]
pub struct ClassNode {
    pub kind: ClassKind,
    /// Effective access flags. For nested classes these come from the
    /// winning InnerClasses entry, not the class file header.
    pub access: AccessFlags,
    /// Source-level name. `None` for anonymous and lambda nodes.
    pub simple_name: Option<String>,
    pub qualified_name: String,
    /// Original simple name when the renamer replaced it.
    pub renamed_from: Option<String>,
    pub record: Arc<ClassRecord>,
    pub parent: Option<NodeId>,
    /// Sorted by qualified name.
    pub children: Vec<NodeId>,
    /// Classes claimed to enclose this one.
    pub enclosing_classes: BTreeSet<String>,
    /// Supertype an anonymous class instantiates.
    pub anonymous_type: Option<VarType>,
    /// `name descriptor` of the method this class is declared in.
    pub enclosing_method: Option<String>,
    pub lambda: Option<LambdaInfo>,
    /// Set when any member of this class failed to render.
    pub decompiled_with_errors: bool,
}

impl ClassNode {
    pub fn new(record: Arc<ClassRecord>, kind: ClassKind) -> Self {
        ClassNode {
            kind,
            access: record.access,
            simple_name: Some(record.simple_name().to_string()),
            qualified_name: record.name.clone(),
            renamed_from: None,
            parent: None,
            children: Vec::new(),
            enclosing_classes: BTreeSet::new(),
            anonymous_type: None,
            enclosing_method: record
                .enclosing_method
                .as_ref()
                .and_then(|m| Some(format!("{} {}", m.method_name.as_ref()?, m.descriptor.as_deref()?))),
            lambda: None,
            decompiled_with_errors: false,
            record,
        }
    }

    /// Name used in declarations. Local classes demoted from anonymous have
    /// no simple name, so fall back to the last `$` segment.
    pub fn display_name(&self) -> &str {
        match &self.simple_name {
            Some(name) => name,
            None => {
                let base = kdecomp_core::types::simple_name(&self.qualified_name);
                base.rsplit('$').next().unwrap_or(base)
            }
        }
    }

    pub fn is_lambda(&self) -> bool {
        self.kind == ClassKind::Lambda
    }
}

// ============================================================================
// Trees
// ============================================================================

/// A root class and everything nested inside it.
#[derive(Debug, Clone)]
pub struct ClassTree {
    nodes: Vec<ClassNode>,
    by_name: HashMap<String, NodeId>,
    /// Nodes at or past this index are transient (lambda nodes).
    persistent_len: usize,
}

impl ClassTree {
    /// A tree of one root node.
    pub fn single(record: Arc<ClassRecord>) -> Self {
        Self::from_nodes(vec![ClassNode::new(record, ClassKind::Root)])
    }

    /// Build from nodes in preorder with ids already local to the tree.
    fn from_nodes(nodes: Vec<ClassNode>) -> Self {
        let by_name = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.qualified_name.clone(), NodeId(i)))
            .collect();
        let persistent_len = nodes.len();
        ClassTree {
            nodes,
            by_name,
            persistent_len,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_name(&self) -> &str {
        &self.nodes[0].qualified_name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&ClassNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, qualified_name: &str) -> Option<NodeId> {
        self.by_name.get(qualified_name).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ClassNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// `id` and all nodes below it, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Number of ancestors of `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Attach a node that lives only for the current emission.
    pub fn add_transient_child(&mut self, parent: NodeId, mut node: ClassNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        let pos = {
            let nodes = &self.nodes;
            nodes[parent.0]
                .children
                .partition_point(|c| nodes[c.0].qualified_name < node.qualified_name)
        };
        self.by_name.insert(node.qualified_name.clone(), id);
        self.nodes.push(node);
        self.nodes[parent.0].children.insert(pos, id);
        id
    }

    /// Forget failures recorded by an earlier emission.
    pub fn clear_errors(&mut self) {
        for node in &mut self.nodes {
            node.decompiled_with_errors = false;
        }
    }

    /// Drop every transient node, restoring the tree as built.
    pub fn detach_transient(&mut self) {
        let keep = self.persistent_len;
        if self.nodes.len() == keep {
            return;
        }
        for node in self.nodes.drain(keep..) {
            self.by_name.remove(&node.qualified_name);
        }
        for node in &mut self.nodes {
            node.children.retain(|c| c.0 < keep);
        }
    }

    /// A serializable view of the tree.
    pub fn outline(&self) -> OutlineNode {
        self.outline_at(self.root())
    }

    fn outline_at(&self, id: NodeId) -> OutlineNode {
        let node = &self.nodes[id.0];
        OutlineNode {
            name: node.qualified_name.clone(),
            kind: node.kind,
            simple_name: node.simple_name.clone(),
            access: node.access.bits(),
            children: node.children.iter().map(|c| self.outline_at(*c)).collect(),
        }
    }
}

impl Index<NodeId> for ClassTree {
    type Output = ClassNode;

    fn index(&self, id: NodeId) -> &ClassNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for ClassTree {
    fn index_mut(&mut self, id: NodeId) -> &mut ClassNode {
        &mut self.nodes[id.0]
    }
}

/// Tree shape for the `tree` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    pub name: String,
    pub kind: ClassKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simple_name: Option<String>,
    pub access: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

/// The whole forest, keyed by root class name.
#[derive(Debug, Default)]
pub struct Topology {
    trees: BTreeMap<String, ClassTree>,
    owner_of: HashMap<String, String>,
}

impl Topology {
    fn from_trees(trees: BTreeMap<String, ClassTree>) -> Self {
        let mut owner_of = HashMap::new();
        for (root, tree) in &trees {
            for (_, node) in tree.iter() {
                owner_of.insert(node.qualified_name.clone(), root.clone());
            }
        }
        Topology { trees, owner_of }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    pub fn tree(&self, root: &str) -> Option<&ClassTree> {
        self.trees.get(root)
    }

    pub fn tree_mut(&mut self, root: &str) -> Option<&mut ClassTree> {
        self.trees.get_mut(root)
    }

    pub fn trees(&self) -> impl Iterator<Item = &ClassTree> {
        self.trees.values()
    }

    /// Root that `qualified_name` ended up under.
    pub fn owner_of(&self, qualified_name: &str) -> Option<&str> {
        self.owner_of.get(qualified_name).map(String::as_str)
    }

    /// Tree and node for any class in the forest.
    pub fn locate(&self, qualified_name: &str) -> Option<(&ClassTree, NodeId)> {
        let tree = self.trees.get(self.owner_of(qualified_name)?)?;
        Some((tree, tree.find(qualified_name)?))
    }

    pub fn into_trees(self) -> impl Iterator<Item = ClassTree> {
        self.trees.into_values()
    }
}

// ============================================================================
// Claims
// ============================================================================

/// One InnerClasses entry, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassClaim {
    pub inner: String,
    pub enclosing: String,
    pub simple_name: Option<String>,
    pub renamed_from: Option<String>,
    pub kind: ClassKind,
    pub access: AccessFlags,
    /// Class whose attribute made the claim.
    pub source: String,
}

impl InnerClassClaim {
    fn agrees_with(&self, other: &InnerClassClaim) -> bool {
        self.simple_name == other.simple_name && self.kind == other.kind && self.access == other.access
    }

    /// Lower is more trustworthy: the inner class speaking about itself,
    /// then the enclosing class, then anyone else.
    fn priority(&self, enclosing: &str) -> u8 {
        if self.source == self.inner {
            1
        } else if self.source == enclosing {
            2
        } else {
            3
        }
    }
}

/// Settled claims plus the nesting graph they imply.
#[derive(Debug, Default)]
pub struct ClaimTable {
    claims: HashMap<String, InnerClassClaim>,
    nested: HashMap<String, BTreeSet<String>>,
    enclosing: HashMap<String, BTreeSet<String>>,
}

impl ClaimTable {
    pub fn claim(&self, inner: &str) -> Option<&InnerClassClaim> {
        self.claims.get(inner)
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    pub fn nested_of(&self, enclosing: &str) -> Option<&BTreeSet<String>> {
        self.nested.get(enclosing)
    }

    pub fn enclosing_of(&self, inner: &str) -> Option<&BTreeSet<String>> {
        self.enclosing.get(inner)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Record a claim. A differing claim replaces the current one only if
    /// its priority is strictly better, so the outcome does not depend on
    /// the order class files are read. The nesting edges are kept either way.
    pub fn merge(&mut self, claim: InnerClassClaim, warn_inconsistent: bool) {
        let inner = claim.inner.clone();
        let enclosing = claim.enclosing.clone();

        match self.claims.get(&inner) {
            None => {
                self.claims.insert(inner.clone(), claim);
            }
            Some(existing) if !existing.agrees_with(&claim) => {
                if warn_inconsistent {
                    warn!(
                        "Inconsistent inner class entries for {}!\n  Old: {:?} {:?} {:#06x} (from {})\n  New: {:?} {:?} {:#06x} (from {})",
                        inner,
                        existing.simple_name,
                        existing.kind,
                        existing.access.bits(),
                        existing.source,
                        claim.simple_name,
                        claim.kind,
                        claim.access.bits(),
                        claim.source,
                    );
                }
                if claim.priority(&enclosing) < existing.priority(&enclosing) {
                    self.claims.insert(inner.clone(), claim);
                }
            }
            Some(_) => {}
        }

        self.nested
            .entry(enclosing.clone())
            .or_default()
            .insert(inner.clone());
        self.enclosing.entry(inner).or_default().insert(enclosing);
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds the [`Topology`] for a class set.
pub struct TopologyBuilder<'a> {
    source: &'a dyn RecordSource,
    renamer: &'a dyn Renamer,
    options: &'a DecompilerOptions,
}

/// Nodes for every own class before they are split into trees.
struct Arena {
    nodes: Vec<ClassNode>,
    index: HashMap<String, usize>,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(
        source: &'a dyn RecordSource,
        renamer: &'a dyn Renamer,
        options: &'a DecompilerOptions,
    ) -> Self {
        TopologyBuilder {
            source,
            renamer,
            options,
        }
    }

    pub fn build(&self) -> Topology {
        let mut arena = Arena {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        for record in self.source.own_classes() {
            if arena.index.contains_key(&record.name) || !self.options.is_allowed(&record.name) {
                continue;
            }
            arena.index.insert(record.name.clone(), arena.nodes.len());
            arena.nodes.push(ClassNode::new(record, ClassKind::Root));
        }

        if self.options.decompile_inner {
            let claims = self.collect_claims(&arena);
            debug!(claims = claims.len(), "collected inner class claims");
            self.attach(&mut arena, &claims);
        }

        let topology = Topology::from_trees(split(arena.nodes));
        debug!(roots = topology.len(), "built class topology");
        topology
    }

    /// Interpret every InnerClasses entry of every own class.
    fn collect_claims(&self, arena: &Arena) -> ClaimTable {
        let mut table = ClaimTable::default();
        let mut renamed: HashMap<String, String> = HashMap::new();

        for node in &arena.nodes {
            let record = &node.record;
            let Some(entries) = &record.inner_classes else {
                continue;
            };
            for entry in entries {
                let (simple_name, renamed_from) = match &entry.simple_name {
                    None => (None, None),
                    Some(original) => {
                        let name = renamed
                            .entry(entry.inner_name.clone())
                            .or_insert_with(|| {
                                if self.renamer.should_rename(RenameKind::Class, original) {
                                    self.renamer.next_name(&entry.inner_name, original)
                                } else {
                                    original.clone()
                                }
                            })
                            .clone();
                        let from = (name != *original).then(|| original.clone());
                        (Some(name), from)
                    }
                };

                let kind = match &entry.simple_name {
                    None => ClassKind::Anonymous,
                    Some(_) => match self.source.lookup(&entry.inner_name) {
                        None => ClassKind::Member,
                        Some(inner) => {
                            let in_method = inner
                                .enclosing_method
                                .as_ref()
                                .is_some_and(|m| m.method_name.is_some());
                            if entry.outer_name.is_none() || in_method {
                                ClassKind::Local
                            } else {
                                ClassKind::Member
                            }
                        }
                    },
                };

                let enclosing = entry
                    .outer_name
                    .clone()
                    .unwrap_or_else(|| record.name.clone());
                if entry.inner_name == enclosing {
                    continue;
                }
                if kind == ClassKind::Member {
                    if let Some(original) = &entry.simple_name {
                        if entry.inner_name != format!("{}${}", enclosing, original) {
                            continue;
                        }
                    }
                }
                if !arena.index.contains_key(&enclosing) {
                    continue;
                }

                table.merge(
                    InnerClassClaim {
                        inner: entry.inner_name.clone(),
                        enclosing,
                        simple_name,
                        renamed_from,
                        kind,
                        access: entry.access,
                        source: record.name.clone(),
                    },
                    self.options.warn_inconsistent_inner_classes,
                );
            }
        }
        table
    }

    /// Breadth-first from every unclaimed class, hanging claimed classes
    /// under their enclosing class.
    fn attach(&self, arena: &mut Arena, claims: &ClaimTable) {
        let mut roots: Vec<String> = arena
            .nodes
            .iter()
            .map(|n| n.qualified_name.clone())
            .filter(|name| !claims.is_claimed(name))
            .collect();
        roots.sort();

        let mut attached: HashSet<usize> = HashSet::new();

        for root in roots {
            let mut visited: HashSet<String> = HashSet::from([root.clone()]);
            let mut queue: VecDeque<String> = VecDeque::from([root]);

            while let Some(current) = queue.pop_front() {
                let Some(&parent_idx) = arena.index.get(&current) else {
                    continue;
                };
                let Some(nested) = claims.nested_of(&current) else {
                    continue;
                };
                let parent_record = arena.nodes[parent_idx].record.clone();
                let entries = match &parent_record.inner_classes {
                    Some(entries) if !entries.is_empty() => entries,
                    _ => {
                        warn!("{} does not contain inner classes!", current);
                        continue;
                    }
                };

                for entry in entries {
                    let name = &entry.inner_name;
                    if !nested.contains(name) || !visited.insert(name.clone()) {
                        continue;
                    }
                    let Some(&child_idx) = arena.index.get(name) else {
                        warn!("Nested class {} missing!", name);
                        continue;
                    };
                    if child_idx == parent_idx
                        || attached.contains(&child_idx)
                        || is_ancestor(arena, child_idx, parent_idx)
                    {
                        warn!("Nested class {} is already attached, skipping", name);
                        continue;
                    }
                    let Some(claim) = claims.claim(name) else {
                        continue;
                    };

                    self.apply_claim(arena, child_idx, parent_idx, claim);
                    if let Some(enclosing) = claims.enclosing_of(name) {
                        arena.nodes[child_idx].enclosing_classes = enclosing.clone();
                    }
                    arena.nodes[child_idx].parent = Some(NodeId(parent_idx));
                    arena.nodes[parent_idx].children.push(NodeId(child_idx));
                    attached.insert(child_idx);
                    queue.push_back(name.clone());
                }

                let mut children = std::mem::take(&mut arena.nodes[parent_idx].children);
                children.sort_by(|a, b| {
                    arena.nodes[a.0]
                        .qualified_name
                        .cmp(&arena.nodes[b.0].qualified_name)
                });
                arena.nodes[parent_idx].children = children;
            }
        }
    }

    fn apply_claim(&self, arena: &mut Arena, child: usize, parent: usize, claim: &InnerClassClaim) {
        let mut kind = claim.kind;
        if kind == ClassKind::Anonymous && self.options.verify_anonymous_classes {
            let child_record = &arena.nodes[child].record;
            let parent_record = &arena.nodes[parent].record;
            if !verify::is_anonymous(child_record, parent_record, self.source) {
                kind = ClassKind::Local;
            }
        }

        let node = &mut arena.nodes[child];
        node.kind = kind;
        node.simple_name = claim.simple_name.clone();
        node.renamed_from = claim.renamed_from.clone();
        node.access = claim.access;

        match kind {
            ClassKind::Anonymous => {
                node.access.remove(AccessFlags::STATIC);
                let supertype = node
                    .record
                    .interfaces
                    .first()
                    .cloned()
                    .or_else(|| node.record.super_class.clone());
                node.anonymous_type = supertype.map(VarType::class);
            }
            ClassKind::Local => {
                node.access &= AccessFlags::LOCAL_CLASS_MASK;
            }
            _ => {}
        }
    }
}

fn is_ancestor(arena: &Arena, candidate: usize, of: usize) -> bool {
    let mut current = arena.nodes[of].parent;
    while let Some(NodeId(idx)) = current {
        if idx == candidate {
            return true;
        }
        current = arena.nodes[idx].parent;
    }
    false
}

/// Split arena nodes into one tree per parentless node.
fn split(nodes: Vec<ClassNode>) -> BTreeMap<String, ClassTree> {
    let roots: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.parent.is_none())
        .map(|(i, _)| i)
        .collect();
    let mut slots: Vec<Option<ClassNode>> = nodes.into_iter().map(Some).collect();
    let mut trees = BTreeMap::new();

    for root in roots {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            if let Some(node) = &slots[idx] {
                stack.extend(node.children.iter().rev().map(|c| c.0));
            }
        }

        let remap: HashMap<usize, NodeId> = order
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, NodeId(new)))
            .collect();
        let mut tree_nodes = Vec::with_capacity(order.len());
        for old in order {
            if let Some(mut node) = slots[old].take() {
                node.parent = node.parent.and_then(|p| remap.get(&p.0).copied());
                node.children = node
                    .children
                    .iter()
                    .filter_map(|c| remap.get(&c.0).copied())
                    .collect();
                tree_nodes.push(node);
            }
        }
        if tree_nodes.is_empty() {
            continue;
        }
        let tree = ClassTree::from_nodes(tree_nodes);
        trees.insert(tree.root_name().to_string(), tree);
    }
    trees
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdecomp_core::record::{EnclosingMethod, InnerClassEntry};
    use kdecomp_core::source::NoRenamer;
    use kdecomp_core::ClassSet;

    fn entry(inner: &str, outer: Option<&str>, simple: Option<&str>, access: AccessFlags) -> InnerClassEntry {
        InnerClassEntry {
            inner_name: inner.to_string(),
            outer_name: outer.map(str::to_string),
            simple_name: simple.map(str::to_string),
            access,
        }
    }

    fn class(name: &str, entries: Vec<InnerClassEntry>) -> ClassRecord {
        let mut record = ClassRecord::new(name, AccessFlags::PUBLIC | AccessFlags::SUPER);
        record.inner_classes = Some(entries);
        record
    }

    fn build(set: &ClassSet) -> Topology {
        let options = DecompilerOptions::default();
        TopologyBuilder::new(set, &NoRenamer, &options).build()
    }

    fn claim(source: &str, access: AccessFlags) -> InnerClassClaim {
        InnerClassClaim {
            inner: "a/Outer$In".to_string(),
            enclosing: "a/Outer".to_string(),
            simple_name: Some("In".to_string()),
            renamed_from: None,
            kind: ClassKind::Member,
            access,
            source: source.to_string(),
        }
    }

    #[test]
    fn member_class_nests_under_outer() {
        let member = entry("a/Outer$In", Some("a/Outer"), Some("In"), AccessFlags::PRIVATE | AccessFlags::STATIC);
        let set = ClassSet::from_records([
            class("a/Outer", vec![member.clone()]),
            class("a/Outer$In", vec![member]),
        ]);
        let topology = build(&set);
        assert_eq!(topology.len(), 1);
        let tree = topology.tree("a/Outer").unwrap();
        let id = tree.find("a/Outer$In").unwrap();
        assert_eq!(tree[id].kind, ClassKind::Member);
        assert_eq!(tree[id].simple_name.as_deref(), Some("In"));
        assert_eq!(tree[id].access, AccessFlags::PRIVATE | AccessFlags::STATIC);
        assert_eq!(tree[id].parent, Some(tree.root()));
        assert!(tree[id].enclosing_classes.contains("a/Outer"));
        assert_eq!(topology.owner_of("a/Outer$In"), Some("a/Outer"));
    }

    #[test]
    fn member_name_mismatch_is_ignored() {
        let bogus = entry("a/Elsewhere", Some("a/Outer"), Some("In"), AccessFlags::PUBLIC);
        let set = ClassSet::from_records([
            class("a/Outer", vec![bogus]),
            ClassRecord::new("a/Elsewhere", AccessFlags::PUBLIC),
        ]);
        let topology = build(&set);
        assert_eq!(topology.len(), 2);
        assert_eq!(topology.tree("a/Elsewhere").unwrap().len(), 1);
    }

    #[test]
    fn local_class_keeps_only_abstract_and_final() {
        let local = entry("a/Outer$1Helper", None, Some("Helper"), AccessFlags::PRIVATE | AccessFlags::FINAL | AccessFlags::STATIC);
        let mut helper = class("a/Outer$1Helper", vec![local.clone()]);
        helper.enclosing_method = Some(EnclosingMethod {
            class: "a/Outer".to_string(),
            method_name: Some("run".to_string()),
            descriptor: Some("()V".to_string()),
        });
        let set = ClassSet::from_records([class("a/Outer", vec![local]), helper]);
        let topology = build(&set);
        let tree = topology.tree("a/Outer").unwrap();
        let id = tree.find("a/Outer$1Helper").unwrap();
        assert_eq!(tree[id].kind, ClassKind::Local);
        assert_eq!(tree[id].access, AccessFlags::FINAL);
        assert_eq!(tree[id].enclosing_method.as_deref(), Some("run ()V"));
    }

    #[test]
    fn anonymous_without_verification_records_supertype() {
        let anon = entry("a/Outer$1", None, None, AccessFlags::STATIC | AccessFlags::FINAL);
        let mut inner = class("a/Outer$1", vec![anon.clone()]);
        inner.interfaces = vec!["java/lang/Runnable".to_string()];
        let set = ClassSet::from_records([class("a/Outer", vec![anon]), inner]);
        let options = DecompilerOptions {
            verify_anonymous_classes: false,
            ..DecompilerOptions::default()
        };
        let topology = TopologyBuilder::new(&set, &NoRenamer, &options).build();
        let tree = topology.tree("a/Outer").unwrap();
        let id = tree.find("a/Outer$1").unwrap();
        assert_eq!(tree[id].kind, ClassKind::Anonymous);
        assert!(!tree[id].access.contains(AccessFlags::STATIC));
        assert_eq!(
            tree[id].anonymous_type,
            Some(VarType::class("java/lang/Runnable"))
        );
        assert_eq!(tree[id].display_name(), "1");
    }

    #[test]
    fn missing_nested_class_is_skipped() {
        let ghost = entry("a/Outer$Ghost", Some("a/Outer"), Some("Ghost"), AccessFlags::PUBLIC);
        let set = ClassSet::from_records([class("a/Outer", vec![ghost])]);
        let topology = build(&set);
        assert_eq!(topology.tree("a/Outer").unwrap().len(), 1);
    }

    #[test]
    fn priority_prefers_the_inner_class_itself() {
        let from_outer = claim("a/Outer", AccessFlags::PUBLIC);
        let from_inner = claim("a/Outer$In", AccessFlags::PRIVATE);

        let mut first = ClaimTable::default();
        first.merge(from_outer.clone(), false);
        first.merge(from_inner.clone(), false);

        let mut second = ClaimTable::default();
        second.merge(from_inner, false);
        second.merge(from_outer, false);

        assert_eq!(first.claim("a/Outer$In"), second.claim("a/Outer$In"));
        assert_eq!(first.claim("a/Outer$In").unwrap().access, AccessFlags::PRIVATE);
    }

    #[test]
    fn third_party_claim_never_beats_enclosing() {
        let mut table = ClaimTable::default();
        table.merge(claim("a/Outer", AccessFlags::PUBLIC), false);
        table.merge(claim("b/Stranger", AccessFlags::PRIVATE), false);
        assert_eq!(table.claim("a/Outer$In").unwrap().source, "a/Outer");
        assert!(table.nested_of("a/Outer").unwrap().contains("a/Outer$In"));
    }

    #[test]
    fn disabled_inner_decompilation_keeps_everything_root() {
        let member = entry("a/Outer$In", Some("a/Outer"), Some("In"), AccessFlags::PUBLIC);
        let set = ClassSet::from_records([
            class("a/Outer", vec![member.clone()]),
            class("a/Outer$In", vec![member]),
        ]);
        let options = DecompilerOptions {
            decompile_inner: false,
            ..DecompilerOptions::default()
        };
        let topology = TopologyBuilder::new(&set, &NoRenamer, &options).build();
        assert_eq!(topology.len(), 2);
        assert!(topology.trees().all(|t| t[t.root()].kind == ClassKind::Root));
    }

    #[test]
    fn children_sorted_and_outline() {
        let b = entry("a/Outer$B", Some("a/Outer"), Some("B"), AccessFlags::PUBLIC);
        let a = entry("a/Outer$A", Some("a/Outer"), Some("A"), AccessFlags::PUBLIC);
        let set = ClassSet::from_records([
            class("a/Outer", vec![b.clone(), a.clone()]),
            class("a/Outer$B", vec![b]),
            class("a/Outer$A", vec![a]),
        ]);
        let topology = build(&set);
        let tree = topology.tree("a/Outer").unwrap();
        let names: Vec<&str> = tree
            .children(tree.root())
            .iter()
            .map(|c| tree[*c].qualified_name.as_str())
            .collect();
        assert_eq!(names, ["a/Outer$A", "a/Outer$B"]);

        let outline = tree.outline();
        assert_eq!(outline.children.len(), 2);
        let json = serde_json::to_value(&outline).unwrap();
        assert_eq!(json["children"][0]["kind"], "member");
    }
}
