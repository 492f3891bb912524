//! Preparation order for one class tree.
//!
//! Switch-map holder classes (`Outer$1` with a static `int[]` per switched
//! enum) must be prepared before the classes that read them. The scheduler
//! runs in two passes per node: classify children by [`is_init_priority`],
//! then emit priority children, the node itself, and the remaining
//! children, each recursively.

use kdecomp_core::record::CLINIT;
use kdecomp_core::{AccessFlags, ClassRecord};

use crate::reconstruct::BodyReconstructor;
use crate::topology::{ClassTree, NodeId};

/// Synthetic class whose only method is `<clinit>` and whose fields are
/// all `static final synthetic int[]`.
pub fn is_init_priority(record: &ClassRecord) -> bool {
    let holder_field = AccessFlags::STATIC | AccessFlags::FINAL;
    record.is_synthetic()
        && matches!(record.methods.as_slice(), [only] if only.name == CLINIT)
        && record
            .fields
            .iter()
            .all(|f| f.access.contains(holder_field) && f.is_synthetic() && f.descriptor == "[I")
}

/// Every node of `tree` in preparation order.
pub fn preparation_order(tree: &ClassTree) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(tree.len());
    visit(tree, tree.root(), &mut order);
    order
}

fn visit(tree: &ClassTree, id: NodeId, order: &mut Vec<NodeId>) {
    let (priority, rest): (Vec<NodeId>, Vec<NodeId>) = tree
        .children(id)
        .iter()
        .copied()
        .partition(|child| is_init_priority(&tree[*child].record));

    for child in priority {
        visit(tree, child, order);
    }
    order.push(id);
    for child in rest {
        visit(tree, child, order);
    }
}

/// Hand every class of `tree` to the reconstructor in preparation order.
pub fn prepare_tree(tree: &ClassTree, reconstructor: &dyn BodyReconstructor) -> Vec<NodeId> {
    let order = preparation_order(tree);
    for id in &order {
        let node = &tree[*id];
        if !node.is_lambda() {
            reconstructor.prepare_class(&node.record);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;
    use kdecomp_core::{ClassSet, DecompilerOptions, FieldRecord, InnerClassEntry, MethodRecord};
    use kdecomp_core::source::NoRenamer;

    fn switch_map(name: &str) -> ClassRecord {
        let mut record = ClassRecord::new(name, AccessFlags::SYNTHETIC);
        record.fields.push(FieldRecord::new(
            "$SwitchMap$a$Color",
            "[I",
            AccessFlags::STATIC | AccessFlags::FINAL | AccessFlags::SYNTHETIC,
        ));
        record
            .methods
            .push(MethodRecord::new(CLINIT, "()V", AccessFlags::STATIC));
        record
    }

    fn member(inner: &str, outer: &str, simple: &str) -> InnerClassEntry {
        InnerClassEntry {
            inner_name: inner.to_string(),
            outer_name: Some(outer.to_string()),
            simple_name: Some(simple.to_string()),
            access: AccessFlags::STATIC,
        }
    }

    #[test]
    fn recognizes_switch_map_holders() {
        assert!(is_init_priority(&switch_map("a/Outer$1")));

        let mut with_method = switch_map("a/Outer$1");
        with_method
            .methods
            .push(MethodRecord::new("run", "()V", AccessFlags::STATIC));
        assert!(!is_init_priority(&with_method));

        let mut not_synthetic = switch_map("a/Outer$1");
        not_synthetic.access = AccessFlags::empty();
        assert!(!is_init_priority(&not_synthetic));

        assert!(!is_init_priority(&ClassRecord::new("a/Plain", AccessFlags::PUBLIC)));
    }

    #[test]
    fn priority_children_come_first() {
        let mut outer = ClassRecord::new("a/Outer", AccessFlags::PUBLIC);
        let entries = vec![
            member("a/Outer$A", "a/Outer", "A"),
            member("a/Outer$Z", "a/Outer", "Z"),
        ];
        outer.inner_classes = Some(entries.clone());
        let mut a = ClassRecord::new("a/Outer$A", AccessFlags::STATIC);
        a.inner_classes = Some(vec![entries[0].clone()]);
        let mut z = switch_map("a/Outer$Z");
        z.inner_classes = Some(vec![entries[1].clone()]);

        let set = ClassSet::from_records([outer, a, z]);
        let options = DecompilerOptions::default();
        let topology = TopologyBuilder::new(&set, &NoRenamer, &options).build();
        let tree = topology.tree("a/Outer").unwrap();

        let names: Vec<&str> = preparation_order(tree)
            .into_iter()
            .map(|id| tree[id].qualified_name.as_str())
            .collect();
        assert_eq!(names, ["a/Outer$Z", "a/Outer", "a/Outer$A"]);
    }
}
