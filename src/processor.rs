//! The emission driver.
//!
//! [`Decompiler`] owns the shared pieces of a run (record source, options,
//! renamer, body reconstructor and the generic resolver cache) and drives
//! each root class through lambda discovery, preparation, emission and
//! cleanup. Roots are independent, so [`Decompiler::write_all`] emits them
//! on the rayon pool; each worker owns its tree exclusively.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span};

use kdecomp_core::{DecompileError, DecompileResult, DecompilerOptions, RecordSource, Renamer};

use crate::context::EmitContext;
use crate::emit::{ClassEmitter, EmitState};
use crate::generics::GenericResolver;
use crate::lambda;
use crate::reconstruct::BodyReconstructor;
use crate::schedule;
use crate::topology::{ClassTree, NodeId, Topology, TopologyBuilder};

/// Offset → line tables keyed by class, then `name descriptor`.
pub type MappingTables = BTreeMap<String, BTreeMap<String, BTreeMap<u32, u32>>>;

/// One emitted source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassOutput {
    /// Internal name of the root class.
    pub name: String,
    pub text: String,
    /// Lines are 0-based and include the package and import header.
    pub mappings: MappingTables,
    /// Some method in the file was replaced by a placeholder.
    pub decompiled_with_errors: bool,
}

impl ClassOutput {
    /// Relative output path, e.g. `a/b/Outer.kt`.
    pub fn file_name(&self) -> String {
        format!("{}.kt", self.name)
    }
}

/// Drives topology resolution and emission over a record source.
pub struct Decompiler {
    source: Arc<dyn RecordSource>,
    options: DecompilerOptions,
    renamer: Box<dyn Renamer>,
    reconstructor: Box<dyn BodyReconstructor>,
    generics: GenericResolver,
}

impl Decompiler {
    pub fn new(
        source: Arc<dyn RecordSource>,
        options: DecompilerOptions,
        renamer: Box<dyn Renamer>,
        reconstructor: Box<dyn BodyReconstructor>,
    ) -> Self {
        let generics = GenericResolver::new(source.clone());
        Decompiler {
            source,
            options,
            renamer,
            reconstructor,
            generics,
        }
    }

    pub fn options(&self) -> &DecompilerOptions {
        &self.options
    }

    pub fn generics(&self) -> &GenericResolver {
        &self.generics
    }

    /// Resolve the class topology of every own class.
    pub fn load_classes(&self) -> Topology {
        TopologyBuilder::new(self.source.as_ref(), self.renamer.as_ref(), &self.options).build()
    }

    /// Emit one root class and release its transient state.
    pub fn write_class(&self, tree: &mut ClassTree) -> ClassOutput {
        let name = tree.root_name().to_string();
        let span = info_span!("emit_root", class = %name);
        let _guard = span.enter();

        tree.clear_errors();
        self.discover_lambdas(tree);
        schedule::prepare_tree(tree, self.reconstructor.as_ref());

        let root = tree.root();
        let record = tree[root].record.clone();
        let emitter = ClassEmitter::new(
            self.source.as_ref(),
            &self.options,
            self.reconstructor.as_ref(),
            &self.generics,
        );
        let mut st = EmitState::new(&name, &self.options);
        let mut ctx = EmitContext::new();
        if record.is_package_info() {
            st.write_package_info(&record);
        } else {
            emitter.emit_class(tree, root, 0, &mut st, &mut ctx);
        }

        let (mut text, mut mapper, imports) = st.into_parts();
        let mut header = text.fork();
        let package = imports.package();
        if !package.is_empty() && !record.is_package_info() && !record.is_module() {
            header
                .append("package ")
                .append(&package.replace('/', "."))
                .append_line_separator()
                .append_line_separator();
        }
        imports.write(&mut header);
        mapper.add_total_offset(header.count_lines());
        text.insert(0, header.as_str());

        if self.options.bytecode_source_mapping && !mapper.is_empty() {
            text.append_line_separator();
            text.append(&mapper.dump(&self.options.indent_string, &self.options.line_separator));
        }

        let decompiled_with_errors = tree.iter().any(|(_, node)| node.decompiled_with_errors);
        tree.detach_transient();
        for (_, node) in tree.iter() {
            self.source.release_resources(&node.qualified_name);
        }
        debug!(class = %name, errors = decompiled_with_errors, "emitted root");

        ClassOutput {
            name,
            text: text.into_string(),
            mappings: mapper.tables(),
            decompiled_with_errors,
        }
    }

    /// Emit the root that contains `name`.
    pub fn write_named(&self, topology: &mut Topology, name: &str) -> DecompileResult<ClassOutput> {
        let root = topology
            .owner_of(name)
            .map(str::to_string)
            .ok_or_else(|| DecompileError::ClassNotFound {
                name: name.to_string(),
            })?;
        let tree = topology
            .tree_mut(&root)
            .ok_or_else(|| DecompileError::internal(format!("missing tree for root {}", root)))?;
        Ok(self.write_class(tree))
    }

    /// Emit every root on the rayon pool, in root-name order.
    pub fn write_all(&self, topology: Topology) -> Vec<ClassOutput> {
        let trees: Vec<ClassTree> = topology.into_trees().collect();
        info!(roots = trees.len(), "emitting classes");
        trees
            .into_par_iter()
            .map(|mut tree| self.write_class(&mut tree))
            .collect()
    }

    /// Attach a Lambda node for every call site the reconstructor reports.
    fn discover_lambdas(&self, tree: &mut ClassTree) {
        let homes: Vec<NodeId> = tree
            .iter()
            .filter(|(_, node)| !node.is_lambda())
            .map(|(id, _)| id)
            .collect();
        for home in homes {
            let sites = self.reconstructor.lambda_sites(&tree[home].record);
            for (index, site) in sites.into_iter().enumerate() {
                lambda::synthesize(tree, home, site, index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::PrerenderedBodies;
    use kdecomp_core::source::NoRenamer;
    use kdecomp_core::{AccessFlags, ClassRecord, ClassSet, MethodRecord};

    fn decompiler(records: Vec<ClassRecord>, bodies: PrerenderedBodies) -> Decompiler {
        Decompiler::new(
            Arc::new(ClassSet::from_records(records)),
            DecompilerOptions::default(),
            Box::new(NoRenamer),
            Box::new(bodies),
        )
    }

    #[test]
    fn package_line_and_imports_come_first() {
        let mut record = ClassRecord::new("a/b/Main", AccessFlags::PUBLIC | AccessFlags::FINAL);
        let mut run = MethodRecord::new("run", "(Ljava/util/List;)V", AccessFlags::PUBLIC);
        run.signature = Some("(Ljava/util/List<Ljava/lang/String;>;)V".to_string());
        record.methods.push(run);
        let bodies = PrerenderedBodies::new().with_body("a/b/Main", "run", "(Ljava/util/List;)V", "return;");

        let d = decompiler(vec![record], bodies);
        let outputs = d.write_all(d.load_classes());
        assert_eq!(outputs.len(), 1);
        assert_eq!(
            outputs[0].text,
            "package a.b\n\nimport java.util.List\n\nclass Main {\n   fun run(param1: List<String>) {\n      return;\n   }\n}\n"
        );
        assert_eq!(outputs[0].file_name(), "a/b/Main.kt");
    }

    #[test]
    fn default_package_has_no_header() {
        let d = decompiler(
            vec![ClassRecord::new("Main", AccessFlags::PUBLIC | AccessFlags::FINAL)],
            PrerenderedBodies::new(),
        );
        let outputs = d.write_all(d.load_classes());
        assert_eq!(outputs[0].text, "class Main {\n}\n");
    }

    #[test]
    fn package_info() {
        let mut record = ClassRecord::new(
            "a/b/package-info",
            AccessFlags::INTERFACE | AccessFlags::ABSTRACT | AccessFlags::SYNTHETIC,
        );
        record.annotations.push("Deprecated".to_string());
        let d = decompiler(vec![record], PrerenderedBodies::new());
        let outputs = d.write_all(d.load_classes());
        assert_eq!(outputs[0].text, "@Deprecated\npackage a.b\n");
    }

    #[test]
    fn unknown_class_is_an_error() {
        let d = decompiler(vec![ClassRecord::new("a/A", AccessFlags::PUBLIC)], PrerenderedBodies::new());
        let mut topology = d.load_classes();
        let err = d.write_named(&mut topology, "a/Missing").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
