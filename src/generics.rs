//! Generic substitution across the inheritance graph.
//!
//! For a class `C`, [`GenericHierarchy`] answers "what does type variable
//! `T` of ancestor `A` mean, seen from `C`?". Each direct supertype in
//! `C`'s signature supplies arguments for the supertype's own parameters;
//! the supertype's view of its ancestors is then rewritten through those
//! arguments, so substitutions compose over any number of generic levels.
//!
//! Hierarchies are pure functions of the immutable record index and are
//! cached per class in a [`DashMap`] shared by all worker threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::trace;

use kdecomp_core::types::{Substitution, TypeArg};
use kdecomp_core::{RecordSource, VarType};

/// Errors from hierarchy construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// The class is its own ancestor.
    #[error("inheritance cycle through {class}")]
    Cycle { class: String },

    #[error("class not found: {class}")]
    UnknownClass { class: String },
}

/// Every ancestor of one class, each with the substitution for the
/// ancestor's own type variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericHierarchy {
    pub class: String,
    /// Keyed by the ancestor that declares the variables. Includes the
    /// class itself with an identity map.
    pub ancestors: BTreeMap<String, Substitution>,
}

impl GenericHierarchy {
    pub fn substitution(&self, ancestor: &str) -> Option<&Substitution> {
        self.ancestors.get(ancestor)
    }

    /// Ancestor names other than the class itself, sorted.
    pub fn ancestor_names(&self) -> impl Iterator<Item = &str> {
        self.ancestors
            .keys()
            .map(String::as_str)
            .filter(move |name| *name != self.class)
    }
}

/// Cached resolver over a record source.
pub struct GenericResolver {
    source: Arc<dyn RecordSource>,
    cache: DashMap<String, Arc<GenericHierarchy>>,
}

impl GenericResolver {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        GenericResolver {
            source,
            cache: DashMap::new(),
        }
    }

    pub fn hierarchy(&self, class: &str) -> Result<Arc<GenericHierarchy>, HierarchyError> {
        let mut visiting = Vec::new();
        self.build(class, &mut visiting)
    }

    /// Substitution for `ancestor`'s variables as seen from `class`.
    pub fn substitution(&self, class: &str, ancestor: &str) -> Result<Option<Substitution>, HierarchyError> {
        Ok(self.hierarchy(class)?.substitution(ancestor).cloned())
    }

    /// What `ancestor`'s type variable `var` resolves to from `class`.
    pub fn resolve(&self, class: &str, ancestor: &str, var: &str) -> Result<Option<VarType>, HierarchyError> {
        Ok(self
            .hierarchy(class)?
            .substitution(ancestor)
            .and_then(|s| s.get(var))
            .cloned())
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn build(&self, class: &str, visiting: &mut Vec<String>) -> Result<Arc<GenericHierarchy>, HierarchyError> {
        if let Some(hit) = self.cache.get(class) {
            return Ok(hit.clone());
        }
        if visiting.iter().any(|c| c == class) {
            return Err(HierarchyError::Cycle {
                class: class.to_string(),
            });
        }
        let record = self
            .source
            .lookup(class)
            .ok_or_else(|| HierarchyError::UnknownClass {
                class: class.to_string(),
            })?;
        visiting.push(class.to_string());

        let signature = self.source.class_signature(&record);
        let mut ancestors: BTreeMap<String, Substitution> = BTreeMap::new();

        let identity: Substitution = signature
            .iter()
            .flat_map(|s| s.param_names())
            .map(|name| (name.to_string(), VarType::variable(name)))
            .collect();
        ancestors.insert(class.to_string(), identity);

        let direct: Vec<VarType> = match &signature {
            Some(sig) => std::iter::once(sig.superclass.clone())
                .chain(sig.interfaces.iter().cloned())
                .collect(),
            None => record
                .super_class
                .iter()
                .chain(record.interfaces.iter())
                .map(VarType::class)
                .collect(),
        };

        for supertype in direct {
            let Some(name) = supertype.class_name() else {
                continue;
            };
            let arguments = self.arguments_for(name, &supertype);
            ancestors
                .entry(name.to_string())
                .or_insert_with(|| arguments.clone());

            if self.source.lookup(name).is_none() {
                continue;
            }
            let inherited = self.build(name, visiting)?;
            for (ancestor, substitution) in &inherited.ancestors {
                ancestors.entry(ancestor.clone()).or_insert_with(|| {
                    substitution
                        .iter()
                        .map(|(var, value)| (var.clone(), value.substitute(&arguments)))
                        .collect()
                });
            }
        }

        visiting.pop();
        trace!(class, ancestors = ancestors.len(), "built generic hierarchy");
        let hierarchy = Arc::new(GenericHierarchy {
            class: class.to_string(),
            ancestors,
        });
        self.cache.insert(class.to_string(), hierarchy.clone());
        Ok(hierarchy)
    }

    /// Map `name`'s declared parameters to the arguments in `supertype`.
    fn arguments_for(&self, name: &str, supertype: &VarType) -> Substitution {
        let Some(record) = self.source.lookup(name) else {
            return Substitution::new();
        };
        let Some(signature) = self.source.class_signature(&record) else {
            return Substitution::new();
        };
        signature
            .param_names()
            .zip(supertype.type_args())
            .map(|(param, arg)| {
                let value = match arg {
                    TypeArg::Wildcard => VarType::object(),
                    TypeArg::Exact(t) | TypeArg::Extends(t) | TypeArg::Super(t) => t.clone(),
                };
                (param.to_string(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdecomp_core::{AccessFlags, ClassRecord, ClassSet};

    fn generic(name: &str, signature: Option<&str>, super_class: &str) -> ClassRecord {
        let mut record = ClassRecord::new(name, AccessFlags::PUBLIC);
        record.signature = signature.map(str::to_string);
        record.super_class = Some(super_class.to_string());
        record
    }

    fn list_of(t: VarType) -> VarType {
        VarType::generic("java/util/List", vec![TypeArg::Exact(t)])
    }

    fn chain() -> ClassSet {
        ClassSet::from_records([
            generic("a/A", Some("<T:Ljava/lang/Object;>Ljava/lang/Object;"), "java/lang/Object"),
            generic(
                "a/B",
                Some("<T:Ljava/lang/Object;>La/A<Ljava/util/List<TT;>;>;"),
                "a/A",
            ),
            generic("a/C", Some("La/B<Ljava/lang/String;>;"), "a/B"),
        ])
    }

    #[test]
    fn identity_for_own_parameters() {
        let resolver = GenericResolver::new(Arc::new(chain()));
        let h = resolver.hierarchy("a/A").unwrap();
        assert_eq!(h.substitution("a/A").unwrap()["T"], VarType::variable("T"));
    }

    #[test]
    fn one_level() {
        let resolver = GenericResolver::new(Arc::new(chain()));
        assert_eq!(
            resolver.resolve("a/B", "a/A", "T").unwrap(),
            Some(list_of(VarType::variable("T")))
        );
    }

    #[test]
    fn composes_through_two_levels() {
        let resolver = GenericResolver::new(Arc::new(chain()));
        assert_eq!(
            resolver.resolve("a/C", "a/A", "T").unwrap(),
            Some(list_of(VarType::class("java/lang/String")))
        );
        assert_eq!(
            resolver.resolve("a/C", "a/B", "T").unwrap(),
            Some(VarType::class("java/lang/String"))
        );
        let hierarchy = resolver.hierarchy("a/C").unwrap();
        let ancestors: Vec<&str> = hierarchy.ancestor_names().collect();
        assert_eq!(ancestors, ["a/A", "a/B", "java/lang/Object"]);
    }

    #[test]
    fn results_are_cached() {
        let resolver = GenericResolver::new(Arc::new(chain()));
        let first = resolver.hierarchy("a/C").unwrap();
        let cached = resolver.cached();
        let second = resolver.hierarchy("a/C").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached(), cached);
    }

    #[test]
    fn raw_supertypes_without_signature() {
        let mut record = generic("a/Raw", None, "a/A");
        record.interfaces = vec!["java/lang/Runnable".to_string()];
        let mut set = chain();
        set.insert(record);
        let resolver = GenericResolver::new(Arc::new(set));
        let h = resolver.hierarchy("a/Raw").unwrap();
        assert!(h.substitution("java/lang/Runnable").unwrap().is_empty());
        assert!(h.substitution("a/A").unwrap().is_empty());
    }

    #[test]
    fn cycle_is_an_error() {
        let set = ClassSet::from_records([
            generic("a/X", None, "a/Y"),
            generic("a/Y", None, "a/X"),
        ]);
        let resolver = GenericResolver::new(Arc::new(set));
        assert_eq!(
            resolver.hierarchy("a/X").unwrap_err(),
            HierarchyError::Cycle {
                class: "a/X".to_string()
            }
        );
    }

    #[test]
    fn unknown_class() {
        let resolver = GenericResolver::new(Arc::new(ClassSet::new()));
        assert!(matches!(
            resolver.hierarchy("a/Nope"),
            Err(HierarchyError::UnknownClass { .. })
        ));
    }
}
