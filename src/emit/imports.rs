//! Import collection.
//!
//! Type names are shortened while the class body is rendered. The first
//! class to claim a short name gets it and an import line; a later class
//! with the same short name from a different package is written fully
//! qualified. Imports are rendered after the body and inserted at the top
//! of the file.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use kdecomp_core::types::{package_name, simple_name, TypeNaming};
use kdecomp_core::TextBuffer;

const JAVA_LANG: &str = "java/lang";

/// Collects imports for one output file.
#[derive(Debug)]
pub struct ImportCollector {
    /// Package of the file, internal form.
    package: String,
    /// Top-level class names declared in the file, internal form.
    local: BTreeSet<String>,
    /// Short name to the top-level class it stands for.
    claimed: RefCell<BTreeMap<String, String>>,
    imports: RefCell<BTreeSet<String>>,
}

impl ImportCollector {
    pub fn new(root_class: &str) -> Self {
        let mut claimed = BTreeMap::new();
        claimed.insert(
            short_top(root_class).to_string(),
            top_level(root_class).to_string(),
        );
        ImportCollector {
            package: package_name(root_class).to_string(),
            local: BTreeSet::from([top_level(root_class).to_string()]),
            claimed: RefCell::new(claimed),
            imports: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Shortest unambiguous spelling of `internal`, recording an import
    /// when one is needed.
    pub fn short_name(&self, internal: &str) -> String {
        let top = top_level(internal);
        let short = short_top(internal);
        let package = package_name(internal);
        // `Outer.Inner` for nested classes.
        let nested_path = simple_name(internal).replace('$', ".");

        let mut claimed = self.claimed.borrow_mut();
        match claimed.get(short) {
            Some(owner) if owner == top => {}
            Some(_) => return internal.replace(['/', '$'], "."),
            None => {
                claimed.insert(short.to_string(), top.to_string());
            }
        }

        if !package.is_empty()
            && package != JAVA_LANG
            && package != self.package
            && !self.local.contains(top)
        {
            self.imports.borrow_mut().insert(top.replace('/', "."));
        }
        nested_path
    }

    pub fn is_empty(&self) -> bool {
        self.imports.borrow().is_empty()
    }

    /// Sorted `import` lines and a trailing blank line, or nothing.
    pub fn write(&self, buf: &mut TextBuffer) -> u32 {
        let imports = self.imports.borrow();
        if imports.is_empty() {
            return 0;
        }
        for import in imports.iter() {
            buf.append("import ").append(import).append_line_separator();
        }
        buf.append_line_separator();
        imports.len() as u32 + 1
    }
}

impl TypeNaming for ImportCollector {
    fn class_name(&self, internal: &str) -> String {
        self.short_name(internal)
    }
}

/// Internal name of the top-level class enclosing `internal`.
fn top_level(internal: &str) -> &str {
    let base = internal.rfind('/').map_or(0, |i| i + 1);
    match internal[base..].find('$') {
        // A leading `$` is part of the name, not a nesting marker.
        Some(0) | None => internal,
        Some(i) => &internal[..base + i],
    }
}

fn short_top(internal: &str) -> &str {
    simple_name(top_level(internal))
}
