//! `module-info` declarations.

use kdecomp_core::record::ModulePackages;
use kdecomp_core::ClassRecord;

use super::{ClassEmitter, EmitState};

impl ClassEmitter<'_> {
    /// Write the module declaration. Returns false if the class carries no
    /// module descriptor.
    pub(super) fn write_module(&self, record: &ClassRecord, st: &mut EmitState) -> bool {
        let Some(module) = &record.module else {
            return false;
        };

        for annotation in &record.annotations {
            st.write_line(0, &super::annotation_line(annotation));
        }
        let open = if module.open { "open " } else { "" };
        st.write_line(0, &format!("{}module {} {{", open, module.name));

        for require in &module.requires {
            let mut line = String::from("requires ");
            if require.transitive {
                line.push_str("transitive ");
            }
            if require.static_phase {
                line.push_str("static ");
            }
            line.push_str(&require.module);
            line.push(';');
            st.write_line(1, &line);
        }
        for exports in &module.exports {
            st.write_line(1, &package_directive("exports", exports));
        }
        for opens in &module.opens {
            st.write_line(1, &package_directive("opens", opens));
        }
        for service in &module.uses {
            st.write_line(1, &format!("uses {};", dotted(service)));
        }
        for provides in &module.provides {
            let implementations: Vec<String> = provides.with.iter().map(|c| dotted(c)).collect();
            st.write_line(
                1,
                &format!("provides {} with {};", dotted(&provides.service), implementations.join(", ")),
            );
        }

        st.write_line(0, "}");
        true
    }
}

/// `exports a.b;` or `exports a.b to m1, m2;`
fn package_directive(keyword: &str, packages: &ModulePackages) -> String {
    if packages.to.is_empty() {
        format!("{} {};", keyword, dotted(&packages.package))
    } else {
        format!("{} {} to {};", keyword, dotted(&packages.package), packages.to.join(", "))
    }
}

fn dotted(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}
