//! Anonymous-class verification.
//!
//! An InnerClasses entry without a simple name says "anonymous", but
//! obfuscators and some compilers produce entries that lie. A real
//! anonymous class is instantiated exactly once, by `new`, in the method
//! that encloses it, and is never used as a type anywhere else in that
//! method. [`is_anonymous`] checks those facts against the enclosing
//! method's bytecode. Candidates that fail are treated as local classes.

use tracing::warn;

use kdecomp_core::record::Opcode;
use kdecomp_core::{ClassRecord, MethodRecord, RecordSource};

/// True if `class` behaves like an anonymous class of `enclosing`.
///
/// Pure with respect to the topology: the same inputs always give the
/// same answer.
pub fn is_anonymous(class: &ClassRecord, enclosing: &ClassRecord, source: &dyn RecordSource) -> bool {
    let name = class.name.as_str();

    // An anonymous class extends one class or implements one interface.
    if !class.interfaces.is_empty() {
        if class.nontrivial_super().is_some() || class.interfaces.len() > 1 {
            warn!("Inconsistent anonymous class definition: {}", name);
            return false;
        }
    } else if class.super_class.is_none() {
        warn!("Inconsistent anonymous class definition: {}", name);
        return false;
    }

    let method_name = class
        .enclosing_method
        .as_ref()
        .and_then(|m| m.method_name.as_deref());
    let in_scope = |method: &MethodRecord| match method_name {
        Some(wanted) => method.name == wanted,
        None => true,
    };

    // Counted across all candidate methods, not per method.
    let mut references = 0usize;
    let mut referenced_not_new = false;

    for method in enclosing.methods.iter().filter(|m| in_scope(m)) {
        let code = match source.instructions(enclosing, method) {
            Ok(Some(code)) => code,
            Ok(None) => continue,
            Err(e) => {
                warn!(
                    "Could not read method {} of {}: {}",
                    method.name, enclosing.name, e
                );
                return false;
            }
        };

        for instr in &code {
            if instr.class.as_deref() != Some(name) {
                continue;
            }
            match instr.opcode {
                Opcode::CheckCast | Opcode::InstanceOf => {
                    references += 1;
                    referenced_not_new = true;
                }
                Opcode::New | Opcode::ANewArray | Opcode::MultiANewArray => {
                    references += 1;
                }
                Opcode::GetStatic | Opcode::PutStatic => {
                    references += 1;
                    referenced_not_new = true;
                }
                _ => {}
            }
        }

        if references > 1 || referenced_not_new {
            warn!(
                "Inconsistent references to anonymous class {} in {}.{}",
                name, enclosing.name, method.name
            );
            return false;
        }
    }

    true
}
