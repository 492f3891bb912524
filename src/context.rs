//! Emission context.
//!
//! The body reconstructor needs to know which class and method it is
//! working in. That state is threaded explicitly through emission as an
//! [`EmitContext`]; entering a class or method returns a [`Scope`] guard
//! that restores the previous value when dropped, including on early
//! return and unwinding.

use std::ops::{Deref, DerefMut};

/// Current class and method during one root's emission.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmitContext {
    class: Option<String>,
    method: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Class,
    Method,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// `name descriptor` of the current method.
    pub fn current_method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Make `name` the current class until the guard drops. The current
    /// method is cleared for the duration.
    pub fn enter_class(&mut self, name: &str) -> Scope<'_> {
        let previous_method = self.method.take();
        let previous = self.class.replace(name.to_string());
        Scope {
            ctx: self,
            slot: Slot::Class,
            previous,
            previous_method,
        }
    }

    pub fn enter_method(&mut self, key: &str) -> Scope<'_> {
        let previous = self.method.replace(key.to_string());
        Scope {
            ctx: self,
            slot: Slot::Method,
            previous,
            previous_method: None,
        }
    }
}

/// Restores the context slot it replaced on drop.
#[must_use = "the previous context is restored when the scope is dropped"]
pub struct Scope<'a> {
    ctx: &'a mut EmitContext,
    slot: Slot,
    previous: Option<String>,
    previous_method: Option<String>,
}

impl Deref for Scope<'_> {
    type Target = EmitContext;

    fn deref(&self) -> &EmitContext {
        self.ctx
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut EmitContext {
        self.ctx
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        match self.slot {
            Slot::Class => {
                self.ctx.class = self.previous.take();
                self.ctx.method = self.previous_method.take();
            }
            Slot::Method => {
                self.ctx.method = self.previous.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scopes_restore_in_order() {
        let mut ctx = EmitContext::new();
        {
            let mut outer = ctx.enter_class("a/Outer");
            {
                let mut method = outer.enter_method("run ()V");
                assert_eq!(method.current_method(), Some("run ()V"));
                {
                    let inner = method.enter_class("a/Outer$1");
                    assert_eq!(inner.current_class(), Some("a/Outer$1"));
                    assert_eq!(inner.current_method(), None);
                }
                assert_eq!(method.current_class(), Some("a/Outer"));
                assert_eq!(method.current_method(), Some("run ()V"));
            }
            assert_eq!(outer.current_method(), None);
        }
        assert_eq!(ctx, EmitContext::default());
    }

    #[test]
    fn restores_after_unwind() {
        let mut ctx = EmitContext::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = ctx.enter_method("boom ()V");
            panic!("body renderer failed");
        }));
        assert!(result.is_err());
        assert_eq!(ctx.current_method(), None);
    }
}
