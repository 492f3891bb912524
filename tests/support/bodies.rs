//! Body reconstructors that fail on purpose.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use kdecomp::reconstruct::{MethodContext, RenderedBody};
use kdecomp::tracer::BytecodeMappingTracer;
use kdecomp::{BodyReconstructor, PrerenderedBodies, ReconstructError};

/// How a listed method fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Error,
    Panic,
    /// Returns text but reports it as decompiled with errors.
    Partial,
    /// Errors on the first render only, then delegates.
    ErrorOnce,
}

/// Text a [`Failure::Partial`] body returns.
pub const PARTIAL_TEXT: &str = "int x = <error>;";

/// Delegates to [`PrerenderedBodies`] except for the methods named in
/// `failing`, which fail the configured way.
pub struct FailingBodies {
    pub bodies: PrerenderedBodies,
    pub failing: HashSet<String>,
    pub failure: Failure,
    failed_once: AtomicBool,
}

impl FailingBodies {
    pub fn new(bodies: PrerenderedBodies, failure: Failure, failing: &[&str]) -> Self {
        FailingBodies {
            bodies,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            failure,
            failed_once: AtomicBool::new(false),
        }
    }
}

impl BodyReconstructor for FailingBodies {
    fn render_body(
        &self,
        ctx: &MethodContext<'_>,
        tracer: &mut BytecodeMappingTracer,
    ) -> Result<RenderedBody, ReconstructError> {
        if !self.failing.contains(&ctx.method.name) {
            return self.bodies.render_body(ctx, tracer);
        }
        match self.failure {
            Failure::Error => Err(ReconstructError::failed(ctx.method.name.clone(), "stack underflow")),
            Failure::Panic => panic!("renderer bug in {}", ctx.method.name),
            Failure::Partial => {
                tracer.add_mapping(0);
                let indent = ctx.indent_unit.repeat(ctx.indent);
                Ok(RenderedBody {
                    text: format!("{}{}{}", indent, PARTIAL_TEXT, ctx.line_separator),
                    decompiled_with_errors: true,
                })
            }
            Failure::ErrorOnce => {
                if self.failed_once.swap(true, Ordering::SeqCst) {
                    self.bodies.render_body(ctx, tracer)
                } else {
                    Err(ReconstructError::failed(ctx.method.name.clone(), "stack underflow"))
                }
            }
        }
    }
}
