// flow.rs
//
// Per-function control-flow facts: a tree of branch contexts tracking scoped
// locals, break/continue/return labels and termination flags. The resolver
// consults the current flow for `this` and scoped identifier lookup; the
// emitter drives enter/leave around every branch.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use stave_identity::Span;

use crate::elements::{CommonFlags, ElementId};
use crate::errors::SemanticError;
use crate::program::Program;
use crate::types::TypeId;

bitflags! {
    /// Branch termination facts. An unconditional fact in a child branch
    /// becomes a conditional fact in its parent on leave.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlowFlags: u32 {
        const RETURNS = 1 << 0;
        const CONDITIONALLY_RETURNS = 1 << 1;
        const THROWS = 1 << 2;
        const CONDITIONALLY_THROWS = 1 << 3;
        const BREAKS = 1 << 4;
        const CONDITIONALLY_BREAKS = 1 << 5;
        const CONTINUES = 1 << 6;
        const CONDITIONALLY_CONTINUES = 1 << 7;
        const ALLOCATES = 1 << 8;
        const CONDITIONALLY_ALLOCATES = 1 << 9;
        /// The flow belongs to an inlined call; `this` may be a scoped local.
        const INLINE_CONTEXT = 1 << 10;
    }
}

/// A node in a function's control-flow tree.
#[derive(Debug)]
pub struct Flow {
    parent: Option<Box<Flow>>,
    pub flags: FlowFlags,
    pub function: ElementId,
    pub continue_label: Option<String>,
    pub break_label: Option<String>,
    pub return_label: Option<String>,
    pub return_type: TypeId,
    pub contextual_type_arguments: FxHashMap<String, TypeId>,
    scoped_locals: Option<FxHashMap<String, ElementId>>,
}

impl Flow {
    /// Create the root flow of a function.
    pub fn root(
        function: ElementId,
        return_type: TypeId,
        contextual_type_arguments: FxHashMap<String, TypeId>,
    ) -> Flow {
        Flow {
            parent: None,
            flags: FlowFlags::empty(),
            function,
            continue_label: None,
            break_label: None,
            return_label: None,
            return_type,
            contextual_type_arguments,
            scoped_locals: None,
        }
    }

    pub fn is_inline_context(&self) -> bool {
        self.flags.contains(FlowFlags::INLINE_CONTEXT)
    }

    pub fn set(&mut self, flags: FlowFlags) {
        self.flags |= flags;
    }

    pub fn is(&self, flags: FlowFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Enter a branch or scope, returning the child flow. Child modifications
    /// do not affect the parent until the matching leave.
    pub fn enter_branch_or_scope(self) -> Flow {
        Flow {
            flags: self.flags,
            function: self.function,
            continue_label: self.continue_label.clone(),
            break_label: self.break_label.clone(),
            return_label: self.return_label.clone(),
            return_type: self.return_type,
            contextual_type_arguments: self.contextual_type_arguments.clone(),
            scoped_locals: None,
            parent: Some(Box::new(self)),
        }
    }

    /// Leave a branch or scope: release every scoped local acquired since
    /// entry, fold unconditional facts into conditional parent facts, and
    /// return the parent flow. BREAKS/CONTINUES only fold when the child's
    /// label matches the parent's; otherwise the jump escapes this frame.
    pub fn leave_branch_or_scope(mut self, program: &mut Program) -> Flow {
        let mut parent = *self.parent.take().expect("leave called on the root flow");

        if let Some(scoped) = self.scoped_locals.take() {
            for (_, local) in scoped {
                program.free_temp_local(self.function, local);
            }
        }

        let flags = self.flags;
        if flags.contains(FlowFlags::RETURNS) {
            parent.set(FlowFlags::CONDITIONALLY_RETURNS);
        }
        if flags.contains(FlowFlags::THROWS) {
            parent.set(FlowFlags::CONDITIONALLY_THROWS);
        }
        if flags.contains(FlowFlags::ALLOCATES) {
            parent.set(FlowFlags::CONDITIONALLY_ALLOCATES);
        }
        if flags.contains(FlowFlags::BREAKS) && self.break_label == parent.break_label {
            parent.set(FlowFlags::CONDITIONALLY_BREAKS);
        }
        if flags.contains(FlowFlags::CONTINUES) && self.continue_label == parent.continue_label {
            parent.set(FlowFlags::CONDITIONALLY_CONTINUES);
        }

        parent
    }

    /// Bind `name` to a fresh temporary local of `ty` in this scope.
    /// A duplicate name within the same scope is a duplicate identifier.
    pub fn add_scoped_local(
        &mut self,
        program: &mut Program,
        name: &str,
        ty: TypeId,
        span: Span,
    ) -> Option<ElementId> {
        if self
            .scoped_locals
            .as_ref()
            .is_some_and(|locals| locals.contains_key(name))
        {
            program.diagnostics.error(
                SemanticError::DuplicateIdentifier {
                    name: name.to_string(),
                    span: span.into(),
                },
                span,
            );
            return None;
        }
        let local = program.get_temp_local(self.function, ty);
        program.elements.get_mut(local).flags |= CommonFlags::SCOPED;
        self.scoped_locals
            .get_or_insert_with(FxHashMap::default)
            .insert(name.to_string(), local);
        Some(local)
    }

    /// Look up a scoped local by name, walking parent flows, then the
    /// function's own locals.
    pub fn get_scoped_local(&self, program: &Program, name: &str) -> Option<ElementId> {
        let mut current = Some(self);
        while let Some(flow) = current {
            if let Some(locals) = &flow.scoped_locals {
                if let Some(local) = locals.get(name) {
                    return Some(*local);
                }
            }
            current = flow.parent.as_deref();
        }
        program
            .elements
            .get(self.function)
            .function()
            .locals_by_name
            .get(name)
            .copied()
    }
}
