// program.rs
//
// The Program aggregate: owns the element arena, the type registry, the name
// table and every lookup table, and exposes the emitter-facing surface.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use stave_frontend::{Source, TypeDeclaration};
use stave_identity::{NameId, NameTable, Span, INNER_DELIMITER};

use crate::elements::{
    CommonFlags, DecoratorFlags, Element, ElementArena, ElementId, ElementKind, ElementPayload,
    FunctionTargetData, LocalData, OperatorKind,
};
use crate::errors::Diagnostics;
use crate::flow::Flow;
use crate::types::{PointerWidth, SignatureId, Ty, TypeId, TypeRegistry};

/// Compilation options the host passes to [`Program::new`].
#[derive(Debug, Clone, Default)]
pub struct ProgramOptions {
    /// Pointer width of the target; decides `isize`/`usize` and reference sizes.
    pub pointer_width: PointerWidth,
    /// Pass-through hook: whether the emitter should produce a source map.
    pub source_map: bool,
    /// `alias -> name` bindings applied at the end of initialization.
    pub global_aliases: Vec<(String, String)>,
}

/// An import that could not be resolved immediately; retried in the drain
/// phase, with an alternative spelling for the `/index` equivalence rule.
#[derive(Debug)]
pub(crate) struct QueuedImport {
    /// Internal name the import binds in the importing file.
    pub local_name: NameId,
    pub referenced_name: NameId,
    pub referenced_name_alt: Option<NameId>,
    /// Imported module path and member, for diagnostics.
    pub module_path: String,
    pub member: String,
    pub span: Span,
}

/// An export whose target was not yet known at its declaration; re-exports
/// chain through this queue.
#[derive(Debug)]
pub(crate) struct QueuedExport {
    pub is_re_export: bool,
    pub referenced_name: NameId,
    /// Simple name the member is exported as.
    pub exported_simple_name: String,
    pub source_is_entry: bool,
    /// Referenced module path and member, for diagnostics.
    pub module_path: String,
    pub member: String,
    pub span: Span,
}

/// A program-global type alias (`type T<…> = …`), expanded on lookup.
#[derive(Debug, Clone)]
pub(crate) struct TypeAliasDef {
    pub declaration: Rc<TypeDeclaration>,
    pub file_path: String,
}

/// The long-lived semantic-analysis aggregate. One instance per compilation;
/// single-threaded, no internal locking.
#[derive(Debug)]
pub struct Program {
    pub options: ProgramOptions,
    pub sources: Vec<Rc<Source>>,
    pub names: NameTable,
    pub types: TypeRegistry,
    pub elements: ElementArena,
    pub diagnostics: Diagnostics,

    /// Primary element lookup: internal name -> element. Uniqueness of the
    /// key is an invariant; collisions report duplicate identifiers.
    pub elements_lookup: FxHashMap<NameId, ElementId>,
    /// Exports visible to other files, keyed by the exporting internal name.
    pub file_level_exports: FxHashMap<NameId, ElementId>,
    /// Exports of entry sources, keyed by simple name.
    pub module_level_exports: FxHashMap<NameId, ElementId>,

    pub(crate) type_aliases: FxHashMap<String, TypeAliasDef>,
    pub(crate) queued_imports: Vec<QueuedImport>,
    pub(crate) queued_exports: FxHashMap<NameId, QueuedExport>,
    pub(crate) queued_extends: Vec<ElementId>,
    pub(crate) queued_implements: Vec<ElementId>,

    /// Well-known prototypes stashed at the end of initialization.
    pub array_prototype: Option<ElementId>,
    pub array_buffer_view_prototype: Option<ElementId>,
    /// The resolved `String` class instance.
    pub string_instance: Option<ElementId>,

    /// Function targets cached per signature.
    function_targets: FxHashMap<SignatureId, ElementId>,
}

impl Program {
    pub fn new(options: ProgramOptions) -> Self {
        let mut names = NameTable::new();
        let mut types = TypeRegistry::new(options.pointer_width);
        types.register_base_names(&mut names);
        Self {
            options,
            sources: Vec::new(),
            names,
            types,
            elements: ElementArena::new(),
            diagnostics: Diagnostics::new(),
            elements_lookup: FxHashMap::default(),
            file_level_exports: FxHashMap::default(),
            module_level_exports: FxHashMap::default(),
            type_aliases: FxHashMap::default(),
            queued_imports: Vec::new(),
            queued_exports: FxHashMap::default(),
            queued_extends: Vec::new(),
            queued_implements: Vec::new(),
            array_prototype: None,
            array_buffer_view_prototype: None,
            string_instance: None,
            function_targets: FxHashMap::default(),
        }
    }

    /// Add a parsed source. Sources are processed in the order added.
    pub fn add_source(&mut self, source: Rc<Source>) {
        self.sources.push(source);
    }

    /// Look up an element by interned internal name.
    pub fn lookup_element(&self, name: NameId) -> Option<ElementId> {
        self.elements_lookup.get(&name).copied()
    }

    /// Look up an element by internal name string without interning it.
    pub fn lookup_element_str(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).and_then(|id| self.lookup_element(id))
    }

    pub(crate) fn new_element(
        kind: ElementKind,
        simple_name: &str,
        internal_name: NameId,
        payload: ElementPayload,
    ) -> Element {
        Element {
            kind,
            simple_name: simple_name.to_string(),
            internal_name,
            flags: CommonFlags::empty(),
            decorator_flags: DecoratorFlags::empty(),
            members: FxHashMap::default(),
            parent_namespace: None,
            payload,
        }
    }

    // ========================================================================
    // Function locals and break contexts (emitter-facing)
    // ========================================================================

    /// Append a named local to a function and return it.
    pub fn add_local(&mut self, function: ElementId, name: &str, ty: TypeId) -> ElementId {
        let local = self.add_unnamed_local(function, ty);
        self.elements.get_mut(local).simple_name = name.to_string();
        let data = self.elements.get_mut(function).function_mut();
        debug_assert!(
            !data.locals_by_name.contains_key(name),
            "local '{name}' already exists"
        );
        data.locals_by_name.insert(name.to_string(), local);
        local
    }

    /// Append a local without binding a name (temporaries).
    fn add_unnamed_local(&mut self, function: ElementId, ty: TypeId) -> ElementId {
        let function_internal = self.elements.get(function).internal_name;
        let index = self.elements.get(function).function().locals.len() as u32;
        let internal_name = self.names.intern_member(
            function_internal,
            INNER_DELIMITER,
            &format!("local{index}"),
        );
        let element = Self::new_element(
            ElementKind::Local,
            &format!("local{index}"),
            internal_name,
            ElementPayload::Local(LocalData { ty, index }),
        );
        let local = self.elements.alloc(element);
        self.elements
            .get_mut(function)
            .function_mut()
            .locals
            .push(local);
        local
    }

    /// Pop a free temporary local of the matching native type, or allocate a
    /// new one.
    pub fn get_temp_local(&mut self, function: ElementId, ty: TypeId) -> ElementId {
        let pool = self.types.native_type(ty).pool_index();
        let recycled = self
            .elements
            .get_mut(function)
            .function_mut()
            .temp_pools[pool]
            .pop();
        match recycled {
            Some(local) => local,
            None => self.add_unnamed_local(function, ty),
        }
    }

    /// Return a temporary local to its pool. Inlined locals are not recycled.
    pub fn free_temp_local(&mut self, function: ElementId, local: ElementId) {
        let element = self.elements.get(local);
        if element.flags.contains(CommonFlags::INLINED) {
            return;
        }
        let pool = self.types.native_type(element.local().ty).pool_index();
        self.elements
            .get_mut(function)
            .function_mut()
            .temp_pools[pool]
            .push(local);
    }

    /// Enter a break/continue context, returning its label.
    pub fn enter_break_context(&mut self, function: ElementId) -> String {
        let data = self.elements.get_mut(function).function_mut();
        let id = data.next_break_id;
        data.next_break_id += 1;
        data.break_stack.push(id);
        id.to_string()
    }

    /// Leave the innermost break/continue context.
    pub fn leave_break_context(&mut self, function: ElementId) {
        let data = self.elements.get_mut(function).function_mut();
        let popped = data.break_stack.pop();
        debug_assert!(popped.is_some(), "unbalanced break context");
    }

    /// The label of the innermost break/continue context, if any.
    pub fn current_break_label(&self, function: ElementId) -> Option<String> {
        self.elements
            .get(function)
            .function()
            .break_stack
            .last()
            .map(|id| id.to_string())
    }

    /// Finish compiling a function: asserts balanced break contexts and marks
    /// the function compiled.
    pub fn finalize_function(&mut self, function: ElementId) {
        let element = self.elements.get_mut(function);
        debug_assert!(
            element.function().break_stack.is_empty(),
            "unbalanced break contexts at finalize"
        );
        element.flags |= CommonFlags::COMPILED;
    }

    /// Take a resolved function's root flow (created at resolution).
    pub fn take_root_flow(&mut self, function: ElementId) -> Option<Flow> {
        self.elements.get_mut(function).function_mut().flow.take()
    }

    // ========================================================================
    // Function targets
    // ========================================================================

    /// The signature-only function reference used for indirect calls, cached
    /// per signature.
    pub fn function_target(&mut self, signature: SignatureId) -> ElementId {
        if let Some(existing) = self.function_targets.get(&signature) {
            return *existing;
        }
        let ty = self.types.function_type(signature);
        let name = self.signature_to_string(signature);
        let internal_name = self.names.intern(&name);
        let element = Self::new_element(
            ElementKind::FunctionTarget,
            &name,
            internal_name,
            ElementPayload::FunctionTarget(FunctionTargetData { signature, ty }),
        );
        let id = self.elements.alloc(element);
        self.function_targets.insert(signature, id);
        id
    }

    // ========================================================================
    // Class queries (emitter-facing)
    // ========================================================================

    /// Whether class instance `a` is assignable to class instance `b`:
    /// the same instance or any transitive base.
    pub fn class_is_assignable_to(&self, a: ElementId, b: ElementId) -> bool {
        let mut current = Some(a);
        while let Some(id) = current {
            if id == b {
                return true;
            }
            current = self.elements.get(id).class().base;
        }
        false
    }

    /// Look up an operator overload on a class, walking the base chain and
    /// returning the lowest-depth definition.
    pub fn lookup_overload(&self, class: ElementId, kind: OperatorKind) -> Option<ElementId> {
        let mut current = Some(class);
        while let Some(id) = current {
            let data = self.elements.get(id).class();
            if let Some((_, function)) = data
                .operator_overloads
                .iter()
                .find(|(overload_kind, _)| *overload_kind == kind)
            {
                return Some(*function);
            }
            current = data.base;
        }
        None
    }

    // ========================================================================
    // Canonical type strings
    // ========================================================================

    /// Canonical display string of a type; used in diagnostics and as the
    /// generic internal-name suffix.
    pub fn type_to_string(&self, ty: TypeId) -> String {
        match self.types.get(ty) {
            Ty::Void => "void".to_string(),
            Ty::Bool => "bool".to_string(),
            Ty::Integer(kind) => kind.name().to_string(),
            Ty::Float(kind) => kind.name().to_string(),
            Ty::Function(signature) => self.signature_to_string(*signature),
            Ty::Class { class, nullable } => {
                let name = self.names.resolve(self.elements.get(*class).internal_name);
                if *nullable {
                    format!("{name} | null")
                } else {
                    name.to_string()
                }
            }
        }
    }

    /// Canonical display string of a signature: `(p1,p2)=>ret`.
    pub fn signature_to_string(&self, signature: SignatureId) -> String {
        let data = self.types.signature(signature).clone();
        let mut out = String::from("(");
        for (index, parameter) in data.parameter_types.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            out.push_str(&self.type_to_string(*parameter));
        }
        out.push_str(")=>");
        out.push_str(&self.type_to_string(data.return_type));
        out
    }

    /// Canonical instance key of a type-argument list.
    pub fn type_args_key(&self, args: &[TypeId]) -> String {
        args.iter()
            .map(|arg| self.type_to_string(*arg))
            .collect::<Vec<_>>()
            .join(",")
    }
}
