// initializer.rs
//
// Single pass over the parsed sources that materializes prototype elements
// and populates the element graph. Forward references (extends, implements,
// imports, exports) are queued and drained at the end of the pass.
//
// Recovery is always skip-and-continue: on a user error the first declaration
// wins and the offending one is dropped.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use stave_frontend::{
    ClassDeclaration, ClassMember, DecoratorKind, DecoratorNode, EnumDeclaration, ExportStatement,
    Expression, FunctionDeclaration, ImportStatement, NamespaceDeclaration, Source, Statement,
    TypeDeclaration, TypeNode, VariableStatement,
};
use stave_identity::{
    NameId, NameTable, Span, GETTER_PREFIX, INSTANCE_DELIMITER, SETTER_PREFIX, STATIC_DELIMITER,
};

use crate::elements::{
    ClassPrototypeData, CommonFlags, DecoratorFlags, ElementId, ElementKind, ElementPayload,
    EnumData, EnumValueData, FieldPrototypeData, FunctionPrototypeData, GlobalData,
    GlobalDeclaration, NamespaceData, OperatorKind, PropertyData,
};
use crate::errors::{SemanticError, SemanticWarning};
use crate::program::{Program, QueuedExport, QueuedImport, TypeAliasDef};

impl Program {
    /// Run the initializer over all added sources, in input order, then drain
    /// the deferred work-lists. Produces a ready element graph.
    pub fn initialize(&mut self) {
        let sources = self.sources.clone();
        for source in &sources {
            tracing::debug!(path = %source.normalized_path, "initializing source");
            for statement in &source.statements {
                self.initialize_statement(statement, source, None);
            }
        }
        self.drain_imports();
        self.drain_exports();
        self.drain_extends();
        self.drain_implements();
        self.apply_global_aliases();
        self.register_well_known();
    }

    fn initialize_statement(
        &mut self,
        statement: &Statement,
        source: &Source,
        parent: Option<ElementId>,
    ) {
        match statement {
            Statement::Class(declaration) => {
                self.initialize_class(declaration, source, parent, false);
            }
            Statement::Interface(declaration) => {
                self.initialize_class(declaration, source, parent, true);
            }
            Statement::Function(declaration) => {
                self.initialize_function(declaration, source, parent);
            }
            Statement::Enum(declaration) => self.initialize_enum(declaration, source, parent),
            Statement::Namespace(declaration) => {
                self.initialize_namespace(declaration, source, parent);
            }
            Statement::TypeAlias(declaration) => {
                self.initialize_type_alias(declaration, source, parent);
            }
            Statement::Variable(statement) => self.initialize_variables(statement, source, parent),
            Statement::Import(statement) => self.initialize_import(statement, source),
            Statement::Export(statement) => self.initialize_export(statement, source),
        }
    }

    // ========================================================================
    // Shared declaration plumbing
    // ========================================================================

    /// The internal name of a declaration: namespace-qualified when nested,
    /// file-level otherwise.
    fn internal_name_for(
        &mut self,
        source: &Source,
        parent: Option<ElementId>,
        simple: &str,
    ) -> NameId {
        match parent {
            Some(namespace) => {
                let parent_name = self.elements.get(namespace).internal_name;
                self.names
                    .intern_member(parent_name, STATIC_DELIMITER, simple)
            }
            None => self.names.intern_file_level(&source.normalized_path, simple),
        }
    }

    /// Report a duplicate identifier if the internal name is already taken.
    fn report_collision(&mut self, internal_name: NameId, simple: &str, span: Span) -> bool {
        if self.elements_lookup.contains_key(&internal_name) {
            self.diagnostics.error(
                SemanticError::DuplicateIdentifier {
                    name: simple.to_string(),
                    span: span.into(),
                },
                span,
            );
            return true;
        }
        false
    }

    /// Insert a new top-level or namespace-member declaration into the graph
    /// and apply export and global promotion.
    fn commit_declaration(
        &mut self,
        id: ElementId,
        source: &Source,
        parent: Option<ElementId>,
        span: Span,
    ) {
        let (internal_name, simple, flags, decorator_flags) = {
            let element = self.elements.get(id);
            (
                element.internal_name,
                element.simple_name.clone(),
                element.flags,
                element.decorator_flags,
            )
        };
        self.names
            .set_location(internal_name, &source.normalized_path, span);
        self.elements_lookup.insert(internal_name, id);
        if let Some(namespace) = parent {
            self.elements
                .get_mut(namespace)
                .members
                .insert(simple.clone(), id);
        }

        let exported_at_file_top = parent.is_none() && flags.contains(CommonFlags::EXPORT);
        if exported_at_file_top {
            self.add_file_level_export(internal_name, id, source.is_entry, &simple, span);
        }

        // Global promotion: `@global` declarations and library-top exports are
        // also published under their simple name.
        if decorator_flags.contains(DecoratorFlags::GLOBAL)
            || (source.is_library && exported_at_file_top)
        {
            self.promote_global(id, &simple, span);
        }
    }

    fn add_file_level_export(
        &mut self,
        exported_name: NameId,
        id: ElementId,
        is_entry: bool,
        simple: &str,
        span: Span,
    ) {
        use std::collections::hash_map::Entry;
        match self.file_level_exports.entry(exported_name) {
            Entry::Occupied(existing) => {
                if *existing.get() != id {
                    self.diagnostics.error(
                        SemanticError::ExportConflict {
                            name: simple.to_string(),
                            span: span.into(),
                        },
                        span,
                    );
                }
                return;
            }
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }
        if is_entry {
            let simple_name = self.names.intern(simple);
            match self.module_level_exports.entry(simple_name) {
                Entry::Occupied(existing) => {
                    if *existing.get() != id {
                        self.diagnostics.error(
                            SemanticError::ExportConflict {
                                name: simple.to_string(),
                                span: span.into(),
                            },
                            span,
                        );
                        return;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(id);
                }
            }
            self.elements.get_mut(id).flags |= CommonFlags::MODULE_EXPORT;
        }
    }

    /// Publish an element under its simple name in the element lookup.
    fn promote_global(&mut self, id: ElementId, simple: &str, span: Span) {
        let simple_name = self.names.intern(simple);
        if let Some(existing) = self.elements_lookup.get(&simple_name) {
            if *existing != id {
                self.diagnostics.error(
                    SemanticError::DuplicateIdentifier {
                        name: simple.to_string(),
                        span: span.into(),
                    },
                    span,
                );
            }
            return;
        }
        self.elements_lookup.insert(simple_name, id);
        let element = self.elements.get_mut(id);
        if element.flags.contains(CommonFlags::BUILTIN) {
            element.internal_name = simple_name;
        }
    }

    /// Filter a declaration's decorators against its kind's allowed set.
    /// Unknown or misplaced decorators warn; duplicates error. `@operator`
    /// is routed separately by method initialization when permitted.
    fn filter_decorators(
        &mut self,
        decorators: &[DecoratorNode],
        allowed: DecoratorFlags,
        allow_operator: bool,
    ) -> DecoratorFlags {
        let mut flags = DecoratorFlags::empty();
        for decorator in decorators {
            let flag = match decorator.kind() {
                DecoratorKind::Global => DecoratorFlags::GLOBAL,
                DecoratorKind::Sealed => DecoratorFlags::SEALED,
                DecoratorKind::Unmanaged => DecoratorFlags::UNMANAGED,
                DecoratorKind::Inline => DecoratorFlags::INLINE,
                DecoratorKind::Operator => {
                    if !allow_operator {
                        self.warn_decorator(decorator);
                    }
                    continue;
                }
                DecoratorKind::Custom => {
                    self.warn_decorator(decorator);
                    continue;
                }
            };
            if !allowed.contains(flag) {
                self.warn_decorator(decorator);
                continue;
            }
            if flags.contains(flag) {
                self.diagnostics.error(
                    SemanticError::DuplicateDecorator {
                        name: decorator.name.text.clone(),
                        span: decorator.span.into(),
                    },
                    decorator.span,
                );
                continue;
            }
            flags |= flag;
        }
        flags
    }

    fn warn_decorator(&mut self, decorator: &DecoratorNode) {
        self.diagnostics.warning(
            SemanticWarning::DecoratorNotValidHere {
                name: decorator.name.text.clone(),
                span: decorator.span.into(),
            },
            decorator.span,
        );
    }

    /// Extract the operator kind from an `@operator("<symbol>")` annotation.
    fn extract_operator_kind(&mut self, decorators: &[DecoratorNode]) -> Option<OperatorKind> {
        for decorator in decorators {
            if decorator.kind() != DecoratorKind::Operator {
                continue;
            }
            match decorator.arguments.first() {
                Some(Expression::StringLiteral(literal)) => {
                    match OperatorKind::from_symbol(&literal.value) {
                        Some(kind) => return Some(kind),
                        None => self.diagnostics.error(
                            SemanticError::OperationNotSupported {
                                span: literal.span.into(),
                            },
                            literal.span,
                        ),
                    }
                }
                _ => self.diagnostics.error(
                    SemanticError::StringLiteralExpected {
                        span: decorator.span.into(),
                    },
                    decorator.span,
                ),
            }
        }
        None
    }

    fn derive_common_flags(declared: CommonFlags, is_generic: bool) -> CommonFlags {
        let mut flags = declared;
        if declared.contains(CommonFlags::DECLARE) {
            flags |= CommonFlags::AMBIENT;
        }
        if is_generic {
            flags |= CommonFlags::GENERIC;
        }
        flags
    }

    // ========================================================================
    // Classes and interfaces
    // ========================================================================

    fn initialize_class(
        &mut self,
        declaration: &Rc<ClassDeclaration>,
        source: &Source,
        parent: Option<ElementId>,
        is_interface: bool,
    ) {
        let allowed = if is_interface {
            DecoratorFlags::GLOBAL
        } else {
            DecoratorFlags::GLOBAL | DecoratorFlags::SEALED | DecoratorFlags::UNMANAGED
        };
        let decorator_flags = self.filter_decorators(&declaration.decorators, allowed, false);

        let simple = declaration.name.text.clone();
        let internal_name = self.internal_name_for(source, parent, &simple);
        if self.report_collision(internal_name, &simple, declaration.name.span) {
            return;
        }

        let kind = if is_interface {
            ElementKind::InterfacePrototype
        } else {
            ElementKind::ClassPrototype
        };
        let mut element = Self::new_element(
            kind,
            &simple,
            internal_name,
            ElementPayload::ClassPrototype(ClassPrototypeData {
                declaration: declaration.clone(),
                file_path: source.normalized_path.clone(),
                instance_member_order: Vec::new(),
                instance_members: Default::default(),
                constructor_prototype: None,
                operator_prototypes: Vec::new(),
                base_prototype: None,
                implements_prototypes: Vec::new(),
                instances: Default::default(),
            }),
        );
        element.flags =
            Self::derive_common_flags(declaration.flags, !declaration.type_parameters.is_empty());
        element.decorator_flags = decorator_flags;
        element.parent_namespace = parent;
        let id = self.elements.alloc(element);
        self.commit_declaration(id, source, parent, declaration.name.span);

        for member in &declaration.members {
            match member {
                ClassMember::Field(field) => self.initialize_field(field, id, source),
                ClassMember::Method(method) => self.initialize_method(method, id, source),
            }
        }

        if declaration.extends_type.is_some() {
            self.queued_extends.push(id);
        }
        if !declaration.implements_types.is_empty() {
            self.queued_implements.push(id);
        }
    }

    fn initialize_field(
        &mut self,
        declaration: &Rc<stave_frontend::FieldDeclaration>,
        class: ElementId,
        source: &Source,
    ) {
        let simple = declaration.name.text.clone();
        let class_internal = self.elements.get(class).internal_name;

        if declaration.flags.contains(CommonFlags::STATIC) {
            // Static fields are globals under `Class.field`.
            let internal_name =
                self.names
                    .intern_member(class_internal, STATIC_DELIMITER, &simple);
            if self.elements.get(class).members.contains_key(&simple) {
                self.duplicate_identifier(&simple, declaration.name.span);
                return;
            }
            let constant_value = match (&declaration.initializer, declaration.flags) {
                (Some(Expression::IntegerLiteral(literal)), flags)
                    if flags.contains(CommonFlags::READONLY) =>
                {
                    Some(literal.value)
                }
                _ => None,
            };
            let mut element = Self::new_element(
                ElementKind::Global,
                &simple,
                internal_name,
                ElementPayload::Global(GlobalData {
                    declaration: Some(GlobalDeclaration::Field(declaration.clone())),
                    file_path: source.normalized_path.clone(),
                    ty: crate::types::TypeId::VOID,
                    constant_value,
                }),
            );
            element.flags = declaration.flags;
            let id = self.elements.alloc(element);
            self.elements.get_mut(class).members.insert(simple, id);
            return;
        }

        let internal_name = self
            .names
            .intern_member(class_internal, INSTANCE_DELIMITER, &simple);
        if self
            .elements
            .get(class)
            .class_prototype()
            .instance_members
            .contains_key(&simple)
        {
            self.duplicate_identifier(&simple, declaration.name.span);
            return;
        }
        let mut element = Self::new_element(
            ElementKind::FieldPrototype,
            &simple,
            internal_name,
            ElementPayload::FieldPrototype(FieldPrototypeData {
                declaration: declaration.clone(),
                class_prototype: class,
            }),
        );
        element.flags = declaration.flags | CommonFlags::INSTANCE;
        let id = self.elements.alloc(element);
        let data = self.elements.get_mut(class).class_prototype_mut();
        data.instance_member_order.push(simple.clone());
        data.instance_members.insert(simple, id);
    }

    fn initialize_method(
        &mut self,
        declaration: &Rc<FunctionDeclaration>,
        class: ElementId,
        source: &Source,
    ) {
        let operator_kind = self.extract_operator_kind(&declaration.decorators);
        let decorator_flags =
            self.filter_decorators(&declaration.decorators, DecoratorFlags::INLINE, true);

        let simple = declaration.name.text.clone();
        let is_static = declaration.flags.contains(CommonFlags::STATIC);
        let is_constructor = declaration.flags.contains(CommonFlags::CONSTRUCTOR);
        let is_getter = declaration.flags.contains(CommonFlags::GET);
        let is_setter = declaration.flags.contains(CommonFlags::SET);
        let class_internal = self.elements.get(class).internal_name;

        // Accessors prepend get:/set: to the property's simple name.
        let base_name = if is_getter {
            format!("{GETTER_PREFIX}{simple}")
        } else if is_setter {
            format!("{SETTER_PREFIX}{simple}")
        } else {
            simple.clone()
        };
        let separator = if is_static {
            STATIC_DELIMITER
        } else {
            INSTANCE_DELIMITER
        };
        let internal_name = self
            .names
            .intern_member(class_internal, separator, &base_name);

        let mut element = Self::new_element(
            ElementKind::FunctionPrototype,
            &base_name,
            internal_name,
            ElementPayload::FunctionPrototype(FunctionPrototypeData {
                declaration: declaration.clone(),
                file_path: source.normalized_path.clone(),
                class_prototype: Some(class),
                operator_kind,
                instances: Default::default(),
                class_type_arguments: None,
            }),
        );
        let mut flags =
            Self::derive_common_flags(declaration.flags, !declaration.type_parameters.is_empty());
        if !is_static {
            flags |= CommonFlags::INSTANCE;
        }
        element.flags = flags;
        element.decorator_flags = decorator_flags;
        let id = self.elements.alloc(element);

        if is_constructor {
            if self
                .elements
                .get(class)
                .class_prototype()
                .constructor_prototype
                .is_some()
            {
                self.diagnostics.error(
                    SemanticError::MultipleConstructors {
                        span: declaration.name.span.into(),
                    },
                    declaration.name.span,
                );
                return;
            }
            self.elements
                .get_mut(class)
                .class_prototype_mut()
                .constructor_prototype = Some(id);
            return;
        }

        if is_getter || is_setter {
            self.join_property_accessor(class, &simple, id, is_getter, is_static, declaration);
            return;
        }

        if is_static {
            // Static methods become top-level functions under `Class.method`.
            if self.report_collision(internal_name, &base_name, declaration.name.span) {
                return;
            }
            if self.elements.get(class).members.contains_key(&simple) {
                self.duplicate_identifier(&simple, declaration.name.span);
                return;
            }
            self.elements_lookup.insert(internal_name, id);
            self.elements
                .get_mut(class)
                .members
                .insert(simple.clone(), id);
        } else {
            if self
                .elements
                .get(class)
                .class_prototype()
                .instance_members
                .contains_key(&simple)
            {
                self.duplicate_identifier(&simple, declaration.name.span);
                return;
            }
            let data = self.elements.get_mut(class).class_prototype_mut();
            data.instance_member_order.push(simple.clone());
            data.instance_members.insert(simple.clone(), id);
        }

        if let Some(kind) = operator_kind {
            let exists = self
                .elements
                .get(class)
                .class_prototype()
                .operator_prototypes
                .iter()
                .any(|(existing, _)| *existing == kind);
            if exists {
                self.diagnostics.error(
                    SemanticError::DuplicateFunctionImplementation {
                        name: simple,
                        span: declaration.name.span.into(),
                    },
                    declaration.name.span,
                );
                return;
            }
            self.elements
                .get_mut(class)
                .class_prototype_mut()
                .operator_prototypes
                .push((kind, id));
        }
    }

    /// Join a getter or setter into the Property element of its simple name,
    /// creating the property on first occurrence.
    fn join_property_accessor(
        &mut self,
        class: ElementId,
        simple: &str,
        accessor: ElementId,
        is_getter: bool,
        is_static: bool,
        declaration: &FunctionDeclaration,
    ) {
        let existing = if is_static {
            self.elements.get(class).members.get(simple).copied()
        } else {
            self.elements
                .get(class)
                .class_prototype()
                .instance_members
                .get(simple)
                .copied()
        };

        let property = match existing {
            Some(id) if self.elements.get(id).kind == ElementKind::Property => id,
            Some(_) => {
                self.duplicate_identifier(simple, declaration.name.span);
                return;
            }
            None => {
                let class_internal = self.elements.get(class).internal_name;
                let separator = if is_static {
                    STATIC_DELIMITER
                } else {
                    INSTANCE_DELIMITER
                };
                let internal_name = self.names.intern_member(class_internal, separator, simple);
                let mut element = Self::new_element(
                    ElementKind::Property,
                    simple,
                    internal_name,
                    ElementPayload::Property(PropertyData {
                        parent: class,
                        getter_prototype: None,
                        setter_prototype: None,
                    }),
                );
                if !is_static {
                    element.flags |= CommonFlags::INSTANCE;
                }
                let id = self.elements.alloc(element);
                if is_static {
                    self.elements
                        .get_mut(class)
                        .members
                        .insert(simple.to_string(), id);
                } else {
                    let data = self.elements.get_mut(class).class_prototype_mut();
                    data.instance_member_order.push(simple.to_string());
                    data.instance_members.insert(simple.to_string(), id);
                }
                id
            }
        };

        let data = self.elements.get_mut(property).property_mut();
        let slot = if is_getter {
            &mut data.getter_prototype
        } else {
            &mut data.setter_prototype
        };
        if slot.is_some() {
            self.duplicate_identifier(simple, declaration.name.span);
            return;
        }
        *slot = Some(accessor);
    }

    // ========================================================================
    // Functions, enums, namespaces, aliases, variables
    // ========================================================================

    fn initialize_function(
        &mut self,
        declaration: &Rc<FunctionDeclaration>,
        source: &Source,
        parent: Option<ElementId>,
    ) {
        let decorator_flags = self.filter_decorators(
            &declaration.decorators,
            DecoratorFlags::GLOBAL | DecoratorFlags::INLINE,
            false,
        );
        let simple = declaration.name.text.clone();
        let internal_name = self.internal_name_for(source, parent, &simple);
        if self.report_collision(internal_name, &simple, declaration.name.span) {
            return;
        }
        let mut element = Self::new_element(
            ElementKind::FunctionPrototype,
            &simple,
            internal_name,
            ElementPayload::FunctionPrototype(FunctionPrototypeData {
                declaration: declaration.clone(),
                file_path: source.normalized_path.clone(),
                class_prototype: None,
                operator_kind: None,
                instances: Default::default(),
                class_type_arguments: None,
            }),
        );
        element.flags =
            Self::derive_common_flags(declaration.flags, !declaration.type_parameters.is_empty());
        element.decorator_flags = decorator_flags;
        element.parent_namespace = parent;
        let id = self.elements.alloc(element);
        self.commit_declaration(id, source, parent, declaration.name.span);
    }

    fn initialize_enum(
        &mut self,
        declaration: &Rc<EnumDeclaration>,
        source: &Source,
        parent: Option<ElementId>,
    ) {
        let decorator_flags =
            self.filter_decorators(&declaration.decorators, DecoratorFlags::GLOBAL, false);
        let simple = declaration.name.text.clone();
        let internal_name = self.internal_name_for(source, parent, &simple);
        if self.report_collision(internal_name, &simple, declaration.name.span) {
            return;
        }
        let mut element = Self::new_element(
            ElementKind::Enum,
            &simple,
            internal_name,
            ElementPayload::Enum(EnumData {
                declaration: declaration.clone(),
            }),
        );
        element.flags = Self::derive_common_flags(declaration.flags, false);
        element.decorator_flags = decorator_flags;
        element.parent_namespace = parent;
        let id = self.elements.alloc(element);
        self.commit_declaration(id, source, parent, declaration.name.span);

        // Values without initializers continue from the previous constant;
        // a non-constant initializer interrupts the sequence.
        let mut next: Option<i64> = Some(0);
        for value in &declaration.values {
            let computed = match &value.initializer {
                Some(Expression::IntegerLiteral(literal)) => {
                    next = Some(literal.value + 1);
                    Some(literal.value)
                }
                Some(_) => {
                    next = None;
                    None
                }
                None => {
                    let current = next;
                    next = next.map(|n| n + 1);
                    current
                }
            };
            let value_name = value.name.text.clone();
            if self.elements.get(id).members.contains_key(&value_name) {
                self.duplicate_identifier(&value_name, value.name.span);
                continue;
            }
            let value_internal =
                self.names
                    .intern_member(internal_name, STATIC_DELIMITER, &value_name);
            let element = Self::new_element(
                ElementKind::EnumValue,
                &value_name,
                value_internal,
                ElementPayload::EnumValue(EnumValueData {
                    parent_enum: id,
                    value: computed,
                }),
            );
            let value_id = self.elements.alloc(element);
            self.elements.get_mut(id).members.insert(value_name, value_id);
        }
    }

    fn initialize_namespace(
        &mut self,
        declaration: &Rc<NamespaceDeclaration>,
        source: &Source,
        parent: Option<ElementId>,
    ) {
        let simple = declaration.name.text.clone();
        let internal_name = self.internal_name_for(source, parent, &simple);

        let id = match self.lookup_element(internal_name) {
            // Merging declaration: same element, combined members.
            Some(existing) if self.elements.get(existing).kind == ElementKind::Namespace => {
                let existing_exported = self
                    .elements
                    .get(existing)
                    .flags
                    .contains(CommonFlags::EXPORT);
                let new_exported = declaration.flags.contains(CommonFlags::EXPORT);
                if existing_exported != new_exported {
                    self.diagnostics.error(
                        SemanticError::MergedDeclarationExportMismatch {
                            name: simple.clone(),
                            span: declaration.name.span.into(),
                        },
                        declaration.name.span,
                    );
                }
                existing
            }
            Some(_) => {
                self.duplicate_identifier(&simple, declaration.name.span);
                return;
            }
            None => {
                let mut element = Self::new_element(
                    ElementKind::Namespace,
                    &simple,
                    internal_name,
                    ElementPayload::Namespace(NamespaceData {
                        declaration: declaration.clone(),
                    }),
                );
                element.flags = Self::derive_common_flags(declaration.flags, false);
                element.parent_namespace = parent;
                let id = self.elements.alloc(element);
                self.commit_declaration(id, source, parent, declaration.name.span);
                id
            }
        };

        for member in &declaration.members {
            self.initialize_statement(member, source, Some(id));
        }
    }

    fn initialize_type_alias(
        &mut self,
        declaration: &Rc<TypeDeclaration>,
        source: &Source,
        parent: Option<ElementId>,
    ) {
        // Namespaced type aliases are not supported.
        if parent.is_some() {
            self.diagnostics.error(
                SemanticError::OperationNotSupported {
                    span: declaration.span.into(),
                },
                declaration.span,
            );
            return;
        }
        let simple = declaration.name.text.clone();
        if self.type_aliases.contains_key(&simple) {
            self.duplicate_identifier(&simple, declaration.name.span);
            return;
        }
        self.type_aliases.insert(
            simple,
            TypeAliasDef {
                declaration: declaration.clone(),
                file_path: source.normalized_path.clone(),
            },
        );
    }

    fn initialize_variables(
        &mut self,
        statement: &VariableStatement,
        source: &Source,
        parent: Option<ElementId>,
    ) {
        for declaration in &statement.declarations {
            let decorator_flags =
                self.filter_decorators(&declaration.decorators, DecoratorFlags::GLOBAL, false);
            let simple = declaration.name.text.clone();
            let internal_name = self.internal_name_for(source, parent, &simple);
            if self.report_collision(internal_name, &simple, declaration.name.span) {
                continue;
            }
            let constant_value = match (&declaration.initializer, declaration.flags) {
                (Some(Expression::IntegerLiteral(literal)), flags)
                    if flags.contains(CommonFlags::CONST) =>
                {
                    Some(literal.value)
                }
                _ => None,
            };
            let mut element = Self::new_element(
                ElementKind::Global,
                &simple,
                internal_name,
                ElementPayload::Global(GlobalData {
                    declaration: Some(GlobalDeclaration::Variable(declaration.clone())),
                    file_path: source.normalized_path.clone(),
                    ty: crate::types::TypeId::VOID,
                    constant_value,
                }),
            );
            element.flags = Self::derive_common_flags(declaration.flags, false);
            element.decorator_flags = decorator_flags;
            element.parent_namespace = parent;
            let id = self.elements.alloc(element);
            self.commit_declaration(id, source, parent, declaration.name.span);
        }
    }

    // ========================================================================
    // Imports and exports
    // ========================================================================

    fn initialize_import(&mut self, statement: &ImportStatement, source: &Source) {
        let Some(declarations) = &statement.declarations else {
            if let Some(namespace_name) = &statement.namespace_name {
                // `import * as N` is not supported.
                self.diagnostics.error(
                    SemanticError::OperationNotSupported {
                        span: namespace_name.span.into(),
                    },
                    namespace_name.span,
                );
            }
            return;
        };
        for declaration in declarations {
            let referenced = format!(
                "{}/{}",
                statement.internal_path, declaration.external_name.text
            );
            let referenced_name = self.names.intern(&referenced);
            let local_name = self
                .names
                .intern_file_level(&source.normalized_path, &declaration.name.text);
            if let Some(element) = self.file_level_exports.get(&referenced_name).copied() {
                self.bind_import(local_name, element, &declaration.name.text, declaration.span);
            } else {
                let alternative_path =
                    NameTable::alternative_index_path(&statement.internal_path);
                let alternative = format!(
                    "{}/{}",
                    alternative_path, declaration.external_name.text
                );
                let referenced_name_alt = Some(self.names.intern(&alternative));
                self.queued_imports.push(QueuedImport {
                    local_name,
                    referenced_name,
                    referenced_name_alt,
                    module_path: statement.internal_path.clone(),
                    member: declaration.external_name.text.clone(),
                    span: declaration.span,
                });
            }
        }
    }

    /// Alias the importing internal name to the resolved element.
    fn bind_import(&mut self, local_name: NameId, element: ElementId, simple: &str, span: Span) {
        if self.elements_lookup.contains_key(&local_name) {
            self.duplicate_identifier(simple, span);
            return;
        }
        self.elements_lookup.insert(local_name, element);
        self.elements.get_mut(element).flags |= CommonFlags::MODULE_IMPORT;
    }

    fn initialize_export(&mut self, statement: &ExportStatement, source: &Source) {
        for member in &statement.members {
            let (referenced_path, is_re_export) = match &statement.internal_path {
                Some(path) => (path.clone(), true),
                None => (source.normalized_path.clone(), false),
            };
            let referenced = format!("{}/{}", referenced_path, member.local_name.text);
            let referenced_name = self.names.intern(&referenced);
            let exported_name = self
                .names
                .intern_file_level(&source.normalized_path, &member.exported_name.text);

            let known = if is_re_export {
                self.file_level_exports.get(&referenced_name).copied()
            } else {
                self.lookup_element(referenced_name)
            };
            match known {
                Some(element) => self.add_file_level_export(
                    exported_name,
                    element,
                    source.is_entry,
                    &member.exported_name.text,
                    member.span,
                ),
                None => {
                    self.queued_exports.insert(
                        exported_name,
                        QueuedExport {
                            is_re_export,
                            referenced_name,
                            exported_simple_name: member.exported_name.text.clone(),
                            source_is_entry: source.is_entry,
                            module_path: referenced_path,
                            member: member.local_name.text.clone(),
                            span: member.span,
                        },
                    );
                }
            }
        }
    }

    // ========================================================================
    // Drain phase
    // ========================================================================

    /// Resolve a queued name against the export tables, following the queued
    /// export chain. Cycles break with no progress.
    fn try_resolve_queued_name(&self, name: NameId) -> Option<ElementId> {
        let mut seen = FxHashSet::default();
        let mut current = name;
        loop {
            if !seen.insert(current) {
                return None;
            }
            if let Some(element) = self.file_level_exports.get(&current) {
                return Some(*element);
            }
            if let Some(element) = self.elements_lookup.get(&current) {
                return Some(*element);
            }
            match self.queued_exports.get(&current) {
                Some(queued) => current = queued.referenced_name,
                None => return None,
            }
        }
    }

    fn drain_imports(&mut self) {
        loop {
            let mut progressed = false;
            let mut remaining = Vec::new();
            for import in std::mem::take(&mut self.queued_imports) {
                let resolved = self.try_resolve_queued_name(import.referenced_name).or_else(|| {
                    import
                        .referenced_name_alt
                        .and_then(|alt| self.try_resolve_queued_name(alt))
                });
                match resolved {
                    Some(element) => {
                        tracing::trace!(member = %import.member, "resolved queued import");
                        self.bind_import(import.local_name, element, &import.member, import.span);
                        progressed = true;
                    }
                    None => remaining.push(import),
                }
            }
            self.queued_imports = remaining;
            if !progressed || self.queued_imports.is_empty() {
                break;
            }
        }
        for import in std::mem::take(&mut self.queued_imports) {
            self.diagnostics.error(
                SemanticError::NoExportedMember {
                    module: import.module_path,
                    member: import.member,
                    span: import.span.into(),
                },
                import.span,
            );
        }
    }

    fn drain_exports(&mut self) {
        let keys: Vec<NameId> = self.queued_exports.keys().copied().collect();
        let mut resolutions = Vec::with_capacity(keys.len());
        for key in keys {
            let referenced = self.queued_exports[&key].referenced_name;
            resolutions.push((key, self.try_resolve_queued_name(referenced)));
        }
        for (key, resolved) in resolutions {
            let Some(queued) = self.queued_exports.remove(&key) else {
                continue;
            };
            match resolved {
                Some(element) => self.add_file_level_export(
                    key,
                    element,
                    queued.source_is_entry,
                    &queued.exported_simple_name,
                    queued.span,
                ),
                None if queued.is_re_export => self.diagnostics.error(
                    SemanticError::NoExportedMember {
                        module: queued.module_path,
                        member: queued.member,
                        span: queued.span.into(),
                    },
                    queued.span,
                ),
                None => self.diagnostics.error(
                    SemanticError::CannotFindName {
                        name: queued.member,
                        span: queued.span.into(),
                    },
                    queued.span,
                ),
            }
        }
    }

    fn drain_extends(&mut self) {
        for derived in std::mem::take(&mut self.queued_extends) {
            let (extends_type, file_path, derived_kind, derived_unmanaged) = {
                let element = self.elements.get(derived);
                let data = element.class_prototype();
                let Some(extends_type) = data.declaration.extends_type.clone() else {
                    continue;
                };
                (
                    extends_type,
                    data.file_path.clone(),
                    element.kind,
                    element.decorator_flags.contains(DecoratorFlags::UNMANAGED),
                )
            };
            let TypeNode::Named(named) = &extends_type else {
                self.diagnostics.error(
                    SemanticError::ClassExtendsNonClass {
                        span: extends_type.span().into(),
                    },
                    extends_type.span(),
                );
                continue;
            };
            let Some(base) = self.lookup_identifier(&named.name.text, &file_path) else {
                self.diagnostics.error(
                    SemanticError::CannotFindName {
                        name: named.name.text.clone(),
                        span: named.span.into(),
                    },
                    named.span,
                );
                continue;
            };
            let base_element = self.elements.get(base);
            if base_element.kind != derived_kind || !base_element.is_class_prototype() {
                self.diagnostics.error(
                    SemanticError::ClassExtendsNonClass {
                        span: named.span.into(),
                    },
                    named.span,
                );
                continue;
            }
            if base_element.decorator_flags.contains(DecoratorFlags::SEALED) {
                let name = base_element.simple_name.clone();
                self.diagnostics.error(
                    SemanticError::ClassSealed {
                        name,
                        span: named.span.into(),
                    },
                    named.span,
                );
                continue;
            }
            if base_element.decorator_flags.contains(DecoratorFlags::UNMANAGED)
                != derived_unmanaged
            {
                self.diagnostics.error(
                    SemanticError::UnmanagedExtendsManaged {
                        span: named.span.into(),
                    },
                    named.span,
                );
                continue;
            }
            self.elements
                .get_mut(derived)
                .class_prototype_mut()
                .base_prototype = Some(base);
        }
    }

    fn drain_implements(&mut self) {
        for derived in std::mem::take(&mut self.queued_implements) {
            let (implements_types, file_path, unmanaged) = {
                let element = self.elements.get(derived);
                let data = element.class_prototype();
                (
                    data.declaration.implements_types.clone(),
                    data.file_path.clone(),
                    element.decorator_flags.contains(DecoratorFlags::UNMANAGED),
                )
            };
            for node in &implements_types {
                let TypeNode::Named(named) = node else {
                    continue;
                };
                if unmanaged {
                    self.diagnostics.error(
                        SemanticError::UnmanagedImplements {
                            span: named.span.into(),
                        },
                        named.span,
                    );
                    continue;
                }
                match self.lookup_identifier(&named.name.text, &file_path) {
                    Some(interface)
                        if self.elements.get(interface).kind
                            == ElementKind::InterfacePrototype =>
                    {
                        self.elements
                            .get_mut(derived)
                            .class_prototype_mut()
                            .implements_prototypes
                            .push(interface);
                    }
                    Some(_) => {}
                    None => self.diagnostics.error(
                        SemanticError::CannotFindName {
                            name: named.name.text.clone(),
                            span: named.span.into(),
                        },
                        named.span,
                    ),
                }
            }
        }
    }

    /// Bind configured aliases to already-known elements.
    fn apply_global_aliases(&mut self) {
        for (alias, target) in self.options.global_aliases.clone() {
            if let Some(element) = self.lookup_element_str(&target) {
                let alias_name = self.names.intern(&alias);
                self.elements_lookup.entry(alias_name).or_insert(element);
            }
        }
    }

    /// Stash well-known prototypes and eagerly resolve `String`, binding the
    /// `string` type name.
    fn register_well_known(&mut self) {
        self.array_prototype = self
            .lookup_element_str("Array")
            .filter(|id| self.elements.get(*id).is_class_prototype());
        self.array_buffer_view_prototype = self
            .lookup_element_str("ArrayBufferView")
            .filter(|id| self.elements.get(*id).is_class_prototype());

        let Some(string_prototype) = self
            .lookup_element_str("String")
            .filter(|id| self.elements.get(*id).kind == ElementKind::ClassPrototype)
            .filter(|id| {
                self.elements
                    .get(*id)
                    .class_prototype()
                    .declaration
                    .type_parameters
                    .is_empty()
            })
        else {
            return;
        };
        let span = self
            .elements
            .get(string_prototype)
            .class_prototype()
            .declaration
            .name
            .span;
        if let Some(instance) = self.resolve_class(string_prototype, &[], None, span) {
            self.string_instance = Some(instance);
            let ty = self.elements.get(instance).class().ty;
            let string_name = self.names.intern("string");
            if self.type_aliases.contains_key("string")
                || !self.types.register_name(string_name, ty)
            {
                self.duplicate_identifier("string", span);
            }
        }
    }

    pub(crate) fn duplicate_identifier(&mut self, name: &str, span: Span) {
        self.diagnostics.error(
            SemanticError::DuplicateIdentifier {
                name: name.to_string(),
                span: span.into(),
            },
            span,
        );
    }

    /// File-scope then global-scope identifier lookup.
    pub(crate) fn lookup_identifier(&self, name: &str, file_path: &str) -> Option<ElementId> {
        let local = format!("{}/{}", file_path, name);
        if let Some(element) = self.lookup_element_str(&local) {
            return Some(element);
        }
        self.lookup_element_str(name)
    }
}
