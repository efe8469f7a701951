// monomorph.rs
//
// Memoized monomorphization: turning class and function prototypes into
// instances for a given tuple of type arguments. Each distinct canonical
// argument key produces exactly one instance; partial application captures a
// class's type arguments on a method prototype while leaving the method's own
// type parameters free.

use rustc_hash::FxHashMap;

use stave_frontend::TypeNode;
use stave_identity::{Span, INSTANCE_DELIMITER};

use crate::elements::{
    ClassData, CommonFlags, ElementId, ElementKind, ElementPayload, FieldData,
    FunctionData, FunctionPrototypeData, PropertyData,
};
use crate::program::Program;
use crate::resolver::TypeContext;
use crate::types::{Signature, TypeId, TypeIdVec};

impl Program {
    // ========================================================================
    // Classes
    // ========================================================================

    /// Resolve a class prototype with explicit type-argument nodes.
    pub fn resolve_class_using_type_arguments(
        &mut self,
        prototype: ElementId,
        arguments: &[TypeNode],
        ctx: &TypeContext<'_>,
        span: Span,
    ) -> Option<ElementId> {
        let parameters = self
            .elements
            .get(prototype)
            .class_prototype()
            .declaration
            .type_parameters
            .clone();
        let resolved = self.resolve_type_arguments(&parameters, arguments, ctx, span)?;
        self.resolve_class(prototype, &resolved, ctx.contextual_type_arguments, span)
    }

    /// Resolve a class prototype into an instance. Memoized per canonical
    /// type-argument key: repeated resolutions return the same instance.
    pub fn resolve_class(
        &mut self,
        prototype: ElementId,
        type_arguments: &[TypeId],
        contextual: Option<&FxHashMap<String, TypeId>>,
        span: Span,
    ) -> Option<ElementId> {
        let instance_key = self.type_args_key(type_arguments);
        if let Some(existing) = self
            .elements
            .get(prototype)
            .class_prototype()
            .instances
            .get(&instance_key)
        {
            return Some(*existing);
        }
        tracing::trace!(key = %instance_key, "monomorphizing class");

        let (
            declaration,
            file_path,
            base_prototype,
            constructor_prototype,
            member_order,
            member_snapshot,
            operator_prototypes,
            proto_internal,
            proto_kind,
            proto_flags,
            proto_decorators,
            simple_name,
        ) = {
            let element = self.elements.get(prototype);
            let data = element.class_prototype();
            (
                data.declaration.clone(),
                data.file_path.clone(),
                data.base_prototype,
                data.constructor_prototype,
                data.instance_member_order.clone(),
                data.instance_members.clone(),
                data.operator_prototypes.clone(),
                element.internal_name,
                element.kind,
                element.flags,
                element.decorator_flags,
                element.simple_name.clone(),
            )
        };

        // An arity mismatch here is a broken caller invariant, not a user error.
        assert_eq!(
            declaration.type_parameters.len(),
            type_arguments.len(),
            "class type argument count mismatch"
        );

        let mut contextual_args: FxHashMap<String, TypeId> =
            contextual.cloned().unwrap_or_default();
        for (parameter, argument) in declaration.type_parameters.iter().zip(type_arguments) {
            contextual_args.insert(parameter.name.text.clone(), *argument);
        }

        // Construct and memoize the instance before members resolve, so
        // self-referential member types hit the cache.
        let internal_name = if type_arguments.is_empty() {
            proto_internal
        } else {
            self.names.intern_generic(proto_internal, &instance_key)
        };
        let kind = if proto_kind == ElementKind::InterfacePrototype {
            ElementKind::Interface
        } else {
            ElementKind::Class
        };
        let mut element = Self::new_element(
            kind,
            &simple_name,
            internal_name,
            ElementPayload::Class(ClassData {
                prototype,
                type_arguments: TypeIdVec::from_slice(type_arguments),
                ty: TypeId::VOID,
                base: None,
                contextual_type_arguments: contextual_args.clone(),
                constructor_instance: None,
                operator_overloads: Vec::new(),
                current_memory_offset: 0,
            }),
        );
        element.flags = proto_flags;
        if !contextual_args.is_empty() {
            element.flags |= CommonFlags::GENERIC_CONTEXT;
        }
        element.decorator_flags = proto_decorators;
        let id = self.elements.alloc(element);
        let ty = self.types.class_type(id, false);
        self.elements.get_mut(id).class_mut().ty = ty;
        self.elements
            .get_mut(prototype)
            .class_prototype_mut()
            .instances
            .insert(instance_key, id);

        // Base class resolves before member inheritance and field layout.
        if let Some(base_proto) = base_prototype {
            let base_parameters = self
                .elements
                .get(base_proto)
                .class_prototype()
                .declaration
                .type_parameters
                .clone();
            let extends_arguments = match &declaration.extends_type {
                Some(TypeNode::Named(named)) => named.type_arguments.clone(),
                _ => Vec::new(),
            };
            let type_ctx = TypeContext::with_arguments(&file_path, &contextual_args);
            let base_arguments =
                self.resolve_type_arguments(&base_parameters, &extends_arguments, &type_ctx, span);
            if let Some(base_arguments) = base_arguments {
                if let Some(base_instance) =
                    self.resolve_class(base_proto, &base_arguments, Some(&contextual_args), span)
                {
                    let (base_members, base_offset) = {
                        let base_element = self.elements.get(base_instance);
                        (
                            base_element.members.clone(),
                            base_element.class().current_memory_offset,
                        )
                    };
                    let element = self.elements.get_mut(id);
                    element.members = base_members;
                    let data = element.class_mut();
                    data.base = Some(base_instance);
                    data.current_memory_offset = base_offset;
                }
            }
        }

        // Constructor resolves first.
        if let Some(constructor) = constructor_prototype {
            let bound = self.resolve_partial(constructor, type_arguments, id);
            if let Some(instance) = self.resolve_function(bound, &[], Some(&contextual_args), span)
            {
                self.elements.get_mut(id).class_mut().constructor_instance = Some(instance);
            }
        }

        // Instance members in declaration order; fields lay out as they come.
        let mut current_offset = self.elements.get(id).class().current_memory_offset;
        for member_name in &member_order {
            let member = member_snapshot[member_name];
            match self.elements.get(member).kind {
                ElementKind::FieldPrototype => {
                    let field_declaration =
                        self.elements.get(member).field_prototype().declaration.clone();
                    let Some(type_node) = field_declaration.ty.clone() else {
                        continue;
                    };
                    let type_ctx = TypeContext::with_arguments(&file_path, &contextual_args);
                    let Some(field_type) = self.resolve_type(&type_node, &type_ctx) else {
                        continue;
                    };
                    let size = self.types.byte_size(field_type);
                    if size == 0 {
                        continue;
                    }
                    // Align up to the field's byte size (1/2/4/8).
                    let mask = size - 1;
                    let offset = (current_offset + mask) & !mask;
                    let field_internal =
                        self.names
                            .intern_member(internal_name, INSTANCE_DELIMITER, member_name);
                    let mut field = Self::new_element(
                        ElementKind::Field,
                        member_name,
                        field_internal,
                        ElementPayload::Field(FieldData {
                            prototype: member,
                            ty: field_type,
                            memory_offset: offset,
                        }),
                    );
                    field.flags = CommonFlags::INSTANCE;
                    let field_id = self.elements.alloc(field);
                    self.elements
                        .get_mut(id)
                        .members
                        .insert(member_name.clone(), field_id);
                    current_offset = offset + size;
                }
                ElementKind::FunctionPrototype => {
                    let bound = self.resolve_partial(member, type_arguments, id);
                    self.elements
                        .get_mut(id)
                        .members
                        .insert(member_name.clone(), bound);
                }
                ElementKind::Property => {
                    let (getter, setter) = {
                        let data = self.elements.get(member).property();
                        (data.getter_prototype, data.setter_prototype)
                    };
                    let bound_getter =
                        getter.map(|accessor| self.resolve_partial(accessor, type_arguments, id));
                    let bound_setter =
                        setter.map(|accessor| self.resolve_partial(accessor, type_arguments, id));
                    let property_internal = self.names.intern_member(
                        internal_name,
                        INSTANCE_DELIMITER,
                        member_name,
                    );
                    let mut property = Self::new_element(
                        ElementKind::Property,
                        member_name,
                        property_internal,
                        ElementPayload::Property(PropertyData {
                            parent: id,
                            getter_prototype: bound_getter,
                            setter_prototype: bound_setter,
                        }),
                    );
                    property.flags = CommonFlags::INSTANCE;
                    let property_id = self.elements.alloc(property);
                    self.elements
                        .get_mut(id)
                        .members
                        .insert(member_name.clone(), property_id);
                }
                _ => {}
            }
        }
        self.elements.get_mut(id).class_mut().current_memory_offset = current_offset;

        // Operator overloads: instance operators resolve through a partial
        // prototype, static ones resolve directly.
        for (operator, operator_prototype) in operator_prototypes {
            let is_instance = self
                .elements
                .get(operator_prototype)
                .flags
                .contains(CommonFlags::INSTANCE);
            let resolved = if is_instance {
                let bound = self.resolve_partial(operator_prototype, type_arguments, id);
                self.resolve_function(bound, &[], Some(&contextual_args), span)
            } else {
                self.resolve_function(operator_prototype, &[], Some(&contextual_args), span)
            };
            if let Some(function) = resolved {
                self.elements
                    .get_mut(id)
                    .class_mut()
                    .operator_overloads
                    .push((operator, function));
            }
        }

        Some(id)
    }

    /// Partial application: capture the owning class's type arguments on a
    /// cloned method prototype, leaving the method's own type parameters
    /// free. Prototypes of non-generic classes are reused as-is.
    pub(crate) fn resolve_partial(
        &mut self,
        prototype: ElementId,
        class_type_arguments: &[TypeId],
        class_instance: ElementId,
    ) -> ElementId {
        if class_type_arguments.is_empty() {
            return prototype;
        }
        let (declaration, file_path, class_prototype, operator_kind, flags, decorator_flags, simple) = {
            let element = self.elements.get(prototype);
            let data = element.function_prototype();
            (
                data.declaration.clone(),
                data.file_path.clone(),
                data.class_prototype,
                data.operator_kind,
                element.flags,
                element.decorator_flags,
                element.simple_name.clone(),
            )
        };
        let instance_internal = self.elements.get(class_instance).internal_name;
        let internal_name =
            self.names
                .intern_member(instance_internal, INSTANCE_DELIMITER, &simple);
        let mut element = Self::new_element(
            ElementKind::FunctionPrototype,
            &simple,
            internal_name,
            ElementPayload::FunctionPrototype(FunctionPrototypeData {
                declaration,
                file_path,
                class_prototype,
                operator_kind,
                instances: Default::default(),
                class_type_arguments: Some(TypeIdVec::from_slice(class_type_arguments)),
            }),
        );
        element.flags = flags;
        element.decorator_flags = decorator_flags;
        self.elements.alloc(element)
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Resolve a function prototype with explicit type-argument nodes.
    pub fn resolve_function_using_type_arguments(
        &mut self,
        prototype: ElementId,
        arguments: &[TypeNode],
        ctx: &TypeContext<'_>,
        span: Span,
    ) -> Option<ElementId> {
        let parameters = self
            .elements
            .get(prototype)
            .function_prototype()
            .declaration
            .type_parameters
            .clone();
        let resolved = self.resolve_type_arguments(&parameters, arguments, ctx, span)?;
        self.resolve_function(prototype, &resolved, ctx.contextual_type_arguments, span)
    }

    /// Resolve a function prototype into an instance. Memoized per canonical
    /// type-argument key. Contextual arguments layer inherited <- class <-
    /// function.
    pub fn resolve_function(
        &mut self,
        prototype: ElementId,
        function_type_arguments: &[TypeId],
        contextual: Option<&FxHashMap<String, TypeId>>,
        span: Span,
    ) -> Option<ElementId> {
        let instance_key = self.type_args_key(function_type_arguments);
        if let Some(existing) = self
            .elements
            .get(prototype)
            .function_prototype()
            .instances
            .get(&instance_key)
        {
            return Some(*existing);
        }

        let (declaration, file_path, class_prototype, class_type_arguments, proto_flags, proto_decorators, proto_internal, simple) = {
            let element = self.elements.get(prototype);
            let data = element.function_prototype();
            (
                data.declaration.clone(),
                data.file_path.clone(),
                data.class_prototype,
                data.class_type_arguments.clone(),
                element.flags,
                element.decorator_flags,
                element.internal_name,
                element.simple_name.clone(),
            )
        };

        assert_eq!(
            declaration.type_parameters.len(),
            function_type_arguments.len(),
            "function type argument count mismatch"
        );

        let mut contextual_args: FxHashMap<String, TypeId> =
            contextual.cloned().unwrap_or_default();
        if let (Some(class_proto), Some(class_arguments)) = (class_prototype, &class_type_arguments)
        {
            let class_parameters = self
                .elements
                .get(class_proto)
                .class_prototype()
                .declaration
                .type_parameters
                .clone();
            for (parameter, argument) in class_parameters.iter().zip(class_arguments) {
                contextual_args.insert(parameter.name.text.clone(), *argument);
            }
        }
        for (parameter, argument) in declaration
            .type_parameters
            .iter()
            .zip(function_type_arguments)
        {
            contextual_args.insert(parameter.name.text.clone(), *argument);
        }

        // Instance methods and constructors bind `this` to their owner.
        let needs_this = proto_flags.intersects(CommonFlags::INSTANCE | CommonFlags::CONSTRUCTOR);
        let owner_class = match (class_prototype, needs_this) {
            (Some(class_proto), true) => {
                let class_arguments = class_type_arguments.clone().unwrap_or_default();
                self.resolve_class(class_proto, &class_arguments, Some(&contextual_args), span)
            }
            _ => None,
        };
        let this_type = owner_class.map(|class| self.elements.get(class).class().ty);

        let type_ctx = TypeContext::with_arguments(&file_path, &contextual_args);
        let signature_node = &declaration.signature;
        let mut parameter_types = TypeIdVec::new();
        let mut parameter_names = Vec::with_capacity(signature_node.parameters.len());
        let mut required_parameters = 0;
        let mut has_rest = false;
        for (index, parameter) in signature_node.parameters.iter().enumerate() {
            if parameter.is_rest {
                if index != signature_node.parameters.len() - 1 {
                    self.diagnostics.error(
                        crate::errors::SemanticError::OperationNotSupported {
                            span: parameter.span.into(),
                        },
                        parameter.span,
                    );
                    return None;
                }
                has_rest = true;
            }
            let parameter_type = self.resolve_type(&parameter.ty, &type_ctx)?;
            parameter_types.push(parameter_type);
            parameter_names.push(parameter.name.text.clone());
            if parameter.initializer.is_none() && !parameter.is_rest {
                required_parameters = index + 1;
            }
        }

        // Setters return void; constructors return their class's type.
        let return_type = if proto_flags.contains(CommonFlags::SET) {
            TypeId::VOID
        } else if proto_flags.contains(CommonFlags::CONSTRUCTOR) {
            this_type?
        } else {
            match &signature_node.return_type {
                Some(return_node) => self.resolve_type(return_node, &type_ctx)?,
                None => TypeId::VOID,
            }
        };

        let signature = self.types.intern_signature(Signature {
            parameter_types: parameter_types.clone(),
            parameter_names: parameter_names.clone(),
            required_parameters,
            has_rest,
            return_type,
            this_type,
        });

        let internal_name = if function_type_arguments.is_empty() {
            proto_internal
        } else {
            self.names.intern_generic(proto_internal, &instance_key)
        };
        let mut element = Self::new_element(
            ElementKind::Function,
            &simple,
            internal_name,
            ElementPayload::Function(FunctionData {
                prototype,
                signature,
                owner_class,
                locals: Vec::new(),
                locals_by_name: FxHashMap::default(),
                contextual_type_arguments: contextual_args.clone(),
                temp_pools: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
                break_stack: Vec::new(),
                next_break_id: 0,
                flow: None,
                ref_handle: None,
            }),
        );
        element.flags = proto_flags;
        if !contextual_args.is_empty() {
            element.flags |= CommonFlags::GENERIC_CONTEXT;
        }
        element.decorator_flags = proto_decorators;
        let id = self.elements.alloc(element);

        // Locals are pre-populated with `this` and the parameters, in order.
        if let Some(this_type) = this_type {
            self.add_local(id, "this", this_type);
        }
        for (index, parameter_name) in parameter_names.iter().enumerate() {
            self.add_local(id, parameter_name, parameter_types[index]);
        }

        let flow = crate::flow::Flow::root(id, return_type, contextual_args);
        self.elements.get_mut(id).function_mut().flow = Some(flow);

        self.elements
            .get_mut(prototype)
            .function_prototype_mut()
            .instances
            .insert(instance_key, id);
        Some(id)
    }
}
