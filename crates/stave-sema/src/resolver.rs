// resolver.rs
//
// On-demand resolution of type nodes to types and expression nodes to
// elements. Driven lazily by the emitter; every error path reports to the
// diagnostic sink and returns None.

use rustc_hash::FxHashMap;

use stave_frontend::{
    CallExpression, ElementAccessExpression, Expression, NamedTypeNode,
    PropertyAccessExpression, SignatureNode, TypeNode, TypeParameterNode,
};
use stave_identity::Span;

use crate::elements::{ElementId, ElementKind, OperatorKind};
use crate::errors::SemanticError;
use crate::flow::Flow;
use crate::program::Program;
use crate::types::{Signature, SignatureId, TypeId, TypeIdVec};

/// Context for resolving type nodes: the file scope to search and the type
/// parameters currently in scope.
#[derive(Debug, Clone, Copy)]
pub struct TypeContext<'a> {
    pub file_path: &'a str,
    pub contextual_type_arguments: Option<&'a FxHashMap<String, TypeId>>,
    pub report_not_found: bool,
}

impl<'a> TypeContext<'a> {
    pub fn new(file_path: &'a str) -> Self {
        Self {
            file_path,
            contextual_type_arguments: None,
            report_not_found: true,
        }
    }

    pub fn with_arguments(
        file_path: &'a str,
        contextual_type_arguments: &'a FxHashMap<String, TypeId>,
    ) -> Self {
        Self {
            file_path,
            contextual_type_arguments: Some(contextual_type_arguments),
            report_not_found: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.report_not_found = false;
        self
    }
}

/// Context for resolving expressions: the contextual function and, when the
/// emitter is inside a branch, its current flow.
#[derive(Debug, Clone, Copy)]
pub struct ExprContext<'a> {
    pub function: ElementId,
    pub flow: Option<&'a Flow>,
    pub contextual_enum: Option<ElementId>,
}

impl ExprContext<'_> {
    pub fn of(function: ElementId) -> Self {
        Self {
            function,
            flow: None,
            contextual_enum: None,
        }
    }
}

/// Result of resolving an expression: the element it names plus the receiver
/// and index expressions threading through chained accesses.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedExpression<'a> {
    pub element: ElementId,
    /// The receiver expression of a member access or literal.
    pub this_expression: Option<&'a Expression>,
    /// The index expression of an element access, consumed by a subsequent
    /// property access or by the emitter.
    pub element_expression: Option<&'a Expression>,
}

impl<'a> ResolvedExpression<'a> {
    fn plain(element: ElementId) -> Self {
        Self {
            element,
            this_expression: None,
            element_expression: None,
        }
    }
}

impl Program {
    // ========================================================================
    // Types
    // ========================================================================

    /// Resolve a type node to a concrete type.
    pub fn resolve_type(&mut self, node: &TypeNode, ctx: &TypeContext<'_>) -> Option<TypeId> {
        match node {
            TypeNode::Function(signature_node) => {
                // Function types are stored as pointer-sized references.
                let signature = self.resolve_signature(signature_node, ctx)?;
                Some(self.types.function_type(signature))
            }
            TypeNode::Named(named) => self.resolve_named_type(named, ctx),
        }
    }

    fn resolve_named_type(&mut self, named: &NamedTypeNode, ctx: &TypeContext<'_>) -> Option<TypeId> {
        let simple = named.name.text.as_str();
        let local = format!("{}/{}", ctx.file_path, simple);

        // Class and interface prototypes resolve through the element graph.
        let element = self
            .lookup_element_str(&local)
            .or_else(|| self.lookup_element_str(simple));
        if let Some(id) = element {
            if self.elements.get(id).is_class_prototype() {
                let class =
                    self.resolve_class_using_type_arguments(id, &named.type_arguments, ctx, named.span)?;
                if named.nullable {
                    return Some(self.types.class_type(class, true));
                }
                return Some(self.elements.get(class).class().ty);
            }
        }

        // Program-global type aliases expand on lookup.
        if let Some(alias) = self.type_aliases.get(simple).cloned() {
            let alias_node = alias.declaration.alias.clone();
            let alias_ctx = TypeContext {
                file_path: &alias.file_path,
                contextual_type_arguments: ctx.contextual_type_arguments,
                report_not_found: ctx.report_not_found,
            };
            return self.resolve_type(&alias_node, &alias_ctx);
        }

        if !named.type_arguments.is_empty() {
            let mut resolved = TypeIdVec::new();
            for argument in &named.type_arguments {
                resolved.push(self.resolve_type(argument, ctx)?);
            }
            let key = self.type_args_key(&resolved);
            let local_generic = format!("{local}<{key}>");
            let global_generic = format!("{simple}<{key}>");
            for name in [local_generic.as_str(), global_generic.as_str()] {
                if let Some(name_id) = self.names.get(name) {
                    if let Some(ty) = self.types.lookup_name(name_id) {
                        return Some(ty);
                    }
                }
            }
        } else {
            // A bare name may be a bound type parameter in the current context.
            if let Some(contextual) = ctx.contextual_type_arguments {
                if let Some(ty) = contextual.get(simple) {
                    return Some(*ty);
                }
            }
            for name in [local.as_str(), simple] {
                if let Some(name_id) = self.names.get(name) {
                    if let Some(ty) = self.types.lookup_name(name_id) {
                        return Some(ty);
                    }
                }
            }
        }

        if ctx.report_not_found {
            self.diagnostics.error(
                SemanticError::CannotFindName {
                    name: simple.to_string(),
                    span: named.span.into(),
                },
                named.span,
            );
        }
        None
    }

    /// Resolve an explicit type-argument list against the declared type
    /// parameters. Arity must match exactly.
    pub(crate) fn resolve_type_arguments(
        &mut self,
        parameters: &[TypeParameterNode],
        arguments: &[TypeNode],
        ctx: &TypeContext<'_>,
        span: Span,
    ) -> Option<TypeIdVec> {
        if parameters.len() != arguments.len() {
            self.diagnostics.error(
                SemanticError::WrongTypeArgumentCount {
                    expected: parameters.len(),
                    found: arguments.len(),
                    span: span.into(),
                },
                span,
            );
            return None;
        }
        let mut resolved = TypeIdVec::new();
        for argument in arguments {
            resolved.push(self.resolve_type(argument, ctx)?);
        }
        Some(resolved)
    }

    /// Resolve a signature node: explicit `this` type, parameter types and
    /// names, required-parameter count and terminal rest flag. The return
    /// type defaults to `void` when absent.
    pub fn resolve_signature(
        &mut self,
        node: &SignatureNode,
        ctx: &TypeContext<'_>,
    ) -> Option<SignatureId> {
        let this_type = match &node.explicit_this_type {
            Some(explicit) => Some(self.resolve_type(explicit, ctx)?),
            None => None,
        };
        let mut parameter_types = TypeIdVec::new();
        let mut parameter_names = Vec::with_capacity(node.parameters.len());
        let mut required_parameters = 0;
        let mut has_rest = false;
        for (index, parameter) in node.parameters.iter().enumerate() {
            if parameter.is_rest {
                // Rest is only recognized in terminal position.
                if index != node.parameters.len() - 1 {
                    self.diagnostics.error(
                        SemanticError::OperationNotSupported {
                            span: parameter.span.into(),
                        },
                        parameter.span,
                    );
                    return None;
                }
                has_rest = true;
            }
            parameter_types.push(self.resolve_type(&parameter.ty, ctx)?);
            parameter_names.push(parameter.name.text.clone());
            if parameter.initializer.is_none() && !parameter.is_rest {
                required_parameters = index + 1;
            }
        }
        let return_type = match &node.return_type {
            Some(return_node) => self.resolve_type(return_node, ctx)?,
            None => TypeId::VOID,
        };
        Some(self.types.intern_signature(Signature {
            parameter_types,
            parameter_names,
            required_parameters,
            has_rest,
            return_type,
            this_type,
        }))
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// Resolve an identifier: contextual enum members, flow-scoped locals,
    /// the function's namespace chain, then file and global scope.
    pub fn resolve_identifier(
        &mut self,
        name: &str,
        span: Span,
        ctx: &ExprContext<'_>,
    ) -> Option<ElementId> {
        if let Some(contextual_enum) = ctx.contextual_enum {
            if let Some(value) = self.elements.get(contextual_enum).members.get(name) {
                return Some(*value);
            }
        }

        if let Some(flow) = ctx.flow {
            if let Some(local) = flow.get_scoped_local(self, name) {
                return Some(local);
            }
        } else if let Some(local) = self
            .elements
            .get(ctx.function)
            .function()
            .locals_by_name
            .get(name)
        {
            return Some(*local);
        }

        let prototype = self.elements.get(ctx.function).function().prototype;
        let mut namespace = self.elements.get(prototype).parent_namespace;
        while let Some(current) = namespace {
            let qualified = format!(
                "{}.{}",
                self.names
                    .resolve(self.elements.get(current).internal_name),
                name
            );
            if let Some(element) = self.lookup_element_str(&qualified) {
                return Some(element);
            }
            namespace = self.elements.get(current).parent_namespace;
        }

        let file_path = self
            .elements
            .get(prototype)
            .function_prototype()
            .file_path
            .clone();
        if let Some(element) = self.lookup_identifier(name, &file_path) {
            return Some(element);
        }

        self.diagnostics.error(
            SemanticError::CannotFindName {
                name: name.to_string(),
                span: span.into(),
            },
            span,
        );
        None
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Resolve an expression to the element it names.
    pub fn resolve_expression<'a>(
        &mut self,
        expression: &'a Expression,
        ctx: &ExprContext<'_>,
    ) -> Option<ResolvedExpression<'a>> {
        match expression {
            Expression::Parenthesized(parenthesized) => {
                self.resolve_expression(&parenthesized.expression, ctx)
            }
            Expression::Identifier(identifier) => {
                let element = self.resolve_identifier(&identifier.name, identifier.span, ctx)?;
                Some(ResolvedExpression::plain(element))
            }
            Expression::Assertion(assertion) => {
                let (file_path, contextual) = self.expression_scope(ctx);
                let type_ctx = TypeContext::with_arguments(&file_path, &contextual);
                let ty = self.resolve_type(&assertion.to_type, &type_ctx)?;
                let class = self.types.class_reference(ty)?;
                Some(ResolvedExpression::plain(class))
            }
            Expression::This(span) => self.resolve_this(*span, ctx),
            Expression::Super(span) => self.resolve_super(*span, ctx),
            Expression::StringLiteral(_) => match self.string_instance {
                Some(string) => Some(ResolvedExpression {
                    element: string,
                    this_expression: Some(expression),
                    element_expression: None,
                }),
                None => {
                    let span = expression.span();
                    self.diagnostics.error(
                        SemanticError::CannotFindName {
                            name: "String".to_string(),
                            span: span.into(),
                        },
                        span,
                    );
                    None
                }
            },
            Expression::PropertyAccess(access) => self.resolve_property_access(access, ctx),
            Expression::ElementAccess(access) => self.resolve_element_access(access, ctx),
            Expression::Call(call) => self.resolve_call(call, ctx),
            Expression::Binary(_)
            | Expression::IntegerLiteral(_)
            | Expression::FloatLiteral(_) => {
                let span = expression.span();
                self.diagnostics.error(
                    SemanticError::OperationNotSupported { span: span.into() },
                    span,
                );
                None
            }
        }
    }

    fn resolve_this<'a>(&mut self, span: Span, ctx: &ExprContext<'_>) -> Option<ResolvedExpression<'a>> {
        if let Some(flow) = ctx.flow {
            if flow.is_inline_context() {
                if let Some(local) = flow.get_scoped_local(self, "this") {
                    return Some(ResolvedExpression::plain(local));
                }
            }
        }
        match self.elements.get(ctx.function).function().owner_class {
            Some(class) => Some(ResolvedExpression::plain(class)),
            None => {
                self.diagnostics.error(
                    SemanticError::ThisNotAllowed { span: span.into() },
                    span,
                );
                None
            }
        }
    }

    fn resolve_super<'a>(&mut self, span: Span, ctx: &ExprContext<'_>) -> Option<ResolvedExpression<'a>> {
        let base = self
            .elements
            .get(ctx.function)
            .function()
            .owner_class
            .and_then(|class| self.elements.get(class).class().base);
        match base {
            Some(base) => Some(ResolvedExpression::plain(base)),
            None => {
                self.diagnostics.error(
                    SemanticError::SuperNotAllowed { span: span.into() },
                    span,
                );
                None
            }
        }
    }

    /// Resolve `target.property`: normalize variable-likes to their type's
    /// class, apply a pending indexed access, then walk the member tables.
    fn resolve_property_access<'a>(
        &mut self,
        access: &'a PropertyAccessExpression,
        ctx: &ExprContext<'_>,
    ) -> Option<ResolvedExpression<'a>> {
        let property = access.property.text.clone();
        let target = self.resolve_expression(&access.expression, ctx)?;
        let normalized = self.normalize_property_target(&target, &property, access.span)?;
        match self.lookup_member(normalized, &property) {
            Some(member) => Some(ResolvedExpression {
                element: member,
                this_expression: Some(&access.expression),
                element_expression: None,
            }),
            None => {
                let ty = self
                    .names
                    .resolve(self.elements.get(normalized).internal_name)
                    .to_string();
                self.diagnostics.error(
                    SemanticError::PropertyDoesNotExist {
                        property,
                        ty,
                        span: access.span.into(),
                    },
                    access.span,
                );
                None
            }
        }
    }

    /// Resolve `target[index]`: always routes through the indexed-get
    /// operator. On success the receiver and index expressions are both
    /// carried for the consumer.
    fn resolve_element_access<'a>(
        &mut self,
        access: &'a ElementAccessExpression,
        ctx: &ExprContext<'_>,
    ) -> Option<ResolvedExpression<'a>> {
        let target = self.resolve_expression(&access.expression, ctx)?;
        let element = target.element;
        let class = match self.elements.get(element).kind {
            ElementKind::Global | ElementKind::Local | ElementKind::Field => {
                let ty = self.variable_type(element);
                match self.types.class_reference(ty) {
                    Some(class) => class,
                    None => {
                        let ty = self.type_to_string(ty);
                        self.diagnostics.error(
                            SemanticError::IndexSignatureMissing {
                                ty,
                                span: access.span.into(),
                            },
                            access.span,
                        );
                        return None;
                    }
                }
            }
            ElementKind::Class | ElementKind::Interface => element,
            _ => {
                self.diagnostics.error(
                    SemanticError::OperationNotSupported {
                        span: access.span.into(),
                    },
                    access.span,
                );
                return None;
            }
        };
        if self.lookup_overload(class, OperatorKind::IndexedGet).is_none() {
            let ty = self
                .names
                .resolve(self.elements.get(class).internal_name)
                .to_string();
            self.diagnostics.error(
                SemanticError::IndexSignatureMissing {
                    ty,
                    span: access.span.into(),
                },
                access.span,
            );
            return None;
        }
        Some(ResolvedExpression {
            element: class,
            this_expression: Some(&access.expression),
            element_expression: Some(&access.element),
        })
    }

    fn resolve_call<'a>(
        &mut self,
        call: &'a CallExpression,
        ctx: &ExprContext<'_>,
    ) -> Option<ResolvedExpression<'a>> {
        let target = self.resolve_expression(&call.expression, ctx)?;
        let element = target.element;
        match self.elements.get(element).kind {
            ElementKind::FunctionPrototype => {
                let (file_path, contextual) = self.expression_scope(ctx);
                let type_ctx = TypeContext::with_arguments(&file_path, &contextual);
                let instance = self.resolve_function_using_type_arguments(
                    element,
                    &call.type_arguments,
                    &type_ctx,
                    call.span,
                )?;
                let signature = self.elements.get(instance).function().signature;
                self.call_return_element(signature)
            }
            ElementKind::Function => {
                let signature = self.elements.get(element).function().signature;
                self.call_return_element(signature)
            }
            ElementKind::FunctionTarget => {
                let signature = self.elements.get(element).function_target().signature;
                self.call_return_element(signature)
            }
            ElementKind::Global | ElementKind::Local | ElementKind::Field => {
                let ty = self.variable_type(element);
                match self.types.signature_reference(ty) {
                    Some(signature) => self.call_return_element(signature),
                    None => {
                        self.diagnostics.error(
                            SemanticError::NotCallable {
                                span: call.span.into(),
                            },
                            call.span,
                        );
                        None
                    }
                }
            }
            _ => {
                self.diagnostics.error(
                    SemanticError::NotCallable {
                        span: call.span.into(),
                    },
                    call.span,
                );
                None
            }
        }
    }

    /// The element a call resolves to: the class reference of the return
    /// type, or a function target cached on the signature when the return is
    /// itself a function type.
    fn call_return_element<'a>(&mut self, signature: SignatureId) -> Option<ResolvedExpression<'a>> {
        let return_type = self.types.signature(signature).return_type;
        if let Some(class) = self.types.class_reference(return_type) {
            return Some(ResolvedExpression::plain(class));
        }
        if let Some(inner) = self.types.signature_reference(return_type) {
            let target = self.function_target(inner);
            return Some(ResolvedExpression::plain(target));
        }
        None
    }

    // ========================================================================
    // Receiver normalization and member lookup
    // ========================================================================

    fn variable_type(&mut self, element: ElementId) -> TypeId {
        match self.elements.get(element).kind {
            ElementKind::Global => {
                self.resolve_global(element);
                self.elements.get(element).global().ty
            }
            ElementKind::Local => self.elements.get(element).local().ty,
            ElementKind::Field => self.elements.get(element).field().ty,
            _ => unreachable!("element is not variable-like"),
        }
    }

    /// Lazily resolve a global's declared type annotation.
    pub(crate) fn resolve_global(&mut self, global: ElementId) {
        let data = self.elements.get(global).global();
        if !data.ty.is_void() {
            return;
        }
        let Some(declaration) = data.declaration.clone() else {
            return;
        };
        let file_path = data.file_path.clone();
        let Some(type_node) = declaration.type_node().cloned() else {
            return;
        };
        if let Some(ty) = self.resolve_type(&type_node, &TypeContext::new(&file_path)) {
            self.elements.get_mut(global).global_mut().ty = ty;
        }
    }

    /// Normalize a property-access target to the element whose members are
    /// searched.
    fn normalize_property_target(
        &mut self,
        target: &ResolvedExpression<'_>,
        property: &str,
        span: Span,
    ) -> Option<ElementId> {
        let element = target.element;
        match self.elements.get(element).kind {
            ElementKind::Global | ElementKind::Local | ElementKind::Field => {
                let ty = self.variable_type(element);
                self.class_reference_or_missing_property(ty, property, span)
            }
            ElementKind::Property => {
                let getter = self.elements.get(element).property().getter_prototype;
                let Some(getter) = getter else {
                    let parent = self.elements.get(element).property().parent;
                    let ty = self
                        .names
                        .resolve(self.elements.get(parent).internal_name)
                        .to_string();
                    return self.missing_property(property, &ty, span);
                };
                let instance = self.resolve_function(getter, &[], None, span)?;
                let signature = self.elements.get(instance).function().signature;
                let return_type = self.types.signature(signature).return_type;
                self.class_reference_or_missing_property(return_type, property, span)
            }
            ElementKind::Class | ElementKind::Interface
                if target.element_expression.is_some() =>
            {
                // A pending indexed access applies before the property.
                let Some(indexed_get) = self.lookup_overload(element, OperatorKind::IndexedGet)
                else {
                    let ty = self
                        .names
                        .resolve(self.elements.get(element).internal_name)
                        .to_string();
                    self.diagnostics.error(
                        SemanticError::IndexSignatureMissing {
                            ty,
                            span: span.into(),
                        },
                        span,
                    );
                    return None;
                };
                let signature = self.elements.get(indexed_get).function().signature;
                let return_type = self.types.signature(signature).return_type;
                self.class_reference_or_missing_property(return_type, property, span)
            }
            _ => Some(element),
        }
    }

    fn class_reference_or_missing_property(
        &mut self,
        ty: TypeId,
        property: &str,
        span: Span,
    ) -> Option<ElementId> {
        match self.types.class_reference(ty) {
            Some(class) => Some(class),
            None => {
                let ty = self.type_to_string(ty);
                self.missing_property(property, &ty, span)
            }
        }
    }

    fn missing_property(&mut self, property: &str, ty: &str, span: Span) -> Option<ElementId> {
        self.diagnostics.error(
            SemanticError::PropertyDoesNotExist {
                property: property.to_string(),
                ty: ty.to_string(),
                span: span.into(),
            },
            span,
        );
        None
    }

    /// Look up a member by name. Class prototypes and instances walk their
    /// inheritance chain; other elements search their own member table.
    pub(crate) fn lookup_member(&self, target: ElementId, name: &str) -> Option<ElementId> {
        match self.elements.get(target).kind {
            ElementKind::ClassPrototype | ElementKind::InterfacePrototype => {
                let mut current = Some(target);
                while let Some(id) = current {
                    let element = self.elements.get(id);
                    if let Some(member) = element.members.get(name) {
                        return Some(*member);
                    }
                    current = element.class_prototype().base_prototype;
                }
                None
            }
            ElementKind::Class | ElementKind::Interface => {
                let mut current = Some(target);
                while let Some(id) = current {
                    let element = self.elements.get(id);
                    if let Some(member) = element.members.get(name) {
                        return Some(*member);
                    }
                    current = element.class().base;
                }
                None
            }
            _ => self.elements.get(target).members.get(name).copied(),
        }
    }

    /// The file scope and contextual type arguments of an expression context.
    fn expression_scope(&self, ctx: &ExprContext<'_>) -> (String, FxHashMap<String, TypeId>) {
        let function = self.elements.get(ctx.function).function();
        let prototype = function.prototype;
        let contextual = match ctx.flow {
            Some(flow) => flow.contextual_type_arguments.clone(),
            None => function.contextual_type_arguments.clone(),
        };
        let file_path = self
            .elements
            .get(prototype)
            .function_prototype()
            .file_path
            .clone();
        (file_path, contextual)
    }
}
