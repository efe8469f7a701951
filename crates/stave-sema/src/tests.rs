// tests.rs
//
// Program-level tests: hand-built sources run through initialization and
// resolution. The parser is an external collaborator, so inputs are
// constructed AST nodes.

use std::rc::Rc;

use stave_frontend::{
    ClassDeclaration, ClassMember, DecoratorNode, EnumDeclaration, EnumValueDeclaration,
    ExportMember, ExportStatement, Expression, FieldDeclaration, FunctionDeclaration, Ident,
    ImportDeclaration, ImportStatement, IntegerLiteralExpression, NamedTypeNode,
    NamespaceDeclaration, ParameterNode, Source, Statement, StringLiteralExpression,
    SignatureNode, TypeDeclaration, TypeNode, TypeParameterNode, VariableDeclaration,
    VariableStatement,
};
use stave_identity::Span;

use crate::elements::{CommonFlags, ElementKind, OperatorKind};
use crate::errors::{SemanticError, SemanticWarning};
use crate::flow::FlowFlags;
use crate::program::{Program, ProgramOptions};
use crate::resolver::{ExprContext, TypeContext};
use crate::types::TypeId;

// ============================================================================
// Builders
// ============================================================================

fn span() -> Span {
    Span::new(0, 1)
}

fn ident(text: &str) -> Ident {
    Ident::new(text, span())
}

fn named(name: &str) -> TypeNode {
    TypeNode::named(name, span())
}

fn generic(name: &str, arguments: Vec<TypeNode>) -> TypeNode {
    TypeNode::Named(NamedTypeNode {
        name: ident(name),
        type_arguments: arguments,
        nullable: false,
        span: span(),
    })
}

fn decorator(name: &str) -> DecoratorNode {
    DecoratorNode {
        name: ident(name),
        arguments: Vec::new(),
        span: span(),
    }
}

fn operator(symbol: &str) -> DecoratorNode {
    DecoratorNode {
        name: ident("operator"),
        arguments: vec![Expression::StringLiteral(StringLiteralExpression {
            value: symbol.to_string(),
            span: span(),
        })],
        span: span(),
    }
}

fn parameter(name: &str, ty: TypeNode) -> ParameterNode {
    ParameterNode {
        name: ident(name),
        ty,
        initializer: None,
        is_rest: false,
        span: span(),
    }
}

fn field(name: &str, ty: TypeNode) -> ClassMember {
    ClassMember::Field(Rc::new(FieldDeclaration {
        name: ident(name),
        ty: Some(ty),
        initializer: None,
        flags: CommonFlags::empty(),
        decorators: Vec::new(),
        span: span(),
    }))
}

fn function_declaration(
    name: &str,
    flags: CommonFlags,
    decorators: Vec<DecoratorNode>,
    type_parameters: &[&str],
    parameters: Vec<ParameterNode>,
    return_type: Option<TypeNode>,
) -> Rc<FunctionDeclaration> {
    Rc::new(FunctionDeclaration {
        name: ident(name),
        type_parameters: type_parameters
            .iter()
            .map(|parameter| TypeParameterNode {
                name: ident(parameter),
                span: span(),
            })
            .collect(),
        signature: SignatureNode {
            parameters,
            return_type,
            explicit_this_type: None,
            span: span(),
        },
        flags,
        decorators,
        span: span(),
    })
}

fn method(
    name: &str,
    flags: CommonFlags,
    decorators: Vec<DecoratorNode>,
    parameters: Vec<ParameterNode>,
    return_type: Option<TypeNode>,
) -> ClassMember {
    ClassMember::Method(function_declaration(
        name,
        flags,
        decorators,
        &[],
        parameters,
        return_type,
    ))
}

#[allow(clippy::too_many_arguments)]
fn class_with(
    name: &str,
    flags: CommonFlags,
    decorators: Vec<DecoratorNode>,
    type_parameters: &[&str],
    extends: Option<TypeNode>,
    implements: Vec<TypeNode>,
    members: Vec<ClassMember>,
) -> Statement {
    Statement::Class(Rc::new(ClassDeclaration {
        name: ident(name),
        type_parameters: type_parameters
            .iter()
            .map(|parameter| TypeParameterNode {
                name: ident(parameter),
                span: span(),
            })
            .collect(),
        extends_type: extends,
        implements_types: implements,
        members,
        flags,
        decorators,
        span: span(),
    }))
}

fn class(name: &str, members: Vec<ClassMember>) -> Statement {
    class_with(
        name,
        CommonFlags::empty(),
        Vec::new(),
        &[],
        None,
        Vec::new(),
        members,
    )
}

fn function(name: &str, return_type: Option<TypeNode>) -> Statement {
    Statement::Function(function_declaration(
        name,
        CommonFlags::empty(),
        Vec::new(),
        &[],
        Vec::new(),
        return_type,
    ))
}

fn namespace(name: &str, flags: CommonFlags, members: Vec<Statement>) -> Statement {
    Statement::Namespace(Rc::new(NamespaceDeclaration {
        name: ident(name),
        members,
        flags,
        span: span(),
    }))
}

fn variable(name: &str, flags: CommonFlags, ty: Option<TypeNode>) -> Statement {
    Statement::Variable(Rc::new(VariableStatement {
        declarations: vec![Rc::new(VariableDeclaration {
            name: ident(name),
            ty,
            initializer: None,
            flags,
            decorators: Vec::new(),
            span: span(),
        })],
        span: span(),
    }))
}

fn import(path: &str, members: &[(&str, &str)]) -> Statement {
    Statement::Import(Rc::new(ImportStatement {
        declarations: Some(
            members
                .iter()
                .map(|(external, local)| {
                    Rc::new(ImportDeclaration {
                        name: ident(local),
                        external_name: ident(external),
                        span: span(),
                    })
                })
                .collect(),
        ),
        namespace_name: None,
        internal_path: path.to_string(),
        span: span(),
    }))
}

fn export(members: &[(&str, &str)], path: Option<&str>) -> Statement {
    Statement::Export(Rc::new(ExportStatement {
        members: members
            .iter()
            .map(|(local, exported)| ExportMember {
                local_name: ident(local),
                exported_name: ident(exported),
                span: span(),
            })
            .collect(),
        internal_path: path.map(str::to_string),
        span: span(),
    }))
}

fn source(path: &str, is_entry: bool, statements: Vec<Statement>) -> Rc<Source> {
    Rc::new(Source::new(path, is_entry, statements))
}

fn analyze(sources: Vec<Rc<Source>>) -> Program {
    let mut program = Program::new(ProgramOptions::default());
    for one in sources {
        program.add_source(one);
    }
    program.initialize();
    program
}

fn has_error(program: &Program, predicate: impl Fn(&SemanticError) -> bool) -> bool {
    program
        .diagnostics
        .errors()
        .iter()
        .any(|error| predicate(&error.error))
}

fn internal_name(program: &Program, element: crate::elements::ElementId) -> &str {
    program
        .names
        .resolve(program.elements.get(element).internal_name)
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn lookup_keys_match_internal_names() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            class("Foo", vec![field("x", named("i32"))]),
            function("work", None),
            namespace(
                "N",
                CommonFlags::empty(),
                vec![function("inner", None)],
            ),
        ],
    )]);
    assert!(!program.diagnostics.has_errors());
    for (name, element) in &program.elements_lookup {
        assert_eq!(*name, program.elements.get(*element).internal_name);
    }
}

#[test]
fn duplicate_class_reports_duplicate_identifier() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![class("Foo", Vec::new()), class("Foo", Vec::new())],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::DuplicateIdentifier { name, .. } if name == "Foo"
    )));
}

#[test]
fn import_binds_alias_to_exported_class() {
    let program = &mut analyze(vec![
        source(
            "a",
            false,
            vec![class_with(
                "Foo",
                CommonFlags::EXPORT,
                Vec::new(),
                &[],
                None,
                Vec::new(),
                Vec::new(),
            )],
        ),
        source(
            "b",
            false,
            vec![
                import("a", &[("Foo", "Foo")]),
                variable(
                    "x",
                    CommonFlags::CONST | CommonFlags::EXPORT,
                    Some(named("Foo")),
                ),
            ],
        ),
    ]);
    assert!(!program.diagnostics.has_errors());
    let x = program.lookup_element_str("b/x").expect("b/x is bound");
    assert_eq!(program.elements.get(x).kind, ElementKind::Global);
    program.resolve_global(x);
    let ty = program.elements.get(x).global().ty;
    let class = program.types.class_reference(ty).expect("class type");
    assert_eq!(internal_name(program, class), "a/Foo");
}

#[test]
fn import_resolves_index_alternative() {
    let program = analyze(vec![
        source(
            "lib/index",
            false,
            vec![class_with(
                "Bar",
                CommonFlags::EXPORT,
                Vec::new(),
                &[],
                None,
                Vec::new(),
                Vec::new(),
            )],
        ),
        source("main", false, vec![import("lib", &[("Bar", "Bar")])]),
    ]);
    assert!(!program.diagnostics.has_errors());
    let bar = program.lookup_element_str("main/Bar").expect("alias bound");
    assert_eq!(internal_name(&program, bar), "lib/index/Bar");
}

#[test]
fn unresolved_import_reports_missing_member() {
    let program = analyze(vec![
        source("a", false, Vec::new()),
        source("b", false, vec![import("a", &[("Missing", "Missing")])]),
    ]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::NoExportedMember { module, member, .. }
            if module == "a" && member == "Missing"
    )));
}

#[test]
fn export_conflict_reported() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            class_with(
                "Foo",
                CommonFlags::EXPORT,
                Vec::new(),
                &[],
                None,
                Vec::new(),
                Vec::new(),
            ),
            class_with(
                "Bar",
                CommonFlags::EXPORT,
                Vec::new(),
                &[],
                None,
                Vec::new(),
                Vec::new(),
            ),
            export(&[("Bar", "Foo")], None),
        ],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::ExportConflict { name, .. } if name == "Foo"
    )));
}

#[test]
fn re_exports_chain_through_the_queue() {
    // `b` re-exports from `a`, but is initialized first, so both its export
    // and `c`'s import resolve through the queued-export chain.
    let program = analyze(vec![
        source("b", false, vec![export(&[("X", "X")], Some("a"))]),
        source(
            "a",
            false,
            vec![class_with(
                "X",
                CommonFlags::EXPORT,
                Vec::new(),
                &[],
                None,
                Vec::new(),
                Vec::new(),
            )],
        ),
        source("c", false, vec![import("b", &[("X", "X")])]),
    ]);
    assert!(!program.diagnostics.has_errors());
    let imported = program.lookup_element_str("c/X").expect("import bound");
    assert_eq!(internal_name(&program, imported), "a/X");
    let exported = program.names.get("b/X").unwrap();
    assert_eq!(program.file_level_exports.get(&exported), Some(&imported));
}

#[test]
fn global_aliases_bind_existing_elements() {
    let mut program = Program::new(ProgramOptions {
        global_aliases: vec![("abs".to_string(), "a/abs".to_string())],
        ..ProgramOptions::default()
    });
    program.add_source(source("a", false, vec![function("abs", Some(named("f64")))]));
    program.initialize();
    let target = program.lookup_element_str("a/abs").unwrap();
    assert_eq!(program.lookup_element_str("abs"), Some(target));
}

#[test]
fn entry_exports_promote_to_module_level() {
    let program = analyze(vec![source(
        "main",
        true,
        vec![class_with(
            "Api",
            CommonFlags::EXPORT,
            Vec::new(),
            &[],
            None,
            Vec::new(),
            Vec::new(),
        )],
    )]);
    let api = program.lookup_element_str("main/Api").unwrap();
    let simple = program.names.get("Api").unwrap();
    assert_eq!(program.module_level_exports.get(&simple), Some(&api));
    assert!(program
        .elements
        .get(api)
        .flags
        .contains(CommonFlags::MODULE_EXPORT));
}

#[test]
fn namespace_declarations_merge() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            namespace(
                "N",
                CommonFlags::empty(),
                vec![Statement::Function(function_declaration(
                    "f",
                    CommonFlags::EXPORT,
                    Vec::new(),
                    &[],
                    Vec::new(),
                    None,
                ))],
            ),
            namespace(
                "N",
                CommonFlags::empty(),
                vec![Statement::Function(function_declaration(
                    "g",
                    CommonFlags::EXPORT,
                    Vec::new(),
                    &[],
                    Vec::new(),
                    None,
                ))],
            ),
        ],
    )]);
    assert!(!program.diagnostics.has_errors());
    let n = program.lookup_element_str("a/N").unwrap();
    let members = &program.elements.get(n).members;
    assert!(members.contains_key("f"));
    assert!(members.contains_key("g"));
}

#[test]
fn namespace_merge_requires_matching_export_status() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            namespace("N", CommonFlags::EXPORT, Vec::new()),
            namespace("N", CommonFlags::empty(), Vec::new()),
        ],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::MergedDeclarationExportMismatch { name, .. } if name == "N"
    )));
}

#[test]
fn enum_values_count_from_previous() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![Statement::Enum(Rc::new(EnumDeclaration {
            name: ident("Color"),
            values: vec![
                EnumValueDeclaration {
                    name: ident("Red"),
                    initializer: None,
                    span: span(),
                },
                EnumValueDeclaration {
                    name: ident("Green"),
                    initializer: None,
                    span: span(),
                },
                EnumValueDeclaration {
                    name: ident("Blue"),
                    initializer: Some(Expression::IntegerLiteral(IntegerLiteralExpression {
                        value: 5,
                        span: span(),
                    })),
                    span: span(),
                },
                EnumValueDeclaration {
                    name: ident("Alpha"),
                    initializer: None,
                    span: span(),
                },
            ],
            flags: CommonFlags::empty(),
            decorators: Vec::new(),
            span: span(),
        }))],
    )]);
    let color = program.lookup_element_str("a/Color").unwrap();
    let expected = [("Red", 0), ("Green", 1), ("Blue", 5), ("Alpha", 6)];
    for (name, value) in expected {
        let member = program.elements.get(color).members[name];
        assert_eq!(
            program.elements.get(member).enum_value().value,
            Some(value),
            "value of {name}"
        );
    }
}

#[test]
fn accessors_join_into_one_property() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![class(
            "Box",
            vec![
                method("size", CommonFlags::GET, Vec::new(), Vec::new(), Some(named("i32"))),
                method(
                    "size",
                    CommonFlags::SET,
                    Vec::new(),
                    vec![parameter("value", named("i32"))],
                    None,
                ),
            ],
        )],
    )]);
    assert!(!program.diagnostics.has_errors());
    let class = program.lookup_element_str("a/Box").unwrap();
    let data = program.elements.get(class).class_prototype();
    let property = data.instance_members["size"];
    let property_data = program.elements.get(property).property();
    assert!(property_data.getter_prototype.is_some());
    assert!(property_data.setter_prototype.is_some());
}

#[test]
fn second_getter_reports_duplicate_identifier() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![class(
            "Box",
            vec![
                method("size", CommonFlags::GET, Vec::new(), Vec::new(), Some(named("i32"))),
                method("size", CommonFlags::GET, Vec::new(), Vec::new(), Some(named("i32"))),
            ],
        )],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::DuplicateIdentifier { name, .. } if name == "size"
    )));
}

#[test]
fn misplaced_decorator_warns_and_duplicate_errors() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            Statement::Function(function_declaration(
                "f",
                CommonFlags::empty(),
                vec![decorator("sealed")],
                &[],
                Vec::new(),
                None,
            )),
            class_with(
                "C",
                CommonFlags::empty(),
                vec![decorator("global"), decorator("global")],
                &[],
                None,
                Vec::new(),
                Vec::new(),
            ),
        ],
    )]);
    assert!(program.diagnostics.warnings().iter().any(|warning| matches!(
        &warning.warning,
        SemanticWarning::DecoratorNotValidHere { name, .. } if name == "sealed"
    )));
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::DuplicateDecorator { name, .. } if name == "global"
    )));
}

#[test]
fn unknown_operator_symbol_reports_not_supported() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![class(
            "V",
            vec![method(
                "shift",
                CommonFlags::empty(),
                vec![operator("<<")],
                Vec::new(),
                None,
            )],
        )],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::OperationNotSupported { .. }
    )));
}

#[test]
fn duplicate_operator_reports_duplicate_implementation() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![class(
            "Vec",
            vec![
                method(
                    "add",
                    CommonFlags::empty(),
                    vec![operator("+")],
                    vec![parameter("other", named("Vec"))],
                    Some(named("Vec")),
                ),
                method(
                    "plus",
                    CommonFlags::empty(),
                    vec![operator("+")],
                    vec![parameter("other", named("Vec"))],
                    Some(named("Vec")),
                ),
            ],
        )],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::DuplicateFunctionImplementation { .. }
    )));
    let vec_proto = program.lookup_element_str("a/Vec").unwrap();
    let data = program.elements.get(vec_proto).class_prototype();
    assert_eq!(data.operator_prototypes.len(), 1);
    let (kind, first) = data.operator_prototypes[0];
    assert_eq!(kind, OperatorKind::Add);
    assert_eq!(program.elements.get(first).simple_name, "add");
}

#[test]
fn sealed_class_cannot_be_extended() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            class("A", Vec::new()),
            class_with(
                "B",
                CommonFlags::empty(),
                vec![decorator("sealed")],
                &[],
                Some(named("A")),
                Vec::new(),
                Vec::new(),
            ),
            class_with(
                "C",
                CommonFlags::empty(),
                Vec::new(),
                &[],
                Some(named("B")),
                Vec::new(),
                Vec::new(),
            ),
        ],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::ClassSealed { name, .. } if name == "B"
    )));
    let c = program.lookup_element_str("a/C").unwrap();
    assert!(program
        .elements
        .get(c)
        .class_prototype()
        .base_prototype
        .is_none());
}

#[test]
fn unmanaged_cannot_mix_with_managed() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![
            class("M", Vec::new()),
            class_with(
                "U",
                CommonFlags::empty(),
                vec![decorator("unmanaged")],
                &[],
                Some(named("M")),
                Vec::new(),
                Vec::new(),
            ),
            Statement::Interface(Rc::new(ClassDeclaration {
                name: ident("I"),
                type_parameters: Vec::new(),
                extends_type: None,
                implements_types: Vec::new(),
                members: Vec::new(),
                flags: CommonFlags::empty(),
                decorators: Vec::new(),
                span: span(),
            })),
            class_with(
                "V",
                CommonFlags::empty(),
                vec![decorator("unmanaged")],
                &[],
                None,
                vec![named("I")],
                Vec::new(),
            ),
        ],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::UnmanagedExtendsManaged { .. }
    )));
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::UnmanagedImplements { .. }
    )));
}

// ============================================================================
// Monomorphization and layout
// ============================================================================

#[test]
fn monomorphization_is_memoized() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![class_with(
            "Box",
            CommonFlags::empty(),
            Vec::new(),
            &["T"],
            None,
            Vec::new(),
            vec![field("value", named("T"))],
        )],
    )]);
    let prototype = program.lookup_element_str("a/Box").unwrap();
    let first = program
        .resolve_class(prototype, &[TypeId::I32], None, span())
        .unwrap();
    let second = program
        .resolve_class(prototype, &[TypeId::I32], None, span())
        .unwrap();
    assert_eq!(first, second);
    let data = program.elements.get(prototype).class_prototype();
    assert_eq!(data.instances.len(), 1);
    assert!(data.instances.contains_key("i32"));
    assert_eq!(internal_name(&program, first), "a/Box<i32>");
}

#[test]
fn generic_field_layout() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![class_with(
            "Box",
            CommonFlags::empty(),
            Vec::new(),
            &["T"],
            None,
            Vec::new(),
            vec![field("value", named("T"))],
        )],
    )]);
    let prototype = program.lookup_element_str("a/Box").unwrap();
    let instance = program
        .resolve_class(prototype, &[TypeId::I32], None, span())
        .unwrap();
    let value = program.lookup_member(instance, "value").unwrap();
    let value_data = program.elements.get(value).field();
    assert_eq!(value_data.memory_offset, 0);
    assert_eq!(value_data.ty, TypeId::I32);
    assert_eq!(program.types.byte_size(value_data.ty), 4);
    assert_eq!(
        program.elements.get(instance).class().current_memory_offset,
        4
    );
}

#[test]
fn field_alignment_and_padding() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![class(
            "A",
            vec![field("x", named("i8")), field("y", named("i32"))],
        )],
    )]);
    let prototype = program.lookup_element_str("a/A").unwrap();
    let instance = program.resolve_class(prototype, &[], None, span()).unwrap();
    let x = program.lookup_member(instance, "x").unwrap();
    let y = program.lookup_member(instance, "y").unwrap();
    assert_eq!(program.elements.get(x).field().memory_offset, 0);
    assert_eq!(program.elements.get(y).field().memory_offset, 4);
    let class_data = program.elements.get(instance).class();
    assert_eq!(class_data.current_memory_offset, 8);
    // Every field offset is a multiple of its byte size, and the class size
    // covers the furthest field.
    for name in ["x", "y"] {
        let member = program.lookup_member(instance, name).unwrap();
        let data = program.elements.get(member).field();
        let size = program.types.byte_size(data.ty);
        assert_eq!(data.memory_offset % size, 0);
        assert!(class_data.current_memory_offset >= data.memory_offset + size);
    }
}

#[test]
fn derived_classes_inherit_base_members_and_layout() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class("Base", vec![field("x", named("i32"))]),
            class_with(
                "Derived",
                CommonFlags::empty(),
                Vec::new(),
                &[],
                Some(named("Base")),
                Vec::new(),
                vec![field("y", named("i64"))],
            ),
        ],
    )]);
    let prototype = program.lookup_element_str("a/Derived").unwrap();
    let instance = program.resolve_class(prototype, &[], None, span()).unwrap();
    let base = program.elements.get(instance).class().base.unwrap();
    // Inherited members map to the same element unless overridden.
    let base_x = program.lookup_member(base, "x").unwrap();
    let derived_x = program.lookup_member(instance, "x").unwrap();
    assert_eq!(base_x, derived_x);
    // Derived fields lay out after the base's end offset.
    let y = program.lookup_member(instance, "y").unwrap();
    assert_eq!(program.elements.get(y).field().memory_offset, 8);
    assert_eq!(
        program.elements.get(instance).class().current_memory_offset,
        16
    );
}

#[test]
fn operator_overloads_resolve_through_base_chain() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class(
                "Base",
                vec![method(
                    "add",
                    CommonFlags::empty(),
                    vec![operator("+")],
                    vec![parameter("other", named("Base"))],
                    Some(named("Base")),
                )],
            ),
            class_with(
                "Derived",
                CommonFlags::empty(),
                Vec::new(),
                &[],
                Some(named("Base")),
                Vec::new(),
                Vec::new(),
            ),
        ],
    )]);
    let prototype = program.lookup_element_str("a/Derived").unwrap();
    let instance = program.resolve_class(prototype, &[], None, span()).unwrap();
    let overload = program.lookup_overload(instance, OperatorKind::Add);
    assert!(overload.is_some());
    assert!(program
        .lookup_overload(instance, OperatorKind::IndexedGet)
        .is_none());
    // The overload is defined on the base instance.
    let base = program.elements.get(instance).class().base.unwrap();
    assert_eq!(overload, program.lookup_overload(base, OperatorKind::Add));
}

#[test]
fn partial_application_binds_class_type_arguments() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![class_with(
            "Box",
            CommonFlags::empty(),
            Vec::new(),
            &["T"],
            None,
            Vec::new(),
            vec![
                field("value", named("T")),
                method("get", CommonFlags::empty(), Vec::new(), Vec::new(), Some(named("T"))),
            ],
        )],
    )]);
    let prototype = program.lookup_element_str("a/Box").unwrap();
    let instance = program
        .resolve_class(prototype, &[TypeId::I32], None, span())
        .unwrap();
    let bound = program.lookup_member(instance, "get").unwrap();
    assert_eq!(
        program.elements.get(bound).kind,
        ElementKind::FunctionPrototype
    );
    let captured = program
        .elements
        .get(bound)
        .function_prototype()
        .class_type_arguments
        .clone()
        .unwrap();
    assert_eq!(captured.as_slice(), &[TypeId::I32]);
    // Fully resolving the partial prototype substitutes T.
    let function = program.resolve_function(bound, &[], None, span()).unwrap();
    let signature = program.elements.get(function).function().signature;
    assert_eq!(program.types.signature(signature).return_type, TypeId::I32);
    let owner = program.elements.get(function).function().owner_class;
    assert_eq!(owner, Some(instance));
}

#[test]
fn generic_function_instances_memoize() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![Statement::Function(function_declaration(
            "id",
            CommonFlags::empty(),
            Vec::new(),
            &["T"],
            vec![parameter("x", named("T"))],
            Some(named("T")),
        ))],
    )]);
    let prototype = program.lookup_element_str("a/id").unwrap();
    let first = program
        .resolve_function(prototype, &[TypeId::I64], None, span())
        .unwrap();
    let second = program
        .resolve_function(prototype, &[TypeId::I64], None, span())
        .unwrap();
    assert_eq!(first, second);
    let signature = program.elements.get(first).function().signature;
    assert_eq!(program.types.signature(signature).return_type, TypeId::I64);
    assert_eq!(internal_name(&program, first), "a/id<i64>");
}

#[test]
fn missing_type_arguments_report_arity() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class_with(
                "Box",
                CommonFlags::empty(),
                Vec::new(),
                &["T"],
                None,
                Vec::new(),
                Vec::new(),
            ),
            variable("b", CommonFlags::LET, Some(named("Box"))),
        ],
    )]);
    let b = program.lookup_element_str("a/b").unwrap();
    program.resolve_global(b);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::WrongTypeArgumentCount {
            expected: 1,
            found: 0,
            ..
        }
    )));
}

// ============================================================================
// Type resolution
// ============================================================================

#[test]
fn resolve_type_is_idempotent() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![class_with(
            "Box",
            CommonFlags::empty(),
            Vec::new(),
            &["T"],
            None,
            Vec::new(),
            vec![field("value", named("T"))],
        )],
    )]);
    let ctx = TypeContext::new("a");
    let primitive = named("i32");
    assert_eq!(
        program.resolve_type(&primitive, &ctx),
        program.resolve_type(&primitive, &ctx)
    );
    let boxed = generic("Box", vec![named("i32")]);
    let first = program.resolve_type(&boxed, &ctx).unwrap();
    let second = program.resolve_type(&boxed, &ctx).unwrap();
    assert_eq!(first, second);
    assert!(!program.diagnostics.has_errors());
}

#[test]
fn type_alias_expands_on_lookup() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            Statement::TypeAlias(Rc::new(TypeDeclaration {
                name: ident("int"),
                type_parameters: Vec::new(),
                alias: named("i32"),
                flags: CommonFlags::empty(),
                span: span(),
            })),
            variable("n", CommonFlags::LET, Some(named("int"))),
        ],
    )]);
    let n = program.lookup_element_str("a/n").unwrap();
    program.resolve_global(n);
    assert_eq!(program.elements.get(n).global().ty, TypeId::I32);
}

#[test]
fn namespaced_type_alias_is_unsupported() {
    let program = analyze(vec![source(
        "a",
        false,
        vec![namespace(
            "N",
            CommonFlags::empty(),
            vec![Statement::TypeAlias(Rc::new(TypeDeclaration {
                name: ident("int"),
                type_parameters: Vec::new(),
                alias: named("i32"),
                flags: CommonFlags::empty(),
                span: span(),
            }))],
        )],
    )]);
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::OperationNotSupported { .. }
    )));
}

#[test]
fn function_type_nodes_resolve_to_pointer_sized_references() {
    let mut program = analyze(vec![source("a", false, Vec::new())]);
    let node = TypeNode::Function(Box::new(SignatureNode {
        parameters: vec![parameter("x", named("i32"))],
        return_type: Some(named("i64")),
        explicit_this_type: None,
        span: span(),
    }));
    let ctx = TypeContext::new("a");
    let ty = program.resolve_type(&node, &ctx).unwrap();
    let signature = program.types.signature_reference(ty).unwrap();
    assert_eq!(program.types.signature(signature).return_type, TypeId::I64);
    assert_eq!(program.types.byte_size(ty), 4);
}

#[test]
fn nullable_class_types_intern_separately() {
    let mut program = analyze(vec![source("a", false, vec![class("A", Vec::new())])]);
    let ctx = TypeContext::new("a");
    let plain = program.resolve_type(&named("A"), &ctx).unwrap();
    let nullable = program
        .resolve_type(
            &TypeNode::Named(NamedTypeNode {
                name: ident("A"),
                type_arguments: Vec::new(),
                nullable: true,
                span: span(),
            }),
            &ctx,
        )
        .unwrap();
    assert_ne!(plain, nullable);
    assert_eq!(
        program.types.class_reference(plain),
        program.types.class_reference(nullable)
    );
    assert_eq!(program.type_to_string(nullable), "a/A | null");
}

#[test]
fn rest_parameters_must_be_terminal() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            Statement::Function(Rc::new(FunctionDeclaration {
                name: ident("bad"),
                type_parameters: Vec::new(),
                signature: SignatureNode {
                    parameters: vec![
                        ParameterNode {
                            name: ident("rest"),
                            ty: named("i32"),
                            initializer: None,
                            is_rest: true,
                            span: span(),
                        },
                        parameter("after", named("i32")),
                    ],
                    return_type: None,
                    explicit_this_type: None,
                    span: span(),
                },
                flags: CommonFlags::empty(),
                decorators: Vec::new(),
                span: span(),
            })),
            Statement::Function(Rc::new(FunctionDeclaration {
                name: ident("ok"),
                type_parameters: Vec::new(),
                signature: SignatureNode {
                    parameters: vec![
                        parameter("first", named("i32")),
                        ParameterNode {
                            name: ident("rest"),
                            ty: named("i32"),
                            initializer: None,
                            is_rest: true,
                            span: span(),
                        },
                    ],
                    return_type: None,
                    explicit_this_type: None,
                    span: span(),
                },
                flags: CommonFlags::empty(),
                decorators: Vec::new(),
                span: span(),
            })),
        ],
    )]);
    let bad = program.lookup_element_str("a/bad").unwrap();
    assert!(program.resolve_function(bad, &[], None, span()).is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::OperationNotSupported { .. }
    )));
    let ok = program.lookup_element_str("a/ok").unwrap();
    let function = program.resolve_function(ok, &[], None, span()).unwrap();
    let signature = program
        .types
        .signature(program.elements.get(function).function().signature)
        .clone();
    assert!(signature.has_rest);
    assert_eq!(signature.required_parameters, 1);
}

#[test]
fn unknown_type_reports_cannot_find_name() {
    let mut program = analyze(vec![source("a", false, Vec::new())]);
    let ctx = TypeContext::new("a");
    assert!(program.resolve_type(&named("Missing"), &ctx).is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::CannotFindName { name, .. } if name == "Missing"
    )));
    // Quiet lookups stay silent.
    let before = program.diagnostics.errors().len();
    assert!(program
        .resolve_type(&named("AlsoMissing"), &ctx.quiet())
        .is_none());
    assert_eq!(program.diagnostics.errors().len(), before);
}

// ============================================================================
// Expression resolution
// ============================================================================

/// Build a program with a class `A { x: i32 }`, a global `g: A` and a free
/// function `main` to act as the contextual function.
fn fixture_with_global() -> (Program, crate::elements::ElementId) {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class("A", vec![field("x", named("i32"))]),
            variable("g", CommonFlags::CONST, Some(named("A"))),
            function("main", None),
        ],
    )]);
    let main_prototype = program.lookup_element_str("a/main").unwrap();
    let main = program
        .resolve_function(main_prototype, &[], None, span())
        .unwrap();
    (program, main)
}

#[test]
fn identifier_resolves_through_file_scope() {
    let (mut program, main) = fixture_with_global();
    let ctx = ExprContext::of(main);
    let expression = Expression::identifier("g", span());
    let resolved = program.resolve_expression(&expression, &ctx).unwrap();
    assert_eq!(program.elements.get(resolved.element).kind, ElementKind::Global);
    assert!(resolved.this_expression.is_none());
}

#[test]
fn identifier_resolves_through_namespace_chain() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![namespace(
            "N",
            CommonFlags::empty(),
            vec![
                Statement::Function(function_declaration(
                    "helper",
                    CommonFlags::EXPORT,
                    Vec::new(),
                    &[],
                    Vec::new(),
                    None,
                )),
                Statement::Function(function_declaration(
                    "user",
                    CommonFlags::EXPORT,
                    Vec::new(),
                    &[],
                    Vec::new(),
                    None,
                )),
            ],
        )],
    )]);
    let user_prototype = program.lookup_element_str("a/N.user").unwrap();
    let user = program
        .resolve_function(user_prototype, &[], None, span())
        .unwrap();
    let ctx = ExprContext::of(user);
    let resolved = program
        .resolve_identifier("helper", span(), &ctx)
        .unwrap();
    assert_eq!(internal_name(&program, resolved), "a/N.helper");
}

#[test]
fn property_access_resolves_fields_through_globals() {
    let (mut program, main) = fixture_with_global();
    let ctx = ExprContext::of(main);
    let expression = Expression::PropertyAccess(stave_frontend::PropertyAccessExpression {
        expression: Box::new(Expression::identifier("g", span())),
        property: ident("x"),
        span: span(),
    });
    let resolved = program.resolve_expression(&expression, &ctx).unwrap();
    assert_eq!(program.elements.get(resolved.element).kind, ElementKind::Field);
    assert_eq!(program.elements.get(resolved.element).field().memory_offset, 0);
    assert!(resolved.this_expression.is_some());
}

#[test]
fn missing_property_reports_error() {
    let (mut program, main) = fixture_with_global();
    let ctx = ExprContext::of(main);
    let expression = Expression::PropertyAccess(stave_frontend::PropertyAccessExpression {
        expression: Box::new(Expression::identifier("g", span())),
        property: ident("missing"),
        span: span(),
    });
    assert!(program.resolve_expression(&expression, &ctx).is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::PropertyDoesNotExist { property, .. } if property == "missing"
    )));
}

#[test]
fn property_access_through_getter_return_type() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class("B", vec![field("y", named("i32"))]),
            class(
                "A",
                vec![method("item", CommonFlags::GET, Vec::new(), Vec::new(), Some(named("B")))],
            ),
            variable("g", CommonFlags::CONST, Some(named("A"))),
            function("main", None),
        ],
    )]);
    let main_prototype = program.lookup_element_str("a/main").unwrap();
    let main = program
        .resolve_function(main_prototype, &[], None, span())
        .unwrap();
    let ctx = ExprContext::of(main);
    let inner = Expression::PropertyAccess(stave_frontend::PropertyAccessExpression {
        expression: Box::new(Expression::identifier("g", span())),
        property: ident("item"),
        span: span(),
    });
    let expression = Expression::PropertyAccess(stave_frontend::PropertyAccessExpression {
        expression: Box::new(inner),
        property: ident("y"),
        span: span(),
    });
    let resolved = program.resolve_expression(&expression, &ctx).unwrap();
    assert_eq!(program.elements.get(resolved.element).kind, ElementKind::Field);
    assert!(!program.diagnostics.has_errors());
}

#[test]
fn element_access_routes_through_indexed_get() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class("Item", vec![field("x", named("i32"))]),
            class(
                "Arr",
                vec![method(
                    "at",
                    CommonFlags::empty(),
                    vec![operator("[]")],
                    vec![parameter("index", named("i32"))],
                    Some(named("Item")),
                )],
            ),
            variable("arr", CommonFlags::CONST, Some(named("Arr"))),
            function("main", None),
        ],
    )]);
    let main_prototype = program.lookup_element_str("a/main").unwrap();
    let main = program
        .resolve_function(main_prototype, &[], None, span())
        .unwrap();
    let ctx = ExprContext::of(main);

    let indexed = Expression::ElementAccess(stave_frontend::ElementAccessExpression {
        expression: Box::new(Expression::identifier("arr", span())),
        element: Box::new(Expression::IntegerLiteral(IntegerLiteralExpression {
            value: 0,
            span: span(),
        })),
        span: span(),
    });
    let resolved = program.resolve_expression(&indexed, &ctx).unwrap();
    assert_eq!(internal_name(&program, resolved.element), "a/Arr");
    assert!(resolved.this_expression.is_some());
    assert!(resolved.element_expression.is_some());

    // A subsequent property access consumes the pending indexed access.
    let chained = Expression::PropertyAccess(stave_frontend::PropertyAccessExpression {
        expression: Box::new(indexed),
        property: ident("x"),
        span: span(),
    });
    let resolved = program.resolve_expression(&chained, &ctx).unwrap();
    assert_eq!(program.elements.get(resolved.element).kind, ElementKind::Field);
    assert!(!program.diagnostics.has_errors());
}

#[test]
fn element_access_without_overload_reports_missing_index_signature() {
    let (mut program, main) = fixture_with_global();
    let ctx = ExprContext::of(main);
    let expression = Expression::ElementAccess(stave_frontend::ElementAccessExpression {
        expression: Box::new(Expression::identifier("g", span())),
        element: Box::new(Expression::IntegerLiteral(IntegerLiteralExpression {
            value: 0,
            span: span(),
        })),
        span: span(),
    });
    assert!(program.resolve_expression(&expression, &ctx).is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::IndexSignatureMissing { .. }
    )));
}

#[test]
fn calls_resolve_to_return_type_class() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class("A", Vec::new()),
            function("make", Some(named("A"))),
            function("main", None),
        ],
    )]);
    let main_prototype = program.lookup_element_str("a/main").unwrap();
    let main = program
        .resolve_function(main_prototype, &[], None, span())
        .unwrap();
    let ctx = ExprContext::of(main);
    let call = Expression::Call(stave_frontend::CallExpression {
        expression: Box::new(Expression::identifier("make", span())),
        type_arguments: Vec::new(),
        arguments: Vec::new(),
        span: span(),
    });
    let resolved = program.resolve_expression(&call, &ctx).unwrap();
    assert_eq!(internal_name(&program, resolved.element), "a/A");
}

#[test]
fn calling_a_non_callable_reports_error() {
    let (mut program, main) = fixture_with_global();
    let ctx = ExprContext::of(main);
    let call = Expression::Call(stave_frontend::CallExpression {
        expression: Box::new(Expression::identifier("A", span())),
        type_arguments: Vec::new(),
        arguments: Vec::new(),
        span: span(),
    });
    assert!(program.resolve_expression(&call, &ctx).is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::NotCallable { .. }
    )));
}

#[test]
fn this_and_super_resolve_to_owning_classes() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class(
                "A",
                vec![method("m", CommonFlags::empty(), Vec::new(), Vec::new(), None)],
            ),
            class_with(
                "B",
                CommonFlags::empty(),
                Vec::new(),
                &[],
                Some(named("A")),
                Vec::new(),
                vec![method("n", CommonFlags::empty(), Vec::new(), Vec::new(), None)],
            ),
            function("free", None),
        ],
    )]);
    let a_prototype = program.lookup_element_str("a/A").unwrap();
    let a = program.resolve_class(a_prototype, &[], None, span()).unwrap();
    let b_prototype = program.lookup_element_str("a/B").unwrap();
    let b = program.resolve_class(b_prototype, &[], None, span()).unwrap();

    let m_prototype = program.lookup_member(a, "m").unwrap();
    let m = program.resolve_function(m_prototype, &[], None, span()).unwrap();
    let n_prototype = program.lookup_member(b, "n").unwrap();
    let n = program.resolve_function(n_prototype, &[], None, span()).unwrap();

    let this_expression = Expression::This(span());
    let super_expression = Expression::Super(span());

    let resolved = program
        .resolve_expression(&this_expression, &ExprContext::of(m))
        .unwrap();
    assert_eq!(resolved.element, a);

    let resolved = program
        .resolve_expression(&super_expression, &ExprContext::of(n))
        .unwrap();
    assert_eq!(resolved.element, a);

    // `super` in a class without a base is an error.
    assert!(program
        .resolve_expression(&super_expression, &ExprContext::of(m))
        .is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::SuperNotAllowed { .. }
    )));

    // `this` outside a method is an error.
    let free_prototype = program.lookup_element_str("a/free").unwrap();
    let free = program
        .resolve_function(free_prototype, &[], None, span())
        .unwrap();
    assert!(program
        .resolve_expression(&this_expression, &ExprContext::of(free))
        .is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::ThisNotAllowed { .. }
    )));
}

#[test]
fn string_literals_resolve_to_the_string_class() {
    let mut program = analyze(vec![
        source(
            "~lib/string",
            false,
            vec![class_with(
                "String",
                CommonFlags::EXPORT,
                Vec::new(),
                &[],
                None,
                Vec::new(),
                Vec::new(),
            )],
        ),
        source("a", false, vec![function("main", None)]),
    ]);
    assert!(program.string_instance.is_some());

    // The `string` type name is registered post-resolution.
    let ctx = TypeContext::new("a");
    let ty = program.resolve_type(&named("string"), &ctx).unwrap();
    let class = program.types.class_reference(ty).unwrap();
    assert_eq!(internal_name(&program, class), "~lib/string/String");

    let main_prototype = program.lookup_element_str("a/main").unwrap();
    let main = program
        .resolve_function(main_prototype, &[], None, span())
        .unwrap();
    let literal = Expression::StringLiteral(StringLiteralExpression {
        value: "hi".to_string(),
        span: span(),
    });
    let resolved = program
        .resolve_expression(&literal, &ExprContext::of(main))
        .unwrap();
    assert_eq!(Some(resolved.element), program.string_instance);
    assert!(resolved.this_expression.is_some());
}

#[test]
fn binary_expressions_are_unsupported() {
    let (mut program, main) = fixture_with_global();
    let ctx = ExprContext::of(main);
    let expression = Expression::Binary(stave_frontend::BinaryExpression {
        op: stave_frontend::BinaryOp::Add,
        left: Box::new(Expression::identifier("g", span())),
        right: Box::new(Expression::identifier("g", span())),
        span: span(),
    });
    assert!(program.resolve_expression(&expression, &ctx).is_none());
    assert!(has_error(&program, |error| matches!(
        error,
        SemanticError::OperationNotSupported { .. }
    )));
}

// ============================================================================
// Flows and temp locals
// ============================================================================

#[test]
fn scopes_restore_temp_pools() {
    let mut program = analyze(vec![source("a", false, vec![function("work", None)])]);
    let prototype = program.lookup_element_str("a/work").unwrap();
    let function = program
        .resolve_function(prototype, &[], None, span())
        .unwrap();
    let flow = program.take_root_flow(function).unwrap();

    let mut child = flow.enter_branch_or_scope();
    let local = child
        .add_scoped_local(&mut program, "tmp", TypeId::I32, span())
        .unwrap();
    // A duplicate name in the same scope is rejected.
    assert!(child
        .add_scoped_local(&mut program, "tmp", TypeId::I32, span())
        .is_none());
    assert!(child.get_scoped_local(&program, "tmp") == Some(local));

    let _flow = child.leave_branch_or_scope(&mut program);
    // The released temp is recycled for the next request of the same native
    // type.
    let recycled = program.get_temp_local(function, TypeId::I32);
    assert_eq!(recycled, local);
    program.free_temp_local(function, recycled);
}

#[test]
fn leaving_a_branch_folds_flags_conditionally() {
    let mut program = analyze(vec![source("a", false, vec![function("work", None)])]);
    let prototype = program.lookup_element_str("a/work").unwrap();
    let function = program
        .resolve_function(prototype, &[], None, span())
        .unwrap();
    let flow = program.take_root_flow(function).unwrap();

    let mut child = flow.enter_branch_or_scope();
    child.set(FlowFlags::RETURNS);
    // A break targeting an outer label escapes this frame.
    child.break_label = Some("1".to_string());
    child.set(FlowFlags::BREAKS);
    let flow = child.leave_branch_or_scope(&mut program);

    assert!(flow.is(FlowFlags::CONDITIONALLY_RETURNS));
    assert!(!flow.is(FlowFlags::RETURNS));
    assert!(!flow.is(FlowFlags::CONDITIONALLY_BREAKS));
}

#[test]
fn break_contexts_label_by_id() {
    let mut program = analyze(vec![source("a", false, vec![function("work", None)])]);
    let prototype = program.lookup_element_str("a/work").unwrap();
    let function = program
        .resolve_function(prototype, &[], None, span())
        .unwrap();
    let outer = program.enter_break_context(function);
    let inner = program.enter_break_context(function);
    assert_eq!(outer, "0");
    assert_eq!(inner, "1");
    assert_eq!(program.current_break_label(function), Some("1".to_string()));
    program.leave_break_context(function);
    program.leave_break_context(function);
    assert_eq!(program.current_break_label(function), None);
    program.finalize_function(function);
    assert!(program
        .elements
        .get(function)
        .flags
        .contains(CommonFlags::COMPILED));
}

#[test]
fn function_locals_include_this_and_parameters() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![class(
            "A",
            vec![method(
                "m",
                CommonFlags::empty(),
                Vec::new(),
                vec![parameter("x", named("i32")), parameter("y", named("f64"))],
                None,
            )],
        )],
    )]);
    let prototype = program.lookup_element_str("a/A").unwrap();
    let instance = program.resolve_class(prototype, &[], None, span()).unwrap();
    let m_prototype = program.lookup_member(instance, "m").unwrap();
    let m = program.resolve_function(m_prototype, &[], None, span()).unwrap();
    let data = program.elements.get(m).function();
    assert_eq!(data.locals.len(), 3);
    let this_local = data.locals_by_name["this"];
    assert_eq!(program.elements.get(this_local).local().index, 0);
    let x = data.locals_by_name["x"];
    assert_eq!(program.elements.get(x).local().index, 1);
    assert_eq!(program.elements.get(x).local().ty, TypeId::I32);
    let y = data.locals_by_name["y"];
    assert_eq!(program.elements.get(y).local().index, 2);
    assert_eq!(program.elements.get(y).local().ty, TypeId::F64);
}

#[test]
fn class_assignability_follows_the_base_chain() {
    let mut program = analyze(vec![source(
        "a",
        false,
        vec![
            class("Base", Vec::new()),
            class_with(
                "Derived",
                CommonFlags::empty(),
                Vec::new(),
                &[],
                Some(named("Base")),
                Vec::new(),
                Vec::new(),
            ),
        ],
    )]);
    let base_prototype = program.lookup_element_str("a/Base").unwrap();
    let base = program
        .resolve_class(base_prototype, &[], None, span())
        .unwrap();
    let derived_prototype = program.lookup_element_str("a/Derived").unwrap();
    let derived = program
        .resolve_class(derived_prototype, &[], None, span())
        .unwrap();
    assert!(program.class_is_assignable_to(derived, base));
    assert!(program.class_is_assignable_to(derived, derived));
    assert!(!program.class_is_assignable_to(base, derived));
}
