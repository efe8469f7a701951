// elements.rs
//
// The element graph: declared and resolved entities, stored in an arena and
// addressed by ElementId handles. Cross-references between elements are
// always handles, never owning references.

use std::rc::Rc;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use stave_frontend::{
    ClassDeclaration, EnumDeclaration, FieldDeclaration, FunctionDeclaration,
    NamespaceDeclaration, VariableDeclaration,
};
use stave_identity::NameId;

use crate::flow::Flow;
use crate::types::{SignatureId, TypeId, TypeIdVec};

/// Stable handle of an element in the program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

impl ElementId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

bitflags! {
    /// Flags set by recognized decorators.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecoratorFlags: u32 {
        /// `@global` - also published under its simple name.
        const GLOBAL = 1 << 0;
        /// `@unmanaged` - not garbage collected, C-style layout rules.
        const UNMANAGED = 1 << 1;
        /// `@sealed` - cannot be extended.
        const SEALED = 1 << 2;
        /// `@inline` - always inlined at call sites.
        const INLINE = 1 << 3;
    }
}

/// One of the overloadable operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    IndexedGet,
    IndexedSet,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl OperatorKind {
    /// Map an `@operator("...")` annotation string to its kind.
    pub fn from_symbol(symbol: &str) -> Option<OperatorKind> {
        Some(match symbol {
            "[]" => OperatorKind::IndexedGet,
            "[]=" => OperatorKind::IndexedSet,
            "+" => OperatorKind::Add,
            "-" => OperatorKind::Sub,
            "*" => OperatorKind::Mul,
            "/" => OperatorKind::Div,
            "%" => OperatorKind::Rem,
            "**" => OperatorKind::Pow,
            "&" => OperatorKind::BitAnd,
            "|" => OperatorKind::BitOr,
            "^" => OperatorKind::BitXor,
            "==" => OperatorKind::Eq,
            "!=" => OperatorKind::Ne,
            ">" => OperatorKind::Gt,
            ">=" => OperatorKind::Ge,
            "<" => OperatorKind::Lt,
            "<=" => OperatorKind::Le,
            _ => return None,
        })
    }
}

/// Discriminant of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Global,
    Local,
    Enum,
    EnumValue,
    FunctionPrototype,
    Function,
    FunctionTarget,
    ClassPrototype,
    Class,
    InterfacePrototype,
    Interface,
    FieldPrototype,
    Field,
    Property,
    Namespace,
}

pub use stave_frontend::CommonFlags;

/// An element: shared header plus kind-specific payload.
#[derive(Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub simple_name: String,
    pub internal_name: NameId,
    pub flags: CommonFlags,
    pub decorator_flags: DecoratorFlags,
    /// Named members: static members on prototypes and namespaces, instance
    /// members on class instances.
    pub members: FxHashMap<String, ElementId>,
    pub parent_namespace: Option<ElementId>,
    pub payload: ElementPayload,
}

#[derive(Debug)]
pub enum ElementPayload {
    Global(GlobalData),
    Local(LocalData),
    Enum(EnumData),
    EnumValue(EnumValueData),
    FunctionPrototype(FunctionPrototypeData),
    Function(FunctionData),
    FunctionTarget(FunctionTargetData),
    /// Shared by ClassPrototype and InterfacePrototype; `kind` discriminates.
    ClassPrototype(ClassPrototypeData),
    /// Shared by Class and Interface; `kind` discriminates.
    Class(ClassData),
    FieldPrototype(FieldPrototypeData),
    Field(FieldData),
    Property(PropertyData),
    Namespace(NamespaceData),
}

/// The declaration behind a global: a variable declarator or a static field.
#[derive(Debug, Clone)]
pub enum GlobalDeclaration {
    Variable(Rc<VariableDeclaration>),
    Field(Rc<FieldDeclaration>),
}

impl GlobalDeclaration {
    pub fn type_node(&self) -> Option<&stave_frontend::TypeNode> {
        match self {
            GlobalDeclaration::Variable(declaration) => declaration.ty.as_ref(),
            GlobalDeclaration::Field(declaration) => declaration.ty.as_ref(),
        }
    }

    pub fn span(&self) -> stave_identity::Span {
        match self {
            GlobalDeclaration::Variable(declaration) => declaration.span,
            GlobalDeclaration::Field(declaration) => declaration.span,
        }
    }
}

/// A module-level variable.
#[derive(Debug)]
pub struct GlobalData {
    pub declaration: Option<GlobalDeclaration>,
    /// Normalized path of the declaring source (file scope for lazy type
    /// resolution).
    pub file_path: String,
    /// `TypeId::VOID` until the declared annotation has been resolved.
    pub ty: TypeId,
    pub constant_value: Option<i64>,
}

/// A function-local variable slot.
#[derive(Debug)]
pub struct LocalData {
    pub ty: TypeId,
    pub index: u32,
}

#[derive(Debug)]
pub struct EnumData {
    pub declaration: Rc<EnumDeclaration>,
}

#[derive(Debug)]
pub struct EnumValueData {
    pub parent_enum: ElementId,
    pub value: Option<i64>,
}

/// An unresolved, generic-aware function.
#[derive(Debug)]
pub struct FunctionPrototypeData {
    pub declaration: Rc<FunctionDeclaration>,
    pub file_path: String,
    pub class_prototype: Option<ElementId>,
    pub operator_kind: Option<OperatorKind>,
    /// Memoized instances keyed by the canonical type-argument string.
    pub instances: FxHashMap<String, ElementId>,
    /// Captured class type arguments of a partially resolved instance method.
    pub class_type_arguments: Option<TypeIdVec>,
}

/// A resolved function instance.
#[derive(Debug)]
pub struct FunctionData {
    pub prototype: ElementId,
    pub signature: SignatureId,
    /// The class instance this function is a member of, if any.
    pub owner_class: Option<ElementId>,
    /// Locals in slot order: `this` (instance methods), parameters, then
    /// additional locals.
    pub locals: Vec<ElementId>,
    pub locals_by_name: FxHashMap<String, ElementId>,
    pub contextual_type_arguments: FxHashMap<String, TypeId>,
    /// Free temporary locals pooled by native type (I32/I64/F32/F64).
    pub temp_pools: [Vec<ElementId>; 4],
    /// Break/continue context stack; labels are decimal strings of these ids.
    pub break_stack: Vec<u32>,
    pub next_break_id: u32,
    /// Root flow, taken by the emitter when compilation starts.
    pub flow: Option<Flow>,
    /// Emitted reference handle, appended at emit time.
    pub ref_handle: Option<u32>,
}

/// A signature-only function reference used for indirect calls.
#[derive(Debug)]
pub struct FunctionTargetData {
    pub signature: SignatureId,
    pub ty: TypeId,
}

/// An unresolved, generic-aware class or interface.
#[derive(Debug)]
pub struct ClassPrototypeData {
    pub declaration: Rc<ClassDeclaration>,
    pub file_path: String,
    /// Instance member names in declaration order; drives field layout.
    pub instance_member_order: Vec<String>,
    pub instance_members: FxHashMap<String, ElementId>,
    pub constructor_prototype: Option<ElementId>,
    /// Operator overload prototypes in declaration order.
    pub operator_prototypes: Vec<(OperatorKind, ElementId)>,
    pub base_prototype: Option<ElementId>,
    pub implements_prototypes: Vec<ElementId>,
    /// Memoized instances keyed by the canonical type-argument string.
    pub instances: FxHashMap<String, ElementId>,
}

/// A resolved class or interface instance.
#[derive(Debug)]
pub struct ClassData {
    pub prototype: ElementId,
    pub type_arguments: TypeIdVec,
    pub ty: TypeId,
    pub base: Option<ElementId>,
    pub contextual_type_arguments: FxHashMap<String, TypeId>,
    pub constructor_instance: Option<ElementId>,
    /// Resolved operator overloads; lookup walks the base chain.
    pub operator_overloads: Vec<(OperatorKind, ElementId)>,
    /// End of the laid-out fields; the instance's size in memory.
    pub current_memory_offset: u32,
}

#[derive(Debug)]
pub struct FieldPrototypeData {
    pub declaration: Rc<FieldDeclaration>,
    pub class_prototype: ElementId,
}

#[derive(Debug)]
pub struct FieldData {
    pub prototype: ElementId,
    pub ty: TypeId,
    pub memory_offset: u32,
}

/// A property joining a getter and a setter under one name.
#[derive(Debug)]
pub struct PropertyData {
    pub parent: ElementId,
    pub getter_prototype: Option<ElementId>,
    pub setter_prototype: Option<ElementId>,
}

#[derive(Debug)]
pub struct NamespaceData {
    pub declaration: Rc<NamespaceDeclaration>,
}

impl Element {
    pub fn global(&self) -> &GlobalData {
        match &self.payload {
            ElementPayload::Global(data) => data,
            _ => unreachable!("element is not a global"),
        }
    }

    pub fn global_mut(&mut self) -> &mut GlobalData {
        match &mut self.payload {
            ElementPayload::Global(data) => data,
            _ => unreachable!("element is not a global"),
        }
    }

    pub fn local(&self) -> &LocalData {
        match &self.payload {
            ElementPayload::Local(data) => data,
            _ => unreachable!("element is not a local"),
        }
    }

    pub fn enum_value(&self) -> &EnumValueData {
        match &self.payload {
            ElementPayload::EnumValue(data) => data,
            _ => unreachable!("element is not an enum value"),
        }
    }

    pub fn function_prototype(&self) -> &FunctionPrototypeData {
        match &self.payload {
            ElementPayload::FunctionPrototype(data) => data,
            _ => unreachable!("element is not a function prototype"),
        }
    }

    pub fn function_prototype_mut(&mut self) -> &mut FunctionPrototypeData {
        match &mut self.payload {
            ElementPayload::FunctionPrototype(data) => data,
            _ => unreachable!("element is not a function prototype"),
        }
    }

    pub fn function(&self) -> &FunctionData {
        match &self.payload {
            ElementPayload::Function(data) => data,
            _ => unreachable!("element is not a function"),
        }
    }

    pub fn function_mut(&mut self) -> &mut FunctionData {
        match &mut self.payload {
            ElementPayload::Function(data) => data,
            _ => unreachable!("element is not a function"),
        }
    }

    pub fn function_target(&self) -> &FunctionTargetData {
        match &self.payload {
            ElementPayload::FunctionTarget(data) => data,
            _ => unreachable!("element is not a function target"),
        }
    }

    pub fn class_prototype(&self) -> &ClassPrototypeData {
        match &self.payload {
            ElementPayload::ClassPrototype(data) => data,
            _ => unreachable!("element is not a class prototype"),
        }
    }

    pub fn class_prototype_mut(&mut self) -> &mut ClassPrototypeData {
        match &mut self.payload {
            ElementPayload::ClassPrototype(data) => data,
            _ => unreachable!("element is not a class prototype"),
        }
    }

    pub fn class(&self) -> &ClassData {
        match &self.payload {
            ElementPayload::Class(data) => data,
            _ => unreachable!("element is not a class"),
        }
    }

    pub fn class_mut(&mut self) -> &mut ClassData {
        match &mut self.payload {
            ElementPayload::Class(data) => data,
            _ => unreachable!("element is not a class"),
        }
    }

    pub fn field_prototype(&self) -> &FieldPrototypeData {
        match &self.payload {
            ElementPayload::FieldPrototype(data) => data,
            _ => unreachable!("element is not a field prototype"),
        }
    }

    pub fn field(&self) -> &FieldData {
        match &self.payload {
            ElementPayload::Field(data) => data,
            _ => unreachable!("element is not a field"),
        }
    }

    pub fn property(&self) -> &PropertyData {
        match &self.payload {
            ElementPayload::Property(data) => data,
            _ => unreachable!("element is not a property"),
        }
    }

    pub fn property_mut(&mut self) -> &mut PropertyData {
        match &mut self.payload {
            ElementPayload::Property(data) => data,
            _ => unreachable!("element is not a property"),
        }
    }

    /// True for class and interface prototypes alike.
    pub fn is_class_prototype(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::ClassPrototype | ElementKind::InterfacePrototype
        )
    }
}

/// Arena of elements; ids are indices into the storage vector.
#[derive(Debug, Default)]
pub struct ElementArena {
    elements: Vec<Element>,
}

impl ElementArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, element: Element) -> ElementId {
        let id = ElementId::new(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index() as usize]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.index() as usize]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(index, element)| (ElementId::new(index as u32), element))
    }
}
