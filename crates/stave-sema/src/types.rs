// types.rs
//
// TypeRegistry: per-program type storage with interning, reserved primitive
// handles, and name-based lookup.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use stave_identity::{NameId, NameTable};

use crate::elements::ElementId;

/// Concrete type identity in the registry.
///
/// Unlike an element handle (which identifies a *definition* like
/// `class Box<T>`), a `TypeId` identifies a concrete type (like `Box<i32>`).
/// Equality of interned ids is type equality.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    // ========================================================================
    // Reserved TypeIds for primitives.
    // These are guaranteed to be interned at these indices by TypeRegistry::new()
    // ========================================================================

    pub const VOID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);

    pub const I8: TypeId = TypeId(2);
    pub const I16: TypeId = TypeId(3);
    pub const I32: TypeId = TypeId(4);
    pub const I64: TypeId = TypeId(5);

    pub const U8: TypeId = TypeId(6);
    pub const U16: TypeId = TypeId(7);
    pub const U32: TypeId = TypeId(8);
    pub const U64: TypeId = TypeId(9);

    pub const F32: TypeId = TypeId(10);
    pub const F64: TypeId = TypeId(11);

    /// First non-reserved TypeId index (for dynamic types)
    pub const FIRST_DYNAMIC: u32 = 12;

    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(index: u32) -> Self {
        TypeId(index)
    }

    #[inline]
    pub fn is_void(self) -> bool {
        self == Self::VOID
    }

    #[inline]
    pub fn is_bool(self) -> bool {
        self == Self::BOOL
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        self.0 >= Self::I8.0 && self.0 <= Self::U64.0
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// SmallVec for type children - inline up to 4 (covers most argument lists)
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntegerKind {
    pub fn byte_size(self) -> u32 {
        match self {
            IntegerKind::I8 | IntegerKind::U8 => 1,
            IntegerKind::I16 | IntegerKind::U16 => 2,
            IntegerKind::I32 | IntegerKind::U32 => 4,
            IntegerKind::I64 | IntegerKind::U64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntegerKind::I8 | IntegerKind::I16 | IntegerKind::I32 | IntegerKind::I64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegerKind::I8 => "i8",
            IntegerKind::I16 => "i16",
            IntegerKind::I32 => "i32",
            IntegerKind::I64 => "i64",
            IntegerKind::U8 => "u8",
            IntegerKind::U16 => "u16",
            IntegerKind::U32 => "u32",
            IntegerKind::U64 => "u64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    pub fn byte_size(self) -> u32 {
        match self {
            FloatKind::F32 => 4,
            FloatKind::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FloatKind::F32 => "f32",
            FloatKind::F64 => "f64",
        }
    }
}

/// Pointer width of the compilation target; decides what `isize`/`usize`
/// resolve to and the size of reference types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerWidth {
    #[default]
    W32,
    W64,
}

impl PointerWidth {
    pub fn byte_size(self) -> u32 {
        match self {
            PointerWidth::W32 => 4,
            PointerWidth::W64 => 8,
        }
    }

    pub fn isize_type(self) -> TypeId {
        match self {
            PointerWidth::W32 => TypeId::I32,
            PointerWidth::W64 => TypeId::I64,
        }
    }

    pub fn usize_type(self) -> TypeId {
        match self {
            PointerWidth::W32 => TypeId::U32,
            PointerWidth::W64 => TypeId::U64,
        }
    }
}

/// Native value representation of a type on the target, used to pool
/// temporary locals by register class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    I32,
    I64,
    F32,
    F64,
}

impl NativeType {
    pub(crate) fn pool_index(self) -> usize {
        match self {
            NativeType::I32 => 0,
            NativeType::I64 => 1,
            NativeType::F32 => 2,
            NativeType::F64 => 3,
        }
    }
}

/// Interned handle for a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureId(u32);

impl SignatureId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A resolved function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub parameter_types: TypeIdVec,
    pub parameter_names: Vec<String>,
    /// Number of leading parameters without defaults.
    pub required_parameters: usize,
    pub has_rest: bool,
    pub return_type: TypeId,
    pub this_type: Option<TypeId>,
}

impl Default for TypeId {
    fn default() -> Self {
        TypeId::VOID
    }
}

/// The structure of an interned type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    Bool,
    Integer(IntegerKind),
    Float(FloatKind),
    /// Pointer-sized reference to a function with the given signature.
    Function(SignatureId),
    /// Reference to an instance of a resolved class.
    Class { class: ElementId, nullable: bool },
}

/// Per-program type storage with automatic interning/deduplication.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    /// Interned types, indexed by TypeId
    types: Vec<Ty>,
    /// Deduplication map
    intern_map: FxHashMap<Ty, TypeId>,
    /// Interned signatures, indexed by SignatureId
    signatures: Vec<Signature>,
    signature_map: FxHashMap<Signature, SignatureId>,
    /// Type name lookup, both bare (`i32`) and path-qualified (`a/i32`) keys
    by_name: FxHashMap<NameId, TypeId>,
    pointer_width: PointerWidth,
}

impl TypeRegistry {
    /// Create a new registry with pre-interned primitive types.
    pub fn new(pointer_width: PointerWidth) -> Self {
        let mut registry = Self {
            types: Vec::new(),
            intern_map: FxHashMap::default(),
            signatures: Vec::new(),
            signature_map: FxHashMap::default(),
            by_name: FxHashMap::default(),
            pointer_width,
        };

        // Pre-intern primitives in the order defined by the TypeId constants.
        // The debug_asserts verify the constants match the interned indices.
        debug_assert_eq!(registry.intern(Ty::Void), TypeId::VOID);
        debug_assert_eq!(registry.intern(Ty::Bool), TypeId::BOOL);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::I8)), TypeId::I8);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::I16)), TypeId::I16);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::I32)), TypeId::I32);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::I64)), TypeId::I64);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::U8)), TypeId::U8);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::U16)), TypeId::U16);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::U32)), TypeId::U32);
        debug_assert_eq!(registry.intern(Ty::Integer(IntegerKind::U64)), TypeId::U64);
        debug_assert_eq!(registry.intern(Ty::Float(FloatKind::F32)), TypeId::F32);
        debug_assert_eq!(registry.intern(Ty::Float(FloatKind::F64)), TypeId::F64);
        debug_assert_eq!(registry.types.len() as u32, TypeId::FIRST_DYNAMIC);

        registry
    }

    fn intern(&mut self, ty: Ty) -> TypeId {
        if let Some(id) = self.intern_map.get(&ty) {
            return *id;
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(ty.clone());
        self.intern_map.insert(ty, id);
        id
    }

    /// Register the base set of type names: the primitives plus the target
    /// dependent `isize`/`usize` bindings and the `number`/`boolean` aliases.
    pub fn register_base_names(&mut self, names: &mut NameTable) {
        let base: &[(&str, TypeId)] = &[
            ("i8", TypeId::I8),
            ("i16", TypeId::I16),
            ("i32", TypeId::I32),
            ("i64", TypeId::I64),
            ("isize", self.pointer_width.isize_type()),
            ("u8", TypeId::U8),
            ("u16", TypeId::U16),
            ("u32", TypeId::U32),
            ("u64", TypeId::U64),
            ("usize", self.pointer_width.usize_type()),
            ("bool", TypeId::BOOL),
            ("f32", TypeId::F32),
            ("f64", TypeId::F64),
            ("void", TypeId::VOID),
            ("number", TypeId::F64),
            ("boolean", TypeId::BOOL),
        ];
        for (name, ty) in base {
            let id = names.intern(name);
            self.by_name.insert(id, *ty);
        }
    }

    pub fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    pub fn get(&self, id: TypeId) -> &Ty {
        &self.types[id.index() as usize]
    }

    /// Look up a type by interned name.
    pub fn lookup_name(&self, name: NameId) -> Option<TypeId> {
        self.by_name.get(&name).copied()
    }

    /// Bind a name to a type. Returns false if the name is already bound.
    pub fn register_name(&mut self, name: NameId, ty: TypeId) -> bool {
        use std::collections::hash_map::Entry;
        match self.by_name.entry(name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(ty);
                true
            }
        }
    }

    // ========================================================================
    // Compound type builders - intern on construction
    // ========================================================================

    /// Pointer-sized reference to a function of the given signature.
    pub fn function_type(&mut self, signature: SignatureId) -> TypeId {
        self.intern(Ty::Function(signature))
    }

    /// Reference to an instance of a resolved class.
    pub fn class_type(&mut self, class: ElementId, nullable: bool) -> TypeId {
        self.intern(Ty::Class { class, nullable })
    }

    pub fn intern_signature(&mut self, signature: Signature) -> SignatureId {
        if let Some(id) = self.signature_map.get(&signature) {
            return *id;
        }
        let id = SignatureId(self.signatures.len() as u32);
        self.signatures.push(signature.clone());
        self.signature_map.insert(signature, id);
        id
    }

    pub fn signature(&self, id: SignatureId) -> &Signature {
        &self.signatures[id.index() as usize]
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The class instance a type references, if any.
    pub fn class_reference(&self, id: TypeId) -> Option<ElementId> {
        match self.get(id) {
            Ty::Class { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// The signature of a function type, if any.
    pub fn signature_reference(&self, id: TypeId) -> Option<SignatureId> {
        match self.get(id) {
            Ty::Function(signature) => Some(*signature),
            _ => None,
        }
    }

    /// Size in bytes of a value of this type in linear memory.
    pub fn byte_size(&self, id: TypeId) -> u32 {
        match self.get(id) {
            Ty::Void => 0,
            Ty::Bool => 1,
            Ty::Integer(kind) => kind.byte_size(),
            Ty::Float(kind) => kind.byte_size(),
            Ty::Function(_) | Ty::Class { .. } => self.pointer_width.byte_size(),
        }
    }

    /// Native value representation on the target.
    pub fn native_type(&self, id: TypeId) -> NativeType {
        match self.get(id) {
            Ty::Void | Ty::Bool => NativeType::I32,
            Ty::Integer(kind) => {
                if kind.byte_size() <= 4 {
                    NativeType::I32
                } else {
                    NativeType::I64
                }
            }
            Ty::Float(FloatKind::F32) => NativeType::F32,
            Ty::Float(FloatKind::F64) => NativeType::F64,
            Ty::Function(_) | Ty::Class { .. } => match self.pointer_width {
                PointerWidth::W32 => NativeType::I32,
                PointerWidth::W64 => NativeType::I64,
            },
        }
    }
}
