//! Shared name interning for fully-qualified element identities.
//!
//! Every element the semantic core tracks is keyed by its *internal name*, a
//! fully-qualified string built from the source's normalized path plus
//! structural separators. The [`NameTable`] interns those strings into cheap
//! [`NameId`] handles so lookup tables never hash full strings twice.

use rustc_hash::FxHashMap;

mod span;
pub use span::Span;

/// Separates path segments of a source file, e.g. `std/array`.
pub const PATH_DELIMITER: &str = "/";
/// Separates a namespace or class from a static member, e.g. `Heap.alloc`.
pub const STATIC_DELIMITER: &str = ".";
/// Separates a class from an instance member, e.g. `Array#length`.
pub const INSTANCE_DELIMITER: &str = "#";
/// Separates a function from elements nested inside it.
pub const INNER_DELIMITER: &str = "~";
/// Path prefix marking standard-library sources.
pub const LIBRARY_PREFIX: &str = "~lib/";
/// Prefix of a property's getter method base name.
pub const GETTER_PREFIX: &str = "get:";
/// Prefix of a property's setter method base name.
pub const SETTER_PREFIX: &str = "set:";
/// Terminal path segment that aliases its parent directory under import
/// resolution (`foo` and `foo/index` name the same file).
pub const INDEX_SUFFIX: &str = "/index";

/// Interned handle for a fully-qualified internal name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameId(u32);

impl NameId {
    pub fn index(self) -> u32 {
        self.0
    }

    /// Create a NameId for testing purposes only.
    /// Production code should use NameTable::intern() instead.
    #[doc(hidden)]
    pub fn new_for_test(index: u32) -> Self {
        Self(index)
    }
}

/// Source location where a name was defined (for diagnostics)
#[derive(Debug, Clone)]
pub struct DefLocation {
    pub file: String,
    pub span: Span,
}

/// String interner for internal names.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Vec<String>,
    lookup: FxHashMap<String, NameId>,
    locations: FxHashMap<NameId, DefLocation>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the existing id if already interned.
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(id) = self.lookup.get(name) {
            return *id;
        }
        let id = NameId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), id);
        id
    }

    /// Read-only lookup; `None` if the name has not been interned.
    pub fn get(&self, name: &str) -> Option<NameId> {
        self.lookup.get(name).copied()
    }

    pub fn resolve(&self, id: NameId) -> &str {
        &self.names[id.0 as usize]
    }

    /// Intern `parent`'s name joined to `member` with the given separator.
    pub fn intern_member(&mut self, parent: NameId, separator: &str, member: &str) -> NameId {
        let joined = format!("{}{}{}", self.resolve(parent), separator, member);
        self.intern(&joined)
    }

    /// Intern a file-level internal name: `path/simple`.
    pub fn intern_file_level(&mut self, path: &str, simple: &str) -> NameId {
        let joined = format!("{}{}{}", path, PATH_DELIMITER, simple);
        self.intern(&joined)
    }

    /// Intern `base<args>`, the internal name of a generic instance.
    pub fn intern_generic(&mut self, base: NameId, args_key: &str) -> NameId {
        let joined = format!("{}<{}>", self.resolve(base), args_key);
        self.intern(&joined)
    }

    /// The alternative spelling of an import path under the rule that a path
    /// ending in `/index` is equivalent to its parent: appends `/index` when
    /// absent, strips it when present.
    pub fn alternative_index_path(path: &str) -> String {
        match path.strip_suffix(INDEX_SUFFIX) {
            Some(parent) => parent.to_string(),
            None => format!("{}{}", path, INDEX_SUFFIX),
        }
    }

    /// Record where a name was defined (for error messages)
    pub fn set_location(&mut self, id: NameId, file: &str, span: Span) {
        self.locations.insert(
            id,
            DefLocation {
                file: file.to_string(),
                span,
            },
        );
    }

    /// Get the definition location for a name (if recorded)
    pub fn location(&self, id: NameId) -> Option<&DefLocation> {
        self.locations.get(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Check whether a normalized source path designates a library source.
pub fn is_library_path(path: &str) -> bool {
    path.starts_with(LIBRARY_PREFIX)
}
