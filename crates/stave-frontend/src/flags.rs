// flags.rs
//
// Declared and derived modifier flags shared by AST nodes and elements.

use bitflags::bitflags;

bitflags! {
    /// Modifier flags. The declared half is produced by the parser from
    /// keywords; the derived half is computed during initialization and
    /// resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CommonFlags: u32 {
        // Declared modifiers
        const IMPORT = 1 << 0;
        const EXPORT = 1 << 1;
        const DECLARE = 1 << 2;
        const CONST = 1 << 3;
        const LET = 1 << 4;
        const STATIC = 1 << 5;
        const READONLY = 1 << 6;
        const ABSTRACT = 1 << 7;
        const PUBLIC = 1 << 8;
        const PRIVATE = 1 << 9;
        const PROTECTED = 1 << 10;
        const GET = 1 << 11;
        const SET = 1 << 12;

        // Derived states
        const AMBIENT = 1 << 13;
        const GENERIC = 1 << 14;
        const GENERIC_CONTEXT = 1 << 15;
        const INSTANCE = 1 << 16;
        const CONSTRUCTOR = 1 << 17;
        const ARROW = 1 << 18;
        const MODULE_EXPORT = 1 << 19;
        const MODULE_IMPORT = 1 << 20;
        const BUILTIN = 1 << 21;
        const COMPILED = 1 << 22;
        const INLINED = 1 << 23;
        const SCOPED = 1 << 24;
        const TRAMPOLINE = 1 << 25;
    }
}

impl CommonFlags {
    /// True if any of `flags` is set.
    pub fn is(self, flags: CommonFlags) -> bool {
        self.intersects(flags)
    }
}
