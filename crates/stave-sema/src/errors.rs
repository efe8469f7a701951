// errors.rs
//! Semantic analysis diagnostics (E2xxx / W2xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use stave_identity::Span;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("duplicate identifier '{name}'")]
    #[diagnostic(code(E2001))]
    DuplicateIdentifier {
        name: String,
        #[label("already declared")]
        span: SourceSpan,
    },

    #[error("cannot find name '{name}'")]
    #[diagnostic(code(E2002))]
    CannotFindName {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("module '{module}' has no exported member '{member}'")]
    #[diagnostic(code(E2003))]
    NoExportedMember {
        module: String,
        member: String,
        #[label("no such export")]
        span: SourceSpan,
    },

    #[error("export declaration conflicts with exported declaration of '{name}'")]
    #[diagnostic(code(E2004))]
    ExportConflict {
        name: String,
        #[label("conflicting export")]
        span: SourceSpan,
    },

    #[error("a class may only extend another class")]
    #[diagnostic(code(E2005))]
    ClassExtendsNonClass {
        #[label("not a class")]
        span: SourceSpan,
    },

    #[error("class '{name}' is sealed and cannot be extended")]
    #[diagnostic(code(E2006))]
    ClassSealed {
        name: String,
        #[label("extends a sealed class")]
        span: SourceSpan,
    },

    #[error("unmanaged classes cannot implement interfaces")]
    #[diagnostic(code(E2007))]
    UnmanagedImplements {
        #[label("implemented by an unmanaged class")]
        span: SourceSpan,
    },

    #[error("unmanaged classes cannot extend managed classes and vice-versa")]
    #[diagnostic(code(E2008))]
    UnmanagedExtendsManaged {
        #[label("mixed managed and unmanaged")]
        span: SourceSpan,
    },

    #[error("property '{property}' does not exist on type '{ty}'")]
    #[diagnostic(code(E2009))]
    PropertyDoesNotExist {
        property: String,
        ty: String,
        #[label("no such property")]
        span: SourceSpan,
    },

    #[error("index signature is missing in type '{ty}'")]
    #[diagnostic(code(E2010))]
    IndexSignatureMissing {
        ty: String,
        #[label("cannot be indexed")]
        span: SourceSpan,
    },

    #[error("multiple constructor implementations are not allowed")]
    #[diagnostic(code(E2011))]
    MultipleConstructors {
        #[label("second constructor")]
        span: SourceSpan,
    },

    #[error("duplicate function implementation '{name}'")]
    #[diagnostic(code(E2012))]
    DuplicateFunctionImplementation {
        name: String,
        #[label("already implemented")]
        span: SourceSpan,
    },

    #[error("duplicate decorator '{name}'")]
    #[diagnostic(code(E2013))]
    DuplicateDecorator {
        name: String,
        #[label("repeated here")]
        span: SourceSpan,
    },

    #[error("operation not supported")]
    #[diagnostic(code(E2014))]
    OperationNotSupported {
        #[label("unsupported")]
        span: SourceSpan,
    },

    #[error("expected {expected} type arguments, but got {found}")]
    #[diagnostic(code(E2015))]
    WrongTypeArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of type arguments")]
        span: SourceSpan,
    },

    #[error("string literal expected")]
    #[diagnostic(code(E2016))]
    StringLiteralExpected {
        #[label("expected a string literal")]
        span: SourceSpan,
    },

    #[error("cannot invoke an expression whose type lacks a call signature")]
    #[diagnostic(code(E2017))]
    NotCallable {
        #[label("not callable")]
        span: SourceSpan,
    },

    #[error("'this' cannot be referenced in current location")]
    #[diagnostic(code(E2018))]
    ThisNotAllowed {
        #[label("'this' used here")]
        span: SourceSpan,
    },

    #[error("'super' can only be referenced in a derived class")]
    #[diagnostic(code(E2019))]
    SuperNotAllowed {
        #[label("'super' used here")]
        span: SourceSpan,
    },

    #[error("individual declarations in merged declaration '{name}' must be all exported or all local")]
    #[diagnostic(code(E2020))]
    MergedDeclarationExportMismatch {
        name: String,
        #[label("merged here")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("decorator '{name}' is not valid here")]
    #[diagnostic(code(W2001))]
    DecoratorNotValidHere {
        name: String,
        #[label("ignored")]
        span: SourceSpan,
    },
}

/// A semantic error with its source span.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

/// A semantic warning with its source span.
#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub warning: SemanticWarning,
    pub span: Span,
}

/// Accumulating diagnostic sink. The core reports here and recovers; it never
/// aborts on user errors.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<TypeError>,
    warnings: Vec<TypeWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, error: SemanticError, span: Span) {
        self.errors.push(TypeError { error, span });
    }

    pub fn warning(&mut self, warning: SemanticWarning, span: Span) {
        self.warnings.push(TypeWarning { warning, span });
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[TypeWarning] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_accumulates_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(
            SemanticError::CannotFindName {
                name: "Foo".to_string(),
                span: Span::new(0, 3).into(),
            },
            Span::new(0, 3),
        );
        diagnostics.error(
            SemanticError::OperationNotSupported {
                span: Span::new(4, 5).into(),
            },
            Span::new(4, 5),
        );
        assert_eq!(diagnostics.errors().len(), 2);
        assert!(matches!(
            diagnostics.errors()[0].error,
            SemanticError::CannotFindName { .. }
        ));
    }
}
