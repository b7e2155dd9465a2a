use crate::bytecode::op::{MAX_INT, MAX_VARIABLES};
use crate::lang::{Call, FunctionDecl, TypeName};

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Malformed declaration, reserved or duplicate name, wrong `main`
    /// shape, wrong argument count
    Signature {
        function: Option<String>,
        construct: String,
        reason: String,
        hint: Option<String>,
    },
    /// Undeclared, redeclared or too many variables
    Scope {
        function: String,
        name: String,
        reason: String,
    },
    /// A construct of the wrong type or shape for its position
    Type {
        function: String,
        construct: String,
        reason: String,
        hint: Option<String>,
    },
    /// Integer literal that does not fit a machine word
    Range { function: String, value: i64 },
    /// Internal compiler error (shouldn't happen in normal use)
    Internal(String),
}

impl CompileError {
    // ─────────────────────────── Signature errors ───────────────────────────

    pub fn signature(
        function: Option<&str>,
        construct: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CompileError::Signature {
            function: function.map(str::to_string),
            construct: construct.into(),
            reason: reason.into(),
            hint: None,
        }
    }

    pub fn disallowed_decoration(decl: &FunctionDecl) -> Self {
        CompileError::Signature {
            function: Some(decl.name.clone()),
            construct: decl.to_string(),
            reason: "function must not have modifiers, type parameters or declared exceptions"
                .to_string(),
            hint: Some("declare functions as plain `int name(...)` or `void name(...)`".to_string()),
        }
    }

    pub fn reserved_name(name: &str) -> Self {
        CompileError::Signature {
            function: Some(name.to_string()),
            construct: name.to_string(),
            reason: format!("function name '{}' is reserved", name),
            hint: Some("`input`, `output` and `print` are builtins".to_string()),
        }
    }

    pub fn duplicate_function(name: &str) -> Self {
        Self::signature(Some(name), name, format!("function '{}' already exists", name))
    }

    pub fn invalid_return_type(decl: &FunctionDecl) -> Self {
        Self::signature(
            Some(&decl.name),
            decl.to_string(),
            format!("invalid return type '{}'", decl.return_type),
        )
    }

    pub fn missing_main() -> Self {
        CompileError::Signature {
            function: None,
            construct: "main".to_string(),
            reason: "program has no main() function".to_string(),
            hint: Some("add `void main() { ... }` as the entry point".to_string()),
        }
    }

    pub fn bad_main(decl: &FunctionDecl) -> Self {
        Self::signature(
            Some(&decl.name),
            decl.to_string(),
            "main() function must be void with no parameters",
        )
    }

    pub fn wrong_arity(function: &str, call: &Call, expected: usize) -> Self {
        Self::signature(
            Some(function),
            call.to_string(),
            format!(
                "wrong number of arguments for function {}; expected {}, was {}",
                call.name,
                expected,
                call.args.len()
            ),
        )
    }

    // ───────────────────────────── Scope errors ─────────────────────────────

    pub fn redeclared(function: &str, name: &str) -> Self {
        CompileError::Scope {
            function: function.to_string(),
            name: name.to_string(),
            reason: "variable already declared".to_string(),
        }
    }

    pub fn undeclared_variable(function: &str, name: &str) -> Self {
        CompileError::Scope {
            function: function.to_string(),
            name: name.to_string(),
            reason: "no such variable".to_string(),
        }
    }

    pub fn too_many_variables(function: &str, name: &str) -> Self {
        CompileError::Scope {
            function: function.to_string(),
            name: name.to_string(),
            reason: format!("too many variables (max {} per function)", MAX_VARIABLES),
        }
    }

    pub fn undeclared_function(function: &str, call: &Call) -> Self {
        CompileError::Scope {
            function: function.to_string(),
            name: call.name.clone(),
            reason: "no such function".to_string(),
        }
    }

    // ────────────────────────── Type / shape errors ──────────────────────────

    pub fn shape(
        function: &str,
        construct: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        CompileError::Type {
            function: function.to_string(),
            construct: construct.to_string(),
            reason: reason.into(),
            hint: None,
        }
    }

    pub fn not_int(function: &str, construct: impl std::fmt::Display, ty: &TypeName) -> Self {
        CompileError::Type {
            function: function.to_string(),
            construct: construct.to_string(),
            reason: format!("invalid type '{}'", ty),
            hint: Some("only `int` variables are supported".to_string()),
        }
    }

    pub fn void_in_expression(function: &str, call: &Call) -> Self {
        Self::shape(
            function,
            call,
            format!("function {} is void, cannot be expression", call.name),
        )
    }

    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            CompileError::Signature { hint, .. } | CompileError::Type { hint, .. } => {
                *hint = Some(text.into());
            }
            _ => {}
        }
        self
    }

    // ─────────────────────────────── Others ───────────────────────────────

    pub fn literal_out_of_range(function: &str, value: i64) -> Self {
        CompileError::Range {
            function: function.to_string(),
            value,
        }
    }

    pub fn stack_mismatch(function: &str, depth: i32) -> Self {
        CompileError::Internal(format!(
            "incorrect stack depth {} at return point in {}; expected 0",
            depth, function
        ))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }

    /// Short name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Signature { .. } => "signature",
            CompileError::Scope { .. } => "scope",
            CompileError::Type { .. } => "type",
            CompileError::Range { .. } => "range",
            CompileError::Internal(_) => "internal",
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compile error: ")?;
        match self {
            CompileError::Signature {
                function,
                construct,
                reason,
                hint,
            } => {
                write!(f, "signature error")?;
                if let Some(name) = function {
                    write!(f, " in '{}'", name)?;
                }
                write!(f, ": {}: {}", reason, construct)?;
                if let Some(h) = hint {
                    write!(f, "\n  hint: {}", h)?;
                }
                Ok(())
            }
            CompileError::Scope {
                function,
                name,
                reason,
            } => {
                write!(f, "scope error in '{}': {} '{}'", function, reason, name)
            }
            CompileError::Type {
                function,
                construct,
                reason,
                hint,
            } => {
                write!(f, "type error in '{}': {}: {}", function, reason, construct)?;
                if let Some(h) = hint {
                    write!(f, "\n  hint: {}", h)?;
                }
                Ok(())
            }
            CompileError::Range { function, value } => write!(
                f,
                "range error in '{}': integer literal {} too large (limit is +/-{})",
                function, value, MAX_INT
            ),
            CompileError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}
