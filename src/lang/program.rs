use super::node::{Stmt, TypeName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
}

impl Param {
    pub fn int(name: &str) -> Self {
        Param {
            name: name.to_string(),
            ty: TypeName::Int,
        }
    }
}

/// A top-level function as handed over by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeName,
    pub body: Vec<Stmt>,

    // Must all be empty for the declaration to be accepted.
    pub modifiers: Vec<String>,
    pub type_params: Vec<String>,
    pub throws: Vec<String>,
}

impl FunctionDecl {
    pub fn new(name: &str, params: Vec<Param>, return_type: TypeName, body: Vec<Stmt>) -> Self {
        FunctionDecl {
            name: name.to_string(),
            params,
            return_type,
            body,
            modifiers: Vec::new(),
            type_params: Vec::new(),
            throws: Vec::new(),
        }
    }

    /// `void name() { body }`
    pub fn procedure(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        let params = params.iter().map(|p| Param::int(p)).collect();
        Self::new(name, params, TypeName::Void, body)
    }

    /// `int name() { body }`
    pub fn function(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        let params = params.iter().map(|p| Param::int(p)).collect();
        Self::new(name, params, TypeName::Int, body)
    }
}

impl std::fmt::Display for FunctionDecl {
    /// Header only, `int f(int a, int b)`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for m in &self.modifiers {
            write!(f, "{} ", m)?;
        }
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", p.ty, p.name)?;
        }
        write!(f, ")")?;
        if !self.throws.is_empty() {
            write!(f, " throws {}", self.throws.join(", "))?;
        }
        Ok(())
    }
}

/// Parsed program: an unordered set of function declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<FunctionDecl>,
}

impl Program {
    pub fn new(functions: Vec<FunctionDecl>) -> Self {
        Program { functions }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
