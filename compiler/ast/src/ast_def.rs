use std::fmt::{Display, Formatter};

use itertools::Itertools;

/// Defines AST datatypes

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct TranslationUnit {
    pub prototypes: Vec<Prototype>,
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<String>,
}

impl Prototype {
    pub fn new<S: Into<String>>(name: S, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct FunctionDef {
    pub prototype: Prototype,
    pub body: Body,
}

impl FunctionDef {
    pub fn name(&self) -> &str {
        &self.prototype.name
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct Body {
    pub decls: Vec<Declaration>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum DeclKind {
    Parameter,
    Local,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Stmt {
    Return { expr: Expr },
    Expression { expr: Expr },
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Expr {
    Constant(i32),
    Var(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn var<S: Into<String>>(name: S) -> Self {
        Expr::Var(name.into())
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Expr::Binary {
                op: BinaryOp::Assign,
                ..
            }
        )
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum BinaryOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Display for TranslationUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for proto in &self.prototypes {
            writeln!(f, "{};", proto)?;
        }

        for func in &self.functions {
            write!(f, "{}", func)?;
        }

        Ok(())
    }
}

impl Display for Prototype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "int {}({})",
            self.name,
            self.params.iter().map(|p| format!("int {}", p)).join(", ")
        )
    }
}

impl Display for FunctionDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {{", self.prototype)?;

        // parameters are already spelled out by the prototype
        for decl in &self.body.decls {
            if decl.kind == DeclKind::Local {
                writeln!(f, "    int {};", decl.name)?;
            }
        }

        for stmt in &self.body.stmts {
            writeln!(f, "    {}", stmt)?;
        }

        writeln!(f, "}}")
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Return { expr } => write!(f, "return {};", expr),
            Stmt::Expression { expr } => write!(f, "{};", expr),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant(val) => write!(f, "{}", val),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Call { func, args } => write!(f, "{}({})", func, args.iter().join(", ")),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            BinaryOp::Assign => "=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        };

        write!(f, "{}", op)
    }
}
