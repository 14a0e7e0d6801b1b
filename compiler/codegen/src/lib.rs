use std::collections::HashMap;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use thiserror::Error;

use ast::{BinaryOp, Body, DeclKind, Expr, FunctionDef, Prototype, Stmt, TranslationUnit};
use ir::{Builder, Module};

pub use backend_api::*;
pub use ir_backend::*;

mod backend_api;
mod ir_backend;

type BoxedError = Box<dyn StdError + Send + Sync>;

/// Lowering failures. The parser rules out every one of these for a unit it accepted,
/// except `Link` and `Backend`.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("call to '{0}', which is not in the module")]
    MissingFunction(String),
    #[error("variable '{0}' has no slot")]
    UnknownVariable(String),
    #[error("'{name}' is already in the module with {existing} parameter(s), not {found}")]
    PrototypeMismatch {
        name: String,
        existing: usize,
        found: usize,
    },
    #[error("no function is being lowered")]
    NoCurrentFunction,
    #[error("the left side of '=' must be a variable")]
    InvalidAssignment,
    #[error("failed to link '{}'", .path.display())]
    Link {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },
    #[error("backend error")]
    Backend(#[source] BoxedError),
}

pub type CodegenResult<T> = Result<T, CodegenError>;

fn backend_err<E: StdError + Send + Sync + 'static>(err: E) -> CodegenError {
    CodegenError::Backend(Box::new(err))
}

/// Lowers a parsed unit into naive load/store code through a `Backend`
pub struct Generator<B: Backend> {
    backend: B,
    current: Option<B::Function>,
    slots: HashMap<String, B::Slot>,
}

impl<B: Backend> Generator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            current: None,
            slots: HashMap::new(),
        }
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Lowers every prototype then every definition, then links `link` if given
    pub fn generate(&mut self, unit: &TranslationUnit, link: Option<&Path>) -> CodegenResult<()> {
        for prototype in &unit.prototypes {
            self.gen_prototype(prototype)?;
        }

        for function in &unit.functions {
            self.gen_function(function)?;
        }

        if let Some(path) = link {
            self.backend
                .link_file(path)
                .map_err(|err| CodegenError::Link {
                    path: path.to_path_buf(),
                    source: Box::new(err),
                })?;
        }

        Ok(())
    }

    fn gen_prototype(&mut self, prototype: &Prototype) -> CodegenResult<B::Function> {
        match self.backend.get_function(&prototype.name) {
            Some((function, arity)) if arity == prototype.arity() => Ok(function),
            Some((_, arity)) => Err(CodegenError::PrototypeMismatch {
                name: prototype.name.clone(),
                existing: arity,
                found: prototype.arity(),
            }),
            None => self
                .backend
                .declare_function(&prototype.name, &prototype.params)
                .map_err(backend_err),
        }
    }

    fn gen_function(&mut self, def: &FunctionDef) -> CodegenResult<()> {
        let function = self.gen_prototype(&def.prototype)?;

        self.current = Some(function);
        self.slots.clear();
        self.backend.append_entry_block(function);

        self.gen_decls(&def.prototype, &def.body)?;

        // Anything after the first return is unreachable
        for stmt in &def.body.stmts {
            match stmt {
                Stmt::Return { expr } => {
                    let value = self.gen_expr(expr)?;
                    self.backend.ret(value).map_err(backend_err)?;
                    break;
                }
                Stmt::Expression { expr } => {
                    self.gen_expr(expr)?;
                }
            }
        }

        self.current = None;
        Ok(())
    }

    fn gen_decls(&mut self, prototype: &Prototype, body: &Body) -> CodegenResult<()> {
        let function = self.current.ok_or(CodegenError::NoCurrentFunction)?;

        for decl in &body.decls {
            let slot = self.backend.alloca(&decl.name).map_err(backend_err)?;
            self.slots.insert(decl.name.clone(), slot);

            if decl.kind == DeclKind::Parameter {
                let index = prototype
                    .params
                    .iter()
                    .position(|p| *p == decl.name)
                    .ok_or_else(|| CodegenError::UnknownVariable(decl.name.clone()))?;

                let value = self.backend.param(function, index).map_err(backend_err)?;
                self.backend.store(value, slot).map_err(backend_err)?;
            }
        }

        Ok(())
    }

    fn gen_expr(&mut self, expr: &Expr) -> CodegenResult<B::Value> {
        match expr {
            Expr::Constant(c) => Ok(self.backend.const_int(*c)),
            Expr::Var(name) => {
                let slot = self.slot(name)?;
                self.backend.load(slot, name).map_err(backend_err)
            }
            Expr::Binary {
                op: BinaryOp::Assign,
                left,
                right,
            } => {
                let value = self.gen_expr(right)?;
                let slot = self.slot(assign_target(left)?)?;
                self.backend.store(value.clone(), slot).map_err(backend_err)?;

                Ok(value)
            }
            Expr::Binary { op, left, right } => {
                let lhs = self.gen_expr(left)?;
                let rhs = self.gen_expr(right)?;

                let op = match op {
                    BinaryOp::Add => ArithOp::Add,
                    BinaryOp::Subtract => ArithOp::Sub,
                    BinaryOp::Multiply => ArithOp::Mul,
                    BinaryOp::Divide => ArithOp::SDiv,
                    BinaryOp::Assign => return Err(CodegenError::InvalidAssignment),
                };

                self.backend.binary(op, lhs, rhs).map_err(backend_err)
            }
            Expr::Call { func, args } => self.gen_call(func, args),
        }
    }

    fn gen_call(&mut self, name: &str, args: &[Expr]) -> CodegenResult<B::Value> {
        let (function, _) = self
            .backend
            .get_function(name)
            .ok_or_else(|| CodegenError::MissingFunction(name.to_string()))?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let mut value = self.gen_expr(arg)?;

            // The callee sees the variable as it is after the store
            if let Expr::Binary {
                op: BinaryOp::Assign,
                left,
                ..
            } = arg
            {
                let slot = self.slot(assign_target(left)?)?;
                value = self.backend.load(slot, "arg_val").map_err(backend_err)?;
            }

            values.push(value);
        }

        self.backend.call(function, values).map_err(backend_err)
    }

    fn slot(&self, name: &str) -> CodegenResult<B::Slot> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::UnknownVariable(name.to_string()))
    }
}

fn assign_target(target: &Expr) -> CodegenResult<&str> {
    match target {
        Expr::Var(name) => Ok(name.as_str()),
        _ => Err(CodegenError::InvalidAssignment),
    }
}

/// Lowers `unit` into a fresh module named `module_name` using the in-tree IR builder
pub fn generate_module(
    unit: &TranslationUnit,
    module_name: &str,
    link: Option<&Path>,
) -> CodegenResult<Module> {
    let mut generator = Generator::new(Builder::new(module_name));
    generator.generate(unit, link)?;

    Ok(generator.into_backend().finish())
}
