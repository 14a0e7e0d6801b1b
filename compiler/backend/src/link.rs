use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use thiserror::Error;

use ir::{parse_module, IrParseError, Module};

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("unable to read link module '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed link module: {0}")]
    Parse(#[from] IrParseError),
    #[error("function '{0}' is defined in both modules")]
    DuplicateDefinition(String),
    #[error("function '{name}' takes {expected} argument(s) in one module and {found} in the other")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Moves every function of `src` into `dest`.
///
/// A declaration and a definition of the same name and arity become the definition.
/// Two declarations collapse into one.
pub fn link_modules(dest: &mut Module, src: Module) -> Result<(), LinkError> {
    for func in src.functions {
        let Some(existing) = dest.get_function(&func.name) else {
            dest.functions.push(func);
            continue;
        };

        let existing = dest.function_mut(existing);

        if existing.arity() != func.arity() {
            return Err(LinkError::ArityMismatch {
                expected: existing.arity(),
                found: func.arity(),
                name: func.name,
            });
        }

        match (existing.is_declaration(), func.is_declaration()) {
            (false, false) => return Err(LinkError::DuplicateDefinition(func.name)),
            (true, false) => *existing = func,
            (_, true) => {}
        }
    }

    Ok(())
}

/// Reads a textual module from disk and links it into `dest`
pub fn link_file(dest: &mut Module, path: &Path) -> Result<(), LinkError> {
    let text = read_to_string(path).map_err(|source| LinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let src = parse_module(&path.display().to_string(), &text)?;
    link_modules(dest, src)
}
