use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use backend::Promoted;
use ir::Module;

type IOResult = std::io::Result<()>;

/// Writes a promoted module to `path` as textual IR
pub fn output<P: AsRef<Path>>(path: P, program: &Promoted) -> IOResult {
    write_module(path, program.module())
}

/// Writes a module as it stands, before promotion. Only used for `-d` dumps.
pub fn output_raw<P: AsRef<Path>>(path: P, module: &Module) -> IOResult {
    write_module(path, module)
}

fn write_module<P: AsRef<Path>>(path: P, module: &Module) -> IOResult {
    let output = File::create(path)?;
    let mut writer = BufWriter::new(output);

    emit_module(&mut writer, module)?;

    writer.flush()
}

fn emit_module<W: Write>(writer: &mut W, module: &Module) -> IOResult {
    write!(writer, "{}", module)
}
