use std::fs::read_to_string;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser};
use thiserror::Error;

use ast::TranslationUnit;
use backend::{finalize, verify, Executor, Promoted};
use codegen::generate_module;
use emission::{output, output_raw};
use lexer::{Lexer, TokenStream, TokenType, TokenValue};
use parser::Parser;

const SOURCE_EXT: &str = "dc";
const IR_EXT: &str = "ll";

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = "Runs the Hestia compiler")]
struct CLI {
    /// Path to source file, must end in .dc
    path: PathBuf,

    /// Output file, must end in .ll. Defaults to the source path with a .ll extension
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Textual IR module (.ll) to link into the output
    #[arg(short = 'l')]
    link: Option<PathBuf>,

    /// "Specifies a point in compilation process for Hestia to stop, only one(1) option can be specified at a time"
    #[command(flatten)]
    stage_options: StageOptions,

    /// Write the unpromoted IR to <stem>.raw.ll next to the output
    #[arg(short = 'd')]
    debug: bool,

    /// Fold constants after promotion
    #[arg(short = 'O')]
    optimize: bool,

    /// Execute main after emission and print its result
    #[arg(long)]
    run: bool,
}

/// Run compiler with optional arguments
#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
struct StageOptions {
    /// Stop after lexer
    #[arg(long)]
    lex: bool,

    /// Stop after parser
    #[arg(long)]
    parse: bool,

    /// Stop after IR generation and verification
    #[arg(long)]
    codegen: bool,
}

/// Which stage the compiler should stop at
#[derive(Debug, PartialEq, Eq)]
enum StopStage {
    Lexer,
    Parser,
    CodeGen,
}

impl StopStage {
    fn from_args(options: &StageOptions) -> Option<StopStage> {
        if options.lex {
            Some(StopStage::Lexer)
        } else if options.parse {
            Some(StopStage::Parser)
        } else if options.codegen {
            Some(StopStage::CodeGen)
        } else {
            None
        }
    }
}

/// Flags that change what a full compilation does
#[derive(Debug, Default)]
struct Options {
    debug: bool,
    optimize: bool,
    run: bool,
}

/// Every file one compilation reads or writes
#[derive(Debug, PartialEq, Eq)]
struct Paths {
    input: PathBuf,
    output: PathBuf,
    raw: PathBuf,
    link: Option<PathBuf>,
    module_name: String,
}

impl Paths {
    fn resolve(input: &Path, output: Option<&Path>, link: Option<&Path>) -> Result<Self, CompileErr> {
        if !has_extension(input, SOURCE_EXT) {
            return Err(CompileErr::SourceExtension(input.to_path_buf()));
        }

        let output = match output {
            Some(path) if !has_extension(path, IR_EXT) => {
                return Err(CompileErr::OutputExtension(path.to_path_buf()))
            }
            Some(path) => path.to_path_buf(),
            None => input.with_extension(IR_EXT),
        };

        if let Some(path) = link {
            if !has_extension(path, IR_EXT) {
                return Err(CompileErr::LinkExtension(path.to_path_buf()));
            }
        }

        let module_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            input: input.to_path_buf(),
            raw: output.with_extension(format!("raw.{}", IR_EXT)),
            output,
            link: link.map(Path::to_path_buf),
            module_name,
        })
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

pub fn main() -> Result<()> {
    let args = CLI::parse();

    let stop_stage = StopStage::from_args(&args.stage_options);
    let options = Options {
        debug: args.debug,
        optimize: args.optimize,
        run: args.run,
    };

    run_driver(&args, &stop_stage, &options)
}

fn run_driver(args: &CLI, stop_stage: &Option<StopStage>, options: &Options) -> Result<()> {
    let paths = Paths::resolve(&args.path, args.output.as_deref(), args.link.as_deref())?;

    let source = read_to_string(&paths.input)
        .with_context(|| format!("Unable to read source file: {}", paths.input.display()))?;

    compile(&source, &paths, stop_stage, options)
}

/// Runs the compiler stages: Lexer, Parser, IR generation, promotion, emission.
/// With no StopStage, the promoted module is written to `paths.output`.
fn compile(
    source: &str,
    paths: &Paths,
    stop_stage: &Option<StopStage>,
    options: &Options,
) -> Result<()> {
    let tokens = Lexer::new(source).tokenize();

    if let Some(StopStage::Lexer) = stop_stage {
        for token in &tokens {
            println!("{}:{}\t{}", token.line, token.col, token);
        }
        for anomaly in lexical_anomalies(&tokens, &paths.module_name) {
            eprintln!("warning: {}", anomaly);
        }
        return Ok(());
    }

    let unit = parse(tokens, &paths.module_name)?;

    if let Some(StopStage::Parser) = stop_stage {
        print!("{}", unit);
        return Ok(());
    }

    let module = generate_module(&unit, &paths.module_name, paths.link.as_deref())
        .with_context(|| format!("IR generation failed for {}", paths.module_name))?;

    if options.debug {
        output_raw(&paths.raw, &module)
            .with_context(|| format!("Unable to write {}", paths.raw.display()))?;
    }

    if let Some(StopStage::CodeGen) = stop_stage {
        verify(&module).context("Generated IR failed verification")?;
        return Ok(());
    }

    let mut program = finalize(module).context("Generated IR failed verification")?;

    if options.optimize {
        program = program.fold_constants();
    }

    output(&paths.output, &program)
        .with_context(|| format!("Unable to write {}", paths.output.display()))?;

    if options.run {
        let result = execute(&program, std::io::stdout().lock())?;
        println!("main returned {}", result);
    }

    Ok(())
}

/// Describes every character the lexer did not recognise.
/// These only become errors if the parser reaches them.
fn lexical_anomalies(tokens: &TokenStream, file: &str) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| t.kind == TokenType::Unknown)
        .map(|t| {
            let reason = match &t.value {
                TokenValue::Error(err) => err.to_string(),
                _ => "unknown token".to_string(),
            };
            format!("{} at {}:{}:{}: '{}'", reason, file, t.line, t.col, t.literal)
        })
        .collect()
}

fn parse(tokens: TokenStream, file: &str) -> Result<TranslationUnit> {
    Parser::new(tokens)
        .parse()
        .with_context(|| format!("Failed to compile {}", file))
}

/// Runs `main` with `printnum` output going to `out`
fn execute<W: Write>(program: &Promoted, out: W) -> Result<i32> {
    let mut executor = Executor::new(program, out);

    executor
        .run("main", &[])
        .context("Execution of 'main' failed")
}

#[derive(Error, Debug)]
enum CompileErr {
    #[error("source file '{}' must have a .dc extension", .0.display())]
    SourceExtension(PathBuf),
    #[error("output file '{}' must have a .ll extension", .0.display())]
    OutputExtension(PathBuf),
    #[error("link module '{}' must have a .ll extension", .0.display())]
    LinkExtension(PathBuf),
}
