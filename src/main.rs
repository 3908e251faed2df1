use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox as lox;

use lox::ast_printer::AstPrinter;
use lox::token::SourceFile;
use lox::Session;

/// Stack for the interpreter thread; the call depth limit, not the host
/// stack, should stop runaway recursion.
const STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run. Starts a REPL when omitted
    script: Option<PathBuf>,

    /// Run this code instead of a script
    #[arg(short = 'c', long = "code", conflicts_with = "script")]
    code: Option<String>,

    /// Print the parsed AST instead of running the program
    #[arg(short = 'p', long = "print-ast")]
    print_ast: bool,

    /// Print the AST as JSON (with -p)
    #[arg(long, requires = "print_ast")]
    json: bool,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,
}

/// Maps a script into memory. The returned buffer owns the mapping, so the
/// source is never copied.
fn read_file(path: &Path) -> Result<Bytes> {
    info!("Reading file: {:?}", path);

    let file: File = File::open(path).with_context(|| format!("Failed to open file {:?}", path))?;

    // SAFETY: scripts are not expected to change while they run.
    let map: Mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to read file {:?}", path))?;

    info!("Mapped {} bytes from {:?}", map.len(), path);

    Ok(Bytes::from_owner(map))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Parse and print, or run, one source file. Returns the exit code.
fn execute(file: &Rc<SourceFile>, print_ast: bool, json: bool) -> Result<i32> {
    if print_ast {
        let (program, errors) = lox::parse(file);

        if !errors.is_empty() {
            debug!("Parse failed with {} error(s)", errors.len());
            eprintln!("{}", errors);
            return Ok(65);
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&program)?);
        } else {
            println!("{}", AstPrinter::print_program(&program));
        }

        return Ok(0);
    }

    let mut session = Session::new();

    match session.run(file) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(0)
        }
        Err(e) => {
            debug!("Run failed: {}", e);
            eprintln!("{}", e);
            Ok(e.exit_code())
        }
    }
}

/// Read lines until EOF, running each one against the same session.
fn repl() -> Result<i32> {
    info!("Starting REPL");

    let mut session = Session::repl();
    let stdin = io::stdin();
    let mut line: String = String::new();

    loop {
        print!(">>> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(0);
        }

        let file: Rc<SourceFile> = SourceFile::new("", line.clone());
        if let Err(e) = session.run(&file) {
            eprintln!("{}", e);
        }
    }
}

fn run(args: Cli) -> Result<i32> {
    if let Some(code) = args.code {
        let file: Rc<SourceFile> = SourceFile::new("", code);
        return execute(&file, args.print_ast, args.json);
    }

    match args.script {
        Some(path) => {
            let contents: Bytes = read_file(&path)?;
            let file: Rc<SourceFile> = SourceFile::new(path.display().to_string(), contents);
            execute(&file, args.print_ast, args.json)
        }
        None => repl(),
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let handle = thread::Builder::new()
        .name("rox".into())
        .stack_size(STACK_SIZE)
        .spawn(move || run(args))
        .context("Failed to spawn interpreter thread")?;

    let code: i32 = match handle.join() {
        Ok(result) => match result {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{:#}", e);
                74
            }
        },
        Err(_) => return Err(anyhow!("interpreter thread panicked")),
    };

    std::process::exit(code)
}

#[cfg(test)]
mod main_tests {
    use super::*;

    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_script(prefix: &str, contents: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("rox-{}-{}-{}.lox", prefix, std::process::id(), nonce));
        fs::write(&path, contents).expect("write script");

        path
    }

    #[test]
    fn test_mapped_script_runs() {
        let path = temp_script("mapped", "var a = \"日本\";\nprint a + \"!\";\n");

        let contents: Bytes = read_file(&path).expect("read script");
        assert_eq!(&contents[..], "var a = \"日本\";\nprint a + \"!\";\n".as_bytes());

        let file: Rc<SourceFile> = SourceFile::new(path.display().to_string(), contents);
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());
        session.run(&file).expect("script runs");
        assert_eq!(session.interpreter().output(), "日本!\n".as_bytes());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_empty_and_missing_scripts() {
        let path = temp_script("empty", "");
        let contents: Bytes = read_file(&path).expect("read empty script");
        assert!(contents.is_empty());
        let _ = fs::remove_file(&path);

        let error = read_file(&path).expect_err("script was removed");
        assert!(error.to_string().starts_with("Failed to open file"));
    }
}
