use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::interpreter::STACK_SIZE;
use rox::lox::{Lox, EXIT_RUNTIME_ERROR, EXIT_STATIC_ERROR, EXIT_USAGE};
use rox::parser::Parser;
use rox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to run; starts the interactive prompt when omitted
    scripts: Vec<PathBuf>,

    /// Enable logging to rox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its AST
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts the interactive prompt
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rox.log").context("Failed to create rox.log")?;

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
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to rox.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;
    let (tokens, errors) = Scanner::new(&source).scan_tokens();

    for e in &errors {
        debug!("Tokenization debug: {}", e);
        eprintln!("{}", e);
    }

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", rendered);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if !errors.is_empty() {
        debug!("Tokenization failed, exiting with code 65");
        return Ok(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

fn parse(filename: &Path) -> Result<i32> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;
    let (tokens, lex_errors) = Scanner::new(&source).scan_tokens();
    let output = Parser::new(tokens).parse();

    for e in lex_errors.iter().chain(output.errors.iter()) {
        debug!("Parse debug: {}", e);
        eprintln!("{}", e);
    }

    if !lex_errors.is_empty() || !output.errors.is_empty() {
        return Ok(EXIT_STATIC_ERROR);
    }

    for stmt in &output.statements {
        let rendered = AstPrinter::print_stmt(stmt);
        debug!("AST: {}", rendered);
        println!("{}", rendered);
    }

    info!("Parse subcommand completed");
    Ok(0)
}

fn run(filename: &Path) -> Result<i32> {
    info!("Running script {:?}", filename);

    let mut lox = Lox::new();
    let code = lox
        .run_file(filename)
        .context(format!("Failed to run file {:?}", filename))?;

    match code {
        EXIT_RUNTIME_ERROR => debug!("Runtime error, exiting with code 70"),
        EXIT_STATIC_ERROR => debug!("Static error, exiting with code 65"),
        _ => info!("Program executed successfully"),
    }

    Ok(code)
}

fn repl() -> Result<i32> {
    info!("Starting interactive prompt");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    Lox::new()
        .run_prompt(stdin.lock(), &mut stdout)
        .context("Interactive prompt failed")?;

    Ok(0)
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

    let code = thread::Builder::new()
        .name("rox".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || dispatch(args))
        .context("Failed to start interpreter thread")?
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))??;

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn dispatch(args: Cli) -> Result<i32> {
    let code = match args.command {
        Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json)?,

        Some(Commands::Parse { filename }) => parse(&filename)?,

        Some(Commands::Run { filename }) => run(&filename)?,

        Some(Commands::Repl) => repl()?,

        None => match args.scripts.as_slice() {
            [] => repl()?,
            [script] => run(script)?,
            _ => {
                eprintln!("Usage: rox [script]");
                EXIT_USAGE
            }
        },
    };

    Ok(code)
}
