use aetherra_interpreter::{Interpreter, InterpreterConfig};
use anyhow::{Context, Result};
use argh::FromArgs;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Run the command-language interpreter interactively or over a script.
struct Args {
    #[argh(switch)]
    /// skip real subsystems and use the demo fallbacks.
    demo: bool,

    #[argh(switch)]
    /// start with debug mode on.
    debug: bool,

    #[argh(switch)]
    /// start with auto-tagging on.
    auto_tag: bool,

    #[argh(switch, short = 'v')]
    /// log routing decisions to stderr.
    verbose: bool,

    #[argh(option)]
    /// feed this file to the interpreter line by line instead of reading stdin.
    script: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_output(out: &str) {
    if !out.is_empty() {
        println!("{out}");
    }
}

fn run_script(interp: &mut Interpreter, path: &PathBuf) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("can't read script {}", path.display()))?;
    for line in text.lines() {
        print_output(&interp.execute(line));
    }
    if interp.get_system_status().in_block {
        print_output(&interp.force_end_block());
    }
    Ok(())
}

fn repl(interp: &mut Interpreter) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = if interp.get_system_status().in_block {
            "... "
        } else {
            "aetherra> "
        };
        match rl.readline(prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                match line.trim() {
                    "exit" | "quit" => break,
                    "help" => print_output(&interp.get_help()),
                    "status" => print_output(&interp.get_system_status().to_string()),
                    "history" => {
                        for (i, entry) in interp.get_command_history().iter().enumerate() {
                            println!("{:>4}  {entry}", i + 1);
                        }
                    }
                    "reset" => print_output(&interp.reset_interpreter()),
                    "end!" => print_output(&interp.force_end_block()),
                    _ => print_output(&interp.execute(&line)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_tracing(args.verbose);

    let mut config = InterpreterConfig::default()
        .with_debug_mode(args.debug)
        .with_auto_tag(args.auto_tag);
    config.force_demo_mode = args.demo;
    let mut interp = Interpreter::with_config(config);

    match &args.script {
        Some(path) => run_script(&mut interp, path),
        None => repl(&mut interp),
    }
}
