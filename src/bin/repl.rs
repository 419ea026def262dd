// REPL binary — panicking on unrecoverable terminal errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::process;

use clap::Parser;

use lumen::diagnostics::Diagnostic;
use lumen::evaluator::Variables;
use lumen::parser::SyntaxTree;
use lumen::text::SourceText;
use lumen::{Compilation, EvaluationResult};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lumen-repl", about = "Interactive lumen session", version)]
struct Args {
    /// Output results and diagnostics as raw JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let mut session = Session {
        previous: None,
        variables: Variables::new(),
        json: args.json,
    };

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        if input.is_empty() {
            print!("» ");
        } else {
            print!("· ");
        }
        io::stdout().flush().expect("failed to flush stdout");

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).expect("failed to read stdin");
        if read == 0 {
            return;
        }
        let line = line.trim_end_matches(['\n', '\r']);

        let is_blank = line.trim().is_empty();
        if input.is_empty() {
            if is_blank {
                continue;
            }
            if let Some(command) = line.strip_prefix('#') {
                run_builtin_command(command, &mut session);
                continue;
            }
        }

        input.push_str(line);
        input.push('\n');

        let tree = SyntaxTree::parse(&input);

        // An incomplete submission (diagnostics, last line non-blank) keeps
        // accumulating; a blank line forces it through.
        if !is_blank && !tree.diagnostics().is_empty() {
            continue;
        }
        input.clear();

        session.submit(tree);
    }
}

fn run_builtin_command(command: &str, session: &mut Session) {
    match command {
        "exit" | "quit" | "q" => process::exit(0),
        "cls" | "clear" => print!("\x1b[2J\x1b[H"),
        "reset" => {
            session.previous = None;
            session.variables = Variables::new();
            println!("session reset");
        }
        other => println!("unknown builtin command \"#{other}\""),
    }
}

// ── Session ──────────────────────────────────────────────────────

struct Session {
    previous: Option<Compilation>,
    variables: Variables,
    json: bool,
}

impl Session {
    fn submit(&mut self, tree: SyntaxTree) {
        let compilation = match &self.previous {
            Some(previous) => previous.continue_with(tree),
            None => Compilation::new(tree),
        };

        // Runtime failures (division by zero) unwind out of the evaluator;
        // keep the session alive and report them like the other errors.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            compilation.evaluate(&mut self.variables)
        }));

        match result {
            Ok(EvaluationResult::Success(value)) => {
                if let Some(value) = value {
                    if self.json {
                        println!("{}", serde_json::to_string(&value).expect("value serializes"));
                    } else {
                        println!("{value}");
                    }
                }
                self.previous = Some(compilation);
            }
            Ok(EvaluationResult::Failure(diagnostics)) => {
                if self.json {
                    println!(
                        "{}",
                        serde_json::to_string(&diagnostics).expect("diagnostics serialize")
                    );
                } else {
                    print_diagnostics(&diagnostics, compilation.syntax_tree().text());
                }
            }
            Err(_) => {
                eprintln!("runtime failure: evaluation aborted");
            }
        }
    }
}

// ── Diagnostic rendering ─────────────────────────────────────────

fn print_diagnostics(diagnostics: &[Diagnostic], text: &SourceText) {
    for diagnostic in diagnostics {
        let line_index = text.line_index(diagnostic.span.start);
        let line = text.lines()[line_index];
        let line_number = line_index + 1;
        let column = diagnostic.span.start - line.span().start + 1;

        println!("({line_number}, {column}): {}", diagnostic.message);

        let line_text = text.substring(line.span()).to_string();
        println!("    {line_text}");

        // caret marker under the offending span, clipped to the line
        let marker_start = diagnostic.span.start - line.span().start;
        let marker_length = diagnostic
            .span
            .length
            .min(line.span().end().saturating_sub(diagnostic.span.start))
            .max(1);
        println!("    {}{}", " ".repeat(marker_start), "^".repeat(marker_length));
    }
}
