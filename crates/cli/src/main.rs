use clap::Parser;
use qir_data::{Diagnostic, EvmDialect, Object};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process,
};

#[derive(Parser)]
#[command(name = "qir")]
#[command(about = "EVM-dialect to Wasm-dialect IR translator", long_about = None)]
#[command(version)]
struct Cli {
    /// Input file (use '-' or omit for stdin)
    input: Option<PathBuf>,

    /// Name of the produced compilation unit
    #[arg(long, default_value = "object")]
    object_name: String,

    /// Analyze the input against the EVM dialect and exit
    #[arg(long)]
    check: bool,
}

fn read_input(input: Option<PathBuf>) -> String {
    let use_stdin = match &input {
        None => true,
        Some(path) => path.to_str() == Some("-"),
    };

    if use_stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).expect("failed to read from stdin");
        buffer
    } else {
        let path = input.unwrap();
        fs::read_to_string(&path)
            .unwrap_or_else(|error| panic!("failed to read file '{}': {}", path.display(), error))
    }
}

fn report_and_exit(source: &str, diagnostics: Vec<Diagnostic>) -> ! {
    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
        if let Some(span) = &diagnostic.span {
            eprint!("{}", qir_parser::highlight_span(source, span.clone(), 1));
        }
    }
    process::exit(1)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let source = read_input(cli.input);

    let block = match qir_parser::parse(&source, &EvmDialect) {
        Ok(block) => block,
        Err(diagnostics) => report_and_exit(&source, diagnostics),
    };

    let mut object = Object::new(cli.object_name, block);
    object.analysis = match qir_analysis::analyze(&object.code, &EvmDialect) {
        Ok(analysis) => analysis,
        Err(diagnostics) => report_and_exit(&source, diagnostics),
    };

    if cli.check {
        eprintln!("{}: {} function(s), ok", object.name, object.analysis.functions.len());
        return;
    }

    let translated = match qir_translate::Translator::new().run(&object) {
        Ok(translated) => translated,
        Err(error) => {
            eprintln!("{error}");
            process::exit(1);
        }
    };

    println!("{}", translated.code);
}
