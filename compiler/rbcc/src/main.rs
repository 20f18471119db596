//! rb2c CLI
//!
//! Compiles pre-parsed Ruby trees into C extension source.

use std::path::PathBuf;

use rbcc::{compile, init_tracing, parse_compile_args, snapshot, CliError};

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "compile" => {
            if args.len() < 3 {
                print_compile_usage();
                std::process::exit(1);
            }
            parse_compile_args(&args[2..]).and_then(|parsed| {
                let path = compile(&parsed)?;
                println!("wrote {}", path.display());
                Ok(())
            })
        }
        "snapshot" => {
            if args.len() < 3 {
                eprintln!("Usage: rbcc snapshot <classes.json> [-o <dir>]");
                std::process::exit(1);
            }
            run_snapshot(&args[2..])
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        if matches!(err, CliError::Usage(_)) {
            eprintln!();
            print_compile_usage();
        }
        std::process::exit(1);
    }
}

fn run_snapshot(args: &[String]) -> Result<(), CliError> {
    let mut input = None;
    let mut out_dir = PathBuf::from(".");
    let mut i = 0;
    while i < args.len() {
        if args[i] == "-o" && i + 1 < args.len() {
            out_dir = PathBuf::from(&args[i + 1]);
            i += 2;
        } else if !args[i].starts_with('-') && input.is_none() {
            input = Some(PathBuf::from(&args[i]));
            i += 1;
        } else {
            return Err(CliError::usage(format!("unexpected argument `{}`", args[i])));
        }
    }
    let Some(input) = input else {
        return Err(CliError::usage("missing class dump path"));
    };

    let report = snapshot(&input, &out_dir)?;
    for unit in &report.units {
        println!("wrote {}", unit.display());
    }
    for class in &report.skipped {
        println!("skipped {class} (already processed)");
    }
    Ok(())
}

fn print_usage() {
    println!("rbcc - Ruby to C extension compiler");
    println!();
    println!("Usage: rbcc <command> [options]");
    println!();
    println!("Commands:");
    println!("  compile <tree.json>     Compile a parsed Ruby file into <name>.c");
    println!("  snapshot <classes.json> Compile every method of each class into temp_<n>.c");
    println!("  help                    Show this message");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=rbc_codegen=debug) for tracing output.");
}

fn print_compile_usage() {
    eprintln!("Usage: rbcc compile <tree.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --name <name>          Extension name (default: input file stem)");
    eprintln!("  -o <dir>               Output directory (default: input's directory)");
    eprintln!("  --config <file>        JSON compile options");
    eprintln!("  --warnings             Warn about constructs compiled code cannot support");
    eprintln!("  -O all                 Enable every optimization");
    eprintln!("  --opt <name>[=a,b]     Enable one optimization, with arguments");
    eprintln!("  --include-path <dir>   Inline required features found in <dir>");
    eprintln!("  --include-file <name>  Only inline the named feature (repeatable)");
}
