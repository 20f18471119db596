//! The `compile` command: one parsed file into one C extension source.

use std::path::{Path, PathBuf};

use rbc_codegen::options::{Optimizations, OPTIMIZATIONS};
use rbc_codegen::CompileOptions;
use rbc_ir::ParsedFile;

use super::{read_file, read_json, write_file};
use crate::CliError;

/// Parsed `compile` command line.
#[derive(Clone, Debug, Default)]
pub struct CompileArgs {
    pub input: PathBuf,
    /// Extension name; defaults to the input's file stem.
    pub name: Option<String>,
    /// Output directory; defaults to the input's directory.
    pub out_dir: Option<PathBuf>,
    pub options: CompileOptions,
}

impl CompileArgs {
    pub fn extension_name(&self) -> Result<String, CliError> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::usage(format!(
                    "cannot derive an extension name from {}; pass --name",
                    self.input.display()
                ))
            })
    }

    pub fn output_path(&self) -> Result<PathBuf, CliError> {
        let dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        };
        Ok(dir.join(format!("{}.c", self.extension_name()?)))
    }
}

/// Next argument as the value of `flag`.
fn value<'a>(args: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a str, CliError> {
    args.next()
        .map(String::as_str)
        .ok_or_else(|| CliError::usage(format!("{flag} expects a value")))
}

/// `name` or `name=a,b` as given to `--opt`.
fn parse_opt(setting: &str) -> Result<(String, Vec<String>), CliError> {
    let (name, args) = match setting.split_once('=') {
        Some((name, args)) => (
            name,
            args.split(',')
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (setting, Vec::new()),
    };
    if !OPTIMIZATIONS.contains(&name) {
        return Err(CliError::usage(format!(
            "unknown optimization `{name}` (expected one of {})",
            OPTIMIZATIONS.join(", ")
        )));
    }
    Ok((name.to_string(), args))
}

/// Parse the arguments following `compile`.
///
/// Options from `--config` are loaded first; flags then override them
/// wherever they appear on the line.
pub fn parse_compile_args(args: &[String]) -> Result<CompileArgs, CliError> {
    let mut input = None;
    let mut name = None;
    let mut out_dir = None;
    let mut config = None;
    let mut warnings = false;
    let mut all = false;
    let mut opts = Vec::new();
    let mut include_paths = Vec::new();
    let mut include_files = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--warnings" => warnings = true,
            "-Oall" => all = true,
            "-O" => match value(&mut iter, "-O")? {
                "all" => all = true,
                level => {
                    return Err(CliError::usage(format!(
                        "unknown optimization level `{level}` (expected `all`)"
                    )))
                }
            },
            "--opt" => opts.push(parse_opt(value(&mut iter, "--opt")?)?),
            "--name" => name = Some(value(&mut iter, "--name")?.to_string()),
            "-o" => out_dir = Some(PathBuf::from(value(&mut iter, "-o")?)),
            "--config" => config = Some(PathBuf::from(value(&mut iter, "--config")?)),
            "--include-path" => {
                include_paths.push(PathBuf::from(value(&mut iter, "--include-path")?));
            }
            "--include-file" => {
                include_files.push(value(&mut iter, "--include-file")?.to_string());
            }
            flag if flag.starts_with('-') => {
                return Err(CliError::usage(format!("unknown option `{flag}`")));
            }
            path => {
                if input.is_some() {
                    return Err(CliError::usage(format!("unexpected argument `{path}`")));
                }
                input = Some(PathBuf::from(path));
            }
        }
    }
    let Some(input) = input else {
        return Err(CliError::usage("missing input file"));
    };

    let mut options = match &config {
        Some(path) => {
            let text = read_file(path)?;
            CompileOptions::from_json(&text).map_err(|source| CliError::Json {
                path: path.clone(),
                source,
            })?
        }
        None => CompileOptions::default(),
    };
    options.warnings |= warnings;
    if all {
        options.optimizations = Optimizations::Preset("all".to_string());
    }
    for (name, args) in opts {
        options.enable(&name, args);
    }
    if !include_paths.is_empty() || !include_files.is_empty() {
        let include = options.require_include.get_or_insert_with(Default::default);
        include.paths.extend(include_paths);
        include.files.extend(include_files);
    }

    Ok(CompileArgs {
        input,
        name,
        out_dir,
        options,
    })
}

/// Compile `args.input` and write the C source; returns the written path.
#[tracing::instrument(level = "info", skip(args), fields(input = %args.input.display()))]
pub fn compile(args: &CompileArgs) -> Result<PathBuf, CliError> {
    let file: ParsedFile = read_json(&args.input)?;
    let name = args.extension_name()?;
    let code = rbc_codegen::compile_file(&name, &file, &args.options)?;
    let path = args.output_path()?;
    write_file(&path, &code)?;
    tracing::info!(path = %path.display(), bytes = code.len(), "wrote extension source");
    Ok(path)
}
