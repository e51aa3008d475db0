use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{
    Color, ColorChoice, ColorSpec, StandardStream, WriteColor,
};

use csp::language::LanguageRegistry;
use csp::query::QueryParams;
use renderer::{DiagnosticError, RenderContext};

#[derive(Parser)]
#[command(
    name = "csp",
    version,
    about = "Compile-and-embed document preprocessor"
)]
struct Cli {
    /// Input document
    input: PathBuf,

    /// Write rendered output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for generated sources and compiled artifacts
    /// (default: the input file's directory)
    #[arg(short = 'd', long = "out-directory")]
    out_directory: Option<PathBuf>,

    /// Query string handed to executed scripts, e.g. "hello=world&foo=bar"
    #[arg(short, long, default_value = "")]
    query: String,

    /// TOML file registering additional languages
    #[arg(long)]
    languages: Option<PathBuf>,

    /// Resolve every block's language tag without compiling or executing
    #[arg(long)]
    check: bool,

    /// List registered language tags and exit
    #[arg(long)]
    list_languages: bool,

    /// Disable colored error output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let mut registry = LanguageRegistry::builtin();
    if let Some(path) = &cli.languages {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => fatal(
                color_choice,
                &format!("cannot read '{}': {}", path.display(), e),
            ),
        };
        if let Err(e) = registry.extend_from_toml(&text) {
            fatal(
                color_choice,
                &format!("invalid languages file '{}': {}", path.display(), e),
            );
        }
    }

    if cli.list_languages {
        for tag in registry.tags() {
            println!("{}", tag);
        }
        return;
    }

    // Read source
    let source = match fs::read(&cli.input) {
        Ok(s) => s,
        Err(e) => fatal(
            color_choice,
            &format!("cannot read '{}': {}", cli.input.display(), e),
        ),
    };

    // Set up codespan file database. The document may contain arbitrary
    // bytes; diagnostics render against a lossy decoding.
    let mut files = SimpleFiles::new();
    let file_id = files.add(
        cli.input.display().to_string(),
        String::from_utf8_lossy(&source).into_owned(),
    );

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    // --check: resolve tags only, execute nothing
    if cli.check {
        match renderer::check_document(&source, &registry, file_id) {
            Ok(blocks) => {
                eprintln!("ok: {} ({} blocks)", cli.input.display(), blocks);
                return;
            }
            Err(error) => {
                emit_diagnostic_error(&writer, &config, &files, &error, color_choice);
                process::exit(1);
            }
        }
    }

    let out_dir = cli
        .out_directory
        .clone()
        .unwrap_or_else(|| parent_dir(&cli.input));
    let stem = cli
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());

    let ctx = RenderContext::new(&registry, out_dir, stem)
        .with_params(QueryParams::parse(&cli.query))
        .with_source_id(file_id);

    // Render
    let result = match &cli.output {
        Some(path) => {
            let mut file = match fs::File::create(path) {
                Ok(f) => f,
                Err(e) => fatal(
                    color_choice,
                    &format!("cannot open '{}': {}", path.display(), e),
                ),
            };
            renderer::render_document(&source, &mut file, &ctx)
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            renderer::render_document(&source, &mut lock, &ctx)
        }
    };

    match result {
        Ok(warnings) => {
            for warning in &warnings {
                emit_diagnostic_error(&writer, &config, &files, warning, color_choice);
            }
        }
        Err(error) => {
            // Partial output already written stays in place; no rollback.
            emit_diagnostic_error(&writer, &config, &files, &error, color_choice);
            process::exit(1);
        }
    }
}

fn emit_diagnostic_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    error: &DiagnosticError,
    color_choice: ColorChoice,
) {
    if let Some(span) = &error.span {
        let severity = if error.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        let diagnostic = Diagnostic::new(severity)
            .with_message(error.to_string())
            .with_labels(vec![Label::primary(error.source_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    } else if error.is_warning {
        eprintln!("warning: {}", error);
    } else {
        print_fatal(color_choice, &error.to_string());
    }
}

/// Input files named like `doc.csp` have an empty parent; artifacts land
/// in the current directory.
fn parent_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Bold red `fatal:` prefix when stderr is a terminal, plain otherwise.
fn print_fatal(color_choice: ColorChoice, message: &str) {
    let mut stderr = StandardStream::stderr(color_choice);
    let _ = stderr.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Color::Red)));
    let _ = write!(stderr, "fatal: ");
    let _ = stderr.reset();
    let _ = writeln!(stderr, "{}", message);
}

fn fatal(color_choice: ColorChoice, message: &str) -> ! {
    print_fatal(color_choice, message);
    process::exit(1);
}
