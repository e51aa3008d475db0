use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use csp::language::Language;
use csp::query::QueryParams;

use crate::error::RenderError;

/// Run the language's compile command against a generated source file, if
/// it defines one. The compiler's stdout is discarded and its stderr goes
/// to the run's stderr. The exit status is not inspected; a failed compile
/// surfaces later as an execution failure.
pub fn compile(language: &Language, source: &Path) -> Result<(), RenderError> {
    let Some(template) = &language.compile else {
        return Ok(());
    };
    let argv = template.render(&source.display().to_string(), "");
    let (program, args) = split_argv(&argv)?;

    let _ = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| RenderError::Spawn {
            command: argv.join(" "),
            message: e.to_string(),
        })?;

    Ok(())
}

/// Run the language's execute command and stream the child's stdout
/// verbatim into `output` until end of stream, then wait for termination.
/// The child's exit status is not inspected; whatever it wrote is spliced.
pub fn execute(
    language: &Language,
    source: &Path,
    params: &QueryParams,
    output: &mut dyn Write,
) -> Result<(), RenderError> {
    let argv = language
        .execute
        .render(&source.display().to_string(), &params.to_query_string());
    let (program, args) = split_argv(&argv)?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| RenderError::Spawn {
            command: argv.join(" "),
            message: e.to_string(),
        })?;

    if let Some(mut stdout) = child.stdout.take() {
        io::copy(&mut stdout, output)?;
    }
    let _ = child.wait()?;

    Ok(())
}

fn split_argv(argv: &[String]) -> Result<(&String, &[String]), RenderError> {
    argv.split_first()
        .ok_or_else(|| RenderError::Custom("empty command template".to_string()))
}
