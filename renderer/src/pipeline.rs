use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csp::language::{Language, LanguageRegistry};
use csp::query::QueryParams;
use csp::scanner::{Block, Event, Scanner};

use crate::cache::{self, CachePolicy, PresenceCache};
use crate::error::{DiagnosticError, RenderError};
use crate::runner;

/// Everything a render needs, passed explicitly rather than held as
/// ambient state.
pub struct RenderContext<'a> {
    pub registry: &'a LanguageRegistry,
    /// Directory where generated sources and artifacts land.
    pub out_dir: PathBuf,
    /// Input file stem; artifact names derive from it plus a block counter.
    pub stem: String,
    /// Parameter map serialized into execute invocations.
    pub params: QueryParams,
    pub cache: Box<dyn CachePolicy>,
    /// Source file ID for diagnostics.
    pub source_id: usize,
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a LanguageRegistry, out_dir: PathBuf, stem: impl Into<String>) -> Self {
        RenderContext {
            registry,
            out_dir,
            stem: stem.into(),
            params: QueryParams::default(),
            cache: Box::new(PresenceCache),
            source_id: 0,
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_cache(mut self, cache: Box<dyn CachePolicy>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_source_id(mut self, source_id: usize) -> Self {
        self.source_id = source_id;
        self
    }
}

/// Render a document: copy literal bytes through, and replace each block
/// with the captured stdout of its compiled-and-executed body.
///
/// Blocks are processed strictly in order; each one finishes executing
/// before scanning resumes. Returns accumulated warnings. A fatal error
/// leaves partial output already written to `output` in place.
pub fn render_document(
    source: &[u8],
    output: &mut dyn Write,
    ctx: &RenderContext,
) -> Result<Vec<DiagnosticError>, DiagnosticError> {
    let mut scanner = Scanner::new(source);
    let mut warnings = Vec::new();
    let mut index = 0;

    while let Some(event) = scanner.next_event() {
        match event {
            Event::Literal(bytes) => output.write_all(bytes)?,
            Event::Block(block) => {
                render_block(&block, source, output, ctx, index, &mut warnings)?;
                index += 1;
            }
        }
    }

    Ok(warnings)
}

/// Scan without executing: resolve every block's tag against the registry.
/// Returns the number of blocks on success; used by `--check`.
pub fn check_document(
    source: &[u8],
    registry: &LanguageRegistry,
    source_id: usize,
) -> Result<usize, DiagnosticError> {
    let mut scanner = Scanner::new(source);
    let mut blocks = 0;
    while let Some(event) = scanner.next_event() {
        if let Event::Block(block) = event {
            resolve(&block, registry, source_id)?;
            blocks += 1;
        }
    }
    Ok(blocks)
}

fn resolve<'a>(
    block: &Block,
    registry: &'a LanguageRegistry,
    source_id: usize,
) -> Result<&'a Language, DiagnosticError> {
    registry.resolve(&block.tag).ok_or_else(|| DiagnosticError {
        error: RenderError::UnknownLanguage {
            tag: block.tag.clone(),
            known: registry.tags().iter().map(|t| t.to_string()).collect(),
        },
        span: Some(block.tag_span.clone()),
        source_id,
        is_warning: false,
    })
}

fn render_block(
    block: &Block,
    source: &[u8],
    output: &mut dyn Write,
    ctx: &RenderContext,
    index: usize,
    warnings: &mut Vec<DiagnosticError>,
) -> Result<(), DiagnosticError> {
    let language = resolve(block, ctx.registry, ctx.source_id)?;

    if !block.closed {
        warnings.push(DiagnosticError::warning(
            "block body truncated at end of input".to_string(),
            block.body.clone(),
            ctx.source_id,
        ));
    }

    let script = cache::source_path(&ctx.out_dir, &ctx.stem, index, &language.tag);
    let artifact = cache::artifact_path(&script, &language.output_extension);

    if !ctx.cache.is_cached(&artifact) {
        write_script(&script, language, block, source)?;
        if let Err(error) = runner::compile(language, &script) {
            // A compiler that cannot even be spawned is reported but does
            // not stop the run; execution is attempted regardless, exactly
            // as with a compiler that exits nonzero.
            warnings.push(DiagnosticError {
                error,
                span: Some(block.tag_span.clone()),
                source_id: ctx.source_id,
                is_warning: true,
            });
        }
    }

    runner::execute(language, &script, &ctx.params, output).map_err(|error| DiagnosticError {
        error,
        span: Some(block.tag_span.clone()),
        source_id: ctx.source_id,
        is_warning: false,
    })
}

/// Assemble the generated source: opening boilerplate, mode preambles in
/// mode order, the raw body, mode postambles in the same order, closing
/// boilerplate.
fn write_script(
    path: &Path,
    language: &Language,
    block: &Block,
    source: &[u8],
) -> Result<(), DiagnosticError> {
    let file = File::create(path).map_err(|e| {
        RenderError::Io(format!("cannot write '{}': {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);

    if let Some(opening) = &language.opening {
        writer.write_all(opening.as_bytes())?;
    }
    for mode in &block.modes {
        if let Some(preamble) = language.hooks.opening(mode) {
            writer.write_all(preamble.as_bytes())?;
        }
    }
    writer.write_all(&source[block.body.clone()])?;
    for mode in &block.modes {
        if let Some(postamble) = language.hooks.closing(mode) {
            writer.write_all(postamble.as_bytes())?;
        }
    }
    if let Some(closing) = &language.closing {
        writer.write_all(closing.as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}
