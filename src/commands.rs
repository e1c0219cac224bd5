//! CLI command implementations.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::args::{PipeArgs, ResolveArgs, RewriteArgs, ScanArgs, ThemeArgs};
use crate::errors::{InlinerError, Result};
use crate::resolver::StyleResolver;
use crate::scanner::scan_files_parallel;
use crate::source_map::source_map_to_json;
use crate::styles::PropertyCase;
use crate::theme::ThemeReport;

/// Install the env_logger backend: `debug` when verbose, `warn` otherwise,
/// `RUST_LOG` overriding both
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}

/// Result of the rewrite command
#[derive(Debug, Clone, Default)]
pub struct RewriteSummary {
    pub files_processed: usize,
    pub files_changed: usize,
    pub files_failed: usize,
}

/// Scan templates and print the sorted class list as JSON
pub fn run_scan(args: &ScanArgs) -> Result<Vec<String>> {
    let files = collect_files(&args.input, &args.exclude)?;
    let mut classes: Vec<String> = scan_files_parallel(&files)?.into_iter().collect();
    classes.sort();

    log::info!("Scanned {} files, found {} classes", files.len(), classes.len());
    emit(args.output.as_deref(), &serde_json::to_string_pretty(&classes)?)?;
    Ok(classes)
}

/// Resolve classes (and the classes of any templates given) to a style map
pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    args.validate().map_err(InlinerError::InvalidInput)?;

    let mut config = args.style.to_config()?;
    if args.camel_case {
        config.property_case = PropertyCase::Camel;
    }
    let resolver = StyleResolver::from_config(config);

    let mut classes = args.classes.clone();
    if !args.input.is_empty() {
        let files = collect_files(&args.input, &[])?;
        classes.extend(scan_files_parallel(&files)?);
    }

    let styles = resolver.resolve_classes_cased(&classes);
    log::info!("Resolved {} of {} classes", styles.len(), classes.len());
    emit(args.output.as_deref(), &serde_json::to_string_pretty(&styles)?)
}

/// Rewrite templates in parallel
pub fn run_rewrite(args: &RewriteArgs, verbose: bool) -> Result<RewriteSummary> {
    args.validate().map_err(InlinerError::InvalidInput)?;
    let start = Instant::now();

    if let Some(jobs) = args.jobs {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global();
    }

    let files = collect_files(&args.input, &args.exclude)?;
    if files.is_empty() {
        return Err(InlinerError::NoFilesFound);
    }

    let resolver = StyleResolver::from_config(args.style.to_config()?);
    let progress = progress_bar(files.len() as u64, verbose);

    let outcomes: Vec<Result<bool>> = files
        .par_iter()
        .map(|path| {
            let outcome = rewrite_file(&resolver, path, args);
            progress.inc(1);
            progress.set_message(path.file_name().unwrap_or_default().to_string_lossy().into_owned());
            outcome
        })
        .collect();

    let mut summary = RewriteSummary {
        files_processed: files.len(),
        ..RewriteSummary::default()
    };
    for (path, outcome) in files.iter().zip(outcomes) {
        match outcome {
            Ok(true) => summary.files_changed += 1,
            Ok(false) => {}
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                summary.files_failed += 1;
            }
        }
    }

    progress.finish_with_message(format!(
        "✓ {} of {} changed ({:.2}s)",
        summary.files_changed,
        summary.files_processed,
        start.elapsed().as_secs_f64()
    ));
    Ok(summary)
}

fn rewrite_file(resolver: &StyleResolver, path: &Path, args: &RewriteArgs) -> Result<bool> {
    let source = fs::read_to_string(path).map_err(|e| InlinerError::TemplateError {
        path: path.display().to_string(),
        message: format!("Failed to read file: {}", e),
    })?;

    let file_name = path.display().to_string();
    let Some(output) = resolver.rewrite_template(&source, &file_name) else {
        return Ok(false);
    };
    if args.dry_run {
        log::info!("Would rewrite {}", path.display());
        return Ok(true);
    }

    let target = output_path(path, args.out_dir.as_deref());
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    write_atomic(&target, &output.rewrite.code).map_err(|e| InlinerError::OutputError {
        path: target.display().to_string(),
        message: e.to_string(),
    })?;

    if args.source_map {
        let map_path = PathBuf::from(format!("{}.map", target.display()));
        let json = source_map_to_json(&output.source_map)?;
        write_atomic(&map_path, &json).map_err(|e| InlinerError::OutputError {
            path: map_path.display().to_string(),
            message: e.to_string(),
        })?;
    }

    Ok(true)
}

/// Where a rewritten template goes: the input itself, or the same relative
/// path under `out_dir`
fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        None => input.to_path_buf(),
        Some(dir) if input.is_relative() => dir.join(input),
        Some(dir) => dir.join(input.file_name().unwrap_or_default()),
    }
}

/// Print theme metadata
pub fn run_theme(args: &ThemeArgs) -> Result<()> {
    let config = args.style.to_config()?;
    let stylesheet = config.stylesheet.as_ref().map(|path| path.display().to_string());
    let resolver = StyleResolver::from_config(config);

    let json = if args.report {
        ThemeReport::new(&resolver.variables(), stylesheet).to_pretty_json()?
    } else {
        serde_json::to_string_pretty(&resolver.theme_metadata())?
    };
    emit(args.output.as_deref(), &json)
}

/// Handle pipe command - read a template from stdin, write the rewritten
/// template (or the input unchanged) to stdout
pub async fn handle_pipe_command(args: PipeArgs) -> Result<()> {
    use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| InlinerError::InputError(format!("Failed to read from stdin: {}", e)))?;

    let output = pipe_template(&args, &input)?;

    let mut stdout = io::stdout();
    stdout
        .write_all(output.as_bytes())
        .await
        .map_err(|e| InlinerError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;
    stdout.flush().await.map_err(|e| InlinerError::OutputError {
        path: "stdout".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// The transformation behind `pipe`, separated from the stdio plumbing
pub fn pipe_template(args: &PipeArgs, input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Ok(input.to_string());
    }

    let resolver = StyleResolver::from_config(args.style.to_config()?);
    Ok(match resolver.rewrite_template(input, &args.file_name) {
        Some(output) => output.rewrite.code,
        None => input.to_string(),
    })
}

/// Collect files matching the given patterns
pub fn collect_files(patterns: &[String], exclude_patterns: &[String]) -> Result<Vec<PathBuf>> {
    let excludes = exclude_patterns
        .iter()
        .map(|pattern| glob::Pattern::new(pattern))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if path.is_dir() || excludes.iter().any(|exclude| exclude.matches_path(&path)) {
                continue;
            }
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_atomic(path, content).map_err(|e| InlinerError::OutputError {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn progress_bar(len: u64, verbose: bool) -> ProgressBar {
    if verbose {
        return ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden());
    }

    let progress = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}

/// Write file atomically through a uniquely named temp file in the same
/// directory, then persist it over `path`
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
