use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;

use crate::compiler::CompilerKind;
use crate::config::InlinerConfig;
use crate::errors::Result;

/// Tailwind inliner CLI - Resolves utility classes in component templates into literal inline styles
#[derive(Parser, Debug)]
#[command(name = "tailwind-inliner-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        default_value_t = false,
        help = "Enable debug logging (RUST_LOG overrides)"
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the classes templates reference
    Scan(ScanArgs),
    /// Resolve classes to inline declarations
    Resolve(ResolveArgs),
    /// Rewrite templates, inlining resolved classes as style attributes
    Rewrite(RewriteArgs),
    /// Print theme metadata (fonts, breakpoints, colors)
    Theme(ThemeArgs),
    /// Rewrite a template read from stdin to stdout
    Pipe(PipeArgs),
}

/// Options shared by every command that resolves styles
#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Entry stylesheet
    #[arg(
        short = 's',
        long = "stylesheet",
        value_name = "PATH",
        help = "CSS entry stylesheet whose imports and theme are used"
    )]
    pub stylesheet: Option<PathBuf>,

    /// Configuration file path (YAML or JSON)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to configuration file (YAML or JSON format)"
    )]
    pub config: Option<PathBuf>,

    /// Class compiler
    #[arg(long = "compiler", value_enum, help = "Class compiler to run")]
    pub compiler: Option<CompilerKind>,

    /// Theme overrides
    #[arg(
        long = "theme",
        value_name = "SEMANTIC=COLOR",
        value_parser = parse_theme_pair,
        help = "Map a semantic color to a base color, e.g. primary=indigo"
    )]
    pub theme: Vec<(String, String)>,

    /// Enable preflight CSS generation
    #[arg(
        long = "preflight",
        default_value_t = false,
        help = "Include tailwind-rs preflight/reset rules when compiling"
    )]
    pub preflight: bool,

    /// Module resolution root
    #[arg(
        long = "root",
        value_name = "DIR",
        help = "Directory searched for node_modules when resolving bare imports"
    )]
    pub root: Option<PathBuf>,
}

impl StyleArgs {
    /// Config file (if any) overlaid with the flags given on the command line
    pub fn to_config(&self) -> Result<InlinerConfig> {
        let base = match &self.config {
            Some(path) => InlinerConfig::from_file(path)?,
            None => InlinerConfig::default(),
        };

        let overlay = InlinerConfig {
            stylesheet: self.stylesheet.clone(),
            theme: self.theme.iter().cloned().collect::<IndexMap<_, _>>(),
            preflight: self.preflight.then_some(true),
            root: self.root.clone(),
            ..InlinerConfig::default()
        };

        let mut config = base.merge(overlay);
        if let Some(compiler) = self.compiler {
            config.compiler = compiler;
        }
        Ok(config)
    }
}

fn parse_theme_pair(raw: &str) -> std::result::Result<(String, String), String> {
    let (semantic, color) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SEMANTIC=COLOR, got '{}'", raw))?;
    let (semantic, color) = (semantic.trim(), color.trim());
    if semantic.is_empty() || color.is_empty() {
        return Err(format!("expected SEMANTIC=COLOR, got '{}'", raw));
    }
    Ok((semantic.to_string(), color.to_string()))
}

/// Arguments for the scan command
#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    /// Input file patterns (glob patterns supported)
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATTERN",
        required = true,
        num_args = 1..,
        help = "Template file patterns to scan"
    )]
    pub input: Vec<String>,

    /// Exclude patterns
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns to exclude from scanning"
    )]
    pub exclude: Vec<String>,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long = "output", value_name = "PATH", help = "Write the class list here instead of stdout")]
    pub output: Option<PathBuf>,
}

/// Arguments for the resolve command
#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    /// Classes to resolve
    #[arg(value_name = "CLASS", num_args = 0.., help = "Classes to resolve")]
    pub classes: Vec<String>,

    /// Templates whose classes are resolved as well
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Also resolve every class referenced by these templates"
    )]
    pub input: Vec<String>,

    /// camelCase property names
    #[arg(long = "camel-case", default_value_t = false, help = "Emit camelCase property names")]
    pub camel_case: bool,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long = "output", value_name = "PATH", help = "Write the style map here instead of stdout")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub style: StyleArgs,
}

/// Arguments for the rewrite command
#[derive(Parser, Debug, Clone)]
pub struct RewriteArgs {
    /// Input file patterns (glob patterns supported)
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATTERN",
        required = true,
        num_args = 1..,
        help = "Template file patterns to rewrite"
    )]
    pub input: Vec<String>,

    /// Exclude patterns
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns to exclude"
    )]
    pub exclude: Vec<String>,

    /// Output directory
    #[arg(
        short = 'o',
        long = "out-dir",
        value_name = "DIR",
        help = "Directory for rewritten templates"
    )]
    pub out_dir: Option<PathBuf>,

    /// Overwrite the input files
    #[arg(long = "in-place", default_value_t = false, help = "Rewrite the input files in place")]
    pub in_place: bool,

    /// Write source maps
    #[arg(long = "source-map", default_value_t = false, help = "Write a .map file next to each rewritten template")]
    pub source_map: bool,

    /// Number of parallel threads to use
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "NUM",
        help = "Number of parallel threads to use (defaults to number of CPU cores)"
    )]
    pub jobs: Option<usize>,

    /// Dry run (don't write output files)
    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Report what would change without writing files"
    )]
    pub dry_run: bool,

    #[command(flatten)]
    pub style: StyleArgs,
}

/// Arguments for the theme command
#[derive(Parser, Debug, Clone)]
pub struct ThemeArgs {
    /// Wrap the metadata with provenance information
    #[arg(long = "report", default_value_t = false, help = "Include version, timestamp and variable count")]
    pub report: bool,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long = "output", value_name = "PATH", help = "Write the metadata here instead of stdout")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub style: StyleArgs,
}

/// Arguments for the pipe command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    /// Name recorded in the source map
    #[arg(long = "file-name", value_name = "NAME", default_value = "stdin", help = "Template name used in diagnostics")]
    pub file_name: String,

    #[command(flatten)]
    pub style: StyleArgs,
}

impl RewriteArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input.is_empty() {
            return Err("At least one input pattern must be provided".to_string());
        }

        if !self.dry_run && self.out_dir.is_none() && !self.in_place {
            return Err("Either --out-dir or --in-place is required (or use --dry-run)".to_string());
        }

        if self.out_dir.is_some() && self.in_place {
            return Err("--out-dir and --in-place are mutually exclusive".to_string());
        }

        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err("Number of jobs must be at least 1".to_string());
            }
        }

        Ok(())
    }
}

impl ResolveArgs {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.classes.is_empty() && self.input.is_empty() {
            return Err("Provide classes to resolve or --input templates".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_theme_pair() {
        assert_eq!(parse_theme_pair("primary=indigo"), Ok(("primary".into(), "indigo".into())));
        assert!(parse_theme_pair("primary").is_err());
        assert!(parse_theme_pair("=indigo").is_err());
    }

    #[test]
    fn test_cli_flags_override_config_defaults() {
        let args = StyleArgs {
            stylesheet: Some(PathBuf::from("app.css")),
            compiler: Some(CompilerKind::Plain),
            theme: vec![("primary".into(), "rose".into())],
            ..Default::default()
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.stylesheet, Some(PathBuf::from("app.css")));
        assert_eq!(config.compiler, CompilerKind::Plain);
        assert_eq!(config.theme.get("primary").map(String::as_str), Some("rose"));
    }
}
