//! Resolve Tailwind utility classes into literal inline styles.
//!
//! Templates are scanned for class names, the classes are compiled against a
//! project stylesheet, theme variables are substituted and colors normalized
//! to hex, and the result is either returned as a `class -> declarations` map
//! or written back into the markup as `style` attributes.

pub mod args;
pub mod cache;
pub mod color;
#[cfg(feature = "cli")]
pub mod commands;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod filter;
pub mod loader;
pub mod markup;
pub mod resolver;
pub mod rewriter;
pub mod scanner;
pub mod selector;
pub mod source_map;
pub mod styles;
pub mod stylesheet;
pub mod theme;
pub mod variables;

pub use args::{Cli, Commands, PipeArgs, ResolveArgs, RewriteArgs, ScanArgs, StyleArgs, ThemeArgs};
pub use cache::{ClassResolution, StyleCache};
pub use color::{normalize_color, normalize_property_value};
#[cfg(feature = "cli")]
pub use commands::{handle_pipe_command, init_logging, run_resolve, run_rewrite, run_scan, run_theme, RewriteSummary};
pub use compiler::{compiler_for, ClassCompiler, CompilerKind, PlainCssCompiler, TailwindRsCompiler};
pub use config::InlinerConfig;
pub use errors::{InlinerError, Result};
pub use filter::{classify, filter_classes, ClassDisposition};
pub use resolver::{StyleResolver, TemplateOutput};
pub use rewriter::{rewrite_markup, Edit, Rewrite};
pub use scanner::{scan_file, scan_files_parallel, scan_template};
pub use selector::{decode_class_selector, escape_class_name};
pub use source_map::{build_source_map, source_map_to_json};
pub use styles::{ClassStyleMap, PropertyCase, StyleDeclarations};
pub use theme::{ThemeMetadata, ThemeReport};
pub use variables::{resolve_value, VariableTable};
