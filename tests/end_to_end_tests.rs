use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tailwind_inliner::commands::pipe_template;
use tailwind_inliner::theme::ColorEntry;
use tailwind_inliner::{
    run_rewrite, scan_template, Cli, Commands, CompilerKind, InlinerConfig, PipeArgs, PlainCssCompiler,
    StyleArgs, StyleCache, StyleResolver,
};
use clap::Parser;
use tempfile::{tempdir, TempDir};

const APP_CSS: &str = r#"
@import "./tokens.css";

.text-red-500 { color: var(--color-red-500); }
.bg-blue-500 { background-color: var(--color-blue-500) !important; }
.p-4 { padding: calc(var(--spacing) * 4); }
.flex { display: flex; }
.text-lg { font-size: var(--text-lg); line-height: 1.75rem; }
.w-1\/2 { width: 50%; }
.font-sans { font-family: var(--font-sans); }
.text-brand { --tw-text-opacity: 1; color: var(--brand, #000); }
.ghost { color: var(--nowhere); }
"#;

const TOKENS_CSS: &str = r#"
:root {
    --color-red-500: oklch(63% .24 25);
    --color-blue-500: #3b82f6;
    --color-white: #fff;
    --spacing: 0.25rem;
    --text-lg: 1.125rem;
    --font-sans: "Inter", sans-serif;
    --font-weight-bold: 700;
    --breakpoint-md: 48rem;
}
"#;

fn write_stylesheet(dir: &Path) -> PathBuf {
    fs::write(dir.join("tokens.css"), TOKENS_CSS).unwrap();
    let entry = dir.join("app.css");
    fs::write(&entry, APP_CSS).unwrap();
    entry
}

fn plain_resolver(stylesheet: PathBuf) -> StyleResolver {
    let config = InlinerConfig {
        stylesheet: Some(stylesheet),
        compiler: CompilerKind::Plain,
        ..InlinerConfig::default()
    };
    StyleResolver::new(config, Arc::new(PlainCssCompiler), Arc::new(StyleCache::new()))
}

fn is_hex(value: &str) -> bool {
    value.len() == 7 && value.starts_with('#') && value[1..].bytes().all(|b| b.is_ascii_hexdigit())
}

#[test]
fn test_batch_resolution_of_theme_colors() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let styles = resolver.resolve_classes(&["text-red-500", "bg-blue-500"]);

    assert_eq!(styles.len(), 2);
    assert_eq!(styles["text-red-500"].len(), 1);
    assert!(is_hex(&styles["text-red-500"]["color"]), "got {}", styles["text-red-500"]["color"]);
    assert_eq!(styles["bg-blue-500"]["background-color"], "#3b82f6");
}

#[test]
fn test_imports_calc_escapes_and_fallbacks() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let styles = resolver.resolve_classes(&["p-4", "w-1/2", "text-lg", "font-sans", "text-brand"]);

    assert_eq!(styles["p-4"]["padding"], "1rem");
    assert_eq!(styles["w-1/2"]["width"], "50%");
    assert_eq!(styles["text-lg"]["font-size"], "1.125rem");
    assert_eq!(styles["text-lg"]["line-height"], "1.75rem");
    assert_eq!(styles["font-sans"]["font-family"], "\"Inter\", sans-serif");
    assert_eq!(styles["text-brand"]["color"], "#000000");
    assert!(!styles["text-brand"].contains_key("--tw-text-opacity"));
}

#[test]
fn test_filtered_and_unknown_classes_absent() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let styles = resolver.resolve_classes(&["hover:flex", "focus-visible:p-4", "dark:flex", "md:flex", "mystery"]);

    assert_eq!(styles.keys().collect::<Vec<_>>(), vec!["md:flex"]);
    assert_eq!(styles["md:flex"]["display"], "flex");
}

#[test]
fn test_no_value_holds_unresolved_variables() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let classes = ["text-red-500", "bg-blue-500", "p-4", "text-lg", "ghost", "text-brand", "font-sans"];
    let styles = resolver.resolve_classes(&classes);

    for (class, declarations) in &styles {
        for (property, value) in declarations {
            assert!(!value.contains("var("), "{} {}: {}", class, property, value);
        }
    }
    assert!(styles.get("ghost").map_or(true, |decls| decls.is_empty()));
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));
    let classes = ["text-red-500", "p-4", "md:flex", "hover:flex"];

    let first = resolver.resolve_classes(&classes);
    let second = resolver.resolve_classes(&classes);
    assert_eq!(first, second);

    let fresh = plain_resolver(dir.path().join("app.css")).resolve_classes(&classes);
    assert_eq!(first, fresh);
}

#[test]
fn test_cyclic_variables_terminate() {
    let dir = tempdir().unwrap();
    let entry = dir.path().join("cycle.css");
    fs::write(
        &entry,
        ":root { --a: var(--b); --b: var(--a); --c: var(--c, red); }\n.x { color: var(--a); }\n.y { margin: var(--c); }",
    )
    .unwrap();

    let styles = plain_resolver(entry).resolve_classes(&["x", "y"]);
    for declarations in styles.values() {
        assert!(declarations.values().all(|value| !value.contains("var(")));
    }
}

#[test]
fn test_clear_picks_up_changed_stylesheet() {
    let dir = tempdir().unwrap();
    let entry = write_stylesheet(dir.path());
    let resolver = plain_resolver(entry);

    let before = resolver.resolve_classes(&["bg-blue-500"]);
    assert_eq!(before["bg-blue-500"]["background-color"], "#3b82f6");

    fs::write(dir.path().join("tokens.css"), TOKENS_CSS.replace("#3b82f6", "#1d4ed8")).unwrap();

    // still served from cache until cleared
    let cached = resolver.resolve_classes(&["bg-blue-500"]);
    assert_eq!(cached, before);

    resolver.clear();
    let after = resolver.resolve_classes(&["bg-blue-500"]);
    assert_eq!(after["bg-blue-500"]["background-color"], "#1d4ed8");
}

#[test]
fn test_shared_cache_across_resolvers() {
    let dir = tempdir().unwrap();
    let entry = write_stylesheet(dir.path());
    let cache = Arc::new(StyleCache::new());
    let config = InlinerConfig {
        stylesheet: Some(entry),
        ..InlinerConfig::default()
    };

    let a = StyleResolver::new(config.clone(), Arc::new(PlainCssCompiler), Arc::clone(&cache));
    let b = StyleResolver::new(config, Arc::new(PlainCssCompiler), Arc::clone(&cache));

    assert_eq!(a.resolve_classes(&["flex"]), b.resolve_classes(&["flex"]));
    assert_eq!(cache.len(), 1);

    b.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_rewrite_keeps_interactive_classes() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let out = resolver
        .rewrite_template(r#"<div class="flex hover:bg-blue-500">Hi</div>"#, "Card.vue")
        .unwrap();

    assert_eq!(out.rewrite.code, r#"<div class="hover:bg-blue-500" style="display: flex">Hi</div>"#);
}

#[test]
fn test_rewrite_keeps_nested_variant_classes() {
    let dir = tempdir().unwrap();
    let sheet = dir.path().join("variants.css");
    fs::write(
        &sheet,
        r#"
.flex { display: flex; }
.first\:mt-0 { &:first-child { margin-top: 0; } }
.print\:hidden { @media print { display: none; } }
"#,
    )
    .unwrap();
    let resolver = plain_resolver(sheet);

    let styles = resolver.resolve_classes(&["first:mt-0", "print:hidden", "flex"]);
    assert_eq!(styles.keys().collect::<Vec<_>>(), vec!["flex"]);

    assert!(resolver
        .rewrite_template(r#"<li class="first:mt-0 print:hidden">x</li>"#, "List.vue")
        .is_none());
    let out = resolver
        .rewrite_template(r#"<li class="first:mt-0 flex">x</li>"#, "List.vue")
        .unwrap();
    assert_eq!(out.rewrite.code, r#"<li class="first:mt-0" style="display: flex">x</li>"#);
}

#[test]
fn test_rewrite_full_component() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let source = r#"<template>
  <section class="p-4 bg-blue-500" style="margin: 0">
    <h1 class="text-lg font-sans">{{ title }}</h1>
    <span :class="{ 'text-lg': active }" class="unknown">x</span>
  </section>
</template>
"#;
    let out = resolver.rewrite_template(source, "Hero.vue").unwrap();
    let expected = r#"<template>
  <section style="padding: 1rem; background-color: #3b82f6; margin: 0">
    <h1 style="font-size: 1.125rem; line-height: 1.75rem; font-family: 'Inter', sans-serif">{{ title }}</h1>
    <span :class="{ 'text-lg': active }" class="unknown">x</span>
  </section>
</template>
"#;
    assert_eq!(out.rewrite.code, expected);
}

#[test]
fn test_dynamic_object_binding_scanned() {
    let classes = scan_template(r#"<p :class="{ 'text-lg': active }" class="flex">x</p>"#);
    assert!(classes.contains("text-lg"));
    assert!(classes.contains("flex"));
    assert!(!classes.contains("active"));
}

#[test]
fn test_theme_metadata() {
    let dir = tempdir().unwrap();
    let resolver = plain_resolver(write_stylesheet(dir.path()));

    let metadata = resolver.theme_metadata();
    assert_eq!(metadata.font_vars.get("sans").map(String::as_str), Some("\"Inter\", sans-serif"));
    assert!(!metadata.font_vars.contains_key("weight-bold"));
    assert_eq!(metadata.breakpoints.get("md"), Some(&768.0));
    assert_eq!(metadata.colors.get("white"), Some(&ColorEntry::Single("#ffffff".to_string())));
    match metadata.colors.get("blue") {
        Some(ColorEntry::Scale(scale)) => assert_eq!(scale["500"], "#3b82f6"),
        other => panic!("expected a blue scale, got {:?}", other),
    }

    let json = serde_json::to_value(&metadata).unwrap();
    assert!(json.get("fontVars").is_some());
    assert!(json.get("breakpoints").is_some());
}

#[test]
fn test_theme_overrides_from_config() {
    let dir = tempdir().unwrap();
    let entry = write_stylesheet(dir.path());
    fs::write(
        dir.path().join("inliner.yaml"),
        format!("stylesheet: {}\ncompiler: plain\ntheme:\n  primary: blue\n", entry.display()),
    )
    .unwrap();
    fs::write(
        &entry,
        format!("{}\n.text-primary {{ color: var(--color-primary-500); }}", APP_CSS),
    )
    .unwrap();

    let config = InlinerConfig::from_file(&dir.path().join("inliner.yaml")).unwrap();
    let styles = StyleResolver::from_config(config).resolve_classes(&["text-primary"]);
    assert_eq!(styles["text-primary"]["color"], "#3b82f6");
}

#[test]
fn test_rewrite_command_writes_out_dir_and_maps() {
    let dir = TempDir::new().unwrap();
    let entry = write_stylesheet(dir.path());
    let templates = dir.path().join("components");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("A.vue"), r#"<div class="flex">a</div>"#).unwrap();
    fs::write(templates.join("B.vue"), r#"<div class="mystery">b</div>"#).unwrap();
    let out_dir = dir.path().join("out");

    let cli = Cli::parse_from(vec![
        "tailwind-inliner-cli".to_string(),
        "rewrite".to_string(),
        "-i".to_string(),
        format!("{}/*.vue", templates.display()),
        "-o".to_string(),
        out_dir.display().to_string(),
        "--source-map".to_string(),
        "-s".to_string(),
        entry.display().to_string(),
        "--compiler".to_string(),
        "plain".to_string(),
    ]);
    let Commands::Rewrite(args) = cli.command else {
        panic!("expected rewrite");
    };

    let summary = run_rewrite(&args, true).unwrap();
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.files_changed, 1);
    assert_eq!(summary.files_failed, 0);

    assert_eq!(fs::read_to_string(out_dir.join("A.vue")).unwrap(), r#"<div style="display: flex">a</div>"#);
    assert!(out_dir.join("A.vue.map").exists());
    assert!(!out_dir.join("B.vue").exists());
}

#[tokio::test]
async fn test_pipe_transform() {
    let dir = tempdir().unwrap();
    let entry = write_stylesheet(dir.path());
    let args = PipeArgs {
        file_name: "Pipe.vue".to_string(),
        style: StyleArgs {
            stylesheet: Some(entry),
            compiler: Some(CompilerKind::Plain),
            ..StyleArgs::default()
        },
    };

    let output = tokio::task::spawn_blocking(move || pipe_template(&args, r#"<b class="p-4 flex">x</b>"#))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(output, r#"<b style="padding: 1rem; display: flex">x</b>"#);
}
