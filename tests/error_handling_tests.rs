use std::fs;
use std::sync::Arc;
use tailwind_inliner::commands::collect_files;
use tailwind_inliner::{
    run_rewrite, run_scan, Cli, Commands, InlinerConfig, InlinerError, Result, ScanArgs, StyleCache, StyleResolver,
};
use clap::Parser;
use tempfile::TempDir;

fn rewrite_args(args: &[String]) -> tailwind_inliner::RewriteArgs {
    let mut argv = vec!["tailwind-inliner-cli".to_string(), "rewrite".to_string()];
    argv.extend_from_slice(args);
    match Cli::parse_from(argv).command {
        Commands::Rewrite(args) => args,
        other => panic!("Unexpected command: {:?}", other),
    }
}

#[test]
fn test_error_message_for_no_files_found() {
    let temp_dir = TempDir::new().unwrap();

    let args = rewrite_args(&[
        "-i".to_string(),
        format!("{}/*.vue", temp_dir.path().display()),
        "--dry-run".to_string(),
    ]);

    let result = run_rewrite(&args, true);
    match result {
        Err(e) => assert!(
            e.to_string().contains("No files found"),
            "Error should clearly state no files were found: {}",
            e
        ),
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn test_error_message_for_invalid_glob_pattern() {
    let result = collect_files(&["[invalid glob".to_string()], &[]);
    assert!(matches!(result, Err(InlinerError::Pattern(_))));

    let result = collect_files(&["*.vue".to_string()], &["[bad".to_string()]);
    assert!(matches!(result, Err(InlinerError::Pattern(_))));
}

#[test]
fn test_inconsistent_rewrite_flags_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let args = rewrite_args(&["-i".to_string(), format!("{}/*.vue", temp_dir.path().display())]);

    match run_rewrite(&args, true) {
        Err(InlinerError::InvalidInput(message)) => assert!(message.contains("--out-dir")),
        other => panic!("expected InvalidInput, got {:?}", other.map(|s| s.files_processed)),
    }
}

#[test]
fn test_unreadable_template_counts_as_failed() {
    let temp_dir = TempDir::new().unwrap();
    let template = temp_dir.path().join("bad.vue");
    fs::write(&template, [0xffu8, 0xfe, 0x00]).unwrap();

    let args = rewrite_args(&[
        "-i".to_string(),
        template.display().to_string(),
        "--dry-run".to_string(),
        "--compiler".to_string(),
        "plain".to_string(),
    ]);

    let summary = run_rewrite(&args, true).unwrap();
    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.files_failed, 1);
}

#[test]
fn test_scan_error_names_the_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("binary.vue"), [0xc3u8, 0x28]).unwrap();

    let args = ScanArgs {
        input: vec![format!("{}/*.vue", temp_dir.path().display())],
        exclude: vec![],
        output: Some(temp_dir.path().join("classes.json")),
    };

    let error = run_scan(&args).unwrap_err();
    assert!(error.to_string().contains("binary.vue"), "{}", error);
}

#[test]
fn test_config_errors() {
    let temp_dir = TempDir::new().unwrap();

    let missing = InlinerConfig::from_file(&temp_dir.path().join("nope.yaml"));
    assert!(missing.is_err());

    let bad_yaml = temp_dir.path().join("bad.yaml");
    fs::write(&bad_yaml, "theme: [unterminated").unwrap();
    match InlinerConfig::from_file(&bad_yaml) {
        Err(InlinerError::ConfigError { message }) => assert!(message.contains("YAML"), "{}", message),
        other => panic!("expected a config error, got {:?}", other),
    }

    let bad_json = temp_dir.path().join("bad.json");
    fs::write(&bad_json, "{\"compiler\": \"sass\"}").unwrap();
    match InlinerConfig::from_file(&bad_json) {
        Err(InlinerError::ConfigError { message }) => assert!(message.contains("JSON"), "{}", message),
        other => panic!("expected a config error, got {:?}", other),
    }

    let toml = temp_dir.path().join("inliner.toml");
    fs::write(&toml, "").unwrap();
    assert!(matches!(InlinerConfig::from_file(&toml), Err(InlinerError::ConfigError { .. })));
}

#[test]
fn test_missing_stylesheet_degrades_to_empty() {
    let temp_dir = TempDir::new().unwrap();
    let config = InlinerConfig {
        stylesheet: Some(temp_dir.path().join("missing.css")),
        ..InlinerConfig::default()
    };
    let compiler = |sheet: &str, _: &[String]| -> Result<String> { Ok(sheet.to_string()) };
    let resolver = StyleResolver::new(config, Arc::new(compiler), Arc::new(StyleCache::new()));

    assert!(resolver.resolve_classes(&["flex"]).is_empty());
    assert!(resolver.rewrite_template("<div class=\"flex\"></div>", "x.vue").is_none());
    assert!(resolver.variables().is_empty());
}

#[test]
fn test_compiler_failure_is_not_memoized() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let healthy = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&healthy);
    let compiler = move |_: &str, classes: &[String]| -> Result<String> {
        if classes.is_empty() || flag.load(Ordering::SeqCst) {
            Ok(".flex { display: flex; }".to_string())
        } else {
            Err(InlinerError::CompilerError("transient".to_string()))
        }
    };
    let resolver = StyleResolver::new(InlinerConfig::default(), Arc::new(compiler), Arc::new(StyleCache::new()));

    assert!(resolver.resolve_classes(&["flex"]).is_empty());
    healthy.store(true, Ordering::SeqCst);
    assert_eq!(resolver.resolve_classes(&["flex"])["flex"]["display"], "flex");
}
