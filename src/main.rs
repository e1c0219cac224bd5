use anyhow::Context;
use clap::Parser;
use tailwind_inliner::{
    handle_pipe_command, init_logging, run_resolve, run_rewrite, run_scan, run_theme, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan(args) => {
            let classes = run_scan(&args).context("scan failed")?;
            log::info!("{} classes", classes.len());
        }
        Commands::Resolve(args) => {
            run_resolve(&args).context("resolve failed")?;
        }
        Commands::Rewrite(args) => {
            let summary = run_rewrite(&args, cli.verbose).context("rewrite failed")?;
            eprintln!("Rewrite finished!");
            eprintln!("  - Processed {} files", summary.files_processed);
            eprintln!("  - Changed {} files", summary.files_changed);
            if summary.files_failed > 0 {
                eprintln!("  - Failed {} files", summary.files_failed);
                std::process::exit(1);
            }
        }
        Commands::Theme(args) => {
            run_theme(&args).context("theme extraction failed")?;
        }
        Commands::Pipe(args) => {
            handle_pipe_command(args).await.context("pipe failed")?;
        }
    }

    Ok(())
}
