// src/main.rs

use editor_ci::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) => std::process::exit(status.exit_code()),
        Err(err) => {
            eprintln!("editor-ci error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<editor_ci::RunStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level, args.quiet)?;
    run(args).await
}
