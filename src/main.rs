use std::process::ExitCode;

use log::debug;

use validate_tei::{
    Cli, Output, OutputFormat, RunConfig, SummaryRenderer, SystemEnvProvider, ValidationPipeline,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse_args();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = RunConfig::from_cli(&cli)?;
    debug!("schema '{}'", config.schema.title);
    debug!("rng file '{}'", config.schema.rng_file.display());

    let report = ValidationPipeline::new(config.clone()).run().await?;

    let env = SystemEnvProvider;
    let renderer = SummaryRenderer::new(&env);
    match config.format {
        OutputFormat::Human => {
            print!("{}", Output::new(config.verbosity).format_report(&report, &config.schema.title));
            // The step summary is part of the CI contract whenever the
            // runner provides the target file.
            if env_has_step_summary(&env) {
                renderer
                    .write(&renderer.render(&report, &config.schema.title))
                    .await?;
            }
        }
        OutputFormat::Markdown => {
            renderer
                .write(&renderer.render(&report, &config.schema.title))
                .await?;
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if !config.warn_only && report.has_errors() {
        eprintln!("Invalid documents");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn env_has_step_summary(env: &dyn validate_tei::EnvProvider) -> bool {
    env.get("GITHUB_STEP_SUMMARY")
        .is_some_and(|path| !path.is_empty())
}
