use clap::Parser;
use statcube::{CliArgs, CubeConfig, ErrorCode, LoggingConfig, error_code_of, init_logging, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    let logging_config = LoggingConfig::from_env();
    let _guard = match init_logging(logging_config) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("error: {error:#}");
            return exit_code(ErrorCode::Internal);
        }
    };

    let cli = CliArgs::parse();

    // Fail fast before any table is read.
    let config = match CubeConfig::from_args(cli).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "invalid configuration");
            eprintln!("error: {error:#}");
            return exit_code(ErrorCode::Configuration);
        }
    };

    match run(&config) {
        Ok(report) => {
            tracing::info!(
                cube = %report.kind,
                output = %report.output.display(),
                triples = report.triples,
                observations = report.stats.observations,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            let code = error_code_of(&error);
            tracing::error!(
                error = %format!("{error:#}"),
                error_code = code.code(),
                category = code.category(),
                "cube build failed"
            );
            eprintln!("error: {error:#}");
            exit_code(code)
        }
    }
}

fn exit_code(code: ErrorCode) -> ExitCode {
    ExitCode::from(u8::try_from(code.code()).unwrap_or(1))
}
