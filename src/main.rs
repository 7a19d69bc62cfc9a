use anyhow::Context;
use clap::Parser;
use faqkit::{
    build_info, Cli, Command, FaqKit, FaqKitError, OutputFormatter, OutputMode, UserFriendlyError,
};
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    load_env_files();

    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbosity_level(), cli.quiet) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return 1;
    }
    tracing::debug!("{}", build_info());

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let Some(command) = cli.command.clone() else {
        eprintln!("No job given. Run `faqkit --help` to see the available subcommands.");
        return 1;
    };

    let faqkit = match FaqKit::from_cli(&cli) {
        Ok(faqkit) => faqkit,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&command, &faqkit);
    }

    match faqkit.run(&command) {
        Ok(report) => {
            faqkit.output_formatter().print_job_report(&report);

            if report.has_warnings() {
                2 // Completed with warnings
            } else {
                0
            }
        }
        Err(e) => {
            faqkit.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &FaqKitError) -> i32 {
    match error {
        FaqKitError::Cancelled => 130, // Interrupted (SIGINT)
        FaqKitError::InputNotFound { .. } => 3,
        FaqKitError::Config { .. } => 4,
        FaqKitError::Backend { .. }
        | FaqKitError::BackendStatus { .. }
        | FaqKitError::MissingEnv { .. } => 5,
        _ => 1,
    }
}

/// `.env.local` first, so its values win over `.env`.
fn load_env_files() {
    for name in [".env.local", ".env"] {
        match dotenvy::from_filename(name) {
            Ok(_) | Err(dotenvy::Error::Io(_)) => {}
            Err(e) => eprintln!("Ignoring unreadable {}: {}", name, e),
        }
    }
}

/// RUST_LOG wins; otherwise `-v` picks the level. Logs go to stderr.
fn setup_logging(verbosity: u8, quiet: bool) -> anyhow::Result<()> {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(&directives).with_context(|| format!("invalid RUST_LOG value '{}'", directives))?
        }
        _ => EnvFilter::try_new(format!("faqkit={}", level))
            .context("invalid default log filter")?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .context("a global tracing subscriber is already set")?;

    Ok(())
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "faqkit.toml".to_string());

    if std::path::Path::new(&config_path).exists() && !cli.force {
        eprintln!(
            "Configuration file already exists: {} (pass --force to overwrite)",
            config_path
        );
        return 1;
    }

    match FaqKit::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  faqkit --config {} <job> ...", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(command: &Command, faqkit: &FaqKit) -> i32 {
    let formatter = faqkit.output_formatter();
    let config = faqkit.config();

    formatter.print_header(&format!("Dry run: {}", command.name()));

    let mut missing = 0;
    for input in command.inputs() {
        if input.exists() {
            formatter.success(&format!("Input found: {}", input.display()));
        } else {
            formatter.error(&format!("Input not found: {}", input.display()));
            missing += 1;
        }
    }

    if let Some(output) = command.output() {
        if output.exists() {
            formatter.warning(&format!(
                "Output exists and would need --force: {}",
                output.display()
            ));
        } else {
            formatter.info(&format!("Would write: {}", output.display()));
        }
    }

    formatter.info(&format!("Format whitelist: {}", config.formats.whitelist.join(", ")));
    formatter.info(&format!("Format deny-list: {}", config.formats.deny_list.join(", ")));
    formatter.info(&format!("Teaser limit: {} chars", config.teaser.limit));
    if let Some(ref catalog) = config.patch.series_catalog {
        formatter.info(&format!("Series catalog: {}", catalog.display()));
    }

    if command.uses_backend() {
        formatter.info(&format!(
            "Model: {} at {}",
            config.translate.model, config.translate.endpoint
        ));
        formatter.info(&format!(
            "Cache: {}",
            config.translate.cache_path.display()
        ));
        if let Some(pivot) = config.translate.pivot {
            formatter.info(&format!("Pivot: {}", pivot.display_name()));
        }
    }

    formatter.print_separator();
    if missing > 0 {
        formatter.error("Dry run found missing inputs");
        return 3;
    }
    formatter.success("Dry run completed successfully");
    0
}

fn print_startup_error(error: &FaqKitError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
