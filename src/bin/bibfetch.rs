use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bibfetch::app::{
    AppOptions, build_controller, fetch_report, library_listing, provider_listing,
};
use bibfetch::config::{ConfigLoader, ResolvedConfig};
use bibfetch::controller::RequestController;
use bibfetch::domain::LibraryMode;
use bibfetch::error::BibError;
use bibfetch::outcome::Resolution;
use bibfetch::output::{JsonOutput, OutputMode, TextOutput};
use bibfetch::task::Completion;

const TICK: Duration = Duration::from_millis(120);

#[derive(Parser)]
#[command(name = "bibfetch")]
#[command(about = "Fetch bibliographic entries by DOI or ISBN into a local library")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    library: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look up an identifier and merge the result into the library")]
    Fetch(FetchArgs),
    #[command(about = "List lookup providers, marking the current default")]
    Providers,
    #[command(about = "Print the library")]
    Library,
}

#[derive(Args)]
struct FetchArgs {
    identifier: Option<String>,

    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    mode: Option<LibraryMode>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(report_exit_code(&report))
        }
    }
}

fn report_exit_code(report: &miette::Report) -> u8 {
    report.downcast_ref::<BibError>().map_or(1, map_exit_code)
}

fn map_exit_code(error: &BibError) -> u8 {
    match error {
        BibError::UnknownProvider(_)
        | BibError::NoProviders
        | BibError::ConfigRead(_)
        | BibError::ConfigParse(_) => 2,
        err if err.is_provider_failure() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(library) = cli.library {
        config.library_path = Utf8PathBuf::from(library);
    }

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, config, output_mode, cli.json),
        Commands::Providers => {
            let listing = provider_listing(&config)?;
            if cli.json {
                JsonOutput::print_providers(&listing).into_diagnostic()?;
            } else {
                TextOutput::print_providers(&listing).into_diagnostic()?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Library => {
            let listing = library_listing(&config)?;
            if cli.json {
                JsonOutput::print_library(&listing).into_diagnostic()?;
            } else {
                TextOutput::print_library(&listing).into_diagnostic()?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_fetch(
    args: FetchArgs,
    mut config: ResolvedConfig,
    output_mode: OutputMode,
    json: bool,
) -> miette::Result<ExitCode> {
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    let interactive = matches!(output_mode, OutputMode::Interactive);
    let mut controller = build_controller(
        &config,
        AppOptions {
            acknowledge_notifications: interactive,
        },
    )?;

    if let Some(provider) = &args.provider {
        controller.select_provider(provider)?;
    }
    let identifier = args.identifier.unwrap_or_default();
    controller.set_identifier_text(&identifier);
    let provider = controller.selected_provider().name().to_string();

    controller.start()?;
    let resolution = if interactive {
        eprintln!("looking up '{identifier}' via {provider} (esc to cancel)");
        wait_interactive(&mut controller)?
    } else {
        wait_blocking(&mut controller)
    };

    let code = match &resolution {
        Resolution::Inserted | Resolution::QueuedForReview | Resolution::Cancelled => {
            ExitCode::SUCCESS
        }
        Resolution::NotFound | Resolution::EmptyIdentifier => ExitCode::from(2),
        Resolution::Failed { .. } => ExitCode::from(3),
    };

    let report = fetch_report(&controller, &provider, &identifier, resolution);
    if json {
        JsonOutput::print_fetch(&report).into_diagnostic()?;
    } else {
        TextOutput::print_fetch(&report).into_diagnostic()?;
    }
    Ok(code)
}

fn wait_blocking(controller: &mut RequestController) -> Resolution {
    loop {
        let Some(completion) = controller.receive(TICK) else {
            continue;
        };
        if let Some(resolution) = controller.complete(completion) {
            return resolution;
        }
    }
}

fn wait_interactive(controller: &mut RequestController) -> miette::Result<Resolution> {
    loop {
        // Raw mode is off while a completion is handled so dialogs render.
        enable_raw_mode().into_diagnostic()?;
        let polled = poll_for_completion(controller);
        disable_raw_mode().into_diagnostic()?;
        if let Some(resolution) = controller.complete(polled?) {
            return Ok(resolution);
        }
    }
}

fn poll_for_completion(controller: &mut RequestController) -> miette::Result<Completion> {
    loop {
        if let Some(completion) = controller.receive(TICK) {
            return Ok(completion);
        }
        if !event::poll(Duration::ZERO).into_diagnostic()? {
            continue;
        }
        if let Event::Key(key) = event::read().into_diagnostic()? {
            if is_cancel_key(key) {
                controller.cancel();
            }
        }
    }
}

fn is_cancel_key(key: KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
