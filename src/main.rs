// ABOUTME: Entry point for the token-chat terminal client
// Sets up config, terminal and event loop, or a line mode when not on a TTY

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use crossbeam_channel::{bounded, Receiver, Sender};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use token_chat::{
    app::{config::AppConfig, state::AppEvent, SessionSettings, SessionSummary},
    chat::{OpenAiClient, SessionController},
    ui::{ChatView, ViewAction},
    utils::CostCalculator,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = load_config(&matches)?;

    // Logs go to stderr so they stay out of the TUI's stdout
    if config.debug {
        tracing_subscriber::fmt()
            .with_env_filter("token_chat=debug")
            .with_writer(io::stderr)
            .init();
    }

    config.validate()?;

    let pricing = match &config.pricing_path {
        Some(path) => CostCalculator::load_from_file(path)
            .with_context(|| format!("loading pricing table {}", path.display()))?,
        None => CostCalculator::new(),
    };
    pricing.validate(&config.models)?;

    tracing::debug!(
        api_base = %config.api_base,
        model = %config.default_model,
        pricing_version = pricing.version(),
        "Configuration loaded"
    );

    let client = OpenAiClient::new(config.api_base.clone());
    let controller = SessionController::new(
        Box::new(client),
        Arc::new(pricing),
        SessionSettings::from_config(&config),
    );

    // Non-interactive mode - one prompt per stdin line
    if !atty::is(atty::Stream::Stdout) || !atty::is(atty::Stream::Stdin) {
        return run_line_mode(controller).await;
    }

    let mut terminal = setup_terminal()?;

    let (event_tx, event_rx) = bounded::<AppEvent>(100);
    spawn_input_handler(event_tx);

    let mut view = ChatView::new(config.models.clone(), &config.default_model);
    let mut controller = controller;

    let result = run_event_loop(&mut terminal, &mut view, &mut controller, event_rx).await;

    restore_terminal(&mut terminal)?;

    print_summary(&controller.end());

    result
}

fn build_cli() -> Command {
    Command::new("token-chat")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Token-Chat Team")
        .about("Terminal chat client for OpenAI models with per-turn cost tallying")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Model selected at startup"),
        )
        .arg(
            Arg::new("pricing")
                .short('p')
                .long("pricing")
                .value_name("FILE")
                .help("Pricing table (TOML or JSON, USD per million tokens)"),
        )
        .arg(
            Arg::new("max-tokens")
                .long("max-tokens")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("Maximum tokens per reply"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
}

fn load_config(matches: &ArgMatches) -> Result<AppConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => {
            let mut config = AppConfig::load_from(&PathBuf::from(path))?;
            config.apply_env();
            config
        }
        None => AppConfig::load()?,
    };

    if let Some(model) = matches.get_one::<String>("model") {
        config.default_model = model.clone();
    }

    if let Some(path) = matches.get_one::<String>("pricing") {
        config.pricing_path = Some(path.into());
    }

    if let Some(max) = matches.get_one::<u32>("max-tokens") {
        config.max_tokens = *max;
    }

    config.debug = matches.get_flag("debug");

    Ok(config)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_handler(tx: Sender<AppEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(100)) {
            let app_event = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Input(key),
                Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                _ => continue,
            };
            if tx.send(app_event).is_err() {
                break;
            }
        }
    });
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut ChatView,
    controller: &mut SessionController,
    event_rx: Receiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| view.render(f, controller.session()))?;

        let Ok(event) = event_rx.recv_timeout(Duration::from_millis(50)) else {
            continue;
        };

        match event {
            AppEvent::Input(key) => match view.handle_key(key) {
                ViewAction::Quit => break,
                ViewAction::Submit(text) => {
                    // Show the prompt while the call blocks the loop
                    if controller.session().has_api_key() {
                        view.set_pending(Some(text.clone()));
                        terminal.draw(|f| view.render(f, controller.session()))?;
                    }
                    if let Err(e) = controller.on_submit(&text).await {
                        tracing::debug!(error = %e, "Turn ended with a notice");
                    }
                    view.set_pending(None);
                }
                ViewAction::SetApiKey(raw) => {
                    if !controller.set_api_key(&raw) {
                        tracing::debug!("API key cleared");
                    }
                }
                ViewAction::SelectModel(model) => {
                    if let Err(e) = controller.select_model(&model) {
                        tracing::warn!(error = %e, "Model selection rejected");
                    }
                }
                ViewAction::NewSession => {
                    controller.reset();
                }
                ViewAction::None => {}
            },
            AppEvent::Resize(_, _) => {
                // Redrawn on the next iteration
            }
        }
    }

    Ok(())
}

async fn run_line_mode(mut controller: SessionController) -> Result<()> {
    println!("Chatbot - A chatbot powered by OpenAI ({})", controller.session().selected_model());
    for message in controller.session().transcript.iter() {
        println!("{}: {}", message.role.display_name(), message.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match controller.on_submit(&line).await {
            Ok(Some(report)) => {
                println!("Assistant: {}", report.reply);
                println!("Cost: {}", report.cost.formatted());
            }
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    print_summary(&controller.end());
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    if summary.turns > 0 {
        println!(
            "Session cost: {} over {} turn(s)",
            CostCalculator::format_cost(summary.total_cost),
            summary.turns
        );
    }
}
