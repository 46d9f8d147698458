//! Prompt Visualizer terminal chat
//!
//! Usage:
//!   promptviz [--config <file>] [--url <url>] [--product <name> --version <v>] [--verbose]
//!
//! Example:
//!   promptviz --product Widget --version 2.0
//!   promptviz --model comparison --verbose

use anyhow::{Context, Result};
use colored::Colorize;
use promptviz::backend::HttpBackend;
use promptviz::highlight::{apply_highlights, Span};
use promptviz::orchestrator::{ChatOrchestrator, BACKEND_ERROR_MESSAGE};
use promptviz::registry::{self, DispatchMode};
use promptviz::session::Role;
use promptviz::ClientConfig;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn print_usage() {
    eprintln!(
        r#"
{} - Chat with and compare the Prompt Visualizer models

{}
    promptviz [OPTIONS]

{}
    -c, --config <FILE>     Config file (default: config.toml if present)
    -u, --url <URL>         Backend origin (default: http://127.0.0.1:5000)
    -p, --product <NAME>    Product to chat about
    -V, --version <VER>     Product version
    -m, --model <NAME>      Model option (id or display name)
    -v, --verbose           Show debug logging
    -h, --help              Print this help message

{}
    promptviz --product Widget --version 2.0
    promptviz -m comparison
    promptviz -m comparison-version -p Widget -V 2.0

{}
    /model [name]       Switch model option (no argument lists them)
    /suggest <text>     Ask the backend for prompt suggestions
    /instructions <t>   Stage an instruction fragment for the next send
    /resend             Re-send the last prompt with edited instructions
    /best               Rank the last comparison's answers
    /context            Show the retrieval documents
    /stats              Show per-model request statistics
    /clear              Reset the conversation
    /quit               Exit
"#,
        "promptviz".bold(),
        "USAGE:".bold(),
        "OPTIONS:".bold(),
        "EXAMPLES:".bold(),
        "COMMANDS:".bold(),
    );
}

struct CliArgs {
    config: Option<PathBuf>,
    url: Option<String>,
    product: Option<String>,
    version: Option<String>,
    model: Option<String>,
    verbose: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }

    let mut parsed = CliArgs {
        config: None,
        url: None,
        product: None,
        version: None,
        model: None,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    parsed.config = Some(PathBuf::from(&args[i]));
                }
            }
            "--url" | "-u" => {
                i += 1;
                if i < args.len() {
                    parsed.url = Some(args[i].clone());
                }
            }
            "--product" | "-p" => {
                i += 1;
                if i < args.len() {
                    parsed.product = Some(args[i].clone());
                }
            }
            "--version" | "-V" => {
                i += 1;
                if i < args.len() {
                    parsed.version = Some(args[i].clone());
                }
            }
            "--model" | "-m" => {
                i += 1;
                if i < args.len() {
                    parsed.model = Some(args[i].clone());
                }
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
            }
            other => {
                eprintln!("{} unknown argument: {}", "Warning:".yellow(), other);
            }
        }
        i += 1;
    }

    parsed
}

fn load_config(args: &CliArgs) -> Result<ClientConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| {
            let default = PathBuf::from("config.toml");
            default.exists().then_some(default)
        });

    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Some(url) = &args.url {
        config.base_url = url.clone();
    }
    Ok(config)
}

fn print_header(config: &ClientConfig, orch: &ChatOrchestrator) {
    let selected = orch.selected_model();
    eprintln!();
    eprintln!(
        "{}",
        "╭──────────────────────────────────────────────────────────────╮".blue()
    );
    eprintln!(
        "{}  {}                                      {}",
        "│".blue(),
        "Prompt Visualizer".bold(),
        "│".blue()
    );
    eprintln!(
        "{}",
        "├──────────────────────────────────────────────────────────────┤".blue()
    );
    eprintln!(
        "{}  {}  {}",
        "│".blue(),
        "Backend:".dimmed(),
        config.base_url
    );
    eprintln!(
        "{}  {}    {} {}",
        "│".blue(),
        "Model:".dimmed(),
        selected.icon,
        selected.name
    );
    if let (Some(product), Some(version)) = (
        &orch.state.selected_product,
        &orch.state.selected_version,
    ) {
        eprintln!(
            "{}  {}    {} {}",
            "│".blue(),
            "Scope:".dimmed(),
            product,
            version
        );
    }
    eprintln!(
        "{}",
        "╰──────────────────────────────────────────────────────────────╯".blue()
    );
    eprintln!();
}

fn print_card(title: &str, color: colored::Color, body: &str) {
    println!();
    println!("{}", format!("┌─ {title} ").color(color).bold());
    for line in body.lines() {
        println!("{} {}", "│".color(color), line);
    }
    println!("{}", "└─".color(color));
}

fn print_highlighted_card(title: &str, color: colored::Color, spans: &[Span]) {
    println!();
    println!("{}", format!("┌─ {title} ").color(color).bold());
    let rendered: String = spans
        .iter()
        .map(|span| match span {
            Span::Plain(text) => text.normal().to_string(),
            Span::Unique(text) => text.white().on_blue().to_string(),
        })
        .collect();
    for line in rendered.lines() {
        println!("{} {}", "│".color(color), line);
    }
    println!("{}", "└─".color(color));
}

fn list_models(orch: &ChatOrchestrator) {
    eprintln!("{}", "Model options:".bold());
    for option in registry::LLM_OPTIONS {
        let marker = if option.id == orch.selected_model().id {
            "●".green()
        } else {
            "○".dimmed()
        };
        eprintln!(
            "  {} {} {} {}  {}",
            marker,
            option.icon,
            option.name.color(option.color),
            format!("({})", option.id).dimmed(),
            option.description.dimmed()
        );
    }
}

fn render_responses(orch: &ChatOrchestrator) {
    if let Some(last) = orch.state.messages.last() {
        if last.role == Role::Bot && last.content == BACKEND_ERROR_MESSAGE {
            eprintln!("{} {}", "Error:".red().bold(), last.content);
            return;
        }
    }

    match orch.selected_model().mode {
        DispatchMode::Single => {
            if let Some(response) = orch.state.responses.first() {
                let option = registry::by_name(&response.model);
                let color = option.map(|o| o.color).unwrap_or(colored::Color::White);
                print_card(&response.model, color, &response.content);
            }
        }
        DispatchMode::Comparison => {
            for response in &orch.state.responses {
                let option = registry::by_name(&response.model);
                let color = option.map(|o| o.color).unwrap_or(colored::Color::White);
                print_card(&response.model, color, &response.content);
            }
            if orch.state.responses.len() > 1 {
                eprintln!("{}", "Use /best to rank the answers.".dimmed());
            }
        }
        DispatchMode::ComparisonVersion => {
            for response in &orch.state.version_responses {
                let chunks = orch
                    .state
                    .highlights
                    .as_deref()
                    .and_then(|highlights| {
                        highlights.iter().find(|h| h.version == response.version)
                    })
                    .map(|h| h.chunks.as_slice())
                    .unwrap_or_default();
                let spans = apply_highlights(&response.content, chunks);
                print_highlighted_card(&response.version, colored::Color::Magenta, &spans);
            }
            if orch.state.version_responses.len() > 1 {
                eprintln!("{}", "Use /best to rank the answers.".dimmed());
            }
        }
    }
}

fn print_context(orch: &ChatOrchestrator) {
    if orch.state.context_files.is_empty() {
        eprintln!("{}", "No context files for this scope yet.".dimmed());
        return;
    }
    for file in &orch.state.context_files {
        let mut preview: String = file.document.chars().take(400).collect();
        if preview.len() < file.document.len() {
            preview.push('…');
        }
        print_card(&file.collection_name, colored::Color::Cyan, &preview);
    }
}

fn print_stats(orch: &ChatOrchestrator) {
    let rows = orch.stats().snapshot();
    if rows.is_empty() {
        eprintln!("{}", "No requests dispatched yet.".dimmed());
        return;
    }
    eprintln!(
        "{:<20} {:>9} {:>6} {:>6} {:>10}",
        "Model".bold(),
        "requests",
        "ok",
        "failed",
        "mean ms"
    );
    for (model, requests, successes, failures, mean) in rows {
        eprintln!(
            "{model:<20} {requests:>9} {successes:>6} {failures:>6} {:>10}",
            mean.map(|ms| ms.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
}

/// Resolve the chat scope from flags or an interactive pick
async fn select_scope(orch: &mut ChatOrchestrator, args: &CliArgs) -> Result<()> {
    let products: Vec<String> = orch.state.products.keys().cloned().collect();
    if products.is_empty() {
        anyhow::bail!("backend reported no products");
    }

    let product = match &args.product {
        Some(product) => product.clone(),
        None => {
            eprintln!("{}", "Select a product:".bold());
            for (idx, product) in products.iter().enumerate() {
                eprintln!("  {} {}", format!("{}.", idx + 1).dimmed(), product);
            }
            read_choice(&products)?
        }
    };

    let versions = orch
        .state
        .products
        .get(&product)
        .cloned()
        .with_context(|| format!("unknown product: {product}"))?;

    let version = match &args.version {
        Some(version) => version.clone(),
        None => {
            eprintln!("{}", format!("Select a version of {product}:").bold());
            for (idx, version) in versions.iter().enumerate() {
                eprintln!("  {} {}", format!("{}.", idx + 1).dimmed(), version);
            }
            read_choice(&versions)?
        }
    };

    orch.set_scope(Some(product), Some(version))
        .await
        .context("failed to fetch context for the selected scope")?;
    Ok(())
}

fn read_choice(options: &[String]) -> Result<String> {
    loop {
        eprint!("{} ", "❯".green());
        std::io::stderr().flush().ok();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            anyhow::bail!("stdin closed");
        }
        let input = line.trim();

        if let Ok(idx) = input.parse::<usize>() {
            if idx >= 1 && idx <= options.len() {
                return Ok(options[idx - 1].clone());
            }
        }
        if let Some(found) = options.iter().find(|o| o.as_str() == input) {
            return Ok(found.clone());
        }
        eprintln!("{}", "Pick a listed number or name.".yellow());
    }
}

async fn run_command(orch: &mut ChatOrchestrator, command: &str, rest: &str) -> Result<bool> {
    match command {
        "/quit" | "/exit" => return Ok(false),
        "/help" => print_usage(),
        "/model" => {
            if rest.is_empty() {
                list_models(orch);
            } else {
                match orch.select_model(rest) {
                    Ok(()) => {
                        let selected = orch.selected_model();
                        eprintln!(
                            "Switched to {} {}",
                            selected.icon,
                            selected.name.color(selected.color).bold()
                        );
                    }
                    Err(err) => eprintln!("{} {}", "Error:".red().bold(), err),
                }
            }
        }
        "/clear" => {
            orch.clear();
            eprintln!("{}", "Conversation cleared.".dimmed());
        }
        "/best" => {
            match orch.selected_model().mode {
                DispatchMode::ComparisonVersion => orch.best_version_answer().await,
                _ => orch.best_answer().await,
            }
            if let Some(best) = &orch.state.best_answer {
                print_card("🏆 Best Answer", colored::Color::Green, best);
            }
        }
        "/suggest" => {
            if rest.is_empty() {
                eprintln!("{}", "Usage: /suggest <text>".yellow());
            } else {
                let suggestions = orch.suggestions(rest).await;
                if suggestions.is_empty() {
                    eprintln!("{}", "No suggestions.".dimmed());
                }
                for suggestion in suggestions {
                    eprintln!("  {} {}", "·".dimmed(), suggestion);
                }
            }
        }
        "/instructions" => {
            orch.set_edited_instructions(rest);
            eprintln!("{}", "Staged instruction fragment. Preview:".dimmed());
            for line in orch.state.combined_instructions().lines() {
                eprintln!("  {}", line.dimmed());
            }
            eprintln!("{}", "Use /resend to apply it.".dimmed());
        }
        "/resend" => {
            orch.send_instructions().await;
            render_responses(orch);
        }
        "/context" => print_context(orch),
        "/stats" => print_stats(orch),
        other => eprintln!("{} unknown command: {}", "Warning:".yellow(), other),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;

    let backend = HttpBackend::with_timeout(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    );
    let mut orch = ChatOrchestrator::new(config.clone(), Arc::new(backend));

    if let Some(model) = &args.model {
        if let Err(err) = orch.select_model(model) {
            eprintln!("{} {}", "Error:".red().bold(), err);
            list_models(&orch);
            std::process::exit(1);
        }
    }

    orch.load_products()
        .await
        .context("failed to reach the backend for the product list")?;

    select_scope(&mut orch, &args).await?;
    print_header(&config, &orch);
    eprintln!(
        "{}",
        "Type a message, or /help for commands.".dimmed()
    );

    let stdin = std::io::stdin();
    loop {
        eprint!("{} ", "❯".green());
        std::io::stderr().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (name, rest) = match command.split_once(char::is_whitespace) {
                Some((name, rest)) => (format!("/{name}"), rest.trim()),
                None => (format!("/{command}"), ""),
            };
            if !run_command(&mut orch, &name, rest).await? {
                break;
            }
            continue;
        }

        orch.send(input).await;
        render_responses(&orch);
    }

    Ok(())
}
