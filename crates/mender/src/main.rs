use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use mender_engine::Mender;
use mender_engine::config::ConfigLoader;
use mender_engine::driver::{DomDriver, HtmlDriver};
use mender_engine::intent::{ElementType, Intent};
use mender_engine::protocol::HealingAction;
use mender_engine::selector;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mender", version, about = "Resolve, heal and synthesize element selectors")]
struct Args {
    #[command(flatten)]
    page: PageArgs,

    /// Config file (defaults to ./mender.yaml, then ~/.mender/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON-lines pattern store; overrides the config file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Print engine metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs)]
struct PageArgs {
    /// Static HTML file to run against
    #[arg(long, conflicts_with = "cdp")]
    html: Option<PathBuf>,

    /// DevTools websocket of a running browser
    #[arg(long)]
    cdp: Option<String>,

    /// Page URL reported for an HTML file (used for learned-pattern context)
    #[arg(long, requires = "html")]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Find the element matching a semantic description
    Resolve {
        /// button, input, link or any
        #[arg(long = "type", default_value = "any")]
        element_type: ElementType,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        aria_label: Option<String>,
        #[arg(long)]
        placeholder: Option<String>,
    },
    /// Perform an action, healing the selector if it no longer works
    Execute {
        /// click, fill, select or check
        #[arg(long)]
        action: String,
        #[arg(long)]
        selector: String,
        #[arg(long)]
        value: Option<String>,
        /// Hint such as "email" used for synonyms and resolver fallback
        #[arg(long)]
        intent: Option<String>,
    },
    /// Produce a stable selector for the first element matching `selector`
    Synthesize {
        #[arg(long)]
        selector: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout carries JSON results only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    if args.store.is_some() {
        config.store.path = args.store.clone();
    }

    let mut driver = open_driver(&args.page).await?;
    let mut engine = Mender::from_config(config).await?;

    let ok = run(&mut engine, driver.as_mut(), args.command).await?;

    if args.metrics {
        eprintln!("{}", serde_json::to_string_pretty(engine.metrics())?);
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn open_driver(page: &PageArgs) -> anyhow::Result<Box<dyn DomDriver>> {
    if let Some(ws) = &page.cdp {
        info!("Connecting to {}", ws);
        let driver = mender_h::connect(ws).await?;
        return Ok(Box::new(driver));
    }
    let Some(path) = &page.html else {
        bail!("either --html or --cdp is required");
    };
    let mut driver = HtmlDriver::from_file(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if let Some(url) = &page.url {
        driver = driver.with_url(url.clone());
    }
    Ok(Box::new(driver))
}

/// Run one command and print its JSON result. Returns whether it succeeded.
async fn run(
    engine: &mut Mender,
    driver: &mut dyn DomDriver,
    command: Command,
) -> anyhow::Result<bool> {
    match command {
        Command::Resolve {
            element_type,
            purpose,
            text,
            aria_label,
            placeholder,
        } => {
            let intent = Intent {
                element_type,
                purpose,
                text,
                aria_label,
                placeholder,
            };
            let result = engine.resolve(driver, &intent).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(result.found)
        }
        Command::Execute {
            action,
            selector,
            value,
            intent,
        } => {
            let action = HealingAction::parse(&action, selector, value, intent)?;
            let result = engine.execute(driver, &action).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(result.success)
        }
        Command::Synthesize { selector: target } => {
            let matches = selector::locate(driver, &target).await?;
            let Some(&element) = matches.first() else {
                bail!("no element matches '{}'", target);
            };
            let synthesized = engine.synthesize(driver, element).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "selector": synthesized }))?
            );
            Ok(true)
        }
    }
}
