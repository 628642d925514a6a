/// ToneFX - interactive shell over the effect controllers
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tonefx_core::{CoreConfig, EffectEngines, EffectStores, EffectSuite};
use tonefx_shell_lib::{parse_line, render, resolve, MainPresenter, Step, UiEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tonefx")]
#[command(about = "Audio effect configuration shell", long_about = None)]
struct Cli {
    /// Directory holding the configuration records
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Core configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with shell output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonefx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path),
        None => CoreConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let stores = EffectStores::open_json(&config).context("Failed to open configuration stores")?;
    let suite = Arc::new(EffectSuite::start(
        EffectEngines::simulated(),
        stores,
        &config,
    ));
    suite
        .ready()
        .await
        .context("Effect controllers failed to start")?;
    tracing::info!("ToneFX ready");

    let (presenter, ui_events) = MainPresenter::new(suite.clone());
    let result = repl(&presenter, ui_events).await;

    drop(presenter);
    suite.shutdown();
    result
}

async fn repl(
    presenter: &MainPresenter,
    mut ui_events: mpsc::UnboundedReceiver<UiEvent>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", render(&presenter.state()));
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    prompt()?;
                    continue;
                }

                let step = parse_line(&line)
                    .map_err(|e| e.to_string())
                    .and_then(|command| resolve(command, &presenter.state()));
                match step {
                    Ok(Step::Quit) => break,
                    Ok(Step::Show) => println!("{}", render(&presenter.state())),
                    Ok(Step::Dispatch(action)) => {
                        // Failures are reported through ui_events
                        let _ = presenter.dispatch(action).await;
                    }
                    Err(message) => println!("{}", message.trim_end()),
                }
                prompt()?;
            }
            Some(event) = ui_events.recv() => {
                match event {
                    UiEvent::PresetAdded(preset) => {
                        println!("Added preset '{}' with id {}", preset.name, preset.id)
                    }
                    UiEvent::InvalidPresetName => println!("Preset name must not be blank"),
                    UiEvent::Notice(message) => println!("! {message}"),
                }
            }
        }
    }
    Ok(())
}

fn prompt() -> anyhow::Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}
