// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod console;
mod input;
mod weather;

use std::error::Error;
use std::io::{Stdout, Write};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use flight_tracker::{Mutation, OpenSkySource, PlanespottersImages, Poller, RegionFilter, Renderer};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use config::AppConfig;
use console::{ConsoleRenderer, MAJOR_AIRPORTS};
use input::{parse_line, Input};
use weather::WeatherLayer;

/// Live flight tracker for the OpenSky Network feed
#[derive(Parser, Debug)]
#[command(name = "skywatch", version, about)]
struct Cli {
    /// Region filter (none, europe, north-america, asia, south-america, africa, oceania)
    #[arg(long)]
    region: Option<RegionFilter>,

    /// Seconds between polls
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Keep the selected flight centered
    #[arg(long)]
    follow: bool,

    /// Remove markers after this many polls without the flight
    #[arg(long, value_name = "POLLS")]
    evict_after: Option<u32>,

    /// Do not show airport landmarks
    #[arg(long)]
    no_airports: bool,

    /// Poll once, print the result and exit
    #[arg(long)]
    once: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the config file path and exit
    #[arg(long)]
    config_path: bool,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Overlay command-line options on the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(interval) = self.interval {
            config.poll_interval_secs = interval;
        }
        if self.follow {
            config.follow_enabled = true;
        }
        if self.evict_after.is_some() {
            config.evict_after_polls = self.evict_after;
        }
        if self.no_airports {
            config.show_airports = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}, using defaults", e);
        AppConfig::default()
    });
    cli.apply(&mut config);

    if cli.save_config {
        config.save()?;
        info!("Saved settings to {}", AppConfig::get_config_path()?.display());
    }

    let store = config.bookmark_store();
    info!("Saved flights file: {}", store.path().display());

    let mut poller = Poller::spawn(
        config.poller_config(),
        Arc::new(OpenSkySource::new(
            config.states_url.clone(),
            config.tracks_url.clone(),
        )),
        Arc::new(PlanespottersImages::new()),
        Box::new(store),
    );

    let mut renderer = ConsoleRenderer::new(std::io::stdout());
    if config.show_airports {
        renderer.set_landmarks(&MAJOR_AIRPORTS);
    }
    if config.show_weather {
        show_weather(&mut renderer, &config, Some(config.weather_layer));
    }

    if cli.once {
        run_once(&mut poller, &mut renderer).await;
    } else {
        run_interactive(&mut poller, &mut renderer, &config).await?;
    }

    poller.shutdown();
    Ok(())
}

/// Apply batches until the first poll has been rendered.
async fn run_once(poller: &mut Poller, renderer: &mut ConsoleRenderer<Stdout>) {
    while let Some(batch) = poller.recv().await {
        renderer.apply_all(&batch);
        if batch.iter().any(|m| matches!(m, Mutation::SetCount(_))) {
            debug!("{} markers after first poll", renderer.marker_count());
            break;
        }
    }
}

async fn run_interactive(
    poller: &mut Poller,
    renderer: &mut ConsoleRenderer<Stdout>,
    config: &AppConfig,
) -> Result<(), Box<dyn Error>> {
    renderer.print("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            batch = poller.recv() => match batch {
                Some(batch) => renderer.apply_all(&batch),
                None => {
                    warn!("Poller stopped");
                    break;
                }
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if handle_line(&line, poller, renderer, config).await.is_break() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, continuing without commands");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    stdin_open = false;
                }
            },
            result = &mut ctrl_c => {
                result?;
                info!("Interrupted, shutting down");
                break;
            }
        }
        std::io::stdout().flush()?;
    }

    Ok(())
}

async fn handle_line(
    line: &str,
    poller: &Poller,
    renderer: &mut ConsoleRenderer<Stdout>,
    config: &AppConfig,
) -> ControlFlow<()> {
    let parsed = match parse_line(line) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return ControlFlow::Continue(()),
        Err(e) => {
            renderer.apply(&Mutation::Notify(e.to_string()));
            return ControlFlow::Continue(());
        }
    };

    match parsed {
        Input::Command(command) => {
            if !poller.send(command).await {
                return ControlFlow::Break(());
            }
        }
        Input::Interval(interval) => {
            poller.set_interval(interval);
            renderer.apply(&Mutation::Notify(format!(
                "Polling every {}",
                describe_interval(poller.current_interval())
            )));
        }
        Input::Weather(layer) => show_weather(renderer, config, layer),
        Input::Airports(true) => renderer.set_landmarks(&MAJOR_AIRPORTS),
        Input::Airports(false) => renderer.set_landmarks(&[]),
        Input::Help => renderer.print(input::HELP),
        Input::Quit => return ControlFlow::Break(()),
    }

    ControlFlow::Continue(())
}

fn show_weather(
    renderer: &mut ConsoleRenderer<Stdout>,
    config: &AppConfig,
    layer: Option<WeatherLayer>,
) {
    let Some(layer) = layer else {
        renderer.set_overlay(None);
        return;
    };

    match weather::resolve_api_key(config.openweathermap_api_key.as_deref()) {
        Some(key) => {
            debug!("Weather tiles: {}", layer.tile_url_template(&key));
            renderer.set_overlay(Some(layer.display_name().to_string()));
        }
        None => renderer.apply(&Mutation::Notify(format!(
            "Weather overlay needs an OpenWeatherMap API key (set {})",
            weather::API_KEY_ENV
        ))),
    }
}

fn describe_interval(interval: Duration) -> String {
    match interval.as_secs() {
        1 => "second".to_string(),
        secs => format!("{secs} seconds"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "skywatch",
            "--region",
            "europe",
            "--interval",
            "30",
            "--follow",
            "--evict-after",
            "3",
            "--no-airports",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.region, RegionFilter::Europe);
        assert_eq!(config.poll_interval_secs, 30);
        assert!(config.follow_enabled);
        assert_eq!(config.evict_after_polls, Some(3));
        assert!(!config.show_airports);
    }

    #[test]
    fn test_cli_keeps_config_when_unset() {
        let cli = Cli::try_parse_from(["skywatch"]).unwrap();
        let mut config = AppConfig {
            region: RegionFilter::Asia,
            follow_enabled: true,
            ..AppConfig::default()
        };
        cli.apply(&mut config);

        assert_eq!(config.region, RegionFilter::Asia);
        assert!(config.follow_enabled);
        assert!(config.show_airports);
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["skywatch", "--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["skywatch", "--region", "atlantis"]).is_err());
    }

    #[test]
    fn test_describe_interval() {
        assert_eq!(describe_interval(Duration::from_secs(1)), "second");
        assert_eq!(describe_interval(Duration::from_secs(20)), "20 seconds");
    }
}
