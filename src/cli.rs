use crate::client::{BroadcastRequest, GaiaClient, Scenario};
use crate::config::Config;
use crate::location::{detect_language, resolve_coordinates};
use crate::store::dedupe_events;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gaia")]
#[command(about = "Planetary sentiment globe for the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a config file (default: ~/.config/gaia/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the GAIA backend
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Latitude to broadcast from
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude to broadcast from
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Language tag sent with broadcasts (default: from the locale)
    #[arg(long, global = true)]
    pub lang: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the current events once and print them as JSON
    Events {
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Send a message to the backend for analysis
    Broadcast {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Switch the backend simulation scenario
    Scenario {
        /// ai_panic or mars_colony
        name: Scenario,
    },
}

impl Cli {
    /// Overlay command line flags on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(api) = &self.api {
            config.api.base_url = api.clone();
        }
        if let Some(lat) = self.lat {
            config.broadcast.lat = Some(lat);
        }
        if let Some(lng) = self.lng {
            config.broadcast.lng = Some(lng);
        }
        if let Some(lang) = &self.lang {
            config.broadcast.lang = Some(lang.clone());
        }
    }
}

/// Broadcast language: configured value, else the locale.
pub fn broadcast_language(config: &Config) -> String {
    config
        .broadcast
        .lang
        .clone()
        .filter(|lang| !lang.trim().is_empty())
        .unwrap_or_else(detect_language)
}

pub async fn run_command(command: Command, config: &Config) -> Result<()> {
    let client = GaiaClient::new(&config.api)?;

    match command {
        Command::Events { pretty } => {
            let events = client.fetch_events().await?;
            let events = dedupe_events(events, config.globe.max_events);
            let output = if pretty {
                serde_json::to_string_pretty(&events)?
            } else {
                serde_json::to_string(&events)?
            };
            println!("{}", output);
        }
        Command::Broadcast { text } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                bail!("Refusing to broadcast an empty message");
            }
            let at = resolve_coordinates(config.broadcast.location(), &mut rand::thread_rng());
            let request = BroadcastRequest::new(text, at, broadcast_language(config));

            let echoed = client
                .broadcast(&request)
                .await
                .context("Broadcast failed")?;
            match echoed {
                Some(event) => println!(
                    "Broadcast from {} analysed as {} ({})",
                    at,
                    event.sentiment.as_str().to_uppercase(),
                    event.confidence_label()
                ),
                None => println!("Broadcast from {} accepted", at),
            }
        }
        Command::Scenario { name } => {
            let ack = client
                .set_scenario(name)
                .await
                .context("Scenario switch failed")?;
            if !ack.success {
                bail!(
                    "Backend refused scenario {} (still running {})",
                    name,
                    ack.current_scenario
                );
            }
            println!("Scenario: {}", ack.current_scenario);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs_dashboard() {
        let cli = Cli::try_parse_from(["gaia"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_scenario() {
        let cli = Cli::try_parse_from(["gaia", "scenario", "mars_colony"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Scenario {
                name: Scenario::MarsColony
            })
        ));

        assert!(Cli::try_parse_from(["gaia", "scenario", "zombies"]).is_err());
    }

    #[test]
    fn test_parse_broadcast_words() {
        let cli = Cli::try_parse_from(["gaia", "broadcast", "hello", "world"]).unwrap();
        match cli.command {
            Some(Command::Broadcast { text }) => assert_eq!(text.join(" "), "hello world"),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["gaia", "broadcast"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "gaia",
            "--api",
            "http://gaia.example:9000",
            "--lat",
            "-33.87",
            "--lng",
            "151.21",
            "--lang",
            "fr",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.api.base_url, "http://gaia.example:9000");
        let location = config.broadcast.location().unwrap();
        assert_eq!(location.lat, -33.87);
        assert_eq!(location.lng, 151.21);
        assert_eq!(broadcast_language(&config), "fr");
    }

    #[test]
    fn test_flags_leave_config_alone_when_absent() {
        let cli = Cli::try_parse_from(["gaia", "events"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
