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

//! Line-oriented console input.

use std::time::Duration;

use flight_tracker::{Command, RegionFilter, UnknownRegion};
use thiserror::Error;

use crate::weather::WeatherLayer;

pub const HELP: &str = "\
Commands:
  select <icao24>        show details for a flight
  close                  hide the details panel
  filter <region>        none, europe, north-america, asia, south-america, africa, oceania
  follow on|off          keep the selected flight centered
  save                   save the selected flight
  saved <icao24>         center on a saved flight
  search <text>          center on the first callsign or icao24 match
  interval <seconds>     change the poll interval
  weather on|off|<layer> toggle the weather overlay (precipitation, clouds, wind)
  airports on|off        toggle airport landmarks
  help                   show this help
  quit                   exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Interval(Duration),
    /// `None` hides the overlay.
    Weather(Option<WeatherLayer>),
    Airports(bool),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("expected 'on' or 'off', got '{0}'")]
    InvalidToggle(String),

    #[error("interval must be a positive number of seconds, got '{0}'")]
    InvalidInterval(String),

    #[error("unknown weather layer '{0}'")]
    UnknownLayer(String),

    #[error(transparent)]
    Region(#[from] UnknownRegion),
}

/// Parse a console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_lowercase().as_str() {
        "select" | "show" => Input::Command(Command::SelectFlight(
            required(rest, "select")?.to_lowercase(),
        )),
        "close" | "deselect" => Input::Command(Command::Deselect),
        "filter" | "region" => Input::Command(Command::ChangeFilter(rest.parse::<RegionFilter>()?)),
        "follow" => Input::Command(Command::ToggleFollow(toggle(required(rest, "follow")?)?)),
        "save" | "bookmark" => Input::Command(Command::SaveBookmark),
        "saved" | "goto" => Input::Command(Command::ShowBookmark(
            required(rest, "saved")?.to_lowercase(),
        )),
        "search" | "find" => Input::Command(Command::SearchQuery(
            required(rest, "search")?.to_string(),
        )),
        "interval" => Input::Interval(interval(required(rest, "interval")?)?),
        "weather" => Input::Weather(weather(required(rest, "weather")?)?),
        "airports" => Input::Airports(toggle(required(rest, "airports")?)?),
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        _ => return Err(InputError::UnknownCommand(word.to_string())),
    };

    Ok(Some(input))
}

fn required<'a>(arg: &'a str, command: &'static str) -> Result<&'a str, InputError> {
    if arg.is_empty() {
        Err(InputError::MissingArgument(command))
    } else {
        Ok(arg)
    }
}

fn toggle(arg: &str) -> Result<bool, InputError> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(InputError::InvalidToggle(arg.to_string())),
    }
}

fn interval(arg: &str) -> Result<Duration, InputError> {
    match arg.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(InputError::InvalidInterval(arg.to_string())),
    }
}

fn weather(arg: &str) -> Result<Option<WeatherLayer>, InputError> {
    match arg.to_lowercase().as_str() {
        "off" => Ok(None),
        "on" => Ok(Some(WeatherLayer::default())),
        _ => WeatherLayer::parse(arg)
            .map(Some)
            .ok_or_else(|| InputError::UnknownLayer(arg.to_string())),
    }
}
