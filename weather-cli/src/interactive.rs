use anyhow::Result;
use inquire::{InquireError, Select, Text};
use std::fmt;
use tokio::task::block_in_place;
use tracing::debug;
use weather_core::{DisplayUnit, FetchError, Orchestrator, PreferenceController};

use crate::render;

#[derive(Debug, Clone)]
enum Action {
    Search,
    CurrentLocation,
    Saved(String),
    RemoveSaved,
    ClearSaved,
    SwitchUnits(DisplayUnit),
    ToggleTheme,
    Accent,
    Refresh,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Search => f.write_str("Search a city"),
            Action::CurrentLocation => f.write_str("Use current location"),
            Action::Saved(name) => write!(f, "Weather for {name}"),
            Action::RemoveSaved => f.write_str("Remove a saved city"),
            Action::ClearSaved => f.write_str("Clear all saved cities"),
            Action::SwitchUnits(DisplayUnit::Metric) => f.write_str("Switch to °C / m/s / km"),
            Action::SwitchUnits(DisplayUnit::Imperial) => f.write_str("Switch to °F / mph / miles"),
            Action::ToggleTheme => f.write_str("Toggle dark/light mode"),
            Action::Accent => f.write_str("Pick accent colour"),
            Action::Refresh => f.write_str("Refresh view"),
            Action::Quit => f.write_str("Quit"),
        }
    }
}

fn menu(app: &Orchestrator) -> Vec<Action> {
    let view = app.view();
    let mut actions = vec![Action::Search, Action::CurrentLocation];
    actions.extend(view.saved_cities.names().iter().cloned().map(Action::Saved));
    if !view.saved_cities.is_empty() {
        actions.push(Action::RemoveSaved);
        actions.push(Action::ClearSaved);
    }
    actions.push(Action::SwitchUnits(match view.display_unit {
        DisplayUnit::Metric => DisplayUnit::Imperial,
        DisplayUnit::Imperial => DisplayUnit::Metric,
    }));
    actions.extend([Action::ToggleTheme, Action::Accent, Action::Refresh, Action::Quit]);
    actions
}

/// Prompts block, so they run on a blocking-capable worker while the
/// orchestrator's timers keep ticking on the others.
fn prompt<T>(f: impl FnOnce() -> Result<T, InquireError>) -> Result<Option<T>> {
    match block_in_place(f) {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Fetch failures are already in the view, and the render below shows them.
fn log_outcome(result: Result<(), FetchError>) {
    if let Err(err) = result {
        debug!(error = ?err, "lookup failed; message left in view");
    }
}

pub async fn run(app: Orchestrator, prefs: &mut PreferenceController) -> Result<()> {
    loop {
        let Some(action) = prompt(|| Select::new("What next?", menu(&app)).prompt())? else {
            return Ok(());
        };

        match action {
            Action::Search => {
                let initial = app.view().city_input;
                let Some(city) = prompt(|| {
                    Text::new("City:").with_initial_value(&initial).prompt()
                })?
                else {
                    continue;
                };
                app.set_city_input(&city);
                log_outcome(app.submit(&city).await);
            }
            Action::CurrentLocation => log_outcome(app.use_current_location().await),
            Action::Saved(name) => log_outcome(app.select_saved_city(&name).await),
            Action::RemoveSaved => {
                let names = app.view().saved_cities.names().to_vec();
                if let Some(name) = prompt(|| Select::new("Remove which city?", names).prompt())? {
                    app.remove_saved_city(&name)?;
                }
            }
            Action::ClearSaved => app.clear_saved_cities()?,
            Action::SwitchUnits(unit) => app.set_display_unit(unit),
            Action::ToggleTheme => {
                prefs.toggle_dark_mode()?;
            }
            Action::Accent => {
                let current = prefs.accent_color().to_string();
                if let Some(hex) =
                    prompt(|| Text::new("Accent colour:").with_initial_value(&current).prompt())?
                {
                    if let Err(err) = prefs.set_accent_color(&hex) {
                        println!("! {err}");
                    }
                }
            }
            Action::Refresh => {}
            Action::Quit => return Ok(()),
        }

        println!();
        print!("{}", render::view(&app.view(), prefs.state()));
        print!("{}", render::preferences(prefs.state()));
        println!();
    }
}
