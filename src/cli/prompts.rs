//! Interactive prompts used by the operator menu.

use dialoguer::{theme::ColorfulTheme, FuzzySelect, Input, MultiSelect, Select};

use crate::engine::CityCatalog;
use crate::error::Result;
use crate::models::{Pollutant, Window};

pub fn prompt_city(catalog: &CityCatalog) -> Result<String> {
    let cities = catalog.all();
    let items: Vec<String> = cities
        .iter()
        .map(|c| format!("{} ({})", c.name, c.region))
        .collect();
    let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a city")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(cities[selection].id.clone())
}

/// Empty selection means "default cohort".
pub fn prompt_cities(catalog: &CityCatalog) -> Result<Vec<String>> {
    let cities = catalog.all();
    let items: Vec<&str> = cities.iter().map(|c| c.name.as_str()).collect();
    let selection = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select cities (space to toggle, enter for the default cohort)")
        .items(&items)
        .interact()?;
    Ok(selection
        .into_iter()
        .map(|i| cities[i].id.clone())
        .collect())
}

pub fn prompt_window() -> Result<Window> {
    let items: Vec<&str> = Window::ALL.iter().map(|w| w.key()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a time window")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(Window::ALL[selection])
}

/// Prompts for one concentration; blank input means "not measured".
pub fn prompt_concentration(pollutant: Pollutant) -> Result<Option<f64>> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} ({}, blank to skip)", pollutant.label(), pollutant.unit()))
        .allow_empty(true)
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if input.trim().is_empty() || input.trim().parse::<f64>().is_ok() {
                Ok(())
            } else {
                Err("Please enter a number".to_string())
            }
        })
        .interact_text()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(raw.parse::<f64>().ok())
}
