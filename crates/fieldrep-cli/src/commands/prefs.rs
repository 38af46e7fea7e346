use fieldrep_core::models::ThemeMode;
use fieldrep_core::AppContext;

use crate::commands::common::print_json;
use crate::error::CliError;

pub async fn run_prefs(
    context: &AppContext,
    theme: Option<ThemeMode>,
    language: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let preferences = &context.preferences;
    if let Some(theme) = theme {
        preferences.set_theme(theme).await?;
    }
    if let Some(language) = language {
        preferences.set_language(language).await?;
    }

    let current = preferences.load().await?;
    if as_json {
        return print_json(&current);
    }
    println!("theme:    {}", current.theme.as_str());
    println!("language: {}", current.language);
    Ok(())
}
