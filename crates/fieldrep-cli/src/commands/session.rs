use fieldrep_core::models::UserData;
use fieldrep_core::util::normalize_text_option;
use fieldrep_core::AppContext;

use crate::commands::common::{normalize_identifier, print_json};
use crate::error::CliError;

pub async fn run_login(
    context: &AppContext,
    uid: &str,
    email: Option<String>,
    name: Option<String>,
) -> Result<(), CliError> {
    let uid = normalize_identifier(uid)?;
    let mut user = UserData::new(uid);
    if user.uid.is_guest() {
        return Err(CliError::GuestSession);
    }
    user.email = normalize_text_option(email);
    user.display_name = normalize_text_option(name);

    context.session.sign_in(user.clone()).await?;
    println!("Signed in as {}", user.uid);

    let pending = context.engine.pending_count().await?;
    if pending > 0 {
        println!("{pending} change(s) waiting to sync");
    }
    Ok(())
}

pub async fn run_logout(context: &AppContext) -> Result<(), CliError> {
    match context.session.current_user() {
        Some(user) => {
            let pending = context.session.sign_out().await?;
            println!("Signed out {}", user.uid);
            if pending > 0 {
                println!(
                    "{pending} change(s) still waiting to sync; they will sync under the next user to sign in"
                );
            }
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

pub fn run_whoami(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let user = context.session.current_user();
    if as_json {
        return print_json(&user);
    }

    match user {
        Some(user) => {
            let mut line = user.uid.to_string();
            if let Some(name) = &user.display_name {
                line.push_str(&format!("  {name}"));
            }
            if let Some(email) = &user.email {
                line.push_str(&format!("  <{email}>"));
            }
            println!("{line}");
        }
        None => println!("guest (reports stay on this device)"),
    }
    Ok(())
}
