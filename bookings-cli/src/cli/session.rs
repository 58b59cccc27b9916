//! Sign-in and container construction shared by all commands

use anyhow::{Context, Result, bail};
use colored::*;
use dialoguer::Input;

use bookings_cli::api::{
    Authority, BookingsContainer, ContainerOptions, TokenClient, default_scopes,
};
use bookings_cli::config::Settings;

use super::GlobalArgs;

impl GlobalArgs {
    /// Command line flags win over the settings file and environment
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(root) = &self.service_root {
            settings.service_root = Some(root.clone());
        }
        if let Some(proxy) = &self.proxy {
            settings.proxy = Some(proxy.clone());
        }
        if let Some(size) = self.max_page_size {
            settings.max_page_size = Some(size);
        }
    }
}

/// Load settings, sign in and build a container
pub async fn connect(global: &GlobalArgs) -> Result<BookingsContainer> {
    let mut settings = Settings::load().context("Failed to load settings")?;
    global.apply_to(&mut settings);

    let tenant_id = settings.require_tenant_id()?;
    let client_id = settings.require_client_id()?;

    let username = match settings.username.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(username) => username.to_string(),
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };
    if username.trim().is_empty() {
        bail!("A username is required to sign in");
    }

    let password = match settings.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => password.to_string(),
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };
    if password.is_empty() {
        bail!("A password is required to sign in");
    }

    let scopes = settings.scopes.clone().unwrap_or_else(default_scopes);
    let authority = Authority::for_tenant(tenant_id).context("Invalid tenant ID")?;
    let token = TokenClient::new(authority, client_id)
        .acquire_token_by_username_password(username.trim(), &password, &scopes)
        .await
        .context("Sign-in failed")?;
    println!("Signed in as {}", username.trim().bright_green());
    if token.is_expired() {
        bail!("The token endpoint returned an already expired token");
    }
    match token.expires_at() {
        Some(at) => log::info!("Token valid until {}", at.to_rfc3339()),
        None => log::warn!("Token lifetime of {}s is out of range", token.expires_in),
    }

    let options = ContainerOptions::builder()
        .max_page_size(settings.max_page_size)
        .continue_on_error(global.continue_on_error)
        .web_proxy(settings.proxy_url()?)
        .build();
    if let Some(proxy) = &options.web_proxy {
        log::info!("Using proxy {}", proxy);
    }

    let authorization = token.authorization_header();
    let container = BookingsContainer::with_options(
        settings.service_root_url()?,
        move || authorization.clone(),
        options,
    )
    .context("Failed to create the Bookings container")?;

    Ok(container)
}
