// ABOUTME: Interactive `imgup setup` flows that authorize a backend and store its keys
// ABOUTME: OAuth1 PIN flows for SmugMug and Flickr, OAuth2 for GoToSocial, pasted token for Mastodon

use crate::cli::SetupTarget;
use crate::cli_output::CliOutput;
use crate::config::{ConfigMap, ConfigStore};
use crate::constants::env;
use anyhow::{anyhow, bail, Context, Result};
use dialoguer::{Input, Password, Select};
use imgup_sdk::backends::FediverseClient;
use imgup_sdk::credentials::{keys, normalize_instance, FediverseCredentials};
use imgup_sdk::oauth::{self, extract_verifier, GoToSocialAuth, PinFlow, SmugMugApi};
use imgup_sdk::oauth1::TokenPair;
use imgup_sdk::FediverseFlavor;
use secrecy::{ExposeSecret, SecretString};

pub async fn run(target: SetupTarget, store: &ConfigStore, output: &CliOutput) -> Result<()> {
    match target {
        SetupTarget::Smugmug => smugmug(store, output).await,
        SetupTarget::Flickr => flickr(store, output).await,
        SetupTarget::Gotosocial => gotosocial(store, output).await,
        SetupTarget::Mastodon => mastodon(store, output).await,
    }
}

fn prompt(label: &str, initial: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(label);
    if let Some(initial) = initial.filter(|v| !v.is_empty()) {
        input = input.default(initial.to_string());
    }
    let value = input
        .validate_with(|v: &String| -> Result<(), &str> {
            if v.trim().is_empty() {
                Err("Value cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .with_context(|| format!("Failed to read {label}"))?;
    Ok(value.trim().to_string())
}

fn prompt_secret(label: &str) -> Result<SecretString> {
    let value = Password::new()
        .with_prompt(label)
        .interact()
        .with_context(|| format!("Failed to read {label}"))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        bail!("{label} cannot be empty");
    }
    Ok(SecretString::from(value))
}

/// Print the approval URL and read back the verifier.
fn read_verifier(authorize_url: &str, output: &CliOutput) -> Result<String> {
    output.info("Open this URL in your browser and approve access:");
    println!("\n  {authorize_url}\n");
    let pasted = prompt("Paste the PIN or the full callback URL", None)?;
    extract_verifier(&pasted).ok_or_else(|| anyhow!("No oauth_verifier found in {pasted:?}"))
}

fn store_tokens(config: &mut ConfigMap, token_key: &str, secret_key: &str, tokens: &TokenPair) {
    config.insert(token_key.to_string(), tokens.token.clone());
    config.insert(
        secret_key.to_string(),
        tokens.secret.expose_secret().to_string(),
    );
}

async fn smugmug(store: &ConfigStore, output: &CliOutput) -> Result<()> {
    let existing = store.load()?;
    let consumer_key = prompt(
        "SmugMug API key",
        existing.get(keys::CONSUMER_KEY).map(String::as_str),
    )?;
    let consumer_secret = match existing.get(keys::CONSUMER_SECRET) {
        Some(secret) if !secret.is_empty() => SecretString::from(secret.clone()),
        _ => prompt_secret("SmugMug API secret")?,
    };

    let flow = PinFlow::smugmug(&consumer_key, consumer_secret.clone())?;
    let pending = flow.begin().await?;
    let verifier = read_verifier(&pending.authorize_url, output)?;
    let access = flow.complete(&pending, &verifier).await?;
    output.success("SmugMug authorized");

    let albums = SmugMugApi::new(&consumer_key, consumer_secret.clone(), &access)?
        .albums()
        .await?;
    if albums.is_empty() {
        bail!("No albums found; create one on SmugMug and run setup again");
    }
    let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
    let choice = Select::new()
        .with_prompt("Upload into which album?")
        .items(&names)
        .default(0)
        .interact()
        .context("Failed to read album choice")?;
    let album = &albums[choice];

    store.update(|config| {
        config.insert(keys::CONSUMER_KEY.to_string(), consumer_key.clone());
        config.insert(
            keys::CONSUMER_SECRET.to_string(),
            consumer_secret.expose_secret().to_string(),
        );
        store_tokens(
            config,
            keys::ACCESS_TOKEN,
            keys::ACCESS_TOKEN_SECRET,
            &access,
        );
        config.insert(keys::ALBUM_ID.to_string(), album.key.clone());
    })?;

    output.success(&format!(
        "SmugMug setup complete; uploading to \"{}\" ({})",
        album.name,
        store.path().display()
    ));
    Ok(())
}

async fn flickr(store: &ConfigStore, output: &CliOutput) -> Result<()> {
    let existing = store.load()?;
    let from_env = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());

    let api_key = match from_env(env::FLICKR_KEY) {
        Some(key) => key,
        None => prompt(
            "Flickr API key",
            existing.get(keys::FLICKR_KEY).map(String::as_str),
        )?,
    };
    let api_secret = match from_env(env::FLICKR_SECRET)
        .or_else(|| existing.get(keys::FLICKR_SECRET).cloned().filter(|v| !v.is_empty()))
    {
        Some(secret) => SecretString::from(secret),
        None => prompt_secret("Flickr API secret")?,
    };

    // Saved before authorizing so a failed dance does not lose them
    store.update(|config| {
        config.insert(keys::FLICKR_KEY.to_string(), api_key.clone());
        config.insert(
            keys::FLICKR_SECRET.to_string(),
            api_secret.expose_secret().to_string(),
        );
    })?;

    let flow = PinFlow::flickr(&api_key, api_secret)?;
    let pending = flow.begin().await?;
    let verifier = read_verifier(&pending.authorize_url, output)?;
    let access = flow.complete(&pending, &verifier).await?;

    store.update(|config| {
        store_tokens(
            config,
            keys::FLICKR_ACCESS_TOKEN,
            keys::FLICKR_ACCESS_TOKEN_SECRET,
            &access,
        );
    })?;

    output.success(&format!(
        "Flickr setup complete ({})",
        store.path().display()
    ));
    Ok(())
}

async fn gotosocial(store: &ConfigStore, output: &CliOutput) -> Result<()> {
    let flavor = FediverseFlavor::GoToSocial;
    let instance = normalize_instance(&prompt(
        "GoToSocial instance URL (e.g. https://social.example.com)",
        None,
    )?);

    output.info(&format!(
        "Create an application at {instance}/settings/applications/new"
    ));
    eprintln!("    Name: imgup");
    eprintln!("    Redirect URI: {}", oauth::redirect_uri());
    eprintln!("    Scopes: read write");

    let client_id = prompt("Client ID", None)?;
    let client_secret = prompt_secret("Client secret")?;

    output.info("Opening browser for authorization...");
    let token = {
        let instance = instance.clone();
        let client_id = client_id.clone();
        let client_secret = client_secret.clone();
        // oauth2's blocking client must stay off the async runtime
        tokio::task::spawn_blocking(move || {
            GoToSocialAuth::new(&instance, client_id, client_secret)?.login()
        })
        .await
        .context("Authorization task failed")??
    };

    store.update(|config| {
        config.insert(flavor.instance_key(), instance.clone());
        config.insert(flavor.token_key(), token.expose_secret().to_string());
        config.insert(format!("{}_client_id", flavor.prefix()), client_id.clone());
        config.insert(
            format!("{}_client_secret", flavor.prefix()),
            client_secret.expose_secret().to_string(),
        );
    })?;

    output.success("GoToSocial setup complete");
    Ok(())
}

async fn mastodon(store: &ConfigStore, output: &CliOutput) -> Result<()> {
    let instance = normalize_instance(&prompt(
        "Mastodon instance URL (e.g. https://mastodon.social)",
        None,
    )?);

    output.info(&format!(
        "Create an application at {instance}/settings/applications with scopes read and write, then copy its access token"
    ));
    let token = prompt_secret("Access token")?;

    output.info("Testing connection...");
    let credentials =
        FediverseCredentials::new(FediverseFlavor::Mastodon, &instance, token.clone());
    let account = FediverseClient::new(&credentials)?
        .verify_credentials()
        .await
        .context("Failed to connect; check the instance URL and token")?;
    output.success(&format!(
        "Connected as {}",
        handle(&account.username, account.acct.as_deref(), &instance)
    ));

    // Saved under both prefixes so either backend name works
    store.update(|config| {
        for flavor in [FediverseFlavor::Mastodon, FediverseFlavor::GoToSocial] {
            config.insert(flavor.instance_key(), instance.clone());
            config.insert(flavor.token_key(), token.expose_secret().to_string());
        }
    })?;

    output.success("Mastodon setup complete; use --backend mastodon or --backend gotosocial");
    Ok(())
}

/// `@user@host` for display.
fn handle(username: &str, acct: Option<&str>, instance: &str) -> String {
    match acct.filter(|a| a.contains('@')) {
        Some(acct) => format!("@{acct}"),
        None => {
            let host = url::Url::parse(instance)
                .ok()
                .and_then(|u| u.host_str().map(String::from))
                .unwrap_or_else(|| instance.to_string());
            format!("@{username}@{host}")
        }
    }
}
