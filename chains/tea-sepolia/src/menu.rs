use crate::app::App;
use anyhow::Result;
use core_logic::{
    parse_account_pairs, parse_address_list, AmountRange, CredentialStore, DelayRange,
    RecipientStore,
};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use tracing::{error, info, warn};

const ITEMS: [&str; 8] = [
    "Add wallets and token contracts",
    "Add recipient addresses",
    "Set delay range",
    "Set amount range",
    "Add RPC endpoint",
    "Run batch now",
    "Start daily schedule",
    "Exit",
];

/// Interactive main menu. Returns when the user picks Exit.
pub async fn run(app: &mut App) -> Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        println!();
        let selection = Select::with_theme(&theme)
            .with_prompt("Tea Sepolia dispatcher")
            .default(0)
            .items(&ITEMS)
            .interact()?;

        let outcome = match selection {
            0 => add_accounts(app, &theme).await,
            1 => add_recipients(app, &theme).await,
            2 => set_delay(app, &theme),
            3 => set_amount(app, &theme),
            4 => add_endpoint(app, &theme).await,
            5 => run_batch(app, &theme).await,
            6 => app.run_schedule().await.map(|_| ()),
            _ => break,
        };

        if let Err(e) = outcome {
            error!("{}: {:#}", ITEMS[selection], e);
        }
    }

    Ok(())
}

async fn add_accounts(app: &App, theme: &ColorfulTheme) -> Result<()> {
    let input: String = Input::with_theme(theme)
        .with_prompt("privateKey,tokenContract pairs (comma separated, 'native' for the coin)")
        .interact_text()?;

    let parsed = parse_account_pairs(&input, app.chain_id());
    for err in &parsed.rejected {
        warn!("Rejected: {}", err);
    }
    if parsed.accounts.is_empty() {
        println!("No valid pairs entered.");
        return Ok(());
    }

    app.credentials().append(&parsed.accounts).await?;
    for account in &parsed.accounts {
        info!("Added {} for {}", account.credential.label(), account.target);
    }
    println!(
        "✅ Saved {} account(s) to {}",
        parsed.accounts.len(),
        app.credentials().path().display()
    );
    Ok(())
}

async fn add_recipients(app: &App, theme: &ColorfulTheme) -> Result<()> {
    let input: String = Input::with_theme(theme)
        .with_prompt("Recipient addresses (comma or space separated)")
        .interact_text()?;

    let (addresses, rejected) = parse_address_list(&input);
    for err in &rejected {
        warn!("Rejected: {}", err);
    }
    if addresses.is_empty() {
        println!("No valid addresses entered.");
        return Ok(());
    }

    let total = app.recipients().append(&addresses).await?;
    println!(
        "✅ Added {} recipient(s); {} now stored in {}",
        addresses.len(),
        total,
        app.recipients().path().display()
    );
    Ok(())
}

fn set_delay(app: &mut App, theme: &ColorfulTheme) -> Result<()> {
    let min: u64 = Input::with_theme(theme)
        .with_prompt("Minimum delay (seconds)")
        .default(app.config.min_delay_secs)
        .interact_text()?;
    let max: u64 = Input::with_theme(theme)
        .with_prompt("Maximum delay (seconds)")
        .default(app.config.max_delay_secs.max(min))
        .interact_text()?;

    let range = DelayRange::new(min, max)?;
    app.config.min_delay_secs = range.min_secs();
    app.config.max_delay_secs = range.max_secs();
    println!("✅ Delay set to {}s - {}s", min, max);
    Ok(())
}

fn set_amount(app: &mut App, theme: &ColorfulTheme) -> Result<()> {
    let min: f64 = Input::with_theme(theme)
        .with_prompt("Minimum amount (tokens)")
        .default(app.config.min_amount)
        .interact_text()?;
    let max: f64 = Input::with_theme(theme)
        .with_prompt("Maximum amount (tokens)")
        .default(app.config.max_amount.max(min))
        .interact_text()?;

    let range = AmountRange::new(min, max)?;
    app.config.min_amount = range.min();
    app.config.max_amount = range.max();
    println!("✅ Amount set to {} - {}", min, max);
    Ok(())
}

async fn add_endpoint(app: &mut App, theme: &ColorfulTheme) -> Result<()> {
    let url: String = Input::with_theme(theme)
        .with_prompt("RPC URL")
        .interact_text()?;

    match app.add_endpoint(&url).await? {
        Some(block) => println!(
            "✅ {} is live at block {} ({} endpoint(s) configured)",
            url.trim(),
            block,
            app.config.rpc_urls.len()
        ),
        None => println!(
            "⚠️ {} added but not responding ({} endpoint(s) configured)",
            url.trim(),
            app.config.rpc_urls.len()
        ),
    }
    Ok(())
}

async fn run_batch(app: &App, theme: &ColorfulTheme) -> Result<()> {
    let count: u32 = Input::with_theme(theme)
        .with_prompt("Transfers per account")
        .default(10)
        .interact_text()?;

    let stats = app.run_batch(count).await?;
    println!(
        "Batch finished: {} ok, {} failed ({:.1}% success)",
        stats.success,
        stats.failed,
        stats.success_rate()
    );
    Ok(())
}
