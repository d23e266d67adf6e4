//! The harvest command.

use std::path::PathBuf;

use photoharvest::config::HarvestConfig;
use photoharvest::harvest::PhotoCategory;
use photoharvest::session::Credentials;

pub struct HarvestOptions {
    pub ids: Vec<String>,
    pub categories: Vec<PhotoCategory>,
    pub out_dir: PathBuf,
    pub credentials: Option<Credentials>,
    pub remember: bool,
}

#[cfg(feature = "browser")]
pub async fn cmd_harvest(config: &HarvestConfig, options: HarvestOptions) -> anyhow::Result<()> {
    use console::style;

    use photoharvest::browser::ChromiumSession;
    use photoharvest::download::HttpDownloader;
    use photoharvest::harvest::{HarvestedPhoto, PhotoHarvester};

    use crate::cli::icons::{dim_arrow, error, success, warn};

    let session = ChromiumSession::start(config.browser.clone()).await?;
    let page = session.desktop_page().await?;
    let mobile_page = if options.categories.contains(&PhotoCategory::Comment) {
        Some(session.mobile_page().await?)
    } else {
        None
    };

    if let Some(ref credentials) = options.credentials {
        restore_or_sign_in(config, &page, mobile_page.as_ref(), credentials, options.remember)
            .await?;
    }

    let downloader = HttpDownloader::new(&options.out_dir, &config.browser)?;
    let mut harvester = PhotoHarvester::new(&page, config);
    if let Some(ref mobile) = mobile_page {
        harvester = harvester.with_comment_page(mobile);
    }

    let pb = indicatif::ProgressBar::new(options.ids.len() as u64);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {}", e))?
            .progress_chars("#>-"),
    );

    let mut photos: Vec<HarvestedPhoto> = Vec::new();
    let mut failed_listings = 0;

    for id in &options.ids {
        pb.set_message(id.clone());

        if let Err(e) = harvester.open_listing(id).await {
            pb.suspend(|| eprintln!("{} {}: {}", error(), id, e));
            failed_listings += 1;
            pb.inc(1);
            continue;
        }

        let report = harvester
            .harvest_report(id, &options.categories, &downloader)
            .await;
        pb.suspend(|| {
            for (category, e) in report.failures() {
                eprintln!("{} {} {} pass failed: {}", warn(), id, category, e);
            }
        });

        let harvested: Vec<HarvestedPhoto> = report.photos().cloned().collect();
        pb.suspend(|| {
            eprintln!(
                "{} {} {} photos",
                success(),
                style(id).cyan(),
                harvested.len()
            )
        });
        photos.extend(harvested);
        pb.inc(1);
    }
    pb.finish_and_clear();

    drop(harvester);
    page.close().await;
    if let Some(mobile) = mobile_page {
        mobile.close().await;
    }
    session.close().await;

    eprintln!(
        "  {} {} photos written under {}",
        dim_arrow(),
        photos.len(),
        options.out_dir.display()
    );
    println!("{}", serde_json::to_string_pretty(&photos)?);

    if failed_listings == options.ids.len() {
        anyhow::bail!("No listing could be opened");
    }
    Ok(())
}

/// Resume a stored session for `credentials`, or sign in and store a new one.
#[cfg(feature = "browser")]
async fn restore_or_sign_in(
    config: &HarvestConfig,
    page: &photoharvest::browser::ChromiumPage,
    mobile_page: Option<&photoharvest::browser::ChromiumPage>,
    credentials: &Credentials,
    remember: bool,
) -> anyhow::Result<()> {
    use photoharvest::browser::ChromiumSession;
    use photoharvest::harvest::{accept_consent, navigate_if_needed};
    use photoharvest::session::{sign_in, FileSessionStore, SessionStore};

    let store = FileSessionStore::new(&config.output.sessions_dir);
    let identifier = credentials.identifier(ChromiumSession::BROWSER_NAME);

    let state = if store.exists(&identifier).await {
        tracing::info!("Resuming stored session for {}", credentials.username);
        store.load(&identifier).await?
    } else {
        navigate_if_needed(page, &config.site.base_url).await?;
        if let Some(ref consent) = config.site.consent {
            accept_consent(page, consent).await?;
        }
        sign_in(page, &config.site.login, credentials).await?;
        let state = page.capture_session().await?;
        if remember {
            store.save(&identifier, &state).await?;
        }
        state
    };

    page.apply_session(&state).await?;
    if let Some(mobile) = mobile_page {
        mobile.apply_session(&state).await?;
    }
    Ok(())
}

#[cfg(not(feature = "browser"))]
pub async fn cmd_harvest(_config: &HarvestConfig, _options: HarvestOptions) -> anyhow::Result<()> {
    Err(anyhow::anyhow!(
        "Browser support not compiled. Rebuild with: cargo build --features browser"
    ))
}
