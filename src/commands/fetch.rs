use homebot::alerts::{AlertSource, FetchOutcome, HttpAlertFetcher, MessageRenderer, NotificationKind};
use homebot::error::Result;

/// Fetch one alert and print its rendered notification
pub async fn fetch(url: String, kind: NotificationKind) -> Result<()> {
    let fetcher = HttpAlertFetcher::new()?;
    let renderer = MessageRenderer::new()?;

    match fetcher.fetch(&url).await? {
        FetchOutcome::Found(alert) => {
            tracing::debug!(alert_id = %alert.id, state = %alert.state, "alert fetched");
            println!("{}", renderer.render(&alert, kind)?);
        }
        FetchOutcome::NotFound => {
            println!("alert not found: {url}");
        }
    }

    Ok(())
}
