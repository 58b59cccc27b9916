//! `publish` and `unpublish` commands

use anyhow::{Context, Result};
use colored::*;

use bookings_cli::api::{BookingBusiness, EntityRef};

use crate::cli::GlobalArgs;
use crate::cli::session::connect;

pub async fn handle_publish_command(
    business_id: &str,
    publish: bool,
    global: &GlobalArgs,
) -> Result<()> {
    let container = connect(global).await?;
    let business = container.booking_businesses().by_key(business_id);

    if publish {
        if let Some(url) = publish_business(&business).await? {
            println!("{}", url.cyan());
        }
    } else {
        println!("Unpublishing booking business public page...");
        business
            .unpublish()
            .await
            .with_context(|| format!("Failed to unpublish {business_id}"))?;
        println!("{}", "Public page hidden.".green());
    }
    Ok(())
}

/// Publish the public page and return its URL
pub(crate) async fn publish_business(
    business: &EntityRef<'_, BookingBusiness>,
) -> Result<Option<String>> {
    println!("Publishing booking business public page...");
    business
        .publish()
        .await
        .context("Failed to publish booking business")?;

    let refreshed = business
        .get_value()
        .await
        .context("Failed to read the published business")?;
    if refreshed.public_url.is_none() {
        log::warn!("Business {} was published but has no public URL", business.path());
    }
    Ok(refreshed.public_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookings_cli::api::BookingsContainer;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_publish_returns_public_url() {
        let server = MockServer::start().await;
        let business = "/api/v1.0/bookingBusinesses('contoso')";

        Mock::given(method("POST"))
            .and(path(format!("{business}/publish")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(business))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "contoso",
                "isPublished": true,
                "publicUrl": "https://outlook.office.com/owa/calendar/contoso/bookings/"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let root = Url::parse(&format!("{}/api/v1.0/", server.uri())).unwrap();
        let container = BookingsContainer::new(root, String::new).unwrap();

        let url = publish_business(&container.booking_businesses().by_key("contoso"))
            .await
            .unwrap();
        assert_eq!(
            url.as_deref(),
            Some("https://outlook.office.com/owa/calendar/contoso/bookings/")
        );
    }
}
