//! `businesses` command

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;

use bookings_cli::api::{BookingBusiness, BookingsContainer};

use super::or_dash;
use crate::cli::GlobalArgs;
use crate::cli::session::connect;

#[derive(Debug, Subcommand)]
pub enum BusinessesCommands {
    /// List the businesses the signed-in user can see
    List,

    /// Create a new business
    Create {
        /// Display name of the new business
        name: String,

        /// Contact email address
        #[arg(long)]
        email: Option<String>,

        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,
    },
}

pub async fn handle_businesses_command(command: BusinessesCommands, global: &GlobalArgs) -> Result<()> {
    let container = connect(global).await?;

    match command {
        BusinessesCommands::List => {
            let businesses = list_businesses(&container).await?;
            if businesses.is_empty() {
                println!("{}", "No booking businesses found.".yellow());
                return Ok(());
            }
            for business in &businesses {
                print_business_line(business);
            }
            println!();
            println!("{} businesses", businesses.len().to_string().bold());
        }
        BusinessesCommands::Create { name, email, phone } => {
            let business = create_business(&container, &name, email, phone).await?;
            println!(
                "Booking business created: {}",
                or_dash(business.id.as_deref()).bright_green().bold()
            );
        }
    }
    Ok(())
}

pub(crate) async fn list_businesses(container: &BookingsContainer) -> Result<Vec<BookingBusiness>> {
    container
        .booking_businesses()
        .collect_all()
        .await
        .context("Failed to list booking businesses")
}

/// POST a business carrying only the properties given
pub(crate) async fn create_business(
    container: &BookingsContainer,
    name: &str,
    email: Option<String>,
    phone: Option<String>,
) -> Result<BookingBusiness> {
    if name.trim().is_empty() {
        bail!("Business name cannot be empty");
    }

    let mut business = container.booking_businesses().new_entity_with_change_tracking()?;
    business.set_display_name(name.trim());
    if let Some(email) = email {
        business.set_email(email);
    }
    if let Some(phone) = phone {
        business.set_phone(phone);
    }

    println!("Creating new booking business...");
    container
        .save_changes(&mut business)
        .await
        .with_context(|| format!("Failed to create booking business '{}'", name.trim()))?;

    Ok(business.into_inner())
}

pub(crate) fn print_business_line(business: &BookingBusiness) {
    let published = match business.is_published {
        Some(true) => "published".green(),
        Some(false) => "not published".dimmed(),
        None => "".normal(),
    };
    println!(
        "{}  {}  {}",
        or_dash(business.display_name.as_deref()).bold(),
        or_dash(business.id.as_deref()).dimmed(),
        published
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_business_posts_display_name_only() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1.0/bookingBusinesses"))
            .and(body_json(serde_json::json!({ "displayName": "Contoso Lunch" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "ContosoLunch@contoso.onmicrosoft.com",
                "displayName": "Contoso Lunch"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let root = Url::parse(&format!("{}/api/v1.0/", server.uri())).unwrap();
        let container = BookingsContainer::new(root, String::new).unwrap();

        let business = create_business(&container, " Contoso Lunch ", None, None)
            .await
            .unwrap();
        assert_eq!(
            business.id.as_deref(),
            Some("ContosoLunch@contoso.onmicrosoft.com")
        );
    }

    #[tokio::test]
    async fn test_create_business_rejects_blank_name() {
        let root = Url::parse("https://bookings.office.net/api/v1.0/").unwrap();
        let container = BookingsContainer::new(root, String::new).unwrap();

        assert!(create_business(&container, "  ", None, None).await.is_err());
    }
}
