//! Interactive walkthrough
//!
//! Signs in, picks or creates a business, makes sure it has a staff member,
//! books an appointment for tomorrow afternoon, lists every appointment
//! across pages and finally publishes the public booking page.

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use colored::*;
use dialoguer::Input;

use bookings_cli::api::BookingBusiness;

use super::appointments::{
    NewAppointment, create_appointment, print_appointment_stream, tomorrow_at_one_pm,
};
use super::businesses::{create_business, list_businesses};
use super::or_dash;
use super::publish::publish_business;
use super::staff::ensure_staff_member;
use crate::cli::GlobalArgs;
use crate::cli::session::connect;

pub async fn handle_demo_command(global: &GlobalArgs) -> Result<()> {
    let container = connect(global).await?;

    let businesses = list_businesses(&container).await?;
    for business in &businesses {
        println!("{}", or_dash(business.display_name.as_deref()));
    }

    let prompt = if businesses.is_empty() {
        "Enter a name for a new booking business, or leave empty to exit"
    } else {
        "Type the name of the booking business to use or a new name to create one, or leave empty to exit"
    };
    let name: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .context("Failed to read business name")?;
    let name = name.trim();
    if name.is_empty() {
        return Ok(());
    }

    let business = match find_by_display_name(&businesses, name) {
        Some(existing) => {
            println!("Using existing booking business.");
            existing.clone()
        }
        None => {
            let created = create_business(&container, name, None, None).await?;
            println!(
                "Booking business created: {}",
                or_dash(created.id.as_deref()).bright_green()
            );
            created
        }
    };
    let business_id = business
        .id
        .as_deref()
        .context("The booking business has no id")?;
    let business = container.booking_businesses().by_key(business_id);

    let staff = ensure_staff_member(&business).await?;

    let request = NewAppointment {
        customer_name: "John Doe".to_string(),
        customer_email: "customer@contoso.com".to_string(),
        service_id: None,
        staff_ids: staff.id.into_iter().collect(),
        start: tomorrow_at_one_pm(Utc::now()),
        duration: TimeDelta::hours(1),
        reminder: Some(TimeDelta::hours(1)),
    };
    create_appointment(&business, request).await?;
    println!("Appointment created.");

    // The server caps appointments per response, so this walks every page
    print_appointment_stream(&business.appointments()).await?;

    if let Some(url) = publish_business(&business).await? {
        println!("{}", url.cyan().underline());
    }

    println!("{}", "Done.".green());
    Ok(())
}

fn find_by_display_name<'a>(
    businesses: &'a [BookingBusiness],
    name: &str,
) -> Option<&'a BookingBusiness> {
    businesses
        .iter()
        .find(|business| business.display_name.as_deref() == Some(name))
}
