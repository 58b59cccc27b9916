//! `show` command

use anyhow::{Context, Result};
use colored::*;

use super::appointments::print_appointment_stream;
use super::or_dash;
use super::staff::print_staff_line;
use crate::cli::GlobalArgs;
use crate::cli::session::connect;

pub async fn handle_show_command(business_id: &str, global: &GlobalArgs) -> Result<()> {
    let container = connect(global).await?;
    let business = container.booking_businesses().by_key(business_id);

    let details = business
        .get_value()
        .await
        .with_context(|| format!("Failed to read booking business {business_id}"))?;

    println!("{}", or_dash(details.display_name.as_deref()).bold().underline());
    println!("  Id:        {}", or_dash(details.id.as_deref()));
    println!("  Email:     {}", or_dash(details.email.as_deref()));
    println!("  Phone:     {}", or_dash(details.phone.as_deref()));
    println!(
        "  Published: {}",
        match details.is_published {
            Some(true) => "yes".green(),
            _ => "no".dimmed(),
        }
    );
    if let Some(url) = &details.public_url {
        println!("  Page:      {}", url.cyan());
    }

    println!();
    println!("{}", "Staff".bold());
    let staff = business
        .staff_members()
        .collect_all()
        .await
        .context("Failed to list staff members")?;
    if staff.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for member in &staff {
        print_staff_line(member);
    }

    println!();
    println!("{}", "Services".bold());
    let services = business
        .services()
        .collect_all()
        .await
        .context("Failed to list services")?;
    if services.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for service in &services {
        println!(
            "  {}  {}  {}",
            or_dash(service.display_name.as_deref()).bold(),
            or_dash(service.default_duration.as_deref()),
            or_dash(service.id.as_deref()).dimmed()
        );
    }

    println!();
    println!("{}", "Appointments".bold());
    let count = print_appointment_stream(&business.appointments()).await?;
    if count == 0 {
        println!("  {}", "none".dimmed());
    }

    Ok(())
}
