//! `staff` command

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::*;

use bookings_cli::api::{BookingBusiness, BookingStaffMember, BookingStaffRole, EntityRef};

use super::or_dash;
use crate::cli::GlobalArgs;
use crate::cli::session::connect;

#[derive(Debug, Subcommand)]
pub enum StaffCommands {
    /// List staff members
    List { business_id: String },

    /// Add a staff member
    Add {
        business_id: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long, value_enum, default_value_t = StaffRoleArg::ExternalGuest)]
        role: StaffRoleArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StaffRoleArg {
    Guest,
    Administrator,
    Viewer,
    ExternalGuest,
}

impl From<StaffRoleArg> for BookingStaffRole {
    fn from(role: StaffRoleArg) -> Self {
        match role {
            StaffRoleArg::Guest => BookingStaffRole::Guest,
            StaffRoleArg::Administrator => BookingStaffRole::Administrator,
            StaffRoleArg::Viewer => BookingStaffRole::Viewer,
            StaffRoleArg::ExternalGuest => BookingStaffRole::ExternalGuest,
        }
    }
}

pub async fn handle_staff_command(command: StaffCommands, global: &GlobalArgs) -> Result<()> {
    let container = connect(global).await?;

    match command {
        StaffCommands::List { business_id } => {
            let business = container.booking_businesses().by_key(&business_id);
            let staff = business
                .staff_members()
                .collect_all()
                .await
                .context("Failed to list staff members")?;
            if staff.is_empty() {
                println!("{}", "No staff members.".yellow());
            }
            for member in &staff {
                print_staff_line(member);
            }
        }
        StaffCommands::Add {
            business_id,
            email,
            name,
            role,
        } => {
            let business = container.booking_businesses().by_key(&business_id);
            let member = add_staff_member(&business, &email, &name, role.into()).await?;
            println!(
                "Staff member created: {}",
                or_dash(member.id.as_deref()).bright_green()
            );
        }
    }
    Ok(())
}

pub(crate) async fn add_staff_member(
    business: &EntityRef<'_, BookingBusiness>,
    email: &str,
    name: &str,
    role: BookingStaffRole,
) -> Result<BookingStaffMember> {
    let mut staff = business.staff_members().new_entity_with_change_tracking()?;
    staff
        .set_email_address(email)
        .set_display_name(name)
        .set_role(role);

    println!("Creating staff member...");
    business
        .staff_members()
        .container()
        .save_changes(&mut staff)
        .await
        .with_context(|| format!("Failed to create staff member {email}"))?;
    Ok(staff.into_inner())
}

/// First staff member of the business, creating an external guest if there is none
pub(crate) async fn ensure_staff_member(
    business: &EntityRef<'_, BookingBusiness>,
) -> Result<BookingStaffMember> {
    let existing = business
        .staff_members()
        .first()
        .await
        .context("Failed to read staff members")?;

    match existing {
        Some(member) => {
            println!(
                "Using staff member {}",
                or_dash(member.display_name.as_deref()).cyan()
            );
            Ok(member)
        }
        None => {
            let member = add_staff_member(
                business,
                "staff1@contoso.com",
                "Staff1",
                BookingStaffRole::ExternalGuest,
            )
            .await?;
            println!("Staff created.");
            Ok(member)
        }
    }
}

pub(crate) fn print_staff_line(member: &BookingStaffMember) {
    let role = member
        .role
        .map(|role| format!("{role:?}"))
        .unwrap_or_default();
    println!(
        "  {}  {}  {}",
        or_dash(member.display_name.as_deref()).bold(),
        or_dash(member.email_address.as_deref()),
        role.dimmed()
    );
}
