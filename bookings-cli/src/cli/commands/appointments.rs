//! `appointments` command

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Days, NaiveTime, TimeDelta, Utc};
use clap::Subcommand;
use colored::*;
use futures::TryStreamExt;

use bookings_cli::api::{
    BookingAppointment, BookingBusiness, BookingReminder, BookingReminderRecipients,
    DateTimeTimeZone, EntityRef,
};

use super::or_dash;
use crate::cli::GlobalArgs;
use crate::cli::session::connect;

#[derive(Debug, Subcommand)]
pub enum AppointmentsCommands {
    /// List every appointment, following server paging
    List {
        business_id: String,

        /// Only appointments from this instant (RFC 3339), requires --end
        #[arg(long, requires = "end")]
        start: Option<DateTime<Utc>>,

        /// Only appointments until this instant (RFC 3339), requires --start
        #[arg(long, requires = "start")]
        end: Option<DateTime<Utc>>,
    },

    /// Book an appointment
    Create {
        business_id: String,

        #[arg(long)]
        customer_name: String,

        #[arg(long)]
        customer_email: String,

        /// Service to book; defaults to the business's first service
        #[arg(long)]
        service_id: Option<String>,

        /// Staff member to assign (repeatable); defaults to the first staff member
        #[arg(long = "staff-id")]
        staff_ids: Vec<String>,

        /// Start instant (RFC 3339); defaults to tomorrow 13:00 UTC
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        #[arg(long, default_value_t = 60)]
        duration_minutes: i64,

        /// Remind all attendees this many minutes before the start
        #[arg(long, default_value_t = 60)]
        reminder_minutes: i64,
    },
}

/// What to book
#[derive(Debug, Clone)]
pub(crate) struct NewAppointment {
    pub customer_name: String,
    pub customer_email: String,
    pub service_id: Option<String>,
    pub staff_ids: Vec<String>,
    pub start: DateTime<Utc>,
    pub duration: TimeDelta,
    pub reminder: Option<TimeDelta>,
}

pub async fn handle_appointments_command(
    command: AppointmentsCommands,
    global: &GlobalArgs,
) -> Result<()> {
    let container = connect(global).await?;

    match command {
        AppointmentsCommands::List {
            business_id,
            start,
            end,
        } => {
            let business = container.booking_businesses().by_key(&business_id);
            let count = match (start, end) {
                (Some(start), Some(end)) => {
                    if end <= start {
                        bail!("--end must be after --start");
                    }
                    print_appointment_stream(&business.calendar_view(start, end)).await?
                }
                _ => print_appointment_stream(&business.appointments()).await?,
            };
            if count == 0 {
                println!("{}", "No appointments.".yellow());
            }
        }
        AppointmentsCommands::Create {
            business_id,
            customer_name,
            customer_email,
            service_id,
            staff_ids,
            start,
            duration_minutes,
            reminder_minutes,
        } => {
            let duration = minutes_flag("--duration-minutes", duration_minutes)?;
            if duration <= TimeDelta::zero() {
                bail!("--duration-minutes must be positive");
            }
            let reminder = if reminder_minutes > 0 {
                Some(minutes_flag("--reminder-minutes", reminder_minutes)?)
            } else {
                None
            };
            let business = container.booking_businesses().by_key(&business_id);

            let staff_ids = if staff_ids.is_empty() {
                let first = business
                    .staff_members()
                    .first()
                    .await
                    .context("Failed to read staff members")?;
                first.and_then(|member| member.id).into_iter().collect()
            } else {
                staff_ids
            };

            let request = NewAppointment {
                customer_name,
                customer_email,
                service_id,
                staff_ids,
                start: start.unwrap_or_else(|| tomorrow_at_one_pm(Utc::now())),
                duration,
                reminder,
            };
            let appointment = create_appointment(&business, request).await?;
            println!(
                "Appointment created: {}",
                or_dash(appointment.id.as_deref()).bright_green()
            );
        }
    }
    Ok(())
}

/// Print every appointment of `set`, fetching pages as the output reaches them
pub(crate) async fn print_appointment_stream(
    set: &bookings_cli::api::EntitySet<'_, BookingAppointment>,
) -> Result<usize> {
    let stream = set.get_all_pages()?;
    futures::pin_mut!(stream);

    let mut count = 0;
    while let Some(appointment) = stream
        .try_next()
        .await
        .context("Failed to read appointments")?
    {
        println!("{}", format_appointment(&appointment));
        count += 1;
    }
    log::info!("Listed {} appointments from {}", count, set.path());
    Ok(count)
}

/// POST an appointment carrying only the properties that were set
pub(crate) async fn create_appointment(
    business: &EntityRef<'_, BookingBusiness>,
    request: NewAppointment,
) -> Result<BookingAppointment> {
    let end = request
        .start
        .checked_add_signed(request.duration)
        .context("Appointment end is out of range; use a shorter duration")?;

    let service_id = match request.service_id {
        Some(id) => id,
        None => business
            .services()
            .first()
            .await
            .context("Failed to read services")?
            .and_then(|service| service.id)
            .context("The business has no services to book")?,
    };

    let appointments = business.appointments();
    let mut appointment = appointments.new_entity_with_change_tracking()?;
    appointment
        .set_customer_email_address(request.customer_email)
        .set_customer_name(request.customer_name)
        .set_service_id(service_id)
        .set_start(DateTimeTimeZone::utc(request.start))
        .set_end(DateTimeTimeZone::utc(end));
    if !request.staff_ids.is_empty() {
        appointment.set_staff_member_ids(request.staff_ids);
    }
    if let Some(offset) = request.reminder {
        appointment.set_reminders(vec![BookingReminder::new(
            "Hello",
            offset,
            BookingReminderRecipients::AllAttendees,
        )]);
    }

    println!("Creating appointment...");
    appointments
        .container()
        .save_changes(&mut appointment)
        .await
        .context("Failed to create appointment")?;
    Ok(appointment.into_inner())
}

fn minutes_flag(flag: &str, value: i64) -> Result<TimeDelta> {
    TimeDelta::try_minutes(value).with_context(|| format!("{flag} {value} is out of range"))
}

/// 13:00 UTC on the day after `now`
pub(crate) fn tomorrow_at_one_pm(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or_else(|| now.date_naive());
    day.and_time(NaiveTime::MIN + TimeDelta::hours(13)).and_utc()
}

/// `<local start>: <service> with <customer>`
pub(crate) fn format_appointment(appointment: &BookingAppointment) -> String {
    let start = appointment
        .start
        .as_ref()
        .and_then(|start| start.to_local())
        .map(|local| local.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "(no start)".to_string());

    format!(
        "{}: {} with {}",
        start.cyan(),
        or_dash(appointment.service_name.as_deref()),
        or_dash(appointment.customer_name.as_deref()).bold()
    )
}
