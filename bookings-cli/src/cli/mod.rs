//! Command line interface

pub mod commands;
pub mod session;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::appointments::{AppointmentsCommands, handle_appointments_command};
use commands::businesses::{BusinessesCommands, handle_businesses_command};
use commands::demo::handle_demo_command;
use commands::publish::handle_publish_command;
use commands::show::handle_show_command;
use commands::staff::{StaffCommands, handle_staff_command};

#[derive(Debug, Parser)]
#[command(name = "bookings-cli")]
#[command(author, version, about = "Work with Microsoft Bookings from the console")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand; they override the settings file and environment
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Bookings service root (must end with '/')
    #[arg(long, global = true)]
    pub service_root: Option<String>,

    /// Route every request through this HTTP proxy
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Ask the server for at most this many items per page
    #[arg(long, global = true)]
    pub max_page_size: Option<u32>,

    /// Ask the server to continue processing after an error
    #[arg(long, global = true)]
    pub continue_on_error: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List or create booking businesses
    Businesses {
        #[command(subcommand)]
        command: BusinessesCommands,
    },

    /// Show a business with its staff, services and appointments
    Show {
        /// Business id, e.g. Contoso@contoso.onmicrosoft.com
        business_id: String,
    },

    /// Manage staff members of a business
    Staff {
        #[command(subcommand)]
        command: StaffCommands,
    },

    /// List or create appointments
    Appointments {
        #[command(subcommand)]
        command: AppointmentsCommands,
    },

    /// Publish the business's public booking page
    Publish { business_id: String },

    /// Hide the business's public booking page
    Unpublish { business_id: String },

    /// Interactive walkthrough of the sample flow
    Demo,
}

pub async fn run(cli: Cli) -> Result<()> {
    let Cli { global, command } = cli;
    log::debug!("Running {:?}", command);

    match command {
        Commands::Businesses { command } => handle_businesses_command(command, &global).await,
        Commands::Show { business_id } => handle_show_command(&business_id, &global).await,
        Commands::Staff { command } => handle_staff_command(command, &global).await,
        Commands::Appointments { command } => handle_appointments_command(command, &global).await,
        Commands::Publish { business_id } => {
            handle_publish_command(&business_id, true, &global).await
        }
        Commands::Unpublish { business_id } => {
            handle_publish_command(&business_id, false, &global).await
        }
        Commands::Demo => handle_demo_command(&global).await,
    }
}
