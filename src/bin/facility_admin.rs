use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tokio::task::JoinHandle;

use facility_registry::{
    config,
    db::{self, DbPool},
    entities::{FacilityModel, FacilityType},
    events::{self, Event, EventSender, FacilityChangeNotifier, LoggingNotifier},
    models::{FacilityField, NewFacilityRequest},
    services::{DbReferenceResolver, DistanceMatrixService, FacilityService},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    let outcome = match cli.command {
        Commands::Migrate => handle_migrate(&context).await,
        Commands::Add(args) => handle_add(&context, args, cli.json).await,
        Commands::UpdateField(args) => handle_update_field(&context, args, cli.json).await,
        Commands::UpdateCounty(args) => handle_update_county(&context, args, cli.json).await,
        Commands::SetActive(args) => handle_set_active(&context, args, cli.json).await,
        Commands::Pending(args) => handle_pending(&context, args, cli.json).await,
        Commands::Show(args) => handle_show(&context, args, cli.json).await,
    };

    context.shutdown().await;
    outcome
}

#[derive(Parser)]
#[command(
    name = "facility-admin",
    about = "Administer facilities, their audit trail and the distance matrix",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Create a facility
    Add(AddArgs),
    /// Change one text field (county/state take "County,ST")
    UpdateField(UpdateFieldArgs),
    /// Move a facility to another county/state
    UpdateCounty(UpdateCountyArgs),
    /// Activate or deactivate a facility
    SetActive(SetActiveArgs),
    /// List distance pairs awaiting computation
    Pending(PendingArgs),
    /// Show a facility with its status and audit history
    Show(ShowArgs),
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long = "address")]
    street_address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    county: String,
    #[arg(long)]
    state: String,
    #[arg(long = "type", value_parser = parse_facility_type)]
    facility_type: FacilityType,
    #[arg(long)]
    max_supply_load: Option<String>,
    #[arg(long)]
    hours: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_number: Option<String>,
}

#[derive(Args)]
struct UpdateFieldArgs {
    id: i64,
    #[arg(value_parser = parse_field)]
    field: FacilityField,
    value: String,
}

#[derive(Args)]
struct UpdateCountyArgs {
    id: i64,
    county: String,
    state: String,
}

#[derive(Args)]
struct SetActiveArgs {
    id: i64,
    #[arg(action = ArgAction::Set)]
    active: bool,
    /// Recorded when deactivating
    #[arg(long)]
    reason: Option<String>,
}

#[derive(Args)]
struct PendingArgs {
    #[arg(long, default_value_t = 50)]
    limit: u64,
}

#[derive(Args)]
struct ShowArgs {
    id: i64,
}

fn parse_facility_type(raw: &str) -> std::result::Result<FacilityType, String> {
    FacilityType::from_str(raw)
        .map_err(|_| "expected 'Distribution Center' or 'Supply Hub'".to_string())
}

fn parse_field(raw: &str) -> std::result::Result<FacilityField, String> {
    FacilityField::from_str(raw).map_err(|_| format!("'{}' is not an updatable field", raw))
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_add(context: &CliContext, args: AddArgs, json: bool) -> Result<()> {
    let request = NewFacilityRequest {
        name: Some(args.name),
        street_address: Some(args.street_address),
        city: Some(args.city),
        county: Some(args.county),
        state: Some(args.state),
        facility_type: Some(args.facility_type),
        max_supply_load: args.max_supply_load,
        hours: args.hours,
        website: args.website,
        contact_name: args.contact_name,
        contact_number: args.contact_number,
        ..Default::default()
    };

    let facilities = context.facility_service();
    let id = facilities
        .add_facility(request)
        .await
        .context("failed to add facility")?;
    context.publish(Event::FacilityCreated(id)).await;

    let facility = facilities.get(id).await?;
    if json {
        print_json(&facility)?;
    } else {
        render_facility(&facility);
    }
    Ok(())
}

#[derive(Serialize)]
struct FieldChange {
    facility_id: i64,
    field: String,
    previous_value: Option<String>,
}

async fn handle_update_field(context: &CliContext, args: UpdateFieldArgs, json: bool) -> Result<()> {
    let previous_value = context
        .facility_service()
        .update_field(args.id, args.field, &args.value)
        .await
        .with_context(|| format!("failed to update {} of facility {}", args.field, args.id))?;
    context
        .publish(Event::FacilityUpdated {
            facility_id: args.id,
            field: args.field.to_string(),
        })
        .await;

    let change = FieldChange {
        facility_id: args.id,
        field: args.field.to_string(),
        previous_value,
    };
    if json {
        print_json(&change)?;
    } else {
        println!(
            "Facility {} {} updated (was {})",
            change.facility_id,
            change.field,
            change.previous_value.as_deref().unwrap_or("<empty>")
        );
    }
    Ok(())
}

async fn handle_update_county(
    context: &CliContext,
    args: UpdateCountyArgs,
    json: bool,
) -> Result<()> {
    let previous = context
        .facility_service()
        .update_county(args.id, &args.county, &args.state)
        .await
        .with_context(|| format!("failed to move facility {}", args.id))?;
    context
        .publish(Event::FacilityUpdated {
            facility_id: args.id,
            field: FacilityField::County.to_string(),
        })
        .await;

    if json {
        print_json(&FieldChange {
            facility_id: args.id,
            field: FacilityField::County.to_string(),
            previous_value: Some(previous),
        })?;
    } else {
        println!("Facility {} moved (was {})", args.id, previous);
    }
    Ok(())
}

async fn handle_set_active(context: &CliContext, args: SetActiveArgs, json: bool) -> Result<()> {
    let facilities = context.facility_service();
    facilities.set_active(args.id, args.active).await?;
    if !args.active {
        facilities.set_inactive_reason(args.id, args.reason).await?;
    }
    context
        .publish(Event::FacilityUpdated {
            facility_id: args.id,
            field: "active".to_string(),
        })
        .await;

    let status = facilities.fetch_status(args.id).await?;
    if json {
        print_json(&status)?;
    } else {
        println!(
            "Facility {} is now {}{}",
            args.id,
            if status.active { "active" } else { "inactive" },
            status
                .inactive_reason
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );
    }
    Ok(())
}

async fn handle_pending(context: &CliContext, args: PendingArgs, json: bool) -> Result<()> {
    let distances = context.distance_service();
    let pending = distances.list_pending(args.limit).await?;
    if json {
        return print_json(&pending);
    }

    let summary = distances.count_by_status().await?;
    println!(
        "{} pending / {} computed distance entries",
        summary.pending, summary.computed
    );
    for entry in &pending {
        println!("- {} <-> {}", entry.facility1_id, entry.facility2_id);
    }
    Ok(())
}

#[derive(Serialize)]
struct FacilityDetail {
    facility: FacilityModel,
    audit: Vec<facility_registry::entities::AuditEntryModel>,
}

async fn handle_show(context: &CliContext, args: ShowArgs, json: bool) -> Result<()> {
    let facilities = context.facility_service();
    let facility = facilities.get(args.id).await?;
    let audit = facilities.audit_trail(args.id).await?;

    if json {
        return print_json(&FacilityDetail { facility, audit });
    }

    render_facility(&facility);
    if audit.is_empty() {
        println!("  no recorded changes");
    }
    for entry in &audit {
        println!(
            "  {} {}: {} -> {}",
            entry.date_modified.to_rfc3339(),
            entry.field_name,
            entry.old_value.as_deref().unwrap_or("<empty>"),
            entry.new_value.as_deref().unwrap_or("<empty>")
        );
    }
    Ok(())
}

struct CliContext {
    db: Arc<DbPool>,
    event_sender: EventSender,
    event_task: JoinHandle<()>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_sender, event_rx) = events::channel(config.event_channel_capacity);
        let notifier: Arc<dyn FacilityChangeNotifier> = Arc::new(LoggingNotifier);
        let event_task = tokio::spawn(events::process_events(event_rx, notifier));

        Ok(Self {
            db,
            event_sender,
            event_task,
        })
    }

    fn facility_service(&self) -> FacilityService {
        let references = Arc::new(DbReferenceResolver::new(self.db.clone()));
        FacilityService::new(self.db.clone(), references)
    }

    fn distance_service(&self) -> DistanceMatrixService {
        DistanceMatrixService::new(self.db.clone())
    }

    async fn publish(&self, event: Event) {
        self.event_sender.publish(event).await;
    }

    /// Drains queued events before the process exits.
    async fn shutdown(self) {
        let CliContext {
            event_sender,
            event_task,
            ..
        } = self;
        drop(event_sender);
        if let Err(e) = event_task.await {
            tracing::warn!("event task ended abnormally: {}", e);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|e| anyhow!("failed to render JSON: {}", e))?
    );
    Ok(())
}

fn render_facility(facility: &FacilityModel) {
    println!(
        "- Facility {} • {} • {} • {}, {} ({} County, {})",
        facility.id,
        facility.name,
        facility.facility_type,
        facility.street_address,
        facility.city,
        facility.county,
        facility.state
    );
    println!(
        "  active={} accepting_donations={} distributing_supplies={} publicly_visible={} max_supply_load={}",
        facility.active,
        facility.accepting_donations,
        facility.distributing_supplies,
        facility.publicly_visible,
        facility.max_supply_load
    );
}
