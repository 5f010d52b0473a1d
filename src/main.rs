use clap::Parser;
use colored::*;
use reclamation_admin::{
    cli::{Cli, Commands, OutputFormat},
    config::{Config, DEFAULT_CONFIG_PATH},
    error::{self, Error},
    reclamation::{HttpApi, ListParams, NewReclamation, Reclamation, ReclamationService, RemoveTarget},
    tui::{self, app::mutation_message, components::pagination::Pagination, Location},
    utils,
};
use std::{path::Path, sync::Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type Service = ReclamationService<HttpApi>;

const TABLE_WIDTHS: [usize; 4] = [8, 28, 36, 40];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_logging(None, "reclamation_admin=info");
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let command = cli.command.unwrap_or(Commands::Tui {
        location: Location::default().to_string(),
    });

    // The TUI owns the terminal, so its logs go to a file.
    let log_file = matches!(command, Commands::Tui { .. }).then_some(config.logging.file.as_str());
    init_logging(log_file, &config.logging.filter);

    let service = match build_service(&config) {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    let idle = service.clone();
    let result = match command {
        Commands::Tui { location } => run_tui(&config, service, &location).await,

        Commands::List { page, size, format } => {
            let size = size.unwrap_or(config.list.page_size);
            info!(page, size, "listing reclamations");
            list_reclamations(&service, page, size, format).await
        }

        Commands::Get { id, format } => show_reclamation(&service, id, format).await,

        Commands::Create { name, link, description } => {
            create_reclamation(&service, name, link, description).await
        }

        Commands::Update { id, name, link, description } => {
            update_reclamation(&service, id, name, link, description).await
        }

        Commands::Delete { id, name, yes } => delete_reclamation(&service, id, name, yes).await,

        Commands::Init { force } => initialize(&config, force),
    };
    idle.wait_idle().await;

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn init_logging(file: Option<&str>, filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Stderr would draw over the TUI.
    match file.map(utils::open_log_file) {
        Some(Some(file)) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Some(None) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::sink)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn build_service(config: &Config) -> error::Result<Service> {
    let api = HttpApi::new(&config.api.base_url, config.api_timeout())?;
    Ok(ReclamationService::new(api, config.service_options()))
}

async fn run_tui(config: &Config, service: Service, location: &str) -> error::Result<()> {
    let location: Location = match location.parse() {
        Ok(location) => location,
        Err(never) => match never {},
    };
    if location.path() != tui::location::LIST_PATH {
        warn!(%location, "unknown path, showing the list");
    }

    let last = tui::run_tui(config, service, location).await?;
    println!("{} {}", "Last location:".cyan(), last);
    Ok(())
}

fn print_header() {
    let width = utils::table_width(&TABLE_WIDTHS);
    utils::print_table_border(width);
    utils::print_table_row(&["Id", "Name", "Link", "Description"], &TABLE_WIDTHS);
    utils::print_table_border(width);
}

fn print_record(record: &Reclamation) {
    utils::print_table_row(
        &[
            &record.id.to_string(),
            &record.name,
            &record.link,
            record.description.as_deref().unwrap_or("-"),
        ],
        &TABLE_WIDTHS,
    );
}

async fn list_reclamations(service: &Service, page: u32, size: u32, format: OutputFormat) -> error::Result<()> {
    let spinner = utils::spinner("Loading reclamations...");
    let result = service.list(ListParams::new(page - 1, size)).await;
    spinner.finish_and_clear();
    let query = result?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&query.data)?);
        return Ok(());
    }

    let reclamations = query.reclamations();
    if reclamations.is_empty() {
        println!("{}", "No reclamations found".yellow());
    } else {
        print_header();
        for record in reclamations {
            print_record(record);
        }
        utils::print_table_border(utils::table_width(&TABLE_WIDTHS));
    }

    let pagination = Pagination::from_query(u64::from(page), &query);
    println!(
        "Page {} of {} · {}",
        pagination.page,
        pagination.last_page(),
        pagination.info()
    );
    if query.has_more() {
        println!("Next: {}", format!("reclamation-admin list --page {}", page + 1).cyan());
    }
    Ok(())
}

async fn show_reclamation(service: &Service, id: i64, format: OutputFormat) -> error::Result<()> {
    let query = service.get(Some(id)).await?;
    let Some(record) = query.data else {
        return Err(Error::Other(format!("reclamation {} not found", id)));
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("{}", format!("=== Reclamation #{} ===", record.id).cyan().bold());
    println!("  Name:         {}", record.name);
    println!("  Link:         {}", record.link);
    println!("  Description:  {}", record.description.as_deref().unwrap_or("-"));
    Ok(())
}

async fn create_reclamation(
    service: &Service,
    name: String,
    link: String,
    description: Option<String>,
) -> error::Result<()> {
    let payload = NewReclamation {
        name,
        link,
        description: description.filter(|d| !d.trim().is_empty()),
    };

    let result = service
        .create_with(payload, |created| {
            println!("{} Created \"{}\" (#{})", "✓".green(), created.name, created.id);
        })
        .await;

    result.map(|_| ()).map_err(|e| match e {
        e if e.is_name_already_used() => Error::Other(mutation_message(&e)),
        e => e,
    })
}

async fn update_reclamation(
    service: &Service,
    id: i64,
    name: Option<String>,
    link: Option<String>,
    description: Option<String>,
) -> error::Result<()> {
    if name.is_none() && link.is_none() && description.is_none() {
        println!("{}", "Nothing to update".yellow());
        return Ok(());
    }

    let Some(current) = service.get_for_form(Some(id)).await? else {
        return Ok(());
    };
    let record = Reclamation {
        id,
        name: name.unwrap_or_else(|| current.name.clone()),
        link: link.unwrap_or_else(|| current.link.clone()),
        description: match description {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d),
            None => current.description.clone(),
        },
    };
    drop(current);

    let result = service
        .update_with(record, |updated| {
            println!("{} Updated \"{}\" (#{})", "✓".green(), updated.name, updated.id);
        })
        .await;

    result.map(|_| ()).map_err(|e| match e {
        e if e.is_name_already_used() => Error::Other(mutation_message(&e)),
        e => e,
    })
}

async fn delete_reclamation(service: &Service, id: i64, name: Option<String>, yes: bool) -> error::Result<()> {
    let name = match name {
        Some(name) => name,
        None => match service.get(Some(id)).await?.data {
            Some(record) => record.name,
            None => return Err(Error::Other(format!("reclamation {} not found", id))),
        },
    };
    let target = RemoveTarget { id, name };

    if !yes && !utils::confirm_action(&format!("Delete \"{}\" (#{})?", target.name, target.id)) {
        println!("{}", "Cancelled".yellow());
        return Ok(());
    }

    service
        .remove_with(target, |removed| {
            println!("{} Removed \"{}\"", "✓".green(), removed.name);
        })
        .await
}

fn initialize(config: &Config, force: bool) -> error::Result<()> {
    let path = Path::new(DEFAULT_CONFIG_PATH).with_extension("toml");
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, config.to_toml()?)?;

    println!("{}", format!("✓ Wrote {}", path.display()).green());
    println!("\n{}", "Configuration:".cyan());
    println!("  API URL:      {}", config.api.base_url);
    println!("  Page size:    {}", config.list.page_size);
    println!("  Log file:     {}", config.logging.file);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to browse reclamations", "reclamation-admin tui".yellow());
    println!("  {} to print the first page", "reclamation-admin list".yellow());
    Ok(())
}
