use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use crop_catalog::detection::{InferenceResponse, HEALTHY_MESSAGE};
use crop_catalog::state::inspect;
use crop_catalog::{
    logging, Capture, Config, Folder, FolderDraft, FolderPatch, FolderRepository, GeoLocation, ImageSource,
    ResolvedImage, Weather,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Browse and maintain the local crop-disease folder catalog
#[derive(Parser, Debug)]
#[command(name = "crop-catalog", version, about)]
struct Cli {
    /// Data directory (database and folder images)
    #[arg(long, global = true, env = crop_catalog::config::HOME_ENV)]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all folders
    List,
    /// Print one folder as JSON
    Show { id: String },
    /// Create a new folder
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        plant: String,
        #[arg(long)]
        seed_company: String,
        /// YYYY-MM-DD or RFC 3339; defaults to now
        #[arg(long, value_parser = parse_date)]
        sowing_date: Option<DateTime<Utc>>,
        #[command(flatten)]
        location: LocationArgs,
        #[command(flatten)]
        weather: WeatherArgs,
    },
    /// Change fields of an existing folder
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        plant: Option<String>,
        #[arg(long)]
        seed_company: Option<String>,
        #[arg(long, value_parser = parse_date)]
        sowing_date: Option<DateTime<Utc>>,
        #[command(flatten)]
        location: LocationArgs,
        /// Remove the folder's location
        #[arg(long, conflicts_with = "lat")]
        clear_location: bool,
        #[command(flatten)]
        weather: WeatherArgs,
    },
    /// Save an image with its detection result into a folder
    Append {
        id: String,
        /// Image path, file:// URI, or data:image/...;base64 URI
        image: String,
        #[arg(long, conflicts_with = "response")]
        detection: Option<String>,
        #[arg(long, conflicts_with = "response")]
        remedy: Option<String>,
        /// JSON body returned by the inference server
        #[arg(long)]
        response: Option<PathBuf>,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Locate the file of one image entry, healing stale paths
    Resolve { id: String, index: usize },
    /// Check every image entry on disk
    Verify,
    /// Show raw local data
    Inspect {
        /// Only show this key
        key: Option<String>,
    },
    /// Delete all local data
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct LocationArgs {
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    alt: Option<f64>,
}

impl LocationArgs {
    fn to_location(&self) -> Option<GeoLocation> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoLocation::now(lat, lon, self.alt)),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Default)]
struct WeatherArgs {
    /// Moisture (%)
    #[arg(long)]
    moisture: Option<String>,
    /// Temperature (°C)
    #[arg(long)]
    temperature: Option<String>,
    #[arg(long)]
    turbulence: Option<String>,
}

impl WeatherArgs {
    fn is_empty(&self) -> bool {
        self.moisture.is_none() && self.temperature.is_none() && self.turbulence.is_none()
    }

    /// Overlay the given fields on `base`
    fn merge(self, base: &Weather) -> Weather {
        Weather {
            moisture: self.moisture.unwrap_or_else(|| base.moisture.clone()),
            temperature: self.temperature.unwrap_or_else(|| base.temperature.clone()),
            turbulence: self.turbulence.unwrap_or_else(|| base.turbulence.clone()),
        }
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::resolve(cli.data_dir)?;
    let repo = FolderRepository::open(&config)
        .with_context(|| format!("opening catalog in {}", config.data_dir.display()))?;

    match cli.command {
        Command::List => {
            let folders = repo.list_folders().await?;
            if folders.is_empty() {
                println!("No folders yet.");
            }
            for folder in &folders {
                print_folder_line(folder);
            }
        }
        Command::Show { id } => {
            let folder = repo.get_folder(&id).await?;
            println!("{}", serde_json::to_string_pretty(&folder)?);
        }
        Command::Create {
            name,
            plant,
            seed_company,
            sowing_date,
            location,
            weather,
        } => {
            let draft = FolderDraft {
                name,
                plant_name: plant,
                seed_company,
                sowing_date,
                location: location.to_location(),
                weather_conditions: weather.merge(&Weather::default()),
            };
            let folder = repo.create_folder(draft).await?;
            println!("Created folder {} ({})", folder.name, folder.id);
        }
        Command::Update {
            id,
            name,
            plant,
            seed_company,
            sowing_date,
            location,
            clear_location,
            weather,
        } => {
            let weather_conditions = if weather.is_empty() {
                None
            } else {
                let current = repo.get_folder(&id).await?;
                Some(weather.merge(&current.weather_conditions))
            };
            let location = if clear_location {
                Some(None)
            } else {
                location.to_location().map(Some)
            };

            let patch = FolderPatch {
                name,
                plant_name: plant,
                seed_company,
                sowing_date,
                location,
                weather_conditions,
            };
            if patch.is_empty() {
                bail!("Nothing to update");
            }

            let folder = repo.update_folder(&id, &patch).await?;
            print_folder_line(&folder);
        }
        Command::Append {
            id,
            image,
            detection,
            remedy,
            response,
            location,
        } => {
            let mut capture = match response {
                Some(path) => {
                    let body = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    let summary = InferenceResponse::from_json(&body)
                        .with_context(|| format!("parsing inference response {}", path.display()))?
                        .summarize();
                    let mut capture = Capture::new(ImageSource::parse(&image), summary.detection, summary.remedy);
                    capture.annotated_uri = summary.media;
                    capture
                }
                None => Capture::new(
                    ImageSource::parse(&image),
                    detection.unwrap_or_else(|| HEALTHY_MESSAGE.to_string()),
                    remedy.unwrap_or_default(),
                ),
            };
            capture.location = location.to_location();

            let folder = repo.append_image(&id, capture).await?;
            if let Some(entry) = folder.images.last() {
                println!("Saved {}", entry.original_uri);
            }
        }
        Command::Resolve { id, index } => {
            let mut folder = repo.get_folder(&id).await?;
            match repo.resolve_image_uri(&mut folder, index).await {
                ResolvedImage::Original(path) => println!("{}", path.display()),
                ResolvedImage::Relocated(path) => println!("{} (relocated)", path.display()),
                ResolvedImage::Missing => println!("Image not found"),
            }
        }
        Command::Verify => {
            let report = repo.verify_images().await?;
            println!(
                "{} intact, {} relocated, {} missing",
                report.intact,
                report.relocated,
                report.missing.len()
            );
            for (folder_id, uri) in &report.missing {
                println!("  missing in {}: {}", folder_id, uri);
            }
        }
        Command::Inspect { key } => {
            let data = repo.local_data().await?;
            if data.is_empty() {
                println!("No local data.");
            }
            for (name, value) in &data {
                if key.as_deref().is_some_and(|wanted| wanted != name) {
                    continue;
                }
                println!("{}: {}", name, inspect::summarize_value(value));
                let mut tree = String::new();
                inspect::render_tree(value, 1, &mut tree);
                print!("{}", tree);
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete all local data without --yes");
            }
            repo.clear_all().await?;
            println!("All local data deleted.");
        }
    }

    Ok(())
}

fn print_folder_line(folder: &Folder) {
    println!(
        "{}  {}  {} • {}  ({} images)",
        folder.id,
        folder.name,
        folder.plant_name,
        folder.seed_company,
        folder.images.len()
    );
}
