use capture360::envelope::Envelope;
use capture360::gps::{format_coordinates, Coordinates, FixedPosition};
use capture360::items::{Photo, ProjectUnit, ReportPatch};
use capture360::output::Output;
use capture360::reports::ReportsStore;
use capture360::visit::VisitStore;
use capture360::{
    haversine_distance, rank_by_distance, wkt, ApiClient, Config, Location, NearbyUnit,
};
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(StructOpt, Debug)]
#[structopt(about = "Field inspection capture client")]
struct Opts {
    /// Base URL of the field API
    #[structopt(
        long = "api-url",
        env = "API_URL",
        default_value = "https://web-production-2d737.up.railway.app"
    )]
    api_url: String,

    /// Base URL of the capture API receiving recognitions
    #[structopt(
        long = "capture-api-url",
        env = "CAPTURE_API_URL",
        default_value = "https://gestorproyectoapi-production.up.railway.app"
    )]
    capture_api_url: String,

    /// Bearer token for authenticated endpoints
    #[structopt(long, env = "API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Translate a WKT text into a GeoJSON geometry
    Geometry {
        #[structopt(name = "WKT")]
        text: String,
    },
    /// Great-circle distance in meters between two "lat,lon" locations
    Distance {
        #[structopt(long)]
        from: Location,
        #[structopt(long)]
        to: Location,
    },
    /// Rank the project units of a JSON file by distance to a location
    Nearest {
        #[structopt(long)]
        from: Location,
        #[structopt(name = "FILE", parse(from_os_str))]
        path: PathBuf,
        #[structopt(short, long)]
        limit: Option<usize>,
        #[structopt(short, long)]
        geojson: bool,
    },
    /// List the parks, optionally ranked by distance
    Parks {
        #[structopt(long)]
        near: Option<Location>,
        #[structopt(short, long)]
        limit: Option<usize>,
        #[structopt(short, long)]
        geojson: bool,
    },
    /// List the submitted reports with their tracking state
    Reports {
        /// Print aggregated statistics instead of the reports
        #[structopt(long)]
        stats: bool,
        #[structopt(short, long)]
        geojson: bool,
    },
    /// List the green plan activities, most recent first
    Activities {
        #[structopt(short, long)]
        geojson: bool,
    },
    /// List the group leaders
    Leaders,
    /// Submit a park recognition
    Submit {
        #[structopt(long)]
        upid: String,
        /// Capture location as "lat,lon"
        #[structopt(long)]
        at: Location,
        #[structopt(long = "type")]
        intervention_type: String,
        #[structopt(long)]
        description: String,
        #[structopt(long)]
        observations: Option<String>,
        #[structopt(long)]
        address: Option<String>,
        #[structopt(name = "PHOTO", parse(from_os_str))]
        photos: Vec<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn limited<T>(items: &[T], limit: Option<usize>) -> &[T] {
    let len = limit.map_or(items.len(), |limit| limit.min(items.len()));
    &items[..len]
}

fn write_output<O: Output + ?Sized>(
    output: &O,
    geojson: bool,
    writer: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    if geojson {
        output.write_geojson(writer)
    } else {
        output.write_json_lines(writer)
    }
}

fn read_units(path: &Path) -> Result<Vec<ProjectUnit>, Box<dyn Error>> {
    let file = File::open(path)?;
    let envelope: Envelope<ProjectUnit> = serde_json::from_reader(file)?;
    Ok(envelope.into_rows())
}

fn read_photo(path: &Path) -> Result<Photo, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or("photo path has no file name")?
        .to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    let content_type = match extension.as_deref() {
        Some("jpg") | Some("jpeg") => Some("image/jpeg".to_string()),
        Some("png") => Some("image/png".to_string()),
        Some("webp") => Some("image/webp".to_string()),
        _ => None,
    };
    Ok(Photo {
        file_name,
        content_type,
        bytes,
    })
}

fn ensure_step(store: &VisitStore) -> Result<(), Box<dyn Error>> {
    if let Some(error) = &store.state().error {
        return Err(error.clone().into());
    }
    if !store.is_current_step_valid() {
        let step = store.state().wizard.current();
        let name = store.state().wizard.flow().step_name(step).unwrap_or("?");
        return Err(format!("step {} ({}) is incomplete", step, name).into());
    }
    Ok(())
}

async fn submit(
    client: &ApiClient,
    upid: &str,
    at: Location,
    patch: ReportPatch,
    photos: &[PathBuf],
    writer: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    let mut visit = VisitStore::new();
    visit.load_parks(client).await;
    visit.select_park_by_upid(upid)?;
    ensure_step(&visit)?;
    visit.next_step();

    visit.update_data(patch);
    let position = FixedPosition(Coordinates::new(at.lat, at.lon));
    visit.capture_gps(&position);
    ensure_step(&visit)?;
    visit.next_step();

    let photos = photos
        .iter()
        .map(|path| read_photo(path))
        .collect::<Result<Vec<_>, _>>()?;
    visit.add_photos(photos);
    ensure_step(&visit)?;
    visit.next_step();

    let draft = &visit.state().draft;
    if let Some(gps) = &draft.gps {
        info!(position = %format_coordinates(gps), "submitting");
    }
    let response = client.submit_recognition(draft).await?;
    writeln!(writer, "{}", serde_json::to_string(&response)?)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let opts = Opts::from_args();
    let mut config = Config::new(&opts.api_url, &opts.capture_api_url);
    config.token = opts.token;
    let client = ApiClient::new(config)?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    match opts.cmd {
        Command::Geometry { text } => {
            let geometry = wkt::parse(&text).ok_or("not a supported WKT geometry")?;
            writeln!(writer, "{}", serde_json::to_string(&geometry)?)?;
        }
        Command::Distance { from, to } => {
            writeln!(writer, "{:.2}", haversine_distance(&from, &to))?;
        }
        Command::Nearest {
            from,
            path,
            limit,
            geojson,
        } => {
            let units = read_units(&path)?;
            let ranked = rank_by_distance(&units, &from);
            write_output(limited(&ranked, limit), geojson, &mut writer)?;
        }
        Command::Parks {
            near,
            limit,
            geojson,
        } => {
            let parks = client.parks().await?;
            let ranked = match near {
                Some(position) => rank_by_distance(&parks, &position),
                None => parks
                    .iter()
                    .map(|unit| NearbyUnit {
                        unit,
                        distance: None,
                    })
                    .collect(),
            };
            write_output(limited(&ranked, limit), geojson, &mut writer)?;
        }
        Command::Reports { stats, geojson } => {
            let mut reports = ReportsStore::new();
            reports.load(&client).await;
            let state = reports.state();
            if let Some(error) = &state.error {
                return Err(error.clone().into());
            }
            if stats {
                writeln!(writer, "{}", serde_json::to_string(&state.statistics())?)?;
            } else {
                write_output(&state.reports[..], geojson, &mut writer)?;
            }
        }
        Command::Activities { geojson } => {
            let activities = client.activities().await?;
            write_output(&activities[..], geojson, &mut writer)?;
        }
        Command::Leaders => {
            for leader in client.leaders().await {
                writeln!(writer, "{}", serde_json::to_string(&leader)?)?;
            }
        }
        Command::Submit {
            upid,
            at,
            intervention_type,
            description,
            observations,
            address,
            photos,
        } => {
            let patch = ReportPatch {
                intervention_type: Some(intervention_type),
                intervention_description: Some(description),
                observations,
                address,
            };
            submit(&client, &upid, at, patch, &photos, &mut writer).await?;
        }
    }
    Ok(())
}
