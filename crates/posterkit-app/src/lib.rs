//! PosterKit application shell.
//!
//! Drives an editing session on the headless surface: materialize a
//! template, save it, and export rasters of saved designs.

use clap::{Args, Parser, Subcommand};
use posterkit_core::services::StaticSession;
use posterkit_core::storage::{AutoSaveManager, FileStorage};
use posterkit_core::{
    BuiltinCatalog, ConfigError, DesignCategory, EditorConfig, ServiceError, StorageError,
    TemplateCatalog, UserSession,
};
use posterkit_render::{DecodingResolver, EditorSession, RasterFormat, SceneSurface, SessionError};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Pixel size of the stand-in for the placeholder image.
const PLACEHOLDER_SIZE: (u32, u32) = (300, 300);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unknown design category: {0}")]
    UnknownCategory(String),
    #[error("No design has been saved yet")]
    NothingToResume,
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Parser, Debug)]
#[command(name = "posterkit", about = "Headless PosterKit poster editor")]
pub struct Cli {
    /// Editor configuration file (JSON).
    #[arg(long, env = "POSTERKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that root-relative image sources resolve against.
    #[arg(long, env = "POSTERKIT_ASSETS", default_value = ".")]
    pub assets: PathBuf,

    /// Signed-in user. Editing commands refuse to run without one.
    #[arg(long, env = "POSTERKIT_USER")]
    pub user: Option<String>,

    #[arg(long, env = "POSTERKIT_EMAIL")]
    pub email: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in templates.
    Templates {
        #[arg(long)]
        category: Option<String>,
    },
    /// Start a design from a template, save it and export it.
    Render(RenderArgs),
    /// Export a saved design.
    Export {
        design_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Export the most recently saved design.
    Resume {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List your saved designs.
    Designs,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template ID, see `posterkit templates`.
    pub template: String,

    /// Output file; `.jpg`/`.jpeg` exports JPEG, anything else PNG.
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    /// Design category, e.g. "Event Flyer". Sets the canvas size.
    #[arg(long)]
    pub category: Option<String>,
}

/// Pick the export format from a file name.
pub fn raster_format_for(path: &Path) -> RasterFormat {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => RasterFormat::Jpeg,
        _ => RasterFormat::Png,
    }
}

/// Everything a command needs, resolved from the command line.
pub struct App {
    config: EditorConfig,
    assets: PathBuf,
    provider: StaticSession,
    autosave: AutoSaveManager<FileStorage>,
}

impl App {
    pub fn new(cli: &Cli) -> AppResult<Self> {
        let config = match &cli.config {
            Some(path) => EditorConfig::from_json_file(path)?,
            None => EditorConfig::default(),
        };
        let storage = match &config.storage_dir {
            Some(dir) => FileStorage::new(dir.clone())?,
            None => FileStorage::default_location()?,
        };
        let mut autosave = AutoSaveManager::new(Arc::new(storage));
        autosave.set_interval(std::time::Duration::from_secs(config.autosave_interval_secs));

        let provider = match &cli.user {
            Some(user_id) => StaticSession::signed_in(UserSession {
                user_id: user_id.clone(),
                email: cli.email.clone().unwrap_or_else(|| user_id.clone()),
                tier: Default::default(),
            }),
            None => StaticSession::signed_out(),
        };

        Ok(Self {
            config,
            assets: cli.assets.clone(),
            provider,
            autosave,
        })
    }

    fn open_session(&self) -> AppResult<EditorSession<SceneSurface>> {
        let (width, height) = PLACEHOLDER_SIZE;
        let resolver = DecodingResolver::new()
            .with_base_dir(&self.assets)
            .with_placeholder(width, height);
        let surface = SceneSurface::new(self.config.default_category.canvas_size());
        let session = EditorSession::open(&self.provider, surface, Rc::new(resolver), self.config.clone())?;
        Ok(session)
    }

    pub async fn run(&mut self, command: Command) -> AppResult<()> {
        match command {
            Command::Templates { category } => self.list_templates(category.as_deref()).await,
            Command::Render(args) => self.render(args).await.map(|id| println!("{}", id)),
            Command::Export { design_id, output } => self.export(&design_id, &output).await,
            Command::Resume { output } => self.resume(&output).await,
            Command::Designs => self.list_designs().await,
        }
    }

    async fn list_templates(&self, category: Option<&str>) -> AppResult<()> {
        let catalog = BuiltinCatalog::new()?;
        for template in catalog.list_templates(category).await? {
            println!("{}\t{}\t{}", template.id, template.category, template.name);
        }
        Ok(())
    }

    /// Returns the ID of the saved design.
    pub async fn render(&mut self, args: RenderArgs) -> AppResult<String> {
        let mut session = self.open_session()?;
        if let Some(name) = &args.category {
            let category =
                DesignCategory::from_name(name).ok_or_else(|| AppError::UnknownCategory(name.clone()))?;
            session.set_category(category);
        }

        let catalog = BuiltinCatalog::new()?;
        let skipped = session.load_template_by_id(&catalog, &args.template).await?;
        for entry in &skipped {
            log::warn!("Template entry {} skipped: {}", entry.index, entry.error);
        }
        settle(&mut session);
        session.set_title(args.title.unwrap_or_else(|| args.template.clone()));

        self.autosave.mark_dirty();
        let id = self.autosave.save(&session.record()).await?;
        write_export(&session, &args.output)?;
        session.close();
        Ok(id)
    }

    pub async fn export(&mut self, design_id: &str, output: &Path) -> AppResult<()> {
        let mut session = self.open_session()?;
        let record = self.autosave.load(design_id).await?;
        let owner = session.user().user_id.clone();
        if record.owner != owner {
            return Err(StorageError::NotFound(design_id.to_string()).into());
        }
        session.load_record(record);
        settle(&mut session);
        write_export(&session, output)?;
        session.close();
        Ok(())
    }

    /// Export the signed-in user's most recently saved design.
    pub async fn resume(&mut self, output: &Path) -> AppResult<()> {
        let mut session = self.open_session()?;
        let user_id = session.user().user_id.clone();
        let record = self
            .autosave
            .load_last(&user_id)
            .await
            .ok_or(AppError::NothingToResume)?;
        session.load_record(record);
        settle(&mut session);
        write_export(&session, output)?;
        session.close();
        Ok(())
    }

    async fn list_designs(&self) -> AppResult<()> {
        let session = self.open_session()?;
        for design in self.autosave.list_designs(&session.user().user_id).await? {
            println!(
                "{}\t{}\t{}\t{} elements",
                design.design_id, design.title, design.category, design.element_count
            );
        }
        Ok(())
    }
}

/// Let image loads finish and report the ones that failed.
fn settle(session: &mut EditorSession<SceneSurface>) {
    while session.pending_loads() > 0 {
        if session.tick() == 0 && session.pending_loads() > 0 {
            break;
        }
    }
    for failure in session.take_failures() {
        log::warn!("Image {} not loaded: {}", failure.source, failure.error);
    }
}

fn write_export(session: &EditorSession<SceneSurface>, output: &Path) -> AppResult<()> {
    let bytes = session.export(raster_format_for(output))?;
    std::fs::write(output, bytes).map_err(|source| AppError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {}", output.display());
    Ok(())
}
