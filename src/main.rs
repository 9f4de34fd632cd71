//! # Carteirinha CLI
//!
//! Command-line interface for ID-card templates.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP API, keeping templates under ./data
//! carteirinha serve --listen 0.0.0.0:8080 --data-dir ./data
//!
//! # Check a template file
//! carteirinha validate aluno.json
//!
//! # Render both sides with values and a photo
//! carteirinha render aluno.json --side both --values maria.json --photo foto=maria.jpg --out cards/
//!
//! # Print a starting template
//! carteirinha new-template --name "Carteira Estudante" --front frente.png > aluno.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carteirinha::{
    CarteirinhaError,
    assets::{self, AssetLoader},
    config::Config,
    export::Exporter,
    render::{Compositor, Renderer},
    template::{GeneratedValues, Side, Template, validate},
    upload,
};

/// Carteirinha - ID-card template designer and renderer
#[derive(Parser, Debug)]
#[command(name = "carteirinha")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideArg {
    Front,
    Back,
    Both,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,

        /// Keep templates and images in this directory instead of memory
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Validate a template file
    Validate {
        /// Template JSON file
        template: PathBuf,
    },

    /// Render a template to PNG files
    Render {
        /// Template JSON file
        template: PathBuf,

        /// Side to render
        #[arg(long, value_enum, default_value = "front")]
        side: SideArg,

        /// JSON object mapping field ids to text
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,

        /// Photo for a field, as FIELD_ID=PATH (repeatable)
        #[arg(long = "photo", value_name = "FIELD=PATH")]
        photos: Vec<String>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// TTF/OTF font to use instead of the built-in bitmap font
        #[arg(long, value_name = "FILE")]
        font: Option<PathBuf>,

        /// Render even if the template does not validate
        #[arg(long)]
        force: bool,
    },

    /// Print a template skeleton as JSON
    NewTemplate {
        /// Template name
        #[arg(long, default_value = "Nova carteirinha")]
        name: String,

        /// Front background image (path or URL)
        #[arg(long, default_value = "")]
        front: String,

        /// Back background image (path or URL)
        #[arg(long)]
        back: Option<String>,

        /// Card width in pixels
        #[arg(long, default_value = "1011")]
        width: u32,

        /// Card height in pixels
        #[arg(long, default_value = "638")]
        height: u32,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carteirinha=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), CarteirinhaError> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve { listen, data_dir } => {
            if let Some(listen) = listen {
                config.server.listen_addr = listen;
            }
            if data_dir.is_some() {
                config.server.data_dir = data_dir;
            }
            runtime()?.block_on(carteirinha::server::serve(config))
        }

        Commands::Validate { template } => {
            let template = read_template(&template)?;
            let report = validate(&template);
            if report.is_valid {
                println!("'{}' is valid", template.name);
                return Ok(());
            }
            for error in &report.errors {
                println!("  - {}", error);
            }
            Err(CarteirinhaError::Validation(format!(
                "'{}' has {} problem(s)",
                template.name,
                report.errors.len()
            )))
        }

        Commands::Render {
            template,
            side,
            values,
            photos,
            out,
            font,
            force,
        } => {
            if font.is_some() {
                config.render.font_path = font;
            }
            let template = read_template(&template)?;
            let report = validate(&template);
            if !report.is_valid {
                for error in &report.errors {
                    eprintln!("  - {}", error);
                }
                if !force {
                    return Err(CarteirinhaError::Validation(
                        "Template is not valid (use --force to render anyway)".to_string(),
                    ));
                }
            }
            let text = match values {
                Some(path) => read_values(&path)?,
                None => HashMap::new(),
            };
            let photos = parse_photo_args(&photos)?;

            runtime()?.block_on(render_cards(&config, &template, side, text, photos, &out))
        }

        Commands::NewTemplate {
            name,
            front,
            back,
            width,
            height,
        } => {
            let mut template = Template::new(name, front, width, height);
            template.back_image_url = back;
            println!("{}", serde_json::to_string_pretty(&template)?);
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CarteirinhaError> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn read_template(path: &Path) -> Result<Template, CarteirinhaError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn read_values(path: &Path) -> Result<HashMap<String, String>, CarteirinhaError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn parse_photo_args(args: &[String]) -> Result<Vec<(String, String)>, CarteirinhaError> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .filter(|(field, path)| !field.is_empty() && !path.is_empty())
                .map(|(field, path)| (field.to_string(), path.to_string()))
                .ok_or_else(|| CarteirinhaError::Validation(format!("Expected FIELD=PATH, got '{}'", arg)))
        })
        .collect()
}

async fn render_cards(
    config: &Config,
    template: &Template,
    side: SideArg,
    text: HashMap<String, String>,
    photos: Vec<(String, String)>,
    out: &Path,
) -> Result<(), CarteirinhaError> {
    let loader = Arc::new(AssetLoader::new()?);
    let compositor = Arc::new(Compositor::new(Renderer::from_config(&config.render)?, loader));
    let exporter = Exporter::new(compositor);

    let mut values = GeneratedValues::from_text(text);
    for (field_id, path) in photos {
        let file = upload::read_checked(Path::new(&path), &config.upload).await?;
        values.set_photo(field_id, assets::decode(file.bytes).await?);
    }

    let written = match side {
        SideArg::Front => vec![exporter.export_side(out, template, Side::Front, &values).await?],
        SideArg::Back => vec![exporter.export_side(out, template, Side::Back, &values).await?],
        SideArg::Both => {
            let (front, back) = exporter.export_both(out, template, &values).await?;
            vec![front, back]
        }
    };
    for path in written {
        info!(path = %path.display(), "Card written");
        println!("{}", path.display());
    }
    Ok(())
}
