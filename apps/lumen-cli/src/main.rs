mod scene;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lumen_common::ContextKey;
use lumen_render::{
    BucketType, Drawable, Queue, RecordingBackend, RenderConfig, StateRenderer, distance_to_cam,
};
use lumen_state::{RenderContext, StateType};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::scene::Scene;

#[derive(Parser)]
#[command(name = "lumen-cli", about = "Inspect render-state resolution and draw ordering")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Render configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Scene description (YAML); the built-in demo scene if omitted
    #[arg(short, long, global = true)]
    scene: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate info, state types and the effective configuration
    Info,
    /// Print the resolved world states of every drawable
    States,
    /// Sort the scene into buckets and print the draw order
    Sort {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Render frames against a recording backend and report what was applied
    Render {
        /// Number of frames to render
        #[arg(short, long, default_value = "2")]
        frames: usize,
        /// Invalidate the context before this frame, as after a context loss
        #[arg(long)]
        invalidate_at: Option<usize>,
        /// Print every backend call
        #[arg(long)]
        calls: bool,
    },
}

#[derive(Serialize)]
struct SortedEntry {
    bucket: BucketType,
    position: usize,
    name: String,
    /// Squared camera distance; absent when unmeasurable.
    distance: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("lumen-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", lumen_common::crate_info());
            println!("state: {}", lumen_state::crate_info());
            println!("render: {}", lumen_render::crate_info());
            let names: Vec<&str> = StateType::ALL.iter().map(|ty| ty.name()).collect();
            println!("state types ({}): {}", StateType::COUNT, names.join(", "));
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::States => {
            let scene = Scene::load(cli.scene.as_deref())?;
            for drawable in scene.drawables() {
                println!("{} [{}]", drawable.name(), drawable.bucket());
                for ty in StateType::ALL {
                    if let Some(state) = drawable.world_state(ty) {
                        let params = serde_json::to_string(state.params())?;
                        let flag = if state.is_enabled() { "" } else { " (disabled)" };
                        println!("  {ty}{flag}: {params}");
                    }
                }
            }
        }
        Commands::Sort { json } => {
            let scene = Scene::load(cli.scene.as_deref())?;
            let camera = scene.camera.camera();
            let mut queue = Queue::new(&config.queue);
            for drawable in scene.drawables() {
                if !queue.add(drawable) {
                    tracing::debug!("skipped drawable");
                }
            }
            queue.sort(&camera);

            let mut entries = Vec::new();
            for bucket in queue.buckets() {
                for (position, drawable) in bucket.iter().enumerate() {
                    let distance = distance_to_cam(&**drawable, &camera);
                    entries.push(SortedEntry {
                        bucket: bucket.bucket_type(),
                        position,
                        name: drawable.name().to_string(),
                        distance: distance.is_finite().then_some(distance),
                    });
                }
            }
            queue.clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let distance = entry
                        .distance
                        .map_or_else(|| "-".to_string(), |d| format!("{d:.2}"));
                    println!(
                        "{:<12} {:>3}  {:<12} {distance}",
                        entry.bucket.to_string(),
                        entry.position,
                        entry.name
                    );
                }
            }
        }
        Commands::Render {
            frames,
            invalidate_at,
            calls,
        } => {
            let scene = Scene::load(cli.scene.as_deref())?;
            render(&scene, &config, frames, invalidate_at, calls)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenderConfig> {
    match path {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn render(
    scene: &Scene,
    config: &RenderConfig,
    frames: usize,
    invalidate_at: Option<usize>,
    show_calls: bool,
) -> anyhow::Result<()> {
    let mut context = RenderContext::new(ContextKey::new(), config.capabilities);
    context.set_current_camera(Some(scene.camera.camera()));
    tracing::info!(ctx = %context.key(), "render context created");

    let mut renderer = StateRenderer::new(context, RecordingBackend::new());
    let mut queue = Queue::new(&config.queue);
    let drawables = scene.drawables();
    let mut passes = scene.pass_manager(&drawables)?;

    for frame in 0..frames {
        if invalidate_at == Some(frame) {
            renderer.invalidate();
            tracing::info!(frame, "context invalidated");
        }
        renderer.begin_frame();
        for drawable in &drawables {
            queue.add(Rc::clone(drawable) as Rc<dyn Drawable>);
        }
        renderer.render_queue(&mut queue)?;
        passes.render_passes(&mut renderer, &mut queue)?;

        let calls = renderer.backend_mut().take_calls();
        println!(
            "frame {frame}: {} backend_calls={}",
            renderer.stats(),
            calls.len()
        );
        if show_calls {
            for call in &calls {
                println!("  {call}");
            }
        }
    }
    Ok(())
}
