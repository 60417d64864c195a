//! Run command - generate a lip-synced video

use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::engine::GenerationParams;
use crate::error::LipSyncResult;
use crate::pipeline::{LipSyncPipeline, RunRequest};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> LipSyncResult<()> {
    let mut config = config.clone();
    if let Some(dir) = args.cache_dir.clone() {
        config.cache.root = Some(dir);
    }
    if args.keep_temp {
        config.pipeline.keep_workspace = true;
    }

    let request = RunRequest {
        image: args.image.clone(),
        audio: args.audio.clone(),
        output: args.output.clone(),
        engine: args.engine,
        params: build_params(&args, &config),
        upscale: args.upscale && config.upscale.enabled,
        keep_workspace: config.pipeline.keep_workspace,
    };
    debug!("Run request: {:?}", request);

    let pb = create_progress_bar(&format!("Running {} pipeline...", args.engine));
    let pipeline = LipSyncPipeline::new(config);

    let result = pipeline.run(&request).await;
    pb.finish_and_clear();

    let outcome = result?;
    println!(
        "{} Wrote {}",
        style("✓").green(),
        style(outcome.final_clip.display()).cyan()
    );
    if let Some(raw) = &outcome.raw_clip {
        if *raw != outcome.final_clip {
            println!("  Raw clip: {}", raw.display());
        }
    }
    if let Some(workspace) = &outcome.workspace {
        println!("  Workspace retained: {}", workspace.display());
    }

    Ok(())
}

/// Merge CLI flags over configured defaults
fn build_params(args: &RunArgs, config: &Config) -> GenerationParams {
    GenerationParams {
        resolution: args.resolution.unwrap_or(config.pipeline.resolution),
        fps: args.fps.unwrap_or(config.pipeline.fps),
        preprocess: args.preprocess,
        expression_scale: args.expression_scale,
        still: args.no_still.then_some(false),
        enhancer: args.enhancer.clone(),
        pads: args.pads.as_ref().map(|v| [v[0], v[1], v[2], v[3]]),
        static_face: args.no_static.then_some(false),
        nosmooth: args.nosmooth.then_some(true),
        wav2lip_batch_size: args.wav2lip_batch_size,
        face_det_batch_size: args.face_det_batch_size,
        resize_factor: args.resize_factor,
        crop: args.crop.as_ref().map(|v| [v[0], v[1], v[2], v[3]]),
    }
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}
