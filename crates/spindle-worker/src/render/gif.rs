//! Shelf GIF renderer: frame sequence to palette-optimized GIF.

use std::path::Path;

use spindle_media::FfmpegCommand;
use spindle_models::{GifPayload, RenderJob, RenderResult};

use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::render::Renderer;

pub(super) async fn render(
    r: &Renderer,
    job: &RenderJob,
    payload: &GifPayload,
    workdir: &Path,
) -> WorkerResult<RenderResult> {
    let logger = JobLogger::new(&job.id, "render_gif");

    for (i, url) in payload.frame_urls.iter().enumerate() {
        r.downloader
            .fetch(url, workdir.join(format!("frame_{i:03}.jpg")))
            .await?;
    }
    logger.log_progress(&format!("downloaded {} frames", payload.frame_urls.len()));

    let output = workdir.join("shelf.gif");
    let cmd = FfmpegCommand::new(workdir.join("frame_%03d.jpg"), &output)
        .framerate(frames_per_second(payload.frame_delay_ms))
        .filter_complex(
            "scale=720:-2:flags=lanczos,split[a][b];\
             [a]palettegen=stats_mode=diff[p];\
             [b][p]paletteuse=dither=bayer:bayer_scale=5[out]",
        )
        .map("[out]")
        .output_arg("-loop")
        .output_arg("0");
    r.ffmpeg.run(&cmd).await?;

    let key = format!("gifs/{}.gif", job.id);
    r.upload_artifact(&output, &key, "image/gif").await
}

/// Input frame rate for the requested inter-frame delay.
fn frames_per_second(frame_delay_ms: u64) -> f64 {
    1000.0 / frame_delay_ms.max(1) as f64
}
