//! Seasonal artwork renderer: finishing pass over a generated image.

use std::path::Path;

use spindle_media::FfmpegCommand;
use spindle_models::{ArtworkPayload, RenderJob, RenderResult};

use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::render::{escape_drawtext, safe_key_segment, Renderer};

pub(super) async fn render(
    r: &Renderer,
    job: &RenderJob,
    payload: &ArtworkPayload,
    workdir: &Path,
) -> WorkerResult<RenderResult> {
    let logger = JobLogger::new(&job.id, "render_artwork");

    let source = workdir.join("source.png");
    r.downloader.fetch(&payload.image_url, &source).await?;
    logger.log_progress(&format!("downloaded source for event {}", payload.event_id));

    let mut filter = String::from("scale=1080:-2");
    if let Some(caption) = &payload.caption {
        filter.push_str(&format!(
            ",drawtext=text='{}':fontcolor=white:fontsize=48:\
             box=1:boxcolor=black@0.5:boxborderw=16:\
             x=(w-text_w)/2:y=h-text_h-48",
            escape_drawtext(caption)
        ));
    }

    let output = workdir.join("artwork.jpg");
    let cmd = FfmpegCommand::new(&source, &output)
        .video_filter(filter)
        .quality(2);
    r.ffmpeg.run(&cmd).await?;

    let key = format!(
        "artwork/{}/{}.jpg",
        safe_key_segment(&payload.event_id),
        job.id
    );
    r.upload_artifact(&output, &key, "image/jpeg").await
}
