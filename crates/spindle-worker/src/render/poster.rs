//! Collection poster renderer: a tiled grid of cover scans.

use std::path::Path;

use spindle_media::FfmpegCommand;
use spindle_models::{PosterPayload, RenderJob, RenderResult};

use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::render::{escape_drawtext, Renderer};

/// Cover cell edge in pixels.
const CELL: u32 = 600;

/// Footer height when a title is rendered.
const FOOTER: u32 = 140;

pub(super) async fn render(
    r: &Renderer,
    job: &RenderJob,
    payload: &PosterPayload,
    workdir: &Path,
) -> WorkerResult<RenderResult> {
    let logger = JobLogger::new(&job.id, "render_poster");

    for (i, url) in payload.cover_urls.iter().enumerate() {
        r.downloader
            .fetch(url, workdir.join(format!("cover_{i:03}.jpg")))
            .await?;
    }
    logger.log_progress(&format!("downloaded {} covers", payload.cover_urls.len()));

    let columns = payload.columns;
    let rows = grid_rows(payload.cover_urls.len(), columns);
    let output = workdir.join("poster.jpg");

    let mut filter = format!(
        "scale={CELL}:{CELL}:force_original_aspect_ratio=increase,\
         crop={CELL}:{CELL},tile={columns}x{rows}"
    );
    if let Some(title) = &payload.title {
        filter.push_str(&format!(
            ",pad=iw:ih+{FOOTER}:0:0:color=0x111111,\
             drawtext=text='{}':fontcolor=white:fontsize=56:\
             x=(w-text_w)/2:y=h-{FOOTER}+40",
            escape_drawtext(title)
        ));
    }

    let cmd = FfmpegCommand::new(workdir.join("cover_%03d.jpg"), &output)
        .video_filter(filter)
        .single_frame()
        .quality(3);
    r.ffmpeg.run(&cmd).await?;

    let key = format!("posters/{}.jpg", job.id);
    r.upload_artifact(&output, &key, "image/jpeg").await
}

/// Rows needed to tile `count` covers at `columns` per row.
fn grid_rows(count: usize, columns: u32) -> u32 {
    let count = count as u32;
    count.div_ceil(columns.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rows() {
        assert_eq!(grid_rows(1, 3), 1);
        assert_eq!(grid_rows(3, 3), 1);
        assert_eq!(grid_rows(4, 3), 2);
        assert_eq!(grid_rows(9, 3), 3);
        assert_eq!(grid_rows(10, 3), 4);
        // Degenerate column count never divides by zero.
        assert_eq!(grid_rows(5, 0), 5);
    }
}
