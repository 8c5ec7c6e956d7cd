use crate::app::App;
use crate::video::VideoStage;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Gauge, Paragraph, Wrap},
    Frame,
};

use super::render::{panel_block, spinner};

fn stage_label(stage: VideoStage) -> &'static str {
    match stage {
        VideoStage::Uninitialized => "Downloader not loaded",
        VideoStage::Initializing => "Loading downloader",
        VideoStage::Ready => "Ready",
        VideoStage::Downloading => "Downloading",
        VideoStage::Finished => "Finished",
        VideoStage::Failed => "Failed",
    }
}

/// Render the video panel: stage, progress gauge and the last saved file.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let video = &app.session.video;
    let block = panel_block("Video");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let stage = video.stage();
    let mut header = stage_label(stage).to_string();
    if matches!(stage, VideoStage::Initializing | VideoStage::Downloading) {
        header = format!("{} {}", spinner(app), header);
    }
    f.render_widget(Paragraph::new(header), chunks[0]);

    // No progress state means the indicator is hidden.
    if let Some(progress) = video.progress() {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(progress.fraction())
            .label(progress.to_string());
        f.render_widget(gauge, chunks[1]);
    }

    let mut details = vec![Line::from(format!(
        "Saving to {}",
        video.save_dir().display()
    ))];
    if let Some(path) = video.last_file() {
        details.push(Line::from(format!("Last file: {}", path.display())));
        details.push(Line::from("Press o to open it."));
    }
    f.render_widget(
        Paragraph::new(details)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: false }),
        chunks[2],
    );
}
