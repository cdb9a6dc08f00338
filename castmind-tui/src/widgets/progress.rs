//! Percentage gauge for resource usage.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge},
    Frame,
};

pub struct ProgressBar<'a> {
    pub title: &'a str,
    /// 0-100; out-of-range values are clamped.
    pub percent: f64,
    pub style: Style,
}

impl<'a> ProgressBar<'a> {
    pub fn ratio(&self) -> f64 {
        if self.percent.is_nan() {
            return 0.0;
        }
        (self.percent / 100.0).clamp(0.0, 1.0)
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let gauge = Gauge::default()
            .block(Block::default().title(self.title).borders(Borders::ALL))
            .gauge_style(self.style)
            .label(format!("{:.1}%", self.percent))
            .ratio(self.ratio());
        f.render_widget(gauge, area);
    }
}
