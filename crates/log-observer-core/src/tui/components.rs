//! Reusable TUI components
//!
//! This module contains reusable widget components for the TUI.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

use crate::models::ConnectionStatus;
use crate::viewer::{ChartBar, Segment};

/// A card showing a single counter with a label
pub struct StatCard<'a> {
    title: &'a str,
    value: &'a str,
    color: Color,
}

impl<'a> StatCard<'a> {
    pub fn new(title: &'a str, value: &'a str) -> Self {
        Self {
            title,
            value,
            color: Color::White,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn render(self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        let paragraph = Paragraph::new(Span::styled(
            self.value,
            Style::default().fg(self.color).add_modifier(Modifier::BOLD),
        ))
        .block(block)
        .alignment(Alignment::Center);

        frame.render_widget(paragraph, area);
    }
}

/// Status indicator (colored dot with label)
pub struct StatusIndicator<'a> {
    label: &'a str,
    status: Status,
}

pub enum Status {
    Ok,
    Error,
    Unknown,
}

impl<'a> StatusIndicator<'a> {
    pub fn new(label: &'a str, status: Status) -> Self {
        Self { label, status }
    }

    /// Indicator for a backend connection
    pub fn for_connection(status: &ConnectionStatus) -> StatusIndicator<'static> {
        let kind = match (status.connected, status.error.is_some()) {
            (true, _) => Status::Ok,
            (false, true) => Status::Error,
            (false, false) => Status::Unknown,
        };
        StatusIndicator::new(status.label(), kind)
    }

    pub fn to_span(&self) -> Span<'a> {
        let (symbol, color) = match self.status {
            Status::Ok => ("●", Color::Green),
            Status::Error => ("●", Color::Red),
            Status::Unknown => ("○", Color::DarkGray),
        };

        Span::styled(format!("{} {}", symbol, self.label), Style::default().fg(color))
    }
}

/// Color for a badge category (`error`, `warning`, `success`, ...)
pub fn category_color(category: &str) -> Color {
    match category {
        "error" => Color::Red,
        "warning" => Color::Yellow,
        "info" => Color::Cyan,
        "debug" => Color::DarkGray,
        "success" => Color::Green,
        _ => Color::White,
    }
}

/// Spans for highlighted text; matches are drawn reversed
pub fn highlighted_spans(segments: &[Segment], base: Style) -> Vec<Span<'static>> {
    segments
        .iter()
        .map(|segment| {
            let style = if segment.highlighted {
                base.fg(Color::Black).bg(Color::Yellow)
            } else {
                base
            };
            Span::styled(segment.text.clone(), style)
        })
        .collect()
}

/// Split multi-line highlighted text into lines, keeping highlight runs
pub fn highlighted_lines(segments: &[Segment], base: Style) -> Vec<Line<'static>> {
    let mut lines = vec![Vec::new()];
    for segment in segments {
        for (i, part) in segment.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Vec::new());
            }
            if part.is_empty() {
                continue;
            }
            let piece = Segment {
                text: part.to_string(),
                highlighted: segment.highlighted,
            };
            if let Some(line) = lines.last_mut() {
                line.extend(highlighted_spans(std::slice::from_ref(&piece), base));
            }
        }
    }
    lines.into_iter().map(Line::from).collect()
}

/// Vertical stacked bars, one column group per time bucket
pub struct StackedBarChart<'a> {
    bars: &'a [ChartBar],
    bar_width: u16,
}

impl<'a> StackedBarChart<'a> {
    pub fn new(bars: &'a [ChartBar]) -> Self {
        Self { bars, bar_width: 3 }
    }

    pub fn bar_width(mut self, width: u16) -> Self {
        self.bar_width = width.max(1);
        self
    }
}

impl Widget for StackedBarChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 || self.bars.is_empty() {
            return;
        }
        // last row holds the bucket labels
        let plot_height = area.height - 1;
        let step = self.bar_width + 1;

        for (i, bar) in self.bars.iter().enumerate() {
            let Ok(i) = u16::try_from(i) else { break };
            let x = area.x + i * step;
            if x + self.bar_width > area.right() {
                break;
            }

            // Heights are cumulative so rounding never loses a row
            let mut filled = 0u16;
            let mut cumulative = 0.0;
            for segment in &bar.segments {
                cumulative += segment.height_pct;
                let top = scaled(cumulative, plot_height);
                for row in filled..top {
                    let y = area.y + plot_height - 1 - row;
                    for dx in 0..self.bar_width {
                        buf.get_mut(x + dx, y)
                            .set_symbol("█")
                            .set_style(Style::default().fg(segment.color));
                    }
                }
                filled = filled.max(top);
            }

            let label: String = bar.label.chars().take(usize::from(step)).collect();
            buf.set_string(
                x,
                area.y + plot_height,
                label,
                Style::default().fg(Color::DarkGray),
            );
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(pct: f64, height: u16) -> u16 {
    (pct / 100.0 * f64::from(height))
        .round()
        .clamp(0.0, f64::from(height)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::ChartSegment;

    #[test]
    fn test_highlighted_lines_split_on_newlines() {
        let segments = vec![
            Segment {
                text: "first\nsec".to_string(),
                highlighted: false,
            },
            Segment {
                text: "ond".to_string(),
                highlighted: true,
            },
        ];
        let lines = highlighted_lines(&segments, Style::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans.len(), 2);
        assert_eq!(lines[1].spans[1].style.bg, Some(Color::Yellow));
    }

    #[test]
    fn test_stacked_bar_fills_by_share() {
        let bars = vec![ChartBar {
            label: "12:00".to_string(),
            total: 10,
            height_pct: 100.0,
            segments: vec![
                ChartSegment {
                    category: "error",
                    color: Color::Red,
                    count: 3,
                    share: 0.3,
                    height_pct: 30.0,
                },
                ChartSegment {
                    category: "info",
                    color: Color::Cyan,
                    count: 7,
                    share: 0.7,
                    height_pct: 70.0,
                },
            ],
            tooltip: Vec::new(),
        }];

        let area = Rect::new(0, 0, 4, 11);
        let mut buf = Buffer::empty(area);
        StackedBarChart::new(&bars).render(area, &mut buf);

        // bottom three rows red, the seven above cyan
        assert_eq!(buf.get(0, 9).fg, Color::Red);
        assert_eq!(buf.get(0, 7).fg, Color::Red);
        assert_eq!(buf.get(0, 6).fg, Color::Cyan);
        assert_eq!(buf.get(0, 0).fg, Color::Cyan);
    }

    #[test]
    fn test_connection_indicator() {
        let span = StatusIndicator::for_connection(&ConnectionStatus::failed("refused")).to_span();
        assert_eq!(span.content, "● Connection failed");
        assert_eq!(span.style.fg, Some(Color::Red));
    }
}
