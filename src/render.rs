//! Campaign text rendering
//!
//! Turns the lightly marked-up copy returned by the campaign stage into display
//! segments, one input line to at most one segment.

use serde::Serialize;

const EMPHASIS: &str = "**";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Heading3,
    Heading4,
    ListItem,
    Paragraph,
}

/// Inline run of text within a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum Span {
    Text(String),
    Emphasis(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub spans: Vec<Span>,
}

impl Segment {
    /// Plain text of the segment with emphasis markers dropped
    pub fn content(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span {
                Span::Text(text) | Span::Emphasis(text) => text.as_str(),
            })
            .collect()
    }
}

/// Render campaign copy into display segments
pub fn render(text: &str) -> Vec<Segment> {
    text.lines().filter_map(render_line).collect()
}

fn render_line(line: &str) -> Option<Segment> {
    let line = line.trim();

    let (kind, body) = if let Some(rest) = line.strip_prefix("####") {
        (SegmentKind::Heading4, rest)
    } else if let Some(rest) = line.strip_prefix("###") {
        (SegmentKind::Heading3, rest)
    } else if let Some(rest) = line.strip_prefix("- ") {
        (SegmentKind::ListItem, rest)
    } else {
        (SegmentKind::Paragraph, line)
    };

    let spans = parse_spans(body.trim());
    if spans.is_empty() {
        return None;
    }

    Some(Segment { kind, spans })
}

/// Split `**bold**` pairs into emphasis spans; an unpaired marker stays literal
fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(EMPHASIS) {
        let after_open = &rest[open + EMPHASIS.len()..];
        let Some(close) = after_open.find(EMPHASIS) else {
            break;
        };

        push_text(&mut spans, &rest[..open]);
        let emphasized = &after_open[..close];
        if !emphasized.is_empty() {
            spans.push(Span::Emphasis(emphasized.to_string()));
        }
        rest = &after_open[close + EMPHASIS.len()..];
    }

    push_text(&mut spans, rest);
    spans
}

fn push_text(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(Span::Text(previous)) => previous.push_str(text),
        _ => spans.push(Span::Text(text.to_string())),
    }
}
