//! Block rendering collaborator
//!
//! Handles decide whether and where a block is written; how it looks is up
//! to the `BlockRenderer`.

/// Renders a titled block of lines into a single string
pub trait BlockRenderer: Send + Sync {
    fn render_block(&self, title: &str, lines: &[String], style: &str) -> String;
}

/// Plain ASCII renderer
///
/// `style` picks the border character: `"double"` uses `=`, `"bold"` uses
/// `#`, anything else uses `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl BlockRenderer for PlainRenderer {
    fn render_block(&self, title: &str, lines: &[String], style: &str) -> String {
        let border = match style {
            "double" => '=',
            "bold" => '#',
            _ => '-',
        };

        let width = lines
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(title.chars().count() + 4))
            .max()
            .unwrap_or(0)
            + 4;

        let mut out = String::new();
        let title_part = format!("{0}{0} {1} ", border, title);
        out.push_str(&title_part);
        let pad = width.saturating_sub(title_part.chars().count());
        out.extend(std::iter::repeat(border).take(pad));
        for line in lines {
            out.push('\n');
            out.push_str("  ");
            out.push_str(line);
        }
        out.push('\n');
        out.extend(std::iter::repeat(border).take(width));
        out
    }
}
