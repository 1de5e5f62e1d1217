//! Flowing page layout on top of the PDF writer.

use crate::pdf::{Font, JpegImage, PAGE_HEIGHT, PAGE_WIDTH, Page};

const MARGIN_X: f32 = 56.0;
const MARGIN_TOP: f32 = 64.0;
const MARGIN_BOTTOM: f32 = 72.0;
const FOOTER_Y: f32 = 36.0;
const LINE_SPACING: f32 = 1.35;
const COLUMN_GAP: f32 = 24.0;

/// Lays text out top to bottom, breaking onto new pages as needed.
pub struct DocumentLayout {
    pages: Vec<Page>,
    current: Page,
    cursor: f32,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLayout {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::new(),
            cursor: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn content_width() -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN_X
    }

    fn line_height(size: f32) -> f32 {
        size * LINE_SPACING
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor = PAGE_HEIGHT - MARGIN_TOP;
    }

    /// Make room for `height` points, starting a new page when the current one is full.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN_BOTTOM && !self.current.is_empty() {
            self.new_page();
        }
    }

    /// Vertical whitespace.
    pub fn spacer(&mut self, height: f32) {
        self.cursor -= height;
    }

    /// A single bold line.
    pub fn heading(&mut self, text: &str, size: f32) {
        self.paragraph_with(text, Font::Bold, size, MARGIN_X, Self::content_width());
    }

    /// Wrapped body text.
    pub fn paragraph(&mut self, text: &str, size: f32) {
        self.paragraph_with(text, Font::Regular, size, MARGIN_X, Self::content_width());
    }

    /// A bold label followed by a value on the same line.
    pub fn label_value(&mut self, label: &str, value: &str, size: f32) {
        let label = format!("{label}: ");
        let label_width = Font::Bold.text_width(&label, size);
        let lines = wrap_text(value, Font::Regular, size, Self::content_width() - label_width);

        for (i, line) in lines.iter().enumerate() {
            self.reserve(Self::line_height(size));
            let baseline = self.cursor - size;
            if i == 0 {
                self.current.text(MARGIN_X, baseline, Font::Bold, size, &label);
            }
            self.current
                .text(MARGIN_X + label_width, baseline, Font::Regular, size, line);
            self.cursor -= Self::line_height(size);
        }
    }

    /// Two bulleted columns of short items.
    pub fn columns(&mut self, left: &[String], right: &[String], size: f32) {
        let column_width = (Self::content_width() - COLUMN_GAP) / 2.0;
        let rows = left.len().max(right.len());

        for row in 0..rows {
            let left_lines = left
                .get(row)
                .map(|item| wrap_text(&format!("- {item}"), Font::Regular, size, column_width))
                .unwrap_or_default();
            let right_lines = right
                .get(row)
                .map(|item| wrap_text(&format!("- {item}"), Font::Regular, size, column_width))
                .unwrap_or_default();

            let height = left_lines.len().max(right_lines.len()) as f32 * Self::line_height(size);
            self.reserve(height);

            for (x, lines) in [
                (MARGIN_X, &left_lines),
                (MARGIN_X + column_width + COLUMN_GAP, &right_lines),
            ] {
                let mut y = self.cursor - size;
                for line in lines {
                    self.current.text(x, y, Font::Regular, size, line);
                    y -= Self::line_height(size);
                }
            }
            self.cursor -= height;
        }
    }

    /// Image number `index` of the document, scaled to the content width
    /// and at most `max_height` points tall.
    pub fn image(&mut self, index: usize, image: &JpegImage, max_height: f32) {
        let aspect = image.height() as f32 / image.width() as f32;
        let mut width = Self::content_width();
        let mut height = width * aspect;
        if height > max_height {
            height = max_height;
            width = height / aspect;
        }

        self.reserve(height);
        self.current
            .image(index, MARGIN_X, self.cursor - height, width, height);
        self.cursor -= height;
    }

    /// A horizontal rule across the content width.
    pub fn rule(&mut self) {
        self.reserve(12.0);
        self.cursor -= 6.0;
        self.current
            .rule(MARGIN_X, PAGE_WIDTH - MARGIN_X, self.cursor);
        self.cursor -= 6.0;
    }

    fn paragraph_with(&mut self, text: &str, font: Font, size: f32, x: f32, width: f32) {
        for line in wrap_text(text, font, size, width) {
            self.reserve(Self::line_height(size));
            self.current.text(x, self.cursor - size, font, size, &line);
            self.cursor -= Self::line_height(size);
        }
    }

    /// Finish the document, stamping every page with `footer` and its page number.
    pub fn finish(mut self, footer: &str) -> Vec<Page> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.new_page();
        }

        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            let number = format!("Page {} of {total}", i + 1);
            let number_width = Font::Regular.text_width(&number, 9.0);
            page.muted_text(MARGIN_X, FOOTER_Y, 9.0, footer);
            page.muted_text(PAGE_WIDTH - MARGIN_X - number_width, FOOTER_Y, 9.0, &number);
        }
        self.pages
    }
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, font: Font, size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut line = String::new();
        for word in raw_line.split_whitespace() {
            for piece in split_long_word(word, font, size, width) {
                let candidate = if line.is_empty() {
                    piece.clone()
                } else {
                    format!("{line} {piece}")
                };
                if font.text_width(&candidate, size) <= width || line.is_empty() {
                    line = candidate;
                } else {
                    lines.push(std::mem::take(&mut line));
                    line = piece;
                }
            }
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn split_long_word(word: &str, font: Font, size: f32, width: f32) -> Vec<String> {
    if font.text_width(word, size) <= width {
        return vec![word.to_string()];
    }

    let per_line = ((width / font.text_width("m", size)).floor() as usize).max(1);
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(per_line)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width() {
        let text = "Spacious suite with a king sized bed, a sitting area and a large en-suite shower room";
        let lines = wrap_text(text, Font::Regular, 12.0, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Regular.text_width(line, 12.0) <= 150.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let word = "x".repeat(200);
        let lines = wrap_text(&word, Font::Regular, 12.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        let lines = wrap_text("first\n\nsecond", Font::Regular, 12.0, 400.0);
        assert_eq!(lines, vec!["first", "", "second"]);
        assert_eq!(wrap_text("", Font::Regular, 12.0, 400.0), vec![""]);
    }

    #[test]
    fn test_long_content_breaks_pages() {
        let mut layout = DocumentLayout::new();
        for i in 0..120 {
            layout.paragraph(&format!("Line {i}"), 12.0);
        }
        let pages = layout.finish("footer");
        assert!(pages.len() >= 2);
    }

    #[test]
    fn test_image_keeps_aspect_ratio() {
        // 800x400 baseline JPEG frame header.
        let data = [
            0xff, 0xd8, 0xff, 0xc0, 0x00, 0x0b, 0x08, 0x01, 0x90, 0x03, 0x20, 0x01, 0x01, 0x11,
            0x00, 0xff, 0xd9,
        ];
        let image = JpegImage::parse(&data).unwrap();

        let mut wide = DocumentLayout::new();
        wide.image(0, &image, 600.0);
        let width = DocumentLayout::content_width();
        assert_eq!(wide.cursor, PAGE_HEIGHT - MARGIN_TOP - width / 2.0);

        let mut short = DocumentLayout::new();
        short.image(0, &image, 100.0);
        assert_eq!(short.cursor, PAGE_HEIGHT - MARGIN_TOP - 100.0);

        let pages = short.finish("footer");
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_empty_layout_has_one_page() {
        let pages = DocumentLayout::new().finish("footer");
        assert_eq!(pages.len(), 1);
    }
}
