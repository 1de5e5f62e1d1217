//! Minimal PDF 1.4 writer.
//!
//! Produces uncompressed documents using the standard Type1 Helvetica fonts,
//! which every conforming reader provides without embedding. Text is encoded
//! as WinAnsi. JPEG images are embedded as-is through the DCT filter.

use crate::error::{RenderError, RenderResult};
use std::fmt::Write as _;

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.0;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 842.0;

/// Upper bound on pages per document.
pub const MAX_PAGES: usize = 500;

/// Fonts available to page content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    /// Approximate advance width of `text` at `size` points.
    ///
    /// Helvetica averages a little over half an em per glyph; bold runs wider.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let per_char = match self {
            Self::Regular => 0.52,
            Self::Bold => 0.57,
        };
        text.chars().count() as f32 * size * per_char
    }
}

/// Content of a single page, as PDF drawing operators.
#[derive(Clone, Debug, Default)]
pub struct Page {
    ops: String,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a single line of text with its baseline at (`x`, `y`).
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT /{} {size:.1} Tf {x:.2} {y:.2} Td ({}) Tj ET",
            font.resource(),
            escape_text(text)
        );
    }

    /// Draw a grey text line, used for footers.
    pub fn muted_text(&mut self, x: f32, y: f32, size: f32, text: &str) {
        self.ops.push_str("0.45 g\n");
        self.text(x, y, Font::Regular, size, text);
        self.ops.push_str("0 g\n");
    }

    /// Stroke a horizontal rule.
    pub fn rule(&mut self, x1: f32, x2: f32, y: f32) {
        let _ = writeln!(self.ops, "0.6 w {x1:.2} {y:.2} m {x2:.2} {y:.2} l S");
    }

    /// Place image number `index` of the document with its lower left corner at (`x`, `y`).
    pub fn image(&mut self, index: usize, x: f32, y: f32, width: f32, height: f32) {
        let _ = writeln!(
            self.ops,
            "q {width:.2} 0 0 {height:.2} {x:.2} {y:.2} cm /Im{} Do Q",
            index + 1
        );
    }

    /// Whether nothing has been drawn.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Escape a string for a PDF literal shown with a WinAnsi font.
///
/// Characters beyond ASCII are written as octal escapes of their WinAnsi
/// code. Characters the encoding lacks become `?`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\t' => out.push(' '),
            _ => match win_ansi_code(c) {
                Some(code) => {
                    let _ = write!(out, "\\{code:03o}");
                }
                None => out.push('?'),
            },
        }
    }
    out
}

/// WinAnsi code of a non-ASCII character.
fn win_ansi_code(c: char) -> Option<u8> {
    let code = match c {
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(code)
}

/// A baseline or progressive JPEG ready to embed.
#[derive(Clone, Debug)]
pub struct JpegImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    components: u8,
}

impl JpegImage {
    /// Read the frame header of `data`. Returns `None` when `data` is not a
    /// JPEG a reader can decode with the DCT filter.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if !data.starts_with(&[0xff, 0xd8]) {
            return None;
        }

        let mut pos = 2;
        while pos + 4 <= data.len() {
            if data[pos] != 0xff {
                return None;
            }
            let marker = data[pos + 1];
            if marker == 0xff {
                pos += 1;
                continue;
            }
            let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            if len < 2 {
                return None;
            }

            // SOF0 to SOF15, except DHT (C4), JPG (C8) and DAC (CC).
            if matches!(marker, 0xc0..=0xcf) && !matches!(marker, 0xc4 | 0xc8 | 0xcc) {
                let frame = data.get(pos + 4..pos + 2 + len)?;
                if frame.len() < 6 {
                    return None;
                }
                let height = u16::from_be_bytes([frame[1], frame[2]]) as u32;
                let width = u16::from_be_bytes([frame[3], frame[4]]) as u32;
                let components = frame[5];
                if width == 0 || height == 0 || !matches!(components, 1 | 3 | 4) {
                    return None;
                }
                return Some(Self {
                    data: data.to_vec(),
                    width,
                    height,
                    components,
                });
            }
            if marker == 0xda {
                return None;
            }
            pos += 2 + len;
        }
        None
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn object(&self) -> Vec<u8> {
        let color_space = match self.components {
            1 => "/DeviceGray",
            4 => "/DeviceCMYK",
            _ => "/DeviceRGB",
        };
        let mut object = format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {color_space} \
             /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
            self.width,
            self.height,
            self.data.len()
        )
        .into_bytes();
        object.extend_from_slice(&self.data);
        object.extend_from_slice(b"\nendstream");
        object
    }
}

/// Assemble pages into a complete document. Pages refer to `images` by index.
pub fn write_document(title: &str, pages: &[Page], images: &[JpegImage]) -> RenderResult<Vec<u8>> {
    if pages.is_empty() {
        return Err(RenderError::Layout("document has no pages".to_string()));
    }
    if pages.len() > MAX_PAGES {
        return Err(RenderError::TooLarge {
            pages: pages.len(),
            max: MAX_PAGES,
        });
    }

    // Object layout: 1 catalog, 2 page tree, 3-4 fonts, one object per image,
    // then a page and its content stream per page, then the info dictionary.
    let first_image_obj = 5;
    let first_page_obj = first_image_obj + images.len();
    let info_obj = first_page_obj + 2 * pages.len();
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page_obj + 2 * i))
        .collect();

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(info_obj);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .into_bytes(),
    );
    objects.push(font_object("Helvetica"));
    objects.push(font_object("Helvetica-Bold"));
    objects.extend(images.iter().map(JpegImage::object));

    let mut resources = String::from("/Font << /F1 3 0 R /F2 4 0 R >>");
    if !images.is_empty() {
        let entries: Vec<String> = (0..images.len())
            .map(|i| format!("/Im{} {} 0 R", i + 1, first_image_obj + i))
            .collect();
        let _ = write!(resources, " /XObject << {} >>", entries.join(" "));
    }

    for (i, page) in pages.iter().enumerate() {
        let contents_obj = first_page_obj + 2 * i + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
                 /Resources << {resources} >> /Contents {contents_obj} 0 R >>"
            )
            .into_bytes(),
        );

        let mut stream = format!("<< /Length {} >>\nstream\n", page.ops.len()).into_bytes();
        stream.extend_from_slice(page.ops.as_bytes());
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    objects.push(
        format!(
            "<< /Title ({}) /Producer (lodge) >>",
            escape_text(title)
        )
        .into_bytes(),
    );

    if objects.len() != info_obj {
        return Err(RenderError::Encoding(format!(
            "object count mismatch: wrote {}, expected {info_obj}",
            objects.len()
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(xref, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info {info_obj} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(xref.as_bytes());

    Ok(out)
}

fn font_object(base: &str) -> Vec<u8> {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
        .into_bytes()
}
