//! Content-stream walker producing [`TextFragment`]s.
//!
//! Tracks the graphics and text state needed to place shown strings:
//!
//! | Operator          | Action |
//! |-------------------|--------|
//! | `q` / `Q`         | Save / restore graphics state |
//! | `cm`              | Concatenate to the CTM |
//! | `BT` / `ET`       | Begin / end text object |
//! | `Tf`              | Set font and size |
//! | `Tm`              | Set text matrix |
//! | `Td` / `TD` / `T*`| Move to next line |
//! | `TL` `Tc` `Tw` `Tz` `Ts` | Text state parameters |
//! | `Tj` / `TJ`       | Show strings |
//! | `'` / `"`         | Next line and show string |
//!
//! Each shown string becomes one fragment, or each glyph with
//! [`Granularity::Glyph`]. Size and origin come from the text rendering
//! matrix.

use doctext_core::{Error, Result, TextFragment};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Glyph width used when the font has no usable `/Widths`, in 1/1000 em.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// What a single fragment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One fragment per shown string (`Tj` operand or `TJ` string element).
    #[default]
    String,
    /// One fragment per character code.
    Glyph,
}

/// Affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`.
    fn multiply(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }
}

/// Font resource resolved from the page's `/Font` dictionary.
#[derive(Debug, Clone)]
struct FontInfo {
    base_font: String,
    encoding: String,
    first_char: i64,
    widths: Vec<f64>,
    two_byte: bool,
}

impl FontInfo {
    fn from_dictionary(doc: &Document, key: &[u8], dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|_| String::from_utf8_lossy(key).to_string());

        let two_byte = dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(number)
            .map(|n| n as i64)
            .unwrap_or(0);

        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| match o {
                Object::Array(items) => Some(
                    items
                        .iter()
                        .map(|w| resolve(doc, w).and_then(number).unwrap_or(0.0))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        Self {
            base_font,
            encoding: dict.get_font_encoding().to_string(),
            first_char,
            widths,
            two_byte,
        }
    }

    fn glyph_width(&self, code: i64) -> f64 {
        usize::try_from(code - self.first_char)
            .ok()
            .and_then(|i| self.widths.get(i))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }
}

/// Text state parameters, saved and restored with the graphics state.
#[derive(Debug, Clone)]
struct TextParams {
    font_key: Vec<u8>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextParams,
}

/// Mutable state while walking one page.
struct PageWalker {
    fonts: HashMap<Vec<u8>, FontInfo>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    fragments: Vec<TextFragment>,
    granularity: Granularity,
}

impl PageWalker {
    fn new(fonts: HashMap<Vec<u8>, FontInfo>, granularity: Granularity) -> Self {
        Self {
            fonts,
            granularity,
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
                text: TextParams::default(),
            },
            saved: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            fragments: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let [Object::Name(key), size, ..] = operands {
                    self.state.text.font_key = key.clone();
                    self.state.text.font_size = number(size).unwrap_or(0.0);
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => {
                if let Some((tx, ty)) = pair_operand(operands) {
                    self.next_line(tx, ty);
                }
            }
            "TD" => {
                if let Some((tx, ty)) = pair_operand(operands) {
                    self.state.text.leading = -ty;
                    self.next_line(tx, ty);
                }
            }
            "T*" => self.next_line(0.0, -self.state.text.leading),
            "TL" => set_number(operands, &mut self.state.text.leading),
            "Tc" => set_number(operands, &mut self.state.text.char_spacing),
            "Tw" => set_number(operands, &mut self.state.text.word_spacing),
            "Ts" => set_number(operands, &mut self.state.text.rise),
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.text.horiz_scale = v / 100.0;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let text = &self.state.text;
                                    let tx = -adjust / 1000.0 * text.font_size * text.horiz_scale;
                                    self.advance(tx);
                                }
                            }
                        }
                    }
                }
            }
            "'" => {
                self.next_line(0.0, -self.state.text.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _), ..] = operands {
                    if let Some(aw) = number(aw) {
                        self.state.text.word_spacing = aw;
                    }
                    if let Some(ac) = number(ac) {
                        self.state.text.char_spacing = ac;
                    }
                    self.next_line(0.0, -self.state.text.leading);
                    self.show(bytes);
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        match self.granularity {
            Granularity::String => {
                self.emit(bytes);
                let advance = self.string_advance(bytes);
                self.advance(advance);
            }
            Granularity::Glyph => {
                for code in bytes.chunks(self.code_len()) {
                    self.emit(code);
                    let advance = self.string_advance(code);
                    self.advance(advance);
                }
            }
        }
    }

    /// Bytes per character code in the current font.
    fn code_len(&self) -> usize {
        match self.fonts.get(&self.state.text.font_key) {
            Some(font) if font.two_byte => 2,
            _ => 1,
        }
    }

    /// Push a fragment for `bytes` at the current text position.
    fn emit(&mut self, bytes: &[u8]) {
        let text = &self.state.text;
        let font = self.fonts.get(&text.font_key);

        let content = Document::decode_text(font.map(|f| f.encoding.as_str()), bytes);
        let font_name = font
            .map(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&text.font_key).to_string());

        let render = Matrix([
            text.font_size * text.horiz_scale,
            0.0,
            0.0,
            text.font_size,
            0.0,
            text.rise,
        ])
        .multiply(&self.text_matrix)
        .multiply(&self.state.ctm);

        self.fragments.push(TextFragment::new(
            content,
            font_name,
            render.0[0],
            render.0[4],
            render.0[5],
        ));
    }

    /// Horizontal displacement in text space after showing `bytes`.
    fn string_advance(&self, bytes: &[u8]) -> f64 {
        let text = &self.state.text;
        let font = self.fonts.get(&text.font_key);
        let two_byte = font.map(|f| f.two_byte).unwrap_or(false);

        let codes: Vec<i64> = if two_byte {
            bytes
                .chunks(2)
                .map(|c| c.iter().fold(0i64, |acc, b| (acc << 8) | i64::from(*b)))
                .collect()
        } else {
            bytes.iter().map(|b| i64::from(*b)).collect()
        };

        codes
            .iter()
            .map(|&code| {
                let w0 = font
                    .map(|f| f.glyph_width(code))
                    .unwrap_or(DEFAULT_GLYPH_WIDTH);
                // Word spacing applies to the single-byte code 32 only.
                let word = if !two_byte && code == 32 {
                    text.word_spacing
                } else {
                    0.0
                };
                (w0 / 1000.0 * text.font_size + text.char_spacing + word) * text.horiz_scale
            })
            .sum()
    }
}

/// Collect the text fragments of a page in content-stream order, one per shown string.
pub fn extract_page_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<TextFragment>> {
    extract_page_fragments_with(doc, page_id, Granularity::String)
}

/// Collect the text fragments of a page at the given granularity.
pub fn extract_page_fragments_with(
    doc: &Document,
    page_id: ObjectId,
    granularity: Granularity,
) -> Result<Vec<TextFragment>> {
    let raw = doc
        .get_page_content(page_id)
        .map_err(|e| Error::PdfParseError(format!("Failed to read page content: {}", e)))?;
    let content = Content::decode(&raw)
        .map_err(|e| Error::PdfParseError(format!("Failed to decode content stream: {}", e)))?;

    let fonts = doc
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(key, dict)| {
            let info = FontInfo::from_dictionary(doc, &key, dict);
            (key, info)
        })
        .collect();

    let mut walker = PageWalker::new(fonts, granularity);
    for op in &content.operations {
        walker.apply(&op.operator, &op.operands);
    }

    Ok(walker.fragments)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn set_number(operands: &[Object], target: &mut f64) {
    if let Some(v) = operands.first().and_then(number) {
        *target = v;
    }
}

fn pair_operand(operands: &[Object]) -> Option<(f64, f64)> {
    match operands {
        [x, y, ..] => Some((number(x)?, number(y)?)),
        _ => None,
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(Matrix(m))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    /// Build a PDF with one page per list of operations.
    pub(crate) fn build_pdf(pages: Vec<Vec<Operation>>) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let wide_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
                "F2" => wide_font_id,
            },
        });

        let mut kids = Vec::new();
        for operations in pages {
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![int(0), int(0), int(595), int(842)],
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    pub(crate) fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    pub(crate) fn int(v: i64) -> Object {
        Object::Integer(v)
    }

    pub(crate) fn text(s: &str) -> Object {
        Object::string_literal(s)
    }

    pub(crate) fn tm(e: i64, f: i64) -> Operation {
        op("Tm", vec![int(1), int(0), int(0), int(1), int(e), int(f)])
    }

    fn first_page_fragments(doc: &Document) -> Vec<TextFragment> {
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        extract_page_fragments(doc, page_id).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_matrix_multiply_translate() {
        let m = Matrix::translate(5.0, 7.0).multiply(&Matrix([2.0, 0.0, 0.0, 2.0, 1.0, 1.0]));
        assert_eq!(m, Matrix([2.0, 0.0, 0.0, 2.0, 11.0, 15.0]));
        assert_eq!(Matrix::IDENTITY.multiply(&m), m);
    }

    #[test]
    fn test_fragments_carry_font_size_and_position() {
        let doc = build_pdf(vec![vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(12)]),
            tm(100, 700),
            op("Tj", vec![text("Hello ")]),
            tm(100, 700),
            op("Tj", vec![text("world")]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(10)]),
            tm(100, 650),
            op("Tj", vec![text("Bye")]),
            op("ET", vec![]),
        ]]);

        let fragments = first_page_fragments(&doc);
        assert_eq!(
            fragments,
            vec![
                TextFragment::new("Hello ", "Helvetica", 12.0, 100.0, 700.0),
                TextFragment::new("world", "Helvetica", 12.0, 100.0, 700.0),
                TextFragment::new("Bye", "Helvetica", 10.0, 100.0, 650.0),
            ]
        );
    }

    #[test]
    fn test_tj_advances_by_widths_and_kerning() {
        let doc = build_pdf(vec![vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F2".to_vec()), int(10)]),
            op("Td", vec![int(50), int(600)]),
            op(
                "TJ",
                vec![Object::Array(vec![text("A"), int(-1000), text("B")])],
            ),
            op("ET", vec![]),
        ]]);

        let fragments = first_page_fragments(&doc);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].font, "Courier");
        assert!(approx(fragments[0].x, 50.0));
        // 600/1000 * 10 for "A", then 1000/1000 * 10 of kerning.
        assert!(approx(fragments[1].x, 66.0));
        assert!(approx(fragments[1].y, 600.0));
    }

    #[test]
    fn test_leading_moves_to_next_line() {
        let doc = build_pdf(vec![vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(12)]),
            op("TD", vec![int(72), int(-14)]),
            op("Tj", vec![text("one")]),
            op("T*", vec![]),
            op("Tj", vec![text("two")]),
            op("'", vec![text("three")]),
            op("ET", vec![]),
        ]]);

        let ys: Vec<f64> = first_page_fragments(&doc).iter().map(|f| f.y).collect();
        assert_eq!(ys, vec![-14.0, -28.0, -42.0]);
    }

    #[test]
    fn test_ctm_is_saved_and_restored() {
        let doc = build_pdf(vec![vec![
            op("q", vec![]),
            op("cm", vec![int(2), int(0), int(0), int(2), int(10), int(20)]),
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(5)]),
            op("Tj", vec![text("x")]),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Tj", vec![text("y")]),
            op("ET", vec![]),
        ]]);

        let fragments = first_page_fragments(&doc);
        assert_eq!(fragments[0].font_size, 10.0);
        assert_eq!((fragments[0].x, fragments[0].y), (10.0, 20.0));
        // Tf was set inside q, so it is gone after Q.
        assert_eq!(fragments[1].font_size, 0.0);
        assert_eq!((fragments[1].x, fragments[1].y), (0.0, 0.0));
    }

    #[test]
    fn test_unknown_font_uses_resource_key() {
        let doc = build_pdf(vec![vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F9".to_vec()), int(8)]),
            op("Tj", vec![text("abc")]),
            op("ET", vec![]),
        ]]);

        let fragments = first_page_fragments(&doc);
        assert_eq!(fragments[0].font, "F9");
        assert_eq!(fragments[0].content, "abc");
    }

    #[test]
    fn test_glyph_granularity_splits_strings() {
        let doc = build_pdf(vec![vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(12)]),
            op("Td", vec![int(10), int(10)]),
            op("Tj", vec![text("Hi")]),
            op("Tj", vec![text("!")]),
            op("ET", vec![]),
        ]]);
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();

        let fragments = extract_page_fragments_with(&doc, page_id, Granularity::Glyph).unwrap();
        let contents: Vec<&str> = fragments.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["H", "i", "!"]);
        // No /Widths: each glyph advances 500/1000 * 12.
        assert!(approx(fragments[0].x, 10.0));
        assert!(approx(fragments[1].x, 16.0));
        assert!(approx(fragments[2].x, 22.0));

        let strings = extract_page_fragments(&doc, page_id).unwrap();
        assert_eq!(strings.len(), 2);
        assert!(approx(strings[1].x, 22.0));
    }

    #[test]
    fn test_empty_strings_are_not_fragments() {
        let doc = build_pdf(vec![vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(8)]),
            op("Tj", vec![text("")]),
            op("ET", vec![]),
        ]]);

        assert!(first_page_fragments(&doc).is_empty());
    }
}
