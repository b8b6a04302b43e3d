//! # Document Model
//!
//! The in-memory representation of a WordprocessingML body: paragraphs made
//! of formatted runs, tables whose cells nest more paragraphs, and raw XML
//! passthrough for everything the engine does not need to understand.
//!
//! The model is deliberately narrow. Substitution only ever needs to read
//! and rewrite run text, clear a paragraph's content while keeping its
//! paragraph-level properties, and delete trailing body elements. Anything
//! outside that surface — section properties, table borders, bookmarks,
//! smart tags — is captured verbatim at parse time and emitted verbatim at
//! write time, so a surgical edit can never corrupt the parts of the
//! document it never touched.

pub mod parse;
pub mod write;

/// One EMU (English Metric Unit) grid: 360000 EMU per centimeter.
pub const EMU_PER_CM: u64 = 360_000;

/// A parsed `word/document.xml`: the body elements plus the trailing
/// section properties (kept raw — they define page geometry for the whole
/// document and must survive truncation).
#[derive(Debug, Clone)]
pub struct DocumentXml {
    /// The raw content of the `w:document` start tag (name + namespace
    /// declarations), reproduced byte-for-byte on write.
    pub root_tag: String,
    pub body: Vec<BodyElement>,
    /// Raw `w:sectPr` element, if the body carries one.
    pub section: Option<String>,
}

/// A block-level element of the document body (or of a table cell).
#[derive(Debug, Clone)]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
    /// Unmodeled block element, preserved verbatim.
    Raw(String),
}

/// A paragraph: optional raw `w:pPr` (alignment, spacing, indentation)
/// plus an ordered list of children.
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Raw `w:pPr` element. Kept opaque so a content-only clear of the
    /// runs leaves alignment and spacing untouched.
    pub properties: Option<String>,
    pub children: Vec<ParagraphChild>,
}

/// A child of a paragraph. Runs carry the text; everything else
/// (bookmarks, proofing marks, hyperlink wrappers) rides along raw.
#[derive(Debug, Clone)]
pub enum ParagraphChild {
    Run(Run),
    Raw(String),
}

/// A contiguous span of content sharing one set of run properties.
#[derive(Debug, Clone, Default)]
pub struct Run {
    pub properties: RunProperties,
    pub content: Vec<RunContent>,
}

/// Run-level formatting. `None` means the run does not set the attribute;
/// the effective value then comes from the paragraph or document defaults,
/// and the engine must never clobber it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunProperties {
    /// Typeface for Latin text (`w:rFonts w:ascii` / `w:hAnsi`).
    pub font: Option<String>,
    /// East-Asian typeface override (`w:rFonts w:eastAsia`).
    pub east_asia_font: Option<String>,
    /// Size in half-points (`w:sz w:val`).
    pub size_half_points: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Underline pattern (`w:u w:val`, e.g. "single").
    pub underline: Option<String>,
    /// Hex color (`w:color w:val`, e.g. "FF0000").
    pub color: Option<String>,
    /// Unmodeled `w:rPr` children, preserved verbatim.
    pub extra: Vec<String>,
}

impl RunProperties {
    /// True when no attribute is set and nothing was captured raw.
    pub fn is_empty(&self) -> bool {
        self.font.is_none()
            && self.east_asia_font.is_none()
            && self.size_half_points.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.color.is_none()
            && self.extra.is_empty()
    }
}

/// The content items inside a run.
#[derive(Debug, Clone)]
pub enum RunContent {
    Text {
        value: String,
        /// Whether the original `w:t` carried `xml:space="preserve"`.
        preserve_space: bool,
    },
    /// An explicit page break (`w:br w:type="page"`).
    PageBreak,
    /// An inline picture anchored in this run.
    Drawing {
        /// Relationship id of the image part (e.g. "rId7").
        rel_id: String,
        /// Rendered width in EMU.
        cx_emu: u64,
        /// Rendered height in EMU.
        cy_emu: u64,
        name: String,
    },
    /// Unmodeled run child (tabs, soft breaks, field chars), verbatim.
    Raw(String),
}

/// A table: raw properties and grid, plus rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub properties: Option<String>,
    pub grid: Option<String>,
    pub rows: Vec<TableRow>,
    /// Unmodeled table children, emitted after the rows.
    pub extra: Vec<String>,
}

/// A table row.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub properties: Option<String>,
    pub cells: Vec<TableCell>,
    pub extra: Vec<String>,
}

/// A table cell. Cells nest block content, including further tables.
#[derive(Debug, Clone, Default)]
pub struct TableCell {
    pub properties: Option<String>,
    pub content: Vec<BodyElement>,
}

/// Early-stop signal for the paragraph walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Stop,
}

// ─── Run ────────────────────────────────────────────────────────────

impl Run {
    /// A run holding a single text item with the given properties.
    pub fn text(value: &str, properties: RunProperties) -> Self {
        Run {
            properties,
            content: vec![RunContent::Text {
                value: value.to_string(),
                // The writer adds xml:space="preserve" when edge
                // whitespace makes it necessary.
                preserve_space: false,
            }],
        }
    }

    /// A run holding a single explicit page break.
    pub fn page_break() -> Self {
        Run {
            properties: RunProperties::default(),
            content: vec![RunContent::PageBreak],
        }
    }

    /// The concatenated text of this run's text items.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for item in &self.content {
            if let RunContent::Text { value, .. } = item {
                out.push_str(value);
            }
        }
        out
    }

    /// Replace `from` with `to` in every text item of this run.
    /// Returns true if anything changed.
    pub fn replace_text(&mut self, from: &str, to: &str) -> bool {
        let mut changed = false;
        for item in &mut self.content {
            if let RunContent::Text { value, .. } = item {
                if value.contains(from) {
                    *value = value.replace(from, to);
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn has_page_break(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, RunContent::PageBreak))
    }
}

// ─── Paragraph ──────────────────────────────────────────────────────

impl Paragraph {
    /// A paragraph holding one text run and no properties.
    pub fn with_text(value: &str) -> Self {
        Paragraph {
            properties: None,
            children: vec![ParagraphChild::Run(Run::text(
                value,
                RunProperties::default(),
            ))],
        }
    }

    /// The paragraph's plain text: the concatenation of its runs' text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let ParagraphChild::Run(run) = child {
                out.push_str(&run.plain_text());
            }
        }
        out
    }

    /// Content-only clear: drop every child, keep `w:pPr`. Alignment and
    /// spacing survive because they live in the raw properties block.
    pub fn clear_content(&mut self) {
        self.children.clear();
    }

    pub fn push_run(&mut self, run: Run) {
        self.children.push(ParagraphChild::Run(run));
    }

    /// The first run, if any. This is where a Style Snapshot comes from.
    pub fn first_run(&self) -> Option<&Run> {
        self.children.iter().find_map(|c| match c {
            ParagraphChild::Run(r) => Some(r),
            _ => None,
        })
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.children.iter_mut().filter_map(|c| match c {
            ParagraphChild::Run(r) => Some(r),
            _ => None,
        })
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.children.iter().filter_map(|c| match c {
            ParagraphChild::Run(r) => Some(r),
            _ => None,
        })
    }

    pub fn has_page_break(&self) -> bool {
        self.runs().any(|r| r.has_page_break())
    }
}

// ─── BodyElement ────────────────────────────────────────────────────

impl BodyElement {
    /// True if an explicit page break occurs anywhere inside this element.
    pub fn contains_page_break(&self) -> bool {
        match self {
            BodyElement::Paragraph(p) => p.has_page_break(),
            BodyElement::Table(t) => t
                .rows
                .iter()
                .flat_map(|r| &r.cells)
                .flat_map(|c| &c.content)
                .any(|el| el.contains_page_break()),
            BodyElement::Raw(raw) => raw.contains("w:br") && raw.contains("\"page\""),
        }
    }
}

// ─── DocumentXml ────────────────────────────────────────────────────

impl DocumentXml {
    /// Visit every paragraph in substitution order: all paragraphs inside
    /// table cells first (tables in body order, rows top to bottom, cells
    /// left to right), then the top-level paragraphs. The callback returns
    /// [`Walk::Stop`] to end the traversal early.
    pub fn walk_paragraphs_mut<F>(&mut self, f: &mut F) -> Walk
    where
        F: FnMut(&mut Paragraph) -> Walk,
    {
        walk_slice_mut(&mut self.body, f)
    }

    /// Immutable counterpart of [`walk_paragraphs_mut`], same order.
    ///
    /// [`walk_paragraphs_mut`]: DocumentXml::walk_paragraphs_mut
    pub fn walk_paragraphs<F>(&self, f: &mut F) -> Walk
    where
        F: FnMut(&Paragraph) -> Walk,
    {
        walk_slice(&self.body, f)
    }

    /// Visit every run in the document, tables included. Used by
    /// composition to remap image relationship ids.
    pub fn for_each_run_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Run),
    {
        for_each_run_in_slice(&mut self.body, f);
    }

    /// Index of the first body element containing an explicit page break.
    pub fn first_page_break_index(&self) -> Option<usize> {
        self.body.iter().position(|el| el.contains_page_break())
    }

    /// Immutable counterpart of [`for_each_run_mut`].
    ///
    /// [`for_each_run_mut`]: DocumentXml::for_each_run_mut
    pub fn for_each_run<F>(&self, f: &mut F)
    where
        F: FnMut(&Run),
    {
        for_each_run_in_slice_ref(&self.body, f);
    }

    /// Total count of inline pictures in the document. Pictures inserted
    /// by this engine are typed [`RunContent::Drawing`]; pictures authored
    /// into the template ride through as raw XML and are counted by their
    /// `r:embed` references.
    pub fn count_drawings(&self) -> usize {
        let mut count = 0;
        self.for_each_run(&mut |run| {
            for item in &run.content {
                match item {
                    RunContent::Drawing { .. } => count += 1,
                    RunContent::Raw(raw) => count += raw.matches("r:embed=\"").count(),
                    _ => {}
                }
            }
        });
        count
    }

    /// The concatenation of every paragraph's text, in substitution order.
    /// Test and diagnostic helper.
    pub fn all_text(&self) -> String {
        let mut out = String::new();
        self.walk_paragraphs(&mut |p| {
            out.push_str(&p.text());
            out.push('\n');
            Walk::Continue
        });
        out
    }
}

fn walk_slice_mut<F>(elements: &mut [BodyElement], f: &mut F) -> Walk
where
    F: FnMut(&mut Paragraph) -> Walk,
{
    // Table cells first, matching the order templates are authored in:
    // the header table carries most placeholders.
    for el in elements.iter_mut() {
        if let BodyElement::Table(table) = el {
            for row in &mut table.rows {
                for cell in &mut row.cells {
                    if walk_slice_mut(&mut cell.content, f) == Walk::Stop {
                        return Walk::Stop;
                    }
                }
            }
        }
    }
    for el in elements.iter_mut() {
        if let BodyElement::Paragraph(p) = el {
            if f(p) == Walk::Stop {
                return Walk::Stop;
            }
        }
    }
    Walk::Continue
}

fn walk_slice<F>(elements: &[BodyElement], f: &mut F) -> Walk
where
    F: FnMut(&Paragraph) -> Walk,
{
    for el in elements.iter() {
        if let BodyElement::Table(table) = el {
            for row in &table.rows {
                for cell in &row.cells {
                    if walk_slice(&cell.content, f) == Walk::Stop {
                        return Walk::Stop;
                    }
                }
            }
        }
    }
    for el in elements.iter() {
        if let BodyElement::Paragraph(p) = el {
            if f(p) == Walk::Stop {
                return Walk::Stop;
            }
        }
    }
    Walk::Continue
}

fn for_each_run_in_slice<F>(elements: &mut [BodyElement], f: &mut F)
where
    F: FnMut(&mut Run),
{
    for el in elements.iter_mut() {
        match el {
            BodyElement::Paragraph(p) => {
                for run in p.runs_mut() {
                    f(run);
                }
            }
            BodyElement::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        for_each_run_in_slice(&mut cell.content, f);
                    }
                }
            }
            BodyElement::Raw(_) => {}
        }
    }
}

fn for_each_run_in_slice_ref<F>(elements: &[BodyElement], f: &mut F)
where
    F: FnMut(&Run),
{
    for el in elements.iter() {
        match el {
            BodyElement::Paragraph(p) => {
                for run in p.runs() {
                    f(run);
                }
            }
            BodyElement::Table(table) => {
                for row in &table.rows {
                    for cell in &row.cells {
                        for_each_run_in_slice_ref(&cell.content, f);
                    }
                }
            }
            BodyElement::Raw(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> BodyElement {
        BodyElement::Paragraph(Paragraph::with_text(text))
    }

    fn one_cell_table(texts: &[&str]) -> BodyElement {
        BodyElement::Table(Table {
            properties: None,
            grid: None,
            rows: texts
                .iter()
                .map(|t| TableRow {
                    properties: None,
                    cells: vec![TableCell {
                        properties: None,
                        content: vec![para(t)],
                    }],
                    extra: vec![],
                })
                .collect(),
            extra: vec![],
        })
    }

    fn doc(body: Vec<BodyElement>) -> DocumentXml {
        DocumentXml {
            root_tag: "w:document".to_string(),
            body,
            section: None,
        }
    }

    #[test]
    fn test_paragraph_text_concatenates_runs() {
        let mut p = Paragraph::default();
        p.push_run(Run::text("Hello ", RunProperties::default()));
        p.push_run(Run::text("world", RunProperties::default()));
        assert_eq!(p.text(), "Hello world");
    }

    #[test]
    fn test_clear_content_keeps_properties() {
        let mut p = Paragraph::with_text("x");
        p.properties = Some("<w:pPr><w:jc w:val=\"center\"/></w:pPr>".to_string());
        p.clear_content();
        assert_eq!(p.text(), "");
        assert!(p.properties.as_deref().unwrap().contains("center"));
    }

    #[test]
    fn test_walk_order_tables_before_top_level() {
        let d = doc(vec![
            para("top1"),
            one_cell_table(&["cell1", "cell2"]),
            para("top2"),
        ]);
        let mut seen = Vec::new();
        d.walk_paragraphs(&mut |p| {
            seen.push(p.text());
            Walk::Continue
        });
        assert_eq!(seen, vec!["cell1", "cell2", "top1", "top2"]);
    }

    #[test]
    fn test_walk_stops_early() {
        let mut d = doc(vec![para("a"), para("b"), para("c")]);
        let mut seen = 0;
        d.walk_paragraphs_mut(&mut |_| {
            seen += 1;
            Walk::Stop
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_first_page_break_index() {
        let mut with_break = Paragraph::default();
        with_break.push_run(Run::page_break());
        let d = doc(vec![
            para("before"),
            BodyElement::Paragraph(with_break),
            para("after"),
        ]);
        assert_eq!(d.first_page_break_index(), Some(1));

        let no_break = doc(vec![para("only")]);
        assert_eq!(no_break.first_page_break_index(), None);
    }

    #[test]
    fn test_replace_text_all_occurrences() {
        let mut run = Run::text("{x} and {x}", RunProperties::default());
        assert!(run.replace_text("{x}", "y"));
        assert_eq!(run.plain_text(), "y and y");
        assert!(!run.replace_text("{x}", "y"));
    }

    #[test]
    fn test_run_properties_is_empty() {
        assert!(RunProperties::default().is_empty());
        let props = RunProperties {
            bold: Some(true),
            ..Default::default()
        };
        assert!(!props.is_empty());
    }
}
