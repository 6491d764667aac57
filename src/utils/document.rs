//! Structured document model and full-text extraction.
//!
//! Full text from bioRxiv and PubMed Central arrives as JATS XML. It is parsed
//! once into an immutable [`Document`] and then flattened into readable text
//! blocks in reading order:
//!
//! 1. the title line,
//! 2. the abstract,
//! 3. the body, walked depth-first: a section's title, then its direct
//!    paragraphs, then each direct subsection in document order.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Errors that can occur while parsing a structured document
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The XML could not be read
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The XML was well-formed so far but ended unexpectedly or was unbalanced
    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// A parsed paper: title, abstract and a hierarchical body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    /// Untitled root section holding the body's direct paragraphs and sections
    pub body: Option<Section>,
}

/// One section of a document body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub title: Option<String>,
    pub paragraphs: Vec<String>,
    pub subsections: Vec<Section>,
}

impl Section {
    /// Create an empty section with an optional title
    pub fn new(title: Option<&str>) -> Self {
        Self {
            title: title.map(str::to_string),
            ..Default::default()
        }
    }

    /// Add a paragraph
    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }

    /// Add a nested section
    pub fn subsection(mut self, section: Section) -> Self {
        self.subsections.push(section);
        self
    }
}

impl Document {
    /// Parse a JATS article (bioRxiv source XML or a PMC `efetch` response)
    pub fn from_jats(xml: &str) -> Result<Self, ExtractError> {
        let root = parse_tree(xml)?;

        let front = root.find_descendant("front");
        let scope = front.unwrap_or(&root);

        // cited works in <back> carry their own article-title elements
        let title = front
            .and_then(|f| f.find_descendant("article-title"))
            .or_else(|| root.find_descendant_outside("article-title", "back"))
            .map(XmlElement::text)
            .and_then(|t| non_empty(&t));

        let abstract_text = scope
            .find_descendant("abstract")
            .and_then(|abs| {
                let mut paragraphs = Vec::new();
                abs.collect_descendants("p", &mut paragraphs);
                if paragraphs.is_empty() {
                    non_empty(&abs.text())
                } else {
                    let joined = paragraphs
                        .iter()
                        .map(|p| p.text())
                        .collect::<Vec<_>>()
                        .join(" ");
                    non_empty(&joined)
                }
            });

        let body = root.find_descendant("body").map(section_from_element);

        Ok(Self {
            title,
            abstract_text,
            body,
        })
    }

    /// Whether the document carries no text at all
    pub fn is_empty(&self) -> bool {
        extract_blocks(self).is_empty()
    }
}

/// Flatten a document into its non-empty text blocks, in reading order
pub fn extract_blocks(document: &Document) -> Vec<String> {
    let mut blocks = Vec::new();

    push_block(&mut blocks, document.title.as_deref());
    push_block(&mut blocks, document.abstract_text.as_deref());

    if let Some(body) = &document.body {
        walk_section(body, &mut blocks);
    }

    blocks
}

/// Flatten a document into text, one blank line between blocks
pub fn extract_text(document: &Document) -> String {
    extract_blocks(document).join("\n\n")
}

fn walk_section(section: &Section, blocks: &mut Vec<String>) {
    push_block(blocks, section.title.as_deref());
    for paragraph in &section.paragraphs {
        push_block(blocks, Some(paragraph.as_str()));
    }
    for subsection in &section.subsections {
        walk_section(subsection, blocks);
    }
}

fn push_block(blocks: &mut Vec<String>, text: Option<&str>) {
    if let Some(text) = text.and_then(non_empty) {
        blocks.push(text);
    }
}

/// Collapse runs of whitespace; `None` if nothing is left
fn non_empty(text: &str) -> Option<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn section_from_element(element: &XmlElement) -> Section {
    let mut section = Section::new(None);

    for child in element.child_elements() {
        match child.name.as_str() {
            "title" if section.title.is_none() => section.title = non_empty(&child.text()),
            "p" => {
                if let Some(text) = non_empty(&child.text()) {
                    section.paragraphs.push(text);
                }
            }
            "sec" => section.subsections.push(section_from_element(child)),
            _ => {}
        }
    }

    section
}

#[derive(Debug, Clone)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default)]
struct XmlElement {
    name: String,
    children: Vec<XmlNode>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First descendant with the given local name, in document order
    fn find_descendant(&self, name: &str) -> Option<&XmlElement> {
        for child in self.child_elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Like `find_descendant`, without entering elements named `skip`
    fn find_descendant_outside(&self, name: &str, skip: &str) -> Option<&XmlElement> {
        for child in self.child_elements().filter(|c| c.name != skip) {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant_outside(name, skip) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name, outermost only
    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            } else {
                child.collect_descendants(name, out);
            }
        }
    }

    /// Concatenated text of this element and everything below it
    fn text(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.append_text(out),
            }
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse XML into an owned element tree under a synthetic root
fn parse_tree(xml: &str) -> Result<XmlElement, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![XmlElement::new(String::new())];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(XmlElement::new(local_name(e.local_name().as_ref())));
            }
            Event::Empty(e) => {
                let element = XmlElement::new(local_name(e.local_name().as_ref()));
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Element(element));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(ExtractError::Malformed("unbalanced end tag".to_string()));
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Element(element));
                    }
                }
            }
            Event::Text(e) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    // entities outside the XML predefined set (e.g. &nbsp;) are kept raw
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(ExtractError::Malformed(format!(
            "{} unclosed element(s)",
            stack.len() - 1
        )));
    }

    stack
        .pop()
        .ok_or_else(|| ExtractError::Malformed("empty document".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_order_with_nested_sections() {
        let document = Document {
            title: Some("T".to_string()),
            abstract_text: Some("A".to_string()),
            body: Some(
                Section::new(None).subsection(
                    Section::new(Some("S1"))
                        .paragraph("P1")
                        .subsection(Section::new(Some("S2")).paragraph("P2")),
                ),
            ),
        };

        assert_eq!(extract_blocks(&document), vec!["T", "A", "S1", "P1", "S2", "P2"]);
        assert_eq!(extract_text(&document), "T\n\nA\n\nS1\n\nP1\n\nS2\n\nP2");
    }

    #[test]
    fn test_direct_paragraphs_precede_subsections() {
        let document = Document {
            body: Some(
                Section::new(Some("Methods"))
                    .paragraph("first")
                    .subsection(Section::new(Some("Sub")).paragraph("nested"))
                    .paragraph("second"),
            ),
            ..Default::default()
        };

        assert_eq!(
            extract_blocks(&document),
            vec!["Methods", "first", "second", "Sub", "nested"]
        );
    }

    #[test]
    fn test_missing_body() {
        let document = Document {
            title: Some("Title".to_string()),
            abstract_text: Some("Abstract".to_string()),
            body: None,
        };

        assert_eq!(extract_text(&document), "Title\n\nAbstract");
    }

    #[test]
    fn test_whitespace_only_blocks_are_dropped() {
        let document = Document {
            title: Some("  ".to_string()),
            abstract_text: None,
            body: Some(Section::new(Some("S")).paragraph(" \n\t ").paragraph("kept")),
        };

        assert_eq!(extract_blocks(&document), vec!["S", "kept"]);
        assert!(Document::default().is_empty());
    }

    #[test]
    fn test_from_jats() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE article PUBLIC "-//NLM//DTD JATS (Z39.96) Journal Archiving and Interchange DTD v1.2 20190208//EN" "JATS-archivearticle1.dtd">
<article xmlns:xlink="http://www.w3.org/1999/xlink">
  <front>
    <article-meta>
      <title-group>
        <article-title>Gene <italic>X</italic> regulates
          growth</article-title>
      </title-group>
      <abstract>
        <title>Abstract</title>
        <p>We show that X &amp; Y interact.</p>
        <p>Second point.</p>
      </abstract>
    </article-meta>
  </front>
  <body>
    <p>Lead paragraph.</p>
    <sec id="s1">
      <title>Introduction</title>
      <p>Intro text with a <xref ref-type="bibr" rid="r1">citation</xref>.</p>
      <sec id="s1-1">
        <title>Background</title>
        <p>Deeper.</p>
        <p>   </p>
      </sec>
    </sec>
    <sec id="s2">
      <title>Results</title>
      <fig id="f1"><caption><p>Figure caption.</p></caption></fig>
      <p><![CDATA[Raw <data>]]></p>
    </sec>
  </body>
  <back>
    <ref-list><ref><element-citation><article-title>Cited work</article-title></element-citation></ref></ref-list>
  </back>
</article>"#;

        let document = Document::from_jats(xml).unwrap();
        assert_eq!(document.title.as_deref(), Some("Gene X regulates growth"));
        assert_eq!(
            document.abstract_text.as_deref(),
            Some("We show that X & Y interact. Second point.")
        );

        assert_eq!(
            extract_blocks(&document),
            vec![
                "Gene X regulates growth",
                "We show that X & Y interact. Second point.",
                "Lead paragraph.",
                "Introduction",
                "Intro text with a citation.",
                "Background",
                "Deeper.",
                "Results",
                "Raw <data>",
            ]
        );
    }

    #[test]
    fn test_from_jats_pmc_wrapper_with_namespaces() {
        let xml = r#"<pmc-articleset><jats:article xmlns:jats="http://jats.nlm.nih.gov">
            <jats:front><jats:article-title>Wrapped</jats:article-title></jats:front>
            <jats:body><jats:sec><jats:title>Only</jats:title><jats:p>Text</jats:p></jats:sec></jats:body>
        </jats:article></pmc-articleset>"#;

        let document = Document::from_jats(xml).unwrap();
        assert_eq!(extract_blocks(&document), vec!["Wrapped", "Only", "Text"]);
    }

    #[test]
    fn test_from_jats_without_body() {
        let xml = "<article><front><article-title>Only title</article-title>\
                   <abstract>Plain abstract</abstract></front></article>";

        let document = Document::from_jats(xml).unwrap();
        assert!(document.body.is_none());
        assert_eq!(extract_text(&document), "Only title\n\nPlain abstract");
    }

    #[test]
    fn test_title_ignores_cited_works() {
        let xml = "<article><front><article-meta><abstract><p>Abs.</p></abstract></article-meta></front>\
                   <body><p>Text</p></body>\
                   <back><ref-list><ref><article-title>Cited paper</article-title></ref></ref-list></back>\
                   </article>";

        let document = Document::from_jats(xml).unwrap();
        assert!(document.title.is_none());
        assert_eq!(extract_blocks(&document), vec!["Abs.", "Text"]);

        let loose = "<article><title-group><article-title>Loose</article-title></title-group>\
                     <back><article-title>Cited</article-title></back></article>";
        let document = Document::from_jats(loose).unwrap();
        assert_eq!(document.title.as_deref(), Some("Loose"));
    }

    #[test]
    fn test_from_jats_malformed() {
        assert!(Document::from_jats("<article><body><p>open").is_err());
        assert!(Document::from_jats("<article></body>").is_err());
    }
}
