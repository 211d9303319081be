//! PowerPoint presentations and slide shows.
//!
//! Both formats share one package layout; they differ only in the content
//! type of the main part. Reading yields one [`Record::Slide`] per slide in
//! presentation order. Writing renders each record as a blank-layout slide
//! holding a single text box.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{ConverterError, Result};
use crate::handler::{FormatHandler, require_records, source_is_empty, write_output};
use crate::model::Record;

use super::ooxml::{
    CONTENT_TYPES_PART, OFFICE_RELS_NS, PACKAGE_RELS_PART, PackageResult, PackageWriter, REL_OFFICE_DOCUMENT,
    Relationship, XmlPart, content_types, main_part, open_package, part_relationships, read_part,
    rels_part_for, relationships_part, resolve_target,
};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";
const MASTER_PART: &str = "ppt/slideMasters/slideMaster1.xml";
const MASTER_RELS_PART: &str = "ppt/slideMasters/_rels/slideMaster1.xml.rels";
const LAYOUT_PART: &str = "ppt/slideLayouts/slideLayout1.xml";
const LAYOUT_RELS_PART: &str = "ppt/slideLayouts/_rels/slideLayout1.xml.rels";
const THEME_PART: &str = "ppt/theme/theme1.xml";

const CT_PRESENTATION: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDESHOW: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideshow.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_MASTER: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_LAYOUT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PRESENTATIONML_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// 4:3 slide size in EMUs.
const SLIDE_WIDTH: u64 = 9_144_000;
const SLIDE_HEIGHT: u64 = 6_858_000;
/// Half-inch inset of the text box.
const TEXT_BOX_INSET: u64 = 457_200;
const FIRST_SLIDE_ID: usize = 256;

/// Main part flavour of the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationKind {
    /// `.pptx`, opens in the editor.
    Presentation,
    /// `.ppsx`, opens straight into the slide show.
    Slideshow,
}

#[derive(Debug, Clone, Copy)]
pub struct PptxHandler {
    kind: PresentationKind,
}

impl PptxHandler {
    pub fn presentation() -> Self {
        Self {
            kind: PresentationKind::Presentation,
        }
    }

    pub fn slideshow() -> Self {
        Self {
            kind: PresentationKind::Slideshow,
        }
    }

    pub fn kind(&self) -> PresentationKind {
        self.kind
    }

    fn main_content_type(&self) -> &'static str {
        match self.kind {
            PresentationKind::Presentation => CT_PRESENTATION,
            PresentationKind::Slideshow => CT_SLIDESHOW,
        }
    }
}

impl FormatHandler for PptxHandler {
    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        if source_is_empty(path, "PowerPoint")? {
            return Ok(Vec::new());
        }
        let mut archive = open_package(path, "PowerPoint")?;
        let records = read_slides(&mut archive)
            .map_err(|err| ConverterError::processing_with(path, "invalid PowerPoint presentation", err))?;
        debug!(slides = records.len(), "parsed PowerPoint presentation");
        Ok(records)
    }

    fn write(&self, path: &Path, records: &[Record]) -> Result<()> {
        require_records(records, "PowerPoint")?;
        let bytes = render_package(records, self.main_content_type())
            .map_err(|err| ConverterError::processing_with(path, "could not write PowerPoint presentation", err))?;
        write_output(path, &bytes)
    }
}

fn read_slides<R: Read + Seek>(archive: &mut ZipArchive<R>) -> PackageResult<Vec<Record>> {
    let presentation = main_part(archive, PRESENTATION_PART)?;
    let slide_ids = slide_relationship_ids(&read_part(archive, &presentation)?)?;
    let targets: HashMap<String, String> = part_relationships(archive, &presentation)?
        .into_iter()
        .map(|rel| (rel.id, resolve_target(&presentation, &rel.target)))
        .collect();

    let mut records = Vec::with_capacity(slide_ids.len());
    for (index, id) in slide_ids.iter().enumerate() {
        let Some(slide_part) = targets.get(id) else {
            debug!(relationship = %id, "slide relationship has no target");
            continue;
        };
        let content = slide_text(&read_part(archive, slide_part)?)?;
        records.push(Record::Slide {
            content,
            number: Some(index as u32 + 1),
        });
    }
    Ok(records)
}

/// Relationship ids of the `sldIdLst` entries, in presentation order.
fn slide_relationship_ids(xml: &str) -> PackageResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(id) = relationship_id(e)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// The namespaced `r:id` attribute, as opposed to the bare numeric `id`.
fn relationship_id(e: &BytesStart<'_>) -> PackageResult<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Text of every shape on the slide, one line per paragraph, shapes in
/// document order.
fn slide_text(xml: &str) -> PackageResult<String> {
    let mut reader = Reader::from_str(xml);

    let mut shapes: Vec<String> = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut shape_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" | b"graphicFrame" => {
                    if shape_depth == 0 {
                        paragraphs.clear();
                    }
                    shape_depth += 1;
                }
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"br" => paragraph.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"sp" | b"graphicFrame" => {
                    shape_depth = shape_depth.saturating_sub(1);
                    if shape_depth == 0 {
                        let text = paragraphs.join("\n");
                        let text = text.trim();
                        if !text.is_empty() {
                            shapes.push(text.to_string());
                        }
                    }
                }
                b"p" => paragraphs.push(std::mem::take(&mut paragraph)),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => paragraph.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes.join("\n").trim().to_string())
}

fn render_package(records: &[Record], main_content_type: &str) -> PackageResult<Vec<u8>> {
    let slide_parts: Vec<String> = (1..=records.len())
        .map(|number| format!("ppt/slides/slide{number}.xml"))
        .collect();

    let mut overrides = vec![
        (PRESENTATION_PART.to_string(), main_content_type),
        (MASTER_PART.to_string(), CT_MASTER),
        (LAYOUT_PART.to_string(), CT_LAYOUT),
        (THEME_PART.to_string(), CT_THEME),
    ];
    overrides.extend(slide_parts.iter().map(|part| (part.clone(), CT_SLIDE)));

    let mut presentation_rels = vec![
        Relationship::new("rId1", REL_MASTER, "slideMasters/slideMaster1.xml"),
        Relationship::new("rId2", REL_THEME, "theme/theme1.xml"),
    ];
    presentation_rels.extend(
        (1..=records.len()).map(|number| {
            Relationship::new(format!("rId{}", number + 2), REL_SLIDE, format!("slides/slide{number}.xml"))
        }),
    );

    let mut package = PackageWriter::new();
    package.add_part(CONTENT_TYPES_PART, &content_types(&overrides)?)?;
    package.add_part(
        PACKAGE_RELS_PART,
        &relationships_part(&[Relationship::new("rId1", REL_OFFICE_DOCUMENT, PRESENTATION_PART)])?,
    )?;
    package.add_part(PRESENTATION_PART, &presentation_xml(records.len())?)?;
    package.add_part(PRESENTATION_RELS_PART, &relationships_part(&presentation_rels)?)?;

    package.add_part(MASTER_PART, &static_part(SLIDE_MASTER_XML)?)?;
    package.add_part(
        MASTER_RELS_PART,
        &relationships_part(&[
            Relationship::new("rId1", REL_LAYOUT, "../slideLayouts/slideLayout1.xml"),
            Relationship::new("rId2", REL_THEME, "../theme/theme1.xml"),
        ])?,
    )?;
    package.add_part(LAYOUT_PART, &static_part(SLIDE_LAYOUT_XML)?)?;
    package.add_part(
        LAYOUT_RELS_PART,
        &relationships_part(&[Relationship::new("rId1", REL_MASTER, "../slideMasters/slideMaster1.xml")])?,
    )?;
    package.add_part(THEME_PART, &static_part(THEME_XML)?)?;

    let slide_rels = relationships_part(&[Relationship::new("rId1", REL_LAYOUT, "../slideLayouts/slideLayout1.xml")])?;
    for (record, part) in records.iter().zip(&slide_parts) {
        package.add_part(part, &slide_xml(&record.content())?)?;
        package.add_part(&rels_part_for(part), &slide_rels)?;
    }

    package.finish()
}

fn presentation_xml(slide_count: usize) -> PackageResult<Vec<u8>> {
    let mut part = XmlPart::new()?;
    part.open(
        "p:presentation",
        &[
            ("xmlns:a", DRAWINGML_NS),
            ("xmlns:r", OFFICE_RELS_NS),
            ("xmlns:p", PRESENTATIONML_NS),
            ("saveSubsetFonts", "1"),
        ],
    )?;

    part.open("p:sldMasterIdLst", &[])?;
    part.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    part.close("p:sldMasterIdLst")?;

    part.open("p:sldIdLst", &[])?;
    for index in 0..slide_count {
        let id = (FIRST_SLIDE_ID + index).to_string();
        let rel = format!("rId{}", index + 3);
        part.empty("p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
    }
    part.close("p:sldIdLst")?;

    let width = SLIDE_WIDTH.to_string();
    let height = SLIDE_HEIGHT.to_string();
    part.empty(
        "p:sldSz",
        &[("cx", width.as_str()), ("cy", height.as_str()), ("type", "screen4x3")],
    )?;
    part.empty("p:notesSz", &[("cx", height.as_str()), ("cy", width.as_str())])?;
    part.close("p:presentation")?;
    Ok(part.into_bytes())
}

fn slide_xml(text: &str) -> PackageResult<Vec<u8>> {
    let inset = TEXT_BOX_INSET.to_string();
    let box_width = (SLIDE_WIDTH - 2 * TEXT_BOX_INSET).to_string();
    let box_height = (SLIDE_HEIGHT - 2 * TEXT_BOX_INSET).to_string();

    let mut part = XmlPart::new()?;
    part.open(
        "p:sld",
        &[
            ("xmlns:a", DRAWINGML_NS),
            ("xmlns:r", OFFICE_RELS_NS),
            ("xmlns:p", PRESENTATIONML_NS),
        ],
    )?;
    part.open("p:cSld", &[])?;
    part.open("p:spTree", &[])?;
    part.raw(GROUP_SHAPE_PROPERTIES)?;

    part.open("p:sp", &[])?;
    part.open("p:nvSpPr", &[])?;
    part.empty("p:cNvPr", &[("id", "2"), ("name", "TextBox 1")])?;
    part.empty("p:cNvSpPr", &[("txBox", "1")])?;
    part.empty("p:nvPr", &[])?;
    part.close("p:nvSpPr")?;

    part.open("p:spPr", &[])?;
    part.open("a:xfrm", &[])?;
    part.empty("a:off", &[("x", inset.as_str()), ("y", inset.as_str())])?;
    part.empty("a:ext", &[("cx", box_width.as_str()), ("cy", box_height.as_str())])?;
    part.close("a:xfrm")?;
    part.open("a:prstGeom", &[("prst", "rect")])?;
    part.empty("a:avLst", &[])?;
    part.close("a:prstGeom")?;
    part.empty("a:noFill", &[])?;
    part.close("p:spPr")?;

    part.open("p:txBody", &[])?;
    part.empty("a:bodyPr", &[("wrap", "square"), ("rtlCol", "0")])?;
    part.empty("a:lstStyle", &[])?;
    for line in text.lines() {
        if line.is_empty() {
            part.empty("a:p", &[])?;
            continue;
        }
        part.open("a:p", &[])?;
        part.open("a:r", &[])?;
        part.empty("a:rPr", &[("lang", "en-US"), ("dirty", "0")])?;
        part.element("a:t", &[], line)?;
        part.close("a:r")?;
        part.close("a:p")?;
    }
    if text.is_empty() {
        part.empty("a:p", &[])?;
    }
    part.close("p:txBody")?;
    part.close("p:sp")?;

    part.close("p:spTree")?;
    part.close("p:cSld")?;
    part.raw("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>")?;
    part.close("p:sld")?;
    Ok(part.into_bytes())
}

fn static_part(markup: &str) -> PackageResult<Vec<u8>> {
    let mut part = XmlPart::new()?;
    part.raw(markup)?;
    Ok(part.into_bytes())
}

const GROUP_SHAPE_PROPERTIES: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
);

const SLIDE_MASTER_XML: &str = concat!(
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
    r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"</p:sldMaster>"#,
);

const SLIDE_LAYOUT_XML: &str = concat!(
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:sldLayout>"#,
);

const THEME_XML: &str = concat!(
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">"#,
    r#"<a:themeElements>"#,
    r#"<a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#,
    r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2>"#,
    r#"<a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1>"#,
    r#"<a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>"#,
    r#"<a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>"#,
    r#"<a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink>"#,
    r#"<a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Office">"#,
    r#"<a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst>"#,
    r#"<a:lnStyleLst>"#,
    r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst>"#,
    r#"<a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst>"#,
    r#"</a:fmtScheme>"#,
    r#"</a:themeElements>"#,
    r#"</a:theme>"#,
);

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::Slide {
                content: "Agenda\n\nIntro & goals".into(),
                number: Some(1),
            },
            Record::row([("text", "<closing> remarks")]),
        ]
    }

    #[test]
    fn slides_survive_in_order() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("deck.pptx");

        PptxHandler::presentation().write(&path, &records()).expect("deck written");
        let slides = PptxHandler::presentation().read(&path).expect("deck read");

        assert_eq!(
            slides,
            vec![
                Record::Slide {
                    content: "Agenda\n\nIntro & goals".into(),
                    number: Some(1),
                },
                Record::Slide {
                    content: "<closing> remarks".into(),
                    number: Some(2),
                },
            ]
        );
    }

    #[test]
    fn slideshow_uses_its_own_content_type() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("deck.ppsx");

        PptxHandler::slideshow().write(&path, &records()).expect("show written");

        let mut archive = ZipArchive::new(File::open(&path).expect("show opened")).expect("zip opened");
        let types = read_part(&mut archive, CONTENT_TYPES_PART).expect("content types read");
        assert!(types.contains(CT_SLIDESHOW));
        assert!(!types.contains(CT_PRESENTATION));
        assert_eq!(PptxHandler::presentation().read(&path).expect("show read").len(), 2);
    }

    #[test]
    fn control_characters_are_not_written_raw() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("legacy.pptx");

        PptxHandler::presentation()
            .write(&path, &[Record::text("form\u{c}feed")])
            .expect("deck written");

        let mut archive = ZipArchive::new(File::open(&path).expect("deck opened")).expect("zip opened");
        let xml = read_part(&mut archive, "ppt/slides/slide1.xml").expect("slide part read");
        assert!(!xml.contains('\u{c}'), "got: {xml:?}");
        assert!(xml.contains("form feed"), "got: {xml}");
    }

    #[test]
    fn slide_order_follows_the_id_list() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>
<p:sldId id="300" r:id="rId7"/><p:sldId id="256" r:id="rId2"/>
</p:sldIdLst></p:presentation>"#;
        assert_eq!(slide_relationship_ids(xml).expect("ids parsed"), vec!["rId7", "rId2"]);
    }

    #[test]
    fn shapes_are_separated_by_lines() {
        let xml = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
<p:sp><p:txBody><a:p><a:r><a:t>Title</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:txBody><a:p><a:r><a:t>one</a:t></a:r><a:br/><a:r><a:t>two</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:txBody><a:p/></p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#;
        assert_eq!(slide_text(xml).expect("slide parsed"), "Title\none\ntwo");
    }
}
