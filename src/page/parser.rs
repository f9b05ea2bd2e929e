//! PAGE XML parsing.
//!
//! The parser is namespace-agnostic: element names are matched without
//! their namespace prefix so that documents using any PAGE schema
//! revision (or none) parse identically.

use std::path::Path;

use roxmltree::Node;
use tracing::debug;

use crate::core::{LayprepError, LayprepResult};
use crate::page::model::{parse_points, PageAnnotation, Region, TextLine};

/// Parses a PAGE XML file into a [`PageAnnotation`].
///
/// A missing `Page` element, missing or non-numeric page dimensions, or
/// malformed coordinates are errors. Regions or lines without a
/// `Coords` element are skipped with a debug log.
pub fn parse_page_xml(path: &Path) -> LayprepResult<PageAnnotation> {
    let text = std::fs::read_to_string(path)?;
    parse_page_xml_str(&text, path)
}

/// Parses PAGE XML from a string; `source` is used for diagnostics only.
pub fn parse_page_xml_str(text: &str, source: &Path) -> LayprepResult<PageAnnotation> {
    let doc = roxmltree::Document::parse(text)?;

    let page = doc
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "Page")
        .ok_or_else(|| {
            LayprepError::invalid_input(format!(
                "{}: no Page element found",
                source.display()
            ))
        })?;

    let image_filename = page.attribute("imageFilename").unwrap_or("").to_string();
    let width = required_dimension(&page, "imageWidth", source)?;
    let height = required_dimension(&page, "imageHeight", source)?;

    let mut regions = Vec::new();
    let mut text_lines = Vec::new();

    for node in page.descendants().filter(|n| n.is_element()) {
        let tag = node.tag_name().name();
        if tag.ends_with("Region") {
            let Some(coords) = coords_of(&node)? else {
                debug!(source = %source.display(), element = tag, "region without Coords, skipping");
                continue;
            };
            let region_type = structure_type(&node).unwrap_or_else(|| tag.to_string());
            regions.push(Region {
                element: tag.to_string(),
                region_type,
                coords,
            });
        } else if tag == "TextLine" {
            let Some(coords) = coords_of(&node)? else {
                debug!(source = %source.display(), "text line without Coords, skipping");
                continue;
            };
            let baseline = node
                .children()
                .find(|c| c.is_element() && c.tag_name().name() == "Baseline")
                .and_then(|b| b.attribute("points"))
                .map(parse_points)
                .transpose()?
                .filter(|points| !points.is_empty());
            let region_type = node
                .ancestors()
                .find(|a| a.is_element() && a.tag_name().name().ends_with("Region"))
                .map(|a| structure_type(&a).unwrap_or_else(|| a.tag_name().name().to_string()));
            text_lines.push(TextLine {
                coords,
                baseline,
                region_type,
            });
        }
    }

    Ok(PageAnnotation::new(
        source.to_path_buf(),
        image_filename,
        (height, width),
        regions,
        text_lines,
    ))
}

fn required_dimension(page: &Node<'_, '_>, attr: &str, source: &Path) -> LayprepResult<u32> {
    page.attribute(attr)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&v| v > 0)
        .ok_or_else(|| {
            LayprepError::invalid_input(format!(
                "{}: Page element has no valid {attr}",
                source.display()
            ))
        })
}

/// The element's own `Coords` polygon, if present and non-empty.
fn coords_of(node: &Node<'_, '_>) -> LayprepResult<Option<Vec<crate::page::Point>>> {
    let Some(coords) = node
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "Coords")
        .and_then(|c| c.attribute("points"))
    else {
        return Ok(None);
    };
    let points = parse_points(coords)?;
    Ok((!points.is_empty()).then_some(points))
}

/// Extracts the structure type from a PAGE `custom` attribute, e.g.
/// `"readingOrder {index:0;} structure {type:paragraph;}"`.
fn structure_type(node: &Node<'_, '_>) -> Option<String> {
    let custom = node.attribute("custom")?;
    let structure = custom.split("structure").nth(1)?;
    let body = structure.split('{').nth(1)?.split('}').next()?;
    for field in body.split(';') {
        if let Some((key, value)) = field.split_once(':') {
            if key.trim() == "type" {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PcGts xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15">
  <Page imageFilename="scan_0001.jpg" imageWidth="800" imageHeight="600">
    <TextRegion id="r1" custom="readingOrder {index:0;} structure {type:paragraph;}">
      <Coords points="10,10 300,10 300,200 10,200"/>
      <TextLine id="l1">
        <Coords points="12,20 290,20 290,60 12,60"/>
        <Baseline points="12,55 290,55"/>
      </TextLine>
      <TextLine id="l2">
        <Coords points="12,80 290,80 290,120 12,120"/>
      </TextLine>
    </TextRegion>
    <SeparatorRegion id="r2">
      <Coords points="0,300 800,300 800,305 0,305"/>
    </SeparatorRegion>
  </Page>
</PcGts>
"#;

    fn source() -> PathBuf {
        PathBuf::from("test.xml")
    }

    #[test]
    fn namespaced_page_parses() {
        let page = parse_page_xml_str(PAGE, &source()).expect("should parse");
        assert_eq!(page.image_filename, "scan_0001.jpg");
        assert_eq!(page.size(), (600, 800));
        assert_eq!(page.regions.len(), 2);
        assert_eq!(page.text_lines.len(), 2);
    }

    #[test]
    fn structure_type_comes_from_custom_attribute() {
        let page = parse_page_xml_str(PAGE, &source()).expect("should parse");
        assert_eq!(page.regions[0].region_type, "paragraph");
        // No custom attribute: falls back to the element tag.
        assert_eq!(page.regions[1].region_type, "SeparatorRegion");
    }

    #[test]
    fn baselines_are_optional_per_line() {
        let page = parse_page_xml_str(PAGE, &source()).expect("should parse");
        assert!(page.text_lines[0].baseline.is_some());
        assert!(page.text_lines[1].baseline.is_none());
        assert_eq!(page.iter_baseline_coords().count(), 1);
    }

    #[test]
    fn text_lines_know_their_region_type() {
        let page = parse_page_xml_str(PAGE, &source()).expect("should parse");
        assert_eq!(page.text_lines[0].region_type.as_deref(), Some("paragraph"));
    }

    #[test]
    fn un_namespaced_page_parses_identically() {
        let plain = PAGE.replace(
            r#" xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15""#,
            "",
        );
        let page = parse_page_xml_str(&plain, &source()).expect("should parse");
        assert_eq!(page.regions.len(), 2);
    }

    #[test]
    fn missing_page_element_is_an_error() {
        let err = parse_page_xml_str("<PcGts></PcGts>", &source()).unwrap_err();
        assert!(err.to_string().contains("no Page element"));
    }

    #[test]
    fn missing_dimensions_are_an_error() {
        let xml = r#"<PcGts><Page imageFilename="x.jpg"></Page></PcGts>"#;
        assert!(parse_page_xml_str(xml, &source()).is_err());
    }
}
