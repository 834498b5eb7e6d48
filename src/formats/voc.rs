//! PASCAL VOC archive codec.
//!
//! Layout: `JPEGImages/` tree, one `Annotations/<basename>.xml` per image,
//! `ImageSets/Main/{train,trainval}.txt` split listings, a `classes.txt`
//! class list, and the generated `README.md`. Boxes are corner-based
//! integer `xmin`/`ymin`/`xmax`/`ymax`.
//!
//! Classes discovered in XML that were never declared in `classes.txt` are
//! registered on the fly, appended to the category list in scan order.

use std::fmt::Write as _;

use roxmltree::Node;

use crate::archive::Archive;
use crate::dataset::{
    base_name, Annotation, AnnotationMap, BBoxXYWH, Category, Dataset, FileContent, FileId,
    ImageFile,
};
use crate::error::LabelpackError;
use crate::export::ExportJob;

use super::detect::Listing;
use super::{blob_dimensions, file_name, has_image_extension, DatasetFragment, FormatCodec};

pub(crate) struct VocCodec;

impl FormatCodec for VocCodec {
    fn matches_listing(&self, listing: &Listing<'_>) -> bool {
        (listing.has_rooted("images") || listing.has_rooted("JPEGImages"))
            && listing.has_rooted("Annotations")
    }

    fn parse(&self, archive: &Archive) -> Result<DatasetFragment, LabelpackError> {
        let mut errors = Vec::new();

        let mut categories = match find_classes_txt(archive) {
            Some(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .enumerate()
                .map(|(index, name)| Category::at_index(index, name))
                .collect(),
            None => Vec::new(),
        };

        let image_dir = if archive.paths().any(|path| path.starts_with("JPEGImages/")) {
            "JPEGImages/"
        } else {
            "images/"
        };

        let image_paths: Vec<String> = archive
            .paths()
            .filter(|path| path.starts_with(image_dir) && has_image_extension(path))
            .map(str::to_string)
            .collect();

        let mut files = Vec::new();
        let mut annotations = AnnotationMap::new();
        let mut next_annotation_id: u64 = 1;

        for path in image_paths {
            let Some(bytes) = archive.bytes(&path) else {
                continue;
            };
            let name = file_name(&path).to_string();
            let xml_path = format!("Annotations/{}.xml", base_name(&name));

            let (width, height, file_annotations) = match archive.text(&xml_path) {
                Some(xml) => match parse_voc_xml(&xml) {
                    Ok(parsed) => {
                        let mut anns = Vec::with_capacity(parsed.objects.len());
                        for object in parsed.objects {
                            let category_id = find_or_register_category(
                                &mut categories,
                                &object.name,
                            );
                            anns.push(Annotation::new(
                                next_annotation_id,
                                category_id,
                                BBoxXYWH::from_xywh(
                                    object.xmin,
                                    object.ymin,
                                    object.xmax - object.xmin,
                                    object.ymax - object.ymin,
                                ),
                            ));
                            next_annotation_id += 1;
                        }
                        (parsed.width, parsed.height, anns)
                    }
                    Err(reason) => {
                        errors.push(format!("annotation {}: {}", xml_path, reason));
                        continue;
                    }
                },
                // No XML counterpart: an unannotated image whose dimensions
                // come from the image bytes themselves.
                None => match blob_dimensions(bytes) {
                    Ok((width, height)) => (width, height, Vec::new()),
                    Err(reason) => {
                        errors.push(format!("image {}: {}", path, reason));
                        continue;
                    }
                },
            };

            let file_id = FileId::new(files.len() as u64 + 1);
            files.push(ImageFile::new(
                file_id,
                name,
                FileContent::Bytes(bytes.to_vec()),
                width,
                height,
            ));
            annotations.insert(file_id, file_annotations);
        }

        Ok(DatasetFragment {
            dataset: Dataset {
                files,
                categories,
                annotations,
            },
            errors,
        })
    }

    fn render(&self, job: &ExportJob<'_>) -> Result<Vec<(String, Vec<u8>)>, LabelpackError> {
        let mut entries = Vec::new();
        let mut base_names = Vec::with_capacity(job.files.len());

        for prepared in &job.files {
            entries.push((
                format!("JPEGImages/{}", prepared.file.name),
                prepared.bytes.clone(),
            ));

            let xml = render_voc_xml(prepared.file, &prepared.annotations, job);
            entries.push((
                format!("Annotations/{}.xml", prepared.file.base_name()),
                xml.into_bytes(),
            ));

            base_names.push(prepared.file.base_name().to_string());
        }

        // Both splits list every surviving file; this layer does not split.
        let listing = base_names.join("\n");
        entries.push((
            "ImageSets/Main/train.txt".to_string(),
            listing.clone().into_bytes(),
        ));
        entries.push(("ImageSets/Main/trainval.txt".to_string(), listing.into_bytes()));

        let mut classes = String::new();
        for category in job.categories {
            classes.push_str(&category.name);
            classes.push('\n');
        }
        entries.push(("classes.txt".to_string(), classes.into_bytes()));

        Ok(entries)
    }
}

fn find_classes_txt(archive: &Archive) -> Option<String> {
    let path = archive
        .find_path(|path| path == "classes.txt")
        .or_else(|| archive.find_path(|path| path.ends_with("/classes.txt")))?
        .to_string();
    archive.text(&path)
}

fn find_or_register_category(
    categories: &mut Vec<Category>,
    name: &str,
) -> crate::dataset::CategoryId {
    if let Some(existing) = categories.iter().find(|category| category.name == name) {
        return existing.id;
    }
    let category = Category::at_index(categories.len(), name);
    let id = category.id;
    categories.push(category);
    id
}

// ============================================================================
// XML reading
// ============================================================================

#[derive(Debug)]
struct ParsedVocAnnotation {
    width: u32,
    height: u32,
    objects: Vec<ParsedVocObject>,
}

#[derive(Debug)]
struct ParsedVocObject {
    name: String,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

fn parse_voc_xml(xml: &str) -> Result<ParsedVocAnnotation, String> {
    let document = roxmltree::Document::parse(xml).map_err(|source| source.to_string())?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err("missing <annotation> root element".to_string());
    }

    let size = child_element(annotation, "size").ok_or("missing <size> in <annotation>")?;
    let width = parse_child_u32(size, "width")?;
    let height = parse_child_u32(size, "height")?;

    let mut objects = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let Some(name) = child_text(object, "name") else {
            continue;
        };
        let Some(bndbox) = child_element(object, "bndbox") else {
            continue;
        };

        let xmin = parse_child_f64(bndbox, "xmin")?;
        let ymin = parse_child_f64(bndbox, "ymin")?;
        let xmax = parse_child_f64(bndbox, "xmax")?;
        let ymax = parse_child_f64(bndbox, "ymax")?;

        objects.push(ParsedVocObject {
            name,
            xmin,
            ymin,
            xmax,
            ymax,
        });
    }

    Ok(ParsedVocAnnotation {
        width,
        height,
        objects,
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag).and_then(|child| child.text().map(|text| text.trim().to_string()))
}

fn parse_child_u32(node: Node<'_, '_>, tag: &str) -> Result<u32, String> {
    let raw = child_text(node, tag).ok_or_else(|| format!("missing <{}>", tag))?;
    raw.parse::<u32>()
        .map_err(|_| format!("invalid <{}> value '{}'", tag, raw))
}

fn parse_child_f64(node: Node<'_, '_>, tag: &str) -> Result<f64, String> {
    let raw = child_text(node, tag).ok_or_else(|| format!("missing <{}>", tag))?;
    raw.parse::<f64>()
        .map_err(|_| format!("invalid <{}> value '{}'", tag, raw))
}

// ============================================================================
// XML writing
// ============================================================================

fn render_voc_xml(
    file: &ImageFile,
    annotations: &[&Annotation],
    job: &ExportJob<'_>,
) -> String {
    let mut xml = String::new();
    let _ = writeln!(xml, "<annotation>");
    let _ = writeln!(xml, "    <folder>JPEGImages</folder>");
    let _ = writeln!(xml, "    <filename>{}</filename>", xml_escape(&file.name));
    let _ = writeln!(xml, "    <path>{}</path>", xml_escape(&file.name));
    let _ = writeln!(xml, "    <source>");
    let _ = writeln!(xml, "        <database>labelpack</database>");
    let _ = writeln!(xml, "    </source>");
    let _ = writeln!(xml, "    <size>");
    let _ = writeln!(xml, "        <width>{}</width>", file.width);
    let _ = writeln!(xml, "        <height>{}</height>", file.height);
    let _ = writeln!(xml, "        <depth>3</depth>");
    let _ = writeln!(xml, "    </size>");
    let _ = writeln!(xml, "    <segmented>0</segmented>");

    for annotation in annotations {
        let name = job
            .categories
            .iter()
            .find(|category| category.id == annotation.category_id)
            .map(|category| category.name.as_str())
            .unwrap_or("unknown");

        let _ = writeln!(xml, "    <object>");
        let _ = writeln!(xml, "        <name>{}</name>", xml_escape(name));
        let _ = writeln!(xml, "        <pose>Unspecified</pose>");
        let _ = writeln!(xml, "        <truncated>0</truncated>");
        let _ = writeln!(xml, "        <difficult>0</difficult>");
        let _ = writeln!(xml, "        <bndbox>");
        let _ = writeln!(
            xml,
            "            <xmin>{}</xmin>",
            annotation.bbox.x().round() as i64
        );
        let _ = writeln!(
            xml,
            "            <ymin>{}</ymin>",
            annotation.bbox.y().round() as i64
        );
        let _ = writeln!(
            xml,
            "            <xmax>{}</xmax>",
            annotation.bbox.xmax().round() as i64
        );
        let _ = writeln!(
            xml,
            "            <ymax>{}</ymax>",
            annotation.bbox.ymax().round() as i64
        );
        let _ = writeln!(xml, "        </bndbox>");
        let _ = writeln!(xml, "    </object>");
    }

    let _ = writeln!(xml, "</annotation>");
    xml
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<annotation>
    <folder>JPEGImages</folder>
    <filename>img001.jpg</filename>
    <size>
        <width>640</width>
        <height>480</height>
        <depth>3</depth>
    </size>
    <object>
        <name>crane</name>
        <bndbox>
            <xmin>10</xmin>
            <ymin>20</ymin>
            <xmax>110</xmax>
            <ymax>220</ymax>
        </bndbox>
    </object>
</annotation>"#;

    #[test]
    fn parse_voc_xml_extracts_size_and_objects() {
        let parsed = parse_voc_xml(SAMPLE_XML).expect("parse voc xml");
        assert_eq!(parsed.width, 640);
        assert_eq!(parsed.height, 480);
        assert_eq!(parsed.objects.len(), 1);
        assert_eq!(parsed.objects[0].name, "crane");
        assert_eq!(parsed.objects[0].xmin, 10.0);
        assert_eq!(parsed.objects[0].ymax, 220.0);
    }

    #[test]
    fn parse_voc_xml_requires_size() {
        let err = parse_voc_xml("<annotation><filename>a.jpg</filename></annotation>")
            .unwrap_err();
        assert!(err.contains("<size>"));
    }

    #[test]
    fn parse_voc_xml_skips_objects_without_bndbox() {
        let xml = r#"<annotation>
            <size><width>10</width><height>10</height></size>
            <object><name>ghost</name></object>
        </annotation>"#;
        let parsed = parse_voc_xml(xml).expect("parse voc xml");
        assert!(parsed.objects.is_empty());
    }

    #[test]
    fn category_registration_reuses_existing_names() {
        let mut categories = vec![Category::at_index(0, "crane")];

        let existing = find_or_register_category(&mut categories, "crane");
        assert_eq!(existing.as_u64(), 0);
        assert_eq!(categories.len(), 1);

        let fresh = find_or_register_category(&mut categories, "ship");
        assert_eq!(fresh.as_u64(), 1);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].name, "ship");
    }

    #[test]
    fn xml_escaping_protects_markup_characters() {
        assert_eq!(xml_escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
