//! Element-tree EHR exports in XML.
//!
//! Person fields are read by path below the document root
//! (`patient/patientName/given`, ...). Every other child of `patient` is
//! flattened into `relatedFields`: leaves become text, elements with children
//! become nested maps. Namespaces are ignored; only local names are compared.

use std::collections::btree_map::Entry;

use quick_xml::events::Event;
use quick_xml::Reader;
use roxmltree::{Document, Node};

use crate::error::{ConversionError, Result};
use crate::pipeline::ConversionOptions;
use crate::record::{
    CanonicalRecord, FieldDefaults, FieldValue, PersonDraft, RelatedFields, NOT_PROVIDED,
};

pub const RESOURCE_TYPE: &str = "EHR_XML";

const PATIENT: &str = "patient";
const HOSPITAL: &str = "hospitalName";
const CONSUMED: [&str; 4] = ["patientName", "gender", "birthDate", "vitals"];

/// The document root and `patient` sit above related-field level 1.
const ENCLOSING_LEVELS: usize = 2;

const DEFAULTS: FieldDefaults = FieldDefaults {
    vitals: NOT_PROVIDED,
    ..FieldDefaults::UNKNOWN
};

pub fn parse(raw: &str, options: &ConversionOptions) -> Result<CanonicalRecord> {
    check_nesting(raw, options.max_depth)?;
    let doc = Document::parse(raw)?;
    let root = doc.root_element();
    let text_at = |path: &[&str]| find_path(root, path).and_then(element_text);

    let person = PersonDraft {
        first_name: text_at(&[PATIENT, "patientName", "given"]),
        last_name: text_at(&[PATIENT, "patientName", "family"]),
        gender: text_at(&[PATIENT, "gender"]),
        date_of_birth: text_at(&[PATIENT, "birthDate"]),
        vitals: text_at(&[PATIENT, "vitals"]),
    }
    .or_defaults(&DEFAULTS);

    let related = match find_path(root, &[PATIENT]) {
        Some(patient) => flatten_children(patient, &CONSUMED, 1, options.max_depth)?,
        None => RelatedFields::new(),
    };

    Ok(CanonicalRecord::build(
        RESOURCE_TYPE,
        DEFAULTS.hospital_or_default(text_at(&[HOSPITAL])),
        person,
        related,
    ))
}

/// Streaming pass that rejects over-deep documents before the tree is built.
///
/// The tree builder recurses once per level, so depth has to be bounded
/// first. Syntax errors stop the scan and are left to the tree parser.
fn check_nesting(raw: &str, limit: usize) -> Result<()> {
    let allowed = limit.saturating_add(ENCLOSING_LEVELS);
    let mut reader = Reader::from_str(raw);
    let mut depth = 0usize;
    loop {
        let opened = match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                depth
            }
            Ok(Event::Empty(_)) => depth + 1,
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Ok(Event::Eof) | Err(_) => return Ok(()),
            Ok(_) => continue,
        };
        if opened > allowed {
            return Err(ConversionError::DepthExceeded { limit });
        }
    }
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn find_path<'a, 'input>(node: Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    path.iter()
        .try_fold(node, |current, name| child_element(current, name))
}

/// Concatenated text children; comments and processing instructions are skipped.
fn element_text(node: Node) -> Option<String> {
    let mut texts = node
        .children()
        .filter(Node::is_text)
        .filter_map(|child| child.text())
        .peekable();
    texts.peek()?;
    Some(texts.collect())
}

/// Flatten the element children of `node`, skipping tags in `skip`.
///
/// `depth` is the nesting level of the children relative to `patient`.
fn flatten_children(
    node: Node,
    skip: &[&str],
    depth: usize,
    limit: usize,
) -> Result<RelatedFields> {
    let mut fields = RelatedFields::new();
    for child in node.children().filter(Node::is_element) {
        if depth > limit {
            return Err(ConversionError::DepthExceeded { limit });
        }
        let name = child.tag_name().name();
        if skip.contains(&name) {
            continue;
        }
        let value = if child.children().any(|c| c.is_element()) {
            FieldValue::Map(flatten_children(child, &[], depth + 1, limit)?)
        } else {
            FieldValue::Text(element_text(child).unwrap_or_default())
        };
        insert_repeated(&mut fields, name, value);
    }
    Ok(fields)
}

/// Repeated sibling tags collapse into a list, in document order.
fn insert_repeated(fields: &mut RelatedFields, name: &str, value: FieldValue) {
    match fields.entry(name.to_string()) {
        Entry::Vacant(v) => {
            v.insert(value);
        }
        Entry::Occupied(mut o) => match o.get_mut() {
            FieldValue::List(items) => items.push(value),
            existing => {
                let first = std::mem::replace(existing, FieldValue::Null);
                *existing = FieldValue::List(vec![first, value]);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DEFAULT_MAX_DEPTH;
    use crate::record::UNKNOWN;

    const EXPORT: &str = r#"
        <ehr>
            <hospitalName>St. Mary</hospitalName>
            <patient>
                <patientName>
                    <given>Ann</given>
                    <family>Lee</family>
                </patientName>
                <gender>female</gender>
                <birthDate>1970-01-01</birthDate>
                <vitals>BP 120/80</vitals>
                <mrn>A-1</mrn>
                <address>
                    <city>Springfield</city>
                    <geo><lat>39.8</lat><lon>-89.6</lon></geo>
                </address>
                <allergy>penicillin</allergy>
                <allergy>latex</allergy>
            </patient>
        </ehr>"#;

    fn convert(raw: &str) -> Result<CanonicalRecord> {
        parse(raw, &ConversionOptions::default())
    }

    #[test]
    fn path_lookups() {
        let record = convert(EXPORT).unwrap();
        assert_eq!(record.resource_type, RESOURCE_TYPE);
        assert_eq!(record.hospital_identifier, "St. Mary");
        assert_eq!(record.person.first_name, "Ann");
        assert_eq!(record.person.last_name, "Lee");
        assert_eq!(record.person.gender, "female");
        assert_eq!(record.person.date_of_birth, "1970-01-01");
        assert_eq!(record.person.vitals, "BP 120/80");
    }

    #[test]
    fn related_fields_are_flattened_recursively() {
        let record = convert(EXPORT).unwrap();
        let related = &record.related_fields;
        let keys: Vec<_> = related.keys().map(String::as_str).collect();
        assert_eq!(keys, ["address", "allergy", "mrn"]);

        assert_eq!(related["mrn"].as_text(), Some("A-1"));
        let address = related["address"].as_map().unwrap();
        assert_eq!(address["city"].as_text(), Some("Springfield"));
        let geo = address["geo"].as_map().unwrap();
        assert_eq!(geo["lat"].as_text(), Some("39.8"));
        assert_eq!(
            related["allergy"],
            FieldValue::List(vec!["penicillin".into(), "latex".into()])
        );
    }

    #[test]
    fn missing_paths_use_defaults() {
        let record = convert("<ehr><patient><gender>M</gender></patient></ehr>").unwrap();
        assert_eq!(record.hospital_identifier, UNKNOWN);
        assert_eq!(record.person.first_name, UNKNOWN);
        assert_eq!(record.person.vitals, NOT_PROVIDED);
        assert_eq!(record.person.gender, "M");
        assert!(record.related_fields.is_empty());
    }

    #[test]
    fn empty_leaf_is_empty_text() {
        let record = convert("<ehr><patient><note/></patient></ehr>").unwrap();
        assert_eq!(record.related_fields["note"].as_text(), Some(""));
    }

    #[test]
    fn namespaced_documents_match_local_names() {
        let record = convert(
            r#"<ehr xmlns="urn:example:ehr"><hospitalName>NS</hospitalName>
               <patient><gender>F</gender></patient></ehr>"#,
        )
        .unwrap();
        assert_eq!(record.hospital_identifier, "NS");
        assert_eq!(record.person.gender, "F");
    }

    #[test]
    fn nesting_beyond_limit_is_rejected() {
        let raw = "<ehr><patient><a><b><c><d>deep</d></c></b></a></patient></ehr>";
        let shallow = ConversionOptions {
            max_depth: 3,
            ..ConversionOptions::default()
        };
        let err = parse(raw, &shallow).unwrap_err();
        assert!(matches!(err, ConversionError::DepthExceeded { limit: 3 }));

        let enough = ConversionOptions {
            max_depth: 4,
            ..ConversionOptions::default()
        };
        assert!(parse(raw, &enough).is_ok());
    }

    #[test]
    fn zero_depth_accepts_childless_patient() {
        let none = ConversionOptions {
            max_depth: 0,
            ..ConversionOptions::default()
        };
        let record = parse("<r><hospitalName>H</hospitalName><patient/></r>", &none).unwrap();
        assert_eq!(record.hospital_identifier, "H");
        assert!(record.related_fields.is_empty());

        let err = parse("<r><patient><mrn>1</mrn></patient></r>", &none).unwrap_err();
        assert!(matches!(err, ConversionError::DepthExceeded { limit: 0 }));
    }

    #[test]
    fn nesting_is_bounded_before_the_tree_is_built() {
        let depth = 20_000;
        let raw = format!(
            "<r><patient>{}{}</patient></r>",
            "<a>".repeat(depth),
            "</a>".repeat(depth)
        );
        assert!(matches!(
            check_nesting(&raw, DEFAULT_MAX_DEPTH),
            Err(ConversionError::DepthExceeded { .. })
        ));
        assert!(check_nesting(&raw, depth).is_ok());
        assert!(check_nesting("<a><b></a>", 0).is_ok());
    }

    #[test]
    fn text_around_comments_is_joined() {
        let record = convert(
            "<r><patient><gender><!-- coded -->F</gender>\
             <note>a<!-- x -->b</note></patient></r>",
        )
        .unwrap();
        assert_eq!(record.person.gender, "F");
        assert_eq!(record.related_fields["note"].as_text(), Some("ab"));
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(matches!(
            convert("<ehr><patient></ehr>"),
            Err(ConversionError::Xml(_))
        ));
    }
}
