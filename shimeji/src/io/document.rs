//! Read definition documents from disk into [`Entry`] trees.

use std::fs;
use std::path::Path;

use crate::entry::Entry;
use crate::error::ConfigError;

/// Read and parse the document at `path`.
pub fn read_entry(path: &Path) -> Result<Entry, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_entry(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse markup text into an owned element tree rooted at the document element.
pub fn parse_entry(contents: &str) -> Result<Entry, roxmltree::Error> {
    let document = roxmltree::Document::parse(contents)?;
    Ok(convert(document.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> Entry {
    let text: String = node
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();
    let text = text.trim();

    Entry {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
        text: (!text.is_empty()).then(|| text.to_string()),
        children: node
            .children()
            .filter(|child| child.is_element())
            .map(convert)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_attribute_and_child_order() {
        let entry = parse_entry(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <Mascot xmlns="http://www.group-finity.com/Mascot">
              <!-- comment -->
              <ActionList>
                <Action Name="Stand" Type="Stay"> note </Action>
                <Action Name="Walk"/>
              </ActionList>
            </Mascot>"#,
        )
        .expect("parse");

        assert_eq!(entry.name, "Mascot");
        let list = &entry.children[0];
        assert_eq!(list.children.len(), 2);
        assert_eq!(
            list.children[0].attributes,
            vec![
                ("Name".to_string(), "Stand".to_string()),
                ("Type".to_string(), "Stay".to_string())
            ]
        );
        assert_eq!(list.children[0].text.as_deref(), Some("note"));
        assert_eq!(list.children[1].text, None);
    }

    #[test]
    fn read_reports_missing_file_as_read_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = read_entry(&temp.path().join("missing.xml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn read_reports_malformed_markup_as_parse_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.xml");
        fs::write(&path, "<Mascot><ActionList></Mascot>").expect("write");
        let err = read_entry(&path).expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
