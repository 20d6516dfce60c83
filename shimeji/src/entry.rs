//! Generic ordered element tree for definition documents.
//!
//! Documents are parsed into [`Entry`] values right after reading, so the rest
//! of the crate never sees the concrete markup library.

/// One element: its name, attributes in document order, trimmed text, and
/// child elements in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Entry>,
}

impl Entry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Entry) -> Self {
        self.children.push(child);
        self
    }

    /// Value of the first attribute called `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Direct children named `name`, in document order.
    pub fn select_children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// All elements below this one (excluding itself), depth-first pre-order.
    pub fn descendants(&self) -> Vec<&Entry> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }
}

fn collect_descendants<'a>(entry: &'a Entry, out: &mut Vec<&'a Entry>) {
    for child in &entry.children {
        out.push(child);
        collect_descendants(child, out);
    }
}
