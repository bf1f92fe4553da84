use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dense document identifier, reassigned on every rebuild
pub type DocId = u32;

/// One named node of a parsed document tree
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocNode {
    pub name: String,
    pub text: Option<String>,
    pub children: Vec<DocNode>,
}

impl DocNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            children: Vec::new(),
        }
    }

    /// A node holding only text
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: DocNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&DocNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DocNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants (not including `self`) with the given name, in
    /// depth-first document order.
    pub fn descendants(&self, name: &str) -> Vec<&DocNode> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_named(name, &mut out);
        }
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a DocNode>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.collect_named(name, out);
        }
    }

    pub fn first_descendant(&self, name: &str) -> Option<&DocNode> {
        self.children.iter().find_map(|c| c.find_named(name))
    }

    fn find_named(&self, name: &str) -> Option<&DocNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_named(name))
    }

    /// Concatenated text of this node and everything below it. Text runs are
    /// separated by a space so that word boundaries survive.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push(' ');
            out.push_str(text);
        }
        for child in &self.children {
            child.append_text(out);
        }
    }

    /// Build a tree from JSON: objects become named children, arrays become
    /// repeated children with the same name, scalars become text.
    pub fn from_json(name: impl Into<String>, value: &Value) -> Self {
        let mut node = DocNode::new(name);
        match value {
            Value::Object(map) => {
                for (key, v) in map {
                    push_json(&mut node.children, key, v);
                }
            }
            Value::Array(items) => {
                let name = node.name.clone();
                for item in items {
                    push_json(&mut node.children, &name, item);
                }
            }
            other => node.text = scalar_text(other),
        }
        node
    }
}

fn push_json(children: &mut Vec<DocNode>, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_json(children, key, item);
            }
        }
        other => children.push(DocNode::from_json(key, other)),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A parsed document plus the file metadata the index needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedDocument {
    pub root: DocNode,
    /// Last-modified time, unix milliseconds
    pub last_modified: u64,
}

impl LoadedDocument {
    pub fn new(root: DocNode, last_modified: u64) -> Self {
        Self {
            root,
            last_modified,
        }
    }
}

/// Current unix time in milliseconds
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
