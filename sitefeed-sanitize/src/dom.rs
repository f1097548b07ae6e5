//! Mutable HTML fragment backed by an html5ever `RcDom`.
//!
//! Fragments are parsed in a `<body>` context, so the result mirrors what a
//! browser builds when the markup is injected into a page. Traversals are
//! iterative; deeply nested input cannot overflow the stack.

use crate::SanitizeError;
use html5ever::driver::ParseOpts;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_fragment, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// The parser drops one newline right after these start tags.
const LEADING_NEWLINE_ELIDED: &[&str] = &["pre", "textarea", "listing"];

/// Elements whose text never renders.
const NON_VISIBLE: &[&str] = &["script", "style", "template", "noscript"];

pub struct Fragment {
    // Dropping the RcDom empties every node under its document, so it lives
    // as long as `root` is in use.
    _dom: RcDom,
    root: Handle,
}

impl Fragment {
    pub fn parse(html: &str) -> Result<Self, SanitizeError> {
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("body"),
        );
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);

        if !dom.errors.is_empty() {
            tracing::trace!(errors = dom.errors.len(), "sanitize.parse.recovered");
        }

        // The fragment parser always wraps the content in a synthetic <html> root.
        let root = dom
            .document
            .children
            .borrow()
            .first()
            .cloned()
            .ok_or(SanitizeError::MissingRoot)?;
        Ok(Self { _dom: dom, root })
    }

    /// Concatenated text of every rendered text node, entities decoded.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            match &node.data {
                NodeData::Text { contents } => out.push_str(&contents.borrow()),
                NodeData::Element { name, .. } if NON_VISIBLE.contains(&&*name.local) => {
                    continue;
                }
                _ => {}
            }
            // Reverse so the stack pops children in document order.
            stack.extend(node.children.borrow().iter().rev().cloned());
        }
        out
    }

    /// Detach every element (with its subtree) for which `remove` returns true.
    pub fn remove_elements<F>(&mut self, mut remove: F)
    where
        F: FnMut(&str, &[Attribute]) -> bool,
    {
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            node.children.borrow_mut().retain(|child| match &child.data {
                NodeData::Element { name, attrs, .. } => !remove(&name.local, &attrs.borrow()),
                _ => true,
            });
            stack.extend(node.children.borrow().iter().cloned());
            if let Some(contents) = template_contents(&node) {
                stack.push(contents);
            }
        }
    }

    /// Like [`remove_elements`](Self::remove_elements), restricted to elements
    /// below an `<svg>` or `<math>` element.
    pub fn remove_elements_in_foreign_content<F>(&mut self, mut remove: F)
    where
        F: FnMut(&str) -> bool,
    {
        let mut stack = vec![(self.root.clone(), false)];
        while let Some((node, foreign)) = stack.pop() {
            if foreign {
                node.children.borrow_mut().retain(|child| match &child.data {
                    NodeData::Element { name, .. } => !remove(&name.local),
                    _ => true,
                });
            }
            for child in node.children.borrow().iter() {
                let child_foreign = foreign
                    || matches!(
                        &child.data,
                        NodeData::Element { name, .. }
                            if matches!(&*name.ns, SVG_NAMESPACE | MATHML_NAMESPACE)
                    );
                stack.push((child.clone(), child_foreign));
            }
            if let Some(contents) = template_contents(&node) {
                stack.push((contents, foreign));
            }
        }
    }

    /// Visit every element with mutable access to its attribute list.
    pub fn for_each_element<F>(&mut self, mut visit: F)
    where
        F: FnMut(&str, &mut Vec<Attribute>),
    {
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if !Handle::ptr_eq(&node, &self.root) {
                if let NodeData::Element { name, attrs, .. } = &node.data {
                    visit(&name.local, &mut attrs.borrow_mut());
                }
            }
            stack.extend(node.children.borrow().iter().cloned());
            if let Some(contents) = template_contents(&node) {
                stack.push(contents);
            }
        }
    }

    /// Serialize the children of the fragment root.
    ///
    /// A text node that opens a `<pre>`, `<textarea>` or `<listing>` with a
    /// newline is written with one extra newline, since reparsing eats one.
    pub fn to_html(&self) -> Result<String, SanitizeError> {
        let padded = self.pad_leading_newlines();
        let result = self.serialize();
        for (node, original) in padded {
            if let NodeData::Text { contents } = &node.data {
                *contents.borrow_mut() = original;
            }
        }
        result
    }

    fn pad_leading_newlines(&self) -> Vec<(Handle, StrTendril)> {
        let mut padded = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if let NodeData::Element { name, .. } = &node.data {
                if &*name.ns == HTML_NAMESPACE && LEADING_NEWLINE_ELIDED.contains(&&*name.local) {
                    if let Some(first) = node.children.borrow().first() {
                        if let NodeData::Text { contents } = &first.data {
                            let mut text = contents.borrow_mut();
                            if text.starts_with('\n') {
                                let original = text.clone();
                                *text = StrTendril::from(format!("\n{}", &*original));
                                padded.push((first.clone(), original));
                            }
                        }
                    }
                }
            }
            stack.extend(node.children.borrow().iter().cloned());
            if let Some(contents) = template_contents(&node) {
                stack.push(contents);
            }
        }
        padded
    }

    fn serialize(&self) -> Result<String, SanitizeError> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.root.clone().into();
        serialize(
            &mut out,
            &handle,
            SerializeOpts {
                traversal_scope: TraversalScope::ChildrenOnly(None),
                ..Default::default()
            },
        )?;
        Ok(String::from_utf8(out)?)
    }
}

fn template_contents(node: &Handle) -> Option<Handle> {
    match &node.data {
        NodeData::Element {
            template_contents, ..
        } => template_contents.borrow().clone(),
        _ => None,
    }
}

/// Value of the attribute named `name` (ASCII case-insensitive).
pub fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| (*a.name.local).eq_ignore_ascii_case(name))
        .map(|a| &*a.value)
}

/// Overwrite the value of an existing attribute; returns false when absent.
pub fn set_attr(attrs: &mut [Attribute], name: &str, value: String) -> bool {
    match attrs
        .iter_mut()
        .find(|a| (*a.name.local).eq_ignore_ascii_case(name))
    {
        Some(a) => {
            a.value = StrTendril::from(value);
            true
        }
        None => false,
    }
}

pub fn attr_name(attr: &Attribute) -> &str {
    &attr.name.local
}
