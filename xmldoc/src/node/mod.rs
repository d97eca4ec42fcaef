//! Element tree.
//!
//! Elements are shared through [`ElementRef`] handles. The parent's child list
//! is the only owning edge; each child keeps a weak reference back to its
//! parent, used for upward traversal and detachment.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::rc::{Rc, Weak};

use crate::constants::{INDENT_WIDTH, UNKNOWN_TAG};
use crate::error::{Error, Result};

/// A reference-counted pointer to an element.
pub type ElementRef = Rc<RefCell<XmlElement>>;

/// Wraps an element in a new [`ElementRef`].
pub fn new_element_ref(element: XmlElement) -> ElementRef {
    Rc::new(RefCell::new(element))
}

/// One XML tag instance.
///
/// Each element has:
/// - a tag name
/// - attributes, iterated in name order
/// - accumulated character data (never null, empty by default)
/// - 0 or more children, in insertion order
/// - a parent (except for detached elements and roots)
#[derive(Debug)]
pub struct XmlElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<ElementRef>,
    parent: Weak<RefCell<XmlElement>>,
}

impl Default for XmlElement {
    fn default() -> Self {
        XmlElement {
            tag: UNKNOWN_TAG.to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: Weak::new(),
        }
    }
}

impl XmlElement {
    /// Creates a detached element with the given tag and no attributes.
    pub fn new(tag: impl Into<String>) -> ElementRef {
        new_element_ref(XmlElement {
            tag: tag.into(),
            ..XmlElement::default()
        })
    }

    /// Creates a detached element with a copy of the given attributes.
    pub fn with_attributes(
        tag: impl Into<String>,
        attributes: &BTreeMap<String, String>,
    ) -> ElementRef {
        new_element_ref(XmlElement {
            tag: tag.into(),
            attributes: attributes.clone(),
            ..XmlElement::default()
        })
    }

    /// Returns the tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Sets the tag name.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns true if the attribute is set.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Sets an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Removes an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Returns the attributes in name order.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Returns the accumulated character data.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Appends character data.
    pub fn append_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Replaces the character data.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[ElementRef] {
        &self.children
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the children with the given tag, in document order.
    pub fn elements<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ElementRef> + 'a {
        self.children
            .iter()
            .filter(move |child| child.borrow().tag == tag)
    }

    /// Returns the first child with the given tag.
    pub fn element(&self, tag: &str) -> Option<ElementRef> {
        self.elements(tag).next().cloned()
    }

    /// Returns the first child with the given tag whose `name` attribute
    /// equals `name`. Children without a `name` attribute never match.
    pub fn element_named(&self, tag: &str, name: &str) -> Option<ElementRef> {
        self.elements(tag)
            .find(|child| child.borrow().attribute("name") == Some(name))
            .cloned()
    }

    /// Returns the parent, if attached.
    pub fn parent(&self) -> Option<ElementRef> {
        self.parent.upgrade()
    }
}

/// Tree operations. These need the `ElementRef` wrapper so the child can
/// point back at its parent.
impl XmlElement {
    /// Appends `child` to `parent`'s children.
    ///
    /// A child that is already attached elsewhere is moved. Adding `parent`
    /// itself or one of its ancestors fails with [`Error::Cycle`].
    pub fn add_element(parent: &ElementRef, child: ElementRef) -> Result<()> {
        if Self::is_self_or_ancestor(&child, parent) {
            return Err(Error::Cycle {
                parent: parent.borrow().tag.clone(),
                child: child.borrow().tag.clone(),
            });
        }
        Self::detach(&child);
        child.borrow_mut().parent = Rc::downgrade(parent);
        parent.borrow_mut().children.push(child);
        Ok(())
    }

    /// Removes `child` from `parent` and clears its parent reference.
    ///
    /// Returns false, changing nothing, if `child` is not a child of `parent`.
    pub fn remove_element(parent: &ElementRef, child: &ElementRef) -> bool {
        let position = parent
            .borrow()
            .children
            .iter()
            .position(|c| Rc::ptr_eq(c, child));
        match position {
            Some(index) => {
                let removed = parent.borrow_mut().children.remove(index);
                removed.borrow_mut().parent = Weak::new();
                true
            }
            None => false,
        }
    }

    /// Moves `child` under `parent`, or detaches it when `parent` is `None`.
    pub fn set_parent(child: &ElementRef, parent: Option<&ElementRef>) -> Result<()> {
        match parent {
            Some(parent) => Self::add_element(parent, Rc::clone(child)),
            None => {
                Self::detach(child);
                Ok(())
            }
        }
    }

    /// Structural equality: tag, attributes, text and children in order.
    pub fn deep_eq(a: &ElementRef, b: &ElementRef) -> bool {
        let (a, b) = (a.borrow(), b.borrow());
        a.tag == b.tag
            && a.attributes == b.attributes
            && a.text == b.text
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(x, y)| Self::deep_eq(x, y))
    }

    fn detach(child: &ElementRef) {
        let old_parent = child.borrow().parent.upgrade();
        if let Some(old_parent) = old_parent {
            old_parent
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(c, child));
        }
        child.borrow_mut().parent = Weak::new();
    }

    fn is_self_or_ancestor(candidate: &ElementRef, node: &ElementRef) -> bool {
        let mut current = Some(Rc::clone(node));
        while let Some(element) = current {
            if Rc::ptr_eq(&element, candidate) {
                return true;
            }
            current = element.borrow().parent.upgrade();
        }
        false
    }
}

/// Serialization.
impl XmlElement {
    /// Writes this element and its subtree, one level of indentation per
    /// nesting depth, starting at `prefix`.
    pub fn write_xml<W: Write + ?Sized>(&self, out: &mut W, prefix: &str) -> io::Result<()> {
        self.write_xml_indented(out, prefix, &" ".repeat(INDENT_WIDTH))
    }

    /// Like [`write_xml`](Self::write_xml) with a custom indentation unit.
    pub fn write_xml_indented<W: Write + ?Sized>(
        &self,
        out: &mut W,
        prefix: &str,
        indent: &str,
    ) -> io::Result<()> {
        write!(out, "{}<{}", prefix, self.tag)?;
        for (name, value) in &self.attributes {
            write!(out, " {}=\"{}\"", name, to_entities(value, true))?;
        }

        if self.children.is_empty() {
            if self.text.is_empty() {
                return writeln!(out, "/>");
            }
            return writeln!(out, ">{}</{}>", to_entities(&self.text, false), self.tag);
        }

        writeln!(out, ">")?;
        let child_prefix = format!("{}{}", prefix, indent);
        for child in &self.children {
            child.borrow().write_xml_indented(out, &child_prefix, indent)?;
        }
        writeln!(out, "{}</{}>", prefix, self.tag)
    }

    /// Serializes the subtree to a string.
    pub fn to_xml_string(&self) -> String {
        let mut output = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_xml(&mut output, "");
        String::from_utf8_lossy(&output).into_owned()
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">")
    }
}

/// Converts markup characters to entities. Attribute values additionally
/// protect quotes and whitespace that attribute normalization would eat.
fn to_entities(s: &str, in_attribute: bool) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\r' => result.push_str("&#13;"),
            '"' if in_attribute => result.push_str("&quot;"),
            '\n' if in_attribute => result.push_str("&#10;"),
            '\t' if in_attribute => result.push_str("&#9;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tag_is_unknown() {
        let element = new_element_ref(XmlElement::default());
        assert_eq!(element.borrow().tag(), "UNKNOWN");
        assert_eq!(element.borrow().text(), "");
        assert!(element.borrow().parent().is_none());
    }

    #[test]
    fn test_with_attributes_copies_map() {
        let mut attrs = BTreeMap::new();
        attrs.insert("a".to_string(), "1".to_string());
        let element = XmlElement::with_attributes("e", &attrs);
        attrs.insert("b".to_string(), "2".to_string());

        assert_eq!(element.borrow().attributes().len(), 1);
        assert_eq!(element.borrow().attribute("a"), Some("1"));
    }

    #[test]
    fn test_add_then_remove_restores_children() {
        let parent = XmlElement::new("parent");
        let first = XmlElement::new("first");
        XmlElement::add_element(&parent, first.clone()).unwrap();

        let child = XmlElement::new("child");
        XmlElement::add_element(&parent, child.clone()).unwrap();
        assert_eq!(parent.borrow().child_count(), 2);
        assert!(Rc::ptr_eq(&child.borrow().parent().unwrap(), &parent));

        assert!(XmlElement::remove_element(&parent, &child));
        assert_eq!(parent.borrow().child_count(), 1);
        assert!(Rc::ptr_eq(&parent.borrow().children()[0], &first));
        assert!(child.borrow().parent().is_none());
    }

    #[test]
    fn test_remove_missing_child_is_noop() {
        let parent = XmlElement::new("parent");
        let stranger = XmlElement::new("stranger");
        XmlElement::add_element(&parent, XmlElement::new("kept")).unwrap();

        assert!(!XmlElement::remove_element(&parent, &stranger));
        assert_eq!(parent.borrow().child_count(), 1);
    }

    #[test]
    fn test_add_moves_between_parents() {
        let a = XmlElement::new("a");
        let b = XmlElement::new("b");
        let child = XmlElement::new("child");

        XmlElement::add_element(&a, child.clone()).unwrap();
        XmlElement::add_element(&b, child.clone()).unwrap();

        assert_eq!(a.borrow().child_count(), 0);
        assert_eq!(b.borrow().child_count(), 1);
        assert!(Rc::ptr_eq(&child.borrow().parent().unwrap(), &b));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let a = XmlElement::new("a");
        let b = XmlElement::new("b");
        let c = XmlElement::new("c");
        XmlElement::add_element(&a, b.clone()).unwrap();
        XmlElement::add_element(&b, c.clone()).unwrap();

        assert!(matches!(
            XmlElement::add_element(&c, a.clone()),
            Err(Error::Cycle { .. })
        ));
        assert!(matches!(
            XmlElement::add_element(&a, a.clone()),
            Err(Error::Cycle { .. })
        ));
        // The failed attempts left the tree alone.
        assert_eq!(a.borrow().child_count(), 1);
        assert_eq!(c.borrow().child_count(), 0);
    }

    #[test]
    fn test_set_parent() {
        let parent = XmlElement::new("parent");
        let child = XmlElement::new("child");

        XmlElement::set_parent(&child, Some(&parent)).unwrap();
        assert_eq!(parent.borrow().child_count(), 1);

        XmlElement::set_parent(&child, None).unwrap();
        assert_eq!(parent.borrow().child_count(), 0);
        assert!(child.borrow().parent().is_none());
    }

    #[test]
    fn test_element_lookup() {
        let root = XmlElement::new("root");
        let anonymous = XmlElement::new("port");
        let named = XmlElement::new("port");
        named.borrow_mut().set_attribute("name", "out");
        XmlElement::add_element(&root, XmlElement::new("other")).unwrap();
        XmlElement::add_element(&root, anonymous.clone()).unwrap();
        XmlElement::add_element(&root, named.clone()).unwrap();

        let root = root.borrow();
        assert_eq!(root.elements("port").count(), 2);
        assert!(Rc::ptr_eq(&root.element("port").unwrap(), &anonymous));
        assert!(Rc::ptr_eq(&root.element_named("port", "out").unwrap(), &named));
        assert!(root.element_named("port", "in").is_none());
        assert!(root.element("missing").is_none());
    }

    #[test]
    fn test_write_empty_element() {
        let element = XmlElement::new("foo");
        let mut out = Vec::new();
        element.borrow().write_xml(&mut out, "").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<foo/>\n");
    }

    #[test]
    fn test_write_nested() {
        let root = XmlElement::new("root");
        root.borrow_mut().set_attribute("b", "2");
        root.borrow_mut().set_attribute("a", "1");
        let child = XmlElement::new("child");
        child.borrow_mut().append_text("hello");
        XmlElement::add_element(&root, child).unwrap();
        let leaf = XmlElement::new("leaf");
        XmlElement::add_element(&root, leaf).unwrap();

        assert_eq!(
            root.borrow().to_xml_string(),
            "<root a=\"1\" b=\"2\">\n    <child>hello</child>\n    <leaf/>\n</root>\n"
        );
    }

    #[test]
    fn test_write_escapes_markup() {
        let element = XmlElement::new("e");
        element.borrow_mut().set_attribute("q", "say \"hi\" & <go>");
        element.borrow_mut().set_text("a < b && c");

        assert_eq!(
            element.borrow().to_xml_string(),
            "<e q=\"say &quot;hi&quot; &amp; &lt;go&gt;\">a &lt; b &amp;&amp; c</e>\n"
        );
    }

    #[test]
    fn test_deep_eq() {
        let a = XmlElement::new("a");
        XmlElement::add_element(&a, XmlElement::new("b")).unwrap();
        let b = XmlElement::new("a");
        XmlElement::add_element(&b, XmlElement::new("b")).unwrap();
        assert!(XmlElement::deep_eq(&a, &b));

        b.borrow().children()[0].borrow_mut().append_text("x");
        assert!(!XmlElement::deep_eq(&a, &b));
    }
}
