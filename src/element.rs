use crate::document::{Attribute, Document, Node};
use crate::error::{Error, Result};
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct ElementData {
    name: String,
    parent: Option<Element>,
    children: Vec<Node>,
    alive: bool,
}

/// Represents an Xml Element.
///
/// This struct only contains a unique usize id and implements trait `Copy`.
/// So you do not need to bother with having a reference.
///
/// Because the actual data of the element is stored in [`Document`],
/// most methods takes `&Document` or `&mut Document` as its first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    id: usize,
}

impl Element {
    /// Create a new empty element with name. It has no parent until pushed
    /// into another element with [`Element::push_child`].
    pub fn new<S: Into<String>>(document: &mut Document, name: S) -> Element {
        Self::with_attributes(document, name.into(), Vec::new())
    }

    pub(crate) fn with_attributes(
        document: &mut Document,
        name: String,
        attributes: Vec<Attribute>,
    ) -> Element {
        let elem = Element {
            id: document.store.len(),
        };
        let elem_data = ElementData {
            name,
            parent: None,
            children: attributes.into_iter().map(Node::Attribute).collect(),
            alive: true,
        };
        document.store.push(elem_data);
        elem
    }

    pub fn is_root(&self, document: &Document) -> bool {
        document.root == Some(*self)
    }

    /// `false` once the element was deleted with [`Element::delete`].
    pub fn is_alive(&self, document: &Document) -> bool {
        self.data(document).alive
    }

    pub fn separate_prefix_name(full_name: &str) -> (&str, &str) {
        match full_name.split_once(':') {
            Some((prefix, name)) => (prefix, name),
            None => ("", full_name),
        }
    }
}

impl Element {
    fn data<'a>(&self, document: &'a Document) -> &'a ElementData {
        &document.store[self.id]
    }

    fn mut_data<'a>(&self, document: &'a mut Document) -> &'a mut ElementData {
        &mut document.store[self.id]
    }

    /// Get raw name of element, including its namespace prefix.
    pub fn name<'a>(&self, document: &'a Document) -> &'a str {
        &self.data(document).name
    }

    /// Renames the element in place.
    pub fn set_name<S: Into<String>>(&self, document: &mut Document, name: S) {
        self.mut_data(document).name = name.into();
    }

    /// Get prefix and name of element.
    ///
    /// `<prefix:name` -> `("prefix", "name")`
    pub fn prefix_name<'a>(&self, document: &'a Document) -> (&'a str, &'a str) {
        Self::separate_prefix_name(self.name(document))
    }

    /// Get namespace prefix of element, without name.
    ///
    /// `<prefix:name>` -> `"prefix"`.
    pub fn prefix<'a>(&self, document: &'a Document) -> &'a str {
        self.prefix_name(document).0
    }

    pub fn local_name<'a>(&self, document: &'a Document) -> &'a str {
        self.prefix_name(document).1
    }

    /// Gets the namespace of this element.
    ///
    /// Shorthand for `self.namespace_for_prefix(document, self.prefix(document))`.
    pub fn namespace<'a>(&self, document: &'a Document) -> Option<&'a str> {
        self.namespace_for_prefix(document, self.prefix(document))
    }

    /// Get namespace value given prefix, looking at `xmlns` attributes of
    /// this element and then its ancestors. `""` is the default namespace.
    pub fn namespace_for_prefix<'a>(
        &self,
        document: &'a Document,
        prefix: &str,
    ) -> Option<&'a str> {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        let mut elem = *self;
        loop {
            if let Some(value) = elem.attribute(document, &key) {
                return Some(value);
            }
            elem = elem.parent(document)?;
        }
    }

    pub fn parent(&self, document: &Document) -> Option<Element> {
        self.data(document).parent
    }

    /// ```ignore
    /// self.parent(document).is_some()
    /// ```
    pub fn has_parent(&self, document: &Document) -> bool {
        self.parent(document).is_some()
    }

    /// All child nodes, attributes and text included, in document order.
    pub fn nodes<'a>(&self, document: &'a Document) -> &'a [Node] {
        &self.data(document).children
    }

    /// ```ignore
    /// !self.nodes(document).is_empty()
    /// ```
    pub fn has_children(&self, document: &Document) -> bool {
        !self.nodes(document).is_empty()
    }

    /// Child elements only, in document order.
    pub fn child_elements(&self, document: &Document) -> Vec<Element> {
        self.nodes(document)
            .iter()
            .filter_map(|node| node.as_element())
            .collect()
    }

    /// Every descendant element, depth first.
    pub fn child_elements_recursive(&self, document: &Document) -> Vec<Element> {
        let mut elems = Vec::new();
        let mut stack: Vec<Element> = self.child_elements(document).into_iter().rev().collect();
        while let Some(elem) = stack.pop() {
            elems.push(elem);
            stack.extend(elem.child_elements(document).into_iter().rev());
        }
        elems
    }

    /// First child element with this name.
    pub fn find(&self, document: &Document, name: &str) -> Option<Element> {
        self.nodes(document)
            .iter()
            .filter_map(|node| node.as_element())
            .find(|elem| elem.name(document) == name)
    }

    /// Every child element with this name.
    pub fn find_all(&self, document: &Document, name: &str) -> Vec<Element> {
        self.nodes(document)
            .iter()
            .filter_map(|node| node.as_element())
            .filter(|elem| elem.name(document) == name)
            .collect()
    }

    /// Concatenation of the direct text children.
    pub fn text(&self, document: &Document) -> String {
        self.nodes(document)
            .iter()
            .filter_map(|node| node.as_text())
            .collect()
    }

    pub(crate) fn build_text_content(&self, document: &Document, buf: &mut String) {
        let mut stack = vec![self.nodes(document).iter()];
        while let Some(nodes) = stack.last_mut() {
            match nodes.next() {
                Some(Node::Text(text)) => buf.push_str(text),
                Some(Node::Element(elem)) => stack.push(elem.nodes(document).iter()),
                Some(Node::Attribute(_)) => {}
                None => {
                    stack.pop();
                }
            }
        }
    }

    /// Text of this element and all of its descendants, in document order.
    pub fn text_content(&self, document: &Document) -> String {
        let mut buf = String::new();
        self.build_text_content(document, &mut buf);
        buf
    }

    /// Removes every text child and appends a single new one.
    pub fn set_text<S: Into<String>>(&self, document: &mut Document, text: S) {
        let children = &mut self.mut_data(document).children;
        children.retain(|node| !matches!(node, Node::Text(_)));
        children.push(Node::Text(text.into()));
    }

    /// Value of the attribute `key`. With duplicate keys, the last one wins.
    pub fn attribute<'a>(&self, document: &'a Document, key: &str) -> Option<&'a str> {
        self.nodes(document)
            .iter()
            .rev()
            .filter_map(|node| node.as_attribute())
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attribute(&self, document: &Document, key: &str) -> bool {
        self.attribute(document, key).is_some()
    }

    /// Copies every attribute into `map`. Later duplicates overwrite earlier ones.
    pub fn collect_attributes(&self, document: &Document, map: &mut HashMap<String, String>) {
        for attr in self.nodes(document).iter().filter_map(|node| node.as_attribute()) {
            map.insert(attr.key.clone(), attr.value.clone());
        }
    }

    /// Attributes as a map. See [`Element::collect_attributes`].
    pub fn attributes(&self, document: &Document) -> HashMap<String, String> {
        let mut map = HashMap::new();
        self.collect_attributes(document, &mut map);
        map
    }

    /// Appends an attribute. An existing attribute with the same key is kept.
    pub fn add_attribute<K, V>(&self, document: &mut Document, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.mut_data(document)
            .children
            .push(Node::Attribute(Attribute::new(key, value)));
    }

    /// Removes every attribute with this key.
    pub fn delete_attribute(&self, document: &mut Document, key: &str) {
        self.mut_data(document)
            .children
            .retain(|node| !matches!(node, Node::Attribute(attr) if attr.key == key));
    }

    /// Sets the value of every attribute with this key. Does nothing if there is none.
    pub fn update_attribute<V: Into<String>>(&self, document: &mut Document, key: &str, value: V) {
        let value = value.into();
        for node in self.mut_data(document).children.iter_mut() {
            if let Node::Attribute(attr) = node {
                if attr.key == key {
                    attr.value = value.clone();
                }
            }
        }
    }

    /// Appends a new empty child element and returns it.
    pub fn add_child<S: Into<String>>(&self, document: &mut Document, name: S) -> Element {
        let elem = Element::new(document, name);
        self.append_new(document, Node::Element(elem));
        elem
    }

    /// Equivalent to `vec.push()`.
    ///
    /// # Errors
    ///
    /// - [`Error::Deleted`]: Either element was deleted.
    /// - [`Error::RootCannotMove`]: The root element can't be a child.
    /// - [`Error::HasAParent`]: If node is an element, it must not have a parent.
    /// Call `elem.detatch()` before.
    /// - [`Error::IsAnAncestor`]: The element is `self` or one of its ancestors.
    pub fn push_child(&self, document: &mut Document, node: Node) -> Result<()> {
        self.adopt(document, &node)?;
        self.mut_data(document).children.push(node);
        Ok(())
    }

    /// Equivalent to `vec.insert()`.
    ///
    /// # Errors
    ///
    /// - [`Error::Deleted`]: Either element was deleted.
    /// - [`Error::RootCannotMove`]: The root element can't be a child.
    /// - [`Error::HasAParent`]: If node is an element, it must not have a parent.
    /// Call `elem.detatch()` before.
    /// - [`Error::IsAnAncestor`]: The element is `self` or one of its ancestors.
    ///
    /// # Panics
    ///
    /// Panics if `index > self.nodes(document).len()`.
    pub fn insert_child(&self, document: &mut Document, index: usize, node: Node) -> Result<()> {
        self.adopt(document, &node)?;
        self.mut_data(document).children.insert(index, node);
        Ok(())
    }

    /// Appends a node created for this parent. A new element can't be one of
    /// its ancestors, so no checks are needed.
    pub(crate) fn append_new(&self, document: &mut Document, node: Node) {
        if let Node::Element(elem) = &node {
            elem.mut_data(document).parent = Some(*self);
        }
        self.mut_data(document).children.push(node);
    }

    fn adopt(&self, document: &mut Document, node: &Node) -> Result<()> {
        if !self.is_alive(document) {
            return Err(Error::Deleted);
        }
        if let Node::Element(elem) = node {
            if elem.is_root(document) {
                return Err(Error::RootCannotMove);
            }
            if !elem.is_alive(document) {
                return Err(Error::Deleted);
            }
            if elem.has_parent(document) {
                return Err(Error::HasAParent);
            }
            let mut ancestor = Some(*self);
            while let Some(current) = ancestor {
                if current == *elem {
                    return Err(Error::IsAnAncestor);
                }
                ancestor = current.parent(document);
            }
            elem.mut_data(document).parent = Some(*self);
        }
        Ok(())
    }

    /// Equivalent to `vec.remove()`. A removed element is detached, not deleted.
    ///
    /// # Panics
    ///
    /// Panics if index is out of bounds.
    pub fn remove_child(&self, document: &mut Document, index: usize) -> Node {
        let node = self.mut_data(document).children.remove(index);
        if let Node::Element(elem) = node {
            elem.mut_data(document).parent = None;
        }
        node
    }

    /// Remove child element by value.
    ///
    /// # Errors
    ///
    /// - [Error::NotFound]: Element was not found among its children.
    pub fn remove_child_elem(&self, document: &mut Document, element: Element) -> Result<()> {
        let children = &mut self.mut_data(document).children;
        let pos = children
            .iter()
            .position(|node| node.as_element() == Some(element))
            .ok_or(Error::NotFound)?;
        children.remove(pos);
        element.mut_data(document).parent = None;
        Ok(())
    }

    /// Takes the element out of its parent, keeping its subtree so it can be
    /// pushed somewhere else.
    pub fn detatch(&self, document: &mut Document) -> Result<()> {
        if self.is_root(document) {
            return Err(Error::RootCannotMove);
        }
        let parent = self.data(document).parent;
        if let Some(parent) = parent {
            parent.remove_child_elem(document, *self)
        } else {
            Ok(())
        }
    }

    /// Detaches the element and releases it and its whole subtree.
    ///
    /// # Errors
    ///
    /// - [`Error::RootCannotMove`]: The root element has no parent to be removed from.
    pub fn delete(&self, document: &mut Document) -> Result<()> {
        self.detatch(document)?;
        self.release(document);
        Ok(())
    }

    fn release(&self, document: &mut Document) {
        let mut stack = vec![*self];
        while let Some(elem) = stack.pop() {
            let data = elem.mut_data(document);
            let children = std::mem::take(&mut data.children);
            data.name = String::new();
            data.alive = false;
            stack.extend(children.iter().filter_map(|node| node.as_element()));
        }
    }
}
