use std::collections::HashMap;

use crate::html::{parse_into, serialize_children, serialize_node};
use crate::selector::{SelectorCombinator, SelectorPart, SelectorStep, parse_selector_groups};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) disabled: bool,
    pub(crate) layout: LayoutBox,
}

impl Element {
    fn new(tag_name: String, attrs: HashMap<String, String>) -> Self {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let disabled = attrs.contains_key("disabled");
        Self {
            tag_name,
            attrs,
            value,
            disabled,
            layout: LayoutBox::default(),
        }
    }
}

/// Scroll and client widths reported by the host's layout engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutBox {
    pub scroll_width: u32,
    pub client_width: u32,
}

impl LayoutBox {
    pub fn new(scroll_width: u32, client_width: u32) -> Self {
        Self {
            scroll_width,
            client_width,
        }
    }

    pub fn overflows(&self) -> bool {
        self.scroll_width > self.client_width
    }
}

#[derive(Debug, Clone)]
pub struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) active_element: Option<NodeId>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            active_element: None,
        }
    }

    pub fn parse(html: &str) -> Result<Self> {
        let mut dom = Self::new();
        let root = dom.root;
        parse_into(&mut dom, root, html)?;
        dom.initialize_form_control_values(root);
        Ok(dom)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_in_subtree(self.root)
            .into_iter()
            .find(|node| self.tag_name(*node) == Some("body"))
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element_in(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        self.create_node(Some(parent), NodeType::Element(Element::new(tag_name, attrs)))
    }

    pub(crate) fn create_text_in(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    /// Creates a detached element; attach it with [`Dom::append_child`].
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        let element = Element::new(tag_name.to_ascii_lowercase(), HashMap::new());
        self.create_node(None, NodeType::Element(element))
    }

    fn node(&self, node_id: NodeId) -> Result<&Node> {
        self.nodes
            .get(node_id.0)
            .ok_or_else(|| Error::Runtime(format!("unknown node: {}", node_id.0)))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_or_err(&self, node_id: NodeId, operation: &str) -> Result<&Element> {
        self.element(node_id)
            .ok_or_else(|| Error::Runtime(format!("{operation} target is not an element")))
    }

    fn element_mut_or_err(&mut self, node_id: NodeId, operation: &str) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::Runtime(format!("{operation} target is not an element")))
    }

    pub fn is_element(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some()
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    fn parent_element(&self, node_id: NodeId) -> Option<NodeId> {
        self.parent(node_id).filter(|parent| self.is_element(*parent))
    }

    fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let siblings = &self.nodes[parent.0].children;
        let index = siblings.iter().position(|id| *id == node_id)?;
        siblings[..index]
            .iter()
            .rev()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// True when the node is reachable from the document root.
    pub fn is_connected(&self, node_id: NodeId) -> bool {
        node_id == self.root || self.is_descendant_of(node_id, self.root)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if matches!(self.nodes[parent.0].node_type, NodeType::Text(_)) {
            return Err(Error::Runtime("cannot append to a text node".into()));
        }
        if child == parent || self.is_descendant_of(parent, child) {
            return Err(Error::Runtime("cannot append a node into itself".into()));
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Removes the node from its parent. Returns false when it was already detached.
    pub fn detach(&mut self, node_id: NodeId) -> bool {
        let Some(parent) = self.parent(node_id) else {
            return false;
        };
        self.nodes[parent.0].children.retain(|id| *id != node_id);
        self.nodes[node_id.0].parent = None;
        if let Some(active) = self.active_element {
            if active == node_id || self.is_descendant_of(active, node_id) {
                self.active_element = None;
            }
        }
        true
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name))
            .map(String::as_str)
    }

    pub fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| element.attrs.contains_key(name))
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "setAttribute")?;
        let name = name.to_ascii_lowercase();
        if name == "disabled" {
            element.disabled = true;
        }
        element.attrs.insert(name, value.to_string());
        Ok(())
    }

    pub fn has_class(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| has_class(element, class_name))
    }

    pub fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "classList")?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        if !classes.iter().any(|name| name == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
        Ok(())
    }

    pub fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "classList")?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        classes.retain(|name| name != class_name);
        set_class_attr(element, &classes);
        Ok(())
    }

    pub fn style(&self, node_id: NodeId, property: &str) -> Option<String> {
        let decls = parse_style_declarations(self.attr(node_id, "style"));
        decls
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    /// Sets one inline style property; an empty value removes it.
    pub fn set_style(&mut self, node_id: NodeId, property: &str, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "style")?;
        let property = property.trim().to_ascii_lowercase();
        let mut decls = parse_style_declarations(element.attrs.get("style").map(String::as_str));
        let value = value.trim();
        if value.is_empty() {
            decls.retain(|(name, _)| *name != property);
        } else if let Some(pos) = decls.iter().position(|(name, _)| *name == property) {
            decls[pos].1 = value.to_string();
        } else {
            decls.push((property, value.to_string()));
        }
        if decls.is_empty() {
            element.attrs.remove("style");
        } else {
            element
                .attrs
                .insert("style".to_string(), serialize_style_declarations(&decls));
        }
        Ok(())
    }

    pub fn text_content(&self, node_id: NodeId) -> String {
        let Some(node) = self.nodes.get(node_id.0) else {
            return String::new();
        };
        match &node.node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &node.children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    fn clear_children(&mut self, node_id: NodeId) {
        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }
    }

    pub fn inner_html(&self, node_id: NodeId) -> Result<String> {
        self.element_or_err(node_id, "innerHTML")?;
        let mut out = String::new();
        serialize_children(self, node_id, &mut out);
        Ok(out)
    }

    pub fn outer_html(&self, node_id: NodeId) -> Result<String> {
        self.element_or_err(node_id, "outerHTML")?;
        let mut out = String::new();
        serialize_node(self, node_id, &mut out);
        Ok(out)
    }

    pub fn set_inner_html(&mut self, node_id: NodeId, html: &str) -> Result<()> {
        self.element_or_err(node_id, "innerHTML")?;
        self.clear_children(node_id);
        parse_into(self, node_id, html)?;
        self.initialize_form_control_values(node_id);
        Ok(())
    }

    /// Current value of a form control, or an empty string for other nodes.
    pub fn value(&self, node_id: NodeId) -> &str {
        self.element(node_id)
            .map(|element| element.value.as_str())
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "value")?;
        element.value = value.to_string();
        Ok(())
    }

    pub fn is_disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some_and(|element| element.disabled)
    }

    pub fn set_disabled(&mut self, node_id: NodeId, disabled: bool) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "disabled")?;
        element.disabled = disabled;
        if disabled {
            element
                .attrs
                .insert("disabled".to_string(), String::new());
        } else {
            element.attrs.remove("disabled");
        }
        Ok(())
    }

    pub fn layout(&self, node_id: NodeId) -> LayoutBox {
        self.element(node_id)
            .map(|element| element.layout)
            .unwrap_or_default()
    }

    pub fn set_layout(&mut self, node_id: NodeId, layout: LayoutBox) -> Result<()> {
        self.element_mut_or_err(node_id, "layout")?.layout = layout;
        Ok(())
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    pub(crate) fn set_active_element(&mut self, node: Option<NodeId>) {
        self.active_element = node;
    }

    pub(crate) fn elements_in_subtree(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.is_element(scope) {
            out.push(scope);
        }
        self.collect_elements_descendants_dfs(scope, &mut out);
        out
    }

    fn collect_elements_descendants_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(node_id) {
            if self.is_element(*child) {
                out.push(*child);
            }
            self.collect_elements_descendants_dfs(*child, out);
        }
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.query_selector_all_within(self.root, selector)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Descendants of `scope` matching `selector`, in document order.
    pub fn query_selector_all_within(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut candidates = Vec::new();
        self.collect_elements_descendants_dfs(scope, &mut candidates);
        Ok(candidates
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|chain| self.matches_selector_chain(*candidate, chain))
            })
            .collect())
    }

    pub fn query_selector_within(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self
            .query_selector_all_within(scope, selector)?
            .into_iter()
            .next())
    }

    /// Like [`Dom::query_selector_all_within`] but `scope` itself may match.
    pub fn select_in_subtree(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        Ok(self
            .elements_in_subtree(scope)
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|chain| self.matches_selector_chain(*candidate, chain))
            })
            .collect())
    }

    pub fn matches(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        let groups = parse_selector_groups(selector)?;
        Ok(groups
            .iter()
            .any(|chain| self.matches_selector_chain(node_id, chain)))
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if groups
                .iter()
                .any(|chain| self.matches_selector_chain(current, chain))
            {
                return Ok(Some(current));
            }
            cursor = self.parent_element(current);
        }
        Ok(None)
    }

    pub(crate) fn matches_selector_chain(&self, node_id: NodeId, chain: &[SelectorPart]) -> bool {
        let Some((last, rest)) = chain.split_last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }

        match last.combinator.unwrap_or(SelectorCombinator::Descendant) {
            SelectorCombinator::Child => self
                .parent_element(node_id)
                .is_some_and(|parent| self.matches_selector_chain(parent, rest)),
            SelectorCombinator::Descendant => {
                let mut cursor = self.parent_element(node_id);
                while let Some(ancestor) = cursor {
                    if self.matches_selector_chain(ancestor, rest) {
                        return true;
                    }
                    cursor = self.parent_element(ancestor);
                }
                false
            }
            SelectorCombinator::AdjacentSibling => self
                .previous_element_sibling(node_id)
                .is_some_and(|sibling| self.matches_selector_chain(sibling, rest)),
            SelectorCombinator::GeneralSibling => {
                let mut cursor = self.previous_element_sibling(node_id);
                while let Some(sibling) = cursor {
                    if self.matches_selector_chain(sibling, rest) {
                        return true;
                    }
                    cursor = self.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    pub(crate) fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };

        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &step.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }

        if step
            .classes
            .iter()
            .any(|class_name| !has_class(element, class_name))
        {
            return false;
        }

        step.attrs.iter().all(|cond| cond.matches(&element.attrs))
    }

    fn initialize_form_control_values(&mut self, scope: NodeId) {
        for node in self.elements_in_subtree(scope) {
            let Some(tag) = self.tag_name(node).map(str::to_owned) else {
                continue;
            };
            let value = match tag.as_str() {
                "textarea" => Some(self.text_content(node)),
                "select" => Some(self.initial_select_value(node)),
                "input" => {
                    let kind = self.attr(node, "type").unwrap_or("text");
                    let checkable =
                        kind.eq_ignore_ascii_case("checkbox") || kind.eq_ignore_ascii_case("radio");
                    (checkable && !self.has_attr(node, "value")).then(|| "on".to_string())
                }
                _ => None,
            };
            if let (Some(value), Some(element)) = (value, self.element_mut(node)) {
                element.value = value;
            }
        }
    }

    fn initial_select_value(&self, select: NodeId) -> String {
        let options = self
            .elements_in_subtree(select)
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some("option"))
            .collect::<Vec<_>>();
        let chosen = options
            .iter()
            .copied()
            .find(|option| self.has_attr(*option, "selected"))
            .or_else(|| options.first().copied());
        chosen
            .map(|option| self.option_value(option))
            .unwrap_or_default()
    }

    fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(value) => value.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }

    /// Values a `<select>` may take, one per option.
    pub fn option_values(&self, select: NodeId) -> Vec<String> {
        self.elements_in_subtree(select)
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some("option"))
            .map(|option| self.option_value(option))
            .collect()
    }

    /// Short description of a node for diagnostics.
    pub fn node_label(&self, node_id: NodeId) -> String {
        if let Some(id) = self.attr(node_id, "id") {
            if !id.is_empty() {
                return format!("#{id}");
            }
        }
        match self.nodes.get(node_id.0).map(|node| &node.node_type) {
            Some(NodeType::Document) => "document".to_string(),
            Some(NodeType::Element(element)) => element.tag_name.clone(),
            _ => format!("node-{}", node_id.0),
        }
    }
}

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
}

fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| value.split_whitespace().map(ToOwned::to_owned).collect())
        .unwrap_or_default()
}

fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".to_string(), classes.join(" "));
    }
}

fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    let mut start = 0usize;
    let mut paren_depth = 0usize;
    let mut quote: Option<u8> = None;
    let bytes = style_attr.as_bytes();
    for (i, ch) in bytes.iter().copied().enumerate() {
        match (quote, ch) {
            (Some(q), _) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'' | b'"') => quote = Some(ch),
            (None, b'(') => paren_depth += 1,
            (None, b')') => paren_depth = paren_depth.saturating_sub(1),
            (None, b';') if paren_depth == 0 => {
                push_style_declaration(&style_attr[start..i], &mut out);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_style_declaration(&style_attr[start..], &mut out);
    out
}

fn push_style_declaration(raw_decl: &str, out: &mut Vec<(String, String)>) {
    let Some((name, value)) = raw_decl.split_once(':') else {
        return;
    };
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return;
    }
    let value = value.trim().to_string();
    if let Some(pos) = out.iter().position(|(existing, _)| *existing == name) {
        out[pos].1 = value;
    } else {
        out.push((name, value));
    }
}

fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}
