//! An in-process DOM.
//!
//! [`MemoryHost`] implements just enough of the DOM's element semantics for the runtime to run headless:
//! element nodes with an ordered attribute list, a class list, an inline style declaration, text, plain properties,
//! a log of method calls, and event listeners that can be fired through [`MemoryHost::dispatch`].

use super::{ClassOp, Host, HostError, ListenerOptions, NativeCallback};
use crate::value::Value;
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

#[derive(Default)]
struct NodeData {
	tag: String,
	id: String,
	attributes: Vec<(String, String)>,
	classes: Vec<String>,
	style: Vec<(String, String)>,
	text: String,
	properties: HashMap<String, Value>,
	calls: Vec<(String, Vec<Value>)>,
	children: Vec<MemoryNode>,
	parent: Option<Weak<RefCell<NodeData>>>,
	listeners: Vec<MemoryListener>,
}

struct MemoryListener {
	id: u64,
	event_type: String,
	callback: NativeCallback<MemoryEvent>,
	options: ListenerOptions,
}

/// Handle to an element of a [`MemoryHost`]. Equality is identity.
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeData>>);

impl PartialEq for MemoryNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for MemoryNode {}

impl Debug for MemoryNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		write!(f, "<{}", data.tag)?;
		if !data.id.is_empty() {
			write!(f, " id={:?}", data.id)?;
		}
		write!(f, "> ({} children)", data.children.len())
	}
}

impl MemoryNode {
	fn new(tag: &str) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			tag: tag.to_ascii_lowercase(),
			..NodeData::default()
		})))
	}

	#[must_use]
	pub fn tag(&self) -> String {
		self.0.borrow().tag.clone()
	}

	#[must_use]
	pub fn id(&self) -> String {
		self.0.borrow().id.clone()
	}

	#[must_use]
	pub fn children(&self) -> Vec<MemoryNode> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn parent(&self) -> Option<MemoryNode> {
		self.0.borrow().parent.as_ref().and_then(Weak::upgrade).map(MemoryNode)
	}

	/// Whether `self` is `other` or one of its ancestors.
	#[must_use]
	pub fn contains(&self, other: &MemoryNode) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node == *self {
				return true;
			}
			current = node.parent();
		}
		false
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.0.borrow().attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
	}

	#[must_use]
	pub fn classes(&self) -> Vec<String> {
		self.0.borrow().classes.clone()
	}

	#[must_use]
	pub fn style(&self, name: &str) -> Option<String> {
		self.0.borrow().style.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
	}

	/// The inline style serialized as `name: value;` pairs.
	#[must_use]
	pub fn style_text(&self) -> String {
		self.0.borrow().style.iter().map(|(name, value)| format!("{}: {};", name, value)).collect::<Vec<_>>().join(" ")
	}

	/// Text content of this node and all descendants.
	#[must_use]
	pub fn text_content(&self) -> String {
		let data = self.0.borrow();
		let mut text = data.text.clone();
		for child in &data.children {
			text.push_str(&child.text_content());
		}
		text
	}

	#[must_use]
	pub fn property(&self, name: &str) -> Option<Value> {
		self.0.borrow().properties.get(name).cloned()
	}

	/// Every method call that was not mapped onto node state, in call order.
	#[must_use]
	pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
		self.0.borrow().calls.clone()
	}

	#[must_use]
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.0.borrow().listeners.iter().filter(|listener| listener.event_type == event_type).count()
	}

	fn set_attribute(&self, name: &str, value: &str) {
		let mut data = self.0.borrow_mut();
		match data.attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => *existing = value.to_owned(),
			None => data.attributes.push((name.to_owned(), value.to_owned())),
		}
	}

	fn set_style(&self, name: &str, value: &str) {
		let mut data = self.0.borrow_mut();
		if value.is_empty() {
			data.style.retain(|(n, _)| n != name);
			return;
		}
		match data.style.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => *existing = value.to_owned(),
			None => data.style.push((name.to_owned(), value.to_owned())),
		}
	}

	fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.0.borrow_mut().children.retain(|child| child != self);
		}
		self.0.borrow_mut().parent = None;
	}

	fn find_by_id(&self, id: &str) -> Option<MemoryNode> {
		if self.0.borrow().id == id {
			return Some(self.clone());
		}
		self.children().iter().find_map(|child| child.find_by_id(id))
	}
}

/// An event fired through [`MemoryHost::dispatch`].
#[derive(Debug, Clone)]
pub struct MemoryEvent {
	pub event_type: String,
	pub target: MemoryNode,
}

/// An in-process document with a `<head>` and a `<body>`.
pub struct MemoryHost {
	head: MemoryNode,
	body: MemoryNode,
	next_listener: Cell<u64>,
}

impl Debug for MemoryHost {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryHost").field("head", &self.head).field("body", &self.body).finish()
	}
}

impl Default for MemoryHost {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryHost {
	#[must_use]
	pub fn new() -> Self {
		Self {
			head: MemoryNode::new("head"),
			body: MemoryNode::new("body"),
			next_listener: Cell::new(0),
		}
	}

	#[must_use]
	pub fn head(&self) -> &MemoryNode {
		&self.head
	}

	#[must_use]
	pub fn body(&self) -> &MemoryNode {
		&self.body
	}

	/// Creates a `<div>` with DOM id `id` in the body, to serve as render target.
	pub fn mount_container(&self, id: &str) -> MemoryNode {
		let container = MemoryNode::new("div");
		container.0.borrow_mut().id = id.to_owned();
		container.0.borrow_mut().parent = Some(Rc::downgrade(&self.body.0));
		self.body.0.borrow_mut().children.push(container.clone());
		container
	}

	/// Fires `event_type` at `node`. Returns the number of listeners called.
	pub fn dispatch(&self, node: &MemoryNode, event_type: &str) -> usize {
		let callbacks: Vec<_> = {
			let mut data = node.0.borrow_mut();
			let callbacks: Vec<NativeCallback<MemoryEvent>> = data.listeners.iter().filter(|listener| listener.event_type == event_type).map(|listener| listener.callback.clone()).collect();
			data.listeners.retain(|listener| !(listener.event_type == event_type && listener.options.once));
			callbacks
		};
		trace!(event_type, listeners = callbacks.len(), "Dispatching.");

		let event = MemoryEvent {
			event_type: event_type.to_owned(),
			target: node.clone(),
		};
		for callback in &callbacks {
			callback(&event);
		}
		callbacks.len()
	}
}

fn split_style_text(css: &str) -> impl Iterator<Item = (&str, &str)> {
	css.split(';').filter_map(|declaration| {
		let (name, value) = declaration.split_once(':')?;
		let (name, value) = (name.trim(), value.trim());
		(!name.is_empty()).then(|| (name, value))
	})
}

fn validate_token(token: &str) -> Result<(), HostError> {
	if token.is_empty() || token.contains(char::is_whitespace) {
		Err(HostError::new(format!("SyntaxError: invalid class token {:?}", token)))
	} else {
		Ok(())
	}
}

impl Host for MemoryHost {
	type Node = MemoryNode;
	type Event = MemoryEvent;
	type Binding = u64;

	fn create_element(&self, tag: &str) -> Result<MemoryNode, HostError> {
		if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
			return Err(HostError::new(format!("InvalidCharacterError: invalid tag name {:?}", tag)));
		}
		Ok(MemoryNode::new(tag))
	}

	fn element_by_id(&self, id: &str) -> Option<MemoryNode> {
		self.body.find_by_id(id).or_else(|| self.head.find_by_id(id))
	}

	fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), HostError> {
		if child.contains(parent) {
			return Err(HostError::new("HierarchyRequestError: the new child is an ancestor of the parent"));
		}
		child.detach();
		child.0.borrow_mut().parent = Some(Rc::downgrade(&parent.0));
		parent.0.borrow_mut().children.push(child.clone());
		Ok(())
	}

	fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), HostError> {
		if child.parent().as_ref() != Some(parent) {
			return Err(HostError::new("NotFoundError: the node to be removed is not a child of this node"));
		}
		child.detach();
		Ok(())
	}

	fn parent_of(&self, node: &MemoryNode) -> Option<MemoryNode> {
		node.parent()
	}

	fn append_to_head(&self, node: &MemoryNode) -> Result<(), HostError> {
		self.append_child(&self.head, node)
	}

	fn set_id(&self, node: &MemoryNode, id: &str) {
		node.0.borrow_mut().id = id.to_owned();
	}

	fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> Result<(), HostError> {
		if name.is_empty() || name.contains(char::is_whitespace) {
			return Err(HostError::new(format!("InvalidCharacterError: invalid attribute name {:?}", name)));
		}
		match name {
			"id" => self.set_id(node, value),
			"class" => node.0.borrow_mut().classes = value.split_whitespace().map(str::to_owned).collect(),
			"style" => self.set_style_text(node, value),
			_ => node.set_attribute(name, value),
		}
		Ok(())
	}

	fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
		match name {
			"id" => Some(node.id()).filter(|id| !id.is_empty()),
			"class" => Some(node.classes().join(" ")).filter(|classes| !classes.is_empty()),
			"style" => Some(node.style_text()).filter(|style| !style.is_empty()),
			_ => node.attribute(name),
		}
	}

	fn remove_attribute(&self, node: &MemoryNode, name: &str) -> Result<(), HostError> {
		let mut data = node.0.borrow_mut();
		match name {
			"id" => data.id.clear(),
			"class" => data.classes.clear(),
			"style" => data.style.clear(),
			_ => data.attributes.retain(|(n, _)| n != name),
		}
		Ok(())
	}

	fn class_list(&self, node: &MemoryNode, op: ClassOp<'_>) -> Result<(), HostError> {
		let mut data = node.0.borrow_mut();
		let classes = &mut data.classes;
		match op {
			ClassOp::Add(token) => {
				validate_token(token)?;
				if !classes.iter().any(|class| class == token) {
					classes.push(token.to_owned());
				}
			}
			ClassOp::Remove(token) => {
				validate_token(token)?;
				classes.retain(|class| class != token);
			}
			ClassOp::Toggle(token) => {
				validate_token(token)?;
				let before = classes.len();
				classes.retain(|class| class != token);
				if classes.len() == before {
					classes.push(token.to_owned());
				}
			}
			ClassOp::Replace(old, new) => {
				validate_token(old)?;
				validate_token(new)?;
				if let Some(position) = classes.iter().position(|class| class == old) {
					if classes.iter().any(|class| class == new) {
						classes.remove(position);
					} else {
						classes[position] = new.to_owned();
					}
				}
			}
		}
		Ok(())
	}

	fn set_style_text(&self, node: &MemoryNode, css: &str) {
		node.0.borrow_mut().style.clear();
		for (name, value) in split_style_text(css) {
			node.set_style(name, value);
		}
	}

	fn set_style_property(&self, node: &MemoryNode, name: &str, value: &str) -> Result<(), HostError> {
		node.set_style(name, value);
		Ok(())
	}

	fn set_text(&self, node: &MemoryNode, text: &str) {
		for child in node.children() {
			child.detach();
		}
		node.0.borrow_mut().text = text.to_owned();
	}

	fn text(&self, node: &MemoryNode) -> String {
		node.text_content()
	}

	fn set_property(&self, node: &MemoryNode, name: &str, value: &Value) -> Result<(), HostError> {
		match (name, value) {
			("id", value) => self.set_id(node, &value.to_string()),
			("className", value) => self.set_attribute(node, "class", &value.to_string())?,
			("innerText" | "textContent", value) => self.set_text(node, &value.to_string()),
			("hidden", value) => {
				if value.is_truthy() {
					node.set_attribute("hidden", "");
				} else {
					self.remove_attribute(node, "hidden")?;
				}
			}
			(name, value) => {
				node.0.borrow_mut().properties.insert(name.to_owned(), value.clone());
			}
		}
		Ok(())
	}

	fn merge_property(&self, node: &MemoryNode, property: &str, key: &str, value: &Value) -> Result<(), HostError> {
		if property == "style" {
			node.set_style(key, &value.to_string());
			return Ok(());
		}
		let mut data = node.0.borrow_mut();
		let target = data.properties.entry(property.to_owned()).or_insert_with(|| Value::Map(Vec::new()));
		match target {
			Value::Map(entries) => {
				match entries.iter_mut().find(|(k, _)| k == key) {
					Some((_, existing)) => *existing = value.clone(),
					None => entries.push((key.to_owned(), value.clone())),
				}
				Ok(())
			}
			_ => Err(HostError::new(format!("TypeError: property {:?} is not an object", property))),
		}
	}

	fn call_method(&self, node: &MemoryNode, name: &str, args: &[Value]) -> Result<(), HostError> {
		match (name, args) {
			("click", _) => self.click(node),
			("setAttribute", [name, value, ..]) => self.set_attribute(node, &name.to_string(), &value.to_string())?,
			("removeAttribute", [name, ..]) => self.remove_attribute(node, &name.to_string())?,
			_ => node.0.borrow_mut().calls.push((name.to_owned(), args.to_vec())),
		}
		Ok(())
	}

	fn add_event_listener(&self, node: &MemoryNode, event_type: &str, callback: NativeCallback<MemoryEvent>, options: ListenerOptions) -> Result<u64, HostError> {
		let id = self.next_listener.get();
		self.next_listener.set(id + 1);
		node.0.borrow_mut().listeners.push(MemoryListener {
			id,
			event_type: event_type.to_owned(),
			callback,
			options,
		});
		Ok(id)
	}

	fn remove_event_listener(&self, node: &MemoryNode, event_type: &str, binding: &u64, _options: ListenerOptions) -> Result<(), HostError> {
		node.0.borrow_mut().listeners.retain(|listener| !(listener.id == *binding && listener.event_type == event_type));
		Ok(())
	}

	fn click(&self, node: &MemoryNode) {
		self.dispatch(node, "click");
	}
}
