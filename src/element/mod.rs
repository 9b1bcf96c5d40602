//! The element wrapper: one native node, its children, and its render/destroy lifecycle.
//!
//! A [`Wrapper`] owns its children through an ordered list and a key → child map, and points back at its parent
//! through a weak reference. Its native node is appended into the parent's node on the parent's first
//! [`render`](`Wrapper::render`), or immediately on [`add`](`Wrapper::add`) if the parent is already rendered.
//!
//! Destruction is deferred by [`ticks::DESTROY_GRACE`]: the wrapper stays addressable in between, and every deferred
//! step re-checks its phase before touching anything.

use crate::{
	app::AppInner,
	error::{not_unique, report, Error, ErrorKind, Template},
	hooks::{call_hook, HookName},
	host::{Host, ListenerOptions},
	scheduler::{ticks, Task},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, error, instrument, trace, warn};

mod dom;

pub use dom::StyleSheet;

/// Lifecycle points at which [`once`](`Wrapper::once`) listeners fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
	/// A child is being added. Fires [`ticks::ADD_LISTENER`] after [`Wrapper::add`] with the child as second argument.
	Add,
	/// The first render completed.
	Render,
	/// The destroy grace window elapsed and teardown begins.
	Destroy,
}

/// Lifecycle listener: the wrapper, and the child for [`Lifecycle::Add`].
pub type LifecycleListener<H> = Rc<dyn Fn(&Wrapper<H>, Option<&Wrapper<H>>)>;

/// Event listener, called with the wrapper it is bound to.
pub type Listener<H> = Rc<dyn Fn(&Wrapper<H>, &<H as Host>::Event)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
	pub visible: bool,
	pub rendered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Alive,
	/// `destroy()` was called; teardown is pending.
	Destroying,
	Destroyed,
}

/// A wrapper or the index name of one.
pub enum Target<H: Host> {
	Element(Wrapper<H>),
	Name(String),
}

impl<H: Host> Clone for Target<H> {
	fn clone(&self) -> Self {
		match self {
			Target::Element(element) => Target::Element(element.clone()),
			Target::Name(name) => Target::Name(name.clone()),
		}
	}
}

impl<H: Host> Debug for Target<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Target::Element(element) => f.debug_tuple("Element").field(&element.key()).finish(),
			Target::Name(name) => f.debug_tuple("Name").field(name).finish(),
		}
	}
}

impl<H: Host> From<Wrapper<H>> for Target<H> {
	fn from(element: Wrapper<H>) -> Self {
		Target::Element(element)
	}
}

impl<H: Host> From<&Wrapper<H>> for Target<H> {
	fn from(element: &Wrapper<H>) -> Self {
		Target::Element(element.clone())
	}
}

impl<H: Host> From<&str> for Target<H> {
	fn from(name: &str) -> Self {
		Target::Name(name.to_owned())
	}
}

impl<H: Host> From<String> for Target<H> {
	fn from(name: String) -> Self {
		Target::Name(name)
	}
}

pub(crate) struct Binding<H: Host> {
	handle: H::Binding,
	options: ListenerOptions,
}

struct Tree<H: Host> {
	content: Vec<Wrapper<H>>,
	content_map: HashMap<Rc<str>, Wrapper<H>>,
	parent: Option<WeakWrapper<H>>,
}

pub(crate) struct Inner<H: Host> {
	key: Rc<str>,
	node: H::Node,
	host: Rc<H>,
	app: Weak<AppInner<H>>,
	tree: RefCell<Tree<H>>,
	state: Cell<State>,
	phase: Cell<Phase>,
	events: RefCell<HashMap<String, HashMap<String, Binding<H>>>>,
	lifecycle: RefCell<HashMap<Lifecycle, Vec<LifecycleListener<H>>>>,
	index_name: RefCell<Option<String>>,
}

/// Shared handle to one wrapped native node. Clones refer to the same wrapper; equality is identity.
pub struct Wrapper<H: Host>(Rc<Inner<H>>);

/// Non-owning handle to a [`Wrapper`].
pub struct WeakWrapper<H: Host>(Weak<Inner<H>>);

impl<H: Host> Clone for Wrapper<H> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<H: Host> Clone for WeakWrapper<H> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<H: Host> PartialEq for Wrapper<H> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl<H: Host> Eq for Wrapper<H> {}

impl<H: Host> Hash for Wrapper<H> {
	fn hash<S: Hasher>(&self, state: &mut S) {
		self.0.key.hash(state);
	}
}

impl<H: Host> Debug for Wrapper<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Wrapper")
			.field("key", &self.0.key)
			.field("node", &self.0.node)
			.field("state", &self.0.state.get())
			.field("phase", &self.0.phase.get())
			.field("children", &self.0.tree.borrow().content.len())
			.finish()
	}
}

impl<H: Host> WeakWrapper<H> {
	#[must_use]
	pub fn upgrade(&self) -> Option<Wrapper<H>> {
		self.0.upgrade().map(Wrapper)
	}
}

fn generate_key() -> Rc<str> {
	uuid::Uuid::new_v4().simple().to_string().into()
}

impl<H: Host> Wrapper<H> {
	pub(crate) fn new(host: Rc<H>, app: Weak<AppInner<H>>, node: H::Node) -> Self {
		let key = generate_key();
		trace!(%key, ?node, "Wrapping node.");
		Self(Rc::new(Inner {
			key,
			node,
			host,
			app,
			tree: RefCell::new(Tree {
				content: Vec::new(),
				content_map: HashMap::new(),
				parent: None,
			}),
			state: Cell::new(State { visible: true, rendered: false }),
			phase: Cell::new(Phase::Alive),
			events: RefCell::default(),
			lifecycle: RefCell::default(),
			index_name: RefCell::default(),
		}))
	}

	/// The unique key, also used as DOM id once rendered.
	#[must_use]
	pub fn key(&self) -> &str {
		&self.0.key
	}

	/// The wrapped native node.
	#[must_use]
	pub fn node(&self) -> &H::Node {
		&self.0.node
	}

	#[must_use]
	pub fn state(&self) -> State {
		self.0.state.get()
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.0.phase.get()
	}

	#[must_use]
	pub fn is_destroyed(&self) -> bool {
		self.phase() == Phase::Destroyed
	}

	/// The children, in render order.
	#[must_use]
	pub fn content(&self) -> Vec<Wrapper<H>> {
		self.0.tree.borrow().content.clone()
	}

	/// Looks up a child by key.
	#[must_use]
	pub fn child(&self, key: &str) -> Option<Wrapper<H>> {
		self.0.tree.borrow().content_map.get(key).cloned()
	}

	#[must_use]
	pub fn parent(&self) -> Option<Wrapper<H>> {
		self.0.tree.borrow().parent.as_ref().and_then(WeakWrapper::upgrade)
	}

	#[must_use]
	pub fn index_name(&self) -> Option<String> {
		self.0.index_name.borrow().clone()
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakWrapper<H> {
		WeakWrapper(Rc::downgrade(&self.0))
	}

	pub(crate) fn host(&self) -> &H {
		&self.0.host
	}

	pub(crate) fn app(&self) -> Option<Rc<AppInner<H>>> {
		self.0.app.upgrade()
	}

	/// Claims `name` in the index table, so that it resolves to this wrapper.
	///
	/// # Errors
	///
	/// Iff `name` is claimed already, this wrapper owns a different name, or the app is gone.
	pub fn set_index_name(&self, name: &str) -> Result<&Self, Error> {
		if let Some(current) = self.index_name() {
			return Err(not_unique("index name of this element", &current));
		}
		let app = self.app().ok_or_else(|| report(ErrorKind::ProcessNotReady, Template::ProcessNotReady, None))?;
		app.index.claim(name, self)?;
		*self.0.index_name.borrow_mut() = Some(name.to_owned());
		Ok(self)
	}

	/// Registers a lifecycle listener.
	///
	/// Despite the name, listeners are not single-shot: they accumulate and all fire, in registration order,
	/// every time `event` occurs.
	pub fn once(&self, event: Lifecycle, listener: impl Fn(&Wrapper<H>, Option<&Wrapper<H>>) + 'static) -> &Self {
		self.0.lifecycle.borrow_mut().entry(event).or_default().push(Rc::new(listener));
		self
	}

	fn fire(&self, event: Lifecycle, argument: Option<&Wrapper<H>>) {
		let listeners = self.0.lifecycle.borrow().get(&event).cloned().unwrap_or_default();
		trace!(key = self.key(), ?event, listeners = listeners.len(), "Firing lifecycle listeners.");
		for listener in listeners {
			listener(self, argument);
		}
	}

	fn parent_key_is(&self, key: &str) -> bool {
		self.parent().map_or(false, |parent| parent.key() == key)
	}

	/// Whether `candidate` is this wrapper or one of its ancestors.
	fn is_or_descends_from(&self, candidate: &Wrapper<H>) -> bool {
		let mut current = Some(self.clone());
		while let Some(wrapper) = current {
			if wrapper == *candidate {
				return true;
			}
			current = wrapper.parent();
		}
		false
	}

	fn set_parent(&self, parent: Option<&Wrapper<H>>) {
		self.0.tree.borrow_mut().parent = parent.map(Wrapper::downgrade);
	}

	/// Removes `key` from the child collections. Returns the removed child.
	fn unlink(&self, key: &str) -> Option<Wrapper<H>> {
		let mut tree = self.0.tree.borrow_mut();
		let removed = tree.content_map.remove(key)?;
		tree.content.retain(|child| child.key() != key);
		Some(removed)
	}

	/// Detaches `child`'s node if it currently sits in this wrapper's node.
	fn detach_node(&self, child: &Wrapper<H>) {
		if self.host().parent_of(child.node()).as_ref() == Some(self.node()) {
			if let Err(error) = self.host().remove_child(self.node(), child.node()) {
				error!("Failed to detach node of {}: {}", child.key(), error);
			}
		}
	}

	/// Links `child` under this wrapper without touching the DOM.
	fn adopt(&self, child: &Wrapper<H>) {
		if let Some(previous) = child.parent() {
			if previous != *self && previous.unlink(child.key()).is_some() {
				previous.detach_node(child);
			}
		}
		child.set_parent(Some(self));
		let mut tree = self.0.tree.borrow_mut();
		tree.content.retain(|existing| existing != child);
		tree.content.push(child.clone());
		tree.content_map.insert(child.0.key.clone(), child.clone());
	}

	/// Replaces the child list without rendering. Used for the `content` option.
	pub(crate) fn set_content(&self, children: Vec<Wrapper<H>>) {
		for child in &children {
			if self.is_or_descends_from(child) {
				warn!(key = self.key(), child = child.key(), "Ignoring wrapper listed in its own or a descendant's content.");
				continue;
			}
			self.adopt(child);
		}
	}

	/// Renders this wrapper and its children once, and returns the native node.
	///
	/// Only children whose recorded parent is this wrapper are appended. Later calls return the node unchanged.
	#[instrument(skip(self), fields(key = self.key()))]
	pub fn render(&self) -> H::Node {
		if self.state().rendered || self.is_destroyed() {
			return self.node().clone();
		}

		for child in self.content() {
			// `adopt` unlinks from the previous parent, so this only trips on a corrupted tree.
			if !child.parent_key_is(self.key()) {
				debug!(child = child.key(), "Skipping child with a stale parent link.");
				continue;
			}
			self.0.tree.borrow_mut().content_map.insert(child.0.key.clone(), child.clone());
			let node = child.render();
			if let Err(error) = self.host().append_child(self.node(), &node) {
				error!("Failed to append {}: {}", child.key(), error);
			}
		}

		if let Some(app) = self.app() {
			let hooks = app.hooks.borrow().element_hooks(HookName::UseRender);
			call_hook(HookName::UseRender, &hooks, |error| app.report_deferred(error), |hook| hook(self));
		}

		self.host().set_id(self.node(), self.key());
		self.0.state.set(State {
			rendered: true,
			..self.state()
		});
		self.fire(Lifecycle::Render, None);
		self.node().clone()
	}

	/// Adds `child`, or the wrapper claiming the index name `child`, once it resolves.
	///
	/// If this wrapper is rendered already, the child is rendered and appended right away.
	pub fn add(&self, child: impl Into<Target<H>>) -> &Self {
		match child.into() {
			Target::Element(child) => self.link(child),
			Target::Name(name) => {
				let Some(app) = self.app() else {
					warn!(key = self.key(), name, "Can't resolve index name without an app.");
					return self;
				};
				let this = self.clone();
				if let Err(error) = app.index.resolve(&name, move |child| {
					this.link(child);
				}) {
					error!("Failed to resolve {:?}: {}", name, error);
				}
			}
		}
		self
	}

	fn link(&self, child: Wrapper<H>) {
		if self.is_destroyed() || child.is_destroyed() {
			warn!(key = self.key(), child = child.key(), "Ignoring add involving a destroyed wrapper.");
			return;
		}
		if self.is_or_descends_from(&child) {
			warn!(key = self.key(), child = child.key(), "Ignoring attempt to add a wrapper to itself or a descendant.");
			return;
		}

		if let Some(app) = self.app() {
			let (this, argument) = (self.clone(), child.clone());
			app.scheduler.after(ticks::ADD_LISTENER, move || {
				if !this.is_destroyed() {
					this.fire(Lifecycle::Add, Some(&argument));
				}
			});
		}

		self.adopt(&child);
		if self.state().rendered {
			let node = child.render();
			if let Err(error) = self.host().append_child(self.node(), &node) {
				error!("Failed to append {}: {}", child.key(), error);
			}
		}
	}

	/// Adds each of `children` in order, one per [`ticks::STAGGER`] slot.
	pub fn add_elements<T: Into<Target<H>>>(&self, children: impl IntoIterator<Item = T>) -> &Self {
		let Some(app) = self.app() else {
			return self;
		};
		let units = children
			.into_iter()
			.map(|child| {
				let (this, child) = (self.clone(), child.into());
				Box::new(move || {
					this.add(child);
				}) as Task
			})
			.collect::<Vec<_>>();
		app.scheduler.stagger(ticks::STAGGER, units, None);
		self
	}

	/// Destroys `child`, or the wrapper claiming the index name `child`.
	pub fn remove(&self, child: impl Into<Target<H>>) -> &Self {
		match child.into() {
			Target::Element(child) => {
				child.destroy();
			}
			Target::Name(name) => {
				let Some(app) = self.app() else {
					return self;
				};
				if let Err(error) = app.index.resolve(&name, |child| {
					child.destroy();
				}) {
					error!("Failed to resolve {:?}: {}", name, error);
				}
			}
		}
		self
	}

	/// Destroys every current child, one per [`ticks::STAGGER`] slot.
	///
	/// `on_complete` runs once the last destroy was *initiated*, not once its grace window elapsed.
	pub fn remove_all(&self, on_complete: Option<Box<dyn FnOnce()>>) -> &Self {
		let Some(app) = self.app() else {
			return self;
		};
		let (this, scheduler) = (self.clone(), app.scheduler.clone());
		app.scheduler.after(ticks::STAGGER, move || {
			let units = this
				.content()
				.into_iter()
				.map(|child| {
					Box::new(move || {
						child.destroy();
					}) as Task
				})
				.collect::<Vec<_>>();
			scheduler.stagger(ticks::STAGGER, units, on_complete);
		});
		self
	}

	/// Starts destruction. Teardown happens [`ticks::DESTROY_GRACE`] ticks later; repeated calls are ignored.
	///
	/// Children are not destroyed. Their nodes leave the DOM with this wrapper's node, but they stay registered
	/// with the app (and keep their index names) until destroyed individually, e.g. through [`remove_all`](`Wrapper::remove_all`) beforehand.
	pub fn destroy(&self) -> &Self {
		if self.phase() != Phase::Alive {
			return self;
		}
		self.0.phase.set(Phase::Destroying);
		debug!(key = self.key(), "Destroying.");
		match self.app() {
			Some(app) => {
				let this = self.clone();
				app.scheduler.after(ticks::DESTROY_GRACE, move || this.finish_destroy());
			}
			None => self.finish_destroy(),
		}
		self
	}

	#[instrument(skip(self), fields(key = self.key()))]
	fn finish_destroy(&self) {
		if self.is_destroyed() {
			return;
		}
		self.fire(Lifecycle::Destroy, None);

		let app = self.app();
		if let Some(app) = &app {
			let name = self.0.index_name.borrow_mut().take();
			if let Some(name) = name {
				app.index.release(&name);
			}
			app.elements.borrow_mut().remove(self.key());
		}

		if let Some(parent) = self.parent() {
			if parent.unlink(self.key()).is_some() {
				parent.detach_node(self);
			}
		}
		self.set_parent(None);

		let bindings = core::mem::take(&mut *self.0.events.borrow_mut());
		for (event_type, named) in bindings {
			for (name, binding) in named {
				if let Err(error) = self.host().remove_event_listener(self.node(), &event_type, &binding.handle, binding.options) {
					error!("Failed to remove {} listener {:?}: {}", event_type, name, error);
				}
			}
		}
		self.0.lifecycle.borrow_mut().clear();
		self.0.phase.set(Phase::Destroyed);
		debug!("Destroyed.");
	}
}
