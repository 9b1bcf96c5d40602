//! The application context: one wrapper tree with its registries, hooks and settings.

use crate::{
	channel::ChannelRegistry,
	element::Wrapper,
	error::{not_unique, report, Error, ErrorKind, Template},
	hooks::{call_hook, HookName, HookResult, Hooks},
	host::Host,
	index::IndexTable,
	options::Options,
	scheduler::{ticks, Scheduler},
	value::Value,
};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::{
	collections::BTreeMap,
	rc::{Rc, Weak},
};
use tracing::{debug, error, instrument};

/// Settings handed to extensions.
pub type Settings = BTreeMap<String, Value>;

/// Payload of the app-level [`ChannelRegistry`].
pub enum Signal<H: Host> {
	Value(Value),
	Element(Wrapper<H>),
	Error(Error),
}

impl<H: Host> Clone for Signal<H> {
	fn clone(&self) -> Self {
		match self {
			Signal::Value(value) => Signal::Value(value.clone()),
			Signal::Element(element) => Signal::Element(element.clone()),
			Signal::Error(error) => Signal::Error(error.clone()),
		}
	}
}

impl<H: Host> Debug for Signal<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Signal::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Signal::Element(element) => f.debug_tuple("Element").field(&element.key()).finish(),
			Signal::Error(error) => f.debug_tuple("Error").field(error).finish(),
		}
	}
}

type WindowClickListener<H> = Rc<dyn Fn(&<H as Host>::Event)>;

pub(crate) struct AppInner<H: Host> {
	pub(crate) host: Rc<H>,
	pub(crate) scheduler: Rc<Scheduler>,
	pub(crate) elements: RefCell<HashMap<Rc<str>, Wrapper<H>>>,
	pub(crate) index: IndexTable<H>,
	pub(crate) events: ChannelRegistry<Signal<H>, Signal<H>>,
	pub(crate) hooks: RefCell<Hooks<H>>,
	extensions: RefCell<HashMap<String, Option<Rc<dyn Any>>>>,
	settings: RefCell<Settings>,
	ready: Cell<bool>,
	window_click: RefCell<Vec<WindowClickListener<H>>>,
	main: Wrapper<H>,
}

impl<H: Host> AppInner<H> {
	/// Sink for failures on deferred paths: logged, then sent to channel `"error"` if it is handled.
	pub(crate) fn report_deferred(&self, error: Error) {
		error!("{}", error);
		if self.events.has_event("error").unwrap_or(false) {
			if let Err(channel_error) = self.events.invoke("error", None, Signal::Error(error)) {
				error!("Failed to deliver error: {}", channel_error);
			}
		}
	}
}

/// Owns one wrapper tree, rooted at [`main`](`App::main`). Cheap to clone.
pub struct App<H: Host>(Rc<AppInner<H>>);

/// Non-owning handle to an [`App`].
pub struct WeakApp<H: Host>(Weak<AppInner<H>>);

impl<H: Host> Clone for App<H> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<H: Host> Clone for WeakApp<H> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<H: Host> WeakApp<H> {
	#[must_use]
	pub fn upgrade(&self) -> Option<App<H>> {
		self.0.upgrade().map(App)
	}
}

impl<H: Host> Debug for App<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("main", &self.0.main.key())
			.field("elements", &self.0.elements.borrow().len())
			.field("ready", &self.0.ready.get())
			.field("scheduler", &self.0.scheduler)
			.field("hooks", &self.0.hooks.borrow())
			.finish_non_exhaustive()
	}
}

impl<H: Host> App<H> {
	/// Creates an app with a `<div>` as main wrapper, claiming the index name `"main"`.
	///
	/// # Errors
	///
	/// Iff the host can't create the main node.
	pub fn new(host: H) -> Result<Self, Error> {
		let host = Rc::new(host);
		let node = host.create_element("div")?;
		let scheduler = Scheduler::new();
		let inner = Rc::new_cyclic(|weak| AppInner {
			host: host.clone(),
			scheduler: scheduler.clone(),
			elements: RefCell::default(),
			index: IndexTable::new(scheduler.clone()),
			events: ChannelRegistry::new(scheduler.clone()),
			hooks: RefCell::default(),
			extensions: RefCell::default(),
			settings: RefCell::default(),
			ready: Cell::new(false),
			window_click: RefCell::default(),
			main: Wrapper::new(host.clone(), weak.clone(), node),
		});
		let app = Self(inner);

		let main = app.main().clone();
		main.set_index_name("main")?;
		app.0.elements.borrow_mut().insert(main.key().into(), main.clone());

		let weak = main.downgrade();
		app.0.events.handle("main", move |event, _| {
			if let Some(main) = weak.upgrade() {
				event.send(Signal::Element(main));
			}
		})?;
		debug!(main = main.key(), "Created app.");
		Ok(app)
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakApp<H> {
		WeakApp(Rc::downgrade(&self.0))
	}

	/// The root wrapper.
	#[must_use]
	pub fn main(&self) -> &Wrapper<H> {
		&self.0.main
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.0.host
	}

	#[must_use]
	pub fn scheduler(&self) -> &Rc<Scheduler> {
		&self.0.scheduler
	}

	#[must_use]
	pub fn index(&self) -> &IndexTable<H> {
		&self.0.index
	}

	/// The app-level channels. `"main"` answers with the main wrapper; `"error"`, once handled, receives deferred failures.
	#[must_use]
	pub fn events(&self) -> &ChannelRegistry<Signal<H>, Signal<H>> {
		&self.0.events
	}

	/// Looks up a live wrapper by key.
	#[must_use]
	pub fn element(&self, key: &str) -> Option<Wrapper<H>> {
		self.0.elements.borrow().get(key).cloned()
	}

	/// Number of live wrappers, including [`main`](`App::main`).
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.elements.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	#[must_use]
	pub fn is_ready(&self) -> bool {
		self.0.ready.get()
	}

	/// Creates a `tag` node, wraps it and applies `options`.
	///
	/// `useInit` hooks run before the options are applied, `useOption` hooks after. Failing hooks are reported
	/// without affecting the creation.
	///
	/// # Errors
	///
	/// Iff the host can't create `tag`, or a setter, the text or the index name claim in `options` fails.
	/// The wrapper is not registered in that case.
	#[instrument(skip(self, options))]
	pub fn create(&self, tag: &str, options: Options<H>) -> Result<Wrapper<H>, Error> {
		let node = self.0.host.create_element(tag)?;
		let element = Wrapper::new(self.0.host.clone(), Rc::downgrade(&self.0), node);

		let init = self.0.hooks.borrow().element_hooks(HookName::UseInit);
		call_hook(HookName::UseInit, &init, |error| self.0.report_deferred(error), |hook| hook(&element));

		options.apply(&element, &self.0)?;

		let option = self.0.hooks.borrow().option_hooks();
		call_hook(HookName::UseOption, &option, |error| self.0.report_deferred(error), |hook| hook(&element, &options));

		self.0.elements.borrow_mut().insert(element.key().into(), element.clone());
		debug!(key = element.key(), "Created element.");
		Ok(element)
	}

	/// Runs `f` with the main wrapper and marks the app ready to [render](`App::render_root`).
	pub fn when_ready(&self, f: impl FnOnce(&Wrapper<H>)) -> &Self {
		f(self.main());
		self.0.ready.set(true);
		self
	}

	/// Mounts the tree under the node with DOM id `target`.
	///
	/// After [`ticks::RENDER_ROOT`], the readiness is checked; [`ticks::MOUNT`] later, `main` is rendered and appended.
	/// Failures are [reported](`App::events`) since they happen on a later tick.
	pub fn render_root(&self, target: &str) -> &Self {
		let (app, target) = (self.downgrade(), target.to_owned());
		self.0.scheduler.after(ticks::RENDER_ROOT, move || {
			let Some(app) = app.upgrade() else {
				return;
			};
			if !app.is_ready() {
				app.0.report_deferred(report(ErrorKind::ProcessNotReady, Template::ProcessNotReady, None));
				return;
			}
			let weak = app.downgrade();
			app.0.scheduler.after(ticks::MOUNT, move || {
				let Some(app) = weak.upgrade() else {
					return;
				};
				match app.0.host.element_by_id(&target) {
					Some(container) => {
						let node = app.main().render();
						match app.0.host.append_child(&container, &node) {
							Ok(()) => debug!(target, "Mounted main."),
							Err(error) => app.0.report_deferred(error.into()),
						}
					}
					None => app.0.report_deferred(report(ErrorKind::ContainerNotFound, Template::ContainerNotFound, Some(&target))),
				}
			});
		});
		self
	}

	/// Replaces the settings handed to extensions.
	pub fn configure(&self, settings: Settings) -> &Self {
		*self.0.settings.borrow_mut() = settings;
		self
	}

	#[must_use]
	pub fn settings(&self) -> Settings {
		self.0.settings.borrow().clone()
	}

	/// Runs the extension `f` once, under a unique `name`.
	///
	/// Hooks `f` registers are appended after it returns. A returned value is kept for [`extension`](`App::extension`).
	///
	/// # Errors
	///
	/// Iff an extension named `name` was defined before.
	pub fn define_extension(&self, name: &str, f: impl FnOnce(&Settings, &App<H>, &mut Hooks<H>) -> Option<Rc<dyn Any>>) -> Result<&Self, Error> {
		if self.0.extensions.borrow().contains_key(name) {
			return Err(not_unique("extension name", name));
		}
		let settings = self.settings();
		let mut hooks = Hooks::default();
		let value = f(&settings, self, &mut hooks);
		self.0.hooks.borrow_mut().append(hooks);
		self.0.extensions.borrow_mut().insert(name.to_owned(), value);
		debug!(name, "Defined extension.");
		Ok(self)
	}

	#[must_use]
	pub fn has_extension(&self, name: &str) -> bool {
		self.0.extensions.borrow().contains_key(name)
	}

	/// The value the extension `name` returned, if it is a `T`.
	#[must_use]
	pub fn extension<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
		let value = self.0.extensions.borrow().get(name)?.clone()?;
		value.downcast::<T>().ok()
	}

	pub fn use_init(&self, hook: impl Fn(&Wrapper<H>) -> HookResult + 'static) -> &Self {
		self.0.hooks.borrow_mut().use_init(hook);
		self
	}

	pub fn use_option(&self, hook: impl Fn(&Wrapper<H>, &Options<H>) -> HookResult + 'static) -> &Self {
		self.0.hooks.borrow_mut().use_option(hook);
		self
	}

	pub fn use_render(&self, hook: impl Fn(&Wrapper<H>) -> HookResult + 'static) -> &Self {
		self.0.hooks.borrow_mut().use_render(hook);
		self
	}

	/// Calls `f` with the wrapper claiming `name`, once it does.
	///
	/// # Errors
	///
	/// Iff `name` is empty.
	pub fn get(&self, name: &str, f: impl FnOnce(&Wrapper<H>) + 'static) -> Result<&Self, Error> {
		self.0.index.resolve(name, move |element| f(&element))?;
		Ok(self)
	}

	/// Adds `child` to the wrapper claiming `parent_name`, once it does.
	///
	/// # Errors
	///
	/// Iff `parent_name` is empty.
	pub fn add_to(&self, parent_name: &str, child: &Wrapper<H>) -> Result<&Self, Error> {
		let child = child.clone();
		self.0.index.resolve(parent_name, move |parent| {
			parent.add(child);
		})?;
		Ok(self)
	}

	/// Appends a `<style>` element with `css` to the document head. Empty `css` is skipped unless `force` is set.
	///
	/// # Errors
	///
	/// Iff the style element can't be created or appended.
	pub fn add_css(&self, css: &str, force: bool) -> Result<Option<Wrapper<H>>, Error> {
		if css.is_empty() && !force {
			return Ok(None);
		}
		let style = self.create("style", Options::new().text(css))?;
		self.0.host.append_to_head(&style.render())?;
		Ok(Some(style))
	}

	/// Registers `f` to be called with every window click, e.g. to close popups.
	pub fn hide_on_window_click(&self, f: impl Fn(&H::Event) + 'static) -> &Self {
		self.0.window_click.borrow_mut().push(Rc::new(f));
		self
	}

	/// Forwards a window click to every [`hide_on_window_click`](`App::hide_on_window_click`) listener.
	pub fn window_clicked(&self, event: &H::Event) {
		let listeners = self.0.window_click.borrow().clone();
		for listener in listeners {
			listener(event);
		}
	}

	/// Logs `error` and sends it to channel `"error"` if that is handled.
	pub fn report(&self, error: Error) {
		self.0.report_deferred(error);
	}
}
