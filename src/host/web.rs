//! The browser host, through `web-sys`.

use super::{ClassOp, Host, HostError, ListenerOptions, NativeCallback};
use crate::{scheduler::ticks::TICK_MS, value::Value, App, Scheduler};
use core::cell::Cell;
use js_sys::{Array, Function, Object, Reflect};
use std::rc::{Rc, Weak};
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Document, Event, HtmlElement, Window};

fn js_error(error: JsValue) -> HostError {
	HostError::new(format!("{:?}", error))
}

/// Converts a [`Value`] into its `JavaScript` counterpart.
#[must_use]
pub fn to_js(value: &Value) -> JsValue {
	match value {
		Value::Null => JsValue::NULL,
		Value::Bool(value) => JsValue::from_bool(*value),
		Value::Number(value) => JsValue::from_f64(*value),
		Value::Text(value) => JsValue::from_str(value),
		Value::List(values) => values.iter().map(to_js).collect::<Array>().into(),
		Value::Map(entries) => {
			let object = Object::new();
			for (key, value) in entries {
				if let Err(error) = Reflect::set(&object, &JsValue::from_str(key), &to_js(value)) {
					error!("Failed to assign {:?} on a plain object: {:?}", key, error);
				}
			}
			object.into()
		}
	}
}

/// The document of the current `window`.
#[derive(Debug, Clone)]
pub struct WebHost {
	document: Document,
}

impl WebHost {
	/// # Errors
	///
	/// Iff there is no global `window` with a `document`.
	pub fn new() -> Result<Self, HostError> {
		let document = web_sys::window().and_then(|window| window.document()).ok_or_else(|| HostError::new("no global `window.document`"))?;
		Ok(Self { document })
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

impl Host for WebHost {
	type Node = HtmlElement;
	type Event = Event;
	type Binding = Closure<dyn Fn(Event)>;

	fn create_element(&self, tag: &str) -> Result<HtmlElement, HostError> {
		self.document
			.create_element(tag)
			.map_err(js_error)?
			.dyn_into::<HtmlElement>()
			.map_err(|element| HostError::new(format!("<{}> is not an HTML element", element.tag_name())))
	}

	fn element_by_id(&self, id: &str) -> Option<HtmlElement> {
		self.document.get_element_by_id(id)?.dyn_into::<HtmlElement>().ok()
	}

	fn append_child(&self, parent: &HtmlElement, child: &HtmlElement) -> Result<(), HostError> {
		parent.append_child(child).map(drop).map_err(js_error)
	}

	fn remove_child(&self, parent: &HtmlElement, child: &HtmlElement) -> Result<(), HostError> {
		parent.remove_child(child).map(drop).map_err(js_error)
	}

	fn parent_of(&self, node: &HtmlElement) -> Option<HtmlElement> {
		node.parent_element()?.dyn_into::<HtmlElement>().ok()
	}

	fn append_to_head(&self, node: &HtmlElement) -> Result<(), HostError> {
		let head = self.document.head().ok_or_else(|| HostError::new("the document has no <head>"))?;
		head.append_child(node).map(drop).map_err(js_error)
	}

	fn set_id(&self, node: &HtmlElement, id: &str) {
		node.set_id(id);
	}

	fn set_attribute(&self, node: &HtmlElement, name: &str, value: &str) -> Result<(), HostError> {
		node.set_attribute(name, value).map_err(js_error)
	}

	fn attribute(&self, node: &HtmlElement, name: &str) -> Option<String> {
		node.get_attribute(name)
	}

	fn remove_attribute(&self, node: &HtmlElement, name: &str) -> Result<(), HostError> {
		node.remove_attribute(name).map_err(js_error)
	}

	fn class_list(&self, node: &HtmlElement, op: ClassOp<'_>) -> Result<(), HostError> {
		let class_list = node.class_list();
		match op {
			ClassOp::Add(token) => class_list.add_1(token),
			ClassOp::Remove(token) => class_list.remove_1(token),
			ClassOp::Toggle(token) => class_list.toggle(token).map(drop),
			ClassOp::Replace(old, new) => class_list.replace(old, new).map(drop),
		}
		.map_err(js_error)
	}

	fn set_style_text(&self, node: &HtmlElement, css: &str) {
		node.style().set_css_text(css);
	}

	fn set_style_property(&self, node: &HtmlElement, name: &str, value: &str) -> Result<(), HostError> {
		// Bracket assignment accepts both `backgroundColor` and `background-color`.
		Reflect::set(&node.style(), &JsValue::from_str(name), &JsValue::from_str(value)).map(drop).map_err(js_error)
	}

	fn set_text(&self, node: &HtmlElement, text: &str) {
		node.set_inner_text(text);
	}

	fn text(&self, node: &HtmlElement) -> String {
		node.text_content().unwrap_or_else(|| node.inner_text())
	}

	fn set_property(&self, node: &HtmlElement, name: &str, value: &Value) -> Result<(), HostError> {
		Reflect::set(node, &JsValue::from_str(name), &to_js(value)).map(drop).map_err(js_error)
	}

	fn merge_property(&self, node: &HtmlElement, property: &str, key: &str, value: &Value) -> Result<(), HostError> {
		let target = Reflect::get(node, &JsValue::from_str(property)).map_err(js_error)?;
		if !target.is_object() {
			return Err(HostError::new(format!("property {:?} is not an object", property)));
		}
		Reflect::set(&target, &JsValue::from_str(key), &to_js(value)).map(drop).map_err(js_error)
	}

	fn call_method(&self, node: &HtmlElement, name: &str, args: &[Value]) -> Result<(), HostError> {
		let method = Reflect::get(node, &JsValue::from_str(name))
			.map_err(js_error)?
			.dyn_into::<Function>()
			.map_err(|_| HostError::new(format!("{:?} is not a method", name)))?;
		let args = args.iter().map(to_js).collect::<Array>();
		method.apply(node, &args).map(drop).map_err(js_error)
	}

	fn add_event_listener(&self, node: &HtmlElement, event_type: &str, callback: NativeCallback<Event>, options: ListenerOptions) -> Result<Self::Binding, HostError> {
		let closure = Closure::wrap(Box::new(move |event: Event| callback(&event)) as Box<dyn Fn(Event)>);
		let web_options = AddEventListenerOptions::new();
		web_options.set_capture(options.capture);
		web_options.set_once(options.once);
		web_options.set_passive(options.passive);
		node.add_event_listener_with_callback_and_add_event_listener_options(event_type, closure.as_ref().unchecked_ref(), &web_options)
			.map_err(js_error)?;
		Ok(closure)
	}

	fn remove_event_listener(&self, node: &HtmlElement, event_type: &str, binding: &Self::Binding, options: ListenerOptions) -> Result<(), HostError> {
		node.remove_event_listener_with_callback_and_bool(event_type, binding.as_ref().unchecked_ref(), options.capture)
			.map_err(js_error)
	}

	fn click(&self, node: &HtmlElement) {
		node.click();
	}
}

/// Drains `scheduler` from `setTimeout`, one tick per timeout, whenever it has work.
///
/// # Errors
///
/// Iff there is no global `window`.
pub fn drive(scheduler: &Rc<Scheduler>) -> Result<(), HostError> {
	let window = web_sys::window().ok_or_else(|| HostError::new("no global `window`"))?;
	let armed = Rc::new(Cell::new(false));
	let weak = Rc::downgrade(scheduler);
	scheduler.set_waker(move || arm(&window, &weak, &armed));
	Ok(())
}

fn arm(window: &Window, scheduler: &Weak<Scheduler>, armed: &Rc<Cell<bool>>) {
	if armed.replace(true) {
		return;
	}
	let callback = {
		let (window, scheduler, armed) = (window.clone(), scheduler.clone(), armed.clone());
		Closure::once_into_js(move || {
			armed.set(false);
			if let Some(strong) = scheduler.upgrade() {
				let ran = strong.tick();
				trace!(ran, "Scheduler tick.");
				if strong.pending() > 0 {
					arm(&window, &scheduler, &armed);
				}
			}
		})
	};
	if let Err(error) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), TICK_MS) {
		armed.set(false);
		error!("Failed to arm scheduler timeout: {:?}", error);
	}
}

/// Forwards clicks on `window` to [`App::window_clicked`] for the lifetime of the page.
///
/// # Errors
///
/// Iff there is no global `window` or the listener can't be added.
pub fn bind_window_clicks(app: &App<WebHost>) -> Result<(), HostError> {
	let window = web_sys::window().ok_or_else(|| HostError::new("no global `window`"))?;
	let app = app.downgrade();
	let closure = Closure::wrap(Box::new(move |event: Event| {
		if let Some(app) = app.upgrade() {
			app.window_clicked(&event);
		}
	}) as Box<dyn Fn(Event)>);
	window.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref()).map_err(js_error)?;
	closure.forget();
	Ok(())
}
