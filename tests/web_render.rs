#![cfg(target_arch = "wasm32")]

use std::{cell::RefCell, rc::Rc, sync::Once};
use strap_dom::{App, Host, ListenerOptions, Options, Value, WebHost};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static LOG: Once = Once::new();

fn app() -> App<WebHost> {
	LOG.call_once(tracing_wasm::set_as_global_default);
	App::new(WebHost::new().unwrap()).unwrap()
}

fn body() -> HtmlBodyElement {
	window().unwrap().document().unwrap().body().unwrap().dyn_into::<HtmlBodyElement>().unwrap()
}

#[wasm_bindgen_test]
fn click() {
	let app = app();
	let click_count = Rc::new(RefCell::new(0));
	let button = app
		.create(
			"button",
			Options::<WebHost>::new().text("Press").on("click$count", {
				let click_count = click_count.clone();
				move |_, event: &web_sys::Event| {
					assert_eq!(event.type_(), "click");
					*click_count.borrow_mut() += 1;
				}
			}),
		)
		.unwrap();
	body().append_child(&button.render()).unwrap();

	assert_eq!(*click_count.borrow(), 0);
	button.click();
	assert_eq!(*click_count.borrow(), 1);

	button.remove_event("click", "count");
	button.click();
	assert_eq!(*click_count.borrow(), 1);

	button.destroy();
	app.scheduler().run_until_idle();
	body().remove_child(button.node()).unwrap();
}

#[wasm_bindgen_test]
fn render_root() {
	let app = app();
	let container = app.host().create_element("div").unwrap();
	container.set_id("web-render-root");
	body().append_child(&container).unwrap();

	let item = app.create("p", Options::new().text("Hello strap-dom!").class_name("greeting")).unwrap();
	app.when_ready(|main| {
		main.add(&item);
	});
	app.render_root("web-render-root");
	app.scheduler().run_until_idle();

	let main: HtmlElement = container.first_element_child().unwrap().dyn_into().unwrap();
	assert_eq!(main.id(), app.main().key());
	assert_eq!(main.text_content().as_deref(), Some("Hello strap-dom!"));
	assert!(item.node().class_list().contains("greeting"));

	body().remove_child(&container).unwrap();
}

#[wasm_bindgen_test]
fn node_mutations() {
	let app = app();
	let element = app.create("div", Options::new().style([("color", "red")])).unwrap();

	element.set_class_name("a b").replace_class_name("a", "c").hide();
	assert_eq!(element.node().class_name(), "c b");
	assert_eq!(element.node().style().get_property_value("color").unwrap(), "red");
	assert_eq!(element.get_attr("hidden").as_deref(), Some("true"));

	element.show().set_style_sheet("margin: 0px");
	assert_eq!(element.get_attr("hidden"), None);
	assert_eq!(element.node().style().get_property_value("color").unwrap(), "");

	let name = element.add_event("focus", |_, _| (), None, ListenerOptions::new().with_capture(true)).unwrap();
	assert!(element.has_listener("focus", &name));
}

#[wasm_bindgen_test]
fn map_values_become_plain_objects() {
	let object = strap_dom::host::web::to_js(&Value::from([("role", "search"), ("mode", "compact")]));
	assert_eq!(js_sys::Reflect::get(&object, &"role".into()).unwrap().as_string().as_deref(), Some("search"));
	assert_eq!(js_sys::Object::keys(object.unchecked_ref()).length(), 2);
}
