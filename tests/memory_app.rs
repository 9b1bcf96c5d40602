use rstest::rstest;
use std::{any::Any, cell::RefCell, rc::Rc};
use strap_dom::{
	channel::OnResult,
	error::{report, Template},
	host::memory::MemoryEvent,
	scheduler::ticks,
	App, ErrorKind, MemoryHost, Options, Settings, Signal, Value, Wrapper,
};

mod memory_app_;
use memory_app_::{app, counter, error_log};

#[rstest]
fn render_root_mounts_main(app: App<MemoryHost>) {
	let container = app.host().mount_container("app");
	let child = app.create("p", Options::new().text("Hi")).unwrap();
	app.when_ready(|main| {
		main.add(&child);
	});
	assert!(app.is_ready());

	app.render_root("app");
	app.scheduler().advance(ticks::RENDER_ROOT + ticks::MOUNT - 1);
	assert!(container.children().is_empty());

	app.scheduler().tick();
	let main = app.main().node();
	assert_eq!(container.children(), [main.clone()]);
	assert_eq!(main.id(), app.main().key());
	assert_eq!(main.children(), [child.node().clone()]);
	assert_eq!(container.text_content(), "Hi");
}

#[rstest]
fn render_root_before_ready(app: App<MemoryHost>) {
	let errors = error_log(&app);
	let container = app.host().mount_container("app");

	app.render_root("app");
	app.scheduler().run_until_idle();
	assert_eq!(*errors.borrow(), [ErrorKind::ProcessNotReady]);
	assert!(container.children().is_empty());
	assert!(!app.main().state().rendered);
}

#[rstest]
fn render_root_without_container(app: App<MemoryHost>) {
	let errors = error_log(&app);
	app.when_ready(|_| ());
	app.render_root("missing");
	app.scheduler().run_until_idle();
	assert_eq!(*errors.borrow(), [ErrorKind::ContainerNotFound]);
}

#[rstest]
fn main_channel(app: App<MemoryHost>) {
	let found = Rc::new(RefCell::new(None));
	let sink = found.clone();
	let on_result: OnResult<Signal<MemoryHost>> = Box::new(move |signal| {
		if let Some(Signal::Element(main)) = signal {
			*sink.borrow_mut() = Some(main);
		}
	});
	app.events().invoke("main", Some(on_result), Signal::Value(Value::Null)).unwrap();
	app.scheduler().run_until_idle();
	assert_eq!(found.borrow().as_ref(), Some(app.main()));
}

#[rstest]
fn registry(app: App<MemoryHost>) {
	assert_eq!(app.len(), 1);
	assert_eq!(app.element(app.main().key()).as_ref(), Some(app.main()));

	let element = app.create("div", Options::new()).unwrap();
	assert_eq!(app.len(), 2);
	assert_eq!(app.element(element.key()), Some(element));
	assert_eq!(app.element("nope"), None);
}

#[rstest]
fn extensions(app: App<MemoryHost>) {
	app.configure(Settings::from([("prefix".to_owned(), Value::from("x-"))]));
	app.define_extension("prefixer", |settings, _, hooks| {
		let prefix = settings.get("prefix").and_then(Value::as_str).unwrap_or_default().to_owned();
		hooks.use_init(move |element| {
			element.set_class_name(&format!("{}element", prefix));
			Ok(())
		});
		Some(Rc::new(7_u32) as Rc<dyn Any>)
	})
	.unwrap();

	assert!(app.has_extension("prefixer"));
	assert_eq!(app.extension::<u32>("prefixer").as_deref(), Some(&7));
	assert_eq!(app.extension::<String>("prefixer"), None);

	let element = app.create("div", Options::new()).unwrap();
	assert_eq!(element.node().classes(), ["x-element"]);

	let error = app.define_extension("prefixer", |_, _, _| None).unwrap_err();
	assert_eq!(error.kind(), ErrorKind::UniqueType);
	assert_eq!(error.to_string(), "UniqueType: the extension name must be unique, the key prefixer already exists");
}

#[rstest]
fn failing_hooks_are_reported(app: App<MemoryHost>) {
	let errors = error_log(&app);
	let (count, increment) = counter();
	app.use_init(|_| Err(report(ErrorKind::InvalidOption, Template::InvalidOption, Some("broken"))))
		.use_init(move |_| {
			increment();
			Ok(())
		});

	let element = app.create("div", Options::new()).unwrap();
	assert_eq!(*count.borrow(), 1);
	assert!(app.element(element.key()).is_some());

	app.scheduler().run_until_idle();
	assert_eq!(*errors.borrow(), [ErrorKind::InvalidListener]);
}

#[rstest]
fn render_hooks_run_once(app: App<MemoryHost>) {
	let rendered = Rc::new(RefCell::new(Vec::new()));
	let sink = rendered.clone();
	app.use_render(move |element| {
		sink.borrow_mut().push(element.key().to_owned());
		Ok(())
	});

	let child = app.create("span", Options::new()).unwrap();
	let parent = app.create("div", Options::new().content([child.clone()])).unwrap();
	parent.render();
	parent.render();
	assert_eq!(*rendered.borrow(), [child.key().to_owned(), parent.key().to_owned()]);
}

#[rstest]
fn get_and_add_to(app: App<MemoryHost>) {
	let list = app.create("ul", Options::new().id("list")).unwrap();
	let item = app.create("li", Options::new()).unwrap();
	app.add_to("list", &item).unwrap();

	let found = Rc::new(RefCell::new(None));
	let sink = found.clone();
	app.get("list", move |element: &Wrapper<MemoryHost>| *sink.borrow_mut() = Some(element.content().len()))
		.unwrap();

	app.scheduler().run_until_idle();
	assert_eq!(list.content(), [item]);
	assert_eq!(*found.borrow(), Some(1));
}

#[rstest]
fn add_css(app: App<MemoryHost>) {
	let style = app.add_css("body { margin: 0 }", false).unwrap().unwrap();
	assert_eq!(style.node().tag(), "style");
	assert_eq!(app.host().head().children(), [style.node().clone()]);
	assert_eq!(style.get_text(), "body { margin: 0 }");

	assert!(app.add_css("", false).unwrap().is_none());
	assert!(app.add_css("", true).unwrap().is_some());
	assert_eq!(app.host().head().children().len(), 2);
}

#[rstest]
fn window_clicks(app: App<MemoryHost>) {
	let menu = app.create("menu", Options::new()).unwrap();
	let target = menu.downgrade();
	app.hide_on_window_click(move |event: &MemoryEvent| {
		if let Some(menu) = target.upgrade() {
			if !menu.node().contains(&event.target) {
				menu.hide();
			}
		}
	});

	app.window_clicked(&MemoryEvent {
		event_type: "click".to_owned(),
		target: menu.node().clone(),
	});
	assert!(menu.state().visible);

	app.window_clicked(&MemoryEvent {
		event_type: "click".to_owned(),
		target: app.host().body().clone(),
	});
	assert!(!menu.state().visible);
}
