#![allow(dead_code)]

use rstest::fixture;
use std::{cell::RefCell, rc::Rc};
use strap_dom::{App, ErrorKind, MemoryHost, Signal};
use tracing_subscriber::EnvFilter;

pub fn init_logging() {
	let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
}

#[fixture]
pub fn app() -> App<MemoryHost> {
	init_logging();
	App::new(MemoryHost::new()).unwrap()
}

/// Collects the kinds of errors sent to channel `"error"`.
pub fn error_log(app: &App<MemoryHost>) -> Rc<RefCell<Vec<ErrorKind>>> {
	let log = Rc::new(RefCell::new(Vec::new()));
	let sink = log.clone();
	app.events()
		.handle("error", move |_, signal| {
			if let Signal::Error(error) = signal {
				sink.borrow_mut().push(error.kind());
			}
		})
		.unwrap();
	log
}

/// Counts calls to the returned closure.
pub fn counter() -> (Rc<RefCell<usize>>, impl Fn() + Clone) {
	let count = Rc::new(RefCell::new(0));
	let sink = count.clone();
	(count, move || *sink.borrow_mut() += 1)
}
