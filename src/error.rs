//! Tag-based error reporting.
//!
//! Every validation failure of the runtime goes through [`report`], which takes an [`ErrorKind`] tag,
//! a message [`Template`] and an optional context string, logs it and hands back an [`Error`] for the caller to return.

use crate::{channel::ChannelError, host::HostError};
use core::fmt::{self, Display, Formatter};
use tracing::debug;

/// The error tags consumers can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// A listener, hook or ready callback could not be used as such.
	InvalidListener,
	/// The tree was asked to render before [`App::when_ready`](`crate::App::when_ready`) ran.
	ProcessNotReady,
	/// A name (extension, listener, index name…) collided with an existing registration.
	UniqueType,
	/// A configuration entry can't be expressed as an option.
	InvalidOption,
	/// The render target container does not exist.
	ContainerNotFound,
	/// A [`ChannelRegistry`](`crate::ChannelRegistry`) rejected an operation.
	Channel,
	/// The host DOM rejected an operation.
	Host,
}

impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ErrorKind::InvalidListener => "InvalidListener",
			ErrorKind::ProcessNotReady => "ProcessNotReady",
			ErrorKind::UniqueType => "UniqueType",
			ErrorKind::InvalidOption => "InvalidOption",
			ErrorKind::ContainerNotFound => "ContainerNotFound",
			ErrorKind::Channel => "ChannelError",
			ErrorKind::Host => "HostError",
		})
	}
}

/// Message templates for [`report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
	/// `"<context> is not a callback function"`
	ListenerError,
	/// `"<context> failed"`, for hooks that returned an error.
	HookFailed,
	/// `"the process is not ready"`
	ProcessNotReady,
	/// Context `"<what>,<key>"`: `"the <what> must be unique, the key <key> already exists"`
	UniqueTypeError,
	/// `"invalid option <context>"`
	InvalidOption,
	/// `"no container with id <context> was found"`
	ContainerNotFound,
}

impl Template {
	#[must_use]
	pub fn render(self, context: Option<&str>) -> String {
		let context = context.unwrap_or("undefined");
		match self {
			Template::ListenerError => format!("{} is not a callback function", context),
			Template::HookFailed => format!("{} failed", context),
			Template::ProcessNotReady => "the process is not ready".to_owned(),
			Template::UniqueTypeError => {
				let (what, key) = context.split_once(',').unwrap_or((context, ""));
				format!("the {} must be unique, the key {} already exists", what, key)
			}
			Template::InvalidOption => format!("invalid option {}", context),
			Template::ContainerNotFound => format!("no container with id {:?} was found", context),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("{kind}: {message}")]
	Reported { kind: ErrorKind, message: String },
	#[error(transparent)]
	Channel(#[from] ChannelError),
	#[error(transparent)]
	Host(#[from] HostError),
}

impl Error {
	#[must_use]
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Reported { kind, .. } => *kind,
			Error::Channel(_) => ErrorKind::Channel,
			Error::Host(_) => ErrorKind::Host,
		}
	}
}

/// The single reporting entry point.
#[must_use]
pub fn report(kind: ErrorKind, template: Template, context: Option<&str>) -> Error {
	let message = template.render(context);
	debug!(%kind, %message, "Reporting error.");
	Error::Reported { kind, message }
}

/// Shorthand for the uniqueness error of `what` named `key`.
#[must_use]
pub(crate) fn not_unique(what: &str, key: &str) -> Error {
	report(ErrorKind::UniqueType, Template::UniqueTypeError, Some(&format!("{},{}", what, key)))
}
