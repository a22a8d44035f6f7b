use crate::span::{Position, Span};

pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy for the whole pipeline.
///
/// Compile-time variants (`Path`, `Module`, `Resolution`, `Lexer`, `Parser`)
/// abort the run before any module executes. The rest are raised while
/// walking a module's AST and abort evaluation of the current module only.
#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
	#[error("{message}")]
	Path { message: String },

	#[error("{message}")]
	Module { message: String },

	#[error("{message}")]
	Resolution { message: String },

	#[error("{position}: {message}")]
	Lexer { message: String, position: Position },

	#[error("{span}: {message}")]
	Parser { message: String, span: Span },

	#[error("{message}")]
	Name { message: String },

	#[error("{message}")]
	Type { message: String },

	#[error("{message}")]
	Value { message: String },

	#[error("{message}")]
	Parameter { message: String },

	#[error("{message}")]
	Expression { message: String },

	#[error("{message}")]
	Import { message: String },
}

impl Error {
	pub fn path<T: Into<String>>(message: T) -> Error {
		Error::Path { message: message.into() }
	}

	pub fn module<T: Into<String>>(message: T) -> Error {
		Error::Module { message: message.into() }
	}

	pub fn resolution<T: Into<String>>(message: T) -> Error {
		Error::Resolution { message: message.into() }
	}

	pub fn lexer<T: Into<String>>(message: T, position: Position) -> Error {
		Error::Lexer { message: message.into(), position }
	}

	pub fn parser<T: Into<String>>(message: T, span: Span) -> Error {
		Error::Parser { message: message.into(), span }
	}

	pub fn name<T: Into<String>>(message: T) -> Error {
		Error::Name { message: message.into() }
	}

	pub fn type_error<T: Into<String>>(message: T) -> Error {
		Error::Type { message: message.into() }
	}

	pub fn value<T: Into<String>>(message: T) -> Error {
		Error::Value { message: message.into() }
	}

	pub fn parameter<T: Into<String>>(message: T) -> Error {
		Error::Parameter { message: message.into() }
	}

	pub fn expression<T: Into<String>>(message: T) -> Error {
		Error::Expression { message: message.into() }
	}

	pub fn import<T: Into<String>>(message: T) -> Error {
		Error::Import { message: message.into() }
	}
}
