use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use crate::ast::{Param, Stmt};
use crate::env::Stack;
use crate::error::{Error, Result};

/// The access capability of a [`Container`], fixed at creation and never
/// changed over its lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Capability {
	/// May be read, not overwritten.
	Readable,
	/// May be overwritten, not read.
	Writeable,
	/// Both readable and writeable.
	Transform,
}

impl Capability {
	pub fn can_read(self) -> bool {
		matches!(self, Capability::Readable | Capability::Transform)
	}

	pub fn can_write(self) -> bool {
		matches!(self, Capability::Writeable | Capability::Transform)
	}
}

struct ContainerData {
	name: String,
	value: RefCell<Value>,
	capability: Capability,
}

/// A named, capability-tagged value cell. Cloning a `Container` clones the
/// handle, not the cell — two clones observe the same writes, which is how
/// indexing into a list/object and closures over shared scopes work.
#[derive(Clone)]
pub struct Container(Rc<ContainerData>);

impl Container {
	pub fn new(name: impl Into<String>, value: Value, capability: Capability) -> Self {
		Container(Rc::new(ContainerData {
			name: name.into(),
			value: RefCell::new(value),
			capability,
		}))
	}

	/// A fresh container with no name, used for the anonymous values that
	/// operators produce.
	pub fn anonymous(value: Value, capability: Capability) -> Self {
		Container::new(String::new(), value, capability)
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	pub fn capability(&self) -> Capability {
		self.0.capability
	}

	pub fn read(&self) -> Result<Value> {
		if self.0.capability.can_read() {
			Ok(self.0.value.borrow().clone())
		} else {
			Err(Error::expression(format!("container `{}` is not readable", self.display_name())))
		}
	}

	pub fn write(&self, value: Value) -> Result<()> {
		if self.0.capability.can_write() {
			*self.0.value.borrow_mut() = value;
			Ok(())
		} else {
			Err(Error::expression(format!("container `{}` is not writeable", self.display_name())))
		}
	}

	/// Reads and writes regardless of capability, used internally when
	/// constructing a fresh container from an already-checked source value
	/// (e.g. copying an argument into a new parameter binding).
	pub fn read_raw(&self) -> Value {
		self.0.value.borrow().clone()
	}

	fn display_name(&self) -> &str {
		if self.0.name.is_empty() {
			"<anonymous>"
		} else {
			&self.0.name
		}
	}
}

impl Debug for Container {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Container({}, {:?}, {:?})", self.display_name(), self.0.capability, self.0.value.borrow())
	}
}

/// A key in an [`Value::Object`] map: either a string or a number. Numbers
/// are compared/hashed by bit pattern since `f64` has no `Eq`/`Hash`.
#[derive(Clone, Debug)]
pub enum ObjectKey {
	String(String),
	Number(f64),
}

impl ObjectKey {
	pub fn from_value(value: &Value) -> Result<ObjectKey> {
		match value {
			Value::String(s) => Ok(ObjectKey::String(s.clone())),
			Value::Number(n) => Ok(ObjectKey::Number(*n)),
			other => Err(Error::type_error(format!("`{}` cannot be used as an object key", other.type_name()))),
		}
	}
}

impl PartialEq for ObjectKey {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(ObjectKey::String(a), ObjectKey::String(b)) => a == b,
			(ObjectKey::Number(a), ObjectKey::Number(b)) => a.to_bits() == b.to_bits(),
			_ => false,
		}
	}
}

impl Eq for ObjectKey {}

impl std::hash::Hash for ObjectKey {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		match self {
			ObjectKey::String(s) => {
				0u8.hash(state);
				s.hash(state);
			}
			ObjectKey::Number(n) => {
				1u8.hash(state);
				n.to_bits().hash(state);
			}
		}
	}
}

impl Display for ObjectKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ObjectKey::String(s) => write!(f, "{s}"),
			ObjectKey::Number(n) => write!(f, "{n}"),
		}
	}
}

/// Insertion-ordered object map, matching the Scope/Exports ordering
/// discipline used throughout the evaluator.
#[derive(Default)]
pub struct ObjectData {
	order: Vec<ObjectKey>,
	entries: HashMap<ObjectKey, Container>,
}

impl ObjectData {
	pub fn insert(&mut self, key: ObjectKey, container: Container) {
		if !self.entries.contains_key(&key) {
			self.order.push(key.clone());
		}
		self.entries.insert(key, container);
	}

	pub fn get(&self, key: &ObjectKey) -> Option<&Container> {
		self.entries.get(key)
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&ObjectKey, &Container)> {
		self.order.iter().map(move |k| (k, self.entries.get(k).expect("key in order but not in map")))
	}
}

/// A user-defined function's callable body, or a host-registered built-in.
/// Carries the closure by reference (§4.5.4, §9 "Closure sharing") so later
/// mutations of the defining scope are visible to later calls.
pub enum FunctionValue {
	User {
		name: String,
		params: Vec<Param>,
		body: Rc<Vec<Stmt>>,
		closure: Stack,
	},
	Host {
		name: String,
		arity: usize,
		func: Rc<dyn Fn(&[Value]) -> Result<Value>>,
	},
}

impl FunctionValue {
	pub fn name(&self) -> &str {
		match self {
			FunctionValue::User { name, .. } => name,
			FunctionValue::Host { name, .. } => name,
		}
	}
}

impl Debug for FunctionValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "<function {}>", self.name())
	}
}

/// The dynamically-typed value union.
#[derive(Clone, Debug)]
pub enum Value {
	Null,
	Number(f64),
	String(String),
	Boolean(bool),
	List(Rc<RefCell<Vec<Container>>>),
	Tuple(Rc<Vec<Container>>),
	Object(Rc<RefCell<ObjectData>>),
	Function(Rc<FunctionValue>),
}

impl Value {
	pub fn list(items: Vec<Container>) -> Value {
		Value::List(Rc::new(RefCell::new(items)))
	}

	pub fn tuple(items: Vec<Container>) -> Value {
		Value::Tuple(Rc::new(items))
	}

	/// The type-name truth table: `boolean` is its own tag, distinct from
	/// `number`.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::Boolean(_) => "boolean",
			Value::List(_) => "list",
			Value::Tuple(_) => "tuple",
			Value::Object(_) => "object",
			Value::Function(_) => "function",
		}
	}

	/// Truthiness used by `if`/`while`/`!`/short-circuit `and`/`or`: `null`,
	/// `false`, `0`, and `""` are falsy; everything else is truthy.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Boolean(b) => *b,
			Value::Number(n) => *n != 0.0,
			Value::String(s) => !s.is_empty(),
			Value::List(l) => !l.borrow().is_empty(),
			Value::Tuple(t) => !t.is_empty(),
			Value::Object(o) => o.borrow().len() != 0,
			Value::Function(_) => true,
		}
	}

	/// Structural equality: same-tag values compare structurally, different
	/// tags are always unequal (no
	/// number/boolean coercion).
	pub fn structural_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Boolean(a), Value::Boolean(b)) => a == b,
			(Value::List(a), Value::List(b)) => {
				let a = a.borrow();
				let b = b.borrow();
				a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.read_raw().structural_eq(&y.read_raw()))
			}
			(Value::Tuple(a), Value::Tuple(b)) => {
				a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.read_raw().structural_eq(&y.read_raw()))
			}
			(Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
			(Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "null"),
			Value::Number(n) => write!(f, "{n}"),
			Value::String(s) => write!(f, "{s}"),
			Value::Boolean(b) => write!(f, "{b}"),
			Value::List(l) => {
				write!(f, "[")?;
				for (i, c) in l.borrow().iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}", c.read_raw())?;
				}
				write!(f, "]")
			}
			Value::Tuple(t) => {
				write!(f, "(")?;
				for (i, c) in t.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}", c.read_raw())?;
				}
				write!(f, ")")
			}
			Value::Object(o) => {
				write!(f, "{{")?;
				for (i, (k, c)) in o.borrow().iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}: {}", k, c.read_raw())?;
				}
				write!(f, "}}")
			}
			Value::Function(func) => write!(f, "<function {}>", func.name()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn capability_gates_read_write() {
		let readable = Container::new("x", Value::Number(1.0), Capability::Readable);
		assert!(readable.read().is_ok());
		assert!(readable.write(Value::Number(2.0)).is_err());

		let writeable = Container::new("y", Value::Number(1.0), Capability::Writeable);
		assert!(writeable.read().is_err());
		assert!(writeable.write(Value::Number(2.0)).is_ok());

		let transform = Container::new("z", Value::Number(1.0), Capability::Transform);
		assert!(transform.read().is_ok());
		assert!(transform.write(Value::Number(2.0)).is_ok());
	}

	#[test]
	fn structural_equality_rejects_cross_type() {
		let n = Value::Number(1.0);
		let b = Value::Boolean(true);
		assert!(!n.structural_eq(&b));
	}

	#[test]
	fn shared_container_mutation_visible_through_clone() {
		let c = Container::new("x", Value::Number(1.0), Capability::Transform);
		let alias = c.clone();
		alias.write(Value::Number(5.0)).unwrap();
		assert_eq!(c.read().unwrap().type_name(), "number");
		if let Value::Number(n) = c.read().unwrap() {
			assert_eq!(n, 5.0);
		} else {
			panic!("expected number");
		}
	}
}
