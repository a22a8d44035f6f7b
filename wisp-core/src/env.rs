use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::{Capability, Container, Value};

struct ScopeData {
	order: Vec<String>,
	entries: HashMap<String, Container>,
}

/// A single lexical frame: an ordered name → container map. Cheap to clone
/// (it's a shared handle to the same frame), which is what lets a closure's
/// captured frames stay mutable from both sides after capture.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
	pub fn new() -> Scope {
		Scope(Rc::new(RefCell::new(ScopeData { order: Vec::new(), entries: HashMap::new() })))
	}

	/// Declares a new binding in this frame. Redeclaring a name already
	/// present in the *same* frame is a `NameError`.
	pub fn declare(&self, name: &str, value: Value, capability: Capability) -> Result<Container> {
		let mut data = self.0.borrow_mut();
		if data.entries.contains_key(name) {
			return Err(Error::name(format!("`{name}` is already declared in this scope")));
		}
		let container = Container::new(name, value, capability);
		data.order.push(name.to_string());
		data.entries.insert(name.to_string(), container.clone());
		Ok(container)
	}

	pub fn get(&self, name: &str) -> Option<Container> {
		self.0.borrow().entries.get(name).cloned()
	}

	/// Binds an already-existing container under a (possibly different)
	/// local name, used for import bindings: the imported name aliases the
	/// exporting module's container rather than copying its value.
	pub fn declare_existing(&self, name: &str, container: Container) -> Result<()> {
		let mut data = self.0.borrow_mut();
		if data.entries.contains_key(name) {
			return Err(Error::name(format!("`{name}` is already declared in this scope")));
		}
		data.order.push(name.to_string());
		data.entries.insert(name.to_string(), container);
		Ok(())
	}

	pub fn names(&self) -> Vec<String> {
		self.0.borrow().order.clone()
	}
}

impl Default for Scope {
	fn default() -> Self {
		Scope::new()
	}
}

/// The ordered list of active lexical frames, innermost last. A function
/// call clones the stack it closed over (cheap: it clones `Scope` handles,
/// not their contents) and pushes one fresh frame for its parameters and
/// locals, so later writes to an outer variable remain visible to every
/// holder of that frame.
#[derive(Clone)]
pub struct Stack {
	frames: Vec<Scope>,
}

impl Stack {
	/// A stack with a single frame: the shared built-ins scope, lowest in
	/// the chain so user declarations always shadow it.
	pub fn with_builtins(builtins: Scope) -> Stack {
		Stack { frames: vec![builtins] }
	}

	pub fn push(&mut self, scope: Scope) {
		self.frames.push(scope);
	}

	pub fn pop(&mut self) {
		self.frames.pop();
	}

	pub fn top(&self) -> &Scope {
		self.frames.last().expect("stack must never be empty")
	}

	pub fn declare(&self, name: &str, value: Value, capability: Capability) -> Result<Container> {
		self.top().declare(name, value, capability)
	}

	/// Innermost-to-outermost lookup.
	pub fn lookup(&self, name: &str) -> Option<Container> {
		self.frames.iter().rev().find_map(|scope| scope.get(name))
	}

	pub fn assign(&self, name: &str, value: Value) -> Result<()> {
		let container = self.lookup(name).ok_or_else(|| Error::name(format!("`{name}` is not defined")))?;
		container.write(value)
	}

	pub fn depth(&self) -> usize {
		self.frames.len()
	}
}
