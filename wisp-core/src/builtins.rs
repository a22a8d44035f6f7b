use std::rc::Rc;

use crate::env::Scope;
use crate::error::Result;
use crate::value::{Capability, FunctionValue, Value};

/// A host-implemented function: takes already-evaluated arguments, returns
/// a value or an evaluator-visible error.
pub type HostFn = dyn Fn(&[Value]) -> Result<Value>;

/// One entry in a host's standard-library registration list. Kept separate
/// from `FunctionValue` so a host can describe its built-ins declaratively
/// before any `Scope` exists to put them in.
pub enum BuiltinDecl {
	Constant { name: String, value: Value },
	Function { name: String, arity: usize, func: Rc<HostFn> },
}

impl BuiltinDecl {
	pub fn constant(name: impl Into<String>, value: Value) -> BuiltinDecl {
		BuiltinDecl::Constant { name: name.into(), value }
	}

	pub fn function(name: impl Into<String>, arity: usize, func: impl Fn(&[Value]) -> Result<Value> + 'static) -> BuiltinDecl {
		BuiltinDecl::Function { name: name.into(), arity, func: Rc::new(func) }
	}
}

/// Declares every built-in into `scope`, which the caller then uses as the
/// outermost layer of every module's `Stack` — built-ins sit below every
/// user declaration, never above.
pub fn register(scope: &Scope, decls: Vec<BuiltinDecl>) -> Result<()> {
	for decl in decls {
		match decl {
			BuiltinDecl::Constant { name, value } => {
				scope.declare(&name, value, Capability::Readable)?;
			}
			BuiltinDecl::Function { name, arity, func } => {
				let function = FunctionValue::Host { name: name.clone(), arity, func };
				scope.declare(&name, Value::Function(Rc::new(function)), Capability::Readable)?;
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registers_constants_and_functions() {
		let scope = Scope::new();
		let decls = vec![
			BuiltinDecl::constant("null_value", Value::Null),
			BuiltinDecl::function("identity", 1, |args| Ok(args[0].clone())),
		];
		register(&scope, decls).unwrap();
		assert!(matches!(scope.get("null_value").unwrap().read().unwrap(), Value::Null));
		assert!(matches!(scope.get("identity").unwrap().read().unwrap(), Value::Function(_)));
	}

	#[test]
	fn registering_the_same_name_twice_is_rejected() {
		let scope = Scope::new();
		register(&scope, vec![BuiltinDecl::constant("x", Value::Null)]).unwrap();
		let err = register(&scope, vec![BuiltinDecl::constant("x", Value::Null)]).unwrap_err();
		assert!(matches!(err, crate::error::Error::Name { .. }));
	}
}
