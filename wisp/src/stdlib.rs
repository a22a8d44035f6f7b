use std::io::{self, BufRead, Write};
use std::rc::Rc;

use wisp::builtins::{self, BuiltinDecl};
use wisp::env::Scope;
use wisp::error::{Error, Result};
use wisp::value::Value;

/// Registers the standard library into `scope`. Each built-in is declared
/// twice: under its internal `_builtin_*` name (matching the reference
/// implementation's naming, in case a module imports it explicitly) and
/// under the short name scripts actually call.
pub fn register_all(scope: &Scope) -> Result<()> {
	let mut decls = Vec::new();

	decls.extend(aliased("print", "_builtin_print", 1, print_fn));
	decls.extend(aliased("type", "_builtin_type", 1, type_fn));
	decls.extend(aliased("len", "_builtin_len", 1, len_fn));
	decls.extend(aliased("read_line", "_builtin_read_line", 0, read_line_fn));

	decls.push(BuiltinDecl::constant("_builtin_true", Value::Boolean(true)));
	decls.push(BuiltinDecl::constant("_builtin_false", Value::Boolean(false)));
	decls.push(BuiltinDecl::constant("_builtin_null", Value::Null));

	builtins::register(scope, decls)
}

fn aliased(
	public_name: &str,
	internal_name: &str,
	arity: usize,
	func: impl Fn(&[Value]) -> Result<Value> + 'static,
) -> Vec<BuiltinDecl> {
	let func: Rc<dyn Fn(&[Value]) -> Result<Value>> = Rc::new(func);
	vec![
		BuiltinDecl::Function { name: public_name.to_string(), arity, func: func.clone() },
		BuiltinDecl::Function { name: internal_name.to_string(), arity, func },
	]
}

fn print_fn(args: &[Value]) -> Result<Value> {
	println!("{}", args[0]);
	Ok(Value::Null)
}

fn type_fn(args: &[Value]) -> Result<Value> {
	Ok(Value::String(args[0].type_name().to_string()))
}

fn len_fn(args: &[Value]) -> Result<Value> {
	let n = match &args[0] {
		Value::String(s) => s.chars().count(),
		Value::List(list) => list.borrow().len(),
		Value::Tuple(tuple) => tuple.len(),
		Value::Object(obj) => obj.borrow().len(),
		other => return Err(Error::type_error(format!("`{}` has no length", other.type_name()))),
	};
	Ok(Value::Number(n as f64))
}

fn read_line_fn(_args: &[Value]) -> Result<Value> {
	io::stdout().flush().ok();
	let mut line = String::new();
	io::stdin()
		.lock()
		.read_line(&mut line)
		.map_err(|e| Error::value(format!("failed to read from stdin: {e}")))?;
	if line.ends_with('\n') {
		line.pop();
		if line.ends_with('\r') {
			line.pop();
		}
	}
	Ok(Value::String(line))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn type_name_matches_value_tag() {
		assert!(matches!(type_fn(&[Value::Number(1.0)]).unwrap(), Value::String(s) if s == "number"));
		assert!(matches!(type_fn(&[Value::Boolean(true)]).unwrap(), Value::String(s) if s == "boolean"));
	}

	#[test]
	fn len_rejects_non_sized_values() {
		let err = len_fn(&[Value::Null]).unwrap_err();
		assert!(matches!(err, Error::Type { .. }));
	}

	#[test]
	fn registers_both_public_and_internal_names() {
		let scope = Scope::new();
		register_all(&scope).unwrap();
		assert!(scope.get("print").is_some());
		assert!(scope.get("_builtin_print").is_some());
		assert!(scope.get("_builtin_true").is_some());
	}
}
