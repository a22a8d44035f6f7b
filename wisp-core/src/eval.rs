use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::{Expr, Param, Stmt};
use crate::env::{Scope, Stack};
use crate::error::{Error, Result};
use crate::module::ModuleRegistry;
use crate::resolver::Resolver;
use crate::token::TokenKind;
use crate::value::{Capability, Container, FunctionValue, ObjectData, ObjectKey, Value};

/// Internal control-flow signal, distinct from `Error` so `break`/
/// `continue`/`return` can unwind through statement execution without being
/// mistaken for a failure.
enum Signal {
	Normal,
	Break,
	Continue,
	Return(Value),
}

/// Walks a resolved module graph, executing each module once in
/// dependency-first order and wiring `import`/`export` bindings between
/// them.
pub struct Evaluator {
	resolver: Resolver,
	builtins: Scope,
	exports: HashMap<PathBuf, HashMap<String, Container>>,
}

impl Evaluator {
	pub fn new(resolver: Resolver, builtins: Scope) -> Self {
		Evaluator { resolver, builtins, exports: HashMap::new() }
	}

	pub fn run(&mut self, registry: &ModuleRegistry) -> Result<()> {
		for path in &registry.order {
			let module = registry.get(path).expect("module in evaluation order must be registered");
			let mut stack = Stack::with_builtins(self.builtins.clone());
			stack.push(Scope::new());
			tracing::debug!(module = %path.display(), "evaluating module");
			self.exec_top_level(path, &module.program, &mut stack)?;
		}
		Ok(())
	}

	fn exec_top_level(&mut self, module_path: &Path, program: &[Stmt], stack: &mut Stack) -> Result<()> {
		for stmt in program {
			match stmt {
				Stmt::Import { path, items, .. } => self.exec_import(module_path, path, items, stack)?,
				Stmt::Export { decl, .. } => self.exec_export(module_path, decl, stack)?,
				other => {
					self.exec_stmt(other, stack)?;
				}
			}
		}
		Ok(())
	}

	fn exec_import(
		&mut self,
		module_path: &Path,
		spec: &crate::token::Token,
		items: &Option<Vec<crate::token::Token>>,
		stack: &mut Stack,
	) -> Result<()> {
		let dep_path = self.resolver.resolve(module_path, &spec.lexeme)?;
		let dep_exports = self
			.exports
			.get(&dep_path)
			.ok_or_else(|| Error::import(format!("`{}` has not been evaluated yet (import cycle?)", dep_path.display())))?
			.clone();

		match items {
			None => {
				for (name, container) in &dep_exports {
					stack.top().declare_existing(name, container.clone())?;
				}
			}
			Some(names) => {
				for tok in names {
					let container = dep_exports
						.get(&tok.lexeme)
						.ok_or_else(|| Error::import(format!("`{}` does not export `{}`", dep_path.display(), tok.lexeme)))?;
					stack.top().declare_existing(&tok.lexeme, container.clone())?;
				}
			}
		}
		Ok(())
	}

	fn exec_export(&mut self, module_path: &Path, decl: &Stmt, stack: &mut Stack) -> Result<()> {
		self.exec_stmt(decl, stack)?;
		let name = match decl {
			Stmt::ConstDecl { name, .. } => &name.lexeme,
			Stmt::FunctionDecl { name, .. } => &name.lexeme,
			_ => return Err(Error::parameter("only `const` and `function` declarations may be exported")),
		};
		let container = stack.top().get(name).expect("just-declared export must be in scope");
		self.exports.entry(module_path.to_path_buf()).or_default().insert(name.clone(), container);
		Ok(())
	}

	fn exec_stmt(&mut self, stmt: &Stmt, stack: &mut Stack) -> Result<Signal> {
		match stmt {
			Stmt::Expression(expr) => {
				self.eval_expr(expr, stack)?;
				Ok(Signal::Normal)
			}
			Stmt::Block(stmts) => self.exec_block(stmts, stack),
			Stmt::VarDecl { name, init } => {
				let value = match init {
					Some(expr) => self.eval_expr(expr, stack)?,
					None => Value::Null,
				};
				stack.declare(&name.lexeme, value, Capability::Transform)?;
				Ok(Signal::Normal)
			}
			Stmt::ConstDecl { name, init } => {
				let value = self.eval_expr(init, stack)?;
				stack.declare(&name.lexeme, value, Capability::Readable)?;
				Ok(Signal::Normal)
			}
			Stmt::If { cond, then_branch, else_branch } => {
				if self.eval_expr(cond, stack)?.is_truthy() {
					self.exec_stmt(then_branch, stack)
				} else if let Some(branch) = else_branch {
					self.exec_stmt(branch, stack)
				} else {
					Ok(Signal::Normal)
				}
			}
			Stmt::While { cond, body } => {
				while self.eval_expr(cond, stack)?.is_truthy() {
					match self.exec_stmt(body, stack)? {
						Signal::Break => break,
						Signal::Return(v) => return Ok(Signal::Return(v)),
						Signal::Continue | Signal::Normal => {}
					}
				}
				Ok(Signal::Normal)
			}
			Stmt::For { init, cond, incr, body } => {
				stack.push(Scope::new());
				let result = self.exec_for(init, cond, incr, body, stack);
				stack.pop();
				result
			}
			Stmt::Break(_) => Ok(Signal::Break),
			Stmt::Continue(_) => Ok(Signal::Continue),
			Stmt::FunctionDecl { name, params, body } => {
				let function = FunctionValue::User {
					name: name.lexeme.clone(),
					params: params.clone(),
					body: Rc::new(body.clone()),
					closure: stack.clone(),
				};
				stack.declare(&name.lexeme, Value::Function(Rc::new(function)), Capability::Readable)?;
				Ok(Signal::Normal)
			}
			Stmt::Return { value, .. } => {
				let v = match value {
					Some(expr) => self.eval_expr(expr, stack)?,
					None => Value::Null,
				};
				Ok(Signal::Return(v))
			}
			Stmt::Import { .. } | Stmt::Export { .. } => {
				Err(Error::expression("`import`/`export` are only allowed at module top level"))
			}
		}
	}

	fn exec_for(&mut self, init: &Stmt, cond: &Expr, incr: &Expr, body: &Stmt, stack: &mut Stack) -> Result<Signal> {
		if !matches!(self.exec_stmt(init, stack)?, Signal::Normal) {
			return Err(Error::expression("`for` initializer may not break, continue, or return"));
		}
		while self.eval_expr(cond, stack)?.is_truthy() {
			match self.exec_stmt(body, stack)? {
				Signal::Break => break,
				Signal::Return(v) => return Ok(Signal::Return(v)),
				Signal::Continue | Signal::Normal => {}
			}
			self.eval_expr(incr, stack)?;
		}
		Ok(Signal::Normal)
	}

	fn exec_block(&mut self, stmts: &[Stmt], stack: &mut Stack) -> Result<Signal> {
		stack.push(Scope::new());
		let mut result = Signal::Normal;
		for stmt in stmts {
			match self.exec_stmt(stmt, stack) {
				Ok(Signal::Normal) => {}
				Ok(signal) => {
					result = signal;
					break;
				}
				Err(e) => {
					stack.pop();
					return Err(e);
				}
			}
		}
		stack.pop();
		Ok(result)
	}

	fn eval_expr(&mut self, expr: &Expr, stack: &mut Stack) -> Result<Value> {
		match expr {
			Expr::Null(_) => Ok(Value::Null),
			Expr::Literal(tok) => literal_value(tok),
			Expr::Identifier(tok) => stack
				.lookup(&tok.lexeme)
				.ok_or_else(|| Error::name(format!("`{}` is not defined", tok.lexeme)))?
				.read(),
			Expr::PrefixUnary { op, operand } => self.eval_prefix(op.kind, operand, stack),
			Expr::SuffixUnary { op, operand } => self.eval_suffix(op.kind, operand, stack),
			Expr::Binary { op, left, right } => self.eval_binary(op.kind, left, right, stack),
			Expr::Grouping { opening, items } => self.eval_grouping(opening.kind, items, stack),
			Expr::GroupingApplication { callee, grouping } => self.eval_application(callee, grouping, stack),
			Expr::Association { entries, .. } => self.eval_association(entries, stack),
		}
	}

	fn eval_prefix(&mut self, op: TokenKind, operand: &Expr, stack: &mut Stack) -> Result<Value> {
		match op {
			TokenKind::Bang => Ok(Value::Boolean(!self.eval_expr(operand, stack)?.is_truthy())),
			TokenKind::Minus => Ok(Value::Number(-as_number(&self.eval_expr(operand, stack)?)?)),
			TokenKind::Plus => Ok(Value::Number(as_number(&self.eval_expr(operand, stack)?)?)),
			TokenKind::Tilde => Ok(Value::Number(!(as_number(&self.eval_expr(operand, stack)?)? as i64) as f64)),
			TokenKind::Increment | TokenKind::Decrement => {
				let container = self.lvalue_container(operand, stack, false)?;
				let old = as_number(&container.read()?)?;
				let new = if op == TokenKind::Increment { old + 1.0 } else { old - 1.0 };
				container.write(Value::Number(new))?;
				Ok(Value::Number(new))
			}
			_ => unreachable!("unexpected prefix operator {op:?}"),
		}
	}

	fn eval_suffix(&mut self, op: TokenKind, operand: &Expr, stack: &mut Stack) -> Result<Value> {
		let container = self.lvalue_container(operand, stack, false)?;
		let old = as_number(&container.read()?)?;
		let new = if op == TokenKind::Increment { old + 1.0 } else { old - 1.0 };
		container.write(Value::Number(new))?;
		Ok(Value::Number(old))
	}

	fn eval_binary(&mut self, op: TokenKind, left: &Expr, right: &Expr, stack: &mut Stack) -> Result<Value> {
		if op == TokenKind::And {
			let lv = self.eval_expr(left, stack)?;
			return if !lv.is_truthy() { Ok(lv) } else { self.eval_expr(right, stack) };
		}
		if op == TokenKind::Or {
			let lv = self.eval_expr(left, stack)?;
			return if lv.is_truthy() { Ok(lv) } else { self.eval_expr(right, stack) };
		}
		if let Some(base) = assignment_base_op(op) {
			let container = self.lvalue_container(left, stack, true)?;
			let rhs = self.eval_expr(right, stack)?;
			let new_value = match base {
				Some(arith) => apply_binary_op(arith, &container.read()?, &rhs)?,
				None => rhs,
			};
			container.write(new_value.clone())?;
			return Ok(new_value);
		}

		let lv = self.eval_expr(left, stack)?;
		let rv = self.eval_expr(right, stack)?;
		apply_binary_op(op, &lv, &rv)
	}

	fn eval_grouping(&mut self, opening: TokenKind, items: &[Expr], stack: &mut Stack) -> Result<Value> {
		match opening {
			TokenKind::LParen => {
				if items.len() == 1 {
					self.eval_expr(&items[0], stack)
				} else {
					let mut containers = Vec::with_capacity(items.len());
					for item in items {
						containers.push(Container::anonymous(self.eval_expr(item, stack)?, Capability::Readable));
					}
					Ok(Value::tuple(containers))
				}
			}
			TokenKind::LBracket => {
				let mut containers = Vec::with_capacity(items.len());
				for item in items {
					containers.push(Container::anonymous(self.eval_expr(item, stack)?, Capability::Transform));
				}
				Ok(Value::list(containers))
			}
			other => unreachable!("unexpected grouping delimiter {other:?}"),
		}
	}

	fn eval_application(&mut self, callee: &Expr, grouping: &Expr, stack: &mut Stack) -> Result<Value> {
		let Expr::Grouping { opening, items } = grouping else {
			unreachable!("GroupingApplication's grouping field is always a Grouping");
		};
		match opening.kind {
			TokenKind::LParen => {
				let callee_value = self.eval_expr(callee, stack)?;
				let mut args = Vec::with_capacity(items.len());
				for item in items {
					args.push(self.eval_expr(item, stack)?);
				}
				match callee_value {
					Value::Function(f) => self.call_function(&f, args),
					other => Err(Error::type_error(format!("`{}` is not callable", other.type_name()))),
				}
			}
			TokenKind::LBracket | TokenKind::Dot => {
				let base = self.eval_expr(callee, stack)?;
				let index = self.eval_expr(&items[0], stack)?;
				self.container_for_index(&base, &index, false)?.read()
			}
			other => unreachable!("unexpected application delimiter {other:?}"),
		}
	}

	fn eval_association(&mut self, entries: &[(Expr, Expr)], stack: &mut Stack) -> Result<Value> {
		let mut object = ObjectData::default();
		for (key_expr, value_expr) in entries {
			let key_value = self.eval_expr(key_expr, stack)?;
			let key = ObjectKey::from_value(&key_value)?;
			let value = self.eval_expr(value_expr, stack)?;
			object.insert(key, Container::anonymous(value, Capability::Transform));
		}
		Ok(Value::Object(Rc::new(RefCell::new(object))))
	}

	/// Resolves an expression used on the left of `=`/`+=`/etc. (or as the
	/// operand of `++`/`--`) to the container it should read from or write
	/// to. `create_if_missing` lets `obj.newKey = 1` define a fresh object
	/// entry without allowing the same for list indices, which must already
	/// exist.
	fn lvalue_container(&mut self, target: &Expr, stack: &mut Stack, create_if_missing: bool) -> Result<Container> {
		match target {
			Expr::Identifier(tok) => {
				stack.lookup(&tok.lexeme).ok_or_else(|| Error::name(format!("`{}` is not defined", tok.lexeme)))
			}
			Expr::GroupingApplication { callee, grouping } => {
				let Expr::Grouping { opening, items } = grouping.as_ref() else {
					return Err(Error::expression("invalid assignment target"));
				};
				if !matches!(opening.kind, TokenKind::LBracket | TokenKind::Dot) {
					return Err(Error::expression("cannot assign to the result of a call"));
				}
				let base = self.eval_expr(callee, stack)?;
				let index = self.eval_expr(&items[0], stack)?;
				self.container_for_index(&base, &index, create_if_missing)
			}
			_ => Err(Error::expression("invalid assignment target")),
		}
	}

	fn container_for_index(&self, base: &Value, index: &Value, create_if_missing: bool) -> Result<Container> {
		match base {
			Value::List(list) => {
				let i = as_index(index)?;
				list.borrow().get(i).cloned().ok_or_else(|| Error::value(format!("list index {i} out of range")))
			}
			Value::Tuple(tuple) => {
				let i = as_index(index)?;
				tuple.get(i).cloned().ok_or_else(|| Error::value(format!("tuple index {i} out of range")))
			}
			Value::Object(obj) => {
				let key = ObjectKey::from_value(index)?;
				if let Some(c) = obj.borrow().get(&key) {
					return Ok(c.clone());
				}
				if create_if_missing {
					let c = Container::anonymous(Value::Null, Capability::Transform);
					obj.borrow_mut().insert(key, c.clone());
					Ok(c)
				} else {
					Err(Error::value(format!("object has no key `{key}`")))
				}
			}
			other => Err(Error::type_error(format!("`{}` is not indexable", other.type_name()))),
		}
	}

	/// Invokes a function value. For a user function this pushes one fresh
	/// frame onto a clone of the closure it was declared in: arguments bind
	/// left-to-right, trailing unsupplied parameters fall back to their
	/// default expression (evaluated in the call's own frame, so later
	/// defaults may reference earlier parameters), and a bare `return` or
	/// falling off the end yields `null`.
	fn call_function(&mut self, function: &FunctionValue, args: Vec<Value>) -> Result<Value> {
		match function {
			FunctionValue::Host { name, arity, func } => {
				if args.len() != *arity {
					return Err(Error::value(format!("`{name}` expects {arity} argument(s), got {}", args.len())));
				}
				func(&args)
			}
			FunctionValue::User { name, params, body, closure } => {
				let required = required_arity(name, params)?;
				if args.len() < required || args.len() > params.len() {
					return Err(Error::value(format!(
						"`{name}` expects {}{} argument(s), got {}",
						required,
						if required == params.len() { String::new() } else { format!("..={}", params.len()) },
						args.len()
					)));
				}
				let mut call_stack = closure.clone();
				call_stack.push(Scope::new());
				for (i, param) in params.iter().enumerate() {
					let value = if let Some(arg) = args.get(i) {
						arg.clone()
					} else if let Some(default) = &param.default {
						self.eval_expr(default, &mut call_stack)?
					} else {
						unreachable!("required_arity guarantees every unsupplied parameter has a default");
					};
					call_stack.declare(&param.name.lexeme, value, Capability::Transform)?;
				}

				let mut result = Value::Null;
				for stmt in body.iter() {
					match self.exec_stmt(stmt, &mut call_stack)? {
						Signal::Normal => {}
						Signal::Return(v) => {
							result = v;
							break;
						}
						Signal::Break | Signal::Continue => {
							return Err(Error::expression("`break`/`continue` outside of a loop"));
						}
					}
				}
				Ok(result)
			}
		}
	}
}

fn literal_value(tok: &crate::token::Token) -> Result<Value> {
	match tok.kind {
		TokenKind::Number => tok
			.lexeme
			.parse::<f64>()
			.map(Value::Number)
			.map_err(|_| Error::value(format!("invalid number literal `{}`", tok.lexeme))),
		TokenKind::String => Ok(Value::String(tok.lexeme.clone())),
		TokenKind::True => Ok(Value::Boolean(true)),
		TokenKind::False => Ok(Value::Boolean(false)),
		TokenKind::Null => Ok(Value::Null),
		other => unreachable!("unexpected literal token kind {other:?}"),
	}
}

/// Counts the required (no-default) parameters, validating that they form
/// a contiguous prefix before any optional one — a required parameter
/// following an optional one is a `ParameterError` raised here, at call
/// time (not at parse time: see `parser::parse_params`).
fn required_arity(name: &str, params: &[Param]) -> Result<usize> {
	let mut seen_optional = false;
	let mut required = 0;
	for param in params {
		if param.default.is_some() {
			seen_optional = true;
		} else if seen_optional {
			return Err(Error::parameter(format!(
				"`{name}` has required parameter `{}` following an optional one",
				param.name.lexeme
			)));
		} else {
			required += 1;
		}
	}
	Ok(required)
}

fn as_number(value: &Value) -> Result<f64> {
	match value {
		Value::Number(n) => Ok(*n),
		other => Err(Error::type_error(format!("expected a number, found `{}`", other.type_name()))),
	}
}

fn as_index(value: &Value) -> Result<usize> {
	let n = as_number(value)?;
	if n.fract() != 0.0 || n < 0.0 {
		return Err(Error::value(format!("`{n}` is not a valid index")));
	}
	Ok(n as usize)
}

/// Maps a compound-assignment operator to the arithmetic op it performs
/// before writing back. Returns `Some(None)` for plain `=` (no arithmetic,
/// just a write) and `None` for operators that are not assignments at all.
fn assignment_base_op(op: TokenKind) -> Option<Option<TokenKind>> {
	use TokenKind::*;
	Some(match op {
		Assign => None,
		PlusEq => Some(Plus),
		MinusEq => Some(Minus),
		StarEq => Some(Star),
		SlashEq => Some(Slash),
		PercentEq => Some(Percent),
		PowEq => Some(Pow),
		AmpEq => Some(Amp),
		PipeEq => Some(Pipe),
		CaretEq => Some(Caret),
		ShlEq => Some(Shl),
		ShrEq => Some(Shr),
		_ => return None,
	})
}

fn apply_binary_op(op: TokenKind, left: &Value, right: &Value) -> Result<Value> {
	use TokenKind::*;
	match op {
		Eq => Ok(Value::Boolean(left.structural_eq(right))),
		NotEq => Ok(Value::Boolean(!left.structural_eq(right))),
		Plus => match (left, right) {
			(Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!("{left}{right}"))),
			_ => Ok(Value::Number(as_number(left)? + as_number(right)?)),
		},
		Minus => Ok(Value::Number(as_number(left)? - as_number(right)?)),
		Star => Ok(Value::Number(as_number(left)? * as_number(right)?)),
		Slash => {
			let divisor = as_number(right)?;
			if divisor == 0.0 {
				return Err(Error::value("division by zero"));
			}
			Ok(Value::Number(as_number(left)? / divisor))
		}
		Percent => {
			let divisor = as_number(right)?;
			if divisor == 0.0 {
				return Err(Error::value("division by zero"));
			}
			Ok(Value::Number(as_number(left)? % divisor))
		}
		Pow => {
			let base = as_number(left)?;
			if base < 0.0 {
				return Err(Error::value("exponentiation requires a non-negative base"));
			}
			Ok(Value::Number(base.powf(as_number(right)?)))
		}
		Lt | Le | Gt | Ge => compare(op, left, right),
		Amp => Ok(Value::Number(((as_number(left)? as i64) & (as_number(right)? as i64)) as f64)),
		Pipe => Ok(Value::Number(((as_number(left)? as i64) | (as_number(right)? as i64)) as f64)),
		Caret => Ok(Value::Number(((as_number(left)? as i64) ^ (as_number(right)? as i64)) as f64)),
		Shl => Ok(Value::Number(((as_number(left)? as i64) << (as_number(right)? as i64)) as f64)),
		Shr => Ok(Value::Number(((as_number(left)? as i64) >> (as_number(right)? as i64)) as f64)),
		other => unreachable!("unexpected binary operator {other:?}"),
	}
}

fn compare(op: TokenKind, left: &Value, right: &Value) -> Result<Value> {
	use std::cmp::Ordering;
	let ordering = match (left, right) {
		(Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
		_ => {
			return Err(Error::type_error(format!(
				"cannot order-compare `{}` and `{}`: ordering is numeric only",
				left.type_name(),
				right.type_name()
			)))
		}
	}
	.ok_or_else(|| Error::value("comparison involving NaN"))?;
	let result = match op {
		TokenKind::Lt => ordering == Ordering::Less,
		TokenKind::Le => ordering != Ordering::Greater,
		TokenKind::Gt => ordering == Ordering::Greater,
		TokenKind::Ge => ordering != Ordering::Less,
		_ => unreachable!(),
	};
	Ok(Value::Boolean(result))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::Lexer;
	use crate::parser;
	use std::path::PathBuf;

	fn run_source(source: &str) -> Result<Evaluator> {
		let tokens = Lexer::new(source).tokenize().unwrap();
		let program = parser::parse(tokens).unwrap();
		let registry = ModuleRegistry::single(PathBuf::from("/t.wisp"), program);
		let resolver = Resolver::default();
		let builtins = Scope::new();
		builtins
			.declare(
				"double",
				Value::Function(Rc::new(FunctionValue::Host {
					name: "double".into(),
					arity: 1,
					func: Rc::new(|args: &[Value]| Ok(Value::Number(as_number(&args[0])? * 2.0))),
				})),
				Capability::Readable,
			)
			.unwrap();
		let mut evaluator = Evaluator::new(resolver, builtins);
		evaluator.run(&registry)?;
		Ok(evaluator)
	}

	fn export_of(evaluator: &Evaluator, name: &str) -> Value {
		evaluator.exports.get(&PathBuf::from("/t.wisp")).unwrap().get(name).unwrap().read().unwrap()
	}

	#[test]
	fn arithmetic_and_precedence() {
		let evaluator = run_source("export const result = 1 + 2 * 3;").unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Number(n) if n == 7.0));
	}

	#[test]
	fn closures_share_captured_scope() {
		let source = r#"
			var counter = 0;
			function increment() { counter = counter + 1; return counter; }
			increment();
			increment();
			export const result = increment();
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Number(n) if n == 3.0));
	}

	#[test]
	fn short_circuit_or_returns_operand_value() {
		let evaluator = run_source(r#"export const result = false or "fallback";"#).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::String(s) if s == "fallback"));
	}

	#[test]
	fn short_circuit_and_skips_right_side_effects() {
		let source = r#"
			var touched = false;
			function mark() { touched = true; return true; }
			var guard = false and mark();
			export const result = touched;
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Boolean(false)));
	}

	#[test]
	fn dynamic_object_key_assignment_creates_entry() {
		let source = r#"
			var obj = {};
			obj.name = "a";
			obj["count"] = 1;
			export const result = obj.name;
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::String(s) if s == "a"));
	}

	#[test]
	fn default_parameters_fill_missing_arguments() {
		let source = r#"
			function greet(name, greeting = "hello") { return greeting; }
			export const result = greet("x");
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::String(s) if s == "hello"));
	}

	#[test]
	fn too_few_arguments_is_value_error() {
		let tokens = Lexer::new("function f(a, b) { return a; } f(1);").tokenize().unwrap();
		let program = parser::parse(tokens).unwrap();
		let registry = ModuleRegistry::single(PathBuf::from("/t.wisp"), program);
		let resolver = Resolver::default();
		let mut evaluator = Evaluator::new(resolver, Scope::new());
		let err = evaluator.run(&registry).unwrap_err();
		assert!(matches!(err, Error::Value { .. }));
	}

	#[test]
	fn too_many_arguments_is_value_error() {
		let source = r#"
			function g(a, b = 10) { return a + b; }
			export const result = g(1, 2, 3);
		"#;
		let err = run_source(source).unwrap_err();
		assert!(matches!(err, Error::Value { .. }));
	}

	#[test]
	fn default_parameters_cover_missing_and_extra_cases() {
		let source = r#"
			function g(a, b = 10) { return a + b; }
			export const one = g(1);
			export const two = g(1, 2);
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "one"), Value::Number(n) if n == 11.0));
		assert!(matches!(export_of(&evaluator, "two"), Value::Number(n) if n == 3.0));
	}

	#[test]
	fn required_parameter_after_optional_is_parameter_error_at_call_time() {
		let source = "function f(a = 1, b) { return b; } f(1, 2);";
		let tokens = Lexer::new(source).tokenize().unwrap();
		let program = parser::parse(tokens).unwrap();
		let registry = ModuleRegistry::single(PathBuf::from("/t.wisp"), program);
		let resolver = Resolver::default();
		let mut evaluator = Evaluator::new(resolver, Scope::new());
		let err = evaluator.run(&registry).unwrap_err();
		assert!(matches!(err, Error::Parameter { .. }));
	}

	#[test]
	fn host_function_call_through_builtins_scope() {
		let evaluator = run_source("export const result = double(21);").unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Number(n) if n == 42.0));
	}

	#[test]
	fn compound_assign_writes_back_to_lhs() {
		let source = r#"
			var total = 1;
			total += 2 * 3;
			export const result = total;
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Number(n) if n == 7.0));
	}

	#[test]
	fn bitwise_operators_round_to_integer() {
		let evaluator = run_source("export const result = 5.9 & 3.2;").unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Number(n) if n == 1.0));
	}

	#[test]
	fn break_exits_enclosing_loop_only() {
		let source = r#"
			var sum = 0;
			for (var i = 0; i < 10; i = i + 1) {
				if (i == 3) { break; }
				sum = sum + i;
			}
			export const result = sum;
		"#;
		let evaluator = run_source(source).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Number(n) if n == 3.0));
	}

	#[test]
	fn division_by_zero_is_value_error() {
		let err = run_source("export const result = 1 / 0;").unwrap_err();
		assert!(matches!(err, Error::Value { .. }));
	}

	#[test]
	fn negative_base_exponent_is_value_error() {
		let err = run_source("export const result = (0 - 2) ** 2;").unwrap_err();
		assert!(matches!(err, Error::Value { .. }));
	}

	#[test]
	fn import_nested_inside_a_block_is_expression_error() {
		let err = run_source(r#"if (true) { import * from "./x"; }"#).unwrap_err();
		assert!(matches!(err, Error::Expression { .. }));
	}

	#[test]
	fn numbers_order_compare() {
		let evaluator = run_source("export const result = 1 < 2;").unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Boolean(true)));
	}

	#[test]
	fn strings_cannot_order_compare() {
		let err = run_source(r#"export const result = "a" < "b";"#).unwrap_err();
		assert!(matches!(err, Error::Type { .. }));
	}

	#[test]
	fn strings_still_support_equality() {
		let evaluator = run_source(r#"export const result = "a" == "a";"#).unwrap();
		assert!(matches!(export_of(&evaluator, "result"), Value::Boolean(true)));
	}

	fn run_registry(registry: &ModuleRegistry) -> Result<Evaluator> {
		let resolver = Resolver::default();
		let mut evaluator = Evaluator::new(resolver, Scope::new());
		evaluator.run(registry)?;
		Ok(evaluator)
	}

	fn parse(source: &str) -> Vec<Stmt> {
		let tokens = Lexer::new(source).tokenize().unwrap();
		parser::parse(tokens).unwrap()
	}

	#[test]
	fn cross_module_import_reads_the_exported_value() {
		let lib = parse("export const answer = 42;");
		let main = parse(r#"import { answer } from "./lib"; export const result = answer;"#);
		let registry = ModuleRegistry::multi(vec![(PathBuf::from("/proj/lib.wisp"), lib), (PathBuf::from("/proj/main.wisp"), main)]);
		let evaluator = run_registry(&registry).unwrap();
		assert!(matches!(export_of_path(&evaluator, "/proj/main.wisp", "result"), Value::Number(n) if n == 42.0));
	}

	#[test]
	fn missing_import_name_is_import_error() {
		let lib = parse("export const answer = 42;");
		let main = parse(r#"import { nonexistent } from "./lib";"#);
		let registry = ModuleRegistry::multi(vec![(PathBuf::from("/proj/lib.wisp"), lib), (PathBuf::from("/proj/main.wisp"), main)]);
		let err = run_registry(&registry).unwrap_err();
		assert!(matches!(err, Error::Import { .. }));
	}

	fn export_of_path(evaluator: &Evaluator, path: &str, name: &str) -> Value {
		evaluator.exports.get(&PathBuf::from(path)).unwrap().get(name).unwrap().read().unwrap()
	}
}
