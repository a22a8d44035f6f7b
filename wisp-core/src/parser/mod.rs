mod precedence;

use crate::ast::{Expr, Param, Stmt};
use crate::error::{Error, Result};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parses a filtered token stream (comments/space/newline already dropped)
/// into a program: a flat list of top-level statements.
pub struct Parser {
	tokens: Vec<Token>,
	index: usize,
}

pub fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>> {
	// `Newline` survives this filter — it's significant to the parser as a
	// statement terminator, unlike `Space` and `Comment`.
	let significant: Vec<Token> = tokens.into_iter().filter(|t| t.kind != TokenKind::Space && t.kind != TokenKind::Comment).collect();
	let mut parser = Parser { tokens: significant, index: 0 };
	let mut program = Vec::new();
	parser.skip_newlines();
	while !parser.is_at_end() {
		program.push(parser.parse_declaration()?);
		parser.skip_newlines();
	}
	tracing::debug!(statements = program.len(), "parsed module");
	Ok(program)
}

impl Parser {
	fn peek(&self) -> &Token {
		&self.tokens[self.index]
	}

	fn peek_kind(&self) -> TokenKind {
		self.peek().kind
	}

	fn is_at_end(&self) -> bool {
		self.peek_kind() == TokenKind::Eof
	}

	fn advance(&mut self) -> Token {
		let tok = self.tokens[self.index].clone();
		if self.index + 1 < self.tokens.len() {
			self.index += 1;
		}
		tok
	}

	fn check(&self, kind: TokenKind) -> bool {
		self.peek_kind() == kind
	}

	fn match_token(&mut self, kind: TokenKind) -> Option<Token> {
		if self.check(kind) {
			Some(self.advance())
		} else {
			None
		}
	}

	fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token> {
		if self.check(kind) {
			Ok(self.advance())
		} else {
			Err(Error::parser(
				format!("expected {kind} {context}, found {}", self.peek_kind()),
				Span::at(self.peek().position),
			))
		}
	}

	/// Newlines are whitespace inside groupings, associations, and parameter
	/// lists — only a simple statement treats one as significant.
	fn skip_newlines(&mut self) {
		while self.check(TokenKind::Newline) {
			self.advance();
		}
	}

	// ---- declarations ----

	fn parse_declaration(&mut self) -> Result<Stmt> {
		if self.check(TokenKind::Export) {
			let start = self.advance();
			let decl = match self.peek_kind() {
				TokenKind::Const => self.parse_const_decl()?,
				TokenKind::Function => self.parse_function_decl()?,
				_ => {
					return Err(Error::parser("`export` may only wrap a const or function declaration", Span::at(start.position)));
				}
			};
			let span = Span::at(start.position).to(decl.last_span());
			return Ok(Stmt::Export { decl: Box::new(decl), span });
		}
		if self.check(TokenKind::Import) {
			return self.parse_import();
		}
		if self.check(TokenKind::Var) {
			return self.parse_var_decl();
		}
		if self.check(TokenKind::Const) {
			return self.parse_const_decl();
		}
		if self.check(TokenKind::Function) {
			return self.parse_function_decl();
		}
		self.parse_statement()
	}

	fn parse_import(&mut self) -> Result<Stmt> {
		let start = self.advance(); // `import`
		let items = if self.match_token(TokenKind::Star).is_some() {
			None
		} else {
			self.expect(TokenKind::LBrace, "to start an import list")?;
			self.skip_newlines();
			let mut names = Vec::new();
			if !self.check(TokenKind::RBrace) {
				loop {
					names.push(self.expect(TokenKind::Ident, "in import list")?);
					self.skip_newlines();
					if self.match_token(TokenKind::Comma).is_none() {
						break;
					}
					self.skip_newlines();
				}
			}
			self.expect(TokenKind::RBrace, "to close an import list")?;
			Some(names)
		};
		self.expect(TokenKind::From, "after import selector")?;
		let path = self.expect(TokenKind::String, "naming the imported module")?;
		let end = self.terminate_statement()?;
		Ok(Stmt::Import { path, items, span: Span::at(start.position).to(Span::at(end.position)) })
	}

	fn parse_var_decl(&mut self) -> Result<Stmt> {
		self.advance(); // `var`
		let name = self.expect(TokenKind::Ident, "after `var`")?;
		let init = if self.match_token(TokenKind::Assign).is_some() { Some(self.parse_expr()?) } else { None };
		self.terminate_statement()?;
		Ok(Stmt::VarDecl { name, init })
	}

	fn parse_const_decl(&mut self) -> Result<Stmt> {
		self.advance(); // `const`
		let name = self.expect(TokenKind::Ident, "after `const`")?;
		self.expect(TokenKind::Assign, "a `const` must be initialized")?;
		let init = self.parse_expr()?;
		self.terminate_statement()?;
		Ok(Stmt::ConstDecl { name, init })
	}

	fn parse_function_decl(&mut self) -> Result<Stmt> {
		self.advance(); // `function`
		let name = self.expect(TokenKind::Ident, "after `function`")?;
		self.expect(TokenKind::LParen, "to start the parameter list")?;
		let params = self.parse_params()?;
		self.expect(TokenKind::RParen, "to close the parameter list")?;
		self.expect(TokenKind::LBrace, "to start the function body")?;
		let body = self.parse_block_statements()?;
		Ok(Stmt::FunctionDecl { name, params, body })
	}

	/// Parses the parameter list without judging whether a required
	/// parameter follows an optional one — that is a `ParameterError` raised
	/// when the function is *called*, not a parse error, so a syntactically
	/// well-formed but ill-ordered list like
	/// `f(a = 1, b)` parses fine and only fails at the call site.
	fn parse_params(&mut self) -> Result<Vec<Param>> {
		let mut params = Vec::new();
		self.skip_newlines();
		if self.check(TokenKind::RParen) {
			return Ok(params);
		}
		loop {
			let name = self.expect(TokenKind::Ident, "in parameter list")?;
			let default = if self.match_token(TokenKind::Assign).is_some() { Some(self.parse_expr()?) } else { None };
			params.push(Param { name, default });
			self.skip_newlines();
			if self.match_token(TokenKind::Comma).is_none() {
				break;
			}
			self.skip_newlines();
		}
		Ok(params)
	}

	// ---- statements ----

	fn parse_statement(&mut self) -> Result<Stmt> {
		match self.peek_kind() {
			TokenKind::LBrace => {
				self.advance();
				Ok(Stmt::Block(self.parse_block_statements()?))
			}
			TokenKind::If => self.parse_if(),
			TokenKind::While => self.parse_while(),
			TokenKind::For => self.parse_for(),
			TokenKind::Break => {
				let tok = self.advance();
				self.terminate_statement()?;
				Ok(Stmt::Break(Span::at(tok.position)))
			}
			TokenKind::Continue => {
				let tok = self.advance();
				self.terminate_statement()?;
				Ok(Stmt::Continue(Span::at(tok.position)))
			}
			TokenKind::Return => {
				let tok = self.advance();
				let value = if self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace) {
					None
				} else {
					Some(self.parse_expr()?)
				};
				let end = self.terminate_statement()?;
				Ok(Stmt::Return { value, span: Span::at(tok.position).to(Span::at(end.position)) })
			}
			_ => {
				let expr = self.parse_expr()?;
				self.terminate_statement()?;
				Ok(Stmt::Expression(expr))
			}
		}
	}

	fn parse_block_statements(&mut self) -> Result<Vec<Stmt>> {
		let mut stmts = Vec::new();
		self.skip_newlines();
		while !self.check(TokenKind::RBrace) && !self.is_at_end() {
			stmts.push(self.parse_declaration()?);
			self.skip_newlines();
		}
		self.expect(TokenKind::RBrace, "to close a block")?;
		Ok(stmts)
	}

	fn parse_if(&mut self) -> Result<Stmt> {
		self.advance(); // `if`
		self.expect(TokenKind::LParen, "after `if`")?;
		let cond = self.parse_expr()?;
		self.expect(TokenKind::RParen, "to close the `if` condition")?;
		let then_branch = Box::new(self.parse_statement()?);
		self.skip_newlines();
		let else_branch = if self.match_token(TokenKind::Else).is_some() { Some(Box::new(self.parse_statement()?)) } else { None };
		Ok(Stmt::If { cond, then_branch, else_branch })
	}

	fn parse_while(&mut self) -> Result<Stmt> {
		self.advance(); // `while`
		self.expect(TokenKind::LParen, "after `while`")?;
		let cond = self.parse_expr()?;
		self.expect(TokenKind::RParen, "to close the `while` condition")?;
		let body = Box::new(self.parse_statement()?);
		Ok(Stmt::While { cond, body })
	}

	fn parse_for(&mut self) -> Result<Stmt> {
		self.advance(); // `for`
		self.expect(TokenKind::LParen, "after `for`")?;
		let init = Box::new(if self.check(TokenKind::Var) { self.parse_var_decl()? } else {
			let expr = self.parse_expr()?;
			self.terminate_statement()?;
			Stmt::Expression(expr)
		});
		let cond = self.parse_expr()?;
		self.expect(TokenKind::Semicolon, "after the `for` condition")?;
		let incr = self.parse_expr()?;
		self.expect(TokenKind::RParen, "to close the `for` head")?;
		let body = Box::new(self.parse_statement()?);
		Ok(Stmt::For { init, cond, incr, body })
	}

	/// A simple statement ends at `;`, a newline, end of input, or an
	/// immediately following `}` (a block's own close needs no separator).
	/// Nothing else is accepted — without this, `var x = 1` followed by a
	/// new line starting with a unary `-` or a call would silently read on
	/// as one statement instead of two.
	fn terminate_statement(&mut self) -> Result<Token> {
		if let Some(tok) = self.match_token(TokenKind::Semicolon) {
			self.skip_newlines();
			return Ok(tok);
		}
		if let Some(tok) = self.match_token(TokenKind::Newline) {
			self.skip_newlines();
			return Ok(tok);
		}
		if self.is_at_end() || self.check(TokenKind::RBrace) {
			return Ok(self.peek().clone());
		}
		Err(Error::parser(
			format!("expected `;` or a newline to end the statement, found {}", self.peek_kind()),
			Span::at(self.peek().position),
		))
	}

	// ---- expressions ----

	fn parse_expr(&mut self) -> Result<Expr> {
		self.parse_binary(0)
	}

	fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
		let mut left = self.parse_unary()?;
		loop {
			let kind = self.peek_kind();
			let Some((prec, right_assoc)) = precedence::infix_binding_power(kind) else { break };
			if prec < min_prec {
				break;
			}
			let op = self.advance();
			let next_min = if right_assoc { prec } else { prec + 1 };
			let right = self.parse_binary(next_min)?;
			left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
		}
		Ok(left)
	}

	fn parse_unary(&mut self) -> Result<Expr> {
		match self.peek_kind() {
			TokenKind::Bang | TokenKind::Minus | TokenKind::Plus | TokenKind::Tilde | TokenKind::Increment | TokenKind::Decrement => {
				let op = self.advance();
				let operand = Box::new(self.parse_unary()?);
				Ok(Expr::PrefixUnary { op, operand })
			}
			_ => self.parse_postfix(),
		}
	}

	fn parse_postfix(&mut self) -> Result<Expr> {
		let mut expr = self.parse_primary()?;
		loop {
			match self.peek_kind() {
				TokenKind::LParen => {
					let opening = self.advance();
					let items = self.parse_comma_list(TokenKind::RParen)?;
					self.expect(TokenKind::RParen, "to close a call argument list")?;
					let grouping = Expr::Grouping { opening, items };
					expr = Expr::GroupingApplication { callee: Box::new(expr), grouping: Box::new(grouping) };
				}
				TokenKind::LBracket => {
					let opening = self.advance();
					let items = vec![self.parse_expr()?];
					self.expect(TokenKind::RBracket, "to close an index expression")?;
					let grouping = Expr::Grouping { opening, items };
					expr = Expr::GroupingApplication { callee: Box::new(expr), grouping: Box::new(grouping) };
				}
				TokenKind::Dot => {
					let dot = self.advance();
					let name = self.expect(TokenKind::Ident, "after `.`")?;
					let key = Token::new(TokenKind::String, name.lexeme.clone(), name.position);
					let grouping = Expr::Grouping { opening: dot, items: vec![Expr::Literal(key)] };
					expr = Expr::GroupingApplication { callee: Box::new(expr), grouping: Box::new(grouping) };
				}
				TokenKind::Increment | TokenKind::Decrement => {
					let op = self.advance();
					expr = Expr::SuffixUnary { op, operand: Box::new(expr) };
				}
				_ => break,
			}
		}
		Ok(expr)
	}

	fn parse_primary(&mut self) -> Result<Expr> {
		let tok = self.peek().clone();
		match tok.kind {
			TokenKind::Number | TokenKind::String | TokenKind::True | TokenKind::False | TokenKind::Null => {
				self.advance();
				Ok(Expr::Literal(tok))
			}
			TokenKind::Ident => {
				self.advance();
				Ok(Expr::Identifier(tok))
			}
			TokenKind::LParen => {
				let opening = self.advance();
				let items = self.parse_comma_list(TokenKind::RParen)?;
				self.expect(TokenKind::RParen, "to close a grouping")?;
				Ok(Expr::Grouping { opening, items })
			}
			TokenKind::LBracket => {
				let opening = self.advance();
				let items = self.parse_comma_list(TokenKind::RBracket)?;
				self.expect(TokenKind::RBracket, "to close a list literal")?;
				Ok(Expr::Grouping { opening, items })
			}
			TokenKind::LBrace => self.parse_association(),
			_ => Err(Error::parser(format!("unexpected token `{}`", tok.lexeme), Span::at(tok.position))),
		}
	}

	fn parse_comma_list(&mut self, closing: TokenKind) -> Result<Vec<Expr>> {
		let mut items = Vec::new();
		self.skip_newlines();
		if self.check(closing) {
			return Ok(items);
		}
		loop {
			items.push(self.parse_expr()?);
			self.skip_newlines();
			if self.match_token(TokenKind::Comma).is_none() {
				break;
			}
			self.skip_newlines();
		}
		Ok(items)
	}

	fn parse_association(&mut self) -> Result<Expr> {
		let opening = self.advance(); // `{`
		let mut entries = Vec::new();
		self.skip_newlines();
		while !self.check(TokenKind::RBrace) {
			let key = if self.match_token(TokenKind::LBracket).is_some() {
				let key_expr = self.parse_expr()?;
				self.expect(TokenKind::RBracket, "to close a computed object key")?;
				key_expr
			} else if self.check(TokenKind::Ident) {
				let name = self.advance();
				Expr::Literal(Token::new(TokenKind::String, name.lexeme, name.position))
			} else {
				self.parse_primary()?
			};
			self.expect(TokenKind::Colon, "after an object key")?;
			let value = self.parse_expr()?;
			entries.push((key, value));
			self.skip_newlines();
			if self.match_token(TokenKind::Comma).is_none() {
				break;
			}
			self.skip_newlines();
		}
		let close = self.expect(TokenKind::RBrace, "to close an object literal")?;
		Ok(Expr::Association { entries, span: Span::at(opening.position).to(Span::at(close.position)) })
	}
}

impl Stmt {
	fn last_span(&self) -> Span {
		match self {
			Stmt::ConstDecl { init, .. } => init.span(),
			Stmt::FunctionDecl { name, .. } => Span::at(name.position),
			_ => Span::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::Lexer;

	fn parse_source(source: &str) -> Vec<Stmt> {
		let tokens = Lexer::new(source).tokenize().unwrap();
		parse(tokens).unwrap()
	}

	#[test]
	fn var_decl_with_init() {
		let program = parse_source("var x = 1;");
		assert!(matches!(&program[0], Stmt::VarDecl { init: Some(_), .. }));
	}

	#[test]
	fn precedence_climb_orders_multiplication_before_addition() {
		let program = parse_source("1 + 2 * 3;");
		let Stmt::Expression(Expr::Binary { op, left, right }) = &program[0] else { panic!("expected binary expr") };
		assert_eq!(op.kind, TokenKind::Plus);
		assert!(matches!(**left, Expr::Literal(_)));
		assert!(matches!(**right, Expr::Binary { .. }));
	}

	#[test]
	fn power_is_left_associative() {
		// Only ranks 0 (`=`) and 5 (compound-assign) are right-associative;
		// `**` shares rank 7 with `*`/`/`/`%`.
		let program = parse_source("2 ** 3 ** 2;");
		let Stmt::Expression(Expr::Binary { op, left, .. }) = &program[0] else { panic!("expected binary expr") };
		assert_eq!(op.kind, TokenKind::Pow);
		assert!(matches!(**left, Expr::Binary { .. }));
	}

	#[test]
	fn compound_assign_binds_tighter_than_comparison_but_looser_than_addition() {
		// Rank 5 (compound-assign) sits strictly between rank 4 (comparison)
		// and rank 6 (`+`/`-`) — not beside plain `=`.
		let program = parse_source("a < b += c + d;");
		let Stmt::Expression(Expr::Binary { op, right, .. }) = &program[0] else { panic!("expected binary expr") };
		assert_eq!(op.kind, TokenKind::Lt);
		let Expr::Binary { op: inner_op, right: inner_right, .. } = right.as_ref() else { panic!("expected nested binary") };
		assert_eq!(inner_op.kind, TokenKind::PlusEq);
		assert!(matches!(inner_right.as_ref(), Expr::Binary { op, .. } if op.kind == TokenKind::Plus));
	}

	#[test]
	fn bitwise_binds_tighter_than_arithmetic() {
		// Rank 8 (bitwise) binds tighter than ranks 6-7 (arithmetic) — the
		// opposite of C-family precedence.
		let program = parse_source("1 + 2 & 3;");
		let Stmt::Expression(Expr::Binary { op, right, .. }) = &program[0] else { panic!("expected binary expr") };
		assert_eq!(op.kind, TokenKind::Plus);
		assert!(matches!(right.as_ref(), Expr::Binary { op, .. } if op.kind == TokenKind::Amp));
	}

	#[test]
	fn call_and_index_chain() {
		let program = parse_source("foo(1)[0];");
		let Stmt::Expression(Expr::GroupingApplication { grouping, .. }) = &program[0] else { panic!("expected application") };
		assert!(matches!(**grouping, Expr::Grouping { .. }));
	}

	#[test]
	fn member_access_desugars_to_bracket_application() {
		let program = parse_source("obj.field;");
		let Stmt::Expression(Expr::GroupingApplication { grouping, .. }) = &program[0] else { panic!("expected application") };
		let Expr::Grouping { items, .. } = grouping.as_ref() else { panic!("expected grouping") };
		assert!(matches!(&items[0], Expr::Literal(tok) if tok.kind == TokenKind::String && tok.lexeme == "field"));
	}

	#[test]
	fn object_literal_with_computed_key() {
		let program = parse_source(r#"var o = { name: "a", [1 + 1]: "b" };"#);
		let Stmt::VarDecl { init: Some(Expr::Association { entries, .. }), .. } = &program[0] else { panic!("expected association") };
		assert_eq!(entries.len(), 2);
	}

	#[test]
	fn function_decl_tolerates_default_before_required_at_parse_time() {
		// required-after-optional is a `ParameterError` raised at call time,
		// not a parse error.
		let tokens = Lexer::new("function f(a = 1, b) { }").tokenize().unwrap();
		let program = parse(tokens).unwrap();
		let Stmt::FunctionDecl { params, .. } = &program[0] else { panic!("expected function decl") };
		assert_eq!(params.len(), 2);
	}

	#[test]
	fn import_star_and_named() {
		let program = parse_source(r#"import * from "a"; import { x, y } from "b";"#);
		assert!(matches!(&program[0], Stmt::Import { items: None, .. }));
		assert!(matches!(&program[1], Stmt::Import { items: Some(names), .. } if names.len() == 2));
	}

	#[test]
	fn newline_terminates_a_statement_without_a_semicolon() {
		let program = parse_source("var x = 1\n-x\n");
		assert_eq!(program.len(), 2);
		assert!(matches!(&program[0], Stmt::VarDecl { init: Some(Expr::Literal(_)), .. }));
		let Stmt::Expression(Expr::PrefixUnary { op, .. }) = &program[1] else { panic!("expected unary expr") };
		assert_eq!(op.kind, TokenKind::Minus);
	}

	#[test]
	fn newline_prevents_a_grouping_from_being_read_as_a_call() {
		let program = parse_source("var x = 1\n(f)()\n");
		assert_eq!(program.len(), 2);
		assert!(matches!(&program[0], Stmt::VarDecl { init: Some(Expr::Literal(_)), .. }));
		assert!(matches!(&program[1], Stmt::Expression(Expr::GroupingApplication { .. })));
	}

	#[test]
	fn missing_statement_terminator_is_a_parser_error() {
		let tokens = Lexer::new("var x = 1 var y = 2\n").tokenize().unwrap();
		let err = parse(tokens).unwrap_err();
		assert!(matches!(err, Error::Parser { .. }));
	}

	#[test]
	fn for_head_requires_a_separator_after_the_init_clause() {
		let tokens = Lexer::new("for (var i = 0 i < 10; i = i + 1) { }").tokenize().unwrap();
		let err = parse(tokens).unwrap_err();
		assert!(matches!(err, Error::Parser { .. }));
	}

	#[test]
	fn newlines_inside_a_grouping_are_whitespace() {
		let program = parse_source("var total = (\n\t1,\n\t2\n);");
		let Stmt::VarDecl { init: Some(Expr::Grouping { items, .. }), .. } = &program[0] else { panic!("expected grouping") };
		assert_eq!(items.len(), 2);
	}

	#[test]
	fn newlines_around_else_are_whitespace() {
		let program = parse_source("if (true) {\n\tvar x = 1;\n}\nelse {\n\tvar y = 2;\n}\n");
		assert!(matches!(&program[0], Stmt::If { else_branch: Some(_), .. }));
	}
}
