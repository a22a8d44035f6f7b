use crate::error::{Error, Result};
use crate::span::Position;
use crate::token::{Token, TokenKind};

/// Operator/punctuation literals, longest first so that e.g. `**=` is
/// matched before `**` and `**` before `*`. This is the "ordered table of
/// (kind, regex) rules" of the symbolic-operator family; letters/digits/
/// strings get their own dedicated scan functions below since they aren't
/// fixed literals.
const SYMBOLS: &[(&str, TokenKind)] = &[
	("**=", TokenKind::PowEq),
	("<<=", TokenKind::ShlEq),
	(">>=", TokenKind::ShrEq),
	("==", TokenKind::Eq),
	("!=", TokenKind::NotEq),
	("<=", TokenKind::Le),
	(">=", TokenKind::Ge),
	("+=", TokenKind::PlusEq),
	("-=", TokenKind::MinusEq),
	("*=", TokenKind::StarEq),
	("/=", TokenKind::SlashEq),
	("%=", TokenKind::PercentEq),
	("&=", TokenKind::AmpEq),
	("|=", TokenKind::PipeEq),
	("^=", TokenKind::CaretEq),
	("<<", TokenKind::Shl),
	(">>", TokenKind::Shr),
	("**", TokenKind::Pow),
	("++", TokenKind::Increment),
	("--", TokenKind::Decrement),
	("(", TokenKind::LParen),
	(")", TokenKind::RParen),
	("[", TokenKind::LBracket),
	("]", TokenKind::RBracket),
	("{", TokenKind::LBrace),
	("}", TokenKind::RBrace),
	(",", TokenKind::Comma),
	(";", TokenKind::Semicolon),
	(":", TokenKind::Colon),
	(".", TokenKind::Dot),
	("=", TokenKind::Assign),
	("<", TokenKind::Lt),
	(">", TokenKind::Gt),
	("+", TokenKind::Plus),
	("-", TokenKind::Minus),
	("*", TokenKind::Star),
	("/", TokenKind::Slash),
	("%", TokenKind::Percent),
	("&", TokenKind::Amp),
	("|", TokenKind::Pipe),
	("^", TokenKind::Caret),
	("!", TokenKind::Bang),
	("~", TokenKind::Tilde),
];

/// Scans source text into a flat token sequence. Whitespace tokens
/// (`SPACE`, `NEWLINE`) are emitted, not swallowed, so that `Lexer` stays
/// total and position-tracking stays simple; the parser is the one that
/// skips them.
pub struct Lexer<'a> {
	chars: Vec<char>,
	source: &'a str,
	index: usize,
	row: usize,
	column: usize,
}

impl<'a> Lexer<'a> {
	pub fn new(source: &'a str) -> Self {
		Lexer {
			chars: source.chars().collect(),
			source,
			index: 0,
			row: 1,
			column: 1,
		}
	}

	/// Scans the full source into a token sequence, ending with a single
	/// `Eof` token. Total except for `Error::Lexer` when no rule matches.
	pub fn tokenize(mut self) -> Result<Vec<Token>> {
		let mut tokens = Vec::new();
		while self.index < self.chars.len() {
			tokens.push(self.next_token()?);
		}
		tokens.push(Token::new(TokenKind::Eof, "", self.position()));
		tracing::debug!(tokens = tokens.len(), source_len = self.source.len(), "lexed module");
		Ok(tokens)
	}

	fn position(&self) -> Position {
		Position::new(self.row, self.column)
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.index).copied()
	}

	fn peek_at(&self, offset: usize) -> Option<char> {
		self.chars.get(self.index + offset).copied()
	}

	fn advance(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.index += 1;
		if c == '\n' {
			self.row += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn next_token(&mut self) -> Result<Token> {
		let position = self.position();
		let c = self.peek().expect("next_token called at end of input");

		if c == '\r' || c == '\n' {
			return Ok(Token::new(TokenKind::Newline, self.scan_newline(), position));
		}
		if c == ' ' || c == '\t' {
			return Ok(Token::new(TokenKind::Space, self.scan_space(), position));
		}
		if c == '#' {
			return Ok(Token::new(TokenKind::Comment, self.scan_comment(), position));
		}
		if c.is_ascii_digit() {
			return Ok(Token::new(TokenKind::Number, self.scan_number(), position));
		}
		if c == '"' {
			return Ok(Token::new(TokenKind::String, self.scan_string(position)?, position));
		}
		if is_ident_start(c) {
			let lexeme = self.scan_ident();
			let kind = TokenKind::keyword(&lexeme).unwrap_or(TokenKind::Ident);
			return Ok(Token::new(kind, lexeme, position));
		}
		if let Some((lexeme, kind)) = self.match_symbol() {
			for _ in 0..lexeme.chars().count() {
				self.advance();
			}
			return Ok(Token::new(kind, lexeme, position));
		}

		Err(Error::lexer("invalid token", position))
	}

	fn match_symbol(&self) -> Option<(&'static str, TokenKind)> {
		for &(literal, kind) in SYMBOLS {
			if self.matches_literal(literal) {
				return Some((literal, kind));
			}
		}
		None
	}

	fn matches_literal(&self, literal: &str) -> bool {
		literal.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
	}

	fn scan_newline(&mut self) -> String {
		let mut lexeme = String::new();
		if self.peek() == Some('\r') {
			lexeme.push(self.advance().unwrap());
		}
		if self.peek() == Some('\n') {
			lexeme.push(self.advance().unwrap());
		}
		lexeme
	}

	fn scan_space(&mut self) -> String {
		let mut lexeme = String::new();
		while matches!(self.peek(), Some(' ') | Some('\t')) {
			lexeme.push(self.advance().unwrap());
		}
		lexeme
	}

	fn scan_comment(&mut self) -> String {
		let mut lexeme = String::new();
		while let Some(c) = self.peek() {
			if c == '\n' || c == '\r' {
				break;
			}
			lexeme.push(self.advance().unwrap());
		}
		lexeme
	}

	fn scan_number(&mut self) -> String {
		let mut lexeme = String::new();
		while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
			lexeme.push(self.advance().unwrap());
		}
		if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
			lexeme.push(self.advance().unwrap());
			while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
				lexeme.push(self.advance().unwrap());
			}
		}
		lexeme
	}

	fn scan_ident(&mut self) -> String {
		let mut lexeme = String::new();
		while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
			lexeme.push(self.advance().unwrap());
		}
		lexeme
	}

	/// Scans a double-quoted string, decoding escapes as it goes. The
	/// lexeme returned is the *decoded* content, without the surrounding
	/// quotes.
	fn scan_string(&mut self, start: Position) -> Result<String> {
		self.advance(); // opening quote
		let mut value = String::new();
		loop {
			match self.peek() {
				None | Some('\n') | Some('\r') => {
					return Err(Error::lexer("unterminated string literal", start));
				}
				Some('"') => {
					self.advance();
					break;
				}
				Some('\\') => {
					self.advance();
					value.push(self.scan_escape(start)?);
				}
				Some(c) => {
					self.advance();
					value.push(c);
				}
			}
		}
		Ok(value)
	}

	fn scan_escape(&mut self, start: Position) -> Result<char> {
		let position = self.position();
		let c = self.advance().ok_or_else(|| Error::lexer("unterminated string literal", start))?;
		Ok(match c {
			'n' => '\n',
			't' => '\t',
			'r' => '\r',
			'"' => '"',
			'\\' => '\\',
			'0' => '\0',
			'u' => return self.scan_unicode_escape(position),
			other => return Err(Error::lexer(format!("invalid escape sequence `\\{other}`"), position)),
		})
	}

	fn scan_unicode_escape(&mut self, position: Position) -> Result<char> {
		let mut code = 0u32;
		for _ in 0..4 {
			let digit = self
				.advance()
				.and_then(|c| c.to_digit(16))
				.ok_or_else(|| Error::lexer("invalid \\u escape, expected 4 hex digits", position))?;
			code = code * 16 + digit;
		}
		char::from_u32(code).ok_or_else(|| Error::lexer("invalid \\u escape, not a valid character", position))
	}
}

fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(source: &str) -> Vec<TokenKind> {
		Lexer::new(source).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
	}

	#[test]
	fn keyword_promotion() {
		let tokens = Lexer::new("var x").tokenize().unwrap();
		assert_eq!(tokens[0].kind, TokenKind::Var);
		assert_eq!(tokens[2].kind, TokenKind::Ident);
	}

	#[test]
	fn longest_operator_match() {
		assert_eq!(kinds("**="), vec![TokenKind::PowEq, TokenKind::Eof]);
		assert_eq!(kinds("<<="), vec![TokenKind::ShlEq, TokenKind::Eof]);
		assert_eq!(kinds("**"), vec![TokenKind::Pow, TokenKind::Eof]);
		assert_eq!(kinds("*"), vec![TokenKind::Star, TokenKind::Eof]);
	}

	#[test]
	fn string_escapes() {
		let tokens = Lexer::new(r#""a\nb\tcA""#).tokenize().unwrap();
		assert_eq!(tokens[0].lexeme, "a\nb\tc\u{0041}");
	}

	#[test]
	fn number_literal() {
		let tokens = Lexer::new("12.5").tokenize().unwrap();
		assert_eq!(tokens[0].kind, TokenKind::Number);
		assert_eq!(tokens[0].lexeme, "12.5");
	}

	#[test]
	fn invalid_token_errors() {
		let err = Lexer::new("$").tokenize().unwrap_err();
		assert!(matches!(err, Error::Lexer { .. }));
	}

	#[test]
	fn position_tracking_across_newlines() {
		let tokens = Lexer::new("a\nb").tokenize().unwrap();
		// a, newline, b, eof
		assert_eq!(tokens[2].position.row, 2);
		assert_eq!(tokens[2].position.column, 1);
	}

	#[test]
	fn lossless_reconstruction() {
		let source = "var x = 1 + 2\nif x { print(x) }";
		let tokens = Lexer::new(source).tokenize().unwrap();
		let rebuilt: String = tokens
			.iter()
			.filter(|t| t.kind != TokenKind::Eof)
			.map(|t| {
				if let Some(kw) = TokenKind::keyword(&t.lexeme) {
					if kw == t.kind {
						return t.lexeme.clone();
					}
				}
				t.lexeme.clone()
			})
			.collect();
		assert_eq!(rebuilt, source);
	}
}
