use crate::token::TokenKind;

/// Binary operator precedence, lowest-binds-least-tightly first. Two quirks
/// worth calling out because they look like typos but aren't:
///
/// - compound-assignment (`+=` etc., rank 5) binds *tighter* than the
///   comparison operators (rank 4) below it but *looser* than `+`/`-`
///   (rank 6) above it — it does not sit next to plain `=` (rank 0).
/// - the bitwise family (rank 8) binds tighter than arithmetic (ranks 6-7),
///   the opposite of C-family languages.
///
/// `**` sits in the same rank as `*`/`/`/`%` (only ranks 0 and 5 are
/// right-associative), so it is left-associative here, not given its own
/// tier.
pub fn infix_binding_power(kind: TokenKind) -> Option<(u8, bool)> {
	use TokenKind::*;
	let (rank, right_assoc) = match kind {
		Assign => (0, true),
		Or => (1, false),
		And => (2, false),
		Eq | NotEq => (3, false),
		Lt | Le | Gt | Ge => (4, false),
		PlusEq | MinusEq | StarEq | SlashEq | PercentEq | PowEq | AmpEq | PipeEq | CaretEq | ShlEq | ShrEq => (5, true),
		Plus | Minus => (6, false),
		Star | Slash | Percent | Pow => (7, false),
		Amp | Pipe | Caret | Shl | Shr => (8, false),
		_ => return None,
	};
	Some((rank, right_assoc))
}

pub fn is_assignment(kind: TokenKind) -> bool {
	use TokenKind::*;
	matches!(kind, Assign | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | PowEq | AmpEq | PipeEq | CaretEq | ShlEq | ShrEq)
}
