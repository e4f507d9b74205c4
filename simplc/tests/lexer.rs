use simplc::error::ErrorKind;
use simplc::lexer::Lexer;
use simplc::pos::SourcePos;
use simplc::token::TokenKind;

/// Collect every token kind up to and excluding Eof
fn lex_kinds(source: &str) -> Vec<TokenKind> {
	let mut lexer = Lexer::new(source);
	let mut kinds = Vec::new();
	loop {
		let token = lexer.next_token().expect("token");
		if token.kind == TokenKind::Eof {
			return kinds;
		}
		kinds.push(token.kind);
	}
}

/// Scan until the first error
fn lex_err(source: &str) -> simplc::Error {
	let mut lexer = Lexer::new(source);
	loop {
		match lexer.next_token() {
			Ok(token) if token.kind == TokenKind::Eof => panic!("expected an error"),
			Ok(_) => (),
			Err(err) => return err,
		}
	}
}

#[test]
fn keywords_and_identifiers() {
	let kinds = lex_kinds("begin x <- 1; yy >= 2 end");
	assert_eq!(
		kinds,
		vec![
			TokenKind::Begin,
			TokenKind::Ident("x".to_string()),
			TokenKind::Gets,
			TokenKind::Num(1),
			TokenKind::Semicolon,
			TokenKind::Ident("yy".to_string()),
			TokenKind::Ge,
			TokenKind::Num(2),
			TokenKind::End,
		]
	);
}

#[test]
fn two_character_operators() {
	let kinds = lex_kinds("<= < <- >= > -> - # =");
	assert_eq!(
		kinds,
		vec![
			TokenKind::Le,
			TokenKind::Lt,
			TokenKind::Gets,
			TokenKind::Ge,
			TokenKind::Gt,
			TokenKind::To,
			TokenKind::Minus,
			TokenKind::Ne,
			TokenKind::Eq,
		]
	);
}

#[test]
fn reserved_words_are_not_identifiers() {
	let kinds = lex_kinds("while chill mod array");
	assert_eq!(
		kinds,
		vec![
			TokenKind::While,
			TokenKind::Chill,
			TokenKind::Mod,
			TokenKind::Array,
		]
	);
}

#[test]
fn eof_repeats() {
	let mut lexer = Lexer::new("x");
	assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Ident(_)));
	assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
	assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
}

#[test]
fn token_positions() {
	let mut lexer = Lexer::new("ab cd\nef");
	assert_eq!(lexer.next_token().unwrap().pos, SourcePos::new(1, 1));
	assert_eq!(lexer.next_token().unwrap().pos, SourcePos::new(1, 4));
	assert_eq!(lexer.next_token().unwrap().pos, SourcePos::new(2, 1));
}

#[test]
fn positions_increase_within_a_line() {
	let mut lexer = Lexer::new("a bb ccc + -");
	let mut last_col = 0;
	loop {
		let token = lexer.next_token().unwrap();
		if token.kind == TokenKind::Eof {
			break;
		}
		assert!(token.pos.col > last_col);
		last_col = token.pos.col;
	}
}

#[test]
fn comments_are_transparent() {
	let plain = lex_kinds("a + b");
	let commented = lex_kinds("a (* one (* nested *) two *) + (* x *) b");
	assert_eq!(plain, commented);
}

#[test]
fn unterminated_comment() {
	let err = lex_err("  (* never (* closed *)");
	assert_eq!(err.kind, ErrorKind::CommentNotClosed);
	assert_eq!(err.pos, SourcePos::new(1, 3));
}

#[test]
fn unbalanced_nesting_is_rejected() {
	let err = lex_err("(* (* *) x");
	assert_eq!(err.kind, ErrorKind::CommentNotClosed);
	assert_eq!(err.pos, SourcePos::new(1, 1));
}

#[test]
fn string_contents_keep_escapes_verbatim() {
	let kinds = lex_kinds(r#""a\n\t\"\\b""#);
	assert_eq!(kinds, vec![TokenKind::Str(r#"a\n\t\"\\b"#.to_string())]);
}

#[test]
fn illegal_escape_code() {
	let err = lex_err(r#""a\qb""#);
	assert_eq!(err.kind, ErrorKind::IllegalEscapeCode('q'));
	assert_eq!(err.pos, SourcePos::new(1, 3));
}

#[test]
fn unterminated_string_reports_opening_quote() {
	let err = lex_err("  \"abc");
	assert_eq!(err.kind, ErrorKind::StringNotClosed);
	assert_eq!(err.pos, SourcePos::new(1, 3));
}

#[test]
fn non_printable_byte_in_string() {
	let err = lex_err("\"a\x07b\"");
	assert_eq!(err.kind, ErrorKind::NonPrintableCharacter(7));
}

#[test]
fn number_limits() {
	assert_eq!(lex_kinds("2147483647"), vec![TokenKind::Num(i32::MAX)]);

	let err = lex_err("2147483648");
	assert_eq!(err.kind, ErrorKind::NumberTooLarge);
	assert_eq!(err.pos, SourcePos::new(1, 1));
}

#[test]
fn identifier_length_limit() {
	let just_fits = "a".repeat(32);
	assert_eq!(
		lex_kinds(&just_fits),
		vec![TokenKind::Ident(just_fits.clone())]
	);

	let too_long = "a".repeat(33);
	assert_eq!(lex_err(&too_long).kind, ErrorKind::IdentifierTooLong);
}

#[test]
fn illegal_character() {
	let err = lex_err("a % b");
	assert_eq!(err.kind, ErrorKind::IllegalCharacter('%', 37));
	assert_eq!(err.pos, SourcePos::new(1, 3));
}
