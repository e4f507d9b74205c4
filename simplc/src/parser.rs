use log::trace;

use crate::emitter::{Assembly, Cond, Emitter, Instr};
use crate::error::{self, ErrorKind, Expectation};
use crate::lexer::Lexer;
use crate::pos::SourcePos;
use crate::symbols::{IdProp, SymbolTable};
use crate::token::{Token, TokenKind};
use crate::types::{check, ValType};

/// Recursive-descent parser over one token of lookahead.
///
/// Every production checks types and emits code as it recognises its
/// phrase; no syntax tree is built. The synthesised attribute of an
/// expression production is its value type.
pub struct Parser<'src> {
	lexer: Lexer<'src>,
	token: Token,
	symbols: SymbolTable,
	emitter: Emitter,
	/// Callable type of the subroutine being parsed; drives `exit`
	return_type: ValType,
}

impl<'src> Parser<'src> {
	/// Run the whole pipeline over a source text
	pub fn compile(source: &'src str) -> error::Result<Assembly> {
		let mut lexer = Lexer::new(source);
		let token = lexer.next_token()?;
		let mut parser = Self {
			lexer,
			token,
			symbols: SymbolTable::new(),
			emitter: Emitter::new(),
			return_type: ValType::NONE,
		};
		parser.parse_program()?;
		Ok(parser.emitter.serialize())
	}

	// ==============================
	// Productions
	// ==============================

	/// program = "program" id { funcdef } body .
	fn parse_program(&mut self) -> error::Result<()> {
		trace!("<program>");

		self.expect(TokenKind::Program)?;
		let (class_name, _) = self.expect_id()?;
		self.emitter.set_class_name(&class_name);

		while self.token == TokenKind::Define {
			self.parse_funcdef()?;
		}

		// the final body becomes an implicit main, which is a procedure
		self.return_type = ValType::CALLABLE;
		self.emitter.init_main();
		self.parse_body()?;
		self.emitter.emit(Instr::Return);
		self.emitter.close_subroutine(self.symbols.locals_width());
		self.expect(TokenKind::Eof)?;

		trace!("</program>");
		Ok(())
	}

	/// funcdef = "define" id "(" [ type id { "," type id } ] ")" [ "->" type ] body .
	fn parse_funcdef(&mut self) -> error::Result<()> {
		trace!("<funcdef>");

		self.expect(TokenKind::Define)?;
		let (func_id, func_pos) = self.expect_id()?;

		// parameters are collected before the subroutine scope opens
		let mut params: Vec<(String, ValType, SourcePos)> = Vec::new();
		self.expect(TokenKind::Lpar)?;
		if self.token.kind.is_type() {
			loop {
				let typ = self.parse_type()?;
				let (id, pos) = self.expect_id()?;
				params.push((id, typ, pos));
				if self.token != TokenKind::Comma {
					break;
				}
				self.advance()?;
			}
		}
		self.expect(TokenKind::Rpar)?;

		let mut typ = ValType::CALLABLE;
		if self.token == TokenKind::To {
			self.advance()?;
			typ |= self.parse_type()?;
		}
		self.return_type = typ;

		let param_types: Box<[ValType]> = params.iter().map(|(_, typ, _)| *typ).collect();
		let prop = IdProp::callable(typ, param_types);
		if !self.symbols.open_subroutine(&func_id, prop.clone()) {
			return Err(ErrorKind::MultipleDefinition(func_id).at(func_pos));
		}

		// parameters become the first local variables, in declared order
		for (id, typ, pos) in params {
			if self.symbols.find(&id).is_some()
				|| !self.symbols.insert(&id, IdProp::variable(typ))
			{
				return Err(ErrorKind::MultipleDefinition(id).at(pos));
			}
		}

		self.emitter.init_subroutine(&func_id, &prop);
		self.parse_body()?;
		self.emitter.close_subroutine(self.symbols.locals_width());
		self.symbols.close_subroutine();
		self.return_type = ValType::NONE;

		trace!("</funcdef>");
		Ok(())
	}

	/// body = "begin" { vardef } statements "end" .
	fn parse_body(&mut self) -> error::Result<()> {
		self.expect(TokenKind::Begin)?;
		while self.token.kind.is_type() {
			self.parse_vardef()?;
		}
		self.parse_statements()?;
		self.expect(TokenKind::End)?;
		Ok(())
	}

	/// statements = "chill" | statement { ";" statement } .
	fn parse_statements(&mut self) -> error::Result<()> {
		if self.token == TokenKind::Chill {
			self.advance()?;
		} else if self.token.kind.starts_statement() {
			self.parse_statement()?;
			while self.token == TokenKind::Semicolon {
				self.advance()?;
				self.parse_statement()?;
			}
		} else {
			return Err(self.expected(Expectation::Statement));
		}
		Ok(())
	}

	/// type = ("boolean" | "integer") [ "array" ] .
	fn parse_type(&mut self) -> error::Result<ValType> {
		let mut typ = match self.token.kind {
			TokenKind::Boolean => ValType::BOOLEAN,
			TokenKind::Integer => ValType::INTEGER,
			_ => return Err(self.expected(Expectation::Type)),
		};
		self.advance()?;
		if self.token == TokenKind::Array {
			self.advance()?;
			typ |= ValType::ARRAY;
		}
		Ok(typ)
	}

	/// vardef = type id { "," id } ";" .
	fn parse_vardef(&mut self) -> error::Result<()> {
		let typ = self.parse_type()?;
		loop {
			let (id, pos) = self.expect_id()?;
			if self.symbols.find(&id).is_some()
				|| !self.symbols.insert(&id, IdProp::variable(typ))
			{
				return Err(ErrorKind::MultipleDefinition(id).at(pos));
			}
			if self.token != TokenKind::Comma {
				break;
			}
			self.advance()?;
		}
		self.expect(TokenKind::Semicolon)?;
		Ok(())
	}

	/// statement = exit | if | name | read | while | write .
	fn parse_statement(&mut self) -> error::Result<()> {
		trace!("<statement> at {}", self.token.pos);
		match self.token.kind {
			TokenKind::Exit => self.parse_exit(),
			TokenKind::If => self.parse_if(),
			TokenKind::Ident(_) => self.parse_name(),
			TokenKind::Read => self.parse_read(),
			TokenKind::While => self.parse_while(),
			TokenKind::Write => self.parse_write(),
			_ => Err(self.expected(Expectation::Statement)),
		}
	}

	/// exit = "exit" [ expr ] .
	fn parse_exit(&mut self) -> error::Result<()> {
		let exit_pos = self.token.pos;
		self.expect(TokenKind::Exit)?;

		if self.token.kind.starts_expr() {
			if self.return_type.is_procedure() {
				return Err(ErrorKind::ExitExpressionNotAllowed.at(self.token.pos));
			}
			let pos = self.token.pos;
			let found = self.parse_expr()?;
			if self.return_type.is_array_type() {
				self.emitter.emit(Instr::Areturn);
			} else {
				self.emitter.emit(Instr::Ireturn);
			}
			check(found, self.return_type.strip_callable(), pos, "for 'exit' statement")?;
		} else if self.return_type.is_function() {
			return Err(ErrorKind::MissingExitExpression.at(exit_pos));
		} else {
			self.emitter.emit(Instr::Return);
		}
		Ok(())
	}

	/// if = "if" expr "then" statements { "elsif" expr "then" statements }
	///      [ "else" statements ] "end" .
	///
	/// Each guard branches to the label of the next alternative when it
	/// is false; every arm jumps to the common end label.
	fn parse_if(&mut self) -> error::Result<()> {
		let end_label = self.emitter.get_label();

		self.expect(TokenKind::If)?;
		let pos = self.token.pos;
		let guard = self.parse_expr()?;
		check(guard, ValType::BOOLEAN, pos, "for 'if' guard")?;
		let mut next_label = self.emitter.get_label();
		self.emitter.emit(Instr::Ifeq(next_label));
		self.expect(TokenKind::Then)?;
		self.parse_statements()?;
		self.emitter.emit(Instr::Goto(end_label));

		while self.token == TokenKind::Elsif {
			self.emitter.emit(Instr::Label(next_label));
			next_label = self.emitter.get_label();
			self.advance()?;
			let pos = self.token.pos;
			let guard = self.parse_expr()?;
			check(guard, ValType::BOOLEAN, pos, "for 'elsif' guard")?;
			self.emitter.emit(Instr::Ifeq(next_label));
			self.expect(TokenKind::Then)?;
			self.parse_statements()?;
			self.emitter.emit(Instr::Goto(end_label));
		}

		self.emitter.emit(Instr::Label(next_label));
		if self.token == TokenKind::Else {
			self.advance()?;
			self.parse_statements()?;
		}
		self.emitter.emit(Instr::Label(end_label));
		self.expect(TokenKind::End)?;
		Ok(())
	}

	/// name = id ( arglist | [ index ] "<-" ( expr | "array" simple ) ) .
	fn parse_name(&mut self) -> error::Result<()> {
		let (id, id_pos) = self.expect_id()?;
		let prop = match self.symbols.find(&id) {
			Some(prop) => prop.clone(),
			None => return Err(ErrorKind::UnknownIdentifier(id).at(id_pos)),
		};

		if self.token == TokenKind::Lpar {
			// procedure call
			if !prop.typ.is_procedure() {
				return Err(ErrorKind::NotAProcedure(id).at(id_pos));
			}
			self.parse_arglist(&id, id_pos, &prop)?;
			self.emitter.emit_call(&id, &prop);
			return Ok(());
		}

		if !matches!(self.token.kind, TokenKind::Lbrack | TokenKind::Gets) {
			return Err(self.expected(Expectation::ArgumentListOrAssignment));
		}
		if prop.typ.is_callable() {
			return Err(ErrorKind::NotAVariable(id).at(id_pos));
		}

		let indexed = self.token == TokenKind::Lbrack;
		let mut target_type = prop.typ;
		if indexed {
			if !prop.typ.is_array() {
				return Err(ErrorKind::NotAnArray(id).at(id_pos));
			}
			target_type = prop.typ.base_type();
			self.emitter.emit(Instr::Aload(prop.offset));
			self.parse_index(&id)?;
		}
		let whole_array = !indexed && prop.typ.is_array();

		self.expect(TokenKind::Gets)?;
		let pos = self.token.pos;
		if self.token.kind.starts_expr() {
			let found = self.parse_expr()?;
			if whole_array {
				check(found, target_type, pos, format!("for assignment to '{id}'"))?;
				self.emitter.emit(Instr::Astore(prop.offset));
			} else if indexed {
				let context = if found.is_array_type() {
					format!("for allocation to indexed array '{id}'")
				} else {
					format!("for assignment to '{id}'")
				};
				check(found, target_type, pos, context)?;
				self.emitter.emit(Instr::Iastore);
			} else {
				if found.is_array_type() {
					return Err(ErrorKind::NotAnArray(id).at(id_pos));
				}
				check(found, target_type, pos, format!("for assignment to '{id}'"))?;
				self.emitter.emit(Instr::Istore(prop.offset));
			}
		} else if self.token == TokenKind::Array {
			// array allocation
			if indexed {
				check(
					prop.typ,
					target_type,
					self.token.pos,
					format!("for allocation to indexed array '{id}'"),
				)?;
			}
			if !prop.typ.is_array() {
				return Err(ErrorKind::NotAnArray(id).at(id_pos));
			}
			self.advance()?;
			let pos = self.token.pos;
			let size = self.parse_simple()?;
			check(size, ValType::INTEGER, pos, format!("for array size of '{id}'"))?;
			self.emitter.emit_newarray();
			self.emitter.emit(Instr::Astore(prop.offset));
		} else {
			return Err(self.expected(Expectation::ArrayAllocationOrExpression));
		}
		Ok(())
	}

	/// read = "read" id [ index ] .
	fn parse_read(&mut self) -> error::Result<()> {
		self.expect(TokenKind::Read)?;
		let (id, pos) = self.expect_id()?;
		let prop = match self.symbols.find(&id) {
			Some(prop) => prop.clone(),
			None => return Err(ErrorKind::UnknownIdentifier(id).at(pos)),
		};
		if !prop.typ.is_variable() {
			return Err(ErrorKind::NotAVariable(id).at(pos));
		}

		if self.token == TokenKind::Lbrack {
			if !prop.typ.is_array() {
				return Err(ErrorKind::NotAnArray(id).at(pos));
			}
			self.emitter.emit(Instr::Aload(prop.offset));
			self.parse_index(&id)?;
		} else if prop.typ.is_array() {
			return Err(ErrorKind::ScalarVariableExpected(id).at(pos));
		}

		let base = if prop.typ.is_integer_type() {
			ValType::INTEGER
		} else {
			ValType::BOOLEAN
		};
		self.emitter.emit_read(base);

		if prop.typ.is_array_type() {
			self.emitter.emit(Instr::Iastore);
		} else {
			self.emitter.emit(Instr::Istore(prop.offset));
		}
		Ok(())
	}

	/// while = "while" expr "do" statements "end" .
	fn parse_while(&mut self) -> error::Result<()> {
		let head_label = self.emitter.get_label();
		let exit_label = self.emitter.get_label();

		self.expect(TokenKind::While)?;
		self.emitter.emit(Instr::Label(head_label));
		let pos = self.token.pos;
		let guard = self.parse_expr()?;
		check(guard, ValType::BOOLEAN, pos, "for 'while' guard")?;
		self.emitter.emit(Instr::Ifeq(exit_label));
		self.expect(TokenKind::Do)?;
		self.parse_statements()?;
		self.expect(TokenKind::End)?;
		self.emitter.emit(Instr::Goto(head_label));
		self.emitter.emit(Instr::Label(exit_label));
		Ok(())
	}

	/// write = "write" (string|expr) { "&" (string|expr) } .
	fn parse_write(&mut self) -> error::Result<()> {
		let mut pos = self.token.pos;
		let mut op = "write";
		self.expect(TokenKind::Write)?;
		loop {
			self.parse_write_item(pos, op)?;
			if self.token != TokenKind::Ampersand {
				break;
			}
			pos = self.token.pos;
			op = "&";
			self.advance()?;
		}
		Ok(())
	}

	/// One item of a write statement: a string literal or an expression.
	/// Arrays cannot be written.
	fn parse_write_item(&mut self, pos: SourcePos, op: &str) -> error::Result<()> {
		if let TokenKind::Str(contents) = &self.token.kind {
			self.emitter.emit_print_string(contents);
			self.advance()?;
		} else if self.token.kind.starts_expr() {
			let found = self.parse_expr()?;
			if found.is_array() {
				return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(pos));
			}
			self.emitter.emit_print(found);
		} else {
			return Err(self.expected(Expectation::ExpressionOrString));
		}
		Ok(())
	}

	/// arglist = "(" [ expr { "," expr } ] ")" .
	///
	/// Arguments are emitted in order and each is checked against the
	/// callee's parameter list.
	fn parse_arglist(&mut self, id: &str, id_pos: SourcePos, prop: &IdProp) -> error::Result<()> {
		let kind = if prop.typ.is_function() {
			"function"
		} else {
			"procedure"
		};

		self.expect(TokenKind::Lpar)?;
		let mut count = 0;
		if self.token.kind.starts_expr() {
			if prop.nparams() == 0 {
				return Err(ErrorKind::TakesNoArguments {
					kind,
					id: id.to_string(),
				}
				.at(id_pos));
			}
			loop {
				if count >= prop.nparams() {
					return Err(ErrorKind::TooManyArguments(id.to_string()).at(self.token.pos));
				}
				let pos = self.token.pos;
				let found = self.parse_expr()?;
				check(
					found,
					prop.params[count],
					pos,
					format!("for parameter {} of call to '{id}'", count + 1),
				)?;
				count += 1;
				if self.token != TokenKind::Comma {
					break;
				}
				self.advance()?;
			}
		}
		if count < prop.nparams() {
			return Err(ErrorKind::TooFewArguments(id.to_string()).at(self.token.pos));
		}
		self.expect(TokenKind::Rpar)?;
		Ok(())
	}

	/// index = "[" simple "]" .
	///
	/// The array reference is already on the stack; this leaves the
	/// element index on top of it.
	fn parse_index(&mut self, id: &str) -> error::Result<()> {
		self.expect(TokenKind::Lbrack)?;
		let pos = self.token.pos;
		let found = self.parse_simple()?;
		check(found, ValType::INTEGER, pos, format!("for array index of '{id}'"))?;
		self.expect(TokenKind::Rbrack)?;
		Ok(())
	}

	/// expr = simple [ relop simple ] .
	fn parse_expr(&mut self) -> error::Result<ValType> {
		let t1 = self.parse_simple()?;
		if !self.token.kind.is_relop() {
			return Ok(t1);
		}

		let op = self.token.kind.clone();
		if t1.is_array() {
			return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(self.token.pos));
		}
		let pos = self.token.pos;
		self.advance()?;
		let t2 = self.parse_simple()?;
		if t2.is_array() {
			return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(pos));
		}

		match op {
			// equality applies to both base types, which must agree
			TokenKind::Eq | TokenKind::Ne => {
				check(t2, t1, pos, format!("for operator {op}"))?;
				self.emitter.emit_cmp(if op == TokenKind::Eq {
					Cond::Eq
				} else {
					Cond::Ne
				});
			}
			// the orderings are defined over integers only
			_ => {
				check(t1, ValType::INTEGER, pos, format!("for operator {op}"))?;
				check(t2, ValType::INTEGER, pos, format!("for operator {op}"))?;
				let cond = match op {
					TokenKind::Ge => Cond::Ge,
					TokenKind::Gt => Cond::Gt,
					TokenKind::Le => Cond::Le,
					TokenKind::Lt => Cond::Lt,
					_ => unreachable!("relational operator expected"),
				};
				self.emitter.emit_cmp(cond);
			}
		}
		Ok(ValType::BOOLEAN)
	}

	/// simple = [ "-" ] term { addop term } .
	fn parse_simple(&mut self) -> error::Result<ValType> {
		let mut t1;
		if self.token == TokenKind::Minus {
			let minus_pos = self.token.pos;
			self.advance()?;
			let term_pos = self.token.pos;
			t1 = self.parse_term()?;
			if t1.is_array() {
				return Err(
					ErrorKind::IllegalArrayOperation("unary minus".to_string()).at(minus_pos)
				);
			}
			check(t1, ValType::INTEGER, term_pos, "for unary minus")?;
			self.emitter.emit(Instr::Ineg);
		} else {
			t1 = self.parse_term()?;
		}

		while self.token.kind.is_addop() {
			let op = self.token.kind.clone();
			let pos = self.token.pos;
			if t1.is_array() {
				return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(pos));
			}
			self.advance()?;
			let t2 = self.parse_term()?;
			if t2.is_array() {
				return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(pos));
			}

			if op == TokenKind::Or {
				check(t1, ValType::BOOLEAN, pos, format!("for operator {op}"))?;
				check(t2, ValType::BOOLEAN, pos, format!("for operator {op}"))?;
				self.emitter.emit(Instr::Ior);
			} else {
				check(t1, ValType::INTEGER, pos, format!("for operator {op}"))?;
				check(t2, ValType::INTEGER, pos, format!("for operator {op}"))?;
				self.emitter.emit(if op == TokenKind::Plus {
					Instr::Iadd
				} else {
					Instr::Isub
				});
			}
			t1 = t2;
		}
		Ok(t1)
	}

	/// term = factor { mulop factor } .
	fn parse_term(&mut self) -> error::Result<ValType> {
		let mut t1 = self.parse_factor()?;

		while self.token.kind.is_mulop() {
			let op = self.token.kind.clone();
			let pos = self.token.pos;
			if t1.is_array() {
				return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(pos));
			}
			self.advance()?;
			let t2 = self.parse_factor()?;
			if t2.is_array() {
				return Err(ErrorKind::IllegalArrayOperation(op.to_string()).at(pos));
			}

			if op == TokenKind::And {
				check(t1, ValType::BOOLEAN, pos, format!("for operator {op}"))?;
				check(t2, ValType::BOOLEAN, pos, format!("for operator {op}"))?;
				self.emitter.emit(Instr::Iand);
			} else {
				check(t1, ValType::INTEGER, pos, format!("for operator {op}"))?;
				check(t2, ValType::INTEGER, pos, format!("for operator {op}"))?;
				self.emitter.emit(match op {
					TokenKind::Mul => Instr::Imul,
					TokenKind::Div => Instr::Idiv,
					_ => Instr::Irem,
				});
			}
			t1 = t2;
		}
		Ok(t1)
	}

	/// factor = id [ index | arglist ] | num | "not" factor | "true" |
	///          "false" | "(" expr ")" .
	fn parse_factor(&mut self) -> error::Result<ValType> {
		match self.token.kind {
			TokenKind::Ident(_) => {
				let (id, pos) = self.expect_id()?;
				let prop = match self.symbols.find(&id) {
					Some(prop) => prop.clone(),
					None => return Err(ErrorKind::UnknownIdentifier(id).at(pos)),
				};

				if self.token == TokenKind::Lbrack {
					// indexed element load
					if !prop.typ.is_array() {
						return Err(ErrorKind::NotAnArray(id).at(pos));
					}
					self.emitter.emit(Instr::Aload(prop.offset));
					self.parse_index(&id)?;
					self.emitter.emit(Instr::Iaload);
					Ok(prop.typ.base_type())
				} else if self.token == TokenKind::Lpar {
					// function call
					if !prop.typ.is_function() {
						return Err(ErrorKind::NotAFunction(id).at(pos));
					}
					self.parse_arglist(&id, pos, &prop)?;
					self.emitter.emit_call(&id, &prop);
					Ok(prop.typ.strip_callable())
				} else if prop.typ.is_function() {
					Err(ErrorKind::MissingFunctionArgumentList(id).at(pos))
				} else if prop.typ.is_callable() {
					Err(ErrorKind::NotAVariable(id).at(pos))
				} else {
					// plain variable load
					self.emitter.emit(if prop.typ.is_array_type() {
						Instr::Aload(prop.offset)
					} else {
						Instr::Iload(prop.offset)
					});
					Ok(prop.typ)
				}
			}

			TokenKind::Num(value) => {
				self.emitter.emit(Instr::Ldc(value));
				self.advance()?;
				Ok(ValType::INTEGER)
			}

			TokenKind::Not => {
				self.advance()?;
				let pos = self.token.pos;
				let found = self.parse_factor()?;
				check(found, ValType::BOOLEAN, pos, "for 'not'")?;
				self.emitter.emit(Instr::Ldc(1));
				self.emitter.emit(Instr::Ixor);
				Ok(ValType::BOOLEAN)
			}

			TokenKind::True => {
				self.emitter.emit(Instr::Ldc(1));
				self.advance()?;
				Ok(ValType::BOOLEAN)
			}
			TokenKind::False => {
				self.emitter.emit(Instr::Ldc(0));
				self.advance()?;
				Ok(ValType::BOOLEAN)
			}

			TokenKind::Lpar => {
				self.advance()?;
				let typ = self.parse_expr()?;
				self.expect(TokenKind::Rpar)?;
				Ok(typ)
			}

			_ => Err(self.expected(Expectation::Factor)),
		}
	}

	// ==============================
	// Helper functions
	// ==============================

	/// Pull the next token into the lookahead slot
	fn advance(&mut self) -> error::Result<()> {
		self.token = self.lexer.next_token()?;
		Ok(())
	}

	/// Consume the lookahead if it matches, error out otherwise
	fn expect(&mut self, kind: TokenKind) -> error::Result<()> {
		if self.token == kind {
			self.advance()
		} else {
			Err(ErrorKind::Expected {
				expected: Expectation::Token(kind),
				found: self.token.kind.clone(),
			}
			.at(self.token.pos))
		}
	}

	/// Consume an identifier, handing back its text and position
	fn expect_id(&mut self) -> error::Result<(String, SourcePos)> {
		let pos = self.token.pos;
		if let TokenKind::Ident(id) = &self.token.kind {
			let id = id.clone();
			self.advance()?;
			Ok((id, pos))
		} else {
			Err(ErrorKind::Expected {
				expected: Expectation::Identifier,
				found: self.token.kind.clone(),
			}
			.at(pos))
		}
	}

	fn expected(&self, expectation: Expectation) -> error::Error {
		ErrorKind::Expected {
			expected: expectation,
			found: self.token.kind.clone(),
		}
		.at(self.token.pos)
	}
}
