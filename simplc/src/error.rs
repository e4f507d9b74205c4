use std::fmt::Display;

use crate::pos::SourcePos;
use crate::token::TokenKind;
use crate::types::ValType;

pub type Result<T> = std::result::Result<T, Error>;

/// What the parser wanted when the lookahead did not oblige
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
	Token(TokenKind),
	Identifier,
	Statement,
	Type,
	Factor,
	ExpressionOrString,
	ArgumentListOrAssignment,
	ArrayAllocationOrExpression,
}
impl Display for Expectation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Token(kind) => write!(f, "{kind}"),
			Self::Identifier => write!(f, "identifier"),
			Self::Statement => write!(f, "statement"),
			Self::Type => write!(f, "type"),
			Self::Factor => write!(f, "factor"),
			Self::ExpressionOrString => write!(f, "expression or string"),
			Self::ArgumentListOrAssignment => {
				write!(f, "argument list or variable assignment")
			}
			Self::ArrayAllocationOrExpression => {
				write!(f, "array allocation or expression")
			}
		}
	}
}

/// The closed catalogue of compilation errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
	// ==============================
	// Lexical errors
	// ==============================
	#[error("illegal character '{0}' (ASCII #{1})")]
	IllegalCharacter(char, u32),
	#[error("number too large")]
	NumberTooLarge,
	#[error("identifier too long")]
	IdentifierTooLong,
	#[error("string not closed")]
	StringNotClosed,
	#[error("illegal escape code '\\{0}' in string")]
	IllegalEscapeCode(char),
	#[error("non-printable character (ASCII #{0}) in string")]
	NonPrintableCharacter(u32),
	#[error("comment not closed")]
	CommentNotClosed,

	// ==============================
	// Syntax errors
	// ==============================
	#[error("expected {expected}, but found {found}")]
	Expected {
		expected: Expectation,
		found: TokenKind,
	},

	// ==============================
	// Declaration and scope errors
	// ==============================
	#[error("multiple definition of '{0}'")]
	MultipleDefinition(String),
	#[error("unknown identifier '{0}'")]
	UnknownIdentifier(String),

	// ==============================
	// Identifier kind errors
	// ==============================
	#[error("'{0}' is not a function")]
	NotAFunction(String),
	#[error("'{0}' is not a procedure")]
	NotAProcedure(String),
	#[error("'{0}' is not a variable")]
	NotAVariable(String),
	#[error("'{0}' is not an array")]
	NotAnArray(String),
	#[error("expected scalar variable instead of '{0}'")]
	ScalarVariableExpected(String),
	#[error("missing argument list for function '{0}'")]
	MissingFunctionArgumentList(String),

	// ==============================
	// Arity errors
	// ==============================
	#[error("{kind} '{id}' takes no arguments")]
	TakesNoArguments { kind: &'static str, id: String },
	#[error("too few arguments for call to '{0}'")]
	TooFewArguments(String),
	#[error("too many arguments for call to '{0}'")]
	TooManyArguments(String),

	// ==============================
	// Type errors
	// ==============================
	#[error("incompatible types (expected {expected}, found {found}) {context}")]
	IncompatibleTypes {
		expected: ValType,
		found: ValType,
		context: String,
	},
	#[error("{0} is an illegal array operation")]
	IllegalArrayOperation(String),

	// ==============================
	// Control errors
	// ==============================
	#[error("an exit expression is not allowed for a procedure")]
	ExitExpressionNotAllowed,
	#[error("missing exit expression for a function")]
	MissingExitExpression,
}
impl ErrorKind {
	pub fn at(self, pos: SourcePos) -> Error {
		Error { kind: self, pos }
	}
}

/// A fatal compilation error and where it happened
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{pos}: {kind}")]
pub struct Error {
	pub kind: ErrorKind,
	pub pos: SourcePos,
}
