use std::fmt::Display;

use crate::error::{self, ErrorKind};
use crate::pos::SourcePos;

bitflags::bitflags! {
	/// Value type bitset.
	///
	/// A legal variable type is exactly one of BOOLEAN or INTEGER,
	/// optionally combined with ARRAY. A callable is CALLABLE alone
	/// (procedure) or CALLABLE plus a return value type (function).
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct ValType: u8 {
		const ARRAY = 1;
		const BOOLEAN = 2;
		const INTEGER = 4;
		const CALLABLE = 8;
	}
}

impl ValType {
	pub const NONE: ValType = ValType::empty();

	/// An array variable; callables are excluded even when they return arrays
	pub fn is_array(self) -> bool {
		self.contains(Self::ARRAY) && !self.contains(Self::CALLABLE)
	}
	pub fn is_array_type(self) -> bool {
		self.contains(Self::ARRAY)
	}
	pub fn is_boolean_type(self) -> bool {
		self.contains(Self::BOOLEAN)
	}
	pub fn is_integer_type(self) -> bool {
		self.contains(Self::INTEGER)
	}
	pub fn is_callable(self) -> bool {
		self.contains(Self::CALLABLE)
	}
	pub fn is_procedure(self) -> bool {
		self == Self::CALLABLE
	}
	pub fn is_function(self) -> bool {
		self.is_callable() && !self.is_procedure()
	}
	/// A scalar or array variable type
	pub fn is_variable(self) -> bool {
		!self.contains(Self::CALLABLE)
			&& (self.contains(Self::BOOLEAN) ^ self.contains(Self::INTEGER))
	}

	/// The value type a call to this callable yields
	pub fn strip_callable(self) -> ValType {
		self & !Self::CALLABLE
	}
	/// The scalar base type, with array and callable flags removed
	pub fn base_type(self) -> ValType {
		self & (Self::BOOLEAN | Self::INTEGER)
	}
}

impl Display for ValType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_procedure() {
			return write!(f, "procedure");
		}
		let base = if self.is_boolean_type() {
			"boolean"
		} else if self.is_integer_type() {
			"integer"
		} else {
			return write!(f, "no type");
		};
		write!(f, "{base}")?;
		if self.is_array_type() {
			write!(f, " array")?;
		}
		if self.is_callable() {
			write!(f, " function")?;
		}
		Ok(())
	}
}

/// Structural type equality; there is no implicit widening
pub fn check(
	found: ValType,
	expected: ValType,
	pos: SourcePos,
	context: impl Into<String>,
) -> error::Result<()> {
	if found == expected {
		Ok(())
	} else {
		Err(ErrorKind::IncompatibleTypes {
			expected,
			found,
			context: context.into(),
		}
		.at(pos))
	}
}
