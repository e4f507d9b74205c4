use std::hash::{BuildHasherDefault, Hasher};
use std::mem;

use crate::hashtable::HashTab;
use crate::types::ValType;

/// Cyclic-shift string hash. Plain summing of character codes clusters
/// short names into the same buckets; the rotation spreads them out.
#[derive(Default)]
pub struct ShiftHasher(u32);
impl Hasher for ShiftHasher {
	fn write(&mut self, bytes: &[u8]) {
		for &byte in bytes {
			self.0 = self.0.rotate_left(5).wrapping_add(u32::from(byte));
		}
	}
	fn finish(&self) -> u64 {
		u64::from(self.0)
	}
}

pub type ShiftHashBuilder = BuildHasherDefault<ShiftHasher>;

type Scope = HashTab<String, IdProp, ShiftHashBuilder>;

const MAX_LOADFACTOR: f32 = 0.75;

fn new_scope() -> Scope {
	HashTab::new(MAX_LOADFACTOR, ShiftHashBuilder::default())
}

/// Properties attached to a declared identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdProp {
	pub typ: ValType,
	/// Local-variable slot, assigned at insertion; slot 0 is reserved
	pub offset: u32,
	/// Parameter types in declared order; empty for variables
	pub params: Box<[ValType]>,
}
impl IdProp {
	pub fn variable(typ: ValType) -> Self {
		Self {
			typ,
			offset: 0,
			params: Box::default(),
		}
	}
	pub fn callable(typ: ValType, params: Box<[ValType]>) -> Self {
		Self {
			typ,
			offset: 0,
			params,
		}
	}
	pub fn nparams(&self) -> usize {
		self.params.len()
	}
}

/// Two-level symbol table: the global scope plus at most one active
/// subroutine scope. Lookup tries the active scope first; only callable
/// entries are visible across the boundary.
pub struct SymbolTable {
	table: Scope,
	saved: Option<SavedScope>,
	/// Next local slot to hand out in the active scope
	curr_offset: u32,
}

struct SavedScope {
	table: Scope,
	curr_offset: u32,
}

impl Default for SymbolTable {
	fn default() -> Self {
		Self::new()
	}
}

impl SymbolTable {
	pub fn new() -> Self {
		Self {
			table: new_scope(),
			saved: None,
			curr_offset: 1,
		}
	}

	/// Insert the callable in the global scope, then activate a fresh
	/// subroutine scope with slot numbering restarted at 1. Fails on a
	/// duplicate callable name.
	pub fn open_subroutine(&mut self, id: &str, prop: IdProp) -> bool {
		if self.table.insert(id.to_string(), prop).is_err() {
			return false;
		}
		let global = mem::replace(&mut self.table, new_scope());
		self.saved = Some(SavedScope {
			table: global,
			curr_offset: self.curr_offset,
		});
		self.curr_offset = 1;
		true
	}

	/// Drop the subroutine scope and reactivate the global scope.
	/// Must balance a successful `open_subroutine`.
	pub fn close_subroutine(&mut self) {
		match self.saved.take() {
			Some(saved) => {
				self.table = saved.table;
				self.curr_offset = saved.curr_offset;
			}
			None => unreachable!("subroutine scope closed without an open one"),
		}
	}

	/// Insert into the active scope; a variable gets the next local slot.
	/// Returns false if the name already exists in the active scope.
	pub fn insert(&mut self, id: &str, mut prop: IdProp) -> bool {
		let is_variable = prop.typ.is_variable();
		if is_variable {
			prop.offset = self.curr_offset;
		}
		match self.table.insert(id.to_string(), prop) {
			Ok(()) => {
				if is_variable {
					self.curr_offset += 1;
				}
				true
			}
			Err(_) => false,
		}
	}

	/// Active-scope hit wins; a global entry is accepted only if callable
	pub fn find(&self, id: &str) -> Option<&IdProp> {
		if let Some(prop) = self.table.search(id) {
			return Some(prop);
		}
		self.saved
			.as_ref()
			.and_then(|saved| saved.table.search(id))
			.filter(|prop| prop.typ.is_callable())
	}

	/// One past the highest assigned slot; the frame width of the scope
	pub fn locals_width(&self) -> u32 {
		self.curr_offset
	}
}
