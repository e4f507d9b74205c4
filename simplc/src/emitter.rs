use std::fmt::{Display, Formatter};

use crate::hashtable::HashTab;
use crate::symbols::{IdProp, ShiftHashBuilder};
use crate::types::ValType;

/// Branch target, unique within one compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);
impl Display for Label {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "L{}", self.0)
	}
}

/// Index into the emitter's string pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrId(u32);

/// Integer comparison condition of the compare-and-branch lowering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
}
impl Cond {
	fn mnemonic(self) -> &'static str {
		match self {
			Self::Eq => "if_icmpeq",
			Self::Ne => "if_icmpne",
			Self::Lt => "if_icmplt",
			Self::Le => "if_icmple",
			Self::Gt => "if_icmpgt",
			Self::Ge => "if_icmpge",
		}
	}
}

/// One instruction of the emitted stack machine program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
	Ldc(i32),
	LdcStr(StrId),

	Iload(u32),
	Istore(u32),
	Aload(u32),
	Astore(u32),
	Iaload,
	Iastore,

	Iadd,
	Isub,
	Imul,
	Idiv,
	Irem,
	Ineg,
	Iand,
	Ior,
	Ixor,

	/// Allocate an int array sized by the top of stack
	Newarray,

	Goto(Label),
	Ifeq(Label),
	IfIcmp(Cond, Label),
	/// Definition of a branch target
	Label(Label),

	Return,
	Ireturn,
	Areturn,

	/// Call a subroutine of the program class
	Invoke {
		name: String,
		params: Box<[ValType]>,
		ret: ValType,
	},

	// I/O primitives
	GetSystemOut,
	Swap,
	PrintInt,
	PrintBool,
	PrintString,
	GetScanner,
	ReadInt,
	ReadBool,
}

impl Instr {
	/// Net effect on the operand stack depth, for the stack limit
	fn stack_delta(&self) -> i32 {
		match self {
			Self::Ldc(_) | Self::LdcStr(_) => 1,
			Self::Iload(_) | Self::Aload(_) => 1,
			Self::Istore(_) | Self::Astore(_) => -1,
			Self::Iaload => -1,
			Self::Iastore => -3,

			Self::Iadd
			| Self::Isub
			| Self::Imul
			| Self::Idiv
			| Self::Irem
			| Self::Iand
			| Self::Ior
			| Self::Ixor => -1,
			Self::Ineg | Self::Newarray | Self::Swap => 0,

			Self::Goto(_) | Self::Label(_) => 0,
			Self::Ifeq(_) => -1,
			Self::IfIcmp(..) => -2,

			Self::Return => 0,
			Self::Ireturn | Self::Areturn => -1,

			Self::Invoke { params, ret, .. } => {
				let produced = i32::from(*ret != ValType::NONE);
				produced - params.len() as i32
			}

			Self::GetSystemOut | Self::GetScanner => 1,
			Self::PrintInt | Self::PrintBool | Self::PrintString => -2,
			Self::ReadInt | Self::ReadBool => 0,
		}
	}
}

/// Field descriptor of a value type. Every array is an int array; the
/// elements of a boolean array are stored as 0 or 1.
fn type_descriptor(typ: ValType) -> &'static str {
	if typ.is_array_type() {
		"[I"
	} else if typ.is_integer_type() {
		"I"
	} else if typ.is_boolean_type() {
		"Z"
	} else {
		"V"
	}
}

fn method_descriptor(params: &[ValType], ret: ValType) -> String {
	let mut descriptor = String::from("(");
	for param in params {
		descriptor.push_str(type_descriptor(*param));
	}
	descriptor.push(')');
	descriptor.push_str(type_descriptor(ret));
	descriptor
}

/// A finished subroutine, ready to be written out
struct Method {
	name: String,
	descriptor: String,
	locals: u32,
	stack: u32,
	code: Vec<Instr>,
}

struct OpenMethod {
	name: String,
	descriptor: String,
	ret: ValType,
	code: Vec<Instr>,
}

/// Code emitter: the instruction buffer of the open subroutine, the
/// subroutines already closed, a fresh-label counter, and the string pool.
pub struct Emitter {
	class_name: String,
	next_label: u32,
	pool: Vec<String>,
	pool_index: HashTab<String, StrId, ShiftHashBuilder>,
	methods: Vec<Method>,
	current: Option<OpenMethod>,
	uses_read: bool,
}

impl Default for Emitter {
	fn default() -> Self {
		Self::new()
	}
}

impl Emitter {
	pub fn new() -> Self {
		Self {
			class_name: String::new(),
			next_label: 0,
			pool: Vec::new(),
			pool_index: HashTab::new(0.75, ShiftHashBuilder::default()),
			methods: Vec::new(),
			current: None,
			uses_read: false,
		}
	}

	/// The identifier after "program"; also names the output file
	pub fn set_class_name(&mut self, name: &str) {
		self.class_name = name.to_string();
	}

	/// A fresh label, never handed out before
	pub fn get_label(&mut self) -> Label {
		let label = Label(self.next_label);
		self.next_label += 1;
		label
	}

	/// Append one instruction to the open subroutine
	pub fn emit(&mut self, instr: Instr) {
		match &mut self.current {
			Some(method) => method.code.push(instr),
			None => unreachable!("instruction emitted outside a subroutine"),
		}
	}

	/// Lower an integer comparison to a two-branch sequence that leaves
	/// 0 or 1 on the stack
	pub fn emit_cmp(&mut self, cond: Cond) {
		let true_label = self.get_label();
		let end_label = self.get_label();
		self.emit(Instr::IfIcmp(cond, true_label));
		self.emit(Instr::Ldc(0));
		self.emit(Instr::Goto(end_label));
		self.emit(Instr::Label(true_label));
		self.emit(Instr::Ldc(1));
		self.emit(Instr::Label(end_label));
	}

	/// Allocate a one-dimensional array; the length is on top of stack
	pub fn emit_newarray(&mut self) {
		self.emit(Instr::Newarray);
	}

	/// Call the named subroutine; the arguments are already on the stack
	pub fn emit_call(&mut self, id: &str, prop: &IdProp) {
		self.emit(Instr::Invoke {
			name: id.to_string(),
			params: prop.params.clone(),
			ret: prop.typ.strip_callable(),
		});
	}

	/// Print the value on top of stack as its type demands
	pub fn emit_print(&mut self, typ: ValType) {
		self.emit(Instr::GetSystemOut);
		self.emit(Instr::Swap);
		if typ.is_boolean_type() {
			self.emit(Instr::PrintBool);
		} else {
			self.emit(Instr::PrintInt);
		}
	}

	/// Print a string literal from the pool
	pub fn emit_print_string(&mut self, contents: &str) {
		let id = self.intern(contents);
		self.emit(Instr::GetSystemOut);
		self.emit(Instr::LdcStr(id));
		self.emit(Instr::PrintString);
	}

	/// Push one value read from standard input
	pub fn emit_read(&mut self, typ: ValType) {
		self.uses_read = true;
		self.emit(Instr::GetScanner);
		if typ.is_boolean_type() {
			self.emit(Instr::ReadBool);
		} else {
			self.emit(Instr::ReadInt);
		}
	}

	/// Open the frame of a subroutine. The JVM delivers static-method
	/// arguments in slots 0..n, but slot 0 is reserved and locals are
	/// numbered from 1, so the prologue shifts every argument up by one.
	pub fn init_subroutine(&mut self, name: &str, prop: &IdProp) {
		let ret = prop.typ.strip_callable();
		let mut code = Vec::new();
		for (slot, param) in prop.params.iter().enumerate().rev() {
			let slot = slot as u32;
			if param.is_array_type() {
				code.push(Instr::Aload(slot));
				code.push(Instr::Astore(slot + 1));
			} else {
				code.push(Instr::Iload(slot));
				code.push(Instr::Istore(slot + 1));
			}
		}

		self.open_method(name, method_descriptor(&prop.params, ret), ret, code);
	}

	/// Open the frame of the implicit main subroutine
	pub fn init_main(&mut self) {
		let descriptor = String::from("([Ljava/lang/String;)V");
		self.open_method("main", descriptor, ValType::NONE, Vec::new());
	}

	fn open_method(&mut self, name: &str, descriptor: String, ret: ValType, code: Vec<Instr>) {
		if self.current.is_some() {
			unreachable!("subroutine opened while another is open");
		}
		self.current = Some(OpenMethod {
			name: name.to_string(),
			descriptor,
			ret,
			code,
		});
	}

	/// Close the open subroutine, recording its frame width
	pub fn close_subroutine(&mut self, locals_width: u32) {
		let Some(mut method) = self.current.take() else {
			unreachable!("subroutine closed without an open one");
		};

		// a subroutine without return value may fall off its end
		if method.ret == ValType::NONE && method.code.last() != Some(&Instr::Return) {
			method.code.push(Instr::Return);
		}

		let stack = max_stack(&method.code);
		self.methods.push(Method {
			name: method.name,
			descriptor: method.descriptor,
			locals: locals_width,
			stack,
			code: method.code,
		});
	}

	/// Hand the finished program over for writing
	pub fn serialize(self) -> Assembly {
		Assembly {
			class_name: self.class_name,
			pool: self.pool,
			methods: self.methods,
			uses_read: self.uses_read,
		}
	}

	fn intern(&mut self, contents: &str) -> StrId {
		if let Some(id) = self.pool_index.search(contents) {
			return *id;
		}
		let id = StrId(self.pool.len() as u32);
		self.pool.push(contents.to_string());
		self.pool_index
			.insert(contents.to_string(), id)
			.unwrap_or_else(|_| unreachable!("string interned twice"));
		id
	}
}

/// Running maximum of the operand stack depth over straight-line code.
/// Branching only ever lowers the true depth below this estimate, so the
/// result is a safe limit.
fn max_stack(code: &[Instr]) -> u32 {
	let mut depth: i32 = 0;
	let mut max: i32 = 1;
	for instr in code {
		depth = (depth + instr.stack_delta()).max(0);
		max = max.max(depth);
	}
	max as u32
}

/// The serialised program: everything needed to write `<ClassName>.j`
pub struct Assembly {
	class_name: String,
	pool: Vec<String>,
	methods: Vec<Method>,
	uses_read: bool,
}

impl Assembly {
	pub fn class_name(&self) -> &str {
		&self.class_name
	}

	/// Name of the output file
	pub fn file_name(&self) -> String {
		format!("{}.j", self.class_name)
	}
}

impl Display for Assembly {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		writeln!(f, ".class public {}", self.class_name)?;
		writeln!(f, ".super java/lang/Object")?;

		if self.uses_read {
			writeln!(f)?;
			writeln!(f, ".field private static $in Ljava/util/Scanner;")?;
			writeln!(f)?;
			writeln!(f, ".method static <clinit>()V")?;
			writeln!(f, "  .limit stack 3")?;
			writeln!(f, "  .limit locals 0")?;
			writeln!(f, "  new java/util/Scanner")?;
			writeln!(f, "  dup")?;
			writeln!(f, "  getstatic java/lang/System/in Ljava/io/InputStream;")?;
			writeln!(
				f,
				"  invokespecial java/util/Scanner/<init>(Ljava/io/InputStream;)V"
			)?;
			writeln!(f, "  putstatic {}/$in Ljava/util/Scanner;", self.class_name)?;
			writeln!(f, "  return")?;
			writeln!(f, ".end method")?;
		}

		for method in &self.methods {
			writeln!(f)?;
			writeln!(f, ".method public static {}{}", method.name, method.descriptor)?;
			writeln!(f, "  .limit stack {}", method.stack)?;
			writeln!(f, "  .limit locals {}", method.locals)?;
			for instr in &method.code {
				self.write_instr(f, instr)?;
			}
			writeln!(f, ".end method")?;
		}

		Ok(())
	}
}

impl Assembly {
	fn write_instr(&self, f: &mut Formatter<'_>, instr: &Instr) -> std::fmt::Result {
		if let Instr::Label(label) = instr {
			return writeln!(f, "{label}:");
		}

		write!(f, "  ")?;
		match instr {
			Instr::Ldc(value) => writeln!(f, "ldc {value}"),
			Instr::LdcStr(StrId(id)) => {
				writeln!(f, "ldc \"{}\"", self.pool[*id as usize])
			}

			Instr::Iload(slot) => writeln!(f, "iload {slot}"),
			Instr::Istore(slot) => writeln!(f, "istore {slot}"),
			Instr::Aload(slot) => writeln!(f, "aload {slot}"),
			Instr::Astore(slot) => writeln!(f, "astore {slot}"),
			Instr::Iaload => writeln!(f, "iaload"),
			Instr::Iastore => writeln!(f, "iastore"),

			Instr::Iadd => writeln!(f, "iadd"),
			Instr::Isub => writeln!(f, "isub"),
			Instr::Imul => writeln!(f, "imul"),
			Instr::Idiv => writeln!(f, "idiv"),
			Instr::Irem => writeln!(f, "irem"),
			Instr::Ineg => writeln!(f, "ineg"),
			Instr::Iand => writeln!(f, "iand"),
			Instr::Ior => writeln!(f, "ior"),
			Instr::Ixor => writeln!(f, "ixor"),

			Instr::Newarray => writeln!(f, "newarray int"),

			Instr::Goto(label) => writeln!(f, "goto {label}"),
			Instr::Ifeq(label) => writeln!(f, "ifeq {label}"),
			Instr::IfIcmp(cond, label) => writeln!(f, "{} {label}", cond.mnemonic()),
			Instr::Label(_) => unreachable!("label handled above"),

			Instr::Return => writeln!(f, "return"),
			Instr::Ireturn => writeln!(f, "ireturn"),
			Instr::Areturn => writeln!(f, "areturn"),

			Instr::Invoke { name, params, ret } => writeln!(
				f,
				"invokestatic {}/{}{}",
				self.class_name,
				name,
				method_descriptor(params, *ret)
			),

			Instr::GetSystemOut => {
				writeln!(f, "getstatic java/lang/System/out Ljava/io/PrintStream;")
			}
			Instr::Swap => writeln!(f, "swap"),
			Instr::PrintInt => writeln!(f, "invokevirtual java/io/PrintStream/print(I)V"),
			Instr::PrintBool => writeln!(f, "invokevirtual java/io/PrintStream/print(Z)V"),
			Instr::PrintString => writeln!(
				f,
				"invokevirtual java/io/PrintStream/print(Ljava/lang/String;)V"
			),
			Instr::GetScanner => {
				writeln!(f, "getstatic {}/$in Ljava/util/Scanner;", self.class_name)
			}
			Instr::ReadInt => writeln!(f, "invokevirtual java/util/Scanner/nextInt()I"),
			Instr::ReadBool => {
				writeln!(f, "invokevirtual java/util/Scanner/nextBoolean()Z")
			}
		}
	}
}
