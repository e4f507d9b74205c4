use simplc::error::ErrorKind;
use simplc::pos::SourcePos;
use simplc::types::{check, ValType};

const POS: SourcePos = SourcePos::new(1, 1);

#[test]
fn check_is_reflexive() {
	let types = [
		ValType::INTEGER,
		ValType::BOOLEAN,
		ValType::INTEGER | ValType::ARRAY,
		ValType::BOOLEAN | ValType::ARRAY,
	];
	for typ in types {
		assert!(check(typ, typ, POS, "for a test").is_ok());
	}
}

#[test]
fn check_rejects_unequal_types() {
	let err = check(ValType::INTEGER, ValType::BOOLEAN, POS, "for 'if' guard")
		.expect_err("must not widen");
	assert_eq!(
		err.kind.to_string(),
		"incompatible types (expected boolean, found integer) for 'if' guard"
	);
}

#[test]
fn arrays_never_equal_scalars() {
	let arr = ValType::INTEGER | ValType::ARRAY;
	assert!(check(arr, ValType::INTEGER, POS, "for a test").is_err());
	assert!(check(ValType::INTEGER, arr, POS, "for a test").is_err());
}

#[test]
fn predicates() {
	let int_arr = ValType::INTEGER | ValType::ARRAY;
	let func = ValType::CALLABLE | ValType::BOOLEAN;
	let proc = ValType::CALLABLE;

	assert!(int_arr.is_array());
	assert!(int_arr.is_variable());
	assert!(!int_arr.is_callable());

	assert!(func.is_function());
	assert!(!func.is_procedure());
	assert!(!func.is_variable());
	assert_eq!(func.strip_callable(), ValType::BOOLEAN);

	assert!(proc.is_procedure());
	assert!(!proc.is_function());

	// an array-returning function is not itself an array variable
	let arr_func = ValType::CALLABLE | ValType::INTEGER | ValType::ARRAY;
	assert!(!arr_func.is_array());
	assert!(arr_func.is_function());
	assert_eq!(arr_func.strip_callable(), int_arr);
}

#[test]
fn display_names() {
	assert_eq!(ValType::INTEGER.to_string(), "integer");
	assert_eq!(ValType::BOOLEAN.to_string(), "boolean");
	assert_eq!((ValType::INTEGER | ValType::ARRAY).to_string(), "integer array");
	assert_eq!(ValType::CALLABLE.to_string(), "procedure");
	assert_eq!(
		(ValType::CALLABLE | ValType::BOOLEAN).to_string(),
		"boolean function"
	);
}

#[test]
fn mismatch_carries_the_error_position() {
	let pos = SourcePos::new(3, 14);
	let err = check(ValType::BOOLEAN, ValType::INTEGER, pos, "for operator '+'")
		.expect_err("mismatch");
	assert_eq!(err.pos, pos);
	assert!(matches!(err.kind, ErrorKind::IncompatibleTypes { .. }));
}
