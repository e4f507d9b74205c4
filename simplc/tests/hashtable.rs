use simplc::hashtable::HashTab;
use simplc::symbols::ShiftHashBuilder;

type Tab = HashTab<String, u32, ShiftHashBuilder>;

fn new_tab() -> Tab {
	HashTab::new(0.75, ShiftHashBuilder::default())
}

#[test]
fn insert_and_search() {
	let mut tab = new_tab();
	assert!(tab.is_empty());
	tab.insert("alpha".to_string(), 1).unwrap();
	tab.insert("beta".to_string(), 2).unwrap();

	assert_eq!(tab.len(), 2);
	assert_eq!(tab.search("alpha"), Some(&1));
	assert_eq!(tab.search("beta"), Some(&2));
	assert_eq!(tab.search("gamma"), None);
}

#[test]
fn duplicate_keys_are_rejected() {
	let mut tab = new_tab();
	tab.insert("x".to_string(), 1).unwrap();
	assert_eq!(tab.insert("x".to_string(), 2), Err(2));
	// the first binding survives
	assert_eq!(tab.search("x"), Some(&1));
	assert_eq!(tab.len(), 1);
}

#[test]
fn survives_rehashing() {
	// the initial table has 13 buckets; 200 entries force several rehashes
	let mut tab = new_tab();
	for i in 0..200u32 {
		tab.insert(format!("key{i}"), i).unwrap();
	}

	assert_eq!(tab.len(), 200);
	for i in 0..200u32 {
		assert_eq!(tab.search(format!("key{i}").as_str()), Some(&i));
	}
}
