use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};

/// Difference between 2^i and the largest prime below 2^i, for each i.
/// Bucket counts are always taken from here, so they stay prime.
const DELTA: [usize; 32] = [
	0, 0, 1, 1, 3, 1, 3, 1, 5, 3, 3, 9, 3, 1, 3, 19, 15, 1, 5, 1, 3, 9, 3, 15,
	3, 39, 5, 39, 57, 3, 35, 1,
];

const INITIAL_DELTA_INDEX: usize = 4;

fn prime_size(delta_idx: usize) -> usize {
	(1usize << delta_idx) - DELTA[delta_idx]
}

struct HtEntry<K, V> {
	key: K,
	value: V,
	next: Link<K, V>,
}
type Link<K, V> = Option<Box<HtEntry<K, V>>>;

/// Open hash table with separate chaining and prime bucket counts.
/// Duplicate keys are rejected, never replaced.
pub struct HashTab<K, V, S> {
	table: Vec<Link<K, V>>,
	num_entries: usize,
	max_loadfactor: f32,
	delta_idx: usize,
	build_hasher: S,
}

impl<K: Hash + Eq, V, S: BuildHasher> HashTab<K, V, S> {
	pub fn new(max_loadfactor: f32, build_hasher: S) -> Self {
		let size = prime_size(INITIAL_DELTA_INDEX);
		let mut table = Vec::with_capacity(size);
		table.resize_with(size, || None);

		Self {
			table,
			num_entries: 0,
			max_loadfactor,
			delta_idx: INITIAL_DELTA_INDEX,
			build_hasher,
		}
	}

	/// Number of entries over all buckets
	pub fn len(&self) -> usize {
		self.num_entries
	}
	pub fn is_empty(&self) -> bool {
		self.num_entries == 0
	}

	/// Insert a key-value pair. The value is handed back if the key is
	/// already present.
	pub fn insert(&mut self, key: K, value: V) -> Result<(), V> {
		if self.search(&key).is_some() {
			return Err(value);
		}

		self.num_entries += 1;
		if self.num_entries as f32 > self.max_loadfactor * self.table.len() as f32 {
			self.rehash();
		}

		let k = self.bucket(&key, self.table.len());
		let next = self.table[k].take();
		self.table[k] = Some(Box::new(HtEntry { key, value, next }));

		Ok(())
	}

	pub fn search<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let k = self.bucket(key, self.table.len());
		let mut entry = self.table[k].as_deref();
		while let Some(e) = entry {
			if e.key.borrow() == key {
				return Some(&e.value);
			}
			entry = e.next.as_deref();
		}
		None
	}

	fn bucket<Q: Hash + ?Sized>(&self, key: &Q, size: usize) -> usize {
		(self.build_hasher.hash_one(key) % size as u64) as usize
	}

	/// Move every entry into a table of the next prime size
	fn rehash(&mut self) {
		self.delta_idx += 1;
		let new_size = prime_size(self.delta_idx);
		let mut new_table: Vec<Link<K, V>> = Vec::with_capacity(new_size);
		new_table.resize_with(new_size, || None);

		for slot in self.table.iter_mut() {
			let mut entry = slot.take();
			while let Some(mut e) = entry {
				entry = e.next.take();
				let k = self.build_hasher.hash_one(&e.key) as usize % new_size;
				e.next = new_table[k].take();
				new_table[k] = Some(e);
			}
		}

		self.table = new_table;
	}
}
