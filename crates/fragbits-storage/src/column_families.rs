//! RocksDB column family definitions.
//!
//! Two databases share these definitions:
//!
//! | Database | CFs | Key format | Access pattern |
//! |----------|-----|------------|----------------|
//! | fingerprint store | `fingerprints`, `meta` | UTF-8 identifier / scalar name | point gets + ordered scans |
//! | neighbor index | `neighbors`, `members`, `meta` | `query\0hit` / identifier / scalar name | prefix scans + point gets |
//!
//! All column families of one database share a single LRU block cache.
//! Identifier keys are stored as raw UTF-8, so RocksDB's default total
//! ordering gives lexicographic key order and prefix scans need no custom
//! extractor.

use rocksdb::{BlockBasedOptions, Cache, ColumnFamilyDescriptor, Options};

/// Column family name constants.
pub mod cf_names {
    /// Fingerprint payloads, identifier -> encoded bit positions.
    pub const FINGERPRINTS: &str = "fingerprints";

    /// Store-level scalar metadata (e.g. `number_of_bits`). Tiny values,
    /// rare access, readable without touching any fingerprint.
    pub const META: &str = "meta";

    /// Directed scored pairs, `query\0hit` -> little-endian f64 score.
    pub const NEIGHBORS: &str = "neighbors";

    /// Identifiers present when the index was built (empty values).
    pub const MEMBERS: &str = "members";

    /// Column families of a fingerprint store database.
    pub const STORE_ALL: &[&str] = &[FINGERPRINTS, META];

    /// Column families of a neighbor index database.
    pub const INDEX_ALL: &[&str] = &[NEIGHBORS, MEMBERS, META];
}

/// Options for the fingerprint payload CF.
///
/// Bloom filter for point lookups, LZ4 compression, shared block cache.
/// No prefix extractor: prefix iteration runs over the default total order.
pub fn fingerprints_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);

    opts
}

/// Options for the scored pairs CF (range scans by query prefix).
pub fn neighbors_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);

    opts
}

/// Options for the index member set CF (point lookups, empty values).
pub fn members_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);

    opts
}

/// Options for the scalar metadata CF. A handful of tiny values, so
/// compression buys nothing.
pub fn meta_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::None);
    opts.create_if_missing(true);

    opts
}

/// Descriptors for opening a fingerprint store database.
pub fn store_descriptors(cache: &Cache) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(cf_names::FINGERPRINTS, fingerprints_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::META, meta_options(cache)),
    ]
}

/// Descriptors for opening a neighbor index database.
pub fn index_descriptors(cache: &Cache) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(cf_names::NEIGHBORS, neighbors_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::MEMBERS, members_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::META, meta_options(cache)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_descriptor_names_match_constants() {
        let cache = Cache::new_lru_cache(1024 * 1024);
        let descriptors = store_descriptors(&cache);
        let names: Vec<&str> = descriptors.iter().map(|d| d.name()).collect();
        assert_eq!(names, cf_names::STORE_ALL);
    }

    #[test]
    fn test_index_descriptor_names_match_constants() {
        let cache = Cache::new_lru_cache(1024 * 1024);
        let descriptors = index_descriptors(&cache);
        let names: Vec<&str> = descriptors.iter().map(|d| d.name()).collect();
        assert_eq!(names, cf_names::INDEX_ALL);
    }
}
