//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `stat` - per-symbol supply statistics (key: packed symbol code)
//! - `accounts` - per-owner balance rows (key: owner || symbol code)
//! - `exempt` - fee-exemption membership (key: symbol code || owner, empty value)
//!
//! Reads are point lookups. All writes go through [`Batch`], which is
//! committed as a single RocksDB `WriteBatch`: either every staged row
//! lands or none does.

use crate::{
    error::{Error, Result},
    types::{AccountId, AccountRecord, StatsRecord, SymbolCode},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::sync::Arc;

/// Column family names
const CF_STAT: &str = "stat";
const CF_ACCOUNTS: &str = "accounts";
const CF_EXEMPT: &str = "exempt";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_STAT, Self::cf_options_stat()),
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_EXEMPT, Self::cf_options_exempt()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_stat() -> Options {
        let mut opts = Options::default();
        // Few hot rows, read on every action
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Balance lookups are point reads, bloom filters pay for themselves
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_exempt() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn stat_key(code: SymbolCode) -> [u8; 8] {
        code.raw().to_be_bytes()
    }

    fn account_key(owner: &AccountId, code: SymbolCode) -> Vec<u8> {
        let mut key = owner.as_str().as_bytes().to_vec();
        key.push(b'|');
        key.extend_from_slice(&code.raw().to_be_bytes());
        key
    }

    fn exempt_key(code: SymbolCode, owner: &AccountId) -> Vec<u8> {
        let mut key = code.raw().to_be_bytes().to_vec();
        key.push(b'|');
        key.extend_from_slice(owner.as_str().as_bytes());
        key
    }

    // Point reads

    /// Get the stats row for a symbol, if created.
    pub fn get_stats(&self, code: SymbolCode) -> Result<Option<StatsRecord>> {
        let cf = self.cf_handle(CF_STAT)?;
        match self.db.get_cf(cf, Self::stat_key(code))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get the balance row for `(owner, symbol)`, if open.
    pub fn get_account(
        &self,
        owner: &AccountId,
        code: SymbolCode,
    ) -> Result<Option<AccountRecord>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, Self::account_key(owner, code))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Whether `owner` is fee-exempt for the symbol.
    pub fn is_exempt(&self, code: SymbolCode, owner: &AccountId) -> Result<bool> {
        let cf = self.cf_handle(CF_EXEMPT)?;
        Ok(self.db.get_cf(cf, Self::exempt_key(code, owner))?.is_some())
    }

    /// Commit a staged batch atomically.
    pub fn commit(&self, batch: Batch) -> Result<()> {
        let cf_stat = self.cf_handle(CF_STAT)?;
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_exempt = self.cf_handle(CF_EXEMPT)?;

        let mut wb = WriteBatch::default();
        for op in &batch.ops {
            match op {
                Op::PutStats(code, record) => {
                    wb.put_cf(cf_stat, Self::stat_key(*code), bincode::serialize(record)?);
                }
                Op::PutAccount(owner, code, record) => {
                    wb.put_cf(
                        cf_accounts,
                        Self::account_key(owner, *code),
                        bincode::serialize(record)?,
                    );
                }
                Op::EraseAccount(owner, code) => {
                    wb.delete_cf(cf_accounts, Self::account_key(owner, *code));
                }
                Op::PutExempt(code, owner) => {
                    wb.put_cf(cf_exempt, Self::exempt_key(*code, owner), &[]);
                }
                Op::EraseExempt(code, owner) => {
                    wb.delete_cf(cf_exempt, Self::exempt_key(*code, owner));
                }
            }
        }
        self.db.write(wb)?;

        tracing::debug!(ops = batch.ops.len(), "Batch committed");

        Ok(())
    }
}

/// One staged table mutation.
enum Op {
    PutStats(SymbolCode, StatsRecord),
    PutAccount(AccountId, SymbolCode, AccountRecord),
    EraseAccount(AccountId, SymbolCode),
    PutExempt(SymbolCode, AccountId),
    EraseExempt(SymbolCode, AccountId),
}

/// Staged table mutations applied in one atomic write.
#[derive(Default)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    /// Stage a stats row write.
    pub fn put_stats(&mut self, code: SymbolCode, record: StatsRecord) {
        self.ops.push(Op::PutStats(code, record));
    }

    /// Stage a balance row write.
    pub fn put_account(&mut self, owner: AccountId, code: SymbolCode, record: AccountRecord) {
        self.ops.push(Op::PutAccount(owner, code, record));
    }

    /// Stage a balance row deletion.
    pub fn erase_account(&mut self, owner: AccountId, code: SymbolCode) {
        self.ops.push(Op::EraseAccount(owner, code));
    }

    /// Stage an exemption row insertion.
    pub fn put_exempt(&mut self, code: SymbolCode, owner: AccountId) {
        self.ops.push(Op::PutExempt(code, owner));
    }

    /// Stage an exemption row deletion.
    pub fn erase_exempt(&mut self, code: SymbolCode, owner: AccountId) {
        self.ops.push(Op::EraseExempt(code, owner));
    }

    /// Number of staged mutations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Symbol};
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn tok() -> Symbol {
        Symbol::from_code("TOK", 4).unwrap()
    }

    fn test_stats() -> StatsRecord {
        StatsRecord {
            supply: Amount::zero(tok()),
            max_supply: Amount::new(10_000_000, tok()),
            issuer: AccountId::new("issuer"),
            fee_rate: 10,
        }
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_STAT).is_some());
        assert!(storage.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(storage.db.cf_handle(CF_EXEMPT).is_some());
    }

    #[test]
    fn test_stats_round_trip() {
        let (storage, _temp) = test_storage();
        let code = tok().code();

        assert!(storage.get_stats(code).unwrap().is_none());

        let mut batch = Batch::default();
        batch.put_stats(code, test_stats());
        storage.commit(batch).unwrap();

        let stats = storage.get_stats(code).unwrap().unwrap();
        assert_eq!(stats, test_stats());
    }

    #[test]
    fn test_account_put_and_erase() {
        let (storage, _temp) = test_storage();
        let code = tok().code();
        let alice = AccountId::new("alice");
        let record = AccountRecord {
            balance: Amount::new(500, tok()),
            is_frozen: false,
        };

        let mut batch = Batch::default();
        batch.put_account(alice.clone(), code, record.clone());
        storage.commit(batch).unwrap();
        assert_eq!(storage.get_account(&alice, code).unwrap().unwrap(), record);

        let mut batch = Batch::default();
        batch.erase_account(alice.clone(), code);
        storage.commit(batch).unwrap();
        assert!(storage.get_account(&alice, code).unwrap().is_none());
    }

    #[test]
    fn test_exempt_toggle() {
        let (storage, _temp) = test_storage();
        let code = tok().code();
        let alice = AccountId::new("alice");

        assert!(!storage.is_exempt(code, &alice).unwrap());

        let mut batch = Batch::default();
        batch.put_exempt(code, alice.clone());
        storage.commit(batch).unwrap();
        assert!(storage.is_exempt(code, &alice).unwrap());

        let mut batch = Batch::default();
        batch.erase_exempt(code, alice.clone());
        storage.commit(batch).unwrap();
        assert!(!storage.is_exempt(code, &alice).unwrap());
    }

    #[test]
    fn test_commit_is_atomic_across_tables() {
        let (storage, _temp) = test_storage();
        let code = tok().code();
        let alice = AccountId::new("alice");

        let mut batch = Batch::default();
        batch.put_stats(code, test_stats());
        batch.put_account(
            alice.clone(),
            code,
            AccountRecord {
                balance: Amount::new(100, tok()),
                is_frozen: false,
            },
        );
        batch.put_exempt(code, alice.clone());
        assert_eq!(batch.len(), 3);
        storage.commit(batch).unwrap();

        assert!(storage.get_stats(code).unwrap().is_some());
        assert!(storage.get_account(&alice, code).unwrap().is_some());
        assert!(storage.is_exempt(code, &alice).unwrap());
    }

    #[test]
    fn test_accounts_keyed_per_owner_and_symbol() {
        let (storage, _temp) = test_storage();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        let tok_code = tok().code();
        let tkn = Symbol::from_code("TKN", 4).unwrap();

        let mut batch = Batch::default();
        batch.put_account(
            alice.clone(),
            tok_code,
            AccountRecord {
                balance: Amount::new(1, tok()),
                is_frozen: false,
            },
        );
        batch.put_account(
            alice.clone(),
            tkn.code(),
            AccountRecord {
                balance: Amount::new(2, tkn),
                is_frozen: false,
            },
        );
        storage.commit(batch).unwrap();

        assert_eq!(
            storage
                .get_account(&alice, tok_code)
                .unwrap()
                .unwrap()
                .balance
                .amount(),
            1
        );
        assert_eq!(
            storage
                .get_account(&alice, tkn.code())
                .unwrap()
                .unwrap()
                .balance
                .amount(),
            2
        );
        assert!(storage.get_account(&bob, tok_code).unwrap().is_none());
    }
}
