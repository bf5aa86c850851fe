#![cfg_attr(docsrs, feature(doc_cfg))]

//! # lockedfile - Files whose contents change atomically under a lock / 加锁下内容原子变更的文件
//!
//! A [`LockedFile`] takes an OS advisory lock when opened and holds it until
//! [`LockedFile::close`]: shared for reads, exclusive for writes. Opening
//! blocks until the lock is granted; the `try_*` variants fail fast with
//! [`Error::Locked`].
//! [`LockedFile`] 打开时获取操作系统咨询锁，持有至 [`LockedFile::close`]：
//! 读为共享锁，写为排他锁。打开会阻塞直到获得锁；`try_*` 系列快速失败。
//!
//! Locks are cooperative: only participants that open through this crate
//! (or flock / LockFileEx on the same file) are excluded.
//! 锁是协作式的：仅排斥同样加锁的参与者。

mod consts;
pub mod error;
mod file_lock;
mod flag;
pub mod leak;
mod locked;
mod whole;

pub use consts::CREATE_PERM;
pub use error::{Error, Result};
pub use flag::{Flag, Mode};
pub use locked::LockedFile;
pub use whole::{read, transform, write};
