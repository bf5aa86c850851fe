//! Whole-file read / write under a lock
//! 加锁下的整文件读写
//!
//! Each call holds the lock only for its own duration.
//! 每次调用仅在自身执行期间持有锁。

use std::{
  io::{self, Read, Seek, SeekFrom, Write},
  path::Path,
};

use crate::{Error, Flag, LockedFile, Result, consts::READ_BUF, locked::first_err};

/// Read whole file under a shared lock / 共享锁下读取整个文件
pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
  let mut file = LockedFile::open_read(path)?;
  let mut buf = Vec::with_capacity(READ_BUF);
  let r = file.read_to_end(&mut buf);
  // Close error is ignored once content is in hand / 内容已读出后忽略关闭错误
  let _ = file.close();
  r.map_err(Error::from_io)?;
  Ok(buf)
}

/// Create or truncate `path` (mode `perm` when created) under an exclusive
/// lock and copy `content` into it.
/// A copy error is returned even if close also fails; otherwise the close
/// error is returned.
/// 在排他锁下创建或截断 `path`，并写入 `content`。
/// 复制出错时即使关闭也失败仍返回复制错误，否则返回关闭错误。
pub fn write(path: impl AsRef<Path>, mut content: impl Read, perm: u32) -> Result<()> {
  let mut file = LockedFile::open(path, Flag::Create, perm)?;
  let copied = io::copy(&mut content, &mut file)
    .map(drop)
    .map_err(Error::from_io);
  first_err(copied, file.close())
}

/// Read-modify-write under one exclusive lock. Unchanged content is not
/// rewritten. If writing fails, the previous content is restored (best
/// effort) before the error is returned.
/// 单个排他锁下读取、修改、写回。内容未变则不写。写入失败时尽力恢复原内容后返回错误。
pub fn transform(
  path: impl AsRef<Path>,
  f: impl FnOnce(&[u8]) -> Result<Vec<u8>>,
) -> Result<()> {
  LockedFile::with_edit(path, |file| {
    let mut old = Vec::with_capacity(READ_BUF);
    file.read_to_end(&mut old).map_err(Error::from_io)?;
    let new = f(&old)?;
    if new == old {
      return Ok(());
    }
    match rewrite(&mut *file, &old, &new) {
      Ok(()) => file.set_len(new.len() as u64),
      Err(e) => {
        let _ = file.set_len(old.len() as u64);
        Err(Error::from_io(e))
      }
    }
  })
}

/// Overwrite `old` with `new` in place. The part past `old.len()` goes first
/// so a failure there leaves `old` untouched; a failure in the prefix writes
/// `old` back. Length is left to the caller.
/// 原地用 `new` 覆盖 `old`。先写超出 `old.len()` 的部分，失败时 `old` 不变；
/// 前缀写入失败则写回 `old`。长度由调用方设置。
fn rewrite(file: &mut (impl Write + Seek), old: &[u8], new: &[u8]) -> io::Result<()> {
  if new.len() > old.len() {
    file.seek(SeekFrom::Start(old.len() as u64))?;
    file.write_all(&new[old.len()..])?;
  }
  let head = &new[..new.len().min(old.len())];
  let r = file
    .seek(SeekFrom::Start(0))
    .and_then(|_| file.write_all(head));
  if r.is_err() {
    let _ = file
      .seek(SeekFrom::Start(0))
      .and_then(|_| file.write_all(old));
  }
  r
}
