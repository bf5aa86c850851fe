//! Locked file handle / 加锁文件句柄

use std::{
  fmt,
  fs::{File, Metadata},
  io::{self, Read, Seek, SeekFrom, Write},
  path::{Path, PathBuf},
};

use log::{debug, trace};

use crate::{
  CREATE_PERM, Error, Flag, Mode, Result,
  file_lock::{FileLock, Wait, is_contended},
  leak,
};

struct Open {
  lock: FileLock,
  leak: leak::Guard,
}

/// A file holding an advisory lock from open until `close`.
/// 从打开到 `close` 期间持有咨询锁的文件。
///
/// Dropping a handle that was not closed releases the lock and fires the
/// [`leak`](crate::leak) policy, which aborts the process by default.
pub struct LockedFile {
  open: Option<Open>,
  mode: Mode,
  path: PathBuf,
}

impl LockedFile {
  /// Open with `flag`, blocking until the lock is granted.
  /// `perm` applies only when the file is created (before umask).
  /// 以 `flag` 打开，阻塞直到获得锁。`perm` 仅在创建文件时生效（umask 之前）。
  pub fn open(path: impl AsRef<Path>, flag: Flag, perm: u32) -> Result<Self> {
    Self::acquire(path.as_ref(), flag, perm, Wait::Block)
  }

  /// Like [`open`](Self::open) but returns [`Error::Locked`] instead of waiting
  /// 同 [`open`](Self::open)，但锁被占用时返回 [`Error::Locked`] 而非等待
  pub fn try_open(path: impl AsRef<Path>, flag: Flag, perm: u32) -> Result<Self> {
    Self::acquire(path.as_ref(), flag, perm, Wait::Try)
  }

  /// Read only, shared lock / 只读，共享锁
  #[inline]
  pub fn open_read(path: impl AsRef<Path>) -> Result<Self> {
    Self::open(path, Flag::Read, 0)
  }

  /// Create or truncate, exclusive lock / 创建或截断，排他锁
  #[inline]
  pub fn create(path: impl AsRef<Path>) -> Result<Self> {
    Self::open(path, Flag::Create, CREATE_PERM)
  }

  /// Create if missing, keep existing bytes, exclusive lock
  /// 不存在则创建，保留已有内容，排他锁
  #[inline]
  pub fn edit(path: impl AsRef<Path>) -> Result<Self> {
    Self::open(path, Flag::Edit, CREATE_PERM)
  }

  #[inline]
  pub fn try_open_read(path: impl AsRef<Path>) -> Result<Self> {
    Self::try_open(path, Flag::Read, 0)
  }

  #[inline]
  pub fn try_edit(path: impl AsRef<Path>) -> Result<Self> {
    Self::try_open(path, Flag::Edit, CREATE_PERM)
  }

  fn acquire(path: &Path, flag: Flag, perm: u32, wait: Wait) -> Result<Self> {
    let lock = match FileLock::acquire(path, flag, perm, wait) {
      Ok(lock) => lock,
      Err(e) if wait == Wait::Try && is_contended(&e) => {
        return Err(Error::Locked(path.to_path_buf()));
      }
      Err(e) => return Err(e.into()),
    };
    let mode = flag.mode();
    trace!("lock {mode:?} {}", path.display());
    Ok(Self {
      open: Some(Open {
        lock,
        leak: leak::Guard::arm(path),
      }),
      mode,
      path: path.to_path_buf(),
    })
  }

  /// Open a shared-locked handle, run `f`, always close.
  /// An error from `f` takes precedence over the close error.
  /// 打开共享锁句柄，执行 `f`，始终关闭。`f` 的错误优先于关闭错误。
  pub fn with_read<T>(
    path: impl AsRef<Path>,
    f: impl FnOnce(&mut Self) -> Result<T>,
  ) -> Result<T> {
    let mut file = Self::open_read(path)?;
    let r = f(&mut file);
    file.finish(r)
  }

  /// Exclusive counterpart of [`with_read`](Self::with_read), opened with [`edit`](Self::edit)
  /// [`with_read`](Self::with_read) 的排他版本，以 [`edit`](Self::edit) 打开
  pub fn with_edit<T>(
    path: impl AsRef<Path>,
    f: impl FnOnce(&mut Self) -> Result<T>,
  ) -> Result<T> {
    let mut file = Self::edit(path)?;
    let r = f(&mut file);
    file.finish(r)
  }

  /// Close unless `f` already did / 若 `f` 未关闭则关闭
  fn finish<T>(mut self, r: Result<T>) -> Result<T> {
    let closed = if self.is_closed() { Ok(()) } else { self.close() };
    first_err(r, closed)
  }

  /// Unlock and close. Only the first call does anything; later calls
  /// return [`Error::Closed`].
  /// 解锁并关闭。仅首次调用生效，之后返回 [`Error::Closed`]。
  pub fn close(&mut self) -> Result<()> {
    let Some(Open { lock, leak }) = self.open.take() else {
      debug!("close {}: already closed", self.path.display());
      return Err(Error::Closed(self.path.clone()));
    };
    leak.disarm();
    trace!("unlock {:?} {}", self.mode, self.path.display());
    lock.release().map_err(Error::Io)
  }

  #[inline]
  pub fn path(&self) -> &Path {
    &self.path
  }

  #[inline]
  pub fn mode(&self) -> Mode {
    self.mode
  }

  #[inline]
  pub fn is_closed(&self) -> bool {
    self.open.is_none()
  }

  pub fn metadata(&self) -> Result<Metadata> {
    Ok(self.file().map_err(Error::from_io)?.metadata()?)
  }

  /// Truncate or extend, needs an exclusive handle / 截断或扩展，需要排他句柄
  pub fn set_len(&self, size: u64) -> Result<()> {
    Ok(self.file().map_err(Error::from_io)?.set_len(size)?)
  }

  fn file(&self) -> io::Result<&File> {
    match &self.open {
      Some(open) => Ok(open.lock.file()),
      None => Err(Error::Closed(self.path.clone()).into()),
    }
  }
}

/// Error of the operation wins over the close error
/// 操作错误优先于关闭错误
pub(crate) fn first_err<T>(r: Result<T>, closed: Result<()>) -> Result<T> {
  let val = r?;
  closed?;
  Ok(val)
}

impl Drop for LockedFile {
  fn drop(&mut self) {
    if let Some(Open { lock, leak }) = self.open.take() {
      let _ = lock.release();
      leak.fire(&self.path);
    }
  }
}

impl fmt::Debug for LockedFile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LockedFile")
      .field("path", &self.path)
      .field("mode", &self.mode)
      .field("closed", &self.is_closed())
      .finish()
  }
}

impl Read for LockedFile {
  #[inline]
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.file()?.read(buf)
  }

  #[inline]
  fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
    self.file()?.read_to_end(buf)
  }
}

impl Write for LockedFile {
  #[inline]
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.file()?.write(buf)
  }

  #[inline]
  fn flush(&mut self) -> io::Result<()> {
    self.file()?.flush()
  }
}

impl Seek for LockedFile {
  #[inline]
  fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
    self.file()?.seek(pos)
  }
}
