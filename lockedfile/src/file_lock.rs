//! Platform lock primitive / 平台锁原语
//!
//! Open and lock as one step, unlock and close as one step.
//! flock on Unix, LockFileEx on Windows.
//! 打开与加锁为一步，解锁与关闭为一步。

use std::{fs::File, io, mem::ManuallyDrop, path::Path, ptr::NonNull};

use fd_lock::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Flag, Mode};

/// Wait for the lock or fail fast / 等待锁或快速失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
  Block,
  Try,
}

enum Guard {
  Read(RwLockReadGuard<'static, File>),
  Write(RwLockWriteGuard<'static, File>),
}

impl Guard {
  #[inline]
  fn file(&self) -> &File {
    match self {
      Self::Read(g) => &**g,
      Self::Write(g) => &**g,
    }
  }
}

/// Descriptor plus the advisory lock held on it / 描述符及其持有的咨询锁
pub(crate) struct FileLock {
  // Borrows `*lock`; dropped in `Drop` before `lock` is freed
  // 借用 `*lock`；在 `Drop` 中先于 `lock` 释放
  guard: ManuallyDrop<Guard>,
  // Owned heap allocation from `Box::into_raw`, freed only in `Drop`.
  // Kept as a raw pointer so no `Box` asserts uniqueness while `guard` borrows it.
  // 来自 `Box::into_raw` 的堆分配，仅在 `Drop` 中释放。
  // 保持为裸指针，guard 借用期间不存在声明唯一性的 `Box`。
  lock: NonNull<RwLock<File>>,
}

// SAFETY: `FileLock` owns the `RwLock<File>` exclusively; `File` is Send + Sync
// and the guards only hand out `&File`.
// 安全：`FileLock` 独占 `RwLock<File>`；`File` 为 Send + Sync，guard 只提供 `&File`。
unsafe impl Send for FileLock {}
unsafe impl Sync for FileLock {}

impl FileLock {
  /// Open `path` and lock it, shared for `Flag::Read`, exclusive otherwise.
  /// `Flag::Create` truncates only after the lock is held.
  /// 打开并加锁，`Flag::Read` 为共享锁，其余为排他锁。`Flag::Create` 持有锁后才截断。
  pub fn acquire(path: &Path, flag: Flag, perm: u32, wait: Wait) -> io::Result<Self> {
    let file = flag.options(perm).open(path)?;
    let lock = NonNull::from(Box::leak(Box::new(RwLock::new(file))));
    let ptr = lock.as_ptr();
    // SAFETY: `ptr` is live until freed in `Drop` or below, and every access
    // goes through this single pointer.
    // 安全：`ptr` 在 `Drop` 或下方释放前始终有效，所有访问都经由这一个指针。
    let guard = unsafe {
      match (flag.mode(), wait) {
        (Mode::Shared, Wait::Block) => (*ptr).read().map(Guard::Read),
        (Mode::Shared, Wait::Try) => (*ptr).try_read().map(Guard::Read),
        (Mode::Exclusive, Wait::Block) => (*ptr).write().map(Guard::Write),
        (Mode::Exclusive, Wait::Try) => (*ptr).try_write().map(Guard::Write),
      }
    };
    match guard {
      Ok(guard) => {
        let locked = Self {
          guard: ManuallyDrop::new(guard),
          lock,
        };
        if flag.truncates()
          && let Err(e) = locked.file().set_len(0)
        {
          let _ = locked.release();
          return Err(e);
        }
        Ok(locked)
      }
      Err(e) => {
        // SAFETY: no guard was created, nothing borrows `ptr`; closes the descriptor
        // 安全：未创建 guard，无借用；drop 即关闭描述符
        drop(unsafe { Box::from_raw(ptr) });
        Err(e)
      }
    }
  }

  #[inline]
  pub fn file(&self) -> &File {
    self.guard.file()
  }

  /// Unlock then close. The descriptor is closed even if unlock fails.
  /// 解锁后关闭。解锁失败也会关闭描述符。
  pub fn release(self) -> io::Result<()> {
    let unlocked = self.file().unlock();
    drop(self);
    unlocked
  }
}

impl Drop for FileLock {
  fn drop(&mut self) {
    // SAFETY: `guard` is dropped exactly once, before the allocation it
    // borrows; `lock` came from `Box::leak` and is freed exactly once.
    // 安全：`guard` 仅 drop 一次且先于其借用的分配；`lock` 来自 `Box::leak`，仅释放一次。
    unsafe {
      ManuallyDrop::drop(&mut self.guard);
      drop(Box::from_raw(self.lock.as_ptr()));
    }
  }
}

/// Lock held by someone else / 锁被他人持有
pub(crate) fn is_contended(e: &io::Error) -> bool {
  if e.kind() == io::ErrorKind::WouldBlock {
    return true;
  }
  // ERROR_LOCK_VIOLATION
  cfg!(windows) && e.raw_os_error() == Some(33)
}
