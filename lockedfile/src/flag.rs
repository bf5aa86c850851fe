//! Open flags and lock modes / 打开标志与锁模式

use std::fs::OpenOptions;

/// Access flag of an open / 打开访问标志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
  /// Read only / 只读
  Read,
  /// Write, create, truncate / 写入、创建、截断
  Create,
  /// Write, create, keep existing bytes / 写入、创建、保留已有内容
  Edit,
}

/// Advisory lock mode, fixed for a handle's lifetime
/// 咨询锁模式，句柄生命周期内不变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Shared,
  Exclusive,
}

impl Mode {
  /// Write access takes the exclusive lock / 写访问使用排他锁
  #[inline]
  pub const fn of(flag: Flag) -> Self {
    match flag {
      Flag::Read => Self::Shared,
      Flag::Create | Flag::Edit => Self::Exclusive,
    }
  }
}

impl Flag {
  #[inline]
  pub const fn mode(self) -> Mode {
    Mode::of(self)
  }

  /// Truncate after the lock is held / 持有锁后截断
  #[inline]
  pub(crate) const fn truncates(self) -> bool {
    matches!(self, Self::Create)
  }

  pub(crate) fn options(self, perm: u32) -> OpenOptions {
    let mut o = OpenOptions::new();
    match self {
      Self::Read => {
        o.read(true);
      }
      // Create is truncated only once locked, see `truncates`
      // Create 加锁后再截断，见 `truncates`
      Self::Create | Self::Edit => {
        o.read(true).write(true).create(true).truncate(false);
      }
    }
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      o.mode(perm);
    }
    #[cfg(not(unix))]
    let _ = perm;
    o
  }
}
