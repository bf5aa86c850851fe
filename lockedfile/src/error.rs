use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Handle already closed / 句柄已关闭
  #[error("close {}: file already closed / 文件已关闭", .0.display())]
  Closed(PathBuf),

  /// Lock held by another holder, only from `try_*` / 锁被占用，仅 `try_*` 返回
  #[error("{}: file locked / 文件已锁定", .0.display())]
  Locked(PathBuf),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

impl Error {
  /// Closed-descriptor check, also matches the `io::Error` form
  /// 已关闭检查，同样匹配 `io::Error` 形式
  pub fn is_closed(&self) -> bool {
    match self {
      Self::Closed(_) => true,
      Self::Io(e) => e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<Error>())
        .is_some_and(Error::is_closed),
      Self::Locked(_) => false,
    }
  }

  pub fn is_locked(&self) -> bool {
    match self {
      Self::Locked(_) => true,
      Self::Io(e) => e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<Error>())
        .is_some_and(Error::is_locked),
      Self::Closed(_) => false,
    }
  }

  /// Unwrap an `io::Error` that carries an `Error` back to the typed form
  /// 将携带 `Error` 的 `io::Error` 还原为类型化错误
  pub(crate) fn from_io(e: io::Error) -> Self {
    if !e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
      return Self::Io(e);
    }
    let kind = e.kind();
    match e.into_inner().map(|inner| inner.downcast::<Error>()) {
      Some(Ok(err)) => *err,
      Some(Err(inner)) => Self::Io(io::Error::new(kind, inner)),
      None => Self::Io(kind.into()),
    }
  }
}

impl From<Error> for io::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Io(e) => e,
      Error::Closed(_) => io::Error::other(e),
      Error::Locked(_) => io::Error::new(io::ErrorKind::WouldBlock, e),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
