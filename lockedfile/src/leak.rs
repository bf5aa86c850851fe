//! Leak detection / 泄漏检测
//!
//! Every open handle is recorded until closed. A handle dropped while still
//! open releases its lock, then fires the leak policy, which aborts the
//! process by default.
//! 每个打开的句柄在关闭前都会被记录。未关闭即被 drop 的句柄先释放锁，再触发泄漏策略（默认终止进程）。

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  process,
  sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU8, AtomicU64, Ordering},
  },
  thread,
};

use log::error;

/// What to do when a handle is dropped without close
/// 句柄未关闭即被 drop 时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Policy {
  /// Print to stderr, log, then abort the process (default)
  /// 输出到 stderr、记录日志后终止进程（默认）
  Abort = 0,
  /// Log then panic the dropping thread (skipped while already unwinding)
  /// 记录日志后让当前线程 panic（已在展开时跳过）
  Panic = 1,
  /// Log only / 仅记录日志
  Log = 2,
}

static POLICY: AtomicU8 = AtomicU8::new(Policy::Abort as u8);
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[static_init::dynamic]
static OPEN: Mutex<HashMap<u64, PathBuf>> = Mutex::new(HashMap::new());

fn open_set() -> MutexGuard<'static, HashMap<u64, PathBuf>> {
  OPEN.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_policy(policy: Policy) {
  POLICY.store(policy as u8, Ordering::Relaxed);
}

pub fn policy() -> Policy {
  match POLICY.load(Ordering::Relaxed) {
    1 => Policy::Panic,
    2 => Policy::Log,
    _ => Policy::Abort,
  }
}

/// Paths of handles opened in this process and not yet closed
/// 本进程中已打开且尚未关闭的句柄路径
pub fn outstanding() -> Vec<PathBuf> {
  open_set().values().cloned().collect()
}

/// Armed leak guard of one handle / 单个句柄的泄漏守卫
#[derive(Debug)]
pub(crate) struct Guard {
  id: u64,
}

impl Guard {
  pub fn arm(path: &Path) -> Self {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    open_set().insert(id, path.to_path_buf());
    Self { id }
  }

  pub fn disarm(self) {
    open_set().remove(&self.id);
  }

  pub fn fire(self, path: &Path) {
    open_set().remove(&self.id);
    let msg = format!(
      "lockedfile {} became unreachable without close / 未关闭即不可达",
      path.display()
    );
    error!("{msg}");
    match policy() {
      Policy::Abort => {
        // stderr does not depend on a logger being installed
        // stderr 不依赖是否安装了日志器
        eprintln!("{msg}");
        process::abort()
      }
      Policy::Panic if !thread::panicking() => panic!("{msg}"),
      Policy::Panic | Policy::Log => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_policy_aborts() {
    assert_eq!(policy(), Policy::Abort);
  }

  #[test]
  fn disarm_removes_from_outstanding() {
    let path = Path::new("/leak/unit/disarm");
    let guard = Guard::arm(path);
    assert!(outstanding().iter().any(|p| p == path));
    guard.disarm();
    assert!(!outstanding().iter().any(|p| p == path));
  }
}
