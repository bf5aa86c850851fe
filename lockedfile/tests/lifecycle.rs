//! Tests for handle open / close lifecycle
//! 句柄打开 / 关闭生命周期测试

use std::{
  fs,
  io::{self, Read, Seek, SeekFrom, Write},
};

use aok::{OK, Void};
use lockedfile::{Error, Flag, LockedFile, Mode, leak};
use tempfile::tempdir;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

#[test]
fn test_close_twice() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("twice.txt");

  let mut file = LockedFile::create(&path)?;
  assert!(!file.is_closed());
  file.close()?;
  assert!(file.is_closed());

  for _ in 0..2 {
    let err = file.close().unwrap_err();
    assert!(err.is_closed(), "{err}");
    assert!(matches!(err, Error::Closed(ref p) if p == &path));
  }
  OK
}

#[test]
fn test_io_after_close() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("io_after_close.txt");

  let mut file = LockedFile::create(&path)?;
  file.close()?;

  let mut buf = [0u8; 4];
  let err = file.read(&mut buf).unwrap_err();
  assert!(Error::from(err).is_closed());
  let err = file.write(b"x").unwrap_err();
  assert!(Error::Io(err).is_closed());
  assert!(file.metadata().unwrap_err().is_closed());
  OK
}

#[test]
fn test_modes() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("modes.txt");

  let mut file = LockedFile::create(&path)?;
  assert_eq!(file.mode(), Mode::Exclusive);
  assert_eq!(file.path(), path);
  file.close()?;

  let mut file = LockedFile::open_read(&path)?;
  assert_eq!(file.mode(), Mode::Shared);
  file.close()?;

  let mut file = LockedFile::edit(&path)?;
  assert_eq!(file.mode(), Mode::Exclusive);
  file.close()?;
  OK
}

#[test]
fn test_open_read_missing() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("missing.txt");

  let err = LockedFile::open_read(&path).unwrap_err();
  assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
  assert!(!leak::outstanding().contains(&path));
  assert!(!path.exists());
  OK
}

#[test]
fn test_outstanding_until_close() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("outstanding.txt");

  let mut file = LockedFile::create(&path)?;
  assert!(leak::outstanding().contains(&path));
  file.close()?;
  assert!(!leak::outstanding().contains(&path));
  OK
}

#[test]
fn test_create_truncates() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("truncate.txt");
  fs::write(&path, b"previous content")?;

  let mut file = LockedFile::create(&path)?;
  assert_eq!(file.metadata()?.len(), 0);
  file.close()?;
  assert_eq!(fs::read(&path)?, b"");
  OK
}

#[test]
fn test_edit_preserves() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("edit.txt");
  fs::write(&path, b"0123456789")?;

  let mut file = LockedFile::edit(&path)?;
  file.seek(SeekFrom::Start(2))?;
  file.write_all(b"ab")?;
  file.close()?;

  assert_eq!(fs::read(&path)?, b"01ab456789");
  OK
}

#[test]
fn test_edit_creates() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("edit_new.txt");

  let mut file = LockedFile::edit(&path)?;
  file.write_all(b"new")?;
  file.close()?;

  assert_eq!(fs::read(&path)?, b"new");
  OK
}

#[test]
fn test_read_handle_reads() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("read.txt");
  fs::write(&path, b"shared")?;

  let mut file = LockedFile::open_read(&path)?;
  let mut s = String::new();
  file.read_to_string(&mut s)?;
  assert_eq!(s, "shared");
  assert!(file.write(b"x").is_err());
  file.close()?;
  OK
}

#[cfg(unix)]
#[test]
fn test_open_perm() -> Void {
  use std::os::unix::fs::PermissionsExt;

  let dir = tempdir()?;
  let path = dir.path().join("perm.txt");

  let mut file = LockedFile::open(&path, Flag::Create, 0o600)?;
  file.close()?;
  let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
  assert_eq!(mode & !0o600, 0);
  OK
}

#[test]
fn test_with_edit_closes() -> Void {
  let dir = tempdir()?;
  let path = dir.path().join("with_edit.txt");

  let len = LockedFile::with_edit(&path, |file| {
    file.write_all(b"scoped")?;
    Ok(file.metadata()?.len())
  })?;
  assert_eq!(len, 6);
  assert!(!leak::outstanding().contains(&path));

  let err = LockedFile::with_read(&path, |_| -> lockedfile::Result<()> {
    Err(Error::Io(io::Error::other("inner")))
  })
  .unwrap_err();
  assert!(matches!(err, Error::Io(ref e) if e.to_string() == "inner"));

  // Closing inside the closure is not an error / 在闭包内关闭不算错误
  LockedFile::with_read(&path, |file| file.close())?;

  let mut file = LockedFile::try_edit(&path)?;
  file.close()?;
  OK
}
