use std::{env, fs, path::Path};

use anyhow::{Context, Result, bail};

const PREFIX: &str = "LOCKEDFILE_";

/// Accept decimal or `0o` prefixed octal
/// 接受十进制或 `0o` 前缀八进制
fn parse(val: &str) -> Result<u64> {
  let val = val.trim();
  let n = match val.strip_prefix("0o") {
    Some(oct) => u64::from_str_radix(oct, 8)?,
    None => val.parse::<u64>()?,
  };
  Ok(n)
}

fn get(key: &str, ty: &str, default: u64) -> Result<(String, String, u64)> {
  let env_key = format!("{PREFIX}{key}");
  println!("cargo:rerun-if-env-changed={env_key}");
  let val = match env::var(&env_key) {
    Ok(val) => parse(&val).with_context(|| format!("{env_key} must be a number, get: {val}"))?,
    Err(_) => default,
  };
  if ty == "u32" && val > u32::MAX as u64 {
    bail!("{env_key} out of range: {val}");
  }
  Ok((key.to_string(), ty.to_string(), val))
}

fn save(filename: &str, configs: &[(String, String, u64)]) -> Result<()> {
  let out_dir = env::var_os("OUT_DIR").context("OUT_DIR not found")?;
  let dest_path = Path::new(&out_dir).join(filename);

  let content = configs
    .iter()
    .map(|(k, ty, v)| {
      if k.ends_with("_PERM") {
        format!("pub const {k}: {ty} = {v:#o};")
      } else {
        format!("pub const {k}: {ty} = {v};")
      }
    })
    .collect::<Vec<_>>()
    .join("\n");

  if let Ok(current) = fs::read_to_string(&dest_path)
    && current == content
  {
    return Ok(());
  }

  fs::write(&dest_path, content).with_context(|| format!("Failed to write {filename}"))?;
  Ok(())
}

macro_rules! bind {
    ( $( $module:ident : { $( $key:ident : $ty:ident = $val:expr ),* $(,)? } ),* $(,)? ) => {
        $(
            let configs = vec![
                $(
                    get(stringify!($key), stringify!($ty), $val)?,
                )*
            ];
            save(concat!(stringify!($module), ".rs"), &configs)?;
        )*
    };
}

fn main() -> Result<()> {
  bind!(
      consts: {
          CREATE_PERM: u32 = 0o666,
          READ_BUF: usize = 512,
      }
  );

  Ok(())
}
