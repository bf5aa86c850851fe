//! Build-time constants, overridable via `LOCKEDFILE_*` env at build
//! 构建期常量，可通过 `LOCKEDFILE_*` 环境变量覆盖

include!(concat!(env!("OUT_DIR"), "/consts.rs"));
