//! 对 `petct-berry::dataset` 的更一层封装. 提供数据根目录的查找规则.

use petct_berry::PrepConfig;
use std::env;
use std::path::PathBuf;

/// 数据根目录环境变量名.
pub const DATA_DIR_ENV: &str = "PETCT_DATA_DIR";

/// 获取 PET/CT 数据根目录.
///
/// 1. 若环境变量 `$PETCT_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/petct`;
/// 3. 无法确定用户主目录时返回 `None`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATA_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => petct_berry::dataset::home_dataset_dir_with(["petct"]),
    }
}

/// 以 `$PETCT_DATA_DIR` 或者 `$HOME/dataset/petct` 为根目录的默认配置.
/// 两者都无法确定时, 退回到当前目录下的 `./data_train`.
pub fn config_from_env_or_home() -> PrepConfig {
    match data_dir_from_env_or_home() {
        Some(root) => PrepConfig::with_root(root),
        None => PrepConfig::default(),
    }
}
