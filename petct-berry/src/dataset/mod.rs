//! 数据集操作: 文件发现, 模态配对与 train/val/test 划分.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{PrepError, Result};

mod naming;
mod partition;

pub use naming::{check_unique_subjects, paired_subject_id, subject_id, ModalitySwap};
pub use partition::{partition, Partition, SplitPackage};

/// 获取 `{用户主目录}/dataset` 目录.
fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 数据集划分种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SplitKind {
    /// 训练集.
    Train,

    /// 验证集.
    Validation,

    /// 测试集.
    Test,
}

impl SplitKind {
    /// 全部划分, 按处理顺序排列.
    pub const ALL: [SplitKind; 3] = [Self::Train, Self::Validation, Self::Test];

    /// 是否为测试集.
    #[inline]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }

    /// 输出目录名.
    #[inline]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "val",
            Self::Test => "test",
        }
    }

    /// 划分记录中使用的可读标签.
    #[inline]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Train => "Train",
            Self::Validation => "Validation",
            Self::Test => "Test",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SplitKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Self::Train),
            "val" | "validation" => Ok(Self::Validation),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown split `{other}`, expected train/val/test")),
        }
    }
}

/// 文件名是否以 `extensions` 中任一扩展名结尾 (如 `nii`, `nii.gz`).
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    // 隐藏文件不参与匹配.
    if name.starts_with('.') {
        return false;
    }
    extensions.iter().any(|ext| {
        name.len() > ext.len() + 1
            && name.ends_with(ext.as_str())
            && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
    })
}

/// 输入模态源目录下发现的全部体数据文件, 按字典序排列.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Manifest {
    files: Vec<PathBuf>,
}

impl Manifest {
    /// 从已知路径列表创建. 路径会被排序并去重.
    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(it: I) -> Self {
        let mut files: Vec<PathBuf> = it.into_iter().collect();
        files.sort();
        files.dedup();
        Self { files }
    }

    /// 列出 `dir` 下 (不递归) 所有扩展名在 `extensions` 中的文件.
    ///
    /// `dir` 不可读时返回 `PrepError::Io`; 没有任何匹配文件时返回
    /// `PrepError::DegeneratePartition`.
    pub fn discover<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| PrepError::io(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PrepError::io(dir, e))?.path();
            if path.is_file() && has_extension(&path, extensions) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(PrepError::DegeneratePartition(format!(
                "no volume with extension {extensions:?} found in `{}`",
                dir.display()
            )));
        }
        Ok(Self::from_paths(files))
    }

    /// 文件个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 按字典序排列的文件路径.
    #[inline]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["nii".to_string(), "nii.gz".to_string()]
    }

    #[test]
    fn test_has_extension() {
        let e = exts();
        assert!(has_extension(Path::new("a/RS_001.nii"), &e));
        assert!(has_extension(Path::new("a/RS_001.nii.gz"), &e));
        assert!(!has_extension(Path::new("a/RS_001.gz"), &e));
        assert!(!has_extension(Path::new("a/RS_001.npy"), &e));
        assert!(!has_extension(Path::new("a/RS_001nii"), &e));
        assert!(!has_extension(Path::new("a/.nii"), &e));
        assert!(!has_extension(Path::new("a/.RS_001.nii"), &e));
        assert!(!has_extension(Path::new("a/._RS_001.nii.gz"), &e));
    }

    #[test]
    fn test_discover_sorted() {
        let dir = TempDir::new().unwrap();
        for name in [
            "RS_057.nii.gz",
            "RS_011.nii",
            "RS_051.nii.gz",
            "notes.txt",
            ".RS_099.nii",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.nii")).unwrap();

        let m = Manifest::discover(dir.path(), &exts()).unwrap();
        let names: Vec<_> = m
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["RS_011.nii", "RS_051.nii.gz", "RS_057.nii.gz"]);
    }

    #[test]
    fn test_discover_empty_or_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Manifest::discover(dir.path(), &exts()),
            Err(PrepError::DegeneratePartition(_))
        ));
        assert!(matches!(
            Manifest::discover(dir.path().join("nope"), &exts()),
            Err(PrepError::Io { .. })
        ));
    }

    #[test]
    fn test_split_kind() {
        assert_eq!("val".parse::<SplitKind>().unwrap(), SplitKind::Validation);
        assert_eq!("Test".parse::<SplitKind>().unwrap(), SplitKind::Test);
        assert!("dev".parse::<SplitKind>().is_err());
        assert_eq!(SplitKind::Validation.dir_name(), "val");
        assert_eq!(SplitKind::Validation.to_string(), "Validation");
        assert!(SplitKind::Test.is_test());
    }
}
