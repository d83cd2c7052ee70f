use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{Manifest, SplitKind};
use crate::data::Modality;
use crate::{PrepError, Result};

/// 某个划分的完整描述: 文件列表, 两个模态的输出目录, 可读标签.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SplitPackage {
    /// 划分种类.
    pub kind: SplitKind,

    /// 输入模态文件路径, 按字典序排列.
    pub files: Vec<PathBuf>,

    /// 输入模态 (X) 立方块输出目录.
    pub dir_x: PathBuf,

    /// 目标模态 (Y) 立方块输出目录.
    pub dir_y: PathBuf,

    /// 可读标签, 如 `"Train"`.
    pub label: String,
}

impl SplitPackage {
    /// 对应模态的输出目录.
    #[inline]
    pub fn dir(&self, modality: Modality) -> &Path {
        match modality {
            Modality::Input => &self.dir_x,
            Modality::Target => &self.dir_y,
        }
    }
}

/// 数据集 train/val/test 划分. 可以整体持久化为一个 bincode 记录文件,
/// 以便复现和审计.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// 训练集.
    pub train: SplitPackage,

    /// 验证集.
    pub val: SplitPackage,

    /// 测试集.
    pub test: SplitPackage,
}

impl Partition {
    /// 由三个文件列表 (train, val, test) 创建划分. `dir_of` 给出每个划分每个模态的输出目录.
    pub fn new<F>(lists: [Vec<PathBuf>; 3], dir_of: F) -> Self
    where
        F: Fn(Modality, SplitKind) -> PathBuf,
    {
        let [train, val, test] = lists;
        let package = |kind: SplitKind, files: Vec<PathBuf>| SplitPackage {
            kind,
            files,
            dir_x: dir_of(Modality::Input, kind),
            dir_y: dir_of(Modality::Target, kind),
            label: kind.label().to_string(),
        };
        Self {
            train: package(SplitKind::Train, train),
            val: package(SplitKind::Validation, val),
            test: package(SplitKind::Test, test),
        }
    }

    /// 拆分为 (train, val, test) 三个文件列表.
    pub fn into_lists(self) -> [Vec<PathBuf>; 3] {
        [self.train.files, self.val.files, self.test.files]
    }

    /// 保持文件列表不变, 按 `dir_of` 重新生成每个划分每个模态的输出目录.
    pub fn relocate<F>(self, dir_of: F) -> Self
    where
        F: Fn(Modality, SplitKind) -> PathBuf,
    {
        Self::new(self.into_lists(), dir_of)
    }

    /// 获取指定划分.
    #[inline]
    pub fn get(&self, kind: SplitKind) -> &SplitPackage {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Validation => &self.val,
            SplitKind::Test => &self.test,
        }
    }

    /// 按 train, val, test 顺序迭代三个划分.
    pub fn iter(&self) -> impl Iterator<Item = &SplitPackage> {
        [&self.train, &self.val, &self.test].into_iter()
    }

    /// 文件总数 (重复计数).
    pub fn file_count(&self) -> usize {
        self.iter().map(|p| p.files.len()).sum()
    }

    /// 训练集是否与验证集、测试集都不相交.
    pub fn is_train_disjoint(&self) -> bool {
        let train: BTreeSet<_> = self.train.files.iter().collect();
        self.val
            .files
            .iter()
            .chain(self.test.files.iter())
            .all(|p| !train.contains(p))
    }

    /// 以 bincode 格式写入 `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PrepError::io(path, e))?;
        let mut w = BufWriter::new(file);
        bincode::serialize_into(&mut w, self).map_err(|source| PrepError::Record {
            path: path.to_owned(),
            source,
        })?;
        w.flush().map_err(|e| PrepError::io(path, e))
    }

    /// 从 `path` 读取 bincode 格式的划分记录.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PrepError::io(path, e))?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|source| PrepError::Record {
            path: path.to_owned(),
            source,
        })
    }
}

/// 检查划分比例是否在 `[0, 1)` 内.
fn check_ratio(name: &str, ratio: f64) -> Result<()> {
    if ratio.is_finite() && (0.0..1.0).contains(&ratio) {
        Ok(())
    } else {
        Err(PrepError::InvalidConfig(format!(
            "{name} ratio must be in [0, 1), got {ratio}"
        )))
    }
}

/// 以固定种子打乱 `manifest`, 并划分为 (train, val, test) 三个文件列表.
///
/// 1. `val` 取打乱后序列头部的 `floor(n * val_ratio)` 个;
/// 2. `test` 取打乱后序列尾部的 `floor(n * test_ratio)` 个;
/// 3. `train` 为其余部分 (集合差).
///
/// 三个列表都按字典序排列. 同样的文件集合与种子总是得到同样的结果.
///
/// # 错误
///
/// 1. 比例不在 `[0, 1)` 内时返回 `PrepError::InvalidConfig`;
/// 2. val 与 test 会重叠, 正比例却得到空集, 或者 train 为空时返回
///   `PrepError::DegeneratePartition`.
pub fn partition(
    manifest: &Manifest,
    val_ratio: f64,
    test_ratio: f64,
    seed: u64,
) -> Result<[Vec<PathBuf>; 3]> {
    check_ratio("validation", val_ratio)?;
    check_ratio("test", test_ratio)?;

    let n = manifest.len();
    let n_val = (n as f64 * val_ratio).floor() as usize;
    let n_test = (n as f64 * test_ratio).floor() as usize;
    let degenerate = |msg: String| Err(PrepError::DegeneratePartition(msg));

    if n_val + n_test > n {
        return degenerate(format!(
            "validation ({n_val}) and test ({n_test}) slices overlap in {n} files"
        ));
    }
    if val_ratio > 0.0 && n_val == 0 {
        return degenerate(format!(
            "validation ratio {val_ratio} selects no file out of {n}"
        ));
    }
    if test_ratio > 0.0 && n_test == 0 {
        return degenerate(format!("test ratio {test_ratio} selects no file out of {n}"));
    }
    if n_val + n_test == n {
        return degenerate(format!("no file left for training out of {n}"));
    }

    let mut shuffled = manifest.files().to_vec();
    shuffled.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let mut val = shuffled[..n_val].to_vec();
    val.sort();
    let mut test = shuffled[n - n_test..].to_vec();
    test.sort();

    let held_out: BTreeSet<&PathBuf> = val.iter().chain(test.iter()).collect();
    // `BTreeSet` 差集的迭代顺序即为字典序, 这里仍显式排序以免依赖该行为.
    let mut train: Vec<PathBuf> = manifest
        .files()
        .iter()
        .filter(|p| !held_out.contains(p))
        .cloned()
        .collect();
    train.sort();

    Ok([train, val, test])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(n: usize) -> Manifest {
        Manifest::from_paths((0..n).map(|i| PathBuf::from(format!("./RSPET/RS_{i:03}.nii.gz"))))
    }

    fn is_sorted(v: &[PathBuf]) -> bool {
        v.windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn test_partition_invariants() {
        let m = manifest(31);
        let [train, val, test] = partition(&m, 0.2, 0.1, 813).unwrap();
        assert_eq!(val.len(), 6);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 22);
        assert!(is_sorted(&train) && is_sorted(&val) && is_sorted(&test));

        let all: BTreeSet<_> = train.iter().chain(&val).chain(&test).collect();
        assert_eq!(all.len(), 31);
        assert!(m.files().iter().all(|p| all.contains(p)));
    }

    #[test]
    fn test_partition_deterministic() {
        let m = manifest(40);
        let a = partition(&m, 0.2, 0.1, 813).unwrap();
        let b = partition(&m, 0.2, 0.1, 813).unwrap();
        assert_eq!(a, b);

        // 输入顺序不影响结果.
        let rev = Manifest::from_paths(m.files().iter().rev().cloned());
        assert_eq!(partition(&rev, 0.2, 0.1, 813).unwrap(), a);

        let differs = (0..8u64).any(|s| partition(&m, 0.2, 0.1, s).unwrap() != a);
        assert!(differs);
    }

    #[test]
    fn test_partition_degenerate() {
        let err = |m: &Manifest, v, t| partition(m, v, t, 813).unwrap_err();
        assert!(matches!(
            err(&manifest(10), 0.6, 0.6),
            PrepError::DegeneratePartition(_)
        ));
        assert!(matches!(
            err(&manifest(3), 0.2, 0.1),
            PrepError::DegeneratePartition(_)
        ));
        assert!(matches!(
            err(&manifest(2), 0.5, 0.5),
            PrepError::DegeneratePartition(_)
        ));
        assert!(matches!(
            err(&manifest(10), 1.0, 0.0),
            PrepError::InvalidConfig(_)
        ));
        assert!(matches!(
            err(&manifest(10), -0.1, 0.0),
            PrepError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_partition_zero_ratios() {
        let m = manifest(5);
        let [train, val, test] = partition(&m, 0.0, 0.0, 1).unwrap();
        assert_eq!(train.len(), 5);
        assert!(val.is_empty() && test.is_empty());
    }

    #[test]
    fn test_record_round_trip() {
        let dir = TempDir::new().unwrap();
        let m = manifest(12);
        let lists = partition(&m, 0.25, 0.25, 813).unwrap();
        let p = Partition::new(lists, |modality, kind| {
            PathBuf::from(format!("./data_train/{}128/{}/", modality.prefix(), kind.dir_name()))
        });
        assert!(p.is_train_disjoint());
        assert_eq!(p.file_count(), 12);
        assert_eq!(p.val.label, "Validation");
        assert_eq!(p.test.dir_y, PathBuf::from("./data_train/Y128/test/"));
        assert_eq!(
            p.get(SplitKind::Train).dir(Modality::Input),
            Path::new("./data_train/X128/train/")
        );

        let path = dir.path().join("dataset_division.bin");
        p.save(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        assert_eq!(Partition::load(&path).unwrap(), p);

        // 同一划分再次写出, 字节完全一致.
        p.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_relocate_keeps_lists() {
        let lists = partition(&manifest(10), 0.2, 0.2, 813).unwrap();
        let dirs = |block: usize| {
            move |m: Modality, k: SplitKind| {
                PathBuf::from(format!("./out/{}{block}/{}", m.prefix(), k.dir_name()))
            }
        };
        let old = Partition::new(lists.clone(), dirs(4));
        let moved = old.clone().relocate(dirs(2));
        assert_eq!(moved, Partition::new(lists, dirs(2)));
        assert_eq!(moved.test.dir_x, PathBuf::from("./out/X2/test"));
        assert_eq!(moved.val.dir(Modality::Target), Path::new("./out/Y2/val"));
        assert_eq!(moved.into_lists(), old.into_lists());
    }

    #[test]
    fn test_record_load_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.bin");
        assert!(matches!(Partition::load(&path), Err(PrepError::Io { .. })));
        std::fs::write(&path, [0xFFu8; 3]).unwrap();
        assert!(matches!(Partition::load(&path), Err(PrepError::Record { .. })));
    }
}
