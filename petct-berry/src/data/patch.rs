//! 立方块的切分, 稀疏过滤与持久化存储.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayView3};

use crate::consts::PATCH_EXTENSION;
use crate::data::{BlockGrid, Modality};
use crate::dataset::SplitKind;
use crate::{Idx3d, PrepError, Result};

/// 立方块文件名: `{X|Y}_{受试者编号}_{sx:03}_{sy:03}_{sz:03}.npy`.
///
/// 同一坐标下两个模态的文件名仅前缀不同, 因此总能一一对应地找回立方块对.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PatchName<'a> {
    /// 模态.
    pub modality: Modality,

    /// 受试者编号.
    pub subject: &'a str,

    /// 立方块起点.
    pub origin: Idx3d,
}

impl fmt::Display for PatchName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.origin;
        write!(
            f,
            "{}_{}_{x:03}_{y:03}_{z:03}.{PATCH_EXTENSION}",
            self.modality.prefix(),
            self.subject
        )
    }
}

/// 单个受试者的立方块统计.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PatchStats {
    /// 实际保存的立方块对个数.
    pub kept: usize,

    /// 候选立方块对个数.
    pub total: usize,
}

impl PatchStats {
    /// 保留比例. 没有候选立方块时为 0.
    #[inline]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.kept as f64 / self.total as f64
        }
    }

    /// 合并另一份统计.
    #[inline]
    pub fn merge(&mut self, other: &PatchStats) {
        self.kept += other.kept;
        self.total += other.total;
    }
}

/// 是否保留一对立方块.
///
/// 测试集无条件保留; 训练集与验证集中, 只要任一模态的平均强度 **严格大于**
/// `threshold` 就保留, 两者都不超过时视为背景丢弃.
#[inline]
pub fn keep_pair(split: SplitKind, mean_x: f64, mean_y: f64, threshold: f64) -> bool {
    split.is_test() || mean_x > threshold || mean_y > threshold
}

/// 以 `f64` 累加求平均值. 空视图返回 0.
fn mean(cube: &ArrayView3<f32>) -> f64 {
    if cube.is_empty() {
        return 0.0;
    }
    cube.iter().map(|&v| v as f64).sum::<f64>() / cube.len() as f64
}

/// 某个划分下的立方块写出器.
#[derive(Clone, Debug)]
pub struct PatchWriter<'a> {
    split: SplitKind,
    dir_x: &'a Path,
    dir_y: &'a Path,
    threshold: f64,
}

impl<'a> PatchWriter<'a> {
    /// 初始化. `dir_x` 和 `dir_y` 分别是两个模态的输出目录, 必须已存在.
    #[inline]
    pub fn new(split: SplitKind, dir_x: &'a Path, dir_y: &'a Path, threshold: f32) -> Self {
        Self {
            split,
            dir_x,
            dir_y,
            threshold: threshold as f64,
        }
    }

    /// 立方块的完整输出路径.
    pub fn path_of(&self, name: &PatchName) -> PathBuf {
        let dir = match name.modality {
            Modality::Input => self.dir_x,
            Modality::Target => self.dir_y,
        };
        dir.join(name.to_string())
    }

    /// 在 `grid` 的每个坐标三元组上切出一对立方块, 过滤后写入磁盘.
    ///
    /// `pad_x` 与 `pad_y` 必须都是按 `grid` 填充过的体数据, 否则返回
    /// `PrepError::ShapeMismatch`. 写出失败时立即返回, 错误中包含受试者编号与坐标.
    pub fn write_pair(
        &self,
        subject: &str,
        grid: &BlockGrid,
        pad_x: &Array3<f32>,
        pad_y: &Array3<f32>,
    ) -> Result<PatchStats> {
        let expected = grid.padded_shape();
        for shape in [pad_x.dim(), pad_y.dim()] {
            if shape != expected {
                return Err(PrepError::ShapeMismatch {
                    subject: subject.to_string(),
                    input: pad_x.dim(),
                    target: pad_y.dim(),
                });
            }
        }

        let mut stats = PatchStats {
            kept: 0,
            total: grid.len(),
        };
        for origin in grid.origins() {
            let cut_x = grid.cut(pad_x, origin);
            let cut_y = grid.cut(pad_y, origin);
            if !keep_pair(self.split, mean(&cut_x), mean(&cut_y), self.threshold) {
                continue;
            }
            self.save(Modality::Input, subject, origin, cut_x)?;
            self.save(Modality::Target, subject, origin, cut_y)?;
            stats.kept += 1;
        }
        Ok(stats)
    }

    fn save(
        &self,
        modality: Modality,
        subject: &str,
        origin: Idx3d,
        cube: ArrayView3<f32>,
    ) -> Result<()> {
        let path = self.path_of(&PatchName {
            modality,
            subject,
            origin,
        });
        ndarray_npy::write_npy(&path, &cube.as_standard_layout()).map_err(|source| {
            PrepError::WritePatch {
                path: path.clone(),
                subject: subject.to_string(),
                origin,
                source,
            }
        })
    }
}
