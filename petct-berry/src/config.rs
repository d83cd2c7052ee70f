//! 预处理配置.
//!
//! 所有参数集中在 [`PrepConfig`] 中, 由调用者显式传入各组件, 不存在进程级的全局状态.

use std::path::{Path, PathBuf};

use crate::consts;
use crate::data::{Modality, PadMode, ZCrop};
use crate::dataset::{ModalitySwap, SplitKind};
use crate::{PrepError, Result};

/// 预处理配置. `Default` 实现给出历史数据使用的参数.
#[derive(Clone, Debug)]
pub struct PrepConfig {
    /// 输入模态 (PET) 源目录.
    pub source_x: PathBuf,

    /// 目标模态 (CT) 源目录. 必须与 `swap` 作用于 `source_x` 的结果一致.
    pub source_y: PathBuf,

    /// 输出根目录. 立方块写入 `{output_root}/{X|Y}{block_size}/{train|val|test}/`.
    pub output_root: PathBuf,

    /// 划分记录文件路径.
    pub record_path: PathBuf,

    /// 验证集比例.
    pub val_ratio: f64,

    /// 测试集比例.
    pub test_ratio: f64,

    /// 输入模态通道数. 仅作记录, 预处理不使用.
    pub channels_x: usize,

    /// 目标模态通道数. 仅作记录, 预处理不使用.
    pub channels_y: usize,

    /// 立方块边长.
    pub block_size: usize,

    /// 相邻立方块起点的步长.
    pub stride: usize,

    /// 划分随机种子.
    pub seed: u64,

    /// 模态路径替换规则.
    pub swap: ModalitySwap,

    /// 可识别的体数据扩展名.
    pub extensions: Vec<String>,

    /// 稀疏立方块过滤阈值.
    pub mean_threshold: f32,

    /// 填充规则.
    pub pad_mode: PadMode,

    /// 训练集与验证集的 z 轴裁剪策略.
    pub train_crop: ZCrop,

    /// 测试集的 z 轴裁剪策略.
    pub test_crop: ZCrop,

    /// 需要切分的划分, 按给定顺序处理.
    pub splits: Vec<SplitKind>,

    /// 为 `true` 且划分记录已存在时, 直接读取记录而不重新划分.
    pub reuse_record: bool,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            source_x: PathBuf::from("./data_train/RSPET/"),
            source_y: PathBuf::from("./data_train/RSCT/"),
            output_root: PathBuf::from("./data_train"),
            record_path: PathBuf::from(consts::DIVISION_RECORD),
            val_ratio: 0.2,
            test_ratio: 0.1,
            channels_x: 1,
            channels_y: 1,
            block_size: consts::BLOCK_SIZE,
            stride: consts::STRIDE,
            seed: consts::SEED,
            swap: ModalitySwap::default(),
            extensions: consts::NIFTI_EXTENSIONS.map(String::from).to_vec(),
            mean_threshold: consts::SPARSE_MEAN_THRESHOLD,
            pad_mode: PadMode::Remainder,
            train_crop: ZCrop::UpperHalf,
            test_crop: ZCrop::Full,
            splits: SplitKind::ALL.to_vec(),
            reuse_record: false,
        }
    }
}

impl PrepConfig {
    /// 以 `root` 为数据根目录创建配置: 源目录为 `root/RSPET`, `root/RSCT`,
    /// 输出到 `root` 下, 划分记录为 `root/dataset_division.bin`. 其余参数取默认值.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            source_x: root.join("RSPET"),
            source_y: root.join("RSCT"),
            output_root: root.to_owned(),
            record_path: root.join(consts::DIVISION_RECORD),
            ..Self::default()
        }
    }

    /// 检查配置.
    ///
    /// 块大小与步长必须为正, 比例必须在 `[0, 1)` 内, 阈值必须是有限值,
    /// `swap` 必须把 `source_x` 映射为 `source_y`, 至少处理一个划分.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PrepError::InvalidConfig(msg));

        if self.block_size == 0 || self.stride == 0 {
            return invalid(format!(
                "block size ({}) and stride ({}) must be positive",
                self.block_size, self.stride
            ));
        }
        for (name, r) in [("validation", self.val_ratio), ("test", self.test_ratio)] {
            if !(r.is_finite() && (0.0..1.0).contains(&r)) {
                return invalid(format!("{name} ratio must be in [0, 1), got {r}"));
            }
        }
        if !self.mean_threshold.is_finite() {
            return invalid(format!(
                "mean threshold must be finite, got {}",
                self.mean_threshold
            ));
        }
        if self.extensions.is_empty() {
            return invalid("no volume extension given".to_string());
        }
        if self.splits.is_empty() {
            return invalid("no split selected".to_string());
        }

        let derived = self.swap.target_path(&self.source_x)?;
        if derived != self.source_y {
            return invalid(format!(
                "modality swap maps `{}` to `{}`, but target source is `{}`",
                self.source_x.display(),
                derived.display(),
                self.source_y.display()
            ));
        }
        Ok(())
    }

    /// 指定模态在指定划分下的输出目录.
    pub fn split_dir(&self, modality: Modality, split: SplitKind) -> PathBuf {
        let mut ans = self.output_root.clone();
        ans.push(format!("{}{}", modality.prefix(), self.block_size));
        ans.push(split.dir_name());
        ans
    }

    /// 指定划分的 z 轴裁剪策略.
    #[inline]
    pub fn crop_of(&self, split: SplitKind) -> ZCrop {
        if split.is_test() {
            self.test_crop
        } else {
            self.train_crop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let c = PrepConfig::default();
        c.validate().unwrap();
        assert_eq!(c.block_size, 128);
        assert_eq!(c.stride, 64);
        assert_eq!(c.seed, 813);
        assert_eq!(c.extensions, ["nii", "nii.gz"]);
        assert_eq!(c.crop_of(SplitKind::Train), ZCrop::UpperHalf);
        assert_eq!(c.crop_of(SplitKind::Validation), ZCrop::UpperHalf);
        assert_eq!(c.crop_of(SplitKind::Test), ZCrop::Full);
    }

    #[test]
    fn test_split_dir() {
        let c = PrepConfig::default();
        assert_eq!(
            c.split_dir(Modality::Input, SplitKind::Train),
            PathBuf::from("./data_train/X128/train")
        );
        assert_eq!(
            c.split_dir(Modality::Target, SplitKind::Validation),
            PathBuf::from("./data_train/Y128/val")
        );
    }

    #[test]
    fn test_with_root() {
        let c = PrepConfig::with_root("/data/petct");
        c.validate().unwrap();
        assert_eq!(c.source_y, PathBuf::from("/data/petct/RSCT"));
        assert_eq!(
            c.split_dir(Modality::Target, SplitKind::Test),
            PathBuf::from("/data/petct/Y128/test")
        );
    }

    #[test]
    fn test_invalid() {
        let bad = [
            PrepConfig {
                stride: 0,
                ..PrepConfig::default()
            },
            PrepConfig {
                val_ratio: 1.5,
                ..PrepConfig::default()
            },
            PrepConfig {
                mean_threshold: f32::NAN,
                ..PrepConfig::default()
            },
            PrepConfig {
                splits: vec![],
                ..PrepConfig::default()
            },
            PrepConfig {
                source_y: PathBuf::from("./data_train/RSMR/"),
                ..PrepConfig::default()
            },
        ];
        for c in bad {
            assert!(matches!(c.validate(), Err(PrepError::InvalidConfig(_))));
        }

        let c = PrepConfig {
            source_x: PathBuf::from("./data_train/RSMR/"),
            ..PrepConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(PrepError::NamingMismatch { .. })
        ));
    }
}
