//! 运行时错误.

use crate::Idx3d;
use std::path::PathBuf;

/// 预处理流程中可能出现的所有错误.
///
/// 除配置类错误 (`InvalidConfig`, `BlockTooLarge`, `DegeneratePartition`) 外,
/// 其他错误都只会中止当前受试者, 流程会继续处理下一个受试者.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// 底层文件 I/O 错误.
    #[error("I/O error at `{}`: {source}", path.display())]
    Io {
        /// 出错的路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: std::io::Error,
    },

    /// nifti 文件无法读取或解析.
    #[error("failed to read nifti volume `{}`: {source}", path.display())]
    Nifti {
        /// 出错的 nifti 文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: nifti::NiftiError,
    },

    /// nifti 文件不是 3 维数据.
    #[error("volume `{}` has {ndim} dimensions, expected 3", path.display())]
    Dimensionality {
        /// 出错的 nifti 文件路径.
        path: PathBuf,
        /// 实际维度数.
        ndim: usize,
    },

    /// 文件名不符合模态替换规则或受试者编号规则.
    #[error("naming mismatch for `{}`: {reason}", path.display())]
    NamingMismatch {
        /// 出错的文件路径.
        path: PathBuf,
        /// 原因.
        reason: String,
    },

    /// 裁剪后配对的两个体数据形状不一致.
    #[error("subject `{subject}`: input shape {input:?} does not match target shape {target:?}")]
    ShapeMismatch {
        /// 受试者编号.
        subject: String,
        /// 输入模态 (PET) 形状.
        input: Idx3d,
        /// 目标模态 (CT) 形状.
        target: Idx3d,
    },

    /// 填充后某个轴的长度仍小于块大小, 无法切出任何立方块.
    #[error("axis {axis}: padded length {padded} is smaller than block size {block}")]
    BlockTooLarge {
        /// 轴编号 (0, 1, 2).
        axis: usize,
        /// 填充后的轴长度.
        padded: usize,
        /// 块大小.
        block: usize,
    },

    /// 写出立方块失败.
    #[error("subject `{subject}` at {origin:?}: failed to write `{}`: {source}", path.display())]
    WritePatch {
        /// 目标文件路径.
        path: PathBuf,
        /// 受试者编号.
        subject: String,
        /// 立方块起点坐标.
        origin: Idx3d,
        /// 底层错误.
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    /// 划分记录读写失败.
    #[error("dataset division record `{}`: {source}", path.display())]
    Record {
        /// 记录文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: bincode::Error,
    },

    /// 数据集规模与划分比例不匹配 (空集或重叠).
    #[error("degenerate partition: {0}")]
    DegeneratePartition(String),

    /// 配置参数不合法.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PrepError {
    /// 构造 `PrepError::Io`.
    #[inline]
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 构造 `PrepError::NamingMismatch`.
    #[inline]
    pub(crate) fn naming(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NamingMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 是否是会中止整个流程的配置类错误.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::BlockTooLarge { .. } | Self::DegeneratePartition(_)
        )
    }
}

/// 本 crate 通用的 `Result` 类型.
pub type Result<T> = std::result::Result<T, PrepError>;
