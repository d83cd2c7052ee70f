//! 通用常量.

/// 输入模态 (PET) 的强度参数.
pub mod pet {
    /// 低于该值的体素被截断为该值.
    pub const LOW_CLIP: f32 = 0.0;

    /// 高于该值的体素被视为越界.
    pub const HIGH_CLIP: f32 = 3000.0;

    /// 越界体素被强制设置的值.
    pub const OUT_OF_RANGE: f32 = 6000.0;

    /// 归一化分母.
    pub const SCALE: f32 = 6000.0;
}

/// 目标模态 (CT) 的强度参数, 以 HU 为单位.
pub mod ct {
    /// 低于该值的体素被截断为该值 (空气).
    pub const LOW_CLIP: f32 = -1000.0;

    /// 高于该值的体素被截断为该值.
    pub const HIGH_CLIP: f32 = 3000.0;

    /// 归一化前的偏移量.
    pub const OFFSET: f32 = 1000.0;

    /// 归一化分母.
    pub const SCALE: f32 = 4000.0;
}

/// 非测试集中, 立方块平均强度需要 **严格大于** 该值才会被保留.
pub const SPARSE_MEAN_THRESHOLD: f32 = 1e-3;

/// 默认立方块边长.
pub const BLOCK_SIZE: usize = 128;

/// 默认相邻立方块起点之间的步长.
pub const STRIDE: usize = 64;

/// 默认划分随机种子.
pub const SEED: u64 = 813;

/// 受试者编号在文件名中的字符区间, 如 `RS_051.nii.gz` 中的 `051`.
pub const SUBJECT_ID_RANGE: std::ops::Range<usize> = 3..6;

/// 可识别的体数据文件扩展名 (非压缩/压缩).
pub const NIFTI_EXTENSIONS: [&str; 2] = ["nii", "nii.gz"];

/// 立方块文件扩展名.
pub const PATCH_EXTENSION: &str = "npy";

/// 默认划分记录文件名.
pub const DIVISION_RECORD: &str = "dataset_division.bin";
