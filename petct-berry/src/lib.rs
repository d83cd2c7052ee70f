#![warn(missing_docs)]

//! 核心库. 将配对的 PET/CT 3D nifti 体数据切分为归一化的定长立方块 (patch),
//! 供 3D 分割网络训练使用.
//!
//! 整个流程是离线的批处理任务, 按以下顺序组织:
//!
//! 1. 在 PET 源目录下发现所有 `.nii` / `.nii.gz` 文件, 按固定随机种子打乱并划分
//!   train/val/test 三个子集, 持久化划分结果 ([`dataset`]).
//! 2. 对每个受试者 (subject), 通过文件名替换规则找到对应的 CT 文件, 读取两个体数据,
//!   沿 z 轴裁剪并检查形状一致性 ([`data::VolumePair`]).
//! 3. 两种模态分别进行强度截断与归一化 ([`IntensityWindow`]).
//! 4. 计算对称零填充和步进的块坐标 ([`BlockGrid`]).
//! 5. 在每个坐标三元组上切出立方块. 非测试集中过滤掉近乎全空的立方块,
//!   并将保留的立方块对以 `.npy` 格式写入磁盘 ([`data::patch`]).
//!
//! 受试者之间互相独立. 打开 `rayon` feature 时, 每个受试者对应一个并行任务.
//!
//! # 注意
//!
//! 1. 体数据均以 nifti 的原生体素顺序 `(X, Y, Z)` 保存, 不做轴置换.
//! 2. 所有可预期的失败都通过 [`PrepError`] 返回, 并携带受试者/路径/坐标等上下文.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

mod error;

pub use error::{PrepError, Result};

/// 体数据及其基础处理算法.
pub mod data;

pub use data::{
    BlockGrid, IntensityWindow, Modality, PadMode, PatchName, PatchStats, Volume, VolumePair,
    ZCrop,
};

pub mod config;
pub mod consts;
pub mod dataset;
pub mod pipeline;
pub mod prelude;

pub use config::PrepConfig;
pub use pipeline::{Pipeline, RunReport, SplitReport};
