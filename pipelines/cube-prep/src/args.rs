use clap::{Parser, ValueEnum};
use petct_berry::consts;
use petct_berry::dataset::{ModalitySwap, SplitKind};
use petct_berry::{PadMode, PrepConfig, PrepError, ZCrop};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "cube-prep")]
#[command(about = "将配对的 PET/CT nii 文件切分为归一化的 3D 立方块 npy 文件.")]
#[command(version, long_about = None)]
pub struct Cli {
    /// 数据根目录. 缺省时依次尝试 `$PETCT_DATA_DIR`, `$HOME/dataset/petct`, `./data_train`.
    #[arg(long = "root", short = 'D')]
    pub root: Option<PathBuf>,

    /// PET 源目录, 缺省为 `{root}/RSPET`.
    #[arg(long)]
    pub source_x: Option<PathBuf>,

    /// CT 源目录, 缺省为 `{root}/RSCT`.
    #[arg(long)]
    pub source_y: Option<PathBuf>,

    /// 立方块输出根目录, 缺省为 `{root}`.
    #[arg(long, short)]
    pub output_root: Option<PathBuf>,

    /// 划分记录文件, 缺省为 `{root}/dataset_division.bin`.
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// 划分记录已存在时直接复用, 不重新划分.
    #[arg(long)]
    pub reuse_record: bool,

    /// 验证集比例.
    #[arg(long, default_value_t = 0.2)]
    pub val_ratio: f64,

    /// 测试集比例.
    #[arg(long, default_value_t = 0.1)]
    pub test_ratio: f64,

    /// PET 通道数 (仅作记录).
    #[arg(long, default_value_t = 1)]
    pub channels_x: usize,

    /// CT 通道数 (仅作记录).
    #[arg(long, default_value_t = 1)]
    pub channels_y: usize,

    /// 立方块边长.
    #[arg(long, short, default_value_t = consts::BLOCK_SIZE)]
    pub block_size: usize,

    /// 相邻立方块起点的步长.
    #[arg(long, short, default_value_t = consts::STRIDE)]
    pub stride: usize,

    /// 划分随机种子.
    #[arg(long, default_value_t = consts::SEED)]
    pub seed: u64,

    /// 稀疏立方块过滤阈值 (平均强度需严格大于该值).
    #[arg(long, default_value_t = consts::SPARSE_MEAN_THRESHOLD)]
    pub threshold: f32,

    /// PET 路径中的模态标签.
    #[arg(long, default_value = "PET")]
    pub input_tag: String,

    /// 替换后 CT 路径中的模态标签.
    #[arg(long, default_value = "CT")]
    pub target_tag: String,

    /// 填充规则.
    #[arg(long, value_enum, default_value_t = PadArg::Remainder)]
    pub pad_mode: PadArg,

    /// 训练集与验证集的 z 轴裁剪.
    #[arg(long, value_enum, default_value_t = CropArg::UpperHalf)]
    pub train_crop: CropArg,

    /// 测试集的 z 轴裁剪.
    #[arg(long, value_enum, default_value_t = CropArg::Full)]
    pub test_crop: CropArg,

    /// 需要切分的划分, 以逗号分隔.
    #[arg(long, value_delimiter = ',', default_value = "train,val,test")]
    pub splits: Vec<SplitKind>,

    /// 输出更详细的日志, 可重复.
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
/// 填充规则.
pub enum PadArg {
    /// 填充 `dim % block` 个体素.
    Remainder,
    /// 填充到块大小的整数倍.
    ToMultiple,
}

impl From<PadArg> for PadMode {
    fn from(v: PadArg) -> Self {
        match v {
            PadArg::Remainder => PadMode::Remainder,
            PadArg::ToMultiple => PadMode::ToMultiple,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
/// z 轴裁剪策略.
pub enum CropArg {
    /// 保留全部切片.
    Full,
    /// 仅保留上半部分切片.
    UpperHalf,
}

impl From<CropArg> for ZCrop {
    fn from(v: CropArg) -> Self {
        match v {
            CropArg::Full => ZCrop::Full,
            CropArg::UpperHalf => ZCrop::UpperHalf,
        }
    }
}

impl Cli {
    /// 日志级别.
    pub fn log_level(&self) -> log::Level {
        match self.verbose {
            0 => log::Level::Info,
            1 => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }

    /// 由命令行参数构造预处理配置.
    pub fn to_config(&self) -> Result<PrepConfig, PrepError> {
        let base = match &self.root {
            Some(root) => PrepConfig::with_root(root),
            None => utils::loader::config_from_env_or_home(),
        };
        Ok(PrepConfig {
            source_x: self.source_x.clone().unwrap_or(base.source_x),
            source_y: self.source_y.clone().unwrap_or(base.source_y),
            output_root: self.output_root.clone().unwrap_or(base.output_root),
            record_path: self.record.clone().unwrap_or(base.record_path),
            val_ratio: self.val_ratio,
            test_ratio: self.test_ratio,
            channels_x: self.channels_x,
            channels_y: self.channels_y,
            block_size: self.block_size,
            stride: self.stride,
            seed: self.seed,
            swap: ModalitySwap::new(self.input_tag.as_str(), self.target_tag.as_str())?,
            extensions: base.extensions,
            mean_threshold: self.threshold,
            pad_mode: self.pad_mode.into(),
            train_crop: self.train_crop.into(),
            test_crop: self.test_crop.into(),
            splits: self.splits.clone(),
            reuse_record: self.reuse_record,
        })
    }

    /// 运行程序, 返回进程退出码.
    pub fn run_program(&self) -> ExitCode {
        crate::runner::run(self)
    }
}
