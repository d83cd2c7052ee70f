//! 将 PET/CT nifti 数据集切分为 3D 立方块的命令行工具.

mod args;
mod result;
mod runner;

pub use args::{Cli, CropArg, PadArg};
pub use result::describe_into;
