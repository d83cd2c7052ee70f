//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::block::{index_blocks, AxisBlocks, BlockGrid, PadMode, PadWidth};
pub use crate::data::patch::{keep_pair, PatchName, PatchStats, PatchWriter};
pub use crate::data::window::IntensityWindow;
pub use crate::data::{Modality, Volume, VolumePair, ZCrop};

pub use crate::dataset::{
    check_unique_subjects, home_dataset_dir_with, paired_subject_id, partition, subject_id,
    Manifest, ModalitySwap, Partition, SplitKind, SplitPackage,
};

pub use crate::config::PrepConfig;
pub use crate::pipeline::{Pipeline, RunReport, SplitReport};
pub use crate::{PrepError, Result};
