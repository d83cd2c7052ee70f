use std::fmt;
use std::path::Path;

use ndarray::{s, Array3, ArrayView3, ArrayViewMut3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::{Idx3d, PrepError, Result};

pub mod block;
pub mod patch;
pub mod window;

pub use block::{index_blocks, AxisBlocks, BlockGrid, PadMode, PadWidth};
pub use patch::{PatchName, PatchStats, PatchWriter};
pub use window::IntensityWindow;

/// 成像模态.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Modality {
    /// 输入模态 (PET). 立方块文件以 `X` 开头.
    Input,

    /// 目标模态 (CT). 立方块文件以 `Y` 开头.
    Target,
}

impl Modality {
    /// 立方块文件名及输出目录名的前缀.
    #[inline]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Input => "X",
            Self::Target => "Y",
        }
    }

    /// 该模态使用的强度窗口.
    #[inline]
    pub const fn window(self) -> IntensityWindow {
        match self {
            Self::Input => IntensityWindow::pet(),
            Self::Target => IntensityWindow::ct(),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("PET"),
            Self::Target => f.write_str("CT"),
        }
    }
}

/// 沿 z 轴的裁剪策略. 裁剪发生在归一化之前.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ZCrop {
    /// 保留全部切片.
    #[default]
    Full,

    /// 仅保留 `[Z / 2, Z)` 部分切片.
    UpperHalf,
}

/// nii 格式 3D 体数据的体素强度. 强度以 `f32` 保存, 形状为 nifti 原生的 `(X, Y, Z)`.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    /// 打开 `.nii` 或 `.nii.gz` 格式的 3D 体数据.
    ///
    /// 末尾长度为 1 的多余维度 (如 `(X, Y, Z, 1)`) 会被去掉. 其余非 3 维数据返回
    /// `PrepError::Dimensionality`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let nifti_err = |source| PrepError::Nifti {
            path: path.to_owned(),
            source,
        };

        let obj = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
        let mut data = obj.into_volume().into_ndarray::<f32>().map_err(nifti_err)?;

        while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
            let last = data.ndim() - 1;
            data = data.index_axis_move(Axis(last), 0);
        }
        let ndim = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| PrepError::Dimensionality {
                path: path.to_owned(),
                ndim,
            })?;

        Ok(Self { data })
    }

    /// 从裸数据直接创建体数据. 主要用于合成数据.
    #[inline]
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, f32> {
        self.data.view_mut()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_inner(self) -> Array3<f32> {
        self.data
    }

    /// 按 `crop` 策略沿 z 轴原地裁剪.
    pub fn crop_z(&mut self, crop: ZCrop) {
        match crop {
            ZCrop::Full => {}
            ZCrop::UpperHalf => {
                let half = self.data.len_of(Axis(2)) / 2;
                self.data.slice_collapse(s![.., .., half..]);
            }
        }
    }

    /// 使用 `window` 原地归一化.
    #[inline]
    pub fn normalize(&mut self, window: &IntensityWindow) {
        window.par_apply(self.data_mut());
    }
}

/// 同一受试者的一对体数据: 输入模态 (PET) 与目标模态 (CT).
///
/// 两者在裁剪后必须保持空间上的一一对应, 这由 [`VolumePair::check_shape`] 检查.
#[derive(Debug, Clone)]
pub struct VolumePair {
    /// 受试者编号.
    pub subject: String,

    /// 输入模态体数据.
    pub input: Volume,

    /// 目标模态体数据.
    pub target: Volume,
}

impl VolumePair {
    /// 分别打开两个模态的体数据. 任一文件打开失败时返回 `Err`.
    pub fn open(
        subject: impl Into<String>,
        input_path: impl AsRef<Path>,
        target_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let input = Volume::open(input_path)?;
        let target = Volume::open(target_path)?;
        Ok(Self {
            subject: subject.into(),
            input,
            target,
        })
    }

    /// 对两个体数据应用同样的 z 轴裁剪.
    pub fn crop_z(&mut self, crop: ZCrop) {
        self.input.crop_z(crop);
        self.target.crop_z(crop);
    }

    /// 检查两个体数据形状是否一致. 不一致时返回 `PrepError::ShapeMismatch`.
    pub fn check_shape(&self) -> Result<Idx3d> {
        let (input, target) = (self.input.shape(), self.target.shape());
        if input == target {
            Ok(input)
        } else {
            Err(PrepError::ShapeMismatch {
                subject: self.subject.clone(),
                input,
                target,
            })
        }
    }

    /// 两个模态分别使用各自的强度窗口原地归一化.
    pub fn normalize(&mut self) {
        self.input.normalize(&Modality::Input.window());
        self.target.normalize(&Modality::Target.window());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array4};
    use nifti::writer::WriterOptions;
    use tempfile::TempDir;

    #[test]
    fn test_open_drops_trailing_singleton() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("RS_001.nii");
        let data =
            Array4::<f32>::from_shape_fn((4, 3, 5, 1), |(x, y, z, _)| (x + y * 4 + z * 12) as f32);
        WriterOptions::new(&path).write_nifti(&data).unwrap();

        let v = Volume::open(&path).unwrap();
        assert_eq!(v.shape(), (4, 3, 5));
        assert_eq!(v.data()[(3, 2, 4)], 59.0);
        assert_eq!(v.into_inner(), data.index_axis_move(Axis(3), 0));
    }

    #[test]
    fn test_open_rejects_other_ranks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("RS_002.nii");
        WriterOptions::new(&path)
            .write_nifti(&Array2::<f32>::zeros((4, 4)))
            .unwrap();
        match Volume::open(&path) {
            Err(PrepError::Dimensionality { path: p, ndim }) => {
                assert_eq!(p, path);
                assert_eq!(ndim, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let path = dir.path().join("RS_003.nii");
        WriterOptions::new(&path)
            .write_nifti(&Array4::<f32>::zeros((4, 4, 4, 2)))
            .unwrap();
        assert!(matches!(
            Volume::open(&path),
            Err(PrepError::Dimensionality { ndim: 4, .. })
        ));
    }

    #[test]
    fn test_crop_z() {
        let data = Array3::<f32>::from_shape_fn((2, 3, 7), |(_, _, z)| z as f32);
        let mut v = Volume::from_array(data);
        v.crop_z(ZCrop::Full);
        assert_eq!(v.shape(), (2, 3, 7));
        v.crop_z(ZCrop::UpperHalf);
        assert_eq!(v.shape(), (2, 3, 4));
        assert_eq!(v.data()[(0, 0, 0)], 3.0);
        assert_eq!(v.data()[(1, 2, 3)], 6.0);
    }

    #[test]
    fn test_pair_shape_check() {
        let a = Volume::from_array(Array3::zeros((4, 4, 8)));
        let b = Volume::from_array(Array3::zeros((4, 4, 9)));
        let mut pair = VolumePair {
            subject: "051".to_string(),
            input: a,
            target: b,
        };
        match pair.check_shape() {
            Err(PrepError::ShapeMismatch {
                subject,
                input,
                target,
            }) => {
                assert_eq!(subject, "051");
                assert_eq!(input, (4, 4, 8));
                assert_eq!(target, (4, 4, 9));
            }
            other => panic!("unexpected: {other:?}"),
        }

        // 9 / 2 = 4 -> 5 slices left; 8 / 2 = 4 -> 4 slices left.
        pair.crop_z(ZCrop::UpperHalf);
        assert!(pair.check_shape().is_err());
    }

    #[test]
    fn test_pair_normalize() {
        let mut pair = VolumePair {
            subject: "001".to_string(),
            input: Volume::from_array(Array3::from_elem((2, 2, 2), 4000.0)),
            target: Volume::from_array(Array3::from_elem((2, 2, 2), 1000.0)),
        };
        assert_eq!(pair.check_shape().unwrap(), (2, 2, 2));
        pair.normalize();
        assert!(pair.input.data().iter().all(|v| *v == 1.0));
        assert!(pair.target.data().iter().all(|v| *v == 0.5));
    }

    #[test]
    fn test_modality() {
        assert_eq!(Modality::Input.prefix(), "X");
        assert_eq!(Modality::Target.prefix(), "Y");
        assert_eq!(Modality::Input.window(), IntensityWindow::pet());
        assert_eq!(Modality::Target.to_string(), "CT");
    }
}
