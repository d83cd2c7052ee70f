//! 对称零填充与步进立方块索引.
//!
//! 三个空间维度相互独立地计算填充宽度和块起点列表, 再通过笛卡尔积得到全部坐标三元组.
//! 配对的两个体数据应共享同一个 [`BlockGrid`], 从而保证坐标列表完全一致.

use crate::{Idx3d, PrepError, Result};
use itertools::iproduct;
use ndarray::{s, Array3, ArrayView3};

/// 填充宽度的计算规则.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PadMode {
    /// 填充总量为 `dim % block`. 这是历史数据所采用的规则,
    /// 填充后长度 **不一定** 是块大小的整数倍.
    #[default]
    Remainder,

    /// 填充总量为 `(block - dim % block) % block`,
    /// 填充后长度是不小于 `dim` 的最小的块大小整数倍.
    ToMultiple,
}

/// 单个轴上的 (前, 后) 填充宽度.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PadWidth {
    /// 前侧填充体素数.
    pub before: usize,

    /// 后侧填充体素数. 总是等于 `before` 或 `before + 1`.
    pub after: usize,
}

impl PadWidth {
    /// 计算长度为 `dim` 的轴在块大小 `block` 下的填充宽度.
    ///
    /// `block` 必须非零, 否则程序 panic.
    pub fn new(dim: usize, block: usize, mode: PadMode) -> Self {
        assert_ne!(block, 0, "块大小不能为 0");
        let total = match mode {
            PadMode::Remainder => dim - dim / block * block,
            PadMode::ToMultiple => (block - dim % block) % block,
        };
        let before = total / 2;
        Self {
            before,
            after: total - before,
        }
    }

    /// 填充总量.
    #[inline]
    pub fn total(&self) -> usize {
        self.before + self.after
    }

    /// 长度为 `dim` 的轴填充后的长度.
    #[inline]
    pub fn padded(&self, dim: usize) -> usize {
        dim + self.total()
    }
}

/// 单个轴上的块坐标列表.
///
/// 第 `i` 个块为 `(i * stride, i * stride + block)`, `0 <= i < len`.
/// 最后一个块之后不足一个步长的尾部会被丢弃.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AxisBlocks {
    block: usize,
    stride: usize,
    len: usize,
}

impl AxisBlocks {
    /// 在填充后长度为 `padded` 的第 `axis` 轴上构建块坐标列表.
    ///
    /// `padded < block` 时返回 `PrepError::BlockTooLarge`.
    pub fn new(axis: usize, padded: usize, block: usize, stride: usize) -> Result<Self> {
        if block == 0 || stride == 0 {
            return Err(PrepError::InvalidConfig(format!(
                "block size ({block}) and stride ({stride}) must be positive"
            )));
        }
        if padded < block {
            return Err(PrepError::BlockTooLarge {
                axis,
                padded,
                block,
            });
        }
        Ok(Self {
            block,
            stride,
            len: (padded - block) / stride + 1,
        })
    }

    /// 块个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否没有块. 构造成功的列表总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 按升序迭代 `(start, end)`.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (usize, usize)> + Clone {
        let (block, stride) = (self.block, self.stride);
        (0..self.len).map(move |i| (i * stride, i * stride + block))
    }

    /// 按升序迭代块起点.
    #[inline]
    pub fn starts(&self) -> impl ExactSizeIterator<Item = usize> + Clone {
        self.iter().map(|(start, _)| start)
    }
}

/// 一个体数据的完整块索引: 三个轴的填充宽度与块坐标列表.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockGrid {
    shape: Idx3d,
    block: usize,
    pads: [PadWidth; 3],
    axes: [AxisBlocks; 3],
}

impl BlockGrid {
    /// 为形状为 `shape` 的体数据构建块索引.
    ///
    /// # 错误
    ///
    /// 1. `block` 或 `stride` 为 0 时返回 `PrepError::InvalidConfig`;
    /// 2. 任一轴填充后长度小于 `block` 时返回 `PrepError::BlockTooLarge`.
    pub fn new(shape: Idx3d, block: usize, stride: usize, mode: PadMode) -> Result<Self> {
        if block == 0 || stride == 0 {
            return Err(PrepError::InvalidConfig(format!(
                "block size ({block}) and stride ({stride}) must be positive"
            )));
        }
        let dims = [shape.0, shape.1, shape.2];
        let pads = dims.map(|d| PadWidth::new(d, block, mode));
        let axes = [
            AxisBlocks::new(0, pads[0].padded(dims[0]), block, stride)?,
            AxisBlocks::new(1, pads[1].padded(dims[1]), block, stride)?,
            AxisBlocks::new(2, pads[2].padded(dims[2]), block, stride)?,
        ];
        Ok(Self {
            shape,
            block,
            pads,
            axes,
        })
    }

    /// 原始形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 填充后形状.
    #[inline]
    pub fn padded_shape(&self) -> Idx3d {
        let (x, y, z) = self.shape;
        (
            self.pads[0].padded(x),
            self.pads[1].padded(y),
            self.pads[2].padded(z),
        )
    }

    /// 块大小.
    #[inline]
    pub fn block(&self) -> usize {
        self.block
    }

    /// 三个轴的填充宽度.
    #[inline]
    pub fn pads(&self) -> &[PadWidth; 3] {
        &self.pads
    }

    /// 第 `axis` 轴的块坐标列表. `axis >= 3` 时 panic.
    #[inline]
    pub fn axis(&self, axis: usize) -> &AxisBlocks {
        &self.axes[axis]
    }

    /// 候选立方块总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.axes.iter().map(AxisBlocks::len).product()
    }

    /// 是否没有候选立方块. 构造成功的索引总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 迭代所有立方块起点. X 为外层循环, Y 居中, Z 为内层循环.
    pub fn origins(&self) -> impl Iterator<Item = Idx3d> + '_ {
        iproduct!(
            self.axes[0].starts(),
            self.axes[1].starts(),
            self.axes[2].starts()
        )
    }

    /// 对 `data` 进行零填充. `data` 形状必须与 `self.shape()` 一致, 否则程序 panic.
    pub fn pad(&self, data: ArrayView3<f32>) -> Array3<f32> {
        assert_eq!(data.dim(), self.shape, "体数据形状与块索引不一致");
        let (x, y, z) = self.shape;
        let [px, py, pz] = self.pads.map(|p| p.before);
        let mut out = Array3::<f32>::zeros(self.padded_shape());
        out.slice_mut(s![px..px + x, py..py + y, pz..pz + z]).assign(&data);
        out
    }

    /// 从填充后的体数据 `padded` 中取出起点为 `origin` 的立方块视图.
    ///
    /// 越界时 panic.
    #[inline]
    pub fn cut<'a>(&self, padded: &'a Array3<f32>, origin: Idx3d) -> ArrayView3<'a, f32> {
        let (sx, sy, sz) = origin;
        let b = self.block;
        padded.slice(s![sx..sx + b, sy..sy + b, sz..sz + b])
    }
}

/// 一步完成块索引与零填充, 返回 (块索引, 填充后体数据).
pub fn index_blocks(
    data: ArrayView3<f32>,
    block: usize,
    stride: usize,
    mode: PadMode,
) -> Result<(BlockGrid, Array3<f32>)> {
    let grid = BlockGrid::new(data.dim(), block, stride, mode)?;
    let padded = grid.pad(data);
    Ok((grid, padded))
}
