//! 强度截断与归一化.

use crate::consts::{ct, pet};
use ndarray::{ArrayViewMut3, Axis};

/// 强度窗口: 先截断, 再平移与缩放.
///
/// 对体素值 `v`:
///
/// 1. `v < low` 时取 `low`;
/// 2. `v > high` 时取 `overflow` (不一定等于 `high`);
/// 3. 结果为 `(截断值 + offset) / scale`.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntensityWindow {
    low: f32,
    high: f32,
    overflow: f32,
    offset: f32,
    scale: f32,
}

impl IntensityWindow {
    /// 构建强度窗口.
    ///
    /// 参数必须都是有限值, 且 `low <= high`, `scale > 0`, 否则返回 `None`.
    pub fn new(low: f32, high: f32, overflow: f32, offset: f32, scale: f32) -> Option<Self> {
        let finite = [low, high, overflow, offset, scale]
            .iter()
            .all(|v| v.is_finite());
        if finite && low <= high && scale > 0.0 {
            Some(Self {
                low,
                high,
                overflow,
                offset,
                scale,
            })
        } else {
            None
        }
    }

    /// 输入模态 (PET) 窗口: 负值截断为 0, 大于 3000 的值强制为 6000, 再除以 6000.
    ///
    /// 因此输出要么在 `[0, 0.5]` 内, 要么恰好为 `1.0`.
    #[inline]
    pub const fn pet() -> Self {
        Self {
            low: pet::LOW_CLIP,
            high: pet::HIGH_CLIP,
            overflow: pet::OUT_OF_RANGE,
            offset: 0.0,
            scale: pet::SCALE,
        }
    }

    /// 目标模态 (CT) 窗口: 截断到 `[-1000, 3000]` HU, 加 1000 后除以 4000.
    #[inline]
    pub const fn ct() -> Self {
        Self {
            low: ct::LOW_CLIP,
            high: ct::HIGH_CLIP,
            overflow: ct::HIGH_CLIP,
            offset: ct::OFFSET,
            scale: ct::SCALE,
        }
    }

    /// 截断下限.
    #[inline]
    pub fn low(&self) -> f32 {
        self.low
    }

    /// 截断上限.
    #[inline]
    pub fn high(&self) -> f32 {
        self.high
    }

    /// 越界值.
    #[inline]
    pub fn overflow(&self) -> f32 {
        self.overflow
    }

    /// 截断. NaN 原样返回.
    #[inline]
    pub fn clip(&self, v: f32) -> f32 {
        if v < self.low {
            self.low
        } else if v > self.high {
            self.overflow
        } else {
            v
        }
    }

    /// 求 `v` 截断并归一化后的值. NaN 原样返回.
    #[inline]
    pub fn eval(&self, v: f32) -> f32 {
        (self.clip(v) + self.offset) / self.scale
    }

    /// 原地归一化整个体数据.
    pub fn apply(&self, mut data: ArrayViewMut3<f32>) {
        data.map_inplace(|v| *v = self.eval(*v));
    }

    /// 借助 `rayon`, 沿 X 轴并行地原地归一化整个体数据.
    #[cfg(feature = "rayon")]
    pub fn par_apply(&self, mut data: ArrayViewMut3<f32>) {
        use ndarray::parallel::prelude::*;

        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut sli| sli.map_inplace(|v| *v = self.eval(*v)));
    }

    /// 不可用 `rayon` 时退化为串行版本.
    #[cfg(not(feature = "rayon"))]
    #[inline]
    pub fn par_apply(&self, mut data: ArrayViewMut3<f32>) {
        for mut sli in data.axis_iter_mut(Axis(0)) {
            sli.map_inplace(|v| *v = self.eval(*v));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::IntensityWindow;
    use ndarray::Array3;

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_window_invalid_input() {
        assert!(IntensityWindow::new(0.0, 1.0, 1.0, 0.0, 0.0).is_none());
        assert!(IntensityWindow::new(0.0, 1.0, 1.0, 0.0, -1.0).is_none());
        assert!(IntensityWindow::new(2.0, 1.0, 1.0, 0.0, 1.0).is_none());
        assert!(IntensityWindow::new(f32::NAN, 1.0, 1.0, 0.0, 1.0).is_none());
        assert!(IntensityWindow::new(0.0, 1.0, 1.0, 0.0, 1.0).is_some());
    }

    #[test]
    fn test_pet_window() {
        let w = IntensityWindow::pet();
        assert!(float_eq(w.eval(-5.0), 0.0));
        assert!(float_eq(w.eval(0.0), 0.0));
        assert!(float_eq(w.eval(1500.0), 0.25));
        // 边界本身不算越界.
        assert!(float_eq(w.eval(3000.0), 0.5));
        // boundary
        assert!(float_eq(w.eval(3000.5), 1.0));
        assert!(float_eq(w.eval(1e9), 1.0));
        assert!(w.eval(f32::NAN).is_nan());
    }

    #[test]
    fn test_ct_window() {
        let w = IntensityWindow::ct();
        assert!(float_eq(w.eval(-3000.0), 0.0));
        assert!(float_eq(w.eval(-1000.0), 0.0));
        assert!(float_eq(w.eval(0.0), 0.25));
        assert!(float_eq(w.eval(1000.0), 0.5));
        assert!(float_eq(w.eval(3000.0), 1.0));
        assert!(float_eq(w.eval(5000.0), 1.0));
    }

    #[test]
    fn test_clip_is_identity_in_range() {
        for w in [IntensityWindow::pet(), IntensityWindow::ct()] {
            let mut v = w.low();
            while v <= w.high() {
                assert_eq!(w.clip(v), v);
                assert_eq!(w.clip(w.clip(v)), w.clip(v));
                v += 12.5;
            }
        }
    }

    #[test]
    fn test_monotonic() {
        for w in [IntensityWindow::pet(), IntensityWindow::ct()] {
            let mut prev = w.eval(-5000.0);
            let mut v = -5000.0;
            while v < 8000.0 {
                let cur = w.eval(v);
                assert!(cur >= prev, "{v}: {cur} < {prev}");
                prev = cur;
                v += 7.0;
            }
        }
    }

    #[test]
    fn test_apply_keeps_shape() {
        let mut a = Array3::<f32>::from_elem((3, 4, 5), -2000.0);
        a[(1, 2, 3)] = 1000.0;
        let w = IntensityWindow::ct();
        w.apply(a.view_mut());
        assert_eq!(a.dim(), (3, 4, 5));
        assert!(float_eq(a[(0, 0, 0)], 0.0));
        assert!(float_eq(a[(1, 2, 3)], 0.5));

        let mut b = Array3::<f32>::from_elem((3, 4, 5), -2000.0);
        b[(1, 2, 3)] = 1000.0;
        w.par_apply(b.view_mut());
        assert_eq!(a, b);
    }
}
