//! 预处理流程依赖的通用组件.

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 向 `w` 写出一条简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 将比例格式化为百分数, 如 `0.25` -> `25.00%`.
#[inline]
pub fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        sep_to(&mut buf).unwrap();
        assert_eq!(std::str::from_utf8(&buf).unwrap(), format!("{SEP}\n"));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.25), "25.00%");
        assert_eq!(percent(0.0), "0.00%");
    }

    #[test]
    fn test_cpus() {
        assert!(cpus() >= 1);
    }
}
