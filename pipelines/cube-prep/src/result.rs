//! 运行结果.

use petct_berry::{RunReport, SplitReport};
use std::io::{self, Write};

/// 将单个划分的结果写进 `w` 中.
fn describe_split_into<W: Write>(r: &SplitReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    let stats = r.stats();
    writeln!(w, "Split `{}`:", r.kind)?;
    writeln!(w, "{S4}Subjects processed: {}", r.subjects.len())?;
    writeln!(w, "{S4}Subjects failed: {}", r.failures.len())?;
    writeln!(
        w,
        "{S4}Cubes saved: {} / {} ({})",
        stats.kept,
        stats.total,
        utils::percent(stats.ratio())
    )?;
    for (path, e) in r.failures.iter() {
        writeln!(w, "{S4}{S4}`{}`: {e}", path.display())?;
    }
    Ok(())
}

/// 将整个流程的结果写进 `w` 中, 各划分之间以分隔线隔开.
pub fn describe_into<W: Write>(report: &RunReport, w: &mut W) -> io::Result<()> {
    let p = &report.partition;
    writeln!(
        w,
        "Division: {} train, {} validation, {} test",
        p.train.files.len(),
        p.val.files.len(),
        p.test.files.len()
    )?;
    for r in report.splits.iter() {
        utils::sep_to(&mut *w)?;
        describe_split_into(r, w)?;
    }
    utils::sep_to(w)
}
