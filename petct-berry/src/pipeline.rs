//! 完整的预处理流程: 划分数据集, 并逐受试者切分立方块.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::data::{BlockGrid, Modality, PatchStats, PatchWriter, VolumePair};
use crate::dataset::{self, Manifest, Partition, SplitKind, SplitPackage};
use crate::{PrepConfig, PrepError, Result};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 单个划分的处理结果.
#[derive(Debug)]
pub struct SplitReport {
    /// 划分种类.
    pub kind: SplitKind,

    /// 成功处理的受试者及其立方块统计, 顺序与划分文件列表一致.
    pub subjects: Vec<(String, PatchStats)>,

    /// 处理失败的文件及原因.
    pub failures: Vec<(PathBuf, PrepError)>,
}

impl SplitReport {
    /// 该划分的立方块统计总和.
    pub fn stats(&self) -> PatchStats {
        let mut ans = PatchStats::default();
        self.subjects.iter().for_each(|(_, s)| ans.merge(s));
        ans
    }
}

/// 整个流程的处理结果.
#[derive(Debug)]
pub struct RunReport {
    /// 本次使用的数据集划分.
    pub partition: Partition,

    /// 各划分的处理结果, 顺序与配置一致.
    pub splits: Vec<SplitReport>,
}

impl RunReport {
    /// 所有划分中失败的受试者个数.
    pub fn failure_count(&self) -> usize {
        self.splits.iter().map(|s| s.failures.len()).sum()
    }
}

/// 预处理流程.
#[derive(Debug)]
pub struct Pipeline {
    config: PrepConfig,
}

impl Pipeline {
    /// 初始化. 配置不合法时返回 `Err`.
    pub fn new(config: PrepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 当前配置.
    #[inline]
    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// 创建两个模态、三个划分共六个输出目录.
    pub fn create_dirs(&self) -> Result<()> {
        for modality in [Modality::Input, Modality::Target] {
            for split in SplitKind::ALL {
                let dir = self.config.split_dir(modality, split);
                fs::create_dir_all(&dir).map_err(|e| PrepError::io(&dir, e))?;
            }
        }
        Ok(())
    }

    /// 创建输出目录, 得到数据集划分并持久化.
    ///
    /// 若 `reuse_record` 打开且记录文件存在, 直接读取记录; 否则重新发现文件并划分.
    pub fn prepare(&self) -> Result<Partition> {
        let c = &self.config;
        self.create_dirs()?;

        if c.reuse_record && c.record_path.is_file() {
            let loaded = Partition::load(&c.record_path)?;
            info!(
                "Reusing dataset division `{}` ({} files)",
                c.record_path.display(),
                loaded.file_count()
            );
            if !loaded.is_train_disjoint() {
                warn!("Training list overlaps validation/test lists in the reused record");
            }
            // 输出目录总是跟随当前配置, 记录中的目录仅供审计.
            let partition = loaded.relocate(|modality, split| c.split_dir(modality, split));
            dataset::check_unique_subjects(partition.iter().flat_map(|p| p.files.iter()))?;
            log_partition(&partition);
            return Ok(partition);
        }

        let manifest = Manifest::discover(&c.source_x, &c.extensions)?;
        info!(
            "Found {} volumes in `{}`",
            manifest.len(),
            c.source_x.display()
        );
        for path in manifest.files() {
            debug!("{}", path.display());
        }

        dataset::check_unique_subjects(manifest.files())?;
        let lists = dataset::partition(&manifest, c.val_ratio, c.test_ratio, c.seed)?;
        let partition = Partition::new(lists, |modality, split| c.split_dir(modality, split));
        partition.save(&c.record_path)?;
        info!("Dataset division saved to `{}`", c.record_path.display());
        log_partition(&partition);
        Ok(partition)
    }

    /// 处理单个受试者: 配对, 读取, 裁剪, 检查形状, 归一化, 填充, 切分并写出.
    ///
    /// 返回 (受试者编号, 立方块统计).
    pub fn process_subject(
        &self,
        package: &SplitPackage,
        path_x: &Path,
    ) -> Result<(String, PatchStats)> {
        let c = &self.config;
        let path_y = c.swap.target_path(path_x)?;
        let subject = dataset::paired_subject_id(path_x, &path_y)?;
        debug!(
            "Subject {subject}: `{}` <-> `{}`",
            path_x.display(),
            path_y.display()
        );

        let mut pair = VolumePair::open(subject.as_str(), path_x, &path_y)?;
        pair.crop_z(c.crop_of(package.kind));
        let shape = pair.check_shape()?;
        pair.normalize();

        let grid = BlockGrid::new(shape, c.block_size, c.stride, c.pad_mode)?;
        debug!(
            "Subject {subject}: shape {shape:?} -> padded {:?}, blocks {} x {} x {}",
            grid.padded_shape(),
            grid.axis(0).len(),
            grid.axis(1).len(),
            grid.axis(2).len()
        );
        let pad_x = grid.pad(pair.input.data());
        let pad_y = grid.pad(pair.target.data());
        drop(pair);

        let writer = PatchWriter::new(
            package.kind,
            package.dir(Modality::Input),
            package.dir(Modality::Target),
            c.mean_threshold,
        );
        let stats = writer.write_pair(&subject, &grid, &pad_x, &pad_y)?;
        info!(
            "Subject {subject}: {} files are saved. ({:.2}%)",
            stats.kept,
            stats.ratio() * 100.0
        );
        Ok((subject, stats))
    }

    /// 处理一个划分下的全部受试者.
    ///
    /// 单个受试者失败时记录错误并继续处理其他受试者; 遇到配置类错误
    /// ([`PrepError::is_fatal`]) 时立即返回 `Err`.
    pub fn run_split(&self, package: &SplitPackage) -> Result<SplitReport> {
        info!(
            "------------------------- {} ({} subjects) -------------------------",
            package.label,
            package.files.len()
        );

        #[cfg(feature = "rayon")]
        let results: Vec<(PathBuf, Result<(String, PatchStats)>)> = package
            .files
            .par_iter()
            .map(|p| (p.clone(), self.process_subject(package, p)))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let results: Vec<(PathBuf, Result<(String, PatchStats)>)> = package
            .files
            .iter()
            .map(|p| (p.clone(), self.process_subject(package, p)))
            .collect();

        let mut report = SplitReport {
            kind: package.kind,
            subjects: Vec::with_capacity(results.len()),
            failures: Vec::new(),
        };
        for (path, result) in results {
            match result {
                Ok(done) => report.subjects.push(done),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Skipping `{}`: {e}", path.display());
                    report.failures.push((path, e));
                }
            }
        }
        Ok(report)
    }

    /// 运行完整流程.
    pub fn run(&self) -> Result<RunReport> {
        let partition = self.prepare()?;
        let mut splits = Vec::with_capacity(self.config.splits.len());
        for kind in self.config.splits.iter().copied() {
            splits.push(self.run_split(partition.get(kind))?);
        }
        Ok(RunReport { partition, splits })
    }
}

fn log_partition(partition: &Partition) {
    for package in partition.iter() {
        info!("{} list ({}):", package.label, package.files.len());
        for path in package.files.iter() {
            info!("    {}", path.display());
        }
    }
}
