use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::consts::SUBJECT_ID_RANGE;
use crate::{PrepError, Result};

/// 模态标签替换规则. 输入模态路径中所有的 `input_tag` 被替换为 `target_tag`,
/// 即得到对应的目标模态路径. 如 `./data_train/RSPET/RS_051.nii.gz` 对应
/// `./data_train/RSCT/RS_051.nii.gz`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModalitySwap {
    input_tag: String,
    target_tag: String,
}

impl Default for ModalitySwap {
    fn default() -> Self {
        Self {
            input_tag: "PET".to_string(),
            target_tag: "CT".to_string(),
        }
    }
}

impl ModalitySwap {
    /// 初始化. 两个标签必须非空且互不相同, 否则返回 `PrepError::InvalidConfig`.
    pub fn new(input_tag: impl Into<String>, target_tag: impl Into<String>) -> Result<Self> {
        let (input_tag, target_tag) = (input_tag.into(), target_tag.into());
        if input_tag.is_empty() || target_tag.is_empty() || input_tag == target_tag {
            return Err(PrepError::InvalidConfig(format!(
                "modality tags must be distinct and non-empty, got `{input_tag}` -> `{target_tag}`"
            )));
        }
        Ok(Self {
            input_tag,
            target_tag,
        })
    }

    /// 输入模态标签.
    #[inline]
    pub fn input_tag(&self) -> &str {
        &self.input_tag
    }

    /// 目标模态标签.
    #[inline]
    pub fn target_tag(&self) -> &str {
        &self.target_tag
    }

    /// 由输入模态路径得到目标模态路径.
    ///
    /// 以下情况返回 `PrepError::NamingMismatch`:
    ///
    /// 1. 路径不是合法 UTF-8;
    /// 2. 路径中不含输入模态标签;
    /// 3. 替换不可逆 (例如路径本身已经包含目标模态标签), 此时不同输入可能映射到同一目标.
    pub fn target_path(&self, input: &Path) -> Result<PathBuf> {
        let s = input
            .to_str()
            .ok_or_else(|| PrepError::naming(input, "path is not valid UTF-8"))?;
        if !s.contains(self.input_tag.as_str()) {
            return Err(PrepError::naming(
                input,
                format!("missing modality tag `{}`", self.input_tag),
            ));
        }
        let swapped = s.replace(self.input_tag.as_str(), &self.target_tag);
        if swapped.replace(self.target_tag.as_str(), &self.input_tag) != s {
            return Err(PrepError::naming(
                input,
                format!(
                    "substituting `{}` -> `{}` is not reversible",
                    self.input_tag, self.target_tag
                ),
            ));
        }
        Ok(PathBuf::from(swapped))
    }
}

/// 从文件名中提取受试者编号, 即文件名的第 3..6 个字符 (`RS_051.nii.gz` -> `051`).
///
/// 文件名过短或者不是合法 UTF-8 时返回 `PrepError::NamingMismatch`.
pub fn subject_id(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PrepError::naming(path, "file name is missing or not valid UTF-8"))?;
    name.get(SUBJECT_ID_RANGE)
        .filter(|id| !id.contains('.'))
        .map(str::to_string)
        .ok_or_else(|| {
            PrepError::naming(
                path,
                format!("cannot take subject id from characters {SUBJECT_ID_RANGE:?}"),
            )
        })
}

/// 配对两个文件的受试者编号. 两个文件名给出的编号必须一致, 否则返回
/// `PrepError::NamingMismatch` (如 `PET_003.nii` 与 `CT_003.nii` 分别得到 `_00` 与 `003`).
pub fn paired_subject_id(path_x: &Path, path_y: &Path) -> Result<String> {
    let (id_x, id_y) = (subject_id(path_x)?, subject_id(path_y)?);
    if id_x == id_y {
        Ok(id_x)
    } else {
        Err(PrepError::naming(
            path_x,
            format!(
                "subject id `{id_x}` differs from `{id_y}` of `{}`",
                path_y.display()
            ),
        ))
    }
}

/// 检查所有文件的受试者编号互不相同. 立方块文件名只含受试者编号,
/// 编号重复的两个受试者会互相覆盖输出.
///
/// 编号重复时返回 `PrepError::NamingMismatch`, 指向后出现的文件.
pub fn check_unique_subjects<'a, I>(paths: I) -> Result<()>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    for path in paths {
        let id = subject_id(path)?;
        if let Some(first) = seen.get(&id) {
            return Err(PrepError::naming(
                path.as_path(),
                format!("subject id `{id}` is already taken by `{}`", first.display()),
            ));
        }
        seen.insert(id, path.as_path());
    }
    Ok(())
}
