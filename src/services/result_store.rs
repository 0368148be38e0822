//! 结果文件服务 - 业务能力层
//!
//! 一个 JSON 数组文件保存所有比赛记录。每次写入都是完整的
//! 读-改-写：先写临时文件并 fsync，再原子重命名，所以进程在任意
//! 两场比赛之间被杀掉时，文件始终是完整可解析的。

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::models::record::sort_records;
use crate::models::{InsertPosition, Record, SortDirection, SortKey};

/// 结果文件
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// 已保存的比赛ID集合，文件不存在时为空
    pub fn load_ids(&self) -> StoreResult<HashSet<String>> {
        let ids: HashSet<String> = self.load_records()?.into_iter().map(|r| r.id).collect();
        debug!("结果文件中已有 {} 场比赛", ids.len());
        Ok(ids)
    }

    /// 读取全部记录；文件不存在或为空时返回空列表
    pub fn load_records(&self) -> StoreResult<Vec<Record>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.display_path(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: self.display_path(),
            source,
        })
    }

    /// 原子地整体写入
    pub fn write_all(&self, records: &[Record]) -> StoreResult<()> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.display_path(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut json = serde_json::to_string_pretty(records)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        json.push('\n');

        let mut temp_file = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp_file.write_all(json.as_bytes()).map_err(write_err)?;
        temp_file.as_file().sync_all().map_err(write_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// 单场比赛的持久化点：读取 → 追加 → 写回
    ///
    /// 同一ID已存在时原地替换，文件中不会出现重复ID
    pub fn save_incremental(&self, record: &Record, position: InsertPosition) -> StoreResult<()> {
        let mut records = self.load_records()?;
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            warn!("比赛 {} 已存在于结果文件中，覆盖旧记录", record.id);
            *existing = record.clone();
        } else {
            append(&mut records, record.clone(), position);
        }
        self.write_all(&records)?;
        debug!("已保存比赛 {}（共 {} 场）", record.id, records.len());
        Ok(())
    }

    /// 整体排序后写回
    ///
    /// 文件缺失、为空或无法解析时不做任何修改，返回 `false`
    pub fn sort(&self, key: SortKey, direction: SortDirection) -> bool {
        let mut records = match self.load_records() {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => {
                info!("结果文件为空或不存在，跳过排序: {}", self.display_path());
                return false;
            }
            Err(e) => {
                warn!("无法读取结果文件，跳过排序: {}", e);
                return false;
            }
        };
        sort_records(&mut records, key, direction);
        match self.write_all(&records) {
            Ok(()) => {
                info!(
                    "✓ 已按 {:?} {:?} 重新排序 {} 场比赛",
                    key,
                    direction,
                    records.len()
                );
                true
            }
            Err(e) => {
                warn!("排序后写回失败: {}", e);
                false
            }
        }
    }

    /// 清空为一个空数组
    pub fn reset(&self) -> StoreResult<()> {
        self.write_all(&[])
    }

    /// 复制一份备份：`<backup_dir>/<label>_<YYYYmmdd_HHMMSS>_<文件名>`
    ///
    /// 文件不存在时返回 `Ok(None)`
    pub fn backup(&self, backup_dir: impl AsRef<Path>, label: &str) -> StoreResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup_err = |source| StoreError::Backup {
            path: self.display_path(),
            source,
        };
        let backup_dir = backup_dir.as_ref();
        fs::create_dir_all(backup_dir).map_err(backup_err)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "results.json".to_string());
        let target = backup_dir.join(format!(
            "{}_{}_{}",
            label,
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            file_name
        ));
        fs::copy(&self.path, &target).map_err(backup_err)?;
        info!("💾 备份已创建: {}", target.display());
        Ok(Some(target))
    }
}

/// 无条件插入一条记录（调用方已去重）
pub fn append(records: &mut Vec<Record>, record: Record, position: InsertPosition) {
    match position {
        InsertPosition::End => records.push(record),
        InsertPosition::Start => records.insert(0, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fields;

    fn record(id: &str, ts: &str) -> Record {
        Record {
            id: id.to_string(),
            stage: "Regular Season".to_string(),
            timestamp: ts.to_string(),
            fields: Fields::new(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> ResultStore {
        ResultStore::new(dir.path().join("out").join("league.json"))
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load_ids().unwrap().is_empty());
        assert!(store.load_ids().unwrap().is_empty());
    }

    #[test]
    fn save_incremental_keeps_prior_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .save_incremental(&record("a", "2024-01-01"), InsertPosition::End)
            .unwrap();
        store
            .save_incremental(&record("b", "2024-01-02"), InsertPosition::End)
            .unwrap();
        store
            .save_incremental(&record("c", "2024-01-03"), InsertPosition::Start)
            .unwrap();

        let ids: Vec<_> = store.load_records().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn save_incremental_never_duplicates_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .save_incremental(&record("a", "2024-01-01"), InsertPosition::End)
            .unwrap();
        store
            .save_incremental(&record("a", "2024-02-01"), InsertPosition::End)
            .unwrap();

        let records = store.load_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, "2024-02-01");
    }

    #[test]
    fn file_is_valid_json_after_every_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        for (n, id) in ["x", "y", "z"].iter().enumerate() {
            store
                .save_incremental(&record(id, "2024-01-01"), InsertPosition::End)
                .unwrap();
            let raw = fs::read_to_string(store.path()).unwrap();
            let parsed: Vec<Record> = serde_json::from_str(&raw).unwrap();
            assert_eq!(parsed.len(), n + 1);
        }
        // 目录中不残留临时文件
        let entries = fs::read_dir(store.path().parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn malformed_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[{\"match_id\": ").unwrap();

        assert!(matches!(store.load_ids(), Err(StoreError::Malformed { .. })));
        assert!(store
            .save_incremental(&record("a", "2024-01-01"), InsertPosition::End)
            .is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[{\"match_id\": ");
        assert!(!store.sort(SortKey::Timestamp, SortDirection::Desc));
    }

    #[test]
    fn sort_rewrites_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .write_all(&[
                record("jan", "2024-01-01"),
                record("mar", "2024-03-01"),
                record("feb", "2024-02-01"),
            ])
            .unwrap();

        assert!(store.sort(SortKey::Timestamp, SortDirection::Desc));
        let stamps: Vec<_> = store
            .load_records()
            .unwrap()
            .into_iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(stamps, ["2024-03-01", "2024-02-01", "2024-01-01"]);
    }

    #[test]
    fn sort_tolerates_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.sort(SortKey::Timestamp, SortDirection::Desc));
        store.reset().unwrap();
        assert!(!store.sort(SortKey::Timestamp, SortDirection::Asc));
    }

    #[test]
    fn backup_copies_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let backups = dir.path().join("backups");
        assert!(store.backup(&backups, "usa_nba").unwrap().is_none());

        store.write_all(&[record("a", "2024-01-01")]).unwrap();
        let backup = store.backup(&backups, "usa_nba").unwrap().unwrap();
        let name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("usa_nba_"));
        assert!(name.ends_with("_league.json"));
        assert_eq!(
            fs::read_to_string(&backup).unwrap(),
            fs::read_to_string(store.path()).unwrap()
        );
    }
}
