//! CSV 文件存储。
//!
//! 时间线文件列为 `Date,Close,Drawdown,New_Peak,Section`，区间最小回撤文件列为 `Section,Drawdown`。
//! 浮点数以最短往返形式写出，重新加载后逐位相同。

use crate::{
    SectionId,
    statistic::metric::drawdown::min::SectionMinimums,
    store::{DrawdownStore, StoreError},
    timeline::{Timeline, TimelineRow},
    update::DrawdownState,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions, TryLockError},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const TIMELINE_HEADER: [&str; 5] = ["Date", "Close", "Drawdown", "New_Peak", "Section"];
const MINIMUMS_HEADER: [&str; 2] = ["Section", "Drawdown"];

#[derive(Debug, Deserialize, Serialize)]
struct TimelineRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Drawdown")]
    drawdown: f64,
    #[serde(rename = "New_Peak", with = "flag")]
    new_peak: bool,
    #[serde(rename = "Section")]
    section: u64,
}

impl From<&TimelineRow> for TimelineRecord {
    fn from(row: &TimelineRow) -> Self {
        Self {
            date: row.date,
            close: row.close,
            drawdown: row.drawdown,
            new_peak: row.new_peak,
            section: row.section.value(),
        }
    }
}

impl From<TimelineRecord> for TimelineRow {
    fn from(record: TimelineRecord) -> Self {
        TimelineRow::new(
            record.date,
            record.close,
            record.drawdown,
            record.new_peak,
            SectionId(record.section),
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct SectionMinimumRecord {
    #[serde(rename = "Section")]
    section: u64,
    #[serde(rename = "Drawdown")]
    drawdown: f64,
}

/// `New_Peak` 列写作 `True`/`False`，读取时同时接受小写形式。
mod flag {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "True" | "true" | "TRUE" | "1" => Ok(true),
            "False" | "false" | "FALSE" | "0" => Ok(false),
            other => Err(D::Error::custom(format!("invalid New_Peak flag: {other}"))),
        }
    }
}

/// 基于两个 CSV 文件的 [`DrawdownStore`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvStore {
    timeline: PathBuf,
    minimums: PathBuf,
}

impl CsvStore {
    pub fn new(timeline: impl Into<PathBuf>, minimums: impl Into<PathBuf>) -> Self {
        Self {
            timeline: timeline.into(),
            minimums: minimums.into(),
        }
    }

    pub fn timeline_path(&self) -> &Path {
        &self.timeline
    }

    pub fn minimums_path(&self) -> &Path {
        &self.minimums
    }

    /// 锁文件路径：`<timeline>.lock`。
    pub fn lock_path(&self) -> PathBuf {
        let mut path = OsString::from(self.timeline.as_os_str());
        path.push(".lock");
        PathBuf::from(path)
    }

    /// 加载时间线。文件不存在时返回 `Ok(None)`。
    pub fn load_timeline(&self) -> Result<Option<Timeline>, StoreError> {
        Ok(read_records::<TimelineRecord>(&self.timeline)?
            .map(|records| Timeline::new(records.into_iter().map(TimelineRow::from).collect())))
    }

    /// 加载区间最小回撤表。文件不存在时返回空表。
    pub fn load_minimums(&self) -> Result<SectionMinimums, StoreError> {
        let Some(records) = read_records::<SectionMinimumRecord>(&self.minimums)? else {
            debug!(path = %self.minimums.display(), "section minimum file missing, using empty table");
            return Ok(SectionMinimums::default());
        };

        Ok(records
            .into_iter()
            .map(|record| (SectionId(record.section), record.drawdown))
            .collect())
    }
}

impl DrawdownStore for CsvStore {
    type Lock = FileLock;

    fn load(&self) -> Result<Option<DrawdownState>, StoreError> {
        let Some(timeline) = self.load_timeline()? else {
            return Ok(None);
        };
        let minimums = self.load_minimums()?;

        debug!(
            path = %self.timeline.display(),
            rows = timeline.len(),
            sections = minimums.len(),
            "loaded persisted state"
        );
        Ok(Some(DrawdownState::new(timeline, minimums)))
    }

    fn save(&self, state: &DrawdownState) -> Result<(), StoreError> {
        write_records(
            &self.timeline,
            &TIMELINE_HEADER,
            state.timeline.rows().iter().map(TimelineRecord::from),
        )?;
        write_records(
            &self.minimums,
            &MINIMUMS_HEADER,
            state
                .minimums
                .iter()
                .map(|(section, drawdown)| SectionMinimumRecord {
                    section: section.value(),
                    drawdown,
                }),
        )?;

        debug!(
            timeline = %self.timeline.display(),
            minimums = %self.minimums.display(),
            rows = state.timeline.len(),
            "persisted state"
        );
        Ok(())
    }

    fn lock(&self) -> Result<Self::Lock, StoreError> {
        FileLock::acquire(self.lock_path())
    }
}

/// 独占更新锁：对 `<timeline>.lock` 持有操作系统咨询锁（advisory lock）。
///
/// 锁随文件句柄关闭而释放，包括进程被强制终止的情况；锁文件本身保留在磁盘上，
/// 文件中的进程号只用于排查。
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: File,
}

impl FileLock {
    pub fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = parent_dir(&path) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(StoreError::Locked(path)),
            Err(TryLockError::Error(error)) => return Err(error.into()),
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        debug!(path = %path.display(), "acquired update lock");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(error) = self.file.unlock() {
            warn!(path = %self.path.display(), ?error, "failed to release update lock");
        }
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
        .map_err(StoreError::from)
}

/// 写入同目录下的临时文件，再重命名覆盖目标文件。
///
/// 表头总是显式写出，没有记录时文件也只包含表头。
fn write_records<T: Serialize>(
    path: &Path,
    header: &[&str],
    records: impl IntoIterator<Item = T>,
) -> Result<(), StoreError> {
    let dir = parent_dir(path).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut file);
        writer.write_record(header)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    file.as_file().sync_all()?;
    file.persist(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::series_from, update::from_scratch};

    fn store_in(dir: &Path) -> CsvStore {
        CsvStore::new(
            dir.join("data").join("nasdaq100_data.csv"),
            dir.join("data").join("min_dd_per_section.csv"),
        )
    }

    #[test]
    fn test_csv_store_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let state = from_scratch(series_from(0, &[100.0, 110.0, 105.0, 95.0, 120.0, 119.99])).unwrap();

        assert_eq!(store.load().unwrap(), None);
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn test_csv_store_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let state = from_scratch(series_from(0, &[100.0, 90.0])).unwrap();

        store.save(&state).unwrap();

        let timeline = fs::read_to_string(store.timeline_path()).unwrap();
        assert_eq!(
            timeline,
            "Date,Close,Drawdown,New_Peak,Section\n\
             2024-01-01,100.0,0.0,True,0\n\
             2024-01-02,90.0,-10.0,False,0\n"
        );
        let minimums = fs::read_to_string(store.minimums_path()).unwrap();
        assert_eq!(minimums, "Section,Drawdown\n0,-10.0\n");
    }

    #[test]
    fn test_csv_store_reads_lowercase_flags_and_missing_minimums() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(
            store.timeline_path(),
            "Date,Close,Drawdown,New_Peak,Section\n2024-01-01,100.0,0.0,true,0\n",
        )
        .unwrap();

        let state = store.load().unwrap().unwrap();

        assert!(state.timeline.rows()[0].new_peak);
        assert!(state.minimums.is_empty());
    }

    #[test]
    fn test_csv_store_empty_timeline_is_initialised() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.save(&DrawdownState::default()).unwrap();

        assert_eq!(
            fs::read_to_string(store.timeline_path()).unwrap(),
            "Date,Close,Drawdown,New_Peak,Section\n"
        );
        assert_eq!(
            fs::read_to_string(store.minimums_path()).unwrap(),
            "Section,Drawdown\n"
        );
        assert_eq!(store.load().unwrap(), Some(DrawdownState::default()));
    }

    #[test]
    fn test_file_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let lock = store.lock().unwrap();
        assert!(lock.path().exists());
        assert!(matches!(store.lock(), Err(StoreError::Locked(_))));

        drop(lock);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_file_lock_left_behind_by_dead_writer_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(store.lock_path(), "999999\n").unwrap();

        let lock = store.lock().unwrap();

        assert_eq!(
            fs::read_to_string(lock.path()).unwrap(),
            format!("{}\n", std::process::id())
        );
    }
}
