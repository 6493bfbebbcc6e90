//! 로테이션 파일 테일러
//!
//! 디렉토리에서 `u_ex<YYMMDD>.log` 파일을 찾아 날짜순으로 읽습니다.
//! 한 번 실행에 한 번 끝까지 읽는 배치 방식이며, 감시(watch)는 하지 않습니다.
//!
//! # 체크포인트 재개
//! - 체크포인트 파일보다 날짜가 이른 파일은 건너뜀
//! - 첫 파일이 체크포인트 파일이면 체크포인트 오프셋으로 이동
//!   (오프셋 이전의 마지막 `#Fields:` 지시자를 먼저 내보냄)
//! - 이후 파일은 모두 처음부터
//!
//! 각 라인에는 그 라인을 읽은 *직후*의 바이트 오프셋이 붙습니다.
//! 개행으로 끝나지 않은 마지막 라인은 아직 쓰는 중인 것으로 보고
//! 이번 실행에서는 내보내지 않습니다. 오프셋도 그 앞에 머뭅니다.

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use logvane_core::types::Checkpoint;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, info, warn};

use super::{Origin, RawLine};
use crate::error::LogPipelineError;

const FILE_PREFIX: &str = "u_ex";
const FILE_SUFFIX: &str = ".log";
const FIELDS_DIRECTIVE: &[u8] = b"#Fields:";

/// 파일명에서 로그 날짜를 추출합니다.
///
/// `u_ex230105.log` → 2023-01-05. 형식이 다르거나 날짜가 잘못되면 `None`.
pub fn rotated_file_date(name: &str) -> Option<NaiveDate> {
    let digits = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = digits[0..2].parse().ok()?;
    let month: u32 = digits[2..4].parse().ok()?;
    let day: u32 = digits[4..6].parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

/// 로테이션된 로그 파일 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedFile {
    /// 파일명
    pub name: String,
    /// 전체 경로
    pub path: PathBuf,
    /// 파일명에서 추출한 날짜
    pub date: NaiveDate,
}

/// 디렉토리의 로테이션 파일을 날짜 오름차순으로 나열합니다.
pub async fn list_rotated_files(dir: &Path) -> Result<Vec<RotatedFile>, LogPipelineError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| LogPipelineError::Collector {
            source_type: "file".to_owned(),
            reason: format!("failed to read directory {}: {e}", dir.display()),
        })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let Some(date) = rotated_file_date(&name) else {
            continue;
        };
        if !entry.file_type().await?.is_file() {
            continue;
        }
        files.push(RotatedFile {
            path: entry.path(),
            name,
            date,
        });
    }

    files.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

/// 체크포인트로 읽기 계획을 세웁니다: (파일, 시작 오프셋) 목록
fn plan(files: Vec<RotatedFile>, checkpoint: &Checkpoint) -> Vec<(RotatedFile, u64)> {
    let checkpoint_date = checkpoint.file.as_deref().and_then(rotated_file_date);

    let mut planned: Vec<(RotatedFile, u64)> = files
        .into_iter()
        .filter(|f| checkpoint_date.is_none_or(|d| f.date >= d))
        .map(|f| (f, 0))
        .collect();

    let offset = checkpoint.resume_offset();
    if let (Some(cp_file), Some((first, start))) = (checkpoint.file.as_deref(), planned.first_mut())
        && offset > 0
    {
        if first.name == cp_file {
            *start = offset;
        } else {
            warn!(
                checkpoint = %checkpoint,
                first_file = %first.name,
                "checkpoint file is no longer present, starting next file from offset 0"
            );
        }
    }
    planned
}

/// 테일러가 내보내는 이벤트
#[derive(Debug, Clone)]
pub enum TailEvent {
    /// 새 파일 읽기 시작
    FileStarted {
        /// 파일명
        name: String,
        /// 데이터 읽기 시작 오프셋
        start_offset: u64,
    },
    /// 라인 하나 (원점은 항상 [`Origin::File`])
    Line(RawLine),
}

struct OpenFile {
    name: String,
    reader: BufReader<File>,
    offset: u64,
}

impl OpenFile {
    async fn read_line(&mut self) -> Result<Option<RawLine>, LogPipelineError> {
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        if !buf.ends_with(b"\n") {
            debug!(
                file = %self.name,
                offset = self.offset,
                bytes = read,
                "partial trailing line left for next run"
            );
            return Ok(None);
        }
        self.offset += read as u64;
        Ok(Some(RawLine::new(
            buf,
            Origin::File {
                name: self.name.clone(),
                offset: self.offset,
            },
        )))
    }
}

/// 로테이션 파일 테일러
///
/// [`next_event`](Self::next_event)를 `None`이 나올 때까지 호출합니다.
pub struct FileTailer {
    queue: VecDeque<(RotatedFile, u64)>,
    pending: VecDeque<TailEvent>,
    current: Option<OpenFile>,
    files_opened: usize,
}

impl FileTailer {
    /// 디렉토리를 스캔하고 체크포인트로 읽기 계획을 세웁니다.
    pub async fn open(dir: &Path, checkpoint: &Checkpoint) -> Result<Self, LogPipelineError> {
        let files = list_rotated_files(dir).await?;
        let planned = plan(files, checkpoint);
        info!(
            dir = %dir.display(),
            checkpoint = %checkpoint,
            files = planned.len(),
            "tail plan ready"
        );
        Ok(Self {
            queue: planned.into(),
            pending: VecDeque::new(),
            current: None,
            files_opened: 0,
        })
    }

    /// 남은 계획 (파일명, 시작 오프셋)
    pub fn planned_files(&self) -> Vec<(&str, u64)> {
        self.queue
            .iter()
            .map(|(f, start)| (f.name.as_str(), *start))
            .collect()
    }

    /// 지금까지 연 파일 수
    pub fn files_opened(&self) -> usize {
        self.files_opened
    }

    /// 다음 이벤트를 읽습니다. 모든 파일을 다 읽으면 `None`.
    pub async fn next_event(&mut self) -> Result<Option<TailEvent>, LogPipelineError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            if let Some(file) = self.current.as_mut() {
                match file.read_line().await? {
                    Some(line) => return Ok(Some(TailEvent::Line(line))),
                    None => {
                        debug!(file = %file.name, offset = file.offset, "reached end of file");
                        self.current = None;
                        continue;
                    }
                }
            }

            let Some((entry, start)) = self.queue.pop_front() else {
                return Ok(None);
            };
            self.open_file(entry, start).await?;
        }
    }

    async fn open_file(&mut self, entry: RotatedFile, start: u64) -> Result<(), LogPipelineError> {
        let handle = File::open(&entry.path)
            .await
            .map_err(|e| LogPipelineError::Collector {
                source_type: "file".to_owned(),
                reason: format!("failed to open {}: {e}", entry.path.display()),
            })?;
        info!(file = %entry.path.display(), offset = start, "processing file");

        let mut file = OpenFile {
            name: entry.name.clone(),
            reader: BufReader::new(handle),
            offset: 0,
        };
        self.pending.push_back(TailEvent::FileStarted {
            name: entry.name,
            start_offset: start,
        });

        if start > 0 {
            // 헤더 블록은 파일 중간에도 다시 나올 수 있음
            let mut directive = None;
            while let Some(line) = file.read_line().await? {
                if file.offset > start {
                    break;
                }
                if line.data.starts_with(FIELDS_DIRECTIVE) {
                    directive = Some(line);
                }
            }
            if let Some(line) = directive {
                self.pending.push_back(TailEvent::Line(line));
            }
            file.reader.seek(SeekFrom::Start(start)).await?;
            file.offset = start;
        }

        self.files_opened += 1;
        self.current = Some(file);
        Ok(())
    }
}
