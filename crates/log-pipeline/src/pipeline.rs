//! 수집 서비스 오케스트레이션 -- 파싱/보강/라우팅의 전체 흐름을 관리합니다.
//!
//! 두 가지 실행 형태가 같은 부품을 공유합니다.
//!
//! - [`SyslogService`]: 장기 실행 UDP 수신기. 데이터그램 하나를 끝까지 처리한 뒤 다음을 받습니다.
//! - [`TailJob`]: 1회성 배치. 체크포인트부터 로테이션 파일을 끝까지 읽어 벌크로 기록합니다.
//!
//! # 내부 흐름
//! ```text
//! UDP:  datagram -> LineGrammar -> GeoEnricher(SRC/DST) -> IndexRouter::write
//! File: CheckpointResolver -> FileTailer -> W3cParser -> GeoEnricher(c_ip/s_ip)
//!       + UserAgentFlattener -> IndexRouter::write_batch -> refresh
//! ```

use logvane_core::error::StoreError;
use logvane_core::metrics as m;
use logvane_core::store::{BulkSummary, DocumentStore, IndexRequest};
use logvane_core::types::{Checkpoint, FieldValue, ParsedRecord, TemplateSpec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checkpoint::{CheckpointResolver, FILE_FIELD, OFFSET_FIELD};
use crate::collector::{FileTailer, Origin, RawLine, SyslogUdpCollector, TailEvent};
use crate::config::{SyslogServiceConfig, TailJobConfig};
use crate::enrich::{GeoEnricher, KeyCase, UserAgentFlattener};
use crate::error::LogPipelineError;
use crate::parser::{GrammarMatch, LineGrammar, LocalZone, W3cParser};
use crate::router::IndexRouter;
use crate::schema::{self, SchemaProvisioner};

/// 방화벽 레코드에서 보강할 주소 필드
const FIREWALL_IP_FIELDS: [&str; 2] = ["SRC", "DST"];
/// 접근 로그에서 보강할 주소 필드
const ACCESS_IP_FIELDS: [&str; 2] = ["c_ip", "s_ip"];
/// User-Agent 컬럼
const USER_AGENT_FIELD: &str = "cs_user_agent";
/// User-Agent 속성 접두어
const USER_AGENT_PREFIX: &str = "ua_";

/// 프로세스 전역 실행 맥락
///
/// 시작 시 한 번 만들어 서비스/잡에 넘깁니다. 전역 상태는 두지 않습니다.
#[derive(Debug)]
pub struct IngestContext<S> {
    store: S,
    geo: GeoEnricher,
    user_agent: UserAgentFlattener,
    zone: LocalZone,
    legacy_types: bool,
}

impl<S: DocumentStore> IngestContext<S> {
    /// 맥락을 생성합니다.
    pub fn new(store: S, geo: GeoEnricher) -> Self {
        Self {
            store,
            geo,
            user_agent: UserAgentFlattener::new(),
            zone: LocalZone::System,
            legacy_types: false,
        }
    }

    /// 타임스탬프 해석 시간대를 지정합니다.
    pub fn with_zone(mut self, zone: LocalZone) -> Self {
        self.zone = zone;
        self
    }

    /// 타입이 있는 구버전 저장소용 매핑을 사용합니다.
    pub fn with_legacy_types(mut self, legacy: bool) -> Self {
        self.legacy_types = legacy;
        self
    }

    /// 문서 저장소
    pub fn store(&self) -> &S {
        &self.store
    }

    /// GeoIP 보강기
    pub fn geo(&self) -> &GeoEnricher {
        &self.geo
    }

    fn provisioner(&self) -> SchemaProvisioner {
        SchemaProvisioner::new(self.legacy_types)
    }

    fn enrich_addresses(&self, record: &mut ParsedRecord, fields: &[&str], case: KeyCase) {
        for field in fields {
            let Some(ip) = record.get_text(field).map(str::to_owned) else {
                continue;
            };
            let result = self.geo.enrich(&ip);
            if !result.is_empty() {
                record.extend(result.namespaced(field, case));
            }
        }
    }
}

/// 라인 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// 기록됨 (대상 인덱스)
    Indexed(String),
    /// 어떤 문법에도 맞지 않아 버림
    Unrecognized,
}

/// UDP syslog 수집 서비스
pub struct SyslogService<S> {
    ctx: IngestContext<S>,
    config: SyslogServiceConfig,
    grammar: LineGrammar,
    firewall_router: IndexRouter,
    syslog_router: IndexRouter,
}

impl<S: DocumentStore> SyslogService<S> {
    /// 서비스를 생성합니다.
    pub fn new(ctx: IngestContext<S>, config: SyslogServiceConfig) -> Result<Self, LogPipelineError> {
        config.validate()?;
        let grammar = LineGrammar::with_zone(ctx.zone)?;
        Ok(Self {
            firewall_router: IndexRouter::new(config.firewall_document_type.clone(), 1),
            syslog_router: IndexRouter::new(config.syslog_document_type.clone(), 1),
            ctx,
            config,
            grammar,
        })
    }

    /// 실행 맥락
    pub fn context(&self) -> &IngestContext<S> {
        &self.ctx
    }

    /// 두 문서 타입의 템플릿을 다시 만듭니다.
    pub async fn initialize_templates(&self) -> Result<Vec<TemplateSpec>, LogPipelineError> {
        let provisioner = self.ctx.provisioner();
        let specs = vec![
            schema::firewall_template(&self.config.firewall_document_type),
            schema::syslog_template(&self.config.syslog_document_type),
        ];
        for spec in &specs {
            provisioner.provision(&self.ctx.store, spec).await?;
        }
        Ok(specs)
    }

    /// 설정된 주소에 수신기를 바인드합니다.
    pub async fn bind(&self) -> Result<SyslogUdpCollector, LogPipelineError> {
        SyslogUdpCollector::bind(&self.config.bind, self.config.max_datagram_size).await
    }

    /// 바인드 후 취소될 때까지 수신합니다.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), LogPipelineError> {
        let mut collector = self.bind().await?;
        self.serve(&mut collector, cancel).await;
        Ok(())
    }

    /// 이미 바인드된 수신기로 취소될 때까지 수신합니다.
    ///
    /// 처리 중인 데이터그램은 취소 전에 끝까지 처리됩니다.
    /// 저장소 쓰기 실패는 기록하고 다음 데이터그램으로 넘어갑니다.
    pub async fn serve(&self, collector: &mut SyslogUdpCollector, cancel: CancellationToken) {
        info!("syslog service started");
        loop {
            let raw = tokio::select! {
                _ = cancel.cancelled() => break,
                received = collector.recv() => received,
            };
            match raw {
                Ok(raw) => {
                    metrics::counter!(m::SYSLOG_DATAGRAMS_RECEIVED_TOTAL).increment(1);
                    if let Err(e) = self.handle_datagram(&raw).await {
                        error!(error = %e, origin = ?raw.origin, "failed to store syslog record");
                    }
                }
                Err(e) => warn!(error = %e, "syslog receive failed"),
            }
        }
        collector.stop();
        info!("syslog service stopped");
    }

    /// 데이터그램 하나를 처리합니다.
    pub async fn handle_datagram(&self, raw: &RawLine) -> Result<LineOutcome, StoreError> {
        self.handle_line(&raw.text()).await
    }

    /// 라인 하나를 분류, 보강, 기록합니다.
    pub async fn handle_line(&self, line: &str) -> Result<LineOutcome, StoreError> {
        let (record, router) = match self.grammar.parse(line) {
            GrammarMatch::KernelFirewall(mut record) => {
                self.ctx
                    .enrich_addresses(&mut record, &FIREWALL_IP_FIELDS, KeyCase::Upper);
                (record, &self.firewall_router)
            }
            GrammarMatch::GenericSyslog(record) => (record, &self.syslog_router),
            GrammarMatch::Unrecognized => {
                metrics::counter!(m::SYSLOG_LINES_UNRECOGNIZED_TOTAL).increment(1);
                warn!(line = %line.trim_end(), "unrecognized syslog line");
                return Ok(LineOutcome::Unrecognized);
            }
        };

        metrics::counter!(m::PARSER_RECORDS_PARSED_TOTAL, m::LABEL_RECORD_KIND => record.kind().as_str())
            .increment(1);
        let index = router.route(&record);
        router.write(&self.ctx.store, &record).await?;
        Ok(LineOutcome::Indexed(index))
    }
}

/// 테일 잡 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailReport {
    /// 시작 체크포인트
    pub checkpoint: Checkpoint,
    /// 읽은 파일 수
    pub files: usize,
    /// 기록을 시도한 레코드 수
    pub records: usize,
    /// 건너뛴 잘못된 행 수
    pub malformed: usize,
    /// 벌크 쓰기 요약
    pub summary: BulkSummary,
}

/// W3C 로그 파일 테일 잡
pub struct TailJob<S> {
    ctx: IngestContext<S>,
    config: TailJobConfig,
    parser: W3cParser,
    router: IndexRouter,
}

impl<S: DocumentStore> TailJob<S> {
    /// 잡을 생성합니다.
    pub fn new(ctx: IngestContext<S>, config: TailJobConfig) -> Result<Self, LogPipelineError> {
        config.validate()?;
        let parser = W3cParser::new(config.columns.as_slice(), ctx.zone)?;
        Ok(Self {
            router: IndexRouter::new(config.document_type.clone(), config.bulk_chunk_size),
            ctx,
            config,
            parser,
        })
    }

    /// 실행 맥락
    pub fn context(&self) -> &IngestContext<S> {
        &self.ctx
    }

    /// 체크포인트부터 끝까지 읽어 기록합니다.
    pub async fn run(&mut self) -> Result<TailReport, LogPipelineError> {
        let checkpoint = CheckpointResolver::new(self.config.document_type.clone())
            .resolve(&self.ctx.store)
            .await?;
        let mut tailer = FileTailer::open(&self.config.log_dir, &checkpoint).await?;

        let mut report = TailReport {
            checkpoint,
            ..Default::default()
        };
        let mut pending: Vec<IndexRequest> = Vec::with_capacity(self.config.bulk_chunk_size);

        while let Some(record) = self.next_record(&mut tailer, &mut report.malformed).await? {
            pending.push(self.router.request(&record));
            report.records += 1;
            if pending.len() >= self.config.bulk_chunk_size {
                let part = self.router.write_batch(&self.ctx.store, &pending).await?;
                report.summary.merge(part);
                pending.clear();
            }
        }
        if !pending.is_empty() {
            let part = self.router.write_batch(&self.ctx.store, &pending).await?;
            report.summary.merge(part);
        }

        report.files = tailer.files_opened();
        if report.records > 0 {
            self.ctx
                .store
                .refresh(&format!("{}-*", self.config.document_type))
                .await?;
        }

        metrics::counter!(m::TAIL_RECORDS_LOADED_TOTAL).increment(report.summary.succeeded as u64);
        metrics::counter!(m::TAIL_FILES_PROCESSED_TOTAL).increment(report.files as u64);
        info!(
            document_type = %self.config.document_type,
            checkpoint = %report.checkpoint,
            files = report.files,
            records = report.records,
            loaded = report.summary.succeeded,
            failed = report.summary.failed,
            malformed = report.malformed,
            "tail job finished"
        );
        Ok(report)
    }

    /// 처음부터 `sample_size`개 레코드를 읽어 템플릿을 추론하고 다시 만듭니다.
    pub async fn initialize_template(&mut self) -> Result<TemplateSpec, LogPipelineError> {
        let mut tailer = FileTailer::open(&self.config.log_dir, &Checkpoint::start()).await?;
        let mut samples = Vec::with_capacity(self.config.sample_size);
        let mut malformed = 0;
        while samples.len() < self.config.sample_size {
            match self.next_record(&mut tailer, &mut malformed).await? {
                Some(record) => samples.push(record),
                None => break,
            }
        }
        if samples.is_empty() {
            warn!(
                dir = %self.config.log_dir.display(),
                "no sample records found, template will only carry explicit types"
            );
        }

        let spec = schema::infer_template(
            &self.config.document_type,
            &samples,
            &schema::access_log_overrides(),
        );
        self.ctx
            .provisioner()
            .provision(&self.ctx.store, &spec)
            .await?;
        Ok(spec)
    }

    /// 다음 완성된 레코드를 읽습니다. 잘못된 행은 기록하고 건너뜁니다.
    async fn next_record(
        &mut self,
        tailer: &mut FileTailer,
        malformed: &mut usize,
    ) -> Result<Option<ParsedRecord>, LogPipelineError> {
        while let Some(event) = tailer.next_event().await? {
            let raw = match event {
                TailEvent::FileStarted { name, start_offset } => {
                    debug!(file = %name, start_offset, "resetting column layout");
                    self.parser.begin_file();
                    continue;
                }
                TailEvent::Line(raw) => raw,
            };
            let Origin::File { name, offset } = &raw.origin else {
                continue;
            };

            let record = match self.parser.parse_line(&raw.text()) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    *malformed += 1;
                    metrics::counter!(m::PARSER_W3C_ROWS_MALFORMED_TOTAL).increment(1);
                    warn!(file = %name, offset, error = %e, "skipping malformed row");
                    continue;
                }
            };
            metrics::counter!(m::PARSER_RECORDS_PARSED_TOTAL, m::LABEL_RECORD_KIND => record.kind().as_str())
                .increment(1);
            return Ok(Some(self.finish_record(record, name, *offset)));
        }
        Ok(None)
    }

    fn finish_record(&self, mut record: ParsedRecord, file: &str, offset: u64) -> ParsedRecord {
        self.ctx
            .enrich_addresses(&mut record, &ACCESS_IP_FIELDS, KeyCase::Lower);

        if let Some(agent) = record.get_text(USER_AGENT_FIELD).map(str::to_owned) {
            let attrs = self.ctx.user_agent.flatten(&agent);
            record.extend(
                attrs
                    .into_iter()
                    .map(|(k, v)| (format!("{USER_AGENT_PREFIX}{k}"), FieldValue::Text(v))),
            );
        }

        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        record.insert(OFFSET_FIELD, FieldValue::Integer(offset));
        record.insert(FILE_FIELD, file);
        record.with_document_id(format!("{file}:{offset}"))
    }
}
