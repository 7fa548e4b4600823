//! Static mapping from game to the sources that publish it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::RequestProfile;
use crate::extract::{
    CwlHomeExtractor, CwlNoticeExtractor, Extractor, HistoryExtractor, KaijiangExtractor,
    SportteryExtractor,
};
use crate::types::GameCode;

const CWL_HOME: &str = "https://www.cwl.gov.cn/";
const CWL_NOTICE: &str = "https://www.cwl.gov.cn/cwl_admin/front/cwlkj/search/kjxx/findDrawNotice\
    ?name=ssq&issueCount=&issueStart=&issueEnd=&dayStart=&dayEnd=&pageNo={page}&pageSize={size}\
    &week=&systemType=PC";
const SPORTTERY_HISTORY: &str = "https://webapi.sporttery.cn/gateway/lottery/getHistoryPageListV1.qry\
    ?gameNo=85&provinceId=0&pageSize={size}&isVerify=1&pageNo={page}";
const SPORTTERY_LATEST: &str = "https://webapi.sporttery.cn/gateway/lottery/getHistoryPageListV1.qry\
    ?gameNo=85&provinceId=0&isVerify=1&termLimits=50";

const CWL_PROFILE: RequestProfile = RequestProfile {
    referer: Some(CWL_HOME),
    warm_up: Some(CWL_HOME),
    ajax: true,
    ..RequestProfile::json()
};
const SPORTTERY_PROFILE: RequestProfile = RequestProfile {
    referer: Some("https://static.sporttery.cn/"),
    ..RequestProfile::json()
};

#[derive(Clone)]
pub struct Source {
    pub name: String,
    pub endpoint: String,
    /// Lower is tried first.
    pub priority: u32,
    pub profile: RequestProfile,
    pub extractor: Arc<dyn Extractor>,
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        priority: u32,
        profile: RequestProfile,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            priority,
            profile,
            extractor,
        }
    }
}

#[derive(Clone)]
pub struct HistorySource {
    pub name: String,
    /// Contains `{page}` and `{size}`.
    pub endpoint_template: String,
    pub profile: RequestProfile,
    pub extractor: Arc<dyn HistoryExtractor>,
}

impl HistorySource {
    pub fn page_url(&self, page: u32, size: u32) -> String {
        self.endpoint_template
            .replace("{page}", &page.to_string())
            .replace("{size}", &size.to_string())
    }
}

#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<GameCode, Vec<Source>>,
    history: HashMap<GameCode, HistorySource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps each game's list sorted by priority; equal priorities stay in
    /// registration order.
    pub fn register(&mut self, game: GameCode, source: Source) -> &mut Self {
        let list = self.sources.entry(game).or_default();
        list.push(source);
        list.sort_by_key(|s| s.priority);
        self
    }

    /// Replaces any earlier history source for the game.
    pub fn register_history(&mut self, game: GameCode, source: HistorySource) -> &mut Self {
        self.history.insert(game, source);
        self
    }

    pub fn sources_for(&self, game: GameCode) -> &[Source] {
        self.sources.get(&game).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn history_for(&self, game: GameCode) -> Option<&HistorySource> {
        self.history.get(&game)
    }

    pub fn with_defaults() -> Self {
        let kaijiang: Arc<dyn Extractor> = Arc::new(KaijiangExtractor);
        let cwl_notice = Arc::new(CwlNoticeExtractor);
        let sporttery = Arc::new(SportteryExtractor);

        let mut registry = Self::new();
        registry
            .register(
                GameCode::Ssq,
                Source::new(
                    "500.com",
                    "https://kaijiang.500.com/ssq.shtml",
                    1,
                    RequestProfile::html(),
                    kaijiang.clone(),
                ),
            )
            .register(
                GameCode::Ssq,
                Source::new(
                    "cwl.gov.cn",
                    CWL_HOME,
                    2,
                    RequestProfile::html(),
                    Arc::new(CwlHomeExtractor),
                ),
            )
            .register(
                GameCode::Ssq,
                Source::new(
                    "cwl.gov.cn/findDrawNotice",
                    CWL_NOTICE.replace("{page}", "1").replace("{size}", "1"),
                    3,
                    CWL_PROFILE,
                    cwl_notice.clone(),
                ),
            )
            .register_history(
                GameCode::Ssq,
                HistorySource {
                    name: "cwl.gov.cn/findDrawNotice".to_string(),
                    endpoint_template: CWL_NOTICE.to_string(),
                    profile: CWL_PROFILE,
                    extractor: cwl_notice,
                },
            )
            .register(
                GameCode::Dlt,
                Source::new(
                    "sporttery.cn",
                    SPORTTERY_LATEST,
                    1,
                    SPORTTERY_PROFILE,
                    sporttery.clone(),
                ),
            )
            .register(
                GameCode::Dlt,
                Source::new(
                    "500.com",
                    "https://kaijiang.500.com/dlt.shtml",
                    2,
                    RequestProfile::html(),
                    kaijiang,
                ),
            )
            .register_history(
                GameCode::Dlt,
                HistorySource {
                    name: "sporttery.cn".to_string(),
                    endpoint_template: SPORTTERY_HISTORY.to_string(),
                    profile: SPORTTERY_PROFILE,
                    extractor: sporttery,
                },
            );
        registry
    }
}
