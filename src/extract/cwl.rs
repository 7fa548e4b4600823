//! www.cwl.gov.cn: the portal home page (free text around a "双色球" block)
//! and the `findDrawNotice` JSON endpoint.

use chrono::Datelike;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

use super::html::{balls_after_period, element_text, elements_mentioning, page_text, period_anchor};
use super::{
    Attempt, Draft, ExtractContext, Extractor, HistoryExtractor, ensure_supported, first_match,
};
use crate::error::{CrawlError, Result};
use crate::normalize;
use crate::period::{self, PeriodContext};
use crate::types::{CwlNoticeItem, CwlNoticeResponse, DrawResult, GameCode, GameRules, PrizeTier};
use crate::utils::{find_draw_date_near, parse_amount_fen, parse_draw_date, strip_dates};

static ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第\s*([0-9]{5,7})\s*期").expect("issue pattern"));

const GAME_KEYWORD: &str = "双色球";

pub struct CwlHomeExtractor;

struct HomePage<'a> {
    document: &'a Html,
    text: String,
    rules: &'static GameRules,
    periods: PeriodContext,
}

impl Extractor for CwlHomeExtractor {
    fn name(&self) -> &str {
        "cwl.gov.cn"
    }

    fn supports(&self, game: GameCode) -> bool {
        game == GameCode::Ssq
    }

    fn extract(&self, doc: &str, ctx: &ExtractContext) -> Result<DrawResult> {
        ensure_supported(self, ctx.game)?;

        let document = Html::parse_document(doc);
        let text = page_text(&document);
        if !text.contains(GAME_KEYWORD) {
            return Err(CrawlError::extraction(self.name(), "no 双色球 block on page"));
        }

        let draw_date = find_draw_date_near(&text, ctx.reference_date);
        let mut periods = ctx.period_context();
        if let Some(date) = draw_date {
            periods = periods.prefer(date.year());
        }
        let page = HomePage {
            document: &document,
            text,
            rules: ctx.rules(),
            periods,
        };

        let period_attempts: [(&str, Attempt<HomePage<'_>, String>); 2] =
            [("issue_label", issue_label), ("page_tokens", home_page_period)];
        let ball_attempts: [(&str, Attempt<HomePage<'_>, (Vec<u8>, Vec<u8>)>); 2] = [
            ("near_game_name", near_game_name),
            ("after_period", home_after_period),
        ];

        let draft = Draft {
            period: first_match(self.name(), "period", &page, &period_attempts),
            draw_date,
            balls: first_match(self.name(), "balls", &page, &ball_attempts),
            ..Draft::default()
        };
        draft.finish(self.name(), ctx)
    }
}

fn issue_label(page: &HomePage<'_>) -> Option<String> {
    let tokens: Vec<&str> = ISSUE
        .captures_iter(&page.text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    period::resolve(&tokens, &page.periods).ok()
}

fn home_page_period(page: &HomePage<'_>) -> Option<String> {
    let tokens = normalize::tokenize(&strip_dates(&page.text));
    period::resolve_owned(&tokens, &page.periods).ok()
}

/// The numbers sit in the container that holds the game name. Tokens before
/// the period (when the container has one) are headings, not balls.
fn near_game_name(page: &HomePage<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    elements_mentioning(page.document, GAME_KEYWORD)
        .into_iter()
        .find_map(|el| {
            let container = el.parent().and_then(ElementRef::wrap).unwrap_or(el);
            let text = element_text(container);
            let after_keyword = text
                .split_once(GAME_KEYWORD)
                .map(|(_, rest)| rest)
                .unwrap_or(&text);
            let tokens = normalize::tokenize(&strip_dates(after_keyword));
            let start = period_anchor(&tokens, &page.periods)
                .map(|i| i + 1)
                .unwrap_or(0);
            normalize::balls_from(&tokens, start, page.rules, &[]).ok()
        })
}

fn home_after_period(page: &HomePage<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    balls_after_period(&page.text, &page.periods, page.rules)
}

/// `findDrawNotice` returns newest first; the latest draw is the first item.
pub struct CwlNoticeExtractor;

impl CwlNoticeExtractor {
    fn parse(&self, doc: &str) -> Result<Vec<CwlNoticeItem>> {
        let response: CwlNoticeResponse = serde_json::from_str(doc)
            .map_err(|e| CrawlError::extraction(Extractor::name(self), format!("bad JSON: {}", e)))?;
        if response.state != 0 {
            return Err(CrawlError::extraction(
                Extractor::name(self),
                format!("state {}: {}", response.state, response.message),
            ));
        }
        Ok(response.result)
    }

    fn item_to_draw(&self, item: &CwlNoticeItem, ctx: &ExtractContext) -> Result<DrawResult> {
        let draw_date = parse_draw_date(&item.date);
        let mut periods = ctx.period_context();
        if let Some(date) = draw_date {
            periods = periods.prefer(date.year());
        }

        let period = period::resolve_owned(&normalize::tokenize(&item.code), &periods)?;
        let balls = normalize::split_sections(
            &normalize::tokenize(&item.red),
            &normalize::tokenize(&item.blue),
            ctx.rules(),
        )?;

        let prizes = item
            .prizegrades
            .iter()
            .filter(|g| g.level > 0)
            .filter_map(|g| {
                Some(PrizeTier {
                    level: g.level,
                    winners: g.typenum.as_deref()?.trim().parse().ok()?,
                    payout: parse_amount_fen(g.typemoney.as_deref()?)?,
                })
            })
            .collect();

        Draft {
            period: Some(period),
            draw_date,
            balls: Some(balls),
            sales: item.sales.as_deref().and_then(parse_amount_fen),
            pool_amount: item.poolmoney.as_deref().and_then(parse_amount_fen),
            prizes,
        }
        .finish(Extractor::name(self), ctx)
    }
}

impl Extractor for CwlNoticeExtractor {
    fn name(&self) -> &str {
        "cwl.gov.cn/findDrawNotice"
    }

    fn supports(&self, game: GameCode) -> bool {
        game == GameCode::Ssq
    }

    fn extract(&self, doc: &str, ctx: &ExtractContext) -> Result<DrawResult> {
        ensure_supported(self, ctx.game)?;
        let items = self.parse(doc)?;
        let latest = items
            .first()
            .ok_or_else(|| CrawlError::extraction(Extractor::name(self), "empty draw list"))?;
        self.item_to_draw(latest, ctx)
    }
}

impl HistoryExtractor for CwlNoticeExtractor {
    fn name(&self) -> &str {
        Extractor::name(self)
    }

    fn extract_page(&self, doc: &str, ctx: &ExtractContext) -> Result<Vec<Result<DrawResult>>> {
        ensure_supported(self, ctx.game)?;
        Ok(self
            .parse(doc)?
            .iter()
            .map(|item| self.item_to_draw(item, ctx))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> ExtractContext {
        ExtractContext::new(GameCode::Ssq, NaiveDate::from_ymd_opt(2025, 10, 20).unwrap())
    }

    const NOTICE: &str = r#"{
        "state": 0,
        "message": "查询成功",
        "result": [
            {
                "name": "双色球",
                "code": "2025119",
                "date": "2025-10-19(日)",
                "red": "04,07,18,24,26,28",
                "blue": "08",
                "sales": "379056236",
                "poolmoney": "2473187006",
                "prizegrades": [
                    {"type": 1, "typenum": "7", "typemoney": "7528956"},
                    {"type": 2, "typenum": "129", "typemoney": "196853"},
                    {"type": 7, "typenum": "", "typemoney": ""}
                ]
            },
            {
                "code": "2025118",
                "date": "2025-10-16(四)",
                "red": "06,09,23,26,28",
                "blue": "11"
            }
        ]
    }"#;

    #[test]
    fn latest_notice_is_first_item() {
        let draw = CwlNoticeExtractor.extract(NOTICE, &ctx()).unwrap();
        assert_eq!(draw.period, "2025119");
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2025, 10, 19).unwrap());
        assert_eq!(draw.primary_balls, vec![4, 7, 18, 24, 26, 28]);
        assert_eq!(draw.secondary_balls, vec![8]);
        assert_eq!(draw.sales, Some(37_905_623_600));
        assert_eq!(draw.pool_amount, Some(247_318_700_600));
        assert_eq!(
            draw.prizes,
            vec![
                PrizeTier { level: 1, winners: 7, payout: 752_895_600 },
                PrizeTier { level: 2, winners: 129, payout: 19_685_300 },
            ]
        );
    }

    #[test]
    fn history_page_keeps_bad_items_as_errors() {
        let items = CwlNoticeExtractor.extract_page(NOTICE, &ctx()).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(CrawlError::NormalizationFailed { .. })));
    }

    #[test]
    fn non_zero_state_is_rejected() {
        let body = r#"{"state": 1, "message": "访问频繁", "result": []}"#;
        let err = CwlNoticeExtractor.extract(body, &ctx()).unwrap_err();
        assert!(matches!(err, CrawlError::ExtractionFailed { .. }));
    }

    #[test]
    fn home_page_block_near_game_name() {
        let page = r#"
            <html><body>
              <div class="kj-list">
                <div class="kj-item">
                  <h3>双色球</h3>
                  <p>第2025119期 2025-10-19</p>
                  <ul><li>04</li><li>07</li><li>18</li><li>24</li><li>26</li><li>28</li><li>08</li></ul>
                </div>
                <div class="kj-item"><h3>福彩3D</h3><p>第2025280期</p><ul><li>3</li><li>5</li><li>9</li></ul></div>
              </div>
            </body></html>"#;
        let draw = CwlHomeExtractor.extract(page, &ctx()).unwrap();
        assert_eq!(draw.period, "2025119");
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2025, 10, 19).unwrap());
        assert_eq!(draw.primary_balls, vec![4, 7, 18, 24, 26, 28]);
        assert_eq!(draw.secondary_balls, vec![8]);
    }

    #[test]
    fn yearless_date_is_not_read_as_balls() {
        let page = r#"
            <html><body>
              <div class="kj-item">
                <h3>双色球</h3>
                <p>第2025119期 10月11日（六）</p>
                <ul><li>01</li><li>02</li><li>03</li><li>05</li><li>06</li><li>09</li><li>08</li></ul>
              </div>
            </body></html>"#;
        let draw = CwlHomeExtractor.extract(page, &ctx()).unwrap();
        assert_eq!(draw.period, "2025119");
        assert_eq!(draw.primary_balls, vec![1, 2, 3, 5, 6, 9]);
        assert_eq!(draw.secondary_balls, vec![8]);
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2025, 10, 11).unwrap());
        assert!(!draw.date_inferred);
    }

    #[test]
    fn home_page_without_game_block_fails() {
        let err = CwlHomeExtractor
            .extract("<html><body><p>福彩3D 第2025280期</p></body></html>", &ctx())
            .unwrap_err();
        assert!(matches!(err, CrawlError::ExtractionFailed { .. }));
    }

    #[test]
    fn dlt_is_not_published_here() {
        let dlt = ExtractContext::new(GameCode::Dlt, ctx().reference_date);
        assert!(CwlHomeExtractor.extract(NOTICE, &dlt).is_err());
        assert!(!CwlNoticeExtractor.supports(GameCode::Dlt));
    }
}
