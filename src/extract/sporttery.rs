//! webapi.sporttery.cn `getHistoryPageListV1.qry` for 大乐透.
//!
//! Periods come as `YYNNN`, draw results as one space separated string
//! holding five front and two back numbers.

use chrono::Datelike;

use super::{Draft, ExtractContext, Extractor, HistoryExtractor, ensure_supported};
use crate::error::{CrawlError, Result};
use crate::normalize;
use crate::period;
use crate::types::{DrawResult, GameCode, PrizeTier, SportteryDraw, SportteryResponse};
use crate::utils::{parse_amount_fen, parse_draw_date};

pub struct SportteryExtractor;

impl SportteryExtractor {
    fn parse(&self, doc: &str) -> Result<SportteryResponse> {
        let response: SportteryResponse = serde_json::from_str(doc)
            .map_err(|e| CrawlError::extraction(Extractor::name(self), format!("bad JSON: {}", e)))?;

        match response.error_code.as_deref() {
            None | Some("0") => Ok(response),
            Some(code) => Err(CrawlError::extraction(
                Extractor::name(self),
                format!("errorCode {}: {}", code, response.error_message),
            )),
        }
    }

    fn to_draw(&self, item: &SportteryDraw, ctx: &ExtractContext) -> Result<DrawResult> {
        let draw_date = parse_draw_date(&item.draw_time);
        let mut periods = ctx.period_context();
        if let Some(date) = draw_date {
            periods = periods.prefer(date.year());
        }

        let period = period::resolve_owned(&normalize::tokenize(&item.draw_num), &periods)?;
        let balls = normalize::split_balls(&normalize::tokenize(&item.draw_result), ctx.rules(), &[])?;

        let prizes = item
            .prize_levels
            .iter()
            .filter_map(|level| {
                Some(PrizeTier {
                    level: prize_rank(level.prize_level.as_deref()?)?,
                    winners: level.stake_count.as_deref()?.replace(',', "").trim().parse().ok()?,
                    payout: parse_amount_fen(level.stake_amount.as_deref()?)?,
                })
            })
            .collect();

        Draft {
            period: Some(period),
            draw_date,
            balls: Some(balls),
            sales: item.total_sale_amount.as_deref().and_then(parse_amount_fen),
            pool_amount: item.pool_balance.as_deref().and_then(parse_amount_fen),
            prizes,
        }
        .finish(Extractor::name(self), ctx)
    }
}

const RANK_NAMES: [&str; 10] = ["一", "二", "三", "四", "五", "六", "七", "八", "九", "十"];

/// `三等奖` is level 3. Add-on rows (`一等奖追加`) ride on their base level
/// and are left out.
fn prize_rank(label: &str) -> Option<u32> {
    let label = label.trim();
    if label.contains("追加") {
        return None;
    }
    let (rank, _) = label.split_once("等奖")?;
    match RANK_NAMES.iter().position(|name| *name == rank) {
        Some(idx) => u32::try_from(idx + 1).ok(),
        None => rank.trim().parse().ok(),
    }
}

impl Extractor for SportteryExtractor {
    fn name(&self) -> &str {
        "webapi.sporttery.cn"
    }

    fn supports(&self, game: GameCode) -> bool {
        game == GameCode::Dlt
    }

    /// `lastPoolDraw` when present, otherwise the newest list entry.
    fn extract(&self, doc: &str, ctx: &ExtractContext) -> Result<DrawResult> {
        ensure_supported(self, ctx.game)?;
        let value = self.parse(doc)?.value.unwrap_or_default();
        let latest = value
            .last_pool_draw
            .as_ref()
            .or_else(|| value.list.first())
            .ok_or_else(|| CrawlError::extraction(Extractor::name(self), "no draws in response"))?;
        self.to_draw(latest, ctx)
    }
}

impl HistoryExtractor for SportteryExtractor {
    fn name(&self) -> &str {
        Extractor::name(self)
    }

    fn extract_page(&self, doc: &str, ctx: &ExtractContext) -> Result<Vec<Result<DrawResult>>> {
        ensure_supported(self, ctx.game)?;
        let value = self.parse(doc)?.value.unwrap_or_default();
        Ok(value.list.iter().map(|item| self.to_draw(item, ctx)).collect())
    }
}
