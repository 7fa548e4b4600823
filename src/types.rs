use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameCode {
    /// Double color ball: 6 red of 1..=33, 1 blue of 1..=16.
    Ssq,
    /// Super lotto: 5 front of 1..=35, 2 back of 1..=12.
    Dlt,
}

impl GameCode {
    pub const ALL: [GameCode; 2] = [GameCode::Ssq, GameCode::Dlt];

    pub fn code(self) -> &'static str {
        match self {
            GameCode::Ssq => "ssq",
            GameCode::Dlt => "dlt",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GameCode::Ssq => "双色球",
            GameCode::Dlt => "大乐透",
        }
    }

    pub fn rules(self) -> &'static GameRules {
        match self {
            GameCode::Ssq => &SSQ_RULES,
            GameCode::Dlt => &DLT_RULES,
        }
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GameCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssq" => Ok(GameCode::Ssq),
            "dlt" => Ok(GameCode::Dlt),
            other => Err(format!("unsupported game code '{}', expected ssq or dlt", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallRule {
    pub count: usize,
    pub min: u8,
    pub max: u8,
}

impl BallRule {
    pub fn contains(&self, value: u8) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub primary: BallRule,
    pub secondary: BallRule,
    /// `YYYYNNN`
    pub period_len: usize,
    /// `YYNNN`
    pub short_period_len: usize,
}

impl GameRules {
    pub fn ball_count(&self) -> usize {
        self.primary.count + self.secondary.count
    }

    pub fn largest_ball(&self) -> u8 {
        self.primary.max.max(self.secondary.max)
    }
}

const SSQ_RULES: GameRules = GameRules {
    primary: BallRule { count: 6, min: 1, max: 33 },
    secondary: BallRule { count: 1, min: 1, max: 16 },
    period_len: 7,
    short_period_len: 5,
};

const DLT_RULES: GameRules = GameRules {
    primary: BallRule { count: 5, min: 1, max: 35 },
    secondary: BallRule { count: 2, min: 1, max: 12 },
    period_len: 7,
    short_period_len: 5,
};

/// A draw as produced by an extractor. It stays a draft until it passes
/// `normalize::validate` and the persistence gate.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawResult {
    pub game: GameCode,
    pub period: String,
    pub draw_date: NaiveDate,
    pub primary_balls: Vec<u8>,
    pub secondary_balls: Vec<u8>,
    /// Set when the source had no date and the reference date was used.
    pub date_inferred: bool,
    /// Amounts are in fen.
    pub sales: Option<i64>,
    pub pool_amount: Option<i64>,
    pub prizes: Vec<PrizeTier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrizeTier {
    pub level: u32,
    pub winners: i64,
    /// Per-ticket payout in fen.
    pub payout: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDraw {
    pub id: i64,
    pub game_id: i64,
    pub draw: DrawResult,
}

#[derive(Debug)]
pub struct DrawResultRow {
    pub id: i64,
    pub game_id: i64,
    pub period: String,
    pub draw_date: String,
    pub red_balls: Vec<u8>,
    pub blue_balls: Vec<u8>,
    pub sales_amount: Option<i64>,
    pub prize_pool: Option<i64>,
    pub created_at: String,
}

// ---- upstream payloads ----

/// `findDrawNotice` on www.cwl.gov.cn
#[derive(Deserialize, Debug)]
pub struct CwlNoticeResponse {
    pub state: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Vec<CwlNoticeItem>,
}

#[derive(Deserialize, Debug)]
pub struct CwlNoticeItem {
    pub code: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub red: String,
    #[serde(default)]
    pub blue: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub sales: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub poolmoney: Option<String>,
    #[serde(default)]
    pub prizegrades: Vec<CwlPrizeGrade>,
}

#[derive(Deserialize, Debug)]
pub struct CwlPrizeGrade {
    #[serde(rename = "type", default)]
    pub level: u32,
    #[serde(default, deserialize_with = "loose_string")]
    pub typenum: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub typemoney: Option<String>,
}

/// `getHistoryPageListV1.qry` on webapi.sporttery.cn
#[derive(Deserialize, Debug)]
pub struct SportteryResponse {
    #[serde(rename = "errorCode", default, deserialize_with = "loose_string")]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    pub error_message: String,
    #[serde(default)]
    pub value: Option<SportteryValue>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SportteryValue {
    #[serde(rename = "lastPoolDraw", default)]
    pub last_pool_draw: Option<SportteryDraw>,
    #[serde(default)]
    pub list: Vec<SportteryDraw>,
}

#[derive(Deserialize, Debug)]
pub struct SportteryDraw {
    #[serde(rename = "lotteryDrawNum", default)]
    pub draw_num: String,
    #[serde(rename = "lotteryDrawTime", default)]
    pub draw_time: String,
    #[serde(rename = "lotteryDrawResult", default)]
    pub draw_result: String,
    #[serde(rename = "totalSaleAmount", default, deserialize_with = "loose_string")]
    pub total_sale_amount: Option<String>,
    #[serde(rename = "poolBalanceAfterdraw", default, deserialize_with = "loose_string")]
    pub pool_balance: Option<String>,
    #[serde(rename = "prizeLevelList", default)]
    pub prize_levels: Vec<SportteryPrizeLevel>,
}

#[derive(Deserialize, Debug)]
pub struct SportteryPrizeLevel {
    /// `一等奖`, `一等奖追加`, `二等奖`, ...
    #[serde(rename = "prizeLevel", default, deserialize_with = "loose_string")]
    pub prize_level: Option<String>,
    #[serde(rename = "stakeCount", default, deserialize_with = "loose_string")]
    pub stake_count: Option<String>,
    #[serde(rename = "stakeAmount", default, deserialize_with = "loose_string")]
    pub stake_amount: Option<String>,
}

/// Upstream APIs mix strings and numbers for the same field.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
