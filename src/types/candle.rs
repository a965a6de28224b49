use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Daily OHLCV data point in the synthetic price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Chart timeframe selector.
///
/// The label-to-window mapping is historical and consumers depend on the
/// exact counts: "1H" returns the last 24 points, "1D" the last 7, "1W" the
/// last 30, "1M" the whole series. Do not "fix" it to calendar semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

impl Timeframe {
    /// Number of trailing candles this timeframe selects; `None` means the
    /// entire series.
    pub fn window(&self) -> Option<usize> {
        match self {
            Timeframe::OneHour => Some(24),
            Timeframe::OneDay => Some(7),
            Timeframe::OneWeek => Some(30),
            Timeframe::OneMonth => None,
        }
    }

    /// Slice a candle series according to this timeframe.
    pub fn slice<'a>(&self, series: &'a [Candle]) -> &'a [Candle] {
        match self.window() {
            Some(n) if series.len() > n => &series[series.len() - n..],
            _ => series,
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::OneDay
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::OneHour => write!(f, "1H"),
            Timeframe::OneDay => write!(f, "1D"),
            Timeframe::OneWeek => write!(f, "1W"),
            Timeframe::OneMonth => write!(f, "1M"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1H" => Ok(Timeframe::OneHour),
            "1D" => Ok(Timeframe::OneDay),
            "1W" => Ok(Timeframe::OneWeek),
            "1M" => Ok(Timeframe::OneMonth),
            _ => Err(format!("Unknown timeframe: {}", s)),
        }
    }
}
