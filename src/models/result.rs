//! Fortune result model and service identifiers.

use serde::{Deserialize, Serialize};

/// The four fortune services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    FaceReading,
    LifeFortune,
    DailyFortune,
    Dream,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::FaceReading,
        ServiceKind::LifeFortune,
        ServiceKind::DailyFortune,
        ServiceKind::Dream,
    ];

    /// Backend enum code (`resultType` in the history index).
    pub fn wire_code(self) -> &'static str {
        match self {
            ServiceKind::FaceReading => "FACE",
            ServiceKind::LifeFortune => "LIFE_LONG",
            ServiceKind::DailyFortune => "DAILY_FORTUNE",
            ServiceKind::Dream => "DREAM",
        }
    }

    pub fn from_wire_code(code: &str) -> Option<Self> {
        match code {
            "FACE" => Some(ServiceKind::FaceReading),
            "LIFE_LONG" => Some(ServiceKind::LifeFortune),
            "DAILY_FORTUNE" => Some(ServiceKind::DailyFortune),
            "DREAM" => Some(ServiceKind::Dream),
            _ => None,
        }
    }

    /// Title shown on a result card of this kind.
    pub fn result_title(self) -> &'static str {
        match self {
            ServiceKind::FaceReading => "관상 분석 결과",
            ServiceKind::LifeFortune => "평생 운세 분석 결과",
            ServiceKind::DailyFortune => "오늘의 운세 결과",
            ServiceKind::Dream => "해몽 결과",
        }
    }
}

/// A completed fortune reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortuneResult {
    /// Server id when hydrated from history, else time-based
    pub id: String,
    pub kind: ServiceKind,
    pub title: String,
    /// Normalized display text (sections + bullets)
    pub content: String,
    /// Display date, `YYYY.MM.DD`
    pub date: String,
    pub paid: bool,
}
