use crate::utils::error::{BaziError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 五行。`Unknown` 表示無法辨識的干支字元
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
    Unknown,
}

impl Element {
    /// 相生順序：木 → 火 → 土 → 金 → 水
    pub const CYCLE: [Element; 5] = [
        Element::Wood,
        Element::Fire,
        Element::Earth,
        Element::Metal,
        Element::Water,
    ];

    pub fn cycle_index(self) -> Option<usize> {
        Self::CYCLE.iter().position(|e| *e == self)
    }

}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Element::Wood => "Wood",
            Element::Fire => "Fire",
            Element::Earth => "Earth",
            Element::Metal => "Metal",
            Element::Water => "Water",
            Element::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "+")]
    Yang,
    #[serde(rename = "-")]
    Yin,
}

/// 兩個五行在生剋環上的關係，以 A 為主體
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Same,
    Generates,
    GeneratedBy,
    Controls,
    ControlledBy,
    Unknown,
}

/// 十神
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenGod {
    Friend,
    RobWealth,
    EatingGod,
    HurtingOfficer,
    IndirectResource,
    DirectResource,
    IndirectWealth,
    DirectWealth,
    SevenKillings,
    DirectOfficer,
    Unknown,
}

impl TenGod {
    pub fn is_known(self) -> bool {
        self != TenGod::Unknown
    }
}

/// 天干表中的一筆，固定不變
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemEntry {
    pub raw: char,
    pub name: &'static str,
    pub element: Element,
    pub polarity: Polarity,
}

/// 地支表中的一筆；`main_stem` 為藏干本氣
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchEntry {
    pub raw: char,
    pub name: &'static str,
    pub element: Element,
    pub polarity: Polarity,
    pub main_stem: char,
}

/// 柱中的一個干或支。無法辨識時 `name` 保留原字元、`element` 為 Unknown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub raw: String,
    pub name: String,
    pub element: Element,
    #[serde(default)]
    pub polarity: Option<Polarity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub stem: Symbol,
    pub branch: Symbol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillars {
    pub year: Pillar,
    pub month: Pillar,
    pub day: Pillar,
    pub hour: Pillar,
}

impl Pillars {
    pub fn iter(&self) -> impl Iterator<Item = &Pillar> {
        [&self.year, &self.month, &self.day, &self.hour].into_iter()
    }
}

pub type ElementTally = BTreeMap<Element, u32>;
pub type ElementPercent = BTreeMap<Element, u32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenGodWeight {
    pub name: TenGod,
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckCycle {
    pub age_range: String,
    pub stem: String,
    pub branch: String,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

/// 排盤結果，也是快取兩層共用的值格式。
///
/// `five_element_percent` 為可選，舊版快取值沒有這個欄位，讀取時由快取補上。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FourPillarsChart {
    pub pillars: Pillars,
    pub five_elements: ElementTally,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub five_element_percent: Option<ElementPercent>,
    #[serde(default)]
    pub ten_gods: Vec<TenGodWeight>,
    #[serde(default)]
    pub luck_cycles: Vec<LuckCycle>,
}

impl FourPillarsChart {
    pub fn day_master(&self) -> &Symbol {
        &self.pillars.day.stem
    }

    /// 百分比最高的五行；同分取相生順序較前者
    pub fn dominant_element(&self) -> Option<Element> {
        let mut best: Option<(Element, u32)> = None;
        for element in Element::CYCLE {
            let count = self.five_elements.get(&element).copied().unwrap_or(0);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((element, count));
            }
        }
        best.map(|(element, _)| element)
    }

    pub fn missing_elements(&self) -> Vec<Element> {
        Element::CYCLE
            .into_iter()
            .filter(|e| self.five_elements.get(e).copied().unwrap_or(0) == 0)
            .collect()
    }
}

/// 寬鬆數值：呼叫端可能傳整數、浮點數或字串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    /// 轉為整數（向零截斷）；非有限值或無法解析時回傳 None
    pub fn coerce(&self) -> Option<i64> {
        let value = match self {
            LooseNumber::Int(v) => return Some(*v),
            LooseNumber::Float(v) => *v,
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if value.is_finite() {
            Some(value.trunc() as i64)
        } else {
            None
        }
    }
}

impl From<i64> for LooseNumber {
    fn from(value: i64) -> Self {
        LooseNumber::Int(value)
    }
}

impl From<i32> for LooseNumber {
    fn from(value: i32) -> Self {
        LooseNumber::Int(value as i64)
    }
}

impl From<f64> for LooseNumber {
    fn from(value: f64) -> Self {
        LooseNumber::Float(value)
    }
}

impl From<&str> for LooseNumber {
    fn from(value: &str) -> Self {
        LooseNumber::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthInput {
    #[serde(default)]
    pub birth_year: Option<LooseNumber>,
    #[serde(default)]
    pub birth_month: Option<LooseNumber>,
    #[serde(default)]
    pub birth_day: Option<LooseNumber>,
    #[serde(default)]
    pub birth_hour: Option<LooseNumber>,
    #[serde(default)]
    pub birth_minute: Option<LooseNumber>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_location: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub timezone_offset_minutes: Option<LooseNumber>,
}

/// 經過型別轉換與範圍檢查的出生資料，提供給曆法服務
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedBirth {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// 未提供時不帶給曆法服務，由服務端決定預設
    pub gender: Option<String>,
}

fn required_number(field: &str, value: &Option<LooseNumber>) -> Result<i64> {
    value
        .as_ref()
        .ok_or_else(|| BaziError::invalid_input(field, "missing"))?
        .coerce()
        .ok_or_else(|| BaziError::invalid_input(field, "not a finite number"))
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> Result<u32> {
    if value < min || value > max {
        return Err(BaziError::invalid_input(
            field,
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    Ok(value as u32)
}

pub(crate) fn normalize_gender(gender: &Option<String>) -> Option<String> {
    let normalized = gender.as_deref()?.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

impl BirthInput {
    pub fn normalize(&self) -> Result<NormalizedBirth> {
        let year = required_number("birthYear", &self.birth_year)?;
        let year = i32::try_from(year)
            .map_err(|_| BaziError::invalid_input("birthYear", "out of range"))?;
        let month = in_range("birthMonth", required_number("birthMonth", &self.birth_month)?, 1, 12)?;
        let day = in_range("birthDay", required_number("birthDay", &self.birth_day)?, 1, 31)?;
        let hour = in_range("birthHour", required_number("birthHour", &self.birth_hour)?, 0, 23)?;
        let minute = match &self.birth_minute {
            Some(value) => in_range(
                "birthMinute",
                value
                    .coerce()
                    .ok_or_else(|| BaziError::invalid_input("birthMinute", "not a finite number"))?,
                0,
                59,
            )?,
            None => 0,
        };
        Ok(NormalizedBirth {
            year,
            month,
            day,
            hour,
            minute,
            gender: normalize_gender(&self.gender),
        })
    }
}

impl NormalizedBirth {
    pub fn local_datetime(&self) -> Result<NaiveDateTime> {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hour, self.minute, 0))
            .ok_or_else(|| BaziError::invalid_input("birthDay", "not a valid calendar date"))
    }
}

/// 曆法服務回傳的一柱干支字元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanZhi {
    pub stem: String,
    pub branch: String,
}

/// 曆法服務回傳的原始大運項目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLuckEntry {
    pub start_age: u32,
    pub end_age: u32,
    #[serde(alias = "ganZhi")]
    pub stem_branch_pair: String,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

/// 曆法服務的完整輸出：四柱八字元與大運序列（已依性別排定順逆）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarOutput {
    pub year: GanZhi,
    pub month: GanZhi,
    pub day: GanZhi,
    pub hour: GanZhi,
    #[serde(default)]
    pub luck_sequence: Vec<RawLuckEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarTimeCorrection {
    pub correction_minutes: f64,
    pub corrected_timestamp: NaiveDateTime,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynastryScore {
    pub score: u8,
    pub day_master_relation: Relation,
    pub day_branch_relation: Relation,
    pub complementarity_bonus: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFortune {
    pub score: u8,
    pub relation: Relation,
    pub clash: bool,
    pub advice: Vec<String>,
}
