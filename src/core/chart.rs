use crate::core::elements::{branch_symbol, lookup_branch, lookup_stem, stem_symbol};
use crate::core::ten_gods::classify;
use crate::domain::model::{
    CalendarOutput, Element, ElementPercent, ElementTally, FourPillarsChart, GanZhi, LuckCycle,
    Pillar, Pillars, RawLuckEntry, TenGod, TenGodWeight,
};
use crate::utils::error::{BaziError, Result};

/// 每個十神命中的權重
const TEN_GOD_WEIGHT: u32 = 10;

/// 保留的大運步數（略過第一筆起運前的小運）
const LUCK_CYCLE_COUNT: usize = 8;

#[derive(Debug, Clone, Copy)]
enum Position {
    YearStem,
    YearBranch,
    MonthStem,
    MonthBranch,
    DayBranch,
    HourStem,
    HourBranch,
}

/// 參與十神統計的七個位置，日干本身是日主不計
const AUXILIARY_POSITIONS: [Position; 7] = [
    Position::YearStem,
    Position::YearBranch,
    Position::MonthStem,
    Position::MonthBranch,
    Position::DayBranch,
    Position::HourStem,
    Position::HourBranch,
];

fn build_pillar(label: &str, raw: &GanZhi) -> Result<Pillar> {
    if raw.stem.trim().is_empty() || raw.branch.trim().is_empty() {
        return Err(BaziError::UnusableCalendarOutput {
            reason: format!("{} pillar is missing its stem or branch", label),
        });
    }
    Ok(Pillar {
        stem: stem_symbol(&raw.stem),
        branch: branch_symbol(&raw.branch),
    })
}

pub fn tally_elements(pillars: &Pillars) -> ElementTally {
    let mut tally: ElementTally = Element::CYCLE.into_iter().map(|e| (e, 0)).collect();
    for pillar in pillars.iter() {
        *tally.entry(pillar.stem.element).or_insert(0) += 1;
        *tally.entry(pillar.branch.element).or_insert(0) += 1;
    }
    tally
}

/// 各五行占比（四捨五入到整數）；總數為 0 時全部為 0
pub fn element_percentages(tally: &ElementTally) -> ElementPercent {
    let total: u32 = tally.values().sum();
    tally
        .iter()
        .map(|(element, count)| {
            let percent = if total == 0 {
                0
            } else {
                (*count as f64 / total as f64 * 100.0).round() as u32
            };
            (*element, percent)
        })
        .collect()
}

/// 取得該位置代表的天干字元；地支以本氣藏干代表
fn dominant_stem(pillars: &Pillars, position: Position) -> String {
    let branch_main = |raw: &str| {
        lookup_branch(raw)
            .map(|b| b.main_stem.to_string())
            .unwrap_or_else(|| raw.to_string())
    };

    match position {
        Position::YearStem => pillars.year.stem.raw.clone(),
        Position::YearBranch => branch_main(&pillars.year.branch.raw),
        Position::MonthStem => pillars.month.stem.raw.clone(),
        Position::MonthBranch => branch_main(&pillars.month.branch.raw),
        Position::DayBranch => branch_main(&pillars.day.branch.raw),
        Position::HourStem => pillars.hour.stem.raw.clone(),
        Position::HourBranch => branch_main(&pillars.hour.branch.raw),
    }
}

/// 十神權重，依首次出現順序排列；無法判定的位置直接略過
pub fn count_ten_gods(pillars: &Pillars) -> Vec<TenGodWeight> {
    let day_master = &pillars.day.stem.raw;
    let mut weights: Vec<TenGodWeight> = Vec::new();

    for position in AUXILIARY_POSITIONS {
        let god = classify(day_master, &dominant_stem(pillars, position));
        if god == TenGod::Unknown {
            tracing::debug!("Skipping unclassifiable position {:?}", position);
            continue;
        }
        match weights.iter_mut().find(|w| w.name == god) {
            Some(existing) => existing.strength += TEN_GOD_WEIGHT,
            None => weights.push(TenGodWeight {
                name: god,
                strength: TEN_GOD_WEIGHT,
            }),
        }
    }

    weights
}

fn romanize_pair(pair: &str) -> (String, String) {
    let mut chars = pair.trim().chars();
    let stem = chars.next().map(String::from).unwrap_or_default();
    let branch: String = chars.collect();

    let stem_name = lookup_stem(&stem)
        .map(|s| s.name.to_string())
        .unwrap_or(stem);
    let branch_name = lookup_branch(&branch)
        .map(|b| b.name.to_string())
        .unwrap_or(branch);
    (stem_name, branch_name)
}

pub fn format_luck_cycles(sequence: &[RawLuckEntry]) -> Vec<LuckCycle> {
    sequence
        .iter()
        .skip(1)
        .take(LUCK_CYCLE_COUNT)
        .map(|entry| {
            let (stem, branch) = romanize_pair(&entry.stem_branch_pair);
            LuckCycle {
                age_range: format!("{}-{}", entry.start_age, entry.end_age),
                stem,
                branch,
                start_year: entry.start_year,
                end_year: entry.end_year,
            }
        })
        .collect()
}

/// 由曆法服務輸出組出完整命盤
pub fn assemble(output: &CalendarOutput) -> Result<FourPillarsChart> {
    let pillars = Pillars {
        year: build_pillar("year", &output.year)?,
        month: build_pillar("month", &output.month)?,
        day: build_pillar("day", &output.day)?,
        hour: build_pillar("hour", &output.hour)?,
    };

    let five_elements = tally_elements(&pillars);
    let five_element_percent = element_percentages(&five_elements);
    let ten_gods = count_ten_gods(&pillars);
    let luck_cycles = format_luck_cycles(&output.luck_sequence);

    if luck_cycles.len() < LUCK_CYCLE_COUNT {
        tracing::warn!(
            "Calendar returned {} luck entries, expected at least {}",
            output.luck_sequence.len(),
            LUCK_CYCLE_COUNT + 1
        );
    }

    Ok(FourPillarsChart {
        pillars,
        five_elements,
        five_element_percent: Some(five_element_percent),
        ten_gods,
        luck_cycles,
    })
}
