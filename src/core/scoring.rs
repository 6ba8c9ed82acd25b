use crate::core::chart::element_percentages;
use crate::core::elements::{
    is_branch_clash, is_branch_harmony, is_stem_union, relation, stem_symbol,
};
use crate::domain::model::{
    DailyFortune, Element, ElementPercent, FourPillarsChart, GanZhi, Relation, SynastryScore,
};

const DEFICIENT_BELOW: u32 = 10;
const ABUNDANT_ABOVE: u32 = 30;
const COMPLEMENT_STEP: u8 = 10;
const COMPLEMENT_CAP: u8 = 30;

const FORTUNE_BASE: i32 = 60;
const CLASH_PENALTY: i32 = 20;

fn day_master_weight(relation: Relation) -> u8 {
    match relation {
        Relation::Generates | Relation::GeneratedBy => 40,
        Relation::Same => 30,
        Relation::Controls | Relation::ControlledBy => 20,
        Relation::Unknown => 10,
    }
}

fn day_branch_weight(relation: Relation) -> u8 {
    match relation {
        Relation::Same => 30,
        Relation::Generates | Relation::GeneratedBy => 25,
        Relation::Controls | Relation::ControlledBy => 10,
        Relation::Unknown => 5,
    }
}

fn percentages(chart: &FourPillarsChart) -> ElementPercent {
    chart
        .five_element_percent
        .clone()
        .unwrap_or_else(|| element_percentages(&chart.five_elements))
}

/// 一方缺（<10%）而另一方旺（>30%）的五行，每個加 10 分，雙向計算，上限 30
pub fn complementarity_bonus(a: &FourPillarsChart, b: &FourPillarsChart) -> u8 {
    let pa = percentages(a);
    let pb = percentages(b);
    let mut bonus = 0u8;

    for element in Element::CYCLE {
        let share_a = pa.get(&element).copied().unwrap_or(0);
        let share_b = pb.get(&element).copied().unwrap_or(0);
        if share_a < DEFICIENT_BELOW && share_b > ABUNDANT_ABOVE {
            bonus = bonus.saturating_add(COMPLEMENT_STEP);
        }
        if share_b < DEFICIENT_BELOW && share_a > ABUNDANT_ABOVE {
            bonus = bonus.saturating_add(COMPLEMENT_STEP);
        }
    }

    bonus.min(COMPLEMENT_CAP)
}

/// 合盤評分：日主關係 + 日支關係 + 五行互補
pub fn synastry(a: &FourPillarsChart, b: &FourPillarsChart) -> SynastryScore {
    let day_master_relation = relation(a.day_master().element, b.day_master().element);
    let day_branch_relation = relation(a.pillars.day.branch.element, b.pillars.day.branch.element);
    let complementarity_bonus = complementarity_bonus(a, b);

    let total = day_master_weight(day_master_relation) as u32
        + day_branch_weight(day_branch_relation) as u32
        + complementarity_bonus as u32;

    SynastryScore {
        score: total.min(100) as u8,
        day_master_relation,
        day_branch_relation,
        complementarity_bonus,
    }
}

fn fortune_adjustment(relation: Relation) -> i32 {
    match relation {
        Relation::Generates => 15,
        Relation::Same => 10,
        Relation::Controls => -10,
        Relation::ControlledBy | Relation::GeneratedBy => 5,
        Relation::Unknown => 0,
    }
}

fn advice_for(relation: Relation) -> &'static str {
    match relation {
        Relation::Generates => "Today's energy nourishes you; a good day to start new things.",
        Relation::Same => "Peers and friends are supportive; collaborate rather than compete.",
        Relation::Controls => "Pressure from outside runs high; move carefully and avoid confrontation.",
        Relation::ControlledBy => "Opportunities for gain appear; keep spending in check.",
        Relation::GeneratedBy => "Your output is valued today; express ideas, but pace yourself.",
        Relation::Unknown => "The day's influence is unclear; keep to your routine.",
    }
}

/// 每日運勢：以當日日柱天干五行對命主日主的作用加減分，遇日支六冲再扣分
pub fn daily_fortune(chart: &FourPillarsChart, today: &GanZhi) -> DailyFortune {
    let today_element = stem_symbol(&today.stem).element;
    let relation = relation(today_element, chart.day_master().element);
    let clash = is_branch_clash(&today.branch, &chart.pillars.day.branch.raw);

    let mut score = FORTUNE_BASE + fortune_adjustment(relation);
    let mut advice = vec![advice_for(relation).to_string()];

    if clash {
        score -= CLASH_PENALTY;
        advice.push(
            "Today's branch clashes with your day branch; postpone travel and major decisions."
                .to_string(),
        );
    }

    // 六合、天干五合只影響建議，不計分
    if is_branch_harmony(&today.branch, &chart.pillars.day.branch.raw) {
        advice.push(
            "Today's branch harmonizes with your day branch; a good day for partnerships."
                .to_string(),
        );
    }
    if is_stem_union(&today.stem, &chart.day_master().raw) {
        advice.push(
            "Today's stem combines with your day master; cooperation comes easily.".to_string(),
        );
    }

    if chart.dominant_element() == Some(today_element) {
        advice.push(format!(
            "{} already dominates your chart; avoid overdoing it today.",
            today_element
        ));
    } else if chart.missing_elements().contains(&today_element) {
        advice.push(format!(
            "{} is absent from your chart and present today; make use of it.",
            today_element
        ));
    }

    DailyFortune {
        score: score.clamp(0, 100) as u8,
        relation,
        clash,
        advice,
    }
}
